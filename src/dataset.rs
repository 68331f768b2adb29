//! Random-access byte sources holding binary grid data.
//!
//! The sampler only needs "read these bytes at that offset". Files do it with
//! positioned reads (no shared cursor), tests do it from memory.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{PredictorError, Result};
use crate::grid::GridParams;

/// Size of one stored grid value (little-endian IEEE-754 binary32).
pub const ELEMENT_SIZE: u64 = 4;

/// A read-only byte source addressed by absolute offset.
pub trait PositionedRead {
    /// Fills `buf` from `offset`, failing on a short read.
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()>;
}

impl<T: PositionedRead + ?Sized> PositionedRead for &T {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        (**self).read_exact_at(buf, offset)
    }
}

impl<T: PositionedRead + ?Sized> PositionedRead for Box<T> {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        (**self).read_exact_at(buf, offset)
    }
}

impl PositionedRead for [u8] {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset overflows usize"))?;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= self.len())
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "failed to fill whole buffer"))?;
        buf.copy_from_slice(&self[start..end]);
        Ok(())
    }
}

impl PositionedRead for File {
    #[cfg(unix)]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        std::os::unix::fs::FileExt::read_exact_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        use std::os::windows::fs::FileExt;

        let mut filled = 0;
        while filled < buf.len() {
            match self.seek_read(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "failed to fill whole buffer",
                    ))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// A grid dataset file checked against its [`GridParams`] on open.
#[derive(Debug)]
pub struct GridFile {
    file: File,
    path: PathBuf,
    len: u64,
}

impl GridFile {
    /// Opens `path` and checks it is large enough for `grid`.
    ///
    /// Files shorter than the expected element count are rejected; longer
    /// ones are accepted with a warning since only the prefix is addressed.
    pub fn open(path: impl AsRef<Path>, grid: &GridParams) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        let expected = grid.element_count() * ELEMENT_SIZE;

        if len < expected {
            return Err(PredictorError::DataSource {
                offset: len,
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "{} holds {len} bytes, {} grid needs {expected}",
                        path.display(),
                        grid.model
                    ),
                ),
            });
        }
        if len > expected {
            warn!(
                path = %path.display(),
                len,
                expected,
                "grid file larger than its parameters describe"
            );
        }
        debug!(path = %path.display(), len, model = %grid.model, "opened grid file");

        Ok(Self { file, path, len })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes, never less than the grid it was opened for needs.
    pub fn size_bytes(&self) -> u64 {
        self.len
    }
}

impl PositionedRead for GridFile {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        self.file.read_exact_at(buf, offset)
    }
}

/// In-memory grid dataset, encoded exactly like the files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryDataset {
    bytes: Vec<u8>,
}

impl MemoryDataset {
    pub fn from_values(values: &[f32]) -> Self {
        Self {
            bytes: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    /// Builds a dataset of `grid.element_count()` values from a function of
    /// the flat element index.
    pub fn from_fn(grid: &GridParams, f: impl FnMut(u64) -> f32) -> Self {
        let values: Vec<f32> = (0..grid.element_count()).map(f).collect();
        Self::from_values(&values)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl PositionedRead for MemoryDataset {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        self.bytes.as_slice().read_exact_at(buf, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tiny_grid() -> GridParams {
        GridParams {
            west: 0.0,
            south: 0.0,
            lng_points: 2,
            lat_points: 2,
            alt_points: 2,
            time_points: 2,
            var_points: 2,
            lng_angle: 1.0,
            lat_angle: 1.0,
            fcst_interval: 1.0,
            pressure_levels: vec![500.0, 1000.0],
            model: crate::grid::ModelVariant::Arome,
        }
    }

    #[test]
    fn test_memory_dataset_reads_little_endian() {
        let dataset = MemoryDataset::from_values(&[1.5, -2.0, 3.25]);
        let mut buf = [0u8; 8];
        dataset.read_exact_at(&mut buf, 4).unwrap();
        assert_eq!(f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]), -2.0);
        assert_eq!(f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]), 3.25);
    }

    #[test]
    fn test_memory_dataset_short_read_fails() {
        let dataset = MemoryDataset::from_values(&[1.0, 2.0]);
        let mut buf = [0u8; 8];
        let err = dataset.read_exact_at(&mut buf, 4).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(dataset.read_exact_at(&mut buf, u64::MAX).is_err());
    }

    #[test]
    fn test_grid_file_round_trip() {
        let grid = tiny_grid();
        let dataset = MemoryDataset::from_fn(&grid, |i| i as f32);

        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(dataset.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let file = GridFile::open(tmp.path(), &grid).unwrap();
        assert_eq!(file.size_bytes(), 32 * ELEMENT_SIZE);
        assert_eq!(file.path(), tmp.path());

        let mut buf = [0u8; 4];
        file.read_exact_at(&mut buf, 31 * ELEMENT_SIZE).unwrap();
        assert_eq!(f32::from_le_bytes(buf), 31.0);
    }

    #[test]
    fn test_grid_file_rejects_truncated_file() {
        let grid = tiny_grid();
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0u8; 40]).unwrap();
        tmp.flush().unwrap();

        assert!(matches!(
            GridFile::open(tmp.path(), &grid),
            Err(PredictorError::DataSource { offset: 40, .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let grid = tiny_grid();
        assert!(matches!(
            GridFile::open("/nonexistent/grid.bin", &grid),
            Err(PredictorError::Io(_))
        ));
    }
}
