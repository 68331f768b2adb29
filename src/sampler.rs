//! Reads the 2x2x2x2 wind neighbourhood of a grid cell.
//!
//! Cube entries are ordered `lon + 2·lat + 4·level + 8·time`, i.e. axis 0
//! fastest, which is what [`nlerp`](crate::interpolation::nlerp) expects.
//! Longitude is the fastest axis on disk for every layout, so the two
//! longitude neighbours are one 8-byte read.

use crate::dataset::{PositionedRead, ELEMENT_SIZE};
use crate::error::{GridAxis, PredictorError, Result};
use crate::grid::{AxisLayout, GridCell, GridParams};

/// Number of corners of a 4-D sampling cell.
pub const CUBE_SIZE: usize = 16;

/// Variable index of the zonal (eastward) wind component.
pub const U_COMPONENT: usize = 0;
/// Variable index of the meridional (northward) wind component.
pub const V_COMPONENT: usize = 1;

/// Wind samples at the 16 corners of a cell (m/s).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindCubes {
    pub u: [f64; CUBE_SIZE],
    pub v: [f64; CUBE_SIZE],
}

/// Flat element index of a grid point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPoint {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub t: usize,
    pub var: usize,
}

impl AxisLayout {
    /// Flat element index of `point` in a dataset described by `grid`.
    pub fn element_index(self, point: GridPoint, grid: &GridParams) -> u64 {
        match self {
            AxisLayout::LonLatTimeLevel => time_before_level_index(point, grid),
            AxisLayout::LonLatLevelTime => level_before_time_index(point, grid),
        }
    }
}

fn time_before_level_index(p: GridPoint, g: &GridParams) -> u64 {
    let (nx, ny, nt, nz) = (
        g.lng_points as u64,
        g.lat_points as u64,
        g.time_points as u64,
        g.alt_points as u64,
    );
    p.x as u64 + nx * (p.y as u64 + ny * (p.t as u64 + nt * (p.z as u64 + nz * p.var as u64)))
}

fn level_before_time_index(p: GridPoint, g: &GridParams) -> u64 {
    let (nx, ny, nz, nt) = (
        g.lng_points as u64,
        g.lat_points as u64,
        g.alt_points as u64,
        g.time_points as u64,
    );
    p.x as u64 + nx * (p.y as u64 + ny * (p.z as u64 + nz * (p.t as u64 + nt * p.var as u64)))
}

fn check_cell(cell: &GridCell, grid: &GridParams) -> Result<()> {
    for (axis, index, points) in [
        (GridAxis::Longitude, cell.x, grid.lng_points),
        (GridAxis::Latitude, cell.y, grid.lat_points),
        (GridAxis::Altitude, cell.z, grid.alt_points),
        (GridAxis::Time, cell.t, grid.time_points),
    ] {
        if index + 2 > points {
            return Err(PredictorError::OutOfRangeGridCoordinate {
                axis,
                coordinate: index as f64,
                max: points.saturating_sub(2) as f64,
            });
        }
    }
    Ok(())
}

fn read_pair<R: PositionedRead + ?Sized>(source: &R, element: u64) -> Result<[f64; 2]> {
    let offset = element * ELEMENT_SIZE;
    let mut buf = [0u8; 8];
    source
        .read_exact_at(&mut buf, offset)
        .map_err(|source| PredictorError::DataSource { offset, source })?;
    Ok([
        f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
        f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]) as f64,
    ])
}

/// Reads u and v at the 16 corners of `cell`.
///
/// `cell` must satisfy `index <= points - 2` on every axis; violations are
/// rejected before any read is issued.
pub fn sample<R: PositionedRead + ?Sized>(
    source: &R,
    cell: GridCell,
    grid: &GridParams,
) -> Result<WindCubes> {
    check_cell(&cell, grid)?;
    let layout = grid.model.layout();

    let mut cubes = WindCubes {
        u: [0.0; CUBE_SIZE],
        v: [0.0; CUBE_SIZE],
    };
    for time in 0..2 {
        for level in 0..2 {
            for lat in 0..2 {
                let slot = 2 * (lat + 2 * (level + 2 * time));
                let corner = |var| GridPoint {
                    x: cell.x,
                    y: cell.y + lat,
                    z: cell.z + level,
                    t: cell.t + time,
                    var,
                };

                let u = read_pair(source, layout.element_index(corner(U_COMPONENT), grid))?;
                let v = read_pair(source, layout.element_index(corner(V_COMPONENT), grid))?;
                cubes.u[slot..slot + 2].copy_from_slice(&u);
                cubes.v[slot..slot + 2].copy_from_slice(&v);
            }
        }
    }
    Ok(cubes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemoryDataset;
    use crate::grid::ModelVariant;
    use std::io;

    fn small_grid(model: ModelVariant) -> GridParams {
        GridParams {
            west: 0.0,
            south: 0.0,
            lng_points: 4,
            lat_points: 3,
            alt_points: 5,
            time_points: 2,
            var_points: 2,
            lng_angle: 1.0,
            lat_angle: 1.0,
            fcst_interval: 1.0,
            pressure_levels: vec![200.0, 400.0, 600.0, 800.0, 1000.0],
            model,
        }
    }

    /// Encodes the coordinates of each point as x + 10y + 100z + 1000t + 10000var.
    fn coded_value(p: GridPoint) -> f32 {
        (p.x + 10 * p.y + 100 * p.z + 1000 * p.t + 10000 * p.var) as f32
    }

    fn coded_dataset(grid: &GridParams, order: [usize; 5]) -> MemoryDataset {
        // order lists the point counts fastest axis first, mapping to (x, y, a, b, var)
        let dims = order;
        let mut values = vec![0.0f32; grid.element_count() as usize];
        for (i, value) in values.iter_mut().enumerate() {
            let mut rest = i;
            let mut idx = [0usize; 5];
            for (k, &n) in dims.iter().enumerate() {
                idx[k] = rest % n;
                rest /= n;
            }
            let point = match grid.model.layout() {
                AxisLayout::LonLatTimeLevel => GridPoint { x: idx[0], y: idx[1], t: idx[2], z: idx[3], var: idx[4] },
                AxisLayout::LonLatLevelTime => GridPoint { x: idx[0], y: idx[1], z: idx[2], t: idx[3], var: idx[4] },
            };
            *value = coded_value(point);
        }
        MemoryDataset::from_values(&values)
    }

    fn expected_cube(cell: GridCell, var: usize) -> [f64; CUBE_SIZE] {
        let mut cube = [0.0; CUBE_SIZE];
        for (i, slot) in cube.iter_mut().enumerate() {
            *slot = coded_value(GridPoint {
                x: cell.x + (i & 1),
                y: cell.y + ((i >> 1) & 1),
                z: cell.z + ((i >> 2) & 1),
                t: cell.t + ((i >> 3) & 1),
                var,
            }) as f64;
        }
        cube
    }

    #[test]
    fn test_time_before_level_layout() {
        let grid = small_grid(ModelVariant::Arpege);
        let dataset = coded_dataset(&grid, [4, 3, 2, 5, 2]);
        let cell = GridCell { x: 2, y: 1, z: 3, t: 0 };

        let cubes = sample(&dataset, cell, &grid).unwrap();
        assert_eq!(cubes.u, expected_cube(cell, U_COMPONENT));
        assert_eq!(cubes.v, expected_cube(cell, V_COMPONENT));
    }

    #[test]
    fn test_level_before_time_layout() {
        let grid = small_grid(ModelVariant::Arome);
        let dataset = coded_dataset(&grid, [4, 3, 5, 2, 2]);
        let cell = GridCell { x: 0, y: 0, z: 2, t: 0 };

        let cubes = sample(&dataset, cell, &grid).unwrap();
        assert_eq!(cubes.u, expected_cube(cell, U_COMPONENT));
        assert_eq!(cubes.v, expected_cube(cell, V_COMPONENT));
    }

    #[test]
    fn test_layouts_are_not_interchangeable() {
        let grid = small_grid(ModelVariant::Arome);
        let dataset = coded_dataset(&grid, [4, 3, 5, 2, 2]);
        let cell = GridCell { x: 1, y: 1, z: 1, t: 0 };

        let mut wrong = grid.clone();
        wrong.model = ModelVariant::Arpege;
        let cubes = sample(&dataset, cell, &wrong).unwrap();
        assert_ne!(cubes.u, expected_cube(cell, U_COMPONENT));
    }

    #[test]
    fn test_element_index_formulas() {
        let grid = small_grid(ModelVariant::Arpege);
        let point = GridPoint { x: 1, y: 2, z: 3, t: 1, var: 1 };
        // x + 4 (y + 3 (t + 2 (z + 5 var)))
        assert_eq!(AxisLayout::LonLatTimeLevel.element_index(point, &grid), 1 + 4 * (2 + 3 * (1 + 2 * (3 + 5))));
        // x + 4 (y + 3 (z + 5 (t + 2 var)))
        assert_eq!(AxisLayout::LonLatLevelTime.element_index(point, &grid), 1 + 4 * (2 + 3 * (3 + 5 * (1 + 2))));
    }

    #[test]
    fn test_rejects_cell_on_last_grid_line() {
        let grid = small_grid(ModelVariant::Arpege);
        let dataset = coded_dataset(&grid, [4, 3, 2, 5, 2]);
        let cell = GridCell { x: 3, y: 0, z: 0, t: 0 };
        assert!(matches!(
            sample(&dataset, cell, &grid),
            Err(PredictorError::OutOfRangeGridCoordinate { axis: GridAxis::Longitude, .. })
        ));
    }

    #[test]
    fn test_short_dataset_is_data_source_failure() {
        let grid = small_grid(ModelVariant::Arome);
        let dataset = MemoryDataset::from_values(&[0.0; 10]);
        let cell = GridCell { x: 0, y: 0, z: 0, t: 0 };
        match sample(&dataset, cell, &grid) {
            Err(PredictorError::DataSource { source, .. }) => {
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof)
            }
            other => panic!("expected data source failure, got {other:?}"),
        }
    }
}
