//! KML LineString export of a trajectory, viewable in Google Earth.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::state::State;

/// Streams states into a single-placemark KML document.
///
/// The document is only well formed once [`KmlWriter::finish`] has run.
pub struct KmlWriter<W: Write> {
    writer: W,
    points: usize,
}

impl<W: Write> KmlWriter<W> {
    /// Writes the document header for a path called `name`.
    pub fn new(mut writer: W, name: &str) -> io::Result<Self> {
        let name = escape_xml(name);
        write!(
            writer,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
<Document>
<name>{name}</name>
<Style id="trajectory">
<LineStyle><color>ff0000ff</color><width>3</width></LineStyle>
</Style>
<Placemark>
<name>{name}</name>
<styleUrl>#trajectory</styleUrl>
<LineString>
<extrude>1</extrude>
<tessellate>1</tessellate>
<altitudeMode>absolute</altitudeMode>
<coordinates>
"#
        )?;
        Ok(Self { writer, points: 0 })
    }

    /// Appends one `lng,lat,alt` coordinate.
    pub fn push(&mut self, state: &State) -> io::Result<()> {
        writeln!(
            self.writer,
            "{:.6},{:.6},{:.2}",
            state.longitude, state.latitude, state.altitude
        )?;
        self.points += 1;
        Ok(())
    }

    pub fn points(&self) -> usize {
        self.points
    }

    /// Closes the document and hands back the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.write_all(
            b"</coordinates>\n</LineString>\n</Placemark>\n</Document>\n</kml>\n",
        )?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Writes `states` to a new KML file at `path`, returning the point count.
pub fn write_kml(path: impl AsRef<Path>, name: &str, states: &[State]) -> io::Result<usize> {
    let file = BufWriter::new(File::create(path)?);
    let mut kml = KmlWriter::new(file, name)?;
    for state in states {
        kml.push(state)?;
    }
    let points = kml.points();
    kml.finish()?;
    Ok(points)
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
