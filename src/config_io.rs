//! Plain-text configuration files.
//!
//! ```text
//! <n>
//! <box>
//! x y z ex ey ez      (n lines, positions in absolute units)
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use tracing::debug;

use crate::error::{McError, Result};

/// Contents of a configuration file. Positions are in absolute units.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub box_length: f64,
    pub positions: Vec<Vector3<f64>>,
    pub orientations: Vec<Vector3<f64>>,
}

impl Configuration {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

struct LineReader<'a> {
    path: &'a Path,
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> LineReader<'a> {
    fn new(path: &'a Path, content: &'a str) -> Self {
        Self {
            path,
            lines: content.lines().enumerate(),
        }
    }

    fn error(&self, line: usize, message: impl Into<String>) -> McError {
        McError::Parse {
            path: PathBuf::from(self.path),
            line,
            message: message.into(),
        }
    }

    /// Next non-blank line as (1-based line number, whitespace-split fields).
    fn next_fields(&mut self, what: &str) -> Result<(usize, Vec<&'a str>)> {
        for (idx, line) in self.lines.by_ref() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if !fields.is_empty() {
                return Ok((idx + 1, fields));
            }
        }
        Err(McError::Parse {
            path: PathBuf::from(self.path),
            line: 0,
            message: format!("unexpected end of file while reading {what}"),
        })
    }

    fn parse_f64(&self, line: usize, field: &str) -> Result<f64> {
        field
            .parse::<f64>()
            .map_err(|e| self.error(line, format!("invalid number '{field}': {e}")))
    }

    fn header(&mut self) -> Result<(usize, f64)> {
        let (line, fields) = self.next_fields("molecule count")?;
        let n = fields[0]
            .parse::<usize>()
            .map_err(|e| self.error(line, format!("invalid molecule count '{}': {e}", fields[0])))?;

        let (line, fields) = self.next_fields("box length")?;
        let box_length = self.parse_f64(line, fields[0])?;
        if !(box_length > 0.0) {
            return Err(self.error(line, format!("box length must be positive, got {box_length}")));
        }
        Ok((n, box_length))
    }
}

/// Read only the molecule count and box length.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<(usize, f64)> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    LineReader::new(path, &content).header()
}

/// Read a full configuration; orientations are normalised on the way in.
pub fn read_configuration<P: AsRef<Path>>(path: P) -> Result<Configuration> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let mut reader = LineReader::new(path, &content);
    let (n, box_length) = reader.header()?;

    let mut positions = Vec::with_capacity(n);
    let mut orientations = Vec::with_capacity(n);
    for i in 0..n {
        let (line, fields) = reader.next_fields(&format!("molecule {}", i + 1))?;
        if fields.len() < 6 {
            return Err(reader.error(
                line,
                format!("expected 6 values per molecule, found {}", fields.len()),
            ));
        }
        let values = fields[..6]
            .iter()
            .map(|f| reader.parse_f64(line, f))
            .collect::<Result<Vec<f64>>>()?;

        let e = Vector3::new(values[3], values[4], values[5]);
        let norm = e.norm();
        if !(norm > 0.0) {
            return Err(reader.error(line, "orientation vector has zero length"));
        }
        positions.push(Vector3::new(values[0], values[1], values[2]));
        orientations.push(e / norm);
    }

    debug!(path = %path.display(), n, box_length, "read configuration");
    Ok(Configuration {
        box_length,
        positions,
        orientations,
    })
}

/// Write a configuration with positions in absolute units.
pub fn write_configuration<P: AsRef<Path>>(
    path: P,
    box_length: f64,
    positions: &[Vector3<f64>],
    orientations: &[Vector3<f64>],
) -> Result<()> {
    if positions.len() != orientations.len() {
        return Err(McError::DimensionMismatch {
            positions: positions.len(),
            orientations: orientations.len(),
        });
    }
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{}", positions.len())?;
    writeln!(writer, "{box_length:.16e}")?;
    for (r, e) in positions.iter().zip(orientations) {
        writeln!(
            writer,
            "{:>24.16e}{:>24.16e}{:>24.16e}{:>24.16e}{:>24.16e}{:>24.16e}",
            r.x, r.y, r.z, e.x, e.y, e.z
        )?;
    }
    writer.flush()?;
    debug!(path = %path.display(), n = positions.len(), "wrote configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_round_trip() {
        let positions = vec![
            Vector3::new(1.25, -3.5, 0.1),
            Vector3::new(-7.123456789, 0.0, 6.02e-3),
        ];
        let orientations = vec![
            Vector3::new(0.0, 0.6, 0.8),
            Vector3::new(1.0, 1.0, 1.0).normalize(),
        ];
        let box_length = 17.3456789;

        let file = NamedTempFile::new().unwrap();
        write_configuration(file.path(), box_length, &positions, &orientations).unwrap();

        assert_eq!(read_header(file.path()).unwrap(), (2, box_length));
        let cnf = read_configuration(file.path()).unwrap();
        assert_eq!(cnf.len(), 2);
        assert_eq!(cnf.box_length, box_length);
        for (a, b) in cnf.positions.iter().zip(&positions) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
        for (a, b) in cnf.orientations.iter().zip(&orientations) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_write_rejects_mismatched_lengths() {
        let file = NamedTempFile::new().unwrap();
        let err = write_configuration(file.path(), 10.0, &[Vector3::zeros()], &[]);
        assert!(matches!(err, Err(McError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_truncated_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "3\n20.0\n0 0 0 0 0 1\n").unwrap();
        let err = read_configuration(file.path());
        assert!(matches!(err, Err(McError::Parse { .. })));
    }

    #[test]
    fn test_bad_number_reports_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1\n20.0\n0 zero 0 0 0 1").unwrap();
        match read_configuration(file.path()) {
            Err(McError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_orientation_normalised_on_read() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1\n20.0\n0 0 0 0 0 4").unwrap();
        let cnf = read_configuration(file.path()).unwrap();
        assert_relative_eq!(cnf.orientations[0], Vector3::z(), epsilon = 1e-15);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_header("/nonexistent/cnf.inp");
        assert!(matches!(err, Err(McError::Io { .. })));
    }
}
