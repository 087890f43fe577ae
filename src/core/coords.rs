//! Coordinate lists for facility-matrix
//!
//! Inputs are headerless delimited text with one coordinate per record.
//! Column positions differ per source, so they are passed in.

use std::fmt;
use std::path::Path;

use crate::core::error::{Error, Result};

/// A (latitude, longitude) pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Renders as `lat,lon`, the form the distance API expects
impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Zero-based column positions of latitude and longitude in a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateColumns {
    pub latitude: usize,
    pub longitude: usize,
}

/// Read an ordered coordinate list; record position is the matrix index
pub fn read_coordinates(path: &Path, columns: CoordinateColumns) -> Result<Vec<Coordinate>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut coordinates = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let latitude = parse_field(path, index, &record, columns.latitude)?;
        let longitude = parse_field(path, index, &record, columns.longitude)?;
        coordinates.push(Coordinate::new(latitude, longitude));
    }

    log::debug!("Read {} coordinates from {}", coordinates.len(), path.display());
    Ok(coordinates)
}

fn parse_field(path: &Path, index: usize, record: &csv::StringRecord, column: usize) -> Result<f64> {
    let raw = record.get(column).ok_or_else(|| {
        Error::InvalidInput(format!(
            "{} record {}: missing column {}",
            path.display(),
            index + 1,
            column
        ))
    })?;
    raw.trim().parse::<f64>().map_err(|_| {
        Error::InvalidInput(format!(
            "{} record {}: '{}' is not a number",
            path.display(),
            index + 1,
            raw
        ))
    })
}

/// Write coordinates as headerless `lat,lon` records
pub fn write_coordinates(path: &Path, coordinates: &[Coordinate]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    for c in coordinates {
        writer.write_record([c.latitude.to_string(), c.longitude.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_display_is_api_form() {
        assert_eq!(Coordinate::new(42.5, -71.25).to_string(), "42.5,-71.25");
    }

    #[test]
    fn test_read_origin_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("facilities.csv");
        std::fs::write(&path, "42.0,-71.0\n42.1,-71.1\n").unwrap();

        let coords = read_coordinates(&path, CoordinateColumns { latitude: 0, longitude: 1 }).unwrap();
        assert_eq!(coords, vec![Coordinate::new(42.0, -71.0), Coordinate::new(42.1, -71.1)]);
    }

    #[test]
    fn test_read_skips_leading_identifier() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plants.csv");
        std::fs::write(&path, "plant-a,42.2,-71.2\nplant-b, 42.3 ,-71.3\n").unwrap();

        let coords = read_coordinates(&path, CoordinateColumns { latitude: 1, longitude: 2 }).unwrap();
        assert_eq!(coords, vec![Coordinate::new(42.2, -71.2), Coordinate::new(42.3, -71.3)]);
    }

    #[test]
    fn test_read_rejects_bad_numbers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "42.0,-71.0\nnorth,-71.1\n").unwrap();

        let err = read_coordinates(&path, CoordinateColumns { latitude: 0, longitude: 1 }).unwrap_err();
        match err {
            Error::InvalidInput(msg) => assert!(msg.contains("record 2"), "{msg}"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_read_rejects_short_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.csv");
        std::fs::write(&path, "id-only,42.0\n").unwrap();

        let err = read_coordinates(&path, CoordinateColumns { latitude: 1, longitude: 2 }).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("missing column 2")));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let coords = vec![Coordinate::new(41.5, -70.75)];
        write_coordinates(&path, &coords).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "41.5,-70.75\n");
    }
}
