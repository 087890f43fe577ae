//! Existing plant list cleaning
//!
//! Plant lists arrive as `id,lat,lon` records merged from several
//! spreadsheets. Cleaning keeps the records that can serve as matrix
//! destinations: parseable coordinates, first occurrence of each id, and
//! inside the study boundary.

use std::collections::HashSet;
use std::path::Path;

use geo::{Contains, MultiPolygon, Point};

use crate::core::coords::{Coordinate, CoordinateColumns};
use crate::core::error::{Error, Result};

/// One plant with its identifier
#[derive(Debug, Clone, PartialEq)]
pub struct PlantRecord {
    pub id: String,
    pub location: Coordinate,
}

/// Counts from a cleaning pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanSummary {
    pub kept: usize,
    pub unparseable: usize,
    pub duplicates: usize,
    pub outside: usize,
}

/// Read raw plant records; unparseable rows (headers included) are counted and skipped
pub fn read_plants(
    path: &Path,
    id_column: usize,
    columns: CoordinateColumns,
) -> Result<(Vec<PlantRecord>, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut plants = Vec::new();
    let mut skipped = 0;
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let field = |column: usize| record.get(column).map(str::trim);
        let parsed = (
            field(id_column),
            field(columns.latitude).and_then(|v| v.parse::<f64>().ok()),
            field(columns.longitude).and_then(|v| v.parse::<f64>().ok()),
        );

        match parsed {
            (Some(id), Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                plants.push(PlantRecord {
                    id: id.to_string(),
                    location: Coordinate::new(lat, lon),
                });
            }
            _ => {
                log::debug!("{} record {}: skipped {:?}", path.display(), index + 1, record);
                skipped += 1;
            }
        }
    }

    Ok((plants, skipped))
}

/// Keep the first record per id among those inside `boundary`
pub fn clean_plants(plants: Vec<PlantRecord>, boundary: &MultiPolygon<f64>) -> (Vec<PlantRecord>, CleanSummary) {
    let mut seen = HashSet::new();
    let mut summary = CleanSummary::default();
    let mut kept = Vec::with_capacity(plants.len());

    for plant in plants {
        if !seen.insert(plant.id.clone()) {
            summary.duplicates += 1;
            continue;
        }
        let point = Point::new(plant.location.longitude, plant.location.latitude);
        if !boundary.contains(&point) {
            log::debug!("Plant {} at {} is outside the boundary", plant.id, plant.location);
            summary.outside += 1;
            continue;
        }
        kept.push(plant);
    }

    summary.kept = kept.len();
    (kept, summary)
}

/// Write `id,lat,lon` records, the destination layout the matrix reads
pub fn write_plants(path: &Path, plants: &[PlantRecord]) -> Result<()> {
    if plants.is_empty() {
        return Err(Error::InvalidInput("no plants left after cleaning".to_string()));
    }
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    for plant in plants {
        writer.write_record([
            plant.id.clone(),
            plant.location.latitude.to_string(),
            plant.location.longitude.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
