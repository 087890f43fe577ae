//! Dense origin × destination result matrix

use std::collections::HashMap;
use std::path::Path;

use crate::core::checkpoint::MatrixKey;
use crate::core::classifier::DistanceValue;
use crate::core::error::{Error, Result};

/// Row-major matrix of results; only ever built fully populated
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<DistanceValue>,
}

impl ResultMatrix {
    /// Pull every cell of the `rows` × `cols` grid out of `results`
    ///
    /// Fails on the first cell without a result rather than producing a
    /// partially populated matrix. Keys outside the grid are ignored.
    pub fn assemble(
        rows: usize,
        cols: usize,
        results: &HashMap<MatrixKey, DistanceValue>,
    ) -> Result<Self> {
        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let value = results
                    .get(&(row, col))
                    .ok_or(Error::MissingResult { row, col })?;
                cells.push(value.clone());
            }
        }
        Ok(Self { rows, cols, cells })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&DistanceValue> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> Option<&[DistanceValue]> {
        (row < self.rows).then(|| &self.cells[row * self.cols..(row + 1) * self.cols])
    }

    /// Cells holding a sentinel instead of a distance, in row-major order
    pub fn sentinel_cells(&self) -> Vec<(usize, usize, &DistanceValue)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, value)| value.is_sentinel())
            .map(|(idx, value)| (idx / self.cols, idx % self.cols, value))
            .collect()
    }

    /// Write `rows` headerless records of `cols` fields each
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
        for row in self.cells.chunks(self.cols.max(1)) {
            writer.write_record(row.iter().map(|value| value.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn results(entries: &[((usize, usize), DistanceValue)]) -> HashMap<MatrixKey, DistanceValue> {
        entries.iter().cloned().collect()
    }

    #[test]
    fn test_assemble_complete_grid() {
        let map = results(&[
            ((0, 0), DistanceValue::Meters(10)),
            ((0, 1), DistanceValue::ZeroResults),
            ((1, 0), DistanceValue::Meters(30)),
            ((1, 1), DistanceValue::Meters(40)),
            ((9, 9), DistanceValue::Meters(99)),
        ]);

        let matrix = ResultMatrix::assemble(2, 2, &map).unwrap();
        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.cols(), 2);
        assert_eq!(matrix.get(1, 0), Some(&DistanceValue::Meters(30)));
        assert_eq!(matrix.get(2, 0), None);
        assert_eq!(
            matrix.row(0).unwrap(),
            &[DistanceValue::Meters(10), DistanceValue::ZeroResults]
        );
        assert_eq!(matrix.sentinel_cells(), vec![(0, 1, &DistanceValue::ZeroResults)]);
    }

    #[test]
    fn test_assemble_reports_first_gap() {
        let map = results(&[
            ((0, 0), DistanceValue::Meters(10)),
            ((1, 1), DistanceValue::Meters(40)),
        ]);

        match ResultMatrix::assemble(2, 2, &map).unwrap_err() {
            Error::MissingResult { row, col } => assert_eq!((row, col), (0, 1)),
            other => panic!("Expected MissingResult, got {other:?}"),
        }
    }

    #[test]
    fn test_write_csv_row_major() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("matrix.csv");
        let map = results(&[
            ((0, 0), DistanceValue::Meters(5000)),
            ((0, 1), DistanceValue::ApiError("INVALID_REQUEST".into())),
            ((1, 0), DistanceValue::NetError),
            ((1, 1), DistanceValue::Meters(7)),
        ]);

        ResultMatrix::assemble(2, 2, &map).unwrap().write_csv(&path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "5000,API_ERR_INVALID_REQUEST\nNET_ERR,7\n"
        );
    }
}
