//! Checkpoint log for resumable matrix runs
//!
//! The log is append-only delimited text:
//!
//! ```text
//! Row_Index,Col_Index,Distance_Value
//! 0,0,5000
//! 1,0,NET_ERR
//! ```
//!
//! Records appear in completion order. Loading re-keys them by
//! `(row, col)` and the last record for a key wins.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::core::classifier::DistanceValue;
use crate::core::error::{Error, Result};

/// Header record of every checkpoint log
pub const LOG_HEADER: [&str; 3] = ["Row_Index", "Col_Index", "Distance_Value"];

/// (origin index, destination index)
pub type MatrixKey = (usize, usize);

/// One completed query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    #[serde(rename = "Row_Index")]
    pub row: usize,
    #[serde(rename = "Col_Index")]
    pub col: usize,
    #[serde(rename = "Distance_Value")]
    pub value: DistanceValue,
}

impl CheckpointRecord {
    pub fn new(row: usize, col: usize, value: DistanceValue) -> Self {
        Self { row, col, value }
    }

    pub fn key(&self) -> MatrixKey {
        (self.row, self.col)
    }
}

/// In-memory view of everything already paid for
#[derive(Debug, Default, Clone)]
pub struct CheckpointState {
    results: HashMap<MatrixKey, DistanceValue>,
    records_read: usize,
}

impl CheckpointState {
    /// Load a checkpoint log; a missing file is an empty state
    ///
    /// A final record without its line terminator is a torn write from an
    /// interrupted run and is dropped so that key gets queried again.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No checkpoint log at {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let torn = !bytes.is_empty() && !bytes.ends_with(b"\n");
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes.as_slice());

        let mut records: Vec<csv::Result<CheckpointRecord>> = reader.deserialize().collect();
        if torn && records.pop().is_some() {
            log::warn!(
                "Discarding incomplete final record of {}; it will be queried again",
                path.display()
            );
        }

        let mut state = Self::default();
        for record in records {
            let record = record.map_err(|e| corrupt(path, &e))?;
            state.record(record.key(), record.value);
            state.records_read += 1;
        }

        if state.records_read > state.results.len() {
            log::debug!(
                "{} duplicate records in {}; last value per key kept",
                state.records_read - state.results.len(),
                path.display()
            );
        }

        Ok(state)
    }

    pub fn is_completed(&self, key: &MatrixKey) -> bool {
        self.results.contains_key(key)
    }

    pub fn get(&self, key: &MatrixKey) -> Option<&DistanceValue> {
        self.results.get(key)
    }

    /// Store a result, replacing any earlier value for the key
    pub fn record(&mut self, key: MatrixKey, value: DistanceValue) {
        self.results.insert(key, value);
    }

    /// Number of distinct completed keys
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Records read from disk, duplicates included
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    pub fn results(&self) -> &HashMap<MatrixKey, DistanceValue> {
        &self.results
    }
}

fn corrupt(path: &Path, err: &csv::Error) -> Error {
    Error::CorruptLog {
        path: path.to_path_buf(),
        line: err.position().map(|p| p.line()).unwrap_or(0),
        reason: err.to_string(),
    }
}

/// Appending handle to the checkpoint log, owned by the coordinator
///
/// Records are encoded with `csv` and written through a tokio file, which is
/// flushed every `flush_every` appends and once more on `finish`.
pub struct CheckpointWriter {
    path: PathBuf,
    file: File,
    flush_every: usize,
    unflushed: usize,
    appended: usize,
}

impl CheckpointWriter {
    /// Open the log for appending, creating it with a header if needed
    pub async fn open(path: &Path, flush_every: usize) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .await?;

        let len = drop_torn_tail(&mut file).await?;

        if len == 0 {
            log::info!("Creating checkpoint log {}", path.display());
            let header = encode(|w| w.write_record(LOG_HEADER))?;
            file.write_all(&header).await?;
            file.flush().await?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            flush_every: flush_every.max(1),
            unflushed: 0,
            appended: 0,
        })
    }

    /// Append one record; flushed every `flush_every` appends
    pub async fn append(&mut self, record: &CheckpointRecord) -> Result<()> {
        let line = encode(|w| w.serialize(record))?;
        self.file.write_all(&line).await?;
        self.appended += 1;
        self.unflushed += 1;

        if self.unflushed >= self.flush_every {
            self.flush().await?;
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.file.flush().await?;
        self.unflushed = 0;
        Ok(())
    }

    /// Flush remaining records and return how many were appended
    pub async fn finish(mut self) -> Result<usize> {
        self.flush().await?;
        self.file.sync_data().await?;
        log::debug!("Appended {} records to {}", self.appended, self.path.display());
        Ok(self.appended)
    }
}

/// Encode records as complete, newline-terminated log lines
fn encode<F>(write: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut csv::Writer<Vec<u8>>) -> csv::Result<()>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    write(&mut writer)?;
    writer.into_inner().map_err(|e| Error::IoError(e.into_error()))
}

/// Truncate an unterminated trailing record left by an interrupted write
///
/// Returns the resulting file length.
async fn drop_torn_tail(file: &mut File) -> Result<u64> {
    let len = file.metadata().await?.len();
    if len == 0 {
        return Ok(0);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1)).await?;
    file.read_exact(&mut last).await?;
    if last[0] == b'\n' {
        return Ok(len);
    }

    let mut contents = Vec::with_capacity(len as usize);
    file.seek(SeekFrom::Start(0)).await?;
    file.read_to_end(&mut contents).await?;
    let keep = contents
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|pos| pos as u64 + 1)
        .unwrap_or(0);

    log::warn!("Truncating incomplete trailing record ({} bytes)", len - keep);
    file.set_len(keep).await?;
    Ok(keep)
}
