//! Resumable distance-matrix builder
//!
//! The coordinator owns every piece of mutable state: the checkpoint
//! writer, the loaded results and the results of the current session.
//! Workers are plain futures that turn one [`Task`] into one
//! [`CheckpointRecord`]; at most `workers` of them are in flight, and the
//! coordinator consumes them in completion order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;

use crate::core::checkpoint::{CheckpointRecord, CheckpointState, CheckpointWriter, MatrixKey};
use crate::core::classifier::classify;
use crate::core::client::DistanceQuery;
use crate::core::config::MatrixConfig;
use crate::core::coords::Coordinate;
use crate::core::error::{Error, Result};
use crate::core::matrix::ResultMatrix;

/// Progress callback receiving (completed, total) for the current session
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// One distance query still to be made
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Task {
    pub origin_index: usize,
    pub destination_index: usize,
    pub origin: Coordinate,
    pub destination: Coordinate,
}

impl Task {
    pub fn key(&self) -> MatrixKey {
        (self.origin_index, self.destination_index)
    }
}

/// Origin-major cross product of both sets, minus keys already completed
pub fn pending_tasks<'a>(
    origins: &'a [Coordinate],
    destinations: &'a [Coordinate],
    state: &'a CheckpointState,
) -> impl Iterator<Item = Task> + 'a {
    origins.iter().enumerate().flat_map(move |(origin_index, origin)| {
        destinations
            .iter()
            .enumerate()
            .map(move |(destination_index, destination)| Task {
                origin_index,
                destination_index,
                origin: *origin,
                destination: *destination,
            })
            .filter(move |task| !state.is_completed(&task.key()))
    })
}

/// Options for a matrix build
#[derive(Clone)]
pub struct BuildOptions {
    /// Checkpoint log, read at start and appended during the run
    pub log_path: PathBuf,

    /// Final matrix file
    pub matrix_path: PathBuf,

    /// Maximum concurrent queries
    pub workers: usize,

    /// Flush and report progress every this many completions
    pub flush_every: usize,

    /// Optional progress callback
    pub progress: Option<ProgressCallback>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from_config(&MatrixConfig::default())
    }
}

impl BuildOptions {
    pub fn from_config(config: &MatrixConfig) -> Self {
        Self {
            log_path: config.log_path.clone(),
            matrix_path: config.matrix_path.clone(),
            workers: config.workers,
            flush_every: config.flush_every,
            progress: None,
        }
    }
}

/// Work a build would do, without doing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPlan {
    /// Cells in the full grid
    pub total: usize,
    /// Grid cells already in the checkpoint log
    pub completed: usize,
    /// Queries that would be dispatched
    pub pending: usize,
}

/// Outcome of a successful build
#[derive(Debug)]
pub struct BuildReport {
    /// Queries issued in this session
    pub dispatched: usize,
    /// Grid cells taken from the existing log
    pub resumed: usize,
    pub matrix: ResultMatrix,
}

/// Builds an origin × destination matrix through a [`DistanceQuery`]
pub struct MatrixBuilder<Q> {
    query: Q,
    options: BuildOptions,
}

impl<Q: DistanceQuery> MatrixBuilder<Q> {
    pub fn new(query: Q, options: BuildOptions) -> Self {
        Self { query, options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Count finished and outstanding cells against the current log
    pub fn plan(&self, origins: &[Coordinate], destinations: &[Coordinate]) -> Result<RunPlan> {
        plan_run(&self.options.log_path, origins, destinations)
    }

    /// Run every outstanding query, then assemble and write the matrix
    pub async fn build(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<BuildReport> {
        validate_inputs(origins, destinations)?;
        if self.options.workers == 0 {
            return Err(Error::InvalidInput("worker count must be at least 1".to_string()));
        }

        let log_path = &self.options.log_path;
        let mut state = CheckpointState::load(log_path)?;
        if !state.is_empty() {
            log::info!(
                "Found existing log file '{}'. Resuming with {} completed requests",
                log_path.display(),
                state.len()
            );
        }

        let total_cells = origins.len() * destinations.len();
        let pending = pending_tasks(origins, destinations, &state).count();
        let resumed = total_cells - pending;
        log::info!("Processing {pending} requests ({resumed} of {total_cells} already completed)");

        let mut session = Vec::with_capacity(pending);
        if pending > 0 {
            let mut writer = CheckpointWriter::open(log_path, self.options.flush_every).await?;
            let query = &self.query;
            // A progress bar already shows these counts
            let progress_level = if self.options.progress.is_some() {
                log::Level::Debug
            } else {
                log::Level::Info
            };

            let stream = futures::stream::iter(pending_tasks(origins, destinations, &state))
                .map(move |task| async move {
                    log::trace!("Querying {} -> {}", task.origin, task.destination);
                    let outcome = query.query(task.origin, task.destination).await;
                    CheckpointRecord::new(task.origin_index, task.destination_index, classify(outcome))
                })
                .buffer_unordered(self.options.workers);

            tokio::pin!(stream);

            let mut completed = 0usize;
            while let Some(record) = stream.next().await {
                // Appended before progress reports it
                writer.append(&record).await?;
                completed += 1;

                if let Some(ref progress) = self.options.progress {
                    progress(completed as u64, pending as u64);
                }
                if completed % self.options.flush_every.max(1) == 0 {
                    log::log!(progress_level, "Session progress: {completed}/{pending}");
                }
                session.push(record);
            }

            writer.finish().await?;
            log::log!(progress_level, "Session complete: {completed}/{pending}");
        }

        for record in session {
            state.record(record.key(), record.value);
        }

        let matrix = write_matrix(
            &state,
            origins.len(),
            destinations.len(),
            &self.options.matrix_path,
        )?;

        Ok(BuildReport {
            dispatched: pending,
            resumed,
            matrix,
        })
    }
}

/// Count finished and outstanding cells for `log_path`
pub fn plan_run(
    log_path: &Path,
    origins: &[Coordinate],
    destinations: &[Coordinate],
) -> Result<RunPlan> {
    validate_inputs(origins, destinations)?;
    let state = CheckpointState::load(log_path)?;
    let total = origins.len() * destinations.len();
    let pending = pending_tasks(origins, destinations, &state).count();
    Ok(RunPlan {
        total,
        completed: total - pending,
        pending,
    })
}

/// Rebuild the matrix from the checkpoint log alone, issuing no queries
pub fn assemble_from_log(
    log_path: &Path,
    rows: usize,
    cols: usize,
    matrix_path: &Path,
) -> Result<ResultMatrix> {
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidInput(format!(
            "cannot assemble a {rows}x{cols} matrix"
        )));
    }
    let state = CheckpointState::load(log_path)?;
    write_matrix(&state, rows, cols, matrix_path)
}

/// Assemble the full grid and write it; nothing is written on a gap
fn write_matrix(
    state: &CheckpointState,
    rows: usize,
    cols: usize,
    matrix_path: &Path,
) -> Result<ResultMatrix> {
    let matrix = ResultMatrix::assemble(rows, cols, state.results())?;
    report_sentinels(&matrix);

    matrix.write_csv(matrix_path)?;
    log::info!("Wrote {rows}x{cols} matrix to {}", matrix_path.display());
    Ok(matrix)
}

fn validate_inputs(origins: &[Coordinate], destinations: &[Coordinate]) -> Result<()> {
    if origins.is_empty() {
        return Err(Error::InvalidInput("origin set is empty".to_string()));
    }
    if destinations.is_empty() {
        return Err(Error::InvalidInput("destination set is empty".to_string()));
    }
    Ok(())
}

/// Flag sentinel cells for manual review (points in water and the like)
fn report_sentinels(matrix: &ResultMatrix) {
    let sentinels = matrix.sentinel_cells();
    if sentinels.is_empty() {
        return;
    }
    for (row, col, value) in &sentinels {
        log::warn!("Cell ({row}, {col}): {value}");
    }
    log::warn!("{} of {} cells hold no distance", sentinels.len(), matrix.rows() * matrix.cols());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::DistanceValue;
    use crate::core::client::{DistanceMatrixResponse, QueryError};
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Answers with the rounded latitude difference in km, and counts calls
    struct FakeRouter {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeRouter {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl DistanceQuery for FakeRouter {
        fn query(
            &self,
            origin: Coordinate,
            destination: Coordinate,
        ) -> impl Future<Output = std::result::Result<DistanceMatrixResponse, QueryError>> + Send
        {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                let km = ((origin.latitude - destination.latitude).abs() * 100.0).round() as u64;
                Ok(DistanceMatrixResponse::with_distance(km * 1000))
            }
        }
    }

    fn grid(n: usize) -> Vec<Coordinate> {
        (0..n)
            .map(|i| Coordinate::new(42.0 + i as f64 / 10.0, -71.0))
            .collect()
    }

    fn options_in(dir: &std::path::Path, workers: usize) -> BuildOptions {
        BuildOptions {
            log_path: dir.join("progress_log.csv"),
            matrix_path: dir.join("distance_matrix.csv"),
            workers,
            flush_every: 3,
            progress: None,
        }
    }

    #[test]
    fn test_pending_tasks_order_and_filter() {
        let origins = grid(2);
        let destinations = grid(3);
        let mut state = CheckpointState::default();
        state.record((0, 1), DistanceValue::Meters(1));
        state.record((1, 2), DistanceValue::NetError);

        let keys: Vec<MatrixKey> = pending_tasks(&origins, &destinations, &state)
            .map(|t| t.key())
            .collect();
        assert_eq!(keys, vec![(0, 0), (0, 2), (1, 0), (1, 1)]);

        let first = pending_tasks(&origins, &destinations, &state).next().unwrap();
        assert_eq!(first.origin, origins[0]);
        assert_eq!(first.destination, destinations[0]);
    }

    #[tokio::test]
    async fn test_build_respects_worker_limit() {
        let dir = tempdir().unwrap();
        let router = Arc::new(FakeRouter::new());
        let builder = MatrixBuilder::new(Arc::clone(&router), options_in(dir.path(), 3));

        let report = builder.build(&grid(4), &grid(5)).await.unwrap();

        assert_eq!(report.dispatched, 20);
        assert_eq!(router.calls.load(Ordering::SeqCst), 20);
        assert!(router.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(report.matrix.get(3, 0), Some(&DistanceValue::Meters(30_000)));
        assert_eq!(report.matrix.get(2, 2), Some(&DistanceValue::Meters(0)));
    }

    #[tokio::test]
    async fn test_build_reports_progress() {
        let dir = tempdir().unwrap();
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let mut options = options_in(dir.path(), 2);
        options.progress = Some(Arc::new({
            let ticks = Arc::clone(&ticks);
            move |done: u64, total: u64| ticks.lock().unwrap().push((done, total))
        }));

        let builder = MatrixBuilder::new(FakeRouter::new(), options);
        builder.build(&grid(2), &grid(2)).await.unwrap();

        assert_eq!(*ticks.lock().unwrap(), vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    }

    #[tokio::test]
    async fn test_plan_counts_pending() {
        let dir = tempdir().unwrap();
        let options = options_in(dir.path(), 2);
        std::fs::write(
            &options.log_path,
            "Row_Index,Col_Index,Distance_Value\n0,0,10\n1,1,ZERO_RESULTS\n5,5,3\n",
        )
        .unwrap();

        let builder = MatrixBuilder::new(FakeRouter::new(), options);
        let plan = builder.plan(&grid(2), &grid(3)).unwrap();
        assert_eq!(plan, RunPlan { total: 6, completed: 2, pending: 4 });
    }

    #[tokio::test]
    async fn test_build_rejects_empty_sets() {
        let dir = tempdir().unwrap();
        let builder = MatrixBuilder::new(FakeRouter::new(), options_in(dir.path(), 2));

        assert!(matches!(
            builder.build(&[], &grid(2)).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            builder.build(&grid(2), &[]).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(!dir.path().join("progress_log.csv").exists());
    }

    #[tokio::test]
    async fn test_build_rejects_zero_workers() {
        let dir = tempdir().unwrap();
        let builder = MatrixBuilder::new(FakeRouter::new(), options_in(dir.path(), 0));
        assert!(builder.build(&grid(1), &grid(1)).await.is_err());
    }

    #[test]
    fn test_assemble_from_log_refuses_gaps() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("progress_log.csv");
        let matrix_path = dir.path().join("distance_matrix.csv");
        std::fs::write(&log_path, "Row_Index,Col_Index,Distance_Value\n0,0,5000\n").unwrap();

        let err = assemble_from_log(&log_path, 2, 1, &matrix_path).unwrap_err();
        assert!(matches!(err, Error::MissingResult { row: 1, col: 0 }));
        assert!(!matrix_path.exists());

        std::fs::write(
            &log_path,
            "Row_Index,Col_Index,Distance_Value\n0,0,5000\n1,0,NET_ERR\n",
        )
        .unwrap();
        let matrix = assemble_from_log(&log_path, 2, 1, &matrix_path).unwrap();
        assert_eq!(matrix.get(1, 0), Some(&DistanceValue::NetError));
        assert_eq!(std::fs::read_to_string(&matrix_path).unwrap(), "5000\nNET_ERR\n");
    }

    #[test]
    fn test_assemble_from_log_rejects_empty_dimensions() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("progress_log.csv");
        let matrix_path = dir.path().join("distance_matrix.csv");
        std::fs::write(&log_path, "Row_Index,Col_Index,Distance_Value\n0,0,5000\n").unwrap();

        assert!(matches!(
            assemble_from_log(&log_path, 0, 3, &matrix_path),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            assemble_from_log(&log_path, 2, 0, &matrix_path),
            Err(Error::InvalidInput(_))
        ));
        assert!(!matrix_path.exists());

        // An existing matrix is left alone
        std::fs::write(&matrix_path, "5000\n").unwrap();
        assert!(assemble_from_log(&log_path, 0, 1, &matrix_path).is_err());
        assert_eq!(std::fs::read_to_string(&matrix_path).unwrap(), "5000\n");
    }

    #[tokio::test]
    async fn test_build_fails_when_log_unwritable() {
        let dir = tempdir().unwrap();
        let mut options = options_in(dir.path(), 2);
        options.log_path = dir.path().join("missing-dir").join("log.csv");

        let builder = MatrixBuilder::new(FakeRouter::new(), options);
        let err = builder.build(&grid(1), &grid(1)).await.unwrap_err();
        assert!(matches!(err, Error::IoError(_)), "{err:?}");
        assert!(!dir.path().join("distance_matrix.csv").exists());
    }
}
