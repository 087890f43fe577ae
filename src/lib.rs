//! # Facility-matrix Library
//!
//! Tools for a facility siting study: candidate facility grids inside a
//! state boundary, cleaned plant lists, and a resumable driving-distance
//! matrix between the two built through a distance-matrix API.
//!
//! ## Features
//!
//! - **Resumable**: every answered query is appended to a checkpoint log and
//!   never paid for twice across restarts
//! - **Bounded concurrency**: a fixed number of queries in flight
//! - **Failure isolation**: a failed query degrades one cell to a sentinel
//!   (`ZERO_RESULTS`, `API_ERR_<status>`, `NET_ERR`) instead of aborting
//! - **All or nothing output**: the matrix file is written only when every
//!   cell has a result
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = facility_matrix::MatrixConfig::from_env()?;
//!     let report = facility_matrix::build_matrix(&config).await?;
//!     println!("{} queries, {} resumed", report.dispatched, report.resumed);
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Distance Sources
//!
//! ```rust,no_run
//! use facility_matrix::{BuildOptions, Coordinate, DistanceMatrixResponse, DistanceQuery, MatrixBuilder, QueryError};
//! use std::future::Future;
//!
//! struct Straight;
//!
//! impl DistanceQuery for Straight {
//!     fn query(
//!         &self,
//!         _origin: Coordinate,
//!         _destination: Coordinate,
//!     ) -> impl Future<Output = Result<DistanceMatrixResponse, QueryError>> + Send {
//!         async { Ok(DistanceMatrixResponse::with_distance(1000)) }
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let builder = MatrixBuilder::new(Straight, BuildOptions::default());
//! let origins = [Coordinate::new(42.0, -71.0)];
//! let plants = [Coordinate::new(42.2, -71.2)];
//! builder.build(&origins, &plants).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

// Re-export core types that users might need
pub use crate::core::boundary::{fetch_boundary, parse_boundary};
pub use crate::core::builder::{
    assemble_from_log, pending_tasks, plan_run, BuildOptions, BuildReport, MatrixBuilder,
    ProgressCallback, RunPlan, Task,
};
pub use crate::core::checkpoint::{CheckpointRecord, CheckpointState, CheckpointWriter, MatrixKey};
pub use crate::core::classifier::{classify, DistanceValue};
pub use crate::core::client::{DistanceMatrixResponse, DistanceQuery, HttpDistanceClient, QueryError};
pub use crate::core::config::MatrixConfig;
pub use crate::core::coords::{read_coordinates, write_coordinates, Coordinate, CoordinateColumns};
pub use crate::core::error::{Error, Result};
pub use crate::core::grid::generate_grid_points;
pub use crate::core::matrix::ResultMatrix;
pub use crate::core::plants::{clean_plants, read_plants, write_plants, CleanSummary, PlantRecord};

// Internal modules
mod core;

/// Build the distance matrix described by `config`
///
/// Reads both coordinate lists, resumes from the checkpoint log, queries the
/// configured API for every missing pair and writes the matrix file.
pub async fn build_matrix(config: &MatrixConfig) -> Result<BuildReport> {
    build_matrix_with_options(config, BuildOptions::from_config(config)).await
}

/// Build the distance matrix with a progress callback receiving (completed, total)
pub async fn build_matrix_with_progress<F>(config: &MatrixConfig, progress: F) -> Result<BuildReport>
where
    F: Fn(u64, u64) + Send + Sync + 'static,
{
    let options = BuildOptions {
        progress: Some(Arc::new(progress)),
        ..BuildOptions::from_config(config)
    };
    build_matrix_with_options(config, options).await
}

async fn build_matrix_with_options(config: &MatrixConfig, options: BuildOptions) -> Result<BuildReport> {
    let (origins, destinations) = read_inputs(config)?;
    let client = HttpDistanceClient::from_config(config)?;
    MatrixBuilder::new(client, options)
        .build(&origins, &destinations)
        .await
}

/// Report how much of the matrix is done without issuing queries
pub fn plan_matrix(config: &MatrixConfig) -> Result<RunPlan> {
    let (origins, destinations) = read_inputs(config)?;
    plan_run(&config.log_path, &origins, &destinations)
}

/// Rewrite the matrix file from the checkpoint log without issuing queries
pub fn assemble_matrix(config: &MatrixConfig) -> Result<ResultMatrix> {
    let (origins, destinations) = read_inputs(config)?;
    assemble_from_log(
        &config.log_path,
        origins.len(),
        destinations.len(),
        &config.matrix_path,
    )
}

/// Generate candidate facilities inside the configured boundary and write them as origins
pub async fn generate_candidates(config: &MatrixConfig) -> Result<Vec<Coordinate>> {
    let boundary = fetch_boundary(&config.boundary_url, &config.boundary_name).await?;
    let points = generate_grid_points(&boundary, config.grid_target_points);
    if points.is_empty() {
        return Err(Error::InvalidInput(format!(
            "no grid points fall inside '{}'",
            config.boundary_name
        )));
    }
    write_coordinates(&config.origins_path, &points)?;
    log::info!("Wrote {} candidates to {}", points.len(), config.origins_path.display());
    Ok(points)
}

/// Clean the raw plant list against the configured boundary and write the destinations file
pub async fn clean_plant_list(config: &MatrixConfig) -> Result<CleanSummary> {
    let boundary = fetch_boundary(&config.boundary_url, &config.boundary_name).await?;
    let (plants, unparseable) = read_plants(&config.raw_plants_path, 0, config.destination_columns)?;
    let (kept, mut summary) = clean_plants(plants, &boundary);
    summary.unparseable = unparseable;

    write_plants(&config.destinations_path, &kept)?;
    log::info!(
        "Kept {} plants ({} unparseable, {} duplicates, {} outside '{}')",
        summary.kept,
        summary.unparseable,
        summary.duplicates,
        summary.outside,
        config.boundary_name
    );
    Ok(summary)
}

fn read_inputs(config: &MatrixConfig) -> Result<(Vec<Coordinate>, Vec<Coordinate>)> {
    let origins = read_coordinates(&config.origins_path, config.origin_columns)?;
    let destinations = read_coordinates(&config.destinations_path, config.destination_columns)?;
    log::info!(
        "Loaded {} candidate facilities and {} plants",
        origins.len(),
        destinations.len()
    );
    Ok((origins, destinations))
}
