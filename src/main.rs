//! # Facility-matrix CLI
//!
//! Command-line interface for the facility-matrix library.
//! Paths, credentials and limits come from the environment (or a `.env`
//! file); the command line only picks the step to run.

use clap::{Parser, Subcommand};
use facility_matrix::{MatrixConfig, Result};
use log::error;

mod cli;

/// Command-line interface for facility-matrix
#[derive(Parser)]
#[command(name = "facility-matrix")]
#[command(about = "Resumable driving-distance matrices for facility siting")]
#[command(long_about = "Runs one step of a facility siting study:
  facility-matrix grid       # Candidate facilities inside BOUNDARY_NAME -> ORIGINS_FILE
  facility-matrix clean      # RAW_PLANTS_FILE filtered to the boundary -> DESTINATIONS_FILE
  facility-matrix matrix     # Distance matrix ORIGINS_FILE x DESTINATIONS_FILE -> MATRIX_FILE
  facility-matrix assemble   # Rewrite MATRIX_FILE from PROGRESS_LOG without querying

Configuration (environment or .env):
  GOOGLE_API_KEY             # Required for matrix
  PROGRESS_LOG               # Checkpoint log, resumed on every run (progress_log.csv)
  MATRIX_WORKERS             # Concurrent queries (10)")]
#[command(version)]
struct Cli {
    /// Step to run (default: matrix)
    #[command(subcommand)]
    command: Option<Command>,

    /// Show what would be done without querying or writing
    #[arg(long, global = true)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Generate candidate facility locations inside the boundary
    Grid,
    /// Clean the raw plant list against the boundary
    Clean,
    /// Build the distance matrix, resuming from the checkpoint log
    Matrix,
    /// Rewrite the matrix file from the checkpoint log only
    Assemble,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine; the environment may already be set
    dotenvy::dotenv().ok();

    // Initialize logging to stderr
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();

    if cli.verbose {
        eprintln!("📍 Facility-matrix v{} starting...", env!("CARGO_PKG_VERSION"));
    }

    let config = MatrixConfig::from_env()?;

    match cli.command.unwrap_or(Command::Matrix) {
        Command::Grid => run_grid(&config, cli.dry_run).await,
        Command::Clean => run_clean(&config, cli.dry_run).await,
        Command::Matrix => run_matrix(&config, cli.dry_run).await,
        Command::Assemble => run_assemble(&config, cli.dry_run),
    }
}

async fn run_grid(config: &MatrixConfig, dry_run: bool) -> Result<()> {
    if dry_run {
        eprintln!(
            "🔍 [DRY RUN] Would generate ~{} candidates inside '{}' to {}",
            config.grid_target_points,
            config.boundary_name,
            config.origins_path.display()
        );
        return Ok(());
    }

    let points = facility_matrix::generate_candidates(config).await?;
    eprintln!("📁 Saved {} candidates to {}", points.len(), config.origins_path.display());
    Ok(())
}

async fn run_clean(config: &MatrixConfig, dry_run: bool) -> Result<()> {
    if dry_run {
        eprintln!(
            "🔍 [DRY RUN] Would clean {} against '{}' to {}",
            config.raw_plants_path.display(),
            config.boundary_name,
            config.destinations_path.display()
        );
        return Ok(());
    }

    let summary = facility_matrix::clean_plant_list(config).await?;
    eprintln!(
        "📁 Saved {} plants to {}",
        summary.kept,
        config.destinations_path.display()
    );
    Ok(())
}

async fn run_matrix(config: &MatrixConfig, dry_run: bool) -> Result<()> {
    if dry_run {
        let plan = facility_matrix::plan_matrix(config)?;
        eprintln!(
            "🔍 [DRY RUN] {} of {} pairs done, would query {} with {} workers",
            plan.completed, plan.total, plan.pending, config.workers
        );
        return Ok(());
    }

    // Sized by the first callback once the builder knows the pending count
    let progress = cli::ProgressManager::new(0, "🌐 Querying missing pairs");
    let report = facility_matrix::build_matrix_with_progress(config, progress.callback()).await?;
    progress.pb.finish_and_clear();

    let sentinels = report.matrix.sentinel_cells().len();
    eprintln!(
        "📁 Saved {}x{} matrix to {} ({} queried, {} resumed, {} without distance)",
        report.matrix.rows(),
        report.matrix.cols(),
        config.matrix_path.display(),
        report.dispatched,
        report.resumed,
        sentinels
    );
    Ok(())
}

fn run_assemble(config: &MatrixConfig, dry_run: bool) -> Result<()> {
    if dry_run {
        let plan = facility_matrix::plan_matrix(config)?;
        eprintln!(
            "🔍 [DRY RUN] {} of {} cells present in {}",
            plan.completed,
            plan.total,
            config.log_path.display()
        );
        return Ok(());
    }

    let matrix = facility_matrix::assemble_matrix(config)?;
    eprintln!(
        "📁 Saved {}x{} matrix to {}",
        matrix.rows(),
        matrix.cols(),
        config.matrix_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_matrix() {
        let cli = Cli::try_parse_from(["facility-matrix"]).unwrap();
        assert_eq!(cli.command.unwrap_or(Command::Matrix), Command::Matrix);
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["facility-matrix", "grid", "--dry-run", "-v"]).unwrap();
        assert_eq!(cli.command, Some(Command::Grid));
        assert!(cli.dry_run);
        assert!(cli.verbose);
    }

    #[test]
    fn test_rejects_path_flags() {
        assert!(Cli::try_parse_from(["facility-matrix", "--log", "x.csv"]).is_err());
    }
}
