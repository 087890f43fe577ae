//! CLI-specific progress handling for facility-matrix
//!
//! Provides progress bar implementation for the command-line interface.

use indicatif::{ProgressBar, ProgressStyle};

/// Creates a progress bar counting distance queries
pub fn create_progress_bar(total_requests: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_requests);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} requests ({percent}%) {per_sec} ETA: {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
    );
    pb
}

/// Progress manager for a matrix session
pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_requests: u64, message: &str) -> Self {
        let pb = create_progress_bar(total_requests);

        // Print initial message to stderr
        eprintln!("{}", message);

        Self { pb }
    }

    /// Callback suitable for `build_matrix_with_progress`
    pub fn callback(&self) -> impl Fn(u64, u64) + Send + Sync + 'static {
        let pb = self.pb.clone();
        move |completed, total| {
            if pb.length().unwrap_or(0) != total {
                pb.set_length(total);
            }
            pb.set_position(completed);
            if completed >= total {
                pb.finish_with_message("✅ Session completed!");
            }
        }
    }
}
