//! Subcommands of the `podfetch` binary.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Subcommand;

use podfetch_core::domain::RetentionPolicy;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Queue demo episodes against a simulated downloader and watch them run
    Simulate {
        /// Number of demo episodes to detect
        #[arg(short, long, default_value = "5")]
        episodes: u32,
        /// Episode whose transfers always fail (repeatable, e.g. "demo-2")
        #[arg(long = "fail", value_name = "EPISODE_ID")]
        fail: Vec<String>,
        /// Retention policy applied once the queue settles
        /// (keep-all, keep-latest=N, delete-after-days=N, delete-after-played)
        #[arg(short, long)]
        policy: Option<RetentionPolicy>,
        /// Override every retry delay with this many seconds
        #[arg(long, value_name = "SECS")]
        retry_delay: Option<u64>,
        /// Time between simulated progress reports, in milliseconds
        #[arg(long, default_value = "150")]
        step_ms: u64,
    },

    /// Print the storage actions a retention policy requires
    Evict {
        /// Retention policy to evaluate
        #[arg(short, long)]
        policy: RetentionPolicy,
        /// JSON file containing an array of episodes
        #[arg(short, long, value_name = "FILE")]
        episodes: PathBuf,
        /// Evaluate as of this instant (RFC 3339) instead of now
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
}
