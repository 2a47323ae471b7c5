//! Command-line adapter for the podfetch download orchestrator.
//!
//! The binary wires a [`podfetch_download::DownloadCoordinator`] to a
//! simulated transfer backend so queue ordering, retries and retention
//! policies can be exercised from a terminal.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary target only
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;
pub mod simulator;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;
pub use simulator::SimulatedDownloader;
