//! Evict command handler.
//!
//! Evaluates a retention policy over episodes read from a JSON file and
//! prints the resulting storage actions. Nothing is deleted.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};

use podfetch_core::domain::{Episode, RetentionPolicy, StorageAction};
use podfetch_download::StorageEvictionEvaluator;

use crate::error::CliError;

/// Read a JSON array of episodes.
pub fn read_episodes(path: &Path) -> Result<Vec<Episode>, CliError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&contents)
        .map_err(|e| CliError::Input(format!("{}: {e}", path.display())))
}

/// Storage actions `policy` requires for the episodes in `path`.
pub fn evaluate_file(
    path: &Path,
    policy: RetentionPolicy,
    now: DateTime<Utc>,
) -> Result<Vec<StorageAction>, CliError> {
    let episodes = read_episodes(path)?;
    let actions = StorageEvictionEvaluator::new().evaluate(policy, &episodes, now);
    tracing::info!(
        policy = %policy,
        episodes = episodes.len(),
        actions = actions.len(),
        "Retention policy evaluated"
    );
    Ok(actions)
}

/// Execute the evict command.
pub fn execute(path: &Path, policy: RetentionPolicy, now: Option<DateTime<Utc>>) -> Result<()> {
    let actions = evaluate_file(path, policy, now.unwrap_or_else(Utc::now))?;
    println!("{}", serde_json::to_string_pretty(&actions)?);
    Ok(())
}
