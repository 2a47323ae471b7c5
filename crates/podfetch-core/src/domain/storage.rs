//! Retention policies and the storage actions they produce.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rule describing which downloaded episodes to keep on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", content = "value", rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Never evict anything.
    #[default]
    KeepAll,
    /// Keep the `n` most recently published episodes.
    KeepLatest(u32),
    /// Delete episodes published more than `n` days ago.
    DeleteAfterDays(u32),
    /// Delete episodes once fully played.
    DeleteAfterPlayed,
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepAll => f.write_str("keep-all"),
            Self::KeepLatest(n) => write!(f, "keep-latest={n}"),
            Self::DeleteAfterDays(n) => write!(f, "delete-after-days={n}"),
            Self::DeleteAfterPlayed => f.write_str("delete-after-played"),
        }
    }
}

/// Error returned when a retention policy string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid retention policy '{0}' (expected keep-all, keep-latest=N, delete-after-days=N or delete-after-played)")]
pub struct ParsePolicyError(String);

impl FromStr for RetentionPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (name, value) = match trimmed.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (trimmed, None),
        };
        let parse_n = |value: Option<&str>| {
            value
                .and_then(|v| v.trim().parse::<u32>().ok())
                .ok_or_else(|| ParsePolicyError(s.to_string()))
        };

        match name {
            "keep-all" if value.is_none() => Ok(Self::KeepAll),
            "keep-latest" => parse_n(value).map(Self::KeepLatest),
            "delete-after-days" => parse_n(value).map(Self::DeleteAfterDays),
            "delete-after-played" if value.is_none() => Ok(Self::DeleteAfterPlayed),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// Side effect requested by a retention policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", content = "episode_id", rename_all = "snake_case")]
pub enum StorageAction {
    /// Remove the downloaded artifact (and any queue entry) for the episode.
    DeleteEpisode(String),
    /// Move the episode to the archive. Currently a hook only.
    ArchiveEpisode(String),
}

impl StorageAction {
    /// Episode the action targets.
    #[must_use]
    pub fn episode_id(&self) -> &str {
        match self {
            Self::DeleteEpisode(id) | Self::ArchiveEpisode(id) => id,
        }
    }
}
