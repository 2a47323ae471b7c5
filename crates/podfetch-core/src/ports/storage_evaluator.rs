//! Storage evaluator port.
//!
//! Maps a retention policy and a podcast's episodes to the storage actions
//! the coordinator should carry out. Implementations must be side-effect free.

use crate::domain::{Episode, RetentionPolicy, StorageAction};

/// Port for retention policy evaluation.
pub trait StorageEvaluatorPort: Send + Sync {
    /// Decide which actions `policy` requires for `episodes`.
    fn evaluate(&self, policy: RetentionPolicy, episodes: &[Episode]) -> Vec<StorageAction>;
}
