//! Core domain types.
//!
//! These types represent the pure domain model, independent of any
//! infrastructure concerns (feeds, database, filesystem, etc.).
//!
//! # Structure
//!
//! - `episode` - Library entries (`Episode`, `Podcast`)
//! - `storage` - Retention policies and storage actions

mod episode;
mod storage;

pub use episode::{Episode, Podcast};
pub use storage::{ParsePolicyError, RetentionPolicy, StorageAction};
