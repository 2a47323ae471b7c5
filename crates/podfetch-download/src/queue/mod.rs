//! Download queue management.
//!
//! This module provides a pure state machine for the download queue. No I/O is
//! performed here; the coordinator (`DownloadCoordinator`) serializes access
//! and drives the downloader.
//!
//! # Design
//!
//! - Pure synchronous state machine (no async, no IO)
//! - Records live in an insertion-ordered map; the visible order is a
//!   separate id list so hidden records keep their state
//! - Disallowed transitions are no-ops for user actions and
//!   `InvalidStateTransition` errors for coordinator-facing mutators
//!
//! # Position Semantics
//!
//! Positions are 0-based indices into the visible order. Records dropped from
//! the visible order by `reorder_queue` have no position and are never picked
//! by `next_pending`.

use indexmap::IndexMap;

use podfetch_core::download::{
    DownloadError, DownloadRecord, DownloadState, DownloadSummary, DownloadTask, TaskId,
};

/// Priority-ordered, state-tracked collection of download records.
///
/// This is a sync type with no internal locking; the caller
/// (`DownloadCoordinator`) is responsible for synchronization.
#[derive(Debug, Default)]
pub struct TaskQueue {
    records: IndexMap<TaskId, DownloadRecord>,
    order: Vec<TaskId>,
}

impl TaskQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records, visible or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check if a task id is known to the queue.
    #[must_use]
    pub fn contains(&self, id: &TaskId) -> bool {
        self.records.contains_key(id)
    }

    /// Add a task as `Pending`.
    ///
    /// The task is placed after the last visible task whose priority is
    /// greater than or equal to its own, so equal priorities keep FIFO order.
    /// Returns the 0-based visible position.
    pub fn add_to_queue(&mut self, task: DownloadTask) -> Result<usize, DownloadError> {
        if self.records.contains_key(&task.id) {
            return Err(DownloadError::already_queued(task.id.to_string()));
        }

        let position = self
            .order
            .iter()
            .rposition(|id| {
                self.records
                    .get(id)
                    .is_some_and(|r| r.task.priority >= task.priority)
            })
            .map_or(0, |idx| idx + 1);

        let id = task.id.clone();
        self.records.insert(id.clone(), DownloadRecord::pending(task));
        self.order.insert(position, id);

        Ok(position)
    }

    /// Remove a record regardless of its state.
    pub fn remove_from_queue(&mut self, id: &TaskId) -> Option<DownloadRecord> {
        let record = self.records.shift_remove(id)?;
        self.order.retain(|visible| visible != id);
        Some(record)
    }

    /// Replace the visible order.
    ///
    /// Unknown ids are dropped and duplicates keep their first position.
    /// Known ids missing from `ids` leave the visible order but keep their
    /// records; they stay reachable through [`Self::get_task`].
    pub fn reorder_queue(&mut self, ids: &[TaskId]) {
        let mut order: Vec<TaskId> = Vec::with_capacity(ids.len());
        for id in ids {
            if self.records.contains_key(id) && !order.contains(id) {
                order.push(id.clone());
            }
        }
        self.order = order;
    }

    /// Pause a running download. Only valid from `Downloading`.
    pub fn pause_download(&mut self, id: &TaskId) -> bool {
        self.user_transition(id, DownloadState::Paused)
    }

    /// Resume a paused download. Only valid from `Paused`.
    ///
    /// Progress is kept; the coordinator restarts the transfer.
    pub fn resume_download(&mut self, id: &TaskId) -> bool {
        self.user_transition(id, DownloadState::Downloading)
    }

    /// Cancel a download from any non-terminal state.
    ///
    /// Cancelling an already cancelled record is a no-op that reports `true`.
    pub fn cancel_download(&mut self, id: &TaskId) -> bool {
        if self
            .records
            .get(id)
            .is_some_and(|r| r.state == DownloadState::Cancelled)
        {
            return true;
        }
        self.user_transition(id, DownloadState::Cancelled)
    }

    /// Move a failed record back to `Pending`.
    ///
    /// Progress is reset and the last error cleared. The retry count is not
    /// touched here; it is incremented once per failure in [`Self::mark_failed`].
    pub fn retry_failed_download(&mut self, id: &TaskId) -> bool {
        match self.transition(id, DownloadState::Pending) {
            Ok(record) => {
                record.progress = 0.0;
                record.last_error = None;
                true
            }
            Err(e) => {
                tracing::debug!(task_id = %id, error = %e, "Retry ignored");
                false
            }
        }
    }

    /// Tasks in visible order.
    #[must_use]
    pub fn get_current_queue(&self) -> Vec<DownloadTask> {
        self.visible().map(|r| r.task.clone()).collect()
    }

    /// Look up a record, visible or not.
    #[must_use]
    pub fn get_task(&self, id: &TaskId) -> Option<&DownloadRecord> {
        self.records.get(id)
    }

    /// Summaries of the visible records, with their positions.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DownloadSummary> {
        self.visible()
            .enumerate()
            .map(|(position, record)| DownloadSummary::from_record(record, position))
            .collect()
    }

    /// All records in insertion order, including hidden ones.
    pub fn records(&self) -> impl Iterator<Item = &DownloadRecord> {
        self.records.values()
    }

    /// Find the record for an episode.
    ///
    /// A non-terminal record wins over terminal ones; among terminal records
    /// the most recently added is returned.
    #[must_use]
    pub fn find_by_episode(&self, episode_id: &str) -> Option<&DownloadRecord> {
        let mut terminal = None;
        for record in self.records.values() {
            if record.task.episode_id != episode_id {
                continue;
            }
            if !record.state.is_terminal() {
                return Some(record);
            }
            terminal = Some(record);
        }
        terminal
    }

    /// Ids of all records belonging to an episode.
    #[must_use]
    pub fn ids_for_episode(&self, episode_id: &str) -> Vec<TaskId> {
        self.records
            .values()
            .filter(|r| r.task.episode_id == episode_id)
            .map(|r| r.task.id.clone())
            .collect()
    }

    /// Up to `limit` pending task ids, in visible order.
    #[must_use]
    pub fn next_pending(&self, limit: usize) -> Vec<TaskId> {
        self.visible()
            .filter(|r| r.state == DownloadState::Pending)
            .take(limit)
            .map(|r| r.task.id.clone())
            .collect()
    }

    /// Number of records currently `Downloading`.
    #[must_use]
    pub fn downloading_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.state == DownloadState::Downloading)
            .count()
    }

    // --- Coordinator-facing mutators ---

    /// Mark a pending record as handed to the downloader.
    pub fn mark_downloading(&mut self, id: &TaskId) -> Result<&DownloadRecord, DownloadError> {
        self.transition(id, DownloadState::Downloading)
            .map(|record| &*record)
    }

    /// Update progress of a running download.
    ///
    /// Ignored unless the record is `Downloading`. Returns whether the record
    /// changed.
    pub fn update_progress(&mut self, id: &TaskId, fraction: f64) -> bool {
        match self.records.get_mut(id) {
            Some(record) if record.state == DownloadState::Downloading => {
                record.set_progress(fraction);
                true
            }
            _ => false,
        }
    }

    /// Mark a running download as completed.
    pub fn mark_completed(
        &mut self,
        id: &TaskId,
        local_file: Option<String>,
    ) -> Result<&DownloadRecord, DownloadError> {
        let record = self.transition(id, DownloadState::Completed)?;
        record.progress = 1.0;
        record.last_error = None;
        record.local_file = local_file;
        Ok(&*record)
    }

    /// Mark a running download as failed.
    ///
    /// Increments the retry count once, saturating at `max_retry_count`.
    pub fn mark_failed(
        &mut self,
        id: &TaskId,
        error: &DownloadError,
        max_retry_count: u32,
    ) -> Result<&DownloadRecord, DownloadError> {
        let record = self.transition(id, DownloadState::Failed)?;
        record.last_error = Some(error.to_string());
        record.task.retry_count = record
            .task
            .retry_count
            .saturating_add(1)
            .min(max_retry_count);
        Ok(&*record)
    }

    // --- Private helpers ---

    fn visible(&self) -> impl Iterator<Item = &DownloadRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    fn transition(
        &mut self,
        id: &TaskId,
        to: DownloadState,
    ) -> Result<&mut DownloadRecord, DownloadError> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| DownloadError::not_in_queue(id.to_string()))?;

        if !record.state.can_transition_to(to) {
            return Err(DownloadError::invalid_transition(
                id.to_string(),
                record.state,
                to,
            ));
        }

        record.state = to;
        Ok(record)
    }

    fn user_transition(&mut self, id: &TaskId, to: DownloadState) -> bool {
        match self.transition(id, to) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(task_id = %id, error = %e, "State change ignored");
                false
            }
        }
    }
}
