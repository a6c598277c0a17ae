use crate::models::IndexReport;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("an indexing run is already in progress")]
pub struct AlreadyIndexing;

/// Point-in-time view of the single indexing slot.
#[derive(Debug, Clone, Serialize, Default)]
pub struct IndexingSnapshot {
    pub is_indexing: bool,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<IndexReport>,
}

/// Shared indexing-run state.
///
/// Only one run may hold the slot: `start` rejects a second caller while a
/// run is in flight, which is the concurrency guard for the reindex
/// endpoint. Every run must end with `complete` or `fail` to release it.
#[derive(Default)]
pub struct IndexingStatus {
    inner: Mutex<IndexingSnapshot>,
}

impl IndexingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IndexingSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn start(&self) -> Result<(), AlreadyIndexing> {
        let mut state = self.lock();
        if state.is_indexing {
            return Err(AlreadyIndexing);
        }
        *state = IndexingSnapshot {
            is_indexing: true,
            progress: 0,
            message: "indexing started".to_string(),
            last_error: None,
            report: None,
        };
        Ok(())
    }

    pub fn update(&self, progress: u8, message: impl Into<String>) {
        let mut state = self.lock();
        state.progress = progress;
        state.message = message.into();
    }

    pub fn complete(&self, report: IndexReport) {
        let mut state = self.lock();
        state.is_indexing = false;
        state.progress = 100;
        state.message = "indexing finished".to_string();
        state.last_error = None;
        state.report = Some(report);
    }

    pub fn fail(&self, error: impl Into<String>) {
        let mut state = self.lock();
        state.is_indexing = false;
        state.message = "indexing failed".to_string();
        state.last_error = Some(error.into());
    }

    pub fn snapshot(&self) -> IndexingSnapshot {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> IndexReport {
        IndexReport {
            total_chunks: 3,
            total_inserted: 3,
            collection_name: "loa_2026".to_string(),
            embedding_model: "models/embedding-001".to_string(),
            degraded_embeddings: 0,
            document_checksum: None,
        }
    }

    #[test]
    fn second_start_is_rejected_while_running() {
        let status = IndexingStatus::new();
        assert_eq!(status.start(), Ok(()));
        assert_eq!(status.start(), Err(AlreadyIndexing));
        assert!(status.snapshot().is_indexing);
    }

    #[test]
    fn slot_reopens_after_completion() {
        let status = IndexingStatus::new();
        status.start().expect("first start");
        status.complete(report());

        let snapshot = status.snapshot();
        assert!(!snapshot.is_indexing);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(snapshot.report.as_ref().map(|r| r.total_inserted), Some(3));

        assert_eq!(status.start(), Ok(()));
    }

    #[test]
    fn failure_records_the_error_and_releases_the_slot() {
        let status = IndexingStatus::new();
        status.start().expect("start");
        status.fail("pdf not found");

        let snapshot = status.snapshot();
        assert!(!snapshot.is_indexing);
        assert_eq!(snapshot.last_error.as_deref(), Some("pdf not found"));
        assert_eq!(status.start(), Ok(()));
    }

    #[test]
    fn starting_clears_a_previous_run() {
        let status = IndexingStatus::new();
        status.start().expect("start");
        status.complete(report());
        status.start().expect("restart");

        let snapshot = status.snapshot();
        assert!(snapshot.is_indexing);
        assert_eq!(snapshot.progress, 0);
        assert!(snapshot.report.is_none());
    }

    #[test]
    fn update_moves_progress_and_message() {
        let status = IndexingStatus::new();
        status.start().expect("start");
        status.update(40, "embedding chunks");

        let snapshot = status.snapshot();
        assert_eq!(snapshot.progress, 40);
        assert_eq!(snapshot.message, "embedding chunks");
    }
}
