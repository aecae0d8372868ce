//! Where finalized attendance goes.
//!
//! The registry only needs two things from persistence: append a round's
//! records, and read one student's history back. [`MemoryStore`] does
//! both in process and is what the server binary and the tests use.

use std::sync::Arc;

use rollcall_protocol::{AttendanceRecord, Identity};
use tokio::sync::Mutex;

/// Errors raised by an [`AttendanceStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend couldn't take the write (or serve the read).
    #[error("attendance store unavailable: {0}")]
    Unavailable(String),
}

/// Persists dated attendance records.
///
/// `record` must be all-or-nothing for one call: the registry only
/// commits a finalized round once it returns `Ok`, and retries the whole
/// batch otherwise.
pub trait AttendanceStore: Send + Sync + 'static {
    /// Appends one round's records.
    fn record(
        &self,
        records: &[AttendanceRecord],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Every record for `student`, oldest first.
    fn history(
        &self,
        student: &Identity,
    ) -> impl std::future::Future<Output = Result<Vec<AttendanceRecord>, StoreError>> + Send;
}

// Lets the server share one store with whoever else needs to read it.
impl<S: AttendanceStore> AttendanceStore for Arc<S> {
    fn record(
        &self,
        records: &[AttendanceRecord],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send {
        self.as_ref().record(records)
    }

    fn history(
        &self,
        student: &Identity,
    ) -> impl std::future::Future<Output = Result<Vec<AttendanceRecord>, StoreError>> + Send {
        self.as_ref().history(student)
    }
}

/// An in-memory [`AttendanceStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<AttendanceRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored so far.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

impl AttendanceStore for MemoryStore {
    async fn record(&self, records: &[AttendanceRecord]) -> Result<(), StoreError> {
        self.records.lock().await.extend_from_slice(records);
        Ok(())
    }

    async fn history(&self, student: &Identity) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut history: Vec<AttendanceRecord> = self
            .records
            .lock()
            .await
            .iter()
            .filter(|record| &record.student == student)
            .cloned()
            .collect();
        // Stable, so same-day rounds keep insertion order.
        history.sort_by_key(|record| record.date);
        Ok(history)
    }
}
