//! Snapshot assembly: fetch, aggregate, publish.
//!
//! Each call to [`SnapshotAssembler::refresh`] is one pass. Passes take a
//! generation number when they start; only the pass holding the newest
//! generation may publish, so a slow earlier pass can never overwrite the
//! result of a later one.

use crate::error::{AnalyticsError, Result};
use crate::snapshot::{build_snapshot, AnalyticsSnapshot, SnapshotOptions};
use crate::source::{fetch_dataset, DataAccess};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Fetching { generation: u64 },
    Ready { generation: u64 },
    Failed { generation: u64, reason: String },
}

pub struct SnapshotAssembler<S> {
    source: S,
    options: SnapshotOptions,
    generation: AtomicU64,
    state: Mutex<PassState>,
    current: RwLock<Option<Arc<AnalyticsSnapshot>>>,
}

impl<S: DataAccess> SnapshotAssembler<S> {
    pub fn new(source: S, options: SnapshotOptions) -> Self {
        Self {
            source,
            options: options.normalized(),
            generation: AtomicU64::new(0),
            state: Mutex::new(PassState::Idle),
            current: RwLock::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &SnapshotOptions {
        &self.options
    }

    /// The last published snapshot, if any pass has succeeded yet.
    pub fn current(&self) -> Option<Arc<AnalyticsSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> PassState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run one pass against `now`.
    ///
    /// On a fetch failure nothing is published and the previous snapshot stays
    /// current. A pass that finishes after a newer one was triggered returns
    /// [`AnalyticsError::Superseded`], whether it succeeded or failed, and its
    /// result is dropped.
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<Arc<AnalyticsSnapshot>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.transition(generation, PassState::Fetching { generation });
        debug!(generation, "Starting analytics pass");

        let dataset = match fetch_dataset(&self.source, self.options.activity_limit).await {
            Ok(dataset) => dataset,
            Err(err) => {
                if !self.is_latest(generation) {
                    debug!(generation, error = %err, "Superseded pass failed");
                    return Err(AnalyticsError::Superseded { generation });
                }
                warn!(generation, error = %err, "Analytics pass failed");
                self.transition(
                    generation,
                    PassState::Failed {
                        generation,
                        reason: err.to_string(),
                    },
                );
                return Err(err);
            }
        };

        let snapshot = Arc::new(build_snapshot(now, &dataset, &self.options));
        self.publish(generation, snapshot)
    }

    fn is_latest(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn transition(&self, generation: u64, next: PassState) {
        if !self.is_latest(generation) {
            return;
        }
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    fn publish(
        &self,
        generation: u64,
        snapshot: Arc<AnalyticsSnapshot>,
    ) -> Result<Arc<AnalyticsSnapshot>> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if !self.is_latest(generation) {
            debug!(generation, "Discarding result of superseded pass");
            return Err(AnalyticsError::Superseded { generation });
        }
        *current = Some(Arc::clone(&snapshot));
        drop(current);

        self.transition(generation, PassState::Ready { generation });
        debug!(generation, "Published analytics snapshot");
        Ok(snapshot)
    }
}
