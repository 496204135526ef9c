use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::models::{RunStatus, RunSummary};

/// Run-id keyed progress map shared between run workers and pollers
///
/// Each run has exactly one writer (its worker). The lock is held only for the
/// map access itself, never across external calls. Entries live until
/// [`StatusBoard::evict_idle`] removes them.
#[derive(Clone, Default)]
pub struct StatusBoard {
    runs: Arc<Mutex<HashMap<String, RunStatus>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the run's status with a fresh progress snapshot
    pub async fn update(&self, run_id: &str, current: usize, total: usize, status: &str, video_title: &str) {
        let snapshot = RunStatus::progress(current, total, status, video_title);
        self.runs.lock().await.insert(run_id.to_string(), snapshot);
    }

    /// Marks the run completed and records its final counts
    pub async fn complete(&self, run_id: &str, summary: &RunSummary) {
        let mut runs = self.runs.lock().await;
        let entry = runs
            .entry(run_id.to_string())
            .or_insert_with(|| RunStatus::progress(summary.total, summary.total, "Done!", ""));

        entry.completed = true;
        entry.total = summary.total;
        entry.success_count = Some(summary.success_count);
        entry.skipped_count = Some(summary.skipped_count);
        entry.error_count = Some(summary.error_count);
        entry.timestamp = Utc::now();
    }

    pub async fn get(&self, run_id: &str) -> Option<RunStatus> {
        self.runs.lock().await.get(run_id).cloned()
    }

    /// Drops runs whose last update is older than `max_idle`; returns how many were removed
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(max_idle)
            .ok()
            .and_then(|idle| Utc::now().checked_sub_signed(idle))
        else {
            return 0;
        };

        let mut runs = self.runs.lock().await;
        let before = runs.len();
        runs.retain(|_, status| status.timestamp >= cutoff);
        before - runs.len()
    }
}

/// Spawns a task that evicts idle run statuses every half `max_idle`
pub fn spawn_sweeper(board: StatusBoard, max_idle: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(max_idle.max(Duration::from_secs(1)) / 2);
        loop {
            interval.tick().await;
            let evicted = board.evict_idle(max_idle).await;
            if evicted > 0 {
                tracing::debug!(evicted, "Evicted idle run statuses");
            }
        }
    })
}
