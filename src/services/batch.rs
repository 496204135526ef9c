use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::{
    models::{ItemOutcome, RunSummary},
    services::{
        processor::{error_label, phase, ItemPosition, ItemProcessor},
        progress::StatusBoard,
    },
};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Spacing policy between consecutive items of a run
///
/// A token bucket holding a single permit that refills once per interval: the
/// first item starts immediately, each following one waits for the refill. A
/// zero interval disables throttling.
pub struct ItemThrottle {
    limiter: Option<DirectRateLimiter>,
}

impl ItemThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            limiter: Quota::with_period(interval).map(RateLimiter::direct),
        }
    }

    /// Waits until the next item may start
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

/// Keeps the first `limit` items, preserving order
pub fn cap_items(items: Vec<String>, limit: usize) -> Vec<String> {
    let original = items.len();
    let capped: Vec<String> = items.into_iter().take(limit).collect();

    if capped.len() < original {
        tracing::info!(original, limit, "Playlist truncated to per-run limit");
    }

    capped
}

/// Drives one run: items strictly in order, one at a time, throttled
#[derive(Clone)]
pub struct BatchRunner {
    processor: ItemProcessor,
    status: StatusBoard,
    max_items: usize,
    item_interval: Duration,
}

impl BatchRunner {
    pub fn new(
        processor: ItemProcessor,
        status: StatusBoard,
        max_items: usize,
        item_interval: Duration,
    ) -> Self {
        Self {
            processor,
            status,
            max_items,
            item_interval,
        }
    }

    /// Per-run item cap
    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Processes the (capped) items and records the final summary
    ///
    /// Each item runs in its own task so that a panic inside one item is
    /// reported as that item's error instead of ending the run.
    pub async fn run(&self, run_id: &str, items: Vec<String>) -> RunSummary {
        let items = cap_items(items, self.max_items);
        let total = items.len();

        tracing::info!(run_id = %run_id, total, "Run started");
        self.status.update(run_id, 0, total, phase::PREPARING, "").await;

        let throttle = ItemThrottle::new(self.item_interval);
        let mut outcomes = Vec::with_capacity(total);

        for (idx, item_id) in items.into_iter().enumerate() {
            throttle.wait().await;
            let index = idx + 1;

            let processor = self.processor.clone();
            let task_run_id = run_id.to_string();
            let task_item_id = item_id.clone();
            let task = tokio::spawn(async move {
                let pos = ItemPosition {
                    run_id: &task_run_id,
                    index,
                    total,
                };
                processor.process(&task_item_id, pos).await
            });

            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(run_id = %run_id, item_id = %item_id, error = %e, "Item task aborted");
                    self.status
                        .update(run_id, index, total, &error_label(&e.to_string()), "")
                        .await;
                    ItemOutcome::error(&item_id, e.to_string())
                }
            };

            outcomes.push(outcome);
        }

        let summary = RunSummary::from_outcomes(run_id, outcomes);
        self.status.complete(run_id, &summary).await;

        tracing::info!(
            run_id = %run_id,
            success = summary.success_count,
            skipped = summary.skipped_count,
            errors = summary.error_count,
            "Run completed"
        );

        summary
    }

    /// Starts the run on a background task
    pub fn spawn(&self, run_id: String, items: Vec<String>) -> JoinHandle<RunSummary> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run(&run_id, items).await })
    }
}
