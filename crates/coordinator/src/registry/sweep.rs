// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease sweeper: re-queues tasks whose lease lapsed and forgets silent
//! workers.

use std::sync::Arc;
use std::time::Duration;

use cc_core::{Clock, TaskError, TaskErrorKind, TaskId, WorkerId};
use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;

use super::Registry;

/// What one sweep pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepStats {
    /// Tasks whose lease expired (re-queued or terminally failed).
    pub expired: Vec<TaskId>,
    /// Workers forgotten after `worker_ttl` of silence.
    pub forgotten: Vec<WorkerId>,
}

impl SweepStats {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.forgotten.is_empty()
    }
}

impl<C: Clock> Registry<C> {
    /// One sweep pass. Expired leases re-queue their task with an
    /// incremented retry count (terminal once the cap is hit); workers
    /// silent beyond `worker_ttl` are forgotten.
    pub fn sweep(&mut self) -> SweepStats {
        let now_ms = self.clock.epoch_ms();
        let mut stats = SweepStats::default();

        let expired: Vec<(TaskId, WorkerId)> = self
            .tasks
            .values()
            .filter(|t| !t.state.is_terminal())
            .filter_map(|t| {
                let lease = t.lease.as_ref()?;
                (lease.expires_at_ms <= now_ms).then(|| (t.id, lease.worker.clone()))
            })
            .collect();

        for (task_id, worker) in expired {
            self.release_holder(&task_id);
            self.fail_or_requeue(
                &task_id,
                TaskError::new(TaskErrorKind::LeaseExpired, format!("lease lost by {}", worker)),
                Some(worker),
            );
            stats.expired.push(task_id);
        }

        let ttl_ms = self.config.worker_ttl.as_millis() as u64;
        let silent: Vec<WorkerId> = self
            .workers
            .iter()
            .filter(|(_, w)| w.last_beat_ms + ttl_ms <= now_ms)
            .map(|(id, _)| id.clone())
            .collect();
        for worker in silent {
            self.workers.remove(&worker);
            tracing::debug!(worker = %worker, "silent worker forgotten");
            stats.forgotten.push(worker);
        }

        stats
    }
}

/// Background sweeper loop; period must stay at or below half the lease
/// TTL so an expired lease is observed within one lease window.
pub async fn run<C: Clock + 'static>(registry: Arc<Mutex<Registry<C>>>, period: Duration) {
    let mut tick = tokio::time::interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tick.tick().await;
        let stats = registry.lock().sweep();
        if !stats.is_empty() {
            tracing::info!(
                expired = stats.expired.len(),
                forgotten = stats.forgotten.len(),
                "sweep pass"
            );
        }
    }
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
