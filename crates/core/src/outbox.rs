//! Side-effect outbox.
//!
//! Request handlers never call collaborator services inline. They enqueue
//! jobs here and return; a background worker drains the queue with bounded
//! retries (at-least-once). Every job carries a dedup key so consumers stay
//! idempotent when a job is delivered more than once.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::HubResult;

/// A side effect deferred out of the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// Regenerate tracking scripts for every order in a campaign after an
    /// asset or click URL changed.
    RegenerateScripts { campaign_id: Uuid, asset_id: Uuid },
    /// Recompute the assets-ready flag for every order in a campaign.
    RecomputeAssetsReady { campaign_id: Uuid },
    /// Fan out email + in-app notifications for an asset event.
    NotifyAssetEvent {
        campaign_id: Uuid,
        asset_id: Uuid,
        event: AssetEvent,
    },
}

/// Asset lifecycle events that trigger notification fan-out. Assets-ready
/// fan-out has no event here: it is driven by the recompute job's flag flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetEvent {
    Uploaded,
    StatusChanged,
    ClickUrlChanged,
}

/// Executes drained jobs. Implementations must tolerate duplicate delivery.
pub trait SideEffectExecutor: Send + Sync {
    fn execute(&self, job: &SideEffect) -> HubResult<()>;
}

struct QueuedJob {
    job: SideEffect,
    dedup_key: String,
    attempts: u32,
    enqueued_at: DateTime<Utc>,
}

/// Applied-key retention bound. Dedup keys include the asset revision, so
/// old keys stop arriving once their revision is superseded; clearing the
/// set past this bound only risks re-running a job, which consumers must
/// tolerate anyway.
const APPLIED_KEY_RETENTION: usize = 4096;

/// FIFO outbox with dedup keys and bounded retries.
#[derive(Default)]
pub struct Outbox {
    pending: Mutex<VecDeque<QueuedJob>>,
    applied: Mutex<HashSet<String>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a job. Never fails; a full or wedged outbox must not fail the
    /// originating upload or update.
    pub fn enqueue(&self, job: SideEffect, dedup_key: impl Into<String>) {
        let dedup_key = dedup_key.into();
        if self.applied.lock().contains(&dedup_key) {
            debug!(%dedup_key, "Outbox job already applied, skipping enqueue");
            return;
        }
        let mut pending = self.pending.lock();
        if pending.iter().any(|q| q.dedup_key == dedup_key) {
            debug!(%dedup_key, "Outbox job already pending, skipping enqueue");
            return;
        }
        metrics::counter!("outbox.jobs_enqueued").increment(1);
        pending.push_back(QueuedJob {
            job,
            dedup_key,
            attempts: 0,
            enqueued_at: Utc::now(),
        });
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Drain everything currently queued. Failed jobs go back to the queue
    /// until `max_attempts`; exhausted jobs are dropped with a warning.
    /// Returns the number of jobs applied this pass.
    pub fn drain(&self, executor: &dyn SideEffectExecutor, max_attempts: u32) -> usize {
        let batch: Vec<QueuedJob> = {
            let mut pending = self.pending.lock();
            pending.drain(..).collect()
        };

        let mut applied_count = 0;
        for mut queued in batch {
            if self.applied.lock().contains(&queued.dedup_key) {
                continue;
            }
            match executor.execute(&queued.job) {
                Ok(()) => {
                    let mut applied = self.applied.lock();
                    applied.insert(queued.dedup_key.clone());
                    if applied.len() > APPLIED_KEY_RETENTION {
                        applied.clear();
                    }
                    drop(applied);
                    metrics::counter!("outbox.jobs_applied").increment(1);
                    applied_count += 1;
                }
                Err(e) => {
                    queued.attempts += 1;
                    if queued.attempts >= max_attempts {
                        warn!(
                            dedup_key = %queued.dedup_key,
                            attempts = queued.attempts,
                            enqueued_at = %queued.enqueued_at,
                            error = %e,
                            "Outbox job exhausted retries, dropping"
                        );
                        metrics::counter!("outbox.jobs_dropped").increment(1);
                    } else {
                        warn!(
                            dedup_key = %queued.dedup_key,
                            attempts = queued.attempts,
                            error = %e,
                            "Outbox job failed, will retry"
                        );
                        self.pending.lock().push_back(queued);
                    }
                }
            }
        }
        applied_count
    }
}

/// Executor that records jobs for assertions in tests.
#[derive(Default)]
pub struct CaptureExecutor {
    executed: Mutex<Vec<SideEffect>>,
    /// Dedup keys that should fail `fail_times` more times before succeeding.
    failures: Mutex<std::collections::HashMap<String, u32>>,
}

impl CaptureExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, dedup_key: impl Into<String>, times: u32) {
        self.failures.lock().insert(dedup_key.into(), times);
    }

    pub fn executed(&self) -> Vec<SideEffect> {
        self.executed.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.executed.lock().len()
    }
}

impl SideEffectExecutor for CaptureExecutor {
    fn execute(&self, job: &SideEffect) -> HubResult<()> {
        let key = match job {
            SideEffect::RegenerateScripts { asset_id, .. } => format!("scripts:{asset_id}"),
            SideEffect::RecomputeAssetsReady { campaign_id } => format!("ready:{campaign_id}"),
            SideEffect::NotifyAssetEvent { asset_id, .. } => format!("notify:{asset_id}"),
        };
        let mut failures = self.failures.lock();
        if let Some(remaining) = failures.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(crate::error::HubError::Internal(anyhow::anyhow!(
                    "injected failure for {key}"
                )));
            }
        }
        drop(failures);
        self.executed.lock().push(job.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regen_job() -> (SideEffect, String) {
        let asset_id = Uuid::new_v4();
        (
            SideEffect::RegenerateScripts {
                campaign_id: Uuid::new_v4(),
                asset_id,
            },
            format!("scripts:{asset_id}"),
        )
    }

    #[test]
    fn duplicate_enqueue_is_deduped() {
        let outbox = Outbox::new();
        let (job, key) = regen_job();
        outbox.enqueue(job.clone(), key.clone());
        outbox.enqueue(job, key);
        assert_eq!(outbox.pending_len(), 1);
    }

    #[test]
    fn drain_applies_and_marks_done() {
        let outbox = Outbox::new();
        let exec = CaptureExecutor::new();
        let (job, key) = regen_job();
        outbox.enqueue(job.clone(), key.clone());
        assert_eq!(outbox.drain(&exec, 3), 1);
        assert_eq!(exec.count(), 1);

        // Re-enqueueing an applied key is a no-op.
        outbox.enqueue(job, key);
        assert_eq!(outbox.pending_len(), 0);
    }

    #[test]
    fn failed_job_retries_then_succeeds() {
        let outbox = Outbox::new();
        let exec = CaptureExecutor::new();
        let (job, key) = regen_job();
        exec.fail_next(key.clone(), 1);
        outbox.enqueue(job, key);

        assert_eq!(outbox.drain(&exec, 3), 0);
        assert_eq!(outbox.pending_len(), 1);
        assert_eq!(outbox.drain(&exec, 3), 1);
        assert_eq!(exec.count(), 1);
    }

    #[test]
    fn applied_set_is_bounded() {
        let outbox = Outbox::new();
        let exec = CaptureExecutor::new();
        for _ in 0..=APPLIED_KEY_RETENTION {
            let (job, key) = regen_job();
            outbox.enqueue(job, key);
            outbox.drain(&exec, 3);
        }
        assert!(outbox.applied.lock().len() <= APPLIED_KEY_RETENTION);
    }

    #[test]
    fn exhausted_job_is_dropped() {
        let outbox = Outbox::new();
        let exec = CaptureExecutor::new();
        let (job, key) = regen_job();
        exec.fail_next(key.clone(), 10);
        outbox.enqueue(job, key);

        outbox.drain(&exec, 2);
        outbox.drain(&exec, 2);
        assert_eq!(outbox.pending_len(), 0);
        assert_eq!(exec.count(), 0);
    }
}
