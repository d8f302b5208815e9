//! Send pending changes as batch writes and fold the outcome back into the tracker.

use crate::api::PolicyBackend;
use crate::edits::{EditTracker, Submission};
use serde::Serialize;
use std::future::Future;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BatchOutcome {
    /// Nothing to send, so no call was made.
    NotIssued,
    Applied { count: usize },
    Failed { message: String },
}

impl BatchOutcome {
    pub fn is_issued(&self) -> bool {
        !matches!(self, BatchOutcome::NotIssued)
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, BatchOutcome::Applied { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, BatchOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReport {
    pub modify: BatchOutcome,
    pub inherit: BatchOutcome,
}

impl SubmissionReport {
    /// Number of write calls actually made (0, 1 or 2).
    pub fn issued(&self) -> usize {
        [&self.modify, &self.inherit]
            .iter()
            .filter(|o| o.is_issued())
            .count()
    }

    /// True when at least one batch was applied and the displayed values are stale.
    pub fn policies_changed(&self) -> bool {
        self.modify.is_applied() || self.inherit.is_applied()
    }

    pub fn is_success(&self) -> bool {
        !self.modify.is_failed() && !self.inherit.is_failed()
    }

    /// Clear the tracker state belonging to each applied batch. Failed
    /// batches keep their pending state so the user can retry.
    pub fn reconcile(&self, tracker: &mut EditTracker) {
        if self.modify.is_applied() {
            tracker.clear_modified();
        }
        if self.inherit.is_applied() {
            tracker.clear_inherited();
        }
    }
}

async fn run_batch<F>(name: &str, count: usize, call: F) -> BatchOutcome
where
    F: Future<Output = Result<(), crate::error::PolicyError>>,
{
    if count == 0 {
        return BatchOutcome::NotIssued;
    }

    match call.await {
        Ok(()) => {
            info!(batch = name, count, "batch applied");
            BatchOutcome::Applied { count }
        }
        Err(e) => {
            warn!(batch = name, count, "batch failed: {}", e);
            BatchOutcome::Failed {
                message: e.message().to_string(),
            }
        }
    }
}

/// Issue the modify and inherit batches concurrently and wait for exactly
/// the calls that were started. An empty submission makes no calls.
pub async fn submit(backend: &dyn PolicyBackend, submission: &Submission) -> SubmissionReport {
    let modify = run_batch(
        "modify",
        submission.to_modify.len(),
        backend.batch_modify(&submission.to_modify),
    );
    let inherit = run_batch(
        "inherit",
        submission.to_inherit.len(),
        backend.batch_inherit(&submission.to_inherit),
    );

    let (modify, inherit) = tokio::join!(modify, inherit);
    SubmissionReport { modify, inherit }
}

/// Build, send and reconcile in one step.
pub async fn submit_pending(
    backend: &dyn PolicyBackend,
    tracker: &mut EditTracker,
    target_ou: &str,
) -> SubmissionReport {
    let submission = tracker.build_submission(target_ou);
    let report = submit(backend, &submission).await;
    report.reconcile(tracker);
    report
}
