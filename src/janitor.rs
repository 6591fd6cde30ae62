use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::feedback::days_since_negative_feedback;
use crate::models::Change;
use crate::report::{print_status, ActionOutcome};

/// Side effects the cleanup run can take against the review system
#[async_trait]
pub trait ChangeActions: Send + Sync {
    /// Abandon a change
    async fn abandon(&self, change_id: &str) -> Result<ActionOutcome>;

    /// Leave a comment saying the change will soon be abandoned
    async fn warn(&self, change_id: &str, revision_id: &str) -> Result<ActionOutcome>;
}

/// Why a change was left alone before its feedback was looked at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    WorkInProgress,
    Approved,
    NoApprovals,
    /// Updated after the last vote, most likely abandoned and restored
    UpdatedSinceLastVote,
}

/// What to do with a single change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Skip(SkipReason),
    Keep { days: i64 },
    Abandon { days: i64 },
}

/// Totals for one cleanup run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub examined: usize,
    pub abandoned: usize,
}

/// Decide the fate of one change.
///
/// Sorts the change's patch sets, and the current patch set's approvals, in place.
pub fn evaluate(change: &mut Change, now_ts: i64, abandon_after_days: i64) -> Decision {
    if change.is_work_in_progress() {
        return Decision::Skip(SkipReason::WorkInProgress);
    }

    let last_updated = change.last_updated;
    let Some(current) = change.current_patch_set() else {
        return Decision::Skip(SkipReason::NoApprovals);
    };

    if current.is_approved() {
        return Decision::Skip(SkipReason::Approved);
    }

    let approvals = &mut current.approvals;
    approvals.sort_by_key(|approval| approval.granted_on);
    let Some(newest) = approvals.last() else {
        return Decision::Skip(SkipReason::NoApprovals);
    };

    if last_updated > newest.granted_on {
        return Decision::Skip(SkipReason::UpdatedSinceLastVote);
    }

    let days = days_since_negative_feedback(approvals.as_slice(), now_ts);
    if days > abandon_after_days {
        Decision::Abandon { days }
    } else {
        Decision::Keep { days }
    }
}

/// Walks open changes and abandons the stale ones
pub struct Janitor<A: ChangeActions> {
    actions: A,
    abandon_after_days: i64,
}

impl<A: ChangeActions> Janitor<A> {
    pub fn new(actions: A, abandon_after_days: i64) -> Self {
        Self {
            actions,
            abandon_after_days,
        }
    }

    /// Process a batch of changes against the current time
    pub async fn process_changes(&self, changes: &mut [Change]) -> Result<RunSummary> {
        self.process_changes_at(changes, Utc::now().timestamp()).await
    }

    /// Process a batch of changes against a fixed `now_ts`.
    ///
    /// Stops at the first failed action.
    pub async fn process_changes_at(
        &self,
        changes: &mut [Change],
        now_ts: i64,
    ) -> Result<RunSummary> {
        info!(count = changes.len(), now_ts, "Processing changes");

        let mut summary = RunSummary::default();

        for change in changes.iter_mut() {
            summary.examined += 1;

            match evaluate(change, now_ts, self.abandon_after_days) {
                Decision::Skip(reason) => {
                    debug!(change = %change.id, ?reason, "Skipping change");
                }
                Decision::Keep { days } => {
                    debug!(change = %change.id, days, "Keeping change");
                }
                Decision::Abandon { days } => {
                    info!(change = %change.id, days, "Abandoning change");
                    print_status(format_args!("Abandoning {} - {}", change.url, change.subject()));

                    let outcome = self
                        .actions
                        .abandon(&change.id)
                        .await
                        .with_context(|| format!("Failed to abandon {}", change.url))?;
                    print_status(&outcome);

                    summary.abandoned += 1;
                }
            }
        }

        info!(
            examined = summary.examined,
            abandoned = summary.abandoned,
            "Cleanup run complete"
        );

        Ok(summary)
    }

    /// Get the actions backend for direct access
    pub fn actions(&self) -> &A {
        &self.actions
    }
}
