//! Decides when an active challenge is over.

use chrono::{DateTime, Utc};
use hydrate_types::models::{Challenge, ChallengeStatus, CompletionReason, LeaderboardEntry};

use crate::leaderboard;

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Still running, or already completed earlier.
    Unchanged,
    Complete(CompletionReason),
}

/// Check a challenge against its leaderboard at `now`.
///
/// Both conditions are checked; when the time limit and the goal trigger in
/// the same pass the recorded reason is `ml_goal`. Completed challenges are
/// never re-evaluated.
pub fn evaluate(
    challenge: &Challenge,
    board: &[LeaderboardEntry],
    now: DateTime<Utc>,
) -> Verdict {
    if !challenge.is_active() {
        return Verdict::Unchanged;
    }

    let mut reason = None;

    if let Some(deadline) = challenge.deadline() {
        if now >= deadline {
            reason = Some(CompletionReason::TimeLimit);
        }
    }

    if leaderboard::leader_total(board).is_some_and(|top| top >= u64::from(challenge.target_ml)) {
        reason = Some(CompletionReason::MlGoal);
    }

    match reason {
        Some(reason) => Verdict::Complete(reason),
        None => Verdict::Unchanged,
    }
}

/// Apply a completion to the in-memory record.
pub fn complete(challenge: &mut Challenge, reason: CompletionReason, now: DateTime<Utc>) {
    challenge.status = ChallengeStatus::Completed;
    challenge.end_date = Some(now);
    challenge.completion_reason = Some(reason);
}
