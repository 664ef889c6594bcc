//! Per-participant totals derived from the drink log.

use std::collections::HashMap;

use hydrate_types::models::{ChallengeParticipant, Drink, LeaderboardEntry};
use uuid::Uuid;

/// Sum drink amounts per user for one challenge, highest total first.
///
/// Users without drinks do not appear. Ties are ordered by user id so the
/// output is deterministic; callers must not rely on that order. The SQLite
/// store computes the same board with a grouped sum and is tested against
/// this function.
pub fn aggregate<'a, I>(challenge_id: Uuid, drinks: I) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = &'a Drink>,
{
    let mut totals: HashMap<&str, u64> = HashMap::new();
    for drink in drinks.into_iter().filter(|d| d.challenge_id == challenge_id) {
        *totals.entry(drink.user_id.as_str()).or_default() += u64::from(drink.amount_ml);
    }

    let mut entries: Vec<LeaderboardEntry> = totals
        .into_iter()
        .map(|(user_id, total_ml)| LeaderboardEntry {
            user_id: user_id.to_string(),
            total_ml,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.total_ml
            .cmp(&a.total_ml)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    entries
}

/// Highest total on the board, if anyone has logged a drink.
pub fn leader_total(entries: &[LeaderboardEntry]) -> Option<u64> {
    entries.iter().map(|e| e.total_ml).max()
}

/// One row per participant, with zero for those who have not logged yet.
pub fn with_participants(
    entries: &[LeaderboardEntry],
    participants: &[ChallengeParticipant],
) -> Vec<LeaderboardEntry> {
    let totals: HashMap<&str, u64> = entries
        .iter()
        .map(|e| (e.user_id.as_str(), e.total_ml))
        .collect();

    let mut merged: Vec<LeaderboardEntry> = participants
        .iter()
        .map(|p| LeaderboardEntry {
            user_id: p.user_id.clone(),
            total_ml: totals.get(p.user_id.as_str()).copied().unwrap_or(0),
        })
        .collect();
    // Stable: equal totals keep join order.
    merged.sort_by(|a, b| b.total_ml.cmp(&a.total_ml));
    merged
}
