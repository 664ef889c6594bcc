use anyhow::Result;
use chrono::{DateTime, Utc};
use hydrate_types::models::{
    Challenge, ChallengeParticipant, CompletionReason, Drink, LeaderboardEntry, User, UserProfile,
};
use uuid::Uuid;

/// Persistence the challenge rules depend on.
///
/// Every method is a single atomic write or a read. The conditional writes
/// (`insert_challenge`, `complete_challenge`, `add_participant`,
/// `insert_drink_if_active`) report whether they took effect instead of
/// failing, so callers can map the outcome to a domain error.
pub trait Store: Send + Sync {
    // -- Users --

    fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// Insert the user or refresh their identity fields. Display name and
    /// liquid color are left untouched for existing users.
    fn upsert_user(&self, profile: &UserProfile, now: DateTime<Utc>) -> Result<User>;

    fn update_user_settings(
        &self,
        id: &str,
        display_name: Option<&str>,
        liquid_color: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<User>>;

    // -- Challenges --

    /// Insert the challenge and enroll its creator in one transaction.
    /// Returns `false`, writing nothing, when the invite code is taken.
    fn insert_challenge(&self, challenge: &Challenge, creator: &ChallengeParticipant) -> Result<bool>;

    fn get_challenge(&self, id: Uuid) -> Result<Option<Challenge>>;

    fn get_challenge_by_invite_code(&self, code: &str) -> Result<Option<Challenge>>;

    /// Every challenge the user participates in, newest first.
    fn challenges_for_user(&self, user_id: &str) -> Result<Vec<Challenge>>;

    /// Challenges still marked active that the user participates in, newest first.
    fn active_challenges_for_user(&self, user_id: &str) -> Result<Vec<Challenge>>;

    /// Mark an active challenge completed. Returns `false` if it was no
    /// longer active, leaving the stored reason and end date untouched.
    fn complete_challenge(
        &self,
        id: Uuid,
        end_date: DateTime<Utc>,
        reason: CompletionReason,
    ) -> Result<bool>;

    // -- Participants --

    /// Returns `false` if the user already participates.
    fn add_participant(&self, participant: &ChallengeParticipant) -> Result<bool>;

    /// Participants in join order.
    fn participants(&self, challenge_id: Uuid) -> Result<Vec<ChallengeParticipant>>;

    fn is_participant(&self, challenge_id: Uuid, user_id: &str) -> Result<bool>;

    // -- Drinks --

    /// Record the drink only while its challenge is still active.
    fn insert_drink_if_active(&self, drink: &Drink) -> Result<bool>;

    /// The user's drinks for a challenge, newest first.
    fn drinks_for_user(&self, user_id: &str, challenge_id: Uuid) -> Result<Vec<Drink>>;

    /// Grouped sum of drink amounts for a challenge, highest total first.
    fn leaderboard(&self, challenge_id: Uuid) -> Result<Vec<LeaderboardEntry>>;
}
