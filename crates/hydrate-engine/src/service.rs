use std::sync::Arc;

use hydrate_types::api::{CreateChallengeRequest, UpdateSettingsRequest};
use hydrate_types::models::{
    Challenge, ChallengeParticipant, ChallengeStatus, Drink, LeaderboardEntry, User, UserProfile,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::lifecycle::{self, Verdict};
use crate::store::Store;
use crate::{invite, leaderboard, validate};

/// Fresh invite codes tried before giving up on creating a challenge.
const MAX_INVITE_ATTEMPTS: usize = 5;

/// A participant's row on the leaderboard view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub user_id: String,
    pub user: Option<User>,
    pub total_ml: u64,
}

#[derive(Debug, Clone)]
pub struct DrinkLogged {
    pub drink: Drink,
    pub challenge: Challenge,
    /// True when this drink ended the challenge.
    pub challenge_completed: bool,
}

/// Entry point for everything the request handlers do.
///
/// Any challenge handed back has been run through the lifecycle evaluator
/// first, and drinks are only accepted after a fresh evaluation.
pub struct ChallengeService<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: Store> ChallengeService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // -- Users --

    /// Create the user on first sight, otherwise refresh the identity fields.
    /// Display name and liquid color are left alone.
    pub fn ensure_user(&self, profile: &UserProfile) -> Result<User> {
        let known = self.store.get_user(&profile.id)?.is_some();
        let user = self.store.upsert_user(profile, self.clock.now())?;
        if !known {
            info!("Registered user {}", user.id);
        }
        Ok(user)
    }

    pub fn user(&self, id: &str) -> Result<User> {
        self.store.get_user(id)?.ok_or(Error::NotFound("user"))
    }

    pub fn update_settings(&self, user_id: &str, req: &UpdateSettingsRequest) -> Result<User> {
        let settings = validate::settings(req)?;
        self.store
            .update_user_settings(
                user_id,
                settings.display_name.as_deref(),
                settings.liquid_color.as_deref(),
                self.clock.now(),
            )?
            .ok_or(Error::NotFound("user"))
    }

    // -- Challenges --

    pub fn create_challenge(&self, creator_id: &str, req: &CreateChallengeRequest) -> Result<Challenge> {
        let new = validate::new_challenge(req)?;
        if self.store.get_user(creator_id)?.is_none() {
            return Err(Error::NotFound("user"));
        }

        let now = self.clock.now();
        for attempt in 1..=MAX_INVITE_ATTEMPTS {
            let challenge = Challenge {
                id: Uuid::new_v4(),
                title: new.title.clone(),
                creator_id: creator_id.to_string(),
                target_ml: new.target_ml,
                duration_minutes: new.duration_minutes,
                challenge_type: new.challenge_type,
                status: ChallengeStatus::Active,
                invite_code: invite::generate(),
                start_date: now,
                end_date: None,
                completion_reason: None,
                created_at: now,
            };
            let creator = ChallengeParticipant {
                id: Uuid::new_v4(),
                challenge_id: challenge.id,
                user_id: creator_id.to_string(),
                joined_at: now,
            };

            if self.store.insert_challenge(&challenge, &creator)? {
                info!(
                    "Challenge {} created by {} (target {} ml, duration {:?} min)",
                    challenge.id, creator_id, challenge.target_ml, challenge.duration_minutes
                );
                return Ok(challenge);
            }
            debug!("Invite code collision on attempt {}", attempt);
        }

        Err(Error::Storage(anyhow::anyhow!(
            "could not allocate a unique invite code after {MAX_INVITE_ATTEMPTS} attempts"
        )))
    }

    pub fn challenge(&self, id: Uuid) -> Result<Challenge> {
        let challenge = self.store.get_challenge(id)?.ok_or(Error::NotFound("challenge"))?;
        self.refresh(challenge)
    }

    pub fn challenge_by_invite(&self, code: &str) -> Result<Challenge> {
        let challenge = self
            .store
            .get_challenge_by_invite_code(code)?
            .ok_or(Error::NotFound("challenge"))?;
        self.refresh(challenge)
    }

    /// Challenges that were active before this call, including any that
    /// completed during it so clients can show the result.
    pub fn active_challenges(&self, user_id: &str) -> Result<Vec<Challenge>> {
        self.store
            .active_challenges_for_user(user_id)?
            .into_iter()
            .map(|c| self.refresh(c))
            .collect()
    }

    pub fn challenge_history(&self, user_id: &str) -> Result<Vec<Challenge>> {
        self.store
            .challenges_for_user(user_id)?
            .into_iter()
            .map(|c| self.refresh(c))
            .collect()
    }

    /// Run the lifecycle evaluator and persist a completion if it fires.
    pub fn refresh(&self, challenge: Challenge) -> Result<Challenge> {
        if !challenge.is_active() {
            return Ok(challenge);
        }

        let board = self.store.leaderboard(challenge.id)?;
        let now = self.clock.now();
        let reason = match lifecycle::evaluate(&challenge, &board, now) {
            Verdict::Unchanged => return Ok(challenge),
            Verdict::Complete(reason) => reason,
        };

        if self.store.complete_challenge(challenge.id, now, reason)? {
            info!("Challenge {} completed ({})", challenge.id, reason);
            let mut challenge = challenge;
            lifecycle::complete(&mut challenge, reason, now);
            return Ok(challenge);
        }

        // Someone else completed it first; their reason stands.
        self.store
            .get_challenge(challenge.id)?
            .ok_or(Error::NotFound("challenge"))
    }

    // -- Participants --

    pub fn join_challenge(&self, challenge_id: Uuid, user_id: &str) -> Result<Challenge> {
        let challenge = self
            .store
            .get_challenge(challenge_id)?
            .ok_or(Error::NotFound("challenge"))?;
        self.join(challenge, user_id)
    }

    pub fn join_by_invite(&self, code: &str, user_id: &str) -> Result<Challenge> {
        let challenge = self
            .store
            .get_challenge_by_invite_code(code)?
            .ok_or(Error::NotFound("challenge"))?;
        self.join(challenge, user_id)
    }

    fn join(&self, challenge: Challenge, user_id: &str) -> Result<Challenge> {
        let participant = ChallengeParticipant {
            id: Uuid::new_v4(),
            challenge_id: challenge.id,
            user_id: user_id.to_string(),
            joined_at: self.clock.now(),
        };
        if !self.store.add_participant(&participant)? {
            return Err(Error::Conflict("You are already in this challenge".into()));
        }
        info!("User {} joined challenge {}", user_id, challenge.id);
        self.refresh(challenge)
    }

    // -- Drinks --

    pub fn log_drink(&self, user_id: &str, challenge_id: Uuid, amount_ml: i64) -> Result<DrinkLogged> {
        let amount_ml = validate::drink_amount(amount_ml)?;

        let challenge = self
            .store
            .get_challenge(challenge_id)?
            .ok_or(Error::NotFound("challenge"))?;
        if !self.store.is_participant(challenge_id, user_id)? {
            return Err(Error::Unauthorized(
                "You are not a participant in this challenge".into(),
            ));
        }

        let challenge = self.refresh(challenge)?;
        if !challenge.is_active() {
            warn!("Rejected drink from {} for ended challenge {}", user_id, challenge_id);
            return Err(Error::ChallengeInactive);
        }

        let drink = Drink {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            challenge_id,
            amount_ml,
            logged_at: self.clock.now(),
        };
        if !self.store.insert_drink_if_active(&drink)? {
            warn!("Challenge {} ended before drink from {} was stored", challenge_id, user_id);
            return Err(Error::ChallengeInactive);
        }
        debug!("Logged {} ml for {} in challenge {}", amount_ml, user_id, challenge_id);

        // The drink is stored at this point. A failed completion write must not
        // turn into an error, or a retry would log the drink twice.
        let challenge = match self.refresh(challenge.clone()) {
            Ok(refreshed) => refreshed,
            Err(e) => {
                error!("Re-evaluating challenge {} after drink failed: {}", challenge_id, e);
                challenge
            }
        };
        Ok(DrinkLogged {
            drink,
            challenge_completed: !challenge.is_active(),
            challenge,
        })
    }

    pub fn drinks(&self, user_id: &str, challenge_id: Uuid) -> Result<Vec<Drink>> {
        Ok(self.store.drinks_for_user(user_id, challenge_id)?)
    }

    // -- Leaderboard --

    /// Totals for participants who have logged something, highest first.
    pub fn leaderboard(&self, challenge_id: Uuid) -> Result<Vec<LeaderboardEntry>> {
        self.challenge(challenge_id)?;
        Ok(self.store.leaderboard(challenge_id)?)
    }

    /// Every participant with their total (zero if idle) and profile.
    pub fn standings(&self, challenge_id: Uuid) -> Result<Vec<Standing>> {
        let board = self.leaderboard(challenge_id)?;
        let participants = self.store.participants(challenge_id)?;

        leaderboard::with_participants(&board, &participants)
            .into_iter()
            .map(|entry| {
                Ok(Standing {
                    user: self.store.get_user(&entry.user_id)?,
                    user_id: entry.user_id,
                    total_ml: entry.total_ml,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::MemoryStore;
    use chrono::{Duration, Utc};
    use hydrate_types::models::{ChallengeType, CompletionReason};

    struct Fixture {
        service: ChallengeService<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture(users: &[&str]) -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = ChallengeService::new(MemoryStore::default(), clock.clone());
        for id in users {
            service
                .ensure_user(&UserProfile {
                    id: id.to_string(),
                    first_name: Some(id.to_uppercase()),
                    ..Default::default()
                })
                .unwrap();
        }
        Fixture { service, clock }
    }

    fn request(target_ml: i64, duration_minutes: Option<i64>) -> CreateChallengeRequest {
        CreateChallengeRequest {
            title: "Hydrate".into(),
            target_ml,
            challenge_type: ChallengeType::Total,
            duration_minutes,
        }
    }

    #[test]
    fn creator_is_enrolled() {
        let f = fixture(&["ann"]);
        let c = f.service.create_challenge("ann", &request(3000, None)).unwrap();

        assert!(c.is_active());
        assert!(f.service.store().is_participant(c.id, "ann").unwrap());
        assert_eq!(f.service.challenge_history("ann").unwrap(), vec![c]);
    }

    #[test]
    fn unknown_creator_is_rejected() {
        let f = fixture(&[]);
        let err = f.service.create_challenge("ghost", &request(3000, None)).unwrap_err();
        assert!(matches!(err, Error::NotFound("user")));
    }

    #[test]
    fn third_drink_reaches_goal() {
        let f = fixture(&["ann"]);
        let c = f.service.create_challenge("ann", &request(3000, None)).unwrap();

        assert!(!f.service.log_drink("ann", c.id, 1000).unwrap().challenge_completed);
        assert!(!f.service.log_drink("ann", c.id, 1000).unwrap().challenge_completed);
        let third = f.service.log_drink("ann", c.id, 1000).unwrap();

        assert!(third.challenge_completed);
        assert_eq!(third.challenge.status, ChallengeStatus::Completed);
        assert_eq!(third.challenge.completion_reason, Some(CompletionReason::MlGoal));

        let stored = f.service.challenge(c.id).unwrap();
        assert_eq!(stored.completion_reason, Some(CompletionReason::MlGoal));
        assert_eq!(stored.end_date, Some(f.clock.now()));
    }

    #[test]
    fn time_limit_expires_without_drinks() {
        let f = fixture(&["ann"]);
        let c = f.service.create_challenge("ann", &request(5000, Some(1))).unwrap();

        f.clock.advance(Duration::seconds(30));
        assert!(f.service.challenge(c.id).unwrap().is_active());

        f.clock.advance(Duration::seconds(31));
        let c = f.service.challenge(c.id).unwrap();
        assert_eq!(c.status, ChallengeStatus::Completed);
        assert_eq!(c.completion_reason, Some(CompletionReason::TimeLimit));
    }

    #[test]
    fn drinks_are_rejected_once_completed() {
        let f = fixture(&["ann"]);
        let c = f.service.create_challenge("ann", &request(1000, None)).unwrap();
        f.service.log_drink("ann", c.id, 1000).unwrap();
        let before = f.service.store().drink_count();

        let err = f.service.log_drink("ann", c.id, 250).unwrap_err();
        assert!(matches!(err, Error::ChallengeInactive));
        assert_eq!(f.service.store().drink_count(), before);
    }

    #[test]
    fn silently_expired_challenge_rejects_drink() {
        let f = fixture(&["ann"]);
        let c = f.service.create_challenge("ann", &request(5000, Some(10))).unwrap();
        f.clock.advance(Duration::minutes(11));

        let err = f.service.log_drink("ann", c.id, 250).unwrap_err();
        assert!(matches!(err, Error::ChallengeInactive));
        assert_eq!(f.service.store().drink_count(), 0);
        assert_eq!(
            f.service.challenge(c.id).unwrap().completion_reason,
            Some(CompletionReason::TimeLimit)
        );
    }

    #[test]
    fn duplicate_join_conflicts() {
        let f = fixture(&["ann", "bob"]);
        let c = f.service.create_challenge("ann", &request(3000, None)).unwrap();

        f.service.join_challenge(c.id, "bob").unwrap();
        let err = f.service.join_challenge(c.id, "bob").unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let err = f.service.join_by_invite(&c.invite_code, "ann").unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(f.service.store().participant_count(c.id), 2);
    }

    #[test]
    fn join_requires_existing_challenge() {
        let f = fixture(&["ann"]);
        assert!(matches!(
            f.service.join_challenge(Uuid::new_v4(), "ann"),
            Err(Error::NotFound("challenge"))
        ));
        assert!(matches!(
            f.service.join_by_invite("nope", "ann"),
            Err(Error::NotFound("challenge"))
        ));
    }

    #[test]
    fn outsiders_cannot_log() {
        let f = fixture(&["ann", "bob"]);
        let c = f.service.create_challenge("ann", &request(3000, None)).unwrap();

        let err = f.service.log_drink("bob", c.id, 250).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
        assert!(matches!(
            f.service.log_drink("bob", Uuid::new_v4(), 250),
            Err(Error::NotFound("challenge"))
        ));
    }

    #[test]
    fn tied_totals_below_target_stay_active() {
        let f = fixture(&["ann", "bob"]);
        let c = f.service.create_challenge("ann", &request(3000, None)).unwrap();
        f.service.join_by_invite(&c.invite_code, "bob").unwrap();

        f.service.log_drink("ann", c.id, 2000).unwrap();
        f.service.log_drink("bob", c.id, 1200).unwrap();
        f.service.log_drink("bob", c.id, 800).unwrap();

        let board = f.service.leaderboard(c.id).unwrap();
        assert_eq!(board.len(), 2);
        assert!(board.iter().all(|e| e.total_ml == 2000));
        assert!(f.service.challenge(c.id).unwrap().is_active());
    }

    #[test]
    fn standings_include_idle_participants() {
        let f = fixture(&["ann", "bob"]);
        let c = f.service.create_challenge("ann", &request(3000, None)).unwrap();
        f.service.join_challenge(c.id, "bob").unwrap();
        f.service.log_drink("bob", c.id, 400).unwrap();

        let standings = f.service.standings(c.id).unwrap();
        let rows: Vec<(&str, u64)> = standings.iter().map(|s| (s.user_id.as_str(), s.total_ml)).collect();
        assert_eq!(rows, vec![("bob", 400), ("ann", 0)]);
        assert_eq!(standings[1].user.as_ref().unwrap().public_name(), "ANN");
    }

    #[test]
    fn validation_runs_before_storage() {
        let f = fixture(&["ann"]);
        let c = f.service.create_challenge("ann", &request(3000, None)).unwrap();
        f.service.store().fail_writes(true);

        assert!(matches!(f.service.log_drink("ann", c.id, 0), Err(Error::Validation(_))));
        assert!(matches!(
            f.service.create_challenge("ann", &request(-5, None)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn failed_completion_write_leaves_challenge_active() {
        let f = fixture(&["ann"]);
        let c = f.service.create_challenge("ann", &request(3000, Some(1))).unwrap();
        f.clock.advance(Duration::minutes(2));

        f.service.store().fail_writes(true);
        assert!(matches!(f.service.challenge(c.id), Err(Error::Storage(_))));
        let stored = f.service.store().get_challenge(c.id).unwrap().unwrap();
        assert!(stored.is_active());
        assert_eq!(stored.end_date, None);

        f.service.store().fail_writes(false);
        assert!(!f.service.challenge(c.id).unwrap().is_active());
    }

    #[test]
    fn drink_survives_failed_completion_write() {
        let f = fixture(&["ann"]);
        let c = f.service.create_challenge("ann", &request(1000, None)).unwrap();
        f.service.store().fail_completions(true);

        let logged = f.service.log_drink("ann", c.id, 1000).unwrap();
        assert!(!logged.challenge_completed);
        assert!(logged.challenge.is_active());
        assert_eq!(f.service.store().drink_count(), 1);

        f.service.store().fail_completions(false);
        let c = f.service.challenge(c.id).unwrap();
        assert_eq!(c.completion_reason, Some(CompletionReason::MlGoal));
        assert_eq!(f.service.store().drink_count(), 1);
    }

    #[test]
    fn later_login_refreshes_profile_but_keeps_settings() {
        let f = fixture(&["ann"]);
        f.service
            .update_settings(
                "ann",
                &UpdateSettingsRequest {
                    display_name: Some("Aqua Ann".into()),
                    liquid_color: Some("#112233".into()),
                },
            )
            .unwrap();

        let user = f
            .service
            .ensure_user(&UserProfile {
                id: "ann".into(),
                email: Some("ann@example.com".into()),
                profile_image_url: Some("https://img.example.com/ann.png".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(user.email.as_deref(), Some("ann@example.com"));
        assert_eq!(user.profile_image_url.as_deref(), Some("https://img.example.com/ann.png"));
        assert_eq!(user.display_name.as_deref(), Some("Aqua Ann"));
        assert_eq!(user.liquid_color, "#112233");
    }

    #[test]
    fn completed_challenge_is_stable() {
        let f = fixture(&["ann"]);
        let c = f.service.create_challenge("ann", &request(500, Some(5))).unwrap();
        f.service.log_drink("ann", c.id, 600).unwrap();

        let first = f.service.challenge(c.id).unwrap();
        f.clock.advance(Duration::hours(1));
        let second = f.service.challenge(c.id).unwrap();
        let third = f.service.refresh(second.clone()).unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(third.completion_reason, Some(CompletionReason::MlGoal));
    }

    #[test]
    fn earlier_completion_wins_over_stale_copy() {
        let f = fixture(&["ann"]);
        let c = f.service.create_challenge("ann", &request(1000, Some(5))).unwrap();
        f.service.log_drink("ann", c.id, 900).unwrap();

        let stale = f.service.store().get_challenge(c.id).unwrap().unwrap();
        let ended_at = f.clock.now();
        f.service
            .store()
            .force_complete(c.id, CompletionReason::MlGoal, ended_at);
        f.clock.advance(Duration::minutes(6));

        // The stale copy would time out, but the stored completion stands.
        let refreshed = f.service.refresh(stale).unwrap();
        assert_eq!(refreshed.completion_reason, Some(CompletionReason::MlGoal));
        assert_eq!(refreshed.end_date, Some(ended_at));
    }

    #[test]
    fn active_list_reports_fresh_completions() {
        let f = fixture(&["ann"]);
        let short = f.service.create_challenge("ann", &request(5000, Some(1))).unwrap();
        let open = f.service.create_challenge("ann", &request(5000, None)).unwrap();
        f.clock.advance(Duration::minutes(2));

        let listed = f.service.active_challenges("ann").unwrap();
        assert_eq!(listed.len(), 2);
        let short_now = listed.iter().find(|c| c.id == short.id).unwrap();
        assert_eq!(short_now.completion_reason, Some(CompletionReason::TimeLimit));
        assert!(listed.iter().find(|c| c.id == open.id).unwrap().is_active());

        let again = f.service.active_challenges("ann").unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].id, open.id);
    }

    #[test]
    fn settings_update_is_validated_and_stored() {
        let f = fixture(&["ann"]);
        let user = f
            .service
            .update_settings(
                "ann",
                &UpdateSettingsRequest {
                    display_name: Some("Aqua Ann".into()),
                    liquid_color: Some("#112233".into()),
                },
            )
            .unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Aqua Ann"));
        assert_eq!(user.liquid_color, "#112233");

        let err = f
            .service
            .update_settings(
                "ann",
                &UpdateSettingsRequest {
                    display_name: None,
                    liquid_color: Some("blue".into()),
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn own_drinks_newest_first() {
        let f = fixture(&["ann"]);
        let c = f.service.create_challenge("ann", &request(10_000, None)).unwrap();
        f.service.log_drink("ann", c.id, 100).unwrap();
        f.clock.advance(Duration::minutes(1));
        f.service.log_drink("ann", c.id, 200).unwrap();

        let amounts: Vec<u32> = f.service.drinks("ann", c.id).unwrap().iter().map(|d| d.amount_ml).collect();
        assert_eq!(amounts, vec![200, 100]);
    }
}
