//! In-memory `Store` used by the service tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use hydrate_types::models::{
    Challenge, ChallengeParticipant, ChallengeStatus, CompletionReason, DEFAULT_LIQUID_COLOR, Drink,
    LeaderboardEntry, User, UserProfile,
};
use uuid::Uuid;

use crate::leaderboard;
use crate::store::Store;

#[derive(Default)]
struct State {
    users: HashMap<String, User>,
    challenges: Vec<Challenge>,
    participants: Vec<ChallengeParticipant>,
    drinks: Vec<Drink>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_writes: AtomicBool,
    fail_completions: AtomicBool,
}

impl MemoryStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Fail only `complete_challenge`, leaving other writes working.
    pub fn fail_completions(&self, fail: bool) {
        self.fail_completions.store(fail, Ordering::SeqCst);
    }

    pub fn drink_count(&self) -> usize {
        self.state.lock().unwrap().drinks.len()
    }

    pub fn participant_count(&self, challenge_id: Uuid) -> usize {
        self.state
            .lock()
            .unwrap()
            .participants
            .iter()
            .filter(|p| p.challenge_id == challenge_id)
            .count()
    }

    /// Flip a challenge to completed behind the service's back.
    pub fn force_complete(&self, id: Uuid, reason: CompletionReason, at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        if let Some(c) = state.challenges.iter_mut().find(|c| c.id == id) {
            c.status = ChallengeStatus::Completed;
            c.end_date = Some(at);
            c.completion_reason = Some(reason);
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("simulated write failure");
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.state.lock().unwrap().users.get(id).cloned())
    }

    fn upsert_user(&self, profile: &UserProfile, now: DateTime<Utc>) -> Result<User> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let user = state.users.entry(profile.id.clone()).or_insert_with(|| User {
            id: profile.id.clone(),
            email: None,
            first_name: None,
            last_name: None,
            profile_image_url: None,
            display_name: None,
            liquid_color: DEFAULT_LIQUID_COLOR.to_string(),
            created_at: now,
            updated_at: now,
        });
        user.email = profile.email.clone();
        user.first_name = profile.first_name.clone();
        user.last_name = profile.last_name.clone();
        user.profile_image_url = profile.profile_image_url.clone();
        user.updated_at = now;
        Ok(user.clone())
    }

    fn update_user_settings(
        &self,
        id: &str,
        display_name: Option<&str>,
        liquid_color: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        Ok(state.users.get_mut(id).map(|user| {
            if let Some(name) = display_name {
                user.display_name = Some(name.to_string());
            }
            if let Some(color) = liquid_color {
                user.liquid_color = color.to_string();
            }
            user.updated_at = now;
            user.clone()
        }))
    }

    fn insert_challenge(&self, challenge: &Challenge, creator: &ChallengeParticipant) -> Result<bool> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        if state.challenges.iter().any(|c| c.invite_code == challenge.invite_code) {
            return Ok(false);
        }
        state.challenges.push(challenge.clone());
        state.participants.push(creator.clone());
        Ok(true)
    }

    fn get_challenge(&self, id: Uuid) -> Result<Option<Challenge>> {
        let state = self.state.lock().unwrap();
        Ok(state.challenges.iter().find(|c| c.id == id).cloned())
    }

    fn get_challenge_by_invite_code(&self, code: &str) -> Result<Option<Challenge>> {
        let state = self.state.lock().unwrap();
        Ok(state.challenges.iter().find(|c| c.invite_code == code).cloned())
    }

    fn challenges_for_user(&self, user_id: &str) -> Result<Vec<Challenge>> {
        let state = self.state.lock().unwrap();
        let mut found: Vec<Challenge> = state
            .challenges
            .iter()
            .filter(|c| {
                state
                    .participants
                    .iter()
                    .any(|p| p.challenge_id == c.id && p.user_id == user_id)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    fn active_challenges_for_user(&self, user_id: &str) -> Result<Vec<Challenge>> {
        Ok(self
            .challenges_for_user(user_id)?
            .into_iter()
            .filter(|c| c.is_active())
            .collect())
    }

    fn complete_challenge(
        &self,
        id: Uuid,
        end_date: DateTime<Utc>,
        reason: CompletionReason,
    ) -> Result<bool> {
        self.check_writable()?;
        if self.fail_completions.load(Ordering::SeqCst) {
            bail!("simulated completion failure");
        }
        let mut state = self.state.lock().unwrap();
        match state.challenges.iter_mut().find(|c| c.id == id && c.is_active()) {
            Some(c) => {
                c.status = ChallengeStatus::Completed;
                c.end_date = Some(end_date);
                c.completion_reason = Some(reason);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn add_participant(&self, participant: &ChallengeParticipant) -> Result<bool> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        if state
            .participants
            .iter()
            .any(|p| p.challenge_id == participant.challenge_id && p.user_id == participant.user_id)
        {
            return Ok(false);
        }
        state.participants.push(participant.clone());
        Ok(true)
    }

    fn participants(&self, challenge_id: Uuid) -> Result<Vec<ChallengeParticipant>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .participants
            .iter()
            .filter(|p| p.challenge_id == challenge_id)
            .cloned()
            .collect())
    }

    fn is_participant(&self, challenge_id: Uuid, user_id: &str) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state
            .participants
            .iter()
            .any(|p| p.challenge_id == challenge_id && p.user_id == user_id))
    }

    fn insert_drink_if_active(&self, drink: &Drink) -> Result<bool> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let active = state
            .challenges
            .iter()
            .any(|c| c.id == drink.challenge_id && c.is_active());
        if active {
            state.drinks.push(drink.clone());
        }
        Ok(active)
    }

    fn drinks_for_user(&self, user_id: &str, challenge_id: Uuid) -> Result<Vec<Drink>> {
        let state = self.state.lock().unwrap();
        let mut drinks: Vec<Drink> = state
            .drinks
            .iter()
            .filter(|d| d.user_id == user_id && d.challenge_id == challenge_id)
            .cloned()
            .collect();
        drinks.reverse();
        Ok(drinks)
    }

    fn leaderboard(&self, challenge_id: Uuid) -> Result<Vec<LeaderboardEntry>> {
        let state = self.state.lock().unwrap();
        Ok(leaderboard::aggregate(challenge_id, &state.drinks))
    }
}
