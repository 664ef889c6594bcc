//! Database row types, mapped one-to-one onto SQLite columns and converted
//! into the shared models once read.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use hydrate_types::models::{
    Challenge, ChallengeParticipant, CompletionReason, Drink, LeaderboardEntry, User,
};
use rusqlite::Row;

pub const CHALLENGE_COLUMNS: &str = "id, title, creator_id, target_ml, duration_minutes, type, \
     status, invite_code, start_date, end_date, completion_reason, created_at";

pub const USER_COLUMNS: &str = "id, email, first_name, last_name, profile_image_url, \
     display_name, liquid_color, created_at, updated_at";

pub struct ChallengeRow {
    pub id: String,
    pub title: String,
    pub creator_id: String,
    pub target_ml: i64,
    pub duration_minutes: Option<i64>,
    pub challenge_type: String,
    pub status: String,
    pub invite_code: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub completion_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChallengeRow {
    /// Expects the columns in `CHALLENGE_COLUMNS` order.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            creator_id: row.get(2)?,
            target_ml: row.get(3)?,
            duration_minutes: row.get(4)?,
            challenge_type: row.get(5)?,
            status: row.get(6)?,
            invite_code: row.get(7)?,
            start_date: row.get(8)?,
            end_date: row.get(9)?,
            completion_reason: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

impl TryFrom<ChallengeRow> for Challenge {
    type Error = anyhow::Error;

    fn try_from(row: ChallengeRow) -> Result<Self> {
        Ok(Challenge {
            id: row.id.parse().with_context(|| format!("corrupt challenge id '{}'", row.id))?,
            title: row.title,
            creator_id: row.creator_id,
            target_ml: u32::try_from(row.target_ml).context("target_ml out of range")?,
            duration_minutes: row
                .duration_minutes
                .map(u32::try_from)
                .transpose()
                .context("duration_minutes out of range")?,
            challenge_type: row.challenge_type.parse()?,
            status: row.status.parse()?,
            invite_code: row.invite_code,
            start_date: row.start_date,
            end_date: row.end_date,
            completion_reason: row
                .completion_reason
                .map(|r| r.parse::<CompletionReason>())
                .transpose()?,
            created_at: row.created_at,
        })
    }
}

pub struct ParticipantRow {
    pub id: String,
    pub challenge_id: String,
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
}

impl TryFrom<ParticipantRow> for ChallengeParticipant {
    type Error = anyhow::Error;

    fn try_from(row: ParticipantRow) -> Result<Self> {
        Ok(ChallengeParticipant {
            id: row.id.parse().context("corrupt participant id")?,
            challenge_id: row.challenge_id.parse().context("corrupt participant challenge_id")?,
            user_id: row.user_id,
            joined_at: row.joined_at,
        })
    }
}

pub struct DrinkRow {
    pub id: String,
    pub user_id: String,
    pub challenge_id: String,
    pub amount_ml: i64,
    pub logged_at: DateTime<Utc>,
}

impl TryFrom<DrinkRow> for Drink {
    type Error = anyhow::Error;

    fn try_from(row: DrinkRow) -> Result<Self> {
        Ok(Drink {
            id: row.id.parse().context("corrupt drink id")?,
            user_id: row.user_id,
            challenge_id: row.challenge_id.parse().context("corrupt drink challenge_id")?,
            amount_ml: u32::try_from(row.amount_ml).context("amount_ml out of range")?,
            logged_at: row.logged_at,
        })
    }
}

pub struct TotalRow {
    pub user_id: String,
    pub total_ml: i64,
}

impl TryFrom<TotalRow> for LeaderboardEntry {
    type Error = anyhow::Error;

    fn try_from(row: TotalRow) -> Result<Self> {
        Ok(LeaderboardEntry {
            total_ml: u64::try_from(row.total_ml)
                .with_context(|| format!("negative total for user {}", row.user_id))?,
            user_id: row.user_id,
        })
    }
}

/// Expects the columns in `USER_COLUMNS` order.
pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        profile_image_url: row.get(4)?,
        display_name: row.get(5)?,
        liquid_color: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}
