use anyhow::Result;
use chrono::{DateTime, Utc};
use hydrate_engine::Store;
use hydrate_types::models::{
    Challenge, ChallengeParticipant, CompletionReason, DEFAULT_LIQUID_COLOR, Drink,
    LeaderboardEntry, User, UserProfile,
};
use rusqlite::{Connection, ErrorCode, params};
use uuid::Uuid;

use crate::Database;
use crate::models::{
    CHALLENGE_COLUMNS, ChallengeRow, DrinkRow, ParticipantRow, TotalRow, USER_COLUMNS,
    user_from_row,
};

impl Store for Database {
    // -- Users --

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    fn upsert_user(&self, profile: &UserProfile, now: DateTime<Utc>) -> Result<User> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, first_name, last_name, profile_image_url, liquid_color, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    email = excluded.email,
                    first_name = excluded.first_name,
                    last_name = excluded.last_name,
                    profile_image_url = excluded.profile_image_url,
                    updated_at = excluded.updated_at",
                params![
                    profile.id,
                    profile.email,
                    profile.first_name,
                    profile.last_name,
                    profile.profile_image_url,
                    DEFAULT_LIQUID_COLOR,
                    now,
                ],
            )?;
            query_user(conn, &profile.id)?
                .ok_or_else(|| anyhow::anyhow!("User vanished after upsert: {}", profile.id))
        })
    }

    fn update_user_settings(
        &self,
        id: &str,
        display_name: Option<&str>,
        liquid_color: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    display_name = COALESCE(?2, display_name),
                    liquid_color = COALESCE(?3, liquid_color),
                    updated_at = ?4
                 WHERE id = ?1",
                params![id, display_name, liquid_color, now],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_user(conn, id)
        })
    }

    // -- Challenges --

    fn insert_challenge(&self, challenge: &Challenge, creator: &ChallengeParticipant) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let inserted = tx.execute(
                "INSERT INTO challenges (id, title, creator_id, target_ml, duration_minutes, type, status, invite_code, start_date, end_date, completion_reason, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    challenge.id.to_string(),
                    challenge.title,
                    challenge.creator_id,
                    challenge.target_ml,
                    challenge.duration_minutes,
                    challenge.challenge_type.as_str(),
                    challenge.status.as_str(),
                    challenge.invite_code,
                    challenge.start_date,
                    challenge.end_date,
                    challenge.completion_reason.map(|r| r.as_str()),
                    challenge.created_at,
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e, "challenges.invite_code") => return Ok(false),
                Err(e) => return Err(e.into()),
            }

            insert_participant(&tx, creator)?;
            tx.commit()?;
            Ok(true)
        })
    }

    fn get_challenge(&self, id: Uuid) -> Result<Option<Challenge>> {
        self.with_conn(|conn| {
            query_challenge(conn, &format!("SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE id = ?1"), &id.to_string())
        })
    }

    fn get_challenge_by_invite_code(&self, code: &str) -> Result<Option<Challenge>> {
        self.with_conn(|conn| {
            query_challenge(conn, &format!("SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE invite_code = ?1"), code)
        })
    }

    fn challenges_for_user(&self, user_id: &str) -> Result<Vec<Challenge>> {
        self.with_conn(|conn| query_user_challenges(conn, user_id, false))
    }

    fn active_challenges_for_user(&self, user_id: &str) -> Result<Vec<Challenge>> {
        self.with_conn(|conn| query_user_challenges(conn, user_id, true))
    }

    fn complete_challenge(
        &self,
        id: Uuid,
        end_date: DateTime<Utc>,
        reason: CompletionReason,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE challenges
                 SET status = 'completed', end_date = ?2, completion_reason = ?3
                 WHERE id = ?1 AND status = 'active'",
                params![id.to_string(), end_date, reason.as_str()],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Participants --

    fn add_participant(&self, participant: &ChallengeParticipant) -> Result<bool> {
        self.with_conn_mut(|conn| insert_participant(conn, participant))
    }

    fn participants(&self, challenge_id: Uuid) -> Result<Vec<ChallengeParticipant>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, challenge_id, user_id, joined_at
                 FROM challenge_participants
                 WHERE challenge_id = ?1
                 ORDER BY joined_at, rowid",
            )?;
            let rows = stmt
                .query_map([challenge_id.to_string()], |row| {
                    Ok(ParticipantRow {
                        id: row.get(0)?,
                        challenge_id: row.get(1)?,
                        user_id: row.get(2)?,
                        joined_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(ChallengeParticipant::try_from).collect()
        })
    }

    fn is_participant(&self, challenge_id: Uuid, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM challenge_participants WHERE challenge_id = ?1 AND user_id = ?2)",
                params![challenge_id.to_string(), user_id],
                |row| row.get(0),
            )?;
            Ok(found)
        })
    }

    // -- Drinks --

    fn insert_drink_if_active(&self, drink: &Drink) -> Result<bool> {
        self.with_conn_mut(|conn| {
            // Single statement so a completion can't slip in between check and insert.
            let inserted = conn.execute(
                "INSERT INTO drinks (id, user_id, challenge_id, amount_ml, logged_at)
                 SELECT ?1, ?2, ?3, ?4, ?5
                 WHERE EXISTS (SELECT 1 FROM challenges WHERE id = ?3 AND status = 'active')",
                params![
                    drink.id.to_string(),
                    drink.user_id,
                    drink.challenge_id.to_string(),
                    drink.amount_ml,
                    drink.logged_at,
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    fn drinks_for_user(&self, user_id: &str, challenge_id: Uuid) -> Result<Vec<Drink>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, challenge_id, amount_ml, logged_at
                 FROM drinks
                 WHERE user_id = ?1 AND challenge_id = ?2
                 ORDER BY logged_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map(params![user_id, challenge_id.to_string()], |row| {
                    Ok(DrinkRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        challenge_id: row.get(2)?,
                        amount_ml: row.get(3)?,
                        logged_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(Drink::try_from).collect()
        })
    }

    fn leaderboard(&self, challenge_id: Uuid) -> Result<Vec<LeaderboardEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, SUM(amount_ml) AS total_ml
                 FROM drinks
                 WHERE challenge_id = ?1
                 GROUP BY user_id
                 ORDER BY total_ml DESC, user_id ASC",
            )?;
            let rows = stmt
                .query_map([challenge_id.to_string()], |row| {
                    Ok(TotalRow {
                        user_id: row.get(0)?,
                        total_ml: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(LeaderboardEntry::try_from).collect()
        })
    }
}

fn query_user(conn: &Connection, id: &str) -> Result<Option<User>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
    let user = stmt.query_row([id], user_from_row).optional()?;
    Ok(user)
}

fn query_challenge(conn: &Connection, sql: &str, key: &str) -> Result<Option<Challenge>> {
    let mut stmt = conn.prepare(sql)?;
    let row = stmt.query_row([key], ChallengeRow::from_row).optional()?;
    row.map(Challenge::try_from).transpose()
}

fn query_user_challenges(conn: &Connection, user_id: &str, active_only: bool) -> Result<Vec<Challenge>> {
    let columns = CHALLENGE_COLUMNS
        .split(", ")
        .map(|c| format!("c.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!(
        "SELECT {columns}
         FROM challenge_participants p
         JOIN challenges c ON p.challenge_id = c.id
         WHERE p.user_id = ?1"
    );
    if active_only {
        sql.push_str(" AND c.status = 'active'");
    }
    sql.push_str(" ORDER BY c.created_at DESC, c.rowid DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([user_id], ChallengeRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(Challenge::try_from).collect()
}

/// Returns `false` when the (challenge, user) pair already exists.
fn insert_participant(conn: &Connection, participant: &ChallengeParticipant) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO challenge_participants (id, challenge_id, user_id, joined_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(challenge_id, user_id) DO NOTHING",
        params![
            participant.id.to_string(),
            participant.challenge_id.to_string(),
            participant.user_id,
            participant.joined_at,
        ],
    )?;
    Ok(inserted == 1)
}

fn is_unique_violation(err: &rusqlite::Error, column: &str) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == ErrorCode::ConstraintViolation && msg.contains(column)
    )
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
