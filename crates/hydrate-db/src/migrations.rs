use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                email               TEXT,
                first_name          TEXT,
                last_name           TEXT,
                profile_image_url   TEXT,
                display_name        TEXT,
                liquid_color        TEXT NOT NULL DEFAULT '#06b6d4',
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE TABLE challenges (
                id                  TEXT PRIMARY KEY,
                title               TEXT NOT NULL,
                creator_id          TEXT NOT NULL REFERENCES users(id),
                target_ml           INTEGER NOT NULL CHECK (target_ml > 0),
                duration_minutes    INTEGER CHECK (duration_minutes IS NULL OR duration_minutes > 0),
                type                TEXT NOT NULL CHECK (type IN ('daily', 'total')),
                status              TEXT NOT NULL DEFAULT 'active'
                                        CHECK (status IN ('active', 'completed')),
                invite_code         TEXT NOT NULL UNIQUE,
                start_date          TEXT NOT NULL,
                end_date            TEXT,
                completion_reason   TEXT CHECK (completion_reason IN ('time_limit', 'ml_goal')),
                created_at          TEXT NOT NULL
            );

            CREATE TABLE challenge_participants (
                id              TEXT PRIMARY KEY,
                challenge_id    TEXT NOT NULL REFERENCES challenges(id),
                user_id         TEXT NOT NULL REFERENCES users(id),
                joined_at       TEXT NOT NULL,
                UNIQUE(challenge_id, user_id)
            );

            CREATE INDEX idx_participants_user
                ON challenge_participants(user_id);

            CREATE TABLE drinks (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id),
                challenge_id    TEXT NOT NULL REFERENCES challenges(id),
                amount_ml       INTEGER NOT NULL CHECK (amount_ml > 0),
                logged_at       TEXT NOT NULL
            );

            CREATE INDEX idx_drinks_challenge
                ON drinks(challenge_id, user_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
