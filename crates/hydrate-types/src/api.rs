use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Challenge, ChallengeType, Drink};

// -- Identity --

/// Claims carried by tokens from the external identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    pub exp: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub display_name: Option<String>,
    pub liquid_color: Option<String>,
}

// -- Challenges --

/// Numeric fields are signed so that negative input reaches validation
/// instead of failing deserialization with an opaque message.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateChallengeRequest {
    pub title: String,
    pub target_ml: i64,
    #[serde(rename = "type")]
    pub challenge_type: ChallengeType,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub success: bool,
    pub challenge: Challenge,
}

/// One leaderboard row, including participants with nothing logged yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardParticipant {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub color: String,
    pub current_ml: u64,
}

// -- Drinks --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct LogDrinkRequest {
    #[serde(default)]
    pub challenge_id: Option<Uuid>,
    pub amount_ml: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogDrinkResponse {
    pub drink: Drink,
    pub challenge_completed: bool,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
