//! Input checks that run before anything touches the store.

use hydrate_types::api::{CreateChallengeRequest, UpdateSettingsRequest};
use hydrate_types::models::ChallengeType;

use crate::error::{Error, Result};

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DISPLAY_NAME_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChallenge {
    pub title: String,
    pub target_ml: u32,
    pub challenge_type: ChallengeType,
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSettings {
    pub display_name: Option<String>,
    pub liquid_color: Option<String>,
}

pub fn new_challenge(req: &CreateChallengeRequest) -> Result<NewChallenge> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(Error::validation("title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }

    let target_ml = positive("targetMl", req.target_ml)?;
    let duration_minutes = req
        .duration_minutes
        .map(|minutes| positive("durationMinutes", minutes))
        .transpose()?;

    Ok(NewChallenge {
        title: title.to_string(),
        target_ml,
        challenge_type: req.challenge_type,
        duration_minutes,
    })
}

pub fn drink_amount(amount_ml: i64) -> Result<u32> {
    positive("amountMl", amount_ml)
}

pub fn settings(req: &UpdateSettingsRequest) -> Result<UserSettings> {
    if let Some(name) = &req.display_name {
        let len = name.chars().count();
        if len == 0 || len > MAX_DISPLAY_NAME_LEN {
            return Err(Error::validation(format!(
                "displayName must be between 1 and {MAX_DISPLAY_NAME_LEN} characters"
            )));
        }
    }
    if let Some(color) = &req.liquid_color {
        if !is_hex_color(color) {
            return Err(Error::validation("liquidColor must look like #RRGGBB"));
        }
    }

    Ok(UserSettings {
        display_name: req.display_name.clone(),
        liquid_color: req.liquid_color.clone(),
    })
}

fn positive(field: &str, value: i64) -> Result<u32> {
    if value <= 0 {
        return Err(Error::validation(format!("{field} must be a positive integer")));
    }
    u32::try_from(value).map_err(|_| Error::validation(format!("{field} is too large")))
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str, target_ml: i64, duration_minutes: Option<i64>) -> CreateChallengeRequest {
        CreateChallengeRequest {
            title: title.to_string(),
            target_ml,
            challenge_type: ChallengeType::Total,
            duration_minutes,
        }
    }

    #[test]
    fn accepts_a_well_formed_challenge() {
        let valid = new_challenge(&request("  Office race ", 3000, Some(60))).unwrap();
        assert_eq!(valid.title, "Office race");
        assert_eq!(valid.target_ml, 3000);
        assert_eq!(valid.duration_minutes, Some(60));
    }

    #[test]
    fn rejects_non_positive_numbers() {
        assert!(matches!(new_challenge(&request("t", 0, None)), Err(Error::Validation(_))));
        assert!(matches!(new_challenge(&request("t", 100, Some(0))), Err(Error::Validation(_))));
        assert!(matches!(drink_amount(-250), Err(Error::Validation(_))));
        assert!(matches!(drink_amount(i64::from(u32::MAX) + 1), Err(Error::Validation(_))));
        assert_eq!(drink_amount(250).unwrap(), 250);
    }

    #[test]
    fn rejects_blank_title() {
        assert!(matches!(new_challenge(&request("   ", 100, None)), Err(Error::Validation(_))));
    }

    #[test]
    fn checks_settings() {
        let ok = UpdateSettingsRequest {
            display_name: Some("Ada".into()),
            liquid_color: Some("#A0b1C2".into()),
        };
        assert!(settings(&ok).is_ok());

        let bad_color = UpdateSettingsRequest {
            display_name: None,
            liquid_color: Some("06b6d4".into()),
        };
        assert!(matches!(settings(&bad_color), Err(Error::Validation(_))));

        let empty_name = UpdateSettingsRequest {
            display_name: Some(String::new()),
            liquid_color: None,
        };
        assert!(matches!(settings(&empty_name), Err(Error::Validation(_))));
    }
}
