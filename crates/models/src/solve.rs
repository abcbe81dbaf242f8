use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A team's accepted flag submission; points are frozen as awarded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solve {
    pub id: Uuid,
    pub team_id: Uuid,
    pub challenge_id: Uuid,
    /// Submitting user
    pub user_id: Uuid,
    /// Awarded points including any first-blood bonus
    pub points: i64,
    /// Zero-based rank among solves for the challenge, by submission time
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// First-blood award recorded alongside an early solve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirstBlood {
    pub id: Uuid,
    pub challenge_id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    /// Solve position the bonus was granted for
    pub position: i32,
    pub bonus: i64,
    pub badges: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Flag submission request body
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitFlagRequest {
    pub flag: String,
}

/// Flag submission outcome
#[derive(Debug, Clone, Serialize)]
pub struct SubmitFlagOutcome {
    pub solved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_awarded: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_blood_bonus: Option<i64>,
}

impl SubmitFlagOutcome {
    pub fn rejected() -> Self {
        Self {
            solved: false,
            points_awarded: None,
            first_blood_bonus: None,
        }
    }
}
