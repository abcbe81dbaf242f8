//! Database row structures and model conversions

use chrono::{DateTime, Utc};
use ctf_platform_models::*;
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use tracing::warn;
use uuid::Uuid;

/// Database row for the instances table
#[derive(Debug, FromRow)]
pub struct InstanceRow {
    pub id: Uuid,
    pub container_ref: String,
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub challenge_id: Uuid,
    pub assigned_ports: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: String,
}

impl From<InstanceRow> for Instance {
    fn from(row: InstanceRow) -> Self {
        Instance {
            id: row.id,
            container_ref: row.container_ref,
            user_id: row.user_id,
            team_id: row.team_id,
            challenge_id: row.challenge_id,
            assigned_ports: row.assigned_ports.iter().map(|p| *p as u16).collect(),
            created_at: row.created_at,
            expires_at: row.expires_at,
            status: InstanceStatus::from(row.status.as_str()),
        }
    }
}

/// Database row for the solves table
#[derive(Debug, FromRow)]
pub struct SolveRow {
    pub id: Uuid,
    pub team_id: Uuid,
    pub challenge_id: Uuid,
    pub user_id: Uuid,
    pub points: i64,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl From<SolveRow> for Solve {
    fn from(row: SolveRow) -> Self {
        Solve {
            id: row.id,
            team_id: row.team_id,
            challenge_id: row.challenge_id,
            user_id: row.user_id,
            points: row.points,
            position: row.position,
            created_at: row.created_at,
        }
    }
}

/// Database row for the first_bloods table
#[derive(Debug, FromRow)]
pub struct FirstBloodRow {
    pub id: Uuid,
    pub challenge_id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub position: i32,
    pub bonus: i64,
    pub badges: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<FirstBloodRow> for FirstBlood {
    fn from(row: FirstBloodRow) -> Self {
        FirstBlood {
            id: row.id,
            challenge_id: row.challenge_id,
            team_id: row.team_id,
            user_id: row.user_id,
            position: row.position,
            bonus: row.bonus,
            badges: row.badges,
            created_at: row.created_at,
        }
    }
}

/// Database row for the challenges table
#[derive(Debug, FromRow)]
pub struct ChallengeRow {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub kind: String,
    pub base_points: i64,
    pub flag: String,
    pub decay: Option<JsonValue>,
    pub declared_ports: Vec<i32>,
    pub enable_first_blood: bool,
    pub first_blood_bonuses: Vec<i64>,
    pub first_blood_badges: Vec<String>,
    pub connection_template: Option<String>,
    pub image: Option<String>,
    pub compose_yaml: Option<String>,
    pub instance_timeout_secs: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChallengeRow> for Challenge {
    fn from(row: ChallengeRow) -> Self {
        // Decay formulas are admin-edited JSONB; a malformed one falls back
        // to no decay rather than failing the whole challenge load
        let decay = row.decay.and_then(|value| {
            match serde_json::from_value::<DecayFormula>(value) {
                Ok(formula) => Some(formula),
                Err(e) => {
                    warn!(challenge = %row.slug, error = %e, "Ignoring malformed decay formula");
                    None
                }
            }
        });

        Challenge {
            id: row.id,
            slug: row.slug,
            title: row.title,
            kind: ChallengeKind::from(row.kind.as_str()),
            base_points: row.base_points,
            flag: row.flag,
            decay,
            declared_ports: row.declared_ports.iter().map(|p| *p as u16).collect(),
            enable_first_blood: row.enable_first_blood,
            first_blood_bonuses: row.first_blood_bonuses,
            first_blood_badges: row.first_blood_badges,
            connection_template: row.connection_template,
            image: row.image,
            compose_yaml: row.compose_yaml,
            instance_timeout_secs: row.instance_timeout_secs.map(|s| s as u64),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
