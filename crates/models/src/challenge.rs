use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Challenge kind; only container-backed kinds can have instances
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    Static,
    Container,
    Compose,
}

impl ChallengeKind {
    pub fn supports_instances(&self) -> bool {
        matches!(self, ChallengeKind::Container | ChallengeKind::Compose)
    }
}

impl From<&str> for ChallengeKind {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "container" => ChallengeKind::Container,
            "compose" => ChallengeKind::Compose,
            _ => ChallengeKind::Static,
        }
    }
}

impl std::fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChallengeKind::Static => write!(f, "static"),
            ChallengeKind::Container => write!(f, "container"),
            ChallengeKind::Compose => write!(f, "compose"),
        }
    }
}

/// Point-decay formula kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecayKind {
    None,
    Linear,
    Logarithmic,
    Custom,
}

impl From<&str> for DecayKind {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "linear" => DecayKind::Linear,
            "logarithmic" => DecayKind::Logarithmic,
            "custom" => DecayKind::Custom,
            _ => DecayKind::None,
        }
    }
}

impl std::fmt::Display for DecayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecayKind::None => write!(f, "none"),
            DecayKind::Linear => write!(f, "linear"),
            DecayKind::Logarithmic => write!(f, "logarithmic"),
            DecayKind::Custom => write!(f, "custom"),
        }
    }
}

/// Admin-edited decay formula, immutable reference data at solve time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayFormula {
    pub id: Uuid,
    pub kind: DecayKind,
    /// Floor for decayed points; never awarded below this
    pub min_points: i64,
    /// Cap on the decayed fraction of base points, 0..=1
    pub max_decay: f64,
    pub decay_rate: f64,
    pub linear_step: i64,
    pub logarithmic_base: f64,
}

impl DecayFormula {
    pub fn none() -> Self {
        Self {
            id: Uuid::nil(),
            kind: DecayKind::None,
            min_points: 0,
            max_decay: 0.0,
            decay_rate: 0.0,
            linear_step: 0,
            logarithmic_base: 2.0,
        }
    }
}

/// Challenge definition, core-relevant subset.
///
/// Created by admin CRUD or the sync job; the instance and scoring services
/// treat it as read-only reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub kind: ChallengeKind,
    pub base_points: i64,
    /// Expected flag; compared constant-time on submission
    #[serde(skip_serializing)]
    pub flag: String,
    pub decay: Option<DecayFormula>,
    /// Internal ports the challenge container listens on, order significant
    pub declared_ports: Vec<u16>,
    pub enable_first_blood: bool,
    /// Bonus points by solve position (index 0 = first solver)
    pub first_blood_bonuses: Vec<i64>,
    pub first_blood_badges: Vec<String>,
    /// Template with `{host}` and `{port:N}` tokens, N a declared internal port
    pub connection_template: Option<String>,
    /// Image tag for `container` kind
    pub image: Option<String>,
    /// Compose document for `compose` kind
    pub compose_yaml: Option<String>,
    /// Per-challenge instance lifetime override, seconds
    pub instance_timeout_secs: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Challenge {
    /// Effective instance lifetime, falling back to the platform default
    pub fn instance_timeout(&self, default_secs: u64) -> chrono::Duration {
        let secs = self.instance_timeout_secs.unwrap_or(default_secs);
        chrono::Duration::seconds(secs as i64)
    }
}
