use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Instance status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Running,
    Stopped,
    Expired,
}

impl InstanceStatus {
    /// Terminal statuses do not count against capacity and do not block starts
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InstanceStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Running => "running",
            InstanceStatus::Stopped => "stopped",
            InstanceStatus::Expired => "expired",
        }
    }
}

impl From<&str> for InstanceStatus {
    fn from(s: &str) -> Self {
        match s {
            "running" => InstanceStatus::Running,
            "expired" => InstanceStatus::Expired,
            _ => InstanceStatus::Stopped,
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One running or recently-stopped challenge environment bound to a team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: Uuid,
    /// Opaque handle issued by the container runtime
    pub container_ref: String,
    /// User who started the instance
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub challenge_id: Uuid,
    /// Host ports, parallel to the challenge's declared internal ports
    pub assigned_ports: Vec<u16>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: InstanceStatus,
}

impl Instance {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Per (team, challenge) restart rate-limit record, upserted on every stop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownRecord {
    pub team_id: Uuid,
    pub challenge_id: Uuid,
    pub last_stopped_at: DateTime<Utc>,
}

/// Successful start result handed back to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceHandle {
    pub container_ref: String,
    pub ports: Vec<u16>,
    pub expires_at: DateTime<Utc>,
}

/// Read-only instance view for a team's challenge page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatusView {
    pub has_instance: bool,
    pub status: Option<InstanceStatus>,
    pub ports: Vec<u16>,
    pub connection_info: Option<String>,
    pub is_expired: bool,
}

impl InstanceStatusView {
    pub fn absent() -> Self {
        Self {
            has_instance: false,
            status: None,
            ports: vec![],
            connection_info: None,
            is_expired: false,
        }
    }
}
