use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle and scoring events fanned out to connected team members
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    InstanceStarted,
    InstanceStopped,
    InstanceKilled,
    InstanceExpired,
    ChallengeSolved,
    FirstBlood,
}

/// Payload published through the event hub
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamEvent {
    pub kind: EventKind,
    pub team_id: Uuid,
    pub challenge_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub at: DateTime<Utc>,
}

impl TeamEvent {
    pub fn new(kind: EventKind, team_id: Uuid, challenge_id: Uuid) -> Self {
        Self {
            kind,
            team_id,
            challenge_id,
            message: None,
            at: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
