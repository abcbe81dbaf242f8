//! Restart cooldown enforcement per (team, challenge)

use anyhow::Result;
use chrono::{DateTime, Utc};
use ctf_platform_models::{PlatformError, PlatformResult};
use ctf_platform_storage::CooldownStore;
use std::sync::Arc;
use uuid::Uuid;

/// Gates restart timing against the last recorded stop
pub struct CooldownTracker {
    store: Arc<dyn CooldownStore>,
}

impl CooldownTracker {
    pub fn new(store: Arc<dyn CooldownStore>) -> Self {
        Self { store }
    }

    /// Fail with the remaining wait when the window has not elapsed.
    /// A zero window disables enforcement.
    pub async fn check(
        &self,
        team_id: Uuid,
        challenge_id: Uuid,
        window_secs: u64,
        now: DateTime<Utc>,
    ) -> PlatformResult<()> {
        if window_secs == 0 {
            return Ok(());
        }

        if let Some(last_stopped_at) = self.store.get(team_id, challenge_id).await? {
            let elapsed = now - last_stopped_at;
            let window = chrono::Duration::seconds(window_secs as i64);
            if elapsed < window {
                return Err(PlatformError::CooldownActive {
                    remaining_seconds: (window - elapsed).num_seconds().max(1),
                });
            }
        }
        Ok(())
    }

    /// Upsert the last-stop timestamp
    pub async fn record(&self, team_id: Uuid, challenge_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.store.record(team_id, challenge_id, at).await
    }
}
