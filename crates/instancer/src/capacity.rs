//! Instance count ceilings per user and per team

use ctf_platform_models::{PlatformError, PlatformResult};
use ctf_platform_storage::InstanceStore;
use std::sync::Arc;
use uuid::Uuid;

/// Read-side capacity checks against the instance store.
///
/// Holds no state of its own; ceilings are passed in at check time so
/// configuration changes apply to the next request. The check-to-commit
/// race is closed by the store's uniqueness guarantee, not here.
pub struct CapacityGuard {
    instances: Arc<dyn InstanceStore>,
}

impl CapacityGuard {
    pub fn new(instances: Arc<dyn InstanceStore>) -> Self {
        Self { instances }
    }

    pub async fn check_user(&self, user_id: Uuid, limit: u32) -> PlatformResult<()> {
        let running = self.instances.count_running_by_user(user_id).await?;
        if running >= limit {
            return Err(PlatformError::UserCapacityExceeded { limit });
        }
        Ok(())
    }

    pub async fn check_team(&self, team_id: Uuid, limit: u32) -> PlatformResult<()> {
        let running = self.instances.count_running_by_team(team_id).await?;
        if running >= limit {
            return Err(PlatformError::TeamCapacityExceeded { limit });
        }
        Ok(())
    }
}
