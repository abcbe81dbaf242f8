//! Instance stop, kill and solve-triggered teardown

use crate::service::InstanceService;
use crate::teardown::TeardownTask;
use chrono::Utc;
use ctf_platform_models::*;
use tracing::{info, warn};
use uuid::Uuid;

impl InstanceService {
    /// Graceful stop.
    ///
    /// The cooldown is recorded synchronously before the teardown is queued;
    /// this closes the window where a restart could slip in while the
    /// container is still going down. The row is deleted by the teardown
    /// worker, so a later start sees no instance.
    pub async fn stop(&self, actor: Actor, team_id: Uuid, challenge_id: Uuid) -> PlatformResult<()> {
        let instance = self
            .instances
            .find_running(team_id, challenge_id)
            .await?
            .ok_or(PlatformError::InstanceNotFound)?;

        let authorized =
            actor.is_admin || instance.user_id == actor.user_id || instance.team_id == actor.team_id;
        if !authorized {
            return Err(PlatformError::Forbidden {
                reason: "instance belongs to another team".to_string(),
            });
        }

        if let Err(e) = self
            .cooldowns
            .record(team_id, challenge_id, Utc::now())
            .await
        {
            warn!(team_id = %team_id, challenge_id = %challenge_id, error = %e, "Failed to record cooldown");
        }

        self.teardown
            .submit(TeardownTask {
                instance_id: instance.id,
                container_ref: instance.container_ref,
                assigned_ports: instance.assigned_ports,
                team_id,
                challenge_id,
                delete_row: true,
                event: Some(TeamEvent::new(
                    EventKind::InstanceStopped,
                    team_id,
                    challenge_id,
                )),
                exclude_user: actor.user_id,
            })
            .await;

        info!(team_id = %team_id, challenge_id = %challenge_id, "Instance stop queued");
        Ok(())
    }

    /// Forceful kill, synchronous.
    ///
    /// Requires admin role or ownership. Unlike stop, the row is retained
    /// with status `stopped` as an audit trail of the forced teardown.
    pub async fn kill(&self, actor: Actor, team_id: Uuid, challenge_id: Uuid) -> PlatformResult<()> {
        let instance = self
            .instances
            .find_running(team_id, challenge_id)
            .await?
            .ok_or(PlatformError::InstanceNotFound)?;

        if !(actor.is_admin || instance.user_id == actor.user_id) {
            return Err(PlatformError::Forbidden {
                reason: "kill requires admin role or instance ownership".to_string(),
            });
        }

        self.runtime
            .stop_instance(&instance.container_ref)
            .await
            .map_err(|e| PlatformError::RuntimeUnavailable {
                reason: e.to_string(),
            })?;
        self.ports.release(&instance.assigned_ports);

        self.instances
            .transition_from_running(instance.id, InstanceStatus::Stopped)
            .await?;

        if let Err(e) = self
            .cooldowns
            .record(team_id, challenge_id, Utc::now())
            .await
        {
            warn!(team_id = %team_id, challenge_id = %challenge_id, error = %e, "Failed to record cooldown");
        }

        self.events
            .publish_to_team_except(
                team_id,
                actor.user_id,
                TeamEvent::new(EventKind::InstanceKilled, team_id, challenge_id),
            )
            .await;

        info!(
            team_id = %team_id,
            challenge_id = %challenge_id,
            container_ref = %instance.container_ref,
            "Instance killed"
        );
        Ok(())
    }

    /// Tear down the team's instance after a successful solve.
    ///
    /// Entirely best-effort: the solve is already recorded, so every failure
    /// here is logged and swallowed rather than surfaced to the solver.
    pub async fn stop_on_solve(&self, team_id: Uuid, challenge_id: Uuid) {
        let instance = match self.instances.find_running(team_id, challenge_id).await {
            Ok(Some(instance)) => instance,
            Ok(None) => return,
            Err(e) => {
                warn!(
                    team_id = %team_id,
                    challenge_id = %challenge_id,
                    error = %e,
                    "Failed to look up instance after solve"
                );
                return;
            }
        };

        self.teardown
            .submit(TeardownTask {
                instance_id: instance.id,
                container_ref: instance.container_ref,
                assigned_ports: instance.assigned_ports,
                team_id,
                challenge_id,
                delete_row: true,
                event: Some(TeamEvent::new(
                    EventKind::InstanceStopped,
                    team_id,
                    challenge_id,
                )),
                exclude_user: Uuid::nil(),
            })
            .await;

        info!(team_id = %team_id, challenge_id = %challenge_id, "Instance teardown queued after solve");
    }
}
