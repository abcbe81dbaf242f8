//! Instance start flow

use crate::service::InstanceService;
use chrono::Utc;
use ctf_platform_models::*;
use ctf_platform_runtime::{InstanceBackend, LaunchError, PortBinding};
use ctf_platform_storage::InsertInstanceOutcome;
use tracing::{info, warn};
use uuid::Uuid;

impl InstanceService {
    /// Start an instance for the actor's team.
    ///
    /// Preconditions are checked in order, each failing fast with its own
    /// error before any external resource is touched: policy checks come
    /// before port reservation, and port reservation before the expensive
    /// container start, so the cheap failures stay cheap. The instance row
    /// insert is the commit point; losing the insert race cleans up the
    /// freshly started container and reports the conflict.
    pub async fn start(&self, actor: Actor, challenge_id: Uuid) -> PlatformResult<InstanceHandle> {
        let challenge = self
            .challenges
            .get(challenge_id)
            .await?
            .ok_or_else(|| PlatformError::ChallengeNotFound {
                id: challenge_id.to_string(),
            })?;

        let backend = InstanceBackend::for_kind(challenge.kind).ok_or_else(|| {
            PlatformError::UnsupportedChallengeType {
                kind: challenge.kind.to_string(),
            }
        })?;

        let now = Utc::now();
        self.cooldowns
            .check(actor.team_id, challenge_id, self.config.cooldown_secs, now)
            .await?;

        if self
            .instances
            .find_running(actor.team_id, challenge_id)
            .await?
            .is_some()
        {
            return Err(PlatformError::InstanceAlreadyRunning);
        }

        self.capacity
            .check_user(actor.user_id, self.config.max_instances_per_user)
            .await?;
        self.capacity
            .check_team(actor.team_id, self.config.max_instances_per_team)
            .await?;

        let assigned_ports = self
            .ports
            .reserve(challenge.declared_ports.len())
            .ok_or(PlatformError::NoFreePorts)?;

        if let Err(e) = self.runtime.ensure_connected().await {
            self.ports.release(&assigned_ports);
            return Err(PlatformError::RuntimeUnavailable {
                reason: e.to_string(),
            });
        }

        let bindings: Vec<PortBinding> = challenge
            .declared_ports
            .iter()
            .zip(assigned_ports.iter())
            .map(|(internal, host)| PortBinding {
                internal: *internal,
                host: *host,
            })
            .collect();

        let name = Self::instance_name(&challenge.slug);
        let container_ref = match backend
            .launch(
                self.runtime.as_ref(),
                self.objects.as_ref(),
                &self.context_bucket,
                &challenge,
                &name,
                &bindings,
            )
            .await
        {
            Ok(container_ref) => container_ref,
            Err(LaunchError::Build(e)) => {
                self.ports.release(&assigned_ports);
                return Err(PlatformError::BuildFailed {
                    reason: e.to_string(),
                });
            }
            Err(LaunchError::Start(e)) => {
                self.ports.release(&assigned_ports);
                return Err(PlatformError::StartFailed {
                    reason: e.to_string(),
                });
            }
        };

        let created_at = Utc::now();
        let expires_at = created_at + challenge.instance_timeout(self.config.instance_timeout_secs);

        let instance = Instance {
            id: Uuid::new_v4(),
            container_ref: container_ref.clone(),
            user_id: actor.user_id,
            team_id: actor.team_id,
            challenge_id,
            assigned_ports: assigned_ports.clone(),
            created_at,
            expires_at,
            status: InstanceStatus::Running,
        };

        match self.instances.insert_running(&instance).await {
            Ok(InsertInstanceOutcome::Inserted) => {}
            Ok(InsertInstanceOutcome::Conflict) => {
                warn!(
                    team_id = %actor.team_id,
                    challenge_id = %challenge_id,
                    "Lost start race, discarding fresh container"
                );
                if let Err(e) = self.runtime.stop_instance(&container_ref).await {
                    warn!(container_ref = %container_ref, error = %e, "Failed to discard container");
                }
                self.ports.release(&assigned_ports);
                return Err(PlatformError::InstanceAlreadyRunning);
            }
            Err(e) => {
                if let Err(stop_err) = self.runtime.stop_instance(&container_ref).await {
                    warn!(container_ref = %container_ref, error = %stop_err, "Failed to discard container");
                }
                self.ports.release(&assigned_ports);
                return Err(e.into());
            }
        }

        self.events
            .publish_to_team_except(
                actor.team_id,
                actor.user_id,
                TeamEvent::new(EventKind::InstanceStarted, actor.team_id, challenge_id),
            )
            .await;

        info!(
            team_id = %actor.team_id,
            user_id = %actor.user_id,
            challenge = %challenge.slug,
            container_ref = %container_ref,
            ports = ?assigned_ports,
            expires_at = %expires_at,
            "Instance started"
        );

        Ok(InstanceHandle {
            container_ref,
            ports: assigned_ports,
            expires_at,
        })
    }
}
