//! Instance status reads with lazy expiry

use crate::connection::render_connection_info;
use crate::service::InstanceService;
use chrono::Utc;
use ctf_platform_models::*;
use uuid::Uuid;

impl InstanceService {
    /// Current instance view for (team, challenge).
    ///
    /// Read-only except the lazy expiry flip: a running row observed past
    /// its `expires_at` is transitioned to `expired` on this read. Nothing
    /// is created or torn down here.
    pub async fn status(
        &self,
        team_id: Uuid,
        challenge_id: Uuid,
    ) -> PlatformResult<InstanceStatusView> {
        let challenge = self
            .challenges
            .get(challenge_id)
            .await?
            .ok_or_else(|| PlatformError::ChallengeNotFound {
                id: challenge_id.to_string(),
            })?;

        let Some(mut instance) = self.instances.find_latest(team_id, challenge_id).await? else {
            return Ok(InstanceStatusView::absent());
        };

        if instance.status == InstanceStatus::Running && instance.is_expired_at(Utc::now()) {
            if self
                .instances
                .transition_from_running(instance.id, InstanceStatus::Expired)
                .await?
            {
                instance.status = InstanceStatus::Expired;
            } else {
                // The row changed under us (stopped or deleted); re-read
                match self.instances.find_latest(team_id, challenge_id).await? {
                    Some(latest) => instance = latest,
                    None => return Ok(InstanceStatusView::absent()),
                }
            }
        }

        let connection_info = if instance.status == InstanceStatus::Running {
            challenge.connection_template.as_deref().map(|template| {
                render_connection_info(
                    template,
                    &self.config.public_host,
                    &challenge.declared_ports,
                    &instance.assigned_ports,
                )
            })
        } else {
            None
        };

        Ok(InstanceStatusView {
            has_instance: true,
            status: Some(instance.status),
            ports: instance.assigned_ports,
            connection_info,
            is_expired: instance.status == InstanceStatus::Expired,
        })
    }
}
