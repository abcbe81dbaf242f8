//! Periodic expiry sweep
//!
//! `status` reads flip expired rows lazily; the sweeper catches instances
//! nobody is looking at, flipping them and force-stopping their containers.
//! It is owned by the process lifecycle: spawned explicitly at startup and
//! stopped through its handle on shutdown.

use crate::service::InstanceService;
use crate::teardown::TeardownTask;
use anyhow::Result;
use chrono::Utc;
use ctf_platform_models::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{error, info};
use uuid::Uuid;

/// Handle to a running sweep task
pub struct ExpirySweeper {
    shutdown: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
}

impl ExpirySweeper {
    pub fn spawn(service: Arc<InstanceService>, every: Duration) -> Self {
        let (shutdown, mut rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            info!(interval_secs = every.as_secs(), "Expiry sweeper started");
            let mut ticker = interval(every);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = service.sweep_expired().await {
                            error!(error = %e, "Expiry sweep failed");
                        }
                    }
                    _ = rx.changed() => {
                        info!("Expiry sweeper stopping");
                        break;
                    }
                }
            }
        });

        Self { shutdown, handle }
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

impl InstanceService {
    /// Flip every overdue running instance to `expired` and queue a
    /// force-stop of its container. The row is retained; only an explicit
    /// stop, kill or solve removes it.
    pub async fn sweep_expired(&self) -> Result<u32> {
        let overdue = self.instances.list_expired(Utc::now()).await?;
        let mut flipped = 0;

        for instance in overdue {
            if !self
                .instances
                .transition_from_running(instance.id, InstanceStatus::Expired)
                .await?
            {
                continue;
            }
            flipped += 1;

            self.teardown
                .submit(TeardownTask {
                    instance_id: instance.id,
                    container_ref: instance.container_ref,
                    assigned_ports: instance.assigned_ports,
                    team_id: instance.team_id,
                    challenge_id: instance.challenge_id,
                    delete_row: false,
                    event: Some(TeamEvent::new(
                        EventKind::InstanceExpired,
                        instance.team_id,
                        instance.challenge_id,
                    )),
                    exclude_user: Uuid::nil(),
                })
                .await;
        }

        if flipped > 0 {
            info!(count = flipped, "Expired instances swept");
        }
        Ok(flipped)
    }
}
