//! Bounded asynchronous teardown worker pool
//!
//! Container teardown runs off the request path. Tasks queue on a bounded
//! channel consumed by a fixed set of workers, so a slow runtime backs
//! pressure up to submitters instead of accumulating detached tasks.
//! Worker failures are logged and never surfaced to the original caller.

use crate::ports::PortAllocator;
use ctf_platform_events::EventHub;
use ctf_platform_models::TeamEvent;
use ctf_platform_runtime::ContainerRuntime;
use ctf_platform_storage::InstanceStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// One queued teardown
pub struct TeardownTask {
    pub instance_id: Uuid,
    pub container_ref: String,
    pub assigned_ports: Vec<u16>,
    pub team_id: Uuid,
    pub challenge_id: Uuid,
    /// Graceful stop deletes the row; expiry keeps it
    pub delete_row: bool,
    /// Event published to the team once teardown completes
    pub event: Option<TeamEvent>,
    /// User excluded from the event fan-out (nil to notify everyone)
    pub exclude_user: Uuid,
}

/// Bounded worker pool executing teardown tasks
pub struct TeardownPool {
    tx: mpsc::Sender<TeardownTask>,
}

impl TeardownPool {
    pub fn new(
        workers: usize,
        queue_size: usize,
        runtime: Arc<dyn ContainerRuntime>,
        instances: Arc<dyn InstanceStore>,
        events: Arc<EventHub>,
        ports: Arc<PortAllocator>,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<TeardownTask>(queue_size.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        for worker in 0..workers.max(1) {
            let rx = rx.clone();
            let runtime = runtime.clone();
            let instances = instances.clone();
            let events = events.clone();
            let ports = ports.clone();

            tokio::spawn(async move {
                debug!(worker = worker, "Teardown worker started");
                loop {
                    let task = {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    };
                    let Some(task) = task else {
                        debug!(worker = worker, "Teardown worker stopping");
                        break;
                    };
                    Self::run_task(&*runtime, &*instances, &events, &ports, task).await;
                }
            });
        }

        Self { tx }
    }

    /// Queue a teardown; awaits queue space when the pool is saturated
    pub async fn submit(&self, task: TeardownTask) {
        if self.tx.send(task).await.is_err() {
            error!("Teardown pool is shut down, dropping task");
        }
    }

    async fn run_task(
        runtime: &dyn ContainerRuntime,
        instances: &dyn InstanceStore,
        events: &EventHub,
        ports: &PortAllocator,
        task: TeardownTask,
    ) {
        if let Err(e) = runtime.stop_instance(&task.container_ref).await {
            warn!(
                container_ref = %task.container_ref,
                error = %e,
                "Container stop failed during teardown"
            );
        }

        ports.release(&task.assigned_ports);

        if task.delete_row {
            match instances.delete(task.instance_id).await {
                Ok(true) => {}
                Ok(false) => debug!(instance_id = %task.instance_id, "Instance row already gone"),
                Err(e) => error!(
                    instance_id = %task.instance_id,
                    error = %e,
                    "Failed to delete instance row during teardown"
                ),
            }
        }

        if let Some(event) = task.event {
            events
                .publish_to_team_except(task.team_id, task.exclude_user, event)
                .await;
        }

        info!(
            instance_id = %task.instance_id,
            container_ref = %task.container_ref,
            "Instance teardown completed"
        );
    }
}
