//! Instance lifecycle service

use crate::{CapacityGuard, CooldownTracker, PortAllocator, TeardownPool};
use ctf_platform_config::InstancerConfig;
use ctf_platform_events::EventHub;
use ctf_platform_runtime::{ContainerRuntime, ObjectStore};
use ctf_platform_storage::{ChallengeStore, CooldownStore, InstanceStore};
use std::sync::Arc;

/// Orchestrates start/stop/kill/status for per-team challenge instances.
///
/// All cross-request invariants live in the backing stores; the service
/// itself is freely shareable across request tasks and server processes.
pub struct InstanceService {
    pub(crate) config: InstancerConfig,
    pub(crate) context_bucket: String,
    pub(crate) instances: Arc<dyn InstanceStore>,
    pub(crate) challenges: Arc<dyn ChallengeStore>,
    pub(crate) runtime: Arc<dyn ContainerRuntime>,
    pub(crate) objects: Arc<dyn ObjectStore>,
    pub(crate) events: Arc<EventHub>,
    pub(crate) capacity: CapacityGuard,
    pub(crate) cooldowns: CooldownTracker,
    pub(crate) ports: Arc<PortAllocator>,
    pub(crate) teardown: TeardownPool,
}

impl InstanceService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: InstancerConfig,
        context_bucket: String,
        instances: Arc<dyn InstanceStore>,
        cooldown_store: Arc<dyn CooldownStore>,
        challenges: Arc<dyn ChallengeStore>,
        runtime: Arc<dyn ContainerRuntime>,
        objects: Arc<dyn ObjectStore>,
        events: Arc<EventHub>,
    ) -> Arc<Self> {
        let ports = Arc::new(PortAllocator::new(
            config.port_range_start,
            config.port_range_end,
        ));
        let teardown = TeardownPool::new(
            config.teardown_workers,
            config.teardown_queue,
            runtime.clone(),
            instances.clone(),
            events.clone(),
            ports.clone(),
        );

        Arc::new(Self {
            capacity: CapacityGuard::new(instances.clone()),
            cooldowns: CooldownTracker::new(cooldown_store),
            context_bucket,
            config,
            instances,
            challenges,
            runtime,
            objects,
            events,
            ports,
            teardown,
        })
    }

    /// Unique container/project name for a fresh instance
    pub(crate) fn instance_name(slug: &str) -> String {
        format!("chal-{}-{:08x}", slug, rand::random::<u32>())
    }
}
