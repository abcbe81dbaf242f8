use ctf_platform_config::PlatformConfig;
use ctf_platform_events::EventHub;
use ctf_platform_instancer::InstanceService;
use ctf_platform_scoring::SolveService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub instancer: Arc<InstanceService>,
    pub solver: Arc<SolveService>,
    pub events: Arc<EventHub>,
    pub config: Arc<PlatformConfig>,
}

impl AppState {
    pub fn new(
        instancer: Arc<InstanceService>,
        solver: Arc<SolveService>,
        events: Arc<EventHub>,
        config: Arc<PlatformConfig>,
    ) -> Self {
        Self {
            instancer,
            solver,
            events,
            config,
        }
    }
}
