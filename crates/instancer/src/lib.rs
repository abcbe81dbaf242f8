//! Per-team challenge instance lifecycle management
//!
//! This crate owns the instance state machine: provisioning, tracking,
//! rate-limiting and tearing down isolated container environments bound to
//! a (team, challenge) pair, under concurrent requests.

mod capacity;
mod connection;
mod cooldown;
mod ports;
mod service;
mod start;
mod status;
mod stop;
mod sweeper;
mod teardown;

pub use capacity::CapacityGuard;
pub use connection::render_connection_info;
pub use cooldown::CooldownTracker;
pub use ports::PortAllocator;
pub use service::InstanceService;
pub use sweeper::ExpirySweeper;
pub use teardown::{TeardownPool, TeardownTask};
