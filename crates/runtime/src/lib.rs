//! Container runtime access for challenge instances
//!
//! This crate wraps the Docker-compatible runtime API the platform deploys
//! challenge environments on, and dispatches between the supported instance
//! backends (single container, compose stack).

mod backend;
mod client;
mod mock;
mod objects;

pub use backend::*;
pub use client::*;
pub use mock::*;
pub use objects::*;

use anyhow::Result;
use std::collections::HashMap;

/// Internal-to-host port binding
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct PortBinding {
    pub internal: u16,
    pub host: u16,
}

/// Container launch specification
#[derive(Debug, Clone, serde::Serialize)]
pub struct ContainerSpec {
    pub image: String,
    pub name: String,
    pub env: HashMap<String, String>,
    pub ports: Vec<PortBinding>,
}

/// Compose stack launch specification
#[derive(Debug, Clone, serde::Serialize)]
pub struct ComposeSpec {
    pub project: String,
    pub compose_yaml: String,
    pub ports: Vec<PortBinding>,
}

/// External container runtime collaborator.
///
/// All calls are blocking I/O boundaries; the production client carries
/// request timeouts so a stuck runtime cannot hold callers indefinitely.
#[async_trait::async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Cheap connectivity probe, called before any build/start attempt
    async fn ensure_connected(&self) -> Result<()>;

    async fn image_exists(&self, tag: &str) -> Result<bool>;

    /// Build an image from a challenge context archive
    async fn build_image(&self, tag: &str, context: &[u8]) -> Result<()>;

    /// Start a single container; returns the opaque instance handle
    async fn start_container(&self, spec: &ContainerSpec) -> Result<String>;

    /// Deploy a compose stack; returns the opaque instance handle
    async fn deploy_compose(&self, spec: &ComposeSpec) -> Result<String>;

    /// Stop and remove an instance by its handle (container or stack)
    async fn stop_instance(&self, container_ref: &str) -> Result<()>;
}

/// Launch failure, split so callers can report build and start distinctly
#[derive(Debug)]
pub enum LaunchError {
    Build(anyhow::Error),
    Start(anyhow::Error),
}

impl std::fmt::Display for LaunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchError::Build(e) => write!(f, "image build failed: {}", e),
            LaunchError::Start(e) => write!(f, "instance start failed: {}", e),
        }
    }
}

impl std::error::Error for LaunchError {}
