//! Instance backend dispatch.
//!
//! The set of backends is small and known, so dispatch is a closed enum
//! rather than an open handler registry.

use crate::{ComposeSpec, ContainerRuntime, ContainerSpec, LaunchError, ObjectStore, PortBinding};
use anyhow::Result;
use ctf_platform_models::{Challenge, ChallengeKind};
use std::collections::HashMap;
use tracing::info;

/// Backend handling a challenge's instances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceBackend {
    Docker,
    Compose,
}

impl InstanceBackend {
    /// Backend for a challenge kind; `None` for kinds without instances
    pub fn for_kind(kind: ChallengeKind) -> Option<Self> {
        match kind {
            ChallengeKind::Container => Some(InstanceBackend::Docker),
            ChallengeKind::Compose => Some(InstanceBackend::Compose),
            ChallengeKind::Static => None,
        }
    }

    /// Build (when needed) and start an environment for `challenge`.
    ///
    /// The image-build step is skipped when the runtime already has the tag,
    /// so a retry after a failed start does not rebuild.
    pub async fn launch(
        &self,
        runtime: &dyn ContainerRuntime,
        objects: &dyn ObjectStore,
        context_bucket: &str,
        challenge: &Challenge,
        instance_name: &str,
        ports: &[PortBinding],
    ) -> Result<String, LaunchError> {
        match self {
            InstanceBackend::Docker => {
                let tag = challenge
                    .image
                    .clone()
                    .unwrap_or_else(|| format!("challenge-{}", challenge.slug));

                let exists = runtime
                    .image_exists(&tag)
                    .await
                    .map_err(LaunchError::Build)?;
                if !exists {
                    let context = objects
                        .get_object(context_bucket, &challenge.slug)
                        .await
                        .map_err(LaunchError::Build)?
                        .ok_or_else(|| {
                            LaunchError::Build(anyhow::anyhow!(
                                "No build context for challenge {}",
                                challenge.slug
                            ))
                        })?;
                    runtime
                        .build_image(&tag, &context)
                        .await
                        .map_err(LaunchError::Build)?;
                }

                let mut env = HashMap::new();
                env.insert("CHALLENGE_SLUG".to_string(), challenge.slug.clone());

                let spec = ContainerSpec {
                    image: tag,
                    name: instance_name.to_string(),
                    env,
                    ports: ports.to_vec(),
                };
                runtime.start_container(&spec).await.map_err(LaunchError::Start)
            }
            InstanceBackend::Compose => {
                let compose_yaml = challenge.compose_yaml.clone().ok_or_else(|| {
                    LaunchError::Start(anyhow::anyhow!(
                        "Challenge {} has no compose document",
                        challenge.slug
                    ))
                })?;

                let spec = ComposeSpec {
                    project: instance_name.to_string(),
                    compose_yaml,
                    ports: ports.to_vec(),
                };
                runtime.deploy_compose(&spec).await.map_err(LaunchError::Start)
            }
        }
    }

    /// Tear an environment down by its opaque handle
    pub async fn teardown(
        &self,
        runtime: &dyn ContainerRuntime,
        container_ref: &str,
    ) -> Result<()> {
        info!(container_ref = container_ref, "Tearing down instance");
        runtime.stop_instance(container_ref).await
    }
}
