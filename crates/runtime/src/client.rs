//! HTTP client for the Docker-compatible runtime API

use crate::{ComposeSpec, ContainerRuntime, ContainerSpec};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Production runtime client speaking the runtime's REST API
pub struct HttpRuntimeClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRuntimeClient {
    pub fn new(base_url: String, connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .context("Failed to build runtime HTTP client")?;

        Ok(Self { base_url, client })
    }

    async fn expect_success(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(anyhow::anyhow!(
            "{} failed with {}: {}",
            action,
            status,
            error_text
        ))
    }
}

/// Instance handle returned by create/deploy endpoints
#[derive(Deserialize)]
struct InstanceId {
    id: String,
}

#[async_trait::async_trait]
impl ContainerRuntime for HttpRuntimeClient {
    async fn ensure_connected(&self) -> Result<()> {
        let url = format!("{}/ping", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Runtime unreachable")?;
        Self::expect_success(response, "Runtime ping").await?;
        Ok(())
    }

    async fn image_exists(&self, tag: &str) -> Result<bool> {
        let url = format!("{}/images/{}", self.base_url, tag);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to query image")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::expect_success(response, "Image lookup").await?;
        Ok(true)
    }

    async fn build_image(&self, tag: &str, context: &[u8]) -> Result<()> {
        info!(tag = tag, context_bytes = context.len(), "Building challenge image");

        let url = format!("{}/build?tag={}", self.base_url, tag);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/x-tar")
            .body(context.to_vec())
            .send()
            .await
            .context("Failed to send build request")?;
        Self::expect_success(response, "Image build").await?;

        info!(tag = tag, "Challenge image built");
        Ok(())
    }

    async fn start_container(&self, spec: &ContainerSpec) -> Result<String> {
        debug!(image = %spec.image, name = %spec.name, "Starting container");

        let url = format!("{}/containers", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(spec)
            .send()
            .await
            .context("Failed to send container create request")?;
        let response = Self::expect_success(response, "Container create").await?;

        let id: InstanceId = response
            .json()
            .await
            .context("Failed to parse container create response")?;

        info!(name = %spec.name, container_ref = %id.id, "Container started");
        Ok(id.id)
    }

    async fn deploy_compose(&self, spec: &ComposeSpec) -> Result<String> {
        debug!(project = %spec.project, "Deploying compose stack");

        let url = format!("{}/stacks", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(spec)
            .send()
            .await
            .context("Failed to send stack deploy request")?;
        let response = Self::expect_success(response, "Stack deploy").await?;

        let id: InstanceId = response
            .json()
            .await
            .context("Failed to parse stack deploy response")?;

        info!(project = %spec.project, container_ref = %id.id, "Compose stack deployed");
        Ok(id.id)
    }

    async fn stop_instance(&self, container_ref: &str) -> Result<()> {
        let url = format!("{}/instances/{}/stop", self.base_url, container_ref);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("Failed to send stop request")?;
        Self::expect_success(response, "Instance stop").await?;

        info!(container_ref = container_ref, "Instance stopped");
        Ok(())
    }
}
