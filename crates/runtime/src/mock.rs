//! Mock container runtime for tests and local development without a
//! runtime daemon

use crate::{ComposeSpec, ContainerRuntime, ContainerSpec};
use anyhow::Result;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory runtime double with configurable failure injection
#[derive(Default)]
pub struct MockRuntime {
    disconnected: AtomicBool,
    fail_build: AtomicBool,
    fail_start: AtomicBool,
    fail_stop: AtomicBool,
    start_delay_ms: AtomicU64,
    next_id: AtomicU64,
    built: Mutex<HashSet<String>>,
    running: Mutex<HashSet<String>>,
    stopped: Mutex<Vec<String>>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_disconnected(&self, disconnected: bool) {
        self.disconnected.store(disconnected, Ordering::SeqCst);
    }

    pub fn set_fail_build(&self, fail: bool) {
        self.fail_build.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_stop(&self, fail: bool) {
        self.fail_stop.store(fail, Ordering::SeqCst);
    }

    /// Widen the start window; useful for exercising start races
    pub fn set_start_delay(&self, delay: Duration) {
        self.start_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Mark an image as already built so launches skip the build step
    pub fn premark_image(&self, tag: &str) {
        self.built.lock().unwrap().insert(tag.to_string());
    }

    pub fn built_tags(&self) -> Vec<String> {
        self.built.lock().unwrap().iter().cloned().collect()
    }

    pub fn running_count(&self) -> usize {
        self.running.lock().unwrap().len()
    }

    pub fn stopped_refs(&self) -> Vec<String> {
        self.stopped.lock().unwrap().clone()
    }

    fn issue_ref(&self, prefix: &str) -> String {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{}-{:06}", prefix, id)
    }

    async fn launch(&self, prefix: &str) -> Result<String> {
        let delay = self.start_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("mock runtime: start failure injected"));
        }
        let container_ref = self.issue_ref(prefix);
        self.running.lock().unwrap().insert(container_ref.clone());
        Ok(container_ref)
    }
}

#[async_trait::async_trait]
impl ContainerRuntime for MockRuntime {
    async fn ensure_connected(&self) -> Result<()> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("mock runtime: disconnected"));
        }
        Ok(())
    }

    async fn image_exists(&self, tag: &str) -> Result<bool> {
        Ok(self.built.lock().unwrap().contains(tag))
    }

    async fn build_image(&self, tag: &str, _context: &[u8]) -> Result<()> {
        if self.fail_build.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("mock runtime: build failure injected"));
        }
        self.built.lock().unwrap().insert(tag.to_string());
        Ok(())
    }

    async fn start_container(&self, _spec: &ContainerSpec) -> Result<String> {
        self.launch("container").await
    }

    async fn deploy_compose(&self, _spec: &ComposeSpec) -> Result<String> {
        self.launch("stack").await
    }

    async fn stop_instance(&self, container_ref: &str) -> Result<()> {
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("mock runtime: stop failure injected"));
        }
        self.running.lock().unwrap().remove(container_ref);
        self.stopped.lock().unwrap().push(container_ref.to_string());
        Ok(())
    }
}
