//! Object store access for challenge build contexts

use anyhow::Result;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Challenge file/context retrieval for image builds
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object; `None` when the key does not exist
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>>;
}

/// In-memory object store
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) {
        let mut objects = self.objects.write().await;
        objects.insert((bucket.to_string(), key.to_string()), data);
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let objects = self.objects.read().await;
        Ok(objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned())
    }
}
