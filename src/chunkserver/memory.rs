use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::chunkserver::ChunkserverService;
use crate::common::ReplicaId;
use crate::error::RemoteError;

/// A chunkserver that keeps replicas in memory.
pub struct MemoryChunkserver {
    pub id: String,
    chunks: Mutex<HashMap<ReplicaId, Bytes>>,
    down: AtomicBool,
    reject_deletes: AtomicBool,
    /// Milliseconds to stall before answering.
    delay_ms: AtomicU64,
}

impl MemoryChunkserver {
    pub fn new(id: impl Into<String>) -> MemoryChunkserver {
        MemoryChunkserver {
            id: id.into(),
            chunks: Mutex::new(HashMap::new()),
            down: AtomicBool::new(false),
            reject_deletes: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
        }
    }

    /// A node that is down fails every call. Stored replicas are kept.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn set_reject_deletes(&self, reject: bool) {
        self.reject_deletes.store(reject, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.delay_ms.store(millis, Ordering::SeqCst);
    }

    pub fn chunk_count(&self) -> usize {
        self.lock().len()
    }

    pub fn has_chunk(&self, id: ReplicaId) -> bool {
        self.lock().contains_key(&id)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ReplicaId, Bytes>> {
        self.chunks.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn answer(&self) -> Result<(), RemoteError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.down.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable(self.id.clone()));
        }
        Ok(())
    }

    pub async fn store(&self, id: ReplicaId, data: Bytes) -> Result<(), RemoteError> {
        self.answer().await?;
        self.lock().insert(id, data);
        Ok(())
    }

    pub async fn fetch(&self, id: ReplicaId) -> Result<Bytes, RemoteError> {
        self.answer().await?;
        self.lock().get(&id).cloned().ok_or_else(|| RemoteError::Status {
            url: format!("{}/api/Chunk/getChunk/{id}", self.id),
            status: 404,
        })
    }

    pub async fn delete(&self, id: ReplicaId) -> Result<(), RemoteError> {
        self.answer().await?;
        if self.reject_deletes.load(Ordering::SeqCst) {
            return Err(RemoteError::Status {
                url: format!("{}/api/Chunk/deleteChunk/{id}", self.id),
                status: 500,
            });
        }
        self.lock().remove(&id);
        Ok(())
    }
}

/// Routes chunkserver calls to in-memory nodes by host.
#[derive(Default)]
pub struct NetworkShim {
    nodes: Mutex<HashMap<String, Arc<MemoryChunkserver>>>,
}

impl NetworkShim {
    pub fn new() -> NetworkShim {
        NetworkShim::default()
    }

    pub fn add_node(&self, chunkserver: Arc<MemoryChunkserver>) {
        let id = chunkserver.id.clone();
        self.lock().insert(id, chunkserver);
    }

    pub fn get_node(&self, id: &str) -> Option<Arc<MemoryChunkserver>> {
        self.lock().get(id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<MemoryChunkserver>>> {
        self.nodes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn route(&self, host: &str) -> Result<Arc<MemoryChunkserver>, RemoteError> {
        self.get_node(host).ok_or_else(|| RemoteError::Unavailable(host.to_string()))
    }
}

#[async_trait]
impl ChunkserverService for NetworkShim {
    async fn store(&self, host: &str, id: ReplicaId, data: Bytes) -> Result<(), RemoteError> {
        self.route(host)?.store(id, data).await
    }

    async fn fetch(&self, host: &str, id: ReplicaId) -> Result<Bytes, RemoteError> {
        self.route(host)?.fetch(id).await
    }

    async fn delete(&self, host: &str, id: ReplicaId) -> Result<(), RemoteError> {
        self.route(host)?.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn routes_by_host() {
        let network = NetworkShim::new();
        network.add_node(Arc::new(MemoryChunkserver::new("http://cs-0")));

        network.store("http://cs-0", 1, Bytes::from_static(b"abc")).await.unwrap();
        assert_eq!(network.fetch("http://cs-0", 1).await.unwrap(), Bytes::from_static(b"abc"));
        assert!(matches!(
            network.fetch("http://cs-9", 1).await,
            Err(RemoteError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn down_node_keeps_data() {
        let node = MemoryChunkserver::new("http://cs-0");
        node.store(5, Bytes::from_static(b"x")).await.unwrap();
        node.set_down(true);
        assert!(node.fetch(5).await.is_err());
        node.set_down(false);
        assert_eq!(node.fetch(5).await.unwrap(), Bytes::from_static(b"x"));
    }

    #[tokio::test]
    async fn oversized_delay_saturates() {
        let node = MemoryChunkserver::new("http://cs-0");
        node.store(1, Bytes::from_static(b"x")).await.unwrap();
        // 2^61 seconds is a multiple of 2^64 milliseconds.
        node.set_delay(Duration::from_secs(1 << 61));
        let stalled = tokio::time::timeout(Duration::from_millis(50), node.fetch(1)).await;
        assert!(stalled.is_err());
    }

    #[tokio::test]
    async fn missing_replica_is_404() {
        let node = MemoryChunkserver::new("http://cs-0");
        assert!(matches!(node.fetch(1).await, Err(RemoteError::Status { status: 404, .. })));
    }
}
