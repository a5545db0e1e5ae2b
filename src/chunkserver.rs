use async_trait::async_trait;
use bytes::Bytes;

use crate::common::ReplicaId;
use crate::error::RemoteError;

pub mod http;
pub mod memory;

pub use http::HttpChunkservers;
pub use memory::{MemoryChunkserver, NetworkShim};

/// Access to the storage nodes. Every call names the node by its host, as
/// registered with the master.
#[async_trait]
pub trait ChunkserverService: Send + Sync {
    /// Store a replica's bytes under the identifier the master assigned.
    async fn store(&self, host: &str, id: ReplicaId, data: Bytes) -> Result<(), RemoteError>;

    /// Fetch a replica's bytes.
    async fn fetch(&self, host: &str, id: ReplicaId) -> Result<Bytes, RemoteError>;

    async fn delete(&self, host: &str, id: ReplicaId) -> Result<(), RemoteError>;
}
