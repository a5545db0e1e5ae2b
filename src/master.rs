use async_trait::async_trait;

use crate::common::*;
use crate::error::RemoteError;

pub mod http;
pub mod memory;

pub use http::HttpMaster;
pub use memory::MemoryMaster;

/// The metadata service: owns file records, replica records and the list of
/// registered chunkservers.
#[async_trait]
pub trait MasterService: Send + Sync {
    /// List the chunkservers currently registered.
    async fn chunkservers(&self) -> Result<Vec<ChunkserverInfo>, RemoteError>;

    /// Register a file and get its record back.
    async fn create_file(&self, file: NewFile) -> Result<FileRecord, RemoteError>;

    /// Register one replica of a chunk and get its identifier back.
    async fn create_chunk(&self, chunk: NewChunk) -> Result<ReplicaId, RemoteError>;

    /// All replica records of a file.
    async fn chunks_for(&self, name: &str) -> Result<Vec<ChunkRecord>, RemoteError>;

    /// `None` when no file has that name.
    async fn file_by_name(&self, name: &str) -> Result<Option<FileRecord>, RemoteError>;

    /// Remove a file record. `false` when no file has that name.
    async fn delete_file(&self, name: &str) -> Result<bool, RemoteError>;
}
