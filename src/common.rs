use byte_unit::Byte;
use serde::{Deserialize, Serialize};
use sha2::Digest;

pub type FileId = u64;
pub type ReplicaId = u64;
pub type ChunkNumber = u64;

pub fn sha256sum(data: &[u8]) -> [u8; 32] {
    let mut hasher = sha2::Sha256::new();
    hasher.update(data);
    let result1 = hasher.finalize();
    let mut result = [0u8; 32];
    result.copy_from_slice(result1.as_slice());
    result
}

/// Short hex prefix of a digest, for log lines.
pub fn short_hash(hash: &[u8; 32]) -> String {
    hash[..4].iter().map(|b| format!("{b:02x}")).collect()
}

/// Human-readable byte count, e.g. for log lines.
pub fn human_size(bytes: u64) -> String {
    format!("{:#}", Byte::from_u64(bytes))
}

/// A file as the master knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: FileId,
    #[serde(default)]
    pub name: String,
    /// The length of the file in bytes.
    pub size: u64,
    pub number_of_chunks: u64,
}

/// One physical replica of a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRecord {
    pub id: ReplicaId,
    pub file_id: FileId,
    pub chunk_number: ChunkNumber,
    pub chunk_server_url: String,
}

/// A storage node registered with the master.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkserverInfo {
    pub host: String,
}

impl ChunkserverInfo {
    pub fn new(host: impl Into<String>) -> ChunkserverInfo {
        ChunkserverInfo { host: host.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    pub name: String,
    pub size: u64,
    pub number_of_chunks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChunk {
    pub file_id: FileId,
    pub chunk_server_url: String,
    pub chunk_number: ChunkNumber,
}

/// Identifier handed back by the master when a replica is registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedChunk {
    pub id: ReplicaId,
}

/// Body of a chunkserver store request. `data` is base64.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreChunk {
    pub id: ReplicaId,
    pub data: String,
}
