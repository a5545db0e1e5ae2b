use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::common::*;
use crate::error::RemoteError;
use crate::master::MasterService;

#[derive(Default)]
struct MasterState {
    // Master state.
    file_table: HashMap<String, FileRecord>,
    chunk_table: Vec<ChunkRecord>,

    // Ephemeral state.
    chunkservers: Vec<ChunkserverInfo>,

    file_counter: u64,
    chunk_counter: u64,
}

/// An in-process master. Holds everything in memory and can be told to
/// misbehave.
#[derive(Default)]
pub struct MemoryMaster {
    state: Mutex<MasterState>,
    unreachable: AtomicBool,
}

impl MemoryMaster {
    pub fn new() -> MemoryMaster {
        MemoryMaster::default()
    }

    /// Add a chunkserver to the registry. Registering the same host twice is a no-op.
    pub fn register_chunkserver(&self, host: impl Into<String>) {
        let info = ChunkserverInfo::new(host);
        let mut state = self.lock();
        if !state.chunkservers.contains(&info) {
            state.chunkservers.push(info);
        }
    }

    /// Make every subsequent call fail, as if the master were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Forget every replica record of one chunk number of a file.
    pub fn forget_chunk(&self, name: &str, chunk_number: ChunkNumber) {
        let mut state = self.lock();
        let Some(file_id) = state.file_table.get(name).map(|f| f.id) else {
            return;
        };
        state
            .chunk_table
            .retain(|c| !(c.file_id == file_id && c.chunk_number == chunk_number));
    }

    pub fn file_count(&self) -> usize {
        self.lock().file_table.len()
    }

    pub fn chunk_records(&self, name: &str) -> Vec<ChunkRecord> {
        let state = self.lock();
        Self::records_of(&state, name)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MasterState> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_reachable(&self) -> Result<(), RemoteError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("master".into()));
        }
        Ok(())
    }

    fn records_of(state: &MasterState, name: &str) -> Vec<ChunkRecord> {
        match state.file_table.get(name) {
            Some(file) => state
                .chunk_table
                .iter()
                .filter(|c| c.file_id == file.id)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl MasterService for MemoryMaster {
    async fn chunkservers(&self) -> Result<Vec<ChunkserverInfo>, RemoteError> {
        self.check_reachable()?;
        Ok(self.lock().chunkservers.clone())
    }

    async fn create_file(&self, file: NewFile) -> Result<FileRecord, RemoteError> {
        self.check_reachable()?;
        let mut state = self.lock();
        state.file_counter += 1;
        let record = FileRecord {
            id: state.file_counter,
            name: file.name.clone(),
            size: file.size,
            number_of_chunks: file.number_of_chunks,
        };
        // Re-creating a name replaces the old record; its replicas become orphans.
        state.file_table.insert(file.name, record.clone());
        Ok(record)
    }

    async fn create_chunk(&self, chunk: NewChunk) -> Result<ReplicaId, RemoteError> {
        self.check_reachable()?;
        let mut state = self.lock();
        state.chunk_counter += 1;
        let id = state.chunk_counter;
        state.chunk_table.push(ChunkRecord {
            id,
            file_id: chunk.file_id,
            chunk_number: chunk.chunk_number,
            chunk_server_url: chunk.chunk_server_url,
        });
        Ok(id)
    }

    async fn chunks_for(&self, name: &str) -> Result<Vec<ChunkRecord>, RemoteError> {
        self.check_reachable()?;
        Ok(self.chunk_records(name))
    }

    async fn file_by_name(&self, name: &str) -> Result<Option<FileRecord>, RemoteError> {
        self.check_reachable()?;
        Ok(self.lock().file_table.get(name).cloned())
    }

    async fn delete_file(&self, name: &str) -> Result<bool, RemoteError> {
        self.check_reachable()?;
        let mut state = self.lock();
        match state.file_table.remove(name) {
            Some(file) => {
                state.chunk_table.retain(|c| c.file_id != file.id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracks_files_and_replicas() {
        let master = MemoryMaster::new();
        master.register_chunkserver("http://cs-0");
        master.register_chunkserver("http://cs-0");
        assert_eq!(master.chunkservers().await.unwrap().len(), 1);

        let file = master
            .create_file(NewFile { name: "a".into(), size: 3, number_of_chunks: 1 })
            .await
            .unwrap();
        let id = master
            .create_chunk(NewChunk {
                file_id: file.id,
                chunk_server_url: "http://cs-0".into(),
                chunk_number: 0,
            })
            .await
            .unwrap();

        let records = master.chunks_for("a").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);

        assert!(master.delete_file("a").await.unwrap());
        assert!(!master.delete_file("a").await.unwrap());
        assert!(master.chunks_for("a").await.unwrap().is_empty());
        assert!(master.file_by_name("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreachable_master_fails_every_call() {
        let master = MemoryMaster::new();
        master.set_unreachable(true);
        assert!(matches!(master.chunkservers().await, Err(RemoteError::Unavailable(_))));
        assert!(master.file_by_name("a").await.is_err());
    }
}
