use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{stream, StreamExt, TryStreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument, warn};

use crate::chunk::{data_to_chunks, ProtoChunk};
use crate::chunkserver::{ChunkserverService, HttpChunkservers};
use crate::common::*;
use crate::config::ClientConfig;
use crate::error::{ClientError, RemoteError, Result};
use crate::master::{HttpMaster, MasterService};
use crate::placement::{plan, Placement};

/// Outcome of a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub file_id: FileId,
    pub chunks: u64,
    pub replicas_stored: usize,
    /// Placements whose registration or store failed. Every chunk still has
    /// at least one stored replica.
    pub replicas_failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub replicas_deleted: usize,
}

/// Splits files into chunks, spreads replicas over the chunkservers and puts
/// files back together from whichever replicas answer.
pub struct Client {
    config: ClientConfig,
    master: Arc<dyn MasterService>,
    chunkservers: Arc<dyn ChunkserverService>,
}

impl Client {
    pub fn new(
        config: ClientConfig,
        master: Arc<dyn MasterService>,
        chunkservers: Arc<dyn ChunkserverService>,
    ) -> Result<Client> {
        config.validate()?;
        Ok(Client { config, master, chunkservers })
    }

    /// A client that reaches the master and the chunkservers over HTTP.
    pub fn connect(config: ClientConfig) -> Result<Client> {
        let master = Arc::new(HttpMaster::new(&config)?);
        let chunkservers = Arc::new(HttpChunkservers::new(&config)?);
        Client::new(config, master, chunkservers)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Write a file. Replica placement uses the configured seed, or a fresh
    /// one when none is set.
    pub async fn create_file(&self, name: &str, content: Bytes) -> Result<WriteReport> {
        let mut rng = self.placement_rng();
        self.create_file_with_rng(name, content, &mut rng).await
    }

    #[instrument(skip_all, fields(file = %name, size = content.len()))]
    pub async fn create_file_with_rng<R: Rng + Send>(
        &self,
        name: &str,
        content: Bytes,
        rng: &mut R,
    ) -> Result<WriteReport> {
        if name.is_empty() {
            return Err(ClientError::Validation("file name is empty".into()));
        }
        if content.is_empty() {
            return Err(ClientError::Validation(format!("file {name} is empty")));
        }

        // 1. Divide the data into chunks.
        let chunks = data_to_chunks(&content, self.config.chunk_size);
        let num_chunks = chunks.len() as u64;

        // 2. Ask master for the chunkservers.
        let chunkservers = self.deadline("master", self.master.chunkservers()).await?;
        if chunkservers.is_empty() {
            return Err(ClientError::NoChunkservers);
        }

        // 3. Register the file.
        let file = self
            .deadline(
                "master",
                self.master.create_file(NewFile {
                    name: name.to_string(),
                    size: content.len() as u64,
                    number_of_chunks: num_chunks,
                }),
            )
            .await?;
        info!(
            file_id = file.id,
            chunks = num_chunks,
            chunkservers = chunkservers.len(),
            "writing {}",
            human_size(content.len() as u64)
        );

        // 4. Push every replica, one round at a time.
        let rounds = plan(
            &chunkservers,
            chunks.len(),
            self.config.replication_level.get(),
            rng,
        );
        let mut stored: BTreeSet<ChunkNumber> = BTreeSet::new();
        let mut replicas_stored = 0;
        let mut replicas_failed = 0;

        for (round_no, round) in rounds.iter().enumerate() {
            let outcomes: Vec<(ChunkNumber, bool)> = stream::iter(round)
                .map(|p| self.place_replica(file.id, &chunks, p))
                .buffer_unordered(self.config.max_in_flight)
                .collect()
                .await;

            for (chunk_number, ok) in outcomes {
                if ok {
                    stored.insert(chunk_number);
                    replicas_stored += 1;
                } else {
                    replicas_failed += 1;
                }
            }
            debug!(round = round_no, stored = stored.len(), "replication round done");
        }

        // 5. Every chunk needs at least one replica.
        let missing: Vec<ChunkNumber> = (0..num_chunks).filter(|n| !stored.contains(n)).collect();
        if !missing.is_empty() {
            warn!(
                file_id = file.id,
                missing = ?missing,
                "write incomplete, registered metadata is left on the master"
            );
            return Err(ClientError::PartialWriteFailure { name: name.to_string(), missing });
        }

        info!(file_id = file.id, replicas_stored, replicas_failed, "file written");
        Ok(WriteReport { file_id: file.id, chunks: num_chunks, replicas_stored, replicas_failed })
    }

    /// Register one replica with the master and push its bytes. Failures are
    /// logged and reported as `false`.
    async fn place_replica(
        &self,
        file_id: FileId,
        chunks: &[ProtoChunk],
        placement: &Placement,
    ) -> (ChunkNumber, bool) {
        let chunk = &chunks[placement.chunk_number as usize];
        let host = placement.host.as_str();

        let new_chunk = NewChunk {
            file_id,
            chunk_server_url: host.to_string(),
            chunk_number: chunk.number,
        };
        let replica = match self.deadline("master", self.master.create_chunk(new_chunk)).await {
            Ok(id) => id,
            Err(e) => {
                warn!(chunk = chunk.number, host, error = %e, "failed to register replica");
                return (chunk.number, false);
            }
        };

        match self
            .deadline(host, self.chunkservers.store(host, replica, chunk.data.clone()))
            .await
        {
            Ok(()) => {
                debug!(chunk = chunk.number, host, replica, hash = %short_hash(&chunk.hash), "stored replica");
                (chunk.number, true)
            }
            Err(e) => {
                warn!(chunk = chunk.number, host, replica, error = %e, "failed to store chunk");
                (chunk.number, false)
            }
        }
    }

    /// Read a whole file back, in chunk order.
    #[instrument(skip_all, fields(file = %name))]
    pub async fn read_file(&self, name: &str) -> Result<Bytes> {
        // 1. Replica locations, grouped by chunk number.
        let records = self.deadline("master", self.master.chunks_for(name)).await?;
        let mut groups: BTreeMap<ChunkNumber, Vec<ChunkRecord>> = BTreeMap::new();
        for record in records {
            groups.entry(record.chunk_number).or_default().push(record);
        }

        // 2. File metadata.
        let file = self
            .deadline("master", self.master.file_by_name(name))
            .await?
            .ok_or_else(|| ClientError::NotFound(name.to_string()))?;

        // 3. Every chunk number in [0, n) must have a group.
        let found = groups.len() as u64;
        // Chunk numbers come from the master; u64::MAX must not overflow.
        let last_matches = groups
            .keys()
            .next_back()
            .map_or(true, |&last| last.checked_add(1) == Some(found));
        if found != file.number_of_chunks || !last_matches {
            return Err(ClientError::Corrupt {
                name: name.to_string(),
                expected: file.number_of_chunks,
                found,
            });
        }

        // 4. One replica per chunk, order preserved.
        let parts: Vec<Bytes> = stream::iter(groups)
            .map(|(chunk_number, replicas)| self.read_chunk(name, chunk_number, replicas))
            .buffered(self.config.max_in_flight)
            .try_collect()
            .await?;

        // Size the buffer from what was fetched, not from the recorded size.
        let mut data = BytesMut::with_capacity(parts.iter().map(Bytes::len).sum());
        for part in parts {
            data.extend_from_slice(&part);
        }
        if data.len() as u64 != file.size {
            warn!(expected = file.size, actual = data.len(), "read size differs from recorded size");
        }

        info!(chunks = file.number_of_chunks, "read {}", human_size(data.len() as u64));
        Ok(data.freeze())
    }

    /// Try each replica in the order the master listed them.
    async fn read_chunk(
        &self,
        name: &str,
        chunk_number: ChunkNumber,
        replicas: Vec<ChunkRecord>,
    ) -> Result<Bytes> {
        for replica in &replicas {
            let host = replica.chunk_server_url.as_str();
            match self.deadline(host, self.chunkservers.fetch(host, replica.id)).await {
                Ok(data) => return Ok(data),
                Err(e) => {
                    warn!(chunk = chunk_number, host, replica = replica.id, error = %e, "replica unreadable, trying next");
                }
            }
        }

        Err(ClientError::Unreadable { name: name.to_string(), chunk_number })
    }

    /// Delete the file record, then every replica once. Replica failures do
    /// not stop the remaining deletions.
    #[instrument(skip_all, fields(file = %name))]
    pub async fn delete_file(&self, name: &str) -> Result<DeleteReport> {
        let records = self.deadline("master", self.master.chunks_for(name)).await?;
        let existed = self.deadline("master", self.master.delete_file(name)).await?;
        if !existed {
            if records.is_empty() {
                return Err(ClientError::NotFound(name.to_string()));
            }
            warn!(replicas = records.len(), "no file record, removing orphaned replicas");
        }

        let outcomes: Vec<Option<ReplicaId>> = stream::iter(&records)
            .map(|record| self.delete_replica(record))
            .buffer_unordered(self.config.max_in_flight)
            .collect()
            .await;
        let mut failed: Vec<ReplicaId> = outcomes.into_iter().flatten().collect();
        failed.sort_unstable();

        if !failed.is_empty() {
            return Err(ClientError::PartialDeleteFailure { name: name.to_string(), failed });
        }

        info!(replicas = records.len(), "file deleted");
        Ok(DeleteReport { replicas_deleted: records.len() })
    }

    /// `Some(id)` when the replica could not be removed.
    async fn delete_replica(&self, record: &ChunkRecord) -> Option<ReplicaId> {
        let host = record.chunk_server_url.as_str();
        match self.deadline(host, self.chunkservers.delete(host, record.id)).await {
            Ok(()) => None,
            Err(e) => {
                warn!(chunk = record.chunk_number, host, replica = record.id, error = %e, "failed to delete replica");
                Some(record.id)
            }
        }
    }

    /// Size of a file in bytes as recorded by the master.
    #[instrument(skip_all, fields(file = %name))]
    pub async fn get_size(&self, name: &str) -> Result<u64> {
        match self.deadline("master", self.master.file_by_name(name)).await? {
            Some(file) => Ok(file.size),
            None => Err(ClientError::NotFound(name.to_string())),
        }
    }

    fn placement_rng(&self) -> StdRng {
        match self.config.placement_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Bound a single outbound call by the configured request timeout.
    async fn deadline<T>(
        &self,
        target: &str,
        call: impl Future<Output = std::result::Result<T, RemoteError>>,
    ) -> std::result::Result<T, RemoteError> {
        match tokio::time::timeout(self.config.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(target.to_string())),
        }
    }
}
