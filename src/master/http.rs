use async_trait::async_trait;
use tracing::debug;

use crate::common::*;
use crate::config::ClientConfig;
use crate::error::{ClientError, RemoteError};
use crate::master::MasterService;
use crate::transport::{build_client, endpoint, json, send_ok, send_optional};

/// Talks to the master over its REST API.
pub struct HttpMaster {
    base_url: String,
    http: reqwest::Client,
}

impl HttpMaster {
    pub fn new(config: &ClientConfig) -> Result<HttpMaster, ClientError> {
        config.validate()?;
        Ok(HttpMaster {
            base_url: config.master_url.clone(),
            http: build_client(config.request_timeout)?,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, RemoteError> {
        endpoint(&self.base_url, segments)
    }
}

#[async_trait]
impl MasterService for HttpMaster {
    async fn chunkservers(&self) -> Result<Vec<ChunkserverInfo>, RemoteError> {
        let url = self.url(&["api", "ChunkServers"])?;
        let resp = send_ok(self.http.get(url.clone()), &url).await?;
        json(resp, &url).await
    }

    async fn create_file(&self, file: NewFile) -> Result<FileRecord, RemoteError> {
        let url = self.url(&["api", "Files"])?;
        debug!(file = %file.name, size = file.size, chunks = file.number_of_chunks, "registering file");
        let resp = send_ok(self.http.post(url.clone()).json(&file), &url).await?;
        let mut record: FileRecord = json(resp, &url).await?;
        if record.name.is_empty() {
            record.name = file.name;
        }
        Ok(record)
    }

    async fn create_chunk(&self, chunk: NewChunk) -> Result<ReplicaId, RemoteError> {
        let url = self.url(&["api", "Chunks"])?;
        let resp = send_ok(self.http.post(url.clone()).json(&chunk), &url).await?;
        let created: CreatedChunk = json(resp, &url).await?;
        Ok(created.id)
    }

    async fn chunks_for(&self, name: &str) -> Result<Vec<ChunkRecord>, RemoteError> {
        let url = self.url(&["api", "Chunks", "GetChunks", name])?;
        let resp = send_ok(self.http.get(url.clone()), &url).await?;
        json(resp, &url).await
    }

    async fn file_by_name(&self, name: &str) -> Result<Option<FileRecord>, RemoteError> {
        let url = self.url(&["api", "Files", "GetByName", name])?;
        match send_optional(self.http.get(url.clone()), &url).await? {
            Some(resp) => json(resp, &url).await.map(Some),
            None => Ok(None),
        }
    }

    async fn delete_file(&self, name: &str) -> Result<bool, RemoteError> {
        let url = self.url(&["api", "Files", name])?;
        Ok(send_optional(self.http.delete(url.clone()), &url).await?.is_some())
    }
}
