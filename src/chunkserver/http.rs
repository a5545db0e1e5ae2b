use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;

use crate::chunkserver::ChunkserverService;
use crate::common::{ReplicaId, StoreChunk};
use crate::config::ClientConfig;
use crate::error::{ClientError, RemoteError};
use crate::transport::{build_client, endpoint, remote_error, send_ok};

/// Talks to chunkservers over their REST API. One connection pool is shared
/// by every host.
pub struct HttpChunkservers {
    http: reqwest::Client,
}

impl HttpChunkservers {
    pub fn new(config: &ClientConfig) -> Result<HttpChunkservers, ClientError> {
        Ok(HttpChunkservers { http: build_client(config.request_timeout)? })
    }
}

#[async_trait]
impl ChunkserverService for HttpChunkservers {
    async fn store(&self, host: &str, id: ReplicaId, data: Bytes) -> Result<(), RemoteError> {
        let url = endpoint(host, &["api", "Chunk", "storeChunk"])?;
        let body = StoreChunk {
            id,
            data: base64::engine::general_purpose::STANDARD.encode(&data),
        };
        send_ok(self.http.post(url.clone()).json(&body), &url).await?;
        Ok(())
    }

    async fn fetch(&self, host: &str, id: ReplicaId) -> Result<Bytes, RemoteError> {
        let id = id.to_string();
        let url = endpoint(host, &["api", "Chunk", "getChunk", &id])?;
        let resp = send_ok(self.http.get(url.clone()), &url).await?;
        resp.bytes().await.map_err(|e| remote_error(&url, e))
    }

    async fn delete(&self, host: &str, id: ReplicaId) -> Result<(), RemoteError> {
        let id = id.to_string();
        let url = endpoint(host, &["api", "Chunk", "deleteChunk", &id])?;
        send_ok(self.http.delete(url.clone()), &url).await?;
        Ok(())
    }
}
