use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

use crate::chunk::DEFAULT_CHUNK_SIZE;
use crate::error::{ClientError, Result};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Client configuration. Passed by value into [`crate::Client`] and never
/// mutated afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the master, e.g. `http://master:5000`.
    pub master_url: String,
    /// Target number of replicas per chunk.
    #[serde(default = "default_replication_level")]
    pub replication_level: NonZeroUsize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: NonZeroUsize,
    /// Deadline applied to every call to the master or a chunkserver.
    #[serde(default = "default_request_timeout", with = "millis")]
    pub request_timeout: Duration,
    /// Upper bound on concurrent outbound calls within one operation.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// Fixed seed for replica placement. Unset means a fresh seed per write.
    #[serde(default)]
    pub placement_seed: Option<u64>,
}

fn default_replication_level() -> NonZeroUsize {
    NonZeroUsize::MIN
}

fn default_chunk_size() -> NonZeroUsize {
    DEFAULT_CHUNK_SIZE
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

impl ClientConfig {
    pub fn new(master_url: impl Into<String>) -> ClientConfig {
        ClientConfig {
            master_url: master_url.into(),
            replication_level: default_replication_level(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            placement_seed: None,
        }
    }

    pub fn with_replication_level(mut self, level: NonZeroUsize) -> ClientConfig {
        self.replication_level = level;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: NonZeroUsize) -> ClientConfig {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> ClientConfig {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> ClientConfig {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn with_placement_seed(mut self, seed: u64) -> ClientConfig {
        self.placement_seed = Some(seed);
        self
    }

    pub fn from_json(json: &str) -> Result<ClientConfig> {
        let config: ClientConfig =
            serde_json::from_str(json).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read the configuration from `DFS_*` environment variables. Only
    /// `DFS_MASTER_URL` is required.
    pub fn from_env() -> Result<ClientConfig> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<ClientConfig> {
        let master_url = lookup("DFS_MASTER_URL")
            .ok_or_else(|| ClientError::Config("DFS_MASTER_URL is not set".into()))?;
        let mut config = ClientConfig::new(master_url);

        if let Some(level) = parse_var(&lookup, "DFS_REPLICATION_LEVEL")? {
            config.replication_level = level;
        }
        if let Some(size) = parse_var(&lookup, "DFS_CHUNK_SIZE")? {
            config.chunk_size = size;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "DFS_REQUEST_TIMEOUT_MS")? {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var(&lookup, "DFS_MAX_IN_FLIGHT")? {
            config.max_in_flight = n;
        }
        config.placement_seed = parse_var(&lookup, "DFS_PLACEMENT_SEED")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(ClientError::Config("max in flight must be positive".into()));
        }
        if reqwest::Url::parse(&self.master_url).is_err() {
            return Err(ClientError::Config(format!(
                "master url {} is not a valid url",
                self.master_url
            )));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ClientError::Config(format!("{key}={raw} is not valid"))),
    }
}
