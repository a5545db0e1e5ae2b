use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// A single call to the master or a chunkserver failed.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("{0} did not respond in time")]
    Timeout(String),

    #[error("invalid url {0}")]
    InvalidUrl(String),

    #[error("{0} is unavailable")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("file {0} not found")]
    NotFound(String),

    #[error("file {name} is corrupt: expected {expected} chunks, found {found}")]
    Corrupt {
        name: String,
        expected: u64,
        found: u64,
    },

    #[error("unreachable: {0}")]
    Unreachable(#[from] RemoteError),

    #[error("no chunkservers are registered")]
    NoChunkservers,

    /// Some chunk numbers have no stored replica. Metadata registered
    /// before the failure is left in place on the master.
    #[error("file {name} was partially written, chunks {missing:?} have no replica")]
    PartialWriteFailure { name: String, missing: Vec<u64> },

    #[error("file {name} is unreadable: every replica of chunk {chunk_number} failed")]
    Unreadable { name: String, chunk_number: u64 },

    /// The file metadata is gone but these replica ids could not be
    /// removed from their chunkservers.
    #[error("file {name} deleted, but replicas {failed:?} could not be removed")]
    PartialDeleteFailure { name: String, failed: Vec<u64> },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a [`ClientError`], for callers that translate
/// outcomes into status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Corrupt,
    Unreachable,
    PartialWrite,
    Unreadable,
    PartialDelete,
    Config,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::NotFound(_) => ErrorKind::NotFound,
            ClientError::Corrupt { .. } => ErrorKind::Corrupt,
            ClientError::Unreachable(_) | ClientError::NoChunkservers => ErrorKind::Unreachable,
            ClientError::PartialWriteFailure { .. } => ErrorKind::PartialWrite,
            ClientError::Unreadable { .. } => ErrorKind::Unreadable,
            ClientError::PartialDeleteFailure { .. } => ErrorKind::PartialDelete,
            ClientError::Config(_) => ErrorKind::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct_for_not_found_and_unreachable() {
        let not_found = ClientError::NotFound("a".into());
        let unreachable = ClientError::from(RemoteError::Timeout("master".into()));
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(unreachable.kind(), ErrorKind::Unreachable);
        assert_ne!(not_found.kind(), unreachable.kind());
    }

    #[test]
    fn messages_name_the_file() {
        let err = ClientError::Corrupt { name: "log.txt".into(), expected: 3, found: 2 };
        assert_eq!(err.to_string(), "file log.txt is corrupt: expected 3 chunks, found 2");
    }
}
