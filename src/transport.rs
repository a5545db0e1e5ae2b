//! Shared plumbing for the HTTP implementations of the master and
//! chunkserver interfaces.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::{ClientError, RemoteError};

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("dfs-client/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ClientError::Config(format!("http client: {e}")))
}

/// Append path segments to `base`. Each segment is percent-encoded, so a
/// file name containing `/` stays one segment.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, RemoteError> {
    let mut url = Url::parse(base).map_err(|_| RemoteError::InvalidUrl(base.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| RemoteError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) fn remote_error(url: &Url, e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout(url.to_string())
    } else {
        RemoteError::Http { url: url.to_string(), source: e }
    }
}

pub(crate) async fn send(req: RequestBuilder, url: &Url) -> Result<Response, RemoteError> {
    req.send().await.map_err(|e| remote_error(url, e))
}

/// Send and fail on any non-2xx status.
pub(crate) async fn send_ok(req: RequestBuilder, url: &Url) -> Result<Response, RemoteError> {
    let resp = send(req, url).await?;
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(RemoteError::Status { url: url.to_string(), status: resp.status().as_u16() })
    }
}

/// Send, mapping 404 to `None` and any other non-2xx status to an error.
pub(crate) async fn send_optional(
    req: RequestBuilder,
    url: &Url,
) -> Result<Option<Response>, RemoteError> {
    let resp = send(req, url).await?;
    match resp.status() {
        StatusCode::NOT_FOUND => Ok(None),
        s if s.is_success() => Ok(Some(resp)),
        s => Err(RemoteError::Status { url: url.to_string(), status: s.as_u16() }),
    }
}

pub(crate) async fn json<T: DeserializeOwned>(resp: Response, url: &Url) -> Result<T, RemoteError> {
    resp.json::<T>().await.map_err(|e| remote_error(url, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_segments() {
        let url = endpoint("http://master:5000", &["api", "Files", "GetByName", "a.txt"]).unwrap();
        assert_eq!(url.as_str(), "http://master:5000/api/Files/GetByName/a.txt");

        let url = endpoint("http://master:5000/prefix/", &["api", "ChunkServers"]).unwrap();
        assert_eq!(url.as_str(), "http://master:5000/prefix/api/ChunkServers");
    }

    #[test]
    fn endpoint_encodes_names() {
        let url = endpoint("http://m", &["api", "Files", "dir/my file"]).unwrap();
        assert_eq!(url.as_str(), "http://m/api/Files/dir%2Fmy%20file");
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert!(matches!(endpoint("cs-1:80", &["api"]), Err(RemoteError::InvalidUrl(_))));
        assert!(matches!(endpoint("nope", &["api"]), Err(RemoteError::InvalidUrl(_))));
    }
}
