//! Size-limited response bodies

use super::rate_limit::RateLimitInfo;
use crate::error::{Error, Result};
use bytes::{Bytes, BytesMut};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

/// Default response ceiling (10 MiB)
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 10 * 1024 * 1024;

/// A fully read response: status, rate-limit headers and body
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Parsed rate-limit headers
    pub rate_limit: RateLimitInfo,
    /// Response body, at most the configured ceiling
    pub body: Bytes,
}

impl TransportResponse {
    /// Body as text, replacing invalid UTF-8
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| Error::decode(e.to_string()))
    }
}

/// Read a response body, failing once it exceeds `limit` bytes
pub async fn read_limited(mut response: Response, limit: u64) -> Result<Bytes> {
    if let Some(length) = response.content_length() {
        if length > limit {
            return Err(Error::ResponseTooLarge { limit });
        }
    }

    let mut buf = BytesMut::new();
    while let Some(chunk) = response.chunk().await? {
        if buf.len() as u64 + chunk.len() as u64 > limit {
            return Err(Error::ResponseTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf.freeze())
}
