//! Error classification for GraphQL responses
//!
//! Status codes decide first, then the structured `errors[].type` field of
//! the payload. Free-text wording is only consulted when neither carries a
//! usable signal.

use crate::error::{is_transient_status, Error, Result};
use crate::http::{RateLimitInfo, TransportResponse};
use crate::types::RepoRef;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQLError>,
}

/// One entry of a GraphQL `errors` array
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphQLError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

/// Classify a response and decode its `data` member
pub fn decode_response<T: DeserializeOwned>(
    response: TransportResponse,
    repo: &RepoRef,
) -> Result<T> {
    check_status(&response, repo)?;

    let envelope: Envelope = response.json()?;
    if let Some(err) = envelope.errors.first() {
        return Err(classify_graphql_error(err, &response.rate_limit, repo));
    }

    match envelope.data {
        Some(data) => serde_json::from_value(data).map_err(|e| Error::decode(e.to_string())),
        None => Err(Error::decode("response carried neither data nor errors")),
    }
}

/// Classify by HTTP status
pub fn check_status(response: &TransportResponse, repo: &RepoRef) -> Result<()> {
    let status = response.status.as_u16();
    if response.status.is_success() {
        return Ok(());
    }

    let text = response.text_lossy();
    let info = &response.rate_limit;
    match status {
        401 => Err(Error::auth(format!("HTTP 401: {}", summarize(&text)))),
        403 if info.is_exhausted() || mentions_rate_limit(&text) => Err(rate_limited(
            format!("HTTP 403: {}", summarize(&text)),
            info,
        )),
        403 => Err(Error::auth(format!("HTTP 403: {}", summarize(&text)))),
        404 => Err(Error::not_found(repo.key())),
        429 => Err(rate_limited(format!("HTTP 429: {}", summarize(&text)), info)),
        s if is_transient_status(s) || (500..600).contains(&s) => {
            Err(Error::network(format!("HTTP {s}: {}", summarize(&text))))
        }
        _ => Err(classify_message(&text, info, repo).unwrap_or_else(|| Error::http_status(status, text))),
    }
}

/// Classify a structured GraphQL error by its `type`, falling back to wording
pub fn classify_graphql_error(err: &GraphQLError, info: &RateLimitInfo, repo: &RepoRef) -> Error {
    match err.error_type.as_deref() {
        Some("RATE_LIMITED") => rate_limited(err.message.clone(), info),
        Some("NOT_FOUND") => Error::not_found(repo.key()),
        Some("FORBIDDEN" | "UNAUTHORIZED") => Error::auth(err.message.clone()),
        Some("MAX_NODE_LIMIT_EXCEEDED" | "COMPLEXITY") => Error::complexity(err.message.clone()),
        _ => classify_message(&err.message, info, repo)
            .unwrap_or_else(|| Error::api(err.message.clone())),
    }
}

/// Wording fallback for sources that only return free text
pub fn classify_message(message: &str, info: &RateLimitInfo, repo: &RepoRef) -> Option<Error> {
    let lower = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if mentions_rate_limit(&lower) {
        Some(rate_limited(message.to_string(), info))
    } else if has(&["unauthorized", "forbidden", "bad credentials", "authentication"]) {
        Some(Error::auth(message.to_string()))
    } else if has(&["could not resolve to a repository", "not found"]) {
        Some(Error::not_found(repo.key()))
    } else if has(&["complexity", "exceeds maximum", "max node limit"]) {
        Some(Error::complexity(message.to_string()))
    } else if has(&[
        "connection refused",
        "no such host",
        "timeout",
        "timed out",
        "temporary failure",
        "tls handshake",
        "network is unreachable",
    ]) {
        Some(Error::network(message.to_string()))
    } else {
        None
    }
}

fn mentions_rate_limit(text: &str) -> bool {
    text.to_lowercase().contains("rate limit")
}

fn rate_limited(message: String, info: &RateLimitInfo) -> Error {
    Error::rate_limited(message, info.resets_at(Utc::now()))
}

/// The `message` of a JSON error body, or the start of the raw text
fn summarize(text: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        if let Some(Value::String(message)) = map.get("message") {
            return message.clone();
        }
    }
    text.chars().take(200).collect()
}
