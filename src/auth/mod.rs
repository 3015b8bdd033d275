//! Authentication module
//!
//! Supports: Bearer token, Basic
//!
//! The `Authenticator` is the first transport stage: it attaches credentials
//! and identification headers to every outbound request.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::AuthConfig;
