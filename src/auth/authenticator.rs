//! Authenticator implementation
//!
//! Applies credentials and identification headers to request builders.

use super::types::AuthConfig;
use reqwest::header::USER_AGENT;
use reqwest::RequestBuilder;

/// Authenticator handles applying authentication to HTTP requests
#[derive(Debug, Clone)]
pub struct Authenticator {
    /// Auth configuration
    config: AuthConfig,
    /// User agent sent with every request
    user_agent: String,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            user_agent: format!("pr-relay/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Override the user agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// The configured credentials
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Apply authentication to a request builder
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req.header(USER_AGENT, self.user_agent.as_str());
        match &self.config {
            AuthConfig::None => req,
            AuthConfig::Bearer { token } => req.bearer_auth(token),
            AuthConfig::Basic { username, password } => {
                req.basic_auth(username, Some(password))
            }
        }
    }
}

impl Default for Authenticator {
    fn default() -> Self {
        Self::new(AuthConfig::None)
    }
}
