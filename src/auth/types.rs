//! Auth configuration types

use std::fmt;

/// Authentication configuration
#[derive(Clone, Default)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// Bearer token authentication (personal access tokens, app tokens)
    Bearer {
        /// The bearer token
        token: String,
    },

    /// HTTP Basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },
}

impl AuthConfig {
    /// Create bearer auth from a token
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Whether any credential is configured
    pub fn is_configured(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bearer { token } => !token.is_empty(),
            Self::Basic { username, .. } => !username.is_empty(),
        }
    }
}

// Credentials never appear in logs
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}
