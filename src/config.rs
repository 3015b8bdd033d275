//! Configuration file for pr-relay
//!
//! Settings come from, highest precedence first: command-line flags,
//! per-repository overrides, environment variables, the YAML file and
//! built-in defaults. Flags are applied by the CLI; everything else is
//! resolved here.

use crate::error::{Error, Result};
use crate::github::{DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
use crate::http::{
    HttpClientConfig, RateLimitPolicy, RetryPolicy, ThrottleConfig, DEFAULT_ENDPOINT,
    DEFAULT_MAX_RESPONSE_BYTES,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable overriding the GraphQL endpoint
pub const ENV_GRAPHQL_ENDPOINT: &str = "GITHUB_GRAPHQL_ENDPOINT";
/// Environment variable overriding the default batch size
pub const ENV_BATCH_SIZE: &str = "PR_RELAY_BATCH_SIZE";
/// Environment variable overriding the state directory
pub const ENV_STATE_DIR: &str = "PR_RELAY_STATE_DIR";
/// Environment variable toggling rate-limit auto-wait
pub const ENV_RATE_LIMIT_AUTO_WAIT: &str = "PR_RELAY_RATE_LIMIT_AUTO_WAIT";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete pr-relay configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source API settings
    pub github: GitHubConfig,

    /// Defaults for every run
    pub defaults: DefaultsConfig,

    /// Per-repository overrides keyed by `owner/name`
    pub repositories: HashMap<String, RepositoryConfig>,

    /// Rate-limit handling
    pub rate_limit: RateLimitConfig,

    /// Retry policy
    pub retry: RetryConfig,

    /// Transport limits
    pub http: HttpConfig,
}

// ============================================================================
// Sections
// ============================================================================

/// Source API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GraphQL endpoint URL
    pub graphql_endpoint: String,

    /// Environment variable holding the token
    pub token_env: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            graphql_endpoint: DEFAULT_ENDPOINT.to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
        }
    }
}

/// Defaults for every run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Records per page
    pub batch_size: u32,

    /// Directory holding checkpoints and run audits
    pub state_dir: PathBuf,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            state_dir: PathBuf::from("~/.pr-relay/state"),
            request_timeout_secs: 30,
        }
    }
}

/// Overrides for one repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub batch_size: Option<u32>,
}

/// Rate-limit handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sleep until the window resets instead of failing
    pub auto_wait: bool,

    /// Waits allowed per request
    pub max_waits: u32,

    /// Seconds added to every computed wait
    pub buffer_secs: u64,

    /// Longest single wait in seconds
    pub max_wait_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let policy = RateLimitPolicy::default();
        Self {
            auto_wait: policy.auto_wait,
            max_waits: policy.max_waits,
            buffer_secs: policy.buffer.as_secs(),
            max_wait_secs: policy.max_wait.as_secs(),
        }
    }
}

/// Retry policy for transient failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
        }
    }
}

/// Transport limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Response body ceiling in bytes
    pub max_response_bytes: u64,

    /// Client-side request pacing; 0 disables it
    pub requests_per_second: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            requests_per_second: ThrottleConfig::default().requests_per_second,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load from `path`, or from the first file found in the standard
    /// locations, then apply environment overrides and expand paths
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let home = home_dir();
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_paths(home.as_deref())
                .into_iter()
                .find(|p| p.is_file())
            {
                Some(found) => Self::from_file(&found)?,
                None => Self::default(),
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.expand_paths(home.as_deref());
        Ok(config)
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_yaml_str(&content)
    }

    /// Parse config YAML; an empty document yields the defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse config YAML: {e}")))
    }

    /// Candidate config files, in lookup order
    pub fn default_paths(home: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".pr-relay.yaml"),
            PathBuf::from(".pr-relay.yml"),
        ];
        if let Some(home) = home {
            paths.push(home.join(".pr-relay").join("config.yaml"));
            paths.push(home.join(".pr-relay").join("config.yml"));
        }
        paths
    }

    /// Apply overrides read through `lookup`
    ///
    /// Unparseable numeric values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = get(ENV_GRAPHQL_ENDPOINT) {
            self.github.graphql_endpoint = endpoint;
        }
        if let Some(size) = get(ENV_BATCH_SIZE) {
            match size.trim().parse::<u32>() {
                Ok(size) if size > 0 => self.defaults.batch_size = size,
                _ => debug!("Ignoring {}={}", ENV_BATCH_SIZE, size),
            }
        }
        if let Some(dir) = get(ENV_STATE_DIR) {
            self.defaults.state_dir = PathBuf::from(dir);
        }
        if let Some(flag) = get(ENV_RATE_LIMIT_AUTO_WAIT) {
            self.rate_limit.auto_wait = parse_bool(&flag);
        }
    }

    /// Expand a leading `~/` in the state directory
    pub fn expand_paths(&mut self, home: Option<&Path>) {
        self.defaults.state_dir = expand_home(&self.defaults.state_dir, home);
    }

    /// Check values against source limits
    pub fn validate(&self) -> Result<()> {
        validate_batch_size("defaults.batch_size", self.defaults.batch_size)?;
        for (repo, overrides) in &self.repositories {
            if let Some(size) = overrides.batch_size {
                validate_batch_size(&format!("repositories.{repo}.batch_size"), size)?;
            }
        }

        if self.github.graphql_endpoint.trim().is_empty() {
            return Err(Error::invalid_value(
                "github.graphql_endpoint",
                "endpoint cannot be empty",
            ));
        }
        url::Url::parse(&self.github.graphql_endpoint).map_err(|e| {
            Error::invalid_value(
                "github.graphql_endpoint",
                format!("'{}' is not a URL: {e}", self.github.graphql_endpoint),
            )
        })?;
        if self.defaults.request_timeout_secs == 0 {
            return Err(Error::invalid_value(
                "defaults.request_timeout_secs",
                "timeout must be positive",
            ));
        }
        Ok(())
    }

    /// Batch size for `repo`, honouring per-repository overrides
    pub fn batch_size_for(&self, repo: &str) -> u32 {
        self.repositories
            .get(repo)
            .and_then(|r| r.batch_size)
            .filter(|size| *size > 0)
            .unwrap_or(self.defaults.batch_size)
    }

    /// Transport settings derived from this config
    pub fn http_client_config(&self) -> HttpClientConfig {
        let rate_limit = RateLimitPolicy {
            auto_wait: self.rate_limit.auto_wait,
            max_waits: self.rate_limit.max_waits,
            buffer: Duration::from_secs(self.rate_limit.buffer_secs),
            max_wait: Duration::from_secs(self.rate_limit.max_wait_secs),
        };
        let retry = RetryPolicy {
            max_retries: self.retry.max_retries,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
            ..RetryPolicy::default()
        };

        let builder = HttpClientConfig::builder()
            .endpoint(&self.github.graphql_endpoint)
            .timeout(Duration::from_secs(self.defaults.request_timeout_secs))
            .max_response_bytes(self.http.max_response_bytes)
            .rate_limit(rate_limit);

        let builder = if self.http.requests_per_second == 0 {
            builder.no_throttle()
        } else {
            builder.throttle(ThrottleConfig::new(
                self.http.requests_per_second,
                self.http.requests_per_second,
            ))
        };

        let mut config = builder.build();
        config.retry = retry;
        config
    }
}

fn validate_batch_size(field: &str, size: u32) -> Result<()> {
    if size == 0 || size > MAX_BATCH_SIZE {
        return Err(Error::invalid_value(
            field,
            format!("batch size {size} must be between 1 and {MAX_BATCH_SIZE}"),
        ));
    }
    Ok(())
}

/// The user's home directory from `HOME`, or `USERPROFILE` on Windows
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

/// Replace a leading `~/` with `home`
pub fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.github.graphql_endpoint, "https://api.github.com/graphql");
        assert_eq!(config.github.token_env, "GITHUB_TOKEN");
        assert_eq!(config.defaults.batch_size, 50);
        assert_eq!(config.defaults.request_timeout_secs, 30);
        assert!(config.rate_limit.auto_wait);
        assert_eq!(config.rate_limit.max_waits, 10);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_backoff_ms, 1000);
        assert_eq!(config.http.max_response_bytes, 10 * 1024 * 1024);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
github:
  graphql_endpoint: "https://ghe.example.com/api/graphql"
  token_env: GHE_TOKEN
defaults:
  batch_size: 25
  state_dir: /var/lib/pr-relay
  request_timeout_secs: 90
repositories:
  octo/huge:
    batch_size: 10
rate_limit:
  auto_wait: false
  max_waits: 2
retry:
  max_retries: 5
  initial_backoff_ms: 200
  max_backoff_ms: 5000
http:
  max_response_bytes: 1048576
  requests_per_second: 0
"#;

        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.github.graphql_endpoint, "https://ghe.example.com/api/graphql");
        assert_eq!(config.github.token_env, "GHE_TOKEN");
        assert_eq!(config.defaults.batch_size, 25);
        assert_eq!(config.defaults.state_dir, PathBuf::from("/var/lib/pr-relay"));
        assert_eq!(config.batch_size_for("octo/huge"), 10);
        assert_eq!(config.batch_size_for("octo/small"), 25);
        assert!(!config.rate_limit.auto_wait);
        // unspecified fields keep their defaults
        assert_eq!(config.rate_limit.max_wait_secs, 3600);

        let http = config.http_client_config();
        assert_eq!(http.endpoint, "https://ghe.example.com/api/graphql");
        assert_eq!(http.timeout, Duration::from_secs(90));
        assert_eq!(http.retry.max_retries, 5);
        assert_eq!(http.retry.initial_backoff, Duration::from_millis(200));
        assert_eq!(http.max_response_bytes, 1_048_576);
        assert!(!http.rate_limit.auto_wait);
        assert_eq!(http.rate_limit.max_waits, 2);
        assert!(http.throttle.is_none());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml_str("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Config::from_yaml_str("defaults: [1, 2").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config YAML"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[
            (ENV_GRAPHQL_ENDPOINT, "http://localhost:8080/graphql"),
            (ENV_BATCH_SIZE, "20"),
            (ENV_STATE_DIR, "/tmp/relay-state"),
            (ENV_RATE_LIMIT_AUTO_WAIT, "off"),
        ]));

        assert_eq!(config.github.graphql_endpoint, "http://localhost:8080/graphql");
        assert_eq!(config.defaults.batch_size, 20);
        assert_eq!(config.defaults.state_dir, PathBuf::from("/tmp/relay-state"));
        assert!(!config.rate_limit.auto_wait);
    }

    #[test]
    fn test_env_ignores_bad_batch_size() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[(ENV_BATCH_SIZE, "lots"), (ENV_STATE_DIR, "")]));
        assert_eq!(config.defaults.batch_size, 50);
        assert_eq!(config.defaults.state_dir, PathBuf::from("~/.pr-relay/state"));
    }

    #[test]
    fn test_repository_override_beats_env() {
        let mut config =
            Config::from_yaml_str("repositories:\n  octo/repo:\n    batch_size: 15\n").unwrap();
        config.apply_env_overrides(env(&[(ENV_BATCH_SIZE, "40")]));

        assert_eq!(config.batch_size_for("octo/repo"), 15);
        assert_eq!(config.batch_size_for("octo/other"), 40);
    }

    #[test_case("true", true)]
    #[test_case("YES", true)]
    #[test_case("1", true)]
    #[test_case(" on ", true)]
    #[test_case("false", false)]
    #[test_case("nope", false)]
    fn test_parse_bool(input: &str, expected: bool) {
        assert_eq!(parse_bool(input), expected);
    }

    #[test]
    fn test_expand_home() {
        let home = Path::new("/home/octo");
        assert_eq!(
            expand_home(Path::new("~/.pr-relay/state"), Some(home)),
            PathBuf::from("/home/octo/.pr-relay/state")
        );
        assert_eq!(
            expand_home(Path::new("/abs/state"), Some(home)),
            PathBuf::from("/abs/state")
        );
        assert_eq!(
            expand_home(Path::new("~/state"), None),
            PathBuf::from("~/state")
        );
    }

    #[test]
    fn test_default_paths_order() {
        let paths = Config::default_paths(Some(Path::new("/home/octo")));
        assert_eq!(
            paths,
            vec![
                PathBuf::from(".pr-relay.yaml"),
                PathBuf::from(".pr-relay.yml"),
                PathBuf::from("/home/octo/.pr-relay/config.yaml"),
                PathBuf::from("/home/octo/.pr-relay/config.yml"),
            ]
        );
        assert_eq!(Config::default_paths(None).len(), 2);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("relay.yaml");
        std::fs::write(&path, "defaults:\n  batch_size: 7\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.defaults.batch_size, 7);

        let err = Config::from_file(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test_case(0)]
    #[test_case(101)]
    fn test_validate_rejects_batch_size(size: u32) {
        let mut config = Config::default();
        config.defaults.batch_size = size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_endpoint() {
        let mut config = Config::default();
        config.github.graphql_endpoint = " ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("graphql_endpoint"));
    }

    #[test]
    fn test_validate_rejects_relative_endpoint() {
        let mut config = Config::default();
        config.github.graphql_endpoint = "api/graphql".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("is not a URL"));
    }

    #[test]
    fn test_validate_rejects_repository_override() {
        let config =
            Config::from_yaml_str("repositories:\n  octo/repo:\n    batch_size: 500\n").unwrap();
        assert!(config.validate().is_err());
    }
}
