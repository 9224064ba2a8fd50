// crates/ntropy-mcp-config/src/config.rs
// ============================================================================
// Module: Ntropy MCP Configuration
// Description: Configuration loading and validation for the MCP server.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, thiserror, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Unknown keys are rejected. A missing default file yields built-in defaults;
//! a missing explicitly named file is an error. The API credential is never
//! required to be in the file: it may come from `--api-key` or
//! `NTROPY_API_KEY`, which take precedence in that order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "ntropy-mcp.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "NTROPY_MCP_CONFIG";
/// Environment variable carrying the API credential.
pub const API_KEY_ENV_VAR: &str = "NTROPY_API_KEY";
/// Default remote API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.ntropy.com";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum accepted request body size.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 64 * 1024 * 1024;
/// Minimum per-call remote timeout.
pub(crate) const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum per-call remote timeout.
pub(crate) const MAX_TIMEOUT_MS: u64 = 120_000;
/// Maximum attempts per remote call.
pub(crate) const MAX_ATTEMPTS_LIMIT: u32 = 10;
/// Maximum remote backoff ceiling.
pub(crate) const MAX_BACKOFF_LIMIT_MS: u64 = 60_000;
/// Maximum concurrent bulk sub-batches.
pub(crate) const MAX_BULK_CONCURRENCY: usize = 16;
/// Maximum API key length.
pub(crate) const MAX_API_KEY_LENGTH: usize = 512;
/// Maximum user agent length.
pub(crate) const MAX_USER_AGENT_LENGTH: usize = 256;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root configuration for the Ntropy MCP server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// MCP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Remote enrichment service settings.
    #[serde(default)]
    pub remote: RemoteConfig,
}

impl ServiceConfig {
    /// Loads and validates configuration.
    ///
    /// The path is resolved from the explicit argument, then
    /// `NTROPY_MCP_CONFIG`, then `ntropy-mcp.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, env::var(CONFIG_ENV_VAR).ok())
    }

    /// Loads configuration with an explicit environment override value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load_with_env(
        path: Option<&Path>,
        env_path: Option<String>,
    ) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path, env_path)?;
        validate_path(&resolved)?;
        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !explicit => {
                let mut config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(err) => {
                return Err(ConfigError::Io(format!("{}: {err}", resolved.display())));
            }
        };
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.remote.validate()?;
        Ok(())
    }

    /// Resolves the API credential by precedence: flag, environment, file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] when no source supplies a
    /// key, or [`ConfigError::Invalid`] when the chosen key is malformed.
    pub fn resolve_api_key(
        &self,
        flag: Option<&str>,
        env_value: Option<String>,
    ) -> Result<String, ConfigError> {
        let (source, candidate) = if let Some(flag) = flag {
            ("--api-key", flag.to_string())
        } else if let Some(value) = env_value.filter(|value| !value.trim().is_empty()) {
            (API_KEY_ENV_VAR, value)
        } else if let Some(value) = &self.remote.api_key {
            ("remote.api_key", value.clone())
        } else {
            return Err(ConfigError::MissingCredential);
        };
        validate_api_key(source, &candidate)?;
        Ok(candidate)
    }
}

/// Reads the API credential from the process environment.
#[must_use]
pub fn env_api_key() -> Option<String> {
    env::var(API_KEY_ENV_VAR).ok()
}

// ============================================================================
// SECTION: Server Config
// ============================================================================

/// Server configuration for MCP transports.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Transport type for MCP.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for HTTP or SSE transports.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            bind: None,
            max_body_bytes: default_max_body_bytes(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Validates server transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid("max_body_bytes exceeds limit".to_string()));
        }
        self.audit.validate()?;
        match self.transport {
            ServerTransport::Http | ServerTransport::Sse => {
                let bind = self.bind.as_deref().unwrap_or_default().trim();
                if bind.is_empty() {
                    return Err(ConfigError::Invalid(
                        "http/sse transport requires bind address".to_string(),
                    ));
                }
                let _: SocketAddr = bind
                    .parse()
                    .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))?;
            }
            ServerTransport::Stdio => {}
        }
        Ok(())
    }

    /// Returns the parsed bind address for network transports.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no valid bind address is set.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .as_deref()
            .map(str::trim)
            .filter(|bind| !bind.is_empty())
            .ok_or_else(|| ConfigError::Invalid("bind address required".to_string()))?
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }
}

/// Supported MCP transport types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Use stdin/stdout transport.
    #[default]
    Stdio,
    /// Use HTTP JSON-RPC transport.
    Http,
    /// Use SSE transport for responses.
    Sse,
}

impl ServerTransport {
    /// Returns the stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
            Self::Sse => "sse",
        }
    }
}

/// Audit logging configuration for MCP server requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self { enabled: default_audit_enabled(), path: None }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("server.audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Remote Config
// ============================================================================

/// Remote enrichment service configuration.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API credential; usually supplied via flag or environment instead.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum attempts per remote call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Initial retry backoff in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Retry backoff ceiling in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Maximum transactions per remote bulk call.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Maximum bulk sub-batches in flight.
    #[serde(default = "default_bulk_concurrency")]
    pub bulk_concurrency: usize,
    /// User-Agent header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_batch_size: default_max_batch_size(),
            bulk_concurrency: default_bulk_concurrency(),
            user_agent: default_user_agent(),
        }
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .field("max_attempts", &self.max_attempts)
            .field("initial_backoff_ms", &self.initial_backoff_ms)
            .field("max_backoff_ms", &self.max_backoff_ms)
            .field("max_batch_size", &self.max_batch_size)
            .field("bulk_concurrency", &self.bulk_concurrency)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl RemoteConfig {
    /// Validates remote client limits.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(self.base_url.trim())
            .map_err(|_| ConfigError::Invalid("remote.base_url must be a valid url".to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid("remote.base_url must use http or https".to_string()));
        }
        if url.host_str().is_none() {
            return Err(ConfigError::Invalid("remote.base_url must include a host".to_string()));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(ConfigError::Invalid(
                "remote.base_url must not embed credentials".to_string(),
            ));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigError::Invalid(
                "remote.base_url must not include a query or fragment".to_string(),
            ));
        }
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "remote.timeout_ms must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"
            )));
        }
        if !(1..=MAX_ATTEMPTS_LIMIT).contains(&self.max_attempts) {
            return Err(ConfigError::Invalid(format!(
                "remote.max_attempts must be between 1 and {MAX_ATTEMPTS_LIMIT}"
            )));
        }
        if self.max_backoff_ms > MAX_BACKOFF_LIMIT_MS {
            return Err(ConfigError::Invalid(format!(
                "remote.max_backoff_ms must be at most {MAX_BACKOFF_LIMIT_MS}"
            )));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "remote.initial_backoff_ms must not exceed remote.max_backoff_ms".to_string(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "remote.max_batch_size must be greater than zero".to_string(),
            ));
        }
        if !(1..=MAX_BULK_CONCURRENCY).contains(&self.bulk_concurrency) {
            return Err(ConfigError::Invalid(format!(
                "remote.bulk_concurrency must be between 1 and {MAX_BULK_CONCURRENCY}"
            )));
        }
        let agent = self.user_agent.trim();
        if agent.is_empty() || agent.len() > MAX_USER_AGENT_LENGTH {
            return Err(ConfigError::Invalid("remote.user_agent length out of range".to_string()));
        }
        if let Some(key) = &self.api_key {
            validate_api_key("remote.api_key", key)?;
        }
        Ok(())
    }

    /// Returns the per-attempt timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns the initial retry backoff.
    #[must_use]
    pub const fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Returns the retry backoff ceiling.
    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// No API credential was supplied by any source.
    #[error("missing api key: pass --api-key, set {API_KEY_ENV_VAR}, or set remote.api_key")]
    MissingCredential,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
///
/// Returns the path and whether it was named explicitly.
fn resolve_path(
    path: Option<&Path>,
    env_path: Option<String>,
) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Some(env_path) = env_path.filter(|value| !value.trim().is_empty()) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must not be empty")));
    }
    validate_path(Path::new(value)).map_err(|_| ConfigError::Invalid(format!("{field} too long")))
}

/// Validates an API key without echoing it.
fn validate_api_key(source: &str, key: &str) -> Result<(), ConfigError> {
    if key.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{source} must not be empty")));
    }
    if key.len() > MAX_API_KEY_LENGTH {
        return Err(ConfigError::Invalid(format!("{source} exceeds max length")));
    }
    if key.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        return Err(ConfigError::Invalid(format!("{source} contains whitespace")));
    }
    Ok(())
}

/// Default maximum request body size.
pub(crate) const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default audit logging state.
pub(crate) const fn default_audit_enabled() -> bool {
    true
}

/// Default remote base URL.
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Default per-attempt timeout.
pub(crate) const fn default_timeout_ms() -> u64 {
    30_000
}

/// Default attempts per call.
pub(crate) const fn default_max_attempts() -> u32 {
    3
}

/// Default initial backoff.
pub(crate) const fn default_initial_backoff_ms() -> u64 {
    250
}

/// Default backoff ceiling.
pub(crate) const fn default_max_backoff_ms() -> u64 {
    5_000
}

/// Default bulk sub-batch size.
pub(crate) const fn default_max_batch_size() -> usize {
    1_000
}

/// Default bulk sub-batch concurrency.
pub(crate) const fn default_bulk_concurrency() -> usize {
    2
}

/// Default User-Agent header.
fn default_user_agent() -> String {
    format!("ntropy-mcp/{}", env!("CARGO_PKG_VERSION"))
}
