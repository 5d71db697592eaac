//! # Application State
//!
//! Configuration read from the environment and the shared handle every
//! handler receives. The trust service owns the key registry and the
//! certificate store; handlers clone the `Arc` and call it from blocking
//! tasks.

use std::path::PathBuf;
use std::sync::Arc;

use certrust_crypto::DEFAULT_MODULUS_BITS;
use certrust_trust::TrustService;

/// Errors reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token. `None` disables authentication.
    pub auth_token: Option<String>,
    /// Directory holding `keys/`, `certificates.json` and `artifacts/`.
    pub data_dir: PathBuf,
    /// Organization directory file (JSON or YAML).
    pub directory: PathBuf,
    /// Modulus size for keys generated at startup.
    pub modulus_bits: usize,
    /// Provision every directory organization before serving.
    pub provision_on_start: bool,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("data_dir", &self.data_dir)
            .field("directory", &self.directory)
            .field("modulus_bits", &self.modulus_bits)
            .field("provision_on_start", &self.provision_on_start)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            data_dir: PathBuf::from(".certrust"),
            directory: PathBuf::from("organizations.json"),
            modulus_bits: DEFAULT_MODULUS_BITS,
            provision_on_start: false,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// unset variables. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value: v.clone(),
            })?,
            None => defaults.port,
        };
        let modulus_bits = match get("CERTRUST_MODULUS_BITS") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "CERTRUST_MODULUS_BITS",
                value: v.clone(),
            })?,
            None => defaults.modulus_bits,
        };
        let provision_on_start = match get("PROVISION_ON_START") {
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid {
                var: "PROVISION_ON_START",
                value: v,
            })?,
            None => false,
        };
        let log_format = match get("LOG_FORMAT").as_deref().map(str::trim) {
            Some("json") => LogFormat::Json,
            Some("text") | None => LogFormat::Text,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            port,
            auth_token: get("AUTH_TOKEN"),
            data_dir: get("CERTRUST_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            directory: get("CERTRUST_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or(defaults.directory),
            modulus_bits,
            provision_on_start,
            log_format,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub trust: Arc<TrustService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, trust: TrustService) -> Self {
        Self {
            trust: Arc::new(trust),
            config: Arc::new(config),
        }
    }
}
