//! CLI configuration: `courier.toml` plus environment overrides.
//!
//! ```text
//! --config PATH (or ./courier.toml if present, else built-in defaults)
//!     → toml deserialise (every field optional)
//!     → COURIER_BASE_URL override
//!     → validate (all problems reported together)
//!     → CourierConfig (immutable for the rest of the run)
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dispatch::{ClientDefaults, CredentialProvider};
use serde::Deserialize;
use thiserror::Error;
use transport::{EnvCredentials, KeyedFileStore, NoCredentials, StoredToken, DEFAULT_TOKEN_ENV};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "courier.toml";

/// Environment variable that overrides `api.base_url`.
pub const BASE_URL_ENV: &str = "COURIER_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    pub api: ApiConfig,
    pub credentials: CredentialsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Extra default headers, layered over `Content-Type: application/json`.
    pub headers: BTreeMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: dispatch::DEFAULT_BASE_URL.to_string(),
            timeout_ms: dispatch::DEFAULT_TIMEOUT.as_millis() as u64,
            max_retries: dispatch::DEFAULT_MAX_RETRIES,
            retry_delay_ms: dispatch::DEFAULT_RETRY_DELAY.as_millis() as u64,
            headers: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    #[default]
    None,
    Env,
    File,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub source: CredentialSource,
    /// Variable read when `source = "env"`.
    pub env_var: String,
    /// Token store directory when `source = "file"`; the token lives in
    /// `<dir>/access_token`.
    pub dir: Option<PathBuf>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            source: CredentialSource::None,
            env_var: DEFAULT_TOKEN_ENV.to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "warn,dispatch=info,transport=info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl CourierConfig {
    /// Loads, overrides, and validates.
    ///
    /// An explicit `path` must exist. Without one, `./courier.toml` is used if
    /// present and the built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                config.api.base_url = base_url.trim().to_string();
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Semantic checks serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        match dispatch::build_url(&self.api.base_url, "", &[]) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => problems.push(format!(
                "api.base_url must use http or https, got '{}'",
                url.scheme()
            )),
            Err(e) => problems.push(format!("api.base_url: {e}")),
        }
        if self.api.timeout_ms == 0 {
            problems.push("api.timeout_ms must be greater than zero".to_string());
        }
        for name in self.api.headers.keys() {
            if name.trim().is_empty() {
                problems.push("api.headers contains an empty header name".to_string());
            }
        }
        match self.credentials.source {
            CredentialSource::Env if self.credentials.env_var.trim().is_empty() => {
                problems.push("credentials.env_var must be set when source = \"env\"".to_string());
            }
            CredentialSource::File if self.credentials.dir.is_none() => {
                problems.push("credentials.dir must be set when source = \"file\"".to_string());
            }
            _ => {}
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }

    /// Process-wide dispatcher defaults described by this config.
    pub fn client_defaults(&self) -> ClientDefaults {
        let mut defaults = ClientDefaults::with_base_url(self.api.base_url.clone());
        defaults.timeout = Duration::from_millis(self.api.timeout_ms);
        defaults.max_retries = self.api.max_retries;
        defaults.retry_delay = Duration::from_millis(self.api.retry_delay_ms);
        for (name, value) in &self.api.headers {
            defaults.headers.insert(name, value);
        }
        defaults
    }

    /// The bearer-token source described by this config.
    pub fn credential_provider(&self) -> Arc<dyn CredentialProvider> {
        match (self.credentials.source, &self.credentials.dir) {
            (CredentialSource::Env, _) => {
                Arc::new(EnvCredentials::new(self.credentials.env_var.clone()))
            }
            (CredentialSource::File, Some(dir)) => {
                Arc::new(StoredToken::new(KeyedFileStore::new(dir.clone())))
            }
            _ => Arc::new(NoCredentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = CourierConfig::from_toml("").unwrap();
        assert_eq!(config, CourierConfig::default());
        assert!(config.validate().is_ok());

        let defaults = config.client_defaults();
        assert_eq!(defaults, ClientDefaults::default());
    }

    #[test]
    fn full_file_is_applied() {
        let config = CourierConfig::from_toml(
            r#"
            [api]
            base_url = "https://search.example.com/api/v1"
            timeout_ms = 2500
            max_retries = 1
            retry_delay_ms = 250

            [api.headers]
            X-Client = "courier"

            [credentials]
            source = "file"
            dir = "/var/lib/courier"

            [logging]
            format = "json"
            filter = "debug"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());

        let defaults = config.client_defaults();
        assert_eq!(defaults.base_url, "https://search.example.com/api/v1");
        assert_eq!(defaults.timeout, Duration::from_millis(2500));
        assert_eq!(defaults.max_retries, 1);
        assert_eq!(defaults.retry_delay, Duration::from_millis(250));
        assert_eq!(defaults.headers.get("x-client"), Some("courier"));
        assert_eq!(defaults.headers.get("content-type"), Some("application/json"));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn validation_reports_every_problem() {
        let config = CourierConfig::from_toml(
            r#"
            [api]
            base_url = "ftp://files.example.com"
            timeout_ms = 0

            [credentials]
            source = "file"
            "#,
        )
        .unwrap();

        match config.validate() {
            Err(ConfigError::Validation(problems)) => assert_eq!(problems.len(), 3),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn unknown_credential_source_is_a_parse_error() {
        let err = CourierConfig::from_toml("[credentials]\nsource = \"keychain\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CourierConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn file_credentials_read_the_token_store() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(transport::ACCESS_TOKEN_KEY), "tok").unwrap();
        let path = dir.path().join("courier.toml");
        std::fs::write(
            &path,
            format!(
                "[credentials]\nsource = \"file\"\ndir = {:?}\n",
                dir.path().display().to_string()
            ),
        )
        .unwrap();

        let config = CourierConfig::from_file(&path).unwrap();
        assert_eq!(config.credential_provider().bearer_token().as_deref(), Some("tok"));
    }
}
