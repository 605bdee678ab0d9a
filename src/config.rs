use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::DEFAULT_TOKEN_KEY;

/// Default configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = "VoteSphere.toml";

/// Prefix of environment variables overriding the configuration file.
pub const ENV_PREFIX: &str = "VOTESPHERE_";

/// Client configuration, layered from defaults, `VoteSphere.toml` and
/// `VOTESPHERE_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    api_url: String,
    timeout_secs: u64,
    token_key: String,
    token_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5656/api".to_string(),
            timeout_secs: 10,
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            token_file: PathBuf::from(".votesphere/store.json"),
        }
    }
}

impl ClientConfig {
    /// The provider stack, with `file` replacing [`CONFIG_FILE`] if given.
    pub fn figment(file: Option<&Path>) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file.unwrap_or_else(|| Path::new(CONFIG_FILE))))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Extract and validate a configuration.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(file))
    }

    fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "`api_url` must be an http(s) URL, got \"{}\"",
                self.api_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("`timeout_secs` must be positive".to_string()));
        }
        if self.token_key.is_empty() {
            return Err(Error::Config("`token_key` must not be empty".to_string()));
        }
        Ok(())
    }

    /// Override the API base URL.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Base URL of the REST API, without a trailing slash.
    /// Configured via `API_URL`.
    pub fn api_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    /// Per-request timeout, covering connect and body.
    /// Configured via `TIMEOUT_SECS`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Key of the ballot token in the persistence slot.
    /// Configured via `TOKEN_KEY`.
    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    /// File backing the persistence slot for the CLI.
    /// Configured via `TOKEN_FILE`.
    pub fn token_file(&self) -> &Path {
        &self.token_file
    }

    /// Origin serving uploaded files: the API URL without its `/api` suffix.
    pub fn backend_origin(&self) -> &str {
        let api_url = self.api_url();
        api_url.strip_suffix("/api").unwrap_or(api_url)
    }

    /// Resolve an uploaded file (e.g. a candidate photo) to a full URL.
    pub fn file_url(&self, path: &str) -> Option<String> {
        if path.is_empty() {
            return None;
        }
        if path.starts_with("http://") || path.starts_with("https://") {
            return Some(path.to_string());
        }
        let separator = if path.starts_with('/') { "" } else { "/" };
        Some(format!("{}{separator}{path}", self.backend_origin()))
    }
}
