//! Configuration types and loading
//!
//! The config file path comes from `--config`, then CONFIG_PATH, then
//! `ultradns.toml`. Omitted settings take the client defaults. The password
//! is loaded from the ULTRADNS_PASSWORD env var or password_file, never
//! stored in the TOML directly to avoid leaking secrets.

use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use ultradns_client::{ApiOptions, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
}

/// UltraDNS account settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub username: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
    /// Path to a file containing the password (alternative to ULTRADNS_PASSWORD)
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    #[serde(skip)]
    pub refresh_token: Option<Secret<String>>,
    /// Path to a file holding a refresh token saved from an earlier session
    #[serde(default)]
    pub refresh_token_file: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Password resolution order:
    /// 1. ULTRADNS_PASSWORD env var
    /// 2. password_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        let api = &mut config.api;

        if api.username.trim().is_empty() {
            return Err(common::Error::Config("username must not be empty".into()));
        }

        if !api.base_url.starts_with("http://") && !api.base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                api.base_url
            )));
        }

        if api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        // Env var takes precedence over file
        if let Ok(password) = std::env::var("ULTRADNS_PASSWORD") {
            api.password = Some(Secret::from(password));
        } else if let Some(ref file) = api.password_file {
            api.password = read_secret_file(file, "password_file")?;
        }

        if let Some(ref file) = api.refresh_token_file {
            api.refresh_token = read_secret_file(file, "refresh_token_file")?;
        }

        if api.password.is_none() && api.refresh_token.is_none() {
            return Err(common::Error::MissingSecret(
                "ULTRADNS_PASSWORD, password_file or refresh_token_file",
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("ultradns.toml")
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connection options for this account.
    pub fn options(&self) -> ApiOptions {
        let password = self
            .password
            .clone()
            .unwrap_or_else(|| String::new().into());
        let mut options = ApiOptions::new(self.username.clone(), password)
            .base_url(self.base_url.clone())
            .timeout(self.timeout());
        if let Some(ref token) = self.refresh_token {
            options = options.refresh_token(token.expose().clone());
        }
        options
    }
}

/// Read a trimmed secret from `path`; whitespace-only content counts as absent.
fn read_secret_file(path: &Path, field: &str) -> common::Result<Option<Secret<String>>> {
    let value = std::fs::read_to_string(path).map_err(|e| {
        common::Error::Config(format!("failed to read {field} {}: {e}", path.display()))
    })?;
    let value = value.trim().to_owned();
    Ok((!value.is_empty()).then(|| Secret::new(value)))
}
