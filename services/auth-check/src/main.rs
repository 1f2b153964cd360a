//! UltraDNS credential check
//!
//! Verifies that a configured account can authenticate:
//! 1. Loads `[api]` settings and the password or saved refresh token
//! 2. Exchanges them for a bearer token
//! 3. Prints the session with the password masked
//! 4. With `--status`, calls `GET /status` using the new token
//!
//! Usage: `ultradns-auth-check [--config PATH] [--status]`

mod config;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ultradns_client::ApiConnection;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    // CLI: simple --config / --status flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());
    let check_status = args.iter().any(|a| a == "--status");

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        username = %config.api.username,
        base_url = %config.api.base_url,
        timeout_secs = config.api.timeout_secs,
        refresh_token = config.api.refresh_token.is_some(),
        "configuration loaded"
    );

    let conn = ApiConnection::new(config.api.options())
        .context("failed to build API connection")?;

    conn.authorize()
        .await
        .with_context(|| format!("failed to authenticate as {}", config.api.username))?;

    println!("Successfully authenticated:");
    println!("{}", conn.session().report().await);

    if check_status {
        let body = conn
            .get("/status")
            .await
            .context("GET /status failed")?
            .text()
            .await
            .context("failed to read /status response")?;
        println!("Status:");
        println!("{body}");
    }

    Ok(())
}
