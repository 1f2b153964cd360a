//! UltraDNS REST client
//!
//! Thin request surface over `ultradns-auth`: every call is authorized with
//! the account's bearer token and failed responses come back as classified
//! errors.
//!
//! ```no_run
//! # async fn run() -> ultradns_client::Result<()> {
//! use common::Secret;
//! use ultradns_client::{ApiConnection, ApiOptions};
//!
//! let conn = ApiConnection::new(ApiOptions::new("ops-bot", Secret::new("hunter2".into())))?;
//! let _status = conn.get("/status").await?.text().await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;

pub use connection::{ApiConnection, ApiOptions};
pub use error::{Error, Result};
pub use ultradns_auth::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
