//! UltraDNS authorization library
//!
//! Obtains and keeps fresh the bearer token that every UltraDNS REST call
//! needs, and turns failed HTTP responses into structured errors. The crate
//! has no opinion on which API endpoints are called; `ultradns-client` builds
//! the request surface on top of it.
//!
//! Token flow:
//! 1. Caller builds a `Session` from username + password (optionally seeded
//!    with a saved refresh token via `Session::with_refresh_token`)
//! 2. Before each request, `Session::ensure_authorized()` checks the token
//! 3. Missing token → password grant at `/authorization/token`
//! 4. Expired token → refresh grant; the server rotates the refresh token
//! 5. Any non-2xx reply → `classify()` decodes the camelCase/snake_case
//!    error payload into `ApiError`

pub mod classify;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod session;
pub mod token;
pub mod transport;

pub use classify::{check_response, classify, decode_error, is_failure};
pub use constants::*;
pub use error::{ApiError, BoxError, Error, Result, UNRECOGNIZED_ERROR_PAYLOAD};
pub use session::{AuthStatus, Session, SessionReport, Tokens};
pub use token::{GrantType, TokenResponse};
pub use transport::{BoxFuture, FormResponse, HttpTransport, Transport};
