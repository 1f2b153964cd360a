//! Bearer-token session for one UltraDNS account
//!
//! A `Session` owns the account's credential: the immutable username and
//! password plus the `{access_token, refresh_token, expires_at}` triple. The
//! triple sits behind a single `RwLock` and is only ever replaced as a
//! whole, so readers never see a torn update.
//!
//! `ensure_authorized` is the only mutator. Its fast path is a read-locked
//! validity check with no I/O. When the token is missing or expired, callers
//! queue on an exchange gate; the first performs the exchange and the rest
//! re-check and return without touching the network. This keeps concurrent
//! callers from presenting the same single-use refresh token twice.
//!
//! Status transitions:
//! - Unauthenticated → Valid (password grant, or refresh grant when seeded)
//! - Valid → Expired (clock passes `expires_at`)
//! - Expired → Valid (refresh grant when a refresh token is held)
//!
//! A refresh token the server rejects is replaced by one password grant in
//! the same gated section, when a password is configured.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use common::{MASK, Secret};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::constants::{DEFAULT_BASE_URL, TOKEN_PATH};
use crate::error::{BoxError, Error, Result};
use crate::metrics::record_exchange;
use crate::token::{Grant, GrantType, TokenResponse};
use crate::transport::{FormResponse, Transport};

/// Authentication status derived from the token triple and the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// No access token has been obtained yet.
    Unauthenticated,
    /// Access token present and not yet expired.
    Valid,
    /// Access token present but past its (margin-adjusted) expiry.
    Expired,
}

/// Consistent copy of the token triple.
///
/// `expires_at` is a unix timestamp in seconds, already reduced by the
/// timeout margin used at exchange time. It is meaningless while
/// `access_token` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

impl Tokens {
    /// Status of these tokens at `now` (unix seconds).
    pub fn status_at(&self, now: i64) -> AuthStatus {
        if self.access_token.is_empty() {
            AuthStatus::Unauthenticated
        } else if now < self.expires_at {
            AuthStatus::Valid
        } else {
            AuthStatus::Expired
        }
    }

    pub fn is_valid_at(&self, now: i64) -> bool {
        self.status_at(now) == AuthStatus::Valid
    }
}

/// Credential and token lifecycle for one account.
pub struct Session {
    username: String,
    password: Secret<String>,
    base_url: String,
    tokens: RwLock<Tokens>,
    exchange_gate: Mutex<()>,
}

impl Session {
    /// Create an unauthenticated session against `base_url`.
    pub fn new(
        username: impl Into<String>,
        password: Secret<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password,
            base_url: base_url.into(),
            tokens: RwLock::new(Tokens::default()),
            exchange_gate: Mutex::new(()),
        }
    }

    /// Create a session against the production API.
    pub fn with_default_url(username: impl Into<String>, password: Secret<String>) -> Self {
        Self::new(username, password, DEFAULT_BASE_URL)
    }

    /// Seed a refresh token obtained earlier. The first exchange will use the
    /// refresh grant instead of the password.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.tokens.get_mut().refresh_token = refresh_token.into();
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of the token endpoint.
    pub fn token_url(&self) -> String {
        format!("{}{TOKEN_PATH}", self.base_url.trim_end_matches('/'))
    }

    /// Copy of the current token triple, taken under one read lock.
    pub async fn tokens(&self) -> Tokens {
        self.tokens.read().await.clone()
    }

    /// Current access token (empty when unauthenticated).
    pub async fn access_token(&self) -> String {
        self.tokens.read().await.access_token.clone()
    }

    /// `Authorization` header value for the current access token.
    pub async fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token().await)
    }

    pub async fn status(&self) -> AuthStatus {
        self.tokens.read().await.status_at(unix_now())
    }

    /// Redacted, printable view of the session.
    pub async fn report(&self) -> SessionReport {
        SessionReport {
            username: self.username.clone(),
            tokens: self.tokens().await,
        }
    }

    /// Make sure the session holds an access token that stays valid for at
    /// least `margin` (normally the request timeout).
    ///
    /// Returns immediately, without I/O, when the current token is valid.
    /// Otherwise exchanges credentials at the token endpoint through
    /// `transport`. If the server rejects the refresh token, the password
    /// grant is tried once. On any failure the token triple is left as it was.
    pub async fn ensure_authorized(&self, transport: &dyn Transport, margin: Duration) -> Result<()> {
        if self.tokens.read().await.is_valid_at(unix_now()) {
            return Ok(());
        }

        let _gate = self.exchange_gate.lock().await;

        // A concurrent caller may have completed an exchange while we waited.
        let current = self.tokens().await;
        if current.is_valid_at(unix_now()) {
            debug!(username = %self.username, "token refreshed by concurrent caller");
            return Ok(());
        }

        let grant = Grant::select(&self.username, self.password.expose(), &current.refresh_token);
        debug!(
            username = %self.username,
            grant = grant.kind().as_str(),
            status = ?current.status_at(unix_now()),
            "access token missing or expired, exchanging"
        );

        let tokens = match self.attempt(transport, grant, margin).await {
            // A rejected refresh token is never retried; the password replaces it.
            Err(Error::Api(_))
                if grant.kind() == GrantType::RefreshToken && !self.password.is_empty() =>
            {
                info!(
                    username = %self.username,
                    "refresh token rejected, falling back to password grant"
                );
                let fallback = Grant::select(&self.username, self.password.expose(), "");
                self.attempt(transport, fallback, margin).await?
            }
            other => other?,
        };

        *self.tokens.write().await = tokens;
        Ok(())
    }

    /// One exchange with its metric and failure log.
    async fn attempt(
        &self,
        transport: &dyn Transport,
        grant: Grant<'_>,
        margin: Duration,
    ) -> Result<Tokens> {
        match self.exchange(transport, grant, margin).await {
            Ok(tokens) => {
                record_exchange(grant.kind(), "success");
                Ok(tokens)
            }
            Err(e) => {
                record_exchange(grant.kind(), e.kind());
                warn!(
                    username = %self.username,
                    grant = grant.kind().as_str(),
                    error = %e,
                    "token exchange failed"
                );
                Err(e)
            }
        }
    }

    /// Run one token exchange and compute the new triple. Does not store it.
    async fn exchange(
        &self,
        transport: &dyn Transport,
        grant: Grant<'_>,
        margin: Duration,
    ) -> Result<Tokens> {
        let url = self.token_url();
        let form = grant.form();
        let FormResponse { status, body } = transport.post_form(&url, &form).await?;

        let classified = classify(status, || match &body {
            Ok(bytes) => Ok(&bytes[..]),
            Err(e) => Err(BoxError::from(e.to_string())),
        });
        if let Some(err) = classified {
            return Err(err);
        }

        // A body that fails to stream on a 2xx is a network failure.
        let bytes = body.map_err(Error::Transport)?;
        let token = TokenResponse::parse(&bytes)?;

        let now = unix_now();
        let expires_at = expiry(now, token.expires_in, margin);
        if expires_at <= now {
            warn!(
                expires_in = token.expires_in,
                margin_secs = margin.as_secs(),
                "token lifetime does not exceed timeout margin; every call will re-authorize"
            );
        }
        info!(
            username = %self.username,
            grant = grant.kind().as_str(),
            expires_in = token.expires_in,
            "obtained access token"
        );

        Ok(Tokens {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
        })
    }

    #[cfg(test)]
    async fn force_expiry(&self) {
        self.tokens.write().await.expires_at = 0;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("password", &self.password)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Printable snapshot of a session; the password is always masked.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub username: String,
    pub tokens: Tokens,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Authorization {{")?;
        writeln!(f, "  Username: '{}',", self.username)?;
        writeln!(f, "  Password: '{MASK}',")?;
        writeln!(f, "  AccessToken: '{}',", self.tokens.access_token)?;
        writeln!(f, "  RefreshToken: '{}',", self.tokens.refresh_token)?;
        writeln!(f, "  TokenExpires: {}", self.tokens.expires_at)?;
        write!(f, "}}")
    }
}

/// `now + lifetime - ceil(margin)`, saturating.
fn expiry(now: i64, expires_in: u64, margin: Duration) -> i64 {
    let lifetime = i64::try_from(expires_in).unwrap_or(i64::MAX);
    let margin_secs = margin.as_secs() + u64::from(margin.subsec_nanos() > 0);
    let margin_secs = i64::try_from(margin_secs).unwrap_or(i64::MAX);
    now.saturating_add(lifetime).saturating_sub(margin_secs)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
