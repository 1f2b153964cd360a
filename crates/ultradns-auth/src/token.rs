//! Token endpoint protocol
//!
//! Both grant types POST to `{base_url}/authorization/token`:
//! - `password`: `username` + `password`, used when no refresh token is held
//! - `refresh_token`: the current single-use refresh token
//!
//! The success body carries `accessToken`, `refreshToken` and `expiresIn`
//! (string-encoded seconds). Deployments also echo snake_case copies of the
//! same fields; camelCase wins when both are present.

use serde::Deserialize;

use crate::classify::prefer;
use crate::error::{Error, Result};

/// Which credential is presented to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    Password,
    RefreshToken,
}

impl GrantType {
    /// Value of the `grant_type` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::Password => "password",
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

/// A token request ready to be form-encoded.
#[derive(Clone, Copy)]
pub(crate) struct Grant<'a> {
    kind: GrantType,
    username: &'a str,
    password: &'a str,
    refresh_token: &'a str,
}

impl<'a> Grant<'a> {
    /// Refresh grant when a refresh token is held, password grant otherwise.
    pub(crate) fn select(username: &'a str, password: &'a str, refresh_token: &'a str) -> Self {
        let kind = if refresh_token.is_empty() {
            GrantType::Password
        } else {
            GrantType::RefreshToken
        };
        Self {
            kind,
            username,
            password,
            refresh_token,
        }
    }

    pub(crate) fn kind(&self) -> GrantType {
        self.kind
    }

    pub(crate) fn form(&self) -> Vec<(&'a str, &'a str)> {
        match self.kind {
            GrantType::Password => vec![
                ("grant_type", GrantType::Password.as_str()),
                ("username", self.username),
                ("password", self.password),
            ],
            GrantType::RefreshToken => vec![
                ("grant_type", GrantType::RefreshToken.as_str()),
                ("refresh_token", self.refresh_token),
            ],
        }
    }
}

/// Lifetime as sent by the server: normally a string, tolerated as a number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Lifetime {
    Text(String),
    Seconds(i64),
}

impl Lifetime {
    fn is_blank(&self) -> bool {
        matches!(self, Lifetime::Text(text) if text.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    #[serde(rename = "accessToken")]
    access_camel: Option<String>,
    #[serde(rename = "access_token")]
    access_snake: Option<String>,
    #[serde(rename = "refreshToken")]
    refresh_camel: Option<String>,
    #[serde(rename = "refresh_token")]
    refresh_snake: Option<String>,
    #[serde(rename = "expiresIn")]
    expires_camel: Option<Lifetime>,
    #[serde(rename = "expires_in")]
    expires_snake: Option<Lifetime>,
}

/// Successful token endpoint response.
///
/// `expires_in` is a delta in seconds from the response time; the session
/// turns it into an absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

impl TokenResponse {
    /// Parse a token endpoint body.
    ///
    /// Malformed JSON or a missing access token is `TokenDecode`; a lifetime
    /// that is not a non-negative integer is `InvalidExpiry`.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let payload: TokenPayload = serde_json::from_slice(body)
            .map_err(|e| Error::TokenDecode(format!("decoding token body: {e}")))?;

        let access_token = prefer(payload.access_camel, payload.access_snake);
        if access_token.is_empty() {
            return Err(Error::TokenDecode(
                "response carried no access token".into(),
            ));
        }

        let camel = payload.expires_camel.filter(|l| !l.is_blank());
        let expires_in = match camel.or(payload.expires_snake) {
            Some(Lifetime::Text(text)) => text
                .parse::<u64>()
                .map_err(|_| Error::InvalidExpiry(text))?,
            Some(Lifetime::Seconds(secs)) => {
                u64::try_from(secs).map_err(|_| Error::InvalidExpiry(secs.to_string()))?
            }
            None => return Err(Error::InvalidExpiry(String::new())),
        };

        Ok(Self {
            access_token,
            refresh_token: prefer(payload.refresh_camel, payload.refresh_snake),
            expires_in,
        })
    }
}
