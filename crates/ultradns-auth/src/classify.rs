//! HTTP response classification
//!
//! UltraDNS reports failures as JSON with field names in either camelCase
//! (`errorCode`, `errorMessage`, `errorDescription`) or snake_case
//! (`error_code`, `error_message`, `error_description`), sometimes both in
//! one payload. Every logical field is decoded under both spellings and the
//! camelCase value wins when it is non-empty (non-zero for the code).
//!
//! Responses below 400 are never inspected, so their bodies stay unread for
//! the caller.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, BoxError, Error, Result};

/// Raw error payload carrying both spellings of each field.
///
/// `Option` tolerates explicit `null`s; a wrongly-typed value (e.g. a string
/// `errorCode`) fails the decode and the body is reported as malformed.
#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    #[serde(rename = "errorCode")]
    code_camel: Option<i64>,
    #[serde(rename = "error_code")]
    code_snake: Option<i64>,
    #[serde(rename = "errorMessage")]
    message_camel: Option<String>,
    #[serde(rename = "error_message")]
    message_snake: Option<String>,
    #[serde(rename = "error")]
    error_type: Option<String>,
    #[serde(rename = "errorDescription")]
    description_camel: Option<String>,
    #[serde(rename = "error_description")]
    description_snake: Option<String>,
}

impl ErrorPayload {
    fn normalize(self, status: u16) -> ApiError {
        let code = match self.code_camel {
            Some(code) if code > 0 => code,
            _ => self.code_snake.unwrap_or_default(),
        };
        ApiError {
            status,
            code,
            message: prefer(self.message_camel, self.message_snake),
            error_type: self.error_type.unwrap_or_default(),
            description: prefer(self.description_camel, self.description_snake),
        }
    }
}

/// camelCase value if non-empty, else the snake_case value.
pub(crate) fn prefer(camel: Option<String>, snake: Option<String>) -> String {
    match camel {
        Some(value) if !value.is_empty() => value,
        _ => snake.unwrap_or_default(),
    }
}

/// Whether a status code indicates failure.
pub fn is_failure(status: StatusCode) -> bool {
    status.as_u16() >= 400
}

/// Classify a response from its status and a deferred body read.
///
/// Returns `None` for statuses below 400 without calling `read_body`.
/// Otherwise the body is read once and turned into:
/// - `Error::UnreadableBody` if reading failed,
/// - `Error::MalformedErrorBody` if it is not a JSON object of the expected shape,
/// - `Error::Api` with the normalized fields.
pub fn classify<F, B>(status: StatusCode, read_body: F) -> Option<Error>
where
    F: FnOnce() -> std::result::Result<B, BoxError>,
    B: AsRef<[u8]>,
{
    if !is_failure(status) {
        return None;
    }

    Some(failure_from_body(status.as_u16(), read_body()))
}

fn failure_from_body<B: AsRef<[u8]>>(status: u16, body: std::result::Result<B, BoxError>) -> Error {
    match body {
        Ok(body) => decode_error(status, body.as_ref()),
        Err(e) => {
            debug!(status, error = %e, "failed to read error response body");
            Error::UnreadableBody { status }
        }
    }
}

/// Decode a failure body into the normalized error.
///
/// Anything other than a JSON object with the expected field types yields
/// `MalformedErrorBody` with the raw text for diagnosis.
pub fn decode_error(status: u16, body: &[u8]) -> Error {
    let malformed = || Error::MalformedErrorBody {
        status,
        body: String::from_utf8_lossy(body).into_owned(),
    };

    let value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => return malformed(),
    };
    if !value.is_object() {
        return malformed();
    }

    match serde_json::from_value::<ErrorPayload>(value) {
        Ok(payload) => {
            let api = payload.normalize(status);
            debug!(
                status,
                code = api.code,
                error_type = %api.error_type,
                "API returned error payload"
            );
            Error::Api(api)
        }
        Err(_) => malformed(),
    }
}

/// Check a `reqwest` response, handing it back untouched when it succeeded.
///
/// On failure statuses the body is consumed to build the error.
pub async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if !is_failure(status) {
        return Ok(response);
    }

    let body = response.bytes().await.map_err(|e| Box::new(e) as BoxError);
    Err(failure_from_body(status.as_u16(), body))
}
