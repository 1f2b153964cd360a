//! Error types for session and error-classification operations

/// Boxed transport error, kept opaque so any HTTP stack can sit behind `Transport`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Rendered text for an error payload that carries neither a description
/// nor a message.
pub const UNRECOGNIZED_ERROR_PAYLOAD: &str = "unrecognized error payload";

/// Errors from token exchange and response classification.
///
/// The variants separate "the network failed" (`Transport`), "the server
/// rejected us" (`Api`), and "the server sent something we cannot read"
/// (`UnreadableBody`, `MalformedErrorBody`, `TokenDecode`, `InvalidExpiry`).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Transport(#[source] BoxError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("API call returned HTTP status code {status}; unable to read body of response")]
    UnreadableBody { status: u16 },

    #[error("API call returned HTTP status code {status}; JSON parsing failed for body '{body}'")]
    MalformedErrorBody { status: u16, body: String },

    #[error("invalid token response: {0}")]
    TokenDecode(String),

    #[error("invalid token lifetime {0:?}: expected whole seconds")]
    InvalidExpiry(String),
}

impl Error {
    /// The normalized API error, if the server returned one.
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Short label for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Transport(_) => "transport",
            Error::Api(_) => "rejected",
            Error::UnreadableBody { .. } | Error::MalformedErrorBody { .. } => "malformed_error",
            Error::TokenDecode(_) | Error::InvalidExpiry(_) => "invalid_token_response",
        }
    }
}

/// A failure reported by the UltraDNS API, with both field spellings
/// already resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.rendered())]
pub struct ApiError {
    /// HTTP status of the response that carried the payload.
    pub status: u16,
    /// Numeric error code, `0` when absent.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable tag such as `invalid_grant`.
    pub error_type: String,
    /// Usually `"<code>: <message>"` when the server supplies it.
    pub description: String,
}

impl ApiError {
    /// Text used for `Display`: the description, else `"<code>: <message>"`,
    /// else [`UNRECOGNIZED_ERROR_PAYLOAD`].
    pub fn rendered(&self) -> String {
        if !self.description.is_empty() {
            self.description.clone()
        } else if !self.message.is_empty() {
            format!("{}: {}", self.code, self.message)
        } else {
            UNRECOGNIZED_ERROR_PAYLOAD.to_string()
        }
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: i64, message: &str, description: &str) -> ApiError {
        ApiError {
            status: 400,
            code,
            message: message.into(),
            error_type: String::new(),
            description: description.into(),
        }
    }

    #[test]
    fn description_wins_when_present() {
        let err = api_error(
            60001,
            "invalid_grant:Invalid username & password combination.",
            "60001: invalid_grant:Invalid username & password combination.",
        );
        assert_eq!(
            err.to_string(),
            "60001: invalid_grant:Invalid username & password combination."
        );
    }

    #[test]
    fn falls_back_to_code_and_message() {
        let err = api_error(60004, "Authorization Header required", "");
        assert_eq!(err.to_string(), "60004: Authorization Header required");
    }

    #[test]
    fn empty_payload_renders_sentinel() {
        let err = ApiError {
            status: 400,
            error_type: "wrong URL".into(),
            ..Default::default()
        };
        assert_eq!(err.to_string(), UNRECOGNIZED_ERROR_PAYLOAD);
    }

    #[test]
    fn api_variant_is_transparent() {
        let err: Error = api_error(60004, "Authorization Header required", "").into();
        assert_eq!(err.to_string(), "60004: Authorization Header required");
        assert_eq!(err.api().map(|e| e.code), Some(60004));
        assert_eq!(err.kind(), "rejected");
    }

    #[test]
    fn generic_errors_carry_status() {
        let unreadable = Error::UnreadableBody { status: 502 };
        assert!(unreadable.to_string().contains("502"));
        assert!(unreadable.api().is_none());

        let malformed = Error::MalformedErrorBody {
            status: 500,
            body: "<html>oops</html>".into(),
        };
        let text = malformed.to_string();
        assert!(text.contains("500") && text.contains("<html>oops</html>"), "got: {text}");
    }

    #[test]
    fn transport_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let err = Error::Transport(Box::new(io));
        assert_eq!(err.kind(), "transport");
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("connection refused"));
    }
}
