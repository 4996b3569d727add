//! Client error types

use nuxeo_core::CoreError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Longest body excerpt kept in [`ClientError::Http`]
pub(crate) const BODY_SNIPPET_LEN: usize = 512;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Invalid SDK construction or ill-formed options
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credentials could not be produced or an OAuth2 grant failed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Connection, TLS or read/write failure below HTTP semantics
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// 4xx/5xx response without the Server exception envelope
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// 4xx/5xx response carrying the Server exception envelope
    #[error("Nuxeo Exception: {status} - {message}")]
    Server {
        status: u16,
        message: String,
        stacktrace: String,
    },

    /// Response did not match the expected entity or shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Caller violated a contract
    #[error("Usage error: {0}")]
    Usage(String),

    /// Cancellation or elapsed deadline
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Build an error from a failed response body: the Server envelope when
    /// it parses, a generic HTTP error otherwise.
    pub fn from_response_body(status: u16, body: &[u8]) -> Self {
        match nuxeo_core::ServerException::from_slice(body) {
            Some(exc) => Self::Server {
                status: exc.status,
                message: exc.message,
                stacktrace: exc.stacktrace,
            },
            None => Self::Http {
                status,
                body: snippet(body),
            },
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if this is an authentication error
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Auth(_)) || matches!(self.status(), Some(401))
    }

    /// Check if the Server failed
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(s) if s >= 500)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Map a transport failure, turning elapsed deadlines into cancellation.
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Cancelled(format!("deadline exceeded: {}", err))
        } else {
            Self::Transport(err)
        }
    }
}

impl From<CoreError> for ClientError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Decode(msg) => Self::Decode(msg),
            CoreError::Usage(msg) => Self::Usage(msg),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

fn snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(BODY_SNIPPET_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_envelope_display() {
        let body = br#"{"entity-type":"exception","status":404,"message":"Not Found","stacktrace":""}"#;
        let error = ClientError::from_response_body(404, body);

        match &error {
            ClientError::Server { status, message, .. } => {
                assert_eq!(*status, 404);
                assert_eq!(message, "Not Found");
            }
            _ => panic!("Expected Server error"),
        }
        assert_eq!(error.to_string(), "Nuxeo Exception: 404 - Not Found");
        assert!(error.is_not_found());
    }

    #[test]
    fn test_non_envelope_body_is_http_error() {
        let error = ClientError::from_response_body(502, b"<html>Bad Gateway</html>");
        match &error {
            ClientError::Http { status, body } => {
                assert_eq!(*status, 502);
                assert_eq!(body, "<html>Bad Gateway</html>");
            }
            _ => panic!("Expected Http error"),
        }
        assert!(error.is_server_error());
    }

    #[test]
    fn test_snippet_is_truncated() {
        let body = "x".repeat(BODY_SNIPPET_LEN * 2);
        let error = ClientError::from_response_body(500, body.as_bytes());
        let ClientError::Http { body, .. } = error else {
            panic!("Expected Http error");
        };
        assert_eq!(body.len(), BODY_SNIPPET_LEN + 3);
    }

    #[test]
    fn test_core_errors_keep_their_kind() {
        let decode: ClientError = CoreError::Decode("bad".into()).into();
        assert!(matches!(decode, ClientError::Decode(_)));
        let usage: ClientError = CoreError::Usage("twice".into()).into();
        assert!(matches!(usage, ClientError::Usage(_)));
    }
}
