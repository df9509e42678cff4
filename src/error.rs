//! Error types for the Claude Agent SDK

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the SDK
#[derive(Error, Debug)]
pub enum Error {
    /// The transport could not connect, or the underlying byte stream failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A control frame was malformed (missing `request_id` or `response`).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A public operation was called after `dispose()`.
    #[error("session has been disposed")]
    SessionDisposed,

    /// A public operation was called before the session was started.
    #[error("session has not been started")]
    NotStarted,

    /// A pending control request was drained because the reader stopped.
    #[error("connection closed")]
    ConnectionClosed,

    /// The caller cancelled an in-flight control request.
    #[error("operation cancelled")]
    Cancelled,

    /// The CLI returned an error-subtype control response.
    #[error("CLI error: {0}")]
    Cli(String),

    /// A host hook callback failed. Never surfaced to the CLI directly; the
    /// dispatcher converts this into a lenient `continue:true` response.
    #[error("hook error: {0}")]
    Hook(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid `ClientOptions` configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Invalid input to a constructor or public method
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Other errors
    #[error("error: {0}")]
    Other(String),
}

impl Error {
    /// Create a new transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Error::Transport(msg.into())
    }

    /// Create a new protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create a new CLI error
    pub fn cli(msg: impl Into<String>) -> Self {
        Error::Cli(msg.into())
    }

    /// Create a new hook error
    pub fn hook(msg: impl Into<String>) -> Self {
        Error::Hook(msg.into())
    }

    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a new other error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_transport() {
        let err = Error::transport("spawn failed");
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(err.to_string(), "transport error: spawn failed");
    }

    #[test]
    fn test_error_protocol() {
        let err = Error::protocol("missing request_id");
        assert!(matches!(err, Error::Protocol(_)));
        assert_eq!(err.to_string(), "protocol error: missing request_id");
    }

    #[test]
    fn test_error_session_disposed() {
        let err = Error::SessionDisposed;
        assert_eq!(err.to_string(), "session has been disposed");
    }

    #[test]
    fn test_error_cli() {
        let err = Error::cli("permission denied");
        assert!(matches!(err, Error::Cli(_)));
        assert_eq!(err.to_string(), "CLI error: permission denied");
    }

    #[test]
    fn test_error_config() {
        let err = Error::config("cli_path is empty");
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), "invalid configuration: cli_path is empty");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn _returns_result() -> Result<i32> {
            Ok(42)
        }

        fn _returns_error() -> Result<i32> {
            Err(Error::Cancelled)
        }
    }
}
