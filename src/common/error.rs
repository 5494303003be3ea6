//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
///
/// All of these are fatal and raised before any connection attempt.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },

    #[error("Channel mapping references {network} channel '{channel}', which is not in the {network} channel list")]
    DanglingChannel {
        network: &'static str,
        channel: String,
    },

    #[error("{network} channel '{channel}' appears in more than one channel mapping")]
    DuplicateMapping {
        network: &'static str,
        channel: String,
    },

    #[error("Invalid highlight pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Connection-related errors, fatal at startup.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS handshake with {host} failed: {source}")]
    Tls {
        host: String,
        #[source]
        source: native_tls::Error,
    },

    #[error("Slack API call {method} failed: {source}")]
    SlackApi {
        method: &'static str,
        #[source]
        source: SlackApiError,
    },

    #[error("No Slack user named '{owner}' was found")]
    OwnerNotFound { owner: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Errors from an outbound send. Never fatal: the caller logs and drops them.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Channel '{channel}' is not known")]
    UnknownChannel { channel: String },

    #[error("Outbound {network} queue is closed")]
    QueueClosed { network: &'static str },

    #[error("Slack API call {method} failed: {source}")]
    Slack {
        method: &'static str,
        #[source]
        source: SlackApiError,
    },
}

/// Failure of one Slack Web API call.
#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Slack returned error '{0}'")]
    Api(String),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// IRC wire protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Empty IRC line")]
    EmptyLine,

    #[error("IRC line has no command: {line}")]
    MissingCommand { line: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Result type alias for outbound sends.
pub type SendResult<T> = Result<T, SendError>;
