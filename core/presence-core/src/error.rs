//! Error types for the two external seams: the host application and the
//! presence service.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// Host application
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Failed to start host bridge: {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Host bridge I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Host bridge JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Host bridge closed its output")]
    BridgeClosed,

    #[error("Host bridge did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Host bridge protocol violation: {0}")]
    Protocol(String),

    #[error("Host query {method} failed: {code}: {message}")]
    Query {
        method: String,
        code: String,
        message: String,
    },

    #[error("No project is open in the host application")]
    NoProject,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Presence service
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("No presence service socket found")]
    SocketNotFound,

    #[error("Presence I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Presence JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Presence protocol violation: {0}")]
    Protocol(String),

    #[error("Presence handshake rejected: {code}: {message}")]
    HandshakeRejected { code: String, message: String },

    #[error("Presence command rejected: {code}: {message}")]
    CommandRejected { code: String, message: String },

    #[error("Presence service closed the connection: {code}: {message}")]
    ConnectionClosed { code: String, message: String },

    #[error("Presence client is not connected")]
    NotConnected,
}

pub type HostResult<T> = std::result::Result<T, HostError>;
pub type PresenceResult<T> = std::result::Result<T, PresenceError>;
