use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by a presence client implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid client id '{0}'")]
    InvalidClientId(String),

    #[error("presence service not available: {0}")]
    Unavailable(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// Errors surfaced by the session manager.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("client id is required")]
    MissingClientId,

    #[error("failed to connect: {0}")]
    ConnectionFailed(String),

    #[error("failed to update presence: {0}")]
    UpdateFailed(String),

    #[error("not connected")]
    NotConnected,

    #[error("session has been shut down")]
    Closed,
}

/// Errors surfaced by the profile store.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile name is required")]
    MissingName,

    #[error("invalid profile name '{0}'")]
    InvalidName(String),

    #[error("profile '{0}' does not exist")]
    ProfileNotFound(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed profile {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize profile '{name}': {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
}
