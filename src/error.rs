//! Error types for the application

use thiserror::Error;

/// Errors from the token refresh exchange
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token endpoint unreachable: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Token endpoint rejected the refresh (status {0})")]
    RemoteRejected(u16),
}

/// Errors from the remote player API
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Bearer token was rejected (401). Recoverable once per poll cycle
    /// via token refresh.
    #[error("Access token rejected by the player API")]
    Unauthorized,

    /// Nothing is playing on any device (204). Not a user-visible error.
    #[error("No active playback session")]
    NoActiveSession,

    #[error("Transport error talking to the player API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected status from the player API: {0}")]
    Unexpected(u16),

    /// A 200 whose body could not be parsed into a usable snapshot.
    /// Fails the cycle rather than degrading fields to placeholders.
    #[error("Malformed response body from the player API")]
    MalformedResponse,
}

/// Errors from the credential store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to persist access token: {0}")]
    WriteFailed(#[from] std::io::Error),
}
