use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by the game server client.
///
/// `Transport`, `Status` and `InvalidUrl` are transport-level failures: the
/// request did not produce a usable body. `Game` is a well-formed body that reports an error.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server responded with status: {0}")]
    Status(StatusCode),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    Game(String),
}

impl ClientError {
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::Status(_) | ClientError::InvalidUrl(_)
        )
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
