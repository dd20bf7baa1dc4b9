use speedword_core::error::CodecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    WebSocket(#[from] tungstenite::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("connection closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("could not encode a message: {0}")]
    Codec(#[from] CodecError),
    #[error("game {0} is no longer running")]
    GameClosed(String),
    #[error("the assigner has shut down")]
    AssignerClosed,
    #[error("scoring a board failed: {0}")]
    Scoring(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{var} should be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}
