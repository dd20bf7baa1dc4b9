use thiserror::Error;

use crate::messages::MessageType;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Received an empty frame")]
    EmptyFrame,
    #[error("Unknown message type {0}")]
    UnknownType(u8),
    #[error("{0} is not a message players can send")]
    NotAPlayerMessage(MessageType),
    #[error("{0} is not a message the server sends")]
    NotAGameMessage(MessageType),
    #[error("Malformed {message_type} payload: {source}")]
    Payload {
        message_type: MessageType,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("Could not open word list {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not read word list: {0}")]
    Read(#[from] std::io::Error),
    #[error("The word list contains no words")]
    Empty,
}
