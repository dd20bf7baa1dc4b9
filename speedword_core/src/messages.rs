use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumIter, FromRepr};

use crate::{
    bag::Tile,
    board::{Board, Coordinate},
    error::CodecError,
    reporting::RoundReport,
    scoring::Score,
};

/// Text sent alongside `OutOfTiles`
pub const OUT_OF_TILES: &str = "Out of tiles!";

/// The leading byte of every frame
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, FromRepr)]
#[repr(u8)]
pub enum MessageType {
    Exit = 0,
    Error = 1,
    JoinGame = 2,
    GameInfo = 3,
    RoundReady = 4,
    Start = 5,
    AddTile = 6,
    SendBoard = 7,
    Verify = 8,
    Score = 9,
    Invalid = 10,
    OutOfTiles = 11,
    PlayerJoined = 12,
    Result = 13,
    #[strum(serialize = "OK")]
    Ok = 14,
}

/// Builds a frame: one type byte, then the JSON payload
pub fn encode<T: Serialize>(message_type: MessageType, payload: &T) -> Result<Vec<u8>, CodecError> {
    let mut frame = vec![message_type as u8];
    serde_json::to_writer(&mut frame, payload).map_err(|source| CodecError::Payload {
        message_type,
        source,
    })?;
    Ok(frame)
}

/// A frame with no payload
pub fn encode_empty(message_type: MessageType) -> Vec<u8> {
    vec![message_type as u8]
}

/// Splits a frame into its type and raw payload
pub fn decode(frame: &[u8]) -> Result<(MessageType, &[u8]), CodecError> {
    let (&tag, payload) = frame.split_first().ok_or(CodecError::EmptyFrame)?;
    let message_type = MessageType::from_repr(tag).ok_or(CodecError::UnknownType(tag))?;
    Ok((message_type, payload))
}

pub fn decode_payload<T: DeserializeOwned>(
    message_type: MessageType,
    payload: &[u8],
) -> Result<T, CodecError> {
    serde_json::from_slice(payload).map_err(|source| CodecError::Payload {
        message_type,
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub game_name: String,
    pub player_names: Vec<String>,
}

impl fmt::Display for GameInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "game {} with players {}",
            self.game_name,
            self.player_names.join(", ")
        )
    }
}

/// Everything a client can send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerMessage {
    Exit,
    JoinGame(String),
    RoundReady,
    Start,
    AddTile,
    SendBoard(Board),
    Verify(Board),
}

impl PlayerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            PlayerMessage::Exit => MessageType::Exit,
            PlayerMessage::JoinGame(_) => MessageType::JoinGame,
            PlayerMessage::RoundReady => MessageType::RoundReady,
            PlayerMessage::Start => MessageType::Start,
            PlayerMessage::AddTile => MessageType::AddTile,
            PlayerMessage::SendBoard(_) => MessageType::SendBoard,
            PlayerMessage::Verify(_) => MessageType::Verify,
        }
    }

    pub fn from_frame(frame: &[u8]) -> Result<Self, CodecError> {
        let (message_type, payload) = decode(frame)?;

        Ok(match message_type {
            MessageType::Exit => PlayerMessage::Exit,
            MessageType::JoinGame => PlayerMessage::JoinGame(decode_payload(message_type, payload)?),
            MessageType::RoundReady => PlayerMessage::RoundReady,
            MessageType::Start => PlayerMessage::Start,
            MessageType::AddTile => PlayerMessage::AddTile,
            MessageType::SendBoard => {
                PlayerMessage::SendBoard(decode_payload(message_type, payload)?)
            }
            MessageType::Verify => PlayerMessage::Verify(decode_payload(message_type, payload)?),
            other => return Err(CodecError::NotAPlayerMessage(other)),
        })
    }

    pub fn to_frame(&self) -> Result<Vec<u8>, CodecError> {
        let message_type = self.message_type();
        match self {
            PlayerMessage::JoinGame(name) => encode(message_type, name),
            PlayerMessage::SendBoard(board) | PlayerMessage::Verify(board) => {
                encode(message_type, board)
            }
            _ => Ok(encode_empty(message_type)),
        }
    }
}

impl fmt::Display for PlayerMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlayerMessage::Exit => write!(f, "Leave"),
            PlayerMessage::JoinGame(name) => write!(f, "Join a game as {name}"),
            PlayerMessage::RoundReady => write!(f, "Ready for a round"),
            PlayerMessage::Start => write!(f, "Start the round"),
            PlayerMessage::AddTile => write!(f, "Request a tile"),
            PlayerMessage::SendBoard(board) => write!(f, "Final board:\n{board}"),
            PlayerMessage::Verify(board) => write!(f, "Check board:\n{board}"),
        }
    }
}

/// Everything the server sends to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameMessage {
    Ok,
    Error(String),
    PlayerJoined(GameInfo),
    GameInfo(GameInfo),
    RoundReady,
    Start(Vec<Tile>),
    AddTile(Tile),
    OutOfTiles(String),
    SendBoard,
    Invalid(Vec<Coordinate>),
    Score(Score),
    Result(RoundReport),
}

impl GameMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            GameMessage::Ok => MessageType::Ok,
            GameMessage::Error(_) => MessageType::Error,
            GameMessage::PlayerJoined(_) => MessageType::PlayerJoined,
            GameMessage::GameInfo(_) => MessageType::GameInfo,
            GameMessage::RoundReady => MessageType::RoundReady,
            GameMessage::Start(_) => MessageType::Start,
            GameMessage::AddTile(_) => MessageType::AddTile,
            GameMessage::OutOfTiles(_) => MessageType::OutOfTiles,
            GameMessage::SendBoard => MessageType::SendBoard,
            GameMessage::Invalid(_) => MessageType::Invalid,
            GameMessage::Score(_) => MessageType::Score,
            GameMessage::Result(_) => MessageType::Result,
        }
    }

    pub fn to_frame(&self) -> Result<Vec<u8>, CodecError> {
        let message_type = self.message_type();
        match self {
            GameMessage::Ok | GameMessage::RoundReady | GameMessage::SendBoard => {
                Ok(encode_empty(message_type))
            }
            GameMessage::Error(text) | GameMessage::OutOfTiles(text) => encode(message_type, text),
            GameMessage::PlayerJoined(info) | GameMessage::GameInfo(info) => {
                encode(message_type, info)
            }
            GameMessage::Start(tiles) => encode(message_type, tiles),
            GameMessage::AddTile(tile) => encode(message_type, tile),
            GameMessage::Invalid(positions) => encode(message_type, positions),
            GameMessage::Score(score) => encode(message_type, score),
            GameMessage::Result(report) => encode(message_type, report),
        }
    }

    pub fn from_frame(frame: &[u8]) -> Result<Self, CodecError> {
        let (message_type, payload) = decode(frame)?;

        Ok(match message_type {
            MessageType::Ok => GameMessage::Ok,
            MessageType::Error => GameMessage::Error(decode_payload(message_type, payload)?),
            MessageType::PlayerJoined => GameMessage::PlayerJoined(decode_payload(message_type, payload)?),
            MessageType::GameInfo => GameMessage::GameInfo(decode_payload(message_type, payload)?),
            MessageType::RoundReady => GameMessage::RoundReady,
            MessageType::Start => GameMessage::Start(decode_payload(message_type, payload)?),
            MessageType::AddTile => GameMessage::AddTile(decode_payload(message_type, payload)?),
            MessageType::OutOfTiles => GameMessage::OutOfTiles(decode_payload(message_type, payload)?),
            MessageType::SendBoard => GameMessage::SendBoard,
            MessageType::Invalid => GameMessage::Invalid(decode_payload(message_type, payload)?),
            MessageType::Score => GameMessage::Score(decode_payload(message_type, payload)?),
            MessageType::Result => GameMessage::Result(decode_payload(message_type, payload)?),
            other => return Err(CodecError::NotAGameMessage(other)),
        })
    }
}

impl fmt::Display for GameMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GameMessage::Ok => write!(f, "OK"),
            GameMessage::Error(msg) => write!(f, "Error: {msg}"),
            GameMessage::PlayerJoined(info) => write!(f, "Joined {info}"),
            GameMessage::GameInfo(info) => write!(f, "Now in {info}"),
            GameMessage::RoundReady => write!(f, "Ready up for the next round"),
            GameMessage::Start(tiles) => write!(
                f,
                "Round started with {}",
                tiles.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(" ")
            ),
            GameMessage::AddTile(tile) => write!(f, "New tile {tile}"),
            GameMessage::OutOfTiles(msg) => write!(f, "{msg}"),
            GameMessage::SendBoard => write!(f, "Round over, send your board"),
            GameMessage::Invalid(positions) => write!(
                f,
                "Fix tiles at {}",
                positions
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            GameMessage::Score(score) => write!(f, "{score}"),
            GameMessage::Result(report) => write!(f, "{report}"),
        }
    }
}
