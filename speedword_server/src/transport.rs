//! Framed byte channels between a client and its session.
//!
//! A session only ever sees a `Sink` of outgoing frames and a `Stream` of
//! incoming ones, so the same actor runs over a websocket or, in tests, over a
//! pair of in-memory channels.

use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tungstenite::protocol::Message;

use speedword_core::messages::{GameMessage, PlayerMessage};

use crate::errors::TransportError;

pub type Frame = Vec<u8>;

/// Splits a websocket into frame halves. Binary and text messages both carry
/// frames, pings are left to tungstenite and a close ends the stream.
pub fn websocket<S>(
    ws_stream: WebSocketStream<S>,
) -> (
    impl Sink<Frame, Error = TransportError> + Unpin + Send,
    impl Stream<Item = Result<Frame, TransportError>> + Unpin + Send,
)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (outgoing, incoming) = ws_stream.split();

    let outgoing = outgoing.with(|frame: Frame| {
        future::ready(Ok::<_, TransportError>(Message::Binary(frame)))
    });

    let incoming = incoming
        .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
        .filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Binary(frame)) => Some(Ok(frame)),
                Ok(Message::Text(text)) => Some(Ok(text.into_bytes())),
                Ok(_) => None,
                Err(err) => Some(Err(TransportError::from(err))),
            })
        });

    (outgoing, incoming)
}

/// The client end of an in-memory transport
pub struct MemoryClient {
    to_server: UnboundedSender<Frame>,
    from_server: UnboundedReceiver<Frame>,
}

impl MemoryClient {
    pub fn send(&self, message: &PlayerMessage) -> Result<(), TransportError> {
        self.send_frame(message.to_frame()?)
    }

    pub fn send_frame(&self, frame: Frame) -> Result<(), TransportError> {
        self.to_server
            .unbounded_send(frame)
            .map_err(|_| TransportError::Closed)
    }

    pub async fn recv(&mut self) -> Result<GameMessage, TransportError> {
        let frame = self
            .from_server
            .next()
            .await
            .ok_or(TransportError::Closed)?;
        Ok(GameMessage::from_frame(&frame)?)
    }
}

/// A connected pair: the client end, plus the sink and stream a session runs on
pub fn memory() -> (
    MemoryClient,
    impl Sink<Frame, Error = TransportError> + Unpin + Send,
    impl Stream<Item = Result<Frame, TransportError>> + Unpin + Send,
) {
    let (to_server, server_incoming) = mpsc::unbounded();
    let (server_outgoing, from_server) = mpsc::unbounded();

    let client = MemoryClient {
        to_server,
        from_server,
    };
    let outgoing = server_outgoing.sink_map_err(|_| TransportError::Closed);
    let incoming = server_incoming.map(Ok::<Frame, TransportError>);

    (client, outgoing, incoming)
}
