use std::sync::Arc;

use futures_util::{pin_mut, Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use speedword_core::{
    bag::{Tile, TileBag},
    board::Board,
    judge::Judge,
    messages::{GameMessage, PlayerMessage, OUT_OF_TILES},
    scoring::{score_board, Score},
};

use crate::{
    assigner::{AssignerHandle, JoinRequest},
    errors::{SessionError, TransportError},
    game_state::{GameCommand, GameEvent, GameHandle, PlayerId, PlayerLink},
    transport::Frame,
};

/// Boards with this many tiles or more are scored on a blocking thread
const BLOCKING_SCORE_TILES: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, not yet placed in a game
    Fresh,
    /// Ready for the next round, the game's prompt will be acknowledged
    WaitingRoundReady,
    /// Acknowledged, waiting for the round to start
    Init,
    Running,
    /// Won, waiting for the game to collect the cached score
    WaitingScores,
    Over,
}

enum Flow {
    Continue,
    Exit,
}

/// One connected player.
///
/// The session owns the outgoing half of the transport. Incoming frames are
/// pumped in by a separate task so that game events and frames can be
/// handled one at a time from a single loop.
pub struct PlayerSession<W> {
    id: PlayerId,
    name: String,
    state: SessionState,
    outgoing: W,
    judge: Arc<Judge>,
    assigner: AssignerHandle,
    game: Option<GameHandle>,
    joining: Option<oneshot::Receiver<GameHandle>>,
    events_tx: mpsc::UnboundedSender<GameEvent>,
    events: mpsc::UnboundedReceiver<GameEvent>,
    bag: Option<Arc<TileBag>>,
    served: usize,
    last_score: Option<Score>,
}

impl<W> PlayerSession<W>
where
    W: Sink<Frame, Error = TransportError> + Unpin + Send,
{
    pub fn new(judge: Arc<Judge>, assigner: AssignerHandle, outgoing: W) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            state: SessionState::Fresh,
            outgoing,
            judge,
            assigner,
            game: None,
            joining: None,
            events_tx,
            events,
            bag: None,
            served: 0,
            last_score: None,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub async fn run<R>(mut self, incoming: R)
    where
        R: Stream<Item = Result<Frame, TransportError>> + Send + 'static,
    {
        let (mut frames, pump) = spawn_read_pump(incoming);
        tracing::info!(player = %self.id, "Session opened");

        loop {
            let step = tokio::select! {
                biased;
                assigned = assignment(&mut self.joining), if self.joining.is_some() => {
                    self.on_assignment(assigned).await
                }
                Some(event) = self.events.recv() => self.on_game_event(event).await,
                frame = frames.recv() => match frame {
                    Some(Ok(frame)) => self.on_frame(&frame).await,
                    Some(Err(err)) => Err(err.into()),
                    None => Ok(Flow::Exit),
                },
            };

            match step {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(err) => {
                    tracing::warn!(player = %self.id, "Closing session: {err}");
                    break;
                }
            }
        }

        if let Some(game) = self.game.take() {
            _ = game.send(GameCommand::Exit(self.id)).await;
        }
        pump.abort();
        _ = self.outgoing.close().await;
        tracing::info!(player = %self.id, "Session closed");
    }

    async fn on_frame(&mut self, frame: &[u8]) -> Result<Flow, SessionError> {
        let message = match PlayerMessage::from_frame(frame) {
            Ok(message) => message,
            Err(err) => {
                self.reject(err.to_string()).await?;
                return Ok(Flow::Continue);
            }
        };
        tracing::debug!(player = %self.id, "Received: {message}");

        match message {
            PlayerMessage::Exit => {
                self.send(GameMessage::Ok).await?;
                return Ok(Flow::Exit);
            }
            PlayerMessage::JoinGame(name) => self.join(name).await?,
            PlayerMessage::RoundReady | PlayerMessage::Start => self.ready().await?,
            PlayerMessage::AddTile => self.add_tile().await?,
            PlayerMessage::Verify(board) => self.verify(board).await?,
            PlayerMessage::SendBoard(board) => self.send_board(board).await?,
        }

        Ok(Flow::Continue)
    }

    async fn on_assignment(
        &mut self,
        assigned: Result<GameHandle, oneshot::error::RecvError>,
    ) -> Result<Flow, SessionError> {
        self.joining = None;
        match assigned {
            Ok(game) => {
                tracing::info!(player = %self.id, "{} is playing in {}", self.name, game.name);
                self.game = Some(game);
                self.state = SessionState::WaitingRoundReady;
            }
            Err(_) => self.reject("Could not find a game to join").await?,
        }
        Ok(Flow::Continue)
    }

    async fn on_game_event(&mut self, event: GameEvent) -> Result<Flow, SessionError> {
        use SessionState::*;

        match event {
            GameEvent::Joined(info) => self.send(GameMessage::PlayerJoined(info)).await?,
            GameEvent::Roster(info) => self.send(GameMessage::GameInfo(info)).await?,
            GameEvent::RoundReady => {
                if self.state == WaitingRoundReady {
                    self.tell_game(GameCommand::Start(self.id)).await?;
                    self.state = Init;
                } else {
                    self.send(GameMessage::RoundReady).await?;
                    self.state = WaitingRoundReady;
                }
            }
            GameEvent::Start {
                bag,
                starting_tiles,
            } => {
                self.served = starting_tiles.min(bag.len());
                let hand = bag.served(self.served).to_vec();
                self.bag = Some(bag);
                self.last_score = None;
                self.state = Running;
                self.send(GameMessage::Start(hand)).await?;
            }
            GameEvent::GameOver => match self.state {
                WaitingScores => {
                    if let Some(score) = self.last_score.clone() {
                        self.tell_game(GameCommand::Score(self.id, score)).await?;
                    }
                    self.state = Over;
                }
                Running => {
                    self.send(GameMessage::SendBoard).await?;
                    self.state = Over;
                }
                _ => tracing::debug!(player = %self.id, "Not in the round, ignoring its end"),
            },
            GameEvent::Results(report) => self.send(GameMessage::Result(report)).await?,
            GameEvent::Error(reason) => self.send(GameMessage::Error(reason)).await?,
        }

        Ok(Flow::Continue)
    }

    async fn join(&mut self, name: String) -> Result<(), SessionError> {
        if self.game.is_some() || self.joining.is_some() {
            return self.reject("Already in a game").await;
        }
        let name = name.trim();
        if name.is_empty() {
            return self.reject("A name is needed to join").await;
        }

        self.name = name.to_string();
        let (reply, joining) = oneshot::channel();
        self.assigner
            .join(JoinRequest {
                player: PlayerLink {
                    id: self.id,
                    name: self.name.clone(),
                    events: self.events_tx.clone(),
                },
                reply,
            })
            .await?;
        self.joining = Some(joining);
        Ok(())
    }

    /// Either asks the game for a round or answers the game's prompt
    async fn ready(&mut self) -> Result<(), SessionError> {
        use SessionState::*;

        if self.game.is_none() {
            return self.reject("Join a game first").await;
        }
        match self.state {
            Running | WaitingScores => self.reject("A round is already in progress").await,
            Init => self.reject("Already waiting for the round to start").await,
            Fresh | WaitingRoundReady | Over => {
                self.tell_game(GameCommand::Start(self.id)).await?;
                self.state = WaitingRoundReady;
                Ok(())
            }
        }
    }

    async fn add_tile(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Running {
            return self.reject("No round is running").await;
        }
        let next = self
            .bag
            .as_ref()
            .and_then(|bag| bag.get(self.served).copied());

        match next {
            Some(tile) => {
                self.served += 1;
                self.send(GameMessage::AddTile(tile)).await
            }
            None => {
                self.send(GameMessage::OutOfTiles(OUT_OF_TILES.into()))
                    .await
            }
        }
    }

    async fn verify(&mut self, board: Board) -> Result<(), SessionError> {
        if self.state != SessionState::Running {
            return self.reject("No round is running").await;
        }

        let score = self.score(board).await?;
        if score.win {
            tracing::info!(player = %self.id, "{} has a winning board", self.name);
            self.send(GameMessage::Score(score.clone())).await?;
            self.last_score = Some(score);
            self.state = SessionState::WaitingScores;
            self.tell_game(GameCommand::GameOver(self.id)).await
        } else if score.is_cheat() {
            tracing::warn!(player = %self.id, "{} sent tiles they weren't served", self.name);
            self.send(GameMessage::Score(score)).await
        } else {
            self.send(GameMessage::Invalid(score.flagged())).await
        }
    }

    async fn send_board(&mut self, board: Board) -> Result<(), SessionError> {
        if self.state != SessionState::Over || self.last_score.is_some() {
            return self.reject("No board was asked for").await;
        }

        let score = self.score(board).await?;
        self.send(GameMessage::Score(score.clone())).await?;
        self.last_score = Some(score.clone());
        self.tell_game(GameCommand::Score(self.id, score)).await
    }

    async fn score(&mut self, board: Board) -> Result<Score, SessionError> {
        let served: Vec<Tile> = match &self.bag {
            Some(bag) => bag.served(self.served).to_vec(),
            None => vec![],
        };
        judge_board(board, served, Arc::clone(&self.judge)).await
    }

    async fn tell_game(&mut self, command: GameCommand) -> Result<(), SessionError> {
        match &self.game {
            Some(game) => game.send(command).await,
            None => Ok(()),
        }
    }

    async fn reject(&mut self, reason: impl Into<String>) -> Result<(), SessionError> {
        let reason = reason.into();
        tracing::warn!(player = %self.id, "Rejected a message: {reason}");
        self.send(GameMessage::Error(reason)).await
    }

    async fn send(&mut self, message: GameMessage) -> Result<(), SessionError> {
        tracing::debug!(player = %self.id, "Sending: {message}");
        let frame = message.to_frame()?;
        self.outgoing.send(frame).await?;
        Ok(())
    }
}

/// Pruning can blow up on dense boards, so big ones stay off the async workers
async fn judge_board(
    board: Board,
    served: Vec<Tile>,
    judge: Arc<Judge>,
) -> Result<Score, SessionError> {
    if board.tile_set().len() < BLOCKING_SCORE_TILES {
        return Ok(score_board(&board, &served, &judge));
    }
    let score =
        tokio::task::spawn_blocking(move || score_board(&board, &served, &judge)).await?;
    Ok(score)
}

async fn assignment(
    joining: &mut Option<oneshot::Receiver<GameHandle>>,
) -> Result<GameHandle, oneshot::error::RecvError> {
    match joining {
        Some(reply) => reply.await,
        None => std::future::pending().await,
    }
}

/// Moves transport reads onto their own task, one frame in flight at a time
fn spawn_read_pump<R>(
    incoming: R,
) -> (
    mpsc::Receiver<Result<Frame, TransportError>>,
    JoinHandle<()>,
)
where
    R: Stream<Item = Result<Frame, TransportError>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    let pump = tokio::spawn(async move {
        pin_mut!(incoming);
        while let Some(frame) = incoming.next().await {
            let failed = frame.is_err();
            if tx.send(frame).await.is_err() || failed {
                break;
            }
        }
    });
    (rx, pump)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn served(board: &Board) -> Vec<Tile> {
        board.tile_set().iter().map(|(_, tile)| *tile).collect()
    }

    #[tokio::test]
    async fn small_boards_score_inline() {
        let judge = Arc::new(Judge::new(["CAT"]));
        let board = Board::from_string("C A T");
        let score = judge_board(board.clone(), served(&board), judge)
            .await
            .unwrap();
        assert!(score.win);
    }

    #[tokio::test]
    async fn big_boards_score_the_same_off_thread() {
        let judge = Arc::new(Judge::new(["CAT", "AT"]));
        let board = Board::from_string(
            "C A T _ A T\n\
             _ _ _ _ _ _\n\
             C A T _ A T\n\
             _ _ _ _ _ _\n\
             C A T _ A T\n\
             _ _ _ _ _ _\n\
             C A T _ A T",
        );
        let tiles = served(&board);
        assert!(tiles.len() >= BLOCKING_SCORE_TILES);

        let expected = score_board(&board, &tiles, &judge);
        let score = judge_board(board, tiles, judge).await.unwrap();
        assert_eq!(score, expected);
        assert_eq!(score.pts, 23);
        assert_eq!(score.unconnected.len(), 17);
    }
}
