use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use speedword_core::{
    bag::TileBag, messages::GameInfo, reporting::RoundReport, rules::GameRules, scoring::Score,
};

use crate::errors::SessionError;

pub type PlayerId = Uuid;

/// Player to game
#[derive(Debug, Clone)]
pub enum GameCommand {
    /// Either asks for a new round or acknowledges one
    Start(PlayerId),
    /// The player has a winning board
    GameOver(PlayerId),
    Score(PlayerId, Score),
    Exit(PlayerId),
}

impl GameCommand {
    pub fn player(&self) -> PlayerId {
        match self {
            GameCommand::Start(id)
            | GameCommand::GameOver(id)
            | GameCommand::Score(id, _)
            | GameCommand::Exit(id) => *id,
        }
    }
}

/// Game to player
#[derive(Debug, Clone)]
pub enum GameEvent {
    /// Roster sent to the player that just joined
    Joined(GameInfo),
    /// Roster sent to everyone else
    Roster(GameInfo),
    RoundReady,
    Start {
        bag: Arc<TileBag>,
        starting_tiles: usize,
    },
    GameOver,
    Results(RoundReport),
    Error(String),
}

/// What a player holds on to once it has been placed in a game
#[derive(Debug, Clone)]
pub struct GameHandle {
    pub name: String,
    commands: mpsc::Sender<GameCommand>,
}

impl GameHandle {
    pub async fn send(&self, command: GameCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::GameClosed(self.name.clone()))
    }
}

/// How a game reaches one of its players
#[derive(Debug, Clone)]
pub struct PlayerLink {
    pub id: PlayerId,
    pub name: String,
    pub events: mpsc::UnboundedSender<GameEvent>,
}

pub struct AddPlayer {
    pub player: PlayerLink,
    pub reply: oneshot::Sender<GameHandle>,
}

/// Sent to the assigner when the last player leaves. `joined` counts every
/// player the game has been handed, so the assigner can tell whether a join
/// is still on its way.
#[derive(Debug)]
pub struct GameEmpty {
    pub name: String,
    pub joined: u64,
}

struct Participant {
    link: PlayerLink,
    in_round: bool,
}

pub struct GameState {
    name: String,
    rules: GameRules,
    handle: GameHandle,
    commands: mpsc::Receiver<GameCommand>,
    joins: mpsc::Receiver<AddPlayer>,
    retire: mpsc::UnboundedSender<GameEmpty>,
    players: Vec<Participant>,
    bag: Option<Arc<TileBag>>,
    running: bool,
    joined: u64,
}

impl GameState {
    /// Starts the game's task. It runs until the returned join sender is dropped.
    pub fn spawn(
        name: String,
        rules: GameRules,
        retire: mpsc::UnboundedSender<GameEmpty>,
    ) -> (mpsc::Sender<AddPlayer>, JoinHandle<()>) {
        let (joins_tx, joins) = mpsc::channel(1);
        let (commands_tx, commands) = mpsc::channel(1);

        let game = GameState {
            handle: GameHandle {
                name: name.clone(),
                commands: commands_tx,
            },
            name,
            rules,
            commands,
            joins,
            retire,
            players: vec![],
            bag: None,
            running: false,
            joined: 0,
        };

        (joins_tx, tokio::spawn(game.run()))
    }

    async fn run(mut self) {
        tracing::info!(game = %self.name, "Game opened");

        loop {
            tokio::select! {
                join = self.joins.recv() => match join {
                    Some(join) => self.add_player(join),
                    None => break,
                },
                Some(command) = self.commands.recv() => self.handle(command).await,
            }
        }

        tracing::info!(game = %self.name, "Game closed");
    }

    async fn handle(&mut self, command: GameCommand) {
        match command {
            GameCommand::Start(id) if !self.running => self.start_round(id).await,
            GameCommand::Start(id) => {
                // In-round players can only get here with a late acknowledgement
                if !self.in_round(id) {
                    self.tell(
                        id,
                        GameEvent::Error("A round is in progress, wait for the next one".into()),
                    );
                }
            }
            GameCommand::GameOver(id) if self.running && self.in_round(id) => {
                self.end_round(id).await
            }
            GameCommand::GameOver(id) => {
                tracing::debug!(game = %self.name, "Ignoring a win claim from {id}")
            }
            GameCommand::Score(id, _) => {
                self.tell(id, GameEvent::Error("No scores are being collected".into()))
            }
            GameCommand::Exit(id) => self.remove_player(id),
        }
    }

    fn add_player(&mut self, AddPlayer { player, reply }: AddPlayer) {
        self.joined += 1;

        if reply.send(self.handle.clone()).is_err() {
            tracing::debug!(game = %self.name, "{} left before joining", player.name);
            if self.players.is_empty() {
                self.notify_empty();
            }
            return;
        }

        tracing::info!(game = %self.name, "{} joined", player.name);
        let id = player.id;
        self.players.push(Participant {
            link: player,
            in_round: false,
        });

        let info = self.info();
        for p in &self.players {
            let event = if p.link.id == id {
                GameEvent::Joined(info.clone())
            } else {
                GameEvent::Roster(info.clone())
            };
            _ = p.link.events.send(event);
        }
    }

    fn remove_player(&mut self, id: PlayerId) {
        let Some(index) = self.players.iter().position(|p| p.link.id == id) else {
            return;
        };
        let gone = self.players.remove(index);
        tracing::info!(game = %self.name, "{} left", gone.link.name);

        if self.players.is_empty() {
            self.finish_round();
            self.notify_empty();
            return;
        }

        if self.running && !self.players.iter().any(|p| p.in_round) {
            tracing::info!(game = %self.name, "Nobody is left in the round");
            self.finish_round();
        }
        self.broadcast(GameEvent::Roster(self.info()));
    }

    /// Asks everyone to get ready, then waits until they all have.
    async fn start_round(&mut self, initiator: PlayerId) {
        tracing::info!(game = %self.name, "{initiator} asked for a round");

        let mut pending: HashSet<PlayerId> = self.players.iter().map(|p| p.link.id).collect();
        self.broadcast(GameEvent::RoundReady);

        while !pending.is_empty() {
            let Some(command) = self.commands.recv().await else {
                return;
            };
            match command {
                GameCommand::Start(id) => {
                    pending.remove(&id);
                }
                GameCommand::Exit(id) => {
                    pending.remove(&id);
                    self.remove_player(id);
                    if self.players.is_empty() {
                        return;
                    }
                }
                other => self.tell(
                    other.player(),
                    GameEvent::Error("Waiting for everyone to be ready".into()),
                ),
            }
        }

        let seed = self.rules.tile_seed.unwrap_or_else(rand::random);
        let bag = Arc::new(TileBag::new(&self.rules.tile_distribution, seed));
        for p in &mut self.players {
            p.in_round = true;
        }
        self.bag = Some(Arc::clone(&bag));
        self.running = true;

        tracing::info!(game = %self.name, "Round started for {} players", self.players.len());
        self.broadcast(GameEvent::Start {
            bag,
            starting_tiles: self.rules.starting_tiles,
        });
    }

    /// Collects a final score from everyone in the round and reports on it.
    async fn end_round(&mut self, claimant: PlayerId) {
        tracing::info!(game = %self.name, "{claimant} claims the round");

        let mut pending: HashSet<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.in_round)
            .map(|p| p.link.id)
            .collect();
        for p in self.players.iter().filter(|p| p.in_round) {
            _ = p.link.events.send(GameEvent::GameOver);
        }

        let mut scores: HashMap<PlayerId, Score> = HashMap::new();
        while !pending.is_empty() {
            let Some(command) = self.commands.recv().await else {
                return;
            };
            match command {
                GameCommand::Score(id, score) if pending.remove(&id) => {
                    scores.insert(id, score);
                }
                // Two boards can win at once
                GameCommand::GameOver(_) => {}
                GameCommand::Exit(id) => {
                    pending.remove(&id);
                    self.remove_player(id);
                    if self.players.is_empty() {
                        return;
                    }
                }
                other => self.tell(
                    other.player(),
                    GameEvent::Error("Waiting for everyone's final board".into()),
                ),
            }
        }

        let report = RoundReport::new(
            self.name.clone(),
            self.players.iter().filter_map(|p| {
                scores
                    .get(&p.link.id)
                    .map(|score| (p.link.name.as_str(), score))
            }),
        );
        tracing::info!(game = %self.name, "{report}");

        self.broadcast(GameEvent::Results(report));
        self.finish_round();
    }

    fn finish_round(&mut self) {
        self.running = false;
        self.bag = None;
        for p in &mut self.players {
            p.in_round = false;
        }
    }

    fn notify_empty(&self) {
        _ = self.retire.send(GameEmpty {
            name: self.name.clone(),
            joined: self.joined,
        });
    }

    fn in_round(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.link.id == id && p.in_round)
    }

    fn info(&self) -> GameInfo {
        GameInfo {
            game_name: self.name.clone(),
            player_names: self.players.iter().map(|p| p.link.name.clone()).collect(),
        }
    }

    fn tell(&self, id: PlayerId, event: GameEvent) {
        if let Some(p) = self.players.iter().find(|p| p.link.id == id) {
            _ = p.link.events.send(event);
        }
    }

    fn broadcast(&self, event: GameEvent) {
        for p in &self.players {
            _ = p.link.events.send(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speedword_core::rules::TileDistribution;
    use std::time::Duration;
    use tokio::time::timeout;

    struct TestPlayer {
        link: PlayerLink,
        events: mpsc::UnboundedReceiver<GameEvent>,
    }

    impl TestPlayer {
        fn new(name: &str) -> Self {
            let (tx, events) = mpsc::unbounded_channel();
            Self {
                link: PlayerLink {
                    id: Uuid::new_v4(),
                    name: name.into(),
                    events: tx,
                },
                events,
            }
        }

        async fn next(&mut self) -> GameEvent {
            timeout(Duration::from_secs(2), self.events.recv())
                .await
                .expect("game went quiet")
                .expect("game dropped the player")
        }

        fn quiet(&mut self) -> bool {
            self.events.try_recv().is_err()
        }
    }

    fn rules() -> GameRules {
        let mut counts = [0; 26];
        counts[0] = 2;
        counts[19] = 1;
        GameRules {
            starting_tiles: 2,
            tile_distribution: TileDistribution::Custom(counts),
            tile_seed: Some(5),
        }
    }

    async fn join(joins: &mpsc::Sender<AddPlayer>, player: &TestPlayer) -> GameHandle {
        let (reply, handle) = oneshot::channel();
        joins
            .send(AddPlayer {
                player: player.link.clone(),
                reply,
            })
            .await
            .unwrap();
        handle.await.unwrap()
    }

    #[tokio::test]
    async fn rosters_follow_joins_and_exits() {
        let (retire, mut empties) = mpsc::unbounded_channel();
        let (joins, _task) = GameState::spawn("global".into(), rules(), retire);
        let mut ana = TestPlayer::new("ana");
        let mut bo = TestPlayer::new("bo");

        let handle = join(&joins, &ana).await;
        assert_eq!(handle.name, "global");
        let GameEvent::Joined(info) = ana.next().await else {
            panic!("expected the joined roster")
        };
        assert_eq!(info.player_names, vec!["ana"]);

        join(&joins, &bo).await;
        assert!(matches!(ana.next().await, GameEvent::Roster(info) if info.player_names == vec!["ana", "bo"]));
        assert!(matches!(bo.next().await, GameEvent::Joined(info) if info.player_names == vec!["ana", "bo"]));

        handle.send(GameCommand::Exit(bo.link.id)).await.unwrap();
        assert!(matches!(ana.next().await, GameEvent::Roster(info) if info.player_names == vec!["ana"]));

        handle.send(GameCommand::Exit(ana.link.id)).await.unwrap();
        let empty = timeout(Duration::from_secs(2), empties.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(empty.name, "global");
        assert_eq!(empty.joined, 2);
    }

    #[tokio::test]
    async fn start_waits_for_every_player() {
        let (retire, _empties) = mpsc::unbounded_channel();
        let (joins, _task) = GameState::spawn("global".into(), rules(), retire);
        let mut ana = TestPlayer::new("ana");
        let mut bo = TestPlayer::new("bo");
        let handle = join(&joins, &ana).await;
        join(&joins, &bo).await;
        ana.next().await;
        ana.next().await;
        bo.next().await;

        handle.send(GameCommand::Start(ana.link.id)).await.unwrap();
        assert!(matches!(ana.next().await, GameEvent::RoundReady));
        assert!(matches!(bo.next().await, GameEvent::RoundReady));

        // A duplicate acknowledgement doesn't count for anyone else
        handle.send(GameCommand::Start(ana.link.id)).await.unwrap();
        handle.send(GameCommand::Start(ana.link.id)).await.unwrap();
        handle.send(GameCommand::GameOver(bo.link.id)).await.unwrap();
        assert!(matches!(bo.next().await, GameEvent::Error(_)));
        assert!(ana.quiet());

        handle.send(GameCommand::Start(bo.link.id)).await.unwrap();
        let GameEvent::Start { bag, starting_tiles } = ana.next().await else {
            panic!("expected the round to start")
        };
        assert_eq!(starting_tiles, 2);
        assert_eq!(bag.len(), 3);
        let GameEvent::Start { bag: bo_bag, .. } = bo.next().await else {
            panic!("expected the round to start")
        };
        assert!(Arc::ptr_eq(&bag, &bo_bag), "Everyone draws from one bag");
    }

    #[tokio::test]
    async fn end_collects_every_score() {
        let (retire, _empties) = mpsc::unbounded_channel();
        let (joins, _task) = GameState::spawn("global".into(), rules(), retire);
        let mut ana = TestPlayer::new("ana");
        let mut bo = TestPlayer::new("bo");
        let handle = join(&joins, &ana).await;
        join(&joins, &bo).await;
        handle.send(GameCommand::Start(ana.link.id)).await.unwrap();
        handle.send(GameCommand::Start(ana.link.id)).await.unwrap();
        handle.send(GameCommand::Start(bo.link.id)).await.unwrap();
        while !matches!(ana.next().await, GameEvent::Start { .. }) {}
        while !matches!(bo.next().await, GameEvent::Start { .. }) {}

        // A late joiner sits the round out
        let mut cy = TestPlayer::new("cy");
        join(&joins, &cy).await;
        assert!(matches!(cy.next().await, GameEvent::Joined(_)));
        handle.send(GameCommand::Start(cy.link.id)).await.unwrap();
        assert!(matches!(cy.next().await, GameEvent::Error(_)));

        handle.send(GameCommand::GameOver(ana.link.id)).await.unwrap();
        while !matches!(ana.next().await, GameEvent::GameOver) {}
        while !matches!(bo.next().await, GameEvent::GameOver) {}
        assert!(cy.quiet());

        let mut win = Score::cheated(0);
        win.msg = speedword_core::scoring::ScoreKind::Score;
        win.win = true;
        handle
            .send(GameCommand::Score(ana.link.id, win))
            .await
            .unwrap();
        handle
            .send(GameCommand::Score(bo.link.id, Score::cheated(3)))
            .await
            .unwrap();

        for player in [&mut ana, &mut bo, &mut cy] {
            let GameEvent::Results(report) = player.next().await else {
                panic!("expected the round report")
            };
            assert_eq!(report.winners, vec!["ana"]);
            assert_eq!(report.results.len(), 2);
            assert_eq!(report.results[1].pts, 3);
        }
    }
}
