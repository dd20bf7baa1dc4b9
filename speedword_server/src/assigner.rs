use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use speedword_core::rules::GameRules;

use crate::errors::SessionError;
use crate::game_state::{AddPlayer, GameEmpty, GameHandle, GameState, PlayerLink};

/// Everyone plays in the same game
pub const GLOBAL_GAME: &str = "global";

pub struct JoinRequest {
    pub player: PlayerLink,
    pub reply: oneshot::Sender<GameHandle>,
}

#[derive(Clone, Debug)]
pub struct AssignerHandle {
    requests: mpsc::Sender<JoinRequest>,
}

impl AssignerHandle {
    pub async fn join(&self, request: JoinRequest) -> Result<(), SessionError> {
        self.requests
            .send(request)
            .await
            .map_err(|_| SessionError::AssignerClosed)
    }
}

/// Stops the assigner. Dropping it without calling `close` stops it too.
pub struct Shutdown {
    quit: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Shutdown {
    pub async fn close(self) {
        _ = self.quit.send(());
        _ = self.task.await;
    }
}

struct LiveGame {
    joins: mpsc::Sender<AddPlayer>,
    forwarded: u64,
    task: JoinHandle<()>,
}

pub struct Assigner {
    rules: GameRules,
    games: HashMap<String, LiveGame>,
    requests: mpsc::Receiver<JoinRequest>,
    empties: mpsc::UnboundedReceiver<GameEmpty>,
    empties_tx: mpsc::UnboundedSender<GameEmpty>,
    quit: oneshot::Receiver<()>,
}

impl Assigner {
    pub fn spawn(rules: GameRules) -> (AssignerHandle, Shutdown) {
        let (requests_tx, requests) = mpsc::channel(1);
        let (empties_tx, empties) = mpsc::unbounded_channel();
        let (quit_tx, quit) = oneshot::channel();

        let assigner = Assigner {
            rules,
            games: HashMap::new(),
            requests,
            empties,
            empties_tx,
            quit,
        };
        let task = tokio::spawn(assigner.run());

        (
            AssignerHandle {
                requests: requests_tx,
            },
            Shutdown {
                quit: quit_tx,
                task,
            },
        )
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = &mut self.quit => break,
                request = self.requests.recv() => match request {
                    Some(request) => {
                        if !self.assign(request).await {
                            break;
                        }
                    }
                    None => break,
                },
                Some(empty) = self.empties.recv() => self.retire(empty),
            }
        }

        tracing::info!("Assigner stopping, closing {} games", self.games.len());
        for (_, game) in self.games.drain() {
            game.task.abort();
        }
    }

    /// Returns false if told to quit while the game was busy
    async fn assign(&mut self, JoinRequest { player, reply }: JoinRequest) -> bool {
        let game = self
            .games
            .entry(GLOBAL_GAME.to_string())
            .or_insert_with(|| {
                tracing::info!("Creating game {GLOBAL_GAME}");
                let (joins, task) = GameState::spawn(
                    GLOBAL_GAME.to_string(),
                    self.rules.clone(),
                    self.empties_tx.clone(),
                );
                LiveGame {
                    joins,
                    forwarded: 0,
                    task,
                }
            });

        game.forwarded += 1;
        tracing::debug!("Sending {} to {GLOBAL_GAME}", player.name);
        // A game holding a round barrier only takes joins once it's done
        let sent = tokio::select! {
            sent = game.joins.send(AddPlayer { player, reply }) => sent.is_ok(),
            _ = &mut self.quit => return false,
        };
        if !sent {
            // The request and its reply are dropped, which tells the player
            tracing::error!("Game {GLOBAL_GAME} stopped unexpectedly");
            self.games.remove(GLOBAL_GAME);
        }
        true
    }

    /// Only retires a game once every player sent its way has been seen by it
    fn retire(&mut self, GameEmpty { name, joined }: GameEmpty) {
        let settled = self.games.get(&name).map(|game| game.forwarded == joined);
        match settled {
            Some(true) => {
                tracing::info!("Retiring empty game {name}");
                self.games.remove(&name);
            }
            Some(false) => tracing::debug!("Game {name} is empty but has joins on the way"),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::{GameCommand, GameEvent};
    use std::time::Duration;
    use tokio::time::timeout;
    use uuid::Uuid;

    fn link(name: &str) -> (PlayerLink, mpsc::UnboundedReceiver<GameEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            PlayerLink {
                id: Uuid::new_v4(),
                name: name.into(),
                events,
            },
            rx,
        )
    }

    async fn join(assigner: &AssignerHandle, player: PlayerLink) -> GameHandle {
        let (reply, handle) = oneshot::channel();
        assigner.join(JoinRequest { player, reply }).await.unwrap();
        timeout(Duration::from_secs(2), handle)
            .await
            .expect("no assignment")
            .expect("join refused")
    }

    #[tokio::test]
    async fn everyone_lands_in_the_global_game() {
        let (assigner, _shutdown) = Assigner::spawn(GameRules::default());
        let (ana, mut ana_events) = link("ana");
        let (bo, _bo_events) = link("bo");

        assert_eq!(join(&assigner, ana).await.name, GLOBAL_GAME);
        assert_eq!(join(&assigner, bo).await.name, GLOBAL_GAME);

        ana_events.recv().await.unwrap();
        let Some(GameEvent::Roster(info)) = ana_events.recv().await else {
            panic!("expected a roster update")
        };
        assert_eq!(info.player_names, vec!["ana", "bo"]);
    }

    #[tokio::test]
    async fn empty_games_are_replaced() {
        let (assigner, _shutdown) = Assigner::spawn(GameRules::default());
        let (ana, mut ana_events) = link("ana");
        let ana_id = ana.id;

        let game = join(&assigner, ana).await;
        game.send(GameCommand::Exit(ana_id)).await.unwrap();
        // The game drops its link once the exit is handled
        timeout(Duration::from_secs(2), async {
            while ana_events.recv().await.is_some() {}
        })
        .await
        .expect("ana was never removed");

        let (bo, mut bo_events) = link("bo");
        join(&assigner, bo).await;
        let Some(GameEvent::Joined(info)) = bo_events.recv().await else {
            panic!("expected to join")
        };
        assert_eq!(info.player_names, vec!["bo"]);
    }

    #[tokio::test]
    async fn shutdown_refuses_new_players() {
        let (assigner, shutdown) = Assigner::spawn(GameRules::default());
        shutdown.close().await;

        let (ana, _events) = link("ana");
        let (reply, _handle) = oneshot::channel();
        assert!(matches!(
            assigner.join(JoinRequest { player: ana, reply }).await,
            Err(SessionError::AssignerClosed)
        ));
    }
}
