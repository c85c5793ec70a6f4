//! The per-connection client session state machine (spec §4.1).
//!
//! A `Client` is the server-side handle for one authenticated transport
//! connection. It never touches the socket directly — [`crate::transport`]
//! owns the actual I/O and exposes an outbound event sender that a detached
//! receiver signals as dead by dropping; every remote call here is therefore
//! best-effort and failure always routes through [`Client::detach`].

use wire::{Event, GameStartInfo, InfoMap, MatchResult, Observation, StatsReply};

use crate::avatar::Avatar;

/// Lifecycle state of a [`Client`], mirroring spec §4.1's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    WaitingForGame,
    Playing,
    Detached,
    Error,
}

/// Outbound channel to the client's transport. A closed channel means the
/// connection is dead; every call site treats that the same way.
pub type RemoteSender = tokio::sync::mpsc::UnboundedSender<Event>;

/// One authenticated connection bound to an [`Avatar`].
pub struct Client {
    pub identifier: String,
    pub username: String,
    pub state: ClientState,
    /// Non-owning: the id of the Game this client currently occupies a slot in.
    pub game: Option<String>,
    remote: RemoteSender,
}

/// Outcome of a best-effort remote call: either delivered, or the transport
/// is dead and the client must be detached by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    Delivered,
    Dead,
}

impl Client {
    pub fn new(identifier: String, username: String, remote: RemoteSender) -> Self {
        Client {
            identifier,
            username,
            state: ClientState::Idle,
            game: None,
            remote,
        }
    }

    /// Whether the maintenance task should consider this connection's
    /// transport broken without attempting a send (spec §4.4 step 2).
    pub fn is_transport_dead(&self) -> bool {
        self.remote.is_closed()
    }

    fn send(&self, event: Event) -> RemoteOutcome {
        match self.remote.send(event) {
            Ok(()) => RemoteOutcome::Delivered,
            Err(_) => RemoteOutcome::Dead,
        }
    }

    /// `check_compatibility` — caller (the reactor) has already compared
    /// versions; this only delivers the outcome event.
    pub fn send_compatible(&self) -> RemoteOutcome {
        self.send(Event::Compatible)
    }

    pub fn send_version_mismatch(&self, server_version: u32) -> RemoteOutcome {
        self.send(Event::VersionMismatch { server_version })
    }

    /// `request_stats` — builds the reply from the bound avatar.
    pub fn stats_reply(&self, avatar: &Avatar) -> StatsReply {
        StatsReply {
            username: avatar.username.clone(),
            finished_games: avatar.finished_games,
            games_won: avatar.games_won,
            games_lost: avatar.games_lost,
            games_drawn: avatar.games_drawn,
        }
    }

    pub fn send_stats(&self, reply: StatsReply) -> RemoteOutcome {
        self.send(Event::Stats(reply))
    }

    /// `start_queuing` is idempotent: re-queuing an already-queuing client is
    /// a silent no-op (spec §4.1). Returns whether the transition actually happened.
    pub fn begin_queuing(&mut self) -> bool {
        if self.state == ClientState::Idle {
            self.state = ClientState::WaitingForGame;
            true
        } else {
            false
        }
    }

    // --- Game-facing calls ---

    /// `game_starts` — transitions to PLAYING and delivers the opening observation.
    pub fn game_starts(&mut self, game_id: &str, obs: Observation, info: GameStartInfo) -> RemoteOutcome {
        self.state = ClientState::Playing;
        self.game = Some(game_id.to_string());
        self.send(Event::GameStarts { obs, info })
    }

    pub fn send_observation(&self, obs: Observation, reward: f32, done: bool, info: InfoMap) -> RemoteOutcome {
        self.send(Event::ReceiveObservation { obs, reward, done, info })
    }

    /// `game_done` — delivers the terminal event; counter updates on the bound
    /// Avatar are applied by the caller (the reactor holds the Avatar store),
    /// then this transitions the client back to IDLE.
    pub fn game_done(
        &mut self,
        obs: Observation,
        reward: f32,
        done: bool,
        info: InfoMap,
        result: MatchResult,
    ) -> RemoteOutcome {
        let outcome = self.send(Event::GameDone { obs, reward, done, info, result });
        self.state = ClientState::Idle;
        self.game = None;
        outcome
    }

    pub fn game_aborted(&mut self, msg: impl Into<String>) -> RemoteOutcome {
        let outcome = self.send(Event::GameAborted { msg: msg.into() });
        self.state = ClientState::Idle;
        self.game = None;
        outcome
    }

    /// `stop_queuing` — only meaningful from WAITING_FOR_GAME; a spurious call
    /// from any other state (notably IDLE, per spec §9) is a no-op.
    pub fn stop_queuing(&mut self) -> bool {
        match self.state {
            ClientState::WaitingForGame | ClientState::Playing => {
                self.state = ClientState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Marks this client DETACHED. The caller is responsible for removing it
    /// from lifecycle lists and, if it was in a Game, aborting that Game.
    pub fn detach(&mut self) {
        self.state = ClientState::Detached;
        self.game = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_client() -> (Client, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Client::new("abc12345".to_string(), "alice".to_string(), tx), rx)
    }

    #[test]
    fn begin_queuing_is_idempotent() {
        let (mut client, _rx) = make_client();
        assert!(client.begin_queuing());
        assert_eq!(client.state, ClientState::WaitingForGame);
        assert!(!client.begin_queuing());
        assert_eq!(client.state, ClientState::WaitingForGame);
    }

    #[test]
    fn stop_queuing_from_idle_is_a_noop() {
        let (mut client, _rx) = make_client();
        assert_eq!(client.state, ClientState::Idle);
        assert!(!client.stop_queuing());
        assert_eq!(client.state, ClientState::Idle);
    }

    #[test]
    fn stop_queuing_from_waiting_returns_to_idle() {
        let (mut client, _rx) = make_client();
        client.begin_queuing();
        assert!(client.stop_queuing());
        assert_eq!(client.state, ClientState::Idle);
    }

    #[test]
    fn dropped_receiver_reports_dead_on_next_send() {
        let (client, rx) = make_client();
        drop(rx);
        assert_eq!(client.send_compatible(), RemoteOutcome::Dead);
    }

    #[test]
    fn game_starts_transitions_to_playing() {
        let (mut client, mut rx) = make_client();
        let outcome = client.game_starts(
            "g1",
            [0.0; 16],
            GameStartInfo {
                id: "g1".to_string(),
                player_one: "alice".to_string(),
                player_two: "bob".to_string(),
            },
        );
        assert_eq!(outcome, RemoteOutcome::Delivered);
        assert_eq!(client.state, ClientState::Playing);
        assert_eq!(client.game.as_deref(), Some("g1"));
        assert!(matches!(rx.try_recv(), Ok(Event::GameStarts { .. })));
    }

    #[test]
    fn game_done_returns_to_idle_and_clears_game() {
        let (mut client, _rx) = make_client();
        client.begin_queuing();
        client.game_starts(
            "g1",
            [0.0; 16],
            GameStartInfo {
                id: "g1".to_string(),
                player_one: "alice".to_string(),
                player_two: "bob".to_string(),
            },
        );
        client.game_done([0.0; 16], 1.0, true, InfoMap::default(), MatchResult::default());
        assert_eq!(client.state, ClientState::Idle);
        assert_eq!(client.game, None);
    }
}
