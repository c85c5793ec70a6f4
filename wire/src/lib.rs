//! # Wire Protocol
//!
//! This crate contains the data structures shared between the competition server
//! and any client that speaks to it: the authenticated call/event protocol, the
//! observation/action schema of the two-player hockey environment, and the
//! length-prefixed framing used to carry `bincode`-encoded envelopes over a byte
//! stream.
//!
//! ## Design Philosophy
//!
//! ### Deterministic Encoding
//! Every type here derives `Serialize`/`Deserialize` and is encoded with `bincode`,
//! matching how the rest of this implementation persists snapshots and replays —
//! one encoding scheme end to end, rather than a different one per boundary.
//!
//! ### Protocol Versioning
//! `PROTOCOL_VERSION` is checked on connect via `Call::CheckCompatibility`; a
//! mismatch is a hard error (`Event::VersionMismatch`) and the connection is
//! closed rather than silently tolerated.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current protocol version. Bump on any wire-incompatible change.
pub const PROTOCOL_VERSION: u32 = 1;

/// Number of real-valued components in one side's action.
pub const ACTION_LEN: usize = 4;

/// Number of real-valued components in one side's observation.
pub const OBSERVATION_LEN: usize = 16;

/// Number of episodes played per match.
pub const EPISODES_PER_MATCH: u32 = 4;

/// Winner code carried in the info map of the terminal transition of an episode.
///
/// `PlayerOne` wins on slot 0, `PlayerTwo` wins on slot 1, `Draw` on a tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    PlayerOne,
    Draw,
    PlayerTwo,
}

impl Winner {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Winner::PlayerOne),
            0 => Some(Winner::Draw),
            -1 => Some(Winner::PlayerTwo),
            _ => None,
        }
    }

    pub fn to_code(self) -> i32 {
        match self {
            Winner::PlayerOne => 1,
            Winner::Draw => 0,
            Winner::PlayerTwo => -1,
        }
    }
}

/// A single side's action: exactly [`ACTION_LEN`] real values.
pub type Action = [f32; ACTION_LEN];

/// A single side's observation: exactly [`OBSERVATION_LEN`] real values.
pub type Observation = [f32; OBSERVATION_LEN];

/// Side identifier within a [`Game`](https://docs.rs/server) — slot 0 or slot 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub fn index(self) -> usize {
        match self {
            Side::One => 0,
            Side::Two => 1,
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }
}

/// Free-form side-channel information attached to an observation delivery.
///
/// Only `winner` is structurally guaranteed (set on the terminal tick of every
/// episode); everything else is an opaque string-keyed bag, matching the
/// source's loosely-typed info dict.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoMap {
    pub winner: Option<i32>,
    pub extra: HashMap<String, String>,
}

impl InfoMap {
    pub fn with_winner(winner: Winner) -> Self {
        InfoMap {
            winner: Some(winner.to_code()),
            extra: HashMap::new(),
        }
    }
}

/// Per-client result summary delivered alongside the terminal `game_done` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub episodes_played: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub games_drawn: u32,
}

/// Stats snapshot returned by `request_stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsReply {
    pub username: String,
    pub finished_games: u64,
    pub games_won: u64,
    pub games_lost: u64,
    pub games_drawn: u64,
}

/// Game-start info record broadcast to both clients when a match begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStartInfo {
    pub id: String,
    pub player_one: String,
    pub player_two: String,
}

/// Client → server calls. `Authenticate` is the one call accepted before a
/// connection has a session; every other variant requires it to have
/// succeeded first (spec §6, "Authentication").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Call {
    /// Checked against the flat password file; the username becomes the
    /// Avatar key verbatim (spec §9).
    Authenticate { username: String, password: String },
    /// Sent once right after authentication; server replies with an `Event::Compatible`
    /// or closes the connection with `Event::VersionMismatch`.
    CheckCompatibility { client_version: u32 },
    RequestStats,
    StartQueuing,
    StopQueuing,
    ReceiveAction { action: Action },
}

/// Server → client events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Authenticated,
    AuthenticationFailed,
    Compatible,
    VersionMismatch { server_version: u32 },
    Stats(StatsReply),
    GameStarts {
        obs: Observation,
        info: GameStartInfo,
    },
    ReceiveObservation {
        obs: Observation,
        reward: f32,
        done: bool,
        info: InfoMap,
    },
    GameDone {
        obs: Observation,
        reward: f32,
        done: bool,
        info: InfoMap,
        result: MatchResult,
    },
    GameAborted {
        msg: String,
    },
}

/// One frame on the wire: either direction, tagged so a single decode path can
/// dispatch client calls and server events without two parallel framings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Envelope {
    Call(Call),
    Event(Event),
}

/// Encodes `envelope` as a 4-byte big-endian length prefix followed by its
/// `bincode` body, ready to be written to a stream socket.
pub fn frame_envelope(envelope: &Envelope) -> Result<Vec<u8>, bincode::Error> {
    let body = bincode::serialize(envelope)?;
    let mut framed = Vec::with_capacity(4 + body.len());
    framed.extend_from_slice(&(body.len() as u32).to_be_bytes());
    framed.extend_from_slice(&body);
    Ok(framed)
}

/// Decodes a length-prefixed frame body (the bytes *after* the 4-byte length
/// prefix has already been read and stripped by the transport layer).
pub fn decode_envelope(body: &[u8]) -> Result<Envelope, bincode::Error> {
    bincode::deserialize(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winner_code_round_trip() {
        for code in [-1, 0, 1] {
            let winner = Winner::from_code(code).unwrap();
            assert_eq!(winner.to_code(), code);
        }
        assert!(Winner::from_code(2).is_none());
    }

    #[test]
    fn side_other_is_involutive() {
        assert_eq!(Side::One.other(), Side::Two);
        assert_eq!(Side::Two.other(), Side::One);
        assert_eq!(Side::One.other().other(), Side::One);
    }

    #[test]
    fn envelope_round_trips_through_framing() {
        let envelope = Envelope::Call(Call::ReceiveAction {
            action: [0.1, -0.2, 0.3, 0.0],
        });
        let framed = frame_envelope(&envelope).unwrap();
        let len = u32::from_be_bytes(framed[0..4].try_into().unwrap()) as usize;
        assert_eq!(len, framed.len() - 4);

        let decoded = decode_envelope(&framed[4..]).unwrap();
        match decoded {
            Envelope::Call(Call::ReceiveAction { action }) => {
                assert_eq!(action, [0.1, -0.2, 0.3, 0.0]);
            }
            _ => panic!("unexpected envelope variant"),
        }
    }

    #[test]
    fn game_done_event_serializes() {
        let event = Event::GameDone {
            obs: [0.0; OBSERVATION_LEN],
            reward: 1.0,
            done: true,
            info: InfoMap::with_winner(Winner::PlayerOne),
            result: MatchResult {
                episodes_played: 4,
                games_won: 2,
                games_lost: 1,
                games_drawn: 1,
            },
        };
        let encoded = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&encoded).unwrap();
        match decoded {
            Event::GameDone { result, .. } => {
                assert_eq!(result.episodes_played, 4);
                assert_eq!(result.games_won, 2);
            }
            _ => panic!("unexpected event variant"),
        }
    }
}
