//! # Competition Server Library
//!
//! This library hosts two-player reinforcement-learning matches between networked
//! agents of a fixed-schema hockey environment. It owns the canonical server state
//! — connected clients, in-progress games, avatar ratings, the leaderboard — and
//! processes every authenticated remote call against it.
//!
//! ## Core Responsibilities
//!
//! ### Matchmaking
//! New queuers are paired against waiting opponents using a skill-quality score
//! plus a wait-time bonus, falling back to opening a fresh game when the waiting
//! pool is too thin to bother weighting (see [`matchmaker`]).
//!
//! ### Match Simulation
//! Each [`game::Game`] drives one [`environment::Environment`] through a fixed
//! number of episodes, synchronizing the two sides' half-actions into full
//! environment steps and buffering every transition for replay.
//!
//! ### Rating & Leaderboard
//! On match completion, [`server_core::ServerCore`] updates both avatars' skill
//! ratings (via an external TrueSkill-style library) and the head-to-head
//! leaderboard matrix, atomically with respect to all other event-loop work.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! One task — the reactor, built on [`server_core::ServerCore`] — owns all
//! server-wide mutable state and processes every inbound call sequentially.
//! This eliminates the locking that a per-connection-thread design would need
//! and keeps the invariants easy to reason about.
//!
//! ### TCP, Length-Prefixed, bincode-Encoded
//! Each client holds one `TcpStream`; a lightweight reader task per connection
//! decodes frames and forwards them to the reactor over a channel (see
//! [`transport`]), mirroring the teacher's receiver/sender task split.
//!
//! ## Module Organization
//!
//! - [`error`] — error kinds used across the crate.
//! - [`avatar`] — persistent per-username record and its on-disk schema.
//! - [`environment`] — the `Environment` trait and a deterministic test double.
//! - [`client`] — the per-connection client session state machine.
//! - [`game`] — the per-match state machine and step-synchronization protocol.
//! - [`matchmaker`] — quality-plus-wait-bonus opponent selection.
//! - [`server_core`] — registries, rating/leaderboard mutation, maintenance task.
//! - [`persistence`] — snapshot and replay (de)serialization.
//! - [`auth`] — flat password file authentication.
//! - [`transport`] — TCP framing and per-connection I/O tasks.
//! - [`admin`] — the line-oriented admin console.

pub mod admin;
pub mod auth;
pub mod avatar;
pub mod client;
pub mod environment;
pub mod error;
pub mod game;
pub mod matchmaker;
pub mod persistence;
pub mod server_core;
pub mod transport;

/// Protocol version compared against a connecting client's declared version.
pub const SERVER_VERSION: u32 = wire::PROTOCOL_VERSION;

/// Default TCP port the server listens on.
pub const DEFAULT_PORT: u16 = 33000;

/// Maintenance task period.
pub const MAINTENANCE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10);

/// Inactivity timeout for a running game (both slots filled, no tick for this long).
pub const GAME_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);
