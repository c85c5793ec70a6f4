//! Persistent per-username player identity.
//!
//! An [`Avatar`] is created the first time a username authenticates and is
//! never destroyed; it accumulates match counters and a skill rating across
//! the avatar's whole lifetime on this server, independent of how many times
//! that player connects and disconnects.

use serde::{Deserialize, Serialize};
use skillratings::trueskill::TrueSkillRating;
use std::time::{SystemTime, UNIX_EPOCH};

/// Mean/uncertainty pair backing an avatar's skill rating.
///
/// Kept as our own plain struct (rather than serializing the external crate's
/// type directly) so the on-disk schema is ours to version, per the design
/// note about reconstituting derived fields explicitly rather than merging a
/// raw dict onto a live object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub mu: f64,
    pub sigma: f64,
}

impl Default for Rating {
    fn default() -> Self {
        TrueSkillRating::default().into()
    }
}

impl From<TrueSkillRating> for Rating {
    fn from(r: TrueSkillRating) -> Self {
        Rating {
            mu: r.rating,
            sigma: r.uncertainty,
        }
    }
}

impl From<Rating> for TrueSkillRating {
    fn from(r: Rating) -> Self {
        TrueSkillRating {
            rating: r.mu,
            uncertainty: r.sigma,
        }
    }
}

/// Schema-versioned, on-disk representation of an [`Avatar`].
///
/// A constructor (`Avatar::from_record`) rebuilds any derived in-memory state
/// from this, rather than the source's approach of merging a pickled dict
/// onto the live object and then special-casing the rating field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarRecord {
    pub schema_version: u32,
    pub username: String,
    pub finished_games: u64,
    pub games_won: u64,
    pub games_lost: u64,
    pub games_drawn: u64,
    pub finished_games_ids: Vec<String>,
    pub rating: Rating,
    pub last_saved: u64,
}

pub const AVATAR_SCHEMA_VERSION: u32 = 1;

/// The in-memory avatar: record fields plus the count of currently attached
/// clients (not persisted — it is derived from live connections).
#[derive(Debug, Clone)]
pub struct Avatar {
    pub username: String,
    pub finished_games: u64,
    pub games_won: u64,
    pub games_lost: u64,
    pub games_drawn: u64,
    pub finished_games_ids: Vec<String>,
    pub rating: Rating,
    pub last_saved: u64,
    /// Number of [`crate::client::Client`]s currently attached to this avatar.
    pub attached_clients: u32,
}

impl Avatar {
    /// Creates a fresh avatar for a username seen for the first time.
    pub fn new(username: impl Into<String>) -> Self {
        Avatar {
            username: username.into(),
            finished_games: 0,
            games_won: 0,
            games_lost: 0,
            games_drawn: 0,
            finished_games_ids: Vec::new(),
            rating: Rating::default(),
            last_saved: 0,
            attached_clients: 0,
        }
    }

    /// Rebuilds an avatar from its persisted record.
    pub fn from_record(record: AvatarRecord) -> Self {
        Avatar {
            username: record.username,
            finished_games: record.finished_games,
            games_won: record.games_won,
            games_lost: record.games_lost,
            games_drawn: record.games_drawn,
            finished_games_ids: record.finished_games_ids,
            rating: record.rating,
            last_saved: record.last_saved,
            attached_clients: 0,
        }
    }

    /// Snapshots the persistable fields, stamping `last_saved` with the current time.
    pub fn to_record(&self) -> AvatarRecord {
        AvatarRecord {
            schema_version: AVATAR_SCHEMA_VERSION,
            username: self.username.clone(),
            finished_games: self.finished_games,
            games_won: self.games_won,
            games_lost: self.games_lost,
            games_drawn: self.games_drawn,
            finished_games_ids: self.finished_games_ids.clone(),
            rating: self.rating,
            last_saved: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    /// Invariant from §3 and §8: `games_won + games_lost + games_drawn == finished_games`.
    pub fn counters_consistent(&self) -> bool {
        self.games_won + self.games_lost + self.games_drawn == self.finished_games
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_avatar_has_default_rating_and_zero_counters() {
        let avatar = Avatar::new("alice");
        assert_eq!(avatar.finished_games, 0);
        assert!(avatar.counters_consistent());
        assert_eq!(avatar.rating, Rating::default());
    }

    #[test]
    fn record_round_trip_preserves_fields() {
        let mut avatar = Avatar::new("bob");
        avatar.finished_games = 4;
        avatar.games_won = 2;
        avatar.games_lost = 1;
        avatar.games_drawn = 1;
        avatar.finished_games_ids.push("abcd1234".to_string());
        avatar.rating = Rating { mu: 30.0, sigma: 5.0 };

        let record = avatar.to_record();
        let reloaded = Avatar::from_record(record.clone());

        assert_eq!(reloaded.username, avatar.username);
        assert_eq!(reloaded.finished_games, 4);
        assert_eq!(reloaded.rating, avatar.rating);
        assert_eq!(reloaded.finished_games_ids, vec!["abcd1234".to_string()]);
        assert!(reloaded.counters_consistent());
    }

    #[test]
    fn rating_conversion_round_trips_through_trueskill_type() {
        let rating = Rating { mu: 27.3, sigma: 4.1 };
        let ts: TrueSkillRating = rating.into();
        let back: Rating = ts.into();
        assert_eq!(rating, back);
    }
}
