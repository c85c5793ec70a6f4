//! Snapshot and replay (de)serialization (spec §6, "Persistent layout").
//!
//! The directory layout and file names mirror the source's `.pkl`/`.npz`
//! tree exactly; only the container format changes, from pickle/npz to
//! `bincode`, since this implementation has no pickle-compatible equivalent
//! available. See DESIGN.md for that deviation.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::avatar::AvatarRecord;
use crate::game::TransitionRecord;

/// One cell of the leaderboard matrix (spec §3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardCell {
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
}

/// `username -> (opponent-username | "total") -> cell`.
pub type LeaderboardMatrix = HashMap<String, HashMap<String, LeaderboardCell>>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatsPoint {
    pub timestamp: u64,
    pub value: u64,
}

/// `series name -> ordered samples`.
pub type StatsSeries = HashMap<String, Vec<StatsPoint>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MiscRecord {
    pub total_num_played_games: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub identifier: String,
    pub player_one: String,
    pub player_two: String,
    pub timestamp: u64,
    pub transitions: Vec<TransitionRecord>,
}

fn write_bincode<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    bincode::serialize_into(BufWriter::new(file), value)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

fn read_bincode<T: for<'de> Deserialize<'de>>(path: &Path) -> io::Result<Option<T>> {
    match File::open(path) {
        Ok(file) => bincode::deserialize_from(BufReader::new(file))
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn avatars_dir(working_dir: &Path) -> PathBuf {
    working_dir.join("avatars")
}

pub fn avatar_path(working_dir: &Path, username: &str) -> PathBuf {
    avatars_dir(working_dir).join(format!("{username}.pkl"))
}

pub fn save_avatar(working_dir: &Path, record: &AvatarRecord) -> io::Result<()> {
    write_bincode(&avatar_path(working_dir, &record.username), record)
}

pub fn load_avatar(working_dir: &Path, username: &str) -> io::Result<Option<AvatarRecord>> {
    read_bincode(&avatar_path(working_dir, username))
}

/// Loads every persisted avatar record found under `avatars/`.
pub fn load_all_avatars(working_dir: &Path) -> io::Result<Vec<AvatarRecord>> {
    let dir = avatars_dir(working_dir);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut records = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("pkl") {
            if let Some(record) = read_bincode(&path)? {
                records.push(record);
            }
        }
    }
    Ok(records)
}

fn leaderboard_path(working_dir: &Path) -> PathBuf {
    working_dir.join("leaderboard.pkl")
}

pub fn save_leaderboard(working_dir: &Path, matrix: &LeaderboardMatrix) -> io::Result<()> {
    write_bincode(&leaderboard_path(working_dir), matrix)
}

pub fn load_leaderboard(working_dir: &Path) -> io::Result<LeaderboardMatrix> {
    Ok(read_bincode(&leaderboard_path(working_dir))?.unwrap_or_default())
}

fn stats_path(working_dir: &Path) -> PathBuf {
    working_dir.join("stats.pkl")
}

pub fn save_stats(working_dir: &Path, series: &StatsSeries) -> io::Result<()> {
    write_bincode(&stats_path(working_dir), series)
}

pub fn load_stats(working_dir: &Path) -> io::Result<StatsSeries> {
    Ok(read_bincode(&stats_path(working_dir))?.unwrap_or_default())
}

fn misc_path(working_dir: &Path) -> PathBuf {
    working_dir.join("misc.pkl")
}

pub fn save_misc(working_dir: &Path, misc: &MiscRecord) -> io::Result<()> {
    write_bincode(&misc_path(working_dir), misc)
}

pub fn load_misc(working_dir: &Path) -> io::Result<MiscRecord> {
    Ok(read_bincode(&misc_path(working_dir))?.unwrap_or_default())
}

/// `games/<YYYY>/<MM>/<DD>/<game-id>.npz` (spec §6). The `.npz` extension is
/// kept for layout compatibility even though the container is bincode.
fn replay_path(working_dir: &Path, game_id: &str, timestamp: u64) -> PathBuf {
    let days_since_epoch = timestamp / 86_400;
    let (year, month, day) = civil_date_from_days(days_since_epoch as i64);
    working_dir
        .join("games")
        .join(format!("{year:04}"))
        .join(format!("{month:02}"))
        .join(format!("{day:02}"))
        .join(format!("{game_id}.npz"))
}

pub fn save_replay(working_dir: &Path, record: &ReplayRecord) -> io::Result<()> {
    write_bincode(&replay_path(working_dir, &record.identifier, record.timestamp), record)
}

pub fn now_unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Howard Hinnant's civil-from-days algorithm, dependency-free proleptic
/// Gregorian calendar conversion for the replay directory layout.
fn civil_date_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::Rating;

    #[test]
    fn avatar_round_trip_preserves_fields() {
        let dir = std::env::temp_dir().join(format!("competition-server-test-{}", now_unix_seconds()));
        let record = AvatarRecord {
            schema_version: 1,
            username: "alice".to_string(),
            finished_games: 4,
            games_won: 2,
            games_lost: 1,
            games_drawn: 1,
            finished_games_ids: vec!["abcd1234".to_string()],
            rating: Rating { mu: 30.0, sigma: 5.0 },
            last_saved: 0,
        };

        save_avatar(&dir, &record).unwrap();
        let reloaded = load_avatar(&dir, "alice").unwrap().unwrap();
        assert_eq!(reloaded, record);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn leaderboard_round_trip_preserves_structure() {
        let dir = std::env::temp_dir().join(format!("competition-server-test-lb-{}", now_unix_seconds()));
        let mut matrix: LeaderboardMatrix = HashMap::new();
        let mut row = HashMap::new();
        row.insert("bob".to_string(), LeaderboardCell { wins: 2, losses: 1, draws: 1 });
        matrix.insert("alice".to_string(), row);

        save_leaderboard(&dir, &matrix).unwrap();
        let reloaded = load_leaderboard(&dir).unwrap();
        assert_eq!(reloaded, matrix);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn civil_date_matches_known_epoch_day() {
        assert_eq!(civil_date_from_days(0), (1970, 1, 1));
    }

    #[test]
    fn missing_snapshot_files_load_as_defaults() {
        let dir = std::env::temp_dir().join(format!("competition-server-test-missing-{}", now_unix_seconds()));
        assert_eq!(load_leaderboard(&dir).unwrap(), LeaderboardMatrix::default());
        assert_eq!(load_misc(&dir).unwrap().total_num_played_games, 0);
    }
}
