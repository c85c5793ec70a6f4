//! Global registries, rating/leaderboard mutation, and the maintenance task
//! (spec §4.4). This is the reactor's owned state: every method here runs on
//! the single event-loop task, so no locking is needed (spec §5).

use std::collections::HashMap;
use std::path::PathBuf;

use log::{info, warn};
use rand::rngs::ThreadRng;
use skillratings::trueskill::{trueskill, TrueSkillConfig, TrueSkillRating};
use skillratings::Outcomes;
use wire::{GameStartInfo, Side};

use crate::avatar::Avatar;
use crate::client::{Client, ClientState, RemoteOutcome, RemoteSender};
use crate::environment::{Environment, HockeyEnvironment};
use crate::game::{Game, GameState, TickEffect};
use crate::matchmaker;
use crate::persistence::{self, LeaderboardCell, LeaderboardMatrix, MiscRecord, ReplayRecord, StatsPoint, StatsSeries};

pub struct ServerCore {
    pub avatars: HashMap<String, Avatar>,
    pub clients: HashMap<String, Client>,
    pub games: HashMap<String, Game>,
    pub client_to_game: HashMap<String, String>,
    pub leaderboard: LeaderboardMatrix,
    pub stats: StatsSeries,
    pub total_num_played_games: u64,
    pub working_dir: PathBuf,
    trueskill_config: TrueSkillConfig,
    next_env_seed: u64,
}

impl ServerCore {
    pub fn new(working_dir: PathBuf) -> std::io::Result<Self> {
        let avatars = persistence::load_all_avatars(&working_dir)?
            .into_iter()
            .map(|record| (record.username.clone(), Avatar::from_record(record)))
            .collect();
        let leaderboard = persistence::load_leaderboard(&working_dir)?;
        let stats = persistence::load_stats(&working_dir)?;
        let misc = persistence::load_misc(&working_dir)?;

        Ok(ServerCore {
            avatars,
            clients: HashMap::new(),
            games: HashMap::new(),
            client_to_game: HashMap::new(),
            leaderboard,
            stats,
            total_num_played_games: misc.total_num_played_games,
            working_dir,
            trueskill_config: TrueSkillConfig::default(),
            next_env_seed: 1,
        })
    }

    fn fresh_client_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
    }

    fn fresh_game_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
    }

    /// Registers a freshly authenticated connection, creating its Avatar if
    /// this username has never been seen before (spec §3).
    pub fn register_client(&mut self, username: String, remote: RemoteSender) -> String {
        self.avatars.entry(username.clone()).or_insert_with(|| Avatar::new(username.clone()));
        let avatar = self.avatars.get_mut(&username).unwrap();
        avatar.attached_clients += 1;

        let client_id = Self::fresh_client_id();
        let client = Client::new(client_id.clone(), username, remote);
        self.clients.insert(client_id.clone(), client);
        client_id
    }

    pub fn check_compatibility(&self, client_id: &str, client_version: u32) -> Option<RemoteOutcome> {
        let client = self.clients.get(client_id)?;
        if client_version == crate::SERVER_VERSION {
            Some(client.send_compatible())
        } else {
            let mismatch = crate::error::VersionMismatch {
                client_version,
                server_version: crate::SERVER_VERSION,
            };
            warn!("client {client_id}: {mismatch}");
            Some(client.send_version_mismatch(crate::SERVER_VERSION))
        }
    }

    pub fn request_stats(&self, client_id: &str) -> Option<RemoteOutcome> {
        let client = self.clients.get(client_id)?;
        let avatar = self.avatars.get(&client.username)?;
        let reply = client.stats_reply(avatar);
        Some(client.send_stats(reply))
    }

    /// `start_queuing` (spec §4.1, §4.3): idempotent; on the real transition,
    /// hands the client to the matchmaker.
    pub fn start_queuing(&mut self, client_id: &str) {
        let began = match self.clients.get_mut(client_id) {
            Some(client) => client.begin_queuing(),
            None => return,
        };
        if !began {
            return;
        }
        self.matchmake(client_id);
    }

    fn matchmake(&mut self, client_id: &str) {
        let queuer_username = match self.clients.get(client_id) {
            Some(c) => c.username.clone(),
            None => return,
        };
        let queuer_rating: TrueSkillRating = self
            .avatars
            .get(&queuer_username)
            .map(|a| a.rating.into())
            .unwrap_or_default();

        let waiting_games = self.games.iter().filter(|(_, g)| g.state == GameState::WaitingForPlayer).map(|(id, g)| (id.as_str(), g));
        let candidates = matchmaker::eligible_games(waiting_games, &self.clients, &self.avatars, &queuer_username);
        let total_connected = self.clients.len();

        let chosen_game_id = if matchmaker::should_weight_match(candidates.len(), total_connected) {
            let mut rng = ThreadRng::default();
            matchmaker::select_weighted(&mut rng, &candidates, queuer_rating, &self.trueskill_config)
        } else {
            None
        };

        match chosen_game_id {
            Some(game_id) => self.join_game(&game_id, client_id),
            None => self.open_new_game(client_id),
        }
    }

    fn open_new_game(&mut self, client_id: &str) {
        let game_id = Self::fresh_game_id();
        info!("opening new waiting game {game_id} for client {client_id}");
        self.games.insert(game_id.clone(), Game::new_waiting(game_id.clone(), client_id.to_string()));
        self.client_to_game.insert(client_id.to_string(), game_id);
    }

    fn join_game(&mut self, game_id: &str, client_id: &str) {
        let seed = self.next_env_seed;
        self.next_env_seed = self.next_env_seed.wrapping_add(1);
        let env: Box<dyn Environment> = Box::new(HockeyEnvironment::new(seed));

        let game = match self.games.get_mut(game_id) {
            Some(g) => g,
            None => return self.open_new_game(client_id),
        };
        let obs = game.start(client_id.to_string(), env);
        self.client_to_game.insert(client_id.to_string(), game_id.to_string());

        let player_one_id = game.slots[0].clone().unwrap();
        let player_two_id = client_id.to_string();
        let (player_one_name, player_two_name) = (
            self.clients.get(&player_one_id).map(|c| c.username.clone()).unwrap_or_default(),
            self.clients.get(&player_two_id).map(|c| c.username.clone()).unwrap_or_default(),
        );
        let info = GameStartInfo {
            id: game_id.to_string(),
            player_one: player_one_name,
            player_two: player_two_name,
        };

        info!("game {game_id} starts between {} and {}", info.player_one, info.player_two);

        let outcome_one = self
            .clients
            .get_mut(&player_one_id)
            .map(|c| c.game_starts(game_id, obs[0], info.clone()));
        let outcome_two = self
            .clients
            .get_mut(&player_two_id)
            .map(|c| c.game_starts(game_id, obs[1], info));

        if outcome_one == Some(RemoteOutcome::Dead) {
            self.detach_client(&player_one_id);
        }
        if outcome_two == Some(RemoteOutcome::Dead) {
            self.detach_client(&player_two_id);
        }
    }

    /// `stop_queuing` (spec §4.1): aborts whatever game this client is
    /// currently attached to, whether still waiting or already running.
    pub fn stop_queuing(&mut self, client_id: &str) {
        let stopped = match self.clients.get_mut(client_id) {
            Some(client) => client.stop_queuing(),
            None => return,
        };
        if !stopped {
            return;
        }
        if let Some(game_id) = self.client_to_game.get(client_id).cloned() {
            self.abort_game(&game_id, "Stop queuing");
        }
    }

    /// `receive_action` (spec §4.1, §4.2): routed to the client's Game; a
    /// step from a client not in any game is silently ignored
    /// (`UnknownClientInGame`, spec §7).
    pub fn receive_action(&mut self, client_id: &str, action: wire::Action) {
        let game_id = match self.client_to_game.get(client_id) {
            Some(id) => id.clone(),
            None => return,
        };
        let side = match self.games.get(&game_id).and_then(|g| g.slot_of(client_id)) {
            Some(s) => s,
            None => return,
        };

        let effect = match self.games.get_mut(&game_id) {
            Some(g) => g.receive_action(side, action),
            None => return,
        };

        match effect {
            TickEffect::AwaitingPeers => {}
            TickEffect::CorrectiveEcho { side } => self.deliver_echo(&game_id, side),
            TickEffect::Advanced { obs, reward, done, info } => {
                self.deliver_observations(&game_id, obs, reward, done, info);
            }
            TickEffect::Finalize { .. } => {
                self.finalize_game(&game_id);
            }
        }
    }

    fn deliver_echo(&mut self, game_id: &str, side: Side) {
        let Some(game) = self.games.get(game_id) else { return };
        let Some(client_id) = game.slots[side.index()].clone() else { return };
        let (obs, reward, done, info) = game.last_for_side(side);
        if let Some(client) = self.clients.get(&client_id) {
            if client.send_observation(obs, reward, done, info) == RemoteOutcome::Dead {
                self.detach_client(&client_id);
            }
        }
    }

    fn deliver_observations(&mut self, game_id: &str, obs: [wire::Observation; 2], reward: f32, done: bool, info: wire::InfoMap) {
        let Some(game) = self.games.get(game_id) else { return };
        let slot_ids: Vec<Option<String>> = game.slots.to_vec();

        for (i, slot) in slot_ids.into_iter().enumerate() {
            let Some(client_id) = slot else { continue };
            if let Some(client) = self.clients.get(&client_id) {
                if client.send_observation(obs[i], reward, done, info.clone()) == RemoteOutcome::Dead {
                    self.detach_client(&client_id);
                }
            }
        }
    }

    /// Finalizes a Game that just reached its episode cap (spec §4.2,
    /// "Finalization"): per-client results, replay persistence, rating and
    /// leaderboard updates, then teardown.
    fn finalize_game(&mut self, game_id: &str) {
        let Some(game) = self.games.get(game_id) else { return };
        let (player_one_id, player_two_id) = match (game.slots[0].clone(), game.slots[1].clone()) {
            (Some(a), Some(b)) => (a, b),
            _ => return,
        };
        let result_one = game.match_result_for(Side::One);
        let result_two = game.match_result_for(Side::Two);
        let episode_outcomes = game.episode_outcomes.clone();
        let transitions = game.transitions.clone();

        let (player_one_name, player_two_name) = (
            self.clients.get(&player_one_id).map(|c| c.username.clone()).unwrap_or_default(),
            self.clients.get(&player_two_id).map(|c| c.username.clone()).unwrap_or_default(),
        );

        for (winner_code, a, b) in episode_outcomes.iter().map(|&w| (w, player_one_name.clone(), player_two_name.clone())) {
            self.apply_episode_outcome(winner_code, &a, &b);
        }

        for outcome in &episode_outcomes {
            match outcome {
                1 => self.bump_avatar_counter(&player_one_name, 1, 0, 0),
                -1 => self.bump_avatar_counter(&player_one_name, 0, 1, 0),
                _ => self.bump_avatar_counter(&player_one_name, 0, 0, 1),
            }
            match outcome {
                1 => self.bump_avatar_counter(&player_two_name, 0, 1, 0),
                -1 => self.bump_avatar_counter(&player_two_name, 1, 0, 0),
                _ => self.bump_avatar_counter(&player_two_name, 0, 0, 1),
            }
        }

        if let Some(avatar) = self.avatars.get_mut(&player_one_name) {
            avatar.finished_games_ids.push(game_id.to_string());
        }
        if let Some(avatar) = self.avatars.get_mut(&player_two_name) {
            avatar.finished_games_ids.push(game_id.to_string());
        }

        let timestamp = persistence::now_unix_seconds();
        let replay = ReplayRecord {
            identifier: game_id.to_string(),
            player_one: player_one_name.clone(),
            player_two: player_two_name.clone(),
            timestamp,
            transitions,
        };
        if let Err(e) = persistence::save_replay(&self.working_dir, &replay) {
            warn!("failed to persist replay for game {game_id}: {e}");
        }

        let (obs_one, reward_one, done_one, info_one) = self.games.get(game_id).unwrap().last_for_side(Side::One);
        let (obs_two, reward_two, done_two, info_two) = self.games.get(game_id).unwrap().last_for_side(Side::Two);

        // Tear the game down before notifying clients: game_done may detect a
        // dead transport and detach the client, which must not re-enter this
        // same (already-finalized) game via the abort-on-detach path.
        self.total_num_played_games += 1;
        self.client_to_game.remove(&player_one_id);
        self.client_to_game.remove(&player_two_id);
        self.games.remove(game_id);

        let outcome_one = self
            .clients
            .get_mut(&player_one_id)
            .map(|c| c.game_done(obs_one, reward_one, done_one, info_one, result_one));
        let outcome_two = self
            .clients
            .get_mut(&player_two_id)
            .map(|c| c.game_done(obs_two, reward_two, done_two, info_two, result_two));

        if outcome_one == Some(RemoteOutcome::Dead) {
            self.detach_client(&player_one_id);
        }
        if outcome_two == Some(RemoteOutcome::Dead) {
            self.detach_client(&player_two_id);
        }
    }

    fn bump_avatar_counter(&mut self, username: &str, won: u64, lost: u64, drawn: u64) {
        if let Some(avatar) = self.avatars.get_mut(username) {
            avatar.games_won += won;
            avatar.games_lost += lost;
            avatar.games_drawn += drawn;
            avatar.finished_games += won + lost + drawn;
        }
    }

    fn apply_episode_outcome(&mut self, winner_code: i32, player_one_username: &str, player_two_username: &str) {
        let old_one: TrueSkillRating = self.avatars.get(player_one_username).map(|a| a.rating.into()).unwrap_or_default();
        let old_two: TrueSkillRating = self.avatars.get(player_two_username).map(|a| a.rating.into()).unwrap_or_default();

        let outcome = match winner_code {
            1 => Outcomes::WIN,
            -1 => Outcomes::LOSS,
            _ => Outcomes::DRAW,
        };

        let (rated_one, rated_two) = trueskill(&old_one, &old_two, &outcome, &self.trueskill_config);

        let (final_one, final_two) = if winner_code == 0 {
            (blend(rated_one, old_one), blend(rated_two, old_two))
        } else {
            (rated_one, rated_two)
        };

        if let Some(avatar) = self.avatars.get_mut(player_one_username) {
            avatar.rating = final_one.into();
        }
        if let Some(avatar) = self.avatars.get_mut(player_two_username) {
            avatar.rating = final_two.into();
        }

        self.record_leaderboard_outcome(winner_code, player_one_username, player_two_username);
    }

    fn record_leaderboard_outcome(&mut self, winner_code: i32, a: &str, b: &str) {
        let (result_a, result_b) = match winner_code {
            1 => (Outcome::Win, Outcome::Loss),
            -1 => (Outcome::Loss, Outcome::Win),
            _ => (Outcome::Draw, Outcome::Draw),
        };
        bump_cell(&mut self.leaderboard, a, b, result_a);
        bump_cell(&mut self.leaderboard, a, "total", result_a);
        bump_cell(&mut self.leaderboard, b, a, result_b);
        bump_cell(&mut self.leaderboard, b, "total", result_b);
    }

    /// `abort_game` (spec §4.2, "Abort"): idempotent teardown that informs
    /// every still-attached client. No replay is persisted.
    pub fn abort_game(&mut self, game_id: &str, msg: &str) {
        let Some(game) = self.games.get_mut(game_id) else { return };
        if !game.abort() {
            return;
        }
        let slots = game.slots.clone();
        info!("game {game_id} aborted: {msg}");

        for slot in slots.into_iter().flatten() {
            self.client_to_game.remove(&slot);
            if let Some(client) = self.clients.get_mut(&slot) {
                if client.game_aborted(msg) == RemoteOutcome::Dead {
                    self.detach_client(&slot);
                }
            }
        }
        self.games.remove(game_id);
    }

    /// Detaches a client: removes it from the registry (so a dead-transport
    /// send discovered while aborting its game can't re-enter here for the
    /// same id) and aborts its in-flight game, if any, with "Player <name>
    /// left the game".
    pub fn detach_client(&mut self, client_id: &str) {
        let Some(mut client) = self.clients.remove(client_id) else { return };
        client.detach();
        let username = client.username;

        if let Some(avatar) = self.avatars.get_mut(&username) {
            avatar.attached_clients = avatar.attached_clients.saturating_sub(1);
        }

        if let Some(game_id) = self.client_to_game.remove(client_id) {
            self.abort_game(&game_id, &format!("Player {username} left the game"));
        }
    }

    /// Runs the 10-second maintenance sweep (spec §4.4).
    pub fn run_maintenance(&mut self) {
        let timed_out: Vec<String> = self
            .games
            .iter()
            .filter(|(_, g)| g.is_timed_out(crate::GAME_TIMEOUT))
            .map(|(id, _)| id.clone())
            .collect();
        for game_id in timed_out {
            self.abort_game(&game_id, "Game aborted due to timeout (2 min)");
        }

        let dead: Vec<String> = self
            .clients
            .iter()
            .filter(|(_, c)| c.is_transport_dead())
            .map(|(id, _)| id.clone())
            .collect();
        for client_id in dead {
            self.detach_client(&client_id);
        }

        self.sample_stats();
        self.persist_snapshots();
    }

    fn sample_stats(&mut self) {
        let now = persistence::now_unix_seconds();
        let mut sample = |series: &mut StatsSeries, name: &str, value: u64| {
            series.entry(name.to_string()).or_default().push(StatsPoint { timestamp: now, value });
        };

        let idle = self.clients.values().filter(|c| c.state == ClientState::Idle).count() as u64;
        let waiting_clients = self.clients.values().filter(|c| c.state == ClientState::WaitingForGame).count() as u64;
        let playing_clients = self.clients.values().filter(|c| c.state == ClientState::Playing).count() as u64;
        let waiting_games = self.games.values().filter(|g| g.state == GameState::WaitingForPlayer).count() as u64;
        let running_games = self.games.values().filter(|g| g.state == GameState::GameRunning).count() as u64;
        let active_avatars = self.avatars.values().filter(|a| a.attached_clients > 0).count() as u64;

        sample(&mut self.stats, "total_games_ever_played", self.total_num_played_games);
        sample(&mut self.stats, "open_games", self.games.len() as u64);
        sample(&mut self.stats, "waiting_games", waiting_games);
        sample(&mut self.stats, "running_games", running_games);
        sample(&mut self.stats, "active_avatars", active_avatars);
        sample(&mut self.stats, "connected_clients", self.clients.len() as u64);
        sample(&mut self.stats, "idle_clients", idle);
        sample(&mut self.stats, "waiting_clients", waiting_clients);
        sample(&mut self.stats, "playing_clients", playing_clients);
    }

    /// Persists avatars, leaderboard, stats, and misc. Logged and ignored on
    /// I/O failure; the next maintenance tick retries (spec §7).
    pub fn persist_snapshots(&mut self) {
        for avatar in self.avatars.values() {
            if let Err(e) = persistence::save_avatar(&self.working_dir, &avatar.to_record()) {
                warn!("failed to persist avatar {}: {e}", avatar.username);
            }
        }
        if let Err(e) = persistence::save_leaderboard(&self.working_dir, &self.leaderboard) {
            warn!("failed to persist leaderboard: {e}");
        }
        if let Err(e) = persistence::save_stats(&self.working_dir, &self.stats) {
            warn!("failed to persist stats: {e}");
        }
        if let Err(e) = persistence::save_misc(&self.working_dir, &MiscRecord { total_num_played_games: self.total_num_played_games }) {
            warn!("failed to persist misc record: {e}");
        }
    }

    pub fn list_all_games(&self) -> String {
        if self.games.is_empty() {
            return "no open games".to_string();
        }
        let mut lines = Vec::new();
        for (id, game) in &self.games {
            lines.push(format!(
                "{id:8} state={:?} episodes={}/{}",
                game.state, game.episodes_played, game.episodes_cap
            ));
        }
        lines.sort();
        lines.join("\n")
    }

    pub fn list_avatars(&self) -> String {
        if self.avatars.is_empty() {
            return "no avatars".to_string();
        }
        let mut lines = Vec::new();
        for avatar in self.avatars.values() {
            lines.push(format!(
                "{:20} clients={:<3} finished={:<5} won={:<5} lost={:<5} drawn={:<5} mu={:.1} sigma={:.1}",
                avatar.username, avatar.attached_clients, avatar.finished_games, avatar.games_won, avatar.games_lost, avatar.games_drawn,
                avatar.rating.mu, avatar.rating.sigma
            ));
        }
        lines.sort();
        lines.join("\n")
    }

    pub fn show_leaderboard_matrix(&self) -> String {
        if self.leaderboard.is_empty() {
            return "leaderboard is empty".to_string();
        }
        let mut lines = Vec::new();
        let mut players: Vec<&String> = self.leaderboard.keys().collect();
        players.sort();
        for player in players {
            let row = &self.leaderboard[player];
            let mut opponents: Vec<&String> = row.keys().collect();
            opponents.sort();
            for opponent in opponents {
                let cell = &row[opponent];
                lines.push(format!(
                    "{player:16} vs {opponent:16} wins={:<4} losses={:<4} draws={:<4}",
                    cell.wins, cell.losses, cell.draws
                ));
            }
        }
        lines.join("\n")
    }
}

fn blend(rated: TrueSkillRating, old: TrueSkillRating) -> TrueSkillRating {
    TrueSkillRating {
        rating: 0.1 * rated.rating + 0.9 * old.rating,
        uncertainty: 0.1 * rated.uncertainty + 0.9 * old.uncertainty,
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Win,
    Loss,
    Draw,
}

fn bump_cell(matrix: &mut LeaderboardMatrix, player: &str, key: &str, outcome: Outcome) {
    let cell = matrix.entry(player.to_string()).or_default().entry(key.to_string()).or_insert_with(LeaderboardCell::default);
    match outcome {
        Outcome::Win => cell.wins += 1,
        Outcome::Loss => cell.losses += 1,
        Outcome::Draw => cell.draws += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn new_core() -> ServerCore {
        let dir = std::env::temp_dir().join(format!("competition-server-core-test-{}", uuid::Uuid::new_v4().simple()));
        ServerCore::new(dir).unwrap()
    }

    fn register(core: &mut ServerCore, username: &str) -> (String, mpsc::UnboundedReceiver<wire::Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = core.register_client(username.to_string(), tx);
        (id, rx)
    }

    #[test]
    fn leaderboard_stays_symmetric_after_a_win() {
        let mut core = new_core();
        core.apply_episode_outcome(1, "alice", "bob");
        let alice_vs_bob = core.leaderboard["alice"]["bob"];
        let bob_vs_alice = core.leaderboard["bob"]["alice"];
        assert_eq!(alice_vs_bob.wins, bob_vs_alice.losses);
        assert_eq!(alice_vs_bob.draws, bob_vs_alice.draws);
    }

    #[test]
    fn draw_blends_rating_update_at_ten_percent() {
        let mut core = new_core();
        core.avatars.insert("alice".to_string(), Avatar::new("alice"));
        core.avatars.insert("bob".to_string(), Avatar::new("bob"));
        let before = core.avatars["alice"].rating;

        core.apply_episode_outcome(0, "alice", "bob");

        let after = core.avatars["alice"].rating;
        assert!((after.mu - before.mu).abs() < 1.0, "draw blending should only nudge rating slightly");
    }

    #[test]
    fn matchmaking_opens_a_new_game_below_threshold() {
        let mut core = new_core();
        let (alice_id, _rx) = register(&mut core, "alice");
        core.start_queuing(&alice_id);
        assert_eq!(core.games.len(), 1);
        assert!(core.games.values().next().unwrap().state == GameState::WaitingForPlayer);
    }

    #[test]
    fn basic_opponents_never_pair_with_each_other() {
        let mut core = new_core();
        let (weak_id, _rx1) = register(&mut core, "BasicOpponent_weak");
        let (strong_id, _rx2) = register(&mut core, "BasicOpponent_strong");
        core.start_queuing(&weak_id);
        core.start_queuing(&strong_id);
        assert_eq!(core.games.len(), 2, "each BasicOpponent should end up in its own waiting game");
    }

    #[test]
    fn stop_queuing_from_idle_is_a_harmless_noop() {
        let mut core = new_core();
        let (alice_id, _rx) = register(&mut core, "alice");
        core.stop_queuing(&alice_id);
        assert_eq!(core.games.len(), 0);
    }

    #[test]
    fn detaching_a_waiting_client_tears_down_its_game() {
        let mut core = new_core();
        let (alice_id, _rx) = register(&mut core, "alice");
        core.start_queuing(&alice_id);
        assert_eq!(core.games.len(), 1);

        core.detach_client(&alice_id);
        assert_eq!(core.games.len(), 0);
        assert!(!core.clients.contains_key(&alice_id));
    }
}
