//! Per-match state machine (spec §4.2): two client slots sharing one
//! [`Environment`], synchronizing half-actions into full ticks across a
//! fixed number of episodes.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use wire::{Action, InfoMap, Observation, Side, ACTION_LEN, EPISODES_PER_MATCH};

use crate::environment::Environment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    WaitingForPlayer,
    GameRunning,
    Aborted,
    Error,
}

/// One persisted step of the match (spec §3, "Transition record").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub obs_before: Observation,
    pub joint_action: [f32; ACTION_LEN * 2],
    pub obs_after: Observation,
    pub reward: f32,
    pub done: bool,
    pub info: InfoMap,
}

/// What a successfully-processed action should cause the caller to do next.
pub enum TickEffect {
    /// Not enough actions yet to advance; nothing to send.
    AwaitingPeers,
    /// A corrective echo: resend the last known observation for `side`
    /// without advancing the environment (spec §4.2, action validation).
    CorrectiveEcho { side: Side },
    /// A tick advanced; observations for both sides and whether this was
    /// the episode's terminal transition.
    Advanced {
        obs: [Observation; 2],
        reward: f32,
        done: bool,
        info: InfoMap,
    },
    /// The match reached its episode cap on this tick; the caller must
    /// finalize (persist replay, update ratings, notify clients, tear down).
    Finalize {
        obs: [Observation; 2],
        reward: f32,
        done: bool,
        info: InfoMap,
    },
}

/// Per-match state coordinating exactly two client slots.
pub struct Game {
    pub identifier: String,
    /// Non-owning: ids of the clients occupying slot 0 / slot 1.
    pub slots: [Option<String>; 2],
    pub env: Option<Box<dyn Environment>>,
    pub state: GameState,
    last_obs: [Observation; 2],
    last_reward: [f32; 2],
    last_done: [bool; 2],
    last_info: [InfoMap; 2],
    pending_action: [Option<Action>; 2],
    pub last_op_ts: Instant,
    pub episodes_played: u32,
    pub episodes_cap: u32,
    pub episode_outcomes: Vec<i32>,
    pub transitions: Vec<TransitionRecord>,
}

impl Game {
    /// Creates a game with only slot 0 filled, waiting for a second player.
    pub fn new_waiting(identifier: String, first_client_id: String) -> Self {
        Game {
            identifier,
            slots: [Some(first_client_id), None],
            env: None,
            state: GameState::WaitingForPlayer,
            last_obs: [[0.0; wire::OBSERVATION_LEN]; 2],
            last_reward: [0.0; 2],
            last_done: [false; 2],
            last_info: [InfoMap::default(), InfoMap::default()],
            pending_action: [None, None],
            last_op_ts: Instant::now(),
            episodes_played: 0,
            episodes_cap: EPISODES_PER_MATCH,
            episode_outcomes: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Fills slot 1, starts the environment, and returns both sides' opening
    /// observations (spec §4.2, "Starting").
    pub fn start(&mut self, second_client_id: String, mut env: Box<dyn Environment>) -> [Observation; 2] {
        self.slots[1] = Some(second_client_id);
        let obs_one = env.reset(Side::One);
        let obs_two = env.obs_for_side(Side::Two);
        self.env = Some(env);
        self.last_obs = [obs_one, obs_two];
        self.last_op_ts = Instant::now();
        self.state = GameState::GameRunning;
        self.last_obs
    }

    /// Which slot (0 or 1) a client id occupies, if any.
    pub fn slot_of(&self, client_id: &str) -> Option<Side> {
        if self.slots[0].as_deref() == Some(client_id) {
            Some(Side::One)
        } else if self.slots[1].as_deref() == Some(client_id) {
            Some(Side::Two)
        } else {
            None
        }
    }

    /// An action is valid iff all 4 components are finite (spec §4.2;
    /// length is already enforced by the wire schema's `[f32; 4]` type).
    fn is_valid(action: &Action) -> bool {
        action.iter().all(|v| v.is_finite())
    }

    /// Records an action arriving for `side`. Returns the effect the caller
    /// must propagate back to the transport(s).
    pub fn receive_action(&mut self, side: Side, action: Action) -> TickEffect {
        if self.state != GameState::GameRunning {
            return TickEffect::AwaitingPeers;
        }

        if !Self::is_valid(&action) {
            return TickEffect::CorrectiveEcho { side };
        }

        self.pending_action[side.index()] = Some(action);
        self.last_op_ts = Instant::now();

        if self.pending_action[0].is_none() || self.pending_action[1].is_none() {
            return TickEffect::AwaitingPeers;
        }

        self.advance_tick()
    }

    fn advance_tick(&mut self) -> TickEffect {
        let action_one = self.pending_action[0].take().unwrap();
        let action_two = self.pending_action[1].take().unwrap();

        let mut joint = [0.0f32; ACTION_LEN * 2];
        joint[0..ACTION_LEN].copy_from_slice(&action_one);
        joint[ACTION_LEN..].copy_from_slice(&action_two);

        let env = self.env.as_mut().expect("GAME_RUNNING implies env is set");
        let outcome = env.step(joint);
        let obs_secondary = env.obs_for_side(Side::Two);

        self.transitions.push(TransitionRecord {
            obs_before: self.last_obs[0],
            joint_action: joint,
            obs_after: outcome.obs_primary,
            reward: outcome.reward,
            done: outcome.done,
            info: outcome.info.clone(),
        });

        self.last_obs = [outcome.obs_primary, obs_secondary];
        self.last_reward = [outcome.reward, outcome.reward];
        self.last_done = [outcome.done, outcome.done];
        self.last_info = [outcome.info.clone(), outcome.info.clone()];

        if outcome.done {
            let winner = outcome.info.winner.unwrap_or(0);
            self.episode_outcomes.push(winner);
            self.episodes_played += 1;

            if self.episodes_played >= self.episodes_cap {
                return TickEffect::Finalize {
                    obs: self.last_obs,
                    reward: outcome.reward,
                    done: outcome.done,
                    info: outcome.info,
                };
            }

            let starting_side = if self.episodes_played % 2 == 0 { Side::One } else { Side::Two };
            let env = self.env.as_mut().unwrap();
            let obs_one = env.reset(starting_side);
            let obs_two = env.obs_for_side(Side::Two);
            self.last_obs = [obs_one, obs_two];
        }

        TickEffect::Advanced {
            obs: self.last_obs,
            reward: outcome.reward,
            done: outcome.done,
            info: outcome.info,
        }
    }

    /// The last-known observation/reward/done/info for `side`, used for the
    /// corrective echo on an invalid action.
    pub fn last_for_side(&self, side: Side) -> (Observation, f32, bool, InfoMap) {
        let i = side.index();
        (self.last_obs[i], self.last_reward[i], self.last_done[i], self.last_info[i].clone())
    }

    /// Per-client match result derived from `episode_outcomes` (spec §4.2,
    /// "Finalization"): slot 0 wins on `+1`, slot 1 wins on `-1`.
    pub fn match_result_for(&self, side: Side) -> wire::MatchResult {
        let mut result = wire::MatchResult {
            episodes_played: self.episode_outcomes.len() as u32,
            ..Default::default()
        };
        let win_code = match side {
            Side::One => 1,
            Side::Two => -1,
        };
        for &outcome in &self.episode_outcomes {
            if outcome == 0 {
                result.games_drawn += 1;
            } else if outcome == win_code {
                result.games_won += 1;
            } else {
                result.games_lost += 1;
            }
        }
        result
    }

    /// Idempotent abort: returns `true` if this call actually changed state.
    pub fn abort(&mut self) -> bool {
        if self.state == GameState::Aborted {
            return false;
        }
        self.state = GameState::Aborted;
        true
    }

    pub fn is_timed_out(&self, timeout: std::time::Duration) -> bool {
        self.state == GameState::GameRunning && self.last_op_ts.elapsed() > timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::HockeyEnvironment;

    fn started_game() -> Game {
        let mut game = Game::new_waiting("g1".to_string(), "alice".to_string());
        game.start("bob".to_string(), Box::new(HockeyEnvironment::new(1)));
        game
    }

    #[test]
    fn tick_only_advances_once_both_slots_filled() {
        let mut game = started_game();
        let effect = game.receive_action(Side::One, [0.0; ACTION_LEN]);
        assert!(matches!(effect, TickEffect::AwaitingPeers));

        let effect = game.receive_action(Side::Two, [0.0; ACTION_LEN]);
        assert!(matches!(effect, TickEffect::Advanced { .. }));
        assert_eq!(game.transitions.len(), 1);
    }

    #[test]
    fn invalid_action_is_a_corrective_echo_and_preserves_the_other_slot() {
        let mut game = started_game();
        game.receive_action(Side::Two, [0.0; ACTION_LEN]);

        let effect = game.receive_action(Side::One, [f32::NAN, 0.0, 0.0, 0.0]);
        assert!(matches!(effect, TickEffect::CorrectiveEcho { side: Side::One }));
        assert_eq!(game.transitions.len(), 0);
        assert!(game.pending_action[1].is_some());
    }

    #[test]
    fn match_result_counts_wins_losses_draws_per_slot() {
        let mut game = started_game();
        game.episode_outcomes = vec![1, -1, 0, 1];

        let result_one = game.match_result_for(Side::One);
        assert_eq!(result_one.games_won, 2);
        assert_eq!(result_one.games_lost, 1);
        assert_eq!(result_one.games_drawn, 1);

        let result_two = game.match_result_for(Side::Two);
        assert_eq!(result_two.games_won, 1);
        assert_eq!(result_two.games_lost, 2);
        assert_eq!(result_two.games_drawn, 1);
    }

    #[test]
    fn abort_is_idempotent() {
        let mut game = started_game();
        assert!(game.abort());
        assert!(!game.abort());
    }

    #[test]
    fn waiting_for_second_player_never_times_out() {
        let game = Game::new_waiting("g2".to_string(), "alice".to_string());
        assert!(!game.is_timed_out(std::time::Duration::from_secs(0)));
    }
}
