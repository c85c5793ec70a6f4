//! The simulated environment each [`crate::game::Game`] drives.
//!
//! The real physics/simulation environment is an external collaborator (see
//! spec §1, out of scope): this module defines only the narrow trait a Game
//! needs — `reset`/`step`/`obs_for_side` — plus a small deterministic stand-in
//! (`HockeyEnvironment`) that implements a plausible two-player hockey episode
//! well enough to exercise and test the server's match lifecycle without a
//! real simulator dependency.

use wire::{Action, InfoMap, Observation, Side, Winner, ACTION_LEN, OBSERVATION_LEN};

/// Result of one [`Environment::step`] call.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Observation for side one (slot 0) after the step.
    pub obs_primary: Observation,
    pub reward: f32,
    pub done: bool,
    pub info: InfoMap,
}

/// The narrow interface a [`crate::game::Game`] needs from its simulator.
///
/// Implementations are not required to be thread-safe; one instance lives
/// inside exactly one Game, touched only from the reactor task.
pub trait Environment: Send {
    /// Resets for a new episode. `starting_side` indicates which side serves /
    /// is otherwise favored by the opening state; returns the observation for
    /// side one immediately after the reset.
    fn reset(&mut self, starting_side: Side) -> Observation;

    /// Advances the simulation by one tick given both sides' concatenated actions.
    fn step(&mut self, joint_action: [f32; ACTION_LEN * 2]) -> StepOutcome;

    /// Returns the current observation as seen from `side` (mirrored for side two).
    fn obs_for_side(&self, side: Side) -> Observation;
}

/// World bounds; puck crossing `+/-GOAL_LINE` ends the episode.
const GOAL_LINE: f32 = 1.0;
/// Episodes end in a draw if no goal is scored within this many ticks.
const MAX_STEPS_PER_EPISODE: u32 = 400;
const DT: f32 = 1.0 / 60.0;
const PLAYER_ACCEL: f32 = 6.0;
const MAX_PLAYER_SPEED: f32 = 3.0;
const PUCK_DAMPING: f32 = 0.995;
const COLLISION_RADIUS: f32 = 0.12;

#[derive(Debug, Clone, Copy, Default)]
struct Body {
    x: f32,
    y: f32,
    angle: f32,
    vx: f32,
    vy: f32,
    angular_vel: f32,
}

/// A tiny deterministic xorshift generator, used only to give the initial
/// puck velocity a seed-dependent nudge. Not cryptographic; just enough to
/// satisfy "deterministic given seed" without pulling distribution logic
/// into the environment.
struct XorShift64(u64);

impl XorShift64 {
    fn next_f32(&mut self) -> f32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        ((x >> 40) as f32 / (1u64 << 24) as f32) - 0.5
    }
}

/// Deterministic stand-in for the real hockey simulator.
///
/// Not a physically accurate hockey game — it exists to let `Game` be built
/// and tested against a concrete `Environment` without depending on the
/// external simulator named in the spec.
pub struct HockeyEnvironment {
    seed: u64,
    player_one: Body,
    player_two: Body,
    puck: Body,
    steps_this_episode: u32,
}

impl HockeyEnvironment {
    pub fn new(seed: u64) -> Self {
        HockeyEnvironment {
            seed,
            player_one: Body::default(),
            player_two: Body::default(),
            puck: Body::default(),
            steps_this_episode: 0,
        }
    }

    fn self_opponent_puck(&self, side: Side) -> Observation {
        let (self_body, opp_body, mirror) = match side {
            Side::One => (self.player_one, self.player_two, 1.0),
            Side::Two => (self.player_two, self.player_one, -1.0),
        };

        let mut obs = [0.0f32; OBSERVATION_LEN];
        obs[0] = self_body.x * mirror;
        obs[1] = self_body.y;
        obs[2] = self_body.angle;
        obs[3] = self_body.vx * mirror;
        obs[4] = self_body.vy;
        obs[5] = self_body.angular_vel;

        obs[6] = opp_body.x * mirror;
        obs[7] = opp_body.y;
        obs[8] = opp_body.angle;
        obs[9] = opp_body.vx * mirror;
        obs[10] = opp_body.vy;
        obs[11] = opp_body.angular_vel;

        obs[12] = self.puck.x * mirror;
        obs[13] = self.puck.y;
        obs[14] = self.puck.vx * mirror;
        obs[15] = self.puck.vy;

        obs
    }

    fn resolve_player_puck_collision(player: &mut Body, puck: &mut Body) {
        let dx = puck.x - player.x;
        let dy = puck.y - player.y;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist > 0.0 && dist < COLLISION_RADIUS {
            let nx = dx / dist;
            let ny = dy / dist;
            let overlap = COLLISION_RADIUS - dist;
            puck.x += nx * overlap;
            puck.y += ny * overlap;

            let relative_speed = player.vx * nx + player.vy * ny;
            puck.vx += nx * (relative_speed.abs() + 1.0);
            puck.vy += ny * (relative_speed.abs() + 1.0);
        }
    }
}

impl Environment for HockeyEnvironment {
    fn reset(&mut self, starting_side: Side) -> Observation {
        self.player_one = Body {
            x: -0.5,
            ..Body::default()
        };
        self.player_two = Body {
            x: 0.5,
            ..Body::default()
        };

        let mut rng = XorShift64(self.seed.wrapping_add(self.steps_this_episode as u64).wrapping_mul(2654435761).max(1));
        let serve_direction = match starting_side {
            Side::One => -1.0,
            Side::Two => 1.0,
        };
        self.puck = Body {
            x: 0.0,
            y: 0.0,
            vx: serve_direction * 0.2 + rng.next_f32() * 0.05,
            vy: rng.next_f32() * 0.05,
            ..Body::default()
        };
        self.steps_this_episode = 0;

        self.self_opponent_puck(Side::One)
    }

    fn step(&mut self, joint_action: [f32; ACTION_LEN * 2]) -> StepOutcome {
        let action_one: Action = joint_action[0..ACTION_LEN].try_into().unwrap();
        let action_two: Action = joint_action[ACTION_LEN..2 * ACTION_LEN].try_into().unwrap();

        for (body, action) in [
            (&mut self.player_one, action_one),
            (&mut self.player_two, action_two),
        ] {
            body.vx += action[0] * PLAYER_ACCEL * DT;
            body.vy += action[1] * PLAYER_ACCEL * DT;
            body.angular_vel += action[2] * DT;
            body.angle += body.angular_vel * DT;

            let speed = (body.vx * body.vx + body.vy * body.vy).sqrt();
            if speed > MAX_PLAYER_SPEED {
                body.vx = body.vx / speed * MAX_PLAYER_SPEED;
                body.vy = body.vy / speed * MAX_PLAYER_SPEED;
            }

            body.x = (body.x + body.vx * DT).clamp(-GOAL_LINE, GOAL_LINE);
            body.y = (body.y + body.vy * DT).clamp(-GOAL_LINE, GOAL_LINE);

            // action[3] ("shoot") reserved for a future shot mechanic; validated
            // by schema but not consumed by this stand-in physics.
            let _ = action[3];
        }

        Self::resolve_player_puck_collision(&mut self.player_one, &mut self.puck);
        Self::resolve_player_puck_collision(&mut self.player_two, &mut self.puck);

        self.puck.x += self.puck.vx * DT;
        self.puck.y += self.puck.vy * DT;
        self.puck.vx *= PUCK_DAMPING;
        self.puck.vy *= PUCK_DAMPING;
        if self.puck.y.abs() >= GOAL_LINE {
            self.puck.y = self.puck.y.clamp(-GOAL_LINE, GOAL_LINE);
            self.puck.vy = -self.puck.vy;
        }

        self.steps_this_episode += 1;

        let mut winner = None;
        if self.puck.x <= -GOAL_LINE {
            winner = Some(Winner::PlayerTwo);
        } else if self.puck.x >= GOAL_LINE {
            winner = Some(Winner::PlayerOne);
        } else if self.steps_this_episode >= MAX_STEPS_PER_EPISODE {
            winner = Some(Winner::Draw);
        }

        let done = winner.is_some();
        let info = match winner {
            Some(w) => InfoMap::with_winner(w),
            None => InfoMap::default(),
        };
        let reward = match winner {
            Some(Winner::PlayerOne) => 1.0,
            Some(Winner::PlayerTwo) => -1.0,
            _ => 0.0,
        };

        StepOutcome {
            obs_primary: self.self_opponent_puck(Side::One),
            reward,
            done,
            info,
        }
    }

    fn obs_for_side(&self, side: Side) -> Observation {
        self.self_opponent_puck(side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_places_players_symmetrically() {
        let mut env = HockeyEnvironment::new(42);
        let obs_one = env.reset(Side::One);
        let obs_two = env.obs_for_side(Side::Two);

        assert_eq!(obs_one[0], -0.5);
        assert_eq!(obs_two[0], -0.5); // mirrored: player two sees itself at -0.5 too
    }

    #[test]
    fn same_seed_and_actions_reproduce_identical_observations() {
        let run = |seed: u64| {
            let mut env = HockeyEnvironment::new(seed);
            env.reset(Side::One);
            let mut last = env.self_opponent_puck(Side::One);
            for i in 0..20 {
                let a = (i as f32) * 0.01;
                let outcome = env.step([a, -a, 0.0, 0.0, -a, a, 0.0, 0.0]);
                last = outcome.obs_primary;
            }
            last
        };

        assert_eq!(run(7), run(7));
    }

    #[test]
    fn episode_times_out_as_a_draw_with_no_motion() {
        let mut env = HockeyEnvironment::new(1);
        env.reset(Side::One);
        let mut last_done = false;
        let mut last_info = InfoMap::default();
        for _ in 0..MAX_STEPS_PER_EPISODE {
            let outcome = env.step([0.0; ACTION_LEN * 2]);
            last_done = outcome.done;
            last_info = outcome.info;
        }
        assert!(last_done);
        assert_eq!(last_info.winner, Some(Winner::Draw.to_code()));
    }

    #[test]
    fn strong_shove_toward_goal_eventually_ends_episode() {
        let mut env = HockeyEnvironment::new(3);
        env.reset(Side::Two);
        let mut done = false;
        for _ in 0..MAX_STEPS_PER_EPISODE {
            let outcome = env.step([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
            if outcome.done {
                done = true;
                break;
            }
        }
        assert!(done);
    }
}
