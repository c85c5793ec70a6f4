//! Quality-plus-wait-bonus opponent selection (spec §4.3).

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use skillratings::trueskill::{match_quality_trueskill, TrueSkillConfig, TrueSkillRating};
use std::time::Instant;

use crate::avatar::Avatar;
use crate::client::Client;
use crate::game::Game;

/// One candidate waiting game, as seen by the matchmaker.
pub struct EligibleGame<'a> {
    pub game_id: &'a str,
    pub waiting_avatar_username: &'a str,
    pub waiting_rating: TrueSkillRating,
    pub last_op_ts: Instant,
}

/// Whether `game` (with its single waiting client `g0`) may be matched with
/// `queuer`: distinct avatars, and not a BasicOpponent-vs-BasicOpponent pair
/// (spec §4.3).
pub fn is_eligible(waiting_username: &str, queuer_username: &str) -> bool {
    if waiting_username == queuer_username {
        return false;
    }
    !(waiting_username.contains("BasicOpponent") && queuer_username.contains("BasicOpponent"))
}

/// Filters `waiting_games` down to those eligible to match against `queuer`.
pub fn eligible_games<'a>(
    waiting_games: impl Iterator<Item = (&'a str, &'a Game)>,
    clients: &'a std::collections::HashMap<String, Client>,
    avatars: &'a std::collections::HashMap<String, Avatar>,
    queuer_username: &str,
) -> Vec<EligibleGame<'a>> {
    waiting_games
        .filter_map(|(id, game)| {
            let waiting_client_id = game.slots[0].as_ref()?;
            let waiting_client = clients.get(waiting_client_id.as_str())?;
            let waiting_avatar = avatars.get(&waiting_client.username)?;
            if !is_eligible(&waiting_avatar.username, queuer_username) {
                return None;
            }
            Some(EligibleGame {
                game_id: id,
                waiting_avatar_username: &waiting_avatar.username,
                waiting_rating: waiting_avatar.rating.into(),
                last_op_ts: game.last_op_ts,
            })
        })
        .collect()
}

/// `|eligible| > N div 6` threshold gate (spec §4.3).
pub fn should_weight_match(eligible_count: usize, total_connected_clients: usize) -> bool {
    eligible_count > total_connected_clients / 6
}

/// Picks one eligible game via `q_i = match_quality + min(1.0, wait_seconds / 300.0)`
/// weighted random choice. Returns the chosen game's id.
pub fn select_weighted<R: Rng>(
    rng: &mut R,
    candidates: &[EligibleGame],
    queuer_rating: TrueSkillRating,
    config: &TrueSkillConfig,
) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }

    let weights: Vec<f64> = candidates
        .iter()
        .map(|c| {
            let quality = match_quality_trueskill(&queuer_rating, &c.waiting_rating, config);
            let wait_seconds = c.last_op_ts.elapsed().as_secs_f64();
            quality + (wait_seconds / 300.0).min(1.0)
        })
        .collect();

    let dist = WeightedIndex::new(&weights).ok()?;
    let idx = dist.sample(rng);
    Some(candidates[idx].game_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_opponent_pair_is_not_eligible() {
        assert!(!is_eligible("BasicOpponent_weak", "BasicOpponent_strong"));
    }

    #[test]
    fn same_avatar_is_not_eligible() {
        assert!(!is_eligible("alice", "alice"));
    }

    #[test]
    fn distinct_non_bot_avatars_are_eligible() {
        assert!(is_eligible("alice", "bob"));
        assert!(is_eligible("BasicOpponent_weak", "alice"));
    }

    #[test]
    fn threshold_gate_matches_spec_scenario_5() {
        assert!(!should_weight_match(0, 5));
        assert!(should_weight_match(3, 12));
        assert!(!should_weight_match(2, 12));
    }

    #[test]
    fn select_weighted_returns_none_for_empty_candidates() {
        let mut rng = rand::thread_rng();
        let config = TrueSkillConfig::default();
        let chosen = select_weighted(&mut rng, &[], TrueSkillRating::default(), &config);
        assert!(chosen.is_none());
    }
}
