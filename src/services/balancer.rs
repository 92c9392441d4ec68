use std::ops::RangeInclusive;

use crate::error::GameError;
use crate::models::role::{Role, Team};
use crate::ports::RandomPort;

pub const MAX_ATTEMPTS: usize = 500;
pub const EVIL_SHARE: f64 = 0.29;
pub const BALANCE_WINDOW: RangeInclusive<f64> = -0.2..=0.4;

pub fn evil_slots(party_size: usize) -> usize {
    ((party_size as f64 * EVIL_SHARE).round() as usize).max(1)
}

/// Whether `candidate` may join the roles placed so far.
pub fn is_eligible(candidate: Role, placed: &[Role], party_size: usize) -> bool {
    let count = placed.iter().filter(|r| **r == candidate).count();
    if count >= candidate.max_count() || party_size < candidate.min_party_size() {
        return false;
    }
    if candidate == Role::Beholder && !placed.contains(&Role::Seer) {
        return false;
    }
    if candidate.team() == Team::Werewolf
        && !candidate.is_core_wolf()
        && !placed.iter().any(|r| r.is_core_wolf())
    {
        return false;
    }
    true
}

/// (village − werewolf) / werewolf over the strengths of a composition.
/// Jester-team roles count for neither side.
pub fn balance_ratio(roles: &[Role], party_size: usize) -> Option<f64> {
    let team_strength = |team: Team| -> f64 {
        roles
            .iter()
            .filter(|r| r.team() == team)
            .map(|r| r.strength(roles, party_size))
            .sum()
    };
    let village = team_strength(Team::Village);
    let werewolf = team_strength(Team::Werewolf);
    if werewolf <= 0.0 {
        return None;
    }
    Some((village - werewolf) / werewolf)
}

pub fn generate_roles(party_size: usize, rng: &dyn RandomPort) -> Result<Vec<Role>, GameError> {
    if party_size == 0 {
        return Err(GameError::BalancingFailed { party_size });
    }
    let evil = evil_slots(party_size).min(party_size);

    for attempt in 0..MAX_ATTEMPTS {
        let Some(roles) = draw_composition(party_size, evil, rng) else {
            continue;
        };
        match balance_ratio(&roles, party_size) {
            Some(ratio) if BALANCE_WINDOW.contains(&ratio) => {
                log::debug!(
                    "balanced {} roles after {} attempts (ratio {:.2})",
                    party_size,
                    attempt + 1,
                    ratio
                );
                return Ok(roles);
            }
            _ => {}
        }
    }

    log::warn!("role balancing gave up for {} players", party_size);
    Err(GameError::BalancingFailed { party_size })
}

/// One attempt: split the slots into evil and non-evil groups, then fill
/// each slot with an eligible role. `None` when some slot has no candidate.
fn draw_composition(party_size: usize, evil: usize, rng: &dyn RandomPort) -> Option<Vec<Role>> {
    let mut slots = vec![Role::BASELINE; party_size];
    let mut free: Vec<usize> = (0..party_size).collect();
    let mut evil_indices = Vec::with_capacity(evil);
    for _ in 0..evil {
        let pick = rng.gen_index(free.len());
        evil_indices.push(free.swap_remove(pick));
    }

    let mut placed: Vec<Role> = Vec::with_capacity(party_size);
    let groups = [(evil_indices, true), (free, false)];
    for (indices, wolf_side) in groups {
        for slot in indices {
            let candidates: Vec<Role> = Role::ALL
                .iter()
                .copied()
                .filter(|r| (r.team() == Team::Werewolf) == wolf_side)
                .filter(|r| is_eligible(*r, &placed, party_size))
                .collect();
            let role = *rng.choose(&candidates)?;
            slots[slot] = role;
            placed.push(role);
        }
    }
    Some(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evil_slot_count() {
        assert_eq!(evil_slots(1), 1);
        assert_eq!(evil_slots(4), 1);
        assert_eq!(evil_slots(6), 2);
        assert_eq!(evil_slots(10), 3);
        assert_eq!(evil_slots(16), 5);
    }

    #[test]
    fn test_support_wolves_need_a_core_wolf() {
        assert!(!is_eligible(Role::Bartender, &[], 10));
        assert!(is_eligible(Role::Bartender, &[Role::Werewolf], 10));
        assert!(is_eligible(Role::Werewolf, &[], 10));
    }

    #[test]
    fn test_beholder_needs_seer() {
        assert!(!is_eligible(Role::Beholder, &[Role::Villager], 8));
        assert!(is_eligible(Role::Beholder, &[Role::Seer], 8));
    }

    #[test]
    fn test_caps_and_minimum_sizes() {
        assert!(!is_eligible(Role::Seer, &[Role::Seer], 8));
        assert!(!is_eligible(Role::Lunatic, &[Role::Werewolf], 8));
        let pack = [Role::Werewolf; 4];
        assert!(!is_eligible(Role::Werewolf, &pack, 16));
    }

    #[test]
    fn test_ratio_ignores_jester() {
        let roles = [Role::Werewolf, Role::Seer, Role::Villager, Role::Villager];
        let with_jester = [Role::Werewolf, Role::Seer, Role::Villager, Role::Jester];
        // Seer at 4 players: 40 / 5 = 8
        assert_eq!(balance_ratio(&roles, 4), Some((10.0 - 8.0) / 8.0));
        assert_eq!(balance_ratio(&with_jester, 4), Some((9.0 - 8.0) / 8.0));
        assert_eq!(balance_ratio(&[Role::Villager], 1), None);
    }
}
