use crate::models::{
    action::Location,
    game::Game,
    player::{PlayerId, PlayerState},
    role::Role,
};
use crate::ports::RandomPort;

pub const SEARCH_SUCCESS_RATE: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clue {
    pub tag: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Investigation {
    Found(Clue),
    Failed,
    NothingNew,
}

fn pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Every clue `location` could yield right now, stale or not.
pub fn candidates(location: Location, game: &Game, investigator: &PlayerId) -> Vec<Clue> {
    let others: Vec<&PlayerState> = game.living().filter(|p| &p.id != investigator).collect();
    let mut clues = Vec::new();

    match location {
        Location::Tavern => {
            for evil in others.iter().filter(|p| p.is_wolf_team()) {
                for good in others.iter().filter(|p| !p.is_wolf_team()) {
                    let (a, b) = pair(&evil.id, &good.id);
                    clues.push(Clue {
                        tag: format!("tavern:pair:{}:{}", a, b),
                        text: format!("Overheard at the bar: one of {} and {} runs with the wolves.", a, b),
                    });
                }
            }
            let wolves = game.wolf_team_alive();
            clues.push(Clue {
                tag: format!("tavern:count:{}", wolves),
                text: format!("The barkeep counts {} of the werewolf side still drinking among you.", wolves),
            });
        }
        Location::Chapel => {
            let sheltered = |p: &&PlayerState| matches!(p.role, Role::Guardian | Role::Innocent | Role::Judge);
            for holder in others.iter().copied().filter(sheltered) {
                for other in others.iter().filter(|p| p.id != holder.id) {
                    let (a, b) = pair(&holder.id, &other.id);
                    clues.push(Clue {
                        tag: format!("chapel:pair:{}:{}", a, b),
                        text: format!(
                            "The chapel register: one of {} and {} is the Guardian, the Innocent or the Judge.",
                            a, b
                        ),
                    });
                }
            }
            for clean in others.iter().filter(|p| !p.is_wolf_team()) {
                clues.push(Clue {
                    tag: format!("chapel:clear:{}", clean.id),
                    text: format!("{} was praying all night. They are not with the wolves.", clean.id),
                });
            }
        }
        Location::Forest => {
            let dead = game
                .party
                .iter()
                .filter_map(|id| game.player(id))
                .filter(|p| !p.alive);
            for body in dead {
                clues.push(Clue {
                    tag: format!("forest:grave:{}", body.id),
                    text: format!("Beside {}'s grave lies a token: they were the {}.", body.id, body.role),
                });
            }
            let pack = game.core_wolves_alive();
            clues.push(Clue {
                tag: format!("forest:tracks:{}", pack),
                text: format!("Fresh tracks of {} werewolves crisscross the forest floor.", pack),
            });
        }
        Location::Market => {
            let present: Vec<Role> = others.iter().map(|p| p.role).collect();
            let own = game.player(investigator).map(|p| p.role);
            for role in Role::ALL {
                if Some(role) == own {
                    continue;
                }
                if present.contains(&role) {
                    clues.push(Clue {
                        tag: format!("market:present:{:?}", role),
                        text: format!("Market gossip: someone among you is the {}.", role),
                    });
                } else if role.min_party_size() <= game.party.len() {
                    clues.push(Clue {
                        tag: format!("market:absent:{:?}", role),
                        text: format!("Market gossip: nobody left alive is the {}.", role),
                    });
                }
            }
        }
    }
    clues
}

/// Searches `location` on behalf of `investigator` and records the clue tag
/// so the same fact is never shown to them twice.
pub fn investigate(
    game: &mut Game,
    investigator: &PlayerId,
    location: Location,
    rng: &dyn RandomPort,
) -> Investigation {
    if !rng.gen_bool(SEARCH_SUCCESS_RATE) {
        return Investigation::Failed;
    }
    let seen = match game.player(investigator) {
        Some(player) => player.clue_tags.clone(),
        None => return Investigation::Failed,
    };
    let fresh: Vec<Clue> = candidates(location, game, investigator)
        .into_iter()
        .filter(|clue| !seen.contains(&clue.tag))
        .collect();
    let Some(clue) = rng.choose(&fresh).cloned() else {
        return Investigation::NothingNew;
    };
    if let Some(player) = game.player_mut(investigator) {
        player.clue_tags.insert(clue.tag.clone());
    }
    Investigation::Found(clue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_setup::playing_game;

    #[test]
    fn test_chapel_pairs_sheltered_roles_and_clears_the_village() {
        let game = playing_game(&[Role::Detective, Role::Guardian, Role::Villager, Role::Werewolf]);
        let mut tags: Vec<String> = candidates(Location::Chapel, &game, &"p1".to_string())
            .into_iter()
            .map(|clue| clue.tag)
            .collect();
        tags.sort();
        assert_eq!(
            tags,
            vec![
                "chapel:clear:p2",
                "chapel:clear:p3",
                "chapel:pair:p2:p3",
                "chapel:pair:p2:p4",
            ]
        );
    }
}
