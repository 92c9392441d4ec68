use serde::{Deserialize, Serialize};
use std::fmt;

use super::action::ActionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    Village,
    Werewolf,
    Jester,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Village => write!(f, "Village"),
            Team::Werewolf => write!(f, "Werewolves"),
            Team::Jester => write!(f, "Jester"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Villager,
    Seer,
    Guardian,
    Beholder,
    Oracle,
    Innocent,
    Judge,
    Baker,
    Detective,
    Cursed,
    Avenger,
    Jester,
    Werewolf,
    AlphaWolf,
    Bartender,
    IceWitch,
    Lunatic,
}

impl Role {
    pub const ALL: [Role; 17] = [
        Role::Villager,
        Role::Seer,
        Role::Guardian,
        Role::Beholder,
        Role::Oracle,
        Role::Innocent,
        Role::Judge,
        Role::Baker,
        Role::Detective,
        Role::Cursed,
        Role::Avenger,
        Role::Jester,
        Role::Werewolf,
        Role::AlphaWolf,
        Role::Bartender,
        Role::IceWitch,
        Role::Lunatic,
    ];

    /// Role every slot starts as before balancing.
    pub const BASELINE: Role = Role::Villager;

    pub fn team(self) -> Team {
        match self {
            Role::Werewolf | Role::AlphaWolf | Role::Bartender | Role::IceWitch | Role::Lunatic => {
                Team::Werewolf
            }
            Role::Jester => Team::Jester,
            _ => Team::Village,
        }
    }

    /// Core wolves hunt at night. Every other werewolf-team role needs one
    /// of them in the composition.
    pub fn is_core_wolf(self) -> bool {
        matches!(self, Role::Werewolf | Role::AlphaWolf)
    }

    pub fn max_count(self) -> usize {
        match self {
            Role::Villager => 16,
            Role::Werewolf => 4,
            _ => 1,
        }
    }

    pub fn min_party_size(self) -> usize {
        match self {
            Role::Villager | Role::Seer | Role::Werewolf => 0,
            Role::Guardian => 4,
            Role::Beholder | Role::Oracle | Role::Innocent | Role::Baker => 5,
            Role::Judge | Role::Detective | Role::Cursed | Role::Jester => 6,
            Role::Avenger | Role::Bartender => 7,
            Role::AlphaWolf | Role::IceWitch => 8,
            Role::Lunatic => 9,
        }
    }

    /// Balancing weight of one instance of this role. Only meaningful when
    /// comparing the sums of both teams.
    pub fn strength(self, composition: &[Role], party_size: usize) -> f64 {
        match self {
            Role::Villager | Role::Cursed => 1.0,
            Role::Seer => (20.0 * 2.0 / (party_size as f64 + 1.0)).max(5.0),
            Role::Guardian => 6.0,
            Role::Beholder => {
                if composition.contains(&Role::Seer) {
                    2.0
                } else {
                    0.0
                }
            }
            Role::Oracle | Role::Avenger => 3.0,
            Role::Innocent | Role::Baker => 2.0,
            Role::Judge | Role::Detective => 4.0,
            Role::Jester => 0.0,
            Role::Werewolf => 8.0,
            Role::AlphaWolf => 10.0,
            Role::Bartender | Role::IceWitch => 6.0,
            Role::Lunatic => 4.0,
        }
    }

    /// What an investigator holding `investigator` is shown when looking at
    /// this role.
    pub fn appears_as(self, investigator: Role) -> Role {
        match (self, investigator) {
            (Role::AlphaWolf, Role::Seer) => Role::Villager,
            (role, _) => role,
        }
    }

    /// The night ability the role carries, ignoring activation conditions.
    pub fn ability(self) -> Option<ActionKind> {
        match self {
            Role::Seer => Some(ActionKind::CheckRole),
            Role::Guardian => Some(ActionKind::Protect),
            Role::Oracle => Some(ActionKind::CheckRoleNegative),
            Role::Baker => Some(ActionKind::GiveTreat),
            Role::Detective => Some(ActionKind::InvestigateLocation),
            Role::Avenger | Role::Werewolf | Role::AlphaWolf => Some(ActionKind::Kill),
            Role::Bartender => Some(ActionKind::Inebriate),
            Role::IceWitch => Some(ActionKind::Freeze),
            Role::Lunatic => Some(ActionKind::ChaosRedirect),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Role::Villager => "An ordinary villager. No night ability; votes wisely by day.",
            Role::Seer => "Each night, learns the role of one player.",
            Role::Guardian => {
                "Each night, guards one player's home against attacks. Guarding a werewolf is a gamble with your life."
            }
            Role::Beholder => "Knows who the Seer is from the first night.",
            Role::Oracle => "Each night, learns one role that a chosen player does not have.",
            Role::Innocent => {
                "The first villager to accuse the Innocent dies on the spot. Werewolves are not fooled."
            }
            Role::Judge => "While the Judge lives, an exiled villager may be pardoned.",
            Role::Baker => {
                "Each night, delivers a treat to a player. Visiting a werewolf or a home under attack is deadly."
            }
            Role::Detective => "Each night, searches a location around the village for clues.",
            Role::Cursed => "A villager who turns into a werewolf once the last werewolf falls.",
            Role::Avenger => "Once the last werewolf falls, may attack one player each night.",
            Role::Jester => "Wins alone by getting exiled by the village.",
            Role::Werewolf => "Each night, attacks a player together with the pack.",
            Role::AlphaWolf => "Leader of the pack. Appears as a villager to the Seer.",
            Role::Bartender => "Each night, gets a player drunk, scrambling their night action.",
            Role::IceWitch => "Each night, freezes a player so that their action fails.",
            Role::Lunatic => {
                "Once the last core werewolf falls, attacks each night, but never the intended victim."
            }
        }
    }

    /// Case-insensitive lookup by any fragment of the role's name. Spaces
    /// are ignored, so "icewitch" and "ice witch" both work.
    pub fn find(fragment: &str) -> Option<Role> {
        let squash = |s: &str| -> String {
            s.chars()
                .filter(|c| !c.is_whitespace())
                .flat_map(char::to_lowercase)
                .collect()
        };
        let needle = squash(fragment);
        if needle.is_empty() {
            return None;
        }
        Role::ALL
            .iter()
            .copied()
            .find(|role| squash(&role.to_string()) == needle)
            .or_else(|| {
                Role::ALL
                    .iter()
                    .copied()
                    .find(|role| squash(&role.to_string()).contains(&needle))
            })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Villager => "Villager",
            Role::Seer => "Seer",
            Role::Guardian => "Guardian",
            Role::Beholder => "Beholder",
            Role::Oracle => "Oracle",
            Role::Innocent => "Innocent",
            Role::Judge => "Judge",
            Role::Baker => "Baker",
            Role::Detective => "Detective",
            Role::Cursed => "Cursed",
            Role::Avenger => "Avenger",
            Role::Jester => "Jester",
            Role::Werewolf => "Werewolf",
            Role::AlphaWolf => "Alpha Wolf",
            Role::Bartender => "Bartender",
            Role::IceWitch => "Ice Witch",
            Role::Lunatic => "Lunatic",
        };
        write!(f, "{}", name)
    }
}
