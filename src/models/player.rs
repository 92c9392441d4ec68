use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::role::{Role, Team};

/// Opaque participant identifier handed over by the adapter.
pub type PlayerId = String;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub role: Role,
    pub team: Team,
    pub alive: bool,
    // clue tags already shown to this player by location investigations
    pub clue_tags: HashSet<String>,
    // set once a delayed ability (Avenger) has been triggered
    pub ability_active: bool,
}

impl PlayerState {
    pub fn new(id: PlayerId, role: Role) -> Self {
        Self {
            id,
            role,
            team: role.team(),
            alive: true,
            clue_tags: HashSet::new(),
            ability_active: false,
        }
    }

    pub fn is_wolf_team(&self) -> bool {
        self.team == Team::Werewolf
    }

    /// Role changes after assignment carry the team along.
    pub fn turn_into(&mut self, role: Role) {
        self.role = role;
        self.team = role.team();
    }
}
