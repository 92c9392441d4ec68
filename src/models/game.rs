use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::time::Duration;

use super::{
    action::Action,
    calendar::Calendar,
    player::{PlayerId, PlayerState},
    role::{Role, Team},
};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GameState {
    Idle,
    Joining,
    Assigned,
    Playing,
}

/// Which player input the running game currently accepts.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Window {
    Closed,
    Night,
    Nominations,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameSpeed {
    Fast,
    #[default]
    Normal,
    Infinite,
}

impl GameSpeed {
    /// Long enough that only a manual continue ends the wait.
    pub const INFINITE_WAIT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    pub fn scale(self, base: Duration) -> Duration {
        match self {
            GameSpeed::Fast => base.mul_f64(0.75),
            GameSpeed::Normal => base,
            GameSpeed::Infinite => Self::INFINITE_WAIT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    WerewolfAttack,
    AvengerShot,
    ChaosAttack,
    VisitedWerewolf,
    CaughtInAttack,
    GuardedWerewolf,
    AccusedInnocent,
    Exile,
}

impl DeathCause {
    pub fn private_message(self) -> &'static str {
        match self {
            DeathCause::WerewolfAttack => "You were torn apart by werewolves in the night.",
            DeathCause::AvengerShot => "The Avenger found you in the dark.",
            DeathCause::ChaosAttack => "A raving lunatic broke into your home.",
            DeathCause::VisitedWerewolf => "You knocked on a werewolf's door. It answered.",
            DeathCause::CaughtInAttack => {
                "You arrived just as the attack began and were caught in it."
            }
            DeathCause::GuardedWerewolf => "You stood guard for a werewolf, and it turned on you.",
            DeathCause::AccusedInnocent => "You accused the Innocent and paid for it with your life.",
            DeathCause::Exile => "The village has exiled you.",
        }
    }

    pub fn public_message(self, victim: &str) -> String {
        match self {
            DeathCause::WerewolfAttack => format!("{} was killed by werewolves.", victim),
            DeathCause::AvengerShot => format!("{} was struck down by the Avenger.", victim),
            DeathCause::ChaosAttack => format!("{} fell victim to a lunatic's frenzy.", victim),
            DeathCause::VisitedWerewolf => {
                format!("{} paid a visit to the wrong house and never came back.", victim)
            }
            DeathCause::CaughtInAttack => {
                format!("{} was caught up in an attack on someone else's home.", victim)
            }
            DeathCause::GuardedWerewolf => {
                format!("{} was found dead outside a house they were guarding.", victim)
            }
            DeathCause::AccusedInnocent => {
                format!("{} accused the Innocent and dropped dead on the spot.", victim)
            }
            DeathCause::Exile => format!("{} has been exiled by the village.", victim),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VictoryReason {
    Village,
    Werewolves,
    Jester(PlayerId),
}

impl VictoryReason {
    pub fn is_winner(&self, player: &PlayerState) -> bool {
        match self {
            VictoryReason::Village => player.team == Team::Village,
            VictoryReason::Werewolves => player.team == Team::Werewolf,
            VictoryReason::Jester(id) => &player.id == id,
        }
    }
}

impl fmt::Display for VictoryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VictoryReason::Village => write!(f, "The village has rid itself of the werewolves!"),
            VictoryReason::Werewolves => write!(f, "The werewolves have overrun the village!"),
            VictoryReason::Jester(id) => write!(f, "{} the Jester fooled everyone into an exile!", id),
        }
    }
}

/// All mutable state of one session.
#[derive(Clone, Debug)]
pub struct Game {
    pub state: GameState,
    pub window: Window,
    pub language: String,
    pub speed: GameSpeed,
    // first entry is the leader
    pub party: Vec<PlayerId>,
    pub players: BTreeMap<PlayerId, PlayerState>,
    pub actions: BTreeMap<PlayerId, Action>,
    pub votes: BTreeMap<PlayerId, BTreeSet<PlayerId>>,
    pub nominated_before: HashSet<PlayerId>,
    pub calendar: Calendar,
    pub prompts: Vec<String>,
    // set by a command handler whose kill ended the game mid-phase
    pub pending_victory: Option<VictoryReason>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    pub fn new() -> Self {
        Game {
            state: GameState::Idle,
            window: Window::Closed,
            language: "en".to_string(),
            speed: GameSpeed::Normal,
            party: Vec::new(),
            players: BTreeMap::new(),
            actions: BTreeMap::new(),
            votes: BTreeMap::new(),
            nominated_before: HashSet::new(),
            calendar: Calendar::default(),
            prompts: Vec::new(),
            pending_victory: None,
        }
    }

    /// Back to Idle with nothing left over from the previous game.
    pub fn reset(&mut self) {
        *self = Game::new();
    }

    pub fn leader(&self) -> Option<&PlayerId> {
        self.party.first()
    }

    pub fn is_leader(&self, id: &str) -> bool {
        self.leader().is_some_and(|leader| leader == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.party.iter().any(|member| member == id)
    }

    pub fn player(&self, id: &str) -> Option<&PlayerState> {
        self.players.get(id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut PlayerState> {
        self.players.get_mut(id)
    }

    pub fn is_alive(&self, id: &str) -> bool {
        self.player(id).is_some_and(|p| p.alive)
    }

    /// Living players in party order.
    pub fn living(&self) -> impl Iterator<Item = &PlayerState> {
        self.party
            .iter()
            .filter_map(|id| self.players.get(id))
            .filter(|p| p.alive)
    }

    pub fn living_ids(&self) -> Vec<PlayerId> {
        self.living().map(|p| p.id.clone()).collect()
    }

    pub fn core_wolves_alive(&self) -> usize {
        self.living().filter(|p| p.role.is_core_wolf()).count()
    }

    pub fn wolf_team_alive(&self) -> usize {
        self.living().filter(|p| p.is_wolf_team()).count()
    }

    pub fn others_alive(&self) -> usize {
        self.living().filter(|p| !p.is_wolf_team()).count()
    }

    pub fn composition(&self) -> Vec<Role> {
        self.party
            .iter()
            .filter_map(|id| self.players.get(id))
            .map(|p| p.role)
            .collect()
    }

    /// Pairs each party member, in order, with the role in the same slot.
    pub fn assign_roles(&mut self, roles: &[Role]) {
        self.players = self
            .party
            .iter()
            .zip(roles.iter())
            .map(|(id, role)| (id.clone(), PlayerState::new(id.clone(), *role)))
            .collect();
        self.actions.clear();
        self.votes.clear();
        self.nominated_before.clear();
        self.calendar = Calendar::default();
        self.pending_victory = None;
    }

    pub fn roster(&self, victory: Option<&VictoryReason>) -> String {
        self.party
            .iter()
            .filter_map(|id| self.players.get(id))
            .map(|p| {
                let status = if p.alive { "alive" } else { "dead" };
                match victory {
                    Some(v) => {
                        let outcome = if v.is_winner(p) { "won" } else { "lost" };
                        format!("{}: {} ({}, {})", p.id, p.role, status, outcome)
                    }
                    None => format!("{}: {} ({})", p.id, p.role, status),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_with(roles: &[Role]) -> Game {
        let mut game = Game::new();
        game.party = (1..=roles.len()).map(|i| format!("p{}", i)).collect();
        game.assign_roles(roles);
        game
    }

    #[test]
    fn test_speed_scaling() {
        let base = Duration::from_secs(60);
        assert_eq!(GameSpeed::Fast.scale(base), Duration::from_secs(45));
        assert_eq!(GameSpeed::Normal.scale(base), base);
        assert_eq!(GameSpeed::Infinite.scale(base), GameSpeed::INFINITE_WAIT);
    }

    #[test]
    fn test_living_keeps_party_order() {
        let mut game = game_with(&[Role::Werewolf, Role::Seer, Role::Villager]);
        game.player_mut("p2").unwrap().alive = false;
        assert_eq!(game.living_ids(), vec!["p1".to_string(), "p3".to_string()]);
        assert_eq!(game.core_wolves_alive(), 1);
        assert_eq!(game.others_alive(), 1);
    }

    #[test]
    fn test_roster_marks_winners() {
        let game = game_with(&[Role::Werewolf, Role::Villager]);
        let roster = game.roster(Some(&VictoryReason::Village));
        assert!(roster.contains("p1: Werewolf (alive, lost)"));
        assert!(roster.contains("p2: Villager (alive, won)"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut game = game_with(&[Role::Werewolf, Role::Villager]);
        game.state = GameState::Playing;
        game.reset();
        assert_eq!(game.state, GameState::Idle);
        assert!(game.party.is_empty());
        assert!(game.players.is_empty());
    }
}
