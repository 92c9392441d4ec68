use serde::{Deserialize, Serialize};
use std::fmt;

use super::player::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Kill,
    Freeze,
    Protect,
    CheckRole,
    CheckRoleNegative,
    GiveTreat,
    ChaosRedirect,
    Inebriate,
    InvestigateLocation,
}

impl ActionKind {
    /// Pre-actions run in descending priority before anything else resolves.
    pub fn priority(self) -> u8 {
        match self {
            ActionKind::ChaosRedirect => 3,
            ActionKind::Inebriate => 2,
            ActionKind::Freeze => 1,
            _ => 0,
        }
    }

    /// Whether performing this action takes the actor out of their home.
    pub fn away_from_home(self) -> bool {
        matches!(
            self,
            ActionKind::Protect | ActionKind::GiveTreat | ActionKind::InvestigateLocation
        )
    }

    pub fn is_attack(self) -> bool {
        matches!(self, ActionKind::Kill | ActionKind::ChaosRedirect)
    }

    /// Main resolution stage: information first, then attacks, then visits
    /// that depend on who was attacked.
    pub fn stage(self) -> u8 {
        match self {
            ActionKind::CheckRole | ActionKind::CheckRoleNegative | ActionKind::InvestigateLocation => 0,
            ActionKind::Kill | ActionKind::ChaosRedirect => 1,
            ActionKind::Protect | ActionKind::GiveTreat => 2,
            ActionKind::Freeze | ActionKind::Inebriate => 3,
        }
    }

    pub fn prompt_text(self) -> &'static str {
        match self {
            ActionKind::Kill => "Who do you want to attack tonight?",
            ActionKind::Freeze => "Who do you want to freeze tonight?",
            ActionKind::Protect => "Whose home do you want to guard tonight?",
            ActionKind::CheckRole => "Whose role do you want to see?",
            ActionKind::CheckRoleNegative => "Who do you want to consult the spirits about?",
            ActionKind::GiveTreat => "Who should receive a treat tonight?",
            ActionKind::ChaosRedirect => "Who do you want to attack tonight? The moon may disagree.",
            ActionKind::Inebriate => "Who gets a round on the house tonight?",
            ActionKind::InvestigateLocation => "Where do you want to search tonight?",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Kill => "kill",
            ActionKind::Freeze => "freeze",
            ActionKind::Protect => "protect",
            ActionKind::CheckRole => "check role",
            ActionKind::CheckRoleNegative => "check role (negative)",
            ActionKind::GiveTreat => "give treat",
            ActionKind::ChaosRedirect => "chaos",
            ActionKind::Inebriate => "inebriate",
            ActionKind::InvestigateLocation => "investigate location",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Tavern,
    Chapel,
    Forest,
    Market,
}

impl Location {
    pub const ALL: [Location; 4] = [
        Location::Tavern,
        Location::Chapel,
        Location::Forest,
        Location::Market,
    ];
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Tavern => write!(f, "the tavern"),
            Location::Chapel => write!(f, "the chapel"),
            Location::Forest => write!(f, "the forest"),
            Location::Market => write!(f, "the market"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Player(PlayerId),
    Location(Location),
}

/// A pending night intent. One per actor per night.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub actor: PlayerId,
    pub target: Target,
}

impl Action {
    pub fn on_player(kind: ActionKind, actor: &str, target: &str) -> Self {
        Action {
            kind,
            actor: actor.to_string(),
            target: Target::Player(target.to_string()),
        }
    }

    pub fn at_location(actor: &str, location: Location) -> Self {
        Action {
            kind: ActionKind::InvestigateLocation,
            actor: actor.to_string(),
            target: Target::Location(location),
        }
    }

    pub fn priority(&self) -> u8 {
        self.kind.priority()
    }

    pub fn away_from_home(&self) -> bool {
        self.kind.away_from_home()
    }

    pub fn target_player(&self) -> Option<&PlayerId> {
        match &self.target {
            Target::Player(id) => Some(id),
            Target::Location(_) => None,
        }
    }
}
