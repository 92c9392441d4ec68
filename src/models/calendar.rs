use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    EarlySpring,
    LateSpring,
    EarlySummer,
    LateSummer,
    EarlyAutumn,
    LateAutumn,
    EarlyWinter,
    LateWinter,
}

impl Season {
    const CYCLE: [Season; 8] = [
        Season::EarlySpring,
        Season::LateSpring,
        Season::EarlySummer,
        Season::LateSummer,
        Season::EarlyAutumn,
        Season::LateAutumn,
        Season::EarlyWinter,
        Season::LateWinter,
    ];

    fn index(self) -> usize {
        Season::CYCLE.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// Next season and whether the cycle wrapped into a new year.
    fn next(self) -> (Season, bool) {
        let next = (self.index() + 1) % Season::CYCLE.len();
        (Season::CYCLE[next], next == 0)
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::EarlySpring => "early spring",
            Season::LateSpring => "late spring",
            Season::EarlySummer => "early summer",
            Season::LateSummer => "late summer",
            Season::EarlyAutumn => "early autumn",
            Season::LateAutumn => "late autumn",
            Season::EarlyWinter => "early winter",
            Season::LateWinter => "late winter",
        };
        write!(f, "{}", name)
    }
}

/// In-game date. Each day moves one season forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    pub year: u32,
    pub season: Season,
    pub day: u32,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            year: 1,
            season: Season::EarlySpring,
            day: 0,
        }
    }
}

impl Calendar {
    pub fn advance(&mut self) {
        self.day += 1;
        if self.day == 1 {
            return;
        }
        let (season, wrapped) = self.season.next();
        self.season = season;
        if wrapped {
            self.year += 1;
        }
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Day {}, {} of year {}", self.day, self.season, self.year)
    }
}
