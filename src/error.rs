use crate::models::game::GameState;
use crate::ports::MessengerError;

/// Failures a command or a game start can report. Victory is not one of
/// them; it travels as `ControlFlow::Break`.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("could not find a balanced set of roles for {party_size} players")]
    BalancingFailed { party_size: usize },
    #[error("not enough players: {found} joined, at least {required} needed")]
    NotEnoughPlayers { found: usize, required: usize },
    #[error("this can't be done right now (game is {actual:?})")]
    WrongState { actual: GameState },
    #[error("only the party leader can do that")]
    NotLeader,
    #[error("{0} is not in the party")]
    NotInParty(String),
    #[error("{0} is already in the party")]
    AlreadyInParty(String),
    #[error("dead players can't do that")]
    NotAlive,
    #[error("that isn't accepted in the current phase")]
    WrongPhase,
    #[error("your role can't do that")]
    WrongRole,
    #[error("{0} is not a valid target")]
    InvalidTarget(String),
    #[error("no role matches \"{0}\"")]
    UnknownRole(String),
    #[error("there is nothing to skip")]
    NoActiveWait,
    #[error("yes/no voting is not used in this game mode; nominate players instead")]
    LegacyVote,
    #[error("delivery failed: {0}")]
    Delivery(#[from] MessengerError),
}

impl GameError {
    /// Guard failures go back to the requester only; they never touch state.
    pub fn is_guard_failure(&self) -> bool {
        !matches!(
            self,
            GameError::BalancingFailed { .. }
                | GameError::NotEnoughPlayers { .. }
                | GameError::Delivery(_)
        )
    }
}
