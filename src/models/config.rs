use std::env;
use std::time::Duration;

/// Base durations of every timed wait, before speed scaling.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub join_duration: Duration,
    pub night_duration: Duration,
    pub day_duration: Duration,
    // pause between an announcement and its outcome
    pub pacing: Duration,
    pub min_players: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            join_duration: Duration::from_secs(60),
            night_duration: Duration::from_secs(60),
            day_duration: Duration::from_secs(90),
            pacing: Duration::from_secs(3),
            min_players: 3,
        }
    }
}

fn seconds_from_env(var: &str, default: u64) -> Duration {
    let secs = env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

impl GameConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let join_duration = seconds_from_env("WEREWOLF_JOIN_SECONDS", defaults.join_duration.as_secs());
        let night_duration =
            seconds_from_env("WEREWOLF_NIGHT_SECONDS", defaults.night_duration.as_secs());
        let day_duration = seconds_from_env("WEREWOLF_DAY_SECONDS", defaults.day_duration.as_secs());
        let pacing = seconds_from_env("WEREWOLF_PACING_SECONDS", defaults.pacing.as_secs());

        Self {
            join_duration,
            night_duration,
            day_duration,
            pacing,
            min_players: defaults.min_players,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_overrides_and_falls_back() {
        env::set_var("WEREWOLF_NIGHT_SECONDS", "12");
        env::set_var("WEREWOLF_DAY_SECONDS", "not-a-number");
        let config = GameConfig::from_env();
        assert_eq!(config.night_duration, Duration::from_secs(12));
        assert_eq!(config.day_duration, Duration::from_secs(90));
        env::remove_var("WEREWOLF_NIGHT_SECONDS");
        env::remove_var("WEREWOLF_DAY_SECONDS");
    }
}
