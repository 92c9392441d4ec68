use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;
use std::time::Duration;

use crate::models::{
    game::{DeathCause, Game, VictoryReason},
    notice::{Dispatch, Notice},
    player::PlayerId,
    role::{Role, Team},
};
use crate::ports::RandomPort;
use crate::services::win;

pub const PARDON_CHANCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    NobodyVoted,
    Tie(Vec<PlayerId>),
    Exiled(PlayerId),
    Pardoned(PlayerId),
}

#[derive(Debug)]
pub struct NominationOutcome {
    pub dispatches: Vec<Dispatch>,
    pub flow: ControlFlow<VictoryReason>,
    pub accepted: BTreeSet<PlayerId>,
}

#[derive(Debug)]
pub struct DayReport {
    pub dispatches: Vec<Dispatch>,
    pub verdict: Verdict,
    pub flow: ControlFlow<VictoryReason>,
}

/// Records `voter`'s nominations, replacing any earlier ones. Accusing the
/// Innocent for the first time kills a non-wolf accuser on the spot.
pub fn record_nominations(game: &mut Game, voter: &PlayerId, targets: &[PlayerId]) -> NominationOutcome {
    let accepted: BTreeSet<PlayerId> = targets
        .iter()
        .filter(|t| *t != voter && game.is_alive(t))
        .cloned()
        .collect();

    let voter_is_wolf = game.player(voter).is_some_and(|p| p.is_wolf_team());
    let innocent = accepted.iter().find(|t| {
        game.player(t).is_some_and(|p| p.role == Role::Innocent) && !game.nominated_before.contains(*t)
    });

    if let (Some(innocent), false) = (innocent.cloned(), voter_is_wolf) {
        game.nominated_before.extend(accepted.iter().cloned());
        game.votes.remove(voter);
        let mut dispatches = vec![Dispatch::Group(Notice::bad(
            "A terrible mistake",
            format!("{} pointed at {} and collapsed. {} is the Innocent.", voter, innocent, innocent),
        ))];
        let elimination = win::eliminate(game, voter, DeathCause::AccusedInnocent);
        dispatches.extend(elimination.dispatches);
        let flow = match elimination.victory {
            Some(victory) => ControlFlow::Break(victory),
            None => ControlFlow::Continue(()),
        };
        return NominationOutcome {
            dispatches,
            flow,
            accepted: BTreeSet::new(),
        };
    }

    game.nominated_before.extend(accepted.iter().cloned());
    game.votes.insert(voter.clone(), accepted.clone());
    NominationOutcome {
        dispatches: Vec::new(),
        flow: ControlFlow::Continue(()),
        accepted,
    }
}

/// Nomination count per target. Voters and targets who died during the day
/// are left out.
pub fn tally(game: &Game) -> BTreeMap<PlayerId, usize> {
    let mut counts = BTreeMap::new();
    for (voter, targets) in &game.votes {
        if !game.is_alive(voter) {
            continue;
        }
        for target in targets.iter().filter(|t| game.is_alive(t)) {
            *counts.entry(target.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Closes the day: exiles the single most nominated player, if any.
pub fn resolve_day(game: &mut Game, rng: &dyn RandomPort, pacing: Duration) -> DayReport {
    let counts = tally(game);
    game.votes.clear();

    let mut dispatches = Vec::new();
    let Some(max) = counts.values().copied().max() else {
        dispatches.push(Dispatch::Group(Notice::info(
            "Nobody voted",
            "The village could not bring itself to accuse anyone today.",
        )));
        return DayReport {
            dispatches,
            verdict: Verdict::NobodyVoted,
            flow: ControlFlow::Continue(()),
        };
    };

    let summary = counts
        .iter()
        .map(|(target, count)| format!("{}: {}", target, count))
        .collect::<Vec<_>>()
        .join("\n");
    dispatches.push(Dispatch::Group(Notice::info("The votes are in", summary)));
    dispatches.push(Dispatch::Pause(pacing));

    let leaders: Vec<PlayerId> = counts
        .iter()
        .filter(|(_, count)| **count == max)
        .map(|(target, _)| target.clone())
        .collect();
    if leaders.len() > 1 {
        dispatches.push(Dispatch::Group(Notice::info(
            "A tie",
            format!("{} are tied. Nobody is exiled today.", leaders.join(", ")),
        )));
        return DayReport {
            dispatches,
            verdict: Verdict::Tie(leaders),
            flow: ControlFlow::Continue(()),
        };
    }

    let condemned = leaders[0].clone();
    let village_aligned = game.player(&condemned).is_some_and(|p| p.team == Team::Village);
    let judge_alive = game.living().any(|p| p.role == Role::Judge);
    if village_aligned && judge_alive && rng.gen_bool(PARDON_CHANCE) {
        dispatches.push(Dispatch::Group(Notice::good(
            "Overruled",
            format!("The Judge stepped in and pardoned {}.", condemned),
        )));
        return DayReport {
            dispatches,
            verdict: Verdict::Pardoned(condemned),
            flow: ControlFlow::Continue(()),
        };
    }

    let elimination = win::eliminate(game, &condemned, DeathCause::Exile);
    dispatches.extend(elimination.dispatches);
    let flow = match elimination.victory {
        Some(victory) => ControlFlow::Break(victory),
        None => ControlFlow::Continue(()),
    };
    DayReport {
        dispatches,
        verdict: Verdict::Exiled(condemned),
        flow,
    }
}
