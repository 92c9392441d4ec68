use std::collections::{BTreeMap, HashSet};
use std::ops::ControlFlow;
use std::time::Duration;

use crate::models::{
    action::{Action, ActionKind, Location, Target},
    game::{DeathCause, Game, VictoryReason},
    notice::{Dispatch, Notice},
    player::PlayerId,
    role::Role,
};
use crate::ports::RandomPort;
use crate::services::clues::{self, Investigation};
use crate::services::win;

/// Attacks on someone who is attacking too succeed this much less often.
pub const SELF_DEFENSE_FACTOR: f64 = 0.2;
pub const GUARDED_WOLF_BITE_CHANCE: f64 = 0.5;

pub fn kill_success_rate(party_size: usize) -> f64 {
    match party_size {
        0..=5 => 0.6,
        6 | 7 => 0.7,
        8 => 0.8,
        9 => 0.9,
        _ => 1.0,
    }
}

pub struct NightReport {
    pub dispatches: Vec<Dispatch>,
    pub flow: ControlFlow<VictoryReason>,
}

/// Resolves every action recorded in `game.actions` and clears them.
pub fn resolve_night(game: &mut Game, rng: &dyn RandomPort, pacing: Duration) -> NightReport {
    let mut night = Night {
        game,
        rng,
        pacing,
        out: Vec::new(),
        frozen: HashSet::new(),
        killed: HashSet::new(),
        spared: HashSet::new(),
        submitted: BTreeMap::new(),
        valid: BTreeMap::new(),
    };
    let flow = night.run();
    let dispatches = night.out;
    game.actions.clear();
    NightReport { dispatches, flow }
}

struct Night<'a> {
    game: &'a mut Game,
    rng: &'a dyn RandomPort,
    pacing: Duration,
    out: Vec<Dispatch>,
    frozen: HashSet<PlayerId>,
    // killed by an attack tonight
    killed: HashSet<PlayerId>,
    // attacked tonight but saved by a guard
    spared: HashSet<PlayerId>,
    // actions left after the pre-actions, before the validity filter
    submitted: BTreeMap<PlayerId, Action>,
    valid: BTreeMap<PlayerId, Action>,
}

impl Night<'_> {
    fn run(&mut self) -> ControlFlow<VictoryReason> {
        self.pre_actions();
        self.submitted = self.game.actions.clone();
        self.valid = self
            .submitted
            .values()
            .filter(|action| self.is_valid(action))
            .map(|action| (action.actor.clone(), action.clone()))
            .collect();

        self.out.push(Dispatch::Group(Notice::info(
            "Dawn approaches",
            "The night's deeds are done. The village holds its breath...",
        )));
        self.out.push(Dispatch::Pause(self.pacing));

        let mut order: Vec<Action> = self.valid.values().cloned().collect();
        order.sort_by(|a, b| {
            a.kind
                .stage()
                .cmp(&b.kind.stage())
                .then_with(|| a.actor.cmp(&b.actor))
        });

        let living_before = self.game.living().count();
        for action in order {
            if !self.game.is_alive(&action.actor) {
                continue;
            }
            self.resolve(&action)?;
        }

        if self.game.living().count() == living_before {
            self.out.push(Dispatch::Group(Notice::good(
                "A quiet night",
                "Nobody died tonight.",
            )));
        }
        ControlFlow::Continue(())
    }

    fn private(&mut self, to: &str, notice: Notice) {
        self.out.push(Dispatch::Private(to.to_string(), notice));
    }

    fn random_living_except(&self, excluded: &str) -> Option<PlayerId> {
        let pool: Vec<PlayerId> = self
            .game
            .living_ids()
            .into_iter()
            .filter(|id| id != excluded)
            .collect();
        self.rng.choose(&pool).cloned()
    }

    fn pre_actions(&mut self) {
        let mut order: Vec<(u8, PlayerId)> = self
            .game
            .actions
            .values()
            .filter(|action| action.priority() > 0)
            .map(|action| (action.priority(), action.actor.clone()))
            .collect();
        order.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        for (_, actor) in order {
            // an earlier pre-action may have removed or redirected it
            let Some(action) = self.game.actions.get(&actor).cloned() else {
                continue;
            };
            match action.kind {
                ActionKind::ChaosRedirect => self.chaos(&action),
                ActionKind::Inebriate => self.inebriate(&action),
                ActionKind::Freeze => self.freeze(&action),
                _ => {}
            }
        }
    }

    fn chaos(&mut self, action: &Action) {
        if self.game.core_wolves_alive() > 0 {
            self.game.actions.remove(&action.actor);
            return;
        }
        let Some(victim) = self.random_living_except(&action.actor) else {
            self.game.actions.remove(&action.actor);
            return;
        };
        log::debug!("chaos sends {} to {}", action.actor, victim);
        if let Some(own) = self.game.actions.get_mut(&action.actor) {
            own.target = Target::Player(victim);
        }
        self.private(
            &action.actor,
            Notice::text("The moon laughs at your plans. Your feet carry you somewhere else."),
        );
    }

    fn inebriate(&mut self, action: &Action) {
        let Some(target) = action.target_player().cloned() else {
            return;
        };
        let Some(drunk) = self.game.actions.get(&target).cloned() else {
            return;
        };
        match self.rng.gen_index(3) {
            0 => {
                let retarget = match &drunk.target {
                    Target::Player(_) => self.random_living_except(&target).map(Target::Player),
                    Target::Location(_) => self.rng.choose(&Location::ALL).copied().map(Target::Location),
                };
                if let (Some(new_target), Some(own)) = (retarget, self.game.actions.get_mut(&target)) {
                    log::debug!("{} stumbles to {:?}", target, new_target);
                    own.target = new_target;
                }
            }
            1 => {
                self.game.actions.remove(&target);
                self.private(
                    &target,
                    Notice::bad(
                        "Too many drinks",
                        "You had a few too many at the tavern and slept through the night.",
                    ),
                );
            }
            _ => log::debug!("inebriation of {} fizzled", target),
        }
    }

    fn freeze(&mut self, action: &Action) {
        let Some(target) = action.target_player().cloned() else {
            return;
        };
        self.frozen.insert(target.clone());
        self.game.actions.remove(&target);
        self.out.push(Dispatch::Group(Notice::info(
            "A bitter frost",
            format!("{} was found frozen solid and could not leave the house tonight.", target),
        )));
        self.private(
            &target,
            Notice::bad("Frozen", "Ice creeps over you. You cannot act tonight."),
        );
    }

    fn is_attacked(&self, id: &str) -> bool {
        self.submitted
            .values()
            .any(|a| a.kind.is_attack() && a.actor != id && a.target_player().is_some_and(|t| t == id))
    }

    fn is_valid(&self, action: &Action) -> bool {
        if self.frozen.contains(&action.actor) {
            return false;
        }
        // caught at home by an attacker, only guarding or being out still works
        let busy_at_home = self.is_attacked(&action.actor)
            && action.kind != ActionKind::Protect
            && !action.away_from_home();
        !busy_at_home
    }

    fn resolve(&mut self, action: &Action) -> ControlFlow<VictoryReason> {
        match (&action.kind, &action.target) {
            (ActionKind::CheckRole, Target::Player(target)) => self.check_role(&action.actor, target),
            (ActionKind::CheckRoleNegative, Target::Player(target)) => {
                self.check_role_negative(&action.actor, target)
            }
            (ActionKind::InvestigateLocation, Target::Location(location)) => {
                self.search(&action.actor, *location)
            }
            (ActionKind::Kill | ActionKind::ChaosRedirect, Target::Player(target)) => {
                return self.attack(&action.actor, target);
            }
            (ActionKind::Protect, Target::Player(target)) => return self.protect(&action.actor, target),
            (ActionKind::GiveTreat, Target::Player(target)) => return self.give_treat(&action.actor, target),
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn role_of(&self, id: &str) -> Option<Role> {
        self.game.player(id).map(|p| p.role)
    }

    fn check_role(&mut self, seer: &str, target: &str) {
        let (Some(own), Some(seen)) = (self.role_of(seer), self.role_of(target)) else {
            return;
        };
        let appears = seen.appears_as(own);
        self.private(
            seer,
            Notice::info("Your vision", format!("{} is the {}.", target, appears)),
        );
    }

    fn check_role_negative(&mut self, oracle: &str, target: &str) {
        let (Some(own), Some(actual)) = (self.role_of(oracle), self.role_of(target)) else {
            return;
        };
        let mut pool: Vec<Role> = self
            .game
            .living()
            .filter(|p| p.id != target)
            .map(|p| p.role)
            .filter(|r| *r != actual && *r != own)
            .collect();
        pool.sort();
        pool.dedup();
        let notice = match self.rng.choose(&pool) {
            Some(not_role) => Notice::info(
                "The spirits whisper",
                format!("{} is not the {}.", target, not_role),
            ),
            None => Notice::info("The spirits are silent", "You learned nothing tonight."),
        };
        self.private(oracle, notice);
    }

    fn search(&mut self, detective: &str, location: Location) {
        let id = detective.to_string();
        let notice = match clues::investigate(self.game, &id, location, self.rng) {
            Investigation::Found(clue) => Notice::info(format!("Clue from {}", location), clue.text),
            Investigation::Failed => Notice::text(format!(
                "You searched {} all night but found nothing useful.",
                location
            )),
            Investigation::NothingNew => Notice::text(format!(
                "There is nothing left to learn at {}.",
                location
            )),
        };
        self.private(detective, notice);
    }

    fn cause_for(&self, attacker: &str) -> DeathCause {
        match self.role_of(attacker) {
            Some(Role::Avenger) => DeathCause::AvengerShot,
            Some(Role::Lunatic) => DeathCause::ChaosAttack,
            _ => DeathCause::WerewolfAttack,
        }
    }

    fn attack(&mut self, attacker: &str, target: &str) -> ControlFlow<VictoryReason> {
        if !self.game.is_alive(target) {
            self.private(attacker, Notice::text(format!("Someone got to {} before you.", target)));
            return ControlFlow::Continue(());
        }
        let base = kill_success_rate(self.game.party.len());

        let fighting_back = self
            .submitted
            .get(target)
            .is_some_and(|own| own.kind.is_attack());
        let guarded = self.valid.values().any(|a| {
            a.kind == ActionKind::Protect
                && a.target_player().is_some_and(|t| t == target)
                && self.game.is_alive(&a.actor)
        });
        let away = self.valid.get(target).is_some_and(|a| a.away_from_home());

        let succeeded = if fighting_back {
            self.rng.gen_bool(base * SELF_DEFENSE_FACTOR)
        } else if guarded {
            self.spared.insert(target.to_string());
            false
        } else if away {
            false
        } else {
            self.rng.gen_bool(base)
        };

        if !succeeded {
            let reason = if fighting_back {
                format!("{} fought you off.", target)
            } else if guarded {
                format!("Someone was standing guard at {}'s home.", target)
            } else if away {
                format!("{} was not at home.", target)
            } else {
                format!("{} escaped you in the dark.", target)
            };
            self.private(attacker, Notice::bad("The attack failed", reason));
            return ControlFlow::Continue(());
        }

        self.killed.insert(target.to_string());
        let cause = self.cause_for(attacker);
        self.kill(target, cause)
    }

    fn kill(&mut self, victim: &str, cause: DeathCause) -> ControlFlow<VictoryReason> {
        let elimination = win::eliminate(self.game, &victim.to_string(), cause);
        if !elimination.dispatches.is_empty() {
            self.out.push(Dispatch::Pause(self.pacing));
            self.out.extend(elimination.dispatches);
        }
        match elimination.victory {
            Some(victory) => ControlFlow::Break(victory),
            None => ControlFlow::Continue(()),
        }
    }

    fn protect(&mut self, guardian: &str, target: &str) -> ControlFlow<VictoryReason> {
        let guarding_wolf = self.game.player(target).is_some_and(|p| p.is_wolf_team());
        if guarding_wolf && self.rng.gen_bool(GUARDED_WOLF_BITE_CHANCE) {
            return self.kill(guardian, DeathCause::GuardedWerewolf);
        }
        if self.spared.contains(target) {
            self.private(
                guardian,
                Notice::good(
                    "You drove off an attacker",
                    format!("Someone tried to get into {}'s home. You stopped them.", target),
                ),
            );
        } else {
            self.private(
                guardian,
                Notice::text(format!("Your watch over {}'s home was quiet.", target)),
            );
        }
        ControlFlow::Continue(())
    }

    fn give_treat(&mut self, baker: &str, target: &str) -> ControlFlow<VictoryReason> {
        let is_wolf = self.game.player(target).is_some_and(|p| p.role.is_core_wolf());
        if is_wolf {
            return self.kill(baker, DeathCause::VisitedWerewolf);
        }
        if self.killed.contains(target) {
            self.private(
                baker,
                Notice::bad(
                    "Wrong place, wrong time",
                    format!("You arrived at {}'s home in the middle of an attack.", target),
                ),
            );
            return self.kill(baker, DeathCause::CaughtInAttack);
        }
        self.private(target, Notice::good("A treat!", "Someone left a warm pastry at your door."));
        self.private(baker, Notice::text(format!("You delivered your treat to {}.", target)));
        ControlFlow::Continue(())
    }
}
