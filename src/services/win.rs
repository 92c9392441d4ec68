use crate::models::{
    game::{DeathCause, Game, VictoryReason},
    notice::{Dispatch, Notice},
    player::PlayerId,
    role::Role,
};

/// Decides whether the death of `victim` by `cause` ends the game.
pub fn check_win(game: &Game, victim: &PlayerId, cause: DeathCause) -> Option<VictoryReason> {
    let jester_exiled = cause == DeathCause::Exile
        && game.player(victim).is_some_and(|p| p.role == Role::Jester);
    if jester_exiled {
        return Some(VictoryReason::Jester(victim.clone()));
    }

    let wolves = game.wolf_team_alive();
    if wolves == 0 {
        return Some(VictoryReason::Village);
    }
    if wolves >= game.others_alive() {
        return Some(VictoryReason::Werewolves);
    }
    None
}

#[derive(Debug, Default)]
pub struct Elimination {
    pub dispatches: Vec<Dispatch>,
    pub victory: Option<VictoryReason>,
}

/// Kills `victim`, applies what the death sets off and evaluates the win
/// conditions. Killing a dead player does nothing.
pub fn eliminate(game: &mut Game, victim: &PlayerId, cause: DeathCause) -> Elimination {
    let Some(player) = game.player_mut(victim) else {
        return Elimination::default();
    };
    if !player.alive {
        return Elimination::default();
    }
    player.alive = false;
    let was_core_wolf = player.role.is_core_wolf();
    log::info!("{} died ({:?})", victim, cause);

    let mut dispatches = vec![
        Dispatch::Private(victim.clone(), Notice::bad("You died", cause.private_message())),
        Dispatch::Group(Notice::bad("A death in the village", cause.public_message(victim))),
    ];

    if was_core_wolf && game.core_wolves_alive() == 0 {
        dispatches.extend(last_wolf_fallen(game));
    }

    let victory = check_win(game, victim, cause);
    Elimination { dispatches, victory }
}

fn last_wolf_fallen(game: &mut Game) -> Vec<Dispatch> {
    let mut dispatches = Vec::new();
    for id in game.living_ids() {
        let Some(player) = game.player_mut(&id) else {
            continue;
        };
        match player.role {
            Role::Cursed => {
                player.turn_into(Role::Werewolf);
                dispatches.push(Dispatch::Private(
                    id.clone(),
                    Notice::bad(
                        "The curse takes hold",
                        "With the last werewolf gone, the curse claims you. You are now a Werewolf.",
                    ),
                ));
            }
            Role::Avenger => {
                player.ability_active = true;
                dispatches.push(Dispatch::Private(
                    id.clone(),
                    Notice::info(
                        "Your time has come",
                        "The last werewolf has fallen. From tonight on you may attack one player each night.",
                    ),
                ));
            }
            _ => {}
        }
    }
    dispatches
}
