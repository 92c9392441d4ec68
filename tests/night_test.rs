use std::ops::ControlFlow;
use std::time::Duration;

use werewolf_server::{
    models::{
        action::{Action, ActionKind, Location},
        game::{Game, VictoryReason},
        notice::{Dispatch, Notice},
        role::Role,
    },
    services::{
        clues::{investigate, Investigation},
        night::{kill_success_rate, resolve_night, NightReport},
    },
    utils::test_setup::{playing_game, ScriptedRandom, SeededRandom},
};

fn act(game: &mut Game, kind: ActionKind, actor: &str, target: &str) {
    game.actions
        .insert(actor.to_string(), Action::on_player(kind, actor, target));
}

fn private_to(report: &NightReport, player: &str) -> Vec<Notice> {
    report
        .dispatches
        .iter()
        .filter_map(|d| match d {
            Dispatch::Private(to, notice) if to == player => Some(notice.clone()),
            _ => None,
        })
        .collect()
}

fn group_titles(report: &NightReport) -> Vec<String> {
    report
        .dispatches
        .iter()
        .filter_map(|d| match d {
            Dispatch::Group(notice) => notice.title.clone(),
            _ => None,
        })
        .collect()
}

/// `front` followed by villagers up to `size` players.
fn roles(front: &[Role], size: usize) -> Vec<Role> {
    let mut roles = front.to_vec();
    roles.resize(size, Role::Villager);
    roles
}

#[test]
fn test_kill_rate_follows_party_size() {
    assert_eq!(kill_success_rate(4), 0.6);
    assert_eq!(kill_success_rate(5), 0.6);
    assert_eq!(kill_success_rate(7), 0.7);
    assert_eq!(kill_success_rate(8), 0.8);
    assert_eq!(kill_success_rate(9), 0.9);
    assert_eq!(kill_success_rate(12), 1.0);
}

#[test]
fn test_unprotected_kill_rate_converges() {
    let rng = SeededRandom::new(2024);
    let trials = 4000;
    let mut deaths = 0;
    for _ in 0..trials {
        let mut game = playing_game(&roles(&[Role::Werewolf], 5));
        act(&mut game, ActionKind::Kill, "p1", "p2");
        resolve_night(&mut game, &rng, Duration::ZERO);
        if !game.is_alive("p2") {
            deaths += 1;
        }
    }
    let rate = deaths as f64 / trials as f64;
    assert!((rate - 0.6).abs() < 0.04, "observed kill rate {}", rate);

    for _ in 0..100 {
        let mut game = playing_game(&roles(&[Role::Werewolf], 10));
        act(&mut game, ActionKind::Kill, "p1", "p2");
        resolve_night(&mut game, &rng, Duration::ZERO);
        assert!(!game.is_alive("p2"));
    }
}

#[test]
fn test_protected_target_survives_forced_success() {
    let rng = ScriptedRandom::always(true);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::Guardian], 5));
    act(&mut game, ActionKind::Kill, "p1", "p3");
    act(&mut game, ActionKind::Protect, "p2", "p3");

    let report = resolve_night(&mut game, &rng, Duration::ZERO);
    assert!(game.is_alive("p3"));
    assert!(game.is_alive("p2"));
    assert_eq!(report.flow, ControlFlow::Continue(()));
    assert!(private_to(&report, "p2")
        .iter()
        .any(|n| n.title.as_deref() == Some("You drove off an attacker")));
    assert!(group_titles(&report).contains(&"A quiet night".to_string()));
    assert!(game.actions.is_empty());
}

#[test]
fn test_guarding_a_wolf_can_be_fatal() {
    let rng = ScriptedRandom::always(true);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::Guardian], 6));
    act(&mut game, ActionKind::Protect, "p2", "p1");

    resolve_night(&mut game, &rng, Duration::ZERO);
    assert!(!game.is_alive("p2"));
}

#[test]
fn test_freeze_cancels_the_target_action() {
    let rng = ScriptedRandom::always(true);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::IceWitch, Role::Seer], 8));
    act(&mut game, ActionKind::Freeze, "p2", "p3");
    act(&mut game, ActionKind::CheckRole, "p3", "p1");

    let report = resolve_night(&mut game, &rng, Duration::ZERO);
    assert!(group_titles(&report).contains(&"A bitter frost".to_string()));
    let seer_notices = private_to(&report, "p3");
    assert!(seer_notices.iter().all(|n| n.title.as_deref() != Some("Your vision")));
    assert!(seer_notices.iter().any(|n| n.title.as_deref() == Some("Frozen")));
}

#[test]
fn test_frozen_wolf_cannot_kill() {
    let rng = ScriptedRandom::always(true);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::Werewolf, Role::IceWitch], 10));
    act(&mut game, ActionKind::Freeze, "p3", "p1");
    act(&mut game, ActionKind::Kill, "p1", "p5");

    resolve_night(&mut game, &rng, Duration::ZERO);
    assert!(game.is_alive("p5"));
}

#[test]
fn test_inebriation_blackout_drops_the_action() {
    // gen_index(3) == 1 is the blackout
    let rng = ScriptedRandom::always(true).with_indices([1]);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::Bartender], 7));
    act(&mut game, ActionKind::Inebriate, "p2", "p1");
    act(&mut game, ActionKind::Kill, "p1", "p3");

    let report = resolve_night(&mut game, &rng, Duration::ZERO);
    assert!(game.is_alive("p3"));
    assert!(private_to(&report, "p1")
        .iter()
        .any(|n| n.title.as_deref() == Some("Too many drinks")));
}

#[test]
fn test_inebriation_can_redirect() {
    // redirect, then pick index 3 of the living players other than p1
    let rng = ScriptedRandom::always(true).with_indices([0, 3]);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::Bartender], 10));
    act(&mut game, ActionKind::Inebriate, "p2", "p1");
    act(&mut game, ActionKind::Kill, "p1", "p3");

    resolve_night(&mut game, &rng, Duration::ZERO);
    assert!(game.is_alive("p3"));
    // living except p1: p2 p3 p4 p5 ..., index 3 is p5
    assert!(!game.is_alive("p5"));
}

#[test]
fn test_inebriation_can_fizzle() {
    let rng = ScriptedRandom::always(true).with_indices([2]);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::Bartender], 10));
    act(&mut game, ActionKind::Inebriate, "p2", "p1");
    act(&mut game, ActionKind::Kill, "p1", "p3");

    resolve_night(&mut game, &rng, Duration::ZERO);
    assert!(!game.is_alive("p3"));
}

#[test]
fn test_chaos_retargets_when_no_core_wolf_lives() {
    let rng = ScriptedRandom::always(true).with_indices([2]);
    let mut game = playing_game(&roles(&[Role::Lunatic], 10));
    act(&mut game, ActionKind::ChaosRedirect, "p1", "p2");

    let report = resolve_night(&mut game, &rng, Duration::ZERO);
    // living except p1: p2 p3 p4 ..., index 2 is p4
    assert!(game.is_alive("p2"));
    assert!(!game.is_alive("p4"));
    assert!(report
        .dispatches
        .iter()
        .any(|d| matches!(d, Dispatch::Group(n) if n.body.contains("lunatic"))));
}

#[test]
fn test_chaos_is_dormant_while_the_pack_hunts() {
    let rng = ScriptedRandom::always(true);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::Lunatic], 10));
    act(&mut game, ActionKind::ChaosRedirect, "p2", "p3");

    resolve_night(&mut game, &rng, Duration::ZERO);
    assert_eq!(game.living().count(), 10);
}

#[test]
fn test_attacked_seer_loses_vision() {
    let rng = ScriptedRandom::always(false);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::Seer], 5));
    act(&mut game, ActionKind::Kill, "p1", "p2");
    act(&mut game, ActionKind::CheckRole, "p2", "p1");

    let report = resolve_night(&mut game, &rng, Duration::ZERO);
    assert!(game.is_alive("p2"));
    assert!(private_to(&report, "p2").is_empty());
}

#[test]
fn test_away_from_home_escapes_attack() {
    let rng = ScriptedRandom::always(true);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::Detective], 6));
    act(&mut game, ActionKind::Kill, "p1", "p2");
    game.actions.insert(
        "p2".to_string(),
        Action::at_location("p2", Location::Tavern),
    );

    let report = resolve_night(&mut game, &rng, Duration::ZERO);
    assert!(game.is_alive("p2"));
    assert!(private_to(&report, "p1")
        .iter()
        .any(|n| n.body.contains("not at home")));
    assert!(private_to(&report, "p2")
        .iter()
        .any(|n| n.title.as_deref().is_some_and(|t| t.starts_with("Clue from"))));
}

#[test]
fn test_seer_sees_alpha_as_villager() {
    let rng = ScriptedRandom::always(true);
    let mut game = playing_game(&roles(&[Role::AlphaWolf, Role::Seer], 8));
    act(&mut game, ActionKind::CheckRole, "p2", "p1");

    let report = resolve_night(&mut game, &rng, Duration::ZERO);
    let vision = private_to(&report, "p2");
    assert_eq!(vision.len(), 1);
    assert_eq!(vision[0].body, "p1 is the Villager.");
}

#[test]
fn test_oracle_names_a_role_the_target_lacks() {
    let rng = ScriptedRandom::always(true);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::Oracle, Role::Seer], 6));
    act(&mut game, ActionKind::CheckRoleNegative, "p2", "p1");

    let report = resolve_night(&mut game, &rng, Duration::ZERO);
    let whisper = private_to(&report, "p2");
    assert_eq!(whisper.len(), 1);
    assert!(!whisper[0].body.contains("Werewolf"));
    assert!(!whisper[0].body.contains("Oracle"));
}

#[test]
fn test_treat_for_a_wolf_kills_the_baker() {
    let rng = ScriptedRandom::always(true);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::Baker], 6));
    act(&mut game, ActionKind::GiveTreat, "p2", "p1");

    resolve_night(&mut game, &rng, Duration::ZERO);
    assert!(!game.is_alive("p2"));
    assert!(game.is_alive("p1"));
}

#[test]
fn test_baker_caught_in_an_attack() {
    let rng = ScriptedRandom::always(true);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::Baker], 7));
    act(&mut game, ActionKind::Kill, "p1", "p3");
    act(&mut game, ActionKind::GiveTreat, "p2", "p3");

    resolve_night(&mut game, &rng, Duration::ZERO);
    assert!(!game.is_alive("p3"));
    assert!(!game.is_alive("p2"));
}

#[test]
fn test_treat_is_delivered() {
    let rng = ScriptedRandom::always(true);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::Baker], 6));
    act(&mut game, ActionKind::GiveTreat, "p2", "p4");

    let report = resolve_night(&mut game, &rng, Duration::ZERO);
    assert!(private_to(&report, "p4")
        .iter()
        .any(|n| n.title.as_deref() == Some("A treat!")));
}

#[test]
fn test_victory_stops_resolution() {
    let rng = ScriptedRandom::always(true);
    let mut game = playing_game(&[Role::Werewolf, Role::Villager, Role::Baker]);
    act(&mut game, ActionKind::Kill, "p1", "p2");
    act(&mut game, ActionKind::GiveTreat, "p3", "p2");

    let report = resolve_night(&mut game, &rng, Duration::ZERO);
    assert_eq!(report.flow, ControlFlow::Break(VictoryReason::Werewolves));
    // the Baker's stage never ran
    assert!(game.is_alive("p3"));
    assert!(private_to(&report, "p3").is_empty());
}

#[test]
fn test_armed_target_is_hard_to_kill() {
    // the wolf's reduced roll misses; the Avenger was caught at home so their shot never happens
    let rng = ScriptedRandom::always(true).with_bools([false]);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::Avenger], 8));
    game.player_mut("p2").unwrap().ability_active = true;
    act(&mut game, ActionKind::Kill, "p1", "p2");
    act(&mut game, ActionKind::Kill, "p2", "p3");

    let report = resolve_night(&mut game, &rng, Duration::ZERO);
    assert!(game.is_alive("p2"));
    assert!(game.is_alive("p3"));
    assert!(private_to(&report, "p1")
        .iter()
        .any(|n| n.body.contains("fought you off")));
}

#[test]
fn test_avenger_shot_ends_the_pack() {
    let rng = ScriptedRandom::always(true);
    let mut game = playing_game(&roles(&[Role::Werewolf, Role::Avenger], 8));
    game.player_mut("p2").unwrap().ability_active = true;
    act(&mut game, ActionKind::Kill, "p2", "p1");

    let report = resolve_night(&mut game, &rng, Duration::ZERO);
    assert!(!game.is_alive("p1"));
    assert_eq!(report.flow, ControlFlow::Break(VictoryReason::Village));
}

#[test]
fn test_pacing_pauses_precede_deaths() {
    let rng = ScriptedRandom::always(true);
    let pacing = Duration::from_secs(3);
    let mut game = playing_game(&roles(&[Role::Werewolf], 10));
    act(&mut game, ActionKind::Kill, "p1", "p2");

    let report = resolve_night(&mut game, &rng, pacing);
    let pauses = report
        .dispatches
        .iter()
        .filter(|d| **d == Dispatch::Pause(pacing))
        .count();
    assert_eq!(pauses, 2);
}

#[test]
fn test_detective_never_hears_the_same_clue_twice() {
    let rng = ScriptedRandom::always(true);
    let mut game = playing_game(&[Role::Werewolf, Role::Detective, Role::Villager, Role::Villager]);
    let detective = "p2".to_string();

    let mut seen = Vec::new();
    loop {
        match investigate(&mut game, &detective, Location::Tavern, &rng) {
            Investigation::Found(clue) => {
                assert!(!seen.contains(&clue.tag), "repeated {}", clue.tag);
                seen.push(clue.tag);
            }
            Investigation::NothingNew => break,
            Investigation::Failed => panic!("forced searches never fail"),
        }
    }
    // two wolf/villager pairs plus the head count
    assert_eq!(seen.len(), 3);
    assert_eq!(
        investigate(&mut game, &detective, Location::Tavern, &ScriptedRandom::always(false)),
        Investigation::Failed
    );
}
