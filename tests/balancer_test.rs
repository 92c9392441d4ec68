use werewolf_server::{
    error::GameError,
    models::role::{Role, Team},
    ports::SystemRandom,
    services::balancer::{balance_ratio, evil_slots, generate_roles, BALANCE_WINDOW},
    utils::test_setup::{setup_test_env, SeededRandom},
};

fn assert_valid(roles: &[Role], party_size: usize) {
    assert_eq!(roles.len(), party_size);
    for role in Role::ALL {
        let count = roles.iter().filter(|r| **r == role).count();
        if count == 0 {
            continue;
        }
        assert!(count <= role.max_count(), "{} x{} in {:?}", role, count, roles);
        assert!(
            party_size >= role.min_party_size(),
            "{} needs {} players, got {}",
            role,
            role.min_party_size(),
            party_size
        );
    }
    if roles.contains(&Role::Beholder) {
        assert!(roles.contains(&Role::Seer));
    }
    if roles.iter().any(|r| r.team() == Team::Werewolf) {
        assert!(roles.iter().any(|r| r.is_core_wolf()), "no core wolf in {:?}", roles);
    }
    let evil = roles.iter().filter(|r| r.team() == Team::Werewolf).count();
    assert_eq!(evil, evil_slots(party_size));

    let ratio = balance_ratio(roles, party_size).expect("a balanced game has werewolves");
    assert!(BALANCE_WINDOW.contains(&ratio), "ratio {} for {:?}", ratio, roles);
}

#[test]
fn test_generated_roles_respect_constraints() {
    setup_test_env();
    let rng = SystemRandom;
    for party_size in 3..=16 {
        for _ in 0..10 {
            let roles = generate_roles(party_size, &rng)
                .unwrap_or_else(|e| panic!("{} players: {}", party_size, e));
            assert_valid(&roles, party_size);
        }
    }
}

#[test]
fn test_seeded_generation_is_reproducible() {
    let first = generate_roles(9, &SeededRandom::new(42)).unwrap();
    let second = generate_roles(9, &SeededRandom::new(42)).unwrap();
    assert_eq!(first, second);
    assert_valid(&first, 9);
}

#[test]
fn test_unsatisfiable_sizes_fail_cleanly() {
    let rng = SystemRandom;
    for party_size in [0, 1, 2] {
        match generate_roles(party_size, &rng) {
            Err(GameError::BalancingFailed { party_size: reported }) => assert_eq!(reported, party_size),
            other => panic!("{} players should not balance, got {:?}", party_size, other),
        }
    }
}

#[test]
fn test_four_players_get_exactly_one_wolf() {
    let roles = generate_roles(4, &SystemRandom).unwrap();
    let wolves = roles.iter().filter(|r| r.team() == Team::Werewolf).count();
    assert_eq!(wolves, 1);
    assert!(roles.contains(&Role::Werewolf));
}
