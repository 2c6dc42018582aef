use pokedex_pvp::battle::{
    compute_damage, run_battle, simulate_battle, BattleConfig, EndReason, ShieldReason, Side, Winner,
};
use pokedex_pvp::model::{Combatant, CombatantInput, MoveKind, RawMove};
use proptest::prelude::*;
use serde_json::json;

fn make_move(name: &str, move_type: &str, power: f64, energy: f64, turns: f64) -> RawMove {
    RawMove {
        name: Some(name.to_string()),
        move_type: Some(move_type.to_string()),
        power: Some(power),
        energy_delta: Some(energy),
        turns: Some(turns),
        ..RawMove::default()
    }
}

fn make_mon(
    name: &str,
    types: (&str, Option<&str>),
    stats: (f64, f64, f64),
    fast_move: RawMove,
    charged_moves: Vec<RawMove>,
) -> CombatantInput {
    CombatantInput {
        name: Some(name.to_string()),
        primary_type: Some(types.0.to_string()),
        secondary_type: types.1.map(str::to_string),
        atk: Some(stats.0),
        def: Some(stats.1),
        hp: Some(stats.2),
        fast_move,
        charged_moves,
        start_energy: None,
        shields: None,
    }
}

fn bulbasaur() -> CombatantInput {
    make_mon(
        "Bulbasaur",
        ("grass", Some("poison")),
        (118.0, 111.0, 128.0),
        make_move("Vine Whip", "grass", 5.0, 8.0, 1.0),
        vec![make_move("Power Whip", "grass", 90.0, -50.0, 1.0)],
    )
}

fn charizard() -> CombatantInput {
    make_mon(
        "Charizard",
        ("fire", Some("flying")),
        (223.0, 173.0, 186.0),
        make_move("Fire Spin", "fire", 14.0, 10.0, 2.0),
        vec![make_move("Blast Burn", "fire", 110.0, -50.0, 1.0)],
    )
}

#[test]
fn charizard_burns_through_bulbasaur() {
    let result = simulate_battle(&bulbasaur(), &charizard(), &BattleConfig::default());
    assert_eq!(result.winner, Winner::Right);
    assert_eq!(result.reason, EndReason::Faint);
    assert_eq!(result.left.hp_remaining, 0);
    assert_eq!(result.right.hp_remaining, 164);
    assert_eq!(result.turns_elapsed, 9);

    let last = result.timeline.last().expect("timeline");
    assert_eq!(last.actor, Side::Right);
    assert_eq!(last.target_hp, 0);
    assert_eq!(last.turn, 9);

    let fire_spin = result
        .timeline
        .iter()
        .find(|e| e.move_id == "fire_spin")
        .expect("fire spin used");
    assert!(fire_spin.stab);
    assert!((fire_spin.effectiveness - 1.6).abs() < 1e-9);
    assert_eq!(fire_spin.damage, 28);

    let vine_whip = result
        .timeline
        .iter()
        .find(|e| e.move_id == "vine_whip")
        .expect("vine whip used");
    assert!((vine_whip.effectiveness - 0.390625).abs() < 1e-9);
    assert_eq!(vine_whip.damage, 1);

    let power_whip: Vec<_> = result
        .timeline
        .iter()
        .filter(|e| e.action == MoveKind::Charged)
        .collect();
    assert_eq!(power_whip.len(), 1);
    assert_eq!(power_whip[0].turn, 8);
    assert_eq!(power_whip[0].damage, 15);
    assert!(!power_whip[0].shielded);
    assert_eq!(result.right.shields_remaining, 2);
}

#[test]
fn lethal_hit_is_shielded_then_lands() {
    let mut attacker = make_mon(
        "Blastoise",
        ("water", None),
        (200.0, 100.0, 100.0),
        make_move("Water Gun", "water", 5.0, 5.0, 1.0),
        vec![make_move("Hydro Cannon", "water", 150.0, -50.0, 1.0)],
    );
    attacker.start_energy = Some(100.0);
    let mut defender = make_mon(
        "Ponyta",
        ("fire", None),
        (100.0, 100.0, 100.0),
        make_move("Ember", "fire", 5.0, 5.0, 1.0),
        vec![],
    );
    defender.shields = Some(1.0);

    let result = simulate_battle(&attacker, &defender, &BattleConfig::default());

    let first = &result.timeline[0];
    assert_eq!(first.turn, 1);
    assert_eq!(first.action, MoveKind::Charged);
    assert!(first.shielded);
    assert_eq!(first.shield_reason, Some(ShieldReason::Lethal));
    assert_eq!(first.damage, 1);
    assert_eq!(first.target_hp, 99);
    assert_eq!(first.target_shields, 0);
    assert_eq!(first.actor_energy, 50);

    assert_eq!(result.timeline[1].actor, Side::Right);
    assert_eq!(result.timeline[1].action, MoveKind::Fast);

    assert_eq!(result.winner, Winner::Left);
    assert_eq!(result.reason, EndReason::Faint);
    assert_eq!(result.turns_elapsed, 2);
    assert_eq!(result.right.shields_remaining, 0);
    assert_eq!(result.left.energy_remaining, 0);
}

#[test]
fn battles_are_deterministic() {
    let config = BattleConfig::default();
    let first = simulate_battle(&bulbasaur(), &charizard(), &config);
    let second = simulate_battle(&bulbasaur(), &charizard(), &config);
    assert_eq!(first, second);
}

#[test]
fn stalemate_ends_on_the_turn_limit() {
    let wall = |name: &str| {
        make_mon(
            name,
            ("steel", None),
            (100.0, 100.0, 10_000.0),
            make_move("Tap", "normal", 0.0, 0.0, 1.0),
            vec![],
        )
    };
    let config = BattleConfig::clamped(Some(5));
    assert_eq!(config.max_turns, 20);

    let result = simulate_battle(&wall("A"), &wall("B"), &config);
    assert_eq!(result.reason, EndReason::TurnLimit);
    assert_eq!(result.winner, Winner::Draw);
    assert_eq!(result.turns_elapsed, 20);
    assert_eq!(result.timeline.len(), 40);
    assert_eq!(result.left.hp_remaining, 9_980);
    assert_eq!(result.right.hp_remaining, 9_980);
}

#[test]
fn malformed_input_still_battles() {
    let request: pokedex_pvp::model::BattleRequest = serde_json::from_value(json!({
        "left": { "atk": "abc", "def": null, "hp": "120", "fastMove": { "power": "nope" } },
        "right": { "type1": "ghost", "type2": "ghost", "shields": -3, "chargedMoves": [{}] },
        "maxTurns": 5000
    }))
    .expect("request json");
    let config = BattleConfig::clamped(request.max_turns);
    assert_eq!(config.max_turns, 1000);

    let result = simulate_battle(&request.left, &request.right, &config);
    assert_eq!(result.left.name, "left");
    assert_eq!(result.right.name, "right");
    assert_eq!(result.right.shields_remaining, 0);
    assert!(result.turns_elapsed >= 1);
    assert!(!result.timeline.is_empty());
}

#[test]
fn result_serializes_with_camel_case_fields() {
    let result = simulate_battle(&bulbasaur(), &charizard(), &BattleConfig::default());
    let value = serde_json::to_value(&result).expect("serialize");
    assert_eq!(value["winner"], "right");
    assert_eq!(value["reason"], "faint");
    assert!(value["turnsElapsed"].is_u64());
    assert!(value["timeline"][0]["moveId"].is_string());
    assert!(value["left"]["hpRemaining"].is_u64());
}

fn arb_mon(prefix: &'static str) -> impl Strategy<Value = CombatantInput> {
    (
        1.0f64..300.0,
        1.0f64..300.0,
        1.0f64..400.0,
        0.0f64..20.0,
        0.0f64..20.0,
        1.0f64..4.0,
        proptest::collection::vec((0.0f64..200.0, 20.0f64..100.0), 0..3),
        0u8..4,
    )
        .prop_map(move |(atk, def, hp, power, gain, turns, charged, shields)| {
            let mut mon = make_mon(
                prefix,
                ("water", Some("dragon")),
                (atk, def, hp),
                make_move("Fast", "water", power, gain, turns),
                charged
                    .into_iter()
                    .map(|(power, cost)| make_move("Charged", "dragon", power, -cost, 1.0))
                    .collect(),
            );
            mon.shields = Some(shields as f64);
            mon
        })
}

proptest! {
    #[test]
    fn damage_is_never_below_one(
        power in 0.0f64..500.0,
        atk in 0.01f64..500.0,
        def in 0.01f64..500.0,
    ) {
        let attacker = Combatant::from_input(
            &make_mon("a", ("bug", None), (atk, 100.0, 100.0), RawMove::default(), vec![]),
            "a",
        );
        let defender = Combatant::from_input(
            &make_mon("d", ("fire", Some("flying")), (100.0, def, 100.0), RawMove::default(), vec![]),
            "d",
        );
        let mv = pokedex_pvp::model::Move::normalize(
            &make_move("Struggle", "bug", power, 0.0, 1.0),
            MoveKind::Fast,
        );
        prop_assert!(compute_damage(&attacker, &defender, &mv).amount >= 1);
    }

    #[test]
    fn shields_and_hp_only_go_down(left in arb_mon("L"), right in arb_mon("R")) {
        let left = Combatant::from_input(&left, "left");
        let right = Combatant::from_input(&right, "right");
        let result = run_battle(&left, &right, &BattleConfig { max_turns: 100 });

        let mut hp = [left.max_hp, right.max_hp];
        let mut shields = [left.shields, right.shields];
        for event in &result.timeline {
            let idx = match event.target {
                Side::Left => 0,
                Side::Right => 1,
            };
            prop_assert!(event.target_hp <= hp[idx]);
            prop_assert!(event.target_shields <= shields[idx]);
            prop_assert_eq!(event.shielded, event.shield_reason.is_some());
            if event.shielded {
                prop_assert_eq!(event.target_shields + 1, shields[idx]);
                prop_assert_eq!(event.damage, 1);
            }
            hp[idx] = event.target_hp;
            shields[idx] = event.target_shields;
        }
        let shielded = |side: Side| {
            result
                .timeline
                .iter()
                .filter(|e| e.target == side && e.shielded)
                .count() as u32
        };
        prop_assert_eq!(shielded(Side::Left), left.shields - result.left.shields_remaining);
        prop_assert_eq!(shielded(Side::Right), right.shields - result.right.shields_remaining);
        prop_assert!(result.left.energy_remaining <= 100);
        prop_assert!(result.right.energy_remaining <= 100);
        prop_assert!(result.turns_elapsed >= 1 && result.turns_elapsed <= 100);
    }
}
