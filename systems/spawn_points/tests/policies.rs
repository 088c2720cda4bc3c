use std::collections::BTreeMap;

use battle_city_core::{
    Adjacency, CellCoord, PlayerId, PlayerSnapshot, SpawnPointId, Tick, WorldSnapshot,
};
use battle_city_system_spawn_points::{
    SpawnPoint, SpawnPointConfig, SpawnPointPolicy, SpawnPointPolicyConfig,
};
use glam::Vec2;

fn point(id: u32, column: u32, row: u32) -> SpawnPoint {
    SpawnPoint::new(SpawnPointId::new(id), CellCoord::new(column, row))
}

fn empty_snapshot() -> WorldSnapshot {
    WorldSnapshot::new(Tick::ZERO, Adjacency::Cardinal)
}

fn player(id: u32, column: u32, row: u32) -> PlayerSnapshot {
    PlayerSnapshot {
        id: PlayerId::new(id),
        cell: CellCoord::new(column, row),
        position: Vec2::ZERO,
        health: 3,
        alive: true,
    }
}

#[test]
fn round_robin_covers_enabled_points_evenly() {
    let mut candidates = vec![
        point(0, 0, 0),
        point(1, 6, 0),
        point(2, 12, 0),
        point(3, 0, 6),
        point(4, 12, 6),
    ];
    candidates[1].set_enabled(false);
    candidates[3].set_enabled(false);
    let enabled = 3;

    for calls in [4_usize, 7, 10, 11] {
        let mut policy = SpawnPointPolicy::new(SpawnPointPolicyConfig::RoundRobin);
        let mut visits: BTreeMap<u32, usize> = BTreeMap::new();
        for _ in 0..calls {
            let id = policy
                .select_point(&candidates, &empty_snapshot())
                .expect("enabled point");
            *visits.entry(id.get()).or_default() += 1;
        }

        assert!(!visits.contains_key(&1));
        assert!(!visits.contains_key(&3));
        for id in [0, 2, 4] {
            assert!(visits.get(&id).copied().unwrap_or(0) >= calls / enabled);
        }
    }
}

#[test]
fn round_robin_resumes_after_candidate_set_changes() {
    let all = vec![point(0, 0, 0), point(1, 6, 0), point(2, 12, 0)];
    let mut policy = SpawnPointPolicy::new(SpawnPointPolicyConfig::RoundRobin);

    assert_eq!(
        policy.select_point(&all, &empty_snapshot()),
        Some(SpawnPointId::new(0))
    );
    let without_next = vec![all[0].clone(), all[2].clone()];
    assert_eq!(
        policy.select_point(&without_next, &empty_snapshot()),
        Some(SpawnPointId::new(2))
    );
    assert_eq!(
        policy.select_point(&all, &empty_snapshot()),
        Some(SpawnPointId::new(0))
    );
}

#[test]
fn policies_return_none_without_enabled_points() {
    let mut candidates = vec![point(0, 0, 0)];
    candidates[0].set_enabled(false);
    for config in [
        SpawnPointPolicyConfig::RoundRobin,
        SpawnPointPolicyConfig::LeastRecentlyUsed,
        SpawnPointPolicyConfig::FarthestFromPlayer,
        SpawnPointPolicyConfig::WeightedRandom { seed: 1 },
    ] {
        let mut policy = SpawnPointPolicy::new(config);
        assert_eq!(policy.select_point(&candidates, &empty_snapshot()), None);
        assert_eq!(policy.select_point(&[], &empty_snapshot()), None);
    }
}

#[test]
fn least_recently_used_prefers_unused_then_oldest_then_lower_id() {
    let mut candidates = vec![point(4, 0, 0), point(2, 6, 0), point(7, 12, 0)];
    let mut policy = SpawnPointPolicy::new(SpawnPointPolicyConfig::LeastRecentlyUsed);

    assert_eq!(
        policy.select_point(&candidates, &empty_snapshot()),
        Some(SpawnPointId::new(2))
    );

    candidates[0].mark_used(Tick::new(10));
    candidates[1].mark_used(Tick::new(12));
    assert_eq!(
        policy.select_point(&candidates, &empty_snapshot()),
        Some(SpawnPointId::new(7))
    );

    candidates[2].mark_used(Tick::new(10));
    assert_eq!(
        policy.select_point(&candidates, &empty_snapshot()),
        Some(SpawnPointId::new(4))
    );
}

#[test]
fn farthest_from_player_maximises_minimum_distance() {
    let candidates = vec![point(0, 0, 0), point(1, 6, 0), point(2, 12, 0)];
    let snapshot = empty_snapshot().with_players(vec![player(1, 1, 0), player(2, 11, 0)]);
    let mut policy = SpawnPointPolicy::new(SpawnPointPolicyConfig::FarthestFromPlayer);

    assert_eq!(
        policy.select_point(&candidates, &snapshot),
        Some(SpawnPointId::new(1))
    );

    let mut dead = player(2, 11, 0);
    dead.alive = false;
    let snapshot = empty_snapshot().with_players(vec![player(1, 1, 0), dead]);
    assert_eq!(
        policy.select_point(&candidates, &snapshot),
        Some(SpawnPointId::new(2))
    );

    assert_eq!(
        policy.select_point(&candidates, &empty_snapshot()),
        Some(SpawnPointId::new(0))
    );
}

#[test]
fn weighted_random_is_reproducible_and_respects_weights() {
    let candidates = vec![
        point(0, 0, 0).with_weight(1),
        point(1, 6, 0).with_weight(0),
        point(2, 12, 0).with_weight(9),
    ];
    let draw = |seed: u64| -> Vec<SpawnPointId> {
        let mut policy = SpawnPointPolicy::new(SpawnPointPolicyConfig::WeightedRandom { seed });
        (0..200)
            .filter_map(|_| policy.select_point(&candidates, &empty_snapshot()))
            .collect()
    };

    let first = draw(42);
    assert_eq!(first, draw(42));
    assert_eq!(first.len(), 200);
    assert!(!first.contains(&SpawnPointId::new(1)));

    let heavy = first
        .iter()
        .filter(|id| **id == SpawnPointId::new(2))
        .count();
    assert!(heavy > 140, "heavy point drawn only {heavy} times");
}

#[test]
fn configurations_load_from_json() {
    let policy: SpawnPointPolicyConfig =
        serde_json::from_str(r#"{ "kind": "weighted_random", "seed": 9 }"#).expect("policy");
    assert_eq!(policy, SpawnPointPolicyConfig::WeightedRandom { seed: 9 });

    let config: SpawnPointConfig =
        serde_json::from_str(r#"{ "id": 3, "cell": { "column": 2, "row": 0 }, "tags": ["A"] }"#)
            .expect("point");
    let point = SpawnPoint::from_config(&config);
    assert!(point.is_enabled());
    assert_eq!(point.weight(), 1);
    assert!(point.has_tag("A"));
    assert_eq!(point.cell(), CellCoord::new(2, 0));
}
