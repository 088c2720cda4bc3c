use battle_city_core::{
    Adjacency, Archetype, CellCoord, EnemyFactory, EnemyId, Event, Prerequisite, SpawnError,
    SpawnPointId, SpawnRequest, Tick, WaveId, WorldSnapshot,
};
use battle_city_system_spawn_points::{SpawnPoint, SpawnPointPolicyConfig};
use battle_city_system_spawning::{SpawnedEnemy, Spawner, SpawnerConfig, WaveEntry};
use battle_city_world::{GridConfig, GridMap};
use glam::Vec2;

#[derive(Default)]
struct SequentialFactory {
    next: u32,
    created: Vec<(Archetype, Vec2)>,
}

impl EnemyFactory for SequentialFactory {
    fn create_enemy(&mut self, archetype: &Archetype, position: Vec2) -> EnemyId {
        self.next += 1;
        self.created.push((archetype.clone(), position));
        EnemyId::new(self.next)
    }
}

fn grid() -> GridMap {
    GridMap::new(GridConfig::new(13, 13, 1.0, Adjacency::Cardinal)).expect("grid")
}

fn snapshot(tick: u64) -> WorldSnapshot {
    WorldSnapshot::new(Tick::new(tick), Adjacency::Cardinal)
}

fn three_points() -> Vec<SpawnPoint> {
    vec![
        SpawnPoint::new(SpawnPointId::new(0), CellCoord::new(0, 0)).with_tag("A"),
        SpawnPoint::new(SpawnPointId::new(1), CellCoord::new(6, 0)).with_tag("A"),
        SpawnPoint::new(SpawnPointId::new(2), CellCoord::new(12, 0)).with_tag("B"),
    ]
}

fn basic(tick: u64) -> SpawnRequest {
    SpawnRequest::new(Archetype::new("basic"), Tick::new(tick))
}

struct Step {
    spawned: Vec<SpawnedEnemy>,
    events: Vec<Event>,
}

fn run(spawner: &mut Spawner, tick: u64, grid: &GridMap, factory: &mut SequentialFactory) -> Step {
    let mut spawned = Vec::new();
    let mut events = Vec::new();
    spawner.update(
        Tick::new(tick),
        &snapshot(tick),
        grid,
        factory,
        &mut spawned,
        &mut events,
    );
    Step { spawned, events }
}

#[test]
fn never_exceeds_population_cap_and_never_loses_requests() {
    let grid = grid();
    let mut factory = SequentialFactory::default();
    let mut spawner = Spawner::new(
        SpawnerConfig::new(3, 2, SpawnPointPolicyConfig::LeastRecentlyUsed),
        three_points(),
    );
    for index in 0..20 {
        spawner.queue(basic(index % 7));
    }

    let mut alive: Vec<EnemyId> = Vec::new();
    for tick in 0..400 {
        let step = run(&mut spawner, tick, &grid, &mut factory);
        alive.extend(step.spawned.iter().map(|spawned| spawned.enemy));
        assert!(spawner.alive() <= 3, "cap exceeded at tick {tick}");
        assert_eq!(spawner.alive() as usize, alive.len());

        let stats = spawner.stats();
        assert_eq!(stats.planned, stats.spawned + stats.pending);

        if tick % 5 == 4 {
            if let Some(enemy) = alive.first().copied() {
                let _ = alive.remove(0);
                spawner.enemy_removed(enemy);
            }
        }
    }

    let stats = spawner.stats();
    assert_eq!(stats.spawned, 20);
    assert_eq!(stats.pending, 0);
}

#[test]
fn one_enemy_per_spawn_cell_per_tick() {
    let grid = grid();
    let mut factory = SequentialFactory::default();
    let mut spawner = Spawner::new(
        SpawnerConfig::new(10, 3, SpawnPointPolicyConfig::RoundRobin),
        three_points(),
    );
    for _ in 0..5 {
        spawner.queue(basic(0));
    }

    let step = run(&mut spawner, 0, &grid, &mut factory);
    let mut cells: Vec<CellCoord> = step.spawned.iter().map(|spawned| spawned.cell).collect();
    cells.sort();
    cells.dedup();
    assert_eq!(step.spawned.len(), 3);
    assert_eq!(cells.len(), 3);

    let deferred: Vec<Tick> = step
        .events
        .iter()
        .filter_map(|event| match event {
            Event::SpawnDeferred {
                reason: SpawnError::SpawnPointUnavailable,
                retry_at,
                ..
            } => Some(*retry_at),
            _ => None,
        })
        .collect();
    assert_eq!(deferred, vec![Tick::new(3), Tick::new(3)]);
    assert_eq!(spawner.pending(), 2);
}

#[test]
fn occupied_points_defer_until_retry() {
    let mut grid = grid();
    let mut factory = SequentialFactory::default();
    let points = vec![SpawnPoint::new(SpawnPointId::new(0), CellCoord::new(4, 4))];
    let mut spawner = Spawner::new(
        SpawnerConfig::new(4, 5, SpawnPointPolicyConfig::RoundRobin),
        points,
    );
    spawner.queue(basic(0));

    grid.refresh_occupancy([(EnemyId::new(99), CellCoord::new(4, 4))], &[]);
    let step = run(&mut spawner, 0, &grid, &mut factory);
    assert!(step.spawned.is_empty());
    assert!(matches!(
        step.events.as_slice(),
        [Event::SpawnDeferred { retry_at, .. }] if *retry_at == Tick::new(5)
    ));

    grid.refresh_occupancy(std::iter::empty(), &[]);
    for tick in 1..5 {
        assert!(run(&mut spawner, tick, &grid, &mut factory).spawned.is_empty());
    }
    let step = run(&mut spawner, 5, &grid, &mut factory);
    assert_eq!(step.spawned.len(), 1);
    assert_eq!(factory.created[0].1, Vec2::new(4.5, 4.5));
    assert_eq!(
        spawner.points()[0].last_used(),
        Some(Tick::new(5))
    );
}

#[test]
fn tagged_requests_use_matching_points_only() {
    let grid = grid();
    let mut factory = SequentialFactory::default();
    let mut spawner = Spawner::new(SpawnerConfig::default(), three_points());
    spawner.queue(basic(0).with_tag("B"));
    spawner.queue(basic(0).with_tag("B"));
    spawner.queue(basic(0).with_tag("C"));

    let step = run(&mut spawner, 0, &grid, &mut factory);
    assert_eq!(step.spawned.len(), 1);
    assert_eq!(step.spawned[0].spawn_point, SpawnPointId::new(2));
    assert_eq!(spawner.pending(), 2);
}

#[test]
fn disabled_points_are_never_used() {
    let grid = grid();
    let mut factory = SequentialFactory::default();
    let mut spawner = Spawner::new(SpawnerConfig::default(), three_points());
    assert!(spawner.set_point_enabled(SpawnPointId::new(0), false));
    assert!(!spawner.set_point_enabled(SpawnPointId::new(9), false));
    spawner.queue(basic(0).with_tag("A"));
    spawner.queue(basic(0).with_tag("A"));

    let step = run(&mut spawner, 0, &grid, &mut factory);
    assert_eq!(step.spawned.len(), 1);
    assert_eq!(step.spawned[0].spawn_point, SpawnPointId::new(1));
}

#[test]
fn requests_wait_for_their_tick_and_prerequisites() {
    let grid = grid();
    let mut factory = SequentialFactory::default();
    let mut spawner = Spawner::new(SpawnerConfig::default(), three_points());
    spawner.queue(basic(2));
    spawner.queue(basic(0).with_prerequisite(Prerequisite::FieldClear));

    let step = run(&mut spawner, 0, &grid, &mut factory);
    assert_eq!(step.spawned.len(), 1);
    assert!(step.events.iter().all(|event| matches!(event, Event::EnemySpawned { .. })));
    let first = step.spawned[0].enemy;

    assert!(run(&mut spawner, 1, &grid, &mut factory).spawned.is_empty());
    assert_eq!(run(&mut spawner, 2, &grid, &mut factory).spawned.len(), 1);
    assert_eq!(spawner.alive(), 2);

    spawner.enemy_removed(first);
    spawner.enemy_removed(EnemyId::new(2));
    spawner.enemy_removed(EnemyId::new(2));
    assert_eq!(spawner.alive(), 0);
    assert_eq!(spawner.pending(), 0);
}

#[test]
fn waves_expand_and_gate_on_the_previous_wave() {
    let grid = grid();
    let mut factory = SequentialFactory::default();
    let mut spawner = Spawner::new(SpawnerConfig::default(), three_points());
    let schedule: Vec<WaveEntry> = serde_json::from_str(
        r#"[
            { "wave": 1, "archetype": "basic", "count": 2, "spawn_symbol": "A" },
            { "wave": 2, "archetype": "armored", "after_wave": 1 }
        ]"#,
    )
    .expect("schedule");
    spawner.schedule(&schedule);
    assert_eq!(spawner.stats().planned, 3);
    assert!(!spawner.is_wave_cleared(WaveId::new(1)));

    let step = run(&mut spawner, 0, &grid, &mut factory);
    assert_eq!(step.spawned.len(), 2);
    assert!(step
        .spawned
        .iter()
        .all(|spawned| spawned.spawn_point != SpawnPointId::new(2)));

    spawner.enemy_removed(step.spawned[0].enemy);
    assert!(run(&mut spawner, 1, &grid, &mut factory).spawned.is_empty());

    spawner.enemy_removed(step.spawned[1].enemy);
    assert!(spawner.is_wave_cleared(WaveId::new(1)));
    let step = run(&mut spawner, 2, &grid, &mut factory);
    assert_eq!(step.spawned.len(), 1);
    assert_eq!(step.spawned[0].archetype, Archetype::new("armored"));
}
