use std::time::Duration;

use battle_city_core::{
    Archetype, CellCoord, Command, EnemyFactory, EnemyId, Event, GridMutation, ObstacleKind,
    PlayerId, PlayerSnapshot, SpawnPointId, SpawnRequest, Tick, WaveId,
};
use battle_city_simulation::{apply, query, ConfigError, Match, MatchConfig};
use battle_city_system_controller::ArchetypeConfig;
use battle_city_system_goals::GoalConfig;
use battle_city_system_movement::MovementConfig;
use battle_city_system_spawn_points::{SpawnPointConfig, SpawnPointPolicyConfig};
use battle_city_system_spawning::{SpawnerConfig, WaveEntry};
use battle_city_world::{LayoutError, LegendEntry, MapLayout};
use glam::Vec2;

const DT: Duration = Duration::from_millis(50);

#[derive(Default)]
struct SequentialFactory {
    next: u32,
}

impl EnemyFactory for SequentialFactory {
    fn create_enemy(&mut self, _archetype: &Archetype, _position: Vec2) -> EnemyId {
        self.next += 1;
        EnemyId::new(self.next)
    }
}

fn layout(rows: &[&str]) -> MapLayout {
    let mut layout = MapLayout {
        rows: rows.iter().map(|row| (*row).to_owned()).collect(),
        ..MapLayout::default()
    };
    let _ = layout
        .legend
        .insert('#', LegendEntry::obstacle(ObstacleKind::Brick));
    let _ = layout.legend.insert(
        'S',
        LegendEntry {
            enemy_spawn: true,
            ..LegendEntry::default()
        },
    );
    let _ = layout.legend.insert(
        'B',
        LegendEntry {
            base: true,
            ..LegendEntry::default()
        },
    );
    layout
}

fn arena() -> MapLayout {
    layout(&["S.....S", ".......", "..###..", ".......", "...B..."])
}

fn wave(wave: u32, archetype: &str, count: u32) -> WaveEntry {
    WaveEntry {
        wave: WaveId::new(wave),
        at_tick: Tick::ZERO,
        archetype: Archetype::new(archetype),
        count,
        spawn_symbol: None,
        after_wave: None,
    }
}

fn config(max_alive: u32, waves: Vec<WaveEntry>) -> MatchConfig {
    let mut config = MatchConfig::new(arena());
    let _ = config
        .archetypes
        .insert(Archetype::new("basic"), ArchetypeConfig::default());
    let _ = config.archetypes.insert(
        Archetype::new("hunter"),
        ArchetypeConfig {
            movement: MovementConfig::Wander {
                activate_beyond: 3,
                min_stride: 1,
                max_stride: 3,
                bias: 0.5,
                seed: 11,
            },
            goal: GoalConfig::HuntNearestPlayer {
                reevaluate_every: 10,
            },
            ..ArchetypeConfig::default()
        },
    );
    config.spawner = SpawnerConfig::new(max_alive, 4, SpawnPointPolicyConfig::RoundRobin);
    config.waves = waves;
    config
}

fn player(column: u32, row: u32) -> PlayerSnapshot {
    PlayerSnapshot {
        id: PlayerId::new(1),
        cell: CellCoord::new(column, row),
        position: Vec2::new(column as f32 + 0.5, row as f32 + 0.5),
        health: 3,
        alive: true,
    }
}

fn tick(game: &mut Match, factory: &mut SequentialFactory) -> Vec<Event> {
    let mut events = Vec::new();
    apply(game, Command::Tick { dt: DT }, factory, &mut events);
    events
}

fn scripted_run() -> (Vec<Event>, Vec<query::EnemySnapshot>) {
    let mut game = Match::new(config(
        3,
        vec![wave(1, "basic", 3), wave(2, "hunter", 3)],
    ))
    .expect("match");
    let mut factory = SequentialFactory::default();
    let mut events = Vec::new();

    for step in 0..160_u32 {
        let command = match step {
            5 => Some(Command::SyncPlayers {
                players: vec![player(6, 3)],
            }),
            20 => Some(Command::MutateGrid {
                mutation: GridMutation::HitObstacle {
                    cell: CellCoord::new(3, 2),
                    damage: 2,
                },
            }),
            40 => Some(Command::EnemyDied {
                enemy: EnemyId::new(1),
            }),
            60 => Some(Command::SyncPlayers {
                players: vec![player(1, 3)],
            }),
            90 => Some(Command::EnemyDied {
                enemy: EnemyId::new(2),
            }),
            _ => None,
        };
        if let Some(command) = command {
            apply(&mut game, command, &mut factory, &mut events);
        }
        apply(&mut game, Command::Tick { dt: DT }, &mut factory, &mut events);
    }

    (events, query::enemy_view(&game))
}

#[test]
fn replaying_the_same_commands_reproduces_the_match() {
    let first = scripted_run();
    let second = scripted_run();
    assert!(first
        .0
        .iter()
        .any(|event| matches!(event, Event::ObstacleDestroyed { .. })));
    assert!(first
        .0
        .iter()
        .any(|event| matches!(event, Event::EnemyDied { .. })));
    assert_eq!(first, second);
}

#[test]
fn new_enemies_act_in_the_tick_they_spawn() {
    let mut game = Match::new(config(4, vec![wave(1, "basic", 2)])).expect("match");
    let mut factory = SequentialFactory::default();
    let events = tick(&mut game, &mut factory);

    let spawned = events
        .iter()
        .position(|event| matches!(event, Event::EnemySpawned { .. }))
        .expect("spawn");
    let planned = events
        .iter()
        .position(|event| matches!(event, Event::PathPlanned { .. }))
        .expect("plan");
    let moved = events
        .iter()
        .position(|event| matches!(event, Event::EnemyMoved { .. }))
        .expect("move");
    assert!(matches!(events[0], Event::TimeAdvanced { tick, .. } if tick == Tick::ZERO));
    assert!(spawned < planned && planned < moved);

    let view = query::enemy_view(&game);
    assert_eq!(view.len(), 2);
    assert!(view
        .iter()
        .all(|enemy| enemy.goal.map(|goal| goal.cell()) == Some(CellCoord::new(3, 4))));
    assert_eq!(query::tick(&game), Tick::new(1));
}

#[test]
fn grid_mutations_land_before_planning() {
    let mut config = MatchConfig::new(layout(&["S#B"]));
    let _ = config
        .archetypes
        .insert(Archetype::new("basic"), ArchetypeConfig::default());
    config.waves = vec![wave(1, "basic", 1)];
    let mut game = Match::new(config).expect("match");
    let mut factory = SequentialFactory::default();
    let mut events = Vec::new();

    apply(
        &mut game,
        Command::MutateGrid {
            mutation: GridMutation::HitObstacle {
                cell: CellCoord::new(1, 0),
                damage: 5,
            },
        },
        &mut factory,
        &mut events,
    );
    assert!(events.is_empty());
    apply(&mut game, Command::Tick { dt: DT }, &mut factory, &mut events);

    let destroyed = events
        .iter()
        .position(|event| matches!(event, Event::ObstacleDestroyed { .. }))
        .expect("destroyed");
    let planned = events
        .iter()
        .position(|event| {
            matches!(
                event,
                Event::PathPlanned {
                    steps: 2,
                    reached_goal: true,
                    ..
                }
            )
        })
        .expect("planned through the rubble");
    assert!(destroyed < planned);
    assert!(query::grid(&game)
        .is_traversable(CellCoord::new(1, 0))
        .expect("in range"));
}

#[test]
fn despawn_all_leaves_no_controllers_or_motion() {
    let mut game = Match::new(config(2, vec![wave(1, "basic", 2)])).expect("match");
    let mut factory = SequentialFactory::default();
    for _ in 0..5 {
        let _ = tick(&mut game, &mut factory);
    }
    assert_eq!(query::live_enemies(&game), 2);
    assert_eq!(query::pending_motion(&game), 2);

    let mut events = Vec::new();
    apply(&mut game, Command::DespawnAll, &mut factory, &mut events);
    assert_eq!(
        events,
        vec![
            Event::EnemyDespawned {
                enemy: EnemyId::new(1)
            },
            Event::EnemyDespawned {
                enemy: EnemyId::new(2)
            },
        ]
    );
    assert_eq!(query::live_enemies(&game), 0);
    assert_eq!(query::pending_motion(&game), 0);
    assert!(query::enemy_view(&game).is_empty());
    assert_eq!(query::spawner_stats(&game).alive, 0);

    for _ in 0..10 {
        assert!(tick(&mut game, &mut factory)
            .iter()
            .all(|event| !matches!(event, Event::EnemyMoved { .. })));
    }
}

#[test]
fn deaths_release_capacity_for_queued_requests() {
    let mut game = Match::new(config(1, vec![wave(1, "basic", 2)])).expect("match");
    let mut factory = SequentialFactory::default();
    let _ = tick(&mut game, &mut factory);
    let _ = tick(&mut game, &mut factory);
    assert_eq!(query::spawner_stats(&game).spawned, 1);
    assert_eq!(query::spawner_stats(&game).pending, 1);

    let mut events = Vec::new();
    apply(
        &mut game,
        Command::EnemyDied {
            enemy: EnemyId::new(7),
        },
        &mut factory,
        &mut events,
    );
    assert!(events.is_empty());

    apply(
        &mut game,
        Command::EnemyDied {
            enemy: EnemyId::new(1),
        },
        &mut factory,
        &mut events,
    );
    assert_eq!(
        events,
        vec![Event::EnemyDied {
            enemy: EnemyId::new(1)
        }]
    );
    assert_eq!(query::live_enemies(&game), 0);

    let events = tick(&mut game, &mut factory);
    assert!(events.iter().any(|event| matches!(
        event,
        Event::EnemySpawned { enemy, .. } if *enemy == EnemyId::new(2)
    )));
}

#[test]
fn destroyed_base_leaves_attackers_without_a_goal() {
    let mut game = Match::new(config(2, vec![wave(1, "basic", 1)])).expect("match");
    let mut factory = SequentialFactory::default();
    for _ in 0..3 {
        let _ = tick(&mut game, &mut factory);
    }
    assert_eq!(query::pending_motion(&game), 1);

    let mut events = Vec::new();
    apply(&mut game, Command::BaseDestroyed, &mut factory, &mut events);
    assert_eq!(query::base(&game), None);
    let _ = tick(&mut game, &mut factory);

    let view = query::enemy_view(&game);
    assert_eq!(view[0].goal, None);
    assert_eq!(query::pending_motion(&game), 0);
    assert!(tick(&mut game, &mut factory)
        .iter()
        .all(|event| !matches!(event, Event::EnemyMoved { .. })));
}

#[test]
fn queued_spawns_for_unknown_archetypes_are_rejected() {
    let mut game = Match::new(config(2, Vec::new())).expect("match");
    let mut factory = SequentialFactory::default();
    let mut events = Vec::new();
    apply(
        &mut game,
        Command::QueueSpawn {
            request: SpawnRequest::new(Archetype::new("ghost"), Tick::ZERO),
        },
        &mut factory,
        &mut events,
    );
    apply(
        &mut game,
        Command::QueueSpawn {
            request: SpawnRequest::new(Archetype::new("basic"), Tick::new(1)),
        },
        &mut factory,
        &mut events,
    );
    assert_eq!(query::spawner_stats(&game).planned, 1);
}

#[test]
fn invalid_configurations_are_rejected() {
    let unknown = config(2, vec![wave(1, "ghost", 1)]);
    assert_eq!(
        unknown.validate(),
        Err(ConfigError::UnknownArchetype {
            archetype: Archetype::new("ghost")
        })
    );

    let mut outside = config(2, Vec::new());
    outside.spawn_points = vec![SpawnPointConfig::new(
        SpawnPointId::new(0),
        CellCoord::new(40, 0),
    )];
    assert!(matches!(
        Match::new(outside),
        Err(ConfigError::SpawnPointOutOfRange { id: 0, .. })
    ));

    let mut duplicated = config(2, Vec::new());
    duplicated.spawn_points = vec![
        SpawnPointConfig::new(SpawnPointId::new(3), CellCoord::new(1, 1)),
        SpawnPointConfig::new(SpawnPointId::new(3), CellCoord::new(2, 1)),
    ];
    assert_eq!(
        duplicated.validate(),
        Err(ConfigError::DuplicateSpawnPoint { id: 3 })
    );

    let mut ragged = config(2, Vec::new());
    ragged.layout = layout(&["...", ".."]);
    assert!(matches!(
        ragged.validate(),
        Err(ConfigError::Layout(LayoutError::RaggedRow { row: 1, .. }))
    ));

    let mut stalled = config(2, vec![wave(1, "basic", 1)]);
    stalled.layout = layout(&["..B"]);
    assert_eq!(stalled.validate(), Err(ConfigError::NoSpawnPoints));

    let mut slow = config(2, Vec::new());
    if let Some(basic) = slow.archetypes.get_mut(&Archetype::new("basic")) {
        basic.speed = 0.0;
    }
    assert!(matches!(
        slow.validate(),
        Err(ConfigError::InvalidArchetype { .. })
    ));
}

#[test]
fn declared_and_layout_spawn_points_share_the_pool() {
    let mut config = config(4, Vec::new());
    config.spawn_points = vec![SpawnPointConfig::new(
        SpawnPointId::new(5),
        CellCoord::new(3, 0),
    )];
    config.validate().expect("valid");
    let game = Match::new(config).expect("match");
    assert_eq!(query::features(&game).spawn_cells[&'S'].len(), 2);
    assert_eq!(query::spawner_stats(&game).planned, 0);
}

#[test]
fn exhausted_spawn_point_ids_are_a_configuration_error() {
    let mut config = config(2, Vec::new());
    config.layout = layout(&["S.."]);
    config.spawn_points = vec![SpawnPointConfig::new(
        SpawnPointId::new(u32::MAX),
        CellCoord::new(2, 0),
    )];
    assert_eq!(config.validate(), Err(ConfigError::SpawnPointIdsExhausted));

    config.layout = layout(&["..."]);
    config.validate().expect("no layout cells need numbering");
}

#[test]
fn configuration_loads_from_json() {
    let config: MatchConfig = serde_json::from_str(
        r##"{
            "layout": {
                "rows": ["S.S", "...", ".B."],
                "legend": {
                    ".": {},
                    "S": { "enemy_spawn": true },
                    "B": { "base": true }
                }
            },
            "archetypes": {
                "basic": { "movement": { "kind": "direct_pursue" }, "speed": 3.0 }
            },
            "spawner": { "max_alive": 2, "policy": { "kind": "least_recently_used" } },
            "waves": [{ "wave": 1, "archetype": "basic", "count": 3 }]
        }"##,
    )
    .expect("config");
    assert_eq!(config.spawner.max_alive, 2);

    let mut game = Match::new(config).expect("match");
    let mut factory = SequentialFactory::default();
    let _ = tick(&mut game, &mut factory);
    assert_eq!(query::live_enemies(&game), 2);
    assert_eq!(query::base(&game), Some(CellCoord::new(1, 2)));
}
