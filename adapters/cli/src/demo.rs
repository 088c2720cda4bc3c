//! Built-in match used when no configuration file is given.

use battle_city_core::{Archetype, CellCoord, ObstacleKind, Terrain, Tick, WaveId};
use battle_city_simulation::MatchConfig;
use battle_city_system_controller::{ArchetypeConfig, BreachConfig};
use battle_city_system_goals::GoalConfig;
use battle_city_system_movement::MovementConfig;
use battle_city_system_spawn_points::SpawnPointPolicyConfig;
use battle_city_system_spawning::{SpawnerConfig, WaveEntry};
use battle_city_world::{LegendEntry, MapLayout};

const ROWS: [&str; 13] = [
    "A.....B.....C",
    ".............",
    ".#.#.#.#.#.#.",
    ".#.#.#@#.#.#.",
    ".#.#.#.#.#.#.",
    ".....#.#.....",
    "@.##.....##.@",
    "....%#.#%....",
    ".#.#.#.#.#.#.",
    ".#.#.~~~.#.#.",
    ".#.#.....#.#.",
    ".....#.#.....",
    "....P#H#.....",
];

const MAX_ALIVE: u32 = 4;
const RETRY_DELAY_TICKS: u64 = 15;
const DEFAULT_SEED: u64 = 0x00c1_7e55;
const BASIC_HUNT_CHANCE: f32 = 0.3;

pub(crate) fn config() -> MatchConfig {
    let mut config = MatchConfig::new(layout());

    for (name, archetype) in [
        ("basic", basic()),
        ("fast", fast()),
        ("power", power()),
        ("armor", armor()),
    ] {
        let _ = config.archetypes.insert(Archetype::new(name), archetype);
    }

    config.spawner = SpawnerConfig::new(
        MAX_ALIVE,
        RETRY_DELAY_TICKS,
        SpawnPointPolicyConfig::WeightedRandom { seed: DEFAULT_SEED },
    );
    config.waves = vec![
        wave(1, 0, "basic", 4, None, None),
        wave(2, 120, "fast", 3, None, Some(1)),
        wave(3, 200, "power", 2, Some("B"), None),
        wave(4, 320, "armor", 2, None, Some(2)),
    ];
    config
}

fn layout() -> MapLayout {
    let mut layout = MapLayout {
        rows: ROWS.iter().map(|row| (*row).to_owned()).collect(),
        ..MapLayout::default()
    };
    let spawn = LegendEntry {
        enemy_spawn: true,
        ..LegendEntry::default()
    };
    let legend = [
        ('#', LegendEntry::obstacle(ObstacleKind::Brick)),
        ('@', LegendEntry::obstacle(ObstacleKind::Steel)),
        ('~', LegendEntry::terrain(Terrain::Water)),
        ('%', LegendEntry::terrain(Terrain::Forest)),
        ('A', spawn),
        ('B', spawn),
        ('C', spawn),
        (
            'P',
            LegendEntry {
                player_start: true,
                ..LegendEntry::default()
            },
        ),
        (
            'H',
            LegendEntry {
                base: true,
                ..LegendEntry::default()
            },
        ),
    ];
    layout.legend.extend(legend);
    layout
}

fn basic() -> ArchetypeConfig {
    ArchetypeConfig {
        goal: GoalConfig::RandomFixed {
            hunt_player_chance: BASIC_HUNT_CHANCE,
            seed: DEFAULT_SEED,
        },
        breach: Some(BreachConfig::default()),
        ..ArchetypeConfig::default()
    }
}

fn fast() -> ArchetypeConfig {
    ArchetypeConfig {
        movement: MovementConfig::Wander {
            activate_beyond: 5,
            min_stride: 2,
            max_stride: 4,
            bias: 0.6,
            seed: DEFAULT_SEED,
        },
        speed: 3.5,
        ..ArchetypeConfig::default()
    }
}

fn power() -> ArchetypeConfig {
    ArchetypeConfig {
        movement: MovementConfig::Evasive {
            danger_radius: 1.0,
            avoid_penalty: 6,
        },
        goal: GoalConfig::WeightedDynamic {
            hunt_player_chance: 0.5,
            advantage_bias: 0.25,
            jitter: 0.1,
            low: 1,
            high: MAX_ALIVE,
            reevaluate_every: 80,
            seed: DEFAULT_SEED,
        },
        speed: 2.5,
        breach: Some(BreachConfig { brick_cost: 6 }),
        ..ArchetypeConfig::default()
    }
}

fn armor() -> ArchetypeConfig {
    ArchetypeConfig {
        movement: MovementConfig::Patrol {
            waypoints: vec![
                CellCoord::new(1, 5),
                CellCoord::new(11, 5),
                CellCoord::new(11, 1),
                CellCoord::new(1, 1),
            ],
        },
        goal: GoalConfig::HuntNearestPlayer {
            reevaluate_every: 30,
        },
        speed: 1.5,
        ..ArchetypeConfig::default()
    }
}

fn wave(
    wave: u32,
    at_tick: u64,
    archetype: &str,
    count: u32,
    spawn_symbol: Option<&str>,
    after_wave: Option<u32>,
) -> WaveEntry {
    WaveEntry {
        wave: WaveId::new(wave),
        at_tick: Tick::new(at_tick),
        archetype: Archetype::new(archetype),
        count,
        spawn_symbol: spawn_symbol.map(str::to_owned),
        after_wave: after_wave.map(WaveId::new),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_configuration_is_valid() {
        let config = config();
        config.validate().expect("demo config");
        let (_, features) = config.layout.build().expect("layout");
        assert_eq!(features.base, Some(CellCoord::new(6, 12)));
        assert_eq!(features.player_starts, vec![CellCoord::new(4, 12)]);
        assert_eq!(features.spawn_cells.len(), 3);
    }
}
