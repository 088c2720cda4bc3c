#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Battle City match.

mod demo;
mod host;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use battle_city_core::{CellCoord, Command, Event, GridMutation, PlayerId};
use battle_city_simulation::{apply, query, Match, MatchConfig};
use battle_city_system_goals::GoalConfig;
use battle_city_system_movement::MovementConfig;
use battle_city_system_spawn_points::SpawnPointPolicyConfig;
use clap::Parser;
use host::{ScriptedPlayer, StubHost};
use tracing_subscriber::EnvFilter;

const SHOT_INTERVAL_TICKS: u64 = 40;
const SHOT_DAMAGE: u8 = 1;

/// Runs a headless match against a stub host and prints what happened.
#[derive(Debug, Parser)]
#[command(name = "battle-city", version)]
struct CliArgs {
    /// Match configuration in JSON; the built-in demo match is used when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u64,
    /// Simulated milliseconds per tick.
    #[arg(long = "dt-ms", default_value_t = 50)]
    dt_ms: u64,
    /// Overrides every seed in the configuration.
    #[arg(long)]
    seed: Option<u64>,
    /// Log filter such as `info` or `battle_city_simulation=debug`; falls back to `RUST_LOG`.
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,
}

/// Tallies collected while the match runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct RunSummary {
    ticks: u64,
    spawned: u32,
    deferred: u32,
    plans: u32,
    partial_plans: u32,
    plan_failures: u32,
    blocked: u32,
    base_hits: u32,
    enemy_shots: u32,
    obstacles_destroyed: u32,
    despawned: u32,
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log.as_deref())?;

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => demo::config(),
    };
    if let Some(seed) = args.seed {
        override_seeds(&mut config, seed);
    }

    let summary = run(config, args.ticks, Duration::from_millis(args.dt_ms))?;
    print_summary(&summary);
    Ok(())
}

fn init_tracing(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter {directives:?}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow!(error))
}

fn load_config(path: &Path) -> Result<MatchConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read match configuration {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse match configuration {}", path.display()))
}

fn override_seeds(config: &mut MatchConfig, seed: u64) {
    if let SpawnPointPolicyConfig::WeightedRandom { seed: policy_seed } = &mut config.spawner.policy
    {
        *policy_seed = seed;
    }
    for archetype in config.archetypes.values_mut() {
        if let MovementConfig::Wander {
            seed: wander_seed, ..
        } = &mut archetype.movement
        {
            *wander_seed = seed;
        }
        match &mut archetype.goal {
            GoalConfig::RandomFixed {
                seed: goal_seed, ..
            }
            | GoalConfig::WeightedDynamic {
                seed: goal_seed, ..
            } => *goal_seed = seed,
            _ => {}
        }
    }
}

/// Simulates `ticks` ticks, killing every enemy that reaches the base.
///
/// Enemy fire requests land as brick hits at the start of the next tick.
fn run(config: MatchConfig, ticks: u64, dt: Duration) -> Result<RunSummary> {
    let mut game = Match::new(config).context("invalid match configuration")?;
    let mut host = StubHost::default();
    let mut players: Vec<ScriptedPlayer> = query::features(&game)
        .player_starts
        .iter()
        .zip(1..)
        .map(|(start, id)| ScriptedPlayer::new(PlayerId::new(id), *start, query::grid(&game)))
        .collect();
    let mut summary = RunSummary::default();
    let mut events = Vec::new();
    let mut enemy_targets: Vec<CellCoord> = Vec::new();

    for tick in 0..ticks {
        let mut commands = Vec::new();
        for player in &mut players {
            player.advance(tick);
        }
        let grid = query::grid(&game);
        commands.push(Command::SyncPlayers {
            players: players.iter().map(|player| player.snapshot(grid)).collect(),
        });
        commands.push(Command::SyncProjectiles {
            projectiles: players.iter().map(|player| player.shot(grid)).collect(),
        });
        if tick > 0 && tick % SHOT_INTERVAL_TICKS == 0 {
            commands.extend(players.iter().filter_map(|player| {
                player
                    .target_obstacle(grid)
                    .map(|cell| Command::MutateGrid {
                        mutation: GridMutation::HitObstacle {
                            cell,
                            damage: SHOT_DAMAGE,
                        },
                    })
            }));
        }
        commands.extend(enemy_targets.drain(..).map(|cell| Command::MutateGrid {
            mutation: GridMutation::HitObstacle {
                cell,
                damage: SHOT_DAMAGE,
            },
        }));
        commands.push(Command::Tick { dt });

        events.clear();
        for command in commands {
            apply(&mut game, command, &mut host, &mut events);
        }

        let base = query::base(&game);
        let mut arrivals = Vec::new();
        for event in &events {
            match event {
                Event::EnemySpawned { .. } => summary.spawned += 1,
                Event::SpawnDeferred { .. } => summary.deferred += 1,
                Event::PathPlanned { reached_goal, .. } => {
                    summary.plans += 1;
                    if !reached_goal {
                        summary.partial_plans += 1;
                    }
                }
                Event::PlanFailed { .. } => summary.plan_failures += 1,
                Event::PathBlocked { .. } => summary.blocked += 1,
                Event::ObstacleDestroyed { .. } => summary.obstacles_destroyed += 1,
                Event::FireRequested { cell, .. } => {
                    summary.enemy_shots += 1;
                    if !enemy_targets.contains(cell) {
                        enemy_targets.push(*cell);
                    }
                }
                Event::EnemyArrived { enemy, cell } if Some(*cell) == base => arrivals.push(*enemy),
                _ => {}
            }
        }

        for enemy in arrivals {
            summary.base_hits += 1;
            tracing::info!(enemy = enemy.get(), tick, "enemy reached the base");
            apply(&mut game, Command::EnemyDied { enemy }, &mut host, &mut events);
        }
        summary.ticks = tick + 1;
    }

    events.clear();
    apply(&mut game, Command::DespawnAll, &mut host, &mut events);
    summary.despawned = u32::try_from(events.len()).unwrap_or(u32::MAX);
    debug_assert_eq!(query::live_enemies(&game), 0);

    let stats = query::spawner_stats(&game);
    tracing::info!(
        planned = stats.planned,
        spawned = stats.spawned,
        pending = stats.pending,
        "match finished"
    );
    Ok(summary)
}

fn print_summary(summary: &RunSummary) {
    println!("ticks simulated:     {}", summary.ticks);
    println!("enemies spawned:     {}", summary.spawned);
    println!("spawns deferred:     {}", summary.deferred);
    println!(
        "paths planned:       {} ({} partial)",
        summary.plans, summary.partial_plans
    );
    println!("plans failed:        {}", summary.plan_failures);
    println!("paths blocked:       {}", summary.blocked);
    println!("enemy shots:         {}", summary.enemy_shots);
    println!("obstacles destroyed: {}", summary.obstacles_destroyed);
    println!("base hits:           {}", summary.base_hits);
    println!("despawned at end:    {}", summary.despawned);
}
