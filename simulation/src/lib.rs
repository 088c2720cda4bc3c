#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative Battle City match state and its single command entry point.
//!
//! A [`Match`] owns the grid, the spawner, and one controller per live enemy.
//! Hosts drive it exclusively through [`apply`]. Every tick runs in a fixed
//! order: queued grid mutations, occupancy refresh, spawning, controller
//! decisions, path follower motion, and finally the release of dead or
//! despawned controllers. Controllers are visited in identifier order so a
//! command sequence always produces the same events.

use std::collections::BTreeMap;
use std::time::Duration;

use battle_city_core::{
    Archetype, CellCoord, Command, EnemyFactory, EnemyId, Event, GridMutation, PlayerSnapshot,
    ProjectileTrace, Tick, WorldSnapshot,
};
use battle_city_system_controller::{ArchetypeConfig, ControllerTuning, EnemyController};
use battle_city_system_spawning::{SpawnedEnemy, Spawner};
use battle_city_world::{GridMap, MapFeatures, Planner};

mod config;

pub use config::{ConfigError, MatchConfig};

/// Authoritative state of a running match.
#[derive(Debug)]
pub struct Match {
    grid: GridMap,
    planner: Planner,
    features: MapFeatures,
    base: Option<CellCoord>,
    archetypes: BTreeMap<Archetype, ArchetypeConfig>,
    tuning: ControllerTuning,
    spawner: Spawner,
    controllers: BTreeMap<EnemyId, EnemyController>,
    players: Vec<PlayerSnapshot>,
    projectiles: Vec<ProjectileTrace>,
    pending_mutations: Vec<GridMutation>,
    tick: Tick,
}

impl Match {
    /// Validates the configuration and builds the initial match state.
    pub fn new(config: MatchConfig) -> Result<Self, ConfigError> {
        let (grid, features) = config.layout.build()?;
        let points = config.validate_against(&grid, &features)?;
        let mut spawner = Spawner::new(config.spawner, points);
        spawner.schedule(&config.waves);

        tracing::info!(
            columns = grid.columns(),
            rows = grid.rows(),
            archetypes = config.archetypes.len(),
            spawn_points = spawner.points().len(),
            planned = spawner.stats().planned,
            "match created"
        );

        Ok(Self {
            base: features.base,
            grid,
            planner: Planner::new(),
            features,
            archetypes: config.archetypes,
            tuning: config.controller,
            spawner,
            controllers: BTreeMap::new(),
            players: Vec::new(),
            projectiles: Vec::new(),
            pending_mutations: Vec::new(),
            tick: Tick::ZERO,
        })
    }

    fn snapshot(&self, now: Tick) -> WorldSnapshot {
        let alive = self
            .controllers
            .values()
            .filter(|controller| controller.state().is_active())
            .count();
        WorldSnapshot::new(now, self.grid.adjacency())
            .with_base(self.base)
            .with_players(self.players.clone())
            .with_projectiles(self.projectiles.clone())
            .with_alive_enemies(u32::try_from(alive).unwrap_or(u32::MAX))
    }

    fn run_tick(
        &mut self,
        dt: Duration,
        factory: &mut dyn EnemyFactory,
        out_events: &mut Vec<Event>,
    ) {
        let now = self.tick;
        out_events.push(Event::TimeAdvanced { tick: now, dt });

        let mutations = std::mem::take(&mut self.pending_mutations);
        self.grid.apply_mutations(mutations, out_events);

        self.grid.refresh_occupancy(
            self.controllers
                .values()
                .filter(|controller| controller.state().is_active())
                .map(|controller| (controller.id(), controller.cell())),
            &self.players,
        );

        let snapshot = self.snapshot(now);
        let mut spawned = Vec::new();
        self.spawner
            .update(now, &snapshot, &self.grid, factory, &mut spawned, out_events);
        for enemy in spawned {
            self.activate(enemy, now);
        }

        let snapshot = self.snapshot(now);
        for controller in self.controllers.values_mut() {
            controller.think(now, &snapshot, &self.grid, &mut self.planner, out_events);
        }
        for controller in self.controllers.values_mut() {
            controller.advance(dt, &self.grid, now, out_events);
        }

        self.reap();
        self.tick = now.after(1);
    }

    fn activate(&mut self, spawned: SpawnedEnemy, now: Tick) {
        let SpawnedEnemy {
            enemy,
            archetype,
            cell,
            ..
        } = spawned;
        let Some(config) = self.archetypes.get(&archetype) else {
            tracing::warn!(
                enemy = enemy.get(),
                archetype = archetype.as_str(),
                "spawned enemy has no archetype, releasing it"
            );
            self.spawner.enemy_removed(enemy);
            return;
        };
        let position = match self.grid.cell_to_world(cell) {
            Ok(position) => position,
            Err(error) => {
                tracing::warn!(enemy = enemy.get(), %error, "spawn cell off grid, releasing enemy");
                self.spawner.enemy_removed(enemy);
                return;
            }
        };

        let mut controller =
            EnemyController::new(enemy, archetype, config, self.tuning, cell, position);
        controller.activate(now);
        if let Some(previous) = self.controllers.insert(enemy, controller) {
            tracing::warn!(enemy = previous.id().get(), "factory reused a live enemy id");
        }
    }

    fn reap(&mut self) {
        let finished: Vec<EnemyId> = self
            .controllers
            .iter()
            .filter(|(_, controller)| controller.state().is_terminal())
            .map(|(id, _)| *id)
            .collect();
        for enemy in finished {
            let _ = self.controllers.remove(&enemy);
            self.spawner.enemy_removed(enemy);
        }
    }
}

/// Applies the provided command to the match, mutating state deterministically.
pub fn apply(
    game: &mut Match,
    command: Command,
    factory: &mut dyn EnemyFactory,
    out_events: &mut Vec<Event>,
) {
    match command {
        Command::Tick { dt } => game.run_tick(dt, factory, out_events),
        Command::SyncPlayers { mut players } => {
            players.sort_by_key(|player| player.id);
            game.players = players;
        }
        Command::SyncProjectiles { projectiles } => game.projectiles = projectiles,
        Command::MutateGrid { mutation } => game.pending_mutations.push(mutation),
        Command::QueueSpawn { request } => {
            if game.archetypes.contains_key(&request.archetype) {
                game.spawner.queue(request);
            } else {
                tracing::warn!(
                    archetype = request.archetype.as_str(),
                    "rejected spawn request for unknown archetype"
                );
            }
        }
        Command::EnemyDied { enemy } => {
            let now = game.tick;
            match game.controllers.get_mut(&enemy) {
                Some(controller) if controller.state().is_active() => {
                    controller.kill(now);
                    out_events.push(Event::EnemyDied { enemy });
                    game.reap();
                }
                _ => tracing::debug!(enemy = enemy.get(), "death signal for unknown enemy"),
            }
        }
        Command::BaseDestroyed => {
            tracing::info!(tick = game.tick.get(), "base destroyed");
            game.base = None;
        }
        Command::DespawnAll => {
            let now = game.tick;
            let count = game.controllers.len();
            for (enemy, controller) in &mut game.controllers {
                controller.despawn(now);
                out_events.push(Event::EnemyDespawned { enemy: *enemy });
            }
            game.reap();
            tracing::info!(count, tick = now.get(), "despawned every enemy");
        }
    }
}

/// Query functions that provide read-only access to the match state.
pub mod query {
    use battle_city_core::{Archetype, CellCoord, EnemyId, GoalSpec, Tick};
    use battle_city_system_controller::ControllerState;
    use battle_city_system_path_follow::FollowState;
    use battle_city_system_spawning::SpawnerStats;
    use battle_city_world::{GridMap, MapFeatures};
    use glam::Vec2;

    use super::Match;

    /// Tick that the next `Tick` command will simulate.
    #[must_use]
    pub fn tick(game: &Match) -> Tick {
        game.tick
    }

    /// Provides read-only access to the grid.
    #[must_use]
    pub fn grid(game: &Match) -> &GridMap {
        &game.grid
    }

    /// Notable cells of the layout the match was built from.
    #[must_use]
    pub fn features(game: &Match) -> &MapFeatures {
        &game.features
    }

    /// Cell of the player base, if it still stands.
    #[must_use]
    pub fn base(game: &Match) -> Option<CellCoord> {
        game.base
    }

    /// Spawner totals.
    #[must_use]
    pub fn spawner_stats(game: &Match) -> SpawnerStats {
        game.spawner.stats()
    }

    /// Number of live enemy controllers.
    #[must_use]
    pub fn live_enemies(game: &Match) -> usize {
        game.controllers
            .values()
            .filter(|controller| !controller.state().is_terminal())
            .count()
    }

    /// Number of controllers whose follower still has motion to perform.
    #[must_use]
    pub fn pending_motion(game: &Match) -> usize {
        game.controllers
            .values()
            .filter(|controller| controller.has_pending_motion())
            .count()
    }

    /// Captures every enemy ordered by identifier.
    #[must_use]
    pub fn enemy_view(game: &Match) -> Vec<EnemySnapshot> {
        game.controllers
            .values()
            .map(|controller| EnemySnapshot {
                id: controller.id(),
                archetype: controller.archetype().clone(),
                state: controller.state(),
                cell: controller.cell(),
                position: controller.position(),
                goal: controller.goal(),
                follow_state: controller.follow_state(),
            })
            .collect()
    }

    /// Immutable representation of a single enemy.
    #[derive(Clone, Debug, PartialEq)]
    pub struct EnemySnapshot {
        /// Identifier assigned by the host.
        pub id: EnemyId,
        /// Archetype of the enemy.
        pub archetype: Archetype,
        /// Lifecycle state of the controller.
        pub state: ControllerState,
        /// Cell the enemy occupies.
        pub cell: CellCoord,
        /// Continuous world position.
        pub position: Vec2,
        /// Goal currently pursued.
        pub goal: Option<GoalSpec>,
        /// State of the path follower.
        pub follow_state: FollowState,
    }
}
