#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawner that turns queued requests into enemies.
//!
//! Requests wait in a queue ordered by their earliest tick and by insertion
//! order. Each tick the spawner serves every due request whose prerequisite
//! holds, as long as the concurrent-enemy cap allows. Requests that find no
//! free spawn point are re-queued with a delay; no request is ever dropped.

use std::collections::{BTreeMap, BTreeSet};

use battle_city_core::{
    Archetype, CellCoord, EnemyFactory, EnemyId, Event, Prerequisite, SpawnError, SpawnPointId,
    SpawnRequest, Tick, WaveId, WorldSnapshot,
};
use battle_city_system_spawn_points::{SpawnPoint, SpawnPointPolicy, SpawnPointPolicyConfig};
use battle_city_world::GridMap;
use glam::Vec2;
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_ALIVE: u32 = 4;
const DEFAULT_RETRY_DELAY_TICKS: u64 = 10;

/// Pacing limits and spawn point selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Maximum number of enemies alive at once.
    pub max_alive: u32,
    /// Ticks a request waits after finding no free spawn point.
    pub retry_delay: u64,
    /// Spawn point selection strategy.
    pub policy: SpawnPointPolicyConfig,
}

impl SpawnerConfig {
    /// Creates a configuration with explicit limits.
    #[must_use]
    pub const fn new(max_alive: u32, retry_delay: u64, policy: SpawnPointPolicyConfig) -> Self {
        Self {
            max_alive,
            retry_delay,
            policy,
        }
    }
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ALIVE,
            DEFAULT_RETRY_DELAY_TICKS,
            SpawnPointPolicyConfig::RoundRobin,
        )
    }
}

/// One line of a wave schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveEntry {
    /// Wave the spawned enemies belong to.
    pub wave: WaveId,
    /// Earliest tick of every request in the entry.
    #[serde(default)]
    pub at_tick: Tick,
    /// Archetype to spawn.
    pub archetype: Archetype,
    /// Number of enemies to spawn.
    #[serde(default = "single")]
    pub count: u32,
    /// Layout symbol restricting which spawn points may be used.
    #[serde(default)]
    pub spawn_symbol: Option<String>,
    /// Wave that must be cleared first.
    #[serde(default)]
    pub after_wave: Option<WaveId>,
}

const fn single() -> u32 {
    1
}

impl WaveEntry {
    /// Expands the entry into its spawn requests.
    pub fn requests(&self) -> impl Iterator<Item = SpawnRequest> + '_ {
        (0..self.count).map(move |_| {
            let mut request =
                SpawnRequest::new(self.archetype.clone(), self.at_tick).in_wave(self.wave);
            if let Some(symbol) = &self.spawn_symbol {
                request = request.with_tag(symbol.clone());
            }
            if let Some(previous) = self.after_wave {
                request = request.with_prerequisite(Prerequisite::WaveCleared(previous));
            }
            request
        })
    }
}

/// Enemy created by the spawner during an update.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnedEnemy {
    /// Identifier handed out by the host factory.
    pub enemy: EnemyId,
    /// Archetype of the enemy.
    pub archetype: Archetype,
    /// Cell the enemy starts on.
    pub cell: CellCoord,
    /// Spawn point that produced the enemy.
    pub spawn_point: SpawnPointId,
}

/// Running totals describing the spawner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SpawnerStats {
    /// Requests ever queued.
    pub planned: u32,
    /// Enemies created.
    pub spawned: u32,
    /// Enemies currently alive.
    pub alive: u32,
    /// Requests still waiting in the queue.
    pub pending: u32,
}

#[derive(Clone, Copy, Debug, Default)]
struct WaveProgress {
    planned: u32,
    spawned: u32,
    alive: u32,
}

impl WaveProgress {
    const fn is_cleared(&self) -> bool {
        self.spawned == self.planned && self.alive == 0
    }
}

/// Queue of spawn requests plus the pool of spawn points.
#[derive(Debug)]
pub struct Spawner {
    max_alive: u32,
    retry_delay: u64,
    policy: SpawnPointPolicy,
    points: Vec<SpawnPoint>,
    queue: BTreeMap<(Tick, u64), SpawnRequest>,
    sequence: u64,
    alive: BTreeMap<EnemyId, Option<WaveId>>,
    waves: BTreeMap<WaveId, WaveProgress>,
    planned: u32,
    spawned: u32,
    candidates: Vec<SpawnPoint>,
}

impl Spawner {
    /// Creates a spawner owning the provided spawn points.
    #[must_use]
    pub fn new(config: SpawnerConfig, mut points: Vec<SpawnPoint>) -> Self {
        points.sort_by_key(SpawnPoint::id);
        Self {
            max_alive: config.max_alive,
            retry_delay: config.retry_delay.max(1),
            policy: SpawnPointPolicy::new(config.policy),
            points,
            queue: BTreeMap::new(),
            sequence: 0,
            alive: BTreeMap::new(),
            waves: BTreeMap::new(),
            planned: 0,
            spawned: 0,
            candidates: Vec::new(),
        }
    }

    /// Spawn points owned by the spawner, ordered by identifier.
    #[must_use]
    pub fn points(&self) -> &[SpawnPoint] {
        &self.points
    }

    /// Enables or disables a spawn point. Returns whether the point exists.
    pub fn set_point_enabled(&mut self, id: SpawnPointId, enabled: bool) -> bool {
        match self.points.iter_mut().find(|point| point.id() == id) {
            Some(point) => {
                point.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Queues a request.
    pub fn queue(&mut self, request: SpawnRequest) {
        self.planned += 1;
        if let Some(wave) = request.wave {
            self.waves.entry(wave).or_default().planned += 1;
        }
        tracing::trace!(
            archetype = request.archetype.as_str(),
            earliest = request.earliest.get(),
            "spawn request queued"
        );
        self.enqueue(request.earliest, request);
    }

    /// Queues every request of a wave schedule.
    pub fn schedule<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = &'a WaveEntry>,
    {
        for entry in entries {
            for request in entry.requests() {
                self.queue(request);
            }
        }
    }

    /// Number of enemies the spawner considers alive.
    #[must_use]
    pub fn alive(&self) -> u32 {
        u32::try_from(self.alive.len()).unwrap_or(u32::MAX)
    }

    /// Requests still waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Running totals.
    #[must_use]
    pub fn stats(&self) -> SpawnerStats {
        SpawnerStats {
            planned: self.planned,
            spawned: self.spawned,
            alive: self.alive(),
            pending: u32::try_from(self.queue.len()).unwrap_or(u32::MAX),
        }
    }

    /// Whether every request of the wave spawned and none of its enemies remain.
    ///
    /// Waves without any queued request count as cleared.
    #[must_use]
    pub fn is_wave_cleared(&self, wave: WaveId) -> bool {
        self.waves
            .get(&wave)
            .map_or(true, WaveProgress::is_cleared)
    }

    /// Forgets an enemy that died or was despawned.
    pub fn enemy_removed(&mut self, enemy: EnemyId) {
        let Some(wave) = self.alive.remove(&enemy) else {
            return;
        };
        if let Some(progress) = wave.and_then(|wave| self.waves.get_mut(&wave)) {
            progress.alive = progress.alive.saturating_sub(1);
        }
    }

    /// Serves every due request and reports the enemies created.
    ///
    /// `grid` must already reflect this tick's occupancy. At most one enemy is
    /// created per spawn cell per update.
    pub fn update(
        &mut self,
        now: Tick,
        snapshot: &WorldSnapshot,
        grid: &GridMap,
        factory: &mut dyn EnemyFactory,
        out_spawned: &mut Vec<SpawnedEnemy>,
        out_events: &mut Vec<Event>,
    ) {
        let due: Vec<(Tick, u64)> = self
            .queue
            .range(..=(now, u64::MAX))
            .map(|(key, _)| *key)
            .collect();
        let mut claimed = BTreeSet::new();

        for key in due {
            let Some((prerequisite, tag)) = self
                .queue
                .get(&key)
                .map(|request| (request.prerequisite, request.tag.clone()))
            else {
                continue;
            };
            if !self.prerequisite_holds(prerequisite) {
                continue;
            }

            match self.try_spawn(tag.as_deref(), now, snapshot, grid, &claimed) {
                Ok((spawn_point, cell, position)) => {
                    let Some(request) = self.queue.remove(&key) else {
                        continue;
                    };
                    let _ = claimed.insert(cell);
                    let spawned = self.spawn(request, spawn_point, cell, position, now, factory);
                    out_events.push(Event::EnemySpawned {
                        enemy: spawned.enemy,
                        archetype: spawned.archetype.clone(),
                        cell,
                        spawn_point,
                    });
                    out_spawned.push(spawned);
                }
                Err(SpawnError::PopulationCapReached) => {
                    tracing::trace!(alive = self.alive(), "population cap reached");
                    break;
                }
                Err(reason @ SpawnError::SpawnPointUnavailable) => {
                    let Some(request) = self.queue.remove(&key) else {
                        continue;
                    };
                    let retry_at = now.after(self.retry_delay);
                    tracing::debug!(
                        archetype = request.archetype.as_str(),
                        retry_at = retry_at.get(),
                        "no spawn point available, deferring"
                    );
                    out_events.push(Event::SpawnDeferred {
                        archetype: request.archetype.clone(),
                        reason,
                        retry_at,
                    });
                    self.enqueue(retry_at, request);
                }
            }
        }
    }

    fn enqueue(&mut self, at: Tick, request: SpawnRequest) {
        let _ = self.queue.insert((at, self.sequence), request);
        self.sequence += 1;
    }

    fn prerequisite_holds(&self, prerequisite: Option<Prerequisite>) -> bool {
        match prerequisite {
            None => true,
            Some(Prerequisite::FieldClear) => self.alive.is_empty(),
            Some(Prerequisite::WaveCleared(wave)) => self.is_wave_cleared(wave),
        }
    }

    fn try_spawn(
        &mut self,
        tag: Option<&str>,
        now: Tick,
        snapshot: &WorldSnapshot,
        grid: &GridMap,
        claimed: &BTreeSet<CellCoord>,
    ) -> Result<(SpawnPointId, CellCoord, Vec2), SpawnError> {
        if self.alive() >= self.max_alive {
            return Err(SpawnError::PopulationCapReached);
        }

        self.candidates.clear();
        self.candidates.extend(
            self.points
                .iter()
                .filter(|point| tag.map_or(true, |tag| point.has_tag(tag)))
                .filter(|point| !claimed.contains(&point.cell()))
                .filter(|point| grid.is_free(point.cell()).unwrap_or(false))
                .cloned(),
        );

        let chosen = self
            .policy
            .select_point(&self.candidates, snapshot)
            .and_then(|id| self.candidates.iter().find(|point| point.id() == id))
            .filter(|point| point.is_enabled())
            .map(|point| (point.id(), point.cell()));

        match chosen {
            Some((id, cell)) => match grid.cell_to_world(cell) {
                Ok(position) => Ok((id, cell, position)),
                Err(error) => {
                    tracing::warn!(spawn_point = id.get(), %error, "spawn point off grid");
                    Err(SpawnError::SpawnPointUnavailable)
                }
            },
            None => {
                tracing::trace!(now = now.get(), "spawn point unavailable");
                Err(SpawnError::SpawnPointUnavailable)
            }
        }
    }

    fn spawn(
        &mut self,
        request: SpawnRequest,
        spawn_point: SpawnPointId,
        cell: CellCoord,
        position: Vec2,
        now: Tick,
        factory: &mut dyn EnemyFactory,
    ) -> SpawnedEnemy {
        if let Some(point) = self.points.iter_mut().find(|point| point.id() == spawn_point) {
            point.mark_used(now);
        }

        let enemy = factory.create_enemy(&request.archetype, position);
        let _ = self.alive.insert(enemy, request.wave);
        if let Some(wave) = request.wave {
            let progress = self.waves.entry(wave).or_default();
            progress.spawned += 1;
            progress.alive += 1;
        }
        self.spawned += 1;

        tracing::debug!(
            enemy = enemy.get(),
            archetype = request.archetype.as_str(),
            ?cell,
            spawn_point = spawn_point.get(),
            "enemy spawned"
        );

        SpawnedEnemy {
            enemy,
            archetype: request.archetype,
            cell,
            spawn_point,
        }
    }
}
