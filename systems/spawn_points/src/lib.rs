#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawn points and the policies that choose between them.
//!
//! A [`SpawnPointPolicy`] is picked once from configuration and then asked for
//! one point per spawn. Policies only choose; the spawner verifies the chosen
//! point is enabled and free before creating anything there. Every policy is
//! deterministic for a given call sequence, including the seeded weighted one.

use std::cmp::Reverse;

use battle_city_core::{CellCoord, SpawnPointId, Tick, WorldSnapshot};
use rand::distributions::{Distribution, WeightedIndex};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const DEFAULT_WEIGHT: u32 = 1;

/// A designated cell eligible for enemy creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnPoint {
    id: SpawnPointId,
    cell: CellCoord,
    last_used: Option<Tick>,
    enabled: bool,
    tags: Vec<String>,
    weight: u32,
}

impl SpawnPoint {
    /// Creates an enabled, untagged spawn point with unit weight.
    #[must_use]
    pub fn new(id: SpawnPointId, cell: CellCoord) -> Self {
        Self {
            id,
            cell,
            last_used: None,
            enabled: true,
            tags: Vec::new(),
            weight: DEFAULT_WEIGHT,
        }
    }

    /// Builds a spawn point from its configuration.
    #[must_use]
    pub fn from_config(config: &SpawnPointConfig) -> Self {
        Self {
            id: config.id,
            cell: config.cell,
            last_used: None,
            enabled: config.enabled,
            tags: config.tags.clone(),
            weight: config.weight,
        }
    }

    /// Adds a tag used to filter requests.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Sets the weight used by weighted-random selection.
    #[must_use]
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Identifier of the point.
    #[must_use]
    pub const fn id(&self) -> SpawnPointId {
        self.id
    }

    /// Cell enemies appear on.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Tick the point last produced an enemy.
    #[must_use]
    pub const fn last_used(&self) -> Option<Tick> {
        self.last_used
    }

    /// Whether the point may be used at all.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Selection weight.
    #[must_use]
    pub const fn weight(&self) -> u32 {
        self.weight
    }

    /// Tags carried by the point.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether the point carries the tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }

    /// Enables or disables the point.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Records that the point produced an enemy at `tick`.
    pub fn mark_used(&mut self, tick: Tick) {
        self.last_used = Some(tick);
    }
}

/// Serializable description of a spawn point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPointConfig {
    /// Stable identifier of the point.
    pub id: SpawnPointId,
    /// Cell enemies appear on.
    pub cell: CellCoord,
    /// Whether the point starts enabled.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Tags used to filter requests.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Weight for weighted-random selection.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl SpawnPointConfig {
    /// Creates the configuration of an enabled, untagged point.
    #[must_use]
    pub fn new(id: SpawnPointId, cell: CellCoord) -> Self {
        Self {
            id,
            cell,
            enabled: true,
            tags: Vec::new(),
            weight: DEFAULT_WEIGHT,
        }
    }
}

const fn enabled_by_default() -> bool {
    true
}

const fn default_weight() -> u32 {
    DEFAULT_WEIGHT
}

/// Spawn point selection strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpawnPointPolicyConfig {
    /// Cycle through points in identifier order.
    #[default]
    RoundRobin,
    /// Use the point that has waited longest.
    LeastRecentlyUsed,
    /// Use the point farthest from every live player.
    FarthestFromPlayer,
    /// Pick points at random in proportion to their weight.
    WeightedRandom {
        /// Seed of the selection stream.
        seed: u64,
    },
}

#[derive(Clone, Debug)]
enum Strategy {
    RoundRobin { last: Option<SpawnPointId> },
    LeastRecentlyUsed,
    FarthestFromPlayer,
    WeightedRandom { rng: ChaCha8Rng },
}

/// Stateful spawn point selector owned by the spawner.
#[derive(Clone, Debug)]
pub struct SpawnPointPolicy {
    strategy: Strategy,
}

impl SpawnPointPolicy {
    /// Instantiates the configured strategy.
    #[must_use]
    pub fn new(config: SpawnPointPolicyConfig) -> Self {
        let strategy = match config {
            SpawnPointPolicyConfig::RoundRobin => Strategy::RoundRobin { last: None },
            SpawnPointPolicyConfig::LeastRecentlyUsed => Strategy::LeastRecentlyUsed,
            SpawnPointPolicyConfig::FarthestFromPlayer => Strategy::FarthestFromPlayer,
            SpawnPointPolicyConfig::WeightedRandom { seed } => Strategy::WeightedRandom {
                rng: ChaCha8Rng::seed_from_u64(seed),
            },
        };
        Self { strategy }
    }

    /// Chooses one of the candidates, skipping disabled points.
    ///
    /// Returns `None` when no enabled candidate exists. Ties resolve to the
    /// lower spawn point identifier.
    pub fn select_point(
        &mut self,
        candidates: &[SpawnPoint],
        snapshot: &WorldSnapshot,
    ) -> Option<SpawnPointId> {
        let mut enabled: Vec<&SpawnPoint> =
            candidates.iter().filter(|point| point.enabled).collect();
        if enabled.is_empty() {
            return None;
        }
        enabled.sort_by_key(|point| point.id);

        let chosen = match &mut self.strategy {
            Strategy::RoundRobin { last } => {
                let next = match *last {
                    Some(previous) => enabled
                        .iter()
                        .find(|point| point.id > previous)
                        .or_else(|| enabled.first()),
                    None => enabled.first(),
                };
                let chosen = next.map(|point| point.id);
                if chosen.is_some() {
                    *last = chosen;
                }
                chosen
            }
            Strategy::LeastRecentlyUsed => enabled
                .iter()
                .min_by_key(|point| (point.last_used, point.id))
                .map(|point| point.id),
            Strategy::FarthestFromPlayer => enabled
                .iter()
                .max_by_key(|point| {
                    let distance = snapshot.min_player_distance(point.cell).unwrap_or(u32::MAX);
                    (distance, Reverse(point.id))
                })
                .map(|point| point.id),
            Strategy::WeightedRandom { rng } => {
                match WeightedIndex::new(enabled.iter().map(|point| point.weight)) {
                    Ok(distribution) => Some(enabled[distribution.sample(rng)].id),
                    Err(error) => {
                        tracing::debug!(%error, "no spawn point carries weight");
                        None
                    }
                }
            }
        };

        tracing::trace!(chosen = ?chosen, candidates = enabled.len(), "spawn point selected");
        chosen
    }
}
