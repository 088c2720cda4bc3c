//! Match configuration aggregating every tunable of the simulation.

use std::collections::{BTreeMap, BTreeSet};

use battle_city_core::{Archetype, CellCoord, SpawnPointId};
use battle_city_system_controller::{ArchetypeConfig, ControllerTuning};
use battle_city_system_spawn_points::{SpawnPoint, SpawnPointConfig};
use battle_city_system_spawning::{SpawnerConfig, WaveEntry};
use battle_city_world::{GridMap, LayoutError, MapFeatures, MapLayout};
use serde::{Deserialize, Serialize};

/// Reasons a match configuration is rejected.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The map layout could not be built.
    #[error("invalid map layout: {0}")]
    Layout(#[from] LayoutError),
    /// A wave refers to an archetype missing from the registry.
    #[error("archetype {archetype:?} is not defined")]
    UnknownArchetype {
        /// Name of the missing archetype.
        archetype: Archetype,
    },
    /// An archetype carries unusable stats.
    #[error("archetype {archetype:?} is invalid: {reason}")]
    InvalidArchetype {
        /// Name of the offending archetype.
        archetype: Archetype,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// A spawn point lies outside the grid.
    #[error("spawn point {id} at {cell:?} lies outside the grid")]
    SpawnPointOutOfRange {
        /// Identifier of the spawn point.
        id: u32,
        /// Cell of the spawn point.
        cell: CellCoord,
    },
    /// Two spawn points share an identifier.
    #[error("spawn point id {id} is used more than once")]
    DuplicateSpawnPoint {
        /// Repeated identifier.
        id: u32,
    },
    /// Declared identifiers leave no room to number the layout's spawn cells.
    #[error("no spawn point identifiers are left for the layout's spawn cells")]
    SpawnPointIdsExhausted,
    /// Waves are scheduled but no spawn point exists.
    #[error("waves are scheduled but the match has no spawn points")]
    NoSpawnPoints,
}

/// Everything needed to start a match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Arena layout, which also fixes the grid dimensions.
    pub layout: MapLayout,
    /// Archetype registry keyed by name.
    #[serde(default)]
    pub archetypes: BTreeMap<Archetype, ArchetypeConfig>,
    /// Timing shared by every enemy controller.
    #[serde(default)]
    pub controller: ControllerTuning,
    /// Spawner limits and spawn point policy.
    #[serde(default)]
    pub spawner: SpawnerConfig,
    /// Spawn points declared in addition to those marked in the layout.
    #[serde(default)]
    pub spawn_points: Vec<SpawnPointConfig>,
    /// Wave schedule queued when the match starts.
    #[serde(default)]
    pub waves: Vec<WaveEntry>,
}

impl MatchConfig {
    /// Creates a configuration for the layout with default tuning and no enemies.
    #[must_use]
    pub fn new(layout: MapLayout) -> Self {
        Self {
            layout,
            archetypes: BTreeMap::new(),
            controller: ControllerTuning::default(),
            spawner: SpawnerConfig::default(),
            spawn_points: Vec::new(),
            waves: Vec::new(),
        }
    }

    /// Checks the configuration without starting a match.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (grid, features) = self.layout.build()?;
        self.validate_against(&grid, &features).map(|_| ())
    }

    pub(crate) fn validate_against(
        &self,
        grid: &GridMap,
        features: &MapFeatures,
    ) -> Result<Vec<SpawnPoint>, ConfigError> {
        for (archetype, config) in &self.archetypes {
            if !(config.speed.is_finite() && config.speed > 0.0) {
                return Err(ConfigError::InvalidArchetype {
                    archetype: archetype.clone(),
                    reason: "speed must be positive and finite",
                });
            }
            if !(config.arrival_tolerance.is_finite() && config.arrival_tolerance >= 0.0) {
                return Err(ConfigError::InvalidArchetype {
                    archetype: archetype.clone(),
                    reason: "arrival tolerance must be non-negative",
                });
            }
        }

        if let Some(entry) = self
            .waves
            .iter()
            .find(|entry| !self.archetypes.contains_key(&entry.archetype))
        {
            return Err(ConfigError::UnknownArchetype {
                archetype: entry.archetype.clone(),
            });
        }

        let points = self.spawn_points(features)?;
        if let Some(point) = points.iter().find(|point| !grid.contains(point.cell())) {
            return Err(ConfigError::SpawnPointOutOfRange {
                id: point.id().get(),
                cell: point.cell(),
            });
        }
        if points.is_empty() && self.waves.iter().any(|entry| entry.count > 0) {
            return Err(ConfigError::NoSpawnPoints);
        }

        Ok(points)
    }

    /// Declared spawn points followed by the layout's spawn cells.
    ///
    /// Layout cells are numbered after the highest declared identifier and
    /// tagged with the symbol that marked them.
    fn spawn_points(&self, features: &MapFeatures) -> Result<Vec<SpawnPoint>, ConfigError> {
        let mut seen = BTreeSet::new();
        let mut points = Vec::new();
        for config in &self.spawn_points {
            if !seen.insert(config.id) {
                return Err(ConfigError::DuplicateSpawnPoint {
                    id: config.id.get(),
                });
            }
            points.push(SpawnPoint::from_config(config));
        }

        let mut next = match seen.iter().next_back() {
            Some(highest) => highest.get().checked_add(1),
            None => Some(0),
        };
        for (symbol, cells) in &features.spawn_cells {
            for cell in cells {
                let id = next.ok_or(ConfigError::SpawnPointIdsExhausted)?;
                points.push(
                    SpawnPoint::new(SpawnPointId::new(id), *cell).with_tag(symbol.to_string()),
                );
                next = id.checked_add(1);
            }
        }
        Ok(points)
    }
}
