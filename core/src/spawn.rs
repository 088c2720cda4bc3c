//! Spawn requests queued with the spawner.

use serde::{Deserialize, Serialize};

use crate::{Archetype, Tick, WaveId};

/// Condition that must hold before a spawn request becomes eligible.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prerequisite {
    /// No enemy may be alive on the field.
    FieldClear,
    /// Every request of the wave must have spawned and all of its enemies must be gone.
    WaveCleared(WaveId),
}

/// Description of what to spawn and when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Archetype of the enemy to create.
    pub archetype: Archetype,
    /// Earliest tick at which the request may be served.
    #[serde(default)]
    pub earliest: Tick,
    /// Optional condition gating the request.
    #[serde(default)]
    pub prerequisite: Option<Prerequisite>,
    /// Restricts the request to spawn points carrying this tag.
    #[serde(default)]
    pub tag: Option<String>,
    /// Wave the request belongs to, if any.
    #[serde(default)]
    pub wave: Option<WaveId>,
}

impl SpawnRequest {
    /// Creates an unconditional request eligible at `earliest`.
    #[must_use]
    pub fn new(archetype: Archetype, earliest: Tick) -> Self {
        Self {
            archetype,
            earliest,
            prerequisite: None,
            tag: None,
            wave: None,
        }
    }

    /// Gates the request behind a prerequisite.
    #[must_use]
    pub fn with_prerequisite(mut self, prerequisite: Prerequisite) -> Self {
        self.prerequisite = Some(prerequisite);
        self
    }

    /// Restricts the request to tagged spawn points.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Assigns the request to a wave.
    #[must_use]
    pub fn in_wave(mut self, wave: WaveId) -> Self {
        self.wave = Some(wave);
        self
    }
}
