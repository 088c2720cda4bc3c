//! Read-only battlefield snapshots and the goals derived from them.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{Adjacency, CellCoord, PlayerId, Tick};

/// Target an enemy is currently trying to reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GoalSpec {
    /// The fixed cell of the player base.
    Base {
        /// Cell occupied by the base.
        cell: CellCoord,
    },
    /// A live player unit, tracked through its stable identifier.
    Player {
        /// Identifier of the tracked player.
        id: PlayerId,
        /// Cell the player occupied when the goal was last refreshed.
        cell: CellCoord,
    },
    /// An arbitrary strategic cell.
    Cell {
        /// Target cell.
        cell: CellCoord,
    },
}

impl GoalSpec {
    /// Cell the goal currently resolves to.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        match *self {
            Self::Base { cell } | Self::Player { cell, .. } | Self::Cell { cell } => cell,
        }
    }

    /// Player tracked by the goal, if any.
    #[must_use]
    pub const fn player(&self) -> Option<PlayerId> {
        match *self {
            Self::Player { id, .. } => Some(id),
            Self::Base { .. } | Self::Cell { .. } => None,
        }
    }

    /// Reports whether the goal still refers to something that exists.
    #[must_use]
    pub fn is_valid(&self, snapshot: &WorldSnapshot) -> bool {
        self.refreshed(snapshot).is_some()
    }

    /// Re-resolves the goal against a newer snapshot.
    ///
    /// Player goals follow the player to its latest cell and expire once the
    /// player dies or leaves the snapshot. Base goals expire once the base is
    /// gone.
    #[must_use]
    pub fn refreshed(&self, snapshot: &WorldSnapshot) -> Option<GoalSpec> {
        match *self {
            Self::Base { cell } => (snapshot.base() == Some(cell)).then_some(*self),
            Self::Player { id, .. } => snapshot
                .player(id)
                .filter(|player| player.alive)
                .map(|player| Self::Player {
                    id,
                    cell: player.cell,
                }),
            Self::Cell { .. } => Some(*self),
        }
    }
}

/// Player state exposed by the host for enemy decision making.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Stable identifier of the player unit.
    pub id: PlayerId,
    /// Cell the player occupies.
    pub cell: CellCoord,
    /// Continuous world position of the player.
    pub position: Vec2,
    /// Remaining health.
    pub health: u32,
    /// Whether the player unit is alive.
    pub alive: bool,
}

/// Last known trajectory of a player projectile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileTrace {
    /// Player that fired the projectile.
    pub owner: PlayerId,
    /// World position the projectile was fired from.
    pub origin: Vec2,
    /// Direction of travel; need not be normalised.
    pub direction: Vec2,
    /// Distance the projectile travels before expiring.
    pub range: f32,
}

impl ProjectileTrace {
    /// Shortest world distance between the point and the projectile's segment.
    #[must_use]
    pub fn distance_to(&self, point: Vec2) -> f32 {
        let direction = self.direction.normalize_or_zero();
        if direction == Vec2::ZERO || self.range <= 0.0 {
            return self.origin.distance(point);
        }

        let along = (point - self.origin).dot(direction).clamp(0.0, self.range);
        (self.origin + direction * along).distance(point)
    }
}

/// Immutable view of the battlefield consumed by goal and movement policies.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldSnapshot {
    tick: Tick,
    adjacency: Adjacency,
    base: Option<CellCoord>,
    players: Vec<PlayerSnapshot>,
    projectiles: Vec<ProjectileTrace>,
    alive_enemies: u32,
}

impl WorldSnapshot {
    /// Creates an empty snapshot for the tick.
    #[must_use]
    pub fn new(tick: Tick, adjacency: Adjacency) -> Self {
        Self {
            tick,
            adjacency,
            base: None,
            players: Vec::new(),
            projectiles: Vec::new(),
            alive_enemies: 0,
        }
    }

    /// Sets the base cell; `None` means the base is destroyed or absent.
    #[must_use]
    pub fn with_base(mut self, base: Option<CellCoord>) -> Self {
        self.base = base;
        self
    }

    /// Replaces the player list, ordering it by identifier.
    #[must_use]
    pub fn with_players(mut self, mut players: Vec<PlayerSnapshot>) -> Self {
        players.sort_by_key(|player| player.id);
        self.players = players;
        self
    }

    /// Replaces the projectile traces.
    #[must_use]
    pub fn with_projectiles(mut self, projectiles: Vec<ProjectileTrace>) -> Self {
        self.projectiles = projectiles;
        self
    }

    /// Sets the number of enemies alive on the field.
    #[must_use]
    pub fn with_alive_enemies(mut self, alive_enemies: u32) -> Self {
        self.alive_enemies = alive_enemies;
        self
    }

    /// Tick the snapshot was taken at.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Adjacency used for every grid distance derived from the snapshot.
    #[must_use]
    pub const fn adjacency(&self) -> Adjacency {
        self.adjacency
    }

    /// Cell of the player base, if it still stands.
    #[must_use]
    pub const fn base(&self) -> Option<CellCoord> {
        self.base
    }

    /// Every known player, ordered by identifier.
    #[must_use]
    pub fn players(&self) -> &[PlayerSnapshot] {
        &self.players
    }

    /// Last known projectile trajectories.
    #[must_use]
    pub fn projectiles(&self) -> &[ProjectileTrace] {
        &self.projectiles
    }

    /// Number of enemies alive on the field.
    #[must_use]
    pub const fn alive_enemies(&self) -> u32 {
        self.alive_enemies
    }

    /// Live players, ordered by identifier.
    pub fn live_players(&self) -> impl Iterator<Item = &PlayerSnapshot> + '_ {
        self.players.iter().filter(|player| player.alive)
    }

    /// Looks up a player by identifier.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&PlayerSnapshot> {
        self.players
            .binary_search_by_key(&id, |player| player.id)
            .ok()
            .map(|index| &self.players[index])
    }

    /// Closest live player to the cell, optionally restricted to a radius.
    ///
    /// Exact distance ties resolve to the lower player identifier.
    #[must_use]
    pub fn nearest_live_player(
        &self,
        from: CellCoord,
        within: Option<u32>,
    ) -> Option<&PlayerSnapshot> {
        self.live_players()
            .map(|player| (self.adjacency.distance(from, player.cell), player))
            .filter(|(distance, _)| within.map_or(true, |radius| *distance <= radius))
            .min_by_key(|(distance, player)| (*distance, player.id))
            .map(|(_, player)| player)
    }

    /// Grid distance from the cell to the closest live player.
    #[must_use]
    pub fn min_player_distance(&self, cell: CellCoord) -> Option<u32> {
        self.live_players()
            .map(|player| self.adjacency.distance(cell, player.cell))
            .min()
    }
}
