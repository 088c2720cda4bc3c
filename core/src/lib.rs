#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Battle City simulation.
//!
//! This crate defines the message surface that connects the host engine, the
//! authoritative grid, and the enemy systems. The host submits [`Command`]
//! values describing inputs (elapsed time, player state, grid damage, death
//! signals), the match executes those commands through its `apply` entry
//! point, and then broadcasts [`Event`] values describing what happened.
//! Systems consume immutable snapshots and answer with plain values so that
//! every decision stays deterministic for a given command sequence.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

mod errors;
mod goal;
mod grid;
mod movement;
mod path;
mod spawn;

pub use errors::{GridError, PathError, PlanError, SpawnError};
pub use goal::{GoalSpec, PlayerSnapshot, ProjectileTrace, WorldSnapshot};
pub use grid::{CellOccupancy, GridMutation, ObstacleKind, Terrain};
pub use movement::{MovementDecision, MovementIntent, PlanRequest};
pub use path::Path;
pub use spawn::{Prerequisite, SpawnRequest};

/// Commands that express every input the host may feed into a match.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation by one tick covering the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Replaces the player state consumed by goal and movement policies.
    SyncPlayers {
        /// Latest state of every player unit, alive or not.
        players: Vec<PlayerSnapshot>,
    },
    /// Replaces the projectile trajectories consumed by evasive movement.
    SyncProjectiles {
        /// Last known trajectories of player projectiles.
        projectiles: Vec<ProjectileTrace>,
    },
    /// Queues a grid mutation applied at the start of the next tick.
    MutateGrid {
        /// Mutation requested by the external collision or destruction system.
        mutation: GridMutation,
    },
    /// Queues a request to spawn an enemy.
    QueueSpawn {
        /// Description of the enemy to spawn and when.
        request: SpawnRequest,
    },
    /// Signals that the damage system killed an enemy.
    EnemyDied {
        /// Identifier of the enemy that died.
        enemy: EnemyId,
    },
    /// Signals that the player base was destroyed.
    BaseDestroyed,
    /// Removes every live enemy, cancelling all motion and planning.
    DespawnAll,
}

/// Events broadcast by the match after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Tick that was just simulated.
        tick: Tick,
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Reports that a cell changed traversability.
    CellChanged {
        /// Cell whose traversable flag changed.
        cell: CellCoord,
        /// New value of the traversable flag.
        traversable: bool,
    },
    /// Reports that a destructible obstacle was destroyed.
    ObstacleDestroyed {
        /// Identifier of the destroyed obstacle.
        obstacle: ObstacleId,
        /// Cell that the obstacle occupied.
        cell: CellCoord,
    },
    /// Confirms that an enemy was created at a spawn point.
    EnemySpawned {
        /// Identifier assigned to the enemy by the host factory.
        enemy: EnemyId,
        /// Archetype of the spawned enemy.
        archetype: Archetype,
        /// Cell the enemy occupies after spawning.
        cell: CellCoord,
        /// Spawn point that produced the enemy.
        spawn_point: SpawnPointId,
    },
    /// Reports that a spawn request could not be served this tick.
    SpawnDeferred {
        /// Archetype of the deferred request.
        archetype: Archetype,
        /// Reason the request was deferred.
        reason: SpawnError,
        /// Earliest tick at which the request becomes eligible again.
        retry_at: Tick,
    },
    /// Confirms that an enemy received a fresh path.
    PathPlanned {
        /// Identifier of the enemy that planned.
        enemy: EnemyId,
        /// Goal cell requested from the planner.
        goal: CellCoord,
        /// Number of steps contained in the path.
        steps: usize,
        /// Whether the path ends on the requested goal.
        reached_goal: bool,
    },
    /// Reports that planning failed and the enemy backs off.
    PlanFailed {
        /// Identifier of the enemy whose plan failed.
        enemy: EnemyId,
        /// Goal cell that could not be reached.
        goal: CellCoord,
        /// Tick at which the enemy is allowed to plan again.
        retry_at: Tick,
    },
    /// Reports that the next cell of an enemy's path became non-traversable.
    PathBlocked {
        /// Identifier of the blocked enemy.
        enemy: EnemyId,
        /// Cell that blocked the path.
        cell: CellCoord,
    },
    /// Asks the host to fire the enemy's gun at a brick wall in its way.
    FireRequested {
        /// Identifier of the enemy that should fire.
        enemy: EnemyId,
        /// Brick cell the shot should hit.
        cell: CellCoord,
    },
    /// Reports that an enemy reached the final cell of its path.
    EnemyArrived {
        /// Identifier of the enemy that arrived.
        enemy: EnemyId,
        /// Final cell of the path.
        cell: CellCoord,
    },
    /// Transform write for the host: the enemy's new world position.
    EnemyMoved {
        /// Identifier of the enemy that moved.
        enemy: EnemyId,
        /// Position written by the path follower.
        position: Vec2,
    },
    /// Confirms that an enemy was released after a death signal.
    EnemyDied {
        /// Identifier of the dead enemy.
        enemy: EnemyId,
    },
    /// Confirms that an enemy was removed without dying.
    EnemyDespawned {
        /// Identifier of the despawned enemy.
        enemy: EnemyId,
    },
}

/// Factory implemented by the host engine to instantiate enemy actors.
///
/// The simulation never creates actors itself. It decides where and what to
/// spawn and then asks the host for a stable identifier.
pub trait EnemyFactory {
    /// Creates an enemy actor of the archetype at the world position.
    fn create_enemy(&mut self, archetype: &Archetype, position: Vec2) -> EnemyId;
}

/// Unique identifier assigned to an enemy by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Stable identifier of a player unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Stable identifier of a spawn point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpawnPointId(u32);

impl SpawnPointId {
    /// Creates a new spawn point identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of an obstacle placed on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId(u32);

impl ObstacleId {
    /// Creates a new obstacle identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier grouping spawn requests that belong to the same wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaveId(u32);

impl WaveId {
    /// Creates a new wave identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Name of an enemy archetype, the key into the archetype registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Archetype(String);

impl Archetype {
    /// Creates an archetype name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the archetype name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Discrete simulation step counter.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tick(u64);

impl Tick {
    /// Tick at which every match starts.
    pub const ZERO: Tick = Tick(0);

    /// Creates a tick from its numeric index.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric tick index.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Tick that lies `ticks` after this one.
    #[must_use]
    pub const fn after(self, ticks: u64) -> Self {
        Self(self.0.saturating_add(ticks))
    }

    /// Number of ticks elapsed since `earlier`, saturating at zero.
    #[must_use]
    pub const fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Computes the Chebyshev distance between two cell coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.column
            .abs_diff(other.column)
            .max(self.row.abs_diff(other.row))
    }

    /// Returns the cell displaced by the signed offsets, if it stays non-negative.
    ///
    /// Upper bounds are not checked; the grid filters those.
    #[must_use]
    pub fn offset(self, columns: i32, rows: i32) -> Option<CellCoord> {
        let column = self.column.checked_add_signed(columns)?;
        let row = self.row.checked_add_signed(rows)?;
        Some(CellCoord::new(column, row))
    }
}

/// Neighbour relation used by the grid, the planner, and distance metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjacency {
    /// Four orthogonal neighbours; distances are Manhattan.
    #[default]
    Cardinal,
    /// Eight neighbours including diagonals; distances are Chebyshev.
    Octile,
}

const CARDINAL_OFFSETS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
const OCTILE_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

impl Adjacency {
    /// Unit-cost grid distance between two cells under this adjacency.
    #[must_use]
    pub fn distance(self, from: CellCoord, to: CellCoord) -> u32 {
        match self {
            Self::Cardinal => from.manhattan_distance(to),
            Self::Octile => from.chebyshev_distance(to),
        }
    }

    /// Neighbour offsets as `(column, row)` deltas, orthogonal first.
    #[must_use]
    pub fn offsets(self) -> &'static [(i32, i32)] {
        match self {
            Self::Cardinal => &CARDINAL_OFFSETS,
            Self::Octile => &OCTILE_OFFSETS,
        }
    }

    /// Reports whether two distinct cells are neighbours.
    #[must_use]
    pub fn are_neighbors(self, from: CellCoord, to: CellCoord) -> bool {
        from != to && self.distance(from, to) == 1
    }
}
