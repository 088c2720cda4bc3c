//! Cell attributes and the mutations the host may request on them.

use serde::{Deserialize, Serialize};

use crate::{CellCoord, EnemyId, ObstacleId, PlayerId};

/// Ground type of a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Plain ground.
    #[default]
    Ground,
    /// Slippery ground; traversable.
    Ice,
    /// Cover that hides units; traversable.
    Forest,
    /// Never traversable by tanks.
    Water,
}

impl Terrain {
    /// Whether tanks can drive over this terrain at all.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        !matches!(self, Self::Water)
    }
}

/// Kind of obstacle placed on a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    /// Destructible wall.
    Brick,
    /// Indestructible wall.
    Steel,
}

impl ObstacleKind {
    /// Hit points a freshly placed obstacle starts with.
    #[must_use]
    pub const fn initial_hit_points(self) -> u8 {
        match self {
            Self::Brick => 2,
            Self::Steel => u8::MAX,
        }
    }

    /// Whether hits can ever destroy the obstacle.
    #[must_use]
    pub const fn is_destructible(self) -> bool {
        matches!(self, Self::Brick)
    }
}

/// Who or what currently sits on a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellOccupancy {
    /// Nothing occupies the cell.
    #[default]
    Free,
    /// An enemy tank occupies the cell.
    Enemy(EnemyId),
    /// A player tank occupies the cell.
    Player(PlayerId),
    /// An obstacle fills the cell.
    Obstacle(ObstacleId),
}

impl CellOccupancy {
    /// Reports whether nothing occupies the cell.
    #[must_use]
    pub const fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }
}

/// Grid changes requested by the external collision and destruction system.
///
/// Mutations are queued and applied at a single point at the start of each
/// tick, before any planning reads the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridMutation {
    /// Forces the traversable flag of a cell.
    SetTraversable {
        /// Cell to update.
        cell: CellCoord,
        /// New traversable flag.
        traversable: bool,
    },
    /// Damages the obstacle on a cell, destroying bricks that run out of hit points.
    HitObstacle {
        /// Cell that was hit.
        cell: CellCoord,
        /// Hit points removed by the impact.
        damage: u8,
    },
    /// Places a new obstacle on a cell.
    PlaceObstacle {
        /// Cell receiving the obstacle.
        cell: CellCoord,
        /// Kind of obstacle to place.
        kind: ObstacleKind,
    },
}
