//! Error taxonomy shared by the grid, the planner, and the spawner.

use serde::{Deserialize, Serialize};

use crate::CellCoord;

/// Failures raised by grid queries.
///
/// Out-of-range queries are programmer errors: callers are expected to only
/// ask about cells that the grid produced. They are reported instead of
/// silently clamped.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum GridError {
    /// The cell lies outside the grid bounds.
    #[error("cell {cell:?} lies outside the grid")]
    OutOfRange {
        /// Offending cell.
        cell: CellCoord,
    },
    /// The world position maps to no cell of the grid.
    #[error("world position ({x}, {y}) lies outside the grid")]
    PositionOutOfRange {
        /// Horizontal world coordinate.
        x: f32,
        /// Vertical world coordinate.
        y: f32,
    },
}

/// Internal-consistency violations detected while building a [`crate::Path`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// A path must contain at least its start cell.
    #[error("path contains no cells")]
    Empty,
    /// Two consecutive cells are not grid neighbours.
    #[error("cells {from:?} and {to:?} are not adjacent")]
    NonAdjacent {
        /// Earlier cell of the offending pair.
        from: CellCoord,
        /// Later cell of the offending pair.
        to: CellCoord,
    },
}

/// Failures returned by the path planner.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum PlanError {
    /// The goal cannot be reached from the start. Recoverable.
    #[error("no path from {start:?} to {goal:?}")]
    NoPathFound {
        /// Requested start cell.
        start: CellCoord,
        /// Requested goal cell.
        goal: CellCoord,
    },
    /// The start cell cannot be driven on, so no valid path may begin there.
    #[error("start cell {start:?} is not traversable")]
    StartNotTraversable {
        /// Requested start cell.
        start: CellCoord,
    },
    /// The request referenced cells outside the grid.
    #[error(transparent)]
    Grid(#[from] GridError),
    /// The search produced a sequence that violates path invariants.
    #[error(transparent)]
    InvalidPath(#[from] PathError),
}

/// Recoverable reasons a spawn request could not be served.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum SpawnError {
    /// No enabled, unoccupied spawn point was available; the request is re-queued.
    #[error("no spawn point is currently available")]
    SpawnPointUnavailable,
    /// The concurrent-enemy cap is reached; the request waits in queue.
    #[error("the concurrent enemy cap is reached")]
    PopulationCapReached,
}
