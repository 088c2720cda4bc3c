//! Immutable cell paths produced by the planner.

use crate::{Adjacency, CellCoord, PathError};

/// Ordered sequence of cells from a start to a goal.
///
/// A path is a snapshot: it is validated once on construction and never
/// changes afterwards, even if the grid it was planned on is mutated. Every
/// consecutive pair of cells is a neighbour pair under the adjacency that was
/// used for planning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    cells: Vec<CellCoord>,
    reached_goal: bool,
}

impl Path {
    /// Builds a path that ends on its requested goal.
    pub fn new(cells: Vec<CellCoord>, adjacency: Adjacency) -> Result<Self, PathError> {
        Self::validated(cells, adjacency, true)
    }

    /// Builds a path that stops short of its requested goal.
    pub fn partial(cells: Vec<CellCoord>, adjacency: Adjacency) -> Result<Self, PathError> {
        Self::validated(cells, adjacency, false)
    }

    fn validated(
        cells: Vec<CellCoord>,
        adjacency: Adjacency,
        reached_goal: bool,
    ) -> Result<Self, PathError> {
        if cells.is_empty() {
            return Err(PathError::Empty);
        }

        if let Some(pair) = cells
            .windows(2)
            .find(|pair| !adjacency.are_neighbors(pair[0], pair[1]))
        {
            return Err(PathError::NonAdjacent {
                from: pair[0],
                to: pair[1],
            });
        }

        Ok(Self {
            cells,
            reached_goal,
        })
    }

    /// Cells of the path, start first.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// First cell of the path.
    #[must_use]
    pub fn start(&self) -> CellCoord {
        self.cells[0]
    }

    /// Last cell of the path.
    #[must_use]
    pub fn end(&self) -> CellCoord {
        self.cells[self.cells.len() - 1]
    }

    /// Number of moves required to walk the path.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.cells.len() - 1
    }

    /// Whether the path ends on the goal it was planned for.
    #[must_use]
    pub fn reached_goal(&self) -> bool {
        self.reached_goal
    }

    /// Reports whether the path visits the cell.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.cells.contains(&cell)
    }

    /// Length of the path between cell centres in world units.
    #[must_use]
    pub fn world_length(&self, cell_size: f32) -> f32 {
        self.cells
            .windows(2)
            .map(|pair| {
                let diagonal =
                    pair[0].column() != pair[1].column() && pair[0].row() != pair[1].row();
                if diagonal {
                    cell_size * std::f32::consts::SQRT_2
                } else {
                    cell_size
                }
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_path() {
        assert_eq!(Path::new(Vec::new(), Adjacency::Cardinal), Err(PathError::Empty));
    }

    #[test]
    fn rejects_non_adjacent_cells() {
        let cells = vec![CellCoord::new(0, 0), CellCoord::new(1, 1)];
        assert_eq!(
            Path::new(cells.clone(), Adjacency::Cardinal),
            Err(PathError::NonAdjacent {
                from: CellCoord::new(0, 0),
                to: CellCoord::new(1, 1),
            })
        );
        assert!(Path::new(cells, Adjacency::Octile).is_ok());
    }

    #[test]
    fn rejects_repeated_cells() {
        let cells = vec![CellCoord::new(2, 2), CellCoord::new(2, 2)];
        assert!(Path::new(cells, Adjacency::Cardinal).is_err());
    }

    #[test]
    fn single_cell_path_has_no_steps() {
        let path = Path::new(vec![CellCoord::new(3, 4)], Adjacency::Cardinal).expect("path");
        assert_eq!(path.steps(), 0);
        assert_eq!(path.start(), path.end());
        assert!(path.world_length(10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn world_length_accounts_for_diagonals() {
        let cells = vec![
            CellCoord::new(0, 0),
            CellCoord::new(1, 0),
            CellCoord::new(2, 1),
        ];
        let path = Path::partial(cells, Adjacency::Octile).expect("path");
        let expected = 2.0 + 2.0 * std::f32::consts::SQRT_2;
        assert!((path.world_length(2.0) - expected).abs() < 1e-4);
        assert!(!path.reached_goal());
    }
}
