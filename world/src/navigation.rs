//! A* planner over the grid's traversable cells.

use std::{cmp::Reverse, collections::BinaryHeap};

use battle_city_core::{CellCoord, Path, PlanError, PlanRequest};

use crate::GridMap;

/// Reusable A* search over a [`GridMap`].
///
/// Every move costs one unit, or `1 + avoid_penalty` when it enters a cell
/// listed in the request's avoidance set. When the request carries a brick
/// cost, brick walls are enterable at that cost on top of any avoidance
/// penalty; steel and water always block. The heuristic is the grid distance
/// under the map's adjacency, which never overestimates. Open-set ties are
/// broken by lower heuristic and then by lower cell coordinate so identical
/// requests always produce identical paths. Diagonal moves require both
/// orthogonal cells to be traversable.
#[derive(Clone, Debug, Default)]
pub struct Planner {
    costs: Vec<u32>,
    parents: Vec<Option<usize>>,
    closed: Vec<bool>,
    avoided: Vec<bool>,
    open: BinaryHeap<Reverse<(u32, u32, CellCoord)>>,
}

impl Planner {
    /// Creates a planner with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans a path for the request against the current grid.
    pub fn plan(&mut self, grid: &GridMap, request: &PlanRequest) -> Result<Path, PlanError> {
        let start_index = grid.index(request.start)?;
        let _ = grid.index(request.goal)?;
        let adjacency = grid.adjacency();

        if !grid.is_traversable(request.start)? {
            return Err(PlanError::StartNotTraversable {
                start: request.start,
            });
        }

        if request.start == request.goal {
            return Ok(Path::new(vec![request.start], adjacency)?);
        }

        self.reset(grid, request);

        let heuristic = |cell: CellCoord| adjacency.distance(cell, request.goal);
        let expansion_limit = request.horizon.map_or(usize::MAX, |limit| limit as usize);
        let mut expansions = 0_usize;
        let mut best = (heuristic(request.start), 0_u32, request.start);

        self.costs[start_index] = 0;
        self.open.push(Reverse((best.0, best.0, request.start)));

        while let Some(Reverse((_, h, cell))) = self.open.pop() {
            let index = grid.index(cell)?;
            if self.closed[index] {
                continue;
            }

            if cell == request.goal {
                let cells = self.reconstruct(grid, index);
                tracing::trace!(
                    start = ?request.start,
                    goal = ?request.goal,
                    steps = cells.len() - 1,
                    expansions,
                    "path found"
                );
                return Ok(Path::new(cells, adjacency)?);
            }

            self.closed[index] = true;
            let cost = self.costs[index];
            if (h, cost, cell) < best {
                best = (h, cost, cell);
            }

            expansions += 1;
            if expansions >= expansion_limit {
                break;
            }

            for &(columns, rows) in adjacency.offsets() {
                let Some(neighbor) = cell.offset(columns, rows) else {
                    continue;
                };

                let Some(entry) = entry_cost(grid, request, cell, neighbor) else {
                    continue;
                };

                let neighbor_index = grid.index(neighbor)?;
                if self.closed[neighbor_index] {
                    continue;
                }

                let step_cost = if self.avoided[neighbor_index] {
                    entry.saturating_add(request.avoid_penalty)
                } else {
                    entry
                };
                let next_cost = cost.saturating_add(step_cost);
                if next_cost >= self.costs[neighbor_index] {
                    continue;
                }

                self.costs[neighbor_index] = next_cost;
                self.parents[neighbor_index] = Some(index);
                let neighbor_h = heuristic(neighbor);
                self.open.push(Reverse((
                    next_cost.saturating_add(neighbor_h),
                    neighbor_h,
                    neighbor,
                )));
            }
        }

        let no_path = PlanError::NoPathFound {
            start: request.start,
            goal: request.goal,
        };

        if !request.allow_partial || best.2 == request.start {
            return Err(no_path);
        }

        let best_index = grid.index(best.2)?;
        let cells = self.reconstruct(grid, best_index);
        tracing::trace!(
            start = ?request.start,
            goal = ?request.goal,
            reached = ?best.2,
            expansions,
            "partial path"
        );
        Ok(Path::partial(cells, adjacency)?)
    }

    fn reset(&mut self, grid: &GridMap, request: &PlanRequest) {
        let count = grid.cell_count();
        reset_buffer(&mut self.costs, count, u32::MAX);
        reset_buffer(&mut self.parents, count, None);
        reset_buffer(&mut self.closed, count, false);
        reset_buffer(&mut self.avoided, count, false);
        self.open.clear();

        for &cell in &request.avoid {
            if let Ok(index) = grid.index(cell) {
                self.avoided[index] = true;
            }
        }
    }

    fn reconstruct(&self, grid: &GridMap, end: usize) -> Vec<CellCoord> {
        let mut cells = vec![grid.cell_at(end)];
        let mut cursor = end;
        while let Some(parent) = self.parents[cursor] {
            cells.push(grid.cell_at(parent));
            cursor = parent;
        }
        cells.reverse();
        cells
    }
}

/// Cost of stepping from `from` into `to`, or `None` when the move is illegal.
fn entry_cost(
    grid: &GridMap,
    request: &PlanRequest,
    from: CellCoord,
    to: CellCoord,
) -> Option<u32> {
    let cost = if grid.is_traversable(to).unwrap_or(false) {
        1
    } else {
        let brick_cost = request.brick_cost?;
        if !grid.is_breachable(to).unwrap_or(false) {
            return None;
        }
        brick_cost.max(1)
    };

    if from.column() == to.column() || from.row() == to.row() {
        return Some(cost);
    }

    let horizontal = CellCoord::new(to.column(), from.row());
    let vertical = CellCoord::new(from.column(), to.row());
    let corners_clear = grid.is_traversable(horizontal).unwrap_or(false)
        && grid.is_traversable(vertical).unwrap_or(false);
    corners_clear.then_some(cost)
}

fn reset_buffer<T: Clone>(buffer: &mut Vec<T>, len: usize, value: T) {
    if buffer.len() == len {
        buffer.fill(value);
    } else {
        *buffer = vec![value; len];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GridConfig;
    use battle_city_core::{Adjacency, ObstacleKind};

    fn grid(adjacency: Adjacency) -> GridMap {
        GridMap::new(GridConfig::new(5, 5, 1.0, adjacency)).expect("grid")
    }

    #[test]
    fn ties_resolve_identically_across_calls() {
        let grid = grid(Adjacency::Cardinal);
        let request = PlanRequest::new(CellCoord::new(0, 0), CellCoord::new(3, 3));
        let mut planner = Planner::new();
        let first = planner.plan(&grid, &request).expect("path");
        let second = Planner::new().plan(&grid, &request).expect("path");
        assert_eq!(first, second);
        assert_eq!(first.steps(), 6);
    }

    #[test]
    fn diagonal_moves_do_not_cut_corners() {
        let mut grid = grid(Adjacency::Octile);
        let _ = grid
            .place_obstacle(CellCoord::new(1, 0), ObstacleKind::Steel)
            .expect("place");
        let request = PlanRequest::new(CellCoord::new(0, 0), CellCoord::new(1, 1));
        let path = Planner::new().plan(&grid, &request).expect("path");
        assert_eq!(path.steps(), 2);
        assert_eq!(path.cells()[1], CellCoord::new(0, 1));
    }

    #[test]
    fn horizon_without_partial_fails() {
        let grid = grid(Adjacency::Cardinal);
        let mut request = PlanRequest::new(CellCoord::new(0, 0), CellCoord::new(4, 4));
        request.horizon = Some(2);
        assert!(matches!(
            Planner::new().plan(&grid, &request),
            Err(PlanError::NoPathFound { .. })
        ));
    }
}
