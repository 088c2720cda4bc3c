#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative grid state for Battle City matches.
//!
//! The [`GridMap`] owns every cell of the arena: its terrain, its obstacle,
//! its traversable flag, and who currently occupies it. Dimensions are fixed
//! for the lifetime of a match. External systems change the grid exclusively
//! through [`GridMap::apply_mutations`], which the match invokes once per tick
//! before any planning reads the grid.

use std::collections::BTreeMap;

use battle_city_core::{
    Adjacency, CellCoord, CellOccupancy, EnemyId, Event, GridError, GridMutation, ObstacleId,
    ObstacleKind, PlayerSnapshot, Terrain,
};
use glam::Vec2;
use serde::{Deserialize, Serialize};

mod layout;
mod navigation;

pub use layout::{LayoutError, LegendEntry, MapFeatures, MapLayout};
pub use navigation::Planner;

const DEFAULT_GRID_COLUMNS: u32 = 13;
const DEFAULT_GRID_ROWS: u32 = 13;
const DEFAULT_CELL_SIZE: f32 = 1.0;

/// Dimensions and metric of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of columns in the grid.
    pub columns: u32,
    /// Number of rows in the grid.
    pub rows: u32,
    /// Side length of a square cell in world units.
    pub cell_size: f32,
    /// Neighbour relation used for queries and planning.
    pub adjacency: Adjacency,
}

impl GridConfig {
    /// Creates a grid configuration.
    #[must_use]
    pub const fn new(columns: u32, rows: u32, cell_size: f32, adjacency: Adjacency) -> Self {
        Self {
            columns,
            rows,
            cell_size,
            adjacency,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_GRID_COLUMNS,
            DEFAULT_GRID_ROWS,
            DEFAULT_CELL_SIZE,
            Adjacency::Cardinal,
        )
    }
}

/// State of an obstacle standing on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObstacleState {
    /// Identifier of the obstacle.
    pub id: ObstacleId,
    /// Kind of the obstacle.
    pub kind: ObstacleKind,
    /// Cell the obstacle fills.
    pub cell: CellCoord,
    /// Remaining hit points.
    pub hit_points: u8,
}

#[derive(Clone, Copy, Debug, Default)]
struct Cell {
    terrain: Terrain,
    traversable: bool,
    occupancy: CellOccupancy,
}

/// Fixed-size grid of cells with world-space transforms.
#[derive(Clone, Debug)]
pub struct GridMap {
    columns: u32,
    rows: u32,
    cell_size: f32,
    adjacency: Adjacency,
    cells: Vec<Cell>,
    obstacles: BTreeMap<ObstacleId, ObstacleState>,
    next_obstacle: u32,
}

impl GridMap {
    /// Creates an open grid of plain ground.
    pub fn new(config: GridConfig) -> Result<Self, LayoutError> {
        if config.columns == 0 || config.rows == 0 {
            return Err(LayoutError::EmptyGrid);
        }

        if !(config.cell_size.is_finite() && config.cell_size > 0.0) {
            return Err(LayoutError::InvalidCellSize {
                cell_size: config.cell_size,
            });
        }

        let capacity = u64::from(config.columns) * u64::from(config.rows);
        let capacity = usize::try_from(capacity).map_err(|_| LayoutError::EmptyGrid)?;
        let cell = Cell {
            terrain: Terrain::Ground,
            traversable: true,
            occupancy: CellOccupancy::Free,
        };

        Ok(Self {
            columns: config.columns,
            rows: config.rows,
            cell_size: config.cell_size,
            adjacency: config.adjacency,
            cells: vec![cell; capacity],
            obstacles: BTreeMap::new(),
            next_obstacle: 0,
        })
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a single cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Neighbour relation used by the grid.
    #[must_use]
    pub const fn adjacency(&self) -> Adjacency {
        self.adjacency
    }

    /// Reports whether the cell lies within the grid bounds.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Reports whether tanks may currently drive through the cell.
    pub fn is_traversable(&self, cell: CellCoord) -> Result<bool, GridError> {
        Ok(self.cell(cell)?.traversable)
    }

    /// Terrain of the cell.
    pub fn terrain(&self, cell: CellCoord) -> Result<Terrain, GridError> {
        Ok(self.cell(cell)?.terrain)
    }

    /// Occupant of the cell.
    pub fn occupancy(&self, cell: CellCoord) -> Result<CellOccupancy, GridError> {
        Ok(self.cell(cell)?.occupancy)
    }

    /// Reports whether the cell is traversable and nothing occupies it.
    pub fn is_free(&self, cell: CellCoord) -> Result<bool, GridError> {
        let cell = self.cell(cell)?;
        Ok(cell.traversable && cell.occupancy.is_free())
    }

    /// Obstacle standing on the cell, if any.
    pub fn obstacle_at(&self, cell: CellCoord) -> Result<Option<ObstacleState>, GridError> {
        match self.cell(cell)?.occupancy {
            CellOccupancy::Obstacle(id) => Ok(self.obstacles.get(&id).copied()),
            _ => Ok(None),
        }
    }

    /// Reports whether the cell is a brick wall standing on passable terrain.
    ///
    /// Such a cell becomes traversable once the brick is shot down.
    pub fn is_breachable(&self, cell: CellCoord) -> Result<bool, GridError> {
        let terrain = self.cell(cell)?.terrain;
        let brick = self
            .obstacle_at(cell)?
            .is_some_and(|obstacle| obstacle.kind == ObstacleKind::Brick);
        Ok(brick && terrain.is_passable())
    }

    /// Every obstacle still standing, ordered by identifier.
    pub fn obstacles(&self) -> impl Iterator<Item = &ObstacleState> + '_ {
        self.obstacles.values()
    }

    /// In-bounds neighbours of the cell in deterministic order.
    ///
    /// Orthogonal neighbours come first (north, east, south, west), followed
    /// by diagonals when the grid uses octile adjacency. Traversability is not
    /// filtered.
    pub fn neighbors(
        &self,
        cell: CellCoord,
    ) -> Result<impl Iterator<Item = CellCoord> + '_, GridError> {
        let _ = self.index(cell)?;
        Ok(self
            .adjacency
            .offsets()
            .iter()
            .filter_map(move |&(columns, rows)| cell.offset(columns, rows))
            .filter(move |neighbor| self.contains(*neighbor)))
    }

    /// Maps a world position onto the cell that contains it.
    pub fn world_to_cell(&self, position: Vec2) -> Result<CellCoord, GridError> {
        let out_of_range = GridError::PositionOutOfRange {
            x: position.x,
            y: position.y,
        };

        if !(position.x.is_finite() && position.y.is_finite()) {
            return Err(out_of_range);
        }

        let column = (position.x / self.cell_size).floor();
        let row = (position.y / self.cell_size).floor();

        if column < 0.0 || row < 0.0 || column >= self.columns as f32 || row >= self.rows as f32 {
            return Err(out_of_range);
        }

        Ok(CellCoord::new(column as u32, row as u32))
    }

    /// World position of the cell's centre.
    pub fn cell_to_world(&self, cell: CellCoord) -> Result<Vec2, GridError> {
        let _ = self.index(cell)?;
        Ok(Vec2::new(
            (cell.column() as f32 + 0.5) * self.cell_size,
            (cell.row() as f32 + 0.5) * self.cell_size,
        ))
    }

    /// Sets the traversable flag of the cell.
    ///
    /// This is the only way the traversable flag changes; obstacle placement
    /// and destruction route through it. Outstanding paths are not touched.
    /// Returns whether the flag changed.
    pub fn set_traversable(
        &mut self,
        cell: CellCoord,
        traversable: bool,
    ) -> Result<bool, GridError> {
        let index = self.index(cell)?;
        let slot = &mut self.cells[index];
        let changed = slot.traversable != traversable;
        slot.traversable = traversable;
        Ok(changed)
    }

    /// Applies externally requested mutations in order, emitting change events.
    ///
    /// Mutations that reference cells outside the grid are skipped and logged.
    pub fn apply_mutations<I>(&mut self, mutations: I, out_events: &mut Vec<Event>)
    where
        I: IntoIterator<Item = GridMutation>,
    {
        for mutation in mutations {
            if let Err(error) = self.apply_mutation(mutation, out_events) {
                tracing::warn!(?mutation, %error, "skipping grid mutation");
            }
        }
    }

    /// Applies a single mutation, emitting change events.
    pub fn apply_mutation(
        &mut self,
        mutation: GridMutation,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GridError> {
        match mutation {
            GridMutation::SetTraversable { cell, traversable } => {
                if self.set_traversable(cell, traversable)? {
                    out_events.push(Event::CellChanged { cell, traversable });
                }
            }
            GridMutation::HitObstacle { cell, damage } => {
                self.hit_obstacle(cell, damage, out_events)?;
            }
            GridMutation::PlaceObstacle { cell, kind } => {
                if self.obstacle_at(cell)?.is_none() {
                    let was_traversable = self.is_traversable(cell)?;
                    let _ = self.place_obstacle(cell, kind)?;
                    if was_traversable {
                        out_events.push(Event::CellChanged {
                            cell,
                            traversable: false,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Rebuilds unit occupancy from the latest enemy and player positions.
    ///
    /// Obstacle occupancy is preserved. Players overwrite enemies sharing a
    /// cell; units standing outside the grid are ignored.
    pub fn refresh_occupancy<I>(&mut self, enemies: I, players: &[PlayerSnapshot])
    where
        I: IntoIterator<Item = (EnemyId, CellCoord)>,
    {
        for cell in &mut self.cells {
            if matches!(
                cell.occupancy,
                CellOccupancy::Enemy(_) | CellOccupancy::Player(_)
            ) {
                cell.occupancy = CellOccupancy::Free;
            }
        }

        for (enemy, cell) in enemies {
            self.occupy_with_unit(cell, CellOccupancy::Enemy(enemy));
        }

        for player in players.iter().filter(|player| player.alive) {
            self.occupy_with_unit(player.cell, CellOccupancy::Player(player.id));
        }
    }

    pub(crate) fn set_terrain(
        &mut self,
        cell: CellCoord,
        terrain: Terrain,
    ) -> Result<(), GridError> {
        let index = self.index(cell)?;
        self.cells[index].terrain = terrain;
        let has_obstacle = matches!(self.cells[index].occupancy, CellOccupancy::Obstacle(_));
        let _ = self.set_traversable(cell, terrain.is_passable() && !has_obstacle)?;
        Ok(())
    }

    pub(crate) fn place_obstacle(
        &mut self,
        cell: CellCoord,
        kind: ObstacleKind,
    ) -> Result<ObstacleId, GridError> {
        let index = self.index(cell)?;
        let id = ObstacleId::new(self.next_obstacle);
        self.next_obstacle = self.next_obstacle.saturating_add(1);
        let _ = self.obstacles.insert(
            id,
            ObstacleState {
                id,
                kind,
                cell,
                hit_points: kind.initial_hit_points(),
            },
        );
        self.cells[index].occupancy = CellOccupancy::Obstacle(id);
        let _ = self.set_traversable(cell, false)?;
        tracing::trace!(?cell, ?kind, obstacle = id.get(), "obstacle placed");
        Ok(id)
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Result<usize, GridError> {
        if !self.contains(cell) {
            return Err(GridError::OutOfRange { cell });
        }

        let width = self.columns as usize;
        Ok(cell.row() as usize * width + cell.column() as usize)
    }

    pub(crate) fn cell_at(&self, index: usize) -> CellCoord {
        let width = self.columns as usize;
        CellCoord::new((index % width) as u32, (index / width) as u32)
    }

    pub(crate) fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn cell(&self, cell: CellCoord) -> Result<&Cell, GridError> {
        let index = self.index(cell)?;
        Ok(&self.cells[index])
    }

    fn occupy_with_unit(&mut self, cell: CellCoord, occupancy: CellOccupancy) {
        let Ok(index) = self.index(cell) else {
            tracing::warn!(?cell, ?occupancy, "unit stands outside the grid");
            return;
        };

        let slot = &mut self.cells[index].occupancy;
        if !matches!(slot, CellOccupancy::Obstacle(_)) {
            *slot = occupancy;
        }
    }

    fn hit_obstacle(
        &mut self,
        cell: CellCoord,
        damage: u8,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GridError> {
        let index = self.index(cell)?;
        let CellOccupancy::Obstacle(id) = self.cells[index].occupancy else {
            tracing::trace!(?cell, "hit on a cell without obstacle");
            return Ok(());
        };

        let Some(obstacle) = self.obstacles.get_mut(&id) else {
            return Ok(());
        };

        if !obstacle.kind.is_destructible() {
            return Ok(());
        }

        obstacle.hit_points = obstacle.hit_points.saturating_sub(damage);
        if obstacle.hit_points > 0 {
            return Ok(());
        }

        let _ = self.obstacles.remove(&id);
        self.cells[index].occupancy = CellOccupancy::Free;
        let traversable = self.cells[index].terrain.is_passable();
        let changed = self.set_traversable(cell, traversable)?;
        tracing::debug!(?cell, obstacle = id.get(), "obstacle destroyed");
        out_events.push(Event::ObstacleDestroyed { obstacle: id, cell });
        if changed {
            out_events.push(Event::CellChanged { cell, traversable });
        }
        Ok(())
    }
}
