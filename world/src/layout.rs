//! Text map layouts and the features they place on the grid.

use std::collections::BTreeMap;

use battle_city_core::{Adjacency, CellCoord, GridError, ObstacleKind, Terrain};
use serde::{Deserialize, Serialize};

use crate::{GridConfig, GridMap};

/// Symbol that always denotes empty ground and never a spawn cell.
const EMPTY_SYMBOL: char = '.';

/// Failures raised while turning a layout into a grid.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum LayoutError {
    /// The grid would contain no cells.
    #[error("grid must contain at least one cell")]
    EmptyGrid,
    /// Cells must have a positive, finite side length.
    #[error("cell size {cell_size} must be positive and finite")]
    InvalidCellSize {
        /// Rejected cell size.
        cell_size: f32,
    },
    /// A layout row differs in width from the first row.
    #[error("row {row} has {found} columns, expected {expected}")]
    RaggedRow {
        /// Index of the offending row.
        row: u32,
        /// Width of the first row.
        expected: u32,
        /// Width of the offending row.
        found: u32,
    },
    /// A layout symbol has no legend entry.
    #[error("symbol {symbol:?} at ({column}, {row}) is missing from the legend")]
    UnknownSymbol {
        /// Offending symbol.
        symbol: char,
        /// Column of the symbol.
        column: u32,
        /// Row of the symbol.
        row: u32,
    },
    /// More than one cell is marked as the player base.
    #[error("layout marks more than one base cell")]
    DuplicateBase,
    /// Building the grid touched a cell outside its bounds.
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// What a single layout symbol places on its cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendEntry {
    /// Terrain of the cell.
    pub terrain: Terrain,
    /// Obstacle standing on the cell, if any.
    pub obstacle: Option<ObstacleKind>,
    /// Whether a player starts on the cell.
    pub player_start: bool,
    /// Whether enemies may spawn on the cell.
    pub enemy_spawn: bool,
    /// Whether the player base sits on the cell.
    pub base: bool,
}

impl LegendEntry {
    /// Entry for plain terrain without any markers.
    #[must_use]
    pub fn terrain(terrain: Terrain) -> Self {
        Self {
            terrain,
            ..Self::default()
        }
    }

    /// Entry for an obstacle on plain ground.
    #[must_use]
    pub fn obstacle(kind: ObstacleKind) -> Self {
        Self {
            obstacle: Some(kind),
            ..Self::default()
        }
    }
}

/// Rows of symbols plus the legend that interprets them.
///
/// The first row is row zero; each character is one column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapLayout {
    /// Side length of a cell in world units.
    pub cell_size: f32,
    /// Neighbour relation used by the grid.
    pub adjacency: Adjacency,
    /// Layout rows, top to bottom.
    pub rows: Vec<String>,
    /// Meaning of each symbol used in the rows.
    pub legend: BTreeMap<char, LegendEntry>,
}

impl Default for MapLayout {
    fn default() -> Self {
        let mut legend = BTreeMap::new();
        let _ = legend.insert(EMPTY_SYMBOL, LegendEntry::default());
        Self {
            cell_size: GridConfig::default().cell_size,
            adjacency: Adjacency::Cardinal,
            rows: Vec::new(),
            legend,
        }
    }
}

/// Notable cells discovered while building a layout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapFeatures {
    /// Cell of the player base, if the layout has one.
    pub base: Option<CellCoord>,
    /// Cells where players start, in row-major order.
    pub player_starts: Vec<CellCoord>,
    /// Enemy spawn cells grouped by the symbol that marked them.
    pub spawn_cells: BTreeMap<char, Vec<CellCoord>>,
}

impl MapLayout {
    /// Grid dimensions implied by the layout.
    pub fn grid_config(&self) -> Result<GridConfig, LayoutError> {
        let rows = u32::try_from(self.rows.len()).map_err(|_| LayoutError::EmptyGrid)?;
        let columns = self
            .rows
            .first()
            .map_or(0, |row| row.chars().count());
        let columns = u32::try_from(columns).map_err(|_| LayoutError::EmptyGrid)?;
        Ok(GridConfig::new(columns, rows, self.cell_size, self.adjacency))
    }

    /// Builds the grid and collects its notable cells.
    pub fn build(&self) -> Result<(GridMap, MapFeatures), LayoutError> {
        let config = self.grid_config()?;
        let mut grid = GridMap::new(config)?;
        let mut features = MapFeatures::default();

        for (row, line) in (0_u32..).zip(&self.rows) {
            let found = u32::try_from(line.chars().count()).unwrap_or(u32::MAX);
            if found != config.columns {
                return Err(LayoutError::RaggedRow {
                    row,
                    expected: config.columns,
                    found,
                });
            }

            for (column, symbol) in (0_u32..).zip(line.chars()) {
                let entry = self
                    .legend
                    .get(&symbol)
                    .ok_or(LayoutError::UnknownSymbol {
                        symbol,
                        column,
                        row,
                    })?;
                let cell = CellCoord::new(column, row);

                grid.set_terrain(cell, entry.terrain)?;
                if let Some(kind) = entry.obstacle {
                    let _ = grid.place_obstacle(cell, kind)?;
                }

                if entry.base {
                    if features.base.replace(cell).is_some() {
                        return Err(LayoutError::DuplicateBase);
                    }
                }

                if entry.player_start {
                    features.player_starts.push(cell);
                }

                if entry.enemy_spawn && symbol != EMPTY_SYMBOL {
                    features.spawn_cells.entry(symbol).or_default().push(cell);
                }
            }
        }

        tracing::debug!(
            columns = config.columns,
            rows = config.rows,
            obstacles = grid.obstacles().count(),
            spawn_symbols = features.spawn_cells.len(),
            "map layout built"
        );

        Ok((grid, features))
    }
}
