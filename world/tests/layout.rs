use battle_city_core::{CellCoord, CellOccupancy, Terrain};
use battle_city_world::{LayoutError, MapLayout};

const LAYOUT_JSON: &str = r##"{
    "cell_size": 2.0,
    "adjacency": "cardinal",
    "rows": [
        "A..B",
        ".#w.",
        "..S.",
        ".PE."
    ],
    "legend": {
        ".": {},
        "A": { "enemy_spawn": true },
        "B": { "enemy_spawn": true },
        "#": { "obstacle": "brick" },
        "S": { "obstacle": "steel" },
        "w": { "terrain": "water" },
        "P": { "player_start": true },
        "E": { "base": true }
    }
}"##;

#[test]
fn builds_grid_and_features_from_json() {
    let layout: MapLayout = serde_json::from_str(LAYOUT_JSON).expect("layout json");
    let (grid, features) = layout.build().expect("layout");

    assert_eq!((grid.columns(), grid.rows()), (4, 4));
    assert!((grid.cell_size() - 2.0).abs() < f32::EPSILON);
    assert_eq!(features.base, Some(CellCoord::new(2, 3)));
    assert_eq!(features.player_starts, vec![CellCoord::new(1, 3)]);
    assert_eq!(
        features.spawn_cells.get(&'A'),
        Some(&vec![CellCoord::new(0, 0)])
    );
    assert_eq!(
        features.spawn_cells.get(&'B'),
        Some(&vec![CellCoord::new(3, 0)])
    );

    let water = CellCoord::new(2, 1);
    assert_eq!(grid.terrain(water), Ok(Terrain::Water));
    assert_eq!(grid.is_traversable(water), Ok(false));
    assert!(matches!(
        grid.occupancy(CellCoord::new(1, 1)),
        Ok(CellOccupancy::Obstacle(_))
    ));
    assert_eq!(grid.obstacles().count(), 2);
}

#[test]
fn ragged_rows_are_rejected() {
    let layout = MapLayout {
        rows: vec!["...".to_owned(), "..".to_owned()],
        ..MapLayout::default()
    };
    assert_eq!(
        layout.build().err(),
        Some(LayoutError::RaggedRow {
            row: 1,
            expected: 3,
            found: 2,
        })
    );
}

#[test]
fn unknown_symbols_are_rejected() {
    let layout = MapLayout {
        rows: vec!["..".to_owned(), ".x".to_owned()],
        ..MapLayout::default()
    };
    assert_eq!(
        layout.build().err(),
        Some(LayoutError::UnknownSymbol {
            symbol: 'x',
            column: 1,
            row: 1,
        })
    );
}

#[test]
fn empty_layouts_are_rejected() {
    assert_eq!(
        MapLayout::default().build().err(),
        Some(LayoutError::EmptyGrid)
    );
}
