//! Property tests for recording grid geometry

use electronav_core::models::{GridModel, GridSpec};
use proptest::prelude::*;
use std::collections::HashSet;

fn grid_spec() -> impl Strategy<Value = GridSpec> {
    (prop::collection::vec(1usize..25, 1..25), 0.1f64..3.0, 0.05f64..1.0).prop_map(
        |(holes_per_column, inter_hole_spacing, hole_diameter)| GridSpec {
            holes_per_column,
            inter_hole_spacing,
            hole_diameter,
        },
    )
}

proptest! {
    #[test]
    fn holes_have_unique_coordinates(spec in grid_spec()) {
        let grid = GridModel::new(spec.clone()).unwrap();
        let expected: usize = spec.holes_per_column.iter().sum();
        prop_assert_eq!(grid.len(), expected);

        let keys: HashSet<(i64, i64)> = grid
            .holes()
            .iter()
            .map(|h| ((h.x_mm * 1e6).round() as i64, (h.y_mm * 1e6).round() as i64))
            .collect();
        prop_assert_eq!(keys.len(), grid.len());
    }

    #[test]
    fn coordinate_lookup_is_deterministic(spec in grid_spec()) {
        let a = GridModel::new(spec.clone()).unwrap();
        let b = GridModel::new(spec).unwrap();
        for hole in a.holes() {
            let first = a.coordinate_of(hole.row, hole.column).unwrap();
            let second = b.coordinate_of(hole.row, hole.column).unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(first, (hole.x_mm, hole.y_mm));
            prop_assert_eq!(a.hole_index(hole.row, hole.column).unwrap(), hole.index);
        }
    }

    #[test]
    fn every_hole_centre_maps_back_to_itself(spec in grid_spec()) {
        let grid = GridModel::new(spec).unwrap();
        for hole in grid.holes() {
            let found = grid.hole_at(hole.x_mm, hole.y_mm).map(|h| h.index);
            prop_assert_eq!(found, Some(hole.index));
        }
    }
}

#[test]
fn test_default_grid_is_symmetric() {
    let grid = GridModel::new(GridSpec::default()).unwrap();
    let (top_x, top_y) = grid.coordinate_of(0, 2).unwrap();
    let last_row = grid.spec().holes_per_dim() - 1;
    let (bottom_x, bottom_y) = grid.coordinate_of(last_row, 2).unwrap();
    assert_eq!(top_x, bottom_x);
    assert_eq!(top_y, -bottom_y);
    assert_eq!(top_y, 8.0);
}
