//! Grid tests: linking, gravity, matching and reset through the public API.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spacecrush::{Grid, GridConfig, GridError, TileId, TileKind, TurnResult};

fn layout(s: &str) -> Grid {
    Grid::from_layout(s, GridConfig::default()).unwrap()
}

fn at(grid: &Grid, column: usize, row: usize) -> TileId {
    grid.tile_at(column, row)
        .unwrap_or_else(|| panic!("expected a tile at ({column},{row})"))
}

fn kind_at(grid: &Grid, column: usize, row: usize) -> Option<TileKind> {
    grid.tile_at(column, row)
        .and_then(|id| grid.tile(id))
        .map(|t| t.kind())
}

fn assert_match_laws(grid: &Grid, result: &TurnResult) {
    let n = result.matches().len();
    assert!(n == 0 || n >= 3, "match group of size {n}");
    for &id in result.matches() {
        assert!(!grid.tile(id).unwrap().is_popped(), "matched tile {id} is popped");
    }
}

/// Pop a random active tile, then keep popping matches until the board is quiet.
fn play_turn(grid: &mut Grid, rng: &mut StdRng) {
    let active: Vec<TileId> = grid.occupancy().into_iter().flatten().collect();
    if active.is_empty() {
        return;
    }
    let pick = active[rng.gen_range(0..active.len())];
    let mut result = grid.pop_tile(pick).unwrap();
    assert_match_laws(grid, &result);
    grid.verify_links().unwrap();
    while result.has_matches() {
        result = grid.pop_tiles(result.matches()).unwrap();
        assert_match_laws(grid, &result);
        grid.verify_links().unwrap();
    }
}

#[test]
fn test_populated_grid_is_linked_and_has_no_row_of_three() {
    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let columns = rng.gen_range(3..=12);
        let rows = rng.gen_range(3..=12);
        let grid = Grid::populate(columns, rows, GridConfig::default(), &mut rng).unwrap();
        grid.verify_links().unwrap();
        assert_eq!(grid.active_count(), columns * rows);

        for row in 0..rows {
            for column in 2..columns {
                let kind = kind_at(&grid, column, row);
                assert!(
                    !(kind == kind_at(&grid, column - 1, row) && kind == kind_at(&grid, column - 2, row)),
                    "seed {seed}: three in a row at ({column},{row})"
                );
            }
        }
    }
}

#[test]
fn test_links_stay_consistent_over_random_play() {
    for seed in 0..30 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut grid = Grid::populate(6, 8, GridConfig::default(), &mut rng).unwrap();
        for _ in 0..20 {
            play_turn(&mut grid, &mut rng);
        }
        for column in 0..grid.columns() {
            // Gravity leaves no holes: a column of height h fills rows 0..h.
            let height = grid.column_height(column);
            for row in 0..grid.rows() {
                assert_eq!(grid.tile_at(column, row).is_some(), row < height);
            }
        }
    }
}

#[test]
fn test_gravity_moves_exactly_the_stack_above() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut grid = Grid::populate(8, 8, GridConfig::default(), &mut rng).unwrap();
    for (column, row) in [(3, 0), (3, 0), (5, 4), (0, 7), (7, 2)] {
        let target = at(&grid, column, row);
        let above: Vec<TileId> = grid.top_tiles(target).unwrap().collect();
        let before: Vec<(TileId, usize)> = grid.tiles().map(|(id, t)| (id, t.row())).collect();

        grid.pop_tile(target).unwrap();

        let changed: Vec<TileId> = before
            .iter()
            .filter(|(id, row)| *id != target && grid.tile(*id).unwrap().row() != *row)
            .map(|(id, _)| *id)
            .collect();
        assert_eq!(changed.len(), above.len());
        for id in above {
            assert!(changed.contains(&id));
        }
        grid.verify_links().unwrap();
    }
}

#[test]
fn test_popping_top_tile_moves_nothing_and_ignores_columns() {
    // Column 0 is all cubes and column 1 all spheres; only rows count as runs.
    let mut grid = layout("CSY\nCSP\nCSY");
    let top_left = at(&grid, 0, 2);
    let result = grid.pop_tile(top_left).unwrap();
    assert_eq!(result.duration(), 0.0);
    assert!(!result.has_matches());
    assert_eq!(grid.column_height(0), 2);

    let result = grid.pop_tile(at(&grid, 0, 0)).unwrap();
    assert!((result.duration() - 0.25).abs() < 1e-6);
    assert!(!result.has_matches());
    assert_eq!(grid.column_height(0), 1);
    assert_eq!(kind_at(&grid, 0, 0), Some(TileKind::Cube));
    grid.verify_links().unwrap();
}

#[test]
fn test_row_neighbours_link_to_the_tile_dropping_in() {
    let mut grid = layout("CSY\nPCS\nYPC");
    let left = grid.home_tile(0, 0).unwrap();
    let right = grid.home_tile(2, 0).unwrap();
    let dropping = grid.home_tile(1, 1).unwrap();

    grid.pop_tile(grid.home_tile(1, 0).unwrap()).unwrap();

    assert_eq!(grid.tile(left).unwrap().right(), Some(dropping));
    assert_eq!(grid.tile(right).unwrap().left(), Some(dropping));
    assert_eq!(grid.tile(dropping).unwrap().left(), Some(left));
    assert_eq!(grid.tile(dropping).unwrap().right(), Some(right));
    // The emptied top slot of column 1 has no row neighbours.
    assert_eq!(grid.tile(grid.home_tile(0, 2).unwrap()).unwrap().right(), None);
    assert_eq!(grid.tile(grid.home_tile(2, 2).unwrap()).unwrap().left(), None);
    grid.verify_links().unwrap();
}

#[test]
fn test_cascade_runs_until_quiet() {
    // After popping (0,0) the middle row becomes three spheres.
    let mut grid = layout("SCC\nCSS\nSPY");
    let result = grid.pop_tile(at(&grid, 0, 0)).unwrap();
    assert!((result.duration() - 0.25).abs() < 1e-6);

    let mut matched: Vec<TileId> = result.matches().to_vec();
    matched.sort();
    let mut expected = vec![
        grid.home_tile(0, 2).unwrap(),
        grid.home_tile(1, 1).unwrap(),
        grid.home_tile(2, 1).unwrap(),
    ];
    expected.sort();
    assert_eq!(matched, expected);

    let result = grid.pop_tiles(result.matches()).unwrap();
    assert!(!result.has_matches());
    assert_eq!(grid.active_count(), 5);
    assert_eq!(kind_at(&grid, 0, 1), None);
    assert_eq!(kind_at(&grid, 1, 1), Some(TileKind::Cube));
    assert_eq!(kind_at(&grid, 2, 1), Some(TileKind::Cube));
    assert_eq!(kind_at(&grid, 0, 0), Some(TileKind::Cube));
    grid.verify_links().unwrap();
}

#[test]
fn test_reset_is_idempotent_and_restores_the_board() {
    let mut rng = StdRng::seed_from_u64(5);
    let fresh = Grid::populate(7, 9, GridConfig::default(), &mut rng).unwrap();
    let mut grid = fresh.clone();
    for _ in 0..10 {
        play_turn(&mut grid, &mut rng);
    }
    assert!(grid.active_count() < fresh.active_count());

    grid.reset();
    let once = grid.clone();
    grid.reset();
    assert_eq!(grid, once);
    assert_eq!(grid, fresh);
}

#[test]
fn test_step_with_a_popped_tile_is_rejected_without_changes() {
    let mut grid = layout("CSY\nPCS\nYPC");
    let a = at(&grid, 0, 0);
    let b = at(&grid, 2, 0);
    grid.pop_tile(a).unwrap();
    let snapshot = grid.clone();

    assert_eq!(grid.pop_tiles(&[b, a]), Err(GridError::TilePopped(a)));
    assert_eq!(grid, snapshot);
    assert_eq!(
        grid.pop_tile(TileId(9)),
        Err(GridError::UnknownTile(TileId(9)))
    );
}
