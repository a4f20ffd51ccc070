//! Grid: owns the tile arena, populates it, resolves turn steps and resets.
//!
//! A turn step pops the requested tiles, lets everything above them fall,
//! and reports which of the moved tiles now sit in a row of three or more.
//! Matches are returned, never popped automatically: the caller decides when
//! the next step runs, usually after waiting out the returned duration.

use crate::arena::{TileArena, TopTiles};
use crate::error::{Axis, GridError, check_dimension};
use crate::tile::{Tile, TileId, TileKind};
use crate::turn::TurnResult;
use rand::Rng;
use tracing::{debug, info, trace, warn};

/// Movement tuning shared by every tile of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    /// Seconds of settle time per unit of travelled distance.
    pub move_speed: f32,
    /// Cell spacing (x, y) in presenter units.
    pub step: (f32, f32),
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            move_speed: 0.25,
            step: (1.0, 1.0),
        }
    }
}

/// Presentation side channel for highlighting tiles. Not part of grid state.
pub trait TileEffects {
    fn set_emissive(&mut self, tile: TileId, enabled: bool);
}

/// Effects sink for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEffects;

impl TileEffects for NoEffects {
    fn set_emissive(&mut self, _tile: TileId, _enabled: bool) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    columns: usize,
    rows: usize,
    config: GridConfig,
    arena: TileArena,
}

impl Grid {
    /// Create a `columns` x `rows` grid of random tiles.
    ///
    /// Rows are filled bottom to top, left to right. A kind equal to both the
    /// left and left-left neighbour is redrawn once, excluding that kind, so no
    /// row starts out with three in a row.
    pub fn populate<R: Rng + ?Sized>(
        columns: usize,
        rows: usize,
        config: GridConfig,
        rng: &mut R,
    ) -> Result<Self, GridError> {
        check_dimension(Axis::Columns, columns)?;
        check_dimension(Axis::Rows, rows)?;

        let mut kinds = Vec::with_capacity(columns * rows);
        for _row in 0..rows {
            for column in 0..columns {
                let mut kind = TileKind::random_except(rng, TileKind::Unknown);
                if column >= 2 {
                    let left = kinds[kinds.len() - 1];
                    let left_left = kinds[kinds.len() - 2];
                    if kind == left && kind == left_left {
                        kind = TileKind::random_except(rng, kind);
                    }
                }
                kinds.push(kind);
            }
        }

        let grid = Self::build(columns, rows, &kinds, config);
        info!(columns, rows, "grid populated");
        Ok(grid)
    }

    /// Grid with fixed kinds, row-major with row 0 at the bottom.
    pub fn from_kinds(
        columns: usize,
        rows: usize,
        kinds: &[TileKind],
        config: GridConfig,
    ) -> Result<Self, GridError> {
        check_dimension(Axis::Columns, columns)?;
        check_dimension(Axis::Rows, rows)?;
        if kinds.len() != columns * rows {
            return Err(GridError::LayoutMismatch {
                expected: columns * rows,
                found: kinds.len(),
            });
        }
        if let Some(i) = kinds.iter().position(|k| !k.is_playable()) {
            return Err(GridError::InvalidTileType {
                column: i % columns,
                row: i / columns,
                found: kinds[i].to_char(),
            });
        }
        Ok(Self::build(columns, rows, kinds, config))
    }

    /// Grid from a text layout: one line per row, top row first, one
    /// character per tile (see [`TileKind::from_char`]). Blank lines and
    /// surrounding whitespace are ignored.
    pub fn from_layout(layout: &str, config: GridConfig) -> Result<Self, GridError> {
        let lines: Vec<&str> = layout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let rows = lines.len();
        let columns = lines.first().map_or(0, |l| l.chars().count());
        check_dimension(Axis::Columns, columns)?;
        check_dimension(Axis::Rows, rows)?;

        let mut kinds = Vec::with_capacity(columns * rows);
        for row in 0..rows {
            let line = lines[rows - 1 - row];
            let found = line.chars().count();
            if found != columns {
                return Err(GridError::LayoutMismatch {
                    expected: columns,
                    found,
                });
            }
            for (column, c) in line.chars().enumerate() {
                let kind = TileKind::from_char(c).ok_or(GridError::InvalidTileType {
                    column,
                    row,
                    found: c,
                })?;
                kinds.push(kind);
            }
        }
        Ok(Self::build(columns, rows, &kinds, config))
    }

    fn build(columns: usize, rows: usize, kinds: &[TileKind], config: GridConfig) -> Self {
        let mut arena = TileArena::with_capacity(columns * rows);
        for (i, kind) in kinds.iter().enumerate() {
            arena.push(Tile::new(*kind, i % columns, i / columns));
        }
        arena.relink(columns, rows, |c, r| slot(columns, c, r));
        Self {
            columns,
            rows,
            config,
            arena,
        }
    }

    /// Put every tile back into its home slot, unpopped, and relink the whole
    /// grid from the home layout. Kinds are kept.
    pub fn reset(&mut self) {
        for tile in self.arena.iter_mut() {
            tile.reset();
        }
        let columns = self.columns;
        self.arena
            .relink(self.columns, self.rows, |c, r| slot(columns, c, r));
        info!(columns = self.columns, rows = self.rows, "grid reset");
    }

    pub fn pop_tile(&mut self, tile: TileId) -> Result<TurnResult, GridError> {
        self.pop_tiles(&[tile])
    }

    /// Run one turn step: pop `tiles` in order, let the stacks above them fall,
    /// then look for row matches among the tiles that moved.
    ///
    /// The step is computed on a copy of the arena and only committed when no
    /// precondition or match invariant fails, so an error leaves the grid
    /// untouched.
    pub fn pop_tiles(&mut self, tiles: &[TileId]) -> Result<TurnResult, GridError> {
        let mut arena = self.arena.clone();
        for tile in arena.iter_mut() {
            tile.move_duration = 0.0;
        }
        let mut moved = Vec::new();

        for &id in tiles {
            let tile = arena.get(id).ok_or(GridError::UnknownTile(id))?;
            if tile.popped {
                return Err(GridError::TilePopped(id));
            }
            arena.pop(id);
            moved.extend(arena.top_tiles(id));
        }

        // Distance is measured from where the tile rested before this step.
        let mut duration = 0.0_f32;
        for &id in &moved {
            let dropped = self.arena[id].row.abs_diff(arena[id].row);
            let move_duration = self.config.move_speed * dropped as f32 * self.config.step.1;
            arena[id].move_duration = move_duration;
            duration = duration.max(move_duration);
        }

        let matches = collect_matches(&mut arena, &moved);
        if let Err(err) = check_matches(&arena, &matches) {
            warn!(error = %err, "turn step rejected");
            return Err(err);
        }

        debug!(
            popped = tiles.len(),
            moved = moved.len(),
            matched = matches.len(),
            duration,
            "turn step"
        );
        self.arena = arena;
        Ok(TurnResult::new(matches, duration))
    }

    /// Row matches seeded from `candidates`, each seed expanded to its full run.
    /// Only the tiles' `matching` scratch flags change.
    pub fn find_matches(&mut self, candidates: &[TileId]) -> Result<Vec<TileId>, GridError> {
        if let Some(&id) = candidates.iter().find(|id| !self.arena.contains(**id)) {
            return Err(GridError::UnknownTile(id));
        }
        let matches = collect_matches(&mut self.arena, candidates);
        check_matches(&self.arena, &matches)?;
        Ok(matches)
    }

    /// Forward a highlight toggle for `tiles` to the presenter.
    pub fn set_emissive(&self, tiles: &[TileId], enabled: bool, effects: &mut impl TileEffects) {
        for &id in tiles.iter().filter(|id| self.arena.contains(**id)) {
            effects.set_emissive(id, enabled);
        }
    }

    // --- QUERIES ---

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn config(&self) -> GridConfig {
        self.config
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.arena.get(id)
    }

    pub fn tiles(&self) -> impl Iterator<Item = (TileId, &Tile)> + '_ {
        self.arena.ids().zip(self.arena.tiles())
    }

    /// Tiles stacked above `id`, nearest first.
    pub fn top_tiles(&self, id: TileId) -> Result<TopTiles<'_>, GridError> {
        if !self.arena.contains(id) {
            return Err(GridError::UnknownTile(id));
        }
        Ok(self.arena.top_tiles(id))
    }

    /// Tile created at (`column`, `row`) when the grid was populated.
    pub fn home_tile(&self, column: usize, row: usize) -> Option<TileId> {
        (column < self.columns && row < self.rows).then(|| slot(self.columns, column, row))
    }

    /// Active tile currently resting at (`column`, `row`).
    pub fn tile_at(&self, column: usize, row: usize) -> Option<TileId> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        // A tile never changes column and only ever falls, so it is one of the
        // tiles created at or above `row` in this column.
        (row..self.rows)
            .map(|r| slot(self.columns, column, r))
            .find(|id| {
                let tile = &self.arena[*id];
                !tile.popped && tile.row == row
            })
    }

    /// Active tiles by current slot, row-major with row 0 at the bottom.
    pub fn occupancy(&self) -> Vec<Option<TileId>> {
        let mut cells = vec![None; self.columns * self.rows];
        for (id, tile) in self.tiles().filter(|(_, t)| !t.popped) {
            cells[tile.row * self.columns + tile.column] = Some(id);
        }
        cells
    }

    /// Target position of a tile in presenter units.
    pub fn position(&self, id: TileId) -> Option<(f32, f32)> {
        let tile = self.arena.get(id)?;
        Some((
            tile.column as f32 * self.config.step.0,
            tile.row as f32 * self.config.step.1,
        ))
    }

    pub fn column_height(&self, column: usize) -> usize {
        self.tiles()
            .filter(|(_, t)| !t.popped && t.column == column)
            .count()
    }

    pub fn active_count(&self) -> usize {
        self.tiles().filter(|(_, t)| !t.popped).count()
    }

    /// Check that the links of every active tile are symmetric and agree with
    /// the tiles' columns and rows.
    pub fn verify_links(&self) -> Result<(), GridError> {
        let cells = self.occupancy();
        let at = |column: usize, row: usize| -> Option<TileId> {
            (column < self.columns && row < self.rows)
                .then(|| cells[row * self.columns + column])
                .flatten()
        };
        let broken = |tile: TileId, detail: &'static str| GridError::BrokenLink { tile, detail };

        for (id, tile) in self.tiles().filter(|(_, t)| !t.popped) {
            let (column, row) = (tile.column, tile.row);
            if at(column, row) != Some(id) {
                return Err(broken(id, "shares its slot with another tile"));
            }

            let expected_left = column.checked_sub(1).and_then(|c| at(c, row));
            let expected_bottom = row.checked_sub(1).and_then(|r| at(column, r));
            if tile.links.left != expected_left {
                return Err(broken(id, "left link disagrees with the grid"));
            }
            if tile.links.right != at(column + 1, row) {
                return Err(broken(id, "right link disagrees with the grid"));
            }
            if tile.links.bottom != expected_bottom {
                return Err(broken(id, "bottom link disagrees with the grid"));
            }
            if tile.links.top != at(column, row + 1) {
                return Err(broken(id, "top link disagrees with the grid"));
            }
            if row > 0 && expected_bottom.is_none() {
                return Err(broken(id, "floating above an empty slot"));
            }

            if let Some(right) = tile.links.right {
                if self.arena[right].links.left != Some(id) {
                    return Err(broken(id, "right neighbour does not link back"));
                }
            }
            if let Some(top) = tile.links.top {
                if self.arena[top].links.bottom != Some(id) {
                    return Err(broken(id, "top neighbour does not link back"));
                }
            }
        }
        Ok(())
    }
}

#[inline]
fn slot(columns: usize, column: usize, row: usize) -> TileId {
    TileId((row * columns + column) as u32)
}

/// Seeds are candidates that pass the row check; each seed is walked left and
/// right over same-kind tiles.
fn collect_matches(arena: &mut TileArena, candidates: &[TileId]) -> Vec<TileId> {
    let mut seen = vec![false; arena.len()];
    let mut matches = Vec::new();
    let mut insert = |id: TileId, matches: &mut Vec<TileId>| {
        if !std::mem::replace(&mut seen[id.index()], true) {
            matches.push(id);
        }
    };

    for &id in candidates {
        if arena[id].popped || !arena.check_row_matches(id) {
            continue;
        }
        trace!(tile = %id, "match seed");
        insert(id, &mut matches);

        let seed = &arena[id];
        let mut cursor = seed.links.left;
        while let Some(next) = cursor.filter(|&c| seed.match_type(Some(&arena[c]))) {
            insert(next, &mut matches);
            cursor = arena[next].links.left;
        }
        let mut cursor = seed.links.right;
        while let Some(next) = cursor.filter(|&c| seed.match_type(Some(&arena[c]))) {
            insert(next, &mut matches);
            cursor = arena[next].links.right;
        }
    }
    matches
}

fn check_matches(arena: &TileArena, matches: &[TileId]) -> Result<(), GridError> {
    if let Some(id) = matches.iter().find(|id| arena[**id].popped) {
        return Err(GridError::MatchInvariantViolated(format!(
            "matched tile {id} has already been popped"
        )));
    }
    if (1..3).contains(&matches.len()) {
        return Err(GridError::MatchInvariantViolated(format!(
            "{} matched tiles, expected none or at least 3",
            matches.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn grid(layout: &str) -> Grid {
        Grid::from_layout(layout, GridConfig::default()).unwrap()
    }

    #[test]
    fn test_populate_rejects_bad_dimensions() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = Grid::populate(2, 10, GridConfig::default(), &mut rng).unwrap_err();
        assert_eq!(
            err,
            GridError::InvalidDimension {
                axis: Axis::Columns,
                value: 2
            }
        );
        assert!(Grid::populate(10, 101, GridConfig::default(), &mut rng).is_err());
    }

    #[test]
    fn test_populate_is_deterministic_for_a_seed() {
        let a = Grid::populate(8, 8, GridConfig::default(), &mut StdRng::seed_from_u64(42)).unwrap();
        let b = Grid::populate(8, 8, GridConfig::default(), &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
        a.verify_links().unwrap();
    }

    #[test]
    fn test_from_layout_orientation() {
        let g = grid("CSY\nPCS\nYPC");
        let top_left = g.tile_at(0, 2).unwrap();
        let bottom_right = g.tile_at(2, 0).unwrap();
        assert_eq!(g.tile(top_left).unwrap().kind(), TileKind::Cube);
        assert_eq!(g.tile(bottom_right).unwrap().kind(), TileKind::Cube);
        assert_eq!(g.tile(g.tile_at(0, 0).unwrap()).unwrap().kind(), TileKind::Cylinder);
    }

    #[test]
    fn test_from_layout_errors() {
        assert!(matches!(
            Grid::from_layout("CSY\nPC\nYPC", GridConfig::default()),
            Err(GridError::LayoutMismatch {
                expected: 3,
                found: 2
            })
        ));
        assert!(matches!(
            Grid::from_layout("CSY\nPXS\nYPC", GridConfig::default()),
            Err(GridError::InvalidTileType {
                column: 1,
                row: 1,
                found: 'X'
            })
        ));
        assert!(matches!(
            Grid::from_layout("CS\nPC", GridConfig::default()),
            Err(GridError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_from_kinds_rejects_unknown() {
        let mut kinds = vec![TileKind::Cube; 9];
        kinds[4] = TileKind::Unknown;
        assert_eq!(
            Grid::from_kinds(3, 3, &kinds, GridConfig::default()),
            Err(GridError::InvalidTileType {
                column: 1,
                row: 1,
                found: '?'
            })
        );
    }

    #[test]
    fn test_pop_unknown_and_popped_tiles() {
        let mut g = grid("CSY\nPCS\nYPC");
        assert_eq!(g.pop_tile(TileId(99)), Err(GridError::UnknownTile(TileId(99))));
        let t = g.tile_at(0, 2).unwrap();
        g.pop_tile(t).unwrap();
        assert_eq!(g.pop_tile(t), Err(GridError::TilePopped(t)));
    }

    #[test]
    fn test_failed_step_leaves_grid_untouched() {
        let mut g = grid("CSY\nPCS\nYPC");
        let before = g.clone();
        let t = g.tile_at(1, 0).unwrap();
        // Second pop of the same tile fails after the first already ran on the copy.
        assert_eq!(g.pop_tiles(&[t, t]), Err(GridError::TilePopped(t)));
        assert_eq!(g, before);
    }

    #[test]
    fn test_duration_scales_with_drop() {
        let config = GridConfig {
            move_speed: 0.5,
            step: (1.0, 2.0),
        };
        let mut g = Grid::from_layout("CSY\nPCS\nYPC", config).unwrap();
        let bottom = g.tile_at(1, 0).unwrap();
        let result = g.pop_tile(bottom).unwrap();
        assert_eq!(result.duration(), 1.0);

        // Two pops in one column: the upper tile drops two rows.
        let mut g = Grid::from_layout("CSY\nPCS\nYPC", config).unwrap();
        let lower = g.tile_at(0, 0).unwrap();
        let upper = g.tile_at(0, 1).unwrap();
        let result = g.pop_tiles(&[lower, upper]).unwrap();
        assert_eq!(result.duration(), 2.0);
        let survivor = g.tile_at(0, 0).unwrap();
        assert_eq!(g.tile(survivor).unwrap().kind(), TileKind::Cube);
        assert_eq!(g.tile(survivor).unwrap().move_duration(), 2.0);
    }

    #[test]
    fn test_move_duration_only_for_tiles_moved_by_the_step() {
        let mut g = grid("CSY\nPCS\nYPC");
        let column_one = [g.home_tile(1, 1).unwrap(), g.home_tile(1, 2).unwrap()];
        g.pop_tile(g.home_tile(1, 0).unwrap()).unwrap();
        for id in column_one {
            assert!((g.tile(id).unwrap().move_duration() - 0.25).abs() < 1e-6);
        }

        g.pop_tile(g.home_tile(0, 0).unwrap()).unwrap();
        for id in column_one {
            assert_eq!(g.tile(id).unwrap().move_duration(), 0.0);
        }
        let dropped = g.home_tile(0, 1).unwrap();
        assert!((g.tile(dropped).unwrap().move_duration() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_find_matches_on_settled_grid() {
        let mut g = grid("CSY\nPPP\nYSC");
        let middle = g.tile_at(1, 1).unwrap();
        let matches = g.find_matches(&[middle]).unwrap();
        assert_eq!(matches.len(), 3);
        assert!(g.tile(middle).unwrap().is_matching());
        let corner = g.tile_at(0, 0).unwrap();
        assert!(g.find_matches(&[corner]).unwrap().is_empty());
    }

    #[test]
    fn test_occupancy_and_heights() {
        let mut g = grid("CSY\nPCS\nYPC");
        assert_eq!(g.active_count(), 9);
        g.pop_tile(g.tile_at(2, 1).unwrap()).unwrap();
        assert_eq!(g.column_height(2), 2);
        assert_eq!(g.active_count(), 8);
        let cells = g.occupancy();
        assert!(cells[2 * 3 + 2].is_none());
        assert_eq!(cells[3 + 2], g.tile_at(2, 1));
        assert_eq!(g.position(g.tile_at(2, 1).unwrap()), Some((2.0, 1.0)));
    }

    #[test]
    fn test_set_emissive_forwards_known_tiles() {
        #[derive(Default)]
        struct Recorder(Vec<(TileId, bool)>);
        impl TileEffects for Recorder {
            fn set_emissive(&mut self, tile: TileId, enabled: bool) {
                self.0.push((tile, enabled));
            }
        }
        let g = grid("CSY\nPCS\nYPC");
        let mut rec = Recorder::default();
        g.set_emissive(&[TileId(0), TileId(500), TileId(4)], true, &mut rec);
        assert_eq!(rec.0, vec![(TileId(0), true), (TileId(4), true)]);
    }
}
