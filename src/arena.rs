//! Tile arena: flat tile storage plus the link-rewriting primitives behind pop,
//! gravity and row matching.
//!
//! Links are arena indices, so every operation here takes a [`TileId`] and
//! reads or rewrites neighbours through the arena.

use crate::tile::{Tile, TileId};
use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TileArena {
    tiles: Vec<Tile>,
}

impl Index<TileId> for TileArena {
    type Output = Tile;

    #[inline]
    fn index(&self, id: TileId) -> &Tile {
        &self.tiles[id.index()]
    }
}

impl IndexMut<TileId> for TileArena {
    #[inline]
    fn index_mut(&mut self, id: TileId) -> &mut Tile {
        &mut self.tiles[id.index()]
    }
}

impl TileArena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tiles: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, tile: Tile) -> TileId {
        let id = TileId(self.tiles.len() as u32);
        self.tiles.push(tile);
        id
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn contains(&self, id: TileId) -> bool {
        id.index() < self.tiles.len()
    }

    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.index())
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Tile> {
        self.tiles.iter_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = TileId> + '_ {
        (0..self.tiles.len() as u32).map(TileId)
    }

    /// Tiles stacked above `id`, nearest first.
    pub fn top_tiles(&self, id: TileId) -> TopTiles<'_> {
        TopTiles {
            arena: self,
            next: self[id].links.top,
        }
    }

    // --- POP & GRAVITY ---

    /// Remove `id` from play and drop everything above it by one slot.
    ///
    /// The vicinity is re-stitched before anything moves: `move_down` reads the
    /// popped tile's neighbours. The popped tile keeps its own links so
    /// [`Self::top_tiles`] still walks the stack that moved.
    pub fn pop(&mut self, id: TileId) {
        self[id].popped = true;
        self.update_popped_vicinity(id);
        if let Some(top) = self[id].links.top {
            self.move_down(top, id);
        }
    }

    fn update_popped_vicinity(&mut self, id: TileId) {
        let links = self[id].links;
        if let Some(bottom) = links.bottom {
            self[bottom].links.top = links.top;
        }
        if let Some(top) = links.top {
            self[top].links.bottom = links.bottom;
        }
        if let Some(left) = links.left {
            self[left].links.right = links.top;
        }
        if let Some(right) = links.right {
            self[right].links.left = links.top;
        }
    }

    /// Move `id` into `former`'s slot, and every tile above it into the slot
    /// below. The topmost tile settles first, then each one beneath it takes
    /// over the slot of the tile it lands on.
    fn move_down(&mut self, id: TileId, former: TileId) {
        let mut stack = vec![(id, former)];
        let mut cursor = id;
        while let Some(top) = self[cursor].links.top {
            stack.push((top, cursor));
            cursor = top;
        }

        while let Some((tile, former)) = stack.pop() {
            self.update_traversed_vicinity(tile, former);
            self[tile].row = self.calc_row_index(tile);
        }
    }

    /// Hand `former`'s row neighbours to `id`.
    ///
    /// The neighbours are linked back to `former.top`, not to `id`.
    fn update_traversed_vicinity(&mut self, id: TileId, former: TileId) {
        let own = self[id].links;
        if own.top.is_none() {
            // Nothing will drop into the slot this tile leaves behind.
            if let Some(left) = own.left {
                self[left].links.right = None;
            }
            if let Some(right) = own.right {
                self[right].links.left = None;
            }
        }

        let inherited = self[former].links;
        self[id].links.left = inherited.left;
        self[id].links.right = inherited.right;

        if let Some(left) = inherited.left {
            self[left].links.right = inherited.top;
        }
        if let Some(right) = inherited.right {
            self[right].links.left = inherited.top;
        }
    }

    /// Number of `bottom` hops down to the floor.
    fn calc_row_index(&self, id: TileId) -> usize {
        let mut row = 0;
        let mut cursor = self[id].links.bottom;
        while let Some(below) = cursor {
            cursor = self[below].links.bottom;
            row += 1;
        }
        row
    }

    // --- MATCHING ---

    /// Flag `id` as matching when it sits in a run of three or more of its kind
    /// in its row. Patterns: `xxX`, `xXx`, `Xxx`.
    pub fn check_row_matches(&mut self, id: TileId) -> bool {
        let tile = &self[id];
        let kind = tile.kind;
        let same = |other: Option<TileId>| other.is_some_and(|o| self[o].kind == kind);

        let left = tile.links.left;
        let right = tile.links.right;
        let left_left = left.and_then(|l| self[l].links.left);
        let right_right = right.and_then(|r| self[r].links.right);

        let matching = (same(left) && (same(left_left) || same(right)))
            || (same(right) && same(right_right));
        self[id].matching = matching;
        matching
    }

    /// Relink every tile from its home slot. `slot(column, row)` maps a home
    /// position to the tile created there.
    pub fn relink(&mut self, columns: usize, rows: usize, slot: impl Fn(usize, usize) -> TileId) {
        for tile in &mut self.tiles {
            tile.links = Default::default();
        }
        for row in 0..rows {
            let mut left_neighbour: Option<TileId> = None;
            for column in 0..columns {
                let id = slot(column, row);
                self[id].links.left = left_neighbour;
                if let Some(left) = left_neighbour {
                    self[left].links.right = Some(id);
                }
                left_neighbour = Some(id);

                if row != 0 {
                    let below = slot(column, row - 1);
                    self[below].links.top = Some(id);
                    self[id].links.bottom = Some(below);
                }
            }
        }
    }
}

/// Iterator over the tiles above a tile, following `top` links.
#[derive(Debug, Clone)]
pub struct TopTiles<'a> {
    arena: &'a TileArena,
    next: Option<TileId>,
}

impl Iterator for TopTiles<'_> {
    type Item = TileId;

    fn next(&mut self) -> Option<TileId> {
        let current = self.next?;
        self.next = self.arena[current].links.top;
        Some(current)
    }
}
