//! Tiles: kind, grid placement, flags and the four adjacency links.

use rand::Rng;
use std::fmt;

/// Tile kinds. `Unknown` is the unset sentinel and never sits on a live tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TileKind {
    Cube,
    Sphere,
    Cylinder,
    Capsule,
    #[default]
    Unknown,
}

impl TileKind {
    /// Every playable kind, in declaration order.
    pub const ALL: [Self; 4] = [Self::Cube, Self::Sphere, Self::Cylinder, Self::Capsule];

    /// Uniform random playable kind other than `except`.
    /// Passing `Unknown` draws from all playable kinds.
    pub fn random_except<R: Rng + ?Sized>(rng: &mut R, except: Self) -> Self {
        let mut pool = Self::ALL;
        let mut len = 0;
        for kind in Self::ALL.into_iter().filter(|k| *k != except) {
            pool[len] = kind;
            len += 1;
        }
        pool[rng.gen_range(0..len)]
    }

    /// Layout character: `C`ube, `S`phere, c`Y`linder, ca`P`sule.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(Self::Cube),
            'S' => Some(Self::Sphere),
            'Y' => Some(Self::Cylinder),
            'P' => Some(Self::Capsule),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Self::Cube => 'C',
            Self::Sphere => 'S',
            Self::Cylinder => 'Y',
            Self::Capsule => 'P',
            Self::Unknown => '?',
        }
    }

    /// Colour slot used by presenters (0..4).
    pub fn color_index(self) -> u8 {
        match self {
            Self::Cube => 0,
            Self::Sphere => 1,
            Self::Cylinder => 2,
            Self::Capsule => 3,
            Self::Unknown => 4,
        }
    }

    pub fn is_playable(self) -> bool {
        self != Self::Unknown
    }
}

/// Index of a tile in its grid's arena. Stable for the grid's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u32);

impl TileId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Neighbour links. `top`/`bottom` follow the column stack, `left`/`right` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Links {
    pub left: Option<TileId>,
    pub right: Option<TileId>,
    pub top: Option<TileId>,
    pub bottom: Option<TileId>,
}

/// A single grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub(crate) kind: TileKind,
    pub(crate) column: usize,
    pub(crate) row: usize,
    pub(crate) home_row: usize,
    pub(crate) popped: bool,
    /// Scratch flag of row match detection.
    pub(crate) matching: bool,
    pub(crate) links: Links,
    /// Seconds the tile needs to settle after the last turn step; zero if it
    /// did not move in that step.
    pub(crate) move_duration: f32,
}

impl Tile {
    pub(crate) fn new(kind: TileKind, column: usize, row: usize) -> Self {
        Self {
            kind,
            column,
            row,
            home_row: row,
            popped: false,
            matching: false,
            links: Links::default(),
            move_duration: 0.0,
        }
    }

    pub fn kind(&self) -> TileKind {
        self.kind
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// Current row, counted from the floor.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Row the tile was created in; reset puts it back here.
    pub fn home_row(&self) -> usize {
        self.home_row
    }

    pub fn is_popped(&self) -> bool {
        self.popped
    }

    pub fn is_matching(&self) -> bool {
        self.matching
    }

    pub fn links(&self) -> Links {
        self.links
    }

    pub fn left(&self) -> Option<TileId> {
        self.links.left
    }

    pub fn right(&self) -> Option<TileId> {
        self.links.right
    }

    pub fn top(&self) -> Option<TileId> {
        self.links.top
    }

    pub fn bottom(&self) -> Option<TileId> {
        self.links.bottom
    }

    /// Settle time from the last turn step; zero for tiles it did not move.
    pub fn move_duration(&self) -> f32 {
        self.move_duration
    }

    /// True if `other` exists, is still in play and has this tile's kind.
    pub fn match_type(&self, other: Option<&Self>) -> bool {
        other.is_some_and(|t| !t.popped && t.kind == self.kind)
    }

    /// Back to the state it had right after population. The kind is kept.
    pub(crate) fn reset(&mut self) {
        self.row = self.home_row;
        self.popped = false;
        self.matching = false;
        self.links = Links::default();
        self.move_duration = 0.0;
    }
}
