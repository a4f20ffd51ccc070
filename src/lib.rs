//! SpaceCrush core: a match-3 tile grid.
//!
//! Tiles are stacked in columns and linked to their four neighbours. Popping a
//! tile drops everything above it by one slot; tiles that moved and now sit in
//! a horizontal run of three or more of a kind are reported as matches. The
//! caller pops those in a later step, which may produce new matches, and so on
//! until the board is quiet.
//!
//! # Module Structure
//!
//! - [`tile`]: tile kinds, ids and per-tile state
//! - [`grid`]: population, turn steps, reset and queries
//! - [`turn`]: the value a turn step returns
//! - [`driver`]: a clock-driven turn sequencer with idle reset
//! - [`error`]: precondition and invariant errors
//!
//! The core performs no I/O and never waits: it returns how long the moved
//! tiles need to settle and leaves the waiting to the caller.
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use spacecrush::{Grid, GridConfig};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let mut grid = Grid::populate(10, 10, GridConfig::default(), &mut rng)?;
//!
//! let tile = grid.tile_at(4, 0).expect("bottom row is full");
//! let mut result = grid.pop_tile(tile)?;
//! while result.has_matches() {
//!     // A presenter would wait `result.duration()` seconds here.
//!     result = grid.pop_tiles(result.matches())?;
//! }
//! assert!(grid.verify_links().is_ok());
//! # Ok::<(), spacecrush::GridError>(())
//! ```

mod arena;
pub mod driver;
pub mod error;
pub mod grid;
pub mod tile;
pub mod turn;

pub use arena::TopTiles;
pub use driver::{DriverConfig, DriverEvent, Selection, TurnDriver, TurnPhase, TurnStats};
pub use error::{Axis, GridError, MAX_DIMENSION, MIN_DIMENSION};
pub use grid::{Grid, GridConfig, NoEffects, TileEffects};
pub use tile::{Links, Tile, TileId, TileKind};
pub use turn::TurnResult;
