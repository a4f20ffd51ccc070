//! Grid errors: precondition and invariant violations surfaced by the core.

use crate::tile::TileId;
use std::fmt;
use thiserror::Error;

/// Smallest allowed column/row count.
pub const MIN_DIMENSION: usize = 3;
/// Largest allowed column/row count.
pub const MAX_DIMENSION: usize = 100;

/// Which grid axis a dimension error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Columns,
    Rows,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Columns => f.write_str("columns"),
            Self::Rows => f.write_str("rows"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error(
        "invalid {axis} count {value}: expected {min}..={max}",
        min = MIN_DIMENSION,
        max = MAX_DIMENSION
    )]
    InvalidDimension { axis: Axis, value: usize },
    #[error("invalid tile type {found:?} at column {column}, row {row}")]
    InvalidTileType {
        column: usize,
        row: usize,
        found: char,
    },
    #[error("layout has {found} tiles, expected {expected}")]
    LayoutMismatch { expected: usize, found: usize },
    #[error("tile {0} is not part of this grid")]
    UnknownTile(TileId),
    #[error("tile {0} has already been popped")]
    TilePopped(TileId),
    #[error("match invariant violated: {0}")]
    MatchInvariantViolated(String),
    #[error("broken link at tile {tile}: {detail}")]
    BrokenLink { tile: TileId, detail: &'static str },
}

/// Check a column/row count against the allowed range.
pub fn check_dimension(axis: Axis, value: usize) -> Result<(), GridError> {
    if (MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
        Ok(())
    } else {
        Err(GridError::InvalidDimension { axis, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_bounds() {
        assert!(check_dimension(Axis::Columns, 3).is_ok());
        assert!(check_dimension(Axis::Rows, 100).is_ok());
        assert_eq!(
            check_dimension(Axis::Rows, 2),
            Err(GridError::InvalidDimension {
                axis: Axis::Rows,
                value: 2
            })
        );
        assert!(check_dimension(Axis::Columns, 101).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = GridError::InvalidDimension {
            axis: Axis::Columns,
            value: 0,
        };
        assert_eq!(err.to_string(), "invalid columns count 0: expected 3..=100");
        assert_eq!(
            GridError::TilePopped(TileId(7)).to_string(),
            "tile #7 has already been popped"
        );
    }
}
