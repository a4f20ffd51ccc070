//! Result of one turn step.

use crate::tile::TileId;

/// What a turn step produced: the matched tiles (not yet popped) and how long
/// the moved tiles need to settle before the matches may be acted on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnResult {
    matches: Vec<TileId>,
    duration: f32,
}

impl TurnResult {
    pub(crate) fn new(matches: Vec<TileId>, duration: f32) -> Self {
        Self {
            matches,
            duration: duration.max(0.0),
        }
    }

    /// Matched tiles in detection order, without duplicates. Empty or at least three.
    pub fn matches(&self) -> &[TileId] {
        &self.matches
    }

    pub fn into_matches(self) -> Vec<TileId> {
        self.matches
    }

    /// Settle time in seconds.
    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }
}
