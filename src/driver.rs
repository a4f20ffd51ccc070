//! Turn driver: sequences turn steps against a clock owned by the caller.
//!
//! The grid resolves a step instantly and reports how long the moved tiles
//! need to settle. The driver waits that out, lights the matches, waits
//! again, pops them, and repeats until a step yields no matches. It also
//! resets an abandoned board after a period of inactivity.
//!
//! Time only advances through [`TurnDriver::advance`], so the whole sequence
//! is deterministic and needs no timers or threads.

use crate::error::GridError;
use crate::grid::{Grid, TileEffects};
use crate::tile::TileId;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// How long matches glow before they are popped.
    pub pop_matches_wait: Duration,
    /// Inactivity after which a played board is reset.
    pub idle_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            pop_matches_wait: Duration::from_secs(1),
            idle_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Player's turn: waiting for a selection.
    Idle,
    /// Moved tiles are settling; `total` is the full settle time of the step.
    Settling { remaining: Duration, total: Duration },
    /// Pending matches are lit and about to pop.
    Highlighting { remaining: Duration },
}

/// Outcome of a player selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The tile was popped and a turn is running.
    Started { matched: usize },
    /// The tile was already out of play; nothing happens to the grid.
    AlreadyPopped,
    /// A turn is still resolving.
    Busy,
}

/// What a call to [`TurnDriver::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    None,
    MatchesLit { count: usize },
    MatchesPopped { count: usize, chain: u32 },
    TurnFinished { chain: u32 },
    IdleReset,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnStats {
    pub turns: u32,
    pub player_pops: u32,
    pub cascade_pops: u32,
    pub longest_chain: u32,
    pub resets: u32,
}

#[derive(Debug, Clone)]
pub struct TurnDriver {
    config: DriverConfig,
    phase: TurnPhase,
    /// Matches of the last step, popped once they have settled and glowed.
    pending: Vec<TileId>,
    chain: u32,
    /// Inactivity on the player's turn. Frozen while a turn resolves.
    idle_for: Duration,
    /// Set by the first selection; an untouched board is never idle-reset.
    playing: bool,
    stats: TurnStats,
}

impl TurnDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            phase: TurnPhase::Idle,
            pending: Vec::new(),
            chain: 0,
            idle_for: Duration::ZERO,
            playing: false,
            stats: TurnStats::default(),
        }
    }

    pub fn config(&self) -> DriverConfig {
        self.config
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Matches waiting to be popped.
    pub fn pending(&self) -> &[TileId] {
        &self.pending
    }

    /// Cascade steps in the current turn.
    pub fn chain(&self) -> u32 {
        self.chain
    }

    pub fn stats(&self) -> TurnStats {
        self.stats
    }

    pub fn is_players_turn(&self) -> bool {
        self.phase == TurnPhase::Idle
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Any player input, whether or not it reaches the grid. Restarts the
    /// idle timer and arms idle reset.
    pub fn note_activity(&mut self) {
        self.idle_for = Duration::ZERO;
        self.playing = true;
    }

    /// Player picks `tile`. Counts as activity even when nothing is popped.
    pub fn select(&mut self, grid: &mut Grid, tile: TileId) -> Result<Selection, GridError> {
        self.note_activity();

        if !self.is_players_turn() {
            return Ok(Selection::Busy);
        }
        let popped = grid.tile(tile).ok_or(GridError::UnknownTile(tile))?.is_popped();
        if popped {
            return Ok(Selection::AlreadyPopped);
        }

        let result = grid.pop_tile(tile)?;
        self.stats.turns += 1;
        self.stats.player_pops += 1;
        self.chain = 0;
        self.phase = settling(result.duration());
        self.pending = result.into_matches();
        debug!(tile = %tile, matched = self.pending.len(), "turn started");
        Ok(Selection::Started {
            matched: self.pending.len(),
        })
    }

    /// Reset the board. Only allowed on the player's turn.
    pub fn reset(&mut self, grid: &mut Grid) -> bool {
        if !self.is_players_turn() {
            return false;
        }
        grid.reset();
        self.idle_for = Duration::ZERO;
        self.stats.resets += 1;
        true
    }

    /// Let `dt` of driver time pass. At most one phase transition happens per
    /// call; time left over after a transition is dropped.
    pub fn advance(
        &mut self,
        grid: &mut Grid,
        dt: Duration,
        effects: &mut impl TileEffects,
    ) -> Result<DriverEvent, GridError> {
        match self.phase {
            TurnPhase::Idle => {
                self.idle_for = self.idle_for.saturating_add(dt);
                if self.playing && self.idle_for > self.config.idle_timeout {
                    grid.reset();
                    self.playing = false;
                    self.idle_for = Duration::ZERO;
                    self.stats.resets += 1;
                    info!("idle timeout, board reset");
                    return Ok(DriverEvent::IdleReset);
                }
                Ok(DriverEvent::None)
            }
            TurnPhase::Settling { remaining, total } => {
                let remaining = remaining.saturating_sub(dt);
                if !remaining.is_zero() {
                    self.phase = TurnPhase::Settling { remaining, total };
                    return Ok(DriverEvent::None);
                }
                if self.pending.len() >= 3 {
                    grid.set_emissive(&self.pending, true, effects);
                    self.phase = TurnPhase::Highlighting {
                        remaining: self.config.pop_matches_wait,
                    };
                    return Ok(DriverEvent::MatchesLit {
                        count: self.pending.len(),
                    });
                }
                self.pending.clear();
                self.phase = TurnPhase::Idle;
                self.idle_for = Duration::ZERO;
                self.stats.longest_chain = self.stats.longest_chain.max(self.chain);
                debug!(chain = self.chain, "turn finished");
                Ok(DriverEvent::TurnFinished { chain: self.chain })
            }
            TurnPhase::Highlighting { remaining } => {
                let remaining = remaining.saturating_sub(dt);
                if !remaining.is_zero() {
                    self.phase = TurnPhase::Highlighting { remaining };
                    return Ok(DriverEvent::None);
                }
                let matches = std::mem::take(&mut self.pending);
                let result = grid.pop_tiles(&matches);
                grid.set_emissive(&matches, false, effects);
                let result = match result {
                    Ok(result) => result,
                    Err(err) => {
                        self.phase = TurnPhase::Idle;
                        self.idle_for = Duration::ZERO;
                        return Err(err);
                    }
                };

                self.chain += 1;
                self.stats.cascade_pops += matches.len() as u32;
                self.phase = settling(result.duration());
                self.pending = result.into_matches();
                Ok(DriverEvent::MatchesPopped {
                    count: matches.len(),
                    chain: self.chain,
                })
            }
        }
    }
}

impl Default for TurnDriver {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

fn settling(seconds: f32) -> TurnPhase {
    let total = Duration::try_from_secs_f32(seconds).unwrap_or(Duration::ZERO);
    TurnPhase::Settling {
        remaining: total,
        total,
    }
}
