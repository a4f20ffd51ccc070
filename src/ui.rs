//! Layout and drawing: board, cursor, match glow and the side panel.

use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use spacecrush::{Grid, TileEffects, TileId, TileKind, TurnDriver, TurnPhase};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal cells per tile: " ● ".
const CELL_WIDTH: u16 = 3;
const CELL_HEIGHT: u16 = 1;
const SIDEBAR_WIDTH: u16 = 26;

/// Flash when matches light up, fading into the static lit style.
const GLOW_FADE_MS: u32 = 350;

/// Everything the board and side panel show for one frame.
pub struct View<'a> {
    pub grid: &'a Grid,
    pub driver: &'a TurnDriver,
    pub theme: &'a Theme,
    pub cursor: (usize, usize),
    pub seed: u64,
    pub status: &'a str,
    pub no_animation: bool,
}

/// Tiles the driver has lit, plus the TachyonFX flash drawn over them.
///
/// Any change to the lit set drops the effect so the next frame rebuilds it
/// for the new cells.
#[derive(Default)]
pub struct Glow {
    lit: HashSet<TileId>,
    effect: Option<Effect>,
    process_time: Option<Instant>,
}

impl Glow {
    pub fn is_lit(&self, tile: TileId) -> bool {
        self.lit.contains(&tile)
    }

    pub fn clear(&mut self) {
        self.lit.clear();
        self.effect = None;
        self.process_time = None;
    }
}

impl TileEffects for Glow {
    fn set_emissive(&mut self, tile: TileId, enabled: bool) {
        let changed = if enabled {
            self.lit.insert(tile)
        } else {
            self.lit.remove(&tile)
        };
        if changed {
            self.effect = None;
            self.process_time = None;
        }
    }
}

/// Board size in terminal cells, border included.
fn board_size(columns: usize, rows: usize) -> (u16, u16) {
    let w = columns as u16 * CELL_WIDTH;
    let h = rows as u16 * CELL_HEIGHT;
    (w + 2, h + 2)
}

fn kind_glyph(kind: TileKind) -> &'static str {
    match kind {
        TileKind::Cube => "■",
        TileKind::Sphere => "●",
        TileKind::Cylinder => "▮",
        TileKind::Capsule => "◆",
        TileKind::Unknown => "?",
    }
}

fn kind_name(kind: TileKind) -> &'static str {
    match kind {
        TileKind::Cube => "Cube",
        TileKind::Sphere => "Sphere",
        TileKind::Cylinder => "Cylinder",
        TileKind::Capsule => "Capsule",
        TileKind::Unknown => "Unknown",
    }
}

/// Top-left terminal cell of slot (column, row); row 0 is the bottom of the board.
fn slot_origin(inner: Rect, rows: usize, column: usize, row: usize) -> (u16, u16) {
    let x = inner.x + column as u16 * CELL_WIDTH;
    let y = inner.y + (rows - 1 - row) as u16 * CELL_HEIGHT;
    (x, y)
}

/// Draw the board and side panel centred in the frame, then the glow effect.
pub fn draw(frame: &mut Frame, view: &View<'_>, glow: &mut Glow, now: Instant) {
    let area = frame.area();
    let (bw, bh) = board_size(view.grid.columns(), view.grid.rows());
    let total_w = bw + SIDEBAR_WIDTH;

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(bh.max(SIDEBAR_HEIGHT)),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let board_area = Rect {
        height: bh.min(inner[0].height),
        ..inner[0]
    };

    let board_inner = draw_board(frame, view, glow, board_area);
    draw_sidebar(frame, view, inner[1]);

    if !view.no_animation && !glow.lit.is_empty() {
        apply_glow_effect(frame, view, glow, board_inner, now);
    }
}

/// Draw tiles and the cursor. Returns the inner board rect.
fn draw_board(frame: &mut Frame, view: &View<'_>, glow: &Glow, area: Rect) -> Rect {
    let theme = view.theme;
    let stats = view.driver.stats();
    let title = if view.driver.chain() > 0 {
        format!(" SpaceCrush | Turn {} | Chain x{} ", stats.turns, view.driver.chain())
    } else {
        format!(" SpaceCrush | Turn {} ", stats.turns)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let (columns, rows) = (view.grid.columns(), view.grid.rows());
    let occupancy = view.grid.occupancy();
    let buf = frame.buffer_mut();
    for row in 0..rows {
        for column in 0..columns {
            let (x, y) = slot_origin(inner, rows, column, row);
            if x + CELL_WIDTH > inner.x + inner.width || y >= inner.y + inner.height {
                continue;
            }
            let under_cursor = view.cursor == (column, row);
            let bg = if under_cursor { theme.cursor_bg } else { theme.bg };
            let tile = occupancy[row * columns + column];
            let (glyph, style) = match tile.and_then(|id| view.grid.tile(id).map(|t| (id, t))) {
                Some((id, t)) if glow.is_lit(id) => (
                    kind_glyph(t.kind()),
                    Style::default()
                        .fg(theme.tile_color(t.kind()))
                        .bg(theme.glow)
                        .add_modifier(Modifier::BOLD),
                ),
                Some((_, t)) => (
                    kind_glyph(t.kind()),
                    Style::default().fg(theme.tile_color(t.kind())).bg(bg),
                ),
                None => ("·", Style::default().fg(theme.div_line).bg(bg)),
            };
            let (left, right) = if under_cursor { ("[", "]") } else { (" ", " ") };
            let edge = Style::default().fg(theme.title).bg(bg);
            buf.set_string(x, y, left, edge);
            buf.set_string(x + 1, y, glyph, style);
            buf.set_string(x + 2, y, right, edge);
        }
    }
    inner
}

/// Create or update the glow flash and process it (TachyonFX fade from the glow colour).
fn apply_glow_effect(
    frame: &mut Frame,
    view: &View<'_>,
    glow: &mut Glow,
    board_inner: Rect,
    now: Instant,
) {
    let delta = glow
        .process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    glow.process_time = Some(now);

    if glow.effect.is_none() {
        let rows = view.grid.rows();
        let cells: HashSet<(u16, u16)> = glow
            .lit
            .iter()
            .filter_map(|&id| view.grid.tile(id))
            .flat_map(|t| {
                let (x, y) = slot_origin(board_inner, rows, t.column(), t.row());
                (x..x + CELL_WIDTH).map(move |cx| (cx, y))
            })
            .collect();
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            cells.contains(&(pos.x, pos.y))
        }));
        let c = view.theme.glow;
        let effect = fx::fade_from(c, c, (GLOW_FADE_MS, Interpolation::SineOut))
            .with_filter(filter)
            .with_area(board_inner);
        glow.effect = Some(effect);
    }

    if let Some(effect) = glow.effect.as_mut() {
        frame.render_effect(effect, board_inner, tfx_delta);
    }
}

/// Bordered side panel section; returns the area inside the border.
fn section(frame: &mut Frame, outer: Rect, title: &str, border: Style, title_style: Style) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(format!(" {title} "), title_style));
    let inner = block.inner(outer);
    block.render(outer, frame.buffer_mut());
    inner
}

/// Share of the current wait still to run, for the turn gauge.
fn remaining_ratio(phase: TurnPhase, pop_matches_wait: Duration) -> f64 {
    let (remaining, total) = match phase {
        TurnPhase::Idle => return 0.0,
        TurnPhase::Settling { remaining, total } => (remaining, total),
        TurnPhase::Highlighting { remaining } => (remaining, pop_matches_wait),
    };
    if total.is_zero() {
        return 0.0;
    }
    (remaining.as_secs_f64() / total.as_secs_f64()).min(1.0)
}

/// Side panel height: stats, turn, cursor and help sections plus gaps.
const SIDEBAR_HEIGHT: u16 = 8 + 1 + 4 + 1 + 5 + 1 + 6;

fn draw_sidebar(frame: &mut Frame, view: &View<'_>, area: Rect) {
    let theme = view.theme;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);
    let stats = view.driver.stats();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // Stats
            Constraint::Length(1),
            Constraint::Length(4), // Turn phase + gauge
            Constraint::Length(1),
            Constraint::Length(5), // Cursor
            Constraint::Length(1),
            Constraint::Length(6), // Status + keys
        ])
        .split(area);

    let stat = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, title_style),
            Span::styled(value, fg_style),
        ])
    };

    // --- Stats ---
    let inner = section(frame, chunks[0], "Stats", border_style, title_style);
    let lines = vec![
        stat("Turns: ", stats.turns.to_string()),
        stat("Pops: ", stats.player_pops.to_string()),
        stat("Cascade pops: ", stats.cascade_pops.to_string()),
        stat("Best chain: ", stats.longest_chain.to_string()),
        stat("Resets: ", stats.resets.to_string()),
        stat("Tiles left: ", view.grid.active_count().to_string()),
    ];
    Paragraph::new(Text::from(lines)).render(inner, frame.buffer_mut());

    // --- Turn ---
    let inner = section(frame, chunks[2], "Turn", border_style, title_style);
    let phase = view.driver.phase();
    let ratio = remaining_ratio(phase, view.driver.config().pop_matches_wait);
    let (label, color) = match phase {
        TurnPhase::Idle => ("Your move".to_string(), Color::Green),
        TurnPhase::Settling { .. } => ("Falling...".to_string(), Color::Yellow),
        TurnPhase::Highlighting { .. } => (
            format!("{} matched!", view.driver.pending().len()),
            Color::Red,
        ),
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);
    Paragraph::new(Line::from(Span::styled(label, fg_style))).render(rows[0], frame.buffer_mut());
    Gauge::default()
        .ratio(ratio)
        .label("")
        .gauge_style(Style::default().fg(color))
        .render(rows[1], frame.buffer_mut());

    // --- Cursor ---
    let inner = section(frame, chunks[4], "Cursor", border_style, title_style);
    let (column, row) = view.cursor;
    let kind = view
        .grid
        .tile_at(column, row)
        .and_then(|id| view.grid.tile(id))
        .map_or("empty", |t| kind_name(t.kind()));
    let lines = vec![
        stat("Slot: ", format!("{column},{row}")),
        stat("Tile: ", kind.to_string()),
        stat("Seed: ", view.seed.to_string()),
    ];
    Paragraph::new(Text::from(lines)).render(inner, frame.buffer_mut());

    // --- Status + keys ---
    let inner = section(frame, chunks[6], "Keys", border_style, title_style);
    let lines = vec![
        Line::from(Span::styled(view.status.to_string(), title_style)),
        Line::from(Span::styled("←↓↑→/hjkl  move", fg_style)),
        Line::from(Span::styled("Space/Enter pop", fg_style)),
        Line::from(Span::styled("r reset   q quit", fg_style)),
    ];
    Paragraph::new(Text::from(lines)).render(inner, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_size_includes_border() {
        assert_eq!(board_size(10, 10), (32, 12));
        assert_eq!(board_size(3, 5), (11, 7));
    }

    #[test]
    fn test_slot_origin_puts_row_zero_at_bottom() {
        let inner = Rect::new(1, 1, 9, 3);
        assert_eq!(slot_origin(inner, 3, 0, 0), (1, 3));
        assert_eq!(slot_origin(inner, 3, 2, 2), (7, 1));
    }

    #[test]
    fn test_settle_gauge_uses_the_full_settle_time() {
        let wait = Duration::from_secs(1);
        let phase = TurnPhase::Settling {
            remaining: Duration::from_millis(500),
            total: Duration::from_secs(2),
        };
        assert!((remaining_ratio(phase, wait) - 0.25).abs() < 1e-9);
        let phase = TurnPhase::Settling {
            remaining: Duration::ZERO,
            total: Duration::ZERO,
        };
        assert_eq!(remaining_ratio(phase, wait), 0.0);
        let phase = TurnPhase::Highlighting {
            remaining: Duration::from_millis(250),
        };
        assert!((remaining_ratio(phase, wait) - 0.25).abs() < 1e-9);
        assert_eq!(remaining_ratio(TurnPhase::Idle, wait), 0.0);
    }

    #[test]
    fn test_glow_tracks_lit_tiles() {
        let mut glow = Glow::default();
        glow.set_emissive(TileId(4), true);
        assert!(glow.is_lit(TileId(4)));
        glow.set_emissive(TileId(4), false);
        assert!(!glow.is_lit(TileId(4)));
        glow.set_emissive(TileId(2), true);
        glow.clear();
        assert!(!glow.is_lit(TileId(2)));
    }
}
