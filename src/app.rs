//! App: terminal init, main loop, driver clock and key handling.

use crate::GameConfig;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, Glow, View};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::DefaultTerminal;
use spacecrush::{DriverEvent, Grid, Selection, TurnDriver};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Render and input poll interval (~60 FPS).
const FRAME: Duration = Duration::from_millis(16);

pub struct App {
    config: GameConfig,
    theme: Theme,
    grid: Grid,
    driver: TurnDriver,
    /// (column, row); row 0 is the bottom of the board.
    cursor: (usize, usize),
    glow: Glow,
    status: String,
    last_tick: Instant,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let grid = Grid::populate(config.columns, config.rows, config.grid, &mut rng)?;
        info!(
            seed = config.seed,
            columns = config.columns,
            rows = config.rows,
            "new board"
        );
        Ok(Self {
            driver: TurnDriver::new(config.driver),
            cursor: (config.columns / 2, 0),
            config,
            theme,
            grid,
            glow: Glow::default(),
            status: "Pick a tile".to_string(),
            last_tick: Instant::now(),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.last_tick = Instant::now();
        loop {
            let now = Instant::now();
            let dt = now.saturating_duration_since(self.last_tick);
            self.last_tick = now;
            self.tick(dt);

            terminal.draw(|f| {
                let view = View {
                    grid: &self.grid,
                    driver: &self.driver,
                    theme: &self.theme,
                    cursor: self.cursor,
                    seed: self.config.seed,
                    status: &self.status,
                    no_animation: self.config.no_animation,
                };
                ui::draw(f, &view, &mut self.glow, now);
            })?;

            let timeout = FRAME.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        let action = key_to_action(key);
                        if action == Action::Quit {
                            return Ok(());
                        }
                        self.apply_action(action);
                    }
                }
            }
        }
    }

    /// Advance the driver clock by `dt` and report what happened.
    fn tick(&mut self, dt: Duration) {
        match self.driver.advance(&mut self.grid, dt, &mut self.glow) {
            Ok(DriverEvent::None) => {}
            Ok(DriverEvent::MatchesLit { count }) => {
                self.status = format!("{count} in a row!");
            }
            Ok(DriverEvent::MatchesPopped { chain, .. }) => {
                self.status = format!("Chain x{chain}");
            }
            Ok(DriverEvent::TurnFinished { chain }) => {
                self.status = if chain > 0 {
                    format!("Turn over, chain x{chain}")
                } else {
                    "Pick a tile".to_string()
                };
            }
            Ok(DriverEvent::IdleReset) => {
                self.glow.clear();
                self.status = "Board reset (idle)".to_string();
            }
            Err(err) => {
                warn!(error = %err, "cascade aborted");
                self.glow.clear();
                self.status = "Cascade aborted".to_string();
            }
        }
    }

    fn apply_action(&mut self, action: Action) {
        if action != Action::None {
            self.driver.note_activity();
        }
        let (columns, rows) = (self.grid.columns(), self.grid.rows());
        let (column, row) = self.cursor;
        match action {
            Action::MoveLeft => self.cursor.0 = column.saturating_sub(1),
            Action::MoveRight => self.cursor.0 = (column + 1).min(columns - 1),
            Action::MoveUp => self.cursor.1 = (row + 1).min(rows - 1),
            Action::MoveDown => self.cursor.1 = row.saturating_sub(1),
            Action::Pop => self.pop_at_cursor(),
            Action::Reset => {
                if self.driver.reset(&mut self.grid) {
                    self.glow.clear();
                    self.status = "Board reset".to_string();
                } else {
                    self.status = "Wait for the board to settle".to_string();
                }
            }
            Action::Quit | Action::None => {}
        }
    }

    fn pop_at_cursor(&mut self) {
        let (column, row) = self.cursor;
        let Some(tile) = self.grid.tile_at(column, row) else {
            self.status = "Nothing to pop here".to_string();
            return;
        };
        match self.driver.select(&mut self.grid, tile) {
            Ok(Selection::Started { matched }) => {
                self.status = if matched > 0 {
                    format!("Popped, {matched} lining up")
                } else {
                    "Popped".to_string()
                };
            }
            Ok(Selection::Busy) => self.status = "Wait for the board to settle".to_string(),
            Ok(Selection::AlreadyPopped) => self.status = "Already popped".to_string(),
            Err(err) => {
                warn!(error = %err, tile = %tile, "pop rejected");
                self.status = "Pop rejected".to_string();
            }
        }
    }
}
