//! SpaceCrush: pop a tile, let the column drop, chain the matches. In the terminal.

mod app;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use spacecrush::{DriverConfig, GridConfig};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Options derived from CLI that affect the board and turn timing.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub columns: usize,
    pub rows: usize,
    pub seed: u64,
    pub grid: GridConfig,
    pub driver: DriverConfig,
    pub no_animation: bool,
}

impl From<&Args> for GameConfig {
    fn from(args: &Args) -> Self {
        // Without animation nothing waits; a cascade advances one step per frame.
        let (move_speed, pop_matches_wait) = if args.no_animation {
            (0.0, Duration::ZERO)
        } else {
            (args.move_speed, Duration::from_millis(args.pop_wait_ms))
        };
        Self {
            columns: usize::from(args.columns),
            rows: usize::from(args.rows),
            seed: args.seed.unwrap_or_else(rand::random),
            grid: GridConfig {
                move_speed,
                ..GridConfig::default()
            },
            driver: DriverConfig {
                pop_matches_wait,
                idle_timeout: Duration::from_secs(args.idle_timeout_secs),
            },
            no_animation: args.no_animation,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig::from(&args);
    let mut app = App::new(config, theme)?;
    app.run()?;
    Ok(())
}

/// The terminal belongs to the board, so logs only go to `--log-file`.
fn init_logging(args: &Args) -> Result<()> {
    let Some(path) = args.log_file.as_deref() else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Match-3 tile popping in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "spacecrush",
    version,
    about = "Match-3 in the terminal. Pop a tile, the column drops, rows of three or more pop in a chain.",
    long_about = "SpaceCrush is a terminal match-3 puzzle.\n\n\
        Pick any tile to pop it. Everything above falls one slot. Any moved tile that now sits in \
        a horizontal run of three or more of its kind lights up and pops, which can drop more \
        tiles and keep the chain going.\n\n\
        CONTROLS (normal):\n  Arrows      Move cursor   Enter/Space Pop   R  Reset board   Q / Esc  Quit\n\n\
        CONTROLS (vim):\n  h/j/k/l     Move cursor   Space       Pop   r  Reset board   q        Quit\n\n\
        An untouched board stays put; a played board resets itself after --idle-timeout-secs of \
        inactivity. Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Board width in tiles.
    #[arg(long, default_value = "10", value_name = "COLS", value_parser = clap::value_parser!(u16).range(3..=100))]
    pub columns: u16,

    /// Board height in tiles.
    #[arg(long, default_value = "10", value_name = "ROWS", value_parser = clap::value_parser!(u16).range(3..=100))]
    pub rows: u16,

    /// Seed for the board layout. Random if not set; the seed in use is shown in the side panel.
    #[arg(short, long, value_name = "N")]
    pub seed: Option<u64>,

    /// Seconds a tile takes to fall one row.
    #[arg(long, default_value = "0.25", value_name = "SECS")]
    pub move_speed: f32,

    /// How long matched tiles glow before they pop.
    #[arg(long, default_value = "1000", value_name = "MS")]
    pub pop_wait_ms: u64,

    /// Inactivity after which a played board is reset.
    #[arg(long, default_value = "15", value_name = "SECS")]
    pub idle_timeout_secs: u64,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable falling and glow timing (cascades resolve one step per frame).
    #[arg(long)]
    pub no_animation: bool,

    /// Write logs to this file. Nothing is logged otherwise.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info", value_name = "FILTER")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
