//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use spacecrush::TileKind;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Tile colours by kind: cube, sphere, cylinder, capsule.
    pub tiles: [Color; 4],
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (stats, status line).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Lit (matched) tiles.
    pub glow: Color,
    /// Cursor cell background.
    pub cursor_bg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    /// Hardcoded One Dark defaults.
    pub fn onedark_default() -> Self {
        Self {
            tiles: [
                Color::Rgb(0x98, 0xC3, 0x79), // green
                Color::Rgb(0xE5, 0xC0, 0x7B), // yellow
                Color::Rgb(0xE0, 0x6C, 0x75), // red
                Color::Rgb(0x61, 0xAF, 0xEF), // blue
            ],
            bg: Color::Rgb(0x31, 0x35, 0x3F),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            glow: Color::Rgb(0xFF, 0xFF, 0xFF),
            cursor_bg: Color::Rgb(0x5C, 0x63, 0x70),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file is missing.
    /// `palette` selects the tile colour variant.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override tile colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.tiles = [
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0x00, 0x00),
                    Color::Rgb(0x00, 0x88, 0xFF),
                ];
            }
            crate::Palette::Colorblind => {
                // Blue/orange/teal/magenta stay apart under the common deficiencies.
                self.tiles = [
                    Color::Rgb(0x00, 0x77, 0xBB),
                    Color::Rgb(0xEE, 0x77, 0x33),
                    Color::Rgb(0x00, 0x99, 0x88),
                    Color::Rgb(0xEE, 0x33, 0x77),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        let fallback = Self::onedark_default();
        Self {
            tiles: [
                get("mem_box")
                    .or_else(|| get("cpu_start"))
                    .unwrap_or(fallback.tiles[0]),
                get("cpu_mid").unwrap_or(fallback.tiles[1]),
                get("cpu_end")
                    .or_else(|| get("temp_end"))
                    .unwrap_or(fallback.tiles[2]),
                get("cpu_box").unwrap_or(fallback.tiles[3]),
            ],
            bg: get("meter_bg").unwrap_or(fallback.bg),
            div_line: get("div_line").unwrap_or(fallback.div_line),
            main_fg: get("main_fg").unwrap_or(fallback.main_fg),
            title: get("title").unwrap_or(fallback.title),
            glow: get("selected_fg").unwrap_or(fallback.glow),
            cursor_bg: get("selected_bg").unwrap_or(fallback.cursor_bg),
        }
    }

    #[inline]
    pub fn tile_color(&self, kind: TileKind) -> Color {
        self.tiles
            .get(kind.color_index() as usize)
            .copied()
            .unwrap_or(self.main_fg)
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>, scale: u8| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .map(|v| v * scale)
            .ok_or_else(|| ThemeError::InvalidHex(s.to_string()))
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2, 1)?, channel(2..4, 1)?, channel(4..6, 1)?),
        3 => (channel(0..1, 17)?, channel(1..2, 17)?, channel(2..3, 17)?),
        _ => return Err(ThemeError::InvalidHex(s.to_string())),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GG0000").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_theme_from_map_overrides_tiles() {
        let map = parse_theme_file("theme[cpu_box]=\"#010203\"\ntheme[title]='#FFF'");
        let theme = Theme::from_map(&map);
        assert_eq!(theme.tile_color(TileKind::Capsule), Color::Rgb(1, 2, 3));
        assert_eq!(theme.title, Color::Rgb(255, 255, 255));
        assert_eq!(theme.tile_color(TileKind::Cube), Theme::default().tiles[0]);
    }
}
