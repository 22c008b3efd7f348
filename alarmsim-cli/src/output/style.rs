//! Terminal colouring

use alarmsim_core::{StreakIndicator, StreakLevel};
use crossterm::style::{Color, Stylize};

/// Glyph for one consecutive hit
pub const STREAK_BLOCK: &str = "◼";

/// Appended when the streak outgrew the required length
pub const STREAK_OVERFLOW: &str = "+";

/// Chooses colours, or none at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    /// Colour when requested and `NO_COLOR` is not set
    pub fn detect(requested: bool) -> Self {
        Self { enabled: requested && std::env::var_os("NO_COLOR").is_none() }
    }

    pub fn plain() -> Self {
        Self { enabled: false }
    }

    pub fn colored() -> Self {
        Self { enabled: true }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.enabled {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    /// Summary numbers
    pub fn emphasis(&self, text: &str) -> String {
        self.paint(text, Color::White)
    }

    /// Yellow while a streak builds, red once it breaches
    pub fn streak(&self, text: &str, level: StreakLevel) -> String {
        match level {
            StreakLevel::Building => self.paint(text, Color::Yellow),
            StreakLevel::Breaching => self.paint(text, Color::Red),
        }
    }
}

/// `◼◼◼+` for a streak of four or more against a rule of three
pub fn streak_glyphs(indicator: &StreakIndicator) -> String {
    let mut glyphs = STREAK_BLOCK.repeat(indicator.filled);
    if indicator.overflow {
        glyphs.push_str(STREAK_OVERFLOW);
    }
    glyphs
}
