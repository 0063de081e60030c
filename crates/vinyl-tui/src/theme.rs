//! Colors and styles for the player surface.
//!
//! Foreground colors are fixed; the background follows the palette of the
//! current track's artwork.

use ratatui::style::{Color, Modifier, Style};
use vinyl_proto::track::ThemeColors;

use crate::palette::Rgb;

// ── Color palette ─────────────────────────────────────────────────────────────

pub const C_BG: Color = Color::Rgb(18, 18, 18);
pub const C_PLAYING: Color = Color::Rgb(80, 200, 120);
pub const C_LOADING: Color = Color::Rgb(255, 184, 80);
pub const C_ERROR: Color = Color::Rgb(255, 80, 80);
pub const C_MUTED: Color = Color::Rgb(72, 72, 88);
pub const C_SECONDARY: Color = Color::Rgb(115, 115, 138);
pub const C_PRIMARY: Color = Color::Rgb(210, 210, 225);
pub const C_SELECTION_BG: Color = Color::Rgb(28, 28, 40);
pub const C_PANEL_BORDER: Color = Color::Rgb(40, 40, 52);
pub const C_PANEL_BORDER_FOCUSED: Color = Color::Rgb(120, 100, 200);
pub const C_INPUT_BG: Color = Color::Rgb(20, 20, 32);
pub const C_INPUT_FG: Color = Color::Rgb(255, 200, 80);
pub const C_LIKED: Color = Color::Rgb(255, 105, 140);
pub const C_DISC: Color = Color::Rgb(30, 30, 34);
pub const C_DISC_GROOVE: Color = Color::Rgb(58, 58, 66);
pub const C_TOAST_INFO: Color = Color::Rgb(80, 160, 220);
pub const C_TOAST_SUCCESS: Color = Color::Rgb(80, 200, 120);
pub const C_TOAST_WARNING: Color = Color::Rgb(255, 184, 80);
pub const C_TOAST_ERROR: Color = Color::Rgb(255, 95, 95);

/// Parse a `#rrggbb` theme role, falling back to `C_BG`.
pub fn tint(hex: &str) -> Color {
    match Rgb::from_hex(hex) {
        Some(Rgb(r, g, b)) => Color::Rgb(r, g, b),
        None => C_BG,
    }
}

/// The three background roles of a theme, in (primary, secondary, accent)
/// order.
pub fn backgrounds(theme: &ThemeColors) -> (Color, Color, Color) {
    (tint(&theme.primary), tint(&theme.secondary), tint(&theme.accent))
}

// ── Predefined styles ─────────────────────────────────────────────────────────

pub fn style_secondary() -> Style {
    Style::default().fg(C_SECONDARY)
}

pub fn style_selected() -> Style {
    Style::default()
        .bg(C_SELECTION_BG)
        .fg(C_PRIMARY)
        .add_modifier(Modifier::BOLD)
}

pub fn style_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(C_PANEL_BORDER_FOCUSED)
    } else {
        Style::default().fg(C_PANEL_BORDER)
    }
}

pub fn style_muted() -> Style {
    Style::default().fg(C_MUTED)
}
