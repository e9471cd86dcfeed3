//! Pip-Boy phosphor palette.

use ratatui::style::{Color, Modifier, Style};

// ── Color palette ─────────────────────────────────────────────────────────────

pub const C_BG: Color = Color::Rgb(8, 14, 8);
pub const C_PRIMARY: Color = Color::Rgb(26, 255, 128);
pub const C_SECONDARY: Color = Color::Rgb(18, 170, 86);
pub const C_MUTED: Color = Color::Rgb(10, 90, 46);
pub const C_SELECTION_BG: Color = Color::Rgb(20, 60, 34);
pub const C_PANEL_BORDER: Color = Color::Rgb(14, 110, 58);
pub const C_AXIS: Color = Color::Rgb(12, 70, 38);

// ── Predefined styles ─────────────────────────────────────────────────────────

pub fn style_default() -> Style {
    Style::default().fg(C_PRIMARY)
}

pub fn style_secondary() -> Style {
    Style::default().fg(C_SECONDARY)
}

pub fn style_muted() -> Style {
    Style::default().fg(C_MUTED)
}

pub fn style_selected() -> Style {
    Style::default()
        .bg(C_SELECTION_BG)
        .fg(C_PRIMARY)
        .add_modifier(Modifier::BOLD)
}

pub fn style_border() -> Style {
    Style::default().fg(C_PANEL_BORDER)
}

pub fn style_tab_active() -> Style {
    Style::default()
        .fg(C_BG)
        .bg(C_PRIMARY)
        .add_modifier(Modifier::BOLD)
}
