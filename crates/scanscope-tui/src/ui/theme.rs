use ratatui::style::{Color, Modifier, Style};

use scanscope_logs::ConnectionState;

/// Color theme for the console
pub struct Theme;

impl Theme {
    // Base colors
    pub const BG: Color = Color::Reset;
    pub const FG: Color = Color::White;
    pub const FG_DIM: Color = Color::DarkGray;

    // Accent colors
    pub const PRIMARY: Color = Color::Cyan;
    pub const HIGHLIGHT: Color = Color::Yellow;

    // Status colors
    pub const SUCCESS: Color = Color::Green;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;

    pub fn border() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text() -> Style {
        Style::default().fg(Self::FG)
    }

    pub fn text_dim() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    pub fn text_highlight() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    /// Search match inside a log line
    pub fn match_highlight() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Self::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    /// Source toggle label, dimmed when the source is hidden
    pub fn toggle(color: Color, on: bool) -> Style {
        if on {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(Self::FG_DIM)
                .add_modifier(Modifier::CROSSED_OUT)
        }
    }

    /// Color of the connectivity dot
    pub fn connection(state: &ConnectionState) -> Color {
        match state {
            ConnectionState::Connected => Self::SUCCESS,
            ConnectionState::Connecting { .. } => Self::WARNING,
            ConnectionState::Disconnected | ConnectionState::RetryScheduled { .. } => Self::ERROR,
        }
    }

    // Status bar
    pub fn status_bar() -> Style {
        Style::default().fg(Self::FG).bg(Color::DarkGray)
    }

    pub fn status_bar_key() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }

    pub fn error() -> Style {
        Style::default()
            .fg(Self::ERROR)
            .add_modifier(Modifier::BOLD)
    }
}
