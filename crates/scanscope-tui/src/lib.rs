//! TUI components for scanscope
//!
//! This crate renders the log stream client: view state, keybindings,
//! terminal event handling and the log viewer screen.

pub mod app;
pub mod config;
pub mod tui;
pub mod ui;

pub use app::{Action, AppState, UiState};
pub use config::{KeyBinding, KeyBindings, KeyContext};
pub use tui::{Event, EventHandler, Tui};
pub use ui::components::{HelpOverlay, StatusBar};
pub use ui::screens::LogViewerScreen;
pub use ui::Theme;
