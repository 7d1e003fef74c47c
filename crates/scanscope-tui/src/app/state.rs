use scanscope_logs::{
    CompiledFilter, ConnectionState, LogBuffer, SourceFilter, StreamUpdate, StreamView,
};
use scanscope_types::LogEvent;

use super::Action;
use crate::config::KeyContext;

/// Lines moved by page up/down
const PAGE_SIZE: usize = 20;

/// UI-specific transient state
pub struct UiState {
    /// Per-source visibility
    pub source_filter: SourceFilter,

    /// Is search/filter bar active?
    pub search_active: bool,

    /// Current search input text
    pub search_input: String,

    /// Currently active text filter (None = show all)
    pub active_filter: Option<CompiledFilter>,

    /// Filter input error message (e.g., invalid regex)
    pub filter_error: Option<String>,

    /// Case insensitive search?
    pub filter_case_insensitive: bool,

    /// Is help overlay visible?
    pub help_visible: bool,

    /// Scroll position in the visible lines
    pub log_scroll: usize,

    /// Follow mode: pin the viewport to the newest entry
    pub auto_scroll: bool,

    pub show_timestamps: bool,

    /// Show timestamps in local time (vs UTC)
    pub use_local_time: bool,

    /// One-line notice shown in the status bar (errors, export results)
    pub message: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            source_filter: SourceFilter::default(),
            search_active: false,
            search_input: String::new(),
            active_filter: None,
            filter_error: None,
            filter_case_insensitive: true,
            help_visible: false,
            log_scroll: 0,
            auto_scroll: true,
            show_timestamps: true,
            use_local_time: true,
            message: None,
        }
    }
}

/// State of the `watch` console
pub struct AppState {
    /// Stream endpoint being followed
    pub relay_url: String,

    /// Buffer and connectivity, fed by the stream client
    pub stream: StreamView,

    pub ui_state: UiState,

    /// Whether app should quit
    pub should_quit: bool,

    /// Dirty flag for rendering - only render when true
    pub render_dirty: bool,
}

impl AppState {
    pub fn new(relay_url: impl Into<String>, buffer: LogBuffer) -> Self {
        Self {
            relay_url: relay_url.into(),
            stream: StreamView::new(buffer),
            ui_state: UiState::default(),
            should_quit: false,
            render_dirty: true,
        }
    }

    pub fn buffer(&self) -> &LogBuffer {
        self.stream.buffer()
    }

    pub fn connection(&self) -> ConnectionState {
        self.stream.state()
    }

    /// Apply an update from the stream client
    pub fn apply_update(&mut self, update: StreamUpdate) {
        self.stream.apply(update);
        self.render_dirty = true;
    }

    /// Which keybinding table applies right now
    pub fn key_context(&self) -> KeyContext {
        if self.ui_state.search_active {
            KeyContext::FilterInput
        } else {
            KeyContext::LogViewer
        }
    }

    /// Whether an event passes both the source toggles and the text filter
    pub fn is_visible(&self, event: &LogEvent) -> bool {
        self.ui_state.source_filter.matches(event)
            && self
                .ui_state
                .active_filter
                .as_ref()
                .is_none_or(|f| f.matches(event))
    }

    /// Buffered events that pass the current filters, oldest first
    pub fn visible_entries(&self) -> Vec<LogEvent> {
        self.buffer().filtered(|e| self.is_visible(e))
    }

    /// Visible entries as plain text lines for export
    pub fn export_lines(&self) -> Vec<String> {
        self.visible_entries()
            .iter()
            .map(|e| {
                format!(
                    "{} [{}] {}",
                    e.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                    e.source,
                    e.message
                )
            })
            .collect()
    }

    /// Apply a user action. `ExportLogs` needs the filesystem and is left
    /// to the caller.
    pub fn handle(&mut self, action: Action) {
        self.render_dirty = true;
        let ui = &mut self.ui_state;

        match action {
            Action::Quit => self.should_quit = true,
            Action::ToggleHelp => ui.help_visible = !ui.help_visible,

            Action::ToggleDocker => ui.source_filter.toggle_docker(),
            Action::ToggleScan => ui.source_filter.toggle_scan(),

            Action::OpenSearch => self.start_search(),
            Action::CloseSearch => self.cancel_search(),
            Action::SearchInput(c) => ui.search_input.push(c),
            Action::SearchBackspace => {
                ui.search_input.pop();
            }
            Action::SearchClear => ui.search_input.clear(),
            Action::ApplyFilter => self.apply_filter(),
            Action::ClearFilter => self.clear_filter(),
            Action::ToggleCaseSensitive => {
                ui.filter_case_insensitive = !ui.filter_case_insensitive;
                // Recompile the active filter with the new setting
                if let Some(filter) = &ui.active_filter {
                    ui.search_input = filter.pattern().to_string();
                    self.apply_filter();
                }
            }

            Action::ScrollUp(n) => {
                ui.auto_scroll = false;
                ui.log_scroll = ui.log_scroll.saturating_sub(n);
            }
            Action::ScrollDown(n) => {
                ui.auto_scroll = false;
                // Clamped to the filtered count at render time
                ui.log_scroll = ui.log_scroll.saturating_add(n);
            }
            Action::PageUp => {
                ui.auto_scroll = false;
                ui.log_scroll = ui.log_scroll.saturating_sub(PAGE_SIZE);
            }
            Action::PageDown => {
                ui.auto_scroll = false;
                ui.log_scroll = ui.log_scroll.saturating_add(PAGE_SIZE);
            }
            Action::ScrollToTop => {
                ui.auto_scroll = false;
                ui.log_scroll = 0;
            }
            Action::ScrollToBottom => {
                ui.auto_scroll = false;
                ui.log_scroll = usize::MAX;
            }
            Action::ToggleAutoScroll => ui.auto_scroll = !ui.auto_scroll,

            Action::ToggleTimestamps => ui.show_timestamps = !ui.show_timestamps,
            Action::ToggleLocalTime => ui.use_local_time = !ui.use_local_time,

            Action::ClearLogs => {
                self.stream.buffer().clear();
                ui.log_scroll = 0;
            }
            Action::ExportLogs => {}

            Action::DismissMessage => ui.message = None,
            Action::Render => {}
        }
    }

    pub fn show_message(&mut self, msg: impl Into<String>) {
        self.ui_state.message = Some(msg.into());
        self.render_dirty = true;
    }

    /// Start search/filter input mode
    pub fn start_search(&mut self) {
        self.ui_state.search_active = true;
        self.ui_state.search_input.clear();
        self.ui_state.filter_error = None;
    }

    /// Cancel search/filter input and clear filter
    pub fn cancel_search(&mut self) {
        self.ui_state.search_active = false;
        self.ui_state.search_input.clear();
        self.ui_state.active_filter = None;
        self.ui_state.filter_error = None;
    }

    /// Apply the current search input as a filter
    pub fn apply_filter(&mut self) {
        let ui = &mut self.ui_state;
        ui.search_active = false;
        ui.filter_error = None;

        if ui.search_input.is_empty() {
            ui.active_filter = None;
            return;
        }

        let result = if ui.filter_case_insensitive {
            CompiledFilter::new_case_insensitive(&ui.search_input)
        } else {
            CompiledFilter::new(&ui.search_input)
        };

        match result {
            Ok(filter) => ui.active_filter = Some(filter),
            Err(e) => {
                ui.filter_error = Some(format!("Invalid regex: {}", e));
                ui.search_active = true; // Keep input open to fix
            }
        }
    }

    /// Clear the active filter
    pub fn clear_filter(&mut self) {
        self.ui_state.active_filter = None;
        self.ui_state.search_input.clear();
        self.ui_state.filter_error = None;
    }
}
