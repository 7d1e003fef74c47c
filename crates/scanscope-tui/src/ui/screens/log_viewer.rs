use chrono::Local;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use tokio::time::Instant;

use scanscope_logs::ConnectionState;
use scanscope_types::{LogEvent, LogSource};

use crate::app::AppState;
use crate::ui::Theme;
use crate::ui::components::StatusBar;

/// The single screen of the console
pub struct LogViewerScreen;

/// Truncate to at most `max_bytes`, backing off to a char boundary
fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut pos = max_bytes;
    while pos > 0 && !s.is_char_boundary(pos) {
        pos -= 1;
    }
    &s[..pos]
}

impl LogViewerScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState) {
        let show_filter_bar = state.ui_state.search_active
            || state.ui_state.active_filter.is_some()
            || state.ui_state.filter_error.is_some();

        let mut constraints = vec![Constraint::Length(3)];
        if show_filter_bar {
            constraints.push(Constraint::Length(3));
        }
        constraints.push(Constraint::Min(1));
        constraints.push(Constraint::Length(1));

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(frame.area());

        let mut idx = 0;
        Self::render_header(frame, chunks[idx], state);
        idx += 1;

        if show_filter_bar {
            Self::render_filter_bar(frame, chunks[idx], state);
            idx += 1;
        }

        Self::render_logs(frame, chunks[idx], state);
        idx += 1;

        Self::render_status_bar(frame, chunks[idx], state);
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
        let connection = state.connection();
        let filter = state.ui_state.source_filter;

        let title = Line::from(vec![
            Span::styled("scanscope", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled("● ", Style::default().fg(Theme::connection(&connection))),
            Span::styled(connection_text(&connection), Theme::text()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled("[d] Docker", Theme::toggle(LogSource::MobsfDocker.color(), filter.show_docker)),
            Span::styled("  ", Theme::text()),
            Span::styled("[s] Scan", Theme::toggle(LogSource::ScanScript.color(), filter.show_scan)),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(state.relay_url.as_str(), Theme::text_dim()),
        ]);

        let header = Paragraph::new(title).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }

    fn render_filter_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let ui = &state.ui_state;
        let mut spans = vec![];

        if ui.search_active {
            spans.push(Span::styled(
                " /",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::styled(" Filter: ", Theme::text_dim()));
        }

        let pattern = if ui.search_active {
            ui.search_input.as_str()
        } else if let Some(filter) = &ui.active_filter {
            filter.pattern()
        } else {
            ""
        };
        spans.push(Span::styled(pattern.to_string(), Theme::text_highlight()));

        if ui.search_active {
            spans.push(Span::styled(
                "█",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::SLOW_BLINK),
            ));
        }

        if let Some(err) = &ui.filter_error {
            spans.push(Span::styled(format!("  ⚠ {}", err), Style::default().fg(Color::Red)));
        }

        let case_text = if ui.filter_case_insensitive {
            "  [i] case-insensitive"
        } else {
            "  [i] case-sensitive"
        };
        spans.push(Span::styled(case_text, Theme::text_dim()));

        if ui.search_active {
            spans.push(Span::styled("  [Enter] Apply  [Esc] Cancel", Theme::text_dim()));
        } else {
            spans.push(Span::styled("  [n] Clear  [/] Edit", Theme::text_dim()));
        }

        let border_style = if ui.search_active {
            Style::default().fg(Color::Yellow)
        } else if ui.filter_error.is_some() {
            Style::default().fg(Color::Red)
        } else {
            Theme::border()
        };

        let filter_bar = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(Span::styled(" Search/Filter ", Theme::title())),
        );

        frame.render_widget(filter_bar, area);
    }

    fn render_logs(frame: &mut Frame, area: Rect, state: &mut AppState) {
        let entries = state.visible_entries();
        let total = entries.len();
        let inner_height = area.height.saturating_sub(2) as usize;

        let max_scroll = total.saturating_sub(inner_height);
        if state.ui_state.auto_scroll {
            state.ui_state.log_scroll = max_scroll;
        }
        if state.ui_state.log_scroll > max_scroll {
            state.ui_state.log_scroll = max_scroll;
        }

        // 2 for borders, 2 for scrollbar
        let inner_width = area.width.saturating_sub(4) as usize;

        let lines: Vec<Line> = entries
            .iter()
            .skip(state.ui_state.log_scroll)
            .take(inner_height)
            .map(|entry| Self::format_line(entry, state, inner_width))
            .collect();

        let buffered = state.buffer().len();
        let title = if total == buffered {
            format!(" Logs ({}) ", total)
        } else {
            format!(" Logs ({} of {}) ", total, buffered)
        };

        let logs_widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(title, Theme::title())),
        );
        frame.render_widget(logs_widget, area);

        if total > inner_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state = ScrollbarState::default()
                .content_length(max_scroll)
                .position(state.ui_state.log_scroll);

            frame.render_stateful_widget(
                scrollbar,
                area.inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }

    fn format_line(entry: &LogEvent, state: &AppState, available_width: usize) -> Line<'static> {
        let ui = &state.ui_state;
        let mut spans = Vec::new();
        let mut prefix_width = 0;

        // " HH:MM:SS" = 9 chars
        if ui.show_timestamps {
            let time = if ui.use_local_time {
                entry.timestamp.with_timezone(&Local).format("%H:%M:%S").to_string()
            } else {
                entry.timestamp.format("%H:%M:%S").to_string()
            };
            spans.push(Span::styled(format!("{} ", time), Theme::text_dim()));
            prefix_width += 9;
        }

        // Widest tag is "mobsf-docker"
        spans.push(Span::styled(
            format!("{:>12}", entry.source.as_str()),
            Style::default()
                .fg(entry.source.color())
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(" │ ", Theme::text_dim()));
        prefix_width += 15;

        let message_width = available_width.saturating_sub(prefix_width);
        let message = if entry.message.len() > message_width {
            format!(
                "{}...",
                safe_truncate(&entry.message, message_width.saturating_sub(3))
            )
        } else {
            entry.message.clone()
        };

        let base_style = match entry.source {
            LogSource::System => Style::default().fg(entry.source.color()),
            _ => Theme::text(),
        };

        match &ui.active_filter {
            Some(filter) => {
                let mut last_end = 0;
                for (start, end) in filter.find_matches(&message) {
                    if start > last_end {
                        spans.push(Span::styled(message[last_end..start].to_string(), base_style));
                    }
                    spans.push(Span::styled(
                        message[start..end].to_string(),
                        Theme::match_highlight(),
                    ));
                    last_end = end;
                }
                if last_end < message.len() {
                    spans.push(Span::styled(message[last_end..].to_string(), base_style));
                }
            }
            None => spans.push(Span::styled(message, base_style)),
        }

        Line::from(spans)
    }

    fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let counts = state.buffer().source_counts();
        let right = format!(
            "D:{} S:{} | {}/{} {}",
            counts.docker,
            counts.scan,
            state.buffer().len(),
            state.buffer().capacity(),
            if state.ui_state.auto_scroll { "▼" } else { " " }
        );

        let mut bar = StatusBar::new()
            .hints([
                ("d/s", "Sources"),
                ("/", "Filter"),
                ("f", "Follow"),
                ("e", "Export"),
                ("?", "Help"),
                ("q", "Quit"),
            ])
            .right(right);

        if let Some(msg) = &state.ui_state.message {
            bar = bar.notice(format!("{}  [Esc]", msg), Theme::status_bar_key());
        }

        frame.render_widget(bar, area);
    }
}

fn connection_text(state: &ConnectionState) -> String {
    match state {
        ConnectionState::RetryScheduled { attempt, retry_at } => {
            let secs = retry_at
                .saturating_duration_since(Instant::now())
                .as_secs_f32()
                .ceil();
            format!("reconnecting in {}s (attempt {})", secs, attempt + 1)
        }
        ConnectionState::Connecting { attempt } if *attempt > 1 => {
            format!("connecting (attempt {})", attempt)
        }
        other => other.label().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use ratatui::{Terminal, backend::TestBackend, buffer::Buffer};

    use scanscope_logs::{LogBuffer, StreamUpdate};

    use super::*;
    use crate::app::Action;

    fn screen_text(buf: &Buffer) -> Vec<String> {
        (0..buf.area.height)
            .map(|y| {
                (0..buf.area.width)
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect()
            })
            .collect()
    }

    fn draw(state: &mut AppState, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|frame| LogViewerScreen::render(frame, state))
            .unwrap();
        screen_text(terminal.backend().buffer())
    }

    fn state() -> AppState {
        let mut state = AppState::new("http://localhost:3000/api/logs/stream", LogBuffer::new(100));
        state.ui_state.show_timestamps = false;
        state.apply_update(StreamUpdate::State(ConnectionState::Connected));
        state.apply_update(StreamUpdate::Event(LogEvent::connected()));
        state.apply_update(StreamUpdate::Event(LogEvent::new(
            LogSource::MobsfDocker,
            "build started",
        )));
        state.apply_update(StreamUpdate::Event(LogEvent::new(
            LogSource::ScanScript,
            "scanning app.ipa",
        )));
        state
    }

    #[test]
    fn test_renders_header_and_tagged_lines() {
        let mut state = state();
        let screen = draw(&mut state, 100, 12).join("\n");

        assert!(screen.contains("● connected"));
        assert!(screen.contains("Logs (3)"));
        assert!(screen.contains("mobsf-docker │ build started"));
        assert!(screen.contains(" scan-script │ scanning app.ipa"));
    }

    #[test]
    fn test_hidden_source_not_rendered() {
        let mut state = state();
        state.handle(Action::ToggleDocker);
        let screen = draw(&mut state, 100, 12).join("\n");

        assert!(!screen.contains("build started"));
        assert!(screen.contains("Logs (2 of 3)"));
    }

    #[test]
    fn test_follow_pins_to_newest() {
        let mut state = AppState::new("relay", LogBuffer::new(100));
        state.ui_state.show_timestamps = false;
        for i in 0..50 {
            state.apply_update(StreamUpdate::Event(LogEvent::new(
                LogSource::ScanScript,
                format!("line {i}"),
            )));
        }

        // 10 rows: 3 header, 1 status, 2 borders leaves 4 log lines
        let screen = draw(&mut state, 80, 10).join("\n");
        assert!(screen.contains("line 49"));
        assert!(!screen.contains("line 45"));
        assert_eq!(state.ui_state.log_scroll, 46);

        state.handle(Action::ScrollToTop);
        let screen = draw(&mut state, 80, 10).join("\n");
        assert!(screen.contains("line 0"));
        assert!(!screen.contains("line 49"));

        // New lines do not move a manually scrolled view
        state.apply_update(StreamUpdate::Event(LogEvent::new(LogSource::ScanScript, "line 50")));
        draw(&mut state, 80, 10);
        assert_eq!(state.ui_state.log_scroll, 0);
    }

    #[test]
    fn test_retry_countdown_in_header() {
        let mut state = state();
        state.apply_update(StreamUpdate::State(ConnectionState::RetryScheduled {
            attempt: 2,
            retry_at: Instant::now() + std::time::Duration::from_secs(5),
        }));
        let screen = draw(&mut state, 120, 12).join("\n");
        assert!(screen.contains("reconnecting in 5s (attempt 3)"));
    }

    #[test]
    fn test_safe_truncate_respects_char_boundary() {
        assert_eq!(safe_truncate("héllo", 2), "h");
        assert_eq!(safe_truncate("abc", 10), "abc");
    }
}
