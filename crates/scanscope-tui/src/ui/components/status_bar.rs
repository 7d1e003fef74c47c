use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Widget,
};

use crate::ui::Theme;

/// One-line bar with key hints on the left and a summary on the right
pub struct StatusBar<'a> {
    hints: Vec<(&'a str, &'a str)>,
    right_text: Option<String>,
    notice: Option<(String, Style)>,
}

impl<'a> StatusBar<'a> {
    pub fn new() -> Self {
        Self {
            hints: Vec::new(),
            right_text: None,
            notice: None,
        }
    }

    /// Add keyboard hints as (key, description) pairs
    pub fn hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.hints = hints.into_iter().collect();
        self
    }

    /// Set text to display on the right side
    pub fn right<S: Into<String>>(mut self, text: S) -> Self {
        self.right_text = Some(text.into());
        self
    }

    /// Show a message in place of the hints
    pub fn notice<S: Into<String>>(mut self, text: S, style: Style) -> Self {
        self.notice = Some((text.into(), style));
        self
    }
}

impl Default for StatusBar<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, Theme::status_bar());

        let line = match self.notice {
            Some((text, style)) => Line::from(Span::styled(text, style)),
            None => {
                let mut spans = Vec::new();
                for (i, (key, desc)) in self.hints.iter().enumerate() {
                    if i > 0 {
                        spans.push(Span::styled(" ", Theme::status_bar()));
                    }
                    spans.push(Span::styled(format!("[{}]", key), Theme::status_bar_key()));
                    spans.push(Span::styled(desc.to_string(), Theme::status_bar()));
                }
                Line::from(spans)
            }
        };
        let line_width = line.width() as u16;

        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));

        // Right text only when it does not collide with the left side
        if let Some(right) = self.right_text {
            let right_width = Line::from(right.as_str()).width() as u16;
            let right_x = area.x + area.width.saturating_sub(right_width + 1);
            if right_x > area.x + line_width + 2 {
                buf.set_span(
                    right_x,
                    area.y,
                    &Span::styled(right.as_str(), Theme::status_bar()),
                    right_width,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_hints_and_right_text() {
        let area = Rect::new(0, 0, 60, 1);
        let mut buf = Buffer::empty(area);
        StatusBar::new()
            .hints([("q", "Quit"), ("?", "Help")])
            .right("42 lines")
            .render(area, &mut buf);

        let text = row(&buf, 0);
        assert!(text.starts_with(" [q]Quit [?]Help"));
        assert!(text.trim_end().ends_with("42 lines"));
    }

    #[test]
    fn test_right_text_dropped_when_too_narrow() {
        let area = Rect::new(0, 0, 20, 1);
        let mut buf = Buffer::empty(area);
        StatusBar::new()
            .hints([("q", "Quit"), ("?", "Help")])
            .right("a long summary")
            .render(area, &mut buf);

        assert!(!row(&buf, 0).contains("summary"));
    }

    #[test]
    fn test_notice_replaces_hints() {
        let area = Rect::new(0, 0, 40, 1);
        let mut buf = Buffer::empty(area);
        StatusBar::new()
            .hints([("q", "Quit")])
            .notice("Exported 3 lines", Theme::text())
            .render(area, &mut buf);

        let text = row(&buf, 0);
        assert!(text.contains("Exported 3 lines"));
        assert!(!text.contains("[q]"));
    }
}
