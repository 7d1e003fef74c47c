use regex::Regex;

use scanscope_types::{LogEvent, LogSource};

/// Per-source visibility toggles.
///
/// `System` events are always visible. Filtering only decides what is
/// rendered; it never touches the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceFilter {
    pub show_docker: bool,
    pub show_scan: bool,
}

impl SourceFilter {
    /// Check if an event from this source should be displayed
    pub fn matches(&self, event: &LogEvent) -> bool {
        self.shows(event.source)
    }

    pub fn shows(&self, source: LogSource) -> bool {
        match source {
            LogSource::System => true,
            LogSource::MobsfDocker => self.show_docker,
            LogSource::ScanScript => self.show_scan,
        }
    }

    pub fn toggle_docker(&mut self) {
        self.show_docker = !self.show_docker;
    }

    pub fn toggle_scan(&mut self) {
        self.show_scan = !self.show_scan;
    }
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self {
            show_docker: true,
            show_scan: true,
        }
    }
}

/// Compiled text filter over event messages
#[derive(Clone)]
pub struct CompiledFilter {
    /// Regex pattern (if any)
    regex: Option<Regex>,

    /// Original pattern string
    pattern: String,

    /// Case sensitivity
    case_insensitive: bool,
}

impl CompiledFilter {
    /// Create a new filter from a pattern string
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Self::build(pattern, false)
    }

    /// Create a case-insensitive filter
    pub fn new_case_insensitive(pattern: &str) -> Result<Self, regex::Error> {
        Self::build(pattern, true)
    }

    fn build(pattern: &str, case_insensitive: bool) -> Result<Self, regex::Error> {
        let regex = if pattern.is_empty() {
            None
        } else if case_insensitive {
            Some(Regex::new(&format!("(?i){}", pattern))?)
        } else {
            Some(Regex::new(pattern)?)
        };

        Ok(Self {
            regex,
            pattern: pattern.to_string(),
            case_insensitive,
        })
    }

    /// Check if an event's message matches this filter
    pub fn matches(&self, event: &LogEvent) -> bool {
        match &self.regex {
            Some(re) => re.is_match(&event.message),
            None => true,
        }
    }

    /// Find all match positions in a string (for highlighting)
    pub fn find_matches(&self, text: &str) -> Vec<(usize, usize)> {
        match &self.regex {
            Some(re) => re.find_iter(text).map(|m| (m.start(), m.end())).collect(),
            None => Vec::new(),
        }
    }

    /// Get the original pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check if filter is empty (matches everything)
    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
    }

    /// Check if filter is case insensitive
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }
}

impl std::fmt::Debug for CompiledFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledFilter")
            .field("pattern", &self.pattern)
            .field("case_insensitive", &self.case_insensitive)
            .finish()
    }
}
