/// Everything the user can ask the log viewer to do
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    ToggleHelp,

    // Source filters
    ToggleDocker,
    ToggleScan,

    // Text filter
    OpenSearch,
    CloseSearch,
    SearchInput(char),
    SearchBackspace,
    SearchClear,
    ApplyFilter,
    ClearFilter,
    ToggleCaseSensitive,

    // Scrolling
    ScrollUp(usize),
    ScrollDown(usize),
    PageUp,
    PageDown,
    ScrollToTop,
    ScrollToBottom,
    ToggleAutoScroll,

    // Display
    ToggleTimestamps,
    ToggleLocalTime,

    ClearLogs,
    ExportLogs,

    DismissMessage,
    Render,
}
