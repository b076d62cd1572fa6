/// Prefix that marks a line carrying an event payload.
pub const DATA_PREFIX: &str = "data: ";
/// Payload value signalling that no more events will arrive.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Classification of one decoded stream line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Trimmed payload content, ready for `event::parse_event`.
    Payload(&'a str),
    /// Completion sentinel; the run ends here.
    Completion,
    /// Blank lines, comments, keep-alives and non-data fields.
    Ignored,
}

/// Classifies a decoded line.
pub fn classify(line: &str) -> Frame<'_> {
    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Ignored;
    };
    let content = rest.trim();
    if content == DONE_SENTINEL {
        Frame::Completion
    } else if content.is_empty() {
        Frame::Ignored
    } else {
        Frame::Payload(content)
    }
}
