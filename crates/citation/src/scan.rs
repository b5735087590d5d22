use once_cell::sync::Lazy;
use regex::Regex;

static BRACKET_CITATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d{1,9})\]").expect("valid citation regex"));

/// A `[n]` token located in a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CitationSpan {
    /// Byte offset of `[`.
    pub start: usize,
    /// Byte offset just past `]`.
    pub end: usize,
    pub id: u32,
}

/// Finds every bracket citation in `text`, left to right.
///
/// Markdown links (`[2](https://...)`) are not citations and are skipped.
#[must_use]
pub fn scan_citations(text: &str) -> Vec<CitationSpan> {
    BRACKET_CITATION
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if text[whole.end()..].starts_with('(') {
                return None;
            }
            let id = caps.get(1)?.as_str().parse().ok()?;
            Some(CitationSpan {
                start: whole.start(),
                end: whole.end(),
                id,
            })
        })
        .collect()
}

/// Groups spans that directly touch (`[3][7]`) into runs.
#[must_use]
pub(crate) fn citation_runs(spans: &[CitationSpan]) -> Vec<(usize, usize)> {
    let mut runs: Vec<(usize, usize)> = Vec::new();
    for span in spans {
        match runs.last_mut() {
            Some((_, end)) if *end == span.start => *end = span.end,
            _ => runs.push((span.start, span.end)),
        }
    }
    runs
}
