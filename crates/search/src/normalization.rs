//! Progressively weaker rewrites of a lexical query, tried only when the previous form found
//! nothing.

use std::collections::HashSet;

/// Which text-recall attempt produced the hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRecallStage {
    Original,
    Dehyphenated,
    UmlautFolded,
    TokenOr,
    /// Every attempt came back empty.
    Exhausted,
}

impl TextRecallStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Dehyphenated => "dehyphenated",
            Self::UmlautFolded => "umlaut_folded",
            Self::TokenOr => "token_or",
            Self::Exhausted => "exhausted",
        }
    }
}

fn is_hyphen(c: char) -> bool {
    matches!(c, '-' | '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{00AD}')
}

/// Replaces hyphens and dashes with spaces and collapses whitespace.
#[must_use]
pub fn dehyphenate(query: &str) -> String {
    query
        .chars()
        .map(|c| if is_hyphen(c) { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// German transliteration: `ä→ae`, `ö→oe`, `ü→ue`, `ß→ss` (case-preserving).
#[must_use]
pub fn fold_umlauts(query: &str) -> String {
    let mut out = String::with_capacity(query.len() + 8);
    for c in query.chars() {
        match c {
            'ä' => out.push_str("ae"),
            'ö' => out.push_str("oe"),
            'ü' => out.push_str("ue"),
            'Ä' => out.push_str("Ae"),
            'Ö' => out.push_str("Oe"),
            'Ü' => out.push_str("Ue"),
            'ß' => out.push_str("ss"),
            'ẞ' => out.push_str("SS"),
            other => out.push(other),
        }
    }
    out
}

/// Distinct word tokens of at least `min_chars` characters, in query order.
#[must_use]
pub fn fallback_tokens(query: &str, min_chars: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= min_chars)
        .filter(|t| seen.insert(t.to_lowercase()))
        .map(str::to_string)
        .collect()
}
