//! Textual clean-up applied to a draft before its citations are renumbered.

use crate::scan::{citation_runs, scan_citations};
use once_cell::sync::Lazy;
use regex::Regex;

static SOURCES_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:#{1,6}[ \t]*)?(?:\*\*|__)?[ \t]*(?:sources?|references?|quellen(?:angaben|verzeichnis)?|referenzen|literatur(?:verzeichnis)?|belege)[ \t]*(?:(?:\*\*|__)?[ \t]*:?[ \t]*(?:\*\*|__)?[ \t]*$|:)",
    )
    .expect("valid sources heading regex")
});

static CITATION_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[[ \t]*(\d{1,9}(?:[ \t]*[,;][ \t]*\d{1,9})+)[ \t]*\]")
        .expect("valid citation list regex")
});

const SENTENCE_PUNCTUATION: [char; 6] = ['.', ',', ';', ':', '!', '?'];

/// Runs every clean-up step in order: fences, trailing sources, list splitting, punctuation.
#[must_use]
pub fn clean_draft(draft: &str) -> String {
    let text = strip_code_fences(draft);
    let text = strip_sources_section(&text);
    let text = split_citation_lists(&text);
    move_punctuation_before_citations(&text)
}

/// Removes a fenced block wrapping the whole draft (```` ```markdown ... ``` ````).
#[must_use]
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let mut lines: Vec<&str> = trimmed.lines().skip(1).collect();
    if lines.last().is_some_and(|line| line.trim() == "```") {
        lines.pop();
    }
    lines.join("\n").trim().to_string()
}

/// Drops a trailing "Sources" / "Quellen" / "References" section the model appended itself.
///
/// Only a heading with answer text before it counts; a draft that opens with such a label is
/// left alone.
#[must_use]
pub fn strip_sources_section(text: &str) -> String {
    let cut = SOURCES_HEADING
        .find_iter(text)
        .filter(|m| !text[..m.start()].trim().is_empty())
        .last();
    match cut {
        Some(m) => {
            log::debug!("Stripping model-written sources section at byte {}", m.start());
            text[..m.start()].trim_end().to_string()
        }
        None => text.to_string(),
    }
}

/// `[1, 3, 7]` and `[1; 3]` become `[1][3][7]` and `[1][3]`.
#[must_use]
pub fn split_citation_lists(text: &str) -> String {
    CITATION_LIST
        .replace_all(text, |caps: &regex::Captures<'_>| {
            caps[1]
                .split([',', ';'])
                .map(|id| format!("[{}]", id.trim()))
                .collect::<String>()
        })
        .into_owned()
}

/// Moves sentence punctuation that follows a citation run in front of it.
///
/// `wichtig [3][7].` becomes `wichtig.[3][7]`: whitespace before the run is dropped and the
/// whole punctuation cluster moves. Citations that end up separated only by moved punctuation
/// are merged into one run, and punctuation is never doubled (`x[1].[2].` becomes `x.[1][2]`).
/// No citation in the output is followed by punctuation, so a second pass changes nothing.
#[must_use]
pub fn move_punctuation_before_citations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Start of a trailing stretch of `out` holding only citations, spaces and tabs.
    let mut block: Option<usize> = None;
    let mut cursor = 0;
    for (start, end) in citation_runs(&scan_citations(text)) {
        let gap = &text[cursor..start];
        if !gap.chars().all(is_inline_space) {
            block = None;
        }
        out.push_str(gap);

        let run = &text[start..end];
        let punctuation_len: usize = text[end..]
            .chars()
            .take_while(|c| SENTENCE_PUNCTUATION.contains(c))
            .map(char::len_utf8)
            .sum();
        if punctuation_len == 0 {
            block.get_or_insert(out.len());
            out.push_str(run);
            cursor = end;
            continue;
        }

        let earlier: String = match block.take() {
            Some(block_start) => {
                let citations = out[block_start..]
                    .chars()
                    .filter(|c| !is_inline_space(*c))
                    .collect();
                out.truncate(block_start);
                citations
            }
            None => String::new(),
        };
        let kept = out.trim_end_matches(is_inline_space).len();
        out.truncate(kept);
        if earlier.is_empty() || !out.ends_with(SENTENCE_PUNCTUATION) {
            out.push_str(&text[end..end + punctuation_len]);
        }
        block = Some(out.len());
        out.push_str(&earlier);
        out.push_str(run);
        cursor = end + punctuation_len;
    }
    out.push_str(&text[cursor..]);
    out
}

fn is_inline_space(c: char) -> bool {
    c == ' ' || c == '\t'
}
