use citeseek_citation::{CitationIssue, ReferenceMap};
use std::fmt::Write as _;

pub const PLANNER_SYSTEM_PROMPT: &str = "You split a user question into short, focused search \
queries for a document search engine. Keep the language of the question. Reply with a single \
line of JSON: {\"subqueries\": [\"...\"]}. No other text.";

pub const ANSWER_SYSTEM_PROMPT: &str = "You answer questions using only the numbered references \
provided. Cite every statement with the reference number in square brackets, for example [2] or \
[1][3]. Only cite numbers that appear in the reference list. Do not add a list of sources at the \
end. If the references do not answer the question, say so.";

pub const REPAIR_SYSTEM_PROMPT: &str = "You fix citation numbers in an answer. Change only the \
bracket citations such as [4]; keep every other character of the text unchanged. Return the \
corrected answer only.";

#[must_use]
pub fn planner_user_prompt(question: &str, max_subqueries: usize) -> String {
    format!("Question: {question}\n\nReturn between 1 and {max_subqueries} subqueries.")
}

/// Renders the reference table the way the drafting model sees it.
#[must_use]
pub fn render_reference_table(references: &ReferenceMap) -> String {
    let mut table = String::new();
    for entry in references.entries() {
        let _ = writeln!(table, "[{}] {}", entry.id, entry.title);
        for paragraph in &entry.snippet_lines {
            for line in paragraph {
                let _ = writeln!(table, "    {line}");
            }
        }
        table.push('\n');
    }
    table.trim_end().to_string()
}

#[must_use]
pub fn answer_user_prompt(question: &str, references: &ReferenceMap) -> String {
    format!(
        "References:\n\n{}\n\nQuestion: {question}",
        render_reference_table(references)
    )
}

/// Asks for the same draft with only its citations corrected.
#[must_use]
pub fn repair_user_prompt(draft: &str, allowed_ids: &[u32], issues: &[CitationIssue]) -> String {
    let allowed = allowed_ids
        .iter()
        .map(|id| format!("[{id}]"))
        .collect::<Vec<_>>()
        .join(" ");
    let problems = issues
        .iter()
        .map(|issue| format!("- {issue}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Allowed citations: {allowed}\n\nProblems found:\n{problems}\n\nAnswer to correct:\n{draft}"
    )
}
