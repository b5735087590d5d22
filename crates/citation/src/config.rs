use crate::scan::scan_citations;
use anyhow::{anyhow, Result};
use serde::Deserialize;

const ID_PLACEHOLDER: &str = "{id}";

/// How validated citations are rendered and how source excerpts are joined.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CitationConfig {
    /// Marker template for a valid citation; `{id}` is replaced by the renumbered id.
    pub marker_template: String,
    /// Separator between excerpts of the same source document.
    pub source_separator: String,
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            marker_template: "⟦cite:{id}⟧".to_string(),
            source_separator: "\n\n---\n\n".to_string(),
        }
    }
}

impl CitationConfig {
    #[must_use]
    pub fn render_marker(&self, id: u32) -> String {
        self.marker_template.replace(ID_PLACEHOLDER, &id.to_string())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.marker_template.contains(ID_PLACEHOLDER) {
            return Err(anyhow!(
                "citations.marker_template must contain {ID_PLACEHOLDER}"
            ));
        }
        // A marker that itself looks like a bracket citation would be rescanned as one.
        if !scan_citations(&self.render_marker(1)).is_empty() {
            return Err(anyhow!(
                "citations.marker_template must not render as a bracket citation"
            ));
        }
        Ok(())
    }
}
