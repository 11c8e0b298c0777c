//! The required external stylesheet.

use std::path::{Path, PathBuf};

use crate::errors::{ComposeError, Warning};
use crate::svg::VectorDocument;

/// Stylesheet text keyed by layer classes (`.architecture-layer { ... }`)
#[derive(Debug, Clone, PartialEq)]
pub struct Stylesheet {
    pub path: PathBuf,
    pub text: String,
}

impl Stylesheet {
    /// Load the stylesheet. There is no fallback styling: failure is fatal.
    pub fn load(path: &Path) -> Result<Stylesheet, ComposeError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            ComposeError::StylesheetNotFound {
                path: path.to_path_buf(),
                source,
            }
        })?;
        crate::log::debug!(path = %path.display(), bytes = text.len(), "loaded stylesheet");
        Ok(Stylesheet {
            path: path.to_path_buf(),
            text,
        })
    }

    /// Attach as the document's single style block, after any style text the
    /// base layer already carried.
    pub fn inject(&self, doc: &mut VectorDocument) {
        let text = self.text.trim();
        doc.style = match doc.style.take() {
            Some(existing) if !text.is_empty() => Some(format!("{}\n{}", existing, text)),
            Some(existing) => Some(existing),
            None => Some(text.to_string()),
        };
    }

    /// Whether any selector mentions `.class` as a whole class name
    pub fn mentions_class(&self, class: &str) -> bool {
        let needle = format!(".{}", class);
        self.text.match_indices(&needle).any(|(at, _)| {
            let next = self.text[at + needle.len()..].chars().next();
            !matches!(next, Some(c) if c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
    }

    /// One warning per class the stylesheet never mentions
    pub fn unstyled<'a>(&self, classes: impl IntoIterator<Item = &'a str>) -> Vec<Warning> {
        let mut seen = Vec::new();
        let mut warnings = Vec::new();
        for class in classes {
            if seen.contains(&class) {
                continue;
            }
            seen.push(class);
            if !self.mentions_class(class) {
                warnings.push(Warning::UnstyledLayer {
                    class: class.to_string(),
                    stylesheet: self.path.clone(),
                });
            }
        }
        warnings
    }
}
