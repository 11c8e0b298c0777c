//! Layer specifications and the layer tagger.

use std::path::PathBuf;

use crate::defaults;
use crate::errors::{LoadError, Warning};
use crate::style::LayerStyle;
use crate::svg::VectorDocument;

/// Where a layer's drawing comes from
#[derive(Debug, Clone)]
pub enum LayerSource {
    /// An SVG file produced by the exporter
    File(PathBuf),
    /// SVG text already in memory; `label` names it in diagnostics
    Text { label: String, svg: String },
    /// An already-parsed document
    Document(VectorDocument),
}

impl LayerSource {
    /// Human-readable origin for diagnostics
    pub fn label(&self) -> String {
        match self {
            LayerSource::File(path) => path.display().to_string(),
            LayerSource::Text { label, .. } => label.clone(),
            LayerSource::Document(doc) => doc.name.clone(),
        }
    }

    /// Read and parse the source. Consumes it: each layer is loaded once.
    pub fn load(self) -> Result<(VectorDocument, Vec<Warning>), LoadError> {
        match self {
            LayerSource::File(path) => {
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| LoadError::Io { path: path.clone(), source })?;
                Ok(VectorDocument::parse(&path.display().to_string(), &text)?)
            }
            LayerSource::Text { label, svg } => Ok(VectorDocument::parse(&label, &svg)?),
            LayerSource::Document(doc) => Ok((doc, Vec::new())),
        }
    }
}

/// One discipline's drawing and how to present it
#[derive(Debug, Clone)]
pub struct LayerSpec {
    pub name: String,
    pub source: LayerSource,
    pub style: LayerStyle,
}

impl LayerSpec {
    pub fn new(name: impl Into<String>, source: LayerSource, style: LayerStyle) -> Self {
        LayerSpec {
            name: name.into(),
            source,
            style,
        }
    }

    pub fn from_file(name: impl Into<String>, path: impl Into<PathBuf>, style: LayerStyle) -> Self {
        LayerSpec::new(name, LayerSource::File(path.into()), style)
    }

    pub fn class_name(&self) -> String {
        layer_class(&self.name)
    }
}

/// The semantic class for a layer name: `<name>-layer`, lowercased, with
/// anything outside `[a-z0-9_-]` replaced by `-`.
pub fn layer_class(name: &str) -> String {
    let mut class: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    // CSS identifiers cannot start with a digit
    if class.starts_with(|c: char| c.is_ascii_digit()) {
        class.insert(0, '_');
    }
    class.push_str(defaults::LAYER_CLASS_SUFFIX);
    class
}

/// Apply a layer's class, opacity and stroke/fill policy to every top-level
/// group. Nested groups and primitives are left as they are.
pub fn tag_layer(doc: &mut VectorDocument, class: &str, style: &LayerStyle) {
    let presentation = style.presentation_attributes();
    for group in &mut doc.groups {
        group.layer_class = Some(class.to_string());
        group.opacity = Some(style.opacity);
        for (name, value) in &presentation {
            group.attrs.set(*name, value.clone());
        }
    }
    crate::log::debug!(
        document = %doc.name,
        class,
        groups = doc.groups.len(),
        "tagged layer"
    );
}
