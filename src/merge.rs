//! The layer merge engine.
//!
//! Layers are loaded in parallel, then scaled, tagged and merged in input
//! order. Input order is paint order: the first usable layer is the base
//! document and sits at the back.

use std::collections::HashSet;

use rayon::prelude::*;

use crate::errors::{ComposeError, LoadError, Warning};
use crate::layer::{LayerSpec, layer_class, tag_layer};
use crate::scale::scale_document;
use crate::style::LayerStyle;
use crate::svg::{RawElement, RawNode, VectorDocument};
use crate::types::ScaleFactor;

/// A layer that made it into the composite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedLayer {
    pub name: String,
    pub class: String,
}

#[derive(Debug)]
pub struct Merged {
    pub document: VectorDocument,
    pub layers: Vec<MergedLayer>,
    pub warnings: Vec<Warning>,
}

/// Load, scale, tag and merge `layers` into one document.
///
/// A layer whose source cannot be loaded is skipped with a
/// [`Warning::MissingLayer`]. Fails only when no layer is usable.
pub fn merge_layers(layers: Vec<LayerSpec>, scale: ScaleFactor) -> Result<Merged, ComposeError> {
    let attempted: Vec<String> = layers
        .iter()
        .map(|l| format!("{} ({})", l.name, l.source.label()))
        .collect();

    let loaded: Vec<(String, LayerStyle, Result<_, LoadError>)> = layers
        .into_par_iter()
        .map(|layer| (layer.name, layer.style, layer.source.load()))
        .collect();

    let mut base: Option<VectorDocument> = None;
    let mut merged = Vec::new();
    let mut warnings = Vec::new();

    for (name, style, result) in loaded {
        let (mut doc, doc_warnings) = match result {
            Ok(loaded) => loaded,
            Err(err) => {
                let warning = Warning::MissingLayer {
                    layer: name,
                    reason: err.to_string(),
                };
                crate::log::warn!(kind = warning.kind(), "{}", warning);
                warnings.push(warning);
                continue;
            }
        };
        warnings.extend(doc_warnings);

        scale_document(&mut doc, scale);
        let class = layer_class(&name);
        tag_layer(&mut doc, &class, &style);

        base = Some(match base.take() {
            None => doc,
            Some(mut base) => {
                absorb(&mut base, doc);
                base
            }
        });
        crate::log::info!(layer = %name, class = %class, "merged layer");
        merged.push(MergedLayer { name, class });
    }

    let Some(document) = base else {
        return Err(ComposeError::NoUsableLayers { attempted });
    };
    Ok(Merged {
        document,
        layers: merged,
        warnings,
    })
}

/// Move `other`'s groups onto the end of `base`.
///
/// Templates come along when they bring ids `base` does not have yet, so
/// markers and patterns referenced from the moved groups still resolve.
/// Root attributes and embedded style of `other` are dropped.
fn absorb(base: &mut VectorDocument, other: VectorDocument) {
    let mut known: HashSet<String> = base.template_ids().into_iter().map(str::to_string).collect();
    for template in other.templates {
        if let Some(template) = adopt(template, &mut known) {
            base.templates.push(template);
        }
    }
    if other.style.is_some() {
        crate::log::debug!(document = %other.name, "dropping non-base embedded style");
    }
    base.groups.extend(other.groups);
}

fn adopt(el: RawElement, known: &mut HashSet<String>) -> Option<RawElement> {
    if el.attrs.get("id").is_some() {
        let ids: Vec<String> = el.ids().into_iter().map(str::to_string).collect();
        if ids.iter().any(|id| known.contains(id)) {
            return None;
        }
        known.extend(ids);
        return Some(el);
    }
    if el.name != "defs" {
        // Anonymous title/desc/metadata describe the other document only
        return None;
    }
    let children: Vec<RawNode> = el
        .children
        .into_iter()
        .filter_map(|child| match child {
            RawNode::Element(child) => adopt(child, known).map(RawNode::Element),
            RawNode::Text(_) => None,
        })
        .collect();
    if children.is_empty() {
        None
    } else {
        Some(RawElement {
            name: el.name,
            attrs: el.attrs,
            children,
        })
    }
}
