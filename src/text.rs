//! Label normalization.

use crate::svg::{Primitive, TextContent, VectorDocument};

/// Uppercase every text run in the document. Re-running changes nothing.
///
/// Returns the number of runs whose content changed.
pub fn normalize_text(doc: &mut VectorDocument) -> usize {
    let mut changed = 0;
    doc.for_each_primitive_mut(|primitive| {
        if let Primitive::Text(text) = primitive {
            changed += uppercase_runs(&mut text.content);
        }
    });
    crate::log::debug!(runs = changed, "normalized text");
    changed
}

fn uppercase_runs(content: &mut [TextContent]) -> usize {
    let mut changed = 0;
    for item in content {
        match item {
            TextContent::Run(run) => {
                let upper = run.to_uppercase();
                if upper != *run {
                    *run = upper;
                    changed += 1;
                }
            }
            TextContent::Span(span) => changed += uppercase_runs(&mut span.content),
        }
    }
    changed
}
