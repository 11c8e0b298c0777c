//! Uniform scaling of primitives and documents.
//!
//! Only geometry moves: path commands, endpoints, vertices, rect and ellipse
//! extents, and text anchors given in user units. Angles, arc flags,
//! font-relative text offsets, strings, styles and templates are untouched.
//! A `transform` above scaled geometry is conjugated so that it places the
//! geometry where the unscaled transform would, times `s`.

use crate::svg::{
    Attributed, Attributes, EllipseShape, Group, LineShape, Node, PathShape, PolyShape, Primitive,
    RectShape, TextAnchor, TextContent, TextShape, TextSpan, VectorDocument,
};
use crate::transform::TransformList;
use crate::types::ScaleFactor;

/// Return `primitive` with every length-bearing coordinate multiplied by `s`
pub fn scale_primitive(primitive: &Primitive, s: ScaleFactor) -> Primitive {
    let mut scaled = match primitive {
        Primitive::Path(p) => Primitive::Path(PathShape {
            data: p.data.scaled(s),
            attrs: p.attrs.clone(),
        }),
        Primitive::Line(l) => Primitive::Line(LineShape {
            from: s.point(l.from),
            to: s.point(l.to),
            attrs: l.attrs.clone(),
        }),
        Primitive::Poly(p) => Primitive::Poly(PolyShape {
            closed: p.closed,
            points: p.points.iter().map(|&v| s.point(v)).collect(),
            attrs: p.attrs.clone(),
        }),
        Primitive::Rect(r) => Primitive::Rect(RectShape {
            origin: s.point(r.origin),
            size: s.point(r.size),
            rx: r.rx.map(|v| s.length(v)),
            ry: r.ry.map(|v| s.length(v)),
            attrs: r.attrs.clone(),
        }),
        Primitive::Ellipse(e) => Primitive::Ellipse(EllipseShape {
            circle: e.circle,
            center: s.point(e.center),
            radii: s.point(e.radii),
            attrs: e.attrs.clone(),
        }),
        Primitive::Text(t) => Primitive::Text(TextShape {
            anchor: scale_anchor(&t.anchor, s),
            content: scale_content(&t.content, s),
            attrs: t.attrs.clone(),
        }),
    };
    scale_transform(scaled.attrs_mut(), s);
    scaled
}

/// Rewrite a `transform` attribute for geometry scaled by `s`
fn scale_transform(attrs: &mut Attributes, s: ScaleFactor) {
    let Some(raw) = attrs.get("transform") else {
        return;
    };
    match TransformList::parse("transform", raw) {
        Ok(list) => attrs.set("transform", list.scaled(s).to_string()),
        // The loader rejects these; a hand-built document may still carry one
        Err(_) => {
            crate::log::warn!(value = raw, "left unparsable transform unscaled");
        }
    }
}

fn scale_anchor(anchor: &TextAnchor, s: ScaleFactor) -> TextAnchor {
    let scale = |v: Option<f64>| v.map(|v| s.length(v));
    TextAnchor {
        x: scale(anchor.x),
        y: scale(anchor.y),
        dx: scale(anchor.dx),
        dy: scale(anchor.dy),
    }
}

fn scale_content(content: &[TextContent], s: ScaleFactor) -> Vec<TextContent> {
    content
        .iter()
        .map(|item| match item {
            TextContent::Run(text) => TextContent::Run(text.clone()),
            TextContent::Span(span) => TextContent::Span(TextSpan {
                anchor: scale_anchor(&span.anchor, s),
                content: scale_content(&span.content, s),
                attrs: span.attrs.clone(),
            }),
        })
        .collect()
}

/// Scale every primitive reachable from the document's groups, depth-first
/// in document order. Returns the number of primitives scaled.
pub fn scale_document(doc: &mut VectorDocument, s: ScaleFactor) -> usize {
    let mut count = 0;
    for group in &mut doc.groups {
        count += scale_group(group, s);
    }
    crate::log::debug!(document = %doc.name, scale = s.raw(), primitives = count, "scaled document");
    count
}

fn scale_group(group: &mut Group, s: ScaleFactor) -> usize {
    scale_transform(&mut group.attrs, s);
    let mut count = 0;
    for child in &mut group.children {
        match child {
            Node::Group(g) => count += scale_group(g, s),
            Node::Primitive(p) => {
                *p = scale_primitive(p, s);
                count += 1;
            }
            Node::Template(_) => {}
        }
    }
    count
}
