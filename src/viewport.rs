//! Viewport and canvas from the union of placed content.
//!
//! The walk is over typed primitives: move/line endpoints (including the
//! implied coordinate of H/V), line ends, poly vertices, rect corners,
//! ellipse centers and text anchors. Curve control points and arc radii
//! are not points of the drawing and are ignored, as are templates. Points
//! are mapped through every enclosing `transform`.

use glam::{DAffine2, DVec2};

use crate::errors::Warning;
use crate::svg::{
    Attributed, Attributes, Group, Node, Primitive, TextAnchor, TextContent, VectorDocument,
};
use crate::transform::TransformList;
use crate::types::{BBox, Frame, Viewport};

/// Every extremal point of placed content, in document order
pub fn content_points(doc: &VectorDocument) -> Vec<DVec2> {
    let mut points = Vec::new();
    for group in &doc.groups {
        group_points(group, DAffine2::IDENTITY, &mut points);
    }
    points
}

fn group_points(group: &Group, parent: DAffine2, out: &mut Vec<DVec2>) {
    let ctm = parent * local_transform(&group.attrs);
    for child in &group.children {
        match child {
            Node::Group(g) => group_points(g, ctm, out),
            Node::Primitive(p) => {
                let ctm = ctm * local_transform(p.attrs());
                let start = out.len();
                primitive_points(p, out);
                if ctm != DAffine2::IDENTITY {
                    for point in &mut out[start..] {
                        *point = ctm.transform_point2(*point);
                    }
                }
            }
            Node::Template(_) => {}
        }
    }
}

fn local_transform(attrs: &Attributes) -> DAffine2 {
    attrs
        .get("transform")
        .and_then(|raw| TransformList::parse("transform", raw).ok())
        .map_or(DAffine2::IDENTITY, |list| list.to_affine())
}

fn primitive_points(primitive: &Primitive, points: &mut Vec<DVec2>) {
    match primitive {
        Primitive::Path(p) => points.extend(p.data.line_endpoints()),
        Primitive::Line(l) => points.extend([l.from, l.to]),
        Primitive::Poly(p) => points.extend(p.points.iter().copied()),
        Primitive::Rect(r) => points.extend(r.corners()),
        Primitive::Ellipse(e) => points.push(e.center),
        Primitive::Text(t) => text_anchors(&t.anchor, &t.content, DVec2::ZERO, points),
    }
}

fn text_anchors(anchor: &TextAnchor, content: &[TextContent], parent: DVec2, out: &mut Vec<DVec2>) {
    let at = anchor.resolve(parent);
    out.push(at);
    for item in content {
        if let TextContent::Span(span) = item {
            text_anchors(&span.anchor, &span.content, at, out);
        }
    }
}

/// Pad `bbox` by `ratio` of its span on each side.
///
/// An axis with zero span borrows the other axis's padding. Returns `None`
/// when the box is empty or both spans are zero.
pub fn padded_viewport(bbox: &BBox, ratio: f64) -> Option<Viewport> {
    if bbox.is_empty() {
        return None;
    }
    let (w, h) = (bbox.width(), bbox.height());
    let (pad_x, pad_y) = match (w > 0.0, h > 0.0) {
        (true, true) => (w * ratio, h * ratio),
        (true, false) => (w * ratio, w * ratio),
        (false, true) => (h * ratio, h * ratio),
        (false, false) => return None,
    };
    Some(Viewport {
        min_x: bbox.min.x - pad_x,
        min_y: bbox.min.y - pad_y,
        width: w + 2.0 * pad_x,
        height: h + 2.0 * pad_y,
    })
}

/// Set the document's frame from its content.
///
/// With nothing to frame the frame is cleared and a warning returned.
pub fn fit_document(doc: &mut VectorDocument, padding_ratio: f64, max_canvas: u32) -> Option<Warning> {
    let points = content_points(doc);
    if points.is_empty() {
        doc.frame = None;
        return Some(Warning::EmptyContent);
    }

    let bbox: BBox = points.into_iter().collect();
    doc.frame = padded_viewport(&bbox, padding_ratio).and_then(|vp| Frame::fit(vp, max_canvas));
    if doc.frame.is_none() {
        return Some(Warning::DegenerateContent);
    }
    crate::log::info!(frame = ?doc.frame, "fitted viewport");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CanvasSize;
    use glam::dvec2;

    fn doc(svg: &str) -> VectorDocument {
        VectorDocument::parse("t.svg", svg).unwrap().0
    }

    #[test]
    fn collects_line_endpoints_and_text_anchors() {
        let d = doc(r#"<svg xmlns="http://www.w3.org/2000/svg"><g>
            <path d="M10 10h5v5C0 0 100 100 20 20A50 50 0 0 1 30 30"/>
            <text x="1" y="2">a<tspan dx="3">b</tspan></text>
        </g></svg>"#);
        assert_eq!(
            content_points(&d),
            vec![
                dvec2(10.0, 10.0),
                dvec2(15.0, 10.0),
                dvec2(15.0, 15.0),
                dvec2(1.0, 2.0),
                dvec2(4.0, 2.0),
            ]
        );
    }

    #[test]
    fn points_follow_enclosing_transforms() {
        let d = doc(r#"<svg xmlns="http://www.w3.org/2000/svg">
            <g transform="translate(100 0)">
                <g transform="scale(2)"><line x1="1" y1="1" x2="3" y2="1"/></g>
                <text x="5" y="0" transform="rotate(90)">a</text>
            </g>
        </svg>"#);
        let points = content_points(&d);
        let expected = [dvec2(102.0, 2.0), dvec2(106.0, 2.0), dvec2(100.0, 5.0)];
        assert_eq!(points.len(), expected.len());
        for (p, e) in points.iter().zip(expected) {
            assert!((*p - e).length() < 1e-9, "{:?} != {:?}", p, e);
        }
    }

    #[test]
    fn templates_only_is_empty() {
        let mut d = doc(r#"<svg xmlns="http://www.w3.org/2000/svg">
            <defs><path d="M0 0L100 100"/></defs>
            <g><marker id="m"><path d="M0 0L5 5"/></marker></g>
        </svg>"#);
        assert!(content_points(&d).is_empty());
        assert!(matches!(fit_document(&mut d, 0.1, 2048), Some(Warning::EmptyContent)));
        assert_eq!(d.frame, None);
    }

    #[test]
    fn ten_percent_padding_each_side() {
        let bbox: BBox = [dvec2(0.0, 0.0), dvec2(200.0, 100.0)].into_iter().collect();
        let vp = padded_viewport(&bbox, 0.1).unwrap();
        assert_eq!(vp.min_x, -20.0);
        assert_eq!(vp.width, 240.0);
        assert_eq!(vp.min_y, -10.0);
        assert_eq!(vp.height, 120.0);
    }

    #[test]
    fn flat_axis_borrows_other_padding() {
        let bbox: BBox = [dvec2(0.0, 5.0), dvec2(100.0, 5.0)].into_iter().collect();
        let vp = padded_viewport(&bbox, 0.1).unwrap();
        assert_eq!((vp.min_y, vp.height), (-5.0, 20.0));

        let point: BBox = [dvec2(3.0, 3.0)].into_iter().collect();
        assert_eq!(padded_viewport(&point, 0.1), None);
    }

    #[test]
    fn single_point_is_degenerate() {
        let mut d = doc(r#"<svg xmlns="http://www.w3.org/2000/svg"><g><text x="4" y="4">x</text></g></svg>"#);
        assert!(matches!(
            fit_document(&mut d, 0.1, 2048),
            Some(Warning::DegenerateContent)
        ));
        assert_eq!(d.frame, None);
    }

    #[test]
    fn canvas_preserves_aspect_ratio() {
        let mut d = doc(r#"<svg xmlns="http://www.w3.org/2000/svg"><g><rect width="300" height="200"/></g></svg>"#);
        assert!(fit_document(&mut d, 0.1, 2048).is_none());
        let frame = d.frame.unwrap();
        assert_eq!(frame.canvas(), CanvasSize { width: 2048, height: 1365 });
        let vp = frame.viewport();
        let canvas_ratio = frame.canvas().width as f64 / frame.canvas().height as f64;
        assert!((canvas_ratio - vp.aspect_ratio()).abs() < 1e-3);
    }
}
