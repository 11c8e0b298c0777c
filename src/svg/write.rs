//! Deterministic SVG serialization.

use super::{
    Attributes, Group, Node, Primitive, RawElement, RawNode, SVG_NS, TextAnchor, TextContent,
    VectorDocument, XLINK_NS,
};
use crate::path::format_points;

/// Format a coordinate: at most 6 decimals, trailing zeros trimmed, no `-0`.
pub(crate) fn fmt_num(value: f64) -> String {
    let s = format!("{:.6}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

impl VectorDocument {
    /// Serialize to SVG text
    pub fn to_svg_string(&self) -> String {
        let mut w = SvgWriter::default();
        w.document(self);
        w.out
    }
}

#[derive(Default)]
struct SvgWriter {
    out: String,
}

impl SvgWriter {
    fn document(&mut self, doc: &VectorDocument) {
        let mut attrs: Vec<(&str, String)> = vec![
            ("xmlns", SVG_NS.to_string()),
            ("xmlns:xlink", XLINK_NS.to_string()),
        ];
        attrs.extend(doc.attrs.iter().map(|(k, v)| (k, v.to_string())));
        if let Some(frame) = doc.frame {
            let vp = frame.viewport();
            let canvas = frame.canvas();
            attrs.push((
                "viewBox",
                format!(
                    "{} {} {} {}",
                    fmt_num(vp.min_x),
                    fmt_num(vp.min_y),
                    fmt_num(vp.width),
                    fmt_num(vp.height)
                ),
            ));
            attrs.push(("width", canvas.width.to_string()));
            attrs.push(("height", canvas.height.to_string()));
        }
        self.start_tag("svg", &attrs);
        self.out.push_str(">\n");

        if let Some(style) = &doc.style {
            self.indent(1);
            self.out.push_str("<style type=\"text/css\"><![CDATA[\n");
            self.out.push_str(&style.replace("]]>", "]]]]><![CDATA[>"));
            self.out.push_str("\n]]></style>\n");
        }
        for template in &doc.templates {
            self.raw(template, 1);
        }
        for group in &doc.groups {
            self.group(group, 1);
        }
        self.out.push_str("</svg>\n");
    }

    fn group(&mut self, group: &Group, depth: usize) {
        let mut attrs: Vec<(&str, String)> = Vec::new();
        let class = match (&group.layer_class, group.attrs.get("class")) {
            (Some(layer), Some(source)) => Some(format!("{} {}", layer, source)),
            (Some(layer), None) => Some(layer.clone()),
            (None, source) => source.map(str::to_string),
        };
        if let Some(class) = class {
            attrs.push(("class", class));
        }
        attrs.extend(
            group
                .attrs
                .iter()
                .filter(|(k, _)| *k != "class")
                .map(|(k, v)| (k, v.to_string())),
        );
        if let Some(opacity) = group.opacity {
            attrs.push(("opacity", fmt_num(opacity.raw())));
        }

        self.indent(depth);
        self.start_tag("g", &attrs);
        if group.children.is_empty() {
            self.out.push_str("/>\n");
            return;
        }
        self.out.push_str(">\n");
        for child in &group.children {
            match child {
                Node::Group(g) => self.group(g, depth + 1),
                Node::Primitive(p) => self.primitive(p, depth + 1),
                Node::Template(t) => self.raw(t, depth + 1),
            }
        }
        self.indent(depth);
        self.out.push_str("</g>\n");
    }

    fn primitive(&mut self, primitive: &Primitive, depth: usize) {
        let name = primitive.element_name();
        let (mut attrs, rest) = match primitive {
            Primitive::Path(p) => (vec![("d", p.data.to_string())], &p.attrs),
            Primitive::Line(l) => (
                vec![
                    ("x1", fmt_num(l.from.x)),
                    ("y1", fmt_num(l.from.y)),
                    ("x2", fmt_num(l.to.x)),
                    ("y2", fmt_num(l.to.y)),
                ],
                &l.attrs,
            ),
            Primitive::Poly(p) => (vec![("points", format_points(&p.points))], &p.attrs),
            Primitive::Rect(r) => {
                let mut attrs = vec![
                    ("x", fmt_num(r.origin.x)),
                    ("y", fmt_num(r.origin.y)),
                    ("width", fmt_num(r.size.x)),
                    ("height", fmt_num(r.size.y)),
                ];
                attrs.extend(r.rx.map(|v| ("rx", fmt_num(v))));
                attrs.extend(r.ry.map(|v| ("ry", fmt_num(v))));
                (attrs, &r.attrs)
            }
            Primitive::Ellipse(e) => {
                let mut attrs = vec![("cx", fmt_num(e.center.x)), ("cy", fmt_num(e.center.y))];
                if e.circle {
                    attrs.push(("r", fmt_num(e.radii.x)));
                } else {
                    attrs.push(("rx", fmt_num(e.radii.x)));
                    attrs.push(("ry", fmt_num(e.radii.y)));
                }
                (attrs, &e.attrs)
            }
            Primitive::Text(t) => {
                let attrs = with_extra(anchor_attrs(&t.anchor), &t.attrs);
                self.indent(depth);
                self.start_tag(name, &attrs);
                self.out.push('>');
                self.text_content(&t.content);
                self.out.push_str("</text>\n");
                return;
            }
        };
        attrs = with_extra(attrs, rest);
        self.indent(depth);
        self.start_tag(name, &attrs);
        self.out.push_str("/>\n");
    }

    fn text_content(&mut self, content: &[TextContent]) {
        for item in content {
            match item {
                TextContent::Run(text) => self.out.push_str(&escape_text(text)),
                TextContent::Span(span) => {
                    let attrs = with_extra(anchor_attrs(&span.anchor), &span.attrs);
                    self.start_tag("tspan", &attrs);
                    self.out.push('>');
                    self.text_content(&span.content);
                    self.out.push_str("</tspan>");
                }
            }
        }
    }

    fn raw(&mut self, el: &RawElement, depth: usize) {
        self.indent(depth);
        self.raw_inline_or_block(el, depth);
        self.out.push('\n');
    }

    /// Elements with text children are written on one line so whitespace in
    /// the text is not altered.
    fn raw_inline_or_block(&mut self, el: &RawElement, depth: usize) {
        let attrs: Vec<(&str, String)> = el.attrs.iter().map(|(k, v)| (k, v.to_string())).collect();
        self.start_tag(&el.name, &attrs);
        if el.children.is_empty() {
            self.out.push_str("/>");
            return;
        }
        self.out.push('>');

        let inline = el.children.iter().any(|c| matches!(c, RawNode::Text(_)));
        for child in &el.children {
            match child {
                RawNode::Text(text) => self.out.push_str(&escape_text(text)),
                RawNode::Element(child) if inline => self.raw_inline_or_block(child, depth + 1),
                RawNode::Element(child) => {
                    self.out.push('\n');
                    self.indent(depth + 1);
                    self.raw_inline_or_block(child, depth + 1);
                }
            }
        }
        if !inline {
            self.out.push('\n');
            self.indent(depth);
        }
        self.out.push_str("</");
        self.out.push_str(&el.name);
        self.out.push('>');
    }

    fn start_tag(&mut self, name: &str, attrs: &[(&str, String)]) {
        self.out.push('<');
        self.out.push_str(name);
        for (key, value) in attrs {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            self.out.push_str(&escape_attr(value));
            self.out.push('"');
        }
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
    }
}

fn anchor_attrs(anchor: &TextAnchor) -> Vec<(&'static str, String)> {
    [
        ("x", anchor.x),
        ("y", anchor.y),
        ("dx", anchor.dx),
        ("dy", anchor.dy),
    ]
    .into_iter()
    .filter_map(|(k, v)| v.map(|v| (k, fmt_num(v))))
    .collect()
}

fn with_extra<'a>(
    mut attrs: Vec<(&'a str, String)>,
    extra: &'a Attributes,
) -> Vec<(&'a str, String)> {
    attrs.extend(extra.iter().map(|(k, v)| (k, v.to_string())));
    attrs
}
