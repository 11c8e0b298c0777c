//! Typed SVG document model.
//!
//! Only the parts of SVG the compositor rewrites are typed: groups and the
//! closed set of drawing primitives. Definition-like subtrees (`defs`,
//! `marker`, `symbol`, ...) are carried through verbatim as [`RawElement`]s.
//! Every element keeps the attributes it does not interpret, in source order.

mod parse;
pub(crate) mod write;

use glam::DVec2;

use crate::path::PathData;
use crate::types::{Frame, Opacity};

/// SVG namespace URI
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
/// XLink namespace URI, still used for `xlink:href` by older exporters
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Elements kept verbatim as templates: referenced by id, never drawn in place
pub const TEMPLATE_ELEMENTS: &[&str] = &[
    "defs",
    "marker",
    "symbol",
    "clipPath",
    "pattern",
    "linearGradient",
    "radialGradient",
    "mask",
    "filter",
    "title",
    "desc",
    "metadata",
];

/// Ordered attribute list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replace the value in place, or append if absent
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.0.iter().position(|(k, _)| k == name)?;
        Some(self.0.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Attributes(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One parsed vector-drawing file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorDocument {
    /// Label used in diagnostics (usually the source path)
    pub name: String,
    /// Root attributes other than namespaces, `viewBox`, `width` and `height`
    pub attrs: Attributes,
    /// Embedded stylesheet text, all `<style>` blocks concatenated
    pub style: Option<String>,
    pub templates: Vec<RawElement>,
    /// Top-level groups in paint order
    pub groups: Vec<Group>,
    pub frame: Option<Frame>,
}

impl VectorDocument {
    pub fn new(name: impl Into<String>) -> Self {
        VectorDocument {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Visit every primitive below the top-level groups, depth-first in
    /// document order. Templates are not visited.
    pub fn for_each_primitive(&self, mut f: impl FnMut(&Primitive)) {
        for group in &self.groups {
            group.for_each_primitive(&mut f);
        }
    }

    pub fn for_each_primitive_mut(&mut self, mut f: impl FnMut(&mut Primitive)) {
        for group in &mut self.groups {
            group.for_each_primitive_mut(&mut f);
        }
    }

    /// Ids of all template elements, including nested ones
    pub fn template_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        for template in &self.templates {
            template.collect_ids(&mut ids);
        }
        ids
    }

    pub fn primitive_count(&self) -> usize {
        let mut count = 0;
        self.for_each_primitive(|_| count += 1);
        count
    }
}

/// A `<g>` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub attrs: Attributes,
    /// Semantic layer class, written ahead of any source classes
    pub layer_class: Option<String>,
    pub opacity: Option<Opacity>,
    pub children: Vec<Node>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_each_primitive(&self, f: &mut impl FnMut(&Primitive)) {
        for child in &self.children {
            match child {
                Node::Group(g) => g.for_each_primitive(f),
                Node::Primitive(p) => f(p),
                Node::Template(_) => {}
            }
        }
    }

    pub fn for_each_primitive_mut(&mut self, f: &mut impl FnMut(&mut Primitive)) {
        for child in &mut self.children {
            match child {
                Node::Group(g) => g.for_each_primitive_mut(f),
                Node::Primitive(p) => f(p),
                Node::Template(_) => {}
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Group(Group),
    Primitive(Primitive),
    /// A definition-like subtree nested inside a group
    Template(RawElement),
}

/// The closed set of drawing primitives
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Path(PathShape),
    Line(LineShape),
    Poly(PolyShape),
    Rect(RectShape),
    Ellipse(EllipseShape),
    Text(TextShape),
}

impl Primitive {
    /// The SVG element name this primitive is written as
    pub fn element_name(&self) -> &'static str {
        match self {
            Primitive::Path(_) => "path",
            Primitive::Line(_) => "line",
            Primitive::Poly(p) if p.closed => "polygon",
            Primitive::Poly(_) => "polyline",
            Primitive::Rect(_) => "rect",
            Primitive::Ellipse(e) if e.circle => "circle",
            Primitive::Ellipse(_) => "ellipse",
            Primitive::Text(_) => "text",
        }
    }
}

/// Attribute access shared by every primitive
pub trait Attributed {
    fn attrs(&self) -> &Attributes;
    fn attrs_mut(&mut self) -> &mut Attributes;

    fn id(&self) -> Option<&str> {
        self.attrs().get("id")
    }
}

macro_rules! impl_attributed {
    ($($ty:ty),*) => {
        $(
            impl Attributed for $ty {
                fn attrs(&self) -> &Attributes { &self.attrs }
                fn attrs_mut(&mut self) -> &mut Attributes { &mut self.attrs }
            }
        )*
    };
}

impl_attributed!(
    PathShape, LineShape, PolyShape, RectShape, EllipseShape, TextShape, TextSpan, Group,
    RawElement
);

impl Attributed for Primitive {
    fn attrs(&self) -> &Attributes {
        match self {
            Primitive::Path(p) => &p.attrs,
            Primitive::Line(p) => &p.attrs,
            Primitive::Poly(p) => &p.attrs,
            Primitive::Rect(p) => &p.attrs,
            Primitive::Ellipse(p) => &p.attrs,
            Primitive::Text(p) => &p.attrs,
        }
    }

    fn attrs_mut(&mut self) -> &mut Attributes {
        match self {
            Primitive::Path(p) => &mut p.attrs,
            Primitive::Line(p) => &mut p.attrs,
            Primitive::Poly(p) => &mut p.attrs,
            Primitive::Rect(p) => &mut p.attrs,
            Primitive::Ellipse(p) => &mut p.attrs,
            Primitive::Text(p) => &mut p.attrs,
        }
    }
}

/// `<path>`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathShape {
    pub data: PathData,
    pub attrs: Attributes,
}

/// `<line>`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineShape {
    pub from: DVec2,
    pub to: DVec2,
    pub attrs: Attributes,
}

/// `<polyline>` (open) or `<polygon>` (closed)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolyShape {
    pub closed: bool,
    pub points: Vec<DVec2>,
    pub attrs: Attributes,
}

/// `<rect>`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RectShape {
    pub origin: DVec2,
    pub size: DVec2,
    pub rx: Option<f64>,
    pub ry: Option<f64>,
    pub attrs: Attributes,
}

impl RectShape {
    pub fn corners(&self) -> [DVec2; 4] {
        let (o, s) = (self.origin, self.size);
        [
            o,
            DVec2::new(o.x + s.x, o.y),
            o + s,
            DVec2::new(o.x, o.y + s.y),
        ]
    }
}

/// `<circle>` (when `circle` is set, `radii.x == radii.y`) or `<ellipse>`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EllipseShape {
    pub circle: bool,
    pub center: DVec2,
    pub radii: DVec2,
    pub attrs: Attributes,
}

/// Text position: `x`/`y` absolute, `dx`/`dy` shifts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextAnchor {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub dx: Option<f64>,
    pub dy: Option<f64>,
}

impl TextAnchor {
    /// The effective anchor point, inheriting any missing `x`/`y` from `parent`
    pub fn resolve(&self, parent: DVec2) -> DVec2 {
        DVec2::new(
            self.x.unwrap_or(parent.x) + self.dx.unwrap_or(0.0),
            self.y.unwrap_or(parent.y) + self.dy.unwrap_or(0.0),
        )
    }
}

/// `<text>`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextShape {
    pub anchor: TextAnchor,
    pub content: Vec<TextContent>,
    pub attrs: Attributes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextContent {
    Run(String),
    Span(TextSpan),
}

/// `<tspan>`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextSpan {
    pub anchor: TextAnchor,
    pub content: Vec<TextContent>,
    pub attrs: Attributes,
}

/// An element carried through unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawElement {
    pub name: String,
    pub attrs: Attributes,
    pub children: Vec<RawNode>,
}

impl RawElement {
    /// This element's id and those of all its descendants
    pub fn ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(id) = self.attrs.get("id") {
            out.push(id);
        }
        for child in &self.children {
            if let RawNode::Element(el) = child {
                el.collect_ids(out);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawNode {
    Element(RawElement),
    Text(String),
}
