//! SVG text to [`VectorDocument`].
//!
//! XML well-formedness is all-or-nothing; below that, each primitive stands
//! alone. A primitive whose geometry cannot be read is dropped with a
//! [`Warning::MalformedPrimitive`] and its siblings are kept.

use glam::{DVec2, dvec2};
use roxmltree::{Node as XmlNode, ParsingOptions};

use super::{
    Attributed, Attributes, EllipseShape, Group, LineShape, Node, PathShape, PolyShape, Primitive,
    RawElement, RawNode, RectShape, SVG_NS, TEMPLATE_ELEMENTS, TextAnchor, TextContent, TextShape,
    TextSpan, VectorDocument, XLINK_NS,
};
use crate::errors::{DocumentError, PathError, Warning};
use crate::path::{PathData, parse_points};
use crate::transform::TransformList;
use crate::types::Opacity;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Root attributes recomputed on output
const FRAME_ATTRIBUTES: &[&str] = &["viewBox", "width", "height"];

/// Relative length units (font or viewport based); kept verbatim, never scaled
const FONT_RELATIVE_UNITS: &[&str] = &["em", "ex", "%"];

impl VectorDocument {
    /// Parse one SVG document. `name` labels the document in diagnostics.
    ///
    /// The source's own `viewBox`, `width` and `height` are discarded: the
    /// composite's frame is always derived from content.
    pub fn parse(name: &str, source: &str) -> Result<(VectorDocument, Vec<Warning>), DocumentError> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let xml = roxmltree::Document::parse_with_options(source, options).map_err(|source| {
            DocumentError::Xml {
                name: name.to_string(),
                source,
            }
        })?;

        let root = xml.root_element();
        if root.tag_name().name() != "svg" {
            return Err(DocumentError::NotSvg {
                name: name.to_string(),
                root: root.tag_name().name().to_string(),
            });
        }

        let mut loader = Loader {
            name,
            style: None,
            warnings: Vec::new(),
        };
        let document = loader.document(root);
        crate::log::debug!(
            document = name,
            groups = document.groups.len(),
            templates = document.templates.len(),
            warnings = loader.warnings.len(),
            "parsed document"
        );
        Ok((document, loader.warnings))
    }
}

struct Loader<'a> {
    name: &'a str,
    style: Option<String>,
    warnings: Vec<Warning>,
}

/// Why a primitive was dropped
struct Malformed {
    reason: String,
    cause: Option<PathError>,
}

impl Malformed {
    fn new(reason: impl Into<String>) -> Self {
        Malformed {
            reason: reason.into(),
            cause: None,
        }
    }
}

impl From<PathError> for Malformed {
    fn from(err: PathError) -> Self {
        Malformed {
            reason: err.to_string(),
            cause: Some(err),
        }
    }
}

impl Loader<'_> {
    fn document(&mut self, root: XmlNode<'_, '_>) -> VectorDocument {
        let mut doc = VectorDocument::new(self.name);
        doc.attrs = attributes(root)
            .iter()
            .filter(|(k, _)| !FRAME_ATTRIBUTES.contains(k))
            .collect();

        // Primitives directly under the root are wrapped so that every
        // drawable lives in a top-level group; consecutive ones share a group.
        let mut stray: Option<Group> = None;
        for child in root.children().filter(is_svg_element) {
            match self.node(child) {
                Some(Node::Group(group)) => {
                    doc.groups.extend(stray.take());
                    doc.groups.push(group);
                }
                Some(Node::Template(template)) => doc.templates.push(template),
                Some(node @ Node::Primitive(_)) => {
                    stray.get_or_insert_with(Group::new).children.push(node)
                }
                None => {}
            }
        }
        doc.groups.extend(stray);
        doc.style = self.style.take();
        doc
    }

    /// Convert one element. `None` when it was consumed (style) or dropped.
    fn node(&mut self, el: XmlNode<'_, '_>) -> Option<Node> {
        let tag = el.tag_name().name();
        match tag {
            "style" => {
                self.append_style(el);
                None
            }
            "g" => Some(Node::Group(self.group(el))),
            _ if TEMPLATE_ELEMENTS.contains(&tag) => Some(Node::Template(raw_element(el))),
            _ => self.primitive(el).map(Node::Primitive),
        }
    }

    fn group(&mut self, el: XmlNode<'_, '_>) -> Group {
        let mut group = Group::new();
        group.attrs = attributes(el);

        let opacity = group
            .attrs
            .get("opacity")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .and_then(|v| Opacity::try_new(v).ok());
        if let Some(opacity) = opacity {
            group.attrs.remove("opacity");
            group.opacity = Some(opacity);
        }

        // A group is never dropped; only its unreadable transform is
        let invalid = group
            .attrs
            .get("transform")
            .and_then(|raw| TransformList::parse(self.name, raw).err());
        if let Some(err) = invalid {
            let value = group.attrs.remove("transform").unwrap_or_default();
            self.warn(Warning::InvalidTransform {
                document: self.name.to_string(),
                element: "g".to_string(),
                value,
                causes: vec![err],
            });
        }

        for child in el.children().filter(is_svg_element) {
            if let Some(node) = self.node(child) {
                group.children.push(node);
            }
        }
        group
    }

    fn primitive(&mut self, el: XmlNode<'_, '_>) -> Option<Primitive> {
        let tag = el.tag_name().name();
        let mut attrs = attributes(el);
        let result = match tag {
            "path" => self.path(&mut attrs),
            "line" => line(&mut attrs),
            "polyline" | "polygon" => self.poly(&mut attrs, tag == "polygon"),
            "rect" => rect(&mut attrs),
            "circle" | "ellipse" => ellipse(&mut attrs, tag == "circle"),
            "text" => self.text(el, &mut attrs).map(|(anchor, content)| {
                Primitive::Text(TextShape {
                    anchor,
                    content,
                    attrs: Attributes::new(),
                })
            }),
            _ => {
                self.warn(Warning::UnsupportedElement {
                    document: self.name.to_string(),
                    element: tag.to_string(),
                });
                return None;
            }
        };

        let result = result.and_then(|primitive| match attrs.get("transform") {
            Some(raw) => TransformList::parse(self.name, raw)
                .map(|_| primitive)
                .map_err(Malformed::from),
            None => Ok(primitive),
        });

        match result {
            Ok(mut primitive) => {
                *primitive.attrs_mut() = attrs;
                Some(primitive)
            }
            Err(Malformed { reason, cause }) => {
                self.warn(Warning::MalformedPrimitive {
                    document: self.name.to_string(),
                    element: tag.to_string(),
                    id: el.attribute("id").map(str::to_string),
                    reason,
                    causes: cause.into_iter().collect(),
                });
                None
            }
        }
    }

    fn path(&self, attrs: &mut Attributes) -> Result<Primitive, Malformed> {
        let d = attrs.remove("d").unwrap_or_default();
        let data = PathData::parse(self.name, &d)?;
        Ok(Primitive::Path(PathShape {
            data,
            attrs: Attributes::new(),
        }))
    }

    fn poly(&self, attrs: &mut Attributes, closed: bool) -> Result<Primitive, Malformed> {
        let raw = attrs.remove("points").unwrap_or_default();
        let points = parse_points(self.name, &raw)?;
        Ok(Primitive::Poly(PolyShape {
            closed,
            points,
            attrs: Attributes::new(),
        }))
    }

    /// Anchor and content of a `<text>` or `<tspan>`
    fn text(
        &mut self,
        el: XmlNode<'_, '_>,
        attrs: &mut Attributes,
    ) -> Result<(TextAnchor, Vec<TextContent>), Malformed> {
        let anchor = TextAnchor {
            x: take_text_length(attrs, "x")?,
            y: take_text_length(attrs, "y")?,
            dx: take_text_length(attrs, "dx")?,
            dy: take_text_length(attrs, "dy")?,
        };

        let mut content = Vec::new();
        for child in el.children() {
            if child.is_text() {
                if let Some(text) = child.text() {
                    content.push(TextContent::Run(text.to_string()));
                }
            } else if is_svg_element(&child) && child.tag_name().name() == "tspan" {
                let mut span_attrs = attributes(child);
                let (anchor, span_content) = self.text(child, &mut span_attrs)?;
                content.push(TextContent::Span(TextSpan {
                    anchor,
                    content: span_content,
                    attrs: span_attrs,
                }));
            } else if child.is_element() {
                self.warn(Warning::UnsupportedElement {
                    document: self.name.to_string(),
                    element: child.tag_name().name().to_string(),
                });
            }
        }
        Ok((anchor, content))
    }

    fn append_style(&mut self, el: XmlNode<'_, '_>) {
        let text: String = el
            .children()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect();
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        match &mut self.style {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(text);
            }
            None => self.style = Some(text.to_string()),
        }
    }

    fn warn(&mut self, warning: Warning) {
        crate::log::warn!(document = self.name, kind = warning.kind(), "{}", warning);
        self.warnings.push(warning);
    }
}

fn line(attrs: &mut Attributes) -> Result<Primitive, Malformed> {
    let from = dvec2(
        take_length(attrs, "x1")?.unwrap_or(0.0),
        take_length(attrs, "y1")?.unwrap_or(0.0),
    );
    let to = dvec2(
        take_length(attrs, "x2")?.unwrap_or(0.0),
        take_length(attrs, "y2")?.unwrap_or(0.0),
    );
    Ok(Primitive::Line(LineShape {
        from,
        to,
        attrs: Attributes::new(),
    }))
}

fn rect(attrs: &mut Attributes) -> Result<Primitive, Malformed> {
    let origin = dvec2(
        take_length(attrs, "x")?.unwrap_or(0.0),
        take_length(attrs, "y")?.unwrap_or(0.0),
    );
    let size = dvec2(
        take_non_negative(attrs, "width")?.unwrap_or(0.0),
        take_non_negative(attrs, "height")?.unwrap_or(0.0),
    );
    Ok(Primitive::Rect(RectShape {
        origin,
        size,
        rx: take_non_negative(attrs, "rx")?,
        ry: take_non_negative(attrs, "ry")?,
        attrs: Attributes::new(),
    }))
}

fn ellipse(attrs: &mut Attributes, circle: bool) -> Result<Primitive, Malformed> {
    let center = dvec2(
        take_length(attrs, "cx")?.unwrap_or(0.0),
        take_length(attrs, "cy")?.unwrap_or(0.0),
    );
    let radii = if circle {
        DVec2::splat(take_non_negative(attrs, "r")?.unwrap_or(0.0))
    } else {
        dvec2(
            take_non_negative(attrs, "rx")?.unwrap_or(0.0),
            take_non_negative(attrs, "ry")?.unwrap_or(0.0),
        )
    };
    Ok(Primitive::Ellipse(EllipseShape {
        circle,
        center,
        radii,
        attrs: Attributes::new(),
    }))
}

/// Remove and parse a single user-unit length (`12`, `-3.5e1`, `4px`)
fn take_length(attrs: &mut Attributes, name: &str) -> Result<Option<f64>, Malformed> {
    let Some(raw) = attrs.remove(name) else {
        return Ok(None);
    };
    parse_length(&raw)
        .map(Some)
        .ok_or_else(|| Malformed::new(format!("invalid {} {:?}", name, raw)))
}

/// Like [`take_length`], but a font-relative value (`1.2em`) stays in
/// `attrs` as written and takes no part in the anchor
fn take_text_length(attrs: &mut Attributes, name: &str) -> Result<Option<f64>, Malformed> {
    match attrs.get(name) {
        Some(raw) if is_font_relative(raw) => Ok(None),
        _ => take_length(attrs, name),
    }
}

fn is_font_relative(raw: &str) -> bool {
    let raw = raw.trim();
    FONT_RELATIVE_UNITS.iter().any(|unit| {
        raw.strip_suffix(unit)
            .is_some_and(|number| number.trim().parse::<f64>().is_ok_and(f64::is_finite))
    })
}

fn take_non_negative(attrs: &mut Attributes, name: &str) -> Result<Option<f64>, Malformed> {
    match take_length(attrs, name)? {
        Some(v) if v < 0.0 => Err(Malformed::new(format!("negative {} {}", name, v))),
        other => Ok(other),
    }
}

fn parse_length(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let raw = raw.strip_suffix("px").unwrap_or(raw);
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn is_svg_element(node: &XmlNode<'_, '_>) -> bool {
    node.is_element() && matches!(node.tag_name().namespace(), None | Some(SVG_NS))
}

/// Attributes in source order. `xlink:` and `xml:` names keep their prefix;
/// attributes from other foreign namespaces are dropped.
fn attributes(el: XmlNode<'_, '_>) -> Attributes {
    el.attributes()
        .filter_map(|a| {
            let name = match a.namespace() {
                None => a.name().to_string(),
                Some(XLINK_NS) => format!("xlink:{}", a.name()),
                Some(XML_NS) => format!("xml:{}", a.name()),
                Some(_) => return None,
            };
            Some((name, a.value().to_string()))
        })
        .collect()
}

fn raw_element(el: XmlNode<'_, '_>) -> RawElement {
    let children = el
        .children()
        .filter_map(|child| {
            if child.is_text() {
                child
                    .text()
                    .filter(|t| !t.trim().is_empty())
                    .map(|t| RawNode::Text(t.to_string()))
            } else if is_svg_element(&child) {
                Some(RawNode::Element(raw_element(child)))
            } else {
                None
            }
        })
        .collect();
    RawElement {
        name: el.tag_name().name().to_string(),
        attrs: attributes(el),
        children,
    }
}
