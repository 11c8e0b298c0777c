//! Per-layer presentation: colors, stroke and dash policy.

use std::fmt;
use std::str::FromStr;

use crate::defaults;
use crate::svg::write::fmt_num;
use crate::types::Opacity;

/// A color value
#[derive(Debug, Clone, PartialEq)]
pub enum Color {
    /// No paint
    None,
    Rgb { r: u8, g: u8, b: u8 },
    /// A CSS color keyword passed through as written
    Named(String),
}

impl FromStr for Color {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") {
            return Ok(Color::None);
        }

        if let Some(inner) = s.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
            let parts: Vec<&str> = inner.split(',').collect();
            if let [r, g, b] = parts[..] {
                if let (Ok(r), Ok(g), Ok(b)) = (
                    r.trim().parse::<u8>(),
                    g.trim().parse::<u8>(),
                    b.trim().parse::<u8>(),
                ) {
                    return Ok(Color::Rgb { r, g, b });
                }
            }
            return Err(());
        }

        if let Some(hex) = s.strip_prefix('#') {
            if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(());
            }
            let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16);
            return match hex.len() {
                6 => match (channel(0..2), channel(2..4), channel(4..6)) {
                    (Ok(r), Ok(g), Ok(b)) => Ok(Color::Rgb { r, g, b }),
                    _ => Err(()),
                },
                // #abc -> #aabbcc
                3 => match (channel(0..1), channel(1..2), channel(2..3)) {
                    (Ok(r), Ok(g), Ok(b)) => Ok(Color::Rgb {
                        r: r * 17,
                        g: g * 17,
                        b: b * 17,
                    }),
                    _ => Err(()),
                },
                _ => Err(()),
            };
        }

        if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) {
            return Ok(Color::Named(s.to_ascii_lowercase()));
        }
        Err(())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::None => write!(f, "none"),
            Color::Rgb { r, g, b } => write!(f, "#{:02x}{:02x}{:02x}", r, g, b),
            Color::Named(n) => write!(f, "{}", n),
        }
    }
}

/// Stroke/fill policy applied to a layer's top-level groups
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerStyle {
    pub opacity: Opacity,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f64>,
    pub fill: Option<Color>,
    /// Explicit dash pattern; overrides the ceiling default
    pub dash: Option<Vec<f64>>,
    /// Ceiling-level layers (soffits, bulkheads, overhead services) are dashed
    pub ceiling: bool,
}

impl LayerStyle {
    pub fn new(opacity: Opacity) -> Self {
        LayerStyle {
            opacity,
            ..Default::default()
        }
    }

    pub fn with_stroke(mut self, color: Color) -> Self {
        self.stroke = Some(color);
        self
    }

    pub fn with_stroke_width(mut self, width: f64) -> Self {
        self.stroke_width = Some(width);
        self
    }

    pub fn with_fill(mut self, color: Color) -> Self {
        self.fill = Some(color);
        self
    }

    pub fn with_dash(mut self, dash: Vec<f64>) -> Self {
        self.dash = Some(dash);
        self
    }

    pub fn ceiling(mut self, ceiling: bool) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn effective_dash(&self) -> Option<Vec<f64>> {
        match &self.dash {
            Some(dash) => Some(dash.clone()),
            None if self.ceiling => Some(defaults::CEILING_DASH.to_vec()),
            None => None,
        }
    }

    /// Presentation attributes this style sets on a group
    pub fn presentation_attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs = Vec::new();
        if let Some(stroke) = &self.stroke {
            attrs.push(("stroke", stroke.to_string()));
        }
        if let Some(width) = self.stroke_width {
            attrs.push(("stroke-width", fmt_num(width)));
        }
        if let Some(fill) = &self.fill {
            attrs.push(("fill", fill.to_string()));
        }
        if let Some(dash) = self.effective_dash() {
            let dash: Vec<String> = dash.into_iter().map(fmt_num).collect();
            attrs.push(("stroke-dasharray", dash.join(" ")));
        }
        attrs
    }
}

/// Parse a dash pattern such as `6 3` or `4,2,1,2`
pub fn parse_dash(s: &str) -> Option<Vec<f64>> {
    let values: Option<Vec<f64>> = s
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0))
        .collect();
    values.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_color_forms() {
        assert_eq!(
            "rgb(255,128,64)".parse::<Color>(),
            Ok(Color::Rgb {
                r: 255,
                g: 128,
                b: 64
            })
        );
        assert_eq!("#fff".parse::<Color>(), Ok(Color::Rgb { r: 255, g: 255, b: 255 }));
        assert_eq!("#1a2B3c".parse::<Color>().unwrap().to_string(), "#1a2b3c");
        assert_eq!("None".parse::<Color>(), Ok(Color::None));
        assert_eq!(
            "SteelBlue".parse::<Color>(),
            Ok(Color::Named("steelblue".to_string()))
        );
    }

    #[test]
    fn reject_bad_colors() {
        assert!("#ggg".parse::<Color>().is_err());
        assert!("#1234".parse::<Color>().is_err());
        assert!("rgb(1,2)".parse::<Color>().is_err());
        assert!("rgb(1,2,300)".parse::<Color>().is_err());
        assert!("red; x".parse::<Color>().is_err());
        assert!("".parse::<Color>().is_err());
    }

    #[test]
    fn ceiling_layers_get_default_dash() {
        let style = LayerStyle::new(Opacity::OPAQUE).ceiling(true);
        assert_eq!(
            style.presentation_attributes(),
            vec![("stroke-dasharray", "6 3".to_string())]
        );

        let explicit = style.with_dash(vec![2.0, 1.5]);
        assert_eq!(explicit.effective_dash(), Some(vec![2.0, 1.5]));
    }

    #[test]
    fn presentation_attribute_order() {
        let style = LayerStyle::new(Opacity::OPAQUE)
            .with_fill(Color::None)
            .with_stroke_width(0.5)
            .with_stroke(Color::Rgb { r: 0, g: 0, b: 0 });
        let names: Vec<_> = style
            .presentation_attributes()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(names, vec!["stroke", "stroke-width", "fill"]);
    }

    #[test]
    fn dash_patterns() {
        assert_eq!(parse_dash("6 3"), Some(vec![6.0, 3.0]));
        assert_eq!(parse_dash("4,2, 1"), Some(vec![4.0, 2.0, 1.0]));
        assert_eq!(parse_dash(""), None);
        assert_eq!(parse_dash("4 -1"), None);
    }
}
