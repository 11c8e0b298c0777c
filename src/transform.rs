//! SVG `transform` lists.
//!
//! Geometry is scaled about the origin, so a transform sitting above scaled
//! geometry is conjugated by the same factor: translations and rotation
//! centers scale, angles and scale and skew factors stay as they are.

use std::fmt;

use glam::{DAffine2, DVec2, dvec2};
use pest::Parser;

use crate::errors::PathError;
use crate::path::{PathDataParser, Reader, Rule, syntax_error};
use crate::svg::write::fmt_num;
use crate::types::ScaleFactor;

/// One transform function. Angles are in degrees, as written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// `matrix(a b c d e f)`
    Matrix([f64; 6]),
    Translate(DVec2),
    Scale(DVec2),
    Rotate { angle: f64, center: DVec2 },
    SkewX(f64),
    SkewY(f64),
}

impl Transform {
    /// The same transform expressed for geometry scaled by `s`
    pub fn scaled(&self, s: ScaleFactor) -> Transform {
        match *self {
            Transform::Matrix([a, b, c, d, e, f]) => {
                Transform::Matrix([a, b, c, d, s.length(e), s.length(f)])
            }
            Transform::Translate(t) => Transform::Translate(s.point(t)),
            Transform::Rotate { angle, center } => Transform::Rotate {
                angle,
                center: s.point(center),
            },
            other @ (Transform::Scale(_) | Transform::SkewX(_) | Transform::SkewY(_)) => other,
        }
    }

    pub fn to_affine(&self) -> DAffine2 {
        match *self {
            Transform::Matrix(m) => DAffine2::from_cols_array(&m),
            Transform::Translate(t) => DAffine2::from_translation(t),
            Transform::Scale(v) => DAffine2::from_scale(v),
            Transform::Rotate { angle, center } => {
                DAffine2::from_translation(center)
                    * DAffine2::from_angle(angle.to_radians())
                    * DAffine2::from_translation(-center)
            }
            Transform::SkewX(a) => {
                DAffine2::from_cols_array(&[1.0, 0.0, a.to_radians().tan(), 1.0, 0.0, 0.0])
            }
            Transform::SkewY(a) => {
                DAffine2::from_cols_array(&[1.0, a.to_radians().tan(), 0.0, 1.0, 0.0, 0.0])
            }
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, args): (&str, Vec<f64>) = match *self {
            Transform::Matrix(m) => ("matrix", m.to_vec()),
            Transform::Translate(t) => ("translate", vec![t.x, t.y]),
            Transform::Scale(v) => ("scale", vec![v.x, v.y]),
            Transform::Rotate { angle, center } if center == DVec2::ZERO => ("rotate", vec![angle]),
            Transform::Rotate { angle, center } => ("rotate", vec![angle, center.x, center.y]),
            Transform::SkewX(a) => ("skewX", vec![a]),
            Transform::SkewY(a) => ("skewY", vec![a]),
        };
        let args: Vec<String> = args.into_iter().map(fmt_num).collect();
        write!(f, "{}({})", name, args.join(" "))
    }
}

/// A `transform` attribute value, applied left to right
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformList(Vec<Transform>);

impl TransformList {
    /// Parse a transform list. `name` labels the source in diagnostics.
    pub fn parse(name: &str, data: &str) -> Result<TransformList, PathError> {
        let pairs = PathDataParser::parse(Rule::transform_list, data)
            .map_err(|e| syntax_error(name, data, e))?;
        let reader = Reader { name, data };

        let mut transforms = Vec::new();
        for pair in pairs.flatten().filter(|p| p.as_rule() == Rule::transform) {
            let span = pair.as_span();
            let mut inner = pair.into_inner();
            let function = inner.next().map(|p| p.as_str()).unwrap_or_default();
            let args = inner
                .map(|p| reader.number(p))
                .collect::<Result<Vec<f64>, _>>()?;

            let transform = match (function, &args[..]) {
                ("matrix", &[a, b, c, d, e, f]) => Transform::Matrix([a, b, c, d, e, f]),
                ("translate", &[x]) => Transform::Translate(dvec2(x, 0.0)),
                ("translate", &[x, y]) => Transform::Translate(dvec2(x, y)),
                ("scale", &[k]) => Transform::Scale(DVec2::splat(k)),
                ("scale", &[x, y]) => Transform::Scale(dvec2(x, y)),
                ("rotate", &[angle]) => Transform::Rotate {
                    angle,
                    center: DVec2::ZERO,
                },
                ("rotate", &[angle, cx, cy]) => Transform::Rotate {
                    angle,
                    center: dvec2(cx, cy),
                },
                ("skewX", &[a]) => Transform::SkewX(a),
                ("skewY", &[a]) => Transform::SkewY(a),
                _ => return Err(reader.arity_error(span.start(), span.end())),
            };
            transforms.push(transform);
        }
        Ok(TransformList(transforms))
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn scaled(&self, s: ScaleFactor) -> TransformList {
        TransformList(self.0.iter().map(|t| t.scaled(s)).collect())
    }

    pub fn to_affine(&self) -> DAffine2 {
        self.0
            .iter()
            .fold(DAffine2::IDENTITY, |acc, t| acc * t.to_affine())
    }
}

impl fmt::Display for TransformList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, t) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", t)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &str) -> TransformList {
        TransformList::parse("<test>", data).unwrap()
    }

    fn close(a: DVec2, b: DVec2) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn parses_every_function() {
        let list = parse("matrix(1,0,0,1,5,6) translate(10) scale(2) rotate(90 5 5) skewX(0)skewY(0)");
        assert_eq!(
            list.to_string(),
            "matrix(1 0 0 1 5 6) translate(10 0) scale(2 2) rotate(90 5 5) skewX(0) skewY(0)"
        );
        assert!(parse("").is_empty());
    }

    #[test]
    fn wrong_arity_is_an_error() {
        let err = TransformList::parse("<test>", "rotate(45 5)").unwrap_err();
        assert!(matches!(err, PathError::Syntax { .. }), "{:?}", err);
        assert!(TransformList::parse("<test>", "spin(45)").is_err());
        assert!(TransformList::parse("<test>", "translate(10").is_err());
    }

    #[test]
    fn applies_left_to_right() {
        let m = parse("translate(10 0) scale(2)").to_affine();
        assert!(close(m.transform_point2(dvec2(1.0, 1.0)), dvec2(12.0, 2.0)));

        let r = parse("rotate(90 5 5)").to_affine();
        assert!(close(r.transform_point2(dvec2(10.0, 5.0)), dvec2(5.0, 10.0)));
    }

    #[test]
    fn scaling_conjugates_the_transform() {
        let s = ScaleFactor::try_new(20.0).unwrap();
        let list = parse("translate(10,0) rotate(30 1 2) scale(3) skewX(10)");
        let scaled = list.scaled(s);
        assert_eq!(
            scaled.to_string(),
            "translate(200 0) rotate(30 20 40) scale(3 3) skewX(10)"
        );

        // Transforming then scaling equals scaling then applying the scaled list
        let p = dvec2(1.5, -2.0);
        let expected = s.point(list.to_affine().transform_point2(p));
        let actual = scaled.to_affine().transform_point2(s.point(p));
        assert!(close(actual, expected), "{:?} != {:?}", actual, expected);
    }
}
