//! Strongly-typed numeric primitives for the compositor.
//!
//! - `ScaleFactor` is the only way a drawing scale enters the pipeline
//! - `BBox` accumulates content extents in document units
//! - `Frame` pairs a viewport with the canvas fitted to it, so the two are
//!   always set together

use std::fmt;
use std::str::FromStr;

use glam::{DVec2, dvec2};

/// Error type for invalid numeric values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericError {
    /// Value is NaN
    NaN,
    /// Value is infinite
    Infinite,
    /// Value is zero when non-zero required
    Zero,
    /// Value is negative when positive required
    Negative,
    /// Value lies outside the accepted closed range
    OutOfRange { min: f64, max: f64 },
    /// Text could not be read as a number
    Unparsable,
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericError::NaN => write!(f, "value is NaN"),
            NumericError::Infinite => write!(f, "value is infinite"),
            NumericError::Zero => write!(f, "value is zero"),
            NumericError::Negative => write!(f, "value is negative"),
            NumericError::OutOfRange { min, max } => {
                write!(f, "value is outside [{}, {}]", min, max)
            }
            NumericError::Unparsable => write!(f, "value is not a number"),
        }
    }
}

impl std::error::Error for NumericError {}

/// Uniform drawing scale applied to every length-bearing coordinate.
///
/// Always positive and finite.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct ScaleFactor(f64);

impl ScaleFactor {
    pub const IDENTITY: ScaleFactor = ScaleFactor(1.0);

    /// Create a scale factor with validation (rejects NaN, infinite, zero and negative)
    pub fn try_new(val: f64) -> Result<ScaleFactor, NumericError> {
        if val.is_nan() {
            Err(NumericError::NaN)
        } else if val.is_infinite() {
            Err(NumericError::Infinite)
        } else if val == 0.0 {
            Err(NumericError::Zero)
        } else if val < 0.0 {
            Err(NumericError::Negative)
        } else {
            Ok(ScaleFactor(val))
        }
    }

    /// Create a scale factor from a ratio such as `1/50`
    pub fn from_ratio(numerator: f64, denominator: f64) -> Result<ScaleFactor, NumericError> {
        if denominator == 0.0 {
            return Err(NumericError::Zero);
        }
        ScaleFactor::try_new(numerator / denominator)
    }

    /// The factor that undoes this one
    pub fn inverse(self) -> ScaleFactor {
        ScaleFactor(1.0 / self.0)
    }

    #[inline]
    pub fn raw(self) -> f64 {
        self.0
    }

    /// Scale a single length
    #[inline]
    pub fn length(self, v: f64) -> f64 {
        v * self.0
    }

    /// Scale a point about the origin
    #[inline]
    pub fn point(self, p: DVec2) -> DVec2 {
        p * self.0
    }
}

impl FromStr for ScaleFactor {
    type Err = NumericError;

    /// Accepts a decimal (`20`, `0.02`) or a ratio (`1/50`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((num, den)) = s.split_once('/') {
            let num: f64 = num.trim().parse().map_err(|_| NumericError::Unparsable)?;
            let den: f64 = den.trim().parse().map_err(|_| NumericError::Unparsable)?;
            return ScaleFactor::from_ratio(num, den);
        }
        let v: f64 = s.parse().map_err(|_| NumericError::Unparsable)?;
        ScaleFactor::try_new(v)
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opacity in [0, 1]
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Opacity(f64);

impl Opacity {
    pub const OPAQUE: Opacity = Opacity(1.0);

    pub fn try_new(val: f64) -> Result<Opacity, NumericError> {
        if val.is_nan() {
            Err(NumericError::NaN)
        } else if !(0.0..=1.0).contains(&val) {
            Err(NumericError::OutOfRange { min: 0.0, max: 1.0 })
        } else {
            Ok(Opacity(val))
        }
    }

    #[inline]
    pub fn raw(self) -> f64 {
        self.0
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Opacity::OPAQUE
    }
}

/// Axis-aligned bounding box over document-space points
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub min: DVec2,
    pub max: DVec2,
}

impl BBox {
    /// An empty box (min = +inf, max = -inf)
    pub fn new() -> Self {
        BBox {
            min: DVec2::splat(f64::INFINITY),
            max: DVec2::splat(f64::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn expand_point(&mut self, p: DVec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

impl Default for BBox {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<DVec2> for BBox {
    fn from_iter<I: IntoIterator<Item = DVec2>>(iter: I) -> Self {
        let mut bbox = BBox::new();
        for p in iter {
            bbox.expand_point(p);
        }
        bbox
    }
}

/// The `viewBox` rectangle in document units
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn origin(&self) -> DVec2 {
        dvec2(self.min_x, self.min_y)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// Output size in whole pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

/// A viewport together with the canvas fitted to it.
///
/// Only constructed by [`Frame::fit`], which keeps the canvas aspect ratio
/// equal to the viewport's up to pixel rounding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    viewport: Viewport,
    canvas: CanvasSize,
}

impl Frame {
    /// Fit the longer viewport axis to `max_dimension` pixels and scale the
    /// other axis to match. Returns `None` when the viewport has no area.
    pub fn fit(viewport: Viewport, max_dimension: u32) -> Option<Frame> {
        let valid = viewport.width.is_finite()
            && viewport.height.is_finite()
            && viewport.width > 0.0
            && viewport.height > 0.0
            && max_dimension > 0;
        if !valid {
            return None;
        }
        let max = max_dimension as f64;
        let (width, height) = if viewport.width >= viewport.height {
            (max, max * viewport.height / viewport.width)
        } else {
            (max * viewport.width / viewport.height, max)
        };
        let canvas = CanvasSize {
            width: (width.round() as u32).max(1),
            height: (height.round() as u32).max(1),
        };
        Some(Frame { viewport, canvas })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_factor_rejects_non_positive() {
        assert_eq!(ScaleFactor::try_new(0.0), Err(NumericError::Zero));
        assert_eq!(ScaleFactor::try_new(-2.0), Err(NumericError::Negative));
        assert_eq!(ScaleFactor::try_new(f64::NAN), Err(NumericError::NaN));
        assert_eq!(ScaleFactor::try_new(f64::INFINITY), Err(NumericError::Infinite));
        assert!(ScaleFactor::try_new(20.0).is_ok());
    }

    #[test]
    fn scale_factor_parses_decimal_and_ratio() {
        assert_eq!("20".parse::<ScaleFactor>().unwrap().raw(), 20.0);
        assert_eq!(" 1/50 ".parse::<ScaleFactor>().unwrap().raw(), 0.02);
        assert_eq!("1/0".parse::<ScaleFactor>(), Err(NumericError::Zero));
        assert_eq!("abc".parse::<ScaleFactor>(), Err(NumericError::Unparsable));
    }

    #[test]
    fn inverse_undoes_scale() {
        let s = ScaleFactor::try_new(7.5).unwrap();
        let p = dvec2(3.0, -4.0);
        let back = s.inverse().point(s.point(p));
        assert!((back - p).length() < 1e-12);
    }

    #[test]
    fn opacity_range() {
        assert!(Opacity::try_new(0.0).is_ok());
        assert!(Opacity::try_new(1.0).is_ok());
        assert!(matches!(
            Opacity::try_new(1.5),
            Err(NumericError::OutOfRange { .. })
        ));
    }

    #[test]
    fn bbox_from_points() {
        let bbox: BBox = [dvec2(5.0, 1.0), dvec2(-1.0, 8.0)].into_iter().collect();
        assert_eq!(bbox.min, dvec2(-1.0, 1.0));
        assert_eq!(bbox.max, dvec2(5.0, 8.0));
        assert!(BBox::new().is_empty());
    }

    #[test]
    fn frame_fits_longer_axis() {
        let vp = Viewport {
            min_x: -30.0,
            min_y: -20.0,
            width: 360.0,
            height: 240.0,
        };
        let frame = Frame::fit(vp, 2048).unwrap();
        assert_eq!(frame.canvas(), CanvasSize { width: 2048, height: 1365 });

        let tall = Viewport {
            width: 100.0,
            height: 400.0,
            ..vp
        };
        let frame = Frame::fit(tall, 2048).unwrap();
        assert_eq!(frame.canvas(), CanvasSize { width: 512, height: 2048 });
    }

    #[test]
    fn frame_rejects_zero_area() {
        let vp = Viewport {
            min_x: 0.0,
            min_y: 0.0,
            width: 10.0,
            height: 0.0,
        };
        assert!(Frame::fit(vp, 2048).is_none());
    }
}
