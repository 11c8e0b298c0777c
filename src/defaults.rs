//! Default settings for a composition run

/// Padding added on each side of the content box, as a fraction of its span
pub const PADDING_RATIO: f64 = 0.1;
/// Longest canvas side in output pixels
pub const MAX_CANVAS: u32 = 2048;
/// Dash pattern for ceiling-level layers without an explicit one
pub const CEILING_DASH: &[f64] = &[6.0, 3.0];
/// Appended to a layer name to form its class
pub const LAYER_CLASS_SUFFIX: &str = "-layer";
