//! Multi-layer floor-plan compositor.
//!
//! Takes one SVG per building discipline, as emitted by a geometry exporter
//! in raw model units, and produces a single coordinated drawing: every layer
//! scaled uniformly, tagged with a semantic class, merged back to front,
//! styled from one external stylesheet and framed by a viewport computed from
//! the merged content.
//!
//! ```no_run
//! use plancomp::{ComposeOptions, Compositor, LayerSpec, LayerStyle, Opacity, ScaleFactor};
//!
//! let options = ComposeOptions::new(ScaleFactor::try_new(20.0)?, "plan.css", "out/plan.svg");
//! let layers = vec![
//!     LayerSpec::from_file("architecture", "arch.svg", LayerStyle::new(Opacity::try_new(0.4)?)),
//!     LayerSpec::from_file("spaces", "spaces.svg", LayerStyle::default()),
//! ];
//! let composite = Compositor::new(options).run(layers)?;
//! for warning in &composite.warnings {
//!     eprintln!("{}", warning);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod defaults;
pub mod errors;
pub mod export;
pub mod layer;
pub mod log;
pub mod merge;
pub mod path;
pub mod pipeline;
pub mod scale;
pub mod style;
pub mod stylesheet;
pub mod svg;
pub mod text;
pub mod transform;
pub mod types;
pub mod viewport;

pub use config::{ComposeOptions, Manifest};
pub use errors::{ComposeError, ConfigError, DocumentError, ExportError, LoadError, PathError, Warning};
pub use export::{ExportRequest, Exporter};
pub use layer::{LayerSource, LayerSpec};
pub use pipeline::{Composite, Compositor};
pub use style::{Color, LayerStyle};
pub use svg::VectorDocument;
pub use types::{Frame, Opacity, ScaleFactor};
