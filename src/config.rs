//! Run configuration: explicit options for the compositor and the JSON
//! manifest the CLI reads them from.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::defaults;
use crate::errors::ConfigError;
use crate::export::{ExportRequest, Exporter};
use crate::layer::LayerSpec;
use crate::style::{Color, LayerStyle, parse_dash};
use crate::types::{Opacity, ScaleFactor};

/// Everything a composition run needs besides its layers
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeOptions {
    pub scale: ScaleFactor,
    pub stylesheet: PathBuf,
    pub output: PathBuf,
    pub padding_ratio: f64,
    pub max_canvas: u32,
}

impl ComposeOptions {
    pub fn new(scale: ScaleFactor, stylesheet: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        ComposeOptions {
            scale,
            stylesheet: stylesheet.into(),
            output: output.into(),
            padding_ratio: defaults::PADDING_RATIO,
            max_canvas: defaults::MAX_CANVAS,
        }
    }

    pub fn with_scale(mut self, scale: ScaleFactor) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_padding_ratio(mut self, ratio: f64) -> Self {
        self.padding_ratio = ratio;
        self
    }

    pub fn with_max_canvas(mut self, max: u32) -> Self {
        self.max_canvas = max;
        self
    }
}

/// A drawing scale as written in the manifest: `20` or `"1/50"`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScaleValue {
    Number(f64),
    Text(String),
}

impl ScaleValue {
    pub fn resolve(&self) -> Result<ScaleFactor, ConfigError> {
        match self {
            ScaleValue::Number(v) => {
                ScaleFactor::try_new(*v).map_err(|source| ConfigError::InvalidScale {
                    value: v.to_string(),
                    source,
                })
            }
            ScaleValue::Text(s) => s.parse().map_err(|source| ConfigError::InvalidScale {
                value: s.clone(),
                source,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerExport {
    pub model: PathBuf,
    pub section_height: f64,
    pub include: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerEntry {
    pub name: String,
    /// The layer's SVG; also where its export job writes
    pub source: PathBuf,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub stroke: Option<String>,
    #[serde(default)]
    pub stroke_width: Option<f64>,
    #[serde(default)]
    pub fill: Option<String>,
    #[serde(default)]
    pub dash: Option<String>,
    #[serde(default)]
    pub ceiling: bool,
    #[serde(default)]
    pub export: Option<LayerExport>,
}

fn default_opacity() -> f64 {
    1.0
}

/// A run description, as read from JSON
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub scale: ScaleValue,
    pub stylesheet: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub padding_ratio: Option<f64>,
    #[serde(default)]
    pub max_canvas: Option<u32>,
    #[serde(default)]
    pub exporter: Option<ExporterConfig>,
    pub layers: Vec<LayerEntry>,
}

/// What a manifest resolves to
pub type Run = (ComposeOptions, Vec<LayerSpec>, Vec<(Exporter, ExportRequest)>);

impl Manifest {
    /// Read a manifest file. Relative paths inside it are kept as written;
    /// [`Manifest::into_run`] resolves them.
    pub fn load(path: &Path) -> Result<Manifest, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Manifest::from_json(&text, path)
    }

    /// Parse manifest JSON; `path` names it in errors
    pub fn from_json(text: &str, path: &Path) -> Result<Manifest, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate and resolve into compositor options, layer specs and export
    /// jobs. Relative paths are taken relative to `base_dir`.
    pub fn into_run(self, base_dir: &Path) -> Result<Run, ConfigError> {
        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base_dir.join(p)
            }
        };

        let mut options = ComposeOptions::new(
            self.scale.resolve()?,
            resolve(&self.stylesheet),
            resolve(&self.output),
        );
        if let Some(ratio) = self.padding_ratio {
            if !ratio.is_finite() || ratio < 0.0 {
                return Err(ConfigError::InvalidSetting {
                    setting: "padding_ratio".into(),
                    value: ratio.to_string(),
                });
            }
            options = options.with_padding_ratio(ratio);
        }
        if let Some(max) = self.max_canvas {
            if max == 0 {
                return Err(ConfigError::InvalidSetting {
                    setting: "max_canvas".into(),
                    value: max.to_string(),
                });
            }
            options = options.with_max_canvas(max);
        }

        let exporter = self.exporter.map(|e| {
            Exporter::new(resolve(&e.program)).with_args(e.args)
        });

        let mut layers = Vec::with_capacity(self.layers.len());
        let mut exports = Vec::new();
        for entry in self.layers {
            let source = resolve(&entry.source);
            if let Some(job) = &entry.export {
                let Some(exporter) = &exporter else {
                    return Err(ConfigError::MissingExporter { layer: entry.name });
                };
                let request = ExportRequest::new(
                    entry.name.clone(),
                    resolve(&job.model),
                    job.section_height,
                    job.include.clone(),
                    source.clone(),
                )?;
                exports.push((exporter.clone(), request));
            }
            let style = layer_style(&entry)?;
            layers.push(LayerSpec::from_file(entry.name, source, style));
        }
        Ok((options, layers, exports))
    }
}

fn layer_style(entry: &LayerEntry) -> Result<LayerStyle, ConfigError> {
    let opacity = Opacity::try_new(entry.opacity).map_err(|source| ConfigError::InvalidOpacity {
        layer: entry.name.clone(),
        value: entry.opacity,
        source,
    })?;
    let mut style = LayerStyle::new(opacity).ceiling(entry.ceiling);

    let color = |value: &str| {
        value.parse::<Color>().map_err(|_| ConfigError::InvalidColor {
            layer: entry.name.clone(),
            value: value.to_string(),
        })
    };
    if let Some(stroke) = &entry.stroke {
        style = style.with_stroke(color(stroke)?);
    }
    if let Some(fill) = &entry.fill {
        style = style.with_fill(color(fill)?);
    }
    if let Some(width) = entry.stroke_width {
        if !width.is_finite() || width < 0.0 {
            return Err(ConfigError::InvalidStrokeWidth {
                layer: entry.name.clone(),
                value: width,
            });
        }
        style = style.with_stroke_width(width);
    }
    if let Some(dash) = &entry.dash {
        let pattern = parse_dash(dash).ok_or_else(|| ConfigError::InvalidDash {
            layer: entry.name.clone(),
            value: dash.clone(),
        })?;
        style = style.with_dash(pattern);
    }
    Ok(style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerSource;

    const MANIFEST: &str = r##"{
        "scale": "1/50",
        "stylesheet": "styles/plan.css",
        "output": "/srv/out/plan.svg",
        "max_canvas": 4096,
        "exporter": { "program": "bin/IfcConvert", "args": ["--plan"] },
        "layers": [
            { "name": "architecture", "source": "arch.svg", "opacity": 0.4 },
            {
                "name": "structure",
                "source": "struct.svg",
                "stroke": "#333",
                "stroke_width": 0.5,
                "export": { "model": "model.ifc", "section_height": 1.2, "include": ["IfcWall", "IfcColumn"] }
            },
            { "name": "ceiling", "source": "ceil.svg", "ceiling": true }
        ]
    }"##;

    fn parse(text: &str) -> Result<Run, ConfigError> {
        Manifest::from_json(text, Path::new("plan.json"))?.into_run(Path::new("/work"))
    }

    #[test]
    fn resolves_manifest() {
        let (options, layers, exports) = parse(MANIFEST).unwrap();
        assert_eq!(options.scale.raw(), 0.02);
        assert_eq!(options.stylesheet, PathBuf::from("/work/styles/plan.css"));
        assert_eq!(options.output, PathBuf::from("/srv/out/plan.svg"));
        assert_eq!(options.padding_ratio, defaults::PADDING_RATIO);
        assert_eq!(options.max_canvas, 4096);

        let names: Vec<_> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["architecture", "structure", "ceiling"]);
        assert!(matches!(&layers[0].source, LayerSource::File(p) if p == Path::new("/work/arch.svg")));
        assert_eq!(layers[0].style.opacity.raw(), 0.4);
        assert_eq!(layers[1].style.opacity, Opacity::OPAQUE);
        assert_eq!(layers[1].style.stroke_width, Some(0.5));
        assert_eq!(layers[2].style.effective_dash(), Some(vec![6.0, 3.0]));

        assert_eq!(exports.len(), 1);
        let (exporter, request) = &exports[0];
        assert_eq!(request.layer(), "structure");
        assert_eq!(request.output(), Path::new("/work/struct.svg"));
        assert_eq!(request.model(), Path::new("/work/model.ifc"));
        assert_eq!(exporter, &Exporter::new("/work/bin/IfcConvert").with_args(vec!["--plan".into()]));
    }

    #[test]
    fn numeric_scale() {
        let text = r#"{ "scale": 20, "stylesheet": "a.css", "output": "o.svg", "layers": [] }"#;
        let (options, layers, _) = parse(text).unwrap();
        assert_eq!(options.scale.raw(), 20.0);
        assert!(layers.is_empty());
    }

    #[test]
    fn invalid_values_are_reported() {
        let bad_scale = r#"{ "scale": "0/5", "stylesheet": "a.css", "output": "o.svg", "layers": [] }"#;
        assert!(matches!(parse(bad_scale), Err(ConfigError::InvalidScale { .. })));

        let bad_opacity = r#"{ "scale": 1, "stylesheet": "a.css", "output": "o.svg",
            "layers": [{ "name": "a", "source": "a.svg", "opacity": 1.5 }] }"#;
        assert!(matches!(parse(bad_opacity), Err(ConfigError::InvalidOpacity { .. })));

        let bad_color = r##"{ "scale": 1, "stylesheet": "a.css", "output": "o.svg",
            "layers": [{ "name": "a", "source": "a.svg", "stroke": "#12" }] }"##;
        assert!(matches!(parse(bad_color), Err(ConfigError::InvalidColor { .. })));

        let empty_include = r#"{ "scale": 1, "stylesheet": "a.css", "output": "o.svg",
            "exporter": { "program": "x" },
            "layers": [{ "name": "a", "source": "a.svg",
                "export": { "model": "m.ifc", "section_height": 1, "include": [] } }] }"#;
        assert!(matches!(parse(empty_include), Err(ConfigError::Export(_))));

        let no_exporter = r#"{ "scale": 1, "stylesheet": "a.css", "output": "o.svg",
            "layers": [{ "name": "a", "source": "a.svg",
                "export": { "model": "m.ifc", "section_height": 1, "include": ["IfcWall"] } }] }"#;
        assert!(matches!(parse(no_exporter), Err(ConfigError::MissingExporter { .. })));

        let unknown_field = r#"{ "scale": 1, "stylesheet": "a.css", "output": "o.svg", "layers": [], "colour": 1 }"#;
        assert!(matches!(parse(unknown_field), Err(ConfigError::Json { .. })));
    }

    #[test]
    fn load_names_missing_manifest() {
        let err = Manifest::load(Path::new("/nonexistent/plan.json")).unwrap_err();
        assert_eq!(err.to_string(), "cannot read manifest /nonexistent/plan.json");
    }
}
