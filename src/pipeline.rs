//! The composition pipeline: merge, style, frame, normalize, write.

use crate::config::ComposeOptions;
use crate::errors::{ComposeError, Warning};
use crate::layer::LayerSpec;
use crate::merge::{Merged, MergedLayer, merge_layers};
use crate::stylesheet::Stylesheet;
use crate::svg::VectorDocument;
use crate::text::normalize_text;
use crate::viewport::fit_document;

/// The result of a successful run
#[derive(Debug)]
pub struct Composite {
    pub document: VectorDocument,
    /// Layers that made it in, back to front
    pub layers: Vec<MergedLayer>,
    /// Recoverable problems, in pipeline order
    pub warnings: Vec<Warning>,
}

impl Composite {
    pub fn to_svg_string(&self) -> String {
        self.document.to_svg_string()
    }
}

/// Runs compositions with one fixed set of options.
///
/// Nothing is read from the environment: every path and setting comes from
/// the [`ComposeOptions`] given here.
#[derive(Debug, Clone)]
pub struct Compositor {
    options: ComposeOptions,
}

impl Compositor {
    pub fn new(options: ComposeOptions) -> Self {
        Compositor { options }
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    /// Build the composite document in memory.
    ///
    /// Layers are given back to front. Fails when no layer is usable or the
    /// stylesheet cannot be read.
    pub fn compose(&self, layers: Vec<LayerSpec>) -> Result<Composite, ComposeError> {
        let Merged {
            mut document,
            layers,
            mut warnings,
        } = merge_layers(layers, self.options.scale)?;

        let stylesheet = Stylesheet::load(&self.options.stylesheet)?;
        stylesheet.inject(&mut document);
        for warning in stylesheet.unstyled(layers.iter().map(|l| l.class.as_str())) {
            record(&mut warnings, warning);
        }

        if let Some(warning) = fit_document(&mut document, self.options.padding_ratio, self.options.max_canvas) {
            record(&mut warnings, warning);
        }
        normalize_text(&mut document);

        document.name = self.options.output.display().to_string();
        Ok(Composite {
            document,
            layers,
            warnings,
        })
    }

    /// Compose and write the result to the configured output path.
    /// Nothing is written when composition fails.
    pub fn run(&self, layers: Vec<LayerSpec>) -> Result<Composite, ComposeError> {
        let composite = self.compose(layers)?;
        let output = &self.options.output;
        let write_error = |source: std::io::Error| ComposeError::Write {
            path: output.clone(),
            source,
        };

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(output, composite.to_svg_string()).map_err(write_error)?;

        crate::log::info!(
            output = %output.display(),
            layers = composite.layers.len(),
            warnings = composite.warnings.len(),
            "wrote composite"
        );
        Ok(composite)
    }
}

fn record(warnings: &mut Vec<Warning>, warning: Warning) {
    crate::log::warn!(kind = warning.kind(), "{}", warning);
    warnings.push(warning);
}
