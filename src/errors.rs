//! Error types with rich diagnostics using miette
//!
//! Fatal errors abort a composition run and name the resource at fault.
//! Recoverable conditions are [`Warning`]s, collected alongside the result.

use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::types::NumericError;

// ============================================================================
// Path Data Errors
// ============================================================================

/// Errors raised while tokenizing path data or point lists.
///
/// These carry the offending attribute value as source so the report points at
/// the exact character that broke the grammar.
#[derive(Error, Diagnostic, Debug)]
pub enum PathError {
    #[error("malformed path data: {message}")]
    #[diagnostic(code(plancomp::path::syntax))]
    Syntax {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("cannot continue here")]
        span: SourceSpan,
    },

    #[error("number out of range: {text}")]
    #[diagnostic(code(plancomp::path::number_out_of_range))]
    NumberOutOfRange {
        text: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("not a finite number")]
        span: SourceSpan,
    },
}

// ============================================================================
// Document Errors
// ============================================================================

/// Errors that make a whole source document unusable
#[derive(Error, Diagnostic, Debug)]
pub enum DocumentError {
    #[error("{name}: not well-formed XML")]
    #[diagnostic(code(plancomp::document::xml))]
    Xml {
        name: String,
        #[source]
        source: roxmltree::Error,
    },

    #[error("{name}: root element is <{root}>, expected <svg>")]
    #[diagnostic(code(plancomp::document::not_svg))]
    NotSvg { name: String, root: String },
}

/// Errors loading one layer's source document
#[derive(Error, Diagnostic, Debug)]
pub enum LoadError {
    #[error("cannot read {}", .path.display())]
    #[diagnostic(code(plancomp::load::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Document(#[from] DocumentError),
}

// ============================================================================
// Composition Errors
// ============================================================================

/// Fatal errors of a composition run. Nothing is written when one occurs.
#[derive(Error, Diagnostic, Debug)]
pub enum ComposeError {
    #[error("no usable layers to merge (tried: {})", .attempted.join(", "))]
    #[diagnostic(
        code(plancomp::compose::no_usable_layers),
        help("check that the exporter produced at least one of the layer sources")
    )]
    NoUsableLayers { attempted: Vec<String> },

    #[error("required stylesheet not found: {}", .path.display())]
    #[diagnostic(
        code(plancomp::compose::stylesheet_not_found),
        help("the composite is never written unstyled; fix the stylesheet path")
    )]
    StylesheetNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write output {}", .path.display())]
    #[diagnostic(code(plancomp::compose::write))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Errors reading or validating a run manifest
#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("cannot read manifest {}", .path.display())]
    #[diagnostic(code(plancomp::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {}", .path.display())]
    #[diagnostic(code(plancomp::config::json))]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid scale factor {value:?}: {source}")]
    #[diagnostic(
        code(plancomp::config::invalid_scale),
        help("use a positive number such as `20` or a ratio such as `1/50`")
    )]
    InvalidScale {
        value: String,
        source: NumericError,
    },

    #[error("layer `{layer}`: invalid opacity {value}: {source}")]
    #[diagnostic(code(plancomp::config::invalid_opacity))]
    InvalidOpacity {
        layer: String,
        value: f64,
        source: NumericError,
    },

    #[error("layer `{layer}`: invalid stroke width {value}")]
    #[diagnostic(code(plancomp::config::invalid_stroke_width))]
    InvalidStrokeWidth { layer: String, value: f64 },

    #[error("layer `{layer}`: invalid color {value:?}")]
    #[diagnostic(code(plancomp::config::invalid_color))]
    InvalidColor { layer: String, value: String },

    #[error("layer `{layer}`: invalid dash pattern {value:?}")]
    #[diagnostic(
        code(plancomp::config::invalid_dash),
        help("use non-negative lengths separated by spaces or commas, such as `6 3`")
    )]
    InvalidDash { layer: String, value: String },

    #[error("invalid {setting}: {value}")]
    #[diagnostic(code(plancomp::config::invalid_setting))]
    InvalidSetting { setting: String, value: String },

    #[error("layer `{layer}` has an export job but the manifest configures no exporter")]
    #[diagnostic(code(plancomp::config::missing_exporter))]
    MissingExporter { layer: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Export(#[from] ExportError),
}

// ============================================================================
// Exporter Errors
// ============================================================================

/// Errors preparing or running the external geometry exporter
#[derive(Error, Diagnostic, Debug)]
pub enum ExportError {
    #[error("layer `{layer}`: exporter include list is empty")]
    #[diagnostic(
        code(plancomp::export::empty_include),
        help("the exporter's default inclusion set has no structural geometry; list the categories explicitly")
    )]
    EmptyInclude { layer: String },

    #[error("layer `{layer}`: cannot start exporter {}", .program.display())]
    #[diagnostic(code(plancomp::export::spawn))]
    Spawn {
        layer: String,
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("layer `{layer}`: exporter exited with {status}")]
    #[diagnostic(code(plancomp::export::failed))]
    Failed {
        layer: String,
        status: std::process::ExitStatus,
        #[help]
        stderr: Option<String>,
    },
}

// ============================================================================
// Warnings
// ============================================================================

/// Recoverable conditions recorded during a run
#[derive(Error, Diagnostic, Debug)]
pub enum Warning {
    #[error("{document}: dropped malformed <{element}>{}: {reason}", fmt_id(.id))]
    #[diagnostic(code(plancomp::warn::malformed_primitive), severity(Warning))]
    MalformedPrimitive {
        document: String,
        element: String,
        id: Option<String>,
        reason: String,
        #[related]
        causes: Vec<PathError>,
    },

    #[error("{document}: dropped unsupported <{element}>")]
    #[diagnostic(code(plancomp::warn::unsupported_element), severity(Warning))]
    UnsupportedElement { document: String, element: String },

    #[error("{document}: ignored invalid transform {value:?} on <{element}>")]
    #[diagnostic(code(plancomp::warn::invalid_transform), severity(Warning))]
    InvalidTransform {
        document: String,
        element: String,
        value: String,
        #[related]
        causes: Vec<PathError>,
    },

    #[error("layer `{layer}` skipped: {reason}")]
    #[diagnostic(code(plancomp::warn::missing_layer), severity(Warning))]
    MissingLayer { layer: String, reason: String },

    #[error("composite has no placed content; viewport left unset")]
    #[diagnostic(code(plancomp::warn::empty_content), severity(Warning))]
    EmptyContent,

    #[error("composite content collapses to a single point; viewport left unset")]
    #[diagnostic(code(plancomp::warn::degenerate_content), severity(Warning))]
    DegenerateContent,

    #[error("stylesheet {} has no rule for `.{class}`", .stylesheet.display())]
    #[diagnostic(code(plancomp::warn::unstyled_layer), severity(Warning))]
    UnstyledLayer { class: String, stylesheet: PathBuf },
}

impl Warning {
    /// Short stable name for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Warning::MalformedPrimitive { .. } => "malformed_primitive",
            Warning::UnsupportedElement { .. } => "unsupported_element",
            Warning::InvalidTransform { .. } => "invalid_transform",
            Warning::MissingLayer { .. } => "missing_layer",
            Warning::EmptyContent => "empty_content",
            Warning::DegenerateContent => "degenerate_content",
            Warning::UnstyledLayer { .. } => "unstyled_layer",
        }
    }
}

fn fmt_id(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" #{}", id),
        None => String::new(),
    }
}
