//! Bridge to the external geometry exporter.
//!
//! The exporter emits one discipline's 2D section of a building model as
//! SVG. It is only ever told exactly which element categories to include:
//! its default inclusion set carries no structural geometry.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::errors::ExportError;
use crate::svg::write::fmt_num;

/// One exporter invocation producing one layer's source document
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    layer: String,
    model: PathBuf,
    section_height: f64,
    include: Vec<String>,
    output: PathBuf,
}

impl ExportRequest {
    /// Fails when `include` is empty.
    pub fn new(
        layer: impl Into<String>,
        model: impl Into<PathBuf>,
        section_height: f64,
        include: Vec<String>,
        output: impl Into<PathBuf>,
    ) -> Result<Self, ExportError> {
        let layer = layer.into();
        if include.iter().all(|c| c.trim().is_empty()) {
            return Err(ExportError::EmptyInclude { layer });
        }
        Ok(ExportRequest {
            layer,
            model: model.into(),
            section_height,
            include,
            output: output.into(),
        })
    }

    pub fn layer(&self) -> &str {
        &self.layer
    }

    pub fn model(&self) -> &Path {
        &self.model
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }
}

/// The exporter program and any fixed leading arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Exporter {
    program: PathBuf,
    args: Vec<String>,
}

impl Exporter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Exporter {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Arguments after the program name:
    /// `[args] <model> <output> -y --section-height <h> --include entities <cat>...`
    pub fn arguments(&self, request: &ExportRequest) -> Vec<OsString> {
        let mut argv: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        argv.push(request.model.clone().into_os_string());
        argv.push(request.output.clone().into_os_string());
        argv.push("-y".into());
        argv.push("--section-height".into());
        argv.push(fmt_num(request.section_height).into());
        argv.push("--include".into());
        argv.push("entities".into());
        argv.extend(
            request
                .include
                .iter()
                .filter(|c| !c.trim().is_empty())
                .map(|c| OsString::from(c.trim())),
        );
        argv
    }

    pub fn command(&self, request: &ExportRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.arguments(request));
        cmd
    }

    /// Run the exporter for one layer and wait for it
    pub fn run(&self, request: &ExportRequest) -> Result<(), ExportError> {
        if let Some(parent) = request.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ExportError::Spawn {
                layer: request.layer.clone(),
                program: self.program.clone(),
                source,
            })?;
        }

        crate::log::info!(
            layer = %request.layer,
            model = %request.model.display(),
            output = %request.output.display(),
            "running exporter"
        );
        let output = self
            .command(request)
            .output()
            .map_err(|source| ExportError::Spawn {
                layer: request.layer.clone(),
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(ExportError::Failed {
            layer: request.layer.clone(),
            status: output.status,
            stderr: (!stderr.is_empty()).then_some(stderr),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(output: &Path) -> ExportRequest {
        ExportRequest::new(
            "structure",
            "model.ifc",
            1.5,
            vec!["IfcWall".into(), "IfcColumn".into()],
            output,
        )
        .unwrap()
    }

    #[test]
    fn empty_include_is_refused() {
        let err = ExportRequest::new("electrical", "m.ifc", 1.0, vec![], "e.svg").unwrap_err();
        assert!(matches!(err, ExportError::EmptyInclude { layer } if layer == "electrical"));
        assert!(ExportRequest::new("x", "m.ifc", 1.0, vec![" ".into()], "e.svg").is_err());
    }

    #[test]
    fn command_line_shape() {
        let exporter = Exporter::new("IfcConvert").with_args(vec!["--plan".into()]);
        let argv: Vec<String> = exporter
            .arguments(&request(Path::new("out/structure.svg")))
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            argv,
            vec![
                "--plan",
                "model.ifc",
                "out/structure.svg",
                "-y",
                "--section-height",
                "1.5",
                "--include",
                "entities",
                "IfcWall",
                "IfcColumn",
            ]
        );
    }

    #[test]
    fn spawn_failure_names_the_layer() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new("/nonexistent/exporter-binary");
        let err = exporter.run(&request(&dir.path().join("s.svg"))).unwrap_err();
        assert!(matches!(err, ExportError::Spawn { ref layer, .. } if layer == "structure"));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("s.svg");

        // $1 is the model and $2 the output path
        let ok = Exporter::new("sh").with_args(vec![
            "-c".into(),
            "touch \"$2\"".into(),
            "sh".into(),
        ]);
        ok.run(&request(&out)).unwrap();
        assert!(out.exists());

        let failing = Exporter::new("sh").with_args(vec![
            "-c".into(),
            "echo boom >&2; exit 3".into(),
            "sh".into(),
        ]);
        match failing.run(&request(&out)).unwrap_err() {
            ExportError::Failed { stderr, .. } => assert_eq!(stderr.as_deref(), Some("boom")),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
