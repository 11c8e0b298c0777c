use std::path::{Path, PathBuf};

use plancomp::{Compositor, ConfigError, Manifest, ScaleFactor};
use rayon::prelude::*;

const USAGE: &str = "\
Usage: plancomp <manifest.json> [options]

Options:
  --output PATH    Write the composite here instead of the manifest's output
  --scale S        Override the drawing scale (`20` or `1/50`)
  --skip-export    Use existing layer files; do not run the exporter
  -h, --help       Show this message";

#[derive(Debug, PartialEq)]
struct Args {
    manifest: PathBuf,
    output: Option<PathBuf>,
    scale: Option<String>,
    skip_export: bool,
}

enum Parsed {
    Run(Args),
    Help,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Parsed, String> {
    let mut manifest = None;
    let mut output = None;
    let mut scale = None;
    let mut skip_export = false;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Parsed::Help),
            "--output" => {
                let value = args.next().ok_or("--output needs a path")?;
                output = Some(PathBuf::from(value));
            }
            "--scale" => {
                scale = Some(args.next().ok_or("--scale needs a value")?);
            }
            "--skip-export" => skip_export = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option: {}", flag)),
            _ if manifest.is_none() => manifest = Some(PathBuf::from(&arg)),
            _ => return Err(format!("unexpected argument: {}", arg)),
        }
    }

    let manifest = manifest.ok_or("missing manifest path")?;
    Ok(Parsed::Run(Args {
        manifest,
        output,
        scale,
        skip_export,
    }))
}

fn main() -> miette::Result<()> {
    // Logs go to stderr; stdout carries only the output path
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(Parsed::Run(args)) => args,
        Ok(Parsed::Help) => {
            println!("{}", USAGE);
            return Ok(());
        }
        Err(message) => {
            eprintln!("error: {}\n\n{}", message, USAGE);
            std::process::exit(2);
        }
    };

    let manifest = Manifest::load(&args.manifest)?;
    let base_dir = args.manifest.parent().unwrap_or(Path::new(""));
    let (mut options, layers, exports) = manifest.into_run(base_dir)?;

    if let Some(output) = args.output {
        options = options.with_output(output);
    }
    if let Some(scale) = args.scale {
        let factor = scale
            .parse::<ScaleFactor>()
            .map_err(|source| ConfigError::InvalidScale {
                value: scale.clone(),
                source,
            })?;
        options = options.with_scale(factor);
    }

    if args.skip_export {
        tracing::info!(jobs = exports.len(), "skipping exporter jobs");
    } else if !exports.is_empty() {
        // A failed export leaves its layer missing; the merge skips it.
        let failures: Vec<_> = exports
            .par_iter()
            .filter_map(|(exporter, request)| exporter.run(request).err())
            .collect();
        for failure in failures {
            eprintln!("{:?}", miette::Report::new(failure));
        }
    }

    let composite = Compositor::new(options.clone()).run(layers)?;
    tracing::info!(
        layers = composite.layers.len(),
        warnings = composite.warnings.len(),
        "done"
    );
    println!("{}", options.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Parsed, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_options_in_any_order() {
        let Ok(Parsed::Run(args)) = parse(&["--scale", "1/50", "plan.json", "--skip-export"]) else {
            panic!("expected run");
        };
        assert_eq!(
            args,
            Args {
                manifest: PathBuf::from("plan.json"),
                output: None,
                scale: Some("1/50".into()),
                skip_export: true,
            }
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["plan.json", "--output"]).is_err());
        assert!(parse(&["plan.json", "--verbose"]).is_err());
        assert!(parse(&["a.json", "b.json"]).is_err());
        assert!(matches!(parse(&["--help"]), Ok(Parsed::Help)));
    }
}
