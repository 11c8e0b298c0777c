use datatest_stable::Utf8Path;
use glam::DVec2;
use plancomp::path::Command;
use plancomp::scale::scale_document;
use plancomp::svg::{Primitive, VectorDocument};
use plancomp::viewport::content_points;
use plancomp::{ScaleFactor, Warning};

/// Tolerance for coordinates after a scale and its inverse
const TOLERANCE: f64 = 1e-9;

/// Tolerance after a trip through 6-decimal text output
const TEXT_TOLERANCE: f64 = 1e-5;

/// (large_arc, sweep, x_axis_rotation) for every arc, in document order
fn arcs(doc: &VectorDocument) -> Vec<(bool, bool, f64)> {
    let mut out = Vec::new();
    doc.for_each_primitive(|p| {
        if let Primitive::Path(path) = p {
            for cmd in path.data.commands() {
                if let Command::ArcTo {
                    large_arc,
                    sweep,
                    x_axis_rotation,
                    ..
                } = *cmd
                {
                    out.push((large_arc, sweep, x_axis_rotation));
                }
            }
        }
    });
    out
}

fn assert_points_close(actual: &[DVec2], expected: &[DVec2], tolerance: f64, context: &str) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "{}: point count changed",
        context
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (*a - *e).abs().max_element() <= tolerance * e.abs().max_element().max(1.0),
            "{}: point {} moved: {:?} != {:?}",
            context,
            i,
            a,
            e
        );
    }
}

fn check_fixture(path: &Utf8Path) -> datatest_stable::Result<()> {
    let source = std::fs::read_to_string(path)?;
    let (original, warnings) = VectorDocument::parse(path.as_str(), &source)?;
    let malformed: Vec<&Warning> = warnings
        .iter()
        .filter(|w| matches!(w, Warning::MalformedPrimitive { .. }))
        .collect();
    assert!(malformed.is_empty(), "{}: {:?}", path, malformed);

    let points = content_points(&original);
    let original_arcs = arcs(&original);
    assert!(!points.is_empty(), "{}: fixture has no content", path);

    for factor in [0.02, 1.0 / 3.0, 20.0, 250.0] {
        let s = ScaleFactor::try_new(factor)?;
        let context = format!("{} at scale {}", path, factor);

        let mut doc = original.clone();
        let scaled_count = scale_document(&mut doc, s);
        assert_eq!(scaled_count, original.primitive_count(), "{}", context);
        assert_eq!(arcs(&doc), original_arcs, "{}: arc flags or rotation changed", context);

        let expected: Vec<DVec2> = points.iter().map(|&p| p * factor).collect();
        assert_points_close(&content_points(&doc), &expected, TOLERANCE, &context);

        // Written flags must come back as the same single-character tokens
        let written = doc.to_svg_string();
        let (reparsed, reparse_warnings) = VectorDocument::parse(path.as_str(), &written)?;
        assert!(reparse_warnings.is_empty(), "{}: {:?}", context, reparse_warnings);
        assert_eq!(arcs(&reparsed), original_arcs, "{}: arcs lost in output", context);
        assert_points_close(
            &content_points(&reparsed),
            &expected,
            TEXT_TOLERANCE,
            &format!("{} (reparsed)", context),
        );

        scale_document(&mut doc, s.inverse());
        assert_points_close(&content_points(&doc), &points, TOLERANCE, &context);
    }

    Ok(())
}

datatest_stable::harness! {
    { test = check_fixture, root = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures"), pattern = r"\.svg$" },
}
