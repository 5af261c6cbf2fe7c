//! Prometheus text exposition (format 0.0.4).

use std::fmt::Write;

use super::MetricKind;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Shortest round-trip decimal; non-finite values use the exposition spellings.
pub(crate) fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        v.to_string()
    }
}

pub(crate) fn write_series(
    out: &mut String,
    name: &str,
    help: &str,
    kind: MetricKind,
    label_keys: &[String],
    values: &[(Vec<String>, f64)],
) {
    if !help.is_empty() {
        let _ = writeln!(out, "# HELP {} {}", name, escape_help(help));
    }
    let _ = writeln!(out, "# TYPE {} {}", name, kind.as_str());

    for (label_values, v) in values {
        if label_keys.is_empty() {
            let _ = writeln!(out, "{} {}", name, format_value(*v));
            continue;
        }
        let label_str = label_keys
            .iter()
            .zip(label_values)
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
            .collect::<Vec<_>>()
            .join(",");
        let _ = writeln!(out, "{}{{{}}} {}", name, label_str, format_value(*v));
    }
}
