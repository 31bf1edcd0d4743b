//! Plain text rendering of a metric catalog

use std::io::{self, Write};

use crate::metric::Metric;

/// Write `metrics` sorted by order, one `description : value` line each
///
/// Descriptions are left aligned to the widest one.
///
/// # Errors
/// Will return any io errors that occur.
pub fn write_report<W: Write>(metrics: &[Metric], out: &mut W) -> io::Result<()> {
    let mut sorted: Vec<&Metric> = metrics.iter().collect();
    sorted.sort();
    let width = sorted
        .iter()
        .map(|m| m.description.len())
        .max()
        .unwrap_or(0);
    for metric in sorted {
        writeln!(
            out,
            "{:<width$} : {}",
            metric.description,
            metric.value,
            width = width
        )?;
    }
    Ok(())
}
