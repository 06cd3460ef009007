//! JSON output

use std::io::{self, Write};

use serde::Serialize;

use crate::store::StatsData;
use crate::summary::{SizeRange, SizeSummary};
use crate::tree::WalkReport;

use super::SizeSections;

/// Top-level JSON document.
#[derive(Serialize)]
struct JsonReport<'a> {
    elapsed_seconds: f64,
    entries: u64,
    stats: &'a StatsData,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_ranges: Option<&'a [SizeRange]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_summary: Option<&'a SizeSummary>,
}

/// Write the report as pretty-printed JSON with a trailing newline.
pub fn write_json<W: Write>(
    mut out: W,
    report: &WalkReport,
    sections: &SizeSections,
) -> io::Result<()> {
    let doc = JsonReport {
        elapsed_seconds: report.elapsed_seconds(),
        entries: report.data.entries(),
        stats: &report.data,
        size_ranges: sections.ranges.as_deref(),
        size_summary: sections.summary.as_ref(),
    };
    serde_json::to_writer_pretty(&mut out, &doc)?;
    writeln!(out)
}
