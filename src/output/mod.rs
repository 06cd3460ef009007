//! Report formatting and display
//!
//! This module renders a finished walk in one of four formats:
//! - Aligned text tables with optional colors
//! - CSV
//! - JSON
//! - Bar charts
//!
//! # Module Structure
//!
//! - `config` - Output configuration types
//! - `table` - Text table formatter
//! - `chart` - Bar chart formatter
//! - `csv` - CSV output
//! - `json` - JSON output

mod chart;
mod config;
mod csv;
mod json;
mod table;

use std::io;

use termcolor::{ColorChoice, StandardStream};

use crate::summary::{SizeRange, SizeSummary, size_percentiles, size_ranges};
use crate::tree::WalkReport;

// Re-export public types and functions
pub use chart::ChartFormatter;
pub use config::{OutputConfig, OutputFormat};
pub use self::csv::write_csv;
pub use json::write_json;
pub use table::TableFormatter;

/// Size sections derived from a report, computed once per render.
#[derive(Debug, Clone, Default)]
pub struct SizeSections {
    pub ranges: Option<Vec<SizeRange>>,
    pub summary: Option<SizeSummary>,
}

impl SizeSections {
    pub fn compute(report: &WalkReport, config: &OutputConfig) -> Self {
        if !config.wants_size_summary() {
            return Self::default();
        }
        let histogram = report.data.size_histogram();
        Self {
            ranges: config
                .size_ranges
                .then(|| size_ranges(&histogram, config.size_base)),
            summary: config.percentiles.then(|| size_percentiles(&histogram)),
        }
    }
}

/// Render a report to stdout in the configured format.
pub fn print_report(report: &WalkReport, config: &OutputConfig) -> io::Result<()> {
    let sections = SizeSections::compute(report, config);
    match config.format {
        OutputFormat::Json => write_json(io::stdout().lock(), report, &sections),
        OutputFormat::Csv => write_csv(io::stdout().lock(), report, &sections),
        OutputFormat::Table | OutputFormat::Chart => {
            let color_choice = if config.use_color {
                ColorChoice::Always
            } else {
                ColorChoice::Never
            };
            let mut stdout = StandardStream::stdout(color_choice);
            if config.format == OutputFormat::Chart {
                ChartFormatter::new(config.clone()).write(&mut stdout, report, &sections)
            } else {
                TableFormatter::new(config.clone()).write(&mut stdout, report, &sections)
            }
        }
    }
}

/// Format a number with thousand separators.
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
