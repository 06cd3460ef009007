//! Text table output
//!
//! `TableFormatter` prints one aligned table per statistic, followed by the
//! optional size sections and a one-line footer.

use std::io;

use termcolor::{Color, ColorSpec, WriteColor};

use crate::store::Cell;
use crate::summary::{Row, SizeRange, SizeSummary, format_size, rows};
use crate::tree::WalkReport;

use super::config::OutputConfig;
use super::{SizeSections, format_number};

/// Aligned text table formatter.
pub struct TableFormatter {
    config: OutputConfig,
}

impl TableFormatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn write<W: WriteColor>(
        &self,
        out: &mut W,
        report: &WalkReport,
        sections: &SizeSections,
    ) -> io::Result<()> {
        for (kind, bucket) in report.data.iter() {
            let mut rows = rows(bucket);
            let total = rows.len();
            if let Some(top) = self.config.top {
                rows.truncate(top);
            }

            self.write_title(out, kind.title())?;
            write_table(out, report.header(kind), &rows, self.config.use_color)?;
            if rows.len() < total {
                self.write_dim(out, &format!("... {} more rows\n", total - rows.len()))?;
            }
            writeln!(out)?;
        }

        if let Some(ranges) = &sections.ranges {
            self.write_title(out, "Size ranges")?;
            write_ranges(out, ranges, self.config.use_color)?;
            writeln!(out)?;
        }
        if let Some(summary) = &sections.summary {
            self.write_title(out, "Size summary")?;
            write_summary(out, summary, self.config.use_color)?;
            writeln!(out)?;
        }

        self.write_dim(
            out,
            &format!(
                "{} entries in {:.3}s\n",
                format_number(report.data.entries()),
                report.elapsed_seconds()
            ),
        )
    }

    fn write_title<W: WriteColor>(&self, out: &mut W, title: &str) -> io::Result<()> {
        if self.config.use_color {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Blue)).set_bold(true))?;
        }
        writeln!(out, "{}", title)?;
        if self.config.use_color {
            out.reset()?;
        }
        Ok(())
    }

    fn write_dim<W: WriteColor>(&self, out: &mut W, text: &str) -> io::Result<()> {
        if self.config.use_color {
            out.set_color(ColorSpec::new().set_fg(Some(Color::White)))?;
        }
        write!(out, "{}", text)?;
        if self.config.use_color {
            out.reset()?;
        }
        Ok(())
    }
}

/// Write a header, a rule and the rows. Integer cells are right-aligned.
fn write_table<W: WriteColor>(
    out: &mut W,
    header: &[&str],
    rows: &[Row],
    use_color: bool,
) -> io::Result<()> {
    let rendered: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(Cell::to_string).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rendered {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    if use_color {
        out.set_color(ColorSpec::new().set_bold(true))?;
    }
    let line: Vec<String> = header
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect();
    writeln!(out, "{}", line.join("  ").trim_end())?;
    if use_color {
        out.reset()?;
    }
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", rule.join("  "))?;

    for (row, text) in rows.iter().zip(&rendered) {
        let cells: Vec<String> = row
            .iter()
            .zip(text)
            .zip(&widths)
            .map(|((cell, s), w)| match cell {
                Cell::Int(_) => format!("{:>w$}", s, w = *w),
                Cell::Text(_) => format!("{:<w$}", s, w = *w),
            })
            .collect();
        writeln!(out, "{}", cells.join("  ").trim_end())?;
    }
    Ok(())
}

fn write_ranges<W: WriteColor>(
    out: &mut W,
    ranges: &[SizeRange],
    use_color: bool,
) -> io::Result<()> {
    let rows: Vec<Row> = ranges
        .iter()
        .map(|r| vec![Cell::Text(r.label.clone()), Cell::Int(r.count)])
        .collect();
    write_table(out, &["Range", "Files"], &rows, use_color)
}

fn write_summary<W: WriteColor>(
    out: &mut W,
    summary: &SizeSummary,
    use_color: bool,
) -> io::Result<()> {
    let sized = |name: &str, bytes: u64| -> Row {
        vec![name.into(), Cell::Int(bytes), Cell::Text(format_size(bytes))]
    };
    let rows: Vec<Row> = vec![
        vec![
            "files".into(),
            Cell::Int(summary.total_files),
            Cell::Text(String::new()),
        ],
        sized("total", summary.total_bytes),
        sized("min", summary.min),
        sized("max", summary.max),
        vec![
            "avg".into(),
            Cell::Text(format!("{:.1}", summary.avg)),
            Cell::Text(format_size(summary.avg.round() as u64)),
        ],
        sized("p50", summary.p50),
        sized("p90", summary.p90),
        sized("p95", summary.p95),
        sized("p99", summary.p99),
    ];
    write_table(out, &["Measure", "Bytes", "Size"], &rows, use_color)
}
