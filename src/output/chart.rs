//! Horizontal bar charts

use std::io;

use termcolor::{Color, ColorSpec, WriteColor};

use crate::store::Cell;
use crate::summary::{Row, rows};
use crate::tree::WalkReport;

use super::config::OutputConfig;
use super::{SizeSections, format_number};

/// Widest bar in characters.
const BAR_WIDTH: usize = 40;
/// Labels longer than this are cut from the left.
const LABEL_WIDTH: usize = 48;

/// Bar chart formatter: one chart per statistic, bars scaled to the largest
/// value in that chart.
pub struct ChartFormatter {
    config: OutputConfig,
}

impl ChartFormatter {
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
            if let Some(top) = self.config.top {
                rows.truncate(top);
            }
            let bars: Vec<(String, u64)> = rows.iter().map(bar_of).collect();
            self.write_chart(out, kind.title(), &bars)?;
        }

        if let Some(ranges) = &sections.ranges {
            let bars: Vec<(String, u64)> =
                ranges.iter().map(|r| (r.label.clone(), r.count)).collect();
            self.write_chart(out, "Size ranges", &bars)?;
        }
        if let Some(summary) = &sections.summary {
            let bars = vec![
                ("min".to_string(), summary.min),
                ("p50".to_string(), summary.p50),
                ("p90".to_string(), summary.p90),
                ("p95".to_string(), summary.p95),
                ("p99".to_string(), summary.p99),
                ("max".to_string(), summary.max),
            ];
            self.write_chart(out, "Size percentiles", &bars)?;
        }
        Ok(())
    }

    fn write_chart<W: WriteColor>(
        &self,
        out: &mut W,
        title: &str,
        bars: &[(String, u64)],
    ) -> io::Result<()> {
        if self.config.use_color {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Blue)).set_bold(true))?;
        }
        writeln!(out, "{}", title)?;
        if self.config.use_color {
            out.reset()?;
        }

        let max = bars.iter().map(|(_, v)| *v).max().unwrap_or(0);
        let label_width = bars
            .iter()
            .map(|(l, _)| l.chars().count().min(LABEL_WIDTH))
            .max()
            .unwrap_or(0);

        for (label, value) in bars {
            write!(out, "{:<w$} ", clip_label(label), w = label_width)?;
            if self.config.use_color {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            }
            write!(out, "{}", "█".repeat(bar_len(*value, max)))?;
            if self.config.use_color {
                out.reset()?;
            }
            writeln!(out, " {}", format_number(*value))?;
        }
        writeln!(out)
    }
}

/// Label and value of one row: key columns joined, last column as the value.
fn bar_of(row: &Row) -> (String, u64) {
    let (value, keys) = match row.split_last() {
        Some((last, keys)) if !keys.is_empty() => (last.as_int().unwrap_or(0), keys),
        _ => (0, row.as_slice()),
    };
    let label = keys
        .iter()
        .map(Cell::to_string)
        .collect::<Vec<_>>()
        .join(" / ");
    (label, value)
}

/// Bar length scaled to `BAR_WIDTH`; any non-zero value gets at least one cell.
fn bar_len(value: u64, max: u64) -> usize {
    if value == 0 || max == 0 {
        return 0;
    }
    let scaled = (u128::from(value) * BAR_WIDTH as u128 / u128::from(max)) as usize;
    scaled.max(1)
}

fn clip_label(label: &str) -> String {
    let len = label.chars().count();
    if len <= LABEL_WIDTH {
        return label.to_string();
    }
    let tail: String = label.chars().skip(len - (LABEL_WIDTH - 3)).collect();
    format!("...{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_len_scales_to_max() {
        assert_eq!(bar_len(10, 10), BAR_WIDTH);
        assert_eq!(bar_len(5, 10), BAR_WIDTH / 2);
        assert_eq!(bar_len(1, 1_000_000), 1);
        assert_eq!(bar_len(0, 10), 0);
        assert_eq!(bar_len(0, 0), 0);
    }

    #[test]
    fn test_bar_of_nested_row() {
        let row: Row = vec!["/tmp/d".into(), "file".into(), Cell::Int(7)];
        assert_eq!(bar_of(&row), ("/tmp/d / file".to_string(), 7));
    }

    #[test]
    fn test_clip_label_keeps_tail() {
        let long = "a".repeat(60) + "/end";
        let clipped = clip_label(&long);
        assert_eq!(clipped.chars().count(), LABEL_WIDTH);
        assert!(clipped.starts_with("..."));
        assert!(clipped.ends_with("/end"));
    }
}
