//! Post-processing of finished statistics
//!
//! Flattens buckets into display rows, orders them, and summarises the size
//! distribution as fixed ranges and percentiles.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::store::{Bucket, Cell};

/// One display row: key columns followed by the value column.
pub type Row = Vec<Cell>;

/// Display order for rows.
///
/// First column ascending, then last column descending (largest counts
/// first), then the middle columns ascending from left to right. Rows of
/// different width fall back to comparing their length.
pub fn compare_rows(a: &[Cell], b: &[Cell]) -> Ordering {
    let (Some(a_first), Some(b_first)) = (a.first(), b.first()) else {
        return a.len().cmp(&b.len());
    };

    a_first
        .cmp(b_first)
        .then_with(|| value(b).cmp(&value(a)))
        .then_with(|| middle(a).cmp(middle(b)))
        .then_with(|| a.len().cmp(&b.len()))
}

/// The value column; single-cell rows have none.
fn value(row: &[Cell]) -> Option<&Cell> {
    if row.len() > 1 { row.last() } else { None }
}

fn middle(row: &[Cell]) -> &[Cell] {
    if row.len() > 2 {
        &row[1..row.len() - 1]
    } else {
        &[]
    }
}

/// Flatten a bucket into sorted rows.
pub fn rows(bucket: &Bucket) -> Vec<Row> {
    let mut rows: Vec<Row> = match bucket {
        Bucket::Flat(m) => m
            .iter()
            .map(|(key, n)| vec![key.clone(), Cell::Int(*n)])
            .collect(),
        Bucket::Nested(m) => m
            .iter()
            .flat_map(|(dir, counts)| {
                counts
                    .iter()
                    .map(move |(key, n)| vec![dir.clone(), key.clone(), Cell::Int(*n)])
            })
            .collect(),
        Bucket::PerPath(m) => m
            .iter()
            .map(|(path, n)| vec![Cell::Text(path.clone()), Cell::Int(*n)])
            .collect(),
    };
    sort_rows(&mut rows);
    rows
}

pub fn sort_rows(rows: &mut [Row]) {
    rows.sort_by(|a, b| compare_rows(a, b));
}

/// Count of files in one size range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeRange {
    pub label: String,
    /// Inclusive upper bound in bytes; `None` for the open top range
    pub upper: Option<u64>,
    pub count: u64,
}

const KIB_UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];
const KB_UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];

/// Bucket a size histogram into six ranges: `≤base¹` … `≤base⁵`, `>base⁵`.
///
/// All six ranges are returned in ascending order, empty ones included.
pub fn size_ranges(histogram: &BTreeMap<u64, u64>, base: u64) -> Vec<SizeRange> {
    let units = if base == 1000 { KB_UNITS } else { KIB_UNITS };
    let bounds: Vec<u64> = (1..=5u32).map(|p| base.saturating_pow(p)).collect();

    let mut ranges: Vec<SizeRange> = bounds
        .iter()
        .zip(units)
        .map(|(&upper, unit)| SizeRange {
            label: format!("≤1 {}", unit),
            upper: Some(upper),
            count: 0,
        })
        .collect();
    ranges.push(SizeRange {
        label: format!(">1 {}", units[4]),
        upper: None,
        count: 0,
    });

    for (&size, &count) in histogram {
        let slot = bounds
            .iter()
            .position(|&upper| size <= upper)
            .unwrap_or(bounds.len());
        ranges[slot].count += count;
    }
    ranges
}

/// Aggregate figures for a size distribution.
///
/// Percentiles stay at zero when the histogram is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SizeSummary {
    pub total_bytes: u64,
    pub total_files: u64,
    pub min: u64,
    pub max: u64,
    pub avg: f64,
    pub p50: u64,
    pub p90: u64,
    pub p95: u64,
    pub p99: u64,
}

/// Thresholds in percent, matched to the summary fields in order.
const PERCENTILES: [u64; 4] = [50, 90, 95, 99];

/// Compute totals, extremes, mean and percentiles of a size histogram.
///
/// Each percentile is the first size at which the cumulative file fraction
/// reaches its threshold (`>=`). The comparison is done in integers so an
/// exact boundary such as 2 of 4 files counts as reaching 50%.
pub fn size_percentiles(histogram: &BTreeMap<u64, u64>) -> SizeSummary {
    let total_files: u64 = histogram.values().sum();
    if total_files == 0 {
        return SizeSummary::default();
    }

    let total_bytes: u64 = histogram
        .iter()
        .map(|(size, count)| size.saturating_mul(*count))
        .fold(0u64, u64::saturating_add);
    let min = histogram
        .iter()
        .find(|(_, count)| **count > 0)
        .map(|(size, _)| *size)
        .unwrap_or(0);
    let max = histogram
        .iter()
        .rev()
        .find(|(_, count)| **count > 0)
        .map(|(size, _)| *size)
        .unwrap_or(0);

    let mut found = [None; PERCENTILES.len()];
    let mut cumulative: u128 = 0;
    for (&size, &count) in histogram {
        cumulative += u128::from(count);
        for (slot, pct) in PERCENTILES.iter().enumerate() {
            if found[slot].is_none() && cumulative * 100 >= u128::from(total_files) * u128::from(*pct)
            {
                found[slot] = Some(size);
            }
        }
        if found.iter().all(Option::is_some) {
            break;
        }
    }
    let [p50, p90, p95, p99] = found.map(|p| p.unwrap_or(0));

    SizeSummary {
        total_bytes,
        total_files,
        min,
        max,
        avg: total_bytes as f64 / total_files as f64,
        p50,
        p90,
        p95,
        p99,
    }
}

/// Format a size in bytes to human-readable form.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1}G", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1}M", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1}K", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[Cell]) -> Row {
        cells.to_vec()
    }

    #[test]
    fn test_compare_first_column_is_type_aware() {
        let a = row(&[Cell::Int(9), Cell::Int(1)]);
        let b = row(&[Cell::Int(10), Cell::Int(1)]);
        assert_eq!(compare_rows(&a, &b), Ordering::Less);

        let a = row(&["b".into(), Cell::Int(1)]);
        let b = row(&["a".into(), Cell::Int(100)]);
        assert_eq!(compare_rows(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_compare_last_column_descending_then_middle() {
        let small = row(&["/d".into(), "file".into(), Cell::Int(1)]);
        let large = row(&["/d".into(), "symlink".into(), Cell::Int(5)]);
        assert_eq!(compare_rows(&large, &small), Ordering::Less);

        let a = row(&["/d".into(), "dir".into(), Cell::Int(0)]);
        let b = row(&["/d".into(), "pipe".into(), Cell::Int(0)]);
        assert_eq!(compare_rows(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_compare_is_a_total_order() {
        let rows: Vec<Row> = vec![
            row(&["/a".into(), "file".into(), Cell::Int(2)]),
            row(&["/a".into(), "dir".into(), Cell::Int(2)]),
            row(&["/a".into(), "dir".into(), Cell::Int(3)]),
            row(&["/b".into(), "file".into(), Cell::Int(0)]),
            row(&[Cell::Int(4), Cell::Int(1)]),
            row(&[Cell::Int(4), Cell::Int(7)]),
            row(&["/a".into(), Cell::Int(2)]),
        ];
        for a in &rows {
            assert_eq!(compare_rows(a, a), Ordering::Equal);
            for b in &rows {
                assert_eq!(compare_rows(a, b), compare_rows(b, a).reverse());
                for c in &rows {
                    if compare_rows(a, b) == Ordering::Less && compare_rows(b, c) == Ordering::Less
                    {
                        assert_eq!(compare_rows(a, c), Ordering::Less);
                    }
                }
            }
        }

        let mut sorted = rows.clone();
        sort_rows(&mut sorted);
        let mut again = sorted.clone();
        sort_rows(&mut again);
        assert_eq!(sorted, again);
    }

    #[test]
    fn test_rows_from_flat_bucket() {
        let mut bucket = Bucket::new(crate::kind::BucketShape::Flat);
        bucket.add(Cell::Int(10), 1);
        bucket.add(Cell::Int(9), 4);
        let rows = rows(&bucket);
        assert_eq!(rows[0], vec![Cell::Int(9), Cell::Int(4)]);
        assert_eq!(rows[1], vec![Cell::Int(10), Cell::Int(1)]);
    }

    #[test]
    fn test_size_ranges_base_1024() {
        let histogram = BTreeMap::from([(500, 2), (2000, 1), (5_000_000, 1)]);
        let ranges = size_ranges(&histogram, 1024);
        assert_eq!(ranges.len(), 6);
        assert_eq!(ranges[0].label, "≤1 KiB");
        assert_eq!(ranges[0].count, 2);
        assert_eq!(ranges[1].label, "≤1 MiB");
        assert_eq!(ranges[1].count, 1);
        assert_eq!(ranges[2].label, "≤1 GiB");
        assert_eq!(ranges[2].count, 1);
        assert_eq!(ranges[5].label, ">1 PiB");
        assert_eq!(ranges[5].upper, None);
        assert_eq!(ranges.iter().map(|r| r.count).sum::<u64>(), 4);
    }

    #[test]
    fn test_size_ranges_bounds_are_inclusive() {
        let histogram = BTreeMap::from([(1000, 1), (1001, 1), (0, 3)]);
        let ranges = size_ranges(&histogram, 1000);
        assert_eq!(ranges[0].label, "≤1 KB");
        assert_eq!(ranges[0].count, 4);
        assert_eq!(ranges[1].count, 1);
    }

    #[test]
    fn test_size_ranges_top_range() {
        let huge = 1024u64.pow(5) + 1;
        let ranges = size_ranges(&BTreeMap::from([(huge, 1)]), 1024);
        assert_eq!(ranges[5].count, 1);
    }

    #[test]
    fn test_percentiles_four_files() {
        let histogram = BTreeMap::from([(100, 1), (200, 1), (300, 1), (400, 1)]);
        let summary = size_percentiles(&histogram);
        assert_eq!(summary.total_files, 4);
        assert_eq!(summary.total_bytes, 1000);
        assert_eq!(summary.min, 100);
        assert_eq!(summary.max, 400);
        assert_eq!(summary.avg, 250.0);
        // Cumulative fraction at 200 is exactly 0.50
        assert_eq!(summary.p50, 200);
        assert_eq!(summary.p90, 400);
        assert_eq!(summary.p95, 400);
        assert_eq!(summary.p99, 400);
    }

    #[test]
    fn test_percentiles_skewed_histogram() {
        let histogram = BTreeMap::from([(1, 90), (1_000, 9), (1_000_000, 1)]);
        let summary = size_percentiles(&histogram);
        assert_eq!(summary.p50, 1);
        assert_eq!(summary.p90, 1);
        assert_eq!(summary.p95, 1_000);
        assert_eq!(summary.p99, 1_000);
        assert_eq!(summary.max, 1_000_000);
    }

    #[test]
    fn test_percentiles_empty_histogram() {
        assert_eq!(size_percentiles(&BTreeMap::new()), SizeSummary::default());
        // Zero counts only
        let summary = size_percentiles(&BTreeMap::from([(5, 0)]));
        assert_eq!(summary.p50, 0);
        assert_eq!(summary.total_files, 0);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(1023), "1023B");
        assert_eq!(format_size(1536), "1.5K");
        assert_eq!(format_size(1_048_576), "1.0M");
        assert_eq!(format_size(1_073_741_824), "1.0G");
    }
}
