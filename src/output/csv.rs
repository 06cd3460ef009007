//! CSV output
//!
//! Every statistic lands in one four-column table, `stat,key,subkey,value`.
//! Flat and per-path rows leave `subkey` empty; per-directory rows put the
//! file type there. The size sections follow as pseudo-statistics named
//! `size-range` and `size-summary`.

use std::io::{self, Write};

use crate::summary::rows;
use crate::tree::WalkReport;

use super::SizeSections;

const HEADER: [&str; 4] = ["stat", "key", "subkey", "value"];

pub fn write_csv<W: Write>(
    out: W,
    report: &WalkReport,
    sections: &SizeSections,
) -> io::Result<()> {
    let mut writer = ::csv::Writer::from_writer(out);
    writer.write_record(HEADER)?;

    for (kind, bucket) in report.data.iter() {
        for row in rows(bucket) {
            let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
            let record = match cells.as_slice() {
                [key, subkey, value] => {
                    [kind.name(), key.as_str(), subkey.as_str(), value.as_str()]
                }
                [key, value] => [kind.name(), key.as_str(), "", value.as_str()],
                _ => continue,
            };
            writer.write_record(record)?;
        }
    }

    if let Some(ranges) = &sections.ranges {
        for range in ranges {
            let upper = range.upper.map(|u| u.to_string()).unwrap_or_default();
            writer.write_record([
                "size-range",
                range.label.as_str(),
                upper.as_str(),
                range.count.to_string().as_str(),
            ])?;
        }
    }

    if let Some(summary) = &sections.summary {
        let fields = [
            ("total_bytes", summary.total_bytes.to_string()),
            ("total_files", summary.total_files.to_string()),
            ("min", summary.min.to_string()),
            ("max", summary.max.to_string()),
            ("avg", format!("{:.2}", summary.avg)),
            ("p50", summary.p50.to_string()),
            ("p90", summary.p90.to_string()),
            ("p95", summary.p95.to_string()),
            ("p99", summary.p99.to_string()),
        ];
        for (name, value) in &fields {
            writer.write_record(["size-summary", *name, "", value.as_str()])?;
        }
    }

    writer.flush()?;
    Ok(())
}
