//! treestat - concurrent directory tree statistics

pub mod classify;
pub mod error;
pub mod kind;
pub mod output;
pub mod platform;
pub mod store;
pub mod summary;
pub mod tree;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use classify::{EntryFlags, FileType, classify_mode};
pub use error::{Error, Result};
pub use kind::{HeaderMode, StatKind, header};
pub use output::{OutputConfig, OutputFormat, print_report};
pub use platform::Capabilities;
pub use store::{AggregationStore, Bucket, Cell, StatsData};
pub use summary::{SizeRange, SizeSummary, compare_rows, size_percentiles, size_ranges};
pub use tree::{FilterChain, FilterSpec, TreeWalker, WalkConfig, WalkReport};
