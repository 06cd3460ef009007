//! Output configuration types

use clap::ValueEnum;

/// Rendering format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table per statistic
    #[default]
    Table,
    /// One CSV table: stat,key,subkey,value
    Csv,
    /// Pretty-printed JSON document
    Json,
    /// Horizontal bar chart per statistic
    Chart,
}

/// Configuration for output formatting.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub use_color: bool,
    /// Rows shown per statistic in table and chart output
    pub top: Option<usize>,
    /// Append the size-range histogram
    pub size_ranges: bool,
    /// Append the size percentile summary
    pub percentiles: bool,
    /// 1024 or 1000
    pub size_base: u64,
}

impl OutputConfig {
    /// Whether any size summary section was requested.
    pub fn wants_size_summary(&self) -> bool {
        self.size_ranges || self.percentiles
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Table,
            use_color: true,
            top: None,
            size_ranges: false,
            percentiles: false,
            size_base: 1024,
        }
    }
}
