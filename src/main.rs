//! CLI entry point for treestat

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use tracing::{Level, warn};
use treestat::{
    Capabilities, FilterSpec, OutputConfig, OutputFormat, StatKind, TreeWalker, WalkConfig,
    print_report,
};

/// Color output mode
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and environment
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Determine whether to use color output based on mode and environment.
fn should_use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            // https://no-color.org/
            if std::env::var_os("NO_COLOR").is_some() {
                return false;
            }
            if std::env::var_os("FORCE_COLOR").is_some() {
                return true;
            }
            if std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
                return false;
            }
            std::io::stdout().is_terminal()
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "treestat")]
#[command(about = "Collect file statistics over a directory tree")]
#[command(version)]
struct Args {
    /// Directory to scan
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Statistics to collect (repeatable, comma separated)
    #[arg(short = 's', long = "stat", value_name = "KIND", value_delimiter = ',')]
    stat: Vec<StatKind>,

    /// Collect every statistic this platform supports
    #[arg(long = "all-stats", conflicts_with = "stat")]
    all_stats: bool,

    /// Skip directories with this name, including their contents
    #[arg(long = "exclude-dir", value_name = "NAME")]
    exclude_dir: Vec<String>,

    /// Skip non-directories with this name
    #[arg(long = "exclude-file", value_name = "NAME")]
    exclude_file: Vec<String>,

    /// Skip files with this extension
    #[arg(long = "exclude-ext", value_name = "EXT")]
    exclude_ext: Vec<String>,

    /// Skip entries whose name matches a shell pattern
    #[arg(long = "exclude-glob", value_name = "PATTERN")]
    exclude_glob: Option<String>,

    /// Skip hidden entries
    #[arg(short = 'H', long = "ignore-hidden")]
    ignore_hidden: bool,

    /// Report size per file instead of a size histogram
    #[arg(long = "per-file")]
    per_file: bool,

    /// Show user and group names instead of numeric ids
    #[arg(long = "names")]
    names: bool,

    /// Number of worker threads
    /// (0 = auto-detect, 1 = sequential, N = use N workers)
    #[arg(short = 'j', long = "jobs", default_value = "1")]
    jobs: usize,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "table")]
    format: OutputFormat,

    /// Append a histogram of file sizes by range
    #[arg(long = "size-ranges")]
    size_ranges: bool,

    /// Append size percentiles (p50, p90, p95, p99)
    #[arg(long = "percentiles")]
    percentiles: bool,

    /// Use powers of 1000 for size ranges
    #[arg(long = "si")]
    si: bool,

    /// Show only the first N rows of each statistic
    #[arg(short = 'n', long = "top", value_name = "N")]
    top: Option<usize>,

    /// Control color output: auto, always, never
    #[arg(long = "color", value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Log every visited and excluded entry to stderr
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Args {
    /// Requested kinds after applying `--all-stats` and the size implications.
    fn kinds(&self) -> Vec<StatKind> {
        let mut kinds = if self.all_stats {
            let caps = Capabilities::probe(&self.path);
            StatKind::ALL
                .into_iter()
                .filter(|k| caps.supports(*k))
                .collect()
        } else if self.stat.is_empty() {
            vec![StatKind::Type]
        } else {
            self.stat.clone()
        };

        if (self.size_ranges || self.percentiles) && !kinds.contains(&StatKind::Size) {
            kinds.push(StatKind::Size);
        }
        kinds
    }

    fn filter(&self) -> FilterSpec {
        let mut spec = FilterSpec::default();
        for name in &self.exclude_dir {
            spec = spec.exclude_dir(name);
        }
        for name in &self.exclude_file {
            spec = spec.exclude_file(name);
        }
        for ext in &self.exclude_ext {
            spec = spec.exclude_extension(ext);
        }
        if let Some(pattern) = &self.exclude_glob {
            spec = spec.exclude_glob(pattern);
        }
        spec
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let root = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(&args.path)
    };

    let mut config = WalkConfig::new(root)
        .with_stats(args.kinds())
        .with_filter(args.filter())
        .with_jobs(args.jobs);
    config.ignore_hidden = args.ignore_hidden;
    config.per_file_size = args.per_file;
    config.symbolic_owners = args.names;

    let report = match TreeWalker::new(config).and_then(|walker| walker.walk()) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("treestat: {}", e);
            process::exit(1);
        }
    };

    if !report.issues.is_empty() {
        warn!(count = report.issues.len(), "some entries could not be read");
    }

    let output_config = OutputConfig {
        format: args.format,
        use_color: matches!(args.format, OutputFormat::Table | OutputFormat::Chart)
            && should_use_color(args.color),
        top: args.top,
        size_ranges: args.size_ranges,
        percentiles: args.percentiles,
        size_base: if args.si { 1000 } else { 1024 },
    };

    if let Err(e) = print_report(&report, &output_config) {
        eprintln!("treestat: error writing output: {}", e);
        process::exit(1);
    }
}
