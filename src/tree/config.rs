//! Configuration types for the tree walker

use std::path::PathBuf;

use crate::kind::{HeaderMode, StatKind};

use super::filter::FilterSpec;

/// Configuration for one walk.
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// Root directory; must exist and be a directory
    pub root: PathBuf,
    /// Requested kinds, in display order; duplicates are ignored
    pub stats: Vec<StatKind>,
    pub filter: FilterSpec,
    /// Number of worker threads.
    /// 0 = auto-detect (use all available cores)
    /// 1 = sequential (no pool)
    /// N = use N worker threads
    pub jobs: usize,
    /// Skip hidden entries
    pub ignore_hidden: bool,
    /// Record per-file sizes instead of a size histogram
    pub per_file_size: bool,
    /// Resolve uid/gid to user/group names
    pub symbolic_owners: bool,
}

impl WalkConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn with_stats(mut self, stats: impl IntoIterator<Item = StatKind>) -> Self {
        self.stats = stats.into_iter().collect();
        self
    }

    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Requested kinds with duplicates removed, first occurrence kept.
    pub fn requested(&self) -> Vec<StatKind> {
        let mut kinds = Vec::with_capacity(self.stats.len());
        for kind in &self.stats {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        kinds
    }

    pub fn header_mode(&self) -> HeaderMode {
        HeaderMode {
            per_file_size: self.per_file_size,
            symbolic_owners: self.symbolic_owners,
        }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            stats: vec![StatKind::Type],
            filter: FilterSpec::default(),
            jobs: 1,
            ignore_hidden: false,
            per_file_size: false,
            symbolic_owners: false,
        }
    }
}
