//! TreeWalker - visits every entry under a root and fills the store

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::classify::{EntryFlags, FileType, classify_mode};
use crate::error::{Error, Result};
use crate::kind::{Accumulation, BucketShape, Descriptor, HeaderMode, StatKind, header};
use crate::platform::{Capabilities, OwnerNames, RawMeta};
use crate::store::{AggregationStore, Cell, StatsData, Tally};

use super::config::WalkConfig;
use super::filter::FilterChain;
use super::utils::{count_lines, extension_key, local_date, permission_key};

/// Entries a task counts locally before merging into the shared store.
const BATCH_SIZE: u64 = 2_000;

/// One visited filesystem object.
#[derive(Debug, Clone)]
pub struct Entry<'a> {
    pub path: &'a Path,
    pub name: String,
    pub file_type: FileType,
    pub meta: RawMeta,
    pub flags: EntryFlags,
}

/// Result of a finished walk.
#[derive(Debug)]
pub struct WalkReport {
    pub elapsed: Duration,
    pub data: StatsData,
    /// Recoverable per-entry failures, in no particular order
    pub issues: Vec<Error>,
    header_mode: HeaderMode,
}

impl WalkReport {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Column labels for a kind, in the mode this walk ran with.
    pub fn header(&self, kind: StatKind) -> &'static [&'static str] {
        header(kind, self.header_mode)
    }

    pub fn header_mode(&self) -> HeaderMode {
        self.header_mode
    }
}

/// State shared by every task of one walk.
struct WalkState {
    store: AggregationStore,
    issues: Mutex<Vec<Error>>,
}

impl WalkState {
    fn report(&self, err: Error) {
        warn!("{}", err);
        self.issues.lock().push(err);
    }
}

/// Walks a directory tree and aggregates the requested statistics.
pub struct TreeWalker {
    config: WalkConfig,
    chain: FilterChain,
    /// One descriptor per requested kind; the index is the bucket slot
    plan: Vec<&'static Descriptor>,
    owners: Option<OwnerNames>,
}

impl TreeWalker {
    /// Validate the configuration against the root and the platform.
    ///
    /// Every fatal error is raised here, before anything is walked.
    pub fn new(config: WalkConfig) -> Result<Self> {
        let meta = fs::metadata(&config.root).map_err(|source| Error::RootInaccessible {
            path: config.root.clone(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(Error::NotADirectory(config.root.clone()));
        }

        let kinds = config.requested();
        Capabilities::probe(&config.root).check(&kinds, config.symbolic_owners)?;
        let chain = FilterChain::new(&config.filter, config.ignore_hidden)?;

        let owners = if config.symbolic_owners && kinds.iter().any(|k| k.is_owner()) {
            Some(OwnerNames::new()?)
        } else {
            None
        };

        let plan = kinds
            .iter()
            .map(|kind| kind.descriptor(config.per_file_size))
            .collect();

        Ok(Self {
            config,
            chain,
            plan,
            owners,
        })
    }

    /// Walk the tree and return the finished statistics.
    pub fn walk(&self) -> Result<WalkReport> {
        let start = Instant::now();
        let layout: Vec<(StatKind, BucketShape)> =
            self.plan.iter().map(|d| (d.kind, d.shape)).collect();
        let state = WalkState {
            store: AggregationStore::new(layout),
            issues: Mutex::new(Vec::new()),
        };

        info!(
            root = %self.config.root.display(),
            jobs = self.config.jobs,
            "starting walk"
        );

        if self.config.jobs == 1 {
            self.walk_sequential(&state)?;
        } else {
            self.walk_parallel(&state)?;
        }

        let WalkState { store, issues } = state;
        let data = store.finish();
        let issues = issues.into_inner();
        let elapsed = start.elapsed();

        info!(
            entries = data.entries(),
            issues = issues.len(),
            elapsed = ?elapsed,
            "walk complete"
        );

        Ok(WalkReport {
            elapsed,
            data,
            issues,
            header_mode: self.config.header_mode(),
        })
    }

    fn walk_sequential(&self, state: &WalkState) -> Result<()> {
        let mut tally = state.store.tally();
        for path in self.list_root(state)? {
            if let Some(dir) = self.visit(&path, &mut tally, state) {
                self.walk_dir(&dir, &mut tally, state);
            }
            self.flush_if_full(&mut tally, state);
        }
        state.store.merge(&mut tally);
        Ok(())
    }

    /// Count the top level here, then hand each subdirectory to the pool.
    fn walk_parallel(&self, state: &WalkState) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs)
            .thread_name(|i| format!("treestat-walk-{}", i))
            .build()?;
        debug!(threads = pool.current_num_threads(), "worker pool ready");

        let mut tally = state.store.tally();
        let mut subdirs = Vec::new();
        for path in self.list_root(state)? {
            if let Some(dir) = self.visit(&path, &mut tally, state) {
                subdirs.push(dir);
            }
        }
        state.store.merge(&mut tally);

        pool.install(|| {
            subdirs.par_iter().for_each(|dir| {
                let mut tally = state.store.tally();
                self.walk_dir(dir, &mut tally, state);
                state.store.merge(&mut tally);
            });
        });
        Ok(())
    }

    fn walk_dir(&self, dir: &Path, tally: &mut Tally, state: &WalkState) {
        let skipped = |source| state.report(read_dir_error(dir, source));
        let entries = match list_dir(dir, skipped) {
            Ok(entries) => entries,
            Err(source) => {
                state.report(read_dir_error(dir, source));
                return;
            }
        };

        for path in entries {
            if let Some(subdir) = self.visit(&path, tally, state) {
                self.walk_dir(&subdir, tally, state);
            }
            self.flush_if_full(tally, state);
        }
    }

    fn flush_if_full(&self, tally: &mut Tally, state: &WalkState) {
        if tally.entries() >= BATCH_SIZE {
            state.store.merge(tally);
        }
    }

    fn list_root(&self, state: &WalkState) -> Result<Vec<PathBuf>> {
        let root = &self.config.root;
        let skipped = |source| state.report(read_dir_error(root, source));
        list_dir(root, skipped).map_err(|source| Error::RootInaccessible {
            path: root.clone(),
            source,
        })
    }

    /// Stat, classify, filter and record one entry.
    ///
    /// Returns the path again when it is a directory to descend into.
    fn visit(&self, path: &Path, tally: &mut Tally, state: &WalkState) -> Option<PathBuf> {
        let meta = match RawMeta::read(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "vanished before stat");
                return None;
            }
            Err(source) => {
                state.report(Error::Stat {
                    path: path.to_path_buf(),
                    source,
                });
                return None;
            }
        };

        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let file_type = classify_mode(meta.mode);
        let flags = EntryFlags::from_meta(&name, &meta);

        if let Some(rule) = self
            .chain
            .check(&name, file_type == FileType::Dir, flags.hidden)
        {
            debug!(path = %path.display(), %rule, "excluded");
            return None;
        }
        debug!(path = %path.display(), file_type = %file_type, "visit");

        let entry = Entry {
            path,
            name,
            file_type,
            meta,
            flags,
        };
        self.record(&entry, tally, state);

        (file_type == FileType::Dir).then(|| path.to_path_buf())
    }

    fn record(&self, entry: &Entry<'_>, tally: &mut Tally, state: &WalkState) {
        tally.count_entry();
        for (slot, descriptor) in self.plan.iter().enumerate() {
            if !descriptor.applies.matches(entry.file_type, entry.flags) {
                continue;
            }
            match (descriptor.rule, descriptor.shape) {
                (Accumulation::Increment, BucketShape::Nested) => {
                    let dir = parent_key(entry.path);
                    tally.bucket_mut(slot).add_nested(dir, entry.file_type, 1);
                }
                (Accumulation::Increment, _) => {
                    let key = self.key(descriptor.kind, entry);
                    tally.bucket_mut(slot).add(key, 1);
                }
                (Accumulation::Set, _) => {
                    let value = self.value(descriptor.kind, entry, state);
                    tally
                        .bucket_mut(slot)
                        .set(entry.path.display().to_string(), value);
                }
            }
        }
    }

    /// Key for flat counting kinds.
    fn key(&self, kind: StatKind, entry: &Entry<'_>) -> Cell {
        let meta = &entry.meta;
        match kind {
            StatKind::Type => entry.file_type.into(),
            StatKind::Permission => permission_key(meta.mode).into(),
            StatKind::Size => meta.size.into(),
            StatKind::LinkCount => meta.nlink.into(),
            StatKind::Uid => match &self.owners {
                Some(owners) => owners.user(meta.uid).into(),
                None => Cell::Int(meta.uid.into()),
            },
            StatKind::Gid => match &self.owners {
                Some(owners) => owners.group(meta.gid).into(),
                None => Cell::Int(meta.gid.into()),
            },
            StatKind::ChangeTime => local_date(meta.ctime).into(),
            StatKind::ModifyTime => local_date(meta.mtime).into(),
            StatKind::BirthTime => meta
                .btime
                .map(local_date)
                .unwrap_or_else(|| "unknown".to_string())
                .into(),
            StatKind::Extension => extension_key(&entry.name).into(),
            // Nested and per-path kinds are not keyed here
            StatKind::FilesPerDir
            | StatKind::HiddenPerDir
            | StatKind::ArchivesPerDir
            | StatKind::ReadonlyPerDir
            | StatKind::LineCount
            | StatKind::BlockCount => entry.file_type.into(),
        }
    }

    /// Scalar for per-path kinds.
    fn value(&self, kind: StatKind, entry: &Entry<'_>, state: &WalkState) -> u64 {
        match kind {
            StatKind::Size => entry.meta.size,
            StatKind::BlockCount => entry.meta.blocks.unwrap_or(0),
            StatKind::LineCount => match count_lines(entry.path) {
                Ok(lines) => lines,
                Err(source) => {
                    state.report(Error::LineCount {
                        path: entry.path.to_path_buf(),
                        source,
                    });
                    0
                }
            },
            _ => 0,
        }
    }
}

/// Directory key for per-directory kinds: the entry's immediate parent.
fn parent_key(path: &Path) -> Cell {
    path.parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
        .into()
}

fn read_dir_error(dir: &Path, source: std::io::Error) -> Error {
    Error::ReadDir {
        path: dir.to_path_buf(),
        source,
    }
}

/// List a directory, sorted by name so traces are stable within a subtree.
///
/// Opening `dir` is the only fatal failure. An entry that cannot be read
/// mid-listing goes to `skipped` and the listing continues.
fn list_dir(
    dir: &Path,
    mut skipped: impl FnMut(std::io::Error),
) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        match entry {
            Ok(entry) => entries.push(entry),
            Err(e) => skipped(e),
        }
    }
    entries.sort_by_key(|e| e.file_name());
    Ok(entries.into_iter().map(|e| e.path()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::FilterSpec;
    use std::fs;
    use tempfile::TempDir;

    fn build(root: &Path) {
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::write(root.join("README.md"), "# hi\n").unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}\n// end\n").unwrap();
        fs::write(root.join("src/nested/data.bin"), vec![0u8; 2048]).unwrap();
    }

    fn walk(config: WalkConfig) -> WalkReport {
        TreeWalker::new(config).unwrap().walk().unwrap()
    }

    #[test]
    fn test_counts_every_entry_below_root() {
        let dir = TempDir::new().unwrap();
        build(dir.path());

        let report = walk(WalkConfig::new(dir.path()));
        let data = &report.data;
        assert_eq!(data.entries(), 5);
        assert_eq!(data.count(StatKind::Type, &FileType::File.into()), 3);
        assert_eq!(data.count(StatKind::Type, &FileType::Dir.into()), 2);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_root_must_be_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, "x").unwrap();

        assert!(matches!(
            TreeWalker::new(WalkConfig::new(&file)),
            Err(Error::NotADirectory(_))
        ));
        assert!(matches!(
            TreeWalker::new(WalkConfig::new(dir.path().join("missing"))),
            Err(Error::RootInaccessible { .. })
        ));
    }

    #[test]
    fn test_per_dir_keys_on_parent() {
        let dir = TempDir::new().unwrap();
        build(dir.path());

        let report = walk(WalkConfig::new(dir.path()).with_stats([StatKind::FilesPerDir]));
        let Some(crate::store::Bucket::Nested(m)) = report.data.get(StatKind::FilesPerDir) else {
            panic!("expected nested bucket");
        };
        let src = Cell::from(dir.path().join("src").display().to_string());
        let root = Cell::from(dir.path().display().to_string());
        assert_eq!(m[&src][&FileType::File.into()], 1);
        assert_eq!(m[&src][&FileType::Dir.into()], 1);
        assert_eq!(m[&root][&FileType::Dir.into()], 1);
        // Seeded types render as zero
        assert_eq!(m[&root][&FileType::Pipe.into()], 0);
    }

    #[test]
    fn test_line_and_size_values_per_path() {
        let dir = TempDir::new().unwrap();
        build(dir.path());

        let mut config =
            WalkConfig::new(dir.path()).with_stats([StatKind::LineCount, StatKind::Size]);
        config.per_file_size = true;
        let report = walk(config);

        let Some(crate::store::Bucket::PerPath(lines)) = report.data.get(StatKind::LineCount)
        else {
            panic!("expected per-path bucket");
        };
        let main = dir.path().join("src/main.rs").display().to_string();
        assert_eq!(lines[&main], 2);
        assert_eq!(lines.len(), 3);

        let Some(crate::store::Bucket::PerPath(sizes)) = report.data.get(StatKind::Size) else {
            panic!("expected per-path bucket");
        };
        let data = dir.path().join("src/nested/data.bin").display().to_string();
        assert_eq!(sizes[&data], 2048);
        assert_eq!(report.header(StatKind::Size), &["Path", "Size"]);
    }

    #[test]
    fn test_excluded_directory_is_not_descended() {
        let dir = TempDir::new().unwrap();
        build(dir.path());
        let config = WalkConfig::new(dir.path())
            .with_filter(FilterSpec::default().exclude_dir("src"));

        let report = walk(config);
        assert_eq!(report.data.entries(), 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dir = TempDir::new().unwrap();
        build(dir.path());
        for i in 0..20 {
            fs::create_dir_all(dir.path().join(format!("d{}", i % 4))).unwrap();
            fs::write(dir.path().join(format!("d{}/f{}.txt", i % 4, i)), "x\n").unwrap();
        }
        let kinds = [
            StatKind::Type,
            StatKind::Extension,
            StatKind::FilesPerDir,
            StatKind::LineCount,
        ];

        let sequential = walk(WalkConfig::new(dir.path()).with_stats(kinds));
        let parallel = walk(WalkConfig::new(dir.path()).with_stats(kinds).with_jobs(4));
        assert_eq!(sequential.data, parallel.data);
    }

    #[test]
    fn test_list_dir_sorts_and_reports_nothing_on_clean_listing() {
        let dir = TempDir::new().unwrap();
        build(dir.path());

        let mut skipped = Vec::new();
        let entries = list_dir(dir.path(), |e| skipped.push(e)).unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["README.md", "src"]);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_list_dir_open_failure_is_returned() {
        let dir = TempDir::new().unwrap();
        let mut skipped = 0;
        let err = list_dir(&dir.path().join("missing"), |_| skipped += 1).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_read_dir_error_is_recoverable() {
        let err = read_dir_error(
            Path::new("/data/x"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(err.is_recoverable());
        assert_eq!(err.path(), Some(&PathBuf::from("/data/x")));
    }
}
