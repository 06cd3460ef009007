//! Aggregation store
//!
//! Three layers hold collected statistics:
//!
//! - [`Tally`]: a worker-local, unsynchronized set of buckets. Each walker
//!   task fills its own tally.
//! - [`AggregationStore`]: the shared store. One lock per bucket; tallies are
//!   merged into it in batches.
//! - [`StatsData`]: the finished, immutable result handed to the summary and
//!   output layers.

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::Mutex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::classify::FileType;
use crate::kind::{BucketShape, StatKind};

/// A typed key or value in a bucket row.
///
/// Numeric cells order before text cells; within a variant the natural
/// order applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cell {
    Int(u64),
    Text(String),
}

impl Cell {
    pub fn as_int(&self) -> Option<u64> {
        match self {
            Cell::Int(n) => Some(*n),
            Cell::Text(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for Cell {
    fn from(n: u64) -> Self {
        Cell::Int(n)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<FileType> for Cell {
    fn from(t: FileType) -> Self {
        Cell::Text(t.name().to_string())
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Int(n) => serializer.serialize_u64(*n),
            Cell::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Storage for one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bucket {
    Flat(BTreeMap<Cell, u64>),
    Nested(BTreeMap<Cell, BTreeMap<Cell, u64>>),
    PerPath(BTreeMap<String, u64>),
}

impl Bucket {
    pub fn new(shape: BucketShape) -> Self {
        match shape {
            BucketShape::Flat => Bucket::Flat(BTreeMap::new()),
            BucketShape::Nested => Bucket::Nested(BTreeMap::new()),
            BucketShape::PerPath => Bucket::PerPath(BTreeMap::new()),
        }
    }

    pub fn shape(&self) -> BucketShape {
        match self {
            Bucket::Flat(_) => BucketShape::Flat,
            Bucket::Nested(_) => BucketShape::Nested,
            Bucket::PerPath(_) => BucketShape::PerPath,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Bucket::Flat(m) => m.is_empty(),
            Bucket::Nested(m) => m.is_empty(),
            Bucket::PerPath(m) => m.is_empty(),
        }
    }

    /// Number of rows this bucket flattens to.
    pub fn len(&self) -> usize {
        match self {
            Bucket::Flat(m) => m.len(),
            Bucket::Nested(m) => m.values().map(BTreeMap::len).sum(),
            Bucket::PerPath(m) => m.len(),
        }
    }

    /// Add `n` to a flat key.
    pub fn add(&mut self, key: Cell, n: u64) {
        if let Bucket::Flat(m) = self {
            *m.entry(key).or_insert(0) += n;
        }
    }

    /// Add `n` to a per-directory type count, seeding every type at zero
    /// the first time the directory is seen.
    pub fn add_nested(&mut self, dir: Cell, file_type: FileType, n: u64) {
        if let Bucket::Nested(m) = self {
            let counts = m.entry(dir).or_insert_with(seeded_type_counts);
            *counts.entry(file_type.into()).or_insert(0) += n;
        }
    }

    /// Store a per-path value.
    pub fn set(&mut self, path: String, value: u64) {
        if let Bucket::PerPath(m) = self {
            m.insert(path, value);
        }
    }

    /// Fold `other` into `self`: counts are summed, per-path values set.
    pub fn merge(&mut self, other: Bucket) {
        match (self, other) {
            (Bucket::Flat(into), Bucket::Flat(from)) => {
                for (key, n) in from {
                    *into.entry(key).or_insert(0) += n;
                }
            }
            (Bucket::Nested(into), Bucket::Nested(from)) => {
                for (dir, counts) in from {
                    let target = into.entry(dir).or_insert_with(seeded_type_counts);
                    for (key, n) in counts {
                        *target.entry(key).or_insert(0) += n;
                    }
                }
            }
            (Bucket::PerPath(into), Bucket::PerPath(from)) => {
                into.extend(from);
            }
            (into, from) => {
                debug_assert!(
                    false,
                    "bucket shape mismatch: {:?} vs {:?}",
                    into.shape(),
                    from.shape()
                );
            }
        }
    }
}

fn seeded_type_counts() -> BTreeMap<Cell, u64> {
    FileType::ALL.iter().map(|t| (Cell::from(*t), 0)).collect()
}

impl Serialize for Bucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Bucket::Flat(m) => m.serialize(serializer),
            Bucket::Nested(m) => m.serialize(serializer),
            Bucket::PerPath(m) => m.serialize(serializer),
        }
    }
}

/// Worker-local partial buckets, in the order the kinds were requested.
#[derive(Debug, Clone)]
pub struct Tally {
    buckets: Vec<(StatKind, Bucket)>,
    entries: u64,
}

impl Tally {
    pub fn new(layout: &[(StatKind, BucketShape)]) -> Self {
        Self {
            buckets: layout
                .iter()
                .map(|&(kind, shape)| (kind, Bucket::new(shape)))
                .collect(),
            entries: 0,
        }
    }

    /// Mutable access to the bucket at `slot` (the kind's request index).
    pub fn bucket_mut(&mut self, slot: usize) -> &mut Bucket {
        &mut self.buckets[slot].1
    }

    /// Note one counted entry.
    pub fn count_entry(&mut self) {
        self.entries += 1;
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Move the contents out, leaving empty buckets of the same shape.
    fn drain(&mut self) -> (Vec<Bucket>, u64) {
        let buckets = self
            .buckets
            .iter_mut()
            .map(|(_, b)| {
                let shape = b.shape();
                std::mem::replace(b, Bucket::new(shape))
            })
            .collect();
        (buckets, std::mem::take(&mut self.entries))
    }
}

/// Shared store: the only state written by more than one walker task.
#[derive(Debug)]
pub struct AggregationStore {
    layout: Vec<(StatKind, BucketShape)>,
    buckets: Vec<Mutex<Bucket>>,
    entries: Mutex<u64>,
}

impl AggregationStore {
    pub fn new(layout: Vec<(StatKind, BucketShape)>) -> Self {
        let buckets = layout
            .iter()
            .map(|&(_, shape)| Mutex::new(Bucket::new(shape)))
            .collect();
        Self {
            layout,
            buckets,
            entries: Mutex::new(0),
        }
    }

    /// An empty tally with this store's layout.
    pub fn tally(&self) -> Tally {
        Tally::new(&self.layout)
    }

    /// Merge and reset a tally. Each bucket is locked on its own.
    pub fn merge(&self, tally: &mut Tally) {
        let (partials, entries) = tally.drain();
        for (slot, partial) in partials.into_iter().enumerate() {
            if !partial.is_empty() {
                self.buckets[slot].lock().merge(partial);
            }
        }
        *self.entries.lock() += entries;
    }

    /// Consume the store once every task has finished.
    pub fn finish(self) -> StatsData {
        let stats = self
            .layout
            .iter()
            .zip(self.buckets)
            .map(|(&(kind, _), bucket)| (kind, bucket.into_inner()))
            .collect();
        StatsData {
            stats,
            entries: self.entries.into_inner(),
        }
    }
}

/// Finished statistics, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsData {
    stats: Vec<(StatKind, Bucket)>,
    entries: u64,
}

impl StatsData {
    /// Number of entries counted (root excluded).
    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn get(&self, kind: StatKind) -> Option<&Bucket> {
        self.stats.iter().find(|(k, _)| *k == kind).map(|(_, b)| b)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatKind, &Bucket)> {
        self.stats.iter().map(|(k, b)| (*k, b))
    }

    /// Flat count for `key` in `kind`, zero when absent.
    pub fn count(&self, kind: StatKind, key: &Cell) -> u64 {
        match self.get(kind) {
            Some(Bucket::Flat(m)) => m.get(key).copied().unwrap_or(0),
            _ => 0,
        }
    }

    /// Size → file count, from either the histogram or per-file sizes.
    pub fn size_histogram(&self) -> BTreeMap<u64, u64> {
        let mut histogram = BTreeMap::new();
        match self.get(StatKind::Size) {
            Some(Bucket::Flat(m)) => {
                for (key, n) in m {
                    if let Some(size) = key.as_int() {
                        *histogram.entry(size).or_insert(0) += n;
                    }
                }
            }
            Some(Bucket::PerPath(m)) => {
                for size in m.values() {
                    *histogram.entry(*size).or_insert(0) += 1;
                }
            }
            _ => {}
        }
        histogram
    }
}

impl Serialize for StatsData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.stats.len()))?;
        for (kind, bucket) in &self.stats {
            map.serialize_entry(kind, bucket)?;
        }
        map.end()
    }
}
