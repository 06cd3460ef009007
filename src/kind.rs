//! Statistic kinds and their descriptor table
//!
//! Every kind the walker can collect is listed in [`StatKind`]. How a kind
//! is stored and fed is fixed by its [`Descriptor`]: the bucket shape, the
//! accumulation rule and which entries contribute. The walker resolves the
//! requested kinds into descriptors once, before the walk starts.

use std::fmt;

use clap::ValueEnum;
use serde::{Serialize, Serializer};

use crate::classify::{EntryFlags, FileType};

/// One category of statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum StatKind {
    /// Entry type (file, dir, symlink, ...)
    #[value(name = "type")]
    Type,
    /// Permission bits as octal
    #[value(name = "perm")]
    Permission,
    /// File size histogram, or per-file sizes with --per-file
    #[value(name = "size")]
    Size,
    /// Hard link count
    #[value(name = "links")]
    LinkCount,
    /// Owner user id (or name with --names)
    #[value(name = "uid")]
    Uid,
    /// Owner group id (or name with --names)
    #[value(name = "gid")]
    Gid,
    /// Status change date
    #[value(name = "ctime")]
    ChangeTime,
    /// Modification date
    #[value(name = "mtime")]
    ModifyTime,
    /// Creation date
    #[value(name = "btime")]
    BirthTime,
    /// File extension
    #[value(name = "ext")]
    Extension,
    /// Entries per directory, by type
    #[value(name = "files-per-dir")]
    FilesPerDir,
    /// Line count per file
    #[value(name = "lines")]
    LineCount,
    /// Hidden entries per directory, by type
    #[value(name = "hidden-per-dir")]
    HiddenPerDir,
    /// 512-byte block count per file
    #[value(name = "blocks")]
    BlockCount,
    /// Archive entries per directory, by type
    #[value(name = "archives-per-dir")]
    ArchivesPerDir,
    /// Read-only entries per directory, by type
    #[value(name = "readonly-per-dir")]
    ReadonlyPerDir,
}

impl StatKind {
    pub const ALL: [StatKind; 16] = [
        StatKind::Type,
        StatKind::Permission,
        StatKind::Size,
        StatKind::LinkCount,
        StatKind::Uid,
        StatKind::Gid,
        StatKind::ChangeTime,
        StatKind::ModifyTime,
        StatKind::BirthTime,
        StatKind::Extension,
        StatKind::FilesPerDir,
        StatKind::LineCount,
        StatKind::HiddenPerDir,
        StatKind::BlockCount,
        StatKind::ArchivesPerDir,
        StatKind::ReadonlyPerDir,
    ];

    /// Stable name used on the command line and as the JSON/CSV key.
    pub fn name(self) -> &'static str {
        match self {
            StatKind::Type => "type",
            StatKind::Permission => "perm",
            StatKind::Size => "size",
            StatKind::LinkCount => "links",
            StatKind::Uid => "uid",
            StatKind::Gid => "gid",
            StatKind::ChangeTime => "ctime",
            StatKind::ModifyTime => "mtime",
            StatKind::BirthTime => "btime",
            StatKind::Extension => "ext",
            StatKind::FilesPerDir => "files-per-dir",
            StatKind::LineCount => "lines",
            StatKind::HiddenPerDir => "hidden-per-dir",
            StatKind::BlockCount => "blocks",
            StatKind::ArchivesPerDir => "archives-per-dir",
            StatKind::ReadonlyPerDir => "readonly-per-dir",
        }
    }

    /// Human-readable section title.
    pub fn title(self) -> &'static str {
        match self {
            StatKind::Type => "File types",
            StatKind::Permission => "Permissions",
            StatKind::Size => "Sizes",
            StatKind::LinkCount => "Link counts",
            StatKind::Uid => "Owners",
            StatKind::Gid => "Groups",
            StatKind::ChangeTime => "Change dates",
            StatKind::ModifyTime => "Modification dates",
            StatKind::BirthTime => "Creation dates",
            StatKind::Extension => "Extensions",
            StatKind::FilesPerDir => "Entries per directory",
            StatKind::LineCount => "Line counts",
            StatKind::HiddenPerDir => "Hidden entries per directory",
            StatKind::BlockCount => "Block counts",
            StatKind::ArchivesPerDir => "Archives per directory",
            StatKind::ReadonlyPerDir => "Read-only entries per directory",
        }
    }

    /// Descriptor for this kind. Only `size` changes shape with the mode.
    pub fn descriptor(self, per_file_size: bool) -> &'static Descriptor {
        if self == StatKind::Size && per_file_size {
            return &SIZE_PER_FILE;
        }
        &DESCRIPTORS[self as usize]
    }

    /// Whether the bucket is keyed on the entry's parent directory.
    pub fn is_per_dir(self) -> bool {
        matches!(
            self,
            StatKind::FilesPerDir
                | StatKind::HiddenPerDir
                | StatKind::ArchivesPerDir
                | StatKind::ReadonlyPerDir
        )
    }

    /// Whether the kind reports owner ids that may be resolved to names.
    pub fn is_owner(self) -> bool {
        matches!(self, StatKind::Uid | StatKind::Gid)
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for StatKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Layout of a kind's bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketShape {
    /// key -> count
    Flat,
    /// key1 -> (key2 -> count)
    Nested,
    /// path -> scalar
    PerPath,
}

/// How one entry changes the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulation {
    /// Add one to the entry's key.
    Increment,
    /// Store the entry's value under its path.
    Set,
}

/// Which entries contribute to a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applies {
    Any,
    PlainFile,
    Hidden,
    Archive,
    Readonly,
}

impl Applies {
    pub fn matches(self, file_type: FileType, flags: EntryFlags) -> bool {
        match self {
            Applies::Any => true,
            Applies::PlainFile => file_type == FileType::File,
            Applies::Hidden => flags.hidden,
            Applies::Archive => flags.archive,
            Applies::Readonly => flags.readonly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub kind: StatKind,
    pub shape: BucketShape,
    pub rule: Accumulation,
    pub applies: Applies,
}

const fn descriptor(
    kind: StatKind,
    shape: BucketShape,
    rule: Accumulation,
    applies: Applies,
) -> Descriptor {
    Descriptor {
        kind,
        shape,
        rule,
        applies,
    }
}

use Accumulation::{Increment, Set};
use BucketShape::{Flat, Nested, PerPath};

// Indexed by `StatKind as usize`.
static DESCRIPTORS: [Descriptor; 16] = [
    descriptor(StatKind::Type, Flat, Increment, Applies::Any),
    descriptor(StatKind::Permission, Flat, Increment, Applies::Any),
    descriptor(StatKind::Size, Flat, Increment, Applies::PlainFile),
    descriptor(StatKind::LinkCount, Flat, Increment, Applies::Any),
    descriptor(StatKind::Uid, Flat, Increment, Applies::Any),
    descriptor(StatKind::Gid, Flat, Increment, Applies::Any),
    descriptor(StatKind::ChangeTime, Flat, Increment, Applies::Any),
    descriptor(StatKind::ModifyTime, Flat, Increment, Applies::Any),
    descriptor(StatKind::BirthTime, Flat, Increment, Applies::Any),
    descriptor(StatKind::Extension, Flat, Increment, Applies::PlainFile),
    descriptor(StatKind::FilesPerDir, Nested, Increment, Applies::Any),
    descriptor(StatKind::LineCount, PerPath, Set, Applies::PlainFile),
    descriptor(StatKind::HiddenPerDir, Nested, Increment, Applies::Hidden),
    descriptor(StatKind::BlockCount, PerPath, Set, Applies::PlainFile),
    descriptor(StatKind::ArchivesPerDir, Nested, Increment, Applies::Archive),
    descriptor(StatKind::ReadonlyPerDir, Nested, Increment, Applies::Readonly),
];

static SIZE_PER_FILE: Descriptor = descriptor(StatKind::Size, PerPath, Set, Applies::PlainFile);

/// Display modes that change column labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderMode {
    pub per_file_size: bool,
    pub symbolic_owners: bool,
}

/// Ordered column labels for a kind's rows.
pub fn header(kind: StatKind, mode: HeaderMode) -> &'static [&'static str] {
    match kind {
        StatKind::Type => &["Type", "Count"],
        StatKind::Permission => &["Permission", "Count"],
        StatKind::Size if mode.per_file_size => &["Path", "Size"],
        StatKind::Size => &["Size", "Count"],
        StatKind::LinkCount => &["Links", "Count"],
        StatKind::Uid if mode.symbolic_owners => &["User", "Count"],
        StatKind::Uid => &["UID", "Count"],
        StatKind::Gid if mode.symbolic_owners => &["Group", "Count"],
        StatKind::Gid => &["GID", "Count"],
        StatKind::ChangeTime => &["Changed", "Count"],
        StatKind::ModifyTime => &["Modified", "Count"],
        StatKind::BirthTime => &["Created", "Count"],
        StatKind::Extension => &["Extension", "Count"],
        StatKind::FilesPerDir => &["Directory", "Type", "Count"],
        StatKind::LineCount => &["Path", "Lines"],
        StatKind::HiddenPerDir => &["Directory", "Type", "Hidden"],
        StatKind::BlockCount => &["Path", "Blocks"],
        StatKind::ArchivesPerDir => &["Directory", "Type", "Archives"],
        StatKind::ReadonlyPerDir => &["Directory", "Type", "Read-only"],
    }
}
