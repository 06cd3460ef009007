//! Entry classification: file type tags and hidden/archive/readonly flags
//!
//! Classification is pure: it only looks at a basename and a [`RawMeta`].
//! The path-taking predicates stat the path themselves and answer `false`
//! when it has vanished, so callers racing a listing never see an error.

use std::fmt;
use std::path::Path;

use serde::{Serialize, Serializer};

use crate::platform::RawMeta;
#[cfg(target_os = "macos")]
use crate::platform::UF_HIDDEN;
#[cfg(windows)]
use crate::platform::{FILE_ATTRIBUTE_ARCHIVE, FILE_ATTRIBUTE_HIDDEN, FILE_ATTRIBUTE_READONLY};

/// Type tag derived from the mode bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileType {
    File,
    Dir,
    Symlink,
    CharDevice,
    BlockDevice,
    Pipe,
    Socket,
    Door,
    Port,
    Whiteout,
    Unknown,
}

impl FileType {
    pub const ALL: [FileType; 11] = [
        FileType::File,
        FileType::Dir,
        FileType::Symlink,
        FileType::CharDevice,
        FileType::BlockDevice,
        FileType::Pipe,
        FileType::Socket,
        FileType::Door,
        FileType::Port,
        FileType::Whiteout,
        FileType::Unknown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FileType::File => "file",
            FileType::Dir => "dir",
            FileType::Symlink => "symlink",
            FileType::CharDevice => "char",
            FileType::BlockDevice => "block",
            FileType::Pipe => "pipe",
            FileType::Socket => "socket",
            FileType::Door => "door",
            FileType::Port => "port",
            FileType::Whiteout => "whiteout",
            FileType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for FileType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

const S_IFMT: u32 = 0o170000;

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
const S_IFDOOR: Option<u32> = Some(0o150000);
#[cfg(not(any(target_os = "solaris", target_os = "illumos")))]
const S_IFDOOR: Option<u32> = None;

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
const S_IFPORT: Option<u32> = Some(0o160000);
#[cfg(not(any(target_os = "solaris", target_os = "illumos")))]
const S_IFPORT: Option<u32> = None;

#[cfg(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
const S_IFWHT: Option<u32> = Some(0o160000);
#[cfg(not(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
const S_IFWHT: Option<u32> = None;

// Checked in order; the first match wins.
const MODE_TABLE: [(Option<u32>, FileType); 10] = [
    (Some(0o100000), FileType::File),
    (Some(0o040000), FileType::Dir),
    (Some(0o120000), FileType::Symlink),
    (Some(0o020000), FileType::CharDevice),
    (Some(0o060000), FileType::BlockDevice),
    (Some(0o010000), FileType::Pipe),
    (Some(0o140000), FileType::Socket),
    (S_IFDOOR, FileType::Door),
    (S_IFPORT, FileType::Port),
    (S_IFWHT, FileType::Whiteout),
];

/// Map `st_mode` to a type tag.
pub fn classify_mode(mode: u32) -> FileType {
    let format = mode & S_IFMT;
    MODE_TABLE
        .iter()
        .find(|(bits, _)| *bits == Some(format))
        .map(|(_, file_type)| *file_type)
        .unwrap_or(FileType::Unknown)
}

/// Boolean facts about one entry, independent of each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFlags {
    pub hidden: bool,
    pub archive: bool,
    pub readonly: bool,
}

impl EntryFlags {
    pub fn from_meta(name: &str, meta: &RawMeta) -> Self {
        Self {
            hidden: hidden_from_meta(name, meta),
            archive: archive_from_meta(name, meta),
            readonly: readonly_from_meta(meta),
        }
    }
}

#[cfg(windows)]
pub fn hidden_from_meta(_name: &str, meta: &RawMeta) -> bool {
    meta.attributes & FILE_ATTRIBUTE_HIDDEN != 0
}

#[cfg(target_os = "macos")]
pub fn hidden_from_meta(name: &str, meta: &RawMeta) -> bool {
    meta.attributes & UF_HIDDEN != 0 || name.starts_with('.')
}

#[cfg(all(unix, not(target_os = "macos")))]
pub fn hidden_from_meta(name: &str, _meta: &RawMeta) -> bool {
    name.starts_with('.')
}

#[cfg(windows)]
pub fn archive_from_meta(_name: &str, meta: &RawMeta) -> bool {
    meta.attributes & FILE_ATTRIBUTE_ARCHIVE != 0
}

#[cfg(not(windows))]
pub fn archive_from_meta(name: &str, _meta: &RawMeta) -> bool {
    is_tar_name(name)
}

#[cfg(windows)]
pub fn readonly_from_meta(meta: &RawMeta) -> bool {
    meta.attributes & FILE_ATTRIBUTE_READONLY != 0
}

#[cfg(not(windows))]
pub fn readonly_from_meta(meta: &RawMeta) -> bool {
    const OWNER_READ: u32 = 0o400;
    const OWNER_WRITE: u32 = 0o200;
    meta.mode & OWNER_WRITE == 0 && meta.mode & OWNER_READ != 0
}

/// True when the suffix from the first `.` is `.tar` or `.tar.*`.
pub fn is_tar_name(name: &str) -> bool {
    let Some(dot) = name.find('.') else {
        return false;
    };
    let suffix = name[dot..].to_lowercase();
    suffix == ".tar" || suffix.starts_with(".tar.")
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Hidden check for a path; `false` if the path no longer exists.
pub fn is_hidden(path: &Path) -> bool {
    RawMeta::read(path)
        .map(|meta| hidden_from_meta(&basename(path), &meta))
        .unwrap_or(false)
}

/// Archive check for a path; `false` if the path no longer exists.
pub fn is_archive(path: &Path) -> bool {
    RawMeta::read(path)
        .map(|meta| archive_from_meta(&basename(path), &meta))
        .unwrap_or(false)
}

/// Read-only check for a path; `false` if the path no longer exists.
pub fn is_readonly(path: &Path) -> bool {
    RawMeta::read(path)
        .map(|meta| readonly_from_meta(&meta))
        .unwrap_or(false)
}
