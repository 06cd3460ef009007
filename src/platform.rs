//! Platform layer: raw metadata, capability probing and owner names
//!
//! Everything that differs between Unix, macOS and Windows is kept here so
//! the classifier and walker can work on one uniform [`RawMeta`].

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::kind::StatKind;

/// Stat-equivalent fields for one path, read without following symlinks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMeta {
    /// `st_mode`: type bits plus permission bits
    pub mode: u32,
    pub size: u64,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    /// Seconds since the Unix epoch
    pub ctime: i64,
    pub mtime: i64,
    /// `None` where the filesystem does not record creation time
    pub btime: Option<i64>,
    /// 512-byte blocks; `None` where the platform does not report them
    pub blocks: Option<u64>,
    /// `st_flags` on macOS, file attributes on Windows, zero elsewhere
    pub attributes: u32,
}

impl RawMeta {
    /// Stat `path` without following a final symlink.
    pub fn read(path: &Path) -> io::Result<Self> {
        let meta = fs::symlink_metadata(path)?;
        Ok(Self::from_metadata(&meta))
    }

    #[cfg(unix)]
    pub fn from_metadata(meta: &fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self {
            mode: meta.mode(),
            size: meta.size(),
            nlink: meta.nlink(),
            uid: meta.uid(),
            gid: meta.gid(),
            ctime: meta.ctime(),
            mtime: meta.mtime(),
            btime: meta.created().ok().map(epoch_seconds),
            blocks: Some(meta.blocks()),
            attributes: unix_flags(meta),
        }
    }

    #[cfg(windows)]
    pub fn from_metadata(meta: &fs::Metadata) -> Self {
        use std::os::windows::fs::MetadataExt;

        let attributes = meta.file_attributes();
        let readonly = attributes & FILE_ATTRIBUTE_READONLY != 0;
        let file_type = meta.file_type();
        // Synthesized the way POSIX layers on Windows report st_mode.
        let mode = if file_type.is_symlink() {
            0o120000 | 0o777
        } else if file_type.is_dir() {
            0o040000 | if readonly { 0o555 } else { 0o777 }
        } else {
            0o100000 | if readonly { 0o444 } else { 0o666 }
        };

        Self {
            mode,
            size: meta.file_size(),
            nlink: 1,
            uid: 0,
            gid: 0,
            ctime: filetime_seconds(meta.creation_time()),
            mtime: filetime_seconds(meta.last_write_time()),
            btime: Some(filetime_seconds(meta.creation_time())),
            blocks: None,
            attributes,
        }
    }
}

#[cfg(target_os = "macos")]
fn unix_flags(meta: &fs::Metadata) -> u32 {
    use std::os::macos::fs::MetadataExt;
    meta.st_flags()
}

#[cfg(all(unix, not(target_os = "macos")))]
fn unix_flags(_meta: &fs::Metadata) -> u32 {
    0
}

#[cfg(windows)]
fn filetime_seconds(ticks: u64) -> i64 {
    // FILETIME counts 100ns ticks since 1601-01-01
    (ticks / 10_000_000) as i64 - 11_644_473_600
}

#[cfg_attr(windows, allow(dead_code))]
fn epoch_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// `UF_HIDDEN` in `st_flags`.
pub const UF_HIDDEN: u32 = 0x8000;
pub const FILE_ATTRIBUTE_READONLY: u32 = 0x1;
pub const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
pub const FILE_ATTRIBUTE_ARCHIVE: u32 = 0x20;

/// What the current platform and filesystem can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub birth_time: bool,
    pub block_count: bool,
    pub owner_names: bool,
}

impl Capabilities {
    /// Probe the filesystem holding `root`.
    ///
    /// Birth time depends on the filesystem as much as the OS, so it is
    /// checked against the root itself.
    pub fn probe(root: &Path) -> Self {
        let birth_time = fs::symlink_metadata(root)
            .and_then(|m| m.created())
            .is_ok();
        Self {
            birth_time,
            block_count: cfg!(unix),
            owner_names: cfg!(unix),
        }
    }

    pub fn supports(&self, kind: StatKind) -> bool {
        match kind {
            StatKind::BirthTime => self.birth_time,
            StatKind::BlockCount => self.block_count,
            _ => true,
        }
    }

    /// Fail on the first requested kind or mode the platform cannot serve.
    pub fn check(&self, kinds: &[StatKind], symbolic_owners: bool) -> Result<()> {
        if let Some(&kind) = kinds.iter().find(|k| !self.supports(**k)) {
            return Err(Error::UnsupportedStat(kind));
        }
        if symbolic_owners && !self.owner_names {
            return Err(Error::OwnerNamesUnsupported);
        }
        Ok(())
    }
}

/// Cached uid/gid to name resolution, shared by all walker tasks.
#[derive(Debug, Default)]
pub struct OwnerNames {
    users: Mutex<HashMap<u32, String>>,
    groups: Mutex<HashMap<u32, String>>,
}

impl OwnerNames {
    pub fn new() -> Result<Self> {
        if !cfg!(unix) {
            return Err(Error::OwnerNamesUnsupported);
        }
        Ok(Self::default())
    }

    /// User name for `uid`, or the id itself when there is no passwd entry.
    pub fn user(&self, uid: u32) -> String {
        self.users
            .lock()
            .entry(uid)
            .or_insert_with(|| lookup_user(uid).unwrap_or_else(|| uid.to_string()))
            .clone()
    }

    /// Group name for `gid`, or the id itself when there is no group entry.
    pub fn group(&self, gid: u32) -> String {
        self.groups
            .lock()
            .entry(gid)
            .or_insert_with(|| lookup_group(gid).unwrap_or_else(|| gid.to_string()))
            .clone()
    }
}

#[cfg(unix)]
fn lookup_user(uid: u32) -> Option<String> {
    use nix::unistd::{Uid, User};

    User::from_uid(Uid::from_raw(uid)).ok().flatten().map(|u| u.name)
}

#[cfg(unix)]
fn lookup_group(gid: u32) -> Option<String> {
    use nix::unistd::{Gid, Group};

    Group::from_gid(Gid::from_raw(gid)).ok().flatten().map(|g| g.name)
}

#[cfg(not(unix))]
fn lookup_user(_uid: u32) -> Option<String> {
    None
}

#[cfg(not(unix))]
fn lookup_group(_gid: u32) -> Option<String> {
    None
}
