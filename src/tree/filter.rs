//! Exclusion rules applied to every listed entry

use std::collections::HashSet;
use std::fmt;

use glob::Pattern;

use crate::error::{Error, Result};

use super::utils::extension_of;

/// User-supplied exclusion rules.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    /// Directory basenames to skip (with their whole subtree)
    pub exclude_dirs: HashSet<String>,
    /// Non-directory basenames to skip
    pub exclude_files: HashSet<String>,
    /// Extensions to skip, with or without the leading dot
    pub exclude_extensions: HashSet<String>,
    /// Shell pattern matched against every basename
    pub exclude_glob: Option<String>,
}

impl FilterSpec {
    pub fn exclude_dir(mut self, name: impl Into<String>) -> Self {
        self.exclude_dirs.insert(name.into());
        self
    }

    pub fn exclude_file(mut self, name: impl Into<String>) -> Self {
        self.exclude_files.insert(name.into());
        self
    }

    pub fn exclude_extension(mut self, ext: impl Into<String>) -> Self {
        self.exclude_extensions.insert(ext.into());
        self
    }

    pub fn exclude_glob(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_glob = Some(pattern.into());
        self
    }
}

/// The rule that excluded an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    Hidden,
    DirName,
    FileName,
    Extension,
    Glob,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Exclusion::Hidden => "hidden",
            Exclusion::DirName => "excluded directory",
            Exclusion::FileName => "excluded file",
            Exclusion::Extension => "excluded extension",
            Exclusion::Glob => "exclude pattern",
        })
    }
}

/// Compiled filter: evaluated in a fixed order, first exclusion wins.
#[derive(Debug, Clone)]
pub struct FilterChain {
    ignore_hidden: bool,
    dirs: HashSet<String>,
    files: HashSet<String>,
    extensions: HashSet<String>,
    pattern: Option<Pattern>,
}

impl FilterChain {
    pub fn new(spec: &FilterSpec, ignore_hidden: bool) -> Result<Self> {
        let pattern = spec
            .exclude_glob
            .as_ref()
            .map(|p| {
                Pattern::new(p).map_err(|source| Error::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .transpose()?;

        let extensions = spec
            .exclude_extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();

        Ok(Self {
            ignore_hidden,
            dirs: spec.exclude_dirs.clone(),
            files: spec.exclude_files.clone(),
            extensions,
            pattern,
        })
    }

    /// Decide whether an entry is excluded.
    ///
    /// The hidden rule runs first and is independent of the name rules.
    pub fn check(&self, name: &str, is_dir: bool, hidden: bool) -> Option<Exclusion> {
        if self.ignore_hidden && hidden {
            return Some(Exclusion::Hidden);
        }
        if is_dir {
            if self.dirs.contains(name) {
                return Some(Exclusion::DirName);
            }
        } else {
            if self.files.contains(name) {
                return Some(Exclusion::FileName);
            }
            if !self.extensions.is_empty()
                && extension_of(name).is_some_and(|ext| self.extensions.contains(&ext))
            {
                return Some(Exclusion::Extension);
            }
        }
        if self.pattern.as_ref().is_some_and(|p| p.matches(name)) {
            return Some(Exclusion::Glob);
        }
        None
    }

    pub fn is_excluded(&self, name: &str, is_dir: bool, hidden: bool) -> bool {
        self.check(name, is_dir, hidden).is_some()
    }
}
