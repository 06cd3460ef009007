//! Directory tree walking
//!
//! `TreeWalker` visits every entry below a root, filters it through the
//! `FilterChain`, classifies it and accumulates the requested statistics.
//! With more than one job, each top-level subdirectory becomes a task on a
//! rayon pool and all tasks feed one shared store.

mod config;
mod filter;
mod utils;
mod walker;

// Re-export public types
pub use config::WalkConfig;
pub use filter::{Exclusion, FilterChain, FilterSpec};
pub use utils::{count_lines, extension_of};
pub use walker::{Entry, TreeWalker, WalkReport};
