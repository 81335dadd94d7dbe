//! Partition scope selection.
//!
//! ## Contents
//! - [`NamePattern`] a compiled literal or glob pattern
//! - [`Selector`]    include/exclude pattern sets (exclude always wins)
//! - [`split_list`]  comma-separated list parsing for repeatable flags
//!
//! ## Quick wiring
//! ```text
//! Selector::new(include, exclude)?
//!      ├─► static_names() = Some(names) ─► partitions resolved once at start
//!      └─► static_names() = None        ─► core::watcher applies resolve(name)
//!                                          to every partition feed event
//! ```

mod pattern;
#[allow(clippy::module_inception)]
mod selector;

pub use pattern::NamePattern;
pub use selector::{Selector, split_list};
