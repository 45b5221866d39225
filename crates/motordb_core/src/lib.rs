//! # MotorDB Core
//!
//! In-memory index engine for MotorDB.
//!
//! This crate provides:
//! - One [`Index`] contract: insert-or-replace, point search, delete, full scan
//! - [`BPlusTreeIndex`] with linked leaves and inclusive range queries
//! - [`BTreeIndex`] storing values in every node
//! - [`HashIndex`] with a fixed bucket array and collision chains
//! - [`IndexConfig`] and [`open_index`] for choosing a variant at runtime
//! - [`SharedIndex`] for sharing one index between threads
//!
//! ## Example
//!
//! ```rust
//! use motordb_core::{open_index, IndexConfig, IndexKind};
//!
//! let config = IndexConfig::new().kind(IndexKind::BPlusTree).order(4);
//! let mut index = open_index::<u32, &str>(&config).unwrap();
//!
//! index.insert(2, "two");
//! index.insert(1, "one");
//! assert_eq!(index.insert(2, "deux"), Some("two"));
//! assert_eq!(index.all_values(), vec!["one", "deux"]);
//! ```
//!
//! Indexes are single-threaded: mutation takes `&mut self`. Nothing here
//! installs a `tracing` subscriber; structural events are emitted at
//! `debug` and hot-path details at `trace`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod index;
pub mod stats;

pub use config::IndexConfig;
pub use error::{CoreError, CoreResult};
pub use index::{
    open_index, BPlusTreeIndex, BTreeIndex, HashIndex, Index, IndexKey, IndexKind, SharedIndex,
};
pub use stats::{IndexStats, StatsSnapshot};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
