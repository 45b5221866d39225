//! # MotorDB Testkit
//!
//! Test utilities for the MotorDB index engine.
//!
//! This crate provides:
//! - Index fixtures, a deterministic identity hasher and tracing setup
//! - Property-based test generators using proptest
//! - A reference-model harness that checks any index against a `BTreeMap`
//! - Stress testing utilities for shared indexes
//!
//! ## Usage
//!
//! ```rust
//! use motordb_testkit::prelude::*;
//!
//! init_tracing();
//! for mut index in open_all::<i32, i32>(4, 8) {
//!     let ops = [
//!         IndexOp::Insert { key: 1, value: 10 },
//!         IndexOp::Delete { key: 1 },
//!     ];
//!     replay(&mut index, &ops).unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod model;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::model::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use model::*;
pub use stress::*;
