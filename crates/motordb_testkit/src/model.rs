//! Reference-model harness.
//!
//! Replays an operation sequence against an index and a
//! `std::collections::BTreeMap` side by side, failing on the first step
//! where the index disagrees with the model.

use crate::generators::IndexOp;
use motordb_core::{CoreError, Index};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::trace;

/// A disagreement between an index and the reference model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelMismatch {
    /// An operation returned something the model did not.
    #[error("step {step}: {op:?} returned {actual}, model expected {expected}")]
    Returned {
        /// Position in the sequence.
        step: usize,
        /// The operation that diverged.
        op: IndexOp,
        /// What the index returned.
        actual: String,
        /// What the model returned.
        expected: String,
    },

    /// Entry count differs from the model.
    #[error("step {step}: index holds {actual} entries, model holds {expected}")]
    Len {
        /// Position in the sequence.
        step: usize,
        /// `len()` of the index.
        actual: usize,
        /// Size of the model.
        expected: usize,
    },

    /// Full scan differs from the model.
    #[error("step {step}: full scan {actual:?} differs from model {expected:?}")]
    Scan {
        /// Position in the sequence.
        step: usize,
        /// Values from `all_values()`, sorted for unordered kinds.
        actual: Vec<i32>,
        /// Values from the model.
        expected: Vec<i32>,
    },

    /// The structural self-check failed.
    #[error("step {step}: {source}")]
    Corrupt {
        /// Position in the sequence.
        step: usize,
        /// The reported violation.
        source: CoreError,
    },
}

/// Drives an index and a reference model with the same operations.
pub struct ModelHarness<'a, I: ?Sized> {
    index: &'a mut I,
    model: BTreeMap<i32, i32>,
    ordered: bool,
    verify_each_step: bool,
    step: usize,
}

impl<'a, I: Index<i32, i32> + ?Sized> ModelHarness<'a, I> {
    /// Creates a harness over an empty index.
    pub fn new(index: &'a mut I) -> Self {
        let ordered = index.kind().is_ordered();
        Self {
            index,
            model: BTreeMap::new(),
            ordered,
            verify_each_step: false,
            step: 0,
        }
    }

    /// Runs the full content check and `verify()` after every operation.
    #[must_use]
    pub fn verify_each_step(mut self, value: bool) -> Self {
        self.verify_each_step = value;
        self
    }

    /// Returns the reference model.
    pub fn model(&self) -> &BTreeMap<i32, i32> {
        &self.model
    }

    /// Applies one operation to both sides and compares the results.
    pub fn apply(&mut self, op: IndexOp) -> Result<(), ModelMismatch> {
        let step = self.step;
        self.step += 1;
        trace!(step, ?op, "model step");

        let (actual, expected) = match op {
            IndexOp::Insert { key, value } => (
                format!("{:?}", self.index.insert(key, value)),
                format!("{:?}", self.model.insert(key, value)),
            ),
            IndexOp::Delete { key } => (
                self.index.delete(&key).to_string(),
                self.model.remove(&key).is_some().to_string(),
            ),
            IndexOp::Search { key } => (
                format!("{:?}", self.index.search(&key)),
                format!("{:?}", self.model.get(&key)),
            ),
        };
        if actual != expected {
            return Err(ModelMismatch::Returned {
                step,
                op,
                actual,
                expected,
            });
        }

        if self.index.len() != self.model.len() {
            return Err(ModelMismatch::Len {
                step,
                actual: self.index.len(),
                expected: self.model.len(),
            });
        }

        if self.verify_each_step {
            self.check()?;
        }
        Ok(())
    }

    /// Applies every operation in order.
    pub fn run(&mut self, ops: &[IndexOp]) -> Result<(), ModelMismatch> {
        for op in ops {
            self.apply(*op)?;
        }
        self.check()
    }

    /// Compares the full contents against the model.
    ///
    /// Checks the entry count, the full scan (in key order for ordered
    /// kinds, as a multiset for the hash index), a lookup of every model
    /// key, and the structural self-check.
    pub fn check(&self) -> Result<(), ModelMismatch> {
        let step = self.step;
        if self.index.len() != self.model.len() {
            return Err(ModelMismatch::Len {
                step,
                actual: self.index.len(),
                expected: self.model.len(),
            });
        }

        let mut actual = self.index.all_values();
        let mut expected: Vec<i32> = self.model.values().copied().collect();
        if !self.ordered {
            actual.sort_unstable();
            expected.sort_unstable();
        }
        if actual != expected {
            return Err(ModelMismatch::Scan {
                step,
                actual,
                expected,
            });
        }

        for (key, value) in &self.model {
            let found = self.index.search(key);
            if found != Some(value) {
                return Err(ModelMismatch::Returned {
                    step,
                    op: IndexOp::Search { key: *key },
                    actual: format!("{found:?}"),
                    expected: format!("{:?}", Some(value)),
                });
            }
        }

        self.index
            .verify()
            .map_err(|source| ModelMismatch::Corrupt { step, source })
    }
}

/// Replays `ops` against `index` and returns the final model.
pub fn replay<I>(index: &mut I, ops: &[IndexOp]) -> Result<BTreeMap<i32, i32>, ModelMismatch>
where
    I: Index<i32, i32> + ?Sized,
{
    let mut harness = ModelHarness::new(index).verify_each_step(true);
    harness.run(ops)?;
    Ok(harness.model)
}
