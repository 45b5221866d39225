//! Stress tests for shared indexes.
//!
//! These drive a [`SharedIndex`] from several threads at once.

use motordb_core::{Index, SharedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Operations that changed the index.
    pub writes: usize,
    /// Lookups that found a value.
    pub hits: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(total_ops: usize, writes: usize, hits: usize, duration: Duration) -> Self {
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total_ops as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops,
            writes,
            hits,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Total operations: {}", self.total_ops);
        println!("Writes: {}", self.writes);
        println!("Hits: {}", self.hits);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Number of distinct keys.
    pub key_count: u32,
    /// Seed for the per-thread random streams.
    pub seed: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            key_count: 1_000,
            seed: 0x5eed,
        }
    }
}

/// Each thread inserts only keys congruent to its number, so the final
/// contents are known exactly: every key below `key_count` maps to itself.
pub fn stress_partitioned_inserts<I>(index: &SharedIndex<u32, u32, I>, config: &StressConfig) -> StressTestResult
where
    I: Index<u32, u32> + Send + Sync + 'static,
{
    let threads = config.threads.max(1) as u32;
    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let index = index.clone();
            let key_count = config.key_count;
            thread::spawn(move || {
                let mut writes = 0;
                for key in (t..key_count).step_by(threads as usize) {
                    index.insert(key, key);
                    writes += 1;
                }
                writes
            })
        })
        .collect();

    let writes: usize = handles
        .into_iter()
        .map(|h| h.join().expect("stress thread panicked"))
        .sum();
    StressTestResult::new(writes, writes, 0, start.elapsed())
}

/// Runs random inserts, deletes and lookups on every thread at once.
///
/// Values always equal their key, so any lookup that returns a different
/// value means a torn write and panics the worker.
pub fn stress_mixed_operations<I>(index: &SharedIndex<u32, u32, I>, config: &StressConfig) -> StressTestResult
where
    I: Index<u32, u32> + Send + Sync + 'static,
{
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads.max(1))
        .map(|t| {
            let index = index.clone();
            let config = config.clone();
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(t as u64));
                let (mut writes, mut hits) = (0, 0);
                for _ in 0..config.operations {
                    let key = rng.gen_range(0..config.key_count.max(1));
                    match rng.gen_range(0..10) {
                        0..=3 => {
                            index.insert(key, key);
                            writes += 1;
                        }
                        4..=5 => {
                            if index.delete(&key) {
                                writes += 1;
                            }
                        }
                        _ => {
                            if let Some(value) = index.get(&key) {
                                assert_eq!(value, key, "torn value for key {key}");
                                hits += 1;
                            }
                        }
                    }
                }
                (writes, hits)
            })
        })
        .collect();

    let (writes, hits) = handles
        .into_iter()
        .map(|h| h.join().expect("stress thread panicked"))
        .fold((0, 0), |(w, h), (tw, th)| (w + tw, h + th));

    let total = config.operations * config.threads.max(1);
    StressTestResult::new(total, writes, hits, start.elapsed())
}
