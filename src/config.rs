//! Runtime configuration: caller-facing policies and the global
//! parallelism switch.
//!
//! Policies are plain enums carried by the command structs. The only global
//! state is whether independent partitions may be swept on the rayon pool.

use std::sync::atomic::{AtomicBool, Ordering};

use clap::ValueEnum;

/// Global switch for running independent partitions on the rayon pool.
///
/// Output is identical either way; this only trades threads for latency.
static PARALLEL: AtomicBool = AtomicBool::new(true);

/// Enable or disable parallel partition sweeps.
///
/// # Example
///
/// ```
/// use gia::config;
///
/// config::set_parallel(false);
/// assert!(!config::is_parallel());
/// config::set_parallel(true);
/// ```
#[inline]
pub fn set_parallel(enabled: bool) {
    PARALLEL.store(enabled, Ordering::Release);
}

/// Check whether parallel partition sweeps are enabled.
#[inline]
pub fn is_parallel() -> bool {
    PARALLEL.load(Ordering::Acquire)
}

/// What to do with input that violates per-group sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortPolicy {
    /// Sort the offending group.
    #[default]
    Sort,
    /// Fail with `UnsortedInput`.
    Reject,
}

/// What to do with coordinates past the end of a chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BoundsPolicy {
    /// Fail with `OutOfBounds`.
    #[default]
    Reject,
    /// Clamp the end to the chromosome length.
    Clip,
}

/// How query records without any match are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnmatchedPolicy {
    /// Drop them.
    Omit,
    /// Emit one row with missing match columns.
    EmitNull,
}

/// Where shuffled intervals may land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ShuffleScope {
    /// Stay on the original chromosome.
    #[default]
    WithinChrom,
    /// Any chromosome long enough, weighted by available positions.
    Genome,
}

/// What to do when a requested interval length exceeds a chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LengthPolicy {
    /// Fail with `InvalidLength`.
    #[default]
    Reject,
    /// Leave too-short chromosomes out of the draw.
    SkipShort,
}

/// How equally close matches are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TieHandling {
    /// Report every tied match.
    All,
    /// Report one: upstream before downstream, then sort order.
    #[default]
    First,
}
