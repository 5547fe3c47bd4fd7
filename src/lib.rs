// Clippy allows for the whole crate
#![allow(clippy::type_complexity)]

//! GIA: Genome Interval Arithmetic
//!
//! Grouped, sorted interval sets and the operations over them: intersect,
//! subtract, closest, map, merge, windows, random placement and
//! group-wise summaries.
//!
//! # Features
//!
//! - **Sweep-line engine**: every two-set operation is a synchronized pass
//!   over per-group, per-chromosome sorted records
//! - **Parallel processing**: independent partitions run on Rayon
//! - **Named reducers**: summaries are `name = reducer(column)` with an
//!   extensible registry
//!
//! # Example
//!
//! ```rust
//! use gia::prelude::*;
//!
//! let options = SetOptions::default();
//! let a = parse_set("chr1\t100\t200\n", &[] as &[&str], &options).unwrap();
//! let b = parse_set("chr1\t150\t160\n", &[] as &[&str], &options).unwrap();
//!
//! let pairs = IntersectCommand::new().pairs(&a, &b).unwrap();
//! assert_eq!(pairs[0].overlap, 10);
//! ```

pub mod aggregate;
pub mod bed;
pub mod commands;
pub mod config;
pub mod engine;
pub mod genome;
pub mod interval;
pub mod interval_set;
pub mod parallel;

// Re-export commonly used types
pub use aggregate::{Aggregator, Reducer, ReducerRegistry, Summary, Table};
pub use bed::{read_records, read_set, BedError, BedReader, Result};
pub use genome::Genome;
pub use interval::{BedRecord, GroupKey, Interval, Strand, Value};
pub use interval_set::{IntervalSet, SetOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::aggregate::{Aggregator, Summary};
    pub use crate::bed::{parse_set, read_set, write_set, BedError, BedReader};
    pub use crate::commands::{
        ClosestCommand, ComplementCommand, CoverageCommand, IntersectCommand, JaccardCommand,
        MapCommand, MergeCommand, RandomCommand, ShuffleCommand, SubtractCommand, WindowCommand,
    };
    pub use crate::config::{
        BoundsPolicy, LengthPolicy, ShuffleScope, SortPolicy, TieHandling, UnmatchedPolicy,
    };
    pub use crate::genome::Genome;
    pub use crate::interval::{BedRecord, Interval, Strand, Value};
    pub use crate::interval_set::{IntervalSet, SetOptions};
}
