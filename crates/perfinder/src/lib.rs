//! Measure the latency of a SQL query.
//!
//! A statement is prepared once and then executed repeatedly. Every iteration times the
//! execute call and the fetch of the result window separately, and the report carries
//! the per-iteration times together with their averages.

pub mod benchmark;
pub mod cli;
pub mod error;
pub mod report;

pub use benchmark::{run, Benchmark};
pub use error::{BenchmarkError, Phase};
pub use report::{mean, BenchmarkReport, TimingSample};
