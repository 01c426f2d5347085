//! Errors returned by a benchmark run.

use thiserror::Error;

/// The step of a run. Runs only ever move forward through these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LoadDriver,
    Connect,
    Prepare,
    WarmUp,
    DryRun,
    /// A measured iteration, counted from 1.
    Measure {
        iteration: usize,
    },
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::LoadDriver => write!(f, "driver loading"),
            Phase::Connect => write!(f, "connection"),
            Phase::Prepare => write!(f, "statement preparation"),
            Phase::WarmUp => write!(f, "warm-up run"),
            Phase::DryRun => write!(f, "dry run"),
            Phase::Measure { iteration } => write!(f, "measured iteration {iteration}"),
        }
    }
}

/// A failed run. Every failure is fatal: there is no retry and no partial report.
#[derive(Debug, Error)]
#[error("benchmark failed during {phase}")]
pub struct BenchmarkError {
    pub phase: Phase,
    #[source]
    pub source: query_engine_execution::Error,
}

impl BenchmarkError {
    pub fn new(phase: Phase, source: query_engine_execution::Error) -> Self {
        BenchmarkError { phase, source }
    }

    /// Attach `phase` to a driver error, for use with `map_err`.
    pub fn during(phase: Phase) -> impl FnOnce(query_engine_execution::Error) -> Self {
        move |source| BenchmarkError::new(phase, source)
    }
}
