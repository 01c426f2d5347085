//! Configuration for a benchmark run.

use std::path::PathBuf;

/// Measured iterations when none are configured.
pub const DEFAULT_ITERATIONS: usize = 3;

/// The 'BenchmarkConfig' type collects everything a benchmark run needs, fully resolved:
/// secrets are read, the query file is loaded and the values are validated.
///
/// Values of this type are produced from a 'ParsedConfiguration' using
/// 'make_runtime_configuration', and are never modified afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct BenchmarkConfig {
    /// Identifier of the driver to resolve, e.g. `postgres` or `org.postgresql.Driver`.
    pub driver: String,
    /// A driver manifest to load before resolving `driver`.
    pub driver_artifact: Option<PathBuf>,
    pub connection_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub query: String,
    /// Positional parameters. `None` binds `NULL`.
    pub parameters: Vec<Option<String>>,
    /// Batching hint forwarded to the driver.
    pub fetch_size: Option<u32>,
    /// Rows skipped at the start of every fetch.
    pub row_offset: Option<usize>,
    /// Rows materialized by every fetch, after the offset.
    pub max_rows: Option<usize>,
    /// Number of measured iterations.
    pub iterations: usize,
}

impl BenchmarkConfig {
    /// A configuration without credentials, parameters or window, measured
    /// [`DEFAULT_ITERATIONS`] times.
    pub fn new(
        driver: impl Into<String>,
        connection_url: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        BenchmarkConfig {
            driver: driver.into(),
            driver_artifact: None,
            connection_url: connection_url.into(),
            username: None,
            password: None,
            query: query.into(),
            parameters: vec![],
            fetch_size: None,
            row_offset: None,
            max_rows: None,
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl std::fmt::Debug for BenchmarkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkConfig")
            .field("driver", &self.driver)
            .field("driver_artifact", &self.driver_artifact)
            .field("connection_url", &"<redacted>")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("query", &self.query)
            .field("parameters", &self.parameters)
            .field("fetch_size", &self.fetch_size)
            .field("row_offset", &self.row_offset)
            .field("max_rows", &self.max_rows)
            .field("iterations", &self.iterations)
            .finish()
    }
}
