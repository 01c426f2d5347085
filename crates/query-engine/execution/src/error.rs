//! Errors for driver loading and query execution.

use std::path::PathBuf;

use thiserror::Error;

/// The underlying cause reported by a driver.
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

/// A type for execution errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no driver is registered under the identifier '{0}'")]
    DriverNotFound(String),
    #[error("unable to load driver artifact {}: {reason}", path.display())]
    DriverLoad { path: PathBuf, reason: String },
    #[error("unable to connect to {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: DriverError,
    },
    #[error("the statement expects {expected} parameter(s) but {actual} were supplied")]
    Bind { expected: usize, actual: usize },
    /// A parameter value that cannot be converted to the type of its placeholder.
    #[error("unable to bind parameter {position} as {type_name}: {reason}")]
    BindValue {
        /// 1-based, like the placeholders themselves.
        position: usize,
        type_name: String,
        reason: String,
    },
    #[error("the statement was rejected by the driver: {0}")]
    QuerySyntax(#[source] DriverError),
    #[error("query execution failed: {0}")]
    Execution(#[source] DriverError),
    #[error("unable to fetch result rows: {0}")]
    Fetch(#[source] DriverError),
}

impl Error {
    pub fn connection(url: impl Into<String>, source: impl Into<DriverError>) -> Self {
        Error::Connection {
            url: url.into(),
            source: source.into(),
        }
    }

    pub fn query_syntax(source: impl Into<DriverError>) -> Self {
        Error::QuerySyntax(source.into())
    }

    pub fn execution(source: impl Into<DriverError>) -> Self {
        Error::Execution(source.into())
    }

    pub fn fetch(source: impl Into<DriverError>) -> Self {
        Error::Fetch(source.into())
    }
}
