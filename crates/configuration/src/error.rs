//! Errors that can be thrown when processing configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::environment;

/// The errors that can be thrown when parsing a configuration file.
#[derive(Debug, Error)]
pub enum ParseConfigurationError {
    #[error("parse error on {}:{line}:{column}: {message}", file_path.display())]
    ParseError {
        file_path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("unable to read {}: {source}", file_path.display())]
    IoError {
        file_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The errors that can be thrown when resolving a parsed configuration into a
/// 'BenchmarkConfig'.
#[derive(Debug, Error)]
pub enum MakeRuntimeConfigurationError {
    #[error("invalid configuration version, expected {expected}, got {actual}")]
    UnsupportedVersion { expected: u32, actual: u32 },
    #[error("the '{0}' setting is required")]
    MissingSetting(&'static str),
    #[error("unable to resolve the '{setting}' setting: {source}")]
    MissingEnvironmentVariable {
        setting: &'static str,
        #[source]
        source: environment::Error,
    },
    #[error("password is not found in input or configuration; set it in the configuration file or in ${variable}")]
    MissingPassword { variable: String },
    #[error("unable to read the query file {}: {source}", path.display())]
    QueryFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("the query is empty")]
    EmptyQuery,
    #[error("at least one measured iteration is required")]
    NoIterations,
}

/// The errors that can be thrown when writing a configuration template.
#[derive(Debug, Error)]
pub enum WriteParsedConfigurationError {
    #[error("{0}")]
    IoError(#[from] std::io::Error),
    #[error("unable to serialize the configuration: {0}")]
    Serialization(String),
    #[error("refusing to overwrite {}", .0.display())]
    AlreadyExists(PathBuf),
}
