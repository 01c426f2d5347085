//! Access to environment variables, abstracted so tests can supply their own.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

/// A source of variables.
pub trait Environment {
    fn read(&self, variable: &str) -> Result<String, Error>;
}

impl<E: Environment + ?Sized> Environment for &E {
    fn read(&self, variable: &str) -> Result<String, Error> {
        (**self).read(variable)
    }
}

/// The environment of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn read(&self, variable: &str) -> Result<String, Error> {
        std::env::var(variable).map_err(|err| match err {
            std::env::VarError::NotPresent => Error::NonExistentVariable(variable.to_string()),
            std::env::VarError::NotUnicode(_) => Error::NotUnicode(variable.to_string()),
        })
    }
}

/// A fixed set of variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedEnvironment(BTreeMap<String, String>);

impl<const N: usize> From<[(String, String); N]> for FixedEnvironment {
    fn from(variables: [(String, String); N]) -> Self {
        FixedEnvironment(variables.into_iter().collect())
    }
}

impl Environment for FixedEnvironment {
    fn read(&self, variable: &str) -> Result<String, Error> {
        self.0
            .get(variable)
            .cloned()
            .ok_or_else(|| Error::NonExistentVariable(variable.to_string()))
    }
}

impl Environment for HashMap<String, String> {
    fn read(&self, variable: &str) -> Result<String, Error> {
        self.get(variable)
            .cloned()
            .ok_or_else(|| Error::NonExistentVariable(variable.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("the environment variable {0} is not set")]
    NonExistentVariable(String),
    #[error("the environment variable {0} is not valid unicode")]
    NotUnicode(String),
}
