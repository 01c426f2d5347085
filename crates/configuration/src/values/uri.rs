use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Secret;

/// The URL used to connect to the database, e.g. `postgres://localhost:5432/chinook`.
/// JDBC URLs such as `jdbc:postgresql://localhost:5432/chinook` are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ConnectionUri(pub Secret);

impl From<String> for ConnectionUri {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<&str> for ConnectionUri {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}
