//! Resolve drivers by identifier.
//!
//! The registry starts with the drivers linked into the binary. A driver artifact can
//! register more identifiers before one is resolved: it is a manifest, in YAML or JSON,
//! that declares aliases of drivers that are already registered.
//!
//! ```yaml
//! drivers:
//!   - identifier: com.acme.warehouse.Driver
//!     driver: postgres
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::driver::Driver;
use crate::error::Error;
use crate::sqlx_driver::{DriverKind, SqlxDriver};

/// The content of a driver artifact.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DriverManifest {
    pub drivers: Vec<DriverAlias>,
}

/// Make `identifier` resolve to the driver registered as `driver`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DriverAlias {
    pub identifier: String,
    pub driver: String,
}

/// A mapping from driver identifiers to drivers.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, Arc<dyn Driver>>,
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.drivers.keys()).finish()
    }
}

impl DriverRegistry {
    /// A registry without any driver.
    pub fn empty() -> Self {
        DriverRegistry::default()
    }

    /// A registry with every statically linked driver under all of its identifiers.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = DriverRegistry::empty();
        for kind in enum_iterator::all::<DriverKind>() {
            let driver: Arc<dyn Driver> = Arc::new(SqlxDriver::new(kind));
            for identifier in kind.identifiers() {
                registry.register(*identifier, driver.clone());
            }
        }
        registry
    }

    /// Register `driver` under `identifier`, replacing any previous registration.
    pub fn register(&mut self, identifier: impl Into<String>, driver: Arc<dyn Driver>) {
        self.drivers.insert(identifier.into(), driver);
    }

    /// The registered identifiers, in lexical order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.drivers.keys().map(String::as_str)
    }

    /// Look `identifier` up without loading anything.
    pub fn resolve(&self, identifier: &str) -> Result<Arc<dyn Driver>, Error> {
        self.drivers
            .get(identifier.trim())
            .cloned()
            .ok_or_else(|| Error::DriverNotFound(identifier.to_string()))
    }

    /// Load the driver artifact, if any, then resolve `identifier`.
    pub async fn load_driver(
        &mut self,
        identifier: &str,
        artifact: Option<&Path>,
    ) -> Result<Arc<dyn Driver>, Error> {
        if let Some(path) = artifact {
            self.load_artifact(path).await?;
        }
        let driver = self.resolve(identifier)?;
        info!(identifier, driver = driver.name(), "resolved driver");
        Ok(driver)
    }

    /// Read a driver manifest and register its aliases. Nothing is registered unless every
    /// alias points at a known driver.
    pub async fn load_artifact(&mut self, path: &Path) -> Result<(), Error> {
        let load_error = |reason: String| Error::DriverLoad {
            path: path.to_path_buf(),
            reason,
        };

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| load_error(err.to_string()))?;
        // YAML is a superset of JSON, so this reads both.
        let manifest: DriverManifest =
            serde_yaml::from_str(&contents).map_err(|err| load_error(err.to_string()))?;

        let aliases = manifest
            .drivers
            .into_iter()
            .map(|alias| match self.drivers.get(alias.driver.as_str()) {
                Some(driver) => Ok((alias.identifier, driver.clone())),
                None => Err(load_error(format!(
                    "'{}' is declared as an alias of the unknown driver '{}'",
                    alias.identifier, alias.driver
                ))),
            })
            .collect::<Result<Vec<_>, Error>>()?;

        for (identifier, driver) in aliases {
            debug!(identifier, driver = driver.name(), "registered driver alias");
            self.register(identifier, driver);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn artifact(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn builtin_drivers_answer_to_jdbc_class_names() {
        let registry = DriverRegistry::with_builtin_drivers();
        assert_eq!(
            registry.resolve("org.postgresql.Driver").unwrap().name(),
            "postgres"
        );
        assert_eq!(registry.resolve("org.sqlite.JDBC").unwrap().name(), "sqlite");
        assert_eq!(registry.resolve("mariadb").unwrap().name(), "mysql");
    }

    #[tokio::test]
    async fn unknown_identifiers_are_not_found() {
        let mut registry = DriverRegistry::with_builtin_drivers();
        let result = registry.load_driver("com.ibm.db2.jcc.DB2Driver", None).await;
        assert!(matches!(result, Err(Error::DriverNotFound(name)) if name == "com.ibm.db2.jcc.DB2Driver"));
    }

    #[tokio::test]
    async fn artifacts_register_aliases_before_resolution() {
        let file = artifact(
            "drivers:\n  - identifier: com.acme.Driver\n    driver: org.postgresql.Driver\n",
        );
        let mut registry = DriverRegistry::with_builtin_drivers();

        let driver = registry
            .load_driver("com.acme.Driver", Some(file.path()))
            .await
            .unwrap();
        assert_eq!(driver.name(), "postgres");
        assert!(registry.identifiers().any(|id| id == "com.acme.Driver"));
    }

    #[tokio::test]
    async fn json_artifacts_are_accepted() {
        let file = artifact(r#"{"drivers": [{"identifier": "embedded", "driver": "sqlite"}]}"#);
        let mut registry = DriverRegistry::with_builtin_drivers();
        let driver = registry
            .load_driver("embedded", Some(file.path()))
            .await
            .unwrap();
        assert_eq!(driver.name(), "sqlite");
    }

    #[tokio::test]
    async fn missing_artifacts_fail_to_load() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("drivers.yaml");
        let mut registry = DriverRegistry::with_builtin_drivers();

        let result = registry.load_driver("postgres", Some(&path)).await;
        assert!(matches!(result, Err(Error::DriverLoad { .. })));
    }

    #[tokio::test]
    async fn dangling_aliases_fail_to_load_and_register_nothing() {
        let file = artifact(
            "drivers:\n  - identifier: good\n    driver: sqlite\n  - identifier: bad\n    driver: oracle\n",
        );
        let mut registry = DriverRegistry::with_builtin_drivers();

        let result = registry.load_artifact(file.path()).await;
        assert!(matches!(result, Err(Error::DriverLoad { reason, .. }) if reason.contains("oracle")));
        assert!(registry.resolve("good").is_err());
    }

    #[tokio::test]
    async fn malformed_artifacts_fail_to_load() {
        let file = artifact("drivers: 12");
        let mut registry = DriverRegistry::with_builtin_drivers();
        let result = registry.load_artifact(file.path()).await;
        assert!(matches!(result, Err(Error::DriverLoad { .. })));
    }
}
