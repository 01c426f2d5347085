//! Version 1 of the configuration file format.

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::configuration::DEFAULT_ITERATIONS;
use crate::error::{ParseConfigurationError, WriteParsedConfigurationError};
use crate::values::{ConnectionUri, Secret};

pub const CURRENT_VERSION: u32 = 1;
pub const CONFIGURATION_FILENAME: &str = "configuration.yaml";
pub const CONFIGURATION_JSONSCHEMA_FILENAME: &str = "schema.json";
pub const DEFAULT_CONNECTION_URI_VARIABLE: &str = "PERFINDER_CONNECTION_URI";
pub const DEFAULT_PASSWORD_VARIABLE: &str = "PERFINDER_PASSWORD";

/// The configuration file as written by the user. YAML or JSON.
///
/// Everything is optional here so that the command line can fill in the gaps; the
/// required settings are checked by 'make_runtime_configuration'.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ParsedConfiguration {
    /// Which version of the configuration format are we using
    pub version: u32,
    /// Identifier of the driver, e.g. `postgres`, `sqlite` or `org.postgresql.Driver`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// A driver manifest declaring additional driver identifiers. Relative paths are
    /// resolved against the directory of the configuration file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_artifact: Option<PathBuf>,
    /// Connection URL, inline or from an environment variable.
    #[serde(default = "default_connection_uri")]
    pub connection_uri: ConnectionUri,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Required when a username is given. Defaults to the `PERFINDER_PASSWORD` variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
    /// The query to measure. Takes precedence over `queryFile` unless blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// A file containing the query to measure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_file: Option<PathBuf>,
    /// Positional parameters; `null` binds SQL NULL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Option<String>>>,
    /// Cursor batching hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_size: Option<u32>,
    /// Rows skipped at the start of every fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_offset: Option<usize>,
    /// Maximum rows materialized by every fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<usize>,
    /// Number of measured iterations.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
}

fn default_connection_uri() -> ConnectionUri {
    ConnectionUri(Secret::FromEnvironment {
        variable: DEFAULT_CONNECTION_URI_VARIABLE.into(),
    })
}

fn default_iterations() -> usize {
    DEFAULT_ITERATIONS
}

impl ParsedConfiguration {
    /// A configuration with nothing set, for runs configured entirely on the command line.
    pub fn empty() -> Self {
        Self {
            version: CURRENT_VERSION,
            driver: None,
            driver_artifact: None,
            connection_uri: default_connection_uri(),
            username: None,
            password: None,
            query: None,
            query_file: None,
            parameters: None,
            fetch_size: None,
            row_offset: None,
            max_rows: None,
            iterations: DEFAULT_ITERATIONS,
        }
    }

    /// The template written by `perfinder init`.
    pub fn initial() -> Self {
        Self {
            driver: Some("postgres".to_string()),
            query: Some("SELECT 1".to_string()),
            ..ParsedConfiguration::empty()
        }
    }

    /// Replace settings with the ones given on the command line.
    #[must_use]
    pub fn apply(mut self, overrides: ConfigurationOverrides) -> Self {
        let ConfigurationOverrides {
            driver,
            driver_artifact,
            url,
            username,
            query,
            query_file,
            parameters,
            fetch_size,
            row_offset,
            max_rows,
            iterations,
        } = overrides;

        if let Some(query_file) = query_file {
            self.query = None;
            self.query_file = Some(query_file);
        }
        self.query = query.or(self.query);
        self.driver = driver.or(self.driver);
        self.driver_artifact = driver_artifact.or(self.driver_artifact);
        if let Some(url) = url {
            self.connection_uri = ConnectionUri::from(url);
        }
        self.username = username.or(self.username);
        if let Some(parameters) = parameters {
            self.parameters = Some(parameters.into_iter().map(Some).collect());
        }
        self.fetch_size = fetch_size.or(self.fetch_size);
        self.row_offset = row_offset.or(self.row_offset);
        self.max_rows = max_rows.or(self.max_rows);
        self.iterations = iterations.unwrap_or(self.iterations);
        self
    }

    /// Resolve relative file references against `base`.
    fn rebase(&mut self, base: &Path) {
        for path in [&mut self.driver_artifact, &mut self.query_file]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Settings that can be given on the command line, overriding the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, clap::Args)]
pub struct ConfigurationOverrides {
    /// Identifier of the driver, e.g. `postgres`, `sqlite` or `org.postgresql.Driver`.
    #[arg(long, env = "PERFINDER_DRIVER", value_name = "IDENTIFIER")]
    pub driver: Option<String>,
    /// Driver manifest declaring additional driver identifiers.
    #[arg(long, env = "PERFINDER_DRIVER_ARTIFACT", value_name = "FILE")]
    pub driver_artifact: Option<PathBuf>,
    /// Connection URL. Defaults to the PERFINDER_CONNECTION_URI variable.
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,
    #[arg(long, env = "PERFINDER_USERNAME")]
    pub username: Option<String>,
    /// The query to measure.
    #[arg(long, conflicts_with = "query_file")]
    pub query: Option<String>,
    /// A file containing the query to measure.
    #[arg(long, value_name = "FILE")]
    pub query_file: Option<PathBuf>,
    /// Comma separated positional parameters.
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub parameters: Option<Vec<String>>,
    #[arg(long)]
    pub fetch_size: Option<u32>,
    #[arg(long)]
    pub row_offset: Option<usize>,
    #[arg(long)]
    pub max_rows: Option<usize>,
    /// Number of measured iterations [default: 3]
    #[arg(long, short = 'n')]
    pub iterations: Option<usize>,
}

/// Parse a configuration file. If `configuration_path` is a directory, the
/// `configuration.yaml` inside it is read.
pub async fn parse_configuration(
    configuration_path: impl AsRef<Path>,
) -> Result<ParsedConfiguration, ParseConfigurationError> {
    let configuration_path = configuration_path.as_ref();
    let configuration_file = match fs::metadata(configuration_path).await {
        Ok(metadata) if metadata.is_dir() => configuration_path.join(CONFIGURATION_FILENAME),
        _ => configuration_path.to_path_buf(),
    };

    let configuration_file_contents =
        fs::read_to_string(&configuration_file)
            .await
            .map_err(|source| ParseConfigurationError::IoError {
                file_path: configuration_file.clone(),
                source,
            })?;

    // YAML is a superset of JSON, so this reads both.
    let mut parsed_config: ParsedConfiguration =
        serde_yaml::from_str(&configuration_file_contents).map_err(|error| {
            let location = error.location();
            ParseConfigurationError::ParseError {
                file_path: configuration_file.clone(),
                line: location.as_ref().map_or(0, serde_yaml::Location::line),
                column: location.as_ref().map_or(0, serde_yaml::Location::column),
                message: error.to_string(),
            }
        })?;

    if let Some(directory) = configuration_file.parent() {
        parsed_config.rebase(directory);
    }

    tracing::debug!(file = %configuration_file.display(), "parsed configuration");
    Ok(parsed_config)
}

/// Write a configuration template and its JSON schema into a directory on disk.
pub async fn write_parsed_configuration(
    parsed_config: ParsedConfiguration,
    out_dir: impl AsRef<Path>,
) -> Result<PathBuf, WriteParsedConfigurationError> {
    let configuration_file = out_dir.as_ref().join(CONFIGURATION_FILENAME);
    fs::create_dir_all(out_dir.as_ref()).await?;

    if fs::try_exists(&configuration_file).await? {
        return Err(WriteParsedConfigurationError::AlreadyExists(
            configuration_file,
        ));
    }

    // create the configuration file
    fs::write(
        &configuration_file,
        serde_yaml::to_string(&parsed_config)
            .map_err(|e| WriteParsedConfigurationError::Serialization(e.to_string()))?,
    )
    .await?;

    // create the jsonschema file
    let configuration_jsonschema_file_path =
        out_dir.as_ref().join(CONFIGURATION_JSONSCHEMA_FILENAME);

    let output = schemars::schema_for!(ParsedConfiguration);
    fs::write(
        &configuration_jsonschema_file_path,
        serde_json::to_string_pretty(&output)
            .map_err(|e| WriteParsedConfigurationError::Serialization(e.to_string()))?
            + "\n",
    )
    .await?;

    Ok(configuration_file)
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn overrides_replace_file_settings() {
        let parsed = ParsedConfiguration {
            driver: Some("postgres".to_string()),
            query: Some("SELECT 1".to_string()),
            max_rows: Some(10),
            ..ParsedConfiguration::empty()
        };
        let overrides = ConfigurationOverrides {
            driver: Some("sqlite".to_string()),
            url: Some("sqlite::memory:".to_string()),
            parameters: Some(vec!["a".to_string(), "b".to_string()]),
            iterations: Some(5),
            ..ConfigurationOverrides::default()
        };

        let applied = parsed.apply(overrides);
        assert_eq!(applied.driver.as_deref(), Some("sqlite"));
        assert_eq!(applied.connection_uri, ConnectionUri::from("sqlite::memory:"));
        assert_eq!(
            applied.parameters,
            Some(vec![Some("a".to_string()), Some("b".to_string())])
        );
        assert_eq!(applied.max_rows, Some(10));
        assert_eq!(applied.iterations, 5);
        assert_eq!(applied.query.as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn a_query_file_override_replaces_the_file_query() {
        let parsed = ParsedConfiguration {
            query: Some("SELECT 1".to_string()),
            ..ParsedConfiguration::empty()
        };
        let applied = parsed.apply(ConfigurationOverrides {
            query_file: Some(PathBuf::from("/tmp/query.sql")),
            ..ConfigurationOverrides::default()
        });
        assert_eq!(applied.query, None);
        assert_eq!(applied.query_file, Some(PathBuf::from("/tmp/query.sql")));
    }

    #[test]
    fn relative_paths_are_rebased() {
        let mut parsed = ParsedConfiguration {
            query_file: Some(PathBuf::from("queries/slow.sql")),
            driver_artifact: Some(PathBuf::from("/opt/drivers.yaml")),
            ..ParsedConfiguration::empty()
        };
        parsed.rebase(Path::new("/etc/perfinder"));
        assert_eq!(
            parsed.query_file,
            Some(PathBuf::from("/etc/perfinder/queries/slow.sql"))
        );
        assert_eq!(
            parsed.driver_artifact,
            Some(PathBuf::from("/opt/drivers.yaml"))
        );
    }
}
