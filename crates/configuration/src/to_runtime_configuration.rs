//! Convert a parsed configuration into the 'BenchmarkConfig' used by a run.

use tokio::fs;

use crate::configuration::BenchmarkConfig;
use crate::environment::{self, Environment};
use crate::error::MakeRuntimeConfigurationError;
use crate::values::Secret;
use crate::version1::{ParsedConfiguration, CURRENT_VERSION, DEFAULT_PASSWORD_VARIABLE};

/// Resolve secrets, read the query file and check the required settings.
pub async fn make_runtime_configuration(
    parsed_config: ParsedConfiguration,
    environment: impl Environment,
) -> Result<BenchmarkConfig, MakeRuntimeConfigurationError> {
    if parsed_config.version != CURRENT_VERSION {
        return Err(MakeRuntimeConfigurationError::UnsupportedVersion {
            expected: CURRENT_VERSION,
            actual: parsed_config.version,
        });
    }

    let driver = parsed_config
        .driver
        .map(|driver| driver.trim().to_string())
        .filter(|driver| !driver.is_empty())
        .ok_or(MakeRuntimeConfigurationError::MissingSetting("driver"))?;

    let connection_url = resolve("connectionUri", &parsed_config.connection_uri.0, &environment)?;
    if connection_url.trim().is_empty() {
        return Err(MakeRuntimeConfigurationError::MissingSetting(
            "connectionUri",
        ));
    }

    let username = parsed_config
        .username
        .filter(|username| !username.is_empty());
    let password = match &parsed_config.password {
        Some(secret) => Some(resolve("password", secret, &environment)?),
        None => None,
    }
    .filter(|password| !password.is_empty());
    let password = match (&username, password) {
        (Some(_), None) => Some(default_password(&environment)?),
        (_, password) => password,
    };

    let query = match (parsed_config.query, parsed_config.query_file) {
        (Some(query), _) if !query.trim().is_empty() => query,
        (_, Some(path)) => fs::read_to_string(&path)
            .await
            .map_err(|source| MakeRuntimeConfigurationError::QueryFile { path, source })?,
        (Some(_), None) => return Err(MakeRuntimeConfigurationError::EmptyQuery),
        (None, None) => return Err(MakeRuntimeConfigurationError::MissingSetting("query")),
    };
    if query.trim().is_empty() {
        return Err(MakeRuntimeConfigurationError::EmptyQuery);
    }

    if parsed_config.iterations == 0 {
        return Err(MakeRuntimeConfigurationError::NoIterations);
    }

    Ok(BenchmarkConfig {
        driver,
        driver_artifact: parsed_config.driver_artifact,
        connection_url,
        username,
        password,
        query,
        parameters: parsed_config.parameters.unwrap_or_default(),
        fetch_size: parsed_config.fetch_size,
        row_offset: parsed_config.row_offset,
        max_rows: parsed_config.max_rows,
        iterations: parsed_config.iterations,
    })
}

/// The password for a username configured without one. Only an unset or empty variable
/// counts as missing; one that cannot be read is reported as such.
fn default_password(
    environment: impl Environment,
) -> Result<String, MakeRuntimeConfigurationError> {
    match environment.read(DEFAULT_PASSWORD_VARIABLE) {
        Ok(password) if !password.is_empty() => Ok(password),
        Ok(_) | Err(environment::Error::NonExistentVariable(_)) => {
            Err(MakeRuntimeConfigurationError::MissingPassword {
                variable: DEFAULT_PASSWORD_VARIABLE.to_string(),
            })
        }
        Err(source) => Err(MakeRuntimeConfigurationError::MissingEnvironmentVariable {
            setting: "password",
            source,
        }),
    }
}

fn resolve(
    setting: &'static str,
    secret: &Secret,
    environment: impl Environment,
) -> Result<String, MakeRuntimeConfigurationError> {
    secret
        .resolve(environment)
        .map_err(|source| MakeRuntimeConfigurationError::MissingEnvironmentVariable {
            setting,
            source,
        })
}
