//! Helpers for database connection URLs.

use url::Url;

use crate::driver::Credentials;

const JDBC_PREFIX: &str = "jdbc:";
const REDACTED: &str = "****";

/// Strip a JDBC style `jdbc:` prefix, so `jdbc:postgresql://host/db` becomes
/// `postgresql://host/db`.
pub fn normalize(url: &str) -> &str {
    let url = url.trim();
    url.strip_prefix(JDBC_PREFIX).unwrap_or(url)
}

/// The scheme of a connection URL, lowercased.
pub fn scheme(url: &str) -> Option<String> {
    normalize(url)
        .split_once(':')
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .filter(|scheme| !scheme.is_empty())
}

/// Merge credentials into the user info part of a URL. Credentials already present in the
/// URL are overridden.
pub fn with_credentials(url: &str, credentials: &Credentials) -> Result<String, url::ParseError> {
    let mut parsed = Url::parse(normalize(url))?;
    parsed
        .set_username(&credentials.username)
        .map_err(|()| url::ParseError::EmptyHost)?;
    parsed
        .set_password(credentials.password.as_deref())
        .map_err(|()| url::ParseError::EmptyHost)?;
    Ok(parsed.into())
}

/// Replace the password of a URL so it can be logged. Unparsable URLs are returned as-is,
/// minus the JDBC prefix.
pub fn redact(url: &str) -> String {
    let normalized = normalize(url);
    match Url::parse(normalized) {
        Ok(mut parsed) if parsed.password().is_some() => {
            match parsed.set_password(Some(REDACTED)) {
                Ok(()) => parsed.into(),
                Err(()) => normalized.to_string(),
            }
        }
        _ => normalized.to_string(),
    }
}
