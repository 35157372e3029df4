use std::path::PathBuf;

use secrecy::SecretString;

use crate::config::helpers::optional_env;
use crate::error::ConfigError;
use crate::settings::Settings;

/// Where the record store lives.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub libsql_path: PathBuf,
    /// Remote primary; when set the local file is an embedded replica.
    pub libsql_url: Option<String>,
    pub libsql_auth_token: Option<SecretString>,
}

pub fn default_libsql_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".concierge")
        .join("concierge.db")
}

impl DatabaseConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let libsql_path = optional_env("LIBSQL_PATH")?
            .map(PathBuf::from)
            .or_else(|| settings.database.path.clone())
            .unwrap_or_else(default_libsql_path);

        let libsql_url = optional_env("LIBSQL_URL")?.or_else(|| settings.database.url.clone());
        if let Some(ref url) = libsql_url {
            validate_remote_url(url)?;
        }
        let libsql_auth_token = optional_env("LIBSQL_AUTH_TOKEN")?.map(SecretString::from);

        if libsql_url.is_some() && libsql_auth_token.is_none() {
            return Err(ConfigError::Missing {
                key: "LIBSQL_AUTH_TOKEN".to_string(),
                hint: "a remote replica needs an auth token".to_string(),
            });
        }

        Ok(Self {
            libsql_path,
            libsql_url,
            libsql_auth_token,
        })
    }

    /// Local-file config, used by tests and one-off tooling.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            libsql_path: path.into(),
            libsql_url: None,
            libsql_auth_token: None,
        }
    }
}

fn validate_remote_url(raw: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
        key: "LIBSQL_URL".to_string(),
        message: e.to_string(),
    })?;
    match parsed.scheme() {
        "libsql" | "https" | "http" | "wss" | "ws" => Ok(()),
        other => Err(ConfigError::InvalidValue {
            key: "LIBSQL_URL".to_string(),
            message: format!("unsupported scheme '{other}'"),
        }),
    }
}
