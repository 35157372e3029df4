//! Runtime configuration.
//!
//! Resolution order for every value: built-in default, then the settings
//! file, then the environment (after `.env` has been loaded).

mod agent;
mod database;
mod gateway;
pub(crate) mod helpers;
mod llm;

use std::path::Path;

pub use agent::{AgentConfig, MAX_STEPS_CEILING};
pub use database::{DatabaseConfig, default_libsql_path};
pub use gateway::GatewayConfig;
pub use llm::LlmConfig;

use crate::error::ConfigError;
use crate::settings::Settings;

#[derive(Debug, Clone)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
}

impl Config {
    /// Load `.env`, read the settings file and resolve every section.
    pub fn load(settings_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env");
        }
        let settings = Settings::load(settings_path)?;
        Self::resolve(&settings)
    }

    pub fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            gateway: GatewayConfig::resolve(settings)?,
            database: DatabaseConfig::resolve(settings)?,
            llm: LlmConfig::resolve(settings)?,
            agent: AgentConfig::resolve(settings)?,
        })
    }
}
