use secrecy::SecretString;

use crate::config::helpers::{optional_env, parse_string_env};
use crate::error::ConfigError;
use crate::settings::Settings;

/// Hosted model settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Optional at resolve time so that `seed` and `tools` work without a key.
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
}

impl LlmConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let api_key = optional_env("GEMINI_API_KEY")?
            .or(optional_env("GOOGLE_GENERATIVE_AI_API_KEY")?)
            .map(SecretString::from);

        let model = parse_string_env("LLM_MODEL", settings.llm.model.clone())?;
        if model.contains('/') || model.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                key: "LLM_MODEL".to_string(),
                message: format!("'{model}' is not a bare model id"),
            });
        }

        let base_url = parse_string_env("LLM_BASE_URL", settings.llm.base_url.clone())?;
        let parsed = url::Url::parse(&base_url).map_err(|e| ConfigError::InvalidValue {
            key: "LLM_BASE_URL".to_string(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                key: "LLM_BASE_URL".to_string(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The API key, or a `Missing` error naming the env vars to set.
    pub fn require_api_key(&self) -> Result<&SecretString, ConfigError> {
        self.api_key.as_ref().ok_or_else(|| ConfigError::Missing {
            key: "GEMINI_API_KEY".to_string(),
            hint: "set GEMINI_API_KEY or GOOGLE_GENERATIVE_AI_API_KEY".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_reported_only_when_required() {
        let config = LlmConfig {
            api_key: None,
            model: "gemini-3-flash-preview".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        };
        let err = config.require_api_key().unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref key, .. } if key == "GEMINI_API_KEY"));
    }

    #[test]
    fn base_url_from_settings_is_normalized() {
        if std::env::var_os("LLM_BASE_URL").is_some() || std::env::var_os("LLM_MODEL").is_some() {
            return;
        }
        let mut settings = Settings::default();
        settings.llm.base_url = "http://127.0.0.1:9999/".to_string();
        let config = LlmConfig::resolve(&settings).expect("resolve");
        assert_eq!(config.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.model, "gemini-3-flash-preview");
    }

    #[test]
    fn model_with_path_segments_is_rejected() {
        if std::env::var_os("LLM_MODEL").is_some() {
            return;
        }
        let mut settings = Settings::default();
        settings.llm.model = "models/gemini".to_string();
        assert!(LlmConfig::resolve(&settings).is_err());
    }
}
