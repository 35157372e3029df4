use crate::config::helpers::parse_env_or;
use crate::error::ConfigError;
use crate::settings::Settings;

/// Hard limit on model steps per user message. `AGENT_MAX_STEPS` may lower
/// it, never raise it.
pub const MAX_STEPS_CEILING: usize = 5;

/// Chat loop limits.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model calls per request, tool round-trips included.
    pub max_steps: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: MAX_STEPS_CEILING,
        }
    }
}

impl AgentConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let max_steps = parse_env_or("AGENT_MAX_STEPS", settings.agent.max_steps)?;
        validate_max_steps(max_steps)?;
        Ok(Self { max_steps })
    }
}

fn validate_max_steps(value: usize) -> Result<(), ConfigError> {
    if (1..=MAX_STEPS_CEILING).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: "AGENT_MAX_STEPS".to_string(),
            message: format!("must be between 1 and {MAX_STEPS_CEILING}, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_cap_bounds() {
        assert!(validate_max_steps(0).is_err());
        assert!(validate_max_steps(1).is_ok());
        assert!(validate_max_steps(5).is_ok());
        assert!(validate_max_steps(6).is_err());
        assert!(validate_max_steps(20).is_err());
    }

    #[test]
    fn settings_value_is_validated_too() {
        if std::env::var_os("AGENT_MAX_STEPS").is_some() {
            return;
        }
        let mut settings = Settings::default();
        settings.agent.max_steps = 0;
        assert!(AgentConfig::resolve(&settings).is_err());
        settings.agent.max_steps = 6;
        let err = AgentConfig::resolve(&settings).unwrap_err();
        assert!(err.to_string().contains("AGENT_MAX_STEPS"), "{err}");
        settings.agent.max_steps = 3;
        assert_eq!(AgentConfig::resolve(&settings).expect("resolve").max_steps, 3);
    }
}
