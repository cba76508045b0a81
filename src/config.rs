//! Configuration types.
//!
//! Everything is read from environment variables. Unparseable numbers fall
//! back to their defaults; an unknown flow name is an error.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::quiz::RestartPolicy;
use crate::quiz::flows;

/// Settings for the chat LLM backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Top-level configuration of the `life-planner` binary.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// `None` means no API key: options and plans come from the canned service.
    pub llm: Option<LlmConfig>,
    /// `None` keeps the profile in memory only.
    pub db_path: Option<PathBuf>,
    pub user_id: String,
    pub restart_policy: RestartPolicy,
    /// One of [`flows::FLOW_NAMES`].
    pub flow: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            llm: None,
            db_path: Some(PathBuf::from("./data/life-planner.db")),
            user_id: "default".to_string(),
            restart_policy: RestartPolicy::default(),
            flow: "lifestyle".to_string(),
        }
    }
}

impl PlannerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let llm = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .map(|key| LlmConfig {
                api_key: SecretString::from(key),
                model: lookup("LIFE_PLANNER_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
                temperature: lookup("LIFE_PLANNER_TEMPERATURE")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0.7),
                max_tokens: lookup("LIFE_PLANNER_MAX_TOKENS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            });

        // An empty path opts out of the database.
        let db_path = match lookup("LIFE_PLANNER_DB_PATH") {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => defaults.db_path,
        };

        let user_id = lookup("LIFE_PLANNER_USER")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.user_id);

        let restart_policy = lookup("LIFE_PLANNER_RESTART_POLICY")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.restart_policy);

        let flow = lookup("LIFE_PLANNER_FLOW").unwrap_or(defaults.flow);
        if flows::by_name(&flow).is_none() {
            return Err(ConfigError::InvalidValue {
                key: "LIFE_PLANNER_FLOW".to_string(),
                message: format!(
                    "unknown flow '{flow}', expected one of: {}",
                    flows::FLOW_NAMES.join(", ")
                ),
            });
        }

        Ok(Self {
            llm,
            db_path,
            user_id,
            restart_policy,
            flow,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<PlannerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PlannerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]).unwrap();
        assert!(config.llm.is_none());
        assert_eq!(config.db_path, Some(PathBuf::from("./data/life-planner.db")));
        assert_eq!(config.user_id, "default");
        assert_eq!(config.restart_policy, RestartPolicy::PreserveAnswers);
        assert_eq!(config.flow, "lifestyle");
    }

    #[test]
    fn api_key_enables_llm() {
        let config = config(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("LIFE_PLANNER_MODEL", "gpt-4o"),
            ("LIFE_PLANNER_TEMPERATURE", "0.2"),
            ("LIFE_PLANNER_MAX_TOKENS", "not-a-number"),
        ])
        .unwrap();
        let llm = config.llm.unwrap();
        assert_eq!(llm.api_key.expose_secret(), "sk-test");
        assert_eq!(llm.model, "gpt-4o");
        assert_eq!(llm.temperature, 0.2);
        assert_eq!(llm.max_tokens, 600);
    }

    #[test]
    fn blank_api_key_is_ignored() {
        assert!(config(&[("OPENAI_API_KEY", "  ")]).unwrap().llm.is_none());
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("LIFE_PLANNER_DB_PATH", ""),
            ("LIFE_PLANNER_USER", "alex"),
            ("LIFE_PLANNER_RESTART_POLICY", "clear"),
            ("LIFE_PLANNER_FLOW", "basics"),
        ])
        .unwrap();
        assert!(config.db_path.is_none());
        assert_eq!(config.user_id, "alex");
        assert_eq!(config.restart_policy, RestartPolicy::ClearAnswers);
        assert_eq!(config.flow, "basics");
    }

    #[test]
    fn unknown_flow_is_rejected() {
        let err = config(&[("LIFE_PLANNER_FLOW", "stress")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "LIFE_PLANNER_FLOW"));
    }
}
