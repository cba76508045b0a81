//! Wiring: turn a [`PlannerConfig`] into a ready-to-use engine.

use std::sync::Arc;

use crate::completion::{CannedCompletionService, CompletionService, LlmCompletionService};
use crate::config::PlannerConfig;
use crate::error::{ConfigError, Result};
use crate::llm::create_provider;
use crate::profile::{LibSqlProfileStore, MemoryProfileStore, ProfileStore};
use crate::quiz::{QuestionnaireEngine, flows};

/// Build the engine for the configured flow, resumed from the saved profile.
///
/// Uses the LLM when an API key is configured and the canned service
/// otherwise; keeps the profile in libSQL when a database path is set.
pub async fn build_engine(config: &PlannerConfig) -> Result<QuestionnaireEngine> {
    let steps = flows::by_name(&config.flow).ok_or_else(|| ConfigError::InvalidValue {
        key: "LIFE_PLANNER_FLOW".to_string(),
        message: format!("unknown flow '{}'", config.flow),
    })?;
    let artifact = flows::artifact_kind(&config.flow);

    let completion: Arc<dyn CompletionService> = match config.llm {
        Some(ref llm_config) => Arc::new(
            LlmCompletionService::new(create_provider(llm_config)?)
                .with_artifact(artifact)
                .with_temperature(llm_config.temperature)
                .with_max_tokens(llm_config.max_tokens),
        ),
        None => Arc::new(CannedCompletionService::new().with_artifact(artifact)),
    };

    let store: Arc<dyn ProfileStore> = match config.db_path {
        Some(ref path) => Arc::new(LibSqlProfileStore::new_local(path, &config.user_id).await?),
        None => Arc::new(MemoryProfileStore::new()),
    };

    let engine = QuestionnaireEngine::new(steps, completion)?
        .with_profile_store(store)
        .with_restart_policy(config.restart_policy)
        .with_fallback(artifact.fallback())
        .resume()
        .await;
    tracing::info!(
        session = %engine.session_id(),
        flow = %config.flow,
        llm = config.llm.is_some(),
        "Questionnaire ready"
    );
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::quiz::flows::ids;
    use crate::quiz::{GenerationResult, RestartPolicy, Transition};

    fn offline(flow: &str) -> PlannerConfig {
        PlannerConfig {
            db_path: None,
            flow: flow.to_string(),
            ..PlannerConfig::default()
        }
    }

    #[tokio::test]
    async fn stress_flow_ends_in_a_profile() {
        let engine = build_engine(&offline("stress")).await.unwrap();
        let answers = [
            (ids::STRESSOR, "Work, mostly"),
            (ids::LOOKING_FORWARD, "A concert on Friday"),
            (ids::ENERGY_TIME, "Mornings"),
            (ids::HABIT, "Less doomscrolling"),
            (ids::RECHARGE, "Cooking"),
            (ids::LOCATION, "Porto"),
        ];
        for (step_id, text) in answers {
            engine.set_text(step_id, text).await.unwrap();
            engine.advance().await.unwrap();
        }
        engine.select_option(ids::BUDGET, "Low").await.unwrap();

        let Transition::Completed(GenerationResult::Generated(artifact)) =
            engine.advance().await.unwrap()
        else {
            panic!("stress flow should generate a profile");
        };
        assert!(artifact.plan_steps().is_none());
        assert!(artifact.render(None).contains("**Energy Pattern: Early Bird**"));
    }

    #[tokio::test]
    async fn applies_restart_policy_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlannerConfig {
            db_path: Some(dir.path().join("planner.db")),
            restart_policy: RestartPolicy::ClearAnswers,
            flow: "daily_context".to_string(),
            ..PlannerConfig::default()
        };
        let engine = build_engine(&config).await.unwrap();
        assert_eq!(engine.restart_policy(), RestartPolicy::ClearAnswers);
        for (step_id, value) in [
            (ids::TODAY_CONTEXT, "Work"),
            (ids::WORK_TYPE, "Study"),
            (ids::COFFEE, "Iced"),
        ] {
            engine.select_option(step_id, value).await.unwrap();
            engine.advance().await.unwrap();
        }
        drop(engine);

        let resumed = build_engine(&config).await.unwrap();
        assert_eq!(resumed.answers().await.text(ids::COFFEE), Some("Iced"));
    }

    #[tokio::test]
    async fn unknown_flow_is_a_config_error() {
        let err = build_engine(&offline("burnout")).await.err().unwrap();
        assert!(matches!(err, Error::Config(ConfigError::InvalidValue { .. })));
    }
}
