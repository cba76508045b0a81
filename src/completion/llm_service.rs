//! Completion service backed by a chat LLM.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CompletionError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::quiz::{AnswerSet, ChoiceOption};

use super::prompts;
use super::{ArtifactKind, CompletionService, GeneratedArtifact};

pub struct LlmCompletionService {
    llm: Arc<dyn LlmProvider>,
    artifact: ArtifactKind,
    temperature: f32,
    max_tokens: u32,
}

impl LlmCompletionService {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            artifact: ArtifactKind::default(),
            temperature: 0.7,
            max_tokens: 600,
        }
    }

    /// What `generate` writes: a daily plan (default) or a profile.
    pub fn with_artifact(mut self, artifact: ArtifactKind) -> Self {
        self.artifact = artifact;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    async fn ask(
        &self,
        stage: &str,
        system: &str,
        prompt: String,
    ) -> Result<String, CompletionError> {
        let request =
            CompletionRequest::new(vec![ChatMessage::system(system), ChatMessage::user(prompt)])
                .with_max_tokens(self.max_tokens)
                .with_temperature(self.temperature);

        let response = self.llm.complete(request).await?;
        tracing::debug!(
            stage,
            model = self.llm.model_name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "LLM reply received"
        );

        if response.content.trim().is_empty() {
            return Err(CompletionError::Malformed {
                stage: stage.to_string(),
                reason: "empty reply".to_string(),
            });
        }
        Ok(response.content)
    }
}

#[async_trait]
impl CompletionService for LlmCompletionService {
    async fn fetch_options(
        &self,
        step_id: &str,
        answers: &AnswerSet,
    ) -> Result<Vec<ChoiceOption>, CompletionError> {
        let stage = format!("options for {step_id}");
        let reply = self
            .ask(&stage, prompts::SYSTEM_PROMPT, prompts::options_prompt(step_id, answers))
            .await?;
        let options = prompts::parse_options(&reply)?;
        if options.is_empty() {
            return Err(CompletionError::Malformed {
                stage,
                reason: "no options in reply".to_string(),
            });
        }
        tracing::info!(step = step_id, count = options.len(), "Personalised options generated");
        Ok(options)
    }

    async fn generate(
        &self,
        answers: &AnswerSet,
        nonce: Option<u64>,
    ) -> Result<GeneratedArtifact, CompletionError> {
        if self.artifact == ArtifactKind::Profile {
            let reply = self
                .ask(
                    "profile",
                    prompts::PROFILE_SYSTEM_PROMPT,
                    prompts::profile_prompt(answers, nonce),
                )
                .await?;
            let profile = prompts::parse_profile(&reply)?;
            tracing::info!(chars = profile.len(), remix = nonce.is_some(), "Profile written");
            return Ok(GeneratedArtifact::Text(profile));
        }

        let reply = self
            .ask(
                "daily plan",
                prompts::SYSTEM_PROMPT,
                prompts::plan_prompt(answers, nonce),
            )
            .await?;
        let plan = prompts::parse_plan(&reply)?;
        if plan.is_empty() {
            return Err(CompletionError::Malformed {
                stage: "daily plan".to_string(),
                reason: "plan has no steps".to_string(),
            });
        }
        tracing::info!(steps = plan.len(), remix = nonce.is_some(), "Daily plan generated");
        Ok(GeneratedArtifact::Plan(plan))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::completion::PlanStep;
    use crate::error::LlmError;
    use crate::llm::CompletionResponse;
    use crate::quiz::Answer;

    /// Returns a fixed reply and records the prompts it was sent.
    struct MockLlm {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
        systems: Mutex<Vec<String>>,
    }

    impl MockLlm {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
                systems: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                prompts: Mutex::new(Vec::new()),
                systems: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn model_name(&self) -> &str {
            "mock-planner"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            if let Some(first) = request.messages.first() {
                self.systems.lock().unwrap().push(first.content.clone());
            }
            if let Some(last) = request.messages.last() {
                self.prompts.lock().unwrap().push(last.content.clone());
            }
            match self.reply {
                Ok(ref content) => Ok(CompletionResponse {
                    content: content.clone(),
                    input_tokens: 100,
                    output_tokens: 50,
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "mock".into(),
                    reason: "connection refused".into(),
                }),
            }
        }
    }

    fn service(llm: MockLlm) -> (LlmCompletionService, Arc<MockLlm>) {
        let llm = Arc::new(llm);
        (LlmCompletionService::new(llm.clone()), llm)
    }

    #[tokio::test]
    async fn fetch_options_parses_reply() {
        let (service, llm) = service(MockLlm::replying(
            r#"```json
["College student", "Recent graduate", {"icon": "👶", "label": "Parent"}]
```"#,
        ));
        let mut answers = AnswerSet::new();
        answers.insert("age_range", Answer::Text("23–30".into()));

        let options = service.fetch_options("life_context", &answers).await.unwrap();
        assert_eq!(options.len(), 3);
        assert_eq!(options[2], ChoiceOption::with_icon("👶", "Parent"));

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("23–30"));
    }

    #[tokio::test]
    async fn empty_option_list_is_malformed() {
        let (service, _) = service(MockLlm::replying("[]"));
        let err = service
            .fetch_options("hobbies", &AnswerSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Malformed { .. }));
    }

    #[tokio::test]
    async fn llm_failure_propagates() {
        let (service, _) = service(MockLlm::failing());
        let err = service.generate(&AnswerSet::new(), None).await.unwrap_err();
        assert!(matches!(err, CompletionError::Llm(LlmError::RequestFailed { .. })));
    }

    #[tokio::test]
    async fn blank_reply_is_malformed() {
        let (service, _) = service(MockLlm::replying("   "));
        let err = service.generate(&AnswerSet::new(), None).await.unwrap_err();
        assert!(matches!(err, CompletionError::Malformed { .. }));
    }

    #[tokio::test]
    async fn generate_returns_plan_and_passes_nonce() {
        let (service, llm) = service(MockLlm::replying(
            r#"{"plan": [{"step": "Stretch", "detail": "Ten minutes."}]}"#,
        ));
        let artifact = service.generate(&AnswerSet::new(), Some(7)).await.unwrap();
        assert_eq!(
            artifact,
            GeneratedArtifact::Plan(vec![PlanStep::new("Stretch", "Ten minutes.")])
        );
        assert!(llm.prompts.lock().unwrap()[0].contains("remix #7"));
    }

    #[tokio::test]
    async fn profile_mode_writes_text() {
        let llm = Arc::new(MockLlm::replying(
            "```\n**Energy Pattern: Early Bird**\nYou do your best work before noon.\n```",
        ));
        let service = LlmCompletionService::new(llm.clone()).with_artifact(ArtifactKind::Profile);
        let mut answers = AnswerSet::new();
        answers.insert("energy_time", Answer::Text("Mornings".into()));

        let artifact = service.generate(&answers, None).await.unwrap();
        assert_eq!(
            artifact,
            GeneratedArtifact::Text(
                "**Energy Pattern: Early Bird**\nYou do your best work before noon.".into()
            )
        );
        assert!(llm.prompts.lock().unwrap()[0].contains("A: Mornings"));
        assert_eq!(llm.systems.lock().unwrap()[0], prompts::PROFILE_SYSTEM_PROMPT);
    }
}
