//! Completion service: the collaborator that personalises options and
//! writes the final plan.
//!
//! Two implementations ship with the crate:
//! - [`LlmCompletionService`]: prompts an [`LlmProvider`](crate::llm::LlmProvider)
//! - [`CannedCompletionService`]: deterministic offline answers

pub mod canned;
pub mod llm_service;
pub mod prompts;

pub use canned::CannedCompletionService;
pub use llm_service::LlmCompletionService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;
use crate::quiz::{AnswerSet, ChoiceOption};

/// One actionable item of a generated plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub step: String,
    #[serde(default)]
    pub detail: String,
}

impl PlanStep {
    pub fn new(step: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            detail: detail.into(),
        }
    }
}

/// Mindfulness break, one priority, device cutoff.
pub(crate) fn fallback_steps() -> [PlanStep; 3] {
    [
        PlanStep::new(
            "Take a 5-minute mindfulness break",
            "Focus on your breathing for just 5 minutes to reset your mind and reduce stress.",
        ),
        PlanStep::new(
            "Choose just ONE priority for today",
            "Reduce decision fatigue by selecting your single most important goal for today.",
        ),
        PlanStep::new(
            "Set a firm device cutoff time tonight",
            "Decide now when you'll stop using screens tonight to improve sleep quality.",
        ),
    ]
}

/// What a flow produces once every step is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Three actionable steps for today.
    #[default]
    DailyPlan,
    /// A written profile with insights and tips.
    Profile,
}

impl ArtifactKind {
    /// Deterministic artifact shown when generation fails.
    pub fn fallback(self) -> GeneratedArtifact {
        match self {
            Self::DailyPlan => GeneratedArtifact::fallback_plan(),
            Self::Profile => GeneratedArtifact::fallback_profile(),
        }
    }
}

/// The result of a finished questionnaire: free text (a profile write-up)
/// or a structured plan. Replaced wholesale, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum GeneratedArtifact {
    Text(String),
    Plan(Vec<PlanStep>),
}

impl GeneratedArtifact {
    /// Deterministic plan shown when generation fails.
    pub fn fallback_plan() -> Self {
        Self::Plan(fallback_steps().into())
    }

    /// Generic profile shown when the write-up cannot be generated.
    pub fn fallback_profile() -> Self {
        Self::Text(
            "**Energy Pattern: Flexible Energy Pattern**\n\
             Pay attention to when you naturally feel most focused and protect \
             those hours for important work.\n\n\
             **Personalized Tips**\n\
             • Schedule daily moments of complete disconnection from technology\n\
             • Integrate a brief mindfulness practice into your existing routine"
                .to_string(),
        )
    }

    pub fn plan_steps(&self) -> Option<&[PlanStep]> {
        match self {
            Self::Plan(steps) => Some(steps),
            Self::Text(_) => None,
        }
    }

    /// True when there is nothing to show.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Plan(steps) => steps.is_empty(),
        }
    }

    /// Render for display. `expanded` shows the detail of one plan step.
    pub fn render(&self, expanded: Option<usize>) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Plan(steps) => steps
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    if expanded == Some(i) {
                        format!("{}. {}\n   {}", i + 1, s.step, s.detail)
                    } else {
                        format!("{}. {}", i + 1, s.step)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Produces dynamic options and final artifacts for a questionnaire.
///
/// Every call is a fresh request; implementations hold no per-session state.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Options for `step_id`, personalised with the answers so far.
    async fn fetch_options(
        &self,
        step_id: &str,
        answers: &AnswerSet,
    ) -> Result<Vec<ChoiceOption>, CompletionError>;

    /// The final artifact. `nonce` is set on regeneration so the backend
    /// produces a different variant.
    async fn generate(
        &self,
        answers: &AnswerSet,
        nonce: Option<u64>,
    ) -> Result<GeneratedArtifact, CompletionError>;
}
