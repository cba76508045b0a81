//! Flow state machine. Tracks where the user is and whether the engine is
//! waiting on the completion service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::completion::GeneratedArtifact;
use crate::error::QuizError;

use super::answers::AnswerSet;

/// The phases of a questionnaire session.
///
/// `AwaitingOptions` and `Generating` are the busy phases: the engine has
/// issued a completion request and rejects mutations until it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "step", rename_all = "snake_case")]
pub enum FlowPhase {
    InProgress(usize),
    AwaitingOptions(usize),
    Generating,
    Completed,
}

impl FlowPhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: FlowPhase) -> bool {
        use FlowPhase::*;
        match (*self, target) {
            // Restart is accepted from anywhere, including mid-request.
            (_, InProgress(0)) => true,
            (InProgress(i), InProgress(j)) => j == i + 1 || j + 1 == i,
            (InProgress(i), AwaitingOptions(j)) => j == i + 1,
            // Options arrived, or the fetch failed and the flow stays put.
            (AwaitingOptions(j), InProgress(i)) => i == j || i + 1 == j,
            (InProgress(_), Generating) | (Completed, Generating) => true,
            (Generating, Completed) => true,
            _ => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::AwaitingOptions(_) | Self::Generating)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl Default for FlowPhase {
    fn default() -> Self {
        Self::InProgress(0)
    }
}

impl std::fmt::Display for FlowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress(i) => write!(f, "in_progress({i})"),
            Self::AwaitingOptions(i) => write!(f, "awaiting_options({i})"),
            Self::Generating => write!(f, "generating"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Snapshot of a questionnaire session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowState {
    /// Index of the current step.
    pub index: usize,
    pub answers: AnswerSet,
    pub completed: bool,
    /// Which plan step is expanded after completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_index: Option<usize>,
    pub phase: FlowPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<GeneratedArtifact>,
    /// Set when the artifact is a fallback because generation failed.
    pub degraded: bool,
    /// Bumped on every restart and regenerate; responses carrying an older
    /// value are stale and get discarded.
    pub generation: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Default for FlowState {
    fn default() -> Self {
        Self::new(AnswerSet::new())
    }
}

impl FlowState {
    pub fn new(answers: AnswerSet) -> Self {
        Self {
            index: 0,
            answers,
            completed: false,
            expanded_index: None,
            phase: FlowPhase::default(),
            artifact: None,
            degraded: false,
            generation: 0,
            completed_at: None,
        }
    }

    /// Move to `target`, rejecting transitions the state machine does not allow.
    pub fn enter(&mut self, target: FlowPhase) -> Result<(), QuizError> {
        if !self.phase.can_transition_to(target) {
            return Err(QuizError::out_of_range(format!(
                "cannot transition from {} to {}",
                self.phase, target
            )));
        }
        self.phase = target;
        Ok(())
    }

    /// Back to the first step. Answers are kept unless `clear_answers`.
    pub fn reset(&mut self, clear_answers: bool) {
        self.generation += 1;
        self.phase = FlowPhase::InProgress(0);
        self.index = 0;
        self.completed = false;
        self.artifact = None;
        self.degraded = false;
        self.expanded_index = None;
        self.completed_at = None;
        if clear_answers {
            self.answers.clear();
        }
    }
}
