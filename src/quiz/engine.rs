//! QuestionnaireEngine: drives one session through its steps, fetching
//! personalised options and the final artifact from a completion service.
//!
//! The engine is `Send + Sync` and every method takes `&self`, so a UI can
//! keep polling it while a completion request is pending. Mutations during
//! that window fail with [`QuizError::Busy`]. `restart()` is always allowed
//! and invalidates whatever request is in flight.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::completion::{CompletionService, GeneratedArtifact};
use crate::error::QuizError;
use crate::profile::ProfileStore;

use super::answers::{Answer, AnswerSet};
use super::rules;
use super::state::{FlowPhase, FlowState};
use super::step::{ChoiceOption, Selection, Step, StepKind};

/// What `restart()` does with the answers collected so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Keep answers so the user can revise them ("edit profile").
    PreserveAnswers,
    ClearAnswers,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::PreserveAnswers
    }
}

impl std::str::FromStr for RestartPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" | "preserve_answers" => Ok(Self::PreserveAnswers),
            "clear" | "clear_answers" => Ok(Self::ClearAnswers),
            other => Err(format!("unknown restart policy '{other}'")),
        }
    }
}

/// Outcome of a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    Generated(GeneratedArtifact),
    /// The completion service failed; `fallback` was stored instead and the
    /// flow is marked degraded.
    GenerationFailed {
        fallback: GeneratedArtifact,
        reason: String,
    },
}

impl GenerationResult {
    pub fn artifact(&self) -> &GeneratedArtifact {
        match self {
            Self::Generated(artifact) => artifact,
            Self::GenerationFailed { fallback, .. } => fallback,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::GenerationFailed { .. })
    }
}

/// Result of `advance()` or `regenerate()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Now on step `index`.
    Moved { index: usize },
    /// The flow finished (or was regenerated) with this artifact.
    Completed(GenerationResult),
    /// A restart happened while the request was in flight; its response was
    /// dropped and the flow is wherever the restart left it.
    Discarded,
}

/// Work captured under the lock and finished after it is released.
enum Pending {
    Options {
        ticket: u64,
        index: usize,
        step_id: String,
        answers: AnswerSet,
    },
    Generate {
        ticket: u64,
        answers: AnswerSet,
    },
}

struct Session {
    steps: Vec<Step>,
    state: FlowState,
}

impl Session {
    fn current(&self) -> &Step {
        &self.steps[self.state.index]
    }

    fn ensure_idle(&self) -> Result<(), QuizError> {
        if self.state.phase.is_busy() {
            return Err(QuizError::Busy {
                phase: self.state.phase.to_string(),
            });
        }
        Ok(())
    }

    /// Idle and still accepting answers.
    fn ensure_open(&self) -> Result<(), QuizError> {
        self.ensure_idle()?;
        if self.state.completed {
            return Err(QuizError::out_of_range("the questionnaire is already completed"));
        }
        Ok(())
    }

    /// The current step, provided it is `step_id`.
    fn current_for(&self, step_id: &str) -> Result<&Step, QuizError> {
        self.ensure_open()?;
        let step = self.current();
        if step.id() != step_id {
            return Err(QuizError::out_of_range(format!(
                "step {step_id} is not the current step ({})",
                step.id()
            )));
        }
        Ok(step)
    }
}

/// Drives a user through an ordered list of steps.
pub struct QuestionnaireEngine {
    session_id: Uuid,
    completion: Arc<dyn CompletionService>,
    store: Option<Arc<dyn ProfileStore>>,
    restart_policy: RestartPolicy,
    fallback: GeneratedArtifact,
    session: RwLock<Session>,
}

impl QuestionnaireEngine {
    /// Create an engine for `steps`.
    ///
    /// Fails if there are no steps, ids repeat, or the first step needs
    /// fetched options (there are no answers to fetch them with).
    pub fn new(
        steps: Vec<Step>,
        completion: Arc<dyn CompletionService>,
    ) -> Result<Self, QuizError> {
        let Some(first) = steps.first() else {
            return Err(QuizError::out_of_range("a questionnaire needs at least one step"));
        };
        if first.is_dynamic() {
            return Err(QuizError::validation(
                first.id(),
                "the first step cannot use fetched options",
            ));
        }
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.id()) {
                return Err(QuizError::validation(step.id(), "duplicate step id"));
            }
        }

        Ok(Self {
            session_id: Uuid::new_v4(),
            completion,
            store: None,
            restart_policy: RestartPolicy::default(),
            fallback: GeneratedArtifact::fallback_plan(),
            session: RwLock::new(Session {
                steps,
                state: FlowState::default(),
            }),
        })
    }

    /// Persist the final answers here on completion, and resume from here.
    pub fn with_profile_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    /// Artifact substituted when generation fails.
    pub fn with_fallback(mut self, fallback: GeneratedArtifact) -> Self {
        self.fallback = fallback;
        self
    }

    /// Pre-seed answers. Keys that do not name a step are dropped.
    pub fn with_answers(mut self, mut answers: AnswerSet) -> Self {
        let session = self.session.get_mut();
        answers.retain(|key| session.steps.iter().any(|s| s.id() == key));
        session.state.answers = answers;
        self
    }

    /// Load previously saved answers from the profile store, if any.
    ///
    /// A failing store is logged and ignored; the flow starts blank.
    pub async fn resume(self) -> Self {
        let Some(store) = self.store.clone() else {
            return self;
        };
        match store.load().await {
            Ok(Some(answers)) => {
                info!(
                    session = %self.session_id,
                    answers = answers.len(),
                    "Resuming questionnaire from saved profile"
                );
                self.with_answers(answers)
            }
            Ok(None) => self,
            Err(e) => {
                warn!(session = %self.session_id, error = %e, "Failed to load saved profile");
                self
            }
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        self.restart_policy
    }

    /// The step the user is on. Fails once the flow is completed.
    pub async fn current_step(&self) -> Result<Step, QuizError> {
        let session = self.session.read().await;
        if session.state.completed {
            return Err(QuizError::out_of_range("the questionnaire is already completed"));
        }
        Ok(session.current().clone())
    }

    /// Whether the current answer satisfies the current step.
    pub async fn can_advance(&self) -> bool {
        let session = self.session.read().await;
        if session.state.completed || session.state.phase.is_busy() {
            return false;
        }
        let step = session.current();
        rules::is_valid(step, session.state.answers.get(step.id()))
    }

    /// Why the current step cannot be advanced, if it cannot.
    pub async fn blocking_reason(&self) -> Option<String> {
        let session = self.session.read().await;
        if session.ensure_open().is_err() {
            return Some(format!("flow is {}", session.state.phase));
        }
        let step = session.current();
        rules::check(step, session.state.answers.get(step.id())).err()
    }

    /// Select `value` on a choice step.
    ///
    /// Single-choice steps replace their answer. Multi-choice steps toggle
    /// membership, evicting the oldest pick once the maximum is reached.
    pub async fn select_option(&self, step_id: &str, value: &str) -> Result<Answer, QuizError> {
        let mut session = self.session.write().await;
        let step = session.current_for(step_id)?;
        let Some(selection) = step.selection() else {
            return Err(QuizError::validation(
                step_id,
                format!("{} steps do not take options", step.kind().name()),
            ));
        };
        if step.options().is_none() {
            return Err(QuizError::validation(step_id, "options have not been fetched yet"));
        }
        if !step.has_option(value) {
            return Err(QuizError::validation(
                step_id,
                format!("'{value}' is not one of the options"),
            ));
        }

        let answer = match selection {
            Selection::Single => Answer::Text(value.to_string()),
            Selection::Multi { max } => Answer::Choices(rules::toggle_choice(
                session.state.answers.choices(step_id),
                value,
                max,
            )),
        };
        session.state.answers.insert(step_id, answer.clone());
        debug!(session = %self.session_id, step = step_id, answer = %answer, "Option selected");
        Ok(answer)
    }

    /// Answer a free-text step. Emptiness is checked on advance.
    pub async fn set_text(&self, step_id: &str, text: &str) -> Result<(), QuizError> {
        let mut session = self.session.write().await;
        let step = session.current_for(step_id)?;
        if !matches!(step.kind(), StepKind::FreeText) {
            return Err(QuizError::validation(
                step_id,
                format!("{} steps do not take text", step.kind().name()),
            ));
        }
        session
            .state
            .answers
            .insert(step_id, Answer::Text(text.to_string()));
        Ok(())
    }

    /// Answer a bounded-range step with a number or a `[lo, hi]` pair.
    pub async fn set_range(&self, step_id: &str, answer: Answer) -> Result<(), QuizError> {
        let mut session = self.session.write().await;
        let step = session.current_for(step_id)?;
        if !matches!(step.kind(), StepKind::BoundedRange { .. }) {
            return Err(QuizError::validation(
                step_id,
                format!("{} steps do not take ranges", step.kind().name()),
            ));
        }
        rules::check(step, Some(&answer)).map_err(|reason| QuizError::validation(step_id, reason))?;
        session.state.answers.insert(step_id, answer);
        Ok(())
    }

    /// Move to the next step.
    ///
    /// Entering a dynamic step first waits for its options; if the fetch
    /// fails the flow stays on the current step. Advancing past the last step
    /// generates the artifact and saves the answers to the profile store.
    pub async fn advance(&self) -> Result<Transition, QuizError> {
        let pending = {
            let mut session = self.session.write().await;
            session.ensure_open()?;
            let Session { steps, state } = &mut *session;

            let step = &steps[state.index];
            rules::check(step, state.answers.get(step.id()))
                .map_err(|reason| QuizError::validation(step.id(), reason))?;
            if !state.answers.contains(step.id()) {
                if let Some(default) = step.kind().default_answer() {
                    state.answers.insert(step.id(), default);
                }
            }

            let next = state.index + 1;
            if next == steps.len() {
                state.enter(FlowPhase::Generating)?;
                Pending::Generate {
                    ticket: state.generation,
                    answers: state.answers.clone(),
                }
            } else if steps[next].is_dynamic() {
                state.enter(FlowPhase::AwaitingOptions(next))?;
                Pending::Options {
                    ticket: state.generation,
                    index: next,
                    step_id: steps[next].id().to_string(),
                    answers: state.answers.clone(),
                }
            } else {
                state.enter(FlowPhase::InProgress(next))?;
                state.index = next;
                debug!(session = %self.session_id, step = steps[next].id(), "Advanced");
                return Ok(Transition::Moved { index: next });
            }
        };

        match pending {
            Pending::Options {
                ticket,
                index,
                step_id,
                answers,
            } => self.finish_fetch(ticket, index, &step_id, answers).await,
            Pending::Generate { ticket, answers } => {
                let transition = self.finish_generation(ticket, &answers, None).await?;
                if matches!(transition, Transition::Completed(_)) {
                    self.persist(&answers).await;
                }
                Ok(transition)
            }
        }
    }

    /// Step back. A no-op on the first step; answers are kept.
    pub async fn retreat(&self) -> Result<usize, QuizError> {
        let mut session = self.session.write().await;
        session.ensure_open()?;
        let state = &mut session.state;
        if state.index > 0 {
            let previous = state.index - 1;
            state.enter(FlowPhase::InProgress(previous))?;
            state.index = previous;
        }
        Ok(state.index)
    }

    /// Back to the first step. Any in-flight request is abandoned.
    pub async fn restart(&self) {
        let mut session = self.session.write().await;
        let abandoned = session.state.phase.is_busy();
        session
            .state
            .reset(self.restart_policy == RestartPolicy::ClearAnswers);
        info!(
            session = %self.session_id,
            generation = session.state.generation,
            abandoned_request = abandoned,
            "Questionnaire restarted"
        );
    }

    /// Produce a new artifact from the same answers ("remix").
    pub async fn regenerate(&self) -> Result<Transition, QuizError> {
        let (ticket, answers) = {
            let mut session = self.session.write().await;
            session.ensure_idle()?;
            let state = &mut session.state;
            if !state.completed {
                return Err(QuizError::out_of_range(
                    "only a completed questionnaire can be regenerated",
                ));
            }
            state.enter(FlowPhase::Generating)?;
            state.generation += 1;
            (state.generation, state.answers.clone())
        };
        let nonce = rand::random::<u64>();
        self.finish_generation(ticket, &answers, Some(nonce)).await
    }

    /// Expand a plan step's detail, or collapse it if already expanded.
    pub async fn toggle_expanded(&self, index: usize) -> Result<Option<usize>, QuizError> {
        let mut session = self.session.write().await;
        session.ensure_idle()?;
        let state = &mut session.state;
        let len = match state.artifact {
            Some(ref artifact) if state.completed => artifact.plan_steps().map(<[_]>::len),
            _ => None,
        }
        .ok_or_else(|| QuizError::out_of_range("there is no plan to expand"))?;
        if index >= len {
            return Err(QuizError::out_of_range(format!(
                "plan step {index} does not exist ({len} steps)"
            )));
        }
        state.expanded_index = if state.expanded_index == Some(index) {
            None
        } else {
            Some(index)
        };
        Ok(state.expanded_index)
    }

    pub async fn snapshot(&self) -> FlowState {
        self.session.read().await.state.clone()
    }

    pub async fn answers(&self) -> AnswerSet {
        self.session.read().await.state.answers.clone()
    }

    pub async fn artifact(&self) -> Option<GeneratedArtifact> {
        self.session.read().await.state.artifact.clone()
    }

    pub async fn steps(&self) -> Vec<Step> {
        self.session.read().await.steps.clone()
    }

    /// `(answered, total)` over the steps of the flow.
    pub async fn progress(&self) -> (usize, usize) {
        let session = self.session.read().await;
        let answered = session
            .steps
            .iter()
            .filter(|s| session.state.answers.contains(s.id()))
            .count();
        (answered, session.steps.len())
    }

    /// Current options of a step, static or fetched.
    pub async fn options_for(&self, step_id: &str) -> Option<Vec<ChoiceOption>> {
        let session = self.session.read().await;
        session
            .steps
            .iter()
            .find(|s| s.id() == step_id)
            .and_then(|s| s.options())
            .map(<[_]>::to_vec)
    }

    async fn finish_fetch(
        &self,
        ticket: u64,
        index: usize,
        step_id: &str,
        answers: AnswerSet,
    ) -> Result<Transition, QuizError> {
        info!(session = %self.session_id, step = step_id, "Fetching personalised options");
        let result = self.completion.fetch_options(step_id, &answers).await;

        let mut session = self.session.write().await;
        let Session { steps, state } = &mut *session;
        if state.generation != ticket {
            info!(session = %self.session_id, step = step_id, "Discarding options for an abandoned request");
            return Ok(Transition::Discarded);
        }

        let reason = match result {
            Ok(options) if !options.is_empty() => {
                debug!(session = %self.session_id, step = step_id, count = options.len(), "Options received");
                steps[index].set_fetched(options);
                // A pre-filled answer may name options this fetch no longer offers.
                if let Some(previous) = state.answers.remove(step_id) {
                    match rules::retain_offered(&steps[index], &previous) {
                        Some(kept) => {
                            if kept != previous {
                                debug!(session = %self.session_id, step = step_id, kept = %kept, "Dropped answers no longer offered");
                            }
                            state.answers.insert(step_id, kept);
                        }
                        None => {
                            debug!(session = %self.session_id, step = step_id, "Cleared answer no longer offered");
                        }
                    }
                }
                state.enter(FlowPhase::InProgress(index))?;
                state.index = index;
                return Ok(Transition::Moved { index });
            }
            Ok(_) => "the completion service returned no options".to_string(),
            Err(e) => e.to_string(),
        };

        warn!(
            session = %self.session_id,
            step = step_id,
            reason = %reason,
            "Option fetch failed; staying on the current step"
        );
        state.enter(FlowPhase::InProgress(index - 1))?;
        Err(QuizError::GenerationFailed {
            stage: format!("fetching options for {step_id}"),
            reason,
        })
    }

    async fn finish_generation(
        &self,
        ticket: u64,
        answers: &AnswerSet,
        nonce: Option<u64>,
    ) -> Result<Transition, QuizError> {
        info!(session = %self.session_id, regenerate = nonce.is_some(), "Generating artifact");
        let outcome = self.completion.generate(answers, nonce).await;

        let mut session = self.session.write().await;
        let state = &mut session.state;
        if state.generation != ticket {
            info!(session = %self.session_id, "Discarding artifact for an abandoned request");
            return Ok(Transition::Discarded);
        }

        let result = match outcome {
            Ok(artifact) if !artifact.is_empty() => GenerationResult::Generated(artifact),
            Ok(_) => self.degrade("the completion service returned an empty artifact".to_string()),
            Err(e) => self.degrade(e.to_string()),
        };
        state.enter(FlowPhase::Completed)?;
        state.completed = true;
        state.completed_at = Some(Utc::now());
        state.artifact = Some(result.artifact().clone());
        state.degraded = result.is_degraded();
        state.expanded_index = None;
        Ok(Transition::Completed(result))
    }

    fn degrade(&self, reason: String) -> GenerationResult {
        warn!(
            session = %self.session_id,
            reason = %reason,
            "Generation failed; substituting fallback artifact"
        );
        GenerationResult::GenerationFailed {
            fallback: self.fallback.clone(),
            reason,
        }
    }

    /// Save `answers` over the stored profile. Entries for steps of other
    /// flows are kept.
    async fn persist(&self, answers: &AnswerSet) {
        let Some(ref store) = self.store else {
            return;
        };
        let mut profile = match store.load().await {
            Ok(saved) => saved.unwrap_or_default(),
            Err(e) => {
                warn!(session = %self.session_id, error = %e, "Failed to read profile before saving");
                AnswerSet::new()
            }
        };
        for (step_id, answer) in answers.iter() {
            profile.insert(step_id, answer.clone());
        }
        match store.save(&profile).await {
            Ok(()) => info!(session = %self.session_id, answers = profile.len(), "Profile saved"),
            Err(e) => warn!(session = %self.session_id, error = %e, "Failed to persist profile"),
        }
    }
}
