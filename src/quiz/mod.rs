//! Adaptive questionnaire: step definitions, answer accumulation, validity
//! rules and the engine that walks a user through a flow.

pub mod answers;
pub mod engine;
pub mod flows;
pub mod rules;
pub mod state;
pub mod step;

pub use answers::{Answer, AnswerSet};
pub use engine::{GenerationResult, QuestionnaireEngine, RestartPolicy, Transition};
pub use state::{FlowPhase, FlowState};
pub use step::{ChoiceOption, Selection, Step, StepKind};
