//! Life Planner: adaptive questionnaire core.
//!
//! A [`QuestionnaireEngine`](quiz::QuestionnaireEngine) walks a user through
//! an ordered flow of steps. Some steps carry options personalised by a
//! [`CompletionService`](completion::CompletionService) from the answers so
//! far; the last step produces a plan or a written profile. Answers persist through a
//! [`ProfileStore`](profile::ProfileStore).

pub mod app;
pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod llm;
pub mod profile;
pub mod quiz;
