//! Error types for the life planner.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Quiz error: {0}")]
    Quiz(#[from] QuizError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Errors raised by a completion service while producing options or artifacts.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Malformed completion for {stage}: {reason}")]
    Malformed { stage: String, reason: String },

    #[error("No options are known for step {step_id}")]
    UnknownStep { step_id: String },
}

/// Questionnaire engine errors. All of them are recoverable: the flow state
/// is left consistent and the caller may retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("Step {step_id} is not answered validly: {reason}")]
    Validation { step_id: String, reason: String },

    #[error("Out of range: {reason}")]
    OutOfRange { reason: String },

    #[error("Flow is busy ({phase}), try again once it settles")]
    Busy { phase: String },

    #[error("Completion failed while {stage}: {reason}")]
    GenerationFailed { stage: String, reason: String },
}

impl QuizError {
    pub(crate) fn validation(step_id: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            step_id: step_id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn out_of_range(reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            reason: reason.into(),
        }
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
