//! Bridges rig's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionModel, Message};

use crate::error::LlmError;

use super::provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role};

pub struct RigAdapter<M> {
    model: M,
    model_name: String,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
        }
    }
}

/// A request in the shape rig expects: system text as the preamble, the last
/// user message as the prompt, everything before it as history.
#[derive(Debug, PartialEq)]
struct Turns {
    preamble: Option<String>,
    history: Vec<String>,
    prompt: String,
}

fn split_turns(messages: &[ChatMessage]) -> Result<Turns, LlmError> {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let mut history: Vec<String> = messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.clone())
        .collect();
    let prompt = history.pop().ok_or_else(|| LlmError::RequestFailed {
        provider: "rig".to_string(),
        reason: "request has no user message".to_string(),
    })?;

    Ok(Turns {
        preamble: (!system.is_empty()).then(|| system.join("\n\n")),
        history,
        prompt,
    })
}

/// Map a rig error message onto our error type.
fn classify(provider: &str, reason: String) -> LlmError {
    let lower = reason.to_ascii_lowercase();
    if lower.contains("401") || lower.contains("invalid api key") || lower.contains("incorrect api key")
    {
        LlmError::AuthFailed {
            provider: provider.to_string(),
        }
    } else {
        LlmError::RequestFailed {
            provider: provider.to_string(),
            reason,
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let turns = split_turns(&request.messages)?;

        let mut builder = self
            .model
            .completion_request(Message::user(turns.prompt))
            .messages(turns.history.into_iter().map(Message::user).collect());
        if let Some(preamble) = turns.preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify(&self.model_name, e.to_string()))?;

        let content: String = response
            .choice
            .into_iter()
            .filter_map(|part| match part {
                AssistantContent::Text(text) => Some(text.text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        tracing::debug!(
            model = %self.model_name,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Completion received"
        );

        Ok(CompletionResponse {
            content,
            input_tokens: response.usage.input_tokens as u32,
            output_tokens: response.usage.output_tokens as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_messages_become_the_preamble() {
        let turns = split_turns(&[
            ChatMessage::system("Reply with JSON."),
            ChatMessage::user("Suggest hobbies."),
        ])
        .unwrap();
        assert_eq!(
            turns,
            Turns {
                preamble: Some("Reply with JSON.".to_string()),
                history: vec![],
                prompt: "Suggest hobbies.".to_string(),
            }
        );
    }

    #[test]
    fn earlier_user_messages_become_history() {
        let turns = split_turns(&[
            ChatMessage::user("I am 23."),
            ChatMessage::user("Suggest hobbies."),
        ])
        .unwrap();
        assert_eq!(turns.preamble, None);
        assert_eq!(turns.history, ["I am 23."]);
        assert_eq!(turns.prompt, "Suggest hobbies.");
    }

    #[test]
    fn request_without_user_message_fails() {
        let err = split_turns(&[ChatMessage::system("Reply with JSON.")]).unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed { .. }));
    }

    #[test]
    fn auth_errors_are_recognised() {
        assert!(matches!(
            classify("gpt-4o-mini", "ProviderError: 401 Unauthorized".to_string()),
            LlmError::AuthFailed { .. }
        ));
        assert!(matches!(
            classify("gpt-4o-mini", "HttpError: connection reset".to_string()),
            LlmError::RequestFailed { ref reason, .. } if reason.contains("connection reset")
        ));
    }
}
