//! Prompts for option personalisation, plan and profile generation, and
//! parsers for the model's replies.

use serde::Deserialize;

use crate::error::CompletionError;
use crate::quiz::flows::{self, ids};
use crate::quiz::{AnswerSet, ChoiceOption};

use super::PlanStep;

pub const SYSTEM_PROMPT: &str = "\
You are the planning assistant of a life planner app. You personalise quiz \
options and write short, practical daily plans.

Rules:
- Reply with JSON only. No prose, no markdown.
- Keep labels short (1-3 words) and concrete.
- Never repeat an option.";

pub const PROFILE_SYSTEM_PROMPT: &str = "\
You are a warm, practical wellbeing coach. You read someone's answers to a \
short stress questionnaire and write a personal summary.

Rules:
- Plain text with **bold** section headings. No code fences.
- Base every insight on what the person actually said.
- Keep it under 250 words.";

/// Prompt asking for the options of `step_id`, given the answers so far.
pub fn options_prompt(step_id: &str, answers: &AnswerSet) -> String {
    let ask = match step_id {
        ids::LIFE_CONTEXT => format!(
            "Suggest 5 life stages that could describe someone aged {}.",
            answers.text(ids::AGE_RANGE).unwrap_or("unknown")
        ),
        ids::HOBBIES => format!(
            "Suggest 7 hobbies for someone aged {} who is a {}. Give each an emoji icon.",
            answers.text(ids::AGE_RANGE).unwrap_or("unknown"),
            answers.text(ids::LIFE_CONTEXT).unwrap_or("person"),
        ),
        ids::PACE => format!(
            "Suggest 4 labels for the pace of someone's day, slowest first, \
             for a {} who enjoys {}.",
            answers.text(ids::LIFE_CONTEXT).unwrap_or("person"),
            join_or(answers.choices(ids::HOBBIES), "various things"),
        ),
        ids::EVENING_RITUALS => format!(
            "Suggest 5 common evening wind-down habits for a {} with a {} pace. \
             Give each an emoji icon.",
            answers.text(ids::LIFE_CONTEXT).unwrap_or("person"),
            answers.text(ids::PACE).unwrap_or("balanced"),
        ),
        other => format!("Suggest 5 options for the question \"{other}\"."),
    };

    format!(
        "{ask}\n\nWhat we know so far:\n{}\n\n\
         Respond with a JSON array. Each item is either a string or \
         {{\"icon\": \"<emoji>\", \"label\": \"<label>\"}}.",
        known(answers)
    )
}

/// Prompt asking for a three-step daily plan.
///
/// `nonce` is echoed into the prompt so a regeneration asks for a fresh
/// variant instead of the same plan.
pub fn plan_prompt(answers: &AnswerSet, nonce: Option<u64>) -> String {
    let mut prompt = format!(
        "Write a plan of exactly 3 small, actionable steps this person can do today.\n\n\
         Profile:\n{}\n\n\
         Respond with a JSON array of objects: \
         [{{\"step\": \"<short action>\", \"detail\": \"<one sentence why>\"}}]",
        known(answers)
    );
    if let Some(nonce) = nonce {
        prompt.push_str(&format!(
            "\n\nThis is remix #{nonce}: suggest different steps from any earlier plan."
        ));
    }
    prompt
}

/// Prompt asking for a written profile from question/answer pairs.
pub fn profile_prompt(answers: &AnswerSet, nonce: Option<u64>) -> String {
    let interview = if answers.is_empty() {
        "(no answers)".to_string()
    } else {
        answers
            .iter()
            .map(|(id, answer)| {
                let question = flows::question(id).unwrap_or_else(|| id.to_string());
                format!("Q: {question}\nA: {answer}")
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    let mut prompt = format!(
        "Write a personalised summary of this person.\n\n{interview}\n\n\
         Use these sections: **Energy Pattern**, **Stress Profile**, \
         **Relaxation Strategy**, **Personalized Tips** (3-5 bullet points \
         starting with •)."
    );
    if let Some(nonce) = nonce {
        prompt.push_str(&format!(
            "\n\nThis is take #{nonce}: offer different tips from any earlier summary."
        ));
    }
    prompt
}

/// The profile text of a model reply, without surrounding code fences.
pub fn parse_profile(text: &str) -> Result<String, CompletionError> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
        .map(|inner| {
            let inner = inner.strip_prefix("markdown").unwrap_or(inner);
            inner.trim()
        })
        .unwrap_or(trimmed);
    if unfenced.is_empty() {
        return Err(CompletionError::Malformed {
            stage: "profile".to_string(),
            reason: "profile is empty".to_string(),
        });
    }
    Ok(unfenced.to_string())
}

fn known(answers: &AnswerSet) -> String {
    if answers.is_empty() {
        "- nothing yet".to_string()
    } else {
        answers.to_prompt_lines()
    }
}

fn join_or(values: &[String], default: &str) -> String {
    if values.is_empty() {
        default.to_string()
    } else {
        values.join(", ")
    }
}

/// Extract a JSON value from model output.
///
/// Handles bare JSON, markdown code fences, and JSON embedded in prose.
pub fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return Some(trimmed);
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('[') || inner.starts_with('{') {
                return Some(inner);
            }
        }
    }

    let open = trimmed.find(['[', '{'])?;
    let close = if trimmed[open..].starts_with('[') { ']' } else { '}' };
    let end = trimmed.rfind(close)?;
    (end > open).then(|| &trimmed[open..=end])
}

/// A list, or an object wrapping the list under `key`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "options", alias = "plan", alias = "steps")]
        items: Vec<T>,
    },
}

impl<T> Listing<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { items } => items,
        }
    }
}

fn parse_listing<T: for<'de> Deserialize<'de>>(
    stage: &str,
    text: &str,
) -> Result<Vec<T>, CompletionError> {
    let json = extract_json(text).ok_or_else(|| CompletionError::Malformed {
        stage: stage.to_string(),
        reason: "no JSON in reply".to_string(),
    })?;
    let listing: Listing<T> =
        serde_json::from_str(json).map_err(|e| CompletionError::Malformed {
            stage: stage.to_string(),
            reason: e.to_string(),
        })?;
    Ok(listing.into_items())
}

/// Parse a list of options, dropping blank and duplicate labels.
pub fn parse_options(text: &str) -> Result<Vec<ChoiceOption>, CompletionError> {
    let mut options: Vec<ChoiceOption> = Vec::new();
    for mut option in parse_listing::<ChoiceOption>("options", text)? {
        option.label = option.label.trim().to_string();
        if !option.label.is_empty() && !options.iter().any(|o| o.label == option.label) {
            options.push(option);
        }
    }
    Ok(options)
}

/// Parse a plan, dropping steps with no action.
pub fn parse_plan(text: &str) -> Result<Vec<PlanStep>, CompletionError> {
    Ok(parse_listing::<PlanStep>("plan", text)?
        .into_iter()
        .filter(|s| !s.step.trim().is_empty())
        .collect())
}
