//! Per-kind validity predicates and the bounded multi-select policy.

use super::answers::Answer;
use super::step::{Selection, Step, StepKind};

/// Toggle `value` in a selection list.
///
/// Selected values are removed. New values are appended; when `max` is
/// already reached the oldest selections are evicted first, so the list
/// behaves as a fixed-size sliding window rather than refusing the pick.
pub fn toggle_choice(current: &[String], value: &str, max: usize) -> Vec<String> {
    if current.iter().any(|c| c == value) {
        return current.iter().filter(|c| *c != value).cloned().collect();
    }

    let max = max.max(1);
    let keep_from = (current.len() + 1).saturating_sub(max);
    let mut next: Vec<String> = current[keep_from.min(current.len())..].to_vec();
    next.push(value.to_string());
    next
}

/// The part of `answer` still offered by `step`'s current options.
///
/// Choice lists keep the offered values in order; a single pick survives only
/// if it is still offered. `None` means nothing is left and the answer should
/// be dropped. Steps without options keep their answer as is.
pub fn retain_offered(step: &Step, answer: &Answer) -> Option<Answer> {
    if step.options().is_none() {
        return Some(answer.clone());
    }
    match answer {
        Answer::Text(value) => step.has_option(value).then(|| answer.clone()),
        Answer::Choices(values) => {
            let kept: Vec<String> = values
                .iter()
                .filter(|v| step.has_option(v))
                .cloned()
                .collect();
            (!kept.is_empty()).then_some(Answer::Choices(kept))
        }
        Answer::Number(_) | Answer::Range(..) => None,
    }
}

/// Check whether `answer` lets the user move past `step`.
///
/// Returns the reason on failure so callers can surface it.
pub fn check(step: &Step, answer: Option<&Answer>) -> Result<(), String> {
    match step.kind() {
        StepKind::SingleChoice => check_single(step, answer),
        StepKind::MultiChoice { max_selected } => check_multi(step, answer, *max_selected),
        StepKind::DynamicOptions { selection } => {
            if step.options().is_none() {
                return Err("options have not been fetched yet".to_string());
            }
            match selection {
                Selection::Single => check_single(step, answer),
                Selection::Multi { max } => check_multi(step, answer, *max),
            }
        }
        StepKind::BoundedRange {
            min, max, paired, ..
        } => check_range(answer, *min, *max, *paired),
        StepKind::FreeText => match answer {
            Some(Answer::Text(text)) if !text.trim().is_empty() => Ok(()),
            Some(Answer::Text(_)) | None => Err("text must not be empty".to_string()),
            Some(other) => Err(format!("expected text, got {other}")),
        },
    }
}

/// Boolean form of [`check`].
pub fn is_valid(step: &Step, answer: Option<&Answer>) -> bool {
    check(step, answer).is_ok()
}

fn check_single(step: &Step, answer: Option<&Answer>) -> Result<(), String> {
    match answer {
        Some(Answer::Text(value)) if value.trim().is_empty() => {
            Err("no option selected".to_string())
        }
        Some(Answer::Text(value)) if step.has_option(value) => Ok(()),
        Some(Answer::Text(value)) => Err(format!("'{value}' is not one of the options")),
        None => Err("no option selected".to_string()),
        Some(other) => Err(format!("expected a single option, got {other}")),
    }
}

fn check_multi(step: &Step, answer: Option<&Answer>, max: usize) -> Result<(), String> {
    let choices = match answer {
        Some(Answer::Choices(choices)) => choices,
        None => return Err("no option selected".to_string()),
        Some(other) => return Err(format!("expected a list of options, got {other}")),
    };
    if choices.is_empty() {
        return Err("no option selected".to_string());
    }
    if choices.len() > max {
        return Err(format!("{} selected, at most {max} allowed", choices.len()));
    }
    match choices.iter().find(|c| !step.has_option(c)) {
        Some(unknown) => Err(format!("'{unknown}' is not one of the options")),
        None => Ok(()),
    }
}

fn check_range(answer: Option<&Answer>, min: f64, max: f64, paired: bool) -> Result<(), String> {
    let bounds = min..=max;
    match (answer, paired) {
        // Untouched ranges fall back to their default.
        (None, _) => Ok(()),
        (Some(Answer::Number(v)), false) if bounds.contains(v) => Ok(()),
        (Some(Answer::Number(v)), false) => Err(format!("{v} is outside {min}–{max}")),
        (Some(Answer::Range(lo, hi)), true) => {
            if !bounds.contains(lo) || !bounds.contains(hi) {
                Err(format!("{lo}–{hi} is outside {min}–{max}"))
            } else if lo > hi {
                Err(format!("start {lo} is after end {hi}"))
            } else {
                Ok(())
            }
        }
        (Some(other), true) => Err(format!("expected a start and end, got {other}")),
        (Some(other), false) => Err(format!("expected a number, got {other}")),
    }
}
