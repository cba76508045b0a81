//! Step definitions: the questions of a flow and where their options come from.

use serde::{Deserialize, Serialize};

use super::answers::Answer;

/// A selectable option. Completion backends return either bare strings or
/// `{icon, label}` objects; both deserialize into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOption")]
pub struct ChoiceOption {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOption {
    Label(String),
    Full {
        label: String,
        #[serde(default)]
        icon: Option<String>,
    },
}

impl From<RawOption> for ChoiceOption {
    fn from(raw: RawOption) -> Self {
        match raw {
            RawOption::Label(label) => Self { label, icon: None },
            RawOption::Full { label, icon } => Self { label, icon },
        }
    }
}

impl ChoiceOption {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            icon: None,
        }
    }

    pub fn with_icon(icon: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            icon: Some(icon.into()),
        }
    }
}

impl From<&str> for ChoiceOption {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for ChoiceOption {
    fn from(label: String) -> Self {
        Self::new(label)
    }
}

impl std::fmt::Display for ChoiceOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.icon {
            Some(ref icon) => write!(f, "{icon} {}", self.label),
            None => write!(f, "{}", self.label),
        }
    }
}

/// How many options a choice step accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Selection {
    Single,
    /// Up to `max` values; selecting past `max` evicts the oldest.
    Multi { max: usize },
}

/// The kind of a step. Fixed at definition time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    SingleChoice,
    MultiChoice {
        max_selected: usize,
    },
    /// A slider (`paired = false`, one number) or a time range (`paired =
    /// true`, a `[lo, hi]` pair).
    BoundedRange {
        min: f64,
        max: f64,
        step: f64,
        paired: bool,
        default: f64,
    },
    FreeText,
    DynamicOptions {
        selection: Selection,
    },
}

impl StepKind {
    /// The answer assumed when the user advances without touching the step.
    pub fn default_answer(&self) -> Option<Answer> {
        match *self {
            Self::BoundedRange {
                min,
                max,
                paired: true,
                ..
            } => Some(Answer::Range(min, max)),
            Self::BoundedRange { default, .. } => Some(Answer::Number(default)),
            _ => None,
        }
    }

    /// Short name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SingleChoice => "single_choice",
            Self::MultiChoice { .. } => "multi_choice",
            Self::BoundedRange { .. } => "bounded_range",
            Self::FreeText => "free_text",
            Self::DynamicOptions { .. } => "dynamic_options",
        }
    }
}

/// Where a step's options come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "options", rename_all = "snake_case")]
pub(crate) enum OptionsSource {
    /// Declared with the flow.
    Static(Vec<ChoiceOption>),
    /// Requested from the completion service when the step is entered.
    Fetched,
    /// The step takes no options (ranges, free text).
    None,
}

/// One question in a flow.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    id: String,
    prompt: String,
    kind: StepKind,
    source: OptionsSource,
    /// Options fetched for the current session. Replaced on every fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    fetched: Option<Vec<ChoiceOption>>,
}

impl Step {
    fn build(id: &str, prompt: &str, kind: StepKind, source: OptionsSource) -> Self {
        Self {
            id: id.to_string(),
            prompt: prompt.to_string(),
            kind,
            source,
            fetched: None,
        }
    }

    pub fn single_choice<I, O>(id: &str, prompt: &str, options: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<ChoiceOption>,
    {
        let options = options.into_iter().map(Into::into).collect();
        Self::build(id, prompt, StepKind::SingleChoice, OptionsSource::Static(options))
    }

    /// `max_selected` is clamped to at least one.
    pub fn multi_choice<I, O>(id: &str, prompt: &str, max_selected: usize, options: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<ChoiceOption>,
    {
        let options = options.into_iter().map(Into::into).collect();
        Self::build(
            id,
            prompt,
            StepKind::MultiChoice {
                max_selected: max_selected.max(1),
            },
            OptionsSource::Static(options),
        )
    }

    pub fn slider(id: &str, prompt: &str, min: f64, max: f64, step: f64, default: f64) -> Self {
        Self::build(
            id,
            prompt,
            StepKind::BoundedRange {
                min,
                max,
                step,
                paired: false,
                default: default.clamp(min, max),
            },
            OptionsSource::None,
        )
    }

    pub fn time_range(id: &str, prompt: &str, min: f64, max: f64, step: f64) -> Self {
        Self::build(
            id,
            prompt,
            StepKind::BoundedRange {
                min,
                max,
                step,
                paired: true,
                default: min,
            },
            OptionsSource::None,
        )
    }

    pub fn free_text(id: &str, prompt: &str) -> Self {
        Self::build(id, prompt, StepKind::FreeText, OptionsSource::None)
    }

    pub fn dynamic(id: &str, prompt: &str, selection: Selection) -> Self {
        let selection = match selection {
            Selection::Multi { max } => Selection::Multi { max: max.max(1) },
            single => single,
        };
        Self::build(
            id,
            prompt,
            StepKind::DynamicOptions { selection },
            OptionsSource::Fetched,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.source, OptionsSource::Fetched)
    }

    /// The options currently selectable, or `None` for steps without options
    /// and for dynamic steps whose options have not arrived yet.
    pub fn options(&self) -> Option<&[ChoiceOption]> {
        match self.source {
            OptionsSource::Static(ref options) => Some(options),
            OptionsSource::Fetched => self.fetched.as_deref(),
            OptionsSource::None => None,
        }
    }

    /// Whether `value` names one of the current options.
    pub fn has_option(&self, value: &str) -> bool {
        self.options()
            .is_some_and(|options| options.iter().any(|o| o.label == value))
    }

    /// The selection mode for choice-style steps.
    pub fn selection(&self) -> Option<Selection> {
        match self.kind {
            StepKind::SingleChoice => Some(Selection::Single),
            StepKind::MultiChoice { max_selected } => Some(Selection::Multi { max: max_selected }),
            StepKind::DynamicOptions { selection } => Some(selection),
            _ => None,
        }
    }

    pub(crate) fn set_fetched(&mut self, options: Vec<ChoiceOption>) {
        self.fetched = Some(options);
    }
}
