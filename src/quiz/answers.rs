//! Accumulated answers, keyed by step id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single answer value.
///
/// Serialized untagged so a stored profile reads naturally:
/// `"23–30"`, `["Art", "Music"]`, `5`, `[9.0, 17.5]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Text(String),
    Choices(Vec<String>),
    Number(f64),
    Range(f64, f64),
}

impl Answer {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_choices(&self) -> Option<&[String]> {
        match self {
            Self::Choices(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Choices(c) => write!(f, "{}", c.join(", ")),
            Self::Number(n) => write!(f, "{n}"),
            Self::Range(lo, hi) => write!(f, "{lo}–{hi}"),
        }
    }
}

/// Mapping from step id to answer. Revisiting a step overwrites its entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<String, Answer>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, step_id: &str) -> Option<&Answer> {
        self.0.get(step_id)
    }

    /// Insert or overwrite an answer, returning the previous one.
    pub fn insert(&mut self, step_id: impl Into<String>, answer: Answer) -> Option<Answer> {
        self.0.insert(step_id.into(), answer)
    }

    pub fn remove(&mut self, step_id: &str) -> Option<Answer> {
        self.0.remove(step_id)
    }

    pub fn contains(&self, step_id: &str) -> bool {
        self.0.contains_key(step_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Answer)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keep only the entries whose key passes `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|k, _| keep(k));
    }

    /// Text answer for a step, if it is one.
    pub fn text(&self, step_id: &str) -> Option<&str> {
        self.get(step_id).and_then(Answer::as_text)
    }

    /// Choices for a step; empty when unanswered or not a choice list.
    pub fn choices(&self, step_id: &str) -> &[String] {
        self.get(step_id)
            .and_then(Answer::as_choices)
            .unwrap_or_default()
    }

    pub fn number(&self, step_id: &str) -> Option<f64> {
        self.get(step_id).and_then(Answer::as_number)
    }

    /// Render as `key: value` lines for prompt building.
    pub fn to_prompt_lines(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("- {k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<(String, Answer)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (String, Answer)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for AnswerSet {
    type Item = (String, Answer);
    type IntoIter = std::collections::btree_map::IntoIter<String, Answer>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_deserialize_untagged() {
        let set: AnswerSet = serde_json::from_str(
            r#"{"ageRange": "23–30", "hobbies": ["Art", "Music"], "stress": 4, "free": [9.0, 17.5]}"#,
        )
        .unwrap();
        assert_eq!(set.text("ageRange"), Some("23–30"));
        assert_eq!(set.choices("hobbies"), ["Art", "Music"]);
        assert_eq!(set.number("stress"), Some(4.0));
        assert_eq!(set.get("free"), Some(&Answer::Range(9.0, 17.5)));
    }

    #[test]
    fn insert_overwrites() {
        let mut set = AnswerSet::new();
        set.insert("loc", Answer::Text("Lisbon".into()));
        let prev = set.insert("loc", Answer::Text("Porto".into()));
        assert_eq!(prev, Some(Answer::Text("Lisbon".into())));
        assert_eq!(set.len(), 1);
        assert_eq!(set.text("loc"), Some("Porto"));
    }

    #[test]
    fn choices_default_to_empty() {
        let mut set = AnswerSet::new();
        assert!(set.choices("hobbies").is_empty());
        set.insert("hobbies", Answer::Text("oops".into()));
        assert!(set.choices("hobbies").is_empty());
    }

    #[test]
    fn prompt_lines_are_sorted_by_key() {
        let mut set = AnswerSet::new();
        set.insert("b", Answer::Choices(vec!["x".into(), "y".into()]));
        set.insert("a", Answer::Number(3.0));
        assert_eq!(set.to_prompt_lines(), "- a: 3\n- b: x, y");
    }

    #[test]
    fn retain_filters_keys() {
        let mut set: AnswerSet = [
            ("keep".to_string(), Answer::Number(1.0)),
            ("drop".to_string(), Answer::Number(2.0)),
        ]
        .into_iter()
        .collect();
        set.retain(|k| k == "keep");
        assert!(set.contains("keep"));
        assert!(!set.contains("drop"));
    }
}
