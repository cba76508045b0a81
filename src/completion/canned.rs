//! Deterministic offline completion service.
//!
//! Used when no API key is configured, and as a predictable backend in
//! tests. Options adapt to earlier answers the same way every time.

use async_trait::async_trait;

use crate::error::CompletionError;
use crate::quiz::flows::ids;
use crate::quiz::{AnswerSet, ChoiceOption};

use super::{ArtifactKind, CompletionService, GeneratedArtifact, PlanStep, fallback_steps};

/// Pace labels, slowest first. A label's position + 1 is its pace level.
pub const PACE_LABELS: [&str; 4] = ["Leisurely", "Balanced", "Active", "Fast-paced"];

/// Steps swapped into a remixed plan, picked by nonce.
const REMIX_STEPS: [(&str, &str); 3] = [
    (
        "Drink a full glass of water right now",
        "Simple hydration can immediately improve focus, energy and mood.",
    ),
    (
        "Take a 10-minute walk outside",
        "A short walk in daylight lifts energy and clears your head.",
    ),
    (
        "Write down three things you're grateful for",
        "A quick gratitude note shifts attention to what is going well.",
    ),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct CannedCompletionService {
    artifact: ArtifactKind,
}

impl CannedCompletionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// What `generate` writes: a daily plan (default) or a profile.
    pub fn with_artifact(mut self, artifact: ArtifactKind) -> Self {
        self.artifact = artifact;
        self
    }
}

fn icons(pairs: &[(&str, &str)]) -> Vec<ChoiceOption> {
    pairs
        .iter()
        .map(|(icon, label)| ChoiceOption::with_icon(*icon, *label))
        .collect()
}

/// Lower bound of an age range such as `"18–22"` or `"56+"`.
fn age_floor(range: &str) -> Option<u32> {
    let digits: String = range.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn hobby_options(answers: &AnswerSet) -> Vec<ChoiceOption> {
    let young = answers
        .text(ids::AGE_RANGE)
        .and_then(age_floor)
        .is_some_and(|age| age < 25);

    if young && answers.text(ids::LIFE_CONTEXT) == Some("College student") {
        icons(&[
            ("📚", "Reading"),
            ("🏋️", "Fitness"),
            ("🎮", "Gaming"),
            ("🎸", "Music"),
            ("📱", "Social Media"),
            ("🧑‍💻", "Coding"),
            ("🍳", "Cooking"),
        ])
    } else if young {
        icons(&[
            ("🏃", "Running"),
            ("🎮", "Gaming"),
            ("🎬", "Movies"),
            ("📱", "Social Media"),
            ("🧑‍💻", "Tech"),
            ("🎨", "Art"),
            ("📷", "Photography"),
        ])
    } else {
        icons(&[
            ("🏋️", "Fitness"),
            ("🍳", "Cooking"),
            ("🏠", "Home Improvement"),
            ("🌱", "Gardening"),
            ("📚", "Reading"),
            ("✈️", "Travel"),
            ("🎨", "Art"),
            ("🎭", "Entertainment"),
        ])
    }
}

/// Pace level 1-4 from the pace answer, by label or by number.
fn pace_level(answers: &AnswerSet) -> Option<usize> {
    if let Some(level) = answers.number(ids::PACE) {
        return Some(level as usize);
    }
    let label = answers.text(ids::PACE)?;
    PACE_LABELS
        .iter()
        .position(|l| *l == label)
        .map(|i| i + 1)
        .or_else(|| label.parse().ok())
}

fn daily_plan(answers: &AnswerSet, nonce: Option<u64>) -> Vec<PlanStep> {
    let [mindful, priority, cutoff] = fallback_steps();

    let mut plan = Vec::with_capacity(3);
    plan.push(
        if answers.choices(ids::HOBBIES).iter().any(|h| h == "Fitness") {
            PlanStep::new(
                "10-minute morning stretch routine",
                "Simple stretches to boost energy and reduce stress without breaking a sweat.",
            )
        } else {
            mindful
        },
    );
    plan.push(if pace_level(answers).is_some_and(|level| level >= 3) {
        PlanStep::new(
            "Use the 1-3-5 method for tasks today",
            "Identify 1 big task, 3 medium tasks, and 5 small tasks to organize your day.",
        )
    } else {
        priority
    });
    plan.push(
        if answers
            .choices(ids::EVENING_RITUALS)
            .iter()
            .any(|h| h == "Meditation")
        {
            PlanStep::new(
                "Schedule a 10-minute evening meditation",
                "Wind down with a brief guided meditation to improve sleep quality.",
            )
        } else {
            cutoff
        },
    );

    if let Some(nonce) = nonce {
        let (step, detail) = REMIX_STEPS[(nonce % REMIX_STEPS.len() as u64) as usize];
        plan[0] = PlanStep::new(step, detail);
    }
    plan
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnergyTime {
    Morning,
    Afternoon,
    Evening,
    Variable,
}

fn energy_time(answers: &AnswerSet) -> EnergyTime {
    let answer = answers
        .text(ids::ENERGY_TIME)
        .unwrap_or_default()
        .to_lowercase();
    if answer.contains("morning") {
        EnergyTime::Morning
    } else if answer.contains("afternoon") {
        EnergyTime::Afternoon
    } else if answer.contains("evening") {
        EnergyTime::Evening
    } else {
        EnergyTime::Variable
    }
}

/// Stress sources named in the stressor answer, in a fixed order.
fn stressors(answers: &AnswerSet) -> Vec<&'static str> {
    let answer = answers.text(ids::STRESSOR).unwrap_or_default().to_lowercase();
    [("work", "work"), ("family", "family"), ("time", "time management")]
        .into_iter()
        .filter(|(keyword, _)| answer.contains(keyword))
        .map(|(_, source)| source)
        .collect()
}

fn profile_text(answers: &AnswerSet, nonce: Option<u64>) -> String {
    let energy = energy_time(answers);
    let stressors = stressors(answers);
    let time_pressure = stressors.contains(&"time management");

    let (energy_type, energy_note) = match energy {
        EnergyTime::Morning => (
            "Early Bird",
            "You tend to have your highest energy in the morning. Consider scheduling \
             demanding tasks early in the day when your focus is naturally stronger.",
        ),
        EnergyTime::Afternoon => (
            "Flexible Energy Pattern",
            "Your energy peaks in the afternoon. Consider using mornings for preparation \
             and afternoons for execution of important tasks.",
        ),
        EnergyTime::Evening => (
            "Night Owl",
            "You seem to have more energy later in the day. If possible, shift important \
             work to align with your natural energy cycle.",
        ),
        EnergyTime::Variable => (
            "Flexible Energy Pattern",
            "Your energy patterns appear to fluctuate. Pay attention to when you naturally \
             feel most focused and try to protect those hours for important work.",
        ),
    };

    let stress_level = match stressors.len() {
        0 => "Low External Stress",
        1 | 2 => "Moderate Stress",
        _ => "High Stress Environment",
    };
    let stress_note = if stressors.is_empty() {
        "You appear to manage stress effectively or have created environments with \
         minimal external pressure."
            .to_string()
    } else {
        let mut note = format!(
            "Your primary sources of stress appear to be related to {}.",
            stressors.join(", ")
        );
        if time_pressure {
            note.push_str(" Time pressure seems particularly significant for you.");
        }
        note
    };

    let mut sections = vec![
        format!("**Energy Pattern: {energy_type}**\n{energy_note}"),
        format!("**Stress Profile: {stress_level}**\n{stress_note}"),
    ];
    if let Some(recharge) = answers.text(ids::RECHARGE).filter(|r| !r.trim().is_empty()) {
        sections.push(format!(
            "**Relaxation Strategy**\nYour preferred way to recharge appears to be: {}. \
             This suggests you benefit from intentional downtime.",
            recharge.trim()
        ));
    }

    let mut tips: Vec<&str> = Vec::new();
    match energy {
        EnergyTime::Morning => tips.extend([
            "Schedule creative or difficult work before noon",
            "Consider a morning routine that prepares you for peak performance",
        ]),
        EnergyTime::Evening => tips.extend([
            "If possible, shift important meetings to afternoon slots",
            "Use mornings for planning and organization rather than intensive work",
        ]),
        EnergyTime::Afternoon | EnergyTime::Variable => {}
    }
    if stressors.contains(&"work") {
        tips.extend([
            "Set clearer boundaries between work and personal time",
            "Schedule short breaks throughout your workday to reset mentally",
        ]);
    }
    if time_pressure {
        tips.extend([
            "Practice saying \"no\" to non-essential commitments",
            "Consider time-blocking your calendar to protect focused work time",
        ]);
    }
    tips.extend([
        "Schedule daily moments of complete disconnection from technology",
        "Integrate a brief mindfulness practice into your existing routine",
    ]);
    if let Some(nonce) = nonce {
        let (step, _) = REMIX_STEPS[(nonce % REMIX_STEPS.len() as u64) as usize];
        tips.push(step);
    }
    let tips: Vec<String> = tips.into_iter().map(|tip| format!("• {tip}")).collect();
    sections.push(format!("**Personalized Tips**\n{}", tips.join("\n")));

    sections.join("\n\n")
}

#[async_trait]
impl CompletionService for CannedCompletionService {
    async fn fetch_options(
        &self,
        step_id: &str,
        answers: &AnswerSet,
    ) -> Result<Vec<ChoiceOption>, CompletionError> {
        let options: Vec<ChoiceOption> = match step_id {
            ids::LIFE_CONTEXT => [
                "College student",
                "Recent graduate",
                "Early career",
                "Working professional",
                "Parent",
            ]
            .into_iter()
            .map(ChoiceOption::from)
            .collect(),
            ids::HOBBIES => hobby_options(answers),
            ids::PACE => PACE_LABELS.into_iter().map(ChoiceOption::from).collect(),
            ids::EVENING_RITUALS => icons(&[
                ("📱", "Social media scroll"),
                ("📚", "Reading"),
                ("🍵", "Tea ritual"),
                ("🧘", "Meditation"),
                ("🎬", "TV/streaming"),
            ]),
            other => {
                return Err(CompletionError::UnknownStep {
                    step_id: other.to_string(),
                });
            }
        };
        tracing::debug!(step = step_id, "Serving canned options");
        Ok(options)
    }

    async fn generate(
        &self,
        answers: &AnswerSet,
        nonce: Option<u64>,
    ) -> Result<GeneratedArtifact, CompletionError> {
        Ok(match self.artifact {
            ArtifactKind::DailyPlan => GeneratedArtifact::Plan(daily_plan(answers, nonce)),
            ArtifactKind::Profile => GeneratedArtifact::Text(profile_text(answers, nonce)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::Answer;

    fn labels(options: &[ChoiceOption]) -> Vec<&str> {
        options.iter().map(|o| o.label.as_str()).collect()
    }

    fn plan_titles(artifact: &GeneratedArtifact) -> Vec<String> {
        artifact
            .plan_steps()
            .unwrap()
            .iter()
            .map(|s| s.step.clone())
            .collect()
    }

    #[tokio::test]
    async fn hobby_options_branch_on_age_and_context() {
        let service = CannedCompletionService::new();
        let mut answers = AnswerSet::new();
        answers.insert(ids::AGE_RANGE, Answer::Text("18–22".into()));
        answers.insert(ids::LIFE_CONTEXT, Answer::Text("College student".into()));
        let student = service.fetch_options(ids::HOBBIES, &answers).await.unwrap();
        assert!(labels(&student).contains(&"Coding"));

        answers.insert(ids::LIFE_CONTEXT, Answer::Text("Parent".into()));
        let young = service.fetch_options(ids::HOBBIES, &answers).await.unwrap();
        assert!(labels(&young).contains(&"Photography"));

        answers.insert(ids::AGE_RANGE, Answer::Text("31–40".into()));
        let older = service.fetch_options(ids::HOBBIES, &answers).await.unwrap();
        assert!(labels(&older).contains(&"Gardening"));
    }

    #[tokio::test]
    async fn unknown_step_is_an_error() {
        let service = CannedCompletionService::new();
        let err = service
            .fetch_options("favourite_season", &AnswerSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::UnknownStep { .. }));
    }

    #[tokio::test]
    async fn plan_defaults_match_fallback() {
        let service = CannedCompletionService::new();
        let plan = service.generate(&AnswerSet::new(), None).await.unwrap();
        assert_eq!(plan, GeneratedArtifact::fallback_plan());
    }

    #[tokio::test]
    async fn plan_adapts_to_answers() {
        let service = CannedCompletionService::new();
        let mut answers = AnswerSet::new();
        answers.insert(ids::HOBBIES, Answer::Choices(vec!["Fitness".into()]));
        answers.insert(ids::PACE, Answer::Text("Active".into()));
        answers.insert(
            ids::EVENING_RITUALS,
            Answer::Choices(vec!["Reading".into(), "Meditation".into()]),
        );
        let plan = service.generate(&answers, None).await.unwrap();
        assert_eq!(
            plan_titles(&plan),
            [
                "10-minute morning stretch routine",
                "Use the 1-3-5 method for tasks today",
                "Schedule a 10-minute evening meditation",
            ]
        );
    }

    #[tokio::test]
    async fn nonce_swaps_first_step() {
        let service = CannedCompletionService::new();
        let answers = AnswerSet::new();
        let a = service.generate(&answers, Some(0)).await.unwrap();
        let b = service.generate(&answers, Some(1)).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(plan_titles(&a)[0], "Drink a full glass of water right now");
        assert_eq!(plan_titles(&a)[1..], plan_titles(&b)[1..]);
    }

    fn stress_answers(stressor: &str, energy: &str) -> AnswerSet {
        let mut answers = AnswerSet::new();
        answers.insert(ids::STRESSOR, Answer::Text(stressor.into()));
        answers.insert(ids::ENERGY_TIME, Answer::Text(energy.into()));
        answers.insert(ids::RECHARGE, Answer::Text("Long walks".into()));
        answers
    }

    #[tokio::test]
    async fn profile_reads_energy_and_stressors() {
        let service = CannedCompletionService::new().with_artifact(ArtifactKind::Profile);
        let answers = stress_answers("Work deadlines and never enough time", "Early morning");
        let GeneratedArtifact::Text(profile) = service.generate(&answers, None).await.unwrap()
        else {
            panic!("profile mode should write text");
        };
        assert!(profile.starts_with("**Energy Pattern: Early Bird**"));
        assert!(profile.contains("**Stress Profile: Moderate Stress**"));
        assert!(profile.contains("related to work, time management."));
        assert!(profile.contains("Time pressure seems particularly significant"));
        assert!(profile.contains("recharge appears to be: Long walks."));
        assert!(profile.contains("• Schedule creative or difficult work before noon"));
        assert!(profile.contains("• Practice saying \"no\" to non-essential commitments"));
    }

    #[tokio::test]
    async fn calm_night_owl_profile() {
        let service = CannedCompletionService::new().with_artifact(ArtifactKind::Profile);
        let answers = stress_answers("Not much, honestly", "late evening");
        let profile = service.generate(&answers, None).await.unwrap().render(None);
        assert!(profile.contains("**Energy Pattern: Night Owl**"));
        assert!(profile.contains("**Stress Profile: Low External Stress**"));
        assert!(!profile.contains("boundaries between work"));

        let remixed = service.generate(&answers, Some(1)).await.unwrap().render(None);
        assert_ne!(profile, remixed);
        assert!(remixed.ends_with("• Take a 10-minute walk outside"));
    }

    #[test]
    fn pace_level_reads_labels_and_numbers() {
        let mut answers = AnswerSet::new();
        answers.insert(ids::PACE, Answer::Text("Balanced".into()));
        assert_eq!(pace_level(&answers), Some(2));
        answers.insert(ids::PACE, Answer::Number(4.0));
        assert_eq!(pace_level(&answers), Some(4));
        answers.insert(ids::PACE, Answer::Text("3".into()));
        assert_eq!(pace_level(&answers), Some(3));
    }

    #[test]
    fn age_floor_parses_ranges() {
        assert_eq!(age_floor("18–22"), Some(18));
        assert_eq!(age_floor("56+"), Some(56));
        assert_eq!(age_floor("unknown"), None);
    }
}
