//! Built-in flows.

use crate::completion::ArtifactKind;

use super::step::{ChoiceOption, Selection, Step};

/// Step ids shared between the flows and the completion backends.
pub mod ids {
    pub const AGE_RANGE: &str = "age_range";
    pub const LIFE_CONTEXT: &str = "life_context";
    pub const HOBBIES: &str = "hobbies";
    pub const PACE: &str = "pace";
    pub const EVENING_RITUALS: &str = "evening_rituals";
    pub const OCCUPATION: &str = "occupation";
    pub const STRESS_LEVEL: &str = "stress_level";
    pub const AVAILABILITY: &str = "availability";
    pub const SLEEP_HABIT: &str = "sleep_habit";
    pub const SOCIAL_ENERGY: &str = "social_energy";
    pub const LOCATION: &str = "location";
    pub const TODAY_CONTEXT: &str = "today_context";
    pub const WORK_TYPE: &str = "work_type";
    pub const COFFEE: &str = "coffee";
    pub const BIRTHDAY: &str = "birthday";
    pub const REGION: &str = "region";
    pub const STRESSOR: &str = "stressor";
    pub const LOOKING_FORWARD: &str = "looking_forward";
    pub const ENERGY_TIME: &str = "energy_time";
    pub const HABIT: &str = "habit";
    pub const RECHARGE: &str = "recharge";
    pub const BUDGET: &str = "budget";
}

pub const AGE_RANGES: [&str; 5] = ["18–22", "23–30", "31–40", "41–55", "56+"];

/// Names accepted by [`by_name`].
pub const FLOW_NAMES: [&str; 5] = [
    "lifestyle",
    "basics",
    "daily_context",
    "personal_info",
    "stress",
];

/// Look up a built-in flow.
pub fn by_name(name: &str) -> Option<Vec<Step>> {
    match name {
        "lifestyle" => Some(lifestyle()),
        "basics" => Some(basics()),
        "daily_context" => Some(daily_context()),
        "personal_info" => Some(personal_info()),
        "stress" => Some(stress()),
        _ => None,
    }
}

/// What the named flow generates when it finishes.
pub fn artifact_kind(name: &str) -> ArtifactKind {
    match name {
        "stress" => ArtifactKind::Profile,
        _ => ArtifactKind::DailyPlan,
    }
}

/// The adaptive lifestyle quiz. Everything after the age range is
/// personalised from the answers before it, and the flow ends in a daily plan.
pub fn lifestyle() -> Vec<Step> {
    vec![
        Step::single_choice(ids::AGE_RANGE, "Your age range?", AGE_RANGES),
        Step::dynamic(ids::LIFE_CONTEXT, "Which best describes you?", Selection::Single),
        Step::dynamic(
            ids::HOBBIES,
            "Pick up to two activities you enjoy",
            Selection::Multi { max: 2 },
        ),
        Step::dynamic(ids::PACE, "What pace suits your days?", Selection::Single),
        Step::dynamic(
            ids::EVENING_RITUALS,
            "How do you usually wind down in the evening?",
            Selection::Multi { max: 5 },
        ),
        Step::free_text(ids::LOCATION, "Where do you live? (City/Region)"),
    ]
}

/// Static profile basics: bubbles, sliders and a free-time window.
pub fn basics() -> Vec<Step> {
    vec![
        Step::single_choice(ids::AGE_RANGE, "Your age range?", AGE_RANGES),
        Step::single_choice(
            ids::OCCUPATION,
            "Occupation?",
            ["Student", "Employed", "Freelancer", "Self-employed", "Retired"],
        ),
        Step::slider(ids::STRESS_LEVEL, "Current stress level?", 0.0, 10.0, 1.0, 5.0),
        Step::multi_choice(
            ids::HOBBIES,
            "Pick your favorite hobbies",
            9,
            [
                ChoiceOption::with_icon("📚", "Reading"),
                ChoiceOption::with_icon("🍳", "Cooking"),
                ChoiceOption::with_icon("🎮", "Gaming"),
                ChoiceOption::with_icon("🥾", "Hiking"),
                ChoiceOption::with_icon("🎨", "Art"),
                ChoiceOption::with_icon("🎵", "Music"),
                ChoiceOption::with_icon("⚽", "Sports"),
                ChoiceOption::with_icon("✈️", "Travel"),
                ChoiceOption::with_icon("💻", "Technology"),
            ],
        ),
        Step::time_range(
            ids::AVAILABILITY,
            "When are you typically free each day?",
            0.0,
            24.0,
            0.5,
        ),
        Step::single_choice(
            ids::SLEEP_HABIT,
            "What's your sleep schedule like?",
            ["Early bird", "Night owl", "Regular sleeper", "Irregular sleeper"],
        ),
        Step::slider(ids::SOCIAL_ENERGY, "Social energy level?", 0.0, 10.0, 1.0, 5.0),
        Step::free_text(ids::LOCATION, "Where do you live? (City/Region)"),
    ]
}

pub fn daily_context() -> Vec<Step> {
    vec![
        Step::single_choice(
            ids::TODAY_CONTEXT,
            "What are you doing today?",
            ["Work", "Busy", "Nothing", "Lazy"],
        ),
        Step::single_choice(
            ids::WORK_TYPE,
            "What do you do for work?",
            ["Study", "Part-time", "Internship", "Other"],
        ),
        Step::single_choice(
            ids::COFFEE,
            "How do you take your coffee?",
            ["Black", "With milk", "Iced", "I don't drink"],
        ),
    ]
}

pub fn personal_info() -> Vec<Step> {
    vec![
        Step::single_choice(
            ids::BIRTHDAY,
            "What is your birthday?",
            [
                "January",
                "February",
                "March",
                "April",
                "May",
                "June",
                "July",
                "August",
                "September",
                "October",
                "November",
                "December",
            ],
        ),
        Step::single_choice(
            ids::REGION,
            "Where are you located?",
            [
                "North America",
                "South America",
                "Europe",
                "Asia",
                "Africa",
                "Australia",
                "Antarctica",
            ],
        ),
    ]
}

/// Stress and life deep dive. Open questions move from everyday stressors
/// to reflection, then location and budget; the flow ends in a written profile.
pub fn stress() -> Vec<Step> {
    vec![
        Step::free_text(
            ids::STRESSOR,
            "What is one thing that usually stresses you out the most?",
        ),
        Step::free_text(
            ids::LOOKING_FORWARD,
            "What's something you're looking forward to this week?",
        ),
        Step::free_text(
            ids::ENERGY_TIME,
            "When do you feel most energetic during the day?",
        ),
        Step::free_text(
            ids::HABIT,
            "What's one habit you're trying to build or break right now?",
        ),
        Step::free_text(
            ids::RECHARGE,
            "How do you typically recharge when you're feeling drained?",
        ),
        Step::free_text(ids::LOCATION, "What city or region are you in?"),
        Step::single_choice(
            ids::BUDGET,
            "What's your usual budget for outings?",
            ["Free", "Low", "Medium", "High"],
        ),
    ]
}

/// The question text of `step_id` in any built-in flow.
pub fn question(step_id: &str) -> Option<String> {
    FLOW_NAMES
        .into_iter()
        .filter_map(by_name)
        .flatten()
        .find(|step| step.id() == step_id)
        .map(|step| step.prompt().to_string())
}
