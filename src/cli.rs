//! Terminal front end: a stdin/stdout loop driving a questionnaire engine.
//!
//! The engine holds all state; this module only parses lines into commands
//! and renders the current step.

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::QuizError;
use crate::quiz::{
    Answer, AnswerSet, FlowState, GenerationResult, QuestionnaireEngine, RestartPolicy,
    Selection, Step, StepKind, Transition,
};

pub const HELP: &str = "\
Commands: <number> pick an option · <text> answer · Enter or /next continue
          /back · /restart · /remix (new plan) · /quit";

/// One line of user input, interpreted against the current step.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Advance,
    Back,
    Restart,
    Remix,
    Help,
    Quit,
    /// 1-based option number, or plan step number once completed.
    Pick(usize),
    Text(String),
    Number(f64),
    Range(f64, f64),
}

/// What the loop should do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Continue(Option<String>),
    Quit,
}

/// Parse a line. `kind` is the current step's kind, `None` once completed.
pub fn parse_command(line: &str, kind: Option<&StepKind>) -> Command {
    let line = line.trim();
    match line {
        "" | "/next" | "/n" => return Command::Advance,
        "/back" | "/b" => return Command::Back,
        "/restart" => return Command::Restart,
        "/remix" | "/regenerate" => return Command::Remix,
        "/help" | "?" => return Command::Help,
        "/quit" | "/q" | "/exit" => return Command::Quit,
        _ => {}
    }

    match kind {
        Some(StepKind::BoundedRange { paired: true, .. }) => parse_range(line)
            .map(|(lo, hi)| Command::Range(lo, hi))
            .unwrap_or_else(|| Command::Text(line.to_string())),
        Some(StepKind::BoundedRange { .. }) => line
            .parse()
            .map(Command::Number)
            .unwrap_or_else(|_| Command::Text(line.to_string())),
        Some(StepKind::FreeText) => Command::Text(line.to_string()),
        _ => line
            .parse()
            .map(Command::Pick)
            .unwrap_or_else(|_| Command::Text(line.to_string())),
    }
}

/// `"9-17.5"`, `"9 17.5"` or `"9 to 17.5"`.
fn parse_range(line: &str) -> Option<(f64, f64)> {
    let normalized = line.replace(" to ", " ").replace(['-', '–', ','], " ");
    let mut parts = normalized.split_whitespace().map(str::parse::<f64>);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(lo)), Some(Ok(hi)), None) => Some((lo, hi)),
        _ => None,
    }
}

/// Apply a command to the engine.
pub async fn apply(engine: &QuestionnaireEngine, command: Command) -> Result<Outcome, QuizError> {
    let completed = engine.snapshot().await.completed;
    let message = match command {
        Command::Quit => return Ok(Outcome::Quit),
        Command::Help => Some(HELP.to_string()),
        Command::Advance if completed => {
            Some("Done! /remix for a new plan or /restart to edit.".to_string())
        }
        Command::Advance => describe(engine.advance().await?),
        Command::Back => {
            engine.retreat().await?;
            None
        }
        Command::Restart => {
            engine.restart().await;
            Some(restart_message(engine.restart_policy()).to_string())
        }
        Command::Remix => describe(engine.regenerate().await?),
        Command::Pick(n) if completed => {
            let index = n
                .checked_sub(1)
                .ok_or_else(|| QuizError::out_of_range("steps start at 1"))?;
            engine.toggle_expanded(index).await?;
            None
        }
        Command::Pick(n) => {
            let step = engine.current_step().await?;
            let option = n
                .checked_sub(1)
                .and_then(|i| step.options().and_then(|o| o.get(i)))
                .ok_or_else(|| QuizError::out_of_range(format!("there is no option {n}")))?;
            return pick(engine, &step, &option.label).await;
        }
        Command::Text(text) => {
            let step = engine.current_step().await?;
            match step.kind() {
                StepKind::FreeText => {
                    engine.set_text(step.id(), &text).await?;
                    None
                }
                StepKind::BoundedRange { .. } => {
                    return Err(QuizError::validation(
                        step.id(),
                        "enter a number or a range like 9-17",
                    ));
                }
                _ => {
                    let label = step
                        .options()
                        .and_then(|options| {
                            options.iter().find(|o| o.label.eq_ignore_ascii_case(&text))
                        })
                        .map(|o| o.label.clone())
                        .unwrap_or(text);
                    return pick(engine, &step, &label).await;
                }
            }
        }
        Command::Number(value) => {
            let step = engine.current_step().await?;
            engine.set_range(step.id(), Answer::Number(value)).await?;
            None
        }
        Command::Range(lo, hi) => {
            let step = engine.current_step().await?;
            engine.set_range(step.id(), Answer::Range(lo, hi)).await?;
            None
        }
    };
    Ok(Outcome::Continue(message))
}

/// Select an option. Single-choice steps move on straight away.
async fn pick(engine: &QuestionnaireEngine, step: &Step, label: &str) -> Result<Outcome, QuizError> {
    engine.select_option(step.id(), label).await?;
    if step.selection() == Some(Selection::Single) {
        return Ok(Outcome::Continue(describe(engine.advance().await?)));
    }
    Ok(Outcome::Continue(None))
}

fn restart_message(policy: RestartPolicy) -> &'static str {
    match policy {
        RestartPolicy::PreserveAnswers => "Starting over. Your answers are still filled in.",
        RestartPolicy::ClearAnswers => "Starting over with a blank questionnaire.",
    }
}

fn describe(transition: Transition) -> Option<String> {
    match transition {
        Transition::Moved { .. } => None,
        Transition::Completed(GenerationResult::Generated(_)) => None,
        Transition::Completed(GenerationResult::GenerationFailed { .. }) => Some(
            "The planner is unavailable right now, so here is a starter version.".to_string(),
        ),
        Transition::Discarded => Some("That request was cancelled.".to_string()),
    }
}

/// Render a step with its options and the current answer.
pub fn render_step(step: &Step, answers: &AnswerSet, position: usize, total: usize) -> String {
    let mut out = format!("[{}/{}] {}\n", position + 1, total, step.prompt());
    let answer = answers.get(step.id());

    match step.kind() {
        StepKind::BoundedRange {
            min,
            max,
            step: increment,
            paired,
            default,
        } => {
            let current = answer.map(Answer::to_string).unwrap_or_else(|| {
                if *paired {
                    format!("{min}–{max}")
                } else {
                    default.to_string()
                }
            });
            out.push_str(&format!(
                "  range {min}–{max} in steps of {increment}, currently {current}\n"
            ));
        }
        StepKind::FreeText => {
            if let Some(answer) = answer {
                out.push_str(&format!("  currently: {answer}\n"));
            }
        }
        _ => match step.options() {
            Some(options) => {
                let chosen: Vec<&str> = match answer {
                    Some(Answer::Text(value)) => vec![value.as_str()],
                    Some(Answer::Choices(values)) => values.iter().map(String::as_str).collect(),
                    _ => Vec::new(),
                };
                for (i, option) in options.iter().enumerate() {
                    let mark = if chosen.contains(&option.label.as_str()) { "✓" } else { " " };
                    out.push_str(&format!("  {mark} {}. {option}\n", i + 1));
                }
                if let Some(Selection::Multi { max }) = step.selection() {
                    out.push_str(&format!("  (pick up to {max}, then press Enter)\n"));
                }
            }
            None => out.push_str("  (loading options…)\n"),
        },
    }
    out
}

/// Render the finished flow.
pub fn render_completed(state: &FlowState) -> String {
    let is_plan = state
        .artifact
        .as_ref()
        .is_some_and(|artifact| artifact.plan_steps().is_some());
    let mut out = String::from(if is_plan { "Your plan:\n" } else { "Your profile:\n" });
    if let Some(ref artifact) = state.artifact {
        out.push_str(&artifact.render(state.expanded_index));
        out.push('\n');
    }
    if state.degraded {
        out.push_str("(offline starter version)\n");
    }
    if is_plan {
        out.push_str("Type a step number for details, /remix for a new plan, /restart to edit.");
    } else {
        out.push_str("/remix for a fresh take, /restart to edit.");
    }
    out
}

async fn render(engine: &QuestionnaireEngine) -> String {
    let state = engine.snapshot().await;
    if state.completed {
        return render_completed(&state);
    }
    match engine.current_step().await {
        Ok(step) => {
            let total = engine.steps().await.len();
            render_step(&step, &state.answers, state.index, total)
        }
        Err(e) => e.to_string(),
    }
}

/// Read commands from stdin until EOF or `/quit`.
pub async fn run(engine: &QuestionnaireEngine) {
    let stdin = tokio::io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    eprintln!("{HELP}\n");
    println!("{}", render(engine).await);

    loop {
        eprint!("> ");
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                break;
            }
        };

        let kind = engine.current_step().await.ok().map(|step| step.kind().clone());
        match apply(engine, parse_command(&line, kind.as_ref())).await {
            Ok(Outcome::Quit) => break,
            Ok(Outcome::Continue(Some(message))) => eprintln!("ℹ️  {message}"),
            Ok(Outcome::Continue(None)) => {}
            Err(e) => eprintln!("⚠️  {e}"),
        }
        println!("\n{}", render(engine).await);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::completion::CannedCompletionService;
    use crate::quiz::flows;

    fn slider() -> StepKind {
        Step::slider("s", "?", 0.0, 10.0, 1.0, 5.0).kind().clone()
    }

    fn window() -> StepKind {
        Step::time_range("t", "?", 0.0, 24.0, 0.5).kind().clone()
    }

    #[test]
    fn parses_commands_by_step_kind() {
        assert_eq!(parse_command("", Some(&StepKind::FreeText)), Command::Advance);
        assert_eq!(parse_command(" /back ", None), Command::Back);
        assert_eq!(parse_command("/remix", None), Command::Remix);
        assert_eq!(parse_command("2", Some(&StepKind::SingleChoice)), Command::Pick(2));
        assert_eq!(
            parse_command("Art", Some(&StepKind::SingleChoice)),
            Command::Text("Art".into())
        );
        assert_eq!(parse_command("7", Some(&slider())), Command::Number(7.0));
        assert_eq!(parse_command("9-17.5", Some(&window())), Command::Range(9.0, 17.5));
        assert_eq!(parse_command("9 to 17", Some(&window())), Command::Range(9.0, 17.0));
        assert_eq!(
            parse_command("42", Some(&StepKind::FreeText)),
            Command::Text("42".into())
        );
        assert_eq!(parse_command("3", None), Command::Pick(3));
    }

    #[test]
    fn render_marks_chosen_options() {
        let step = Step::multi_choice("hobbies", "Hobbies?", 2, ["Reading", "Art"]);
        let mut answers = AnswerSet::new();
        answers.insert("hobbies", Answer::Choices(vec!["Art".into()]));
        let view = render_step(&step, &answers, 1, 3);
        assert!(view.starts_with("[2/3] Hobbies?"));
        assert!(view.contains("  1. Reading"));
        assert!(view.contains("✓ 2. Art"));
        assert!(view.contains("pick up to 2"));
    }

    #[tokio::test]
    async fn drives_lifestyle_flow_to_a_plan() {
        let engine =
            QuestionnaireEngine::new(flows::lifestyle(), Arc::new(CannedCompletionService::new()))
                .unwrap();

        // Single choices advance on pick
        apply(&engine, Command::Pick(1)).await.unwrap();
        apply(&engine, Command::Text("college student".into())).await.unwrap();
        assert_eq!(engine.current_step().await.unwrap().id(), flows::ids::HOBBIES);

        apply(&engine, Command::Text("Fitness".into())).await.unwrap();
        apply(&engine, Command::Advance).await.unwrap();
        apply(&engine, Command::Text("Active".into())).await.unwrap();
        apply(&engine, Command::Text("Meditation".into())).await.unwrap();
        apply(&engine, Command::Advance).await.unwrap();

        assert!(apply(&engine, Command::Advance).await.is_err());
        apply(&engine, Command::Text("Lisbon".into())).await.unwrap();
        apply(&engine, Command::Advance).await.unwrap();

        let state = engine.snapshot().await;
        assert!(state.completed);
        let view = render_completed(&state);
        assert!(view.contains("1. 10-minute morning stretch routine"));

        apply(&engine, Command::Pick(2)).await.unwrap();
        assert_eq!(engine.snapshot().await.expanded_index, Some(1));
        assert!(matches!(
            apply(&engine, Command::Pick(0)).await,
            Err(QuizError::OutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn restart_message_follows_policy() {
        let service = Arc::new(CannedCompletionService::new());
        let keep = QuestionnaireEngine::new(flows::basics(), service.clone()).unwrap();
        let Outcome::Continue(Some(message)) = apply(&keep, Command::Restart).await.unwrap() else {
            panic!("restart should explain itself");
        };
        assert!(message.contains("still filled in"));

        let clear = QuestionnaireEngine::new(flows::basics(), service)
            .unwrap()
            .with_restart_policy(RestartPolicy::ClearAnswers);
        apply(&clear, Command::Pick(2)).await.unwrap();
        let Outcome::Continue(Some(message)) = apply(&clear, Command::Restart).await.unwrap() else {
            panic!("restart should explain itself");
        };
        assert!(!message.contains("still filled in"));
        assert!(clear.answers().await.is_empty());
    }

    #[tokio::test]
    async fn bad_option_number_is_reported() {
        let engine =
            QuestionnaireEngine::new(flows::basics(), Arc::new(CannedCompletionService::new()))
                .unwrap();
        let err = apply(&engine, Command::Pick(99)).await.unwrap_err();
        assert!(matches!(err, QuizError::OutOfRange { .. }));
        assert_eq!(apply(&engine, Command::Quit).await.unwrap(), Outcome::Quit);
    }
}
