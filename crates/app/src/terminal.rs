//! Line-oriented presentation of a quiz session.

use std::fmt::Write as _;

use chrono::Duration;
use quiz_core::model::QuizSession;
use quiz_core::report::{QuestionOutcome, QuizReport};
use quiz_core::scoring::ScoreTier;
use services::sessions::{TimerUrgency, format_remaining};

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Pick an option (0-based) for the current question.
    Choose(usize),
    Next,
    Previous,
    /// Jump to a question (0-based).
    GoTo(usize),
    Submit,
    Retake,
    Time,
    Help,
    Quit,
    Discard,
    Empty,
    Unknown(String),
}

impl Input {
    /// Parse a command. Numbers shown to the user are 1-based.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Self::Empty;
        };

        if let Some(option) = one_based(head) {
            return Self::Choose(option);
        }

        match head.to_ascii_lowercase().as_str() {
            "n" | "next" => Self::Next,
            "p" | "prev" | "previous" => Self::Previous,
            "g" | "goto" => match parts.next().and_then(one_based) {
                Some(index) => Self::GoTo(index),
                None => Self::Unknown(line.to_owned()),
            },
            "s" | "submit" => Self::Submit,
            "r" | "retake" => Self::Retake,
            "t" | "time" => Self::Time,
            "h" | "help" | "?" => Self::Help,
            "q" | "quit" | "exit" => Self::Quit,
            "discard" => Self::Discard,
            _ => Self::Unknown(line.to_owned()),
        }
    }
}

fn one_based(raw: &str) -> Option<usize> {
    raw.parse::<usize>().ok()?.checked_sub(1)
}

pub const HELP: &str = "\
commands:
  <number>     choose an option for the current question
  n, next      next question
  p, prev      previous question
  g <number>   go to a question
  t, time      show remaining time
  s, submit    submit the quiz
  r, retake    start again after submitting
  discard      drop the session and its saved snapshot
  q, quit      leave (an unfinished session can be resumed with --resume)";

/// Current question with its options and the chosen one marked.
#[must_use]
pub fn question_view(session: &QuizSession, remaining: Option<Duration>) -> String {
    let mut out = String::new();
    let index = session.current_question_index();
    let Some(question) = session.current_question() else {
        return out;
    };

    let _ = write!(
        out,
        "[{}] question {}/{} ({} answered)",
        session.config().topic(),
        index + 1,
        session.len(),
        session.answered_count(),
    );
    if let Some(remaining) = remaining {
        let _ = write!(out, "  {}", timer_label(remaining));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", question.prompt());

    let chosen = session.answer(index);
    for (i, option) in question.options().iter().enumerate() {
        let marker = if chosen == Some(i) { '*' } else { ' ' };
        let _ = writeln!(out, " {marker} {}) {option}", i + 1);
    }
    out
}

/// Why an answer was not recorded.
#[must_use]
pub fn answer_rejected(session: Option<&QuizSession>) -> &'static str {
    match session {
        None => "no quiz in progress",
        Some(session) if session.is_completed() => {
            "the quiz is already submitted; type 'retake' to try again"
        }
        Some(_) => "that option is not available",
    }
}

/// Remaining time, flagged once it gets close.
#[must_use]
pub fn timer_label(remaining: Duration) -> String {
    let clock = format_remaining(remaining);
    match TimerUrgency::for_remaining(remaining) {
        TimerUrgency::Calm => clock,
        TimerUrgency::Warning => format!("{clock} left"),
        TimerUrgency::Critical => format!("{clock} left!"),
    }
}

#[must_use]
pub fn report_view(report: &QuizReport) -> String {
    let mut out = String::new();
    let tier = match report.tier {
        ScoreTier::High => "high",
        ScoreTier::Medium => "medium",
        ScoreTier::Low => "low",
    };
    let _ = writeln!(
        out,
        "{}: {} ({tier}) - {}",
        report.topic,
        report.score,
        report.band.message()
    );
    let _ = writeln!(
        out,
        "{} of {} correct, {} answered, {} min",
        report.correct,
        report.total,
        report.answered,
        report.minutes_spent()
    );

    for review in &report.reviews {
        let verdict = match review.outcome {
            QuestionOutcome::Correct => "correct",
            QuestionOutcome::Incorrect => "wrong",
            QuestionOutcome::Unanswered => "skipped",
        };
        let _ = write!(
            out,
            "  {}. {verdict}, answer {}",
            review.index + 1,
            review.correct_answer_index + 1
        );
        if let Some(explanation) = &review.explanation {
            let _ = write!(out, ": {explanation}");
        }
        let _ = writeln!(out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuizConfig, QuizQuestion};
    use quiz_core::scoring::score;
    use quiz_core::time::fixed_now;

    fn build_session() -> QuizSession {
        let config = QuizConfig::new(2, 30, "Animals").unwrap();
        let questions = vec![
            QuizQuestion::new(
                "whale",
                "Largest mammal?",
                vec!["Elephant".into(), "Blue whale".into()],
                1,
                None,
            )
            .unwrap(),
            QuizQuestion::new(
                "bat",
                "Which mammal can fly?",
                vec!["Bat".into(), "Squirrel".into()],
                0,
                Some("Bats are the only flying mammals.".into()),
            )
            .unwrap(),
        ];
        QuizSession::begin(config, questions, fixed_now()).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Input::parse("2"), Input::Choose(1));
        assert_eq!(Input::parse("0"), Input::Unknown("0".into()));
        assert_eq!(Input::parse(" Next "), Input::Next);
        assert_eq!(Input::parse("g 3"), Input::GoTo(2));
        assert_eq!(Input::parse("goto"), Input::Unknown("goto".into()));
        assert_eq!(Input::parse(""), Input::Empty);
        assert_eq!(Input::parse("discard"), Input::Discard);
    }

    #[test]
    fn marks_chosen_option() {
        let session = build_session().with_answer(0, 1);
        let view = question_view(&session, Some(Duration::seconds(125)));

        assert!(view.starts_with("[Animals] question 1/2 (1 answered)  02:05 left"));
        assert!(view.contains("   1) Elephant"));
        assert!(view.contains(" * 2) Blue whale"));
    }

    #[test]
    fn answer_rejection_names_the_cause() {
        let session = build_session();
        assert_eq!(
            answer_rejected(Some(&session)),
            "that option is not available"
        );

        let s = score(session.questions(), session.answers()).unwrap();
        let done = session.completed(s, fixed_now() + Duration::minutes(1));
        assert_eq!(
            answer_rejected(Some(&done)),
            "the quiz is already submitted; type 'retake' to try again"
        );
        assert_eq!(answer_rejected(None), "no quiz in progress");
    }

    #[test]
    fn timer_label_escalates() {
        assert_eq!(timer_label(Duration::minutes(10)), "10:00");
        assert_eq!(timer_label(Duration::seconds(45)), "00:45 left!");
    }

    #[test]
    fn report_lists_every_question() {
        let session = build_session().with_answer(0, 1);
        let s = score(session.questions(), session.answers()).unwrap();
        let done = session.completed(s, fixed_now() + Duration::minutes(4));
        let report = QuizReport::from_session(&done).unwrap();

        let view = report_view(&report);
        assert!(view.starts_with("Animals: 50% (low)"));
        assert!(view.contains("1 of 2 correct, 1 answered, 4 min"));
        assert!(view.contains("  1. correct, answer 2"));
        assert!(view.contains("  2. skipped, answer 1: Bats are the only flying mammals."));
    }
}
