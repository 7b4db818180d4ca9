use chrono::Duration;

use crate::model::{QuestionId, QuizSession};
use crate::scoring::{Score, ScoreBand, ScoreTier, correct_count};

/// How a single question was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionOutcome {
    Correct,
    Incorrect,
    Unanswered,
}

/// Per-question line of a result report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReview {
    pub index: usize,
    pub question_id: QuestionId,
    pub chosen: Option<usize>,
    pub correct_answer_index: usize,
    pub outcome: QuestionOutcome,
    pub explanation: Option<String>,
}

/// Read-only summary of a completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizReport {
    pub topic: String,
    pub score: Score,
    pub band: ScoreBand,
    pub tier: ScoreTier,
    pub correct: usize,
    pub answered: usize,
    pub total: usize,
    pub time_spent: Duration,
    pub reviews: Vec<QuestionReview>,
}

impl QuizReport {
    /// Builds a report for a completed session. Returns `None` while the
    /// session is still active.
    #[must_use]
    pub fn from_session(session: &QuizSession) -> Option<Self> {
        let score = session.score()?;
        let time_spent = session.time_spent().unwrap_or_else(Duration::zero);

        let reviews = session
            .questions()
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let chosen = session.answer(index);
                let outcome = match chosen {
                    None => QuestionOutcome::Unanswered,
                    Some(_) if question.is_correct(chosen) => QuestionOutcome::Correct,
                    Some(_) => QuestionOutcome::Incorrect,
                };
                QuestionReview {
                    index,
                    question_id: question.id().clone(),
                    chosen,
                    correct_answer_index: question.correct_answer_index(),
                    outcome,
                    explanation: question.explanation().map(str::to_owned),
                }
            })
            .collect();

        Some(Self {
            topic: session.config().topic().to_owned(),
            score,
            band: score.band(),
            tier: score.tier(),
            correct: correct_count(session.questions(), session.answers()),
            answered: session.answered_count(),
            total: session.len(),
            time_spent,
            reviews,
        })
    }

    /// Time spent rounded to the nearest whole minute.
    #[must_use]
    pub fn minutes_spent(&self) -> i64 {
        let secs = self.time_spent.num_seconds().max(0);
        (secs + 30) / 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuizConfig, QuizQuestion};
    use crate::scoring::score;
    use crate::time::fixed_now;

    fn finished_session(answers: &[(usize, usize)], spent: Duration) -> QuizSession {
        let questions = vec![
            QuizQuestion::new("q0", "A", vec!["x".into(), "y".into()], 1, None).unwrap(),
            QuizQuestion::new(
                "q1",
                "B",
                vec!["x".into(), "y".into()],
                0,
                Some("Because.".into()),
            )
            .unwrap(),
            QuizQuestion::new("q2", "C", vec!["x".into(), "y".into()], 0, None).unwrap(),
        ];
        let config = QuizConfig::new(3, 10, "Mixed").unwrap();
        let mut session = QuizSession::begin(config, questions, fixed_now()).unwrap();
        for (q, o) in answers {
            session = session.with_answer(*q, *o);
        }
        let s = score(session.questions(), session.answers()).unwrap();
        session.completed(s, fixed_now() + spent)
    }

    #[test]
    fn active_session_has_no_report() {
        let config = QuizConfig::new(1, 10, "Mixed").unwrap();
        let question = QuizQuestion::new("q0", "A", vec!["x".into(), "y".into()], 1, None).unwrap();
        let session = QuizSession::begin(config, vec![question], fixed_now()).unwrap();
        assert!(QuizReport::from_session(&session).is_none());
    }

    #[test]
    fn report_classifies_each_question() {
        let session = finished_session(&[(0, 1), (1, 1)], Duration::seconds(150));
        let report = QuizReport::from_session(&session).unwrap();

        assert_eq!(report.score.percent(), 33);
        assert_eq!(report.band, ScoreBand::NeedsPractice);
        assert_eq!(report.correct, 1);
        assert_eq!(report.answered, 2);
        assert_eq!(report.total, 3);
        let outcomes: Vec<_> = report.reviews.iter().map(|r| r.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                QuestionOutcome::Correct,
                QuestionOutcome::Incorrect,
                QuestionOutcome::Unanswered
            ]
        );
        assert_eq!(report.reviews[1].explanation.as_deref(), Some("Because."));
        assert_eq!(report.minutes_spent(), 3);
    }

    #[test]
    fn minutes_round_to_nearest() {
        let session = finished_session(&[], Duration::seconds(89));
        let report = QuizReport::from_session(&session).unwrap();
        assert_eq!(report.minutes_spent(), 1);
        assert_eq!(report.score.percent(), 0);
    }
}
