use quiz_core::model::QuizSession;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
    /// 1-based position of the current question.
    pub position: usize,
    /// Share of the list reached by the cursor, in percent.
    pub percent_through: u8,
    pub is_complete: bool,
}

impl SessionProgress {
    #[must_use]
    pub fn of(session: &QuizSession) -> Self {
        let total = session.len();
        let answered = session.answered_count();
        let position = session.current_question_index() + 1;
        let percent_through = if total == 0 {
            0
        } else {
            u8::try_from(position * 100 / total).unwrap_or(100)
        };

        Self {
            total,
            answered,
            unanswered: total.saturating_sub(answered),
            position,
            percent_through,
            is_complete: session.is_completed(),
        }
    }
}
