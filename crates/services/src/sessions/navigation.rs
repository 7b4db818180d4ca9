/// Cursor movement request within a session's question list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Navigation {
    GoTo(usize),
    Next,
    Previous,
}

impl Navigation {
    /// Resolve the target index for a list of `len` questions.
    ///
    /// Returns `None` when the move would leave `0..len`; there is no
    /// wraparound at either end.
    #[must_use]
    pub fn target(self, current: usize, len: usize) -> Option<usize> {
        let target = match self {
            Self::GoTo(index) => Some(index),
            Self::Next => current.checked_add(1),
            Self::Previous => current.checked_sub(1),
        };
        target.filter(|index| *index < len)
    }
}
