/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub current_index: usize,
    pub answered: usize,
    pub remaining: usize,
    pub correct: u32,
}

impl SessionProgress {
    /// One-based position of the current question, for "3 of 10" displays.
    #[must_use]
    pub fn position(&self) -> usize {
        self.current_index + 1
    }
}
