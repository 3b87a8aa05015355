use crate::symbol::SymbolId;

/// Index of a state in the machine.
pub type StateId = usize;

/// Index of a reduction-callback slot in the machine.
pub type ReducerId = usize;

/// The table operation attached to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Push a frame and move to the target state.
    Shift(StateId),
    /// Pop `len` frames, producing `lhs`.
    ///
    /// `reducer` selects the semantic callback; `None` means the default
    /// handler.
    Reduce {
        lhs: SymbolId,
        len: usize,
        reducer: Option<ReducerId>,
    },
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Shift(to) => write!(f, "s{}", to),
            Action::Reduce { lhs, len, .. } => write!(f, "r{}:{}", lhs, len),
        }
    }
}
