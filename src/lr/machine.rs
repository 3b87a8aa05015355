use prettytable::Table as PtTable;

use crate::symbol::{SymbolDef, SymbolId};

use super::action::{Action, ReducerId, StateId};

/// Identifier record binding a reduction to a semantic callback by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReducerDef<'sid> {
    pub id: &'sid str,
}

impl<'sid> ReducerDef<'sid> {
    pub const fn new(id: &'sid str) -> Self {
        Self { id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub on: SymbolId,
    pub action: Action,
}

impl Transition {
    pub const fn shift(on: SymbolId, to: StateId) -> Self {
        Self {
            on,
            action: Action::Shift(to),
        }
    }

    pub const fn reduce(
        on: SymbolId,
        lhs: SymbolId,
        len: usize,
        reducer: Option<ReducerId>,
    ) -> Self {
        Self {
            on,
            action: Action::Reduce { lhs, len, reducer },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct State<'sid> {
    transitions: &'sid [Transition],
}

impl<'sid> State<'sid> {
    pub const fn new(transitions: &'sid [Transition]) -> Self {
        Self { transitions }
    }

    /// The unique transition taken on `symbol`, if any.
    ///
    /// Linear scan, first match; tables are built so at most one matches.
    pub fn transition(&self, symbol: SymbolId) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.on == symbol)
    }

    pub fn transitions(&self) -> &[Transition] {
        self.transitions
    }
}

/// Read-only view over a compiled grammar.
///
/// States, transitions, symbols and reduction descriptors are borrowed
/// slices, so compiled tables can live in `static` data emitted by the table
/// compiler. The runtime never mutates the machine; independent parsers may
/// share one.
pub struct StateMachine<'sid> {
    symbols: &'sid [SymbolDef<'sid>],
    states: &'sid [State<'sid>],
    reducers: &'sid [ReducerDef<'sid>],
    start_state: StateId,
    start_symbol: SymbolId,
    end_symbol: SymbolId,
    error_symbol: SymbolId,
}

impl<'sid> StateMachine<'sid> {
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        symbols: &'sid [SymbolDef<'sid>],
        states: &'sid [State<'sid>],
        reducers: &'sid [ReducerDef<'sid>],
        start_state: StateId,
        start_symbol: SymbolId,
        end_symbol: SymbolId,
        error_symbol: SymbolId,
    ) -> Self {
        Self {
            symbols,
            states,
            reducers,
            start_state,
            start_symbol,
            end_symbol,
            error_symbol,
        }
    }

    pub fn start_state(&self) -> StateId {
        self.start_state
    }

    pub fn start_symbol(&self) -> SymbolId {
        self.start_symbol
    }

    pub fn end_symbol(&self) -> SymbolId {
        self.end_symbol
    }

    pub fn error_symbol(&self) -> SymbolId {
        self.error_symbol
    }

    pub fn symbol(&self, id: SymbolId) -> &SymbolDef<'sid> {
        &self.symbols[id]
    }

    pub fn symbols(&self) -> &[SymbolDef<'sid>] {
        self.symbols
    }

    /// Resolve a symbol by identifier, as token kinds arrive from the lexer.
    pub fn find_symbol(&self, id: &str) -> Option<SymbolId> {
        self.symbols.iter().position(|sym| sym.id == id)
    }

    pub fn state(&self, id: StateId) -> &State<'sid> {
        &self.states[id]
    }

    pub fn reducers(&self) -> &'sid [ReducerDef<'sid>] {
        self.reducers
    }

    /// The unique transition of `state` on `symbol`, if any.
    pub fn transition(&self, state: StateId, symbol: SymbolId) -> Option<&Transition> {
        self.states.get(state).and_then(|s| s.transition(symbol))
    }
}

impl std::fmt::Debug for StateMachine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::fmt::Display for StateMachine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut table = PtTable::new();

        table.add_row(
            ["#"]
                .into_iter()
                .chain(self.symbols.iter().map(|sym| sym.id))
                .collect(),
        );

        for (id, state) in self.states.iter().enumerate() {
            table.add_row(
                [id.to_string()]
                    .into_iter()
                    .chain((0..self.symbols.len()).map(|sym| {
                        state
                            .transition(sym)
                            .map(|t| match t.action {
                                Action::Shift(to) => format!("s{}", to),
                                Action::Reduce { lhs, len, .. } => {
                                    format!("r {}:{}", self.symbols[lhs].id, len)
                                }
                            })
                            .unwrap_or_default()
                    }))
                    .collect(),
            );
        }

        write!(f, "{}", table)
    }
}

#[cfg(test)]
mod tests {
    use crate::fixtures::{calc, CALC};
    use crate::lr::Action;

    #[test]
    fn test_transition_lookup() {
        let state = CALC.start_state();
        let num = CALC.find_symbol("NUM").unwrap();
        let eos = CALC.end_symbol();

        assert_eq!(
            CALC.transition(state, num).unwrap().action,
            Action::Shift(calc::S_NUM)
        );
        assert!(CALC.transition(state, eos).is_none());
    }

    #[test]
    fn test_find_symbol() {
        assert_eq!(CALC.find_symbol("E"), Some(calc::E));
        assert_eq!(CALC.find_symbol("NUM"), Some(calc::NUM));
        assert_eq!(CALC.find_symbol("nope"), None);
    }

    #[test]
    fn test_machine_display() {
        println!("{}", CALC);
    }
}
