use crate::error::{ErrorKind, ParseError};
use crate::lexer::traits::Lexer;
use crate::policy::traits::ErrorPolicy;
use crate::policy::{ErrorEvent, TraceEvent};
use crate::span::Span;
use crate::symbol::SymbolId;
use crate::token::traits::Token as _;

mod action;
mod machine;
mod reducer;
mod stack;

pub use action::*;
pub use machine::*;
pub use reducer::*;
pub use stack::*;

/// What the driver does with the lookahead after a handled recovery.
///
/// The default retries the same lookahead against the post-recovery state,
/// re-entering recovery if it still cannot be shifted. `SkipLookahead`
/// consumes one lookahead per recovery instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecoveryStrategy {
    #[default]
    RetryLookahead,
    SkipLookahead,
}

/// Outcome of a reduction.
enum Reduced {
    /// Re-examine the lookahead against the new top state.
    Continue,
    /// Parsing terminated: accepted, or rejected on corrupt tables.
    Done,
}

/// Outcome of an error-recovery episode.
enum Recovery {
    /// An `error` frame was shifted.
    Handled,
    /// Parsing terminated while unwinding.
    Done,
}

/// Table-driven shift/reduce driver.
///
/// Borrows a compiled [`StateMachine`] and owns the parse stack and the
/// semantic-callback bindings. `V` is the semantic value synthesized by
/// reductions; shifted terminals carry `V::default()`.
pub struct LrParser<'sid, V> {
    machine: &'sid StateMachine<'sid>,
    stack: Stack<V>,
    reducers: Reducers<'sid, V>,
    policy: Option<Box<dyn ErrorPolicy>>,
    recovery: RecoveryStrategy,
    accepted: bool,
    rejected: bool,
    full: bool,
    debug: bool,
    position: Span,
}

impl<'sid, V> LrParser<'sid, V>
where
    V: Default,
{
    pub fn new(machine: &'sid StateMachine<'sid>) -> Self {
        Self {
            machine,
            stack: Stack::new(machine.start_state()),
            reducers: Reducers::new(machine.reducers()),
            policy: None,
            recovery: RecoveryStrategy::default(),
            accepted: false,
            rejected: false,
            full: false,
            debug: false,
            position: Span::default(),
        }
    }

    pub fn with_policy(machine: &'sid StateMachine<'sid>, policy: Box<dyn ErrorPolicy>) -> Self {
        let mut parser = Self::new(machine);
        parser.policy = Some(policy);
        parser
    }

    /// Truncate the stack to the start-state sentinel and clear the
    /// termination latches. Callback bindings persist.
    pub fn reset(&mut self) {
        self.stack.reset(self.machine.start_state());
        self.accepted = false;
        self.rejected = false;
        self.full = false;
        self.position = Span::default();
    }

    /// Bind a reduction callback by identifier.
    ///
    /// Identifiers the machine does not know are a silent no-op.
    pub fn set_reducer<F>(&mut self, identifier: &str, f: F)
    where
        F: Fn(&[Frame<V>]) -> V + 'static,
    {
        self.reducers.bind(identifier, Box::new(f));
    }

    /// Install the fallback invoked for reductions with no bound callback.
    pub fn set_default_reducer<F>(&mut self, f: F)
    where
        F: Fn(&[Frame<V>]) -> V + 'static,
    {
        self.reducers.bind_default(Box::new(f));
    }

    pub fn set_recovery(&mut self, strategy: RecoveryStrategy) {
        self.recovery = strategy;
    }

    pub fn set_debug_enabled(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.debug
    }

    pub fn accepted(&self) -> bool {
        self.accepted
    }

    pub fn rejected(&self) -> bool {
        self.rejected
    }

    /// Whether the lexer reported the input fully consumed.
    ///
    /// Set at the end of [`parse`](Self::parse) only; incremental drivers
    /// using [`step`](Self::step) alone query their own token source.
    pub fn full(&self) -> bool {
        self.full
    }

    /// The semantic value of the accepted start symbol.
    pub fn user_data(&self) -> Option<&V> {
        if self.accepted {
            self.stack.top().map(Frame::value)
        } else {
            None
        }
    }

    pub fn into_user_data(mut self) -> Option<V> {
        if self.accepted {
            self.stack.pop().map(Frame::into_value)
        } else {
            None
        }
    }

    /// Location of the last token handed to the driver.
    pub fn position(&self) -> Span {
        self.position
    }

    /// Reset, drain the lexer and run to completion.
    ///
    /// Lexical errors are forwarded to the policy and parsing keeps driving
    /// with the tokens the lexer subsequently presents.
    pub fn parse<L>(&mut self, lexer: &mut L)
    where
        L: Lexer,
    {
        self.reset();

        loop {
            match lexer.next() {
                Some(Ok(token)) => {
                    self.position = lexer.span();

                    let Some(symbol) = self.machine.find_symbol(token.symbol_id()) else {
                        self.report(ParseError::new(
                            ErrorKind::UnknownSymbol(token.symbol_id().to_string()),
                            Some(lexer.span()),
                        ));
                        continue;
                    };

                    if !self.step(symbol, token.lexeme()) {
                        break;
                    }
                }
                Some(Err(err)) => self.report(err),
                None => {
                    self.position = lexer.span();
                    while self.step(self.machine.end_symbol(), "") {}
                    break;
                }
            }
        }

        self.full = lexer.full();
    }

    /// Single-lookahead step.
    ///
    /// Performs every reduction the lookahead allows, then the shift that
    /// consumes it. Returns `false` once parsing has terminated; the caller
    /// advances its token source exactly once per `true`.
    pub fn step(&mut self, symbol: SymbolId, lexeme: &str) -> bool {
        if self.accepted || self.rejected {
            return false;
        }

        loop {
            let state = match self.stack.top() {
                Some(top) => top.state(),
                None => return false,
            };

            match self.machine.transition(state, symbol).map(|t| t.action) {
                Some(Action::Shift(to)) => {
                    // the end marker is only ever a lookahead; a table that
                    // shifts it would wedge the caller's drain loop
                    if self.machine.symbol(symbol).is_eos() {
                        self.report(ParseError::new(
                            ErrorKind::ShiftOnEos,
                            Some(self.position),
                        ));
                        self.rejected = true;
                        return false;
                    }

                    self.shift(to, symbol, lexeme);
                    return true;
                }
                Some(Action::Reduce { lhs, len, reducer }) => {
                    match self.reduce(lhs, len, reducer) {
                        Reduced::Continue => continue,
                        Reduced::Done => return false,
                    }
                }
                None => match self.recover(symbol) {
                    Recovery::Handled => match self.recovery {
                        RecoveryStrategy::RetryLookahead => continue,
                        RecoveryStrategy::SkipLookahead => return true,
                    },
                    Recovery::Done => return false,
                },
            }
        }
    }

    fn shift(&mut self, to: StateId, symbol: SymbolId, lexeme: &str) {
        self.trace_shift(symbol, lexeme);
        self.stack
            .push(Frame::new(to, Some(symbol), lexeme.to_string(), V::default()));
    }

    fn reduce(&mut self, lhs: SymbolId, len: usize, reducer: Option<ReducerId>) -> Reduced {
        if lhs == self.machine.start_symbol() {
            return self.accept();
        }

        let depth = self.stack.len();
        if len >= depth {
            self.report(ParseError::new(
                ErrorKind::BadReduction { len, depth },
                Some(self.position),
            ));
            self.rejected = true;
            return Reduced::Done;
        }

        self.trace_reduce(lhs, len);

        let value = self.reducers.invoke(reducer, self.stack.tail(len));
        self.stack.truncate(depth - len);

        let state = match self.stack.top() {
            Some(top) => top.state(),
            None => return Reduced::Done,
        };

        match self.machine.transition(state, lhs).map(|t| t.action) {
            Some(Action::Shift(to)) => {
                self.stack.push(Frame::new(to, Some(lhs), String::default(), value));
                Reduced::Continue
            }
            _ => {
                self.report(ParseError::new(
                    ErrorKind::MissingGoto(self.machine.symbol(lhs).id.to_string()),
                    Some(self.position),
                ));
                self.rejected = true;
                Reduced::Done
            }
        }
    }

    fn accept(&mut self) -> Reduced {
        if self.stack.len() != 2 {
            self.report(ParseError::new(
                ErrorKind::MalformedAccept(self.stack.len()),
                Some(self.position),
            ));
            self.rejected = true;
            return Reduced::Done;
        }

        self.stack.drop_sentinel();
        self.accepted = true;
        Reduced::Done
    }

    /// Yacc-style recovery: unwind until the `error` nonterminal can be
    /// shifted or reduced.
    ///
    /// One syntax-error notification fires per episode, at entry. Emptying
    /// the stack without handling latches `rejected`.
    fn recover(&mut self, symbol: SymbolId) -> Recovery {
        self.syntax_error(symbol);

        let error = self.machine.error_symbol();

        while let Some(top) = self.stack.top() {
            match self.machine.transition(top.state(), error).map(|t| t.action) {
                Some(Action::Shift(to)) => {
                    self.shift(to, error, "");
                    return Recovery::Handled;
                }
                Some(Action::Reduce { lhs, len, reducer }) => {
                    if let Reduced::Done = self.reduce(lhs, len, reducer) {
                        return Recovery::Done;
                    }
                }
                None => {
                    self.stack.pop();
                }
            }
        }

        self.rejected = true;
        Recovery::Done
    }

    fn syntax_error(&mut self, symbol: SymbolId) {
        let machine = self.machine;
        let expecting: Vec<&str> = self
            .stack
            .top()
            .map(|top| {
                machine
                    .state(top.state())
                    .transitions()
                    .iter()
                    .filter(|t| machine.symbol(t.on).is_terminal())
                    .map(|t| machine.symbol(t.on).id)
                    .collect()
            })
            .unwrap_or_default();

        self.report(ParseError::new(
            ErrorKind::unexpected_symbol(machine.symbol(symbol).id, expecting),
            Some(self.position),
        ));
    }

    fn trace_shift(&mut self, symbol: SymbolId, lexeme: &str) {
        if !self.debug {
            return;
        }

        let event = TraceEvent::Shift {
            symbol: self.machine.symbol(symbol).id.to_string(),
            lexeme: lexeme.to_string(),
        };
        self.emit(event);
    }

    fn trace_reduce(&mut self, lhs: SymbolId, len: usize) {
        if !self.debug {
            return;
        }

        let machine = self.machine;
        let rhs = self
            .stack
            .tail(len)
            .iter()
            .map(|frame| {
                let symbol = frame
                    .symbol()
                    .map(|id| machine.symbol(id).id)
                    .unwrap_or_default();
                (symbol.to_string(), frame.lexeme().to_string())
            })
            .collect();

        let event = TraceEvent::Reduce {
            lhs: machine.symbol(lhs).id.to_string(),
            rhs,
        };
        self.emit(event);
    }

    fn emit(&mut self, event: TraceEvent) {
        match self.policy.as_mut() {
            Some(policy) => policy.print(&event),
            None => println!("{}", event),
        }
    }

    fn report(&mut self, error: ParseError) {
        let event = ErrorEvent::from(&error);
        match self.policy.as_mut() {
            Some(policy) => policy.report(&event),
            None => eprintln!("{}", event),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorCode;
    use crate::fixtures::{calc_parser, calc_parser_with, epsilon, recovery_parser_with};
    use crate::lexer::fixtures::calc_lexer;
    use crate::policy::fixtures::RecordingPolicy;

    use super::{LrParser, RecoveryStrategy};

    #[test]
    fn test_single_number() {
        let mut parser = calc_parser();
        let mut lexer = calc_lexer("1".chars());

        parser.parse(&mut lexer);

        assert!(parser.accepted());
        assert!(parser.full());
        assert_eq!(parser.user_data(), Some(&1));
    }

    #[test]
    fn test_addition() {
        let mut parser = calc_parser();
        let mut lexer = calc_lexer("1+2".chars());

        parser.parse(&mut lexer);

        assert!(parser.accepted());
        assert_eq!(parser.user_data(), Some(&3));
    }

    #[test]
    fn test_multi_digit_numbers() {
        let mut parser = calc_parser();
        let mut lexer = calc_lexer("12+34".chars());

        parser.parse(&mut lexer);

        assert!(parser.accepted());
        assert_eq!(parser.user_data(), Some(&46));
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let mut parser = calc_parser();
        let mut lexer = calc_lexer("1+2*3".chars());

        parser.parse(&mut lexer);

        assert!(parser.accepted());
        assert_eq!(parser.user_data(), Some(&7));
    }

    #[test]
    fn test_grouping() {
        let mut parser = calc_parser();
        let mut lexer = calc_lexer("(1+2)*3".chars());

        parser.parse(&mut lexer);

        assert!(parser.accepted());
        assert_eq!(parser.user_data(), Some(&9));
    }

    #[test]
    fn test_trace() {
        let recorder = RecordingPolicy::default();
        let mut parser = calc_parser_with(Box::new(recorder.clone()));
        parser.set_debug_enabled(true);

        let mut lexer = calc_lexer("1+2".chars());
        parser.parse(&mut lexer);

        assert!(parser.accepted());
        assert_eq!(
            recorder.traces(),
            vec![
                "SHIFT: (NUM 1)",
                "REDUCE: F <- (NUM 1)",
                "REDUCE: T <- (F )",
                "REDUCE: E <- (T )",
                "SHIFT: (+ +)",
                "SHIFT: (NUM 2)",
                "REDUCE: F <- (NUM 2)",
                "REDUCE: T <- (F )",
                "REDUCE: E <- (E ) (+ +) (T )",
            ]
        );
    }

    #[test]
    fn test_trace_suppressed_without_debug() {
        let recorder = RecordingPolicy::default();
        let mut parser = calc_parser_with(Box::new(recorder.clone()));

        let mut lexer = calc_lexer("1+2".chars());
        parser.parse(&mut lexer);

        assert!(parser.accepted());
        assert!(recorder.traces().is_empty());
    }

    #[test]
    fn test_determinism() {
        let recorder = RecordingPolicy::default();
        let mut parser = calc_parser_with(Box::new(recorder.clone()));
        parser.set_debug_enabled(true);

        let mut lexer = calc_lexer("1+2*3".chars());
        parser.parse(&mut lexer);
        let first = recorder.traces();
        let first_value = parser.user_data().copied();

        recorder.clear();
        lexer.rebind("1+2*3".chars());
        parser.parse(&mut lexer);

        assert_eq!(recorder.traces(), first);
        assert_eq!(parser.user_data().copied(), first_value);
    }

    #[test]
    fn test_recovery_shifts_error_frame() {
        let recorder = RecordingPolicy::default();
        let mut parser = recovery_parser_with(Box::new(recorder.clone()));

        let mut lexer = calc_lexer("1++2".chars());
        parser.parse(&mut lexer);

        // exactly one notification, then the error production rejoins
        let errors = recorder.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::Syntax);

        assert!(parser.accepted());
        assert_eq!(parser.user_data(), Some(&3));
    }

    #[test]
    fn test_recovery_exhausts_stack() {
        let recorder = RecordingPolicy::default();
        let mut parser = calc_parser_with(Box::new(recorder.clone()));

        // no error production anywhere in the calculator tables
        let mut lexer = calc_lexer("1++2".chars());
        parser.parse(&mut lexer);

        let errors = recorder.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::Syntax);

        assert!(!parser.accepted());
        assert!(parser.rejected());
        assert_eq!(parser.user_data(), None);
    }

    #[test]
    fn test_skip_lookahead_strategy() {
        let recorder = RecordingPolicy::default();
        let mut parser = recovery_parser_with(Box::new(recorder.clone()));
        parser.set_recovery(RecoveryStrategy::SkipLookahead);

        let mut lexer = calc_lexer("1++2".chars());
        parser.parse(&mut lexer);

        // the offending lookahead is consumed with the recovery, so the `2`
        // triggers a second episode before the error production closes
        assert_eq!(recorder.errors().len(), 2);
        assert!(parser.accepted());
        assert_eq!(parser.user_data(), Some(&1));
    }

    #[test]
    fn test_empty_input() {
        let recorder = RecordingPolicy::default();
        let mut parser = calc_parser_with(Box::new(recorder.clone()));

        let mut lexer = calc_lexer("".chars());
        parser.parse(&mut lexer);

        assert_eq!(recorder.errors().len(), 1);
        assert!(!parser.accepted());
        assert!(parser.rejected());
        assert!(parser.full());
    }

    #[test]
    fn test_empty_input_with_epsilon_production() {
        let mut parser = LrParser::<i64>::new(&epsilon::MACHINE);

        assert!(!parser.step(epsilon::EOS, ""));
        assert!(parser.accepted());
        assert_eq!(parser.user_data(), Some(&0));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut parser = calc_parser();

        let mut lexer = calc_lexer("1".chars());
        parser.parse(&mut lexer);
        assert!(parser.accepted());

        parser.reset();
        parser.reset();
        assert!(!parser.accepted());
        assert_eq!(parser.user_data(), None);

        lexer.rebind("2".chars());
        parser.parse(&mut lexer);
        assert_eq!(parser.user_data(), Some(&2));
    }

    #[test]
    fn test_bindings_persist_across_parses() {
        let mut parser = calc_parser();

        let mut lexer = calc_lexer("1".chars());
        parser.parse(&mut lexer);
        assert_eq!(parser.user_data(), Some(&1));

        lexer.rebind("2*3".chars());
        parser.parse(&mut lexer);
        assert_eq!(parser.user_data(), Some(&6));
    }

    #[test]
    fn test_rebinding_same_reducer_changes_nothing() {
        let mut parser = calc_parser();
        parser.set_reducer("num", |frames: &[super::Frame<i64>]| {
            frames[0].lexeme().parse().unwrap_or_default()
        });

        let mut lexer = calc_lexer("1+2".chars());
        parser.parse(&mut lexer);
        assert_eq!(parser.user_data(), Some(&3));
    }

    #[test]
    fn test_unknown_reducer_identifier_is_ignored() {
        let mut parser = calc_parser();
        parser.set_reducer("nope", |_: &[super::Frame<i64>]| 99);

        let mut lexer = calc_lexer("1".chars());
        parser.parse(&mut lexer);
        assert_eq!(parser.user_data(), Some(&1));
    }

    #[test]
    fn test_default_reducer_fallback() {
        let mut parser = LrParser::<i64>::new(&crate::fixtures::calc::MACHINE);
        parser.set_reducer("num", |frames: &[super::Frame<i64>]| {
            frames[0].lexeme().parse().unwrap_or_default()
        });
        parser.set_reducer("add", |frames: &[super::Frame<i64>]| {
            frames[0].value() + frames[2].value()
        });
        // unit and grouping productions all go through the fallback
        parser.set_default_reducer(|frames: &[super::Frame<i64>]| {
            frames.first().map(|f| *f.value()).unwrap_or_default()
        });

        let mut lexer = calc_lexer("1+2".chars());
        parser.parse(&mut lexer);
        assert_eq!(parser.user_data(), Some(&3));
    }

    #[test]
    fn test_unbound_reductions_yield_default_value() {
        let mut parser = LrParser::<i64>::new(&crate::fixtures::calc::MACHINE);

        let mut lexer = calc_lexer("1".chars());
        parser.parse(&mut lexer);

        assert!(parser.accepted());
        assert_eq!(parser.user_data(), Some(&0));
    }

    #[test]
    fn test_lexical_error_is_forwarded() {
        let recorder = RecordingPolicy::default();
        let mut parser = calc_parser_with(Box::new(recorder.clone()));

        let mut lexer = calc_lexer("1?+2".chars());
        parser.parse(&mut lexer);

        let errors = recorder.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::Lexical);

        // the parser keeps driving with the tokens that follow
        assert!(parser.accepted());
        assert_eq!(parser.user_data(), Some(&3));
    }

    #[test]
    fn test_shift_on_end_marker_is_rejected() {
        use crate::symbol::SymbolDef;

        use super::{State, StateMachine, Transition};

        const SYMBOLS: &[SymbolDef<'static>] = &[
            SymbolDef::non_terminal("START"),
            SymbolDef::end(),
            SymbolDef::error(),
        ];
        const STATES: &[State<'static>] = &[State::new(&[Transition::shift(1, 0)])];
        static MACHINE: StateMachine<'static> =
            StateMachine::new(SYMBOLS, STATES, &[], 0, 0, 1, 2);

        let recorder = RecordingPolicy::default();
        let mut parser = LrParser::<i64>::with_policy(&MACHINE, Box::new(recorder.clone()));

        assert!(!parser.step(1, ""));
        assert!(parser.rejected());

        let errors = recorder.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::Unexpected);
    }

    #[test]
    fn test_into_user_data() {
        let mut parser = calc_parser();
        let mut lexer = calc_lexer("2*3".chars());

        parser.parse(&mut lexer);
        assert_eq!(parser.into_user_data(), Some(6));
    }

    #[test]
    fn test_step_reports_position() {
        let mut parser = calc_parser();
        let mut lexer = calc_lexer("1+2".chars());

        parser.parse(&mut lexer);
        assert_eq!(parser.position(), crate::span::Span::new(1, 3));
    }
}
