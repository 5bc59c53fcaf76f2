//! Top-level driver tying the reader, parser, symbol table, and checker
//! together across a run of top-level items.
//!
//! [`Lexer`](crate::token::Lexer) (and therefore [`Parser`]) is constructed
//! over a whole source string with no incremental-feed API, so continuation
//! support for an interactive front end (spec.md section 4.7) works by
//! buffering raw input lines and re-parsing the whole buffer from scratch
//! each time a new line arrives, until a complete item is produced or a
//! real syntax error surfaces.

use crate::ast::Item;
use crate::backend::{Backend, NullBackend};
use crate::config::SessionConfig;
use crate::diagnostic::Diagnostic;
use crate::parser::{ParseOutcome, Parser};
use crate::symtab::{SymbolTable, Value, ValueHandle};
use crate::typechecker::{CheckedItem, TypeChecker};

/// Result of submitting one line of input to a [`Session`].
pub enum SubmitOutcome {
    /// A complete item was parsed and type-checked; it has already been
    /// handed to the session's backend.
    Accepted(Item, CheckedItem),
    /// The buffered input parsed as far as it went but ran out of tokens;
    /// the caller should read another line, append it, and submit again.
    Incomplete,
    /// The buffered input was blank.
    Empty,
    /// The buffered input was a complete item that failed to parse or
    /// type-check. The buffer is cleared; the next submission starts over.
    Rejected(Diagnostic),
}

/// One REPL/script session: the symbol table, the type checker's arena,
/// and whatever backend is consuming checked items, plus the input buffer
/// needed for multi-line continuation.
pub struct Session {
    symtab: SymbolTable,
    checker: TypeChecker,
    backend: Box<dyn Backend>,
    buffer: String,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Session::with_backend(config, Box::new(NullBackend))
    }

    pub fn with_backend(config: SessionConfig, backend: Box<dyn Backend>) -> Self {
        let mut symtab = SymbolTable::new();
        let mut checker = TypeChecker::new();
        symtab.init_builtin_values(checker.arena_mut());
        let mut session = Session { symtab, checker, backend, buffer: String::new() };
        session.apply_external_values(&config);
        session
    }

    fn apply_external_values(&mut self, config: &SessionConfig) {
        for external in &config.external_values {
            let ty_id = match &external.ty {
                Some(ty) => self.checker.arena_mut().import(ty),
                None => self.checker.arena_mut().fresh_var(),
            };
            self.symtab.insert_value(&external.name, Value { ty: ty_id, handle: ValueHandle::Builtin });
        }
    }

    /// Discard all session state (symbol table, type arena, input buffer)
    /// and start over, per spec.md section 4.2's `reset()` contract.
    pub fn reset(&mut self) {
        self.symtab.reset();
        self.checker = TypeChecker::new();
        self.symtab.init_builtin_values(self.checker.arena_mut());
        self.buffer.clear();
    }

    pub fn symtab(&self) -> &SymbolTable {
        &self.symtab
    }

    /// Append one line of input and attempt to parse and check a complete
    /// item from the accumulated buffer. Only the first complete item is
    /// reported; if the line held more than one (`val x = 1; val y = 2;`
    /// typed on one line), the rest stays buffered and surfaces on the next
    /// call — even one passed an empty line, see [`Session::has_buffered_input`].
    pub fn submit(&mut self, line: &str) -> SubmitOutcome {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(line);
        self.drain_one()
    }

    /// Whether a prior [`Session::submit`] left more than one item's worth
    /// of input buffered.
    pub fn has_buffered_input(&self) -> bool {
        !self.buffer.trim().is_empty()
    }

    fn drain_one(&mut self) -> SubmitOutcome {
        let mut parser = Parser::new(&self.buffer);
        match parser.parse_item(&mut self.symtab) {
            Ok(ParseOutcome::Incomplete) => SubmitOutcome::Incomplete,
            Ok(ParseOutcome::Empty) => {
                self.buffer.clear();
                SubmitOutcome::Empty
            }
            Ok(ParseOutcome::Complete(item)) => {
                self.buffer = parser.into_remaining();
                match self.checker.check_item(&item, &mut self.symtab) {
                    Ok(checked) => {
                        self.backend.accept(&item, &checked, &self.symtab);
                        SubmitOutcome::Accepted(item, checked)
                    }
                    Err(diag) => SubmitOutcome::Rejected(diag),
                }
            }
            Err(diag) => {
                self.buffer.clear();
                SubmitOutcome::Rejected(diag)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExternalValue;
    use crate::types::Type;

    #[test]
    fn accepts_a_simple_binding() {
        let mut session = Session::new(SessionConfig::new());
        match session.submit("val x = 1 + 2;") {
            SubmitOutcome::Accepted(_, checked) => assert_eq!(checked.ty, Type::Unit),
            _ => panic!("expected an accepted declaration"),
        }
    }

    #[test]
    fn bare_expression_is_bound_to_it_and_typed() {
        let mut session = Session::new(SessionConfig::new());
        match session.submit("1 + 2;") {
            SubmitOutcome::Accepted(_, checked) => assert_eq!(checked.ty, Type::Int),
            _ => panic!("expected an accepted expression"),
        }
    }

    #[test]
    fn continuation_buffers_across_multiple_lines() {
        let mut session = Session::new(SessionConfig::new());
        assert!(matches!(session.submit("val x ="), SubmitOutcome::Incomplete));
        match session.submit("1 + 2;") {
            SubmitOutcome::Accepted(..) => {}
            _ => panic!("expected the buffered lines to complete a val binding"),
        }
    }

    #[test]
    fn rejected_item_clears_the_buffer() {
        let mut session = Session::new(SessionConfig::new());
        assert!(matches!(session.submit("val x = 1 + true;"), SubmitOutcome::Rejected(_)));
        match session.submit("val y = 2;") {
            SubmitOutcome::Accepted(..) => {}
            _ => panic!("buffer should have been cleared after the rejected item"),
        }
    }

    #[test]
    fn external_value_is_usable_from_source() {
        let config = SessionConfig::new().with_value(ExternalValue::with_type("pi", Type::Real));
        let mut session = Session::new(config);
        match session.submit("val area = pi * pi;") {
            SubmitOutcome::Accepted(_, checked) => assert_eq!(checked.ty, Type::Unit),
            _ => panic!("expected external value `pi` to type-check"),
        }
    }

    #[test]
    fn two_items_on_one_line_drain_one_at_a_time() {
        let mut session = Session::new(SessionConfig::new());
        assert!(matches!(session.submit("val x = 1; val y = 2;"), SubmitOutcome::Accepted(..)));
        assert!(session.has_buffered_input());
        assert!(matches!(session.submit(""), SubmitOutcome::Accepted(..)));
        assert!(!session.has_buffered_input());
    }

    #[test]
    fn reset_clears_user_bindings() {
        let mut session = Session::new(SessionConfig::new());
        assert!(matches!(session.submit("val x = 1;"), SubmitOutcome::Accepted(..)));
        session.reset();
        assert!(session.symtab().get_value("x").is_none());
    }
}
