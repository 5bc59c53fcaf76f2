//! Typed diagnostics for the compiler pipeline
//!
//! Every stage (C1-C7) returns `Option<T>` where the original C++ source
//! returns a null pointer, and stores the *reason* for the failure in a
//! [`Diagnostic`] rather than writing straight to stderr. The outermost
//! driver (the `smli` front end) is the only place a `Diagnostic` is
//! rendered.

use std::fmt;

/// Position of a token or character in the source, 0-indexed to match the
/// lexer's internal bookkeeping; `Display` adds 1 for human-facing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }
}

/// What a syntax error was expecting when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxDetail {
    /// A specific token class was required and absent, e.g. `"then"`.
    Missing(&'static str),
    /// No specific expectation; the token itself cannot start a production.
    Invalid(String),
}

/// The five error kinds from the specification's error-handling design.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// An unrecognized character was consumed by the lexer.
    Lex { pos: Position, ch: char },
    /// A production failed to find the token it needed.
    Syntax { pos: Position, detail: SyntaxDetail },
    /// Unification of two types failed.
    Type { lhs: String, rhs: String },
    /// An identifier was used but never bound.
    Name { kind: NameKind, name: String },
    /// A function application did not have the expected arity.
    Arity { expected: usize, found: usize },
}

/// Distinguishes the three unbound-identifier messages the spec calls out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Variable,
    Id,
    Function,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Lex { pos, ch } => {
                write!(f, "Unrecognized token {ch}", ch = ch)?;
                let _ = pos;
                Ok(())
            }
            Diagnostic::Syntax { pos, detail } => match detail {
                SyntaxDetail::Missing(what) => write!(
                    f,
                    "Syntax Error: row {}, column {}: '{}' is missing",
                    pos.row + 1,
                    pos.col + 1,
                    what
                ),
                SyntaxDetail::Invalid(tok) => write!(
                    f,
                    "Syntax Error: row {}, column {}: Invalid token: {}",
                    pos.row + 1,
                    pos.col + 1,
                    tok
                ),
            },
            Diagnostic::Type { lhs, rhs } => {
                write!(f, "Could not match {} and {}.", lhs, rhs)
            }
            Diagnostic::Name { kind, name } => {
                let label = match kind {
                    NameKind::Variable => "Unknown variable name",
                    NameKind::Id => "Unknown Id name",
                    NameKind::Function => "invalid Function name",
                };
                write!(f, "{}: {}", label, name)
            }
            Diagnostic::Arity { expected, found } => {
                write!(
                    f,
                    "Function application expected {} argument(s), found {}",
                    expected, found
                )
            }
        }
    }
}

impl std::error::Error for Diagnostic {}
