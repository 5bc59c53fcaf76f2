//! Front end for a small Standard ML subset: source reader, lexer, symbol
//! table with fixity, a Pratt/precedence-climbing parser, an algebraic AST,
//! and a Hindley-Milner type checker over a union-find type arena.
//!
//! The pipeline stops at a type-checked [`ast::Item`]; executing it is the
//! job of whatever [`backend::Backend`] a [`session::Session`] is built
//! with. This crate has no built-in evaluator.
//!
//! ```
//! use smlc::config::SessionConfig;
//! use smlc::session::{Session, SubmitOutcome};
//!
//! let mut session = Session::new(SessionConfig::new());
//! match session.submit("1 + 2;") {
//!     SubmitOutcome::Accepted(_, checked) => println!("{}", checked.ty),
//!     _ => unreachable!(),
//! }
//! ```

pub mod ast;
pub mod backend;
pub mod config;
pub mod diagnostic;
pub mod parser;
pub mod session;
pub mod symtab;
pub mod token;
pub mod typechecker;
pub mod types;
pub mod unify;

pub use ast::Item;
pub use backend::{Backend, NullBackend};
pub use config::{ExternalValue, SessionConfig};
pub use diagnostic::Diagnostic;
pub use session::{Session, SubmitOutcome};
pub use typechecker::CheckedItem;
pub use types::Type;
