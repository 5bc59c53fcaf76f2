//! Bridge between the read loop (interactive or file) and [`smlc::Session`].
//!
//! Grounded on the teacher's own REPL/compiler split: the front end owns
//! argument parsing and the read loop, an inner engine owns the compiler
//! session, and every entry point (interactive or file-fed) funnels through
//! the same `submit` call so accept/reject handling is written once.

use smlc::{Diagnostic, Session, SessionConfig, SubmitOutcome};
use tracing::{debug, warn};

/// What happened to one line of submitted input, already formatted for
/// display by the caller.
pub enum Outcome {
    /// A complete item was accepted; carries the lines to print (one per
    /// name the item bound, `val <name> : <type>`, or nothing for an item
    /// that bound no names).
    Accepted(Vec<String>),
    /// The item so far is incomplete; the caller should prompt for another
    /// line and append it.
    Incomplete,
    /// The submitted text was blank.
    Empty,
    /// The item was rejected; carries the rendered diagnostic.
    Rejected(String),
}

/// Owns the compiler session across an entire run (one file, or the whole
/// interactive session).
pub struct Engine {
    session: Session,
}

impl Engine {
    pub fn new() -> Self {
        Engine::with_config(SessionConfig::new())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Engine { session: Session::new(config) }
    }

    /// Submit one line (interactive) or one whole file's contents fed
    /// line-by-line (see [`Engine::run_source`]) to the underlying session.
    pub fn submit(&mut self, line: &str) -> Outcome {
        match self.session.submit(line) {
            SubmitOutcome::Accepted(_item, checked) => {
                debug!(ty = %checked.ty, "item accepted");
                Outcome::Accepted(render_bindings(&checked.bindings))
            }
            SubmitOutcome::Incomplete => Outcome::Incomplete,
            SubmitOutcome::Empty => Outcome::Empty,
            SubmitOutcome::Rejected(diag) => {
                warn!(%diag, "item rejected");
                Outcome::Rejected(render_diagnostic(&diag))
            }
        }
    }

    /// Whether the session has input buffered waiting for more lines
    /// (a multi-line item) or more drain calls (several items on one line).
    pub fn has_buffered_input(&self) -> bool {
        self.session.has_buffered_input()
    }

    /// Feed a whole file's contents through the session one line at a time,
    /// reporting each resulting [`Outcome`] via `on_outcome`. Runs the drain
    /// loop after each line so that several items on one physical line (or
    /// a file with no trailing newline) are all surfaced.
    pub fn run_source(&mut self, source: &str, mut on_outcome: impl FnMut(Outcome)) {
        for line in source.lines() {
            on_outcome(self.submit(line));
            while self.has_buffered_input() {
                on_outcome(self.submit(""));
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn render_bindings(bindings: &[(String, smlc::Type)]) -> Vec<String> {
    bindings.iter().map(|(name, ty)| format!("val {} : {}", name, ty)).collect()
}

fn render_diagnostic(diag: &Diagnostic) -> String {
    format!("Error: {}", diag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_binding_reports_its_name_and_type() {
        let mut engine = Engine::new();
        match engine.submit("val x = 1 + 2;") {
            Outcome::Accepted(lines) => assert_eq!(lines, vec!["val x : int".to_string()]),
            _ => panic!("expected an accepted declaration"),
        }
    }

    #[test]
    fn bare_expression_reports_it() {
        let mut engine = Engine::new();
        match engine.submit("1 + 2;") {
            Outcome::Accepted(lines) => assert_eq!(lines, vec!["val it : int".to_string()]),
            _ => panic!("expected an accepted expression"),
        }
    }

    #[test]
    fn rejected_item_reports_a_message() {
        let mut engine = Engine::new();
        match engine.submit("val x = 1 + true;") {
            Outcome::Rejected(msg) => assert!(msg.starts_with("Error:")),
            _ => panic!("expected a rejected item"),
        }
    }

    #[test]
    fn incomplete_item_waits_for_more_input() {
        let mut engine = Engine::new();
        assert!(matches!(engine.submit("val x ="), Outcome::Incomplete));
        match engine.submit("1;") {
            Outcome::Accepted(_) => {}
            _ => panic!("expected the buffered lines to complete"),
        }
    }

    #[test]
    fn run_source_drains_every_item_on_one_line() {
        let mut engine = Engine::new();
        let mut names = Vec::new();
        engine.run_source("val a = 1; val b = 2;", |outcome| {
            if let Outcome::Accepted(lines) = outcome {
                names.extend(lines);
            }
        });
        assert_eq!(names, vec!["val a : int".to_string(), "val b : int".to_string()]);
    }
}
