//! Symbol table and fixity (C3)
//!
//! The only process-wide mutable state in the pipeline (see spec.md section
//! 5), alongside the [`crate::unify::TypeArena`] it shares with the type
//! checker. Holds the fixity table, the global value and type-alias
//! environments, and a stack of scope overlays the type checker pushes and
//! pops around `let`, `fn`, and function-parameter scopes.
//!
//! Bound values are stored as a live [`TypeId`] into the session's arena,
//! not a detached [`Type`] snapshot: a `val`/`fun` binding keeps whatever
//! unification variables it elaborated with, so a second, differently-typed
//! use of a non-generalized binding is rejected exactly as it would be
//! without let-polymorphism. `@` and other built-ins with a type variable in
//! their signature share that same quirk, matching the original symbol
//! table, which allocates each built-in's type once at startup.

use std::collections::HashMap;

use crate::ast::Fixity;
use crate::types::{self, Type};
use crate::unify::{TypeArena, TypeId};

/// Precedence is 0..=9; higher binds tighter.
pub type Precedence = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorInfo {
    pub fixity: Fixity,
    pub prec: Precedence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueHandle {
    Builtin,
    UserDefined,
}

/// A bound value: a live type-arena node plus an opaque handle. Execution
/// is out of scope (C7), so the handle carries nothing but a provenance tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Value {
    pub ty: TypeId,
    pub handle: ValueHandle,
}

pub struct SymbolTable {
    types: HashMap<String, Type>,
    values: HashMap<String, Value>,
    pattern_types: HashMap<String, TypeId>,
    operators: HashMap<String, OperatorInfo>,
    overlays: Vec<HashMap<String, TypeId>>,
}

impl SymbolTable {
    /// Construct a symbol table with fixity and type-alias built-ins
    /// loaded. Built-in *values* (`@`, `^`) need a [`TypeArena`] to live in,
    /// so they are loaded separately by [`SymbolTable::init_builtin_values`]
    /// once a `Session` has both pieces to hand.
    pub fn new() -> Self {
        let mut table = SymbolTable {
            types: HashMap::new(),
            values: HashMap::new(),
            pattern_types: HashMap::new(),
            operators: HashMap::new(),
            overlays: Vec::new(),
        };
        table.init_builtin_fixity_and_types();
        table
    }

    /// Discard all process-wide state and reinitialize built-ins, per the
    /// `reset()` contract in spec.md section 4.2. Caller must follow with
    /// [`SymbolTable::init_builtin_values`] using a fresh arena, since the
    /// old arena's ids are no longer meaningful.
    pub fn reset(&mut self) {
        self.types.clear();
        self.values.clear();
        self.pattern_types.clear();
        self.operators.clear();
        self.overlays.clear();
        self.init_builtin_fixity_and_types();
    }

    fn init_builtin_fixity_and_types(&mut self) {
        self.types = types::builtin_types().into_iter().collect();

        let infix = Fixity::Infix;
        let infixr = Fixity::Infixr;
        for name in ["*", "/", "div", "mod"] {
            self.set_operator(name, OperatorInfo { fixity: infix, prec: 7 });
        }
        for name in ["+", "-", "^"] {
            self.set_operator(name, OperatorInfo { fixity: infix, prec: 6 });
        }
        for name in ["::", "@"] {
            self.set_operator(name, OperatorInfo { fixity: infixr, prec: 5 });
        }
        for name in ["=", "<>", ">", ">=", "<", "<="] {
            self.set_operator(name, OperatorInfo { fixity: infix, prec: 4 });
        }
        for name in [":=", "o"] {
            self.set_operator(name, OperatorInfo { fixity: infix, prec: 3 });
        }
        self.set_operator("before", OperatorInfo { fixity: infix, prec: 0 });
    }

    /// Allocate the built-in value signatures in `arena` and register them.
    ///
    /// `+ - *` and unary `~` are registered too (matching `overloaded[...]`
    /// the way the original symbol table would print them) but the type
    /// checker never resolves a use of them through this entry: their
    /// overload is decided directly against the operand types. Every other
    /// entry here *is* looked up generically, including the polymorphic
    /// ones (`@`, `::`, `=`, ...), each allocated once and shared for the
    /// life of the session the same way the original allocates them once
    /// at start-up — so, as in the original, a non-generalized use of one
    /// of these at an incompatible type later in the session is rejected
    /// rather than instantiated fresh.
    pub fn init_builtin_values(&mut self, arena: &mut TypeArena) {
        let var_a = || Type::Var("'a".to_string());

        let int_real_binop = Type::FunOverloaded(vec![
            (Type::Tuple(vec![Type::Int, Type::Int]), Type::Int),
            (Type::Tuple(vec![Type::Real, Type::Real]), Type::Real),
        ]);
        for name in ["+", "-", "*"] {
            self.insert_builtin(arena, name, &int_real_binop);
        }
        let int_real_unop =
            Type::FunOverloaded(vec![(Type::Int, Type::Int), (Type::Real, Type::Real)]);
        self.insert_builtin(arena, "~", &int_real_unop);

        self.insert_builtin(
            arena,
            "^",
            &Type::fun(Type::Tuple(vec![Type::String, Type::String]), Type::String),
        );
        self.insert_builtin(
            arena,
            "@",
            &Type::fun(
                Type::Tuple(vec![Type::list(var_a()), Type::list(var_a())]),
                Type::list(var_a()),
            ),
        );
        self.insert_builtin(
            arena,
            "::",
            &Type::fun(Type::Tuple(vec![var_a(), Type::list(var_a())]), Type::list(var_a())),
        );
        for name in ["=", "<>", "<", "<=", ">", ">="] {
            self.insert_builtin(
                arena,
                name,
                &Type::fun(Type::Tuple(vec![var_a(), var_a()]), Type::Bool),
            );
        }
        self.insert_builtin(
            arena,
            "o",
            &Type::fun(
                Type::Tuple(vec![
                    Type::fun(Type::Var("'b".to_string()), Type::Var("'c".to_string())),
                    Type::fun(Type::Var("'a".to_string()), Type::Var("'b".to_string())),
                ]),
                Type::fun(Type::Var("'a".to_string()), Type::Var("'c".to_string())),
            ),
        );
        self.insert_builtin(
            arena,
            "before",
            &Type::fun(Type::Tuple(vec![var_a(), Type::Var("'b".to_string())]), var_a()),
        );
        for name in ["div", "mod"] {
            self.insert_builtin(
                arena,
                name,
                &Type::fun(Type::Tuple(vec![Type::Int, Type::Int]), Type::Int),
            );
        }
    }

    fn insert_builtin(&mut self, arena: &mut TypeArena, name: &str, ty: &Type) {
        let id = arena.import(ty);
        self.values.insert(name.to_string(), Value { ty: id, handle: ValueHandle::Builtin });
    }

    pub fn get_type(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn insert_type(&mut self, name: &str, ty: Type) {
        self.types.insert(name.to_string(), ty);
    }

    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn insert_value(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Write to the topmost overlay if one is pushed, else the global map.
    pub fn insert_pattern_type(&mut self, name: &str, ty: TypeId) {
        if let Some(top) = self.overlays.last_mut() {
            top.insert(name.to_string(), ty);
        } else {
            self.pattern_types.insert(name.to_string(), ty);
        }
    }

    /// Search from the current overlay outward to the global map.
    pub fn get_pattern_type(&self, name: &str) -> Option<TypeId> {
        for overlay in self.overlays.iter().rev() {
            if let Some(ty) = overlay.get(name) {
                return Some(*ty);
            }
        }
        self.pattern_types.get(name).copied()
    }

    pub fn set_operator(&mut self, name: &str, info: OperatorInfo) {
        self.operators.insert(name.to_string(), info);
    }

    pub fn get_operator(&self, name: &str) -> Option<&OperatorInfo> {
        self.operators.get(name)
    }

    /// Push a new scope overlay (entering `fn`, `let`, or a function
    /// parameter list).
    pub fn push_overlay(&mut self) {
        self.overlays.push(HashMap::new());
    }

    /// Pop the current scope overlay, discarding names introduced within it.
    /// Must be called on every exit path, including error returns.
    pub fn pop_overlay(&mut self) {
        self.overlays.pop();
    }

    pub fn overlay_depth(&self) -> usize {
        self.overlays.len()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_fixity_survives_reset() {
        let mut table = SymbolTable::new();
        table.set_operator("++", OperatorInfo { fixity: Fixity::Infix, prec: 6 });
        table.reset();
        assert!(table.get_operator("++").is_none());
        assert_eq!(
            table.get_operator("+"),
            Some(&OperatorInfo { fixity: Fixity::Infix, prec: 6 })
        );
    }

    #[test]
    fn overlay_discipline() {
        let mut arena = TypeArena::new();
        let mut table = SymbolTable::new();
        assert_eq!(table.overlay_depth(), 0);
        let int_id = arena.int();
        table.push_overlay();
        table.insert_pattern_type("a", int_id);
        assert_eq!(table.get_pattern_type("a"), Some(int_id));
        table.pop_overlay();
        assert_eq!(table.get_pattern_type("a"), None);
    }

    #[test]
    fn builtin_append_shares_one_type_variable() {
        let mut arena = TypeArena::new();
        let mut table = SymbolTable::new();
        table.init_builtin_values(&mut arena);
        let append = table.get_value("@").unwrap().ty;
        let _ = append;
        assert!(table.get_value("@").is_some());
        assert!(table.get_value("^").is_some());
    }
}
