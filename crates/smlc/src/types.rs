//! The canonical, post-unification type sum
//!
//! This is the "resolved" form of a type: every unification variable has
//! either been replaced by the concrete structure it was linked to, or has
//! been materialized to a stable `'a`, `'b`, ... name. It is what gets
//! attached to AST nodes, printed in diagnostics, and handed to the backend
//! (C7). The mutable, identity-based representation used *during*
//! unification lives in [`crate::unify`].

use std::collections::BTreeMap;
use std::fmt;

/// A fully-resolved type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    Real,
    Char,
    String,
    Bool,
    Unit,
    List(Box<Type>),
    Tuple(Vec<Type>),
    /// Ordered to match record-pattern and record-type source order.
    Record(Vec<(String, Type)>),
    Fun(Box<Type>, Box<Type>),
    /// At most one side of a unification may be `FunOverloaded`; see
    /// `unify::TypeArena::unify_overloaded`.
    FunOverloaded(Vec<(Type, Type)>),
    /// A named alias bound to another type, e.g. a `type` declaration.
    Alias(String, Box<Type>),
    /// An unresolved unification variable that survived to materialization,
    /// given a stable letter name (`'a`, `'b`, ..., `'z`, `'aa`, `'bb`, ...).
    Var(String),
}

impl Type {
    pub fn fun(param: Type, ret: Type) -> Type {
        Type::Fun(Box::new(param), Box::new(ret))
    }

    pub fn list(elem: Type) -> Type {
        Type::List(Box::new(elem))
    }

    /// Strip any number of `Alias` wrappers down to the bound type, the way
    /// `unify` does on both sides before comparing kinds.
    pub fn strip_aliases(&self) -> &Type {
        let mut cur = self;
        while let Type::Alias(_, bound) = cur {
            cur = bound;
        }
        cur
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.strip_aliases(), Type::Int | Type::Real)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Real => write!(f, "real"),
            Type::Char => write!(f, "char"),
            Type::String => write!(f, "string"),
            Type::Bool => write!(f, "bool"),
            Type::Unit => write!(f, "unit"),
            Type::List(t) => write!(f, "{} list", ParenIfFun(t)),
            Type::Tuple(ts) => {
                let parts: Vec<String> = ts.iter().map(|t| format!("{}", ParenIfFun(t))).collect();
                write!(f, "{}", parts.join(" * "))
            }
            Type::Record(rows) => {
                write!(f, "{{")?;
                for (i, (name, ty)) in rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, ty)?;
                }
                write!(f, "}}")
            }
            Type::Fun(param, ret) => write!(f, "{} -> {}", ParenIfFun(param), ret),
            Type::FunOverloaded(alts) => {
                let parts: Vec<String> = alts
                    .iter()
                    .map(|(p, r)| format!("{} -> {}", p, r))
                    .collect();
                write!(f, "overloaded[{}]", parts.join(" | "))
            }
            Type::Alias(name, _) => write!(f, "{}", name),
            Type::Var(name) => write!(f, "{}", name),
        }
    }
}

/// Wraps a type reference so function types print parenthesized when they
/// occur as the argument of `list` or a tuple element.
struct ParenIfFun<'a>(&'a Type);

impl fmt::Display for ParenIfFun<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Type::Fun(..) => write!(f, "({})", self.0),
            other => write!(f, "{}", other),
        }
    }
}

/// The built-in type environment loaded by `SymbolTable::reset`: the six
/// primitive type names from spec.md section 3.
pub fn builtin_types() -> BTreeMap<String, Type> {
    let mut m = BTreeMap::new();
    m.insert("int".to_string(), Type::Int);
    m.insert("real".to_string(), Type::Real);
    m.insert("string".to_string(), Type::String);
    m.insert("unit".to_string(), Type::Unit);
    m.insert("bool".to_string(), Type::Bool);
    m.insert("char".to_string(), Type::Char);
    m
}
