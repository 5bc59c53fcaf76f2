//! Union-find type arena used during checking (C6 mechanism)
//!
//! [`crate::types::Type`] is the resolved, printable form of a type; this
//! module is the mutable, identity-based representation unification
//! actually works over. Every node lives in a [`TypeArena`] and is named by
//! a stable [`TypeId`]; the disjoint-set forest is just `TypeNode::Link`
//! edges between those ids, so `find` is path-compressing union-find over
//! `Vec` indices rather than a parallel map.

use std::collections::HashMap;

use crate::diagnostic::Diagnostic;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(usize);

#[derive(Debug, Clone)]
enum TypeNode {
    /// Union-find parent edge; `find` chases these to a root.
    Link(TypeId),
    /// An unresolved unification variable.
    Unbound,
    Int,
    Real,
    Char,
    String,
    Bool,
    Unit,
    List(TypeId),
    Tuple(Vec<TypeId>),
    Record(Vec<(String, TypeId)>),
    Fun(TypeId, TypeId),
    /// `+ - * ~` resolve their overload directly against the operand types
    /// without ever unifying their stored [`TypeNode::FunOverloaded`]
    /// signature (see `typechecker::default_to_int_or_require_numeric`).
    /// But the signature can still escape into the value environment
    /// through an ordinary reference (`val f = ~`), at which point a later
    /// generic application unifies it structurally — see
    /// [`TypeArena::unify_overloaded`].
    FunOverloaded(Vec<(TypeId, TypeId)>),
    Alias(String, TypeId),
}

/// Produces the fresh type-variable letters `'a, 'b, ..., 'z, 'aa, 'bb, ...`:
/// a repeated-letter carry increment, not a base-26 counter spelled
/// `'aa, 'ab, 'ac, ...`.
#[derive(Debug, Default)]
pub struct FreshVars {
    count: usize,
}

impl FreshVars {
    pub fn new() -> Self {
        FreshVars { count: 0 }
    }

    pub fn next_name(&mut self) -> String {
        let n = self.count;
        self.count += 1;
        let letter = (b'a' + (n % 26) as u8) as char;
        let reps = n / 26 + 1;
        std::iter::repeat(letter).take(reps).collect()
    }
}

pub struct TypeArena {
    nodes: Vec<TypeNode>,
    fresh: FreshVars,
    var_names: HashMap<TypeId, String>,
}

impl TypeArena {
    pub fn new() -> Self {
        TypeArena { nodes: Vec::new(), fresh: FreshVars::new(), var_names: HashMap::new() }
    }

    fn push(&mut self, node: TypeNode) -> TypeId {
        self.nodes.push(node);
        TypeId(self.nodes.len() - 1)
    }

    pub fn fresh_var(&mut self) -> TypeId {
        self.push(TypeNode::Unbound)
    }

    pub fn int(&mut self) -> TypeId {
        self.push(TypeNode::Int)
    }

    pub fn real(&mut self) -> TypeId {
        self.push(TypeNode::Real)
    }

    pub fn char_(&mut self) -> TypeId {
        self.push(TypeNode::Char)
    }

    pub fn string(&mut self) -> TypeId {
        self.push(TypeNode::String)
    }

    pub fn bool_(&mut self) -> TypeId {
        self.push(TypeNode::Bool)
    }

    pub fn unit(&mut self) -> TypeId {
        self.push(TypeNode::Unit)
    }

    pub fn list(&mut self, elem: TypeId) -> TypeId {
        self.push(TypeNode::List(elem))
    }

    pub fn tuple(&mut self, elems: Vec<TypeId>) -> TypeId {
        self.push(TypeNode::Tuple(elems))
    }

    pub fn record(&mut self, rows: Vec<(String, TypeId)>) -> TypeId {
        self.push(TypeNode::Record(rows))
    }

    pub fn func(&mut self, param: TypeId, ret: TypeId) -> TypeId {
        self.push(TypeNode::Fun(param, ret))
    }

    pub fn overloaded(&mut self, alts: Vec<(TypeId, TypeId)>) -> TypeId {
        self.push(TypeNode::FunOverloaded(alts))
    }

    pub fn alias(&mut self, name: String, bound: TypeId) -> TypeId {
        self.push(TypeNode::Alias(name, bound))
    }

    /// Path-compressing find of the representative id for `id`'s set.
    pub fn find(&mut self, id: TypeId) -> TypeId {
        match self.nodes[id.0] {
            TypeNode::Link(next) => {
                let root = self.find(next);
                if root != next {
                    self.nodes[id.0] = TypeNode::Link(root);
                }
                root
            }
            _ => id,
        }
    }

    pub fn is_unbound(&mut self, id: TypeId) -> bool {
        let root = self.find(id);
        matches!(self.nodes[root.0], TypeNode::Unbound)
    }

    pub fn is_numeric(&mut self, id: TypeId) -> bool {
        let root = self.find(id);
        matches!(self.nodes[root.0], TypeNode::Int | TypeNode::Real)
    }

    /// Unify two type nodes, merging their union-find sets on success.
    pub fn unify(&mut self, a: TypeId, b: TypeId) -> Result<(), Diagnostic> {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return Ok(());
        }
        match (self.nodes[ra.0].clone(), self.nodes[rb.0].clone()) {
            (TypeNode::Unbound, _) => {
                self.nodes[ra.0] = TypeNode::Link(rb);
                Ok(())
            }
            (_, TypeNode::Unbound) => {
                self.nodes[rb.0] = TypeNode::Link(ra);
                Ok(())
            }
            (TypeNode::Alias(_, bound), _) => self.unify(bound, rb),
            (_, TypeNode::Alias(_, bound)) => self.unify(ra, bound),
            (TypeNode::Int, TypeNode::Int)
            | (TypeNode::Real, TypeNode::Real)
            | (TypeNode::Char, TypeNode::Char)
            | (TypeNode::String, TypeNode::String)
            | (TypeNode::Bool, TypeNode::Bool)
            | (TypeNode::Unit, TypeNode::Unit) => {
                self.nodes[ra.0] = TypeNode::Link(rb);
                Ok(())
            }
            (TypeNode::List(ea), TypeNode::List(eb)) => {
                self.unify(ea, eb)?;
                self.nodes[ra.0] = TypeNode::Link(rb);
                Ok(())
            }
            (TypeNode::Tuple(xs), TypeNode::Tuple(ys)) if xs.len() == ys.len() => {
                for (x, y) in xs.into_iter().zip(ys) {
                    self.unify(x, y)?;
                }
                self.nodes[ra.0] = TypeNode::Link(rb);
                Ok(())
            }
            (TypeNode::Record(xs), TypeNode::Record(ys)) if xs.len() == ys.len() => {
                for (name, xid) in &xs {
                    match ys.iter().find(|(n, _)| n == name) {
                        Some((_, yid)) => self.unify(*xid, *yid)?,
                        None => return self.mismatch(ra, rb),
                    }
                }
                self.nodes[ra.0] = TypeNode::Link(rb);
                Ok(())
            }
            (TypeNode::Fun(pa, reta), TypeNode::Fun(pb, retb)) => {
                self.unify(pa, pb)?;
                self.unify(reta, retb)?;
                self.nodes[ra.0] = TypeNode::Link(rb);
                Ok(())
            }
            // Fun overloaded x Fun overloaded is a FAIL and falls through to
            // the catch-all below; Fun x FunOverloaded tries each
            // alternative in turn.
            (TypeNode::FunOverloaded(alts), TypeNode::Fun(pb, retb)) => {
                self.unify_overloaded(ra, alts, pb, retb, rb)
            }
            (TypeNode::Fun(pa, reta), TypeNode::FunOverloaded(alts)) => {
                self.unify_overloaded(rb, alts, pa, reta, ra)
            }
            _ => self.mismatch(ra, rb),
        }
    }

    /// Try each `(param, ret)` alternative of an overloaded function type
    /// against a concrete `Fun(other_param, other_ret)`, in order, keeping
    /// the first one whose parameter and return both unify. A failed
    /// attempt is rolled back (a partial param-only unification must not
    /// leak into the next alternative's attempt).
    fn unify_overloaded(
        &mut self,
        overloaded: TypeId,
        alts: Vec<(TypeId, TypeId)>,
        other_param: TypeId,
        other_ret: TypeId,
        other: TypeId,
    ) -> Result<(), Diagnostic> {
        for (p, r) in &alts {
            let snapshot = self.nodes.clone();
            if self.unify(*p, other_param).is_ok() && self.unify(*r, other_ret).is_ok() {
                self.nodes[overloaded.0] = TypeNode::Link(other);
                return Ok(());
            }
            self.nodes = snapshot;
        }
        self.mismatch(overloaded, other)
    }

    fn mismatch(&mut self, a: TypeId, b: TypeId) -> Result<(), Diagnostic> {
        let lhs = self.materialize(a).to_string();
        let rhs = self.materialize(b).to_string();
        Err(Diagnostic::Type { lhs, rhs })
    }

    /// Forget any fresh-variable names assigned by prior materializations.
    /// Called once per top-level item so unresolved variables in that
    /// item's principal type start again from `'a`.
    pub fn reset_var_names(&mut self) {
        self.var_names.clear();
    }

    /// Resolve a node to its canonical, printable [`Type`], naming any
    /// remaining unification variables with stable letters.
    pub fn materialize(&mut self, id: TypeId) -> Type {
        let root = self.find(id);
        match self.nodes[root.0].clone() {
            TypeNode::Unbound => {
                if let Some(name) = self.var_names.get(&root) {
                    return Type::Var(name.clone());
                }
                let name = format!("'{}", self.fresh.next_name());
                self.var_names.insert(root, name.clone());
                Type::Var(name)
            }
            TypeNode::Link(_) => unreachable!("find() always returns a non-Link root"),
            TypeNode::Int => Type::Int,
            TypeNode::Real => Type::Real,
            TypeNode::Char => Type::Char,
            TypeNode::String => Type::String,
            TypeNode::Bool => Type::Bool,
            TypeNode::Unit => Type::Unit,
            TypeNode::List(e) => Type::list(self.materialize(e)),
            TypeNode::Tuple(es) => Type::Tuple(es.iter().map(|e| self.materialize(*e)).collect()),
            TypeNode::Record(rows) => {
                Type::Record(rows.iter().map(|(n, t)| (n.clone(), self.materialize(*t))).collect())
            }
            TypeNode::Fun(p, r) => Type::fun(self.materialize(p), self.materialize(r)),
            TypeNode::FunOverloaded(alts) => Type::FunOverloaded(
                alts.iter().map(|(p, r)| (self.materialize(*p), self.materialize(*r))).collect(),
            ),
            TypeNode::Alias(name, bound) => Type::Alias(name, Box::new(self.materialize(bound))),
        }
    }

    /// Allocate a fresh set of arena nodes for a canonical [`Type`],
    /// instantiating every distinct `Var` name it contains with its own
    /// fresh unification variable. Two lookups of the same stored value
    /// (e.g. the built-in `@`) therefore get independently-resolvable type
    /// variables rather than sharing one, so principal types stay correct
    /// across uses within a session.
    pub fn import(&mut self, ty: &Type) -> TypeId {
        let mut renames = HashMap::new();
        self.import_with(ty, &mut renames)
    }

    fn import_with(&mut self, ty: &Type, renames: &mut HashMap<String, TypeId>) -> TypeId {
        match ty {
            Type::Int => self.int(),
            Type::Real => self.real(),
            Type::Char => self.char_(),
            Type::String => self.string(),
            Type::Bool => self.bool_(),
            Type::Unit => self.unit(),
            Type::List(e) => {
                let e = self.import_with(e, renames);
                self.list(e)
            }
            Type::Tuple(es) => {
                let es = es.iter().map(|e| self.import_with(e, renames)).collect();
                self.tuple(es)
            }
            Type::Record(rows) => {
                let rows =
                    rows.iter().map(|(n, t)| (n.clone(), self.import_with(t, renames))).collect();
                self.record(rows)
            }
            Type::Fun(p, r) => {
                let p = self.import_with(p, renames);
                let r = self.import_with(r, renames);
                self.func(p, r)
            }
            Type::FunOverloaded(alts) => {
                let alts = alts
                    .iter()
                    .map(|(p, r)| (self.import_with(p, renames), self.import_with(r, renames)))
                    .collect();
                self.overloaded(alts)
            }
            Type::Alias(name, bound) => {
                let bound = self.import_with(bound, renames);
                self.alias(name.clone(), bound)
            }
            Type::Var(name) => *renames.entry(name.clone()).or_insert_with(|| self.fresh_var()),
        }
    }
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_var_naming_carries_after_z() {
        let mut fresh = FreshVars::new();
        let names: Vec<String> = (0..28).map(|_| fresh.next_name()).collect();
        assert_eq!(names[0], "a");
        assert_eq!(names[25], "z");
        assert_eq!(names[26], "aa");
        assert_eq!(names[27], "bb");
    }

    #[test]
    fn unify_links_unbound_to_concrete() {
        let mut arena = TypeArena::new();
        let v = arena.fresh_var();
        let i = arena.int();
        arena.unify(v, i).unwrap();
        assert_eq!(arena.materialize(v), Type::Int);
    }

    #[test]
    fn unify_mismatch_reports_both_sides() {
        let mut arena = TypeArena::new();
        let i = arena.int();
        let s = arena.string();
        let err = arena.unify(i, s).unwrap_err();
        match err {
            Diagnostic::Type { lhs, rhs } => {
                assert_eq!(lhs, "int");
                assert_eq!(rhs, "string");
            }
            _ => panic!("expected Type diagnostic"),
        }
    }

    #[test]
    fn overloaded_fun_unifies_against_matching_alternative() {
        let mut arena = TypeArena::new();
        let int_alt = (arena.int(), arena.int());
        let real_alt = (arena.real(), arena.real());
        let overloaded = arena.overloaded(vec![int_alt, real_alt]);

        let arg = arena.fresh_var();
        let ret = arena.fresh_var();
        let expected_fun = arena.func(arg, ret);
        arena.unify(overloaded, expected_fun).unwrap();

        assert_eq!(arena.materialize(arg), Type::Int);
        assert_eq!(arena.materialize(ret), Type::Int);
    }

    #[test]
    fn overloaded_fun_rejects_when_no_alternative_matches() {
        let mut arena = TypeArena::new();
        let int_alt = (arena.int(), arena.int());
        let real_alt = (arena.real(), arena.real());
        let overloaded = arena.overloaded(vec![int_alt, real_alt]);

        let arg = arena.string();
        let ret = arena.fresh_var();
        let expected_fun = arena.func(arg, ret);
        assert!(arena.unify(overloaded, expected_fun).is_err());
    }

    #[test]
    fn overloaded_fun_overloaded_always_fails() {
        let mut arena = TypeArena::new();
        let a = arena.overloaded(vec![(arena.int(), arena.int())]);
        let b = arena.overloaded(vec![(arena.int(), arena.int())]);
        assert!(arena.unify(a, b).is_err());
    }

    #[test]
    fn import_instantiates_fresh_vars_per_call() {
        let mut arena = TypeArena::new();
        let scheme = Type::fun(Type::Var("'a".to_string()), Type::Var("'a".to_string()));
        let first = arena.import(&scheme);
        let second = arena.import(&scheme);
        let int_ty = arena.int();
        if let TypeNode::Fun(p, _) = arena.nodes[first.0].clone() {
            arena.unify(p, int_ty).unwrap();
        } else {
            panic!("expected Fun node");
        }
        assert!(arena.is_unbound(match arena.nodes[second.0].clone() {
            TypeNode::Fun(p, _) => p,
            _ => panic!("expected Fun node"),
        }));
    }
}
