//! Hindley-Milner type checking over the algebraic AST (C6)
//!
//! Elaboration walks an [`Item`] once, allocating a node in the session's
//! [`TypeArena`] for every expression and pattern and recording it in a
//! side table keyed by [`NodeId`] rather than mutating the tree. Pattern
//! variables and `val`/`fun` bindings are not generalized into type
//! schemes: a binding keeps whichever unification variables it elaborated
//! with, so reusing it at an incompatible type later in the session is a
//! type error rather than being instantiated fresh. This also governs how
//! the built-in polymorphic values (`@`, `::`, `=`, ...) behave, since they
//! are ordinary entries in the same value environment.
//!
//! `+ - *` and unary `~` are not looked up generically: their arithmetic
//! overload (int, defaulting when the operand is still unconstrained, or
//! real) is resolved directly against the operand types, matching the
//! exact unify order in the original checker (operands unified with each
//! other before the result is unified with `int`).

use std::collections::HashMap;

use crate::ast::{
    Const, Dec, Exp, ExpKind, Fixity, FunBind, FunMatch, Id, Item, Label, Match, NodeId, Pat,
    PatKind, Typ, TypBind, ValBind,
};
use crate::diagnostic::{Diagnostic, NameKind};
use crate::symtab::{OperatorInfo, SymbolTable, Value, ValueHandle};
use crate::types::Type;
use crate::unify::{TypeArena, TypeId};

/// The result of elaborating one top-level item: its principal type and a
/// per-node side table, both already materialized to stable names.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedItem {
    pub ty: Type,
    pub node_types: HashMap<NodeId, Type>,
    /// Names the item bound in the value environment, in declaration order,
    /// with their materialized principal type — `it` for a bare expression,
    /// or every `val`/`fun` pattern variable for a declaration. Mirrors what
    /// `getPatternType`/the value environment would report for the item.
    pub bindings: Vec<(String, Type)>,
}

pub struct TypeChecker {
    arena: TypeArena,
    node_types: HashMap<NodeId, TypeId>,
}

impl TypeChecker {
    pub fn new() -> Self {
        TypeChecker { arena: TypeArena::new(), node_types: HashMap::new() }
    }

    /// The arena is shared with [`SymbolTable::init_builtin_values`], which
    /// needs to allocate nodes in it before the first item is checked.
    pub fn arena_mut(&mut self) -> &mut TypeArena {
        &mut self.arena
    }

    pub fn check_item(&mut self, item: &Item, symtab: &mut SymbolTable) -> Result<CheckedItem, Diagnostic> {
        let (top_ty, names) = match item {
            Item::Dec(dec) => {
                self.check_dec(dec, symtab)?;
                (self.arena.unit(), bound_names(dec))
            }
            Item::Exp(exp) => {
                let ty = self.check_exp(exp, symtab)?;
                symtab.insert_value("it", Value { ty, handle: ValueHandle::UserDefined });
                (ty, vec!["it".to_string()])
            }
        };
        Ok(self.finish_item(top_ty, names, symtab))
    }

    fn finish_item(&mut self, top_ty: TypeId, names: Vec<String>, symtab: &SymbolTable) -> CheckedItem {
        self.arena.reset_var_names();
        let ty = self.arena.materialize(top_ty);
        let ids: Vec<(NodeId, TypeId)> = self.node_types.iter().map(|(k, v)| (*k, *v)).collect();
        let mut node_types = HashMap::with_capacity(ids.len());
        for (node_id, tid) in ids {
            node_types.insert(node_id, self.arena.materialize(tid));
        }
        self.node_types.clear();
        let mut bindings = Vec::with_capacity(names.len());
        for name in names {
            let tid = symtab.get_pattern_type(&name).or_else(|| symtab.get_value(&name).map(|v| v.ty));
            if let Some(tid) = tid {
                bindings.push((name, self.arena.materialize(tid)));
            }
        }
        CheckedItem { ty, node_types, bindings }
    }

    // -- expressions --------------------------------------------------

    fn check_exp(&mut self, exp: &Exp, symtab: &mut SymbolTable) -> Result<TypeId, Diagnostic> {
        let tid = match &exp.kind {
            ExpKind::Const(c) => self.check_const(c),
            ExpKind::VarRef(lid) => self.lookup_value(lid.name(), symtab, NameKind::Variable)?,
            ExpKind::App(f, a) => self.check_app(f, a, symtab)?,
            ExpKind::InfixApp(lhs, id, rhs) => self.check_infix(lhs, id, rhs, symtab)?,
            ExpKind::Tuple(es) => {
                let mut ids = Vec::with_capacity(es.len());
                for e in es {
                    ids.push(self.check_exp(e, symtab)?);
                }
                self.arena.tuple(ids)
            }
            ExpKind::List(es) => {
                let elem = self.arena.fresh_var();
                for e in es {
                    let t = self.check_exp(e, symtab)?;
                    self.arena.unify(elem, t)?;
                }
                self.arena.list(elem)
            }
            ExpKind::If(c, t, e) => {
                let ct = self.check_exp(c, symtab)?;
                let bool_ty = self.arena.bool_();
                self.arena.unify(ct, bool_ty)?;
                let tt = self.check_exp(t, symtab)?;
                let et = self.check_exp(e, symtab)?;
                self.arena.unify(tt, et)?;
                tt
            }
            ExpKind::While(c, body) => {
                let ct = self.check_exp(c, symtab)?;
                let bool_ty = self.arena.bool_();
                self.arena.unify(ct, bool_ty)?;
                let bt = self.check_exp(body, symtab)?;
                let unit_ty = self.arena.unit();
                self.arena.unify(bt, unit_ty)?;
                unit_ty
            }
            ExpKind::Conj(l, r) | ExpKind::Disj(l, r) => {
                let lt = self.check_exp(l, symtab)?;
                let bool_ty = self.arena.bool_();
                self.arena.unify(lt, bool_ty)?;
                let rt = self.check_exp(r, symtab)?;
                self.arena.unify(rt, bool_ty)?;
                bool_ty
            }
            ExpKind::Ann(e, typ) => {
                let et = self.check_exp(e, symtab)?;
                let at = self.check_surface_typ(typ, symtab)?;
                self.arena.unify(et, at)?;
                et
            }
            ExpKind::Fn(m) => self.check_match(m, symtab)?,
            ExpKind::Let(dec, exps) => {
                symtab.push_overlay();
                let result = self.check_let_body(dec, exps, symtab);
                symtab.pop_overlay();
                result?
            }
            ExpKind::Sel(label) => self.check_sel(label),
        };
        self.node_types.insert(exp.id, tid);
        Ok(tid)
    }

    fn check_let_body(
        &mut self,
        dec: &Dec,
        exps: &[Exp],
        symtab: &mut SymbolTable,
    ) -> Result<TypeId, Diagnostic> {
        self.check_dec(dec, symtab)?;
        let mut last = self.arena.unit();
        for e in exps {
            last = self.check_exp(e, symtab)?;
        }
        Ok(last)
    }

    fn check_app(&mut self, f: &Exp, a: &Exp, symtab: &mut SymbolTable) -> Result<TypeId, Diagnostic> {
        if let ExpKind::VarRef(lid) = &f.kind {
            if lid.name() == "~" {
                if let Some(v) = symtab.get_value("~") {
                    self.node_types.insert(f.id, v.ty);
                }
                let at = self.check_exp(a, symtab)?;
                return self.default_to_int_or_require_numeric(at);
            }
            // The applied-to-something position of an `App` is a named
            // function call, not a plain variable reference, so an unbound
            // name here is "invalid Function name" rather than "Unknown
            // variable name".
            let ft = self.lookup_value(lid.name(), symtab, NameKind::Function)?;
            self.node_types.insert(f.id, ft);
            let at = self.check_exp(a, symtab)?;
            let rt = self.arena.fresh_var();
            let expected_fun = self.arena.func(at, rt);
            self.arena.unify(ft, expected_fun)?;
            return Ok(rt);
        }
        let ft = self.check_exp(f, symtab)?;
        let at = self.check_exp(a, symtab)?;
        let rt = self.arena.fresh_var();
        let expected_fun = self.arena.func(at, rt);
        self.arena.unify(ft, expected_fun)?;
        Ok(rt)
    }

    fn check_infix(
        &mut self,
        lhs: &Exp,
        id: &Id,
        rhs: &Exp,
        symtab: &mut SymbolTable,
    ) -> Result<TypeId, Diagnostic> {
        let lt = self.check_exp(lhs, symtab)?;
        let rt = self.check_exp(rhs, symtab)?;
        let name = id.name();
        if matches!(name, "+" | "-" | "*") {
            self.arena.unify(lt, rt)?;
            return self.default_to_int_or_require_numeric(lt);
        }
        let value = symtab
            .get_value(name)
            .copied()
            .ok_or_else(|| Diagnostic::Name { kind: NameKind::Variable, name: name.to_string() })?;
        let operand = self.arena.tuple(vec![lt, rt]);
        let ret = self.arena.fresh_var();
        let expected_fun = self.arena.func(operand, ret);
        self.arena.unify(value.ty, expected_fun)?;
        Ok(ret)
    }

    /// Mirrors the original's exact overload order for `+ - * ~`: unify the
    /// operand(s) together first, then default the shared result to `int`
    /// only if it is still unconstrained, else require it already be `int`
    /// or `real`.
    fn default_to_int_or_require_numeric(&mut self, id: TypeId) -> Result<TypeId, Diagnostic> {
        if self.arena.is_unbound(id) {
            let int_ty = self.arena.int();
            self.arena.unify(id, int_ty)?;
            return Ok(id);
        }
        if self.arena.is_numeric(id) {
            return Ok(id);
        }
        let int_ty = self.arena.int();
        self.arena.unify(id, int_ty).map(|_| id)
    }

    fn check_sel(&mut self, _label: &Label) -> TypeId {
        // Record projection is a grammar skeleton only (no row typing): the
        // selector's argument and result are unconstrained.
        let arg = self.arena.fresh_var();
        let res = self.arena.fresh_var();
        self.arena.func(arg, res)
    }

    fn check_match(&mut self, m: &Match, symtab: &mut SymbolTable) -> Result<TypeId, Diagnostic> {
        symtab.push_overlay();
        let result = self.check_clause_chain(m, symtab);
        symtab.pop_overlay();
        result
    }

    fn check_clause_chain(&mut self, m: &Match, symtab: &mut SymbolTable) -> Result<TypeId, Diagnostic> {
        let pt = self.check_pat(&m.pat, symtab)?;
        let et = self.check_exp(&m.exp, symtab)?;
        let clause_ty = self.arena.func(pt, et);
        if let Some(next) = &m.or {
            let next_ty = self.check_clause_chain(next, symtab)?;
            self.arena.unify(clause_ty, next_ty)?;
        }
        Ok(clause_ty)
    }

    fn check_const(&mut self, c: &Const) -> TypeId {
        match c {
            Const::Int(_) => self.arena.int(),
            Const::Real(_) => self.arena.real(),
            Const::Char(_) => self.arena.char_(),
            Const::String(_) => self.arena.string(),
            Const::Bool(_) => self.arena.bool_(),
        }
    }

    fn lookup_value(&mut self, name: &str, symtab: &SymbolTable, kind: NameKind) -> Result<TypeId, Diagnostic> {
        if let Some(tid) = symtab.get_pattern_type(name) {
            return Ok(tid);
        }
        if let Some(value) = symtab.get_value(name) {
            return Ok(value.ty);
        }
        Err(Diagnostic::Name { kind, name: name.to_string() })
    }

    // -- patterns -------------------------------------------------------

    fn check_pat(&mut self, pat: &Pat, symtab: &mut SymbolTable) -> Result<TypeId, Diagnostic> {
        let tid = match &pat.kind {
            PatKind::Const(c) => self.check_const(c),
            PatKind::Wild => self.arena.fresh_var(),
            PatKind::Var(id) => {
                let v = self.arena.fresh_var();
                symtab.insert_pattern_type(id.name(), v);
                v
            }
            PatKind::Ctor(lid, None) => {
                // No datatypes are supported, so a nullary "constructor"
                // pattern is indistinguishable from a fresh variable
                // binding and is treated as one.
                let v = self.arena.fresh_var();
                symtab.insert_pattern_type(lid.name(), v);
                v
            }
            PatKind::Ctor(lid, Some(_)) => {
                return Err(Diagnostic::Name { kind: NameKind::Id, name: lid.name().to_string() });
            }
            PatKind::InfixCtor(lhs, id, rhs) => {
                if id.name() != "::" {
                    return Err(Diagnostic::Name { kind: NameKind::Id, name: id.name().to_string() });
                }
                let lt = self.check_pat(lhs, symtab)?;
                let rt = self.check_pat(rhs, symtab)?;
                let list_ty = self.arena.list(lt);
                self.arena.unify(list_ty, rt)?;
                list_ty
            }
            PatKind::Tuple(ps) => {
                let mut ids = Vec::with_capacity(ps.len());
                for p in ps {
                    ids.push(self.check_pat(p, symtab)?);
                }
                self.arena.tuple(ids)
            }
            PatKind::List(ps) => {
                let elem = self.arena.fresh_var();
                for p in ps {
                    let t = self.check_pat(p, symtab)?;
                    self.arena.unify(elem, t)?;
                }
                self.arena.list(elem)
            }
            PatKind::Ann(p, typ) => {
                let pt = self.check_pat(p, symtab)?;
                let at = self.check_surface_typ(typ, symtab)?;
                self.arena.unify(pt, at)?;
                pt
            }
        };
        self.node_types.insert(pat.id, tid);
        Ok(tid)
    }

    // -- surface-syntax type annotations --------------------------------

    fn check_surface_typ(&mut self, typ: &Typ, symtab: &SymbolTable) -> Result<TypeId, Diagnostic> {
        let mut renames = HashMap::new();
        self.check_surface_typ_with(typ, symtab, &mut renames)
    }

    fn check_surface_typ_with(
        &mut self,
        typ: &Typ,
        symtab: &SymbolTable,
        renames: &mut HashMap<String, TypeId>,
    ) -> Result<TypeId, Diagnostic> {
        Ok(match typ {
            Typ::Var(name) => {
                *renames.entry(name.clone()).or_insert_with(|| self.arena.fresh_var())
            }
            Typ::Ctor(lid) => {
                let name = lid.name();
                match symtab.get_type(name) {
                    Some(ty) => self.arena.import(ty),
                    None => return Err(Diagnostic::Name { kind: NameKind::Id, name: name.to_string() }),
                }
            }
            Typ::Fun(p, r) => {
                let p = self.check_surface_typ_with(p, symtab, renames)?;
                let r = self.check_surface_typ_with(r, symtab, renames)?;
                self.arena.func(p, r)
            }
            Typ::Tuple(ts) => {
                let mut ids = Vec::with_capacity(ts.len());
                for t in ts {
                    ids.push(self.check_surface_typ_with(t, symtab, renames)?);
                }
                self.arena.tuple(ids)
            }
            Typ::Record(rows) => {
                let mut out = Vec::with_capacity(rows.len());
                for (label, t) in rows {
                    let tid = self.check_surface_typ_with(t, symtab, renames)?;
                    out.push((label.name().to_string(), tid));
                }
                self.arena.record(out)
            }
            Typ::Paren(t) => self.check_surface_typ_with(t, symtab, renames)?,
            Typ::App(arg, lid) => {
                let name = lid.name();
                if name == "list" {
                    let at = self.check_surface_typ_with(arg, symtab, renames)?;
                    self.arena.list(at)
                } else {
                    // No parametrized type constructors besides the built-in
                    // `list` exist without a module language.
                    return Err(Diagnostic::Name { kind: NameKind::Id, name: name.to_string() });
                }
            }
        })
    }

    // -- declarations ----------------------------------------------------

    fn check_dec(&mut self, dec: &Dec, symtab: &mut SymbolTable) -> Result<(), Diagnostic> {
        match dec {
            Dec::Val(vb) => self.check_valbind(vb, symtab),
            Dec::Fun(fb) => self.check_funbind(fb, symtab),
            Dec::Type(tb) => self.check_typbind(tb, symtab),
            Dec::Seq(decs) => {
                for d in decs {
                    self.check_dec(d, symtab)?;
                }
                Ok(())
            }
            // `local d1 in d2 end`: d1's bindings are visible while checking
            // d2 but (unlike full module scoping) are not hidden afterward;
            // this interpreter has no module language to enforce that.
            Dec::Local(d1, d2) => {
                self.check_dec(d1, symtab)?;
                self.check_dec(d2, symtab)
            }
            Dec::Infix(prec, ids) => {
                for id in ids {
                    symtab.set_operator(
                        id.name(),
                        OperatorInfo { fixity: Fixity::Infix, prec: prec.unwrap_or(0) },
                    );
                }
                Ok(())
            }
            Dec::Infixr(prec, ids) => {
                for id in ids {
                    symtab.set_operator(
                        id.name(),
                        OperatorInfo { fixity: Fixity::Infixr, prec: prec.unwrap_or(0) },
                    );
                }
                Ok(())
            }
            Dec::Nonfix(ids) => {
                for id in ids {
                    symtab.set_operator(id.name(), OperatorInfo { fixity: Fixity::Nonfix, prec: 0 });
                }
                Ok(())
            }
        }
    }

    /// `and`-chained `val` bindings are checked in sequence rather than
    /// simultaneously: a later binding may see an earlier one's name. Full
    /// simultaneity is not required for this interpreter's single-binding
    /// `val` use cases.
    fn check_valbind(&mut self, vb: &ValBind, symtab: &mut SymbolTable) -> Result<(), Diagnostic> {
        let et = self.check_exp(&vb.exp, symtab)?;
        let pt = self.check_pat(&vb.pat, symtab)?;
        self.arena.unify(pt, et)?;
        if let Some(next) = &vb.and {
            self.check_valbind(next, symtab)?;
        }
        Ok(())
    }

    /// A `fun` binding's name is not in scope while its own clauses are
    /// checked, so self-recursive calls are rejected rather than typed.
    /// `and`-siblings are unified with each other, same as `|`-alternatives
    /// within one binding (`unify_with_next_clause`).
    fn check_funbind(&mut self, fb: &FunBind, symtab: &mut SymbolTable) -> Result<(), Diagnostic> {
        let (name, ty, _) = self.check_fun_match(&fb.matches, symtab)?;
        symtab.insert_value(&name, Value { ty, handle: ValueHandle::UserDefined });
        if let Some(next) = &fb.and {
            let next_ty = self.check_funbind_and(next, symtab)?;
            self.arena.unify(ty, next_ty)?;
        }
        Ok(())
    }

    /// Checks one `and`-sibling (and, recursively, the rest of the chain),
    /// returning its type so the caller can unify it against the previous
    /// sibling. `and`-siblings are different functions and may have
    /// different arities, unlike `|`-alternatives of the same function.
    fn check_funbind_and(&mut self, fb: &FunBind, symtab: &mut SymbolTable) -> Result<TypeId, Diagnostic> {
        let (name, ty, _) = self.check_fun_match(&fb.matches, symtab)?;
        symtab.insert_value(&name, Value { ty, handle: ValueHandle::UserDefined });
        if let Some(next) = &fb.and {
            let next_ty = self.check_funbind_and(next, symtab)?;
            self.arena.unify(ty, next_ty)?;
        }
        Ok(ty)
    }

    /// Returns the bound name, its (possibly `|`-unified) type, and this
    /// match's own clause arity (number of curried parameters), the latter
    /// used by `unify_with_next_clause` to reject `|`-alternatives whose
    /// parameter count disagrees before attempting the generic, harder-to-
    /// read structural unification of two differently-curried function
    /// types.
    fn check_fun_match(&mut self, fm: &FunMatch, symtab: &mut SymbolTable) -> Result<(String, TypeId, usize), Diagnostic> {
        match fm {
            FunMatch::Nonfix { id, params, typ, body, or } => {
                symtab.push_overlay();
                let result = self.check_nonfix_clause(params, typ, body, symtab);
                symtab.pop_overlay();
                let clause_ty = result?;
                let arity = params.len();
                let final_ty = self.unify_with_next_clause(clause_ty, arity, or, symtab)?;
                Ok((id.name().to_string(), final_ty, arity))
            }
            FunMatch::Infix { lhs, id, rhs, typ, body, or } => {
                symtab.push_overlay();
                let result = self.check_infix_clause(lhs, rhs, typ, body, symtab);
                symtab.pop_overlay();
                let clause_ty = result?;
                let arity = 2;
                let final_ty = self.unify_with_next_clause(clause_ty, arity, or, symtab)?;
                Ok((id.name().to_string(), final_ty, arity))
            }
        }
    }

    fn unify_with_next_clause(
        &mut self,
        clause_ty: TypeId,
        arity: usize,
        or: &Option<Box<FunMatch>>,
        symtab: &mut SymbolTable,
    ) -> Result<TypeId, Diagnostic> {
        if let Some(next) = or {
            let (_, next_ty, next_arity) = self.check_fun_match(next, symtab)?;
            if next_arity != arity {
                return Err(Diagnostic::Arity { expected: arity, found: next_arity });
            }
            self.arena.unify(clause_ty, next_ty)?;
        }
        Ok(clause_ty)
    }

    fn check_nonfix_clause(
        &mut self,
        params: &[Pat],
        typ: &Option<Typ>,
        body: &Exp,
        symtab: &mut SymbolTable,
    ) -> Result<TypeId, Diagnostic> {
        let mut param_ids = Vec::with_capacity(params.len());
        for p in params {
            param_ids.push(self.check_pat(p, symtab)?);
        }
        let body_ty = self.check_exp(body, symtab)?;
        if let Some(t) = typ {
            let ann = self.check_surface_typ(t, symtab)?;
            self.arena.unify(body_ty, ann)?;
        }
        let mut result = body_ty;
        for p in param_ids.into_iter().rev() {
            result = self.arena.func(p, result);
        }
        Ok(result)
    }

    fn check_infix_clause(
        &mut self,
        lhs: &Pat,
        rhs: &Pat,
        typ: &Option<Typ>,
        body: &Exp,
        symtab: &mut SymbolTable,
    ) -> Result<TypeId, Diagnostic> {
        let lt = self.check_pat(lhs, symtab)?;
        let rt = self.check_pat(rhs, symtab)?;
        let body_ty = self.check_exp(body, symtab)?;
        if let Some(t) = typ {
            let ann = self.check_surface_typ(t, symtab)?;
            self.arena.unify(body_ty, ann)?;
        }
        let operand = self.arena.tuple(vec![lt, rt]);
        Ok(self.arena.func(operand, body_ty))
    }

    fn check_typbind(&mut self, tb: &TypBind, symtab: &mut SymbolTable) -> Result<(), Diagnostic> {
        let tid = self.check_surface_typ(&tb.typ, symtab)?;
        let resolved = self.arena.materialize(tid);
        symtab.insert_type(tb.id.name(), resolved);
        if let Some(next) = &tb.and {
            self.check_typbind(next, symtab)?;
        }
        Ok(())
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Names a declaration binds in the value environment, in source order.
/// `type`/fixity declarations bind no values and contribute nothing.
fn bound_names(dec: &Dec) -> Vec<String> {
    let mut names = Vec::new();
    collect_dec_names(dec, &mut names);
    names
}

fn collect_dec_names(dec: &Dec, names: &mut Vec<String>) {
    match dec {
        Dec::Val(vb) => {
            let mut vb = vb;
            loop {
                collect_pat_names(&vb.pat, names);
                match &vb.and {
                    Some(next) => vb = next,
                    None => break,
                }
            }
        }
        Dec::Fun(fb) => {
            let mut fb = fb;
            loop {
                names.push(fun_match_name(&fb.matches).to_string());
                match &fb.and {
                    Some(next) => fb = next,
                    None => break,
                }
            }
        }
        Dec::Type(_) | Dec::Infix(..) | Dec::Infixr(..) | Dec::Nonfix(_) => {}
        Dec::Seq(decs) => {
            for d in decs {
                collect_dec_names(d, names);
            }
        }
        Dec::Local(_, d2) => collect_dec_names(d2, names),
    }
}

fn fun_match_name(fm: &FunMatch) -> &str {
    match fm {
        FunMatch::Nonfix { id, .. } => id.name(),
        FunMatch::Infix { id, .. } => id.name(),
    }
}

fn collect_pat_names(pat: &Pat, names: &mut Vec<String>) {
    match &pat.kind {
        PatKind::Var(id) => names.push(id.name().to_string()),
        PatKind::Ctor(lid, None) => names.push(lid.name().to_string()),
        PatKind::Ctor(_, Some(p)) => collect_pat_names(p, names),
        PatKind::InfixCtor(lhs, _, rhs) => {
            collect_pat_names(lhs, names);
            collect_pat_names(rhs, names);
        }
        PatKind::Tuple(ps) | PatKind::List(ps) => {
            for p in ps {
                collect_pat_names(p, names);
            }
        }
        PatKind::Ann(p, _) => collect_pat_names(p, names),
        PatKind::Const(_) | PatKind::Wild => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Const as C, ExpKind as EK, Id as AstId, LongId, NodeId as NId, PatKind as PK};

    fn fresh_symtab(checker: &mut TypeChecker) -> SymbolTable {
        let mut symtab = SymbolTable::new();
        symtab.init_builtin_values(checker.arena_mut());
        symtab
    }

    fn exp(id: usize, kind: ExpKind) -> Exp {
        Exp { id: NId(id), kind }
    }

    fn pat(id: usize, kind: PatKind) -> Pat {
        Pat { id: NId(id), kind }
    }

    fn var_exp(id: usize, name: &str) -> Exp {
        exp(id, EK::VarRef(LongId::single(AstId::Alpha(name.to_string()))))
    }

    #[test]
    fn arithmetic_defaults_to_int_for_unconstrained_operands() {
        let mut checker = TypeChecker::new();
        let mut symtab = fresh_symtab(&mut checker);
        let item = Item::Exp(exp(
            0,
            EK::InfixApp(
                Box::new(exp(1, EK::Const(C::Int(1)))),
                AstId::Sym("+".to_string()),
                Box::new(exp(2, EK::Const(C::Int(2)))),
            ),
        ));
        let checked = checker.check_item(&item, &mut symtab).unwrap();
        assert_eq!(checked.ty, Type::Int);
    }

    #[test]
    fn arithmetic_propagates_real() {
        let mut checker = TypeChecker::new();
        let mut symtab = fresh_symtab(&mut checker);
        let item = Item::Exp(exp(
            0,
            EK::InfixApp(
                Box::new(exp(1, EK::Const(C::Real(1.0)))),
                AstId::Sym("+".to_string()),
                Box::new(exp(2, EK::Const(C::Real(2.0)))),
            ),
        ));
        let checked = checker.check_item(&item, &mut symtab).unwrap();
        assert_eq!(checked.ty, Type::Real);
    }

    #[test]
    fn arithmetic_mismatch_is_a_type_error() {
        let mut checker = TypeChecker::new();
        let mut symtab = fresh_symtab(&mut checker);
        let item = Item::Exp(exp(
            0,
            EK::InfixApp(
                Box::new(exp(1, EK::Const(C::Int(1)))),
                AstId::Sym("+".to_string()),
                Box::new(exp(2, EK::Const(C::String("x".to_string())))),
            ),
        ));
        assert!(matches!(checker.check_item(&item, &mut symtab), Err(Diagnostic::Type { .. })));
    }

    #[test]
    fn identity_function_infers_fun_of_same_var() {
        let mut checker = TypeChecker::new();
        let mut symtab = fresh_symtab(&mut checker);
        let m = Match {
            pat: pat(1, PK::Var(AstId::Alpha("x".to_string()))),
            exp: var_exp(2, "x"),
            or: None,
        };
        let item = Item::Exp(exp(0, EK::Fn(m)));
        let checked = checker.check_item(&item, &mut symtab).unwrap();
        match checked.ty {
            Type::Fun(p, r) => assert_eq!(p, r),
            other => panic!("expected a function type, got {other:?}"),
        }
        assert_eq!(symtab.overlay_depth(), 0);
    }

    #[test]
    fn overlay_depth_returns_to_zero_on_error() {
        let mut checker = TypeChecker::new();
        let mut symtab = fresh_symtab(&mut checker);
        let m = Match {
            pat: pat(1, PK::Var(AstId::Alpha("x".to_string()))),
            exp: exp(
                2,
                EK::InfixApp(
                    Box::new(var_exp(3, "x")),
                    AstId::Sym("+".to_string()),
                    Box::new(exp(4, EK::Const(C::String("nope".to_string())))),
                ),
            ),
            or: None,
        };
        let item = Item::Exp(exp(0, EK::Fn(m)));
        assert!(checker.check_item(&item, &mut symtab).is_err());
        assert_eq!(symtab.overlay_depth(), 0);
    }

    #[test]
    fn unbound_variable_is_a_name_error() {
        let mut checker = TypeChecker::new();
        let mut symtab = fresh_symtab(&mut checker);
        let item = Item::Exp(var_exp(0, "nope"));
        assert!(matches!(
            checker.check_item(&item, &mut symtab),
            Err(Diagnostic::Name { kind: NameKind::Variable, .. })
        ));
    }

    #[test]
    fn unbound_application_head_is_a_function_name_error() {
        let mut checker = TypeChecker::new();
        let mut symtab = fresh_symtab(&mut checker);
        let item = Item::Exp(exp(
            0,
            EK::App(Box::new(var_exp(1, "nope")), Box::new(exp(2, EK::Const(C::Int(1))))),
        ));
        assert!(matches!(
            checker.check_item(&item, &mut symtab),
            Err(Diagnostic::Name { kind: NameKind::Function, .. })
        ));
    }

    #[test]
    fn let_binding_does_not_leak_into_global_scope() {
        let mut checker = TypeChecker::new();
        let mut symtab = fresh_symtab(&mut checker);
        let dec = Dec::Val(ValBind {
            pat: pat(1, PK::Var(AstId::Alpha("a".to_string()))),
            exp: exp(2, EK::Const(C::Int(1))),
            and: None,
        });
        let item = Item::Exp(exp(
            0,
            EK::Let(Box::new(dec), vec![var_exp(3, "a")]),
        ));
        let checked = checker.check_item(&item, &mut symtab).unwrap();
        assert_eq!(checked.ty, Type::Int);
        assert_eq!(symtab.overlay_depth(), 0);
        assert!(symtab.get_pattern_type("a").is_none());
    }

    #[test]
    fn bare_expression_reports_it_as_a_binding() {
        let mut checker = TypeChecker::new();
        let mut symtab = fresh_symtab(&mut checker);
        let item = Item::Exp(exp(0, EK::Const(C::Int(42))));
        let checked = checker.check_item(&item, &mut symtab).unwrap();
        assert_eq!(checked.bindings, vec![("it".to_string(), Type::Int)]);
    }

    #[test]
    fn val_binding_reports_its_pattern_name() {
        let mut checker = TypeChecker::new();
        let mut symtab = fresh_symtab(&mut checker);
        let item = Item::Dec(Dec::Val(ValBind {
            pat: pat(0, PK::Var(AstId::Alpha("i".to_string()))),
            exp: exp(1, EK::Const(C::Int(42))),
            and: None,
        }));
        let checked = checker.check_item(&item, &mut symtab).unwrap();
        assert_eq!(checked.bindings, vec![("i".to_string(), Type::Int)]);
    }

    #[test]
    fn tuple_pattern_val_binding_reports_every_name() {
        let mut checker = TypeChecker::new();
        let mut symtab = fresh_symtab(&mut checker);
        let item = Item::Dec(Dec::Val(ValBind {
            pat: pat(
                0,
                PK::Tuple(vec![
                    pat(1, PK::Var(AstId::Alpha("a".to_string()))),
                    pat(2, PK::Var(AstId::Alpha("b".to_string()))),
                ]),
            ),
            exp: exp(
                3,
                ExpKind::Tuple(vec![exp(4, EK::Const(C::Int(1))), exp(5, EK::Const(C::Bool(true)))]),
            ),
            and: None,
        }));
        let checked = checker.check_item(&item, &mut symtab).unwrap();
        assert_eq!(
            checked.bindings,
            vec![("a".to_string(), Type::Int), ("b".to_string(), Type::Bool)]
        );
    }

    #[test]
    fn fixity_declaration_binds_no_values() {
        let mut checker = TypeChecker::new();
        let mut symtab = fresh_symtab(&mut checker);
        let item = Item::Dec(Dec::Infix(Some(6), vec![AstId::Sym("++".to_string())]));
        let checked = checker.check_item(&item, &mut symtab).unwrap();
        assert!(checked.bindings.is_empty());
    }

    fn nonfix_match(name: &str, param_id: usize, param: &str, body: Exp) -> FunMatch {
        FunMatch::Nonfix {
            id: AstId::Alpha(name.to_string()),
            params: vec![pat(param_id, PK::Var(AstId::Alpha(param.to_string())))],
            typ: None,
            body,
            or: None,
        }
    }

    #[test]
    fn and_chained_fun_siblings_unify_with_each_other() {
        // fun f x = x + 1 and g y = y andalso true
        let mut checker = TypeChecker::new();
        let mut symtab = fresh_symtab(&mut checker);
        let f_body = exp(
            2,
            EK::InfixApp(
                Box::new(var_exp(3, "x")),
                AstId::Sym("+".to_string()),
                Box::new(exp(4, EK::Const(C::Int(1)))),
            ),
        );
        let g_body = exp(6, EK::Conj(Box::new(var_exp(7, "y")), Box::new(exp(8, EK::Const(C::Bool(true))))));
        let fb = FunBind {
            matches: nonfix_match("f", 1, "x", f_body),
            and: Some(Box::new(FunBind { matches: nonfix_match("g", 5, "y", g_body), and: None })),
        };
        let item = Item::Dec(Dec::Fun(fb));
        // int -> int (f) can never unify with bool -> bool (g); this only
        // fails if and-siblings are actually unified against each other.
        assert!(matches!(checker.check_item(&item, &mut symtab), Err(Diagnostic::Type { .. })));
    }

    #[test]
    fn or_chained_fun_clauses_of_different_arity_is_an_arity_error() {
        // fun f x = x | f x y = x
        let mut checker = TypeChecker::new();
        let mut symtab = fresh_symtab(&mut checker);
        let second = FunMatch::Nonfix {
            id: AstId::Alpha("f".to_string()),
            params: vec![
                pat(3, PK::Var(AstId::Alpha("x".to_string()))),
                pat(4, PK::Var(AstId::Alpha("y".to_string()))),
            ],
            typ: None,
            body: var_exp(5, "x"),
            or: None,
        };
        let first = FunMatch::Nonfix {
            id: AstId::Alpha("f".to_string()),
            params: vec![pat(1, PK::Var(AstId::Alpha("x".to_string())))],
            typ: None,
            body: var_exp(2, "x"),
            or: Some(Box::new(second)),
        };
        let item = Item::Dec(Dec::Fun(FunBind { matches: first, and: None }));
        assert!(matches!(
            checker.check_item(&item, &mut symtab),
            Err(Diagnostic::Arity { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn overloaded_value_escaping_into_a_var_still_resolves_on_application() {
        // val f = ~; f 3
        let mut checker = TypeChecker::new();
        let mut symtab = fresh_symtab(&mut checker);
        let dec = Dec::Val(ValBind {
            pat: pat(0, PK::Var(AstId::Alpha("f".to_string()))),
            exp: var_exp(1, "~"),
            and: None,
        });
        let item = Item::Exp(exp(
            2,
            EK::App(Box::new(var_exp(3, "f")), Box::new(exp(4, EK::Const(C::Int(3))))),
        ));
        let checked = checker.check_item(&Item::Dec(dec), &mut symtab).unwrap();
        assert_eq!(checked.bindings.len(), 1);
        assert_eq!(checked.bindings[0].0, "f");
        let checked = checker.check_item(&item, &mut symtab).unwrap();
        assert_eq!(checked.ty, Type::Int);
    }
}
