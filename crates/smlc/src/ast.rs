//! Abstract syntax tree (C5)
//!
//! Every syntactic category is a tagged sum, not a class hierarchy with
//! downcasts: the parser builds these directly and the type checker matches
//! on them directly. Each expression, pattern, and type node carries a
//! [`NodeId`] so the type checker can record an inferred [`crate::types::Type`]
//! per node in a side table instead of mutating the tree in place.

use std::cell::Cell;

/// Stable identity for an AST node, assigned by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Hands out node ids in order; reset at the start of each top-level item.
#[derive(Default)]
pub struct NodeIdGen(Cell<usize>);

impl NodeIdGen {
    pub fn new() -> Self {
        NodeIdGen(Cell::new(0))
    }

    pub fn next(&self) -> NodeId {
        let id = self.0.get();
        self.0.set(id + 1);
        NodeId(id)
    }
}

/// A literal constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    Int(i64),
    Real(f64),
    Char(char),
    String(String),
    Bool(bool),
}

/// Either an alphanumeric identifier (`[A-Za-z'][A-Za-z0-9_']*`) or a
/// symbolic one (a run of operator characters). Type variables are
/// alphanumeric identifiers beginning with `'`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Id {
    Alpha(String),
    Sym(String),
}

impl Id {
    pub fn name(&self) -> &str {
        match self {
            Id::Alpha(s) | Id::Sym(s) => s,
        }
    }
}

/// A (possibly qualified) identifier. The module language is out of scope,
/// so every `LongId` produced by the parser has exactly one component, but
/// the shape is kept to match the grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct LongId(pub Vec<Id>);

impl LongId {
    pub fn single(id: Id) -> Self {
        LongId(vec![id])
    }

    pub fn name(&self) -> &str {
        self.0.last().expect("LongId always has one component").name()
    }
}

/// A record label: either a numeric tuple position or a named field.
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    Num(u32),
    Id(Id),
}

/// Surface-syntax type, as written by the programmer (distinct from
/// [`crate::types::Type`], which is the checker's resolved representation).
#[derive(Debug, Clone, PartialEq)]
pub enum Typ {
    Var(String),
    Ctor(LongId),
    /// A unary type constructor applied postfix to its argument, e.g.
    /// `int list` or `'a list`. The module language is out of scope, so the
    /// only constructor the checker resolves here is the built-in `list`.
    App(Box<Typ>, LongId),
    Fun(Box<Typ>, Box<Typ>),
    Tuple(Vec<Typ>),
    Record(Vec<(Id, Typ)>),
    Paren(Box<Typ>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exp {
    pub id: NodeId,
    pub kind: ExpKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpKind {
    Const(Const),
    VarRef(LongId),
    App(Box<Exp>, Box<Exp>),
    InfixApp(Box<Exp>, Id, Box<Exp>),
    Tuple(Vec<Exp>),
    List(Vec<Exp>),
    If(Box<Exp>, Box<Exp>, Box<Exp>),
    While(Box<Exp>, Box<Exp>),
    Conj(Box<Exp>, Box<Exp>),
    Disj(Box<Exp>, Box<Exp>),
    Ann(Box<Exp>, Typ),
    Fn(Match),
    Let(Box<Dec>, Vec<Exp>),
    Sel(Label),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pat {
    pub id: NodeId,
    pub kind: PatKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatKind {
    Const(Const),
    Wild,
    Var(Id),
    Ctor(LongId, Option<Box<Pat>>),
    InfixCtor(Box<Pat>, Id, Box<Pat>),
    Tuple(Vec<Pat>),
    List(Vec<Pat>),
    Ann(Box<Pat>, Typ),
}

/// `pat => exp`, chained through `|` alternatives.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub pat: Pat,
    pub exp: Exp,
    pub or: Option<Box<Match>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValBind {
    pub pat: Pat,
    pub exp: Exp,
    pub and: Option<Box<ValBind>>,
}

/// One clause of a (possibly nonfix/infix) function definition:
/// `id pat+ [: typ] = exp`, chained through `|` alternatives.
#[derive(Debug, Clone, PartialEq)]
pub enum FunMatch {
    Nonfix {
        id: Id,
        params: Vec<Pat>,
        typ: Option<Typ>,
        body: Exp,
        or: Option<Box<FunMatch>>,
    },
    Infix {
        lhs: Pat,
        id: Id,
        rhs: Pat,
        typ: Option<Typ>,
        body: Exp,
        or: Option<Box<FunMatch>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunBind {
    pub matches: FunMatch,
    pub and: Option<Box<FunBind>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypBind {
    pub id: Id,
    pub typ: Typ,
    pub and: Option<Box<TypBind>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixity {
    Nonfix,
    Infix,
    Infixr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dec {
    Val(ValBind),
    Fun(FunBind),
    Type(TypBind),
    Seq(Vec<Dec>),
    Local(Box<Dec>, Box<Dec>),
    Infix(Option<u8>, Vec<Id>),
    Infixr(Option<u8>, Vec<Id>),
    Nonfix(Vec<Id>),
}

/// A parsed top-level item: either a declaration or a bare expression
/// (which is bound to the reserved name `it`).
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Dec(Dec),
    Exp(Exp),
}
