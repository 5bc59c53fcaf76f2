//! Recursive-descent parser (C4)
//!
//! Pulls tokens from [`crate::token::Lexer`] one at a time with a single
//! token of pushback, builds [`crate::ast`] nodes tagged with fresh
//! [`NodeId`]s, and consults the [`SymbolTable`] fixity table while parsing
//! infix expressions. `infix`/`infixr`/`nonfix` declarations take effect on
//! the symbol table the moment they are parsed, not when the item is later
//! type-checked, so a later expression in the same item sees the new
//! precedence.
//!
//! The lexer is constructed over a whole source string and has no
//! incremental-feed API, so a REPL that wants continuation support
//! (`Session`, see spec.md section 4.7 / P10) re-parses the full buffered
//! input from scratch each time a line is added; this parser only needs to
//! tell the caller whether the failure was a real syntax error or simply
//! running out of tokens ([`ParseOutcome::Incomplete`]).

use crate::ast::{
    Const, Dec, Exp, ExpKind, Fixity, FunBind, FunMatch, Id, Item, Label, LongId, Match, NodeIdGen,
    Pat, PatKind, Typ, TypBind, ValBind,
};
use crate::diagnostic::{Diagnostic, SyntaxDetail};
use crate::symtab::{OperatorInfo, SymbolTable};
use crate::token::{Lexer, Literal, Token, TokenKind};

/// Tokens that, seen while gathering curried application arguments, mean
/// the application is over and the accumulated expression should be
/// returned as-is.
const SHOULD_RET_LHS_EXP: &[&str] =
    &[")", ",", ";", "]", "end", "then", "else", "do", "and", "=", "in"];

/// Tokens that can legally follow a complete expression; used to stop
/// gathering application arguments (differs from [`SHOULD_RET_LHS_EXP`] in
/// including `:`, for a trailing type annotation, and excluding `in`, which
/// never directly follows an expression).
const FOLLOW_EXP: &[&str] =
    &[")", ",", ";", "]", "end", ":", "andalso", "orelse", "then", "else", "do", "and", "="];

const DEC_START_KEYWORDS: &[&str] =
    &["val", "fun", "type", "infix", "infixr", "nonfix", "local"];

/// Outcome of attempting to parse one top-level item from the buffered
/// source.
pub enum ParseOutcome {
    Complete(Item),
    /// The input ended before the item was finished; the caller should
    /// read another line and retry over the extended buffer.
    Incomplete,
    /// There was no input at all (blank line).
    Empty,
}

enum PErr {
    Diag(Diagnostic),
    /// Ran out of tokens; distinct from a genuine syntax error so the
    /// caller can offer to read more input instead of reporting a failure.
    Eof,
}

impl From<Diagnostic> for PErr {
    fn from(d: Diagnostic) -> Self {
        PErr::Diag(d)
    }
}

type PResult<T> = Result<T, PErr>;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Option<Token>,
    node_ids: NodeIdGen,
    consumed: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Parser { lexer: Lexer::new(source), lookahead: None, node_ids: NodeIdGen::new(), consumed: 0 }
    }

    /// Text left over after the last [`Self::parse_item`] call returned
    /// `Complete`; a caller parsing more than one item out of a shared
    /// buffer uses this instead of re-lexing from the start.
    pub fn into_remaining(self) -> String {
        self.lexer.remaining_source()
    }

    /// Parse one top-level item. `symtab` is mutated in place as
    /// `infix`/`infixr`/`nonfix` declarations are encountered.
    pub fn parse_item(&mut self, symtab: &mut SymbolTable) -> Result<ParseOutcome, Diagnostic> {
        match self.try_parse_item(symtab) {
            Ok(item) => Ok(ParseOutcome::Complete(item)),
            Err(PErr::Diag(d)) => Err(d),
            Err(PErr::Eof) => {
                Ok(if self.consumed == 0 { ParseOutcome::Empty } else { ParseOutcome::Incomplete })
            }
        }
    }

    fn try_parse_item(&mut self, symtab: &mut SymbolTable) -> PResult<Item> {
        if self.peek_is_dec_start()? {
            let dec = self.parse_dec(symtab)?;
            self.expect_operator(";")?;
            Ok(Item::Dec(dec))
        } else {
            let exp = self.parse_exp(symtab)?;
            self.expect_operator(";")?;
            Ok(Item::Exp(exp))
        }
    }

    // -- token stream plumbing -------------------------------------------

    fn fetch(&mut self) -> PResult<Token> {
        match self.lexer.next_token()? {
            Some(t) => {
                self.consumed += 1;
                Ok(t)
            }
            None => Err(PErr::Eof),
        }
    }

    fn peek(&mut self) -> PResult<&Token> {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.fetch()?);
        }
        Ok(self.lookahead.as_ref().unwrap())
    }

    fn bump(&mut self) -> PResult<Token> {
        if let Some(t) = self.lookahead.take() {
            return Ok(t);
        }
        self.fetch()
    }

    fn peek_is_operator(&mut self, text: &str) -> PResult<bool> {
        Ok(self.peek()?.is_operator(text))
    }

    fn peek_is_keyword(&mut self, text: &str) -> PResult<bool> {
        Ok(self.peek()?.is_keyword(text))
    }

    /// `=` is not reserved punctuation (it doubles as the infix equality
    /// operator), so it lexes as a plain `Id` token; it needs a text check
    /// rather than [`Token::is_operator`].
    fn peek_is_equals(&mut self) -> PResult<bool> {
        let tok = self.peek()?;
        Ok(tok.kind == TokenKind::Id && tok.text == "=")
    }

    fn expect_equals(&mut self) -> PResult<Token> {
        let tok = self.bump()?;
        if tok.kind == TokenKind::Id && tok.text == "=" {
            Ok(tok)
        } else {
            Err(PErr::Diag(Diagnostic::Syntax { pos: tok.pos, detail: SyntaxDetail::Missing("=") }))
        }
    }

    fn expect_operator(&mut self, text: &'static str) -> PResult<Token> {
        let tok = self.bump()?;
        if tok.is_operator(text) {
            Ok(tok)
        } else {
            Err(PErr::Diag(Diagnostic::Syntax { pos: tok.pos, detail: SyntaxDetail::Missing(text) }))
        }
    }

    fn expect_keyword(&mut self, text: &'static str) -> PResult<Token> {
        let tok = self.bump()?;
        if tok.is_keyword(text) {
            Ok(tok)
        } else {
            Err(PErr::Diag(Diagnostic::Syntax { pos: tok.pos, detail: SyntaxDetail::Missing(text) }))
        }
    }

    fn expect_id_token(&mut self) -> PResult<Token> {
        let tok = self.bump()?;
        if tok.kind == TokenKind::Id {
            Ok(tok)
        } else {
            Err(PErr::Diag(Diagnostic::Syntax {
                pos: tok.pos,
                detail: SyntaxDetail::Invalid(tok.text.clone()),
            }))
        }
    }

    fn peek_is_dec_start(&mut self) -> PResult<bool> {
        let tok = self.peek()?;
        Ok(tok.kind == TokenKind::Keyword && DEC_START_KEYWORDS.contains(&tok.text.as_str()))
    }

    fn peek_is_infix_id(&mut self, symtab: &SymbolTable) -> PResult<bool> {
        let tok = self.peek()?;
        Ok(tok.kind == TokenKind::Id
            && symtab.get_operator(&tok.text).map(|o| o.fixity != Fixity::Nonfix).unwrap_or(false))
    }

    fn peek_can_start_atom(&mut self) -> PResult<bool> {
        let tok = self.peek()?;
        Ok(match tok.kind {
            TokenKind::Int
            | TokenKind::Real
            | TokenKind::Char
            | TokenKind::String
            | TokenKind::Bool
            | TokenKind::Id => true,
            TokenKind::Operator => matches!(tok.text.as_str(), "(" | "[" | "#"),
            TokenKind::Keyword => matches!(tok.text.as_str(), "if" | "while" | "fn" | "let"),
        })
    }

    fn peek_starts_atomic_pat(&mut self) -> PResult<bool> {
        let tok = self.peek()?;
        Ok(match tok.kind {
            TokenKind::Int
            | TokenKind::Real
            | TokenKind::Char
            | TokenKind::String
            | TokenKind::Bool
            | TokenKind::Id => true,
            TokenKind::Operator => matches!(tok.text.as_str(), "(" | "[" | "_"),
            TokenKind::Keyword => false,
        })
    }

    // -- declarations ------------------------------------------------------

    fn parse_dec(&mut self, symtab: &mut SymbolTable) -> PResult<Dec> {
        let tok = self.peek()?.clone();
        if tok.is_keyword("val") {
            self.bump()?;
            Ok(Dec::Val(self.parse_valbind(symtab)?))
        } else if tok.is_keyword("fun") {
            self.bump()?;
            Ok(Dec::Fun(self.parse_funbind(symtab)?))
        } else if tok.is_keyword("type") {
            self.bump()?;
            Ok(Dec::Type(self.parse_typbind(symtab)?))
        } else if tok.is_keyword("infix") {
            self.bump()?;
            let prec = self.parse_optional_prec_digit()?;
            let ids = self.parse_id_list()?;
            for id in &ids {
                symtab.set_operator(id.name(), OperatorInfo { fixity: Fixity::Infix, prec: prec.unwrap_or(0) });
            }
            Ok(Dec::Infix(prec, ids))
        } else if tok.is_keyword("infixr") {
            self.bump()?;
            let prec = self.parse_optional_prec_digit()?;
            let ids = self.parse_id_list()?;
            for id in &ids {
                symtab.set_operator(id.name(), OperatorInfo { fixity: Fixity::Infixr, prec: prec.unwrap_or(0) });
            }
            Ok(Dec::Infixr(prec, ids))
        } else if tok.is_keyword("nonfix") {
            self.bump()?;
            let ids = self.parse_id_list()?;
            for id in &ids {
                symtab.set_operator(id.name(), OperatorInfo { fixity: Fixity::Nonfix, prec: 0 });
            }
            Ok(Dec::Nonfix(ids))
        } else if tok.is_keyword("local") {
            self.bump()?;
            let d1 = self.parse_dec_seq(symtab)?;
            self.expect_keyword("in")?;
            let d2 = self.parse_dec_seq(symtab)?;
            self.expect_keyword("end")?;
            Ok(Dec::Local(Box::new(d1), Box::new(d2)))
        } else {
            Err(PErr::Diag(Diagnostic::Syntax { pos: tok.pos, detail: SyntaxDetail::Invalid(tok.text) }))
        }
    }

    /// One or more consecutive declarations with no separator between them
    /// (as in `let val a = 1 val b = 2 in ... end`), folded into `Dec::Seq`
    /// when there is more than one.
    fn parse_dec_seq(&mut self, symtab: &mut SymbolTable) -> PResult<Dec> {
        let mut decs = vec![self.parse_dec(symtab)?];
        while self.peek_is_dec_start()? {
            decs.push(self.parse_dec(symtab)?);
        }
        if decs.len() == 1 {
            Ok(decs.pop().unwrap())
        } else {
            Ok(Dec::Seq(decs))
        }
    }

    fn parse_optional_prec_digit(&mut self) -> PResult<Option<u8>> {
        let is_digit =
            matches!(self.peek()?.literal, Some(Literal::Int(n)) if (0..=9).contains(&n));
        if is_digit {
            let tok = self.bump()?;
            if let Some(Literal::Int(n)) = tok.literal {
                return Ok(Some(n as u8));
            }
        }
        Ok(None)
    }

    fn parse_id_list(&mut self) -> PResult<Vec<Id>> {
        let mut ids = Vec::new();
        while self.peek()?.kind == TokenKind::Id {
            let tok = self.bump()?;
            ids.push(token_to_ast_id(&tok));
        }
        Ok(ids)
    }

    fn parse_valbind(&mut self, symtab: &mut SymbolTable) -> PResult<ValBind> {
        let pat = self.parse_pat(symtab)?;
        self.expect_equals()?;
        let exp = self.parse_exp(symtab)?;
        let and = if self.peek_is_keyword("and")? {
            self.bump()?;
            Some(Box::new(self.parse_valbind(symtab)?))
        } else {
            None
        };
        Ok(ValBind { pat, exp, and })
    }

    fn parse_funbind(&mut self, symtab: &mut SymbolTable) -> PResult<FunBind> {
        let matches_ = self.parse_fun_match(symtab)?;
        let and = if self.peek_is_keyword("and")? {
            self.bump()?;
            Some(Box::new(self.parse_funbind(symtab)?))
        } else {
            None
        };
        Ok(FunBind { matches: matches_, and })
    }

    /// The grammar for one `fun` clause is ambiguous between the nonfix
    /// form (`id pat+`) and the infix sugar (`pat id pat`) without deciding
    /// on the second token's fixity: an identifier just parsed as a
    /// candidate function name is reinterpreted as a bare variable pattern
    /// if the very next token is itself a registered infix/infixr operator.
    fn parse_fun_match(&mut self, symtab: &mut SymbolTable) -> PResult<FunMatch> {
        let name_tok = self.expect_id_token()?;
        if self.peek_is_infix_id(symtab)? {
            let lhs = Pat { id: self.node_ids.next(), kind: PatKind::Var(token_to_ast_id(&name_tok)) };
            let op_tok = self.bump()?;
            let id = token_to_ast_id(&op_tok);
            let rhs = self.parse_atomic_pat(symtab)?;
            let typ = self.parse_optional_type_ann(symtab)?;
            self.expect_equals()?;
            let body = self.parse_exp(symtab)?;
            let or = self.parse_optional_or_funmatch(symtab)?;
            return Ok(FunMatch::Infix { lhs, id, rhs, typ, body, or });
        }
        let id = token_to_ast_id(&name_tok);
        let mut params = Vec::new();
        while self.peek_starts_atomic_pat()? {
            params.push(self.parse_atomic_pat(symtab)?);
        }
        let typ = self.parse_optional_type_ann(symtab)?;
        self.expect_equals()?;
        let body = self.parse_exp(symtab)?;
        let or = self.parse_optional_or_funmatch(symtab)?;
        Ok(FunMatch::Nonfix { id, params, typ, body, or })
    }

    fn parse_optional_type_ann(&mut self, symtab: &mut SymbolTable) -> PResult<Option<Typ>> {
        if self.peek_is_operator(":")? {
            self.bump()?;
            Ok(Some(self.parse_typ(symtab)?))
        } else {
            Ok(None)
        }
    }

    fn parse_optional_or_funmatch(&mut self, symtab: &mut SymbolTable) -> PResult<Option<Box<FunMatch>>> {
        if self.peek_is_operator("|")? {
            self.bump()?;
            Ok(Some(Box::new(self.parse_fun_match(symtab)?)))
        } else {
            Ok(None)
        }
    }

    fn parse_typbind(&mut self, symtab: &mut SymbolTable) -> PResult<TypBind> {
        let id_tok = self.expect_id_token()?;
        let id = token_to_ast_id(&id_tok);
        self.expect_equals()?;
        let typ = self.parse_typ(symtab)?;
        let and = if self.peek_is_keyword("and")? {
            self.bump()?;
            Some(Box::new(self.parse_typbind(symtab)?))
        } else {
            None
        };
        Ok(TypBind { id, typ, and })
    }

    // -- surface types -------------------------------------------------------

    fn parse_typ(&mut self, symtab: &mut SymbolTable) -> PResult<Typ> {
        let left = self.parse_tuple_typ(symtab)?;
        if self.peek_is_operator("->")? {
            self.bump()?;
            let right = self.parse_typ(symtab)?;
            return Ok(Typ::Fun(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_tuple_typ(&mut self, symtab: &mut SymbolTable) -> PResult<Typ> {
        let first = self.parse_atomic_typ(symtab)?;
        if self.peek_is_star()? {
            let mut elems = vec![first];
            while self.peek_is_star()? {
                self.bump()?;
                elems.push(self.parse_atomic_typ(symtab)?);
            }
            return Ok(Typ::Tuple(elems));
        }
        Ok(first)
    }

    /// `*` is a plain symbolic `Id`, like `=`.
    fn peek_is_star(&mut self) -> PResult<bool> {
        let tok = self.peek()?;
        Ok(tok.kind == TokenKind::Id && tok.text == "*")
    }

    fn parse_atomic_typ(&mut self, symtab: &mut SymbolTable) -> PResult<Typ> {
        let tok = self.peek()?.clone();
        let base = if tok.kind == TokenKind::Id && tok.text.starts_with('\'') {
            self.bump()?;
            Typ::Var(tok.text.clone())
        } else if tok.is_operator("(") {
            self.bump()?;
            let first = self.parse_typ(symtab)?;
            if self.peek_is_operator(",")? {
                let mut elems = vec![first];
                while self.peek_is_operator(",")? {
                    self.bump()?;
                    elems.push(self.parse_typ(symtab)?);
                }
                self.expect_operator(")")?;
                Typ::Tuple(elems)
            } else {
                self.expect_operator(")")?;
                Typ::Paren(Box::new(first))
            }
        } else if tok.is_operator("{") {
            self.bump()?;
            let mut rows = Vec::new();
            if !self.peek_is_operator("}")? {
                rows.push(self.parse_typ_row(symtab)?);
                while self.peek_is_operator(",")? {
                    self.bump()?;
                    rows.push(self.parse_typ_row(symtab)?);
                }
            }
            self.expect_operator("}")?;
            Typ::Record(rows)
        } else if tok.kind == TokenKind::Id {
            self.bump()?;
            Typ::Ctor(LongId::single(token_to_ast_id(&tok)))
        } else {
            return Err(PErr::Diag(Diagnostic::Syntax {
                pos: tok.pos,
                detail: SyntaxDetail::Invalid(tok.text.clone()),
            }));
        };
        self.apply_postfix_ctors(base)
    }

    fn parse_typ_row(&mut self, symtab: &mut SymbolTable) -> PResult<(Id, Typ)> {
        let id_tok = self.expect_id_token()?;
        self.expect_operator(":")?;
        let typ = self.parse_typ(symtab)?;
        Ok((token_to_ast_id(&id_tok), typ))
    }

    /// `ty tycon` is postfix application, left-to-right chainable
    /// (`int list list`); the only constructor resolved downstream is the
    /// built-in `list`, but the grammar accepts any identifier here.
    fn apply_postfix_ctors(&mut self, mut t: Typ) -> PResult<Typ> {
        loop {
            let is_ctor = {
                let tok = self.peek()?;
                tok.kind == TokenKind::Id && !tok.text.starts_with('\'')
            };
            if !is_ctor {
                break;
            }
            let tok = self.bump()?;
            t = Typ::App(Box::new(t), LongId::single(token_to_ast_id(&tok)));
        }
        Ok(t)
    }

    // -- patterns ------------------------------------------------------------

    fn parse_pat(&mut self, symtab: &mut SymbolTable) -> PResult<Pat> {
        let mut left = self.parse_cons_pat(symtab)?;
        if self.peek_is_operator(":")? {
            self.bump()?;
            let typ = self.parse_typ(symtab)?;
            left = Pat { id: self.node_ids.next(), kind: PatKind::Ann(Box::new(left), typ) };
        }
        Ok(left)
    }

    fn parse_cons_pat(&mut self, symtab: &mut SymbolTable) -> PResult<Pat> {
        let left = self.parse_atomic_pat(symtab)?;
        let is_cons = {
            let tok = self.peek()?;
            tok.kind == TokenKind::Id && tok.text == "::"
        };
        if is_cons {
            let op_tok = self.bump()?;
            let id = token_to_ast_id(&op_tok);
            let right = self.parse_cons_pat(symtab)?;
            return Ok(Pat {
                id: self.node_ids.next(),
                kind: PatKind::InfixCtor(Box::new(left), id, Box::new(right)),
            });
        }
        Ok(left)
    }

    fn parse_atomic_pat(&mut self, symtab: &mut SymbolTable) -> PResult<Pat> {
        let tok = self.peek()?.clone();
        match tok.kind {
            TokenKind::Int | TokenKind::Real | TokenKind::Char | TokenKind::String | TokenKind::Bool => {
                self.bump()?;
                Ok(Pat { id: self.node_ids.next(), kind: PatKind::Const(literal_to_const(&tok)) })
            }
            TokenKind::Operator if tok.text == "_" => {
                self.bump()?;
                Ok(Pat { id: self.node_ids.next(), kind: PatKind::Wild })
            }
            TokenKind::Operator if tok.text == "(" => {
                self.bump()?;
                if self.peek_is_operator(")")? {
                    self.bump()?;
                    return Ok(Pat { id: self.node_ids.next(), kind: PatKind::Tuple(Vec::new()) });
                }
                let first = self.parse_pat(symtab)?;
                if self.peek_is_operator(",")? {
                    let mut elems = vec![first];
                    while self.peek_is_operator(",")? {
                        self.bump()?;
                        elems.push(self.parse_pat(symtab)?);
                    }
                    self.expect_operator(")")?;
                    return Ok(Pat { id: self.node_ids.next(), kind: PatKind::Tuple(elems) });
                }
                self.expect_operator(")")?;
                Ok(first)
            }
            TokenKind::Operator if tok.text == "[" => {
                self.bump()?;
                let mut elems = Vec::new();
                if !self.peek_is_operator("]")? {
                    elems.push(self.parse_pat(symtab)?);
                    while self.peek_is_operator(",")? {
                        self.bump()?;
                        elems.push(self.parse_pat(symtab)?);
                    }
                }
                self.expect_operator("]")?;
                Ok(Pat { id: self.node_ids.next(), kind: PatKind::List(elems) })
            }
            TokenKind::Id => {
                self.bump()?;
                Ok(Pat { id: self.node_ids.next(), kind: PatKind::Var(token_to_ast_id(&tok)) })
            }
            _ => Err(PErr::Diag(Diagnostic::Syntax { pos: tok.pos, detail: SyntaxDetail::Invalid(tok.text) })),
        }
    }

    // -- expressions -----------------------------------------------------

    fn parse_exp(&mut self, symtab: &mut SymbolTable) -> PResult<Exp> {
        let e = self.parse_or_exp(symtab)?;
        if self.peek_is_operator(":")? {
            self.bump()?;
            let typ = self.parse_typ(symtab)?;
            return Ok(Exp { id: self.node_ids.next(), kind: ExpKind::Ann(Box::new(e), typ) });
        }
        Ok(e)
    }

    fn parse_or_exp(&mut self, symtab: &mut SymbolTable) -> PResult<Exp> {
        let mut left = self.parse_and_exp(symtab)?;
        while self.peek_is_keyword("orelse")? {
            self.bump()?;
            let right = self.parse_and_exp(symtab)?;
            left = Exp { id: self.node_ids.next(), kind: ExpKind::Disj(Box::new(left), Box::new(right)) };
        }
        Ok(left)
    }

    fn parse_and_exp(&mut self, symtab: &mut SymbolTable) -> PResult<Exp> {
        let mut left = self.parse_infix_exp(symtab, 0)?;
        while self.peek_is_keyword("andalso")? {
            self.bump()?;
            let right = self.parse_infix_exp(symtab, 0)?;
            left = Exp { id: self.node_ids.next(), kind: ExpKind::Conj(Box::new(left), Box::new(right)) };
        }
        Ok(left)
    }

    /// Standard precedence-climbing over whatever the symbol table's
    /// fixity table says about the next `Id` token.
    fn parse_infix_exp(&mut self, symtab: &mut SymbolTable, min_prec: u8) -> PResult<Exp> {
        let mut left = self.parse_app_exp(symtab)?;
        loop {
            let should_stop = {
                let tok = self.peek()?;
                SHOULD_RET_LHS_EXP.contains(&tok.text.as_str())
            };
            if should_stop {
                break;
            }
            let info = {
                let tok = self.peek()?;
                if tok.kind != TokenKind::Id {
                    None
                } else {
                    symtab.get_operator(&tok.text).copied()
                }
            };
            let info = match info {
                Some(i) if i.fixity != Fixity::Nonfix && i.prec >= min_prec => i,
                _ => break,
            };
            let op_tok = self.bump()?;
            let next_min = if info.fixity == Fixity::Infixr { info.prec } else { info.prec + 1 };
            let right = self.parse_infix_exp(symtab, next_min)?;
            let id = token_to_ast_id(&op_tok);
            left = Exp {
                id: self.node_ids.next(),
                kind: ExpKind::InfixApp(Box::new(left), id, Box::new(right)),
            };
        }
        Ok(left)
    }

    /// Left-associative juxtaposition. Stops at anything in [`FOLLOW_EXP`],
    /// at `|`/`=>` (which start match alternatives), at a registered infix
    /// identifier (handled one level up by [`Self::parse_infix_exp`]), or
    /// at a token that cannot start an atomic expression at all.
    fn parse_app_exp(&mut self, symtab: &mut SymbolTable) -> PResult<Exp> {
        let mut left = self.parse_atomic_exp(symtab)?;
        loop {
            let stop = {
                let tok = self.peek()?;
                FOLLOW_EXP.contains(&tok.text.as_str())
                    || tok.is_operator("|")
                    || tok.is_operator("=>")
                    || (tok.kind == TokenKind::Id
                        && symtab.get_operator(&tok.text).map(|o| o.fixity != Fixity::Nonfix).unwrap_or(false))
            };
            if stop || !self.peek_can_start_atom()? {
                break;
            }
            let arg = self.parse_atomic_exp(symtab)?;
            left = Exp { id: self.node_ids.next(), kind: ExpKind::App(Box::new(left), Box::new(arg)) };
        }
        Ok(left)
    }

    fn parse_atomic_exp(&mut self, symtab: &mut SymbolTable) -> PResult<Exp> {
        let tok = self.peek()?.clone();
        match tok.kind {
            TokenKind::Int | TokenKind::Real | TokenKind::Char | TokenKind::String | TokenKind::Bool => {
                self.bump()?;
                Ok(Exp { id: self.node_ids.next(), kind: ExpKind::Const(literal_to_const(&tok)) })
            }
            TokenKind::Id => {
                self.bump()?;
                Ok(Exp {
                    id: self.node_ids.next(),
                    kind: ExpKind::VarRef(LongId::single(token_to_ast_id(&tok))),
                })
            }
            TokenKind::Operator if tok.text == "(" => self.parse_paren_exp(symtab),
            TokenKind::Operator if tok.text == "[" => self.parse_list_exp(symtab),
            TokenKind::Operator if tok.text == "#" => {
                self.bump()?;
                let lbl_tok = self.bump()?;
                let label = label_from_token(&lbl_tok)?;
                Ok(Exp { id: self.node_ids.next(), kind: ExpKind::Sel(label) })
            }
            TokenKind::Keyword if tok.text == "if" => self.parse_if_exp(symtab),
            TokenKind::Keyword if tok.text == "while" => self.parse_while_exp(symtab),
            TokenKind::Keyword if tok.text == "fn" => self.parse_fn_exp(symtab),
            TokenKind::Keyword if tok.text == "let" => self.parse_let_exp(symtab),
            _ => Err(PErr::Diag(Diagnostic::Syntax { pos: tok.pos, detail: SyntaxDetail::Invalid(tok.text) })),
        }
    }

    fn parse_paren_exp(&mut self, symtab: &mut SymbolTable) -> PResult<Exp> {
        self.bump()?;
        if self.peek_is_operator(")")? {
            self.bump()?;
            return Ok(Exp { id: self.node_ids.next(), kind: ExpKind::Tuple(Vec::new()) });
        }
        let first = self.parse_exp(symtab)?;
        if self.peek_is_operator(",")? {
            let mut elems = vec![first];
            while self.peek_is_operator(",")? {
                self.bump()?;
                elems.push(self.parse_exp(symtab)?);
            }
            self.expect_operator(")")?;
            return Ok(Exp { id: self.node_ids.next(), kind: ExpKind::Tuple(elems) });
        }
        self.expect_operator(")")?;
        Ok(first)
    }

    fn parse_list_exp(&mut self, symtab: &mut SymbolTable) -> PResult<Exp> {
        self.bump()?;
        let mut elems = Vec::new();
        if !self.peek_is_operator("]")? {
            elems.push(self.parse_exp(symtab)?);
            while self.peek_is_operator(",")? {
                self.bump()?;
                elems.push(self.parse_exp(symtab)?);
            }
        }
        self.expect_operator("]")?;
        Ok(Exp { id: self.node_ids.next(), kind: ExpKind::List(elems) })
    }

    fn parse_if_exp(&mut self, symtab: &mut SymbolTable) -> PResult<Exp> {
        self.bump()?;
        let c = self.parse_exp(symtab)?;
        self.expect_keyword("then")?;
        let t = self.parse_exp(symtab)?;
        self.expect_keyword("else")?;
        let e = self.parse_exp(symtab)?;
        Ok(Exp { id: self.node_ids.next(), kind: ExpKind::If(Box::new(c), Box::new(t), Box::new(e)) })
    }

    fn parse_while_exp(&mut self, symtab: &mut SymbolTable) -> PResult<Exp> {
        self.bump()?;
        let c = self.parse_exp(symtab)?;
        self.expect_keyword("do")?;
        let body = self.parse_exp(symtab)?;
        Ok(Exp { id: self.node_ids.next(), kind: ExpKind::While(Box::new(c), Box::new(body)) })
    }

    fn parse_fn_exp(&mut self, symtab: &mut SymbolTable) -> PResult<Exp> {
        self.bump()?;
        let m = self.parse_match(symtab)?;
        Ok(Exp { id: self.node_ids.next(), kind: ExpKind::Fn(m) })
    }

    fn parse_match(&mut self, symtab: &mut SymbolTable) -> PResult<Match> {
        let pat = self.parse_pat(symtab)?;
        self.expect_operator("=>")?;
        let exp = self.parse_exp(symtab)?;
        let or = if self.peek_is_operator("|")? {
            self.bump()?;
            Some(Box::new(self.parse_match(symtab)?))
        } else {
            None
        };
        Ok(Match { pat, exp, or })
    }

    fn parse_let_exp(&mut self, symtab: &mut SymbolTable) -> PResult<Exp> {
        self.bump()?;
        let dec = self.parse_dec_seq(symtab)?;
        self.expect_keyword("in")?;
        let mut exps = vec![self.parse_exp(symtab)?];
        while self.peek_is_operator(";")? {
            self.bump()?;
            exps.push(self.parse_exp(symtab)?);
        }
        self.expect_keyword("end")?;
        Ok(Exp { id: self.node_ids.next(), kind: ExpKind::Let(Box::new(dec), exps) })
    }
}

fn token_to_ast_id(tok: &Token) -> Id {
    if tok.text.chars().next().map(|c| c.is_alphabetic() || c == '\'').unwrap_or(false) {
        Id::Alpha(tok.text.clone())
    } else {
        Id::Sym(tok.text.clone())
    }
}

fn literal_to_const(tok: &Token) -> Const {
    match &tok.literal {
        Some(Literal::Int(v)) => Const::Int(*v),
        Some(Literal::Real(v)) => Const::Real(*v),
        Some(Literal::Char(v)) => Const::Char(*v),
        Some(Literal::String(v)) => Const::String(v.clone()),
        Some(Literal::Bool(v)) => Const::Bool(*v),
        None => unreachable!("literal_to_const called on a non-literal token"),
    }
}

fn label_from_token(tok: &Token) -> PResult<Label> {
    match &tok.literal {
        Some(Literal::Int(n)) if *n >= 0 => Ok(Label::Num(*n as u32)),
        _ if tok.kind == TokenKind::Id => Ok(Label::Id(token_to_ast_id(tok))),
        _ => Err(PErr::Diag(Diagnostic::Syntax {
            pos: tok.pos,
            detail: SyntaxDetail::Invalid(tok.text.clone()),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Dec, ExpKind};

    fn parse_one(src: &str) -> (Item, SymbolTable) {
        let mut symtab = SymbolTable::new();
        let mut parser = Parser::new(src);
        match parser.parse_item(&mut symtab).unwrap() {
            ParseOutcome::Complete(item) => (item, symtab),
            ParseOutcome::Incomplete => panic!("expected a complete item, got Incomplete"),
            ParseOutcome::Empty => panic!("expected a complete item, got Empty"),
        }
    }

    #[test]
    fn parses_simple_val_binding() {
        let (item, _) = parse_one("val x = 1 + 2;");
        match item {
            Item::Dec(Dec::Val(vb)) => {
                assert!(matches!(vb.pat.kind, PatKind::Var(Id::Alpha(ref s)) if s == "x"));
                assert!(matches!(vb.exp.kind, ExpKind::InfixApp(_, _, _)));
            }
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[test]
    fn infix_precedence_climbs_by_fixity_table() {
        let (item, _) = parse_one("val x = 1 + 2 * 3;");
        let Item::Dec(Dec::Val(vb)) = item else { panic!("expected val binding") };
        match vb.exp.kind {
            ExpKind::InfixApp(lhs, op, _) => {
                assert!(matches!(*lhs, Exp { kind: ExpKind::Const(Const::Int(1)), .. }));
                assert_eq!(op.name(), "+");
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn application_binds_tighter_than_any_infix_operator() {
        let (item, _) = parse_one("val x = f a + g b;");
        let Item::Dec(Dec::Val(vb)) = item else { panic!("expected val binding") };
        match vb.exp.kind {
            ExpKind::InfixApp(lhs, op, rhs) => {
                assert_eq!(op.name(), "+");
                assert!(matches!(*lhs, Exp { kind: ExpKind::App(_, _), .. }));
                assert!(matches!(*rhs, Exp { kind: ExpKind::App(_, _), .. }));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn infix_declaration_takes_effect_within_the_same_item() {
        let mut symtab = SymbolTable::new();
        let mut parser = Parser::new("infix 6 ++; fun x ++ y = x + y;");
        assert!(matches!(parser.parse_item(&mut symtab).unwrap(), ParseOutcome::Complete(_)));
        assert_eq!(symtab.get_operator("++").unwrap().prec, 6);
        let outcome = parser.parse_item(&mut symtab).unwrap();
        let ParseOutcome::Complete(Item::Dec(Dec::Fun(fb))) = outcome else {
            panic!("expected a complete fun declaration");
        };
        assert!(matches!(fb.matches, FunMatch::Infix { .. }));
    }

    #[test]
    fn incomplete_input_is_distinguished_from_a_syntax_error() {
        let mut symtab = SymbolTable::new();
        let mut parser = Parser::new("val x = 1 +");
        assert!(matches!(parser.parse_item(&mut symtab).unwrap(), ParseOutcome::Incomplete));
    }

    #[test]
    fn blank_input_is_empty_not_incomplete() {
        let mut symtab = SymbolTable::new();
        let mut parser = Parser::new("   ");
        assert!(matches!(parser.parse_item(&mut symtab).unwrap(), ParseOutcome::Empty));
    }

    #[test]
    fn genuine_syntax_error_is_reported_even_with_more_tokens_available() {
        let mut symtab = SymbolTable::new();
        let mut parser = Parser::new("val = 1;");
        assert!(parser.parse_item(&mut symtab).is_err());
    }

    #[test]
    fn list_and_tuple_literals_parse() {
        let (item, _) = parse_one("val x = ([1,2,3], (1, \"a\"));");
        let Item::Dec(Dec::Val(vb)) = item else { panic!("expected val binding") };
        match vb.exp.kind {
            ExpKind::Tuple(elems) => {
                assert_eq!(elems.len(), 2);
                assert!(matches!(elems[0].kind, ExpKind::List(_)));
                assert!(matches!(elems[1].kind, ExpKind::Tuple(_)));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn cons_pattern_in_fun_binding() {
        let (item, _) = parse_one("fun f (x::xs) = x;");
        let Item::Dec(Dec::Fun(fb)) = item else { panic!("expected fun binding") };
        match fb.matches {
            FunMatch::Nonfix { params, .. } => {
                assert_eq!(params.len(), 1);
                assert!(matches!(params[0].kind, PatKind::InfixCtor(_, _, _)));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn list_type_annotation_parses_as_postfix_application() {
        let (item, _) = parse_one("val x : int list = [1,2];");
        let Item::Dec(Dec::Val(vb)) = item else { panic!("expected val binding") };
        match vb.pat.kind {
            PatKind::Ann(_, Typ::App(inner, ref lid)) => {
                assert_eq!(lid.name(), "list");
                assert!(matches!(*inner, Typ::Ctor(_)));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }
}
