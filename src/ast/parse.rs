//! Parser: source text to [Program] / [Expr].
//!
//! A recursive-descent parser over the lexer's token vector. Template
//! literals arrive as a single token; their interpolations are re-lexed at
//! the right byte offset so every span stays absolute within the input.

use logos::Logos;

use super::lex::Token;
use super::*;
use crate::error::ParseError;

/// A parse failure with a byte offset, located later against a [LineIndex].
pub(crate) struct RawError {
    pub msg: String,
    pub at: u32,
}

type PResult<T> = Result<T, RawError>;

fn fail<T>(msg: impl Into<String>, at: u32) -> PResult<T> {
    Err(RawError { msg: msg.into(), at })
}

fn locate(text: &str, e: RawError) -> ParseError {
    let (line, col) = LineIndex::new(text).loc(e.at);
    ParseError { msg: e.msg, line, col }
}

/// Parse a whole file.
pub fn parse_program(src: &str) -> Result<Program, ParseError> {
    let inner = || -> PResult<Program> {
        let (toks, comments) = tokenize(src, 0, SpanSrc::File)?;
        let mut p = Parser::new(src, toks, SpanSrc::File);
        let mut body = Vec::new();
        while !p.at_end() {
            body.push(p.stmt()?);
        }
        Ok(Program { body, comments })
    };
    inner().map_err(|e| locate(src, e))
}

/// Parse a standalone expression (a mapping key or value).
pub fn parse_expr_text(src: &str, origin: SpanSrc) -> Result<Expr, ParseError> {
    let inner = || -> PResult<Expr> {
        let (toks, _) = tokenize(src, 0, origin)?;
        let mut p = Parser::new(src, toks, origin);
        let e = p.expr()?;
        if !p.at_end() {
            return fail("unexpected trailing input", p.here());
        }
        Ok(e)
    };
    inner().map_err(|e| locate(src, e))
}

#[derive(Clone, Copy, Debug)]
struct Tok {
    kind: Token,
    lo: u32,
    hi: u32,
}

/// Lex `src` (offsets shifted by `base`), separating comments out.
fn tokenize(src: &str, base: u32, origin: SpanSrc) -> PResult<(Vec<Tok>, Vec<Comment>)> {
    let mut toks = Vec::new();
    let mut comments = Vec::new();
    let mut lex = Token::lexer(src);
    while let Some(t) = lex.next() {
        let sp = lex.span();
        let (lo, hi) = (base + sp.start as u32, base + sp.end as u32);
        match t {
            Token::Error => {
                let snippet: String = lex.slice().chars().take(12).collect();
                return fail(format!("unexpected input '{snippet}'"), lo);
            }
            Token::LineComment | Token::BlockComment => comments.push(Comment {
                text: lex.slice().to_string(),
                span: Span::new(lo, hi, origin),
            }),
            _ => toks.push(Tok { kind: t, lo, hi }),
        }
    }
    Ok((toks, comments))
}

struct Parser<'s> {
    text: &'s str,
    toks: Vec<Tok>,
    pos: usize,
    origin: SpanSrc,
    prev_hi: u32,
}

impl<'s> Parser<'s> {
    fn new(text: &'s str, toks: Vec<Tok>, origin: SpanSrc) -> Self {
        Parser { text, toks, pos: 0, origin, prev_hi: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.toks.len()
    }

    fn peek(&self) -> Option<Token> {
        self.toks.get(self.pos).map(|t| t.kind)
    }

    fn peek_at(&self, n: usize) -> Option<Token> {
        self.toks.get(self.pos + n).map(|t| t.kind)
    }

    fn here(&self) -> u32 {
        self.toks.get(self.pos).map(|t| t.lo).unwrap_or(self.prev_hi)
    }

    fn bump(&mut self) -> Tok {
        let t = self.toks[self.pos];
        self.pos += 1;
        self.prev_hi = t.hi;
        t
    }

    fn slice(&self, t: Tok) -> &'s str {
        &self.text[t.lo as usize..t.hi as usize]
    }

    fn cur_text(&self) -> &'s str {
        self.toks.get(self.pos).map(|t| self.slice(*t)).unwrap_or("")
    }

    fn eat(&mut self, kind: Token) -> bool {
        if self.peek() == Some(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: Token, what: &str) -> PResult<Tok> {
        if self.peek() == Some(kind) {
            Ok(self.bump())
        } else {
            fail(format!("expected {what}"), self.here())
        }
    }

    fn is_kw(&self, kw: &str) -> bool {
        self.peek() == Some(Token::Ident) && self.cur_text() == kw
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        if self.is_kw(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_kw(&mut self, kw: &str) -> PResult<()> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            fail(format!("expected '{kw}'"), self.here())
        }
    }

    fn span_from(&self, lo: u32) -> Span {
        Span::new(lo, self.prev_hi, self.origin)
    }

    fn ident(&mut self) -> PResult<Ident> {
        let t = self.expect(Token::Ident, "an identifier")?;
        Ok(Ident { name: self.slice(t).to_string(), span: Span::new(t.lo, t.hi, self.origin) })
    }

    fn str_lit(&mut self) -> PResult<StrLit> {
        let t = self.expect(Token::Str, "a string literal")?;
        Ok(self.str_lit_of(t))
    }

    fn str_lit_of(&self, t: Tok) -> StrLit {
        let raw = self.slice(t).to_string();
        let value = unescape(&raw[1..raw.len() - 1]);
        StrLit { value, raw, span: Span::new(t.lo, t.hi, self.origin) }
    }

    // ---- statements ----

    fn stmt(&mut self) -> PResult<Stmt> {
        let lo = self.here();
        match self.peek() {
            Some(Token::Semi) => {
                self.bump();
                Ok(Stmt::Empty(self.span_from(lo)))
            }
            Some(Token::LBrace) => {
                let body = self.block()?;
                Ok(Stmt::Block { body, span: self.span_from(lo) })
            }
            Some(Token::Ident) => match self.cur_text() {
                "var" | "let" | "const" => self.var_decl(),
                "function" => {
                    self.bump();
                    let f = self.function(lo, true)?;
                    Ok(Stmt::Func(f))
                }
                "class" => self.class_decl().map(Stmt::Class),
                "return" => self.return_stmt(),
                "if" => self.if_stmt(),
                "while" => self.while_stmt(),
                "import" => self.import_decl().map(Stmt::Import),
                "export" => self.export_decl(),
                _ => self.expr_stmt(),
            },
            _ => self.expr_stmt(),
        }
    }

    fn expr_stmt(&mut self) -> PResult<Stmt> {
        let lo = self.here();
        let expr = self.expr()?;
        self.eat(Token::Semi);
        Ok(Stmt::Expr { expr, span: self.span_from(lo) })
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(Token::LBrace, "'{'")?;
        let mut body = Vec::new();
        while !self.eat(Token::RBrace) {
            if self.at_end() {
                return fail("unclosed block", self.here());
            }
            body.push(self.stmt()?);
        }
        Ok(body)
    }

    fn var_decl(&mut self) -> PResult<Stmt> {
        let lo = self.here();
        let kind = match self.cur_text() {
            "var" => DeclKind::Var,
            "let" => DeclKind::Let,
            _ => DeclKind::Const,
        };
        self.bump();
        let mut decls = Vec::new();
        loop {
            let dlo = self.here();
            let id = self.pattern()?;
            let init = if self.eat(Token::Eq) { Some(self.assign_expr()?) } else { None };
            decls.push(Declarator { id, init, span: self.span_from(dlo) });
            if !self.eat(Token::Comma) {
                break;
            }
        }
        self.eat(Token::Semi);
        Ok(Stmt::VarDecl { kind, decls, span: self.span_from(lo) })
    }

    fn return_stmt(&mut self) -> PResult<Stmt> {
        let lo = self.here();
        self.bump();
        let arg = match self.peek() {
            None | Some(Token::Semi) | Some(Token::RBrace) => None,
            _ => Some(self.expr()?),
        };
        self.eat(Token::Semi);
        Ok(Stmt::Return { arg, span: self.span_from(lo) })
    }

    fn if_stmt(&mut self) -> PResult<Stmt> {
        let lo = self.here();
        self.bump();
        self.expect(Token::LParen, "'(' after 'if'")?;
        let test = self.expr()?;
        self.expect(Token::RParen, "')'")?;
        let cons = Box::new(self.stmt()?);
        let alt = if self.eat_kw("else") { Some(Box::new(self.stmt()?)) } else { None };
        Ok(Stmt::If { test, cons, alt, span: self.span_from(lo) })
    }

    fn while_stmt(&mut self) -> PResult<Stmt> {
        let lo = self.here();
        self.bump();
        self.expect(Token::LParen, "'(' after 'while'")?;
        let test = self.expr()?;
        self.expect(Token::RParen, "')'")?;
        let body = Box::new(self.stmt()?);
        Ok(Stmt::While { test, body, span: self.span_from(lo) })
    }

    fn function(&mut self, lo: u32, require_id: bool) -> PResult<Func> {
        let id = if self.peek() == Some(Token::Ident) { Some(self.ident()?) } else { None };
        if require_id && id.is_none() {
            return fail("function declarations need a name", self.here());
        }
        let params = self.params()?;
        let body = self.block()?;
        Ok(Func { id, params, body, span: self.span_from(lo) })
    }

    fn params(&mut self) -> PResult<Vec<Pat>> {
        self.expect(Token::LParen, "'('")?;
        let mut params = Vec::new();
        while !self.eat(Token::RParen) {
            params.push(self.binding_element()?);
            if !self.eat(Token::Comma) {
                self.expect(Token::RParen, "')'")?;
                break;
            }
        }
        Ok(params)
    }

    // ---- patterns ----

    /// A pattern with an optional default / rest marker (parameter or
    /// destructuring-element position).
    fn binding_element(&mut self) -> PResult<Pat> {
        let lo = self.here();
        if self.eat(Token::Ellipsis) {
            let inner = Box::new(self.pattern()?);
            return Ok(Pat::Rest { inner, span: self.span_from(lo) });
        }
        let pat = self.pattern()?;
        if self.eat(Token::Eq) {
            let default = Box::new(self.assign_expr()?);
            return Ok(Pat::Default { inner: Box::new(pat), default, span: self.span_from(lo) });
        }
        Ok(pat)
    }

    fn pattern(&mut self) -> PResult<Pat> {
        let lo = self.here();
        match self.peek() {
            Some(Token::Ident) => Ok(Pat::Ident(self.ident()?)),
            Some(Token::LBracket) => {
                self.bump();
                let mut elems = Vec::new();
                loop {
                    if self.eat(Token::RBracket) {
                        break;
                    }
                    if self.eat(Token::Comma) {
                        elems.push(None);
                        continue;
                    }
                    elems.push(Some(self.binding_element()?));
                    if !self.eat(Token::Comma) {
                        self.expect(Token::RBracket, "']'")?;
                        break;
                    }
                }
                Ok(Pat::Array { elems, span: self.span_from(lo) })
            }
            Some(Token::LBrace) => {
                self.bump();
                let mut props = Vec::new();
                while !self.eat(Token::RBrace) {
                    let plo = self.here();
                    if self.eat(Token::Ellipsis) {
                        let pat = self.pattern()?;
                        props.push(ObjPatProp::Rest { pat, span: self.span_from(plo) });
                    } else {
                        let key = self.prop_key()?;
                        if self.eat(Token::Colon) {
                            let value = self.binding_element()?;
                            props.push(ObjPatProp::KeyValue {
                                key,
                                value,
                                shorthand: false,
                                span: self.span_from(plo),
                            });
                        } else {
                            let id = match &key {
                                PropKey::Ident(i) => i.clone(),
                                _ => return fail("expected ':' in object pattern", self.here()),
                            };
                            let value = if self.eat(Token::Eq) {
                                let default = Box::new(self.assign_expr()?);
                                Pat::Default {
                                    inner: Box::new(Pat::Ident(id)),
                                    default,
                                    span: self.span_from(plo),
                                }
                            } else {
                                Pat::Ident(id)
                            };
                            props.push(ObjPatProp::KeyValue {
                                key,
                                value,
                                shorthand: true,
                                span: self.span_from(plo),
                            });
                        }
                    }
                    if !self.eat(Token::Comma) {
                        self.expect(Token::RBrace, "'}'")?;
                        break;
                    }
                }
                Ok(Pat::Object { props, span: self.span_from(lo) })
            }
            _ => fail("expected a binding pattern", self.here()),
        }
    }

    fn prop_key(&mut self) -> PResult<PropKey> {
        match self.peek() {
            Some(Token::Ident) => Ok(PropKey::Ident(self.ident()?)),
            Some(Token::Str) => Ok(PropKey::Str(self.str_lit()?)),
            Some(Token::Num) => {
                let t = self.bump();
                Ok(PropKey::Num(NumLit {
                    raw: self.slice(t).to_string(),
                    span: Span::new(t.lo, t.hi, self.origin),
                }))
            }
            Some(Token::PrivateIdent) => {
                let t = self.bump();
                Ok(PropKey::Private(Ident {
                    name: self.slice(t)[1..].to_string(),
                    span: Span::new(t.lo, t.hi, self.origin),
                }))
            }
            Some(Token::LBracket) => {
                self.bump();
                let e = self.assign_expr()?;
                self.expect(Token::RBracket, "']'")?;
                Ok(PropKey::Computed(Box::new(e)))
            }
            _ => fail("expected a property key", self.here()),
        }
    }

    // ---- classes ----

    fn class_decl(&mut self) -> PResult<ClassDecl> {
        let lo = self.here();
        self.bump();
        let id = self.ident()?;
        let superclass = if self.eat_kw("extends") { Some(self.postfix_expr()?) } else { None };
        self.expect(Token::LBrace, "'{'")?;
        let mut members = Vec::new();
        while !self.eat(Token::RBrace) {
            if self.eat(Token::Semi) {
                continue;
            }
            let mlo = self.here();
            let is_static = self.is_kw("static")
                && !matches!(self.peek_at(1), Some(Token::LParen) | Some(Token::Eq));
            if is_static {
                self.bump();
            }
            let key = self.prop_key()?;
            if self.peek() == Some(Token::LParen) {
                let params = self.params()?;
                let body = self.block()?;
                let func = Func { id: None, params, body, span: self.span_from(mlo) };
                members.push(ClassMember::Method { key, func, is_static, span: self.span_from(mlo) });
            } else {
                let value = if self.eat(Token::Eq) { Some(self.assign_expr()?) } else { None };
                self.eat(Token::Semi);
                members.push(ClassMember::Field { key, value, is_static, span: self.span_from(mlo) });
            }
        }
        Ok(ClassDecl { id, superclass, members, span: self.span_from(lo) })
    }

    // ---- modules ----

    fn import_decl(&mut self) -> PResult<ImportDecl> {
        let lo = self.here();
        self.bump();
        let mut specs = Vec::new();
        if self.peek() == Some(Token::Str) {
            let source = self.str_lit()?;
            self.eat(Token::Semi);
            return Ok(ImportDecl { specs, source, span: self.span_from(lo) });
        }
        if self.peek() == Some(Token::Ident) && !self.is_kw("from") {
            specs.push(ImportSpec::Default(self.ident()?));
            if self.eat(Token::Comma) {
                self.import_clause_rest(&mut specs)?;
            }
        } else {
            self.import_clause_rest(&mut specs)?;
        }
        self.expect_kw("from")?;
        let source = self.str_lit()?;
        self.eat(Token::Semi);
        Ok(ImportDecl { specs, source, span: self.span_from(lo) })
    }

    fn import_clause_rest(&mut self, specs: &mut Vec<ImportSpec>) -> PResult<()> {
        if self.eat(Token::Star) {
            self.expect_kw("as")?;
            specs.push(ImportSpec::Namespace(self.ident()?));
            return Ok(());
        }
        self.expect(Token::LBrace, "'{' in import")?;
        while !self.eat(Token::RBrace) {
            let imported = self.module_name()?;
            let local = if self.eat_kw("as") {
                self.ident()?
            } else {
                match &imported {
                    ModuleName::Ident(i) => i.clone(),
                    ModuleName::Str(s) => {
                        return fail("string import names need 'as'", s.span.lo);
                    }
                }
            };
            specs.push(ImportSpec::Named { imported, local });
            if !self.eat(Token::Comma) {
                self.expect(Token::RBrace, "'}'")?;
                break;
            }
        }
        Ok(())
    }

    fn module_name(&mut self) -> PResult<ModuleName> {
        match self.peek() {
            Some(Token::Str) => Ok(ModuleName::Str(self.str_lit()?)),
            _ => Ok(ModuleName::Ident(self.ident()?)),
        }
    }

    fn export_decl(&mut self) -> PResult<Stmt> {
        let lo = self.here();
        self.bump();
        if self.eat_kw("default") {
            let expr = self.assign_expr()?;
            self.eat(Token::Semi);
            return Ok(Stmt::ExportDefault { expr, span: self.span_from(lo) });
        }
        if self.eat(Token::LBrace) {
            let mut specs = Vec::new();
            while !self.eat(Token::RBrace) {
                let local = self.ident()?;
                let exported = if self.eat_kw("as") { Some(self.module_name()?) } else { None };
                specs.push(ExportSpec { local, exported });
                if !self.eat(Token::Comma) {
                    self.expect(Token::RBrace, "'}'")?;
                    break;
                }
            }
            if self.is_kw("from") {
                return fail("re-exports are not supported", self.here());
            }
            self.eat(Token::Semi);
            return Ok(Stmt::ExportNamed { specs, span: self.span_from(lo) });
        }
        let decl = self.stmt()?;
        match &decl {
            Stmt::VarDecl { .. } | Stmt::Func(_) | Stmt::Class(_) => {}
            _ => return fail("expected a declaration after 'export'", decl.span().lo),
        }
        Ok(Stmt::ExportDecl { decl: Box::new(decl), span: self.span_from(lo) })
    }

    // ---- expressions ----

    fn expr(&mut self) -> PResult<Expr> {
        let lo = self.here();
        let first = self.assign_expr()?;
        if self.peek() != Some(Token::Comma) {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.eat(Token::Comma) {
            exprs.push(self.assign_expr()?);
        }
        Ok(Expr::Seq { exprs, span: self.span_from(lo) })
    }

    fn assign_expr(&mut self) -> PResult<Expr> {
        if let Some(arrow) = self.arrow()? {
            return Ok(arrow);
        }
        let lo = self.here();
        let lhs = self.cond_expr()?;
        let op = match self.peek() {
            Some(Token::Eq) => AssignOp::Assign,
            Some(Token::PlusEq) => AssignOp::AddAssign,
            Some(Token::MinusEq) => AssignOp::SubAssign,
            Some(Token::StarEq) => AssignOp::MulAssign,
            Some(Token::SlashEq) => AssignOp::DivAssign,
            _ => return Ok(lhs),
        };
        if !matches!(lhs, Expr::Ident(_) | Expr::Member(_)) {
            return fail("invalid assignment target", lhs.span().lo);
        }
        self.bump();
        let value = Box::new(self.assign_expr()?);
        Ok(Expr::Assign { op, target: Box::new(lhs), value, span: self.span_from(lo) })
    }

    /// Arrow-function lookahead: commits only when a parameter list is
    /// followed by `=>`, otherwise rewinds and lets ordinary expression
    /// parsing proceed.
    fn arrow(&mut self) -> PResult<Option<Expr>> {
        let start = self.pos;
        let prev_hi = self.prev_hi;
        let lo = self.here();
        let params = match self.peek() {
            Some(Token::Ident) if self.peek_at(1) == Some(Token::Arrow) => {
                vec![Pat::Ident(self.ident()?)]
            }
            Some(Token::LParen) => match self.params() {
                Ok(ps) if self.peek() == Some(Token::Arrow) => ps,
                _ => {
                    self.pos = start;
                    self.prev_hi = prev_hi;
                    return Ok(None);
                }
            },
            _ => return Ok(None),
        };
        self.expect(Token::Arrow, "'=>'")?;
        let body = if self.peek() == Some(Token::LBrace) {
            ArrowBody::Block(self.block()?)
        } else {
            ArrowBody::Expr(Box::new(self.assign_expr()?))
        };
        Ok(Some(Expr::Arrow { params, body, span: self.span_from(lo) }))
    }

    fn cond_expr(&mut self) -> PResult<Expr> {
        let lo = self.here();
        let test = self.nullish_expr()?;
        if !self.eat(Token::Question) {
            return Ok(test);
        }
        let cons = Box::new(self.assign_expr()?);
        self.expect(Token::Colon, "':'")?;
        let alt = Box::new(self.assign_expr()?);
        Ok(Expr::Cond { test: Box::new(test), cons, alt, span: self.span_from(lo) })
    }

    fn nullish_expr(&mut self) -> PResult<Expr> {
        let lo = self.here();
        let mut e = self.or_expr()?;
        while self.eat(Token::Nullish) {
            let rhs = Box::new(self.or_expr()?);
            e = Expr::Logical {
                op: LogicalOp::Nullish,
                lhs: Box::new(e),
                rhs,
                span: self.span_from(lo),
            };
        }
        Ok(e)
    }

    fn or_expr(&mut self) -> PResult<Expr> {
        let lo = self.here();
        let mut e = self.and_expr()?;
        while self.eat(Token::OrOr) {
            let rhs = Box::new(self.and_expr()?);
            e = Expr::Logical { op: LogicalOp::Or, lhs: Box::new(e), rhs, span: self.span_from(lo) };
        }
        Ok(e)
    }

    fn and_expr(&mut self) -> PResult<Expr> {
        let lo = self.here();
        let mut e = self.equality_expr()?;
        while self.eat(Token::AndAnd) {
            let rhs = Box::new(self.equality_expr()?);
            e = Expr::Logical { op: LogicalOp::And, lhs: Box::new(e), rhs, span: self.span_from(lo) };
        }
        Ok(e)
    }

    fn equality_expr(&mut self) -> PResult<Expr> {
        let lo = self.here();
        let mut e = self.relational_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::EqEq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                Some(Token::StrictEq) => BinaryOp::StrictEq,
                Some(Token::StrictNotEq) => BinaryOp::StrictNotEq,
                _ => return Ok(e),
            };
            self.bump();
            let rhs = Box::new(self.relational_expr()?);
            e = Expr::Binary { op, lhs: Box::new(e), rhs, span: self.span_from(lo) };
        }
    }

    fn relational_expr(&mut self) -> PResult<Expr> {
        let lo = self.here();
        let mut e = self.additive_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => return Ok(e),
            };
            self.bump();
            let rhs = Box::new(self.additive_expr()?);
            e = Expr::Binary { op, lhs: Box::new(e), rhs, span: self.span_from(lo) };
        }
    }

    fn additive_expr(&mut self) -> PResult<Expr> {
        let lo = self.here();
        let mut e = self.multiplicative_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(e),
            };
            self.bump();
            let rhs = Box::new(self.multiplicative_expr()?);
            e = Expr::Binary { op, lhs: Box::new(e), rhs, span: self.span_from(lo) };
        }
    }

    fn multiplicative_expr(&mut self) -> PResult<Expr> {
        let lo = self.here();
        let mut e = self.unary_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(e),
            };
            self.bump();
            let rhs = Box::new(self.unary_expr()?);
            e = Expr::Binary { op, lhs: Box::new(e), rhs, span: self.span_from(lo) };
        }
    }

    fn unary_expr(&mut self) -> PResult<Expr> {
        let lo = self.here();
        let op = match self.peek() {
            Some(Token::Bang) => Some(UnaryOp::Not),
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Plus) => Some(UnaryOp::Plus),
            Some(Token::Ident) if self.cur_text() == "typeof" => Some(UnaryOp::Typeof),
            Some(Token::Ident) if self.cur_text() == "void" => Some(UnaryOp::Void),
            _ => None,
        };
        match op {
            Some(op) => {
                self.bump();
                let arg = Box::new(self.unary_expr()?);
                Ok(Expr::Unary { op, arg, span: self.span_from(lo) })
            }
            None => self.postfix_expr(),
        }
    }

    fn postfix_expr(&mut self) -> PResult<Expr> {
        let lo = self.here();
        let mut e = self.primary_expr()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.bump();
                    let prop = match self.peek() {
                        Some(Token::PrivateIdent) => {
                            let t = self.bump();
                            MemberProp::Private(Ident {
                                name: self.slice(t)[1..].to_string(),
                                span: Span::new(t.lo, t.hi, self.origin),
                            })
                        }
                        Some(Token::Ident) => MemberProp::Ident(self.ident()?),
                        _ => return fail("expected a property name after '.'", self.here()),
                    };
                    e = Expr::Member(Member {
                        obj: Box::new(e),
                        prop,
                        span: self.span_from(lo),
                    });
                }
                Some(Token::LBracket) => {
                    self.bump();
                    let key = self.expr()?;
                    self.expect(Token::RBracket, "']'")?;
                    e = Expr::Member(Member {
                        obj: Box::new(e),
                        prop: MemberProp::Computed(Box::new(key)),
                        span: self.span_from(lo),
                    });
                }
                Some(Token::LParen) => {
                    self.bump();
                    let mut args = Vec::new();
                    while !self.eat(Token::RParen) {
                        let alo = self.here();
                        if self.eat(Token::Ellipsis) {
                            let a = self.assign_expr()?;
                            args.push(Arg::Spread(a, self.span_from(alo)));
                        } else {
                            args.push(Arg::Expr(self.assign_expr()?));
                        }
                        if !self.eat(Token::Comma) {
                            self.expect(Token::RParen, "')'")?;
                            break;
                        }
                    }
                    e = Expr::Call { callee: Box::new(e), args, span: self.span_from(lo) };
                }
                _ => return Ok(e),
            }
        }
    }

    fn primary_expr(&mut self) -> PResult<Expr> {
        let lo = self.here();
        match self.peek() {
            Some(Token::Ident) => match self.cur_text() {
                "function" => {
                    self.bump();
                    let f = self.function(lo, false)?;
                    Ok(Expr::Fn(Box::new(f)))
                }
                "true" => {
                    self.bump();
                    Ok(Expr::Bool(true, self.span_from(lo)))
                }
                "false" => {
                    self.bump();
                    Ok(Expr::Bool(false, self.span_from(lo)))
                }
                "null" => {
                    self.bump();
                    Ok(Expr::Null(self.span_from(lo)))
                }
                "this" => {
                    self.bump();
                    Ok(Expr::This(self.span_from(lo)))
                }
                "new" | "class" => {
                    fail(format!("'{}' expressions are not supported", self.cur_text()), lo)
                }
                _ => Ok(Expr::Ident(self.ident()?)),
            },
            Some(Token::Num) => {
                let t = self.bump();
                Ok(Expr::Num(NumLit {
                    raw: self.slice(t).to_string(),
                    span: Span::new(t.lo, t.hi, self.origin),
                }))
            }
            Some(Token::Str) => {
                let t = self.bump();
                Ok(Expr::Str(self.str_lit_of(t)))
            }
            Some(Token::Template) => {
                let t = self.bump();
                self.template_lit(t)
            }
            Some(Token::LParen) => {
                self.bump();
                let e = self.expr()?;
                self.expect(Token::RParen, "')'")?;
                // No parenthesized node: the printer re-derives grouping
                // from precedence.
                Ok(e)
            }
            Some(Token::LBracket) => {
                self.bump();
                let mut elems = Vec::new();
                loop {
                    if self.eat(Token::RBracket) {
                        break;
                    }
                    if self.eat(Token::Comma) {
                        elems.push(None);
                        continue;
                    }
                    let alo = self.here();
                    if self.eat(Token::Ellipsis) {
                        let a = self.assign_expr()?;
                        elems.push(Some(Arg::Spread(a, self.span_from(alo))));
                    } else {
                        elems.push(Some(Arg::Expr(self.assign_expr()?)));
                    }
                    if !self.eat(Token::Comma) {
                        self.expect(Token::RBracket, "']'")?;
                        break;
                    }
                }
                Ok(Expr::Array { elems, span: self.span_from(lo) })
            }
            Some(Token::LBrace) => {
                self.bump();
                let mut props = Vec::new();
                while !self.eat(Token::RBrace) {
                    let plo = self.here();
                    if self.eat(Token::Ellipsis) {
                        let expr = self.assign_expr()?;
                        props.push(ObjProp::Spread { expr, span: self.span_from(plo) });
                    } else {
                        let key = self.prop_key()?;
                        if self.peek() == Some(Token::LParen) {
                            let params = self.params()?;
                            let body = self.block()?;
                            let func = Func { id: None, params, body, span: self.span_from(plo) };
                            props.push(ObjProp::Method { key, func, span: self.span_from(plo) });
                        } else if self.eat(Token::Colon) {
                            let value = self.assign_expr()?;
                            props.push(ObjProp::KeyValue { key, value, span: self.span_from(plo) });
                        } else {
                            let id = match key {
                                PropKey::Ident(i) => i,
                                _ => return fail("expected ':' after property key", self.here()),
                            };
                            props.push(ObjProp::Shorthand { id, span: self.span_from(plo) });
                        }
                    }
                    if !self.eat(Token::Comma) {
                        self.expect(Token::RBrace, "'}'")?;
                        break;
                    }
                }
                Ok(Expr::Object { props, span: self.span_from(lo) })
            }
            _ => fail("expected an expression", self.here()),
        }
    }

    // ---- template literals ----

    /// Split a template token into chunks and interpolations; each
    /// interpolation is re-lexed and parsed at its absolute offset.
    fn template_lit(&mut self, tok: Tok) -> PResult<Expr> {
        let bytes = self.text.as_bytes();
        let body_end = tok.hi as usize - 1;
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let mut chunk_lo = tok.lo as usize + 1;
        let mut i = chunk_lo;
        while i < body_end {
            match bytes[i] {
                b'\\' => i += 2,
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    quasis.push(self.tpl_chunk(chunk_lo, i));
                    let expr_lo = i + 2;
                    let expr_hi = tpl_expr_end(bytes, expr_lo);
                    let slice = &self.text[expr_lo..expr_hi];
                    let (toks, _) = tokenize(slice, expr_lo as u32, self.origin)?;
                    let mut sub = Parser::new(self.text, toks, self.origin);
                    let e = sub.expr()?;
                    if !sub.at_end() {
                        return fail("unexpected input in template expression", sub.here());
                    }
                    exprs.push(e);
                    chunk_lo = expr_hi + 1;
                    i = chunk_lo;
                }
                _ => i += 1,
            }
        }
        quasis.push(self.tpl_chunk(chunk_lo, body_end));
        Ok(Expr::Tpl(Tpl {
            quasis,
            exprs,
            span: Span::new(tok.lo, tok.hi, self.origin),
        }))
    }

    fn tpl_chunk(&self, lo: usize, hi: usize) -> TplChunk {
        let raw = self.text[lo..hi].to_string();
        TplChunk {
            cooked: unescape(&raw),
            raw,
            span: Span::new(lo as u32, hi as u32, self.origin),
        }
    }
}

/// Find the `}` closing a `${` whose body starts at `start`. The lexer has
/// already validated the template, so this cannot run off the end.
fn tpl_expr_end(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0u32;
    let mut i = start;
    loop {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                if depth == 0 {
                    return i;
                }
                depth -= 1;
            }
            b'`' => {
                // Nested template: skip it whole.
                i = skip_template(bytes, i + 1);
            }
            q @ (b'\'' | b'"') => {
                i += 1;
                while bytes[i] != q {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
}

/// Skip to the backtick closing a template whose body starts at `start`;
/// returns its index.
fn skip_template(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    loop {
        match bytes[i] {
            b'\\' => i += 1,
            b'`' => return i,
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                i = tpl_expr_end(bytes, i + 2);
            }
            _ => {}
        }
        i += 1;
    }
}

/// Cook a string or template chunk: resolve backslash escapes.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => out.push_str(&hex),
                }
            }
            Some('u') => {
                let mut rest = chars.clone();
                if rest.next() == Some('{') {
                    let hex: String = rest.by_ref().take_while(|c| *c != '}').collect();
                    if let Some(c) =
                        u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
                    {
                        out.push(c);
                        // 'u', '{', hex, '}'
                        for _ in 0..hex.len() + 2 {
                            chars.next();
                        }
                        continue;
                    }
                }
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => out.push_str(&hex),
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn prog(src: &str) -> Program {
        parse_program(src).unwrap()
    }

    fn expr(src: &str) -> Expr {
        parse_expr_text(src, SpanSrc::File).unwrap()
    }

    #[test]
    fn member_chains() {
        match expr("a.b['c']") {
            Expr::Member(m) => {
                assert!(matches!(m.prop, MemberProp::Computed(_)));
                match *m.obj {
                    Expr::Member(inner) => {
                        assert!(matches!(inner.prop, MemberProp::Ident(ref i) if i.name == "b"));
                        assert!(matches!(*inner.obj, Expr::Ident(ref i) if i.name == "a"));
                    }
                    other => panic!("bad object: {other:?}"),
                }
            }
            other => panic!("not a member: {other:?}"),
        }
    }

    #[test]
    fn private_member() {
        match expr("a.#b") {
            Expr::Member(m) => assert!(matches!(m.prop, MemberProp::Private(ref i) if i.name == "b")),
            other => panic!("not a member: {other:?}"),
        }
    }

    #[test]
    fn var_decl_with_patterns() {
        let p = prog("var { a, b: [c, ...d] = x } = o, e;");
        match &p.body[0] {
            Stmt::VarDecl { kind, decls, .. } => {
                assert_eq!(*kind, DeclKind::Var);
                assert_eq!(decls.len(), 2);
                assert!(matches!(decls[0].id, Pat::Object { .. }));
                assert!(decls[1].init.is_none());
            }
            other => panic!("bad stmt: {other:?}"),
        }
    }

    #[test]
    fn imports_and_exports() {
        let p = prog("import d, { a, b as c } from 'm';\nexport { a as out };\nexport default a.b;");
        assert!(matches!(&p.body[0], Stmt::Import(i) if i.specs.len() == 3));
        assert!(matches!(&p.body[1], Stmt::ExportNamed { specs, .. } if specs.len() == 1));
        assert!(matches!(&p.body[2], Stmt::ExportDefault { .. }));
    }

    #[test]
    fn arrow_vs_parens() {
        assert!(matches!(expr("(a, b) => a + b"), Expr::Arrow { .. }));
        assert!(matches!(expr("(a, b)"), Expr::Seq { .. }));
        assert!(matches!(expr("x => ({ x })"), Expr::Arrow { .. }));
    }

    #[test]
    fn template_interpolation() {
        match expr("`a${x.y}b${z}`") {
            Expr::Tpl(t) => {
                assert_eq!(t.quasis.len(), 3);
                assert_eq!(t.exprs.len(), 2);
                assert_eq!(t.quasis[0].cooked, "a");
                assert!(matches!(t.exprs[0], Expr::Member(_)));
            }
            other => panic!("not a template: {other:?}"),
        }
    }

    #[test]
    fn assignment_targets() {
        assert!(matches!(expr("a.b = 1"), Expr::Assign { .. }));
        assert!(parse_expr_text("1 = 2", SpanSrc::File).is_err());
    }

    #[test]
    fn error_has_location() {
        let e = parse_program("var x = ;\n").unwrap_err();
        assert_eq!(e.line, 1);
        assert_eq!(e.col, 8);
    }

    #[test]
    fn comments_collected() {
        let p = prog("// lead\nvar x = 1; /* tail */");
        assert_eq!(p.comments.len(), 2);
        assert_eq!(p.comments[0].text, "// lead");
    }

    #[test]
    fn class_members() {
        let p = prog("class C extends B { static f = 1; m(a) { return a; } #p = 2; }");
        match &p.body[0] {
            Stmt::Class(c) => {
                assert_eq!(c.members.len(), 3);
                assert!(matches!(
                    c.members[0],
                    ClassMember::Field { is_static: true, .. }
                ));
                assert!(matches!(c.members[1], ClassMember::Method { .. }));
                assert!(matches!(
                    c.members[2],
                    ClassMember::Field { key: PropKey::Private(_), .. }
                ));
            }
            other => panic!("bad stmt: {other:?}"),
        }
    }
}
