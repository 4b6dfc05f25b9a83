//! Printer: tree back to text, plus a source map.
//!
//! The printer normalises layout (fixed indentation, one statement per
//! line, precedence-derived parentheses) rather than preserving input
//! bytes; the source map, not textual identity, ties output to input. A
//! mapping is recorded for every keyword, identifier, and literal emitted:
//! nodes from the transformed file map to their original position, nodes
//! cloned out of the substitution table map to a synthetic position inside
//! the configuration entry's value text.

use super::*;

/// Where a generated position came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// The transformed source file.
    Source,
    /// The value text of configuration entry `i`.
    Mapping(u32),
}

/// A resolved source location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SrcLoc {
    /// Which text `line`/`col` index into.
    pub origin: Origin,
    /// 1-based line.
    pub line: u32,
    /// 0-based byte column.
    pub col: u32,
}

/// One generated-to-source mapping.
#[derive(Clone, Copy, Debug)]
pub struct Mapping {
    /// 1-based generated line.
    pub gen_line: u32,
    /// 0-based generated byte column.
    pub gen_col: u32,
    /// The source location.
    pub loc: SrcLoc,
}

/// The source map for one printed file.
#[derive(Clone, Debug, Default)]
pub struct SourceMap {
    mappings: Vec<Mapping>,
}

impl SourceMap {
    /// Resolve a generated position: the nearest mapping at or before
    /// `col` on `line` (standard source-map consumer semantics).
    pub fn resolve(&self, line: u32, col: u32) -> Option<&SrcLoc> {
        self.mappings
            .iter()
            .rev()
            .find(|m| m.gen_line == line && m.gen_col <= col)
            .map(|m| &m.loc)
    }

    /// All mappings, in generated order.
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }
}

/// Print `program`. `file` indexes the transformed file's text; `config`
/// indexes each configuration entry's value text, in entry order.
pub fn print(program: &Program, file: &LineIndex, config: &[LineIndex]) -> (String, SourceMap) {
    let mut p = Printer {
        out: String::new(),
        line: 1,
        col: 0,
        map: SourceMap::default(),
        file,
        config,
        comments: &program.comments,
        next_comment: 0,
        indent: 0,
    };
    for s in &program.body {
        p.stmt(s);
    }
    p.flush_comments(u32::MAX);
    (p.out, p.map)
}

struct Printer<'a> {
    out: String,
    line: u32,
    col: u32,
    map: SourceMap,
    file: &'a LineIndex,
    config: &'a [LineIndex],
    comments: &'a [Comment],
    next_comment: usize,
    indent: usize,
}

impl<'a> Printer<'a> {
    fn raw(&mut self, s: &str) {
        for b in s.bytes() {
            if b == b'\n' {
                self.line += 1;
                self.col = 0;
            } else {
                self.col += 1;
            }
        }
        self.out.push_str(s);
    }

    fn resolve(&self, span: Span) -> SrcLoc {
        match span.src {
            SpanSrc::File => {
                let (line, col) = self.file.loc(span.lo);
                SrcLoc { origin: Origin::Source, line, col }
            }
            SpanSrc::Config(i) => {
                let (line, col) = match self.config.get(i as usize) {
                    Some(idx) => idx.loc(span.lo),
                    None => (1, 0),
                };
                SrcLoc { origin: Origin::Mapping(i), line, col }
            }
        }
    }

    /// Emit `text` with a mapping for its first byte.
    fn word(&mut self, text: &str, span: Span) {
        let loc = self.resolve(span);
        self.map.mappings.push(Mapping { gen_line: self.line, gen_col: self.col, loc });
        self.raw(text);
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.raw("  ");
        }
    }

    /// Emit all not-yet-printed comments that start before `before`.
    fn flush_comments(&mut self, before: u32) {
        while let Some(c) = self.comments.get(self.next_comment) {
            if c.span.lo >= before {
                break;
            }
            self.next_comment += 1;
            self.write_indent();
            self.word(&c.text, c.span);
            self.raw("\n");
        }
    }

    // ---- statements ----

    fn stmt(&mut self, s: &Stmt) {
        if s.span().src == SpanSrc::File {
            self.flush_comments(s.span().lo);
        }
        self.write_indent();
        self.stmt_body(s);
        self.raw("\n");
    }

    /// Statement text without leading indent or trailing newline.
    fn stmt_body(&mut self, s: &Stmt) {
        match s {
            Stmt::Expr { expr, .. } => {
                if needs_stmt_parens(expr) {
                    self.raw("(");
                    self.expr(expr, 0);
                    self.raw(")");
                } else {
                    self.expr(expr, 0);
                }
                self.raw(";");
            }
            Stmt::VarDecl { kind, decls, span } => {
                self.word(kind.as_str(), *span);
                self.raw(" ");
                for (i, d) in decls.iter().enumerate() {
                    if i > 0 {
                        self.raw(", ");
                    }
                    self.pat(&d.id);
                    if let Some(init) = &d.init {
                        self.raw(" = ");
                        self.expr(init, 2);
                    }
                }
                self.raw(";");
            }
            Stmt::Func(f) => self.func(f, true),
            Stmt::Class(c) => self.class(c),
            Stmt::Return { arg, span } => {
                self.word("return", *span);
                if let Some(a) = arg {
                    self.raw(" ");
                    self.expr(a, 0);
                }
                self.raw(";");
            }
            Stmt::If { test, cons, alt, span } => self.if_stmt(test, cons, alt.as_deref(), *span),
            Stmt::While { test, body, span } => {
                self.word("while", *span);
                self.raw(" (");
                self.expr(test, 0);
                self.raw(") ");
                self.braced(body);
            }
            Stmt::Block { body, .. } => {
                self.raw("{\n");
                self.indent += 1;
                for st in body {
                    self.stmt(st);
                }
                self.indent -= 1;
                self.write_indent();
                self.raw("}");
            }
            Stmt::Import(i) => self.import(i),
            Stmt::ExportNamed { specs, span } => {
                self.word("export", *span);
                self.raw(" { ");
                for (i, sp) in specs.iter().enumerate() {
                    if i > 0 {
                        self.raw(", ");
                    }
                    self.word(&sp.local.name, sp.local.span);
                    if let Some(e) = &sp.exported {
                        self.raw(" as ");
                        self.module_name(e);
                    }
                }
                self.raw(" };");
            }
            Stmt::ExportDefault { expr, span } => {
                self.word("export", *span);
                self.raw(" default ");
                self.expr(expr, 2);
                self.raw(";");
            }
            Stmt::ExportDecl { decl, span } => {
                self.word("export", *span);
                self.raw(" ");
                self.stmt_body(decl);
            }
            Stmt::Empty(_) => self.raw(";"),
        }
    }

    fn if_stmt(&mut self, test: &Expr, cons: &Stmt, alt: Option<&Stmt>, span: Span) {
        self.word("if", span);
        self.raw(" (");
        self.expr(test, 0);
        self.raw(") ");
        self.braced(cons);
        if let Some(a) = alt {
            self.raw(" else ");
            if let Stmt::If { test, cons, alt, span } = a {
                self.if_stmt(test, cons, alt.as_deref(), *span);
            } else {
                self.braced(a);
            }
        }
    }

    /// A statement body as a braced block (single statements get braces).
    fn braced(&mut self, s: &Stmt) {
        self.raw("{\n");
        self.indent += 1;
        match s {
            Stmt::Block { body, .. } => {
                for st in body {
                    self.stmt(st);
                }
            }
            other => self.stmt(other),
        }
        self.indent -= 1;
        self.write_indent();
        self.raw("}");
    }

    fn func(&mut self, f: &Func, decl: bool) {
        self.word("function", f.span);
        if let Some(id) = &f.id {
            self.raw(" ");
            self.word(&id.name, id.span);
        } else if decl {
            self.raw(" ");
        }
        self.params(&f.params);
        self.raw(" ");
        self.body(&f.body);
    }

    fn params(&mut self, params: &[Pat]) {
        self.raw("(");
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                self.raw(", ");
            }
            self.pat(p);
        }
        self.raw(")");
    }

    fn body(&mut self, stmts: &[Stmt]) {
        self.raw("{\n");
        self.indent += 1;
        for st in stmts {
            self.stmt(st);
        }
        self.indent -= 1;
        self.write_indent();
        self.raw("}");
    }

    fn class(&mut self, c: &ClassDecl) {
        self.word("class", c.span);
        self.raw(" ");
        self.word(&c.id.name, c.id.span);
        if let Some(sup) = &c.superclass {
            self.raw(" extends ");
            self.expr(sup, 11);
        }
        self.raw(" {\n");
        self.indent += 1;
        for m in &c.members {
            self.write_indent();
            match m {
                ClassMember::Method { key, func, is_static, .. } => {
                    if *is_static {
                        self.raw("static ");
                    }
                    self.prop_key(key);
                    self.params(&func.params);
                    self.raw(" ");
                    self.body(&func.body);
                }
                ClassMember::Field { key, value, is_static, .. } => {
                    if *is_static {
                        self.raw("static ");
                    }
                    self.prop_key(key);
                    if let Some(v) = value {
                        self.raw(" = ");
                        self.expr(v, 2);
                    }
                    self.raw(";");
                }
            }
            self.raw("\n");
        }
        self.indent -= 1;
        self.write_indent();
        self.raw("}");
    }

    fn import(&mut self, i: &ImportDecl) {
        self.word("import", i.span);
        self.raw(" ");
        if !i.specs.is_empty() {
            let mut named: Vec<&ImportSpec> = Vec::new();
            let mut first = true;
            for s in &i.specs {
                match s {
                    ImportSpec::Default(id) => {
                        if !first {
                            self.raw(", ");
                        }
                        self.word(&id.name, id.span);
                        first = false;
                    }
                    ImportSpec::Namespace(id) => {
                        if !first {
                            self.raw(", ");
                        }
                        self.raw("* as ");
                        self.word(&id.name, id.span);
                        first = false;
                    }
                    named_spec => named.push(named_spec),
                }
            }
            if !named.is_empty() {
                if !first {
                    self.raw(", ");
                }
                self.raw("{ ");
                for (j, s) in named.iter().enumerate() {
                    if j > 0 {
                        self.raw(", ");
                    }
                    if let ImportSpec::Named { imported, local } = s {
                        match imported {
                            ModuleName::Ident(id) if id.name == local.name => {
                                self.word(&local.name, local.span);
                            }
                            _ => {
                                self.module_name(imported);
                                self.raw(" as ");
                                self.word(&local.name, local.span);
                            }
                        }
                    }
                }
                self.raw(" }");
            }
            self.raw(" from ");
        }
        self.word(&i.source.raw, i.source.span);
        self.raw(";");
    }

    fn module_name(&mut self, m: &ModuleName) {
        match m {
            ModuleName::Ident(id) => {
                self.word(&id.name, id.span);
            }
            ModuleName::Str(s) => {
                self.word(&s.raw, s.span);
            }
        }
    }

    // ---- patterns ----

    fn pat(&mut self, p: &Pat) {
        match p {
            Pat::Ident(id) => {
                self.word(&id.name, id.span);
            }
            Pat::Default { inner, default, .. } => {
                self.pat(inner);
                self.raw(" = ");
                self.expr(default, 2);
            }
            Pat::Rest { inner, .. } => {
                self.raw("...");
                self.pat(inner);
            }
            Pat::Array { elems, .. } => {
                self.raw("[");
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        self.raw(", ");
                    }
                    if let Some(p) = e {
                        self.pat(p);
                    }
                }
                self.raw("]");
            }
            Pat::Object { props, .. } => {
                if props.is_empty() {
                    self.raw("{}");
                    return;
                }
                self.raw("{ ");
                for (i, prop) in props.iter().enumerate() {
                    if i > 0 {
                        self.raw(", ");
                    }
                    match prop {
                        ObjPatProp::KeyValue { key, value, shorthand, .. } => {
                            if *shorthand {
                                self.pat(value);
                            } else {
                                self.prop_key(key);
                                self.raw(": ");
                                self.pat(value);
                            }
                        }
                        ObjPatProp::Rest { pat, .. } => {
                            self.raw("...");
                            self.pat(pat);
                        }
                    }
                }
                self.raw(" }");
            }
        }
    }

    fn prop_key(&mut self, k: &PropKey) {
        match k {
            PropKey::Ident(id) => {
                self.word(&id.name, id.span);
            }
            PropKey::Str(s) => {
                self.word(&s.raw, s.span);
            }
            PropKey::Num(n) => {
                self.word(&n.raw, n.span);
            }
            PropKey::Computed(e) => {
                self.raw("[");
                self.expr(e, 1);
                self.raw("]");
            }
            PropKey::Private(id) => {
                let name = format!("#{}", id.name);
                self.word(&name, id.span);
            }
        }
    }

    // ---- expressions ----

    fn expr(&mut self, e: &Expr, min: u8) {
        if prec(e) < min {
            self.raw("(");
            self.expr_body(e);
            self.raw(")");
        } else {
            self.expr_body(e);
        }
    }

    fn expr_body(&mut self, e: &Expr) {
        match e {
            Expr::Ident(id) => {
                self.word(&id.name, id.span);
            }
            Expr::Str(s) => {
                self.word(&s.raw, s.span);
            }
            Expr::Num(n) => {
                self.word(&n.raw, n.span);
            }
            Expr::Bool(b, span) => self.word(if *b { "true" } else { "false" }, *span),
            Expr::Null(span) => self.word("null", *span),
            Expr::This(span) => self.word("this", *span),
            Expr::Tpl(t) => {
                self.word("`", t.span);
                for (i, chunk) in t.quasis.iter().enumerate() {
                    self.raw(&chunk.raw);
                    if let Some(ex) = t.exprs.get(i) {
                        self.raw("${");
                        self.expr(ex, 1);
                        self.raw("}");
                    }
                }
                self.raw("`");
            }
            Expr::Member(m) => {
                self.expr(&m.obj, 11);
                match &m.prop {
                    MemberProp::Ident(id) => {
                        self.raw(".");
                        self.word(&id.name, id.span);
                    }
                    MemberProp::Private(id) => {
                        self.raw(".");
                        let name = format!("#{}", id.name);
                        self.word(&name, id.span);
                    }
                    MemberProp::Computed(k) => {
                        self.raw("[");
                        self.expr(k, 1);
                        self.raw("]");
                    }
                }
            }
            Expr::Call { callee, args, .. } => {
                self.expr(callee, 11);
                self.raw("(");
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        self.raw(", ");
                    }
                    self.arg(a);
                }
                self.raw(")");
            }
            Expr::Unary { op, arg, .. } => {
                let sym = op.as_str();
                self.raw(sym);
                if sym.len() > 1 || matches!(**arg, Expr::Unary { .. }) {
                    self.raw(" ");
                }
                self.expr(arg, 10);
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let p = prec(e);
                self.expr(lhs, p);
                self.raw(" ");
                self.raw(op.as_str());
                self.raw(" ");
                self.expr(rhs, p + 1);
            }
            Expr::Logical { op, lhs, rhs, .. } => {
                let p = prec(e);
                self.expr(lhs, p);
                self.raw(" ");
                self.raw(op.as_str());
                self.raw(" ");
                self.expr(rhs, p + 1);
            }
            Expr::Cond { test, cons, alt, .. } => {
                self.expr(test, 4);
                self.raw(" ? ");
                self.expr(cons, 2);
                self.raw(" : ");
                self.expr(alt, 2);
            }
            Expr::Assign { op, target, value, .. } => {
                self.expr(target, 11);
                self.raw(" ");
                self.raw(op.as_str());
                self.raw(" ");
                self.expr(value, 2);
            }
            Expr::Seq { exprs, .. } => {
                for (i, ex) in exprs.iter().enumerate() {
                    if i > 0 {
                        self.raw(", ");
                    }
                    self.expr(ex, 2);
                }
            }
            Expr::Array { elems, .. } => {
                self.raw("[");
                for (i, el) in elems.iter().enumerate() {
                    if i > 0 {
                        self.raw(", ");
                    }
                    if let Some(a) = el {
                        self.arg(a);
                    }
                }
                self.raw("]");
            }
            Expr::Object { props, .. } => {
                if props.is_empty() {
                    self.raw("{}");
                    return;
                }
                self.raw("{ ");
                for (i, p) in props.iter().enumerate() {
                    if i > 0 {
                        self.raw(", ");
                    }
                    match p {
                        ObjProp::KeyValue { key, value, .. } => {
                            self.prop_key(key);
                            self.raw(": ");
                            self.expr(value, 2);
                        }
                        ObjProp::Shorthand { id, .. } => {
                            self.word(&id.name, id.span);
                        }
                        ObjProp::Method { key, func, .. } => {
                            self.prop_key(key);
                            self.params(&func.params);
                            self.raw(" ");
                            self.body(&func.body);
                        }
                        ObjProp::Spread { expr, .. } => {
                            self.raw("...");
                            self.expr(expr, 2);
                        }
                    }
                }
                self.raw(" }");
            }
            Expr::Fn(f) => self.func(f, false),
            Expr::Arrow { params, body, .. } => {
                match params.as_slice() {
                    [Pat::Ident(id)] => {
                        self.word(&id.name, id.span);
                    }
                    ps => {
                        self.raw("(");
                        for (i, p) in ps.iter().enumerate() {
                            if i > 0 {
                                self.raw(", ");
                            }
                            self.pat(p);
                        }
                        self.raw(")");
                    }
                }
                self.raw(" => ");
                match body {
                    ArrowBody::Expr(e) => {
                        if needs_stmt_parens(e) {
                            self.raw("(");
                            self.expr(e, 0);
                            self.raw(")");
                        } else {
                            self.expr(e, 2);
                        }
                    }
                    ArrowBody::Block(stmts) => self.body(stmts),
                }
            }
        }
    }

    fn arg(&mut self, a: &Arg) {
        match a {
            Arg::Expr(e) => self.expr(e, 2),
            Arg::Spread(e, _) => {
                self.raw("...");
                self.expr(e, 2);
            }
        }
    }
}

/// Binding strength, for parenthesisation. Higher binds tighter.
fn prec(e: &Expr) -> u8 {
    match e {
        Expr::Seq { .. } => 1,
        Expr::Assign { .. } | Expr::Arrow { .. } => 2,
        Expr::Cond { .. } => 3,
        Expr::Logical { op, .. } => match op {
            LogicalOp::Or | LogicalOp::Nullish => 4,
            LogicalOp::And => 5,
        },
        Expr::Binary { op, .. } => match op {
            BinaryOp::EqEq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => 6,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 7,
            BinaryOp::Add | BinaryOp::Sub => 8,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 9,
        },
        Expr::Unary { .. } => 10,
        Expr::Member(_) | Expr::Call { .. } => 11,
        _ => 12,
    }
}

/// Would this expression, at statement (or arrow-body) start, be misread
/// as a block or declaration? Checks the leftmost subexpression.
fn needs_stmt_parens(e: &Expr) -> bool {
    match e {
        Expr::Object { .. } | Expr::Fn(_) => true,
        Expr::Member(m) => needs_stmt_parens(&m.obj),
        Expr::Call { callee, .. } => needs_stmt_parens(callee),
        Expr::Binary { lhs, .. } | Expr::Logical { lhs, .. } => needs_stmt_parens(lhs),
        Expr::Cond { test, .. } => needs_stmt_parens(test),
        Expr::Assign { target, .. } => needs_stmt_parens(target),
        Expr::Seq { exprs, .. } => exprs.first().map(needs_stmt_parens).unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::super::parse::parse_program;
    use super::*;

    fn roundtrip(src: &str) -> String {
        let p = parse_program(src).unwrap();
        let idx = LineIndex::new(src);
        print(&p, &idx, &[]).0
    }

    #[test]
    fn statements_and_layout() {
        assert_eq!(
            roundtrip("if(a){b();}else c();"),
            "if (a) {\n  b();\n} else {\n  c();\n}\n"
        );
        assert_eq!(roundtrip("var x=1,y;"), "var x = 1, y;\n");
    }

    #[test]
    fn precedence_parens() {
        assert_eq!(roundtrip("(a + b) * c;"), "(a + b) * c;\n");
        assert_eq!(roundtrip("a + b * c;"), "a + b * c;\n");
        assert_eq!(roundtrip("a - (b - c);"), "a - (b - c);\n");
    }

    #[test]
    fn print_is_stable() {
        let srcs = [
            "import d, { a as b } from 'm';",
            "export { a as out };",
            "var { a, b: [c] } = o;",
            "x => x + 1;",
            "f(...xs, { k: 1, s, m() { return 1; } });",
            "`a${x.y}b`;",
            "class C { static f = 1; m() { return this; } }",
        ];
        for src in srcs {
            let once = roundtrip(src);
            assert_eq!(once, roundtrip(&once), "unstable print of {src}");
        }
    }

    #[test]
    fn object_statement_gets_parens() {
        assert_eq!(roundtrip("({ a: 1 });"), "({ a: 1 });\n");
    }

    #[test]
    fn comments_lead_statements() {
        assert_eq!(
            roundtrip("// one\nf();\n// two\ng();"),
            "// one\nf();\n// two\ng();\n"
        );
    }

    #[test]
    fn source_map_positions() {
        let src = "var a = 1;\nlog(a);";
        let p = parse_program(src).unwrap();
        let idx = LineIndex::new(src);
        let (out, map) = print(&p, &idx, &[]);
        assert_eq!(out, "var a = 1;\nlog(a);\n");
        // `log` starts at output (2, 0) and original (2, 0).
        let loc = map.resolve(2, 0).unwrap();
        assert_eq!((loc.origin, loc.line, loc.col), (Origin::Source, 2, 0));
        // `a` inside the call maps to its original column.
        let loc = map.resolve(2, 4).unwrap();
        assert_eq!((loc.origin, loc.line, loc.col), (Origin::Source, 2, 4));
    }
}
