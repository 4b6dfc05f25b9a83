//! The substitution engine: one traversal, replace-in-place.
//!
//! The engine owns the compiled [SubstitutionMap] and drives a single
//! depth-first pass per file. Every identifier and member chain is offered
//! outermost-first; a successful replacement stops descent into the
//! inserted subtree, so replacements are never re-scanned and a configured
//! outer path always beats its configured prefixes.

use fxhash::FxHashSet;
use log::debug;

use crate::ast::parse::parse_program;
use crate::ast::print::{print, SourceMap};
use crate::ast::scope::{self, ScopeStack};
use crate::ast::{
    Arg, ArrowBody, ClassMember, Expr, Func, LineIndex, MemberProp, ObjPatProp, ObjProp, Pat,
    Program, PropKey, Stmt,
};
use crate::canon;
use crate::cfg::Opt;
use crate::error::Error;
use crate::gate::{self, Role};
use crate::map::SubstitutionMap;

/// One transformed file.
#[derive(Debug)]
pub struct Output {
    /// The printed code.
    pub code: String,
    /// Positions in `code`, resolved back to the file or to configuration
    /// entry value text.
    pub map: SourceMap,
}

/// A configured engine. Compile once, transform any number of files.
pub struct Engine {
    map: SubstitutionMap,
    ignore_scope: bool,
}

impl Engine {
    /// Compile `opt` into an engine.
    pub fn new(opt: &Opt) -> Result<Self, Error> {
        let map = SubstitutionMap::compile(opt)?;
        debug!(target: "defsub::engine", "compiled {} entries: {}", map.len(), map);
        Ok(Engine { map, ignore_scope: opt.ignore_scope })
    }

    /// Rewrite a parsed tree in place.
    pub fn rewrite(&self, program: &mut Program) {
        let mut rw = Rewriter {
            map: &self.map,
            ignore_scope: self.ignore_scope,
            scope: ScopeStack::new(),
            hits: 0,
        };
        rw.scope.push();
        let mut names = FxHashSet::default();
        scope::hoisted_names(&program.body, &mut names);
        scope::lexical_names(&program.body, &mut names);
        rw.bind_all(&names);
        for s in &mut program.body {
            rw.stmt(s);
        }
        rw.scope.pop();
        debug!(target: "defsub::engine", "{} substitutions", rw.hits);
    }

    /// Parse `source`, rewrite it, and print the result. `file` only labels
    /// errors.
    pub fn transform(&self, source: &str, file: &str) -> Result<Output, Error> {
        let mut program = parse_program(source)
            .map_err(|inner| Error::BadSource { file: file.to_owned(), inner })?;
        self.rewrite(&mut program);
        let lines = LineIndex::new(source);
        let (code, map) = print(&program, &lines, self.map.value_lines());
        Ok(Output { code, map })
    }
}

struct Rewriter<'a> {
    map: &'a SubstitutionMap,
    ignore_scope: bool,
    scope: ScopeStack,
    hits: usize,
}

impl<'a> Rewriter<'a> {
    fn bind_all(&mut self, names: &FxHashSet<String>) {
        for n in names {
            self.scope.bind(n);
        }
    }

    /// Offer `e` for replacement. On success the node has been replaced by
    /// a clone of the mapped expression and descent must stop.
    fn offer(&mut self, e: &mut Expr, role: Role) -> bool {
        if gate::is_binding_position(role) {
            return false;
        }
        let path = match canon::of_expr(e) {
            Some(p) => p,
            None => return false,
        };
        let repl = match self.map.get(&path) {
            Some(r) => r,
            None => return false,
        };
        if !self.ignore_scope && self.scope.has_binding(canon::head(&path)) {
            debug!(target: "defsub::engine", "'{}' is shadowed here, skipping", path);
            return false;
        }
        debug!(target: "defsub::engine", "substituting '{}'", path);
        *e = repl.clone();
        self.hits += 1;
        true
    }

    fn stmt(&mut self, s: &mut Stmt) {
        match s {
            Stmt::Expr { expr, .. } => self.expr(expr),
            Stmt::VarDecl { decls, .. } => {
                for d in decls {
                    self.pat(&mut d.id);
                    if let Some(init) = &mut d.init {
                        self.expr(init);
                    }
                }
            }
            Stmt::Func(f) => self.func(f),
            Stmt::Class(c) => {
                if let Some(sup) = &mut c.superclass {
                    self.expr(sup);
                }
                for m in &mut c.members {
                    match m {
                        ClassMember::Method { key, func, .. } => {
                            self.prop_key(key);
                            self.func(func);
                        }
                        ClassMember::Field { key, value, .. } => {
                            self.prop_key(key);
                            if let Some(v) = value {
                                self.expr(v);
                            }
                        }
                    }
                }
            }
            Stmt::Return { arg, .. } => {
                if let Some(a) = arg {
                    self.expr(a);
                }
            }
            Stmt::If { test, cons, alt, .. } => {
                self.expr(test);
                self.stmt(cons);
                if let Some(a) = alt {
                    self.stmt(a);
                }
            }
            Stmt::While { test, body, .. } => {
                self.expr(test);
                self.stmt(body);
            }
            Stmt::Block { body, .. } => {
                self.scope.push();
                let mut names = FxHashSet::default();
                scope::lexical_names(body, &mut names);
                self.bind_all(&names);
                for st in body {
                    self.stmt(st);
                }
                self.scope.pop();
            }
            // Import and named-export specifiers only name bindings.
            Stmt::Import(_) | Stmt::ExportNamed { .. } => {}
            Stmt::ExportDefault { expr, .. } => self.expr(expr),
            Stmt::ExportDecl { decl, .. } => self.stmt(decl),
            Stmt::Empty(_) => {}
        }
    }

    fn func(&mut self, f: &mut Func) {
        self.scope.push();
        let mut names = FxHashSet::default();
        if let Some(id) = &f.id {
            names.insert(id.name.clone());
        }
        for p in &f.params {
            scope::pattern_names(p, &mut names);
        }
        scope::hoisted_names(&f.body, &mut names);
        scope::lexical_names(&f.body, &mut names);
        self.bind_all(&names);
        for p in &mut f.params {
            self.pat(p);
        }
        for st in &mut f.body {
            self.stmt(st);
        }
        self.scope.pop();
    }

    fn arrow(&mut self, params: &mut [Pat], body: &mut ArrowBody) {
        self.scope.push();
        let mut names = FxHashSet::default();
        for p in params.iter() {
            scope::pattern_names(p, &mut names);
        }
        if let ArrowBody::Block(stmts) = body {
            scope::hoisted_names(stmts, &mut names);
            scope::lexical_names(stmts, &mut names);
        }
        self.bind_all(&names);
        for p in params {
            self.pat(p);
        }
        match body {
            ArrowBody::Expr(e) => self.expr(e),
            ArrowBody::Block(stmts) => {
                for st in stmts {
                    self.stmt(st);
                }
            }
        }
        self.scope.pop();
    }

    /// Visit the non-binding slots of a pattern: default values and
    /// computed keys are reads, the bound names are not.
    fn pat(&mut self, p: &mut Pat) {
        match p {
            Pat::Ident(_) => {}
            Pat::Default { inner, default, .. } => {
                self.pat(inner);
                self.expr(default);
            }
            Pat::Rest { inner, .. } => self.pat(inner),
            Pat::Array { elems, .. } => {
                for e in elems.iter_mut().flatten() {
                    self.pat(e);
                }
            }
            Pat::Object { props, .. } => {
                for prop in props {
                    match prop {
                        ObjPatProp::KeyValue { key, value, .. } => {
                            self.prop_key(key);
                            self.pat(value);
                        }
                        ObjPatProp::Rest { pat, .. } => self.pat(pat),
                    }
                }
            }
        }
    }

    fn prop_key(&mut self, k: &mut PropKey) {
        // Only computed keys are reads.
        if let PropKey::Computed(e) = k {
            self.expr(e);
        }
    }

    fn expr(&mut self, e: &mut Expr) {
        if matches!(e, Expr::Ident(_) | Expr::Member(_)) && self.offer(e, Role::Read) {
            return;
        }
        match e {
            Expr::Ident(_)
            | Expr::Str(_)
            | Expr::Num(_)
            | Expr::Bool(..)
            | Expr::Null(_)
            | Expr::This(_) => {}
            Expr::Tpl(t) => {
                for x in &mut t.exprs {
                    self.expr(x);
                }
            }
            Expr::Member(m) => {
                // The whole chain was offered above and declined; the
                // object position is still an independent candidate.
                self.expr(&mut m.obj);
                if let MemberProp::Computed(k) = &mut m.prop {
                    self.expr(k);
                }
            }
            Expr::Call { callee, args, .. } => {
                self.expr(callee);
                for a in args {
                    self.arg(a);
                }
            }
            Expr::Unary { arg, .. } => self.expr(arg),
            Expr::Binary { lhs, rhs, .. } | Expr::Logical { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            Expr::Cond { test, cons, alt, .. } => {
                self.expr(test);
                self.expr(cons);
                self.expr(alt);
            }
            Expr::Assign { target, value, .. } => {
                self.assign_target(target);
                self.expr(value);
            }
            Expr::Seq { exprs, .. } => {
                for x in exprs {
                    self.expr(x);
                }
            }
            Expr::Array { elems, .. } => {
                for el in elems.iter_mut().flatten() {
                    self.arg(el);
                }
            }
            Expr::Object { props, .. } => {
                for p in props {
                    self.obj_prop(p);
                }
            }
            Expr::Fn(f) => self.func(f),
            Expr::Arrow { params, body, .. } => self.arrow(params, body),
        }
    }

    /// The target spine of an assignment, compound included, is blocked
    /// end to end; computed keys inside it are still reads.
    fn assign_target(&mut self, e: &mut Expr) {
        match e {
            Expr::Ident(_) => {}
            Expr::Member(m) => {
                if let MemberProp::Computed(k) = &mut m.prop {
                    self.expr(k);
                }
                self.assign_target(&mut m.obj);
            }
            other => self.expr(other),
        }
    }

    fn obj_prop(&mut self, prop: &mut ObjProp) {
        match prop {
            ObjProp::KeyValue { key, value, .. } => {
                self.prop_key(key);
                self.expr(value);
            }
            ObjProp::Method { key, func, .. } => {
                self.prop_key(key);
                self.func(func);
            }
            ObjProp::Spread { expr, .. } => self.expr(expr),
            ObjProp::Shorthand { .. } => self.shorthand(prop),
        }
    }

    /// A shorthand property reads its own key name; a hit must expand it
    /// to `key: replacement` to keep the key.
    fn shorthand(&mut self, prop: &mut ObjProp) {
        let ObjProp::Shorthand { id, span } = prop else { return };
        let (id, span) = (id.clone(), *span);
        let mut value = Expr::Ident(id.clone());
        if self.offer(&mut value, Role::Read) {
            *prop = ObjProp::KeyValue { key: PropKey::Ident(id), value, span };
        }
    }

    fn arg(&mut self, a: &mut Arg) {
        match a {
            Arg::Expr(e) | Arg::Spread(e, _) => self.expr(e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::print::Origin;

    fn apply(opt: Opt, src: &str) -> String {
        let _ = env_logger::builder().is_test(true).try_init();
        Engine::new(&opt).unwrap().transform(src, "test.js").unwrap().code
    }

    fn env_opt() -> Opt {
        Opt::new().define("process.env.NODE_ENV", "'production'").define("DEV", "false")
    }

    #[test]
    fn maximal_path_wins() {
        let opt = Opt::new().define("a", "z").define("a.b", "42");
        assert_eq!(apply(opt.clone(), "f(a.b);"), "f(42);\n");
        assert_eq!(apply(opt, "f(a);"), "f(z);\n");
    }

    #[test]
    fn equivalent_spellings_all_match() {
        for src in [
            "log(process.env.NODE_ENV);",
            "log(process.env['NODE_ENV']);",
            "log(process['env'][`NODE_ENV`]);",
        ] {
            assert_eq!(apply(env_opt(), src), "log('production');\n", "{src}");
        }
        // A computed key that is itself an identifier stays dynamic.
        assert_eq!(
            apply(env_opt(), "log(process.env[NODE_ENV]);"),
            "log(process.env[NODE_ENV]);\n"
        );
    }

    #[test]
    fn binding_positions_are_immune() {
        let opt = || Opt::new().define("NODE_ENV", "'x'");
        assert_eq!(apply(opt(), "var NODE_ENV = 1;"), "var NODE_ENV = 1;\n");
        assert_eq!(
            apply(opt(), "import { NODE_ENV } from 'm';"),
            "import { NODE_ENV } from 'm';\n"
        );
        assert_eq!(
            apply(opt(), "function f(NODE_ENV) { return NODE_ENV; }"),
            "function f(NODE_ENV) {\n  return NODE_ENV;\n}\n"
        );
        assert_eq!(apply(opt(), "var { x: NODE_ENV } = o;"), "var { x: NODE_ENV } = o;\n");
    }

    #[test]
    fn member_properties_are_not_reads() {
        assert_eq!(apply(env_opt(), "obj.DEV;"), "obj.DEV;\n");
        // In object position the same name is an ordinary read.
        assert_eq!(apply(env_opt(), "DEV.x;"), "false.x;\n");
    }

    #[test]
    fn assignment_targets_are_blocked() {
        let opt = || env_opt().define("KEY", "'k'");
        assert_eq!(apply(opt(), "DEV = 5;"), "DEV = 5;\n");
        assert_eq!(apply(opt(), "DEV += 1;"), "DEV += 1;\n");
        // A computed key inside the target is still a read.
        assert_eq!(apply(opt(), "x[KEY] = 1;"), "x['k'] = 1;\n");
        // The assigned value too.
        assert_eq!(apply(opt(), "a.b = DEV;"), "a.b = false;\n");
    }

    #[test]
    fn configured_root_inside_a_target_spine_stays() {
        let opt = Opt::new().define("a", "Z");
        assert_eq!(apply(opt.clone(), "a.b = 1;"), "a.b = 1;\n");
        assert_eq!(apply(opt.clone(), "a.b.c += 1;"), "a.b.c += 1;\n");
        // The same root in read position still substitutes.
        assert_eq!(apply(opt, "g(a.b, a);"), "g(Z.b, Z);\n");
    }

    #[test]
    fn scope_shadowing() {
        let src = "function f(process) { return process.env.NODE_ENV; }";
        assert_eq!(
            apply(env_opt(), src),
            "function f(process) {\n  return process.env.NODE_ENV;\n}\n"
        );
        assert_eq!(
            apply(env_opt().ignore_scope(), src),
            "function f(process) {\n  return 'production';\n}\n"
        );
    }

    #[test]
    fn block_scope_shadowing_ends_with_the_block() {
        assert_eq!(
            apply(env_opt(), "{ let DEV = 1; use(DEV); }\nuse(DEV);"),
            "{\n  let DEV = 1;\n  use(DEV);\n}\nuse(false);\n"
        );
    }

    #[test]
    fn var_hoists_to_the_function() {
        assert_eq!(
            apply(env_opt(), "function f() { if (c) { var DEV = 1; } return DEV; }\ng(DEV);"),
            "function f() {\n  if (c) {\n    var DEV = 1;\n  }\n  return DEV;\n}\ng(false);\n"
        );
    }

    #[test]
    fn shorthand_properties_keep_their_key() {
        assert_eq!(apply(env_opt(), "var o = { DEV };"), "var o = { DEV: false };\n");
    }

    #[test]
    fn template_interpolations_are_reads() {
        assert_eq!(apply(env_opt(), "tag(`v=${DEV}`);"), "tag(`v=${false}`);\n");
    }

    #[test]
    fn replacement_is_reparenthesised() {
        let opt = Opt::new().define("X", "1 + 2");
        assert_eq!(apply(opt, "f(X * 3);"), "f((1 + 2) * 3);\n");
    }

    #[test]
    fn last_entry_wins() {
        let opt = Opt::new().define("a.b", "1").define("a['b']", "2");
        assert_eq!(apply(opt, "f(a.b);"), "f(2);\n");
    }

    #[test]
    fn comments_survive() {
        assert_eq!(apply(env_opt(), "// keep\nlog(DEV);"), "// keep\nlog(false);\n");
        assert_eq!(apply(env_opt(), "/* keep */ log(DEV);"), "/* keep */\nlog(false);\n");
    }

    #[test]
    fn idempotent() {
        let src = "if (process.env.NODE_ENV !== 'production') { log(DEV) }";
        let engine = Engine::new(&env_opt()).unwrap();
        let once = engine.transform(src, "a.js").unwrap().code;
        let twice = engine.transform(&once, "a.js").unwrap().code;
        assert_eq!(once, twice);
    }

    #[test]
    fn bad_source_is_fatal() {
        let err = Engine::new(&Opt::new()).unwrap().transform("var x = ;", "bad.js").unwrap_err();
        match err {
            Error::BadSource { file, .. } => assert_eq!(file, "bad.js"),
            e => panic!("{e}"),
        }
    }

    #[test]
    fn source_map_fidelity() {
        let src = "if (process.env.NODE_ENV !== 'production') { log(DEV) }";
        let out = Engine::new(&env_opt()).unwrap().transform(src, "a.js").unwrap();
        assert_eq!(out.code, "if ('production' !== 'production') {\n  log(false);\n}\n");
        // Untouched tokens map to their original positions.
        let loc = out.map.resolve(1, 0).unwrap(); // `if`
        assert_eq!((loc.origin, loc.line, loc.col), (Origin::Source, 1, 0));
        let loc = out.map.resolve(2, 2).unwrap(); // `log`
        assert_eq!((loc.origin, loc.line, loc.col), (Origin::Source, 1, 45));
        let loc = out.map.resolve(1, 21).unwrap(); // the right-hand 'production'
        assert_eq!((loc.origin, loc.line, loc.col), (Origin::Source, 1, 29));
        // Inserted tokens map into their configuration entry's value text.
        let loc = out.map.resolve(1, 4).unwrap(); // the inserted 'production'
        assert_eq!((loc.origin, loc.line, loc.col), (Origin::Mapping(0), 1, 0));
        let loc = out.map.resolve(2, 6).unwrap(); // the inserted `false`
        assert_eq!((loc.origin, loc.line, loc.col), (Origin::Mapping(1), 1, 0));
    }
}
