//! Lexical bindings: the scope facility the engine queries.
//!
//! A frame stack, pushed per program / function / block. The engine only
//! ever asks one question ([ScopeStack::has_binding]); declaration order
//! within a scope is deliberately ignored, matching how `hasBinding`-style
//! facilities answer.

use fxhash::FxHashSet;

use super::*;

/// A stack of binding frames.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<FxHashSet<String>>,
}

impl ScopeStack {
    /// An empty stack (no frames).
    pub fn new() -> Self {
        Default::default()
    }

    /// Enter a scope.
    pub fn push(&mut self) {
        self.frames.push(Default::default());
    }

    /// Leave the innermost scope.
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Bind `name` in the innermost scope.
    pub fn bind(&mut self, name: &str) {
        if let Some(f) = self.frames.last_mut() {
            f.insert(name.to_string());
        }
    }

    /// Is `name` bound in any enclosing scope?
    pub fn has_binding(&self, name: &str) -> bool {
        self.frames.iter().rev().any(|f| f.contains(name))
    }
}

/// Collect the names bound by `pat`.
pub fn pattern_names(pat: &Pat, out: &mut FxHashSet<String>) {
    match pat {
        Pat::Ident(id) => {
            out.insert(id.name.clone());
        }
        Pat::Default { inner, .. } | Pat::Rest { inner, .. } => pattern_names(inner, out),
        Pat::Array { elems, .. } => {
            for p in elems.iter().flatten() {
                pattern_names(p, out);
            }
        }
        Pat::Object { props, .. } => {
            for p in props {
                match p {
                    ObjPatProp::KeyValue { value, .. } => pattern_names(value, out),
                    ObjPatProp::Rest { pat, .. } => pattern_names(pat, out),
                }
            }
        }
    }
}

/// Collect `var`-declared names hoisted to the nearest function scope:
/// descends through nested blocks and control flow, but not into functions.
pub fn hoisted_names(stmts: &[Stmt], out: &mut FxHashSet<String>) {
    for s in stmts {
        hoisted_in_stmt(s, out);
    }
}

fn hoisted_in_stmt(s: &Stmt, out: &mut FxHashSet<String>) {
    match s {
        Stmt::VarDecl { kind: DeclKind::Var, decls, .. } => {
            for d in decls {
                pattern_names(&d.id, out);
            }
        }
        Stmt::If { cons, alt, .. } => {
            hoisted_in_stmt(cons, out);
            if let Some(a) = alt {
                hoisted_in_stmt(a, out);
            }
        }
        Stmt::While { body, .. } => hoisted_in_stmt(body, out),
        Stmt::Block { body, .. } => hoisted_names(body, out),
        Stmt::ExportDecl { decl, .. } => hoisted_in_stmt(decl, out),
        _ => {}
    }
}

/// Collect the names a statement list binds in its own scope: `let`,
/// `const`, function and class declarations, and import specifiers.
pub fn lexical_names(stmts: &[Stmt], out: &mut FxHashSet<String>) {
    for s in stmts {
        match s {
            Stmt::VarDecl { kind: DeclKind::Let | DeclKind::Const, decls, .. } => {
                for d in decls {
                    pattern_names(&d.id, out);
                }
            }
            Stmt::Func(f) => {
                if let Some(id) = &f.id {
                    out.insert(id.name.clone());
                }
            }
            Stmt::Class(c) => {
                out.insert(c.id.name.clone());
            }
            Stmt::Import(i) => {
                for spec in &i.specs {
                    match spec {
                        ImportSpec::Default(id)
                        | ImportSpec::Namespace(id)
                        | ImportSpec::Named { local: id, .. } => {
                            out.insert(id.name.clone());
                        }
                    }
                }
            }
            Stmt::ExportDecl { decl, .. } => lexical_names(std::slice::from_ref(decl), out),
            _ => {}
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::parse::parse_program;
    use super::*;

    #[test]
    fn frame_queries() {
        let mut s = ScopeStack::new();
        s.push();
        s.bind("a");
        s.push();
        s.bind("b");
        assert!(s.has_binding("a"));
        assert!(s.has_binding("b"));
        s.pop();
        assert!(!s.has_binding("b"));
        assert!(s.has_binding("a"));
    }

    #[test]
    fn var_hoists_through_blocks() {
        let p = parse_program("if (c) { var x = 1; } let y = 2;").unwrap();
        let mut hoisted = FxHashSet::default();
        hoisted_names(&p.body, &mut hoisted);
        assert!(hoisted.contains("x"));
        assert!(!hoisted.contains("y"));
        let mut lexical = FxHashSet::default();
        lexical_names(&p.body, &mut lexical);
        assert!(lexical.contains("y"));
        assert!(!lexical.contains("x"));
    }

    #[test]
    fn imports_and_decls_are_lexical() {
        let p = parse_program("import d, { a as b } from 'm'; function f() {} class C {}").unwrap();
        let mut lexical = FxHashSet::default();
        lexical_names(&p.body, &mut lexical);
        for name in ["d", "b", "f", "C"] {
            assert!(lexical.contains(name), "missing {name}");
        }
        assert!(!lexical.contains("a"));
    }

    #[test]
    fn destructured_names() {
        let p = parse_program("let { a, b: [c, ...d], ...rest } = o;").unwrap();
        let mut lexical = FxHashSet::default();
        lexical_names(&p.body, &mut lexical);
        for name in ["a", "c", "d", "rest"] {
            assert!(lexical.contains(name), "missing {name}");
        }
        assert!(!lexical.contains("b"));
    }
}
