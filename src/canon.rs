//! Canonical dotted paths.
//!
//! The equivalence classes live here: `a.b`, `a['b']` and `` a[`b`] `` all
//! canonicalize to the string `a.b`, so one table keyed by canonical path
//! covers every spelling. Anything dynamic (`a[b]`, interpolated templates,
//! private fields) has no canonical form.

use crate::ast::{Expr, MemberProp, Tpl};

/// Does `s` match identifier syntax, in full?
pub fn is_identifier(s: &str) -> bool {
    use crate::ast::lex::Token;
    use logos::Logos;
    let mut lex = Token::lexer(s);
    lex.next() == Some(Token::Ident) && lex.slice() == s && lex.next().is_none()
}

/// A template's single static chunk, if it has no interpolations.
fn single_chunk(t: &Tpl) -> Option<&str> {
    if t.exprs.is_empty() && t.quasis.len() == 1 {
        Some(&t.quasis[0].cooked)
    } else {
        None
    }
}

/// A key usable as one path segment: a string or single-chunk template whose
/// text matches identifier syntax.
fn static_key(e: &Expr) -> Option<&str> {
    let text = match e {
        Expr::Str(s) => &s.value,
        Expr::Tpl(t) => single_chunk(t)?,
        _ => return None,
    };
    is_identifier(text).then_some(text)
}

/// The canonical path `e` denotes, if any.
///
/// Member chains canonicalize only when every link is statically
/// resolvable; the first dynamic link makes the whole chain `None`, never
/// a partial prefix.
pub fn of_expr(e: &Expr) -> Option<String> {
    match e {
        Expr::Ident(id) => Some(id.name.clone()),
        Expr::Str(_) | Expr::Tpl(_) => static_key(e).map(str::to_owned),
        Expr::Member(m) => {
            let obj = of_expr(&m.obj)?;
            let prop = match &m.prop {
                MemberProp::Ident(id) => &id.name,
                // Private fields are never substitutable.
                MemberProp::Private(_) => return None,
                MemberProp::Computed(key) => static_key(key)?,
            };
            Some(format!("{obj}.{prop}"))
        }
        _ => None,
    }
}

/// The first segment of a canonical path (the name the scope gate checks).
pub fn head(path: &str) -> &str {
    path.split_once('.').map_or(path, |(h, _)| h)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::parse::parse_expr_text;
    use crate::ast::SpanSrc;

    fn canon(src: &str) -> Option<String> {
        of_expr(&parse_expr_text(src, SpanSrc::File).unwrap())
    }

    #[test]
    fn identifier_syntax() {
        assert!(is_identifier("a"));
        assert!(is_identifier("$_x1"));
        assert!(is_identifier("日本語"));
        assert!(!is_identifier("1a"));
        assert!(!is_identifier("a.b"));
        assert!(!is_identifier("a b"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn equivalent_spellings() {
        for src in ["a.b", "a['b']", "a[\"b\"]", "a[`b`]"] {
            assert_eq!(canon(src).as_deref(), Some("a.b"), "{src}");
        }
        assert_eq!(canon("process.env['NODE_ENV']").as_deref(), Some("process.env.NODE_ENV"));
    }

    #[test]
    fn literals_canonicalize() {
        assert_eq!(canon("'foo'").as_deref(), Some("foo"));
        assert_eq!(canon("`foo`").as_deref(), Some("foo"));
        assert_eq!(canon("'1a'"), None);
        assert_eq!(canon("`a${b}`"), None);
    }

    #[test]
    fn dynamic_links_abort_the_chain() {
        assert_eq!(canon("a[b]"), None);
        assert_eq!(canon("a[1]"), None);
        assert_eq!(canon("a['x y']"), None);
        assert_eq!(canon("a.#b"), None);
        assert_eq!(canon("a[`${b}`]"), None);
        assert_eq!(canon("f().b"), None);
        assert_eq!(canon("(a + b).c"), None);
    }

    #[test]
    fn head_segment() {
        assert_eq!(head("process.env.NODE_ENV"), "process");
        assert_eq!(head("DEV"), "DEV");
    }
}
