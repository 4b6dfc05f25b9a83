//! The compiled substitution table.

use std::fmt;

use fxhash::FxHashMap;
use itertools::Itertools;
use log::debug;

use crate::ast::parse::parse_expr_text;
use crate::ast::{Expr, LineIndex, SpanSrc};
use crate::canon;
use crate::cfg::Opt;
use crate::error::Error;

/// Canonical path to parsed replacement expression, frozen at setup.
///
/// Replacement spans are tagged with their configuration entry index, so
/// the printer can resolve inserted tokens back into the value text. The
/// per-entry [LineIndex]es for those texts live here too.
pub struct SubstitutionMap {
    entries: FxHashMap<String, Expr>,
    values: Vec<LineIndex>,
}

impl SubstitutionMap {
    /// Compile a configuration.
    ///
    /// Keys that parse but have no canonical form are dropped. A key or
    /// value that fails to parse is a fatal configuration error. Later
    /// entries overwrite earlier ones with the same canonical path.
    pub fn compile(opt: &Opt) -> Result<Self, Error> {
        let mut entries = FxHashMap::default();
        let mut values = Vec::new();
        for (key, value) in &opt.mappings {
            let key_expr = parse_expr_text(key, SpanSrc::File)
                .map_err(|inner| Error::BadMapping { key: key.clone(), inner })?;
            let path = match canon::of_expr(&key_expr) {
                Some(p) => p,
                None => {
                    debug!(target: "defsub::map", "dropping non-canonical key '{}'", key);
                    continue;
                }
            };
            let idx = values.len() as u32;
            let repl = parse_expr_text(value, SpanSrc::Config(idx))
                .map_err(|inner| Error::BadMapping { key: key.clone(), inner })?;
            values.push(LineIndex::new(value));
            entries.insert(path, repl);
        }
        Ok(SubstitutionMap { entries, values })
    }

    /// The replacement for `path`, if configured.
    pub fn get(&self, path: &str) -> Option<&Expr> {
        self.entries.get(path)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No entries survived compilation?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Line indexes for the value texts, by configuration entry index.
    pub fn value_lines(&self) -> &[LineIndex] {
        &self.values
    }
}

impl fmt::Display for SubstitutionMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{{}}}", self.entries.keys().sorted().join(", "))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::Expr;

    #[test]
    fn equivalent_keys_share_an_entry() {
        let opt = Opt::new().define("a['b']", "1").define("x", "2");
        let map = SubstitutionMap::compile(&opt).unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.get("a.b").is_some());
        assert!(map.get("x").is_some());
        assert_eq!(map.to_string(), "{a.b, x}");
    }

    #[test]
    fn last_entry_wins() {
        let opt = Opt::new().define("a.b", "1").define("a['b']", "2");
        let map = SubstitutionMap::compile(&opt).unwrap();
        assert_eq!(map.len(), 1);
        match map.get("a.b").unwrap() {
            Expr::Num(n) => assert_eq!(n.raw, "2"),
            e => panic!("{e:?}"),
        }
    }

    #[test]
    fn non_canonical_keys_are_dropped() {
        let opt = Opt::new().define("a[b]", "1").define("typeof x", "1").define("ok", "1");
        let map = SubstitutionMap::compile(&opt).unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.get("ok").is_some());
    }

    #[test]
    fn malformed_text_is_fatal() {
        assert!(SubstitutionMap::compile(&Opt::new().define("a.b", "1 +")).is_err());
        assert!(SubstitutionMap::compile(&Opt::new().define("a..b", "1")).is_err());
    }

    #[test]
    fn replacement_spans_carry_their_entry() {
        let opt = Opt::new().define("a", "x + 1").define("b", "y");
        let map = SubstitutionMap::compile(&opt).unwrap();
        assert_eq!(map.get("a").unwrap().span().src, SpanSrc::Config(0));
        assert_eq!(map.get("b").unwrap().span().src, SpanSrc::Config(1));
        assert_eq!(map.value_lines().len(), 2);
    }
}
