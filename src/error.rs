//! Crate errors.

use thiserror::Error;

/// A syntax error, located in whatever text was being parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{line}:{col}: {msg}")]
pub struct ParseError {
    /// What went wrong.
    pub msg: String,
    /// 1-based line.
    pub line: u32,
    /// 0-based byte column.
    pub col: u32,
}

/// A fatal transform error.
#[derive(Debug, Error)]
pub enum Error {
    /// A configured replacement value failed to parse as an expression.
    #[error("replacement for '{key}' is not an expression: {inner}")]
    BadMapping {
        /// The mapping key whose value was rejected.
        key: String,
        /// The underlying syntax error, located in the value text.
        inner: ParseError,
    },
    /// The input file failed to parse.
    #[error("{file}:{inner}")]
    BadSource {
        /// The file name, as given to the transform.
        file: String,
        /// The underlying syntax error.
        inner: ParseError,
    },
}
