//! # defsub
//!
//! Compile-time expression substitution: configured canonical paths
//! (`process.env.NODE_ENV`, `DEV`) are replaced, wherever they occur as
//! safe value reads, by parsed replacement expressions.
//!
//! ```
//! use defsub::{Engine, Opt};
//!
//! let opt = Opt::new().define("process.env.NODE_ENV", "'production'");
//! let engine = Engine::new(&opt).unwrap();
//! let out = engine.transform("log(process.env.NODE_ENV);", "app.js").unwrap();
//! assert_eq!(out.code, "log('production');\n");
//! ```

#![warn(missing_docs)]

pub mod ast;
pub mod canon;
pub mod cfg;
pub mod engine;
pub mod error;
pub mod gate;
pub mod map;

pub use cfg::Opt;
pub use engine::{Engine, Output};
pub use error::Error;
