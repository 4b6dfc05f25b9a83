//! Transform configuration.

use serde::{Deserialize, Serialize};

/// Options for one transform run.
///
/// `mappings` is ordered: when two entries share a key, the later one wins.
/// Values are expression text, parsed once per run.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Opt {
    /// Replacement entries, `(path, expression text)`, in configuration
    /// order.
    #[serde(default)]
    pub mappings: Vec<(String, String)>,
    /// Substitute even where a local binding shadows the path's head.
    #[serde(default)]
    pub ignore_scope: bool,
}

impl Opt {
    /// An empty configuration.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a replacement entry.
    pub fn define(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.mappings.push((key.into(), value.into()));
        self
    }

    /// Disable the scope gate.
    pub fn ignore_scope(mut self) -> Self {
        self.ignore_scope = true;
        self
    }

    /// Read a configuration from JSON.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn json_round_trip() {
        let opt = Opt::new().define("process.env.NODE_ENV", "'production'").ignore_scope();
        let text = serde_json::to_string(&opt).unwrap();
        let back = Opt::from_json(&text).unwrap();
        assert_eq!(back.mappings, opt.mappings);
        assert!(back.ignore_scope);
    }

    #[test]
    fn fields_default() {
        let opt = Opt::from_json("{}").unwrap();
        assert!(opt.mappings.is_empty());
        assert!(!opt.ignore_scope);
    }
}
