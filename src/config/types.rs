use serde::{Deserialize, Serialize};

/// Options a [`Store`](crate::Store) is built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Report state writes made outside of a committing scope.
    #[serde(default)]
    pub strict: bool,
    /// Maximum number of diagnostics kept in the store's log (default: 256).
    #[serde(default = "default_diagnostics_capacity")]
    pub diagnostics_capacity: usize,
    /// Log every commit with its payload at debug level.
    #[serde(default)]
    pub trace_mutations: bool,
}

fn default_diagnostics_capacity() -> usize {
    256
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            strict: false,
            diagnostics_capacity: default_diagnostics_capacity(),
            trace_mutations: false,
        }
    }
}

impl StoreConfig {
    /// Default config with strict mode switched on.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }
}
