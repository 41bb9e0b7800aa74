//! Error and diagnostic types for the store.
//!
//! Routing misses and registration conflicts are *reported*, not raised:
//! they are logged, recorded in the store's diagnostics log and handed back
//! as a [`Diagnostic`] so callers can assert on them. Structural mistakes
//! such as registering under a missing parent are hard [`StoreError`]s.

use std::collections::VecDeque;

use thiserror::Error;

use crate::config::ConfigError;

/// A reported, non-fatal condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("unknown mutation type: {type_}")]
    UnknownMutation { type_: String },

    #[error("unknown action type: {type_}")]
    UnknownAction { type_: String },

    #[error("unknown local mutation type: {local}, global type: {global}")]
    UnknownLocalMutation { local: String, global: String },

    #[error("unknown local action type: {local}, global type: {global}")]
    UnknownLocalAction { local: String, global: String },

    #[error("duplicate namespace {namespace} for the namespaced module {path}")]
    DuplicateNamespace { namespace: String, path: String },

    #[error("duplicate getter key: {type_}")]
    DuplicateGetter { type_: String },

    #[error("unknown getter: {type_}")]
    UnknownGetter { type_: String },

    #[error("module namespace not found in {helper}(): {namespace}")]
    NamespaceNotFound { helper: &'static str, namespace: String },

    #[error("state written outside of a mutation handler")]
    StrictModeViolation,

    #[error("module not registered: {path}")]
    UnknownModule { path: String },

    #[error("cannot unregister static module: {path}")]
    StaticModule { path: String },

    #[error("store has been dropped")]
    StoreDropped,
}

impl Diagnostic {
    /// Short machine-readable kind, used as a tracing field.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::UnknownMutation { .. } => "unknown_mutation",
            Diagnostic::UnknownAction { .. } => "unknown_action",
            Diagnostic::UnknownLocalMutation { .. } => "unknown_local_mutation",
            Diagnostic::UnknownLocalAction { .. } => "unknown_local_action",
            Diagnostic::DuplicateNamespace { .. } => "duplicate_namespace",
            Diagnostic::DuplicateGetter { .. } => "duplicate_getter",
            Diagnostic::UnknownGetter { .. } => "unknown_getter",
            Diagnostic::NamespaceNotFound { .. } => "namespace_not_found",
            Diagnostic::StrictModeViolation => "strict_mode_violation",
            Diagnostic::UnknownModule { .. } => "unknown_module",
            Diagnostic::StaticModule { .. } => "static_module",
            Diagnostic::StoreDropped => "store_dropped",
        }
    }
}

/// Hard failures: the requested tree shape is impossible.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot register module at '{path}': parent module is not registered")]
    MissingParent { path: String },

    #[error("cannot register the root module dynamically")]
    RootModule,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Failure of a dispatched action.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The dispatch could not be routed.
    #[error(transparent)]
    Diagnostic(#[from] Diagnostic),

    /// The handler rejected with a message.
    #[error("action rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ActionError {
    pub fn rejected(message: impl Into<String>) -> Self {
        ActionError::Rejected(message.into())
    }
}

/// Bounded log of reported diagnostics, oldest first.
#[derive(Debug)]
pub(crate) struct DiagnosticLog {
    entries: VecDeque<Diagnostic>,
    capacity: usize,
}

impl DiagnosticLog {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn push(&mut self, diagnostic: Diagnostic) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(diagnostic);
    }

    pub(crate) fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.iter().cloned().collect()
    }

    pub(crate) fn drain(&mut self) -> Vec<Diagnostic> {
        self.entries.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_drops_oldest_when_full() {
        let mut log = DiagnosticLog::new(2);
        log.push(Diagnostic::UnknownMutation { type_: "a".into() });
        log.push(Diagnostic::UnknownMutation { type_: "b".into() });
        log.push(Diagnostic::UnknownMutation { type_: "c".into() });

        let entries = log.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], Diagnostic::UnknownMutation { type_: "b".into() });
        assert_eq!(entries[1], Diagnostic::UnknownMutation { type_: "c".into() });
    }

    #[test]
    fn test_drain_empties_log() {
        let mut log = DiagnosticLog::new(4);
        log.push(Diagnostic::StrictModeViolation);
        assert_eq!(log.drain().len(), 1);
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn test_display_messages() {
        let err = Diagnostic::DuplicateGetter { type_: "user/name".into() };
        assert_eq!(err.to_string(), "duplicate getter key: user/name");
        assert_eq!(err.kind(), "duplicate_getter");

        let err = StoreError::MissingParent { path: "a/b".into() };
        assert!(err.to_string().contains("a/b"));
    }

    #[test]
    fn test_action_error_from_diagnostic() {
        let err: ActionError = Diagnostic::UnknownAction { type_: "load".into() }.into();
        assert!(matches!(
            err,
            ActionError::Diagnostic(Diagnostic::UnknownAction { .. })
        ));
        assert_eq!(err.to_string(), "unknown action type: load");
    }
}
