//! Diagnostic events and the sinks that receive them.
//!
//! The classifier and the session never log directly; they report
//! [`Diagnostic`] events to an injected [`DiagnosticSink`]. Production code
//! uses [`TracingSink`], tests use [`RecordingSink`] to assert on exactly what
//! was reported. No event ever carries a secret value.

use std::cell::RefCell;

use tracing::{debug, warn};

/// Something worth telling the operator about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// No classification rule matched the prompt.
    UnparsedPrompt {
        /// The prompt text as received.
        prompt: String,
    },

    /// A value stored under a legacy key was moved to its canonical key.
    LegacyKeyMigrated {
        /// The canonical identifier.
        identifier: String,
        /// The legacy key the value was found under.
        legacy_key: String,
    },

    /// The wallet could not be opened.
    StoreUnavailable {
        /// Why the wallet could not be opened.
        reason: String,
    },

    /// A wallet operation failed after the wallet was opened.
    StoreFailure {
        /// The operation that failed.
        operation: &'static str,
        /// Error reported by the backend.
        reason: String,
    },

    /// Core dumps could not be disabled.
    CoreDumpsEnabled {
        /// Error reported by the OS.
        reason: String,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UnparsedPrompt { prompt } => {
                write!(f, "unable to parse prompt {:?}", prompt)
            }
            Diagnostic::LegacyKeyMigrated {
                identifier,
                legacy_key,
            } => write!(
                f,
                "migrated legacy key {:?} to {:?}",
                legacy_key, identifier
            ),
            Diagnostic::StoreUnavailable { reason } => {
                write!(f, "wallet unavailable: {}", reason)
            }
            Diagnostic::StoreFailure { operation, reason } => {
                write!(f, "wallet {} failed: {}", operation, reason)
            }
            Diagnostic::CoreDumpsEnabled { reason } => {
                write!(f, "could not disable core dumps: {}", reason)
            }
        }
    }
}

/// Receiver for diagnostic events.
pub trait DiagnosticSink {
    /// Record one event.
    fn emit(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::UnparsedPrompt { prompt } => {
                warn!(prompt = %prompt, "Unable to parse prompt, continuing without identifier");
            }
            Diagnostic::LegacyKeyMigrated {
                identifier,
                legacy_key,
            } => {
                warn!(identifier = %identifier, legacy_key = %legacy_key, "Detected legacy key, renamed to canonical key");
            }
            // An unavailable wallet is routine (no KDE session, user declined).
            Diagnostic::StoreUnavailable { reason } => {
                debug!(reason = %reason, "Wallet unavailable");
            }
            Diagnostic::StoreFailure { operation, reason } => {
                warn!(operation, reason = %reason, "Wallet operation failed");
            }
            Diagnostic::CoreDumpsEnabled { reason } => {
                warn!(reason = %reason, "Failed to disable core dumps");
            }
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<Diagnostic>>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything recorded so far.
    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.borrow().clone()
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.events.borrow_mut().push(diagnostic);
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn emit(&self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic)
    }
}
