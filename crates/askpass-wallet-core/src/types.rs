//! Core types for askpass-wallet.
//!
//! This module contains the data structures shared by the classifier, the
//! session orchestrator and the interaction frontends: the request kind, the
//! classification result, and the request/reply pairs exchanged with the
//! human-facing surface.

use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

/// What kind of answer a prompt is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// A value entered with hidden input (passphrase, password, PIN).
    Secret,
    /// A value that does not need masking (e.g. a username).
    PlainText,
    /// A yes/no decision.
    Confirmation,
}

impl RequestKind {
    /// Whether input for this kind may be echoed back to the user.
    pub fn echo(&self) -> bool {
        matches!(self, RequestKind::PlainText)
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::Secret => write!(f, "secret"),
            RequestKind::PlainText => write!(f, "plain_text"),
            RequestKind::Confirmation => write!(f, "confirmation"),
        }
    }
}

/// Structured intent extracted from a prompt.
///
/// `identifier` is never `Some("")`. When `skip_store` is set the wallet is
/// neither read nor written, even if an identifier is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Key under which the secret is looked up or remembered.
    pub identifier: Option<String>,
    /// The kind of answer requested.
    pub kind: RequestKind,
    /// Do not consult the wallet for this request.
    pub skip_store: bool,
}

impl Classification {
    /// Result for prompts that no rule recognises.
    pub fn unrecognized() -> Self {
        Self {
            identifier: None,
            kind: RequestKind::Secret,
            skip_store: false,
        }
    }

    /// The identifier to use against the wallet, if the wallet may be used at all.
    pub fn store_key(&self) -> Option<&str> {
        if self.skip_store {
            None
        } else {
            self.identifier.as_deref()
        }
    }
}

/// Configuration for a text entry dialog.
#[derive(Debug, Clone)]
pub struct SecretRequest {
    /// The question shown to the user (usually the raw prompt).
    pub prompt_text: String,

    /// Window or header title.
    pub title: String,

    /// Whether to echo input (true for usernames).
    pub echo: bool,

    /// Whether to offer the "remember in wallet" toggle.
    pub show_remember_checkbox: bool,

    /// Initial state of the toggle.
    pub default_remember: bool,
}

impl Default for SecretRequest {
    fn default() -> Self {
        Self {
            prompt_text: String::new(),
            title: crate::APP_NAME.to_string(),
            echo: false,
            show_remember_checkbox: false,
            default_remember: false,
        }
    }
}

/// Reply from a text entry dialog.
#[derive(Clone)]
pub struct SecretReply {
    /// The value entered by the user.
    pub value: SecretString,

    /// Whether the user asked to remember the value in the wallet.
    pub remember: bool,
}

// Manual Debug implementation to avoid exposing the secret
impl std::fmt::Debug for SecretReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretReply")
            .field("value", &"[REDACTED]")
            .field("remember", &self.remember)
            .finish()
    }
}

/// Configuration for a yes/no dialog.
#[derive(Debug, Clone)]
pub struct ConfirmRequest {
    /// The question shown to the user.
    pub question: String,
    /// Window or header title.
    pub title: String,
}

/// Terminal result of a session.
pub enum Outcome {
    /// A value was found in the wallet or entered by the user.
    Secret(SecretString),
    /// The user accepted a confirmation.
    Confirmed,
    /// The user cancelled or rejected the request.
    Cancelled,
}

impl Outcome {
    /// Bytes to write on stdout, if any.
    ///
    /// Every emitted value is terminated by exactly one newline, whether it
    /// came from the wallet or from the user.
    pub fn stdout(&self) -> Option<Zeroizing<String>> {
        match self {
            Outcome::Secret(value) => {
                let value = value.expose_secret();
                let mut out = Zeroizing::new(String::with_capacity(value.len() + 1));
                out.push_str(value);
                out.push('\n');
                Some(out)
            }
            Outcome::Confirmed => Some(Zeroizing::new("yes\n".to_string())),
            Outcome::Cancelled => None,
        }
    }

    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Secret(_) | Outcome::Confirmed => 0,
            Outcome::Cancelled => 1,
        }
    }
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Secret(_) => f.write_str("Secret([REDACTED])"),
            Outcome::Confirmed => f.write_str("Confirmed"),
            Outcome::Cancelled => f.write_str("Cancelled"),
        }
    }
}
