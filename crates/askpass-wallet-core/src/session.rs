//! One askpass request, from prompt to outcome.
//!
//! A [`Session`] classifies the prompt, answers from the wallet when it can,
//! and otherwise asks the user:
//!
//! ```text
//! classify ──► wallet hit ─────────────────────────────► Secret
//!     │
//!     └──► ask user ──► accepted ──► remember? persist ──► Secret / Confirmed
//!                  └──► cancelled / rejected ───────────► Cancelled
//! ```
//!
//! The wallet is opened at most once, and only when the classification allows
//! it and carries an identifier. It is read at most once (plus legacy
//! fallbacks) and written at most once.

use tracing::{debug, error, info};

use crate::classify::PromptClassifier;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::store;
use crate::traits::{Interaction, InteractionError, StoreProvider};
use crate::types::{Classification, ConfirmRequest, Outcome, RequestKind, SecretRequest};

/// Per-invocation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Wallet folder holding remembered secrets.
    pub folder: String,
    /// Dialog title.
    pub title: String,
    /// Question asked when no prompt was passed.
    pub default_prompt: String,
    /// Initial state of the "remember" toggle.
    pub default_remember: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            folder: crate::APP_NAME.to_string(),
            title: crate::APP_NAME.to_string(),
            default_prompt: crate::DEFAULT_PROMPT.to_string(),
            default_remember: false,
        }
    }
}

/// Orchestrates one request.
pub struct Session<'a, P: StoreProvider, I: Interaction> {
    provider: &'a P,
    interaction: &'a I,
    sink: &'a dyn DiagnosticSink,
    settings: SessionSettings,
}

impl<'a, P: StoreProvider, I: Interaction> Session<'a, P, I> {
    /// Create a session.
    pub fn new(
        provider: &'a P,
        interaction: &'a I,
        sink: &'a dyn DiagnosticSink,
        settings: SessionSettings,
    ) -> Self {
        Self {
            provider,
            interaction,
            sink,
            settings,
        }
    }

    /// The settings this session runs with.
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Run the request for `prompt` to completion.
    ///
    /// `None` asks the configured default question and treats it as an
    /// unidentified secret request.
    pub fn run(&self, prompt: Option<&str>) -> Outcome {
        let (question, classification) = match prompt {
            Some(prompt) => (
                prompt.to_string(),
                PromptClassifier::new(self.sink).classify(prompt),
            ),
            None => (
                self.settings.default_prompt.clone(),
                Classification::unrecognized(),
            ),
        };

        debug!(
            kind = %classification.kind,
            identifier = ?classification.identifier,
            skip_store = classification.skip_store,
            "Classified prompt"
        );

        // Only open the wallet when there is something to look up.
        let mut wallet = match classification.store_key() {
            Some(_) => match self.provider.open() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    self.sink.emit(Diagnostic::StoreUnavailable {
                        reason: e.to_string(),
                    });
                    None
                }
            },
            None => None,
        };

        if let (Some(handle), Some(identifier)) = (wallet.as_mut(), classification.store_key()) {
            if let Some(value) = store::lookup(handle, &self.settings.folder, identifier, self.sink)
            {
                info!(identifier = %identifier, "Answered from wallet");
                return Outcome::Secret(value);
            }
        }

        match classification.kind {
            RequestKind::Confirmation => self.ask_confirmation(question),
            RequestKind::Secret | RequestKind::PlainText => {
                let request = SecretRequest {
                    prompt_text: question,
                    title: self.settings.title.clone(),
                    echo: classification.kind.echo(),
                    show_remember_checkbox: wallet.is_some(),
                    default_remember: self.settings.default_remember,
                };

                let reply = match self.interaction.request_secret(request) {
                    Ok(reply) => reply,
                    Err(e) => return cancelled(e),
                };

                if reply.remember {
                    if let (Some(handle), Some(identifier)) =
                        (wallet.as_mut(), classification.store_key())
                    {
                        store::persist(
                            handle,
                            &self.settings.folder,
                            identifier,
                            &reply.value,
                            self.sink,
                        );
                    }
                }

                Outcome::Secret(reply.value)
            }
        }
    }

    fn ask_confirmation(&self, question: String) -> Outcome {
        let request = ConfirmRequest {
            question,
            title: self.settings.title.clone(),
        };
        match self.interaction.confirm(request) {
            Ok(()) => Outcome::Confirmed,
            Err(e) => cancelled(e),
        }
    }
}

fn cancelled(e: InteractionError) -> Outcome {
    match e {
        InteractionError::Cancelled | InteractionError::Rejected => {
            debug!(reason = %e, "Request not answered");
        }
        InteractionError::Unavailable(_) | InteractionError::Ui(_) => {
            error!(error = %e, "Could not ask the user");
        }
    }
    Outcome::Cancelled
}
