//! Core logic for askpass-wallet.
//!
//! askpass-wallet is an `SSH_ASKPASS` / `GIT_ASKPASS` helper: it receives a
//! prompt from ssh, git or another tool, answers it from the desktop wallet
//! when a value was remembered, and otherwise asks the user. This crate holds
//! everything that does not need a display server or a D-Bus session, so it
//! can be tested in isolation:
//!
//! - [`classify`]: the ordered rule table mapping prompts to a [`Classification`]
//! - [`store`]: wallet lookup with legacy-key migration, and an in-memory wallet
//! - [`session`]: the orchestrator turning a prompt into an [`Outcome`]
//! - [`traits`]: the [`SecretStore`], [`StoreProvider`] and [`Interaction`] seams
//! - [`diagnostics`]: events reported to an injected [`DiagnosticSink`]
//! - [`config`]: TOML configuration
//! - [`hardening`]: disabling core dumps
//! - [`mock`]: a scripted [`Interaction`] for tests
//!
//! # Example
//!
//! ```
//! use askpass_wallet_core::diagnostics::RecordingSink;
//! use askpass_wallet_core::mock::MockInteraction;
//! use askpass_wallet_core::session::{Session, SessionSettings};
//! use askpass_wallet_core::store::{MemoryStore, MemoryStoreProvider};
//!
//! let wallet = MemoryStore::new();
//! wallet.insert("askpass-wallet", "alice@example.com", "hunter2");
//!
//! let provider = MemoryStoreProvider::new(wallet);
//! let ui = MockInteraction::cancelled();
//! let sink = RecordingSink::new();
//!
//! let session = Session::new(&provider, &ui, &sink, SessionSettings::default());
//! let outcome = session.run(Some("alice@example.com's password: "));
//!
//! assert_eq!(outcome.stdout().as_deref().map(String::as_str), Some("hunter2\n"));
//! assert_eq!(outcome.exit_code(), 0);
//! ```

pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod hardening;
pub mod mock;
pub mod session;
pub mod store;
pub mod traits;
pub mod types;

/// Application name, used as default wallet folder, dialog title and config directory.
pub const APP_NAME: &str = "askpass-wallet";

/// Question asked when the helper is started without a prompt.
pub const DEFAULT_PROMPT: &str = "Please enter passphrase";

// Re-export commonly used types at the crate root for convenience
pub use classify::{classify, PromptClassifier};
pub use config::{Config, ConfigError, Frontend};
pub use diagnostics::{Diagnostic, DiagnosticSink, RecordingSink, TracingSink};
pub use session::{Session, SessionSettings};
pub use traits::{Interaction, InteractionError, NoStore, SecretStore, StoreError, StoreProvider};
pub use types::{
    Classification, ConfirmRequest, Outcome, RequestKind, SecretReply, SecretRequest,
};
