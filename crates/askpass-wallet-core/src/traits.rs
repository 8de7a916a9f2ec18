//! Trait definitions for pluggable components.
//!
//! These traits define the interfaces for:
//! - Secret storage (KWallet, in-memory)
//! - Human interaction (GTK4 dialogs, terminal, mock)
//!
//! By using traits, the session can be tested with mock implementations and
//! different frontends can be swapped at startup.

use secrecy::SecretString;

use crate::types::{ConfirmRequest, SecretReply, SecretRequest};

/// Error type for wallet operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The wallet service is not running or not reachable.
    #[error("wallet service unavailable: {0}")]
    Unavailable(String),

    /// The user or the service refused access to the wallet.
    #[error("access to wallet denied")]
    Denied,

    /// The backend reported an error for a specific call.
    #[error("wallet backend error: {0}")]
    Backend(String),
}

/// Error type for interaction operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InteractionError {
    /// User cancelled the dialog.
    #[error("prompt cancelled by user")]
    Cancelled,

    /// User answered "no" to a confirmation.
    #[error("request rejected by user")]
    Rejected,

    /// No frontend can be shown in this environment.
    #[error("no interaction surface available: {0}")]
    Unavailable(String),

    /// Generic UI error.
    #[error("UI error: {0}")]
    Ui(String),
}

/// An opened wallet.
///
/// The handle keeps a current folder; entry operations apply to that folder.
pub trait SecretStore {
    /// Whether the wallet contains `folder`.
    fn has_folder(&self, folder: &str) -> Result<bool, StoreError>;

    /// Create `folder`. Creating an existing folder is not an error.
    fn create_folder(&mut self, folder: &str) -> Result<(), StoreError>;

    /// Select the folder subsequent entry operations apply to.
    fn set_folder(&mut self, folder: &str) -> Result<(), StoreError>;

    /// Read the password stored under `key`, `None` if there is no entry.
    fn read_password(&self, key: &str) -> Result<Option<SecretString>, StoreError>;

    /// Store `value` under `key`, replacing any existing entry.
    fn write_password(&mut self, key: &str, value: &SecretString) -> Result<(), StoreError>;

    /// Move the entry `old_key` to `new_key` without copying it.
    fn rename_entry(&mut self, old_key: &str, new_key: &str) -> Result<(), StoreError>;
}

/// Opens the wallet on demand.
///
/// Opening may show a system unlock dialog, so the session only calls
/// [`StoreProvider::open`] when the wallet is actually needed.
pub trait StoreProvider {
    /// The handle type returned by [`StoreProvider::open`].
    type Store: SecretStore;

    /// Open the wallet.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if no wallet service is reachable and
    /// `StoreError::Denied` if the user declined to open it.
    fn open(&self) -> Result<Self::Store, StoreError>;
}

/// Trait for human interaction implementations.
///
/// This trait abstracts the UI layer, allowing different implementations:
/// - GTK4 dialogs for desktop sessions
/// - Terminal (rpassword) for SSH sessions and headless systems
/// - Mock for testing
///
/// Both calls block until the user answers.
pub trait Interaction {
    /// Ask the user to type a value.
    ///
    /// # Errors
    ///
    /// Returns `InteractionError::Cancelled` if the user dismisses the dialog.
    fn request_secret(&self, request: SecretRequest) -> Result<SecretReply, InteractionError>;

    /// Ask the user a yes/no question. `Ok(())` means "yes".
    ///
    /// # Errors
    ///
    /// Returns `InteractionError::Rejected` or `InteractionError::Cancelled`
    /// when the user does not accept.
    fn confirm(&self, request: ConfirmRequest) -> Result<(), InteractionError>;
}

impl<T: Interaction + ?Sized> Interaction for &T {
    fn request_secret(&self, request: SecretRequest) -> Result<SecretReply, InteractionError> {
        (**self).request_secret(request)
    }

    fn confirm(&self, request: ConfirmRequest) -> Result<(), InteractionError> {
        (**self).confirm(request)
    }
}

impl<T: Interaction + ?Sized> Interaction for Box<T> {
    fn request_secret(&self, request: SecretRequest) -> Result<SecretReply, InteractionError> {
        (**self).request_secret(request)
    }

    fn confirm(&self, request: ConfirmRequest) -> Result<(), InteractionError> {
        (**self).confirm(request)
    }
}

/// A provider whose wallet is never available.
///
/// Used when the wallet is disabled in the configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStore;

/// The (uninhabited) handle of [`NoStore`].
#[derive(Debug)]
pub enum NoStoreHandle {}

impl SecretStore for NoStoreHandle {
    fn has_folder(&self, _folder: &str) -> Result<bool, StoreError> {
        match *self {}
    }

    fn create_folder(&mut self, _folder: &str) -> Result<(), StoreError> {
        match *self {}
    }

    fn set_folder(&mut self, _folder: &str) -> Result<(), StoreError> {
        match *self {}
    }

    fn read_password(&self, _key: &str) -> Result<Option<SecretString>, StoreError> {
        match *self {}
    }

    fn write_password(&mut self, _key: &str, _value: &SecretString) -> Result<(), StoreError> {
        match *self {}
    }

    fn rename_entry(&mut self, _old_key: &str, _new_key: &str) -> Result<(), StoreError> {
        match *self {}
    }
}

impl StoreProvider for NoStore {
    type Store = NoStoreHandle;

    fn open(&self) -> Result<Self::Store, StoreError> {
        Err(StoreError::Unavailable("wallet disabled".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interaction_error_display() {
        assert_eq!(
            InteractionError::Cancelled.to_string(),
            "prompt cancelled by user"
        );
        assert_eq!(
            InteractionError::Rejected.to_string(),
            "request rejected by user"
        );
        assert_eq!(
            InteractionError::Unavailable("no tty".into()).to_string(),
            "no interaction surface available: no tty"
        );
    }

    #[test]
    fn store_error_display() {
        assert_eq!(StoreError::Denied.to_string(), "access to wallet denied");
        assert_eq!(
            StoreError::Unavailable("no bus".into()).to_string(),
            "wallet service unavailable: no bus"
        );
    }

    #[test]
    fn no_store_is_never_available() {
        assert!(matches!(NoStore.open(), Err(StoreError::Unavailable(_))));
    }
}
