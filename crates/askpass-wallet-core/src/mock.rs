//! Mock interaction for testing.
//!
//! This module provides a configurable mock implementation of [`Interaction`]
//! that can be used in tests without a display server or a terminal.

use std::cell::{Cell, RefCell};

use secrecy::SecretString;

use crate::traits::{Interaction, InteractionError};
use crate::types::{ConfirmRequest, SecretReply, SecretRequest};

/// A mock interaction surface for testing.
///
/// Answers with predetermined values, simulates cancellation or errors, counts
/// calls and records the last request of each kind.
///
/// # Example
///
/// ```
/// use askpass_wallet_core::mock::MockInteraction;
///
/// // Types "test-password" and ticks "remember"
/// let mock = MockInteraction::with_value("test-password").with_remember(true);
///
/// // Dismisses every dialog
/// let mock_cancel = MockInteraction::cancelled();
/// ```
#[derive(Debug)]
pub struct MockInteraction {
    /// Value typed into text entries.
    value: Option<String>,
    /// State of the "remember" toggle when the dialog is accepted.
    remember: bool,
    /// Answer to confirmations.
    accept: bool,
    /// Error to return instead of any answer.
    error: Option<InteractionError>,
    secret_calls: Cell<usize>,
    confirm_calls: Cell<usize>,
    last_secret: RefCell<Option<SecretRequest>>,
    last_confirm: RefCell<Option<ConfirmRequest>>,
}

impl MockInteraction {
    fn new(value: Option<String>, accept: bool, error: Option<InteractionError>) -> Self {
        Self {
            value,
            remember: false,
            accept,
            error,
            secret_calls: Cell::new(0),
            confirm_calls: Cell::new(0),
            last_secret: RefCell::new(None),
            last_confirm: RefCell::new(None),
        }
    }

    /// Create a mock that types `value` and accepts confirmations.
    pub fn with_value(value: impl Into<String>) -> Self {
        Self::new(Some(value.into()), true, None)
    }

    /// Create a mock that simulates user cancellation.
    pub fn cancelled() -> Self {
        Self::new(None, false, Some(InteractionError::Cancelled))
    }

    /// Create a mock that answers "yes" to confirmations.
    pub fn accepting() -> Self {
        Self::new(None, true, None)
    }

    /// Create a mock that answers "no" to confirmations.
    pub fn rejecting() -> Self {
        Self::new(None, false, None)
    }

    /// Create a mock that fails every call with `error`.
    pub fn with_error(error: InteractionError) -> Self {
        Self::new(None, false, Some(error))
    }

    /// Set whether the mock ticks the "remember" toggle.
    ///
    /// The toggle only counts when the request offered it.
    pub fn with_remember(mut self, remember: bool) -> Self {
        self.remember = remember;
        self
    }

    /// Number of text entry requests so far.
    pub fn secret_calls(&self) -> usize {
        self.secret_calls.get()
    }

    /// Number of confirmations so far.
    pub fn confirm_calls(&self) -> usize {
        self.confirm_calls.get()
    }

    /// The last text entry request received.
    pub fn last_secret_request(&self) -> Option<SecretRequest> {
        self.last_secret.borrow().clone()
    }

    /// The last confirmation received.
    pub fn last_confirm_request(&self) -> Option<ConfirmRequest> {
        self.last_confirm.borrow().clone()
    }
}

impl Default for MockInteraction {
    fn default() -> Self {
        Self::with_value("mock-password")
    }
}

impl Interaction for MockInteraction {
    fn request_secret(&self, request: SecretRequest) -> Result<SecretReply, InteractionError> {
        self.secret_calls.set(self.secret_calls.get() + 1);
        let offered = request.show_remember_checkbox;
        *self.last_secret.borrow_mut() = Some(request);

        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        let value = self.value.clone().ok_or(InteractionError::Cancelled)?;
        Ok(SecretReply {
            value: SecretString::from(value),
            remember: offered && self.remember,
        })
    }

    fn confirm(&self, request: ConfirmRequest) -> Result<(), InteractionError> {
        self.confirm_calls.set(self.confirm_calls.get() + 1);
        *self.last_confirm.borrow_mut() = Some(request);

        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        if self.accept {
            Ok(())
        } else {
            Err(InteractionError::Rejected)
        }
    }
}
