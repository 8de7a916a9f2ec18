//! Wallet lookups and the in-memory wallet.
//!
//! [`lookup`] and [`persist`] implement the read and write policies on top of
//! any [`SecretStore`]:
//!
//! - A missing folder or an empty value counts as "not stored".
//! - Older releases stored entries under `'<id>'`, `<id> ` or `'<id>' `.
//!   When the canonical key misses, those keys are tried in that order and the
//!   first hit is renamed to the canonical key before its value is returned.
//! - Backend failures are reported to the diagnostic sink and otherwise
//!   treated as a miss (read) or ignored (write).
//!
//! [`MemoryStore`] is a plain `HashMap` wallet used by tests and by anything
//! that needs a wallet without a desktop session.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, trace};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::traits::{SecretStore, StoreError, StoreProvider};

/// Legacy spellings of the key for `identifier`, in the order they are tried.
pub fn legacy_keys(identifier: &str) -> [String; 3] {
    [
        format!("'{}'", identifier),
        format!("{} ", identifier),
        format!("'{}' ", identifier),
    ]
}

fn report(sink: &dyn DiagnosticSink, operation: &'static str, err: StoreError) {
    sink.emit(Diagnostic::StoreFailure {
        operation,
        reason: err.to_string(),
    });
}

/// Read a non-empty value, reporting backend errors as a miss.
fn read_non_empty<S: SecretStore + ?Sized>(
    store: &S,
    key: &str,
    sink: &dyn DiagnosticSink,
) -> Option<SecretString> {
    match store.read_password(key) {
        Ok(Some(value)) if !value.expose_secret().is_empty() => Some(value),
        Ok(_) => None,
        Err(e) => {
            report(sink, "read", e);
            None
        }
    }
}

/// Look up the value stored for `identifier` in `folder`.
///
/// Falls back to the legacy key spellings and migrates a legacy hit to the
/// canonical key. Returns `None` on any miss or failure.
pub fn lookup<S: SecretStore + ?Sized>(
    store: &mut S,
    folder: &str,
    identifier: &str,
    sink: &dyn DiagnosticSink,
) -> Option<SecretString> {
    match store.has_folder(folder) {
        Ok(true) => {}
        Ok(false) => {
            debug!(folder = %folder, "Wallet folder does not exist");
            return None;
        }
        Err(e) => {
            report(sink, "has_folder", e);
            return None;
        }
    }

    if let Err(e) = store.set_folder(folder) {
        report(sink, "set_folder", e);
        return None;
    }

    if let Some(value) = read_non_empty(store, identifier, sink) {
        trace!(identifier = %identifier, "Found value under canonical key");
        return Some(value);
    }

    for legacy_key in legacy_keys(identifier) {
        let Some(value) = read_non_empty(store, &legacy_key, sink) else {
            continue;
        };

        sink.emit(Diagnostic::LegacyKeyMigrated {
            identifier: identifier.to_string(),
            legacy_key: legacy_key.clone(),
        });
        // The value was found, so a failed rename still answers the request.
        if let Err(e) = store.rename_entry(&legacy_key, identifier) {
            report(sink, "rename", e);
        }
        return Some(value);
    }

    None
}

/// Remember `value` for `identifier` in `folder`, creating the folder if needed.
///
/// Best effort: failures are reported to `sink` and otherwise ignored.
pub fn persist<S: SecretStore + ?Sized>(
    store: &mut S,
    folder: &str,
    identifier: &str,
    value: &SecretString,
    sink: &dyn DiagnosticSink,
) {
    let exists = match store.has_folder(folder) {
        Ok(exists) => exists,
        Err(e) => {
            report(sink, "has_folder", e);
            return;
        }
    };

    if !exists {
        if let Err(e) = store.create_folder(folder) {
            report(sink, "create_folder", e);
            return;
        }
    }

    if let Err(e) = store.set_folder(folder) {
        report(sink, "set_folder", e);
        return;
    }

    match store.write_password(identifier, value) {
        Ok(()) => debug!(identifier = %identifier, folder = %folder, "Stored value in wallet"),
        Err(e) => report(sink, "write", e),
    }
}

/// Wallet contents: folder name to (key to value).
type Folders = HashMap<String, HashMap<String, SecretString>>;

/// An in-memory wallet.
///
/// Clones share the same contents, so a test can keep a handle on the wallet
/// it gave to a [`MemoryStoreProvider`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    folders: Rc<RefCell<Folders>>,
    current: Option<String>,
    fail_with: Option<StoreError>,
}

impl MemoryStore {
    /// Create an empty wallet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with `error`.
    pub fn failing(error: StoreError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::default()
        }
    }

    /// Insert an entry directly, creating the folder if needed.
    pub fn insert(&self, folder: &str, key: &str, value: &str) {
        self.folders
            .borrow_mut()
            .entry(folder.to_string())
            .or_default()
            .insert(key.to_string(), SecretString::from(value.to_string()));
    }

    /// The value stored under `key` in `folder`, exposed for assertions.
    pub fn get(&self, folder: &str, key: &str) -> Option<String> {
        self.folders
            .borrow()
            .get(folder)
            .and_then(|entries| entries.get(key))
            .map(|value| value.expose_secret().to_string())
    }

    /// All keys in `folder`, sorted.
    pub fn keys(&self, folder: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .folders
            .borrow()
            .get(folder)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Whether the wallet holds no folders at all.
    pub fn is_empty(&self) -> bool {
        self.folders.borrow().is_empty()
    }

    fn check(&self) -> Result<(), StoreError> {
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn current_folder(&self) -> Result<&str, StoreError> {
        self.current
            .as_deref()
            .ok_or_else(|| StoreError::Backend("no folder selected".to_string()))
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let folders = self.folders.borrow();
        let mut names: Vec<&String> = folders.keys().collect();
        names.sort();
        f.debug_struct("MemoryStore")
            .field("folders", &names)
            .field("current", &self.current)
            .finish()
    }
}

impl SecretStore for MemoryStore {
    fn has_folder(&self, folder: &str) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.folders.borrow().contains_key(folder))
    }

    fn create_folder(&mut self, folder: &str) -> Result<(), StoreError> {
        self.check()?;
        self.folders
            .borrow_mut()
            .entry(folder.to_string())
            .or_default();
        Ok(())
    }

    fn set_folder(&mut self, folder: &str) -> Result<(), StoreError> {
        self.check()?;
        if !self.folders.borrow().contains_key(folder) {
            return Err(StoreError::Backend(format!("no such folder: {}", folder)));
        }
        self.current = Some(folder.to_string());
        Ok(())
    }

    fn read_password(&self, key: &str) -> Result<Option<SecretString>, StoreError> {
        self.check()?;
        let folder = self.current_folder()?;
        Ok(self
            .folders
            .borrow()
            .get(folder)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn write_password(&mut self, key: &str, value: &SecretString) -> Result<(), StoreError> {
        self.check()?;
        let folder = self.current_folder()?.to_string();
        self.folders
            .borrow_mut()
            .entry(folder)
            .or_default()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    fn rename_entry(&mut self, old_key: &str, new_key: &str) -> Result<(), StoreError> {
        self.check()?;
        let folder = self.current_folder()?.to_string();
        let mut folders = self.folders.borrow_mut();
        let entries = folders
            .get_mut(&folder)
            .ok_or_else(|| StoreError::Backend(format!("no such folder: {}", folder)))?;
        let value = entries
            .remove(old_key)
            .ok_or_else(|| StoreError::Backend(format!("no such entry: {}", old_key)))?;
        entries.insert(new_key.to_string(), value);
        Ok(())
    }
}

/// Hands out [`MemoryStore`] handles and counts how often it was opened.
#[derive(Debug, Clone)]
pub struct MemoryStoreProvider {
    store: MemoryStore,
    available: bool,
    opens: Rc<Cell<usize>>,
}

impl MemoryStoreProvider {
    /// A provider that opens `store`.
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            available: true,
            opens: Rc::new(Cell::new(0)),
        }
    }

    /// A provider whose wallet cannot be opened.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(MemoryStore::new())
        }
    }

    /// Number of successful or failed `open` calls so far.
    pub fn open_count(&self) -> usize {
        self.opens.get()
    }
}

impl StoreProvider for MemoryStoreProvider {
    type Store = MemoryStore;

    fn open(&self) -> Result<Self::Store, StoreError> {
        self.opens.set(self.opens.get() + 1);
        if !self.available {
            return Err(StoreError::Unavailable("memory wallet closed".to_string()));
        }
        // Each handle starts without a selected folder.
        let mut handle = self.store.clone();
        handle.current = None;
        Ok(handle)
    }
}
