//! KWallet over the D-Bus session bus.
//!
//! Talks to `kwalletd6`, falling back to `kwalletd5`. Opening a wallet may
//! show KWallet's own unlock dialog; the call blocks until it is answered.

use askpass_wallet_core::{SecretStore, StoreError, StoreProvider, APP_NAME};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, trace, warn};
use zbus::blocking::{Connection, Proxy};

/// Well-known names of the KWallet daemon, newest first.
const SERVICES: &[(&str, &str)] = &[
    ("org.kde.kwalletd6", "/modules/kwalletd6"),
    ("org.kde.kwalletd5", "/modules/kwalletd5"),
];

const INTERFACE: &str = "org.kde.KWallet";

fn unavailable(e: zbus::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn backend(e: zbus::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Map KWallet's integer status (0 = success) to a result.
fn check_status(method: &str, status: i32) -> Result<(), StoreError> {
    if status == 0 {
        Ok(())
    } else {
        Err(StoreError::Backend(format!("{} returned {}", method, status)))
    }
}

/// Opens a KWallet wallet on demand.
#[derive(Debug, Clone, Default)]
pub struct KWalletProvider {
    /// Wallet to open; `None` selects the network wallet.
    wallet: Option<String>,
}

impl KWalletProvider {
    /// Provider for `wallet`, or the network wallet when `None` or empty.
    pub fn new(wallet: Option<String>) -> Self {
        Self {
            wallet: wallet.filter(|w| !w.is_empty()),
        }
    }

    /// Connect to the first KWallet daemon that answers.
    fn connect(conn: &Connection) -> Result<(Proxy<'static>, String), StoreError> {
        let mut last_error = None;

        for (service, path) in SERVICES {
            let proxy = Proxy::new(conn, *service, *path, INTERFACE).map_err(unavailable)?;
            let reply: zbus::Result<String> = proxy.call("networkWallet", &());
            match reply {
                Ok(network_wallet) => {
                    debug!(service, "Connected to KWallet");
                    return Ok((proxy, network_wallet));
                }
                Err(e) => {
                    trace!(service, error = %e, "KWallet service not reachable");
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => unavailable(e),
            None => StoreError::Unavailable("no KWallet service".to_string()),
        })
    }
}

impl StoreProvider for KWalletProvider {
    type Store = KWallet;

    fn open(&self) -> Result<Self::Store, StoreError> {
        let conn = Connection::session().map_err(unavailable)?;
        let (proxy, network_wallet) = Self::connect(&conn)?;
        let wallet = self.wallet.clone().unwrap_or(network_wallet);

        let handle: i32 = proxy
            .call("open", &(wallet.as_str(), 0i64, APP_NAME))
            .map_err(backend)?;
        if handle < 0 {
            debug!(wallet = %wallet, "Wallet open refused");
            return Err(StoreError::Denied);
        }

        debug!(wallet = %wallet, handle, "Opened wallet");
        Ok(KWallet {
            proxy,
            handle,
            folder: None,
        })
    }
}

/// An open KWallet wallet. Closed when dropped.
pub struct KWallet {
    proxy: Proxy<'static>,
    handle: i32,
    folder: Option<String>,
}

impl KWallet {
    fn folder(&self) -> Result<&str, StoreError> {
        self.folder
            .as_deref()
            .ok_or_else(|| StoreError::Backend("no folder selected".to_string()))
    }
}

impl std::fmt::Debug for KWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KWallet")
            .field("handle", &self.handle)
            .field("folder", &self.folder)
            .finish()
    }
}

impl SecretStore for KWallet {
    fn has_folder(&self, folder: &str) -> Result<bool, StoreError> {
        self.proxy
            .call("hasFolder", &(self.handle, folder, APP_NAME))
            .map_err(backend)
    }

    fn create_folder(&mut self, folder: &str) -> Result<(), StoreError> {
        let created: bool = self
            .proxy
            .call("createFolder", &(self.handle, folder, APP_NAME))
            .map_err(backend)?;
        if created || self.has_folder(folder)? {
            Ok(())
        } else {
            Err(StoreError::Backend(format!("could not create folder {}", folder)))
        }
    }

    fn set_folder(&mut self, folder: &str) -> Result<(), StoreError> {
        // KWallet's D-Bus API is stateless; the folder travels with each call.
        self.folder = Some(folder.to_string());
        Ok(())
    }

    fn read_password(&self, key: &str) -> Result<Option<SecretString>, StoreError> {
        let value: String = self
            .proxy
            .call("readPassword", &(self.handle, self.folder()?, key, APP_NAME))
            .map_err(backend)?;
        if value.is_empty() {
            Ok(None)
        } else {
            Ok(Some(SecretString::from(value)))
        }
    }

    fn write_password(&mut self, key: &str, value: &SecretString) -> Result<(), StoreError> {
        let status: i32 = self
            .proxy
            .call(
                "writePassword",
                &(self.handle, self.folder()?, key, value.expose_secret(), APP_NAME),
            )
            .map_err(backend)?;
        check_status("writePassword", status)
    }

    fn rename_entry(&mut self, old_key: &str, new_key: &str) -> Result<(), StoreError> {
        let status: i32 = self
            .proxy
            .call(
                "renameEntry",
                &(self.handle, self.folder()?, old_key, new_key, APP_NAME),
            )
            .map_err(backend)?;
        check_status("renameEntry", status)
    }
}

impl Drop for KWallet {
    fn drop(&mut self) {
        let result: Result<i32, _> = self
            .proxy
            .call("close", &(self.handle, false, APP_NAME));
        if let Err(e) = result {
            warn!(error = %e, "Failed to close wallet");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_wallet_name_selects_network_wallet() {
        assert_eq!(KWalletProvider::new(Some(String::new())).wallet, None);
        assert_eq!(KWalletProvider::new(None).wallet, None);
        assert_eq!(
            KWalletProvider::new(Some("kdewallet".to_string())).wallet.as_deref(),
            Some("kdewallet")
        );
    }

    #[test]
    fn status_codes() {
        assert!(check_status("writePassword", 0).is_ok());
        assert!(matches!(
            check_status("renameEntry", -1),
            Err(StoreError::Backend(msg)) if msg == "renameEntry returned -1"
        ));
    }

    // Run with: cargo test -p askpass-wallet -- --ignored (inside a KDE session)
    #[test]
    #[ignore = "requires a running KWallet"]
    fn opens_network_wallet() {
        let provider = KWalletProvider::default();
        let mut wallet = provider.open().unwrap();
        wallet.set_folder(APP_NAME).unwrap();
        let _ = wallet.has_folder(APP_NAME).unwrap();
    }
}
