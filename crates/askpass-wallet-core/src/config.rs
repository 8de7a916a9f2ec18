//! Configuration types and loading for askpass-wallet.
//!
//! Configuration is loaded from `~/.config/askpass-wallet/config.toml`.
//!
//! # Error Handling
//!
//! - If the config file doesn't exist, default values are returned.
//! - If the config file exists but is invalid, an error is returned; the
//!   binary reports it and carries on with defaults.
//!
//! # Example Configuration
//!
//! ```toml
//! [wallet]
//! enabled = true
//! folder = "askpass-wallet"   # folder holding remembered secrets
//! name = ""                   # empty = the network wallet
//!
//! [prompt]
//! frontend = "auto"           # auto | terminal | gtk
//! title = "askpass-wallet"
//! default_text = "Please enter passphrase"
//! default_remember = false
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::session::SessionSettings;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Wallet configuration.
    pub wallet: WalletConfig,
    /// Prompt configuration.
    pub prompt: PromptConfig,
}

/// Configuration for the secret store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Whether to consult the wallet at all (default: true).
    pub enabled: bool,
    /// Folder holding remembered secrets (default: the application name).
    pub folder: String,
    /// Wallet to open; empty selects the network wallet (default: empty).
    pub name: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            folder: crate::APP_NAME.to_string(),
            name: String::new(),
        }
    }
}

/// Which interaction frontend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frontend {
    /// GTK when a display is available and compiled in, terminal otherwise.
    #[default]
    Auto,
    /// Always prompt on the controlling terminal.
    Terminal,
    /// Always use GTK dialogs.
    Gtk,
}

impl std::str::FromStr for Frontend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Frontend::Auto),
            "terminal" | "tty" => Ok(Frontend::Terminal),
            "gtk" => Ok(Frontend::Gtk),
            other => Err(format!("unknown frontend: {}", other)),
        }
    }
}

/// Configuration for user prompts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Frontend selection (default: auto).
    pub frontend: Frontend,
    /// Dialog title (default: the application name).
    pub title: String,
    /// Question asked when no prompt was passed (default: "Please enter passphrase").
    pub default_text: String,
    /// Default state of the "Remember" toggle (default: false).
    pub default_remember: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            frontend: Frontend::Auto,
            title: crate::APP_NAME.to_string(),
            default_text: crate::DEFAULT_PROMPT.to_string(),
            default_remember: false,
        }
    }
}

impl Config {
    /// Returns the default configuration file path.
    ///
    /// Returns `~/.config/askpass-wallet/config.toml` using `dirs::config_dir()`,
    /// or `None` if the config directory cannot be determined.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(crate::APP_NAME).join("config.toml"))
    }

    /// Load configuration from the default path.
    ///
    /// - Returns `Ok(Config::default())` if no config file exists.
    /// - Returns `Err` if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Settings for a [`Session`](crate::session::Session).
    ///
    /// Empty strings fall back to the built-in defaults.
    pub fn session_settings(&self) -> SessionSettings {
        let defaults = SessionSettings::default();
        SessionSettings {
            folder: non_empty_or(&self.wallet.folder, defaults.folder),
            title: non_empty_or(&self.prompt.title, defaults.title),
            default_prompt: non_empty_or(&self.prompt.default_text, defaults.default_prompt),
            default_remember: self.prompt.default_remember,
        }
    }
}

fn non_empty_or(value: &str, fallback: String) -> String {
    if value.trim().is_empty() {
        fallback
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_config_values() {
        let config = Config::default();

        assert!(config.wallet.enabled);
        assert_eq!(config.wallet.folder, "askpass-wallet");
        assert!(config.wallet.name.is_empty());

        assert_eq!(config.prompt.frontend, Frontend::Auto);
        assert_eq!(config.prompt.title, "askpass-wallet");
        assert_eq!(config.prompt.default_text, "Please enter passphrase");
        assert!(!config.prompt.default_remember);
    }

    #[test]
    fn load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[wallet]
enabled = false
folder = "ssh"
name = "kdewallet"

[prompt]
frontend = "terminal"
title = "SSH"
default_text = "Secret?"
default_remember = true
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).expect("Should parse");

        assert!(!config.wallet.enabled);
        assert_eq!(config.wallet.folder, "ssh");
        assert_eq!(config.wallet.name, "kdewallet");

        assert_eq!(config.prompt.frontend, Frontend::Terminal);
        assert_eq!(config.prompt.title, "SSH");
        assert_eq!(config.prompt.default_text, "Secret?");
        assert!(config.prompt.default_remember);
    }

    #[test]
    fn load_partial_config_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[prompt]
default_remember = true
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).expect("Should parse");

        assert!(config.wallet.enabled);
        assert_eq!(config.wallet.folder, "askpass-wallet");
        assert!(config.prompt.default_remember);
        assert_eq!(config.prompt.frontend, Frontend::Auto);
    }

    #[test]
    fn load_invalid_config_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        let result = Config::load_from(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn load_unknown_frontend_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[prompt]\nfrontend = \"qt\"").unwrap();

        assert!(matches!(
            Config::load_from(file.path()).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn load_missing_file_returns_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from(&dir.path().join("absent.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::Io(_)));
    }

    #[test]
    fn load_empty_config_returns_defaults() {
        let file = NamedTempFile::new().unwrap();
        let config = Config::load_from(file.path()).expect("Should parse empty file");

        assert!(config.wallet.enabled);
        assert!(!config.prompt.default_remember);
    }

    #[test]
    fn default_path_returns_config_dir() {
        let path = Config::default_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.ends_with("askpass-wallet/config.toml"));
    }

    #[test]
    fn frontend_from_str() {
        assert_eq!("auto".parse::<Frontend>(), Ok(Frontend::Auto));
        assert_eq!("TTY".parse::<Frontend>(), Ok(Frontend::Terminal));
        assert_eq!("gtk".parse::<Frontend>(), Ok(Frontend::Gtk));
        assert!("qt".parse::<Frontend>().is_err());
    }

    #[test]
    fn session_settings_from_config() {
        let mut config = Config::default();
        config.wallet.folder = "ssh".to_string();
        config.prompt.default_remember = true;

        let settings = config.session_settings();
        assert_eq!(settings.folder, "ssh");
        assert_eq!(settings.title, "askpass-wallet");
        assert_eq!(settings.default_prompt, "Please enter passphrase");
        assert!(settings.default_remember);
    }

    #[test]
    fn session_settings_ignore_blank_strings() {
        let mut config = Config::default();
        config.wallet.folder = "  ".to_string();
        config.prompt.title = String::new();

        let settings = config.session_settings();
        assert_eq!(settings.folder, "askpass-wallet");
        assert_eq!(settings.title, "askpass-wallet");
    }
}
