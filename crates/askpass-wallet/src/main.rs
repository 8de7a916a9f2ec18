//! askpass-wallet - `SSH_ASKPASS` / `GIT_ASKPASS` helper backed by KWallet.
//!
//! # Usage
//!
//! ```bash
//! # Set as SSH askpass
//! export SSH_ASKPASS=/path/to/askpass-wallet
//! export SSH_ASKPASS_REQUIRE=prefer
//!
//! # Set as Git askpass
//! export GIT_ASKPASS=/path/to/askpass-wallet
//! ```
//!
//! The prompt text is passed as the first command-line argument. The answer
//! is printed to stdout followed by a newline; cancelling exits with status 1
//! and prints nothing.

mod kwallet;
mod prompt;

use std::borrow::Cow;
use std::ffi::OsString;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use askpass_wallet_core::hardening::harden_process;
use askpass_wallet_core::{
    Config, Frontend, Interaction, NoStore, Outcome, Session, SessionSettings, StoreProvider,
    TracingSink,
};
use kwallet::KWalletProvider;

use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Answers ssh and git prompts, remembering secrets in KWallet.
#[derive(Parser, Debug)]
#[command(name = "askpass-wallet")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Prompt text, as passed by ssh or git
    #[arg(value_name = "PROMPT", allow_hyphen_values = true)]
    prompt: Option<OsString>,

    /// Path to config file [default: ~/.config/askpass-wallet/config.toml]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Wallet folder holding remembered secrets
    #[arg(long, value_name = "NAME")]
    folder: Option<String>,

    /// Never open the wallet
    #[arg(long)]
    no_wallet: bool,

    /// Interaction frontend (auto, terminal, gtk)
    #[arg(long, value_name = "FRONTEND")]
    frontend: Option<Frontend>,

    /// Increase log verbosity (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only show errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// The prompt as text. Bytes that are not UTF-8 become U+FFFD.
    fn prompt_text(&self) -> Option<Cow<'_, str>> {
        self.prompt.as_deref().map(|p| p.to_string_lossy())
    }

    /// Log level selected by `-v` / `-q`. Silent by default: ssh shows our stderr.
    fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Apply command-line overrides on top of the file configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(folder) = &self.folder {
            config.wallet.folder = folder.clone();
        }
        if self.no_wallet {
            config.wallet.enabled = false;
        }
        if let Some(frontend) = self.frontend {
            config.prompt.frontend = frontend;
        }
    }
}

fn setup_logging(level: &str) {
    // RUST_LOG takes precedence over the CLI flags
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // JOURNAL_STREAM is set when stderr goes to the journal
    if std::env::var("JOURNAL_STREAM").is_ok() {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(journald_layer)
                .with(filter)
                .init();
            return;
        }
    }

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(true),
        )
        .with(filter)
        .init();
}

/// Load the configuration; a broken file never blocks the prompt.
fn load_config(path: Option<&PathBuf>) -> Config {
    let result = match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration from specified path");
            Config::load_from(path).with_context(|| format!("Failed to load {}", path.display()))
        }
        None => Config::load().context("default configuration"),
    };

    match result {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Invalid configuration, using defaults");
            Config::default()
        }
    }
}

/// Run one session with a concrete provider type.
fn run_session<P: StoreProvider>(
    provider: &P,
    interaction: &dyn Interaction,
    settings: SessionSettings,
    prompt: Option<&str>,
) -> Outcome {
    let sink = TracingSink;
    Session::new(provider, &interaction, &sink, settings).run(prompt)
}

fn write_outcome(outcome: &Outcome) -> Result<()> {
    if let Some(bytes) = outcome.stdout() {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(bytes.as_bytes())
            .context("Failed to write answer")?;
        stdout.flush().context("Failed to flush answer")?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.log_level());

    // Before any secret enters memory.
    harden_process(&TracingSink);

    debug!(version = env!("CARGO_PKG_VERSION"), "Starting askpass-wallet");

    let mut config = load_config(cli.config.as_ref());
    cli.apply(&mut config);

    let settings = config.session_settings();
    let interaction = prompt::select(config.prompt.frontend);
    let prompt_text = cli.prompt_text();
    let prompt = prompt_text.as_deref();

    // Match arms with concrete provider types avoid a boxed provider.
    let outcome = if config.wallet.enabled {
        let provider = KWalletProvider::new(Some(config.wallet.name.clone()));
        run_session(&provider, interaction.as_ref(), settings, prompt)
    } else {
        info!("Wallet disabled");
        run_session(&NoStore, interaction.as_ref(), settings, prompt)
    };

    if let Err(e) = write_outcome(&outcome) {
        error!(error = %format!("{:#}", e), "Could not deliver answer");
        return ExitCode::FAILURE;
    }

    ExitCode::from(outcome.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use askpass_wallet_core::{classify, RequestKind};
    use clap::CommandFactory;
    use std::os::unix::ffi::OsStringExt;
    use tempfile::NamedTempFile;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn prompt_is_positional() {
        let cli = Cli::try_parse_from(["askpass-wallet", "Enter passphrase for id: "]).unwrap();
        assert_eq!(cli.prompt_text().as_deref(), Some("Enter passphrase for id: "));
        assert!(!cli.no_wallet);
    }

    #[test]
    fn non_utf8_prompt_is_accepted() {
        let cli = Cli::try_parse_from([
            OsString::from("askpass-wallet"),
            OsString::from_vec(b"Enter passphrase for key '/home/\xe9/.ssh/id': ".to_vec()),
        ])
        .unwrap();

        let prompt = cli.prompt_text().unwrap();
        assert_eq!(prompt, "Enter passphrase for key '/home/\u{FFFD}/.ssh/id': ");

        let result = classify(&prompt);
        assert_eq!(result.kind, RequestKind::Secret);
        assert_eq!(result.identifier.as_deref(), Some("/home/\u{FFFD}/.ssh/id"));
        assert!(!result.skip_store);
    }

    #[test]
    fn prompt_is_optional() {
        let cli = Cli::try_parse_from(["askpass-wallet"]).unwrap();
        assert!(cli.prompt.is_none());
    }

    #[test]
    fn options_override_config() {
        let cli = Cli::try_parse_from([
            "askpass-wallet",
            "--folder",
            "ssh",
            "--no-wallet",
            "--frontend",
            "terminal",
            "Password: ",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.wallet.folder, "ssh");
        assert!(!config.wallet.enabled);
        assert_eq!(config.prompt.frontend, Frontend::Terminal);
    }

    #[test]
    fn unknown_frontend_is_rejected() {
        assert!(Cli::try_parse_from(["askpass-wallet", "--frontend", "qt"]).is_err());
    }

    #[test]
    fn log_levels() {
        let parse = |args: &[&str]| Cli::try_parse_from(args).unwrap().log_level();
        assert_eq!(parse(&["askpass-wallet"]), "warn");
        assert_eq!(parse(&["askpass-wallet", "-v"]), "info");
        assert_eq!(parse(&["askpass-wallet", "-vv"]), "debug");
        assert_eq!(parse(&["askpass-wallet", "-vvv"]), "trace");
        assert_eq!(parse(&["askpass-wallet", "-q", "-v"]), "error");
    }

    #[test]
    fn invalid_config_falls_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not = [valid").unwrap();

        let config = load_config(Some(&file.path().to_path_buf()));
        assert!(config.wallet.enabled);
        assert_eq!(config.wallet.folder, "askpass-wallet");
    }

    #[test]
    fn explicit_config_is_loaded() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[wallet]\nenabled = false").unwrap();

        let config = load_config(Some(&file.path().to_path_buf()));
        assert!(!config.wallet.enabled);
    }
}
