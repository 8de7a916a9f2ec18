//! Terminal interaction for SSH sessions and headless systems.
//!
//! Masked values are read with `rpassword`. Plain values, yes/no answers and
//! the "remember" question are read line by line from the controlling
//! terminal, never from stdin: stdin and stdout belong to the program that
//! invoked the helper.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use askpass_wallet_core::{ConfirmRequest, Interaction, InteractionError, SecretReply, SecretRequest};
use secrecy::SecretString;
use tracing::debug;
use zeroize::Zeroizing;

/// Terminal-based interaction.
pub struct TerminalInteraction {
    input: PathBuf,
    output: PathBuf,
}

/// One open terminal: a buffered reader kept for the whole request, and a writer.
struct Tty {
    reader: BufReader<File>,
    writer: File,
}

impl Tty {
    fn ask(&mut self, prompt: &str) -> Result<Option<Zeroizing<String>>, InteractionError> {
        read_line(&mut self.reader, &mut self.writer, prompt)
    }
}

impl TerminalInteraction {
    /// Prompt on `/dev/tty`.
    pub fn new() -> Self {
        Self {
            input: PathBuf::from("/dev/tty"),
            output: PathBuf::from("/dev/tty"),
        }
    }

    /// Read answers from `input` and write questions to `output`.
    #[cfg(test)]
    fn with_paths(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    fn open_tty(&self) -> Result<Tty, InteractionError> {
        let unavailable = |path: &PathBuf, e: io::Error| {
            InteractionError::Unavailable(format!("cannot open {}: {}", path.display(), e))
        };

        let reader = OpenOptions::new()
            .read(true)
            .open(&self.input)
            .map_err(|e| unavailable(&self.input, e))?;
        let writer = OpenOptions::new()
            .append(true)
            .open(&self.output)
            .map_err(|e| unavailable(&self.output, e))?;

        Ok(Tty {
            reader: BufReader::new(reader),
            writer,
        })
    }
}

impl Default for TerminalInteraction {
    fn default() -> Self {
        Self::new()
    }
}

impl Interaction for TerminalInteraction {
    fn request_secret(&self, request: SecretRequest) -> Result<SecretReply, InteractionError> {
        let mut tty = self.open_tty()?;
        let prompt = entry_prompt(&request.prompt_text);

        // Only end of input cancels; an empty line is a valid (empty) value.
        let value = if request.echo {
            tty.ask(&prompt)?.ok_or(InteractionError::Cancelled)?
        } else {
            // rpassword opens the terminal itself and restores echo afterwards.
            let value = rpassword::prompt_password(&prompt).map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => InteractionError::Cancelled,
                _ => InteractionError::Ui(format!("failed to read password: {}", e)),
            })?;
            Zeroizing::new(value)
        };

        let remember = if request.show_remember_checkbox {
            let question = remember_prompt(request.default_remember);
            tty.ask(&question)?
                .map(|answer| parse_yes_no(&answer, request.default_remember))
                .unwrap_or(false)
        } else {
            false
        };

        debug!(remember, "Value entered on terminal");

        Ok(SecretReply {
            value: SecretString::from(value.as_str()),
            remember,
        })
    }

    fn confirm(&self, request: ConfirmRequest) -> Result<(), InteractionError> {
        let mut tty = self.open_tty()?;
        let question = format!("{} [y/N] ", request.question.trim_end());

        match tty.ask(&question)? {
            None => Err(InteractionError::Cancelled),
            Some(answer) if parse_yes_no(&answer, false) => Ok(()),
            Some(_) => Err(InteractionError::Rejected),
        }
    }
}

/// Ensure the prompt ends with a space so input does not run into it.
fn entry_prompt(text: &str) -> String {
    if text.ends_with(' ') {
        text.to_string()
    } else {
        format!("{} ", text)
    }
}

fn remember_prompt(default_remember: bool) -> String {
    if default_remember {
        "Remember in wallet? [Y/n] ".to_string()
    } else {
        "Remember in wallet? [y/N] ".to_string()
    }
}

/// Interpret a yes/no answer; an empty answer selects `default`.
fn parse_yes_no(answer: &str, default: bool) -> bool {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}

/// Write `prompt` and read one line. `None` on end of input.
fn read_line<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    prompt: &str,
) -> Result<Option<Zeroizing<String>>, InteractionError> {
    let ui = |e: io::Error| InteractionError::Ui(format!("terminal I/O failed: {}", e));

    write!(writer, "{}", prompt).map_err(ui)?;
    writer.flush().map_err(ui)?;

    let mut line = Zeroizing::new(String::new());
    if reader.read_line(&mut line).map_err(ui)? == 0 {
        return Ok(None);
    }

    let trimmed = line.trim_end_matches('\n').trim_end_matches('\r');
    Ok(Some(Zeroizing::new(trimmed.to_string())))
}
