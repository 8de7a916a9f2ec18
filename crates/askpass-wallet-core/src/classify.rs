//! Prompt classification.
//!
//! The askpass interface gives us nothing but a free-text prompt. This module
//! recognises the exact English wording used by OpenSSH, git, git-lfs and
//! mercurial (none of them localise these strings) and turns it into a
//! [`Classification`]: what kind of answer is wanted, which key identifies the
//! secret, and whether the wallet may be consulted at all.
//!
//! # Rule order
//!
//! [`RULES`] is evaluated top to bottom and the first match wins. Order
//! matters: several prompts end in `'s password: `, so the generic mercurial
//! rule must stay last, and the ssh-add retry prompt must never fall through
//! to the first-attempt rule.
//!
//! # Example
//!
//! ```
//! use askpass_wallet_core::classify::PromptClassifier;
//! use askpass_wallet_core::diagnostics::RecordingSink;
//! use askpass_wallet_core::types::RequestKind;
//!
//! let sink = RecordingSink::new();
//! let classifier = PromptClassifier::new(&sink);
//!
//! let result = classifier.classify("Enter PIN for 'Token#1': ");
//! assert_eq!(result.kind, RequestKind::Secret);
//! assert_eq!(result.identifier.as_deref(), Some("Token#1"));
//! assert!(!result.skip_store);
//! assert!(sink.is_empty());
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::types::{Classification, RequestKind};
use crate::types::RequestKind::{Confirmation, PlainText, Secret};

/// One entry of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Tool and source file the prompt text comes from.
    pub source: &'static str,
    /// Regular expression the whole prompt must match.
    pub pattern: &'static str,
    /// Capture group holding the identifier, if the prompt carries one.
    pub identifier_group: Option<usize>,
    /// Kind of answer requested.
    pub kind: RequestKind,
    /// Whether the wallet must be bypassed.
    pub skip_store: bool,
}

const fn rule(
    source: &'static str,
    pattern: &'static str,
    identifier_group: Option<usize>,
    kind: RequestKind,
    skip_store: bool,
) -> Rule {
    Rule {
        source,
        pattern,
        identifier_group,
        kind,
        skip_store,
    }
}

/// The classification table, in priority order.
pub const RULES: &[Rule] = &[
    // Password for authentication on a remote server.
    rule(
        "openssh sshconnect2.c",
        r"^(.*@.*)'s password( \(JPAKE\))?: $",
        Some(1),
        Secret,
        false,
    ),
    // Password change: the stored password is the one being replaced.
    rule(
        "openssh sshconnect2.c",
        r"^(Enter|Retype) (.*@.*)'s (old|new) password: $",
        Some(2),
        Secret,
        true,
    ),
    // Passphrase for a key file.
    rule(
        "openssh sshconnect.c",
        r"^Enter passphrase for( RSA)? key '(.*)': $",
        Some(2),
        Secret,
        false,
    ),
    // First passphrase attempt in ssh-add.
    rule(
        "openssh ssh-add.c",
        r"^Enter passphrase for (.*?)( \(will confirm each use\))?: $",
        Some(1),
        Secret,
        false,
    ),
    // Retry in ssh-add: the remembered passphrase was just rejected.
    rule(
        "openssh ssh-add.c",
        r"^Bad passphrase, try again for (.*?)( \(will confirm each use\))?: $",
        Some(1),
        Secret,
        true,
    ),
    // PIN for a PKCS#11 token label. Not anchored at the start.
    rule(
        "openssh ssh-pkcs11.c",
        r"Enter PIN for '(.*)': $",
        Some(1),
        Secret,
        false,
    ),
    rule(
        "openssh mux.c",
        r"^(Allow|Terminate) shared connection to (.*)\? $",
        Some(2),
        Confirmation,
        true,
    ),
    rule(
        "openssh mux.c",
        r"^Open (.* on .*)?$",
        Some(1),
        Confirmation,
        true,
    ),
    rule(
        "openssh mux.c",
        r"^Allow forward to (.*:.*)\? $",
        Some(1),
        Confirmation,
        true,
    ),
    rule(
        "openssh mux.c",
        r"^Disable further multiplexing on shared connection to (.*)? $",
        Some(1),
        Confirmation,
        true,
    ),
    rule(
        "openssh ssh-agent.c",
        r"^Allow use of key (.*)?\nKey fingerprint .*\.$",
        Some(1),
        Confirmation,
        true,
    ),
    rule(
        "openssh sshconnect.c",
        r"^Add key (.*) \(.*\) to agent\?$",
        Some(1),
        Confirmation,
        true,
    ),
    rule(
        "git imap-send.c",
        r"^Password \((.*@.*)\): $",
        Some(1),
        Secret,
        false,
    ),
    // Bare prompts without context: nothing to key a stored value on.
    rule("git credential.c", r"^Username: $", None, PlainText, true),
    rule("git credential.c", r"^Password: $", None, Secret, true),
    rule(
        "git credential.c",
        r"^Username for '(.*)': $",
        Some(1),
        PlainText,
        false,
    ),
    rule(
        "git credential.c",
        r"^Password for '(.*)': $",
        Some(1),
        Secret,
        false,
    ),
    rule(
        "git-lfs",
        r#"^Username for "(.*?)"$"#,
        Some(1),
        PlainText,
        false,
    ),
    rule(
        "git-lfs",
        r#"^Password for "(.*?)"$"#,
        Some(1),
        Secret,
        false,
    ),
    // Catch-all for "<something>'s password: ", keep last.
    rule(
        "mercurial",
        r"^(.*?)'s password: $",
        Some(1),
        Secret,
        false,
    ),
];

/// Compiled patterns, index-aligned with [`RULES`].
static COMPILED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|rule| Regex::new(rule.pattern).expect("classification rule patterns are valid"))
        .collect()
});

/// Result of matching a prompt against the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    /// Position of the matching rule in [`RULES`].
    pub index: usize,
    /// The classification produced by the rule.
    pub classification: Classification,
}

/// Match `prompt` against [`RULES`] without reporting anything.
///
/// A single trailing newline is ignored, so `$` also matches just before it.
/// Returns `None` when no rule matches.
pub fn match_rules(prompt: &str) -> Option<RuleMatch> {
    let prompt = prompt.strip_suffix('\n').unwrap_or(prompt);
    RULES
        .iter()
        .zip(COMPILED.iter())
        .enumerate()
        .find_map(|(index, (rule, regex))| {
            let captures = regex.captures(prompt)?;
            let identifier = rule
                .identifier_group
                .and_then(|group| captures.get(group))
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string);

            Some(RuleMatch {
                index,
                classification: Classification {
                    identifier,
                    kind: rule.kind,
                    skip_store: rule.skip_store,
                },
            })
        })
}

/// Classifies prompts and reports unrecognised ones to a sink.
pub struct PromptClassifier<'a> {
    sink: &'a dyn DiagnosticSink,
}

impl<'a> PromptClassifier<'a> {
    /// Create a classifier reporting to `sink`.
    pub fn new(sink: &'a dyn DiagnosticSink) -> Self {
        Self { sink }
    }

    /// Classify a prompt.
    ///
    /// Never fails: a prompt no rule recognises yields
    /// [`Classification::unrecognized`] and one
    /// [`Diagnostic::UnparsedPrompt`] event.
    pub fn classify(&self, prompt: &str) -> Classification {
        match match_rules(prompt) {
            Some(found) => found.classification,
            None => {
                self.sink.emit(Diagnostic::UnparsedPrompt {
                    prompt: prompt.to_string(),
                });
                Classification::unrecognized()
            }
        }
    }
}

/// Classify a prompt, logging unrecognised prompts through `tracing`.
pub fn classify(prompt: &str) -> Classification {
    PromptClassifier::new(&TracingSink).classify(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;

    fn check(prompt: &str, kind: RequestKind, identifier: Option<&str>, skip_store: bool) {
        let sink = RecordingSink::new();
        let result = PromptClassifier::new(&sink).classify(prompt);
        assert_eq!(
            result,
            Classification {
                identifier: identifier.map(str::to_string),
                kind,
                skip_store,
            },
            "prompt {:?}",
            prompt
        );
        assert!(sink.is_empty(), "unexpected diagnostics for {:?}", prompt);
    }

    fn rule_index(prompt: &str) -> usize {
        match_rules(prompt).expect("prompt should match").index
    }

    #[test]
    fn all_patterns_compile() {
        assert_eq!(COMPILED.len(), RULES.len());
        assert_eq!(RULES.len(), 20);
    }

    // OpenSSH

    #[test]
    fn ssh_password() {
        check(
            "alice@example.com's password: ",
            Secret,
            Some("alice@example.com"),
            false,
        );
        assert_eq!(rule_index("alice@example.com's password: "), 0);
    }

    #[test]
    fn ssh_password_jpake() {
        check(
            "alice@example.com's password (JPAKE): ",
            Secret,
            Some("alice@example.com"),
            false,
        );
    }

    #[test]
    fn ssh_password_change() {
        check(
            "Enter alice@example.com's old password: ",
            Secret,
            Some("alice@example.com"),
            true,
        );
        check(
            "Retype bob@host's new password: ",
            Secret,
            Some("bob@host"),
            true,
        );
        assert_eq!(rule_index("Enter bob@host's new password: "), 1);
    }

    #[test]
    fn ssh_key_passphrase() {
        check(
            "Enter passphrase for key '/home/u/.ssh/id_ed25519': ",
            Secret,
            Some("/home/u/.ssh/id_ed25519"),
            false,
        );
        check(
            "Enter passphrase for RSA key '/home/u/.ssh/id_rsa': ",
            Secret,
            Some("/home/u/.ssh/id_rsa"),
            false,
        );
        assert_eq!(
            rule_index("Enter passphrase for key '/home/u/.ssh/id_ed25519': "),
            2
        );
    }

    #[test]
    fn ssh_add_passphrase() {
        check(
            "Enter passphrase for /home/u/.ssh/id_ed25519: ",
            Secret,
            Some("/home/u/.ssh/id_ed25519"),
            false,
        );
        check(
            "Enter passphrase for /home/u/.ssh/id_ed25519 (will confirm each use): ",
            Secret,
            Some("/home/u/.ssh/id_ed25519"),
            false,
        );
        assert_eq!(rule_index("Enter passphrase for id: "), 3);
    }

    #[test]
    fn ssh_add_retry_skips_store() {
        check(
            "Bad passphrase, try again for /home/u/.ssh/id_rsa: ",
            Secret,
            Some("/home/u/.ssh/id_rsa"),
            true,
        );
        check(
            "Bad passphrase, try again for id (will confirm each use): ",
            Secret,
            Some("id"),
            true,
        );
    }

    #[test]
    fn retry_prompt_selects_retry_rule() {
        assert_eq!(rule_index("Bad passphrase, try again for id: "), 4);
        check("Bad passphrase, try again for id: ", Secret, Some("id"), true);
    }

    #[test]
    fn pkcs11_pin() {
        check("Enter PIN for 'Token#1': ", Secret, Some("Token#1"), false);
        assert_eq!(rule_index("Enter PIN for 'Token#1': "), 5);
    }

    #[test]
    fn pkcs11_pin_is_not_anchored_at_start() {
        check(
            "smartcard: Enter PIN for 'My Token': ",
            Secret,
            Some("My Token"),
            false,
        );
    }

    #[test]
    fn mux_shared_connection() {
        check(
            "Allow shared connection to example.com? ",
            Confirmation,
            Some("example.com"),
            true,
        );
        check(
            "Terminate shared connection to example.com? ",
            Confirmation,
            Some("example.com"),
            true,
        );
        assert_eq!(rule_index("Allow shared connection to h? "), 6);
    }

    #[test]
    fn mux_open() {
        check(
            "Open localhost:8080 on example.com",
            Confirmation,
            Some("localhost:8080 on example.com"),
            true,
        );
        assert_eq!(rule_index("Open a on b"), 7);
    }

    #[test]
    fn mux_open_without_target_has_no_identifier() {
        check("Open ", Confirmation, None, true);
    }

    #[test]
    fn mux_forward() {
        check("Allow forward to host:22? ", Confirmation, Some("host:22"), true);
        assert_eq!(rule_index("Allow forward to host:22? "), 8);
    }

    #[test]
    fn mux_disable_multiplexing() {
        check(
            "Disable further multiplexing on shared connection to example.com? ",
            Confirmation,
            Some("example.com?"),
            true,
        );
        assert_eq!(
            rule_index("Disable further multiplexing on shared connection to h? "),
            9
        );
    }

    #[test]
    fn agent_key_use() {
        check(
            "Allow use of key /home/u/.ssh/id_ed25519?\nKey fingerprint SHA256:abc.",
            Confirmation,
            Some("/home/u/.ssh/id_ed25519?"),
            true,
        );
        assert_eq!(
            rule_index("Allow use of key k?\nKey fingerprint SHA256:abc."),
            10
        );
    }

    #[test]
    fn agent_add_key() {
        check(
            "Add key /home/u/.ssh/id_ed25519 (SHA256:abc) to agent?",
            Confirmation,
            Some("/home/u/.ssh/id_ed25519"),
            true,
        );
        assert_eq!(rule_index("Add key k (c) to agent?"), 11);
    }

    // git

    #[test]
    fn git_imap_send() {
        check(
            "Password (alice@imap.example.com): ",
            Secret,
            Some("alice@imap.example.com"),
            false,
        );
        assert_eq!(rule_index("Password (a@b): "), 12);
    }

    #[test]
    fn git_bare_username() {
        check("Username: ", PlainText, None, true);
        assert_eq!(rule_index("Username: "), 13);
    }

    #[test]
    fn git_bare_password() {
        check("Password: ", Secret, None, true);
        assert_eq!(rule_index("Password: "), 14);
    }

    #[test]
    fn git_username_for_url() {
        check(
            "Username for 'https://github.com': ",
            PlainText,
            Some("https://github.com"),
            false,
        );
        assert_eq!(rule_index("Username for 'https://github.com': "), 15);
    }

    #[test]
    fn git_password_for_url() {
        check(
            "Password for 'https://alice@github.com': ",
            Secret,
            Some("https://alice@github.com"),
            false,
        );
        assert_eq!(rule_index("Password for 'https://github.com': "), 16);
    }

    #[test]
    fn git_lfs_username() {
        check(
            "Username for \"https://lfs.example.com\"",
            PlainText,
            Some("https://lfs.example.com"),
            false,
        );
        assert_eq!(rule_index("Username for \"x\""), 17);
    }

    #[test]
    fn git_lfs_password() {
        check(
            "Password for \"https://lfs.example.com\"",
            Secret,
            Some("https://lfs.example.com"),
            false,
        );
        assert_eq!(rule_index("Password for \"x\""), 18);
    }

    // mercurial

    #[test]
    fn mercurial_password() {
        check("hg.example.com's password: ", Secret, Some("hg.example.com"), false);
        assert_eq!(rule_index("hg.example.com's password: "), 19);
    }

    #[test]
    fn user_at_host_prefers_ssh_rule_over_generic() {
        assert_eq!(rule_index("u@h's password: "), 0);
    }

    // Fallback

    #[test]
    fn unmatched_prompt_uses_safe_default() {
        let sink = RecordingSink::new();
        let result = PromptClassifier::new(&sink).classify("Enter your secret code:");
        assert_eq!(result, Classification::unrecognized());
        assert_eq!(
            sink.events(),
            vec![Diagnostic::UnparsedPrompt {
                prompt: "Enter your secret code:".to_string()
            }]
        );
    }

    #[test]
    fn missing_trailing_space_is_unmatched() {
        assert!(match_rules("alice@example.com's password:").is_none());
        assert!(match_rules("Password:").is_none());
    }

    #[test]
    fn single_trailing_newline_is_ignored() {
        check("Username: \n", PlainText, None, true);
        check(
            "alice@host's password: \n",
            Secret,
            Some("alice@host"),
            false,
        );
        assert_eq!(rule_index("Username: \n"), 13);
        assert_eq!(
            rule_index("Allow use of key k?\nKey fingerprint SHA256:abc.\n"),
            10
        );
    }

    #[test]
    fn only_one_trailing_newline_is_ignored() {
        assert!(match_rules("Username: \n\n").is_none());
        assert!(match_rules("Username: \r\n").is_none());
    }

    #[test]
    fn empty_prompt_is_unmatched() {
        let sink = RecordingSink::new();
        let result = PromptClassifier::new(&sink).classify("");
        assert_eq!(result, Classification::unrecognized());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(match_rules("username: ").is_none());
        assert!(match_rules("ENTER PASSPHRASE FOR key: ").is_none());
    }

    #[test]
    fn classification_is_repeatable() {
        let sink = RecordingSink::new();
        let classifier = PromptClassifier::new(&sink);
        let first = classifier.classify("Enter passphrase for id: ");
        let second = classifier.classify("Enter passphrase for id: ");
        assert_eq!(first, second);
    }

    #[test]
    fn free_function_matches_classifier() {
        assert_eq!(
            classify("Password for 'https://github.com': "),
            Classification {
                identifier: Some("https://github.com".to_string()),
                kind: Secret,
                skip_store: false,
            }
        );
    }
}
