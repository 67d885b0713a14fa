//! CLI command implementations.

pub mod encrypt;
pub mod inspect;
pub mod read;
pub mod set;
pub mod verify;

use anyhow::{bail, Context as _, Result};
use colored::Colorize;
use dialoguer::Password;
use secrecy::SecretString;
use std::fs;
use std::path::Path;
use veil_core::Format;
use veil_crypto::{KeySources, PassphraseSource};
use veil_types::Settings;

use crate::cli::{IdentityArgs, PassphraseArgs, RecipientArgs};

/// State shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub settings: Settings,
    pub verbose: bool,
    pub quiet: bool,
}

impl Context {
    /// Print a status line to stderr unless `--quiet` was given.
    pub fn status(&self, message: impl std::fmt::Display) {
        if !self.quiet {
            eprintln!("{}", message);
        }
    }
}

/// Read a document and work out its format from the extension.
pub fn read_document(path: &Path) -> Result<(String, Format)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok((text, Format::from_path(path)))
}

/// Write `contents` to `path`, refusing to replace an existing file unless `force`.
pub fn write_file(path: &Path, contents: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Output file exists: {} (use --force to overwrite)",
            path.display()
        );
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// Print a document to stdout, adding a final newline if it lacks one.
pub fn print_document(text: &str) {
    if text.ends_with('\n') {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
}

/// Key sources for decrypting: flags first, config file identities otherwise.
pub fn identity_sources(
    settings: &Settings,
    identities: &IdentityArgs,
    passphrase: &PassphraseArgs,
) -> Result<KeySources> {
    let mut sources = KeySources::new();
    add_identities(&mut sources, settings, identities);
    if let Some(source) = passphrase_source(passphrase, false)? {
        sources = sources.with_passphrase(source);
    }
    Ok(sources)
}

/// Key sources for encrypting: flags first, config file recipients otherwise.
pub fn recipient_sources(
    settings: &Settings,
    recipients: &RecipientArgs,
    passphrase: &PassphraseArgs,
) -> Result<KeySources> {
    let mut sources = KeySources::new();
    add_recipients(&mut sources, settings, recipients);
    if let Some(source) = passphrase_source(passphrase, true)? {
        sources = sources.with_passphrase(source);
    }
    Ok(sources)
}

/// Key sources for commands that both decrypt and encrypt.
pub fn edit_sources(
    settings: &Settings,
    identities: &IdentityArgs,
    recipients: &RecipientArgs,
    passphrase: &PassphraseArgs,
) -> Result<KeySources> {
    let mut sources = KeySources::new();
    add_identities(&mut sources, settings, identities);
    add_recipients(&mut sources, settings, recipients);
    if let Some(source) = passphrase_source(passphrase, false)? {
        sources = sources.with_passphrase(source);
    }
    Ok(sources)
}

fn add_identities(sources: &mut KeySources, settings: &Settings, args: &IdentityArgs) {
    if args.identity.is_empty() && args.key.is_none() {
        sources.identity_files.extend(settings.identity_files.iter().cloned());
        return;
    }
    sources.identity_files.extend(args.identity.iter().cloned());
    sources.identities.extend(args.key.iter().cloned());
}

fn add_recipients(sources: &mut KeySources, settings: &Settings, args: &RecipientArgs) {
    if args.recipients_file.is_empty() && args.recipient.is_empty() {
        sources.recipient_files.extend(settings.recipient_files.iter().cloned());
        sources.recipients.extend(settings.recipients.iter().cloned());
        return;
    }
    sources.recipient_files.extend(args.recipients_file.iter().cloned());
    sources.recipients.extend(
        args.recipient
            .iter()
            .map(|key| key.trim())
            .filter(|key| !key.is_empty())
            .map(String::from),
    );
}

fn passphrase_source(args: &PassphraseArgs, confirm: bool) -> Result<Option<PassphraseSource>> {
    if let Some(path) = &args.passphrase_file {
        return Ok(Some(PassphraseSource::File(path.clone())));
    }
    if let Some(var) = &args.passphrase_env {
        return Ok(Some(PassphraseSource::Env(var.clone())));
    }
    if !args.passphrase {
        return Ok(None);
    }

    let mut prompt = Password::new().with_prompt("Passphrase");
    if confirm {
        prompt = prompt.with_confirmation("Confirm passphrase", "Passphrases do not match");
    }
    let passphrase = prompt.interact().context("Failed to read passphrase")?;
    Ok(Some(PassphraseSource::Value(SecretString::from(passphrase))))
}

/// Mark for a passed check.
pub fn pass() -> colored::ColoredString {
    "✓".green().bold()
}

/// Mark for a failed check.
pub fn fail() -> colored::ColoredString {
    "✗".red().bold()
}

/// Mark for a neutral note.
pub fn note() -> colored::ColoredString {
    "ℹ".cyan().bold()
}
