//! Encrypt command implementation.

use anyhow::{bail, Result};
use colored::Colorize;
use std::path::Path;
use tracing::info;
use veil_core::{document, Engine, PatternPolicy, PrefixPolicy};
use veil_crypto::is_armored;
use veil_types::SealFailure;

use super::{note, pass, print_document, read_document, recipient_sources, write_file, Context};
use crate::cli::{PassphraseArgs, RecipientArgs};

#[allow(clippy::too_many_arguments)]
pub fn execute(
    ctx: &Context,
    file: &Path,
    recipients: &RecipientArgs,
    passphrase: &PassphraseArgs,
    output: Option<&Path>,
    force: bool,
    prefix: Option<&str>,
    pattern: Option<&str>,
    strict: bool,
    dry_run: bool,
    stats: bool,
) -> Result<()> {
    let (text, format) = read_document(file)?;
    let tree = document::parse(&text, format)?;
    let engine = build_engine(ctx, prefix, pattern, strict)?;

    if dry_run {
        let targets = engine.targets(&tree)?;
        if targets.is_empty() {
            println!("{} No fields found with the specified prefix", note());
            return Ok(());
        }
        println!("Would encrypt {} fields:", targets.len());
        for target in &targets {
            let sealed = target.value.as_str().map_or(false, is_armored);
            if sealed {
                println!("  - {} {}", target.path, "(already encrypted)".dimmed());
            } else {
                println!("  - {}", target.path);
            }
        }
        return Ok(());
    }

    let sources = recipient_sources(&ctx.settings, recipients, passphrase)?;
    let recipients = sources.load_recipients()?;
    if recipients.is_empty() {
        bail!("No recipients specified (use --recipient, --recipients-file, or --passphrase)");
    }

    let saved = engine.save(&tree, &recipients)?;
    let out = document::serialize(&saved.tree, format)?;
    info!(file = %file.display(), fields = saved.fields.len(), "Encrypted document");

    match output {
        Some(path) => {
            write_file(path, &out, force)?;
            ctx.status(format!(
                "{} Encrypted configuration written to: {}",
                pass(),
                path.display().to_string().cyan()
            ));
        }
        None => print_document(&out),
    }

    if stats {
        eprintln!("{} Encrypted {} fields", pass(), saved.fields.len());
        if ctx.verbose {
            for field in &saved.fields {
                eprintln!("  - {}", field.path);
            }
        }
    }

    Ok(())
}

fn build_engine(ctx: &Context, prefix: Option<&str>, pattern: Option<&str>, strict: bool) -> Result<Engine> {
    let mut engine = Engine::from_settings(&ctx.settings);
    if let Some(pattern) = pattern {
        engine = engine.with_policy(PatternPolicy::new(pattern)?);
    } else if let Some(prefix) = prefix {
        if prefix.is_empty() {
            bail!("Prefix must not be empty");
        }
        engine = engine.with_policy(PrefixPolicy::new(prefix));
    }
    if strict {
        let mut options = *engine.options();
        options.seal_failure = SealFailure::Abort;
        engine = engine.with_options(options);
    }
    Ok(engine)
}
