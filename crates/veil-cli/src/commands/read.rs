//! Read command implementation.

use anyhow::{anyhow, Result};
use colored::Colorize;
use std::path::Path;
use tracing::info;
use veil_core::render::{self, OutputFormat};
use veil_core::{document, get, Engine};
use veil_types::{FieldPath, Tree, TreeMap};

use super::{identity_sources, note, pass, print_document, read_document, Context};
use crate::cli::{IdentityArgs, PassphraseArgs};

#[allow(clippy::too_many_arguments)]
pub fn execute(
    ctx: &Context,
    file: &Path,
    identities: &IdentityArgs,
    passphrase: &PassphraseArgs,
    output: OutputFormat,
    raw: bool,
    path: Option<&str>,
    private_only: bool,
    public_only: bool,
) -> Result<()> {
    let (text, format) = read_document(file)?;

    let (mut tree, fields) = if raw {
        (document::parse(&text, format)?, Vec::new())
    } else {
        let engine = Engine::from_settings(&ctx.settings);
        let sources = identity_sources(&ctx.settings, identities, passphrase)?;
        let loaded = engine.load_document(&text, format, &sources)?;

        let locked = loaded.still_encrypted().count();
        if locked > 0 {
            ctx.status(format!(
                "{} {} fields could not be decrypted",
                note(),
                locked.to_string().yellow()
            ));
        }
        if ctx.verbose {
            eprintln!("{} Processed {} encrypted fields", pass(), loaded.fields.len());
        }
        info!(file = %file.display(), fields = loaded.fields.len(), "Read document");
        (loaded.tree, loaded.fields)
    };

    if private_only {
        tree = render::private_only(&tree, &fields);
    } else if public_only {
        tree = render::public_only(&tree, &fields);
    }

    if let Some(raw_path) = path {
        tree = extract(&tree, raw_path)?;
    }

    print_document(&render::render(&tree, output)?);
    Ok(())
}

/// The value at `raw_path`, wrapped in a single-entry table keyed by the path.
fn extract(tree: &Tree, raw_path: &str) -> Result<Tree> {
    let path = FieldPath::parse(raw_path)?;
    let value = get(tree, &path).ok_or_else(|| anyhow!("Path not found: {}", raw_path))?;

    let mut wrapped = TreeMap::new();
    wrapped.insert(raw_path.to_string(), value.clone());
    Ok(Tree::Object(wrapped))
}
