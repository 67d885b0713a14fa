//! Set command implementation.

use anyhow::{bail, Context as _, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;
use tracing::info;
use veil_core::{document, find_fields, set, Engine};
use veil_crypto::{is_armored, stanza_kinds, Recipient};
use veil_types::{FieldPath, Tree};

use super::{edit_sources, note, pass, print_document, read_document, Context};
use crate::cli::{IdentityArgs, PassphraseArgs, RecipientArgs};

#[allow(clippy::too_many_arguments)]
pub fn execute(
    ctx: &Context,
    file: &Path,
    raw_path: &str,
    raw_value: &str,
    json: bool,
    identities: &IdentityArgs,
    recipients: &RecipientArgs,
    passphrase: &PassphraseArgs,
    in_place: bool,
) -> Result<()> {
    let path = FieldPath::parse(raw_path)?;
    let value = parse_value(raw_value, json)?;
    let (text, format) = read_document(file)?;

    let sources = edit_sources(&ctx.settings, identities, recipients, passphrase)?;
    let identities = sources.load_identities()?;
    let recipients = require_recipients(sources.load_recipients()?)?;

    let engine = Engine::from_settings(&ctx.settings);
    let widest = widest_recipient_set(&document::parse(&text, format)?)?;
    if widest > recipients.len() {
        ctx.status(format!(
            "{} Some fields are sealed to {} recipients but only {} given; the others will lose access",
            note(),
            widest,
            recipients.len()
        ));
    }
    let (out, fields) = engine.transform(&text, format, &identities, &recipients, |tree| {
        set(tree, &path, value)
    })?;
    info!(file = %file.display(), path = %path, "Set value");

    if in_place {
        fs::write(file, &out).with_context(|| format!("Failed to write {}", file.display()))?;
        ctx.status(format!(
            "{} Set {} in {} ({} encrypted fields)",
            pass(),
            path.to_string().cyan(),
            file.display(),
            fields.len()
        ));
    } else {
        print_document(&out);
    }
    Ok(())
}

fn parse_value(raw: &str, json: bool) -> Result<Tree> {
    if json {
        serde_json::from_str(raw).with_context(|| format!("Value is not valid JSON: {}", raw))
    } else {
        Ok(Tree::String(raw.to_string()))
    }
}

/// Every field is re-sealed, so the full recipient list must be given.
fn require_recipients(recipients: Vec<Recipient>) -> Result<Vec<Recipient>> {
    if recipients.is_empty() {
        bail!("No recipients specified (use --recipient, --recipients-file, or --passphrase)");
    }
    Ok(recipients)
}

/// Largest number of key stanzas on any sealed field.
fn widest_recipient_set(tree: &Tree) -> Result<usize> {
    let sealed = find_fields(tree, |_, _, value| value.as_str().map_or(false, is_armored))?;
    Ok(sealed
        .iter()
        .filter_map(|field| field.value.as_str().and_then(|text| stanza_kinds(text).ok()))
        .map(|kinds| kinds.iter().filter(|kind| kind.as_str() == "X25519").count())
        .max()
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use veil_crypto::generate_identity;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("5432", false).unwrap(), json!("5432"));
        assert_eq!(parse_value("5432", true).unwrap(), json!(5432));
        assert_eq!(parse_value("{\"a\": [1]}", true).unwrap(), json!({"a": [1]}));
        assert!(parse_value("{oops", true).is_err());
    }

    #[test]
    fn test_recipients_required() {
        assert!(require_recipients(Vec::new()).is_err());

        let explicit = generate_identity().to_recipient();
        let kept = require_recipients(vec![explicit.clone()]).unwrap();
        assert_eq!(kept[0].label(), explicit.label());
    }

    #[test]
    fn test_widest_recipient_set() {
        let engine = Engine::default();
        let recipients = [generate_identity().to_recipient(), generate_identity().to_recipient()];
        let tree = json!({"name": "app", "private_a": "x", "nested": {"private_b": 1}});
        assert_eq!(widest_recipient_set(&tree).unwrap(), 0);

        let saved = engine.save(&tree, &recipients).unwrap();
        assert_eq!(widest_recipient_set(&saved.tree).unwrap(), 2);

        let saved = engine.save(&tree, &recipients[..1]).unwrap();
        assert_eq!(widest_recipient_set(&saved.tree).unwrap(), 1);
    }
}
