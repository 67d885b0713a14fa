//! Verify command implementation.

use anyhow::{bail, Result};
use std::path::Path;
use veil_core::{document, find_fields, Engine};
use veil_crypto::{is_armored, stanza_kinds};

use super::{fail, identity_sources, note, pass, read_document, Context};
use crate::cli::{IdentityArgs, PassphraseArgs};

pub fn execute(
    ctx: &Context,
    file: &Path,
    identities: &IdentityArgs,
    passphrase: &PassphraseArgs,
    check_format: bool,
    check_armor: bool,
    check_all: bool,
) -> Result<()> {
    let keys_given = !identities.identity.is_empty()
        || identities.key.is_some()
        || passphrase.passphrase
        || passphrase.passphrase_file.is_some()
        || passphrase.passphrase_env.is_some();
    let nothing_selected = !check_format && !check_armor && !check_all && !keys_given;

    let check_format = check_format || check_all || nothing_selected;
    let check_armor = check_armor || check_all || nothing_selected;
    let check_decrypt = check_all || keys_given;

    let (text, format) = read_document(file)?;
    let mut errors = 0;

    let tree = match document::parse(&text, format) {
        Ok(tree) => {
            if check_format {
                println!("{} {} format valid", pass(), format.to_string().to_uppercase());
            }
            tree
        }
        Err(e) => {
            println!("{} {} format invalid: {}", fail(), format.to_string().to_uppercase(), e);
            bail!("Verification failed");
        }
    };

    if check_armor {
        let armored = find_fields(&tree, |_, _, value| value.as_str().map_or(false, is_armored))?;
        if armored.is_empty() {
            println!("{} No armor blocks found to verify", note());
        } else {
            let mut valid = 0;
            for field in &armored {
                match field.value.as_str().map(stanza_kinds) {
                    Some(Ok(kinds)) if !kinds.is_empty() => valid += 1,
                    Some(Err(e)) => println!("{} Invalid armor at {}: {}", fail(), field.path, e),
                    _ => println!("{} No recipient stanzas at {}", fail(), field.path),
                }
            }
            if valid == armored.len() {
                println!("{} All {} armor blocks are valid", pass(), valid);
            } else {
                errors += armored.len() - valid;
            }
        }
    }

    if check_decrypt {
        let engine = Engine::from_settings(&ctx.settings);
        let sources = identity_sources(&ctx.settings, identities, passphrase)?;
        let loaded = engine.load(&tree, &sources.load_identities()?)?;

        let locked: Vec<_> = loaded.still_encrypted().collect();
        if loaded.fields.is_empty() {
            println!("{} No encrypted fields found", note());
        } else if locked.is_empty() {
            println!("{} {} fields successfully decrypted", pass(), loaded.fields.len());
        } else {
            println!("{} {} fields could not be decrypted", fail(), locked.len());
            if ctx.verbose {
                for field in &locked {
                    println!("  - {}", field.path);
                }
            }
            errors += locked.len();
        }
    }

    if errors > 0 {
        bail!("Verification failed with {} errors", errors);
    }
    Ok(())
}
