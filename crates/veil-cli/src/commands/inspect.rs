//! Inspect command implementation.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use veil_core::walk::leaf_paths;
use veil_core::{document, find_fields};
use veil_crypto::{is_armored, stanza_kinds};
use veil_types::{FieldPath, Tree};

use super::read_document;

/// What `inspect` reports about a file.
#[derive(Debug, Serialize)]
struct Report {
    file: String,
    size_bytes: usize,
    total_fields: usize,
    encrypted_fields: Vec<EncryptedField>,
}

#[derive(Debug, Serialize)]
struct EncryptedField {
    path: FieldPath,
    /// Stanza types from the age header; None if the header is unreadable
    recipients: Option<Vec<String>>,
}

pub fn execute(file: &Path, fields: bool, recipients: bool, stats: bool, json: bool) -> Result<()> {
    let (text, format) = read_document(file)?;
    let tree = document::parse(&text, format)?;
    let report = build_report(&file.display().to_string(), text.len(), &tree)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let detailed = fields || recipients || stats;

    if stats {
        println!("{}", "Statistics:".bold());
        println!("  File:             {}", report.file.cyan());
        println!("  Total fields:     {}", report.total_fields);
        println!("  Encrypted fields: {}", report.encrypted_fields.len());
        println!("  File size:        {} bytes", report.size_bytes);
    }

    if fields {
        if report.encrypted_fields.is_empty() {
            println!("No encrypted fields found");
        } else {
            println!("{}", "Encrypted Fields:".bold());
            for field in &report.encrypted_fields {
                println!("  - {}", field.path);
            }
        }
    }

    if recipients {
        println!("{}", "Recipients:".bold());
        for field in &report.encrypted_fields {
            match &field.recipients {
                Some(kinds) => println!("  {}: {}", field.path, kinds.join(", ")),
                None => println!("  {}: {}", field.path, "(could not extract recipients)".dimmed()),
            }
        }
    }

    if !detailed {
        println!("File: {}", report.file.cyan());
        println!("Encrypted fields: {}", report.encrypted_fields.len());
        for field in &report.encrypted_fields {
            println!("  - {}", field.path);
        }
    }

    Ok(())
}

fn build_report(file: &str, size_bytes: usize, tree: &Tree) -> Result<Report> {
    let encrypted_fields = find_fields(tree, |_, _, value| value.as_str().map_or(false, is_armored))?
        .into_iter()
        .map(|field| EncryptedField {
            recipients: field.value.as_str().and_then(|armored| stanza_kinds(armored).ok()),
            path: field.path,
        })
        .collect();

    Ok(Report {
        file: file.to_string(),
        size_bytes,
        total_fields: leaf_paths(tree)?.len(),
        encrypted_fields,
    })
}
