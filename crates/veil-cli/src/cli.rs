//! CLI structure and command definitions.

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use veil_core::{Config, OutputFormat};
use veil_types::LogLevel;

use crate::commands::{self, Context};

#[derive(Parser)]
#[command(name = "veil")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Selectively encrypt fields of TOML, YAML, and JSON configuration files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (defaults to ~/.config/veil/config.yml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Identities used to decrypt.
#[derive(Args, Debug, Clone, Default)]
pub struct IdentityArgs {
    /// Identity file holding AGE-SECRET-KEY lines (repeatable)
    #[arg(short, long = "identity", value_name = "FILE")]
    pub identity: Vec<PathBuf>,

    /// Inline identity (AGE-SECRET-KEY-1...)
    #[arg(short, long, value_name = "KEY", env = "VEIL_KEY", hide_env_values = true)]
    pub key: Option<String>,
}

/// Recipients used to encrypt.
#[derive(Args, Debug, Clone, Default)]
pub struct RecipientArgs {
    /// Recipients file holding age1... lines (repeatable)
    #[arg(short = 'r', long = "recipients-file", value_name = "FILE")]
    pub recipients_file: Vec<PathBuf>,

    /// Recipient public key; may be repeated or comma-separated
    #[arg(long = "recipient", value_name = "KEY", value_delimiter = ',')]
    pub recipient: Vec<String>,
}

/// Passphrase instead of, or alongside, keys.
#[derive(Args, Debug, Clone, Default)]
pub struct PassphraseArgs {
    /// Prompt for a passphrase
    #[arg(short, long, conflicts_with_all = ["passphrase_file", "passphrase_env"])]
    pub passphrase: bool,

    /// Read the passphrase from the first line of a file
    #[arg(long, value_name = "FILE", conflicts_with = "passphrase_env")]
    pub passphrase_file: Option<PathBuf>,

    /// Read the passphrase from an environment variable
    #[arg(long, value_name = "VAR")]
    pub passphrase_env: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decrypt a configuration file and print it
    #[command(visible_aliases = ["decrypt", "show", "view"])]
    Read {
        /// Configuration file
        file: PathBuf,

        #[command(flatten)]
        identities: IdentityArgs,

        #[command(flatten)]
        passphrase: PassphraseArgs,

        /// Output format (toml, json, yaml, env, flat)
        #[arg(short, long, default_value_t = OutputFormat::Toml)]
        output: OutputFormat,

        /// Print the file as stored, without decrypting
        #[arg(long)]
        raw: bool,

        /// Only print the value at this path, e.g. database.password
        #[arg(long, value_name = "PATH")]
        path: Option<String>,

        /// Only print fields that were encrypted
        #[arg(long, conflicts_with = "public_only")]
        private_only: bool,

        /// Only print fields that were not encrypted
        #[arg(long)]
        public_only: bool,
    },

    /// Encrypt the private fields of a configuration file
    #[command(visible_aliases = ["enc", "generate"])]
    Encrypt {
        /// Configuration file
        file: PathBuf,

        #[command(flatten)]
        recipients: RecipientArgs,

        #[command(flatten)]
        passphrase: PassphraseArgs,

        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(short, long)]
        force: bool,

        /// Key prefix marking fields to encrypt
        #[arg(long, value_name = "PREFIX")]
        prefix: Option<String>,

        /// Regular expression on keys marking fields to encrypt
        #[arg(long, value_name = "REGEX", conflicts_with = "prefix")]
        pattern: Option<String>,

        /// Fail if any field cannot be encrypted
        #[arg(long)]
        strict: bool,

        /// List the fields that would be encrypted and exit
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Print how many fields were encrypted
        #[arg(long)]
        stats: bool,
    },

    /// Show which fields of a file are encrypted
    Inspect {
        /// Configuration file
        file: PathBuf,

        /// List encrypted field paths
        #[arg(long)]
        fields: bool,

        /// Show the recipient types of each encrypted field
        #[arg(long)]
        recipients: bool,

        /// Show file statistics
        #[arg(long)]
        stats: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that a file parses and its encrypted fields are sound
    Verify {
        /// Configuration file
        file: PathBuf,

        #[command(flatten)]
        identities: IdentityArgs,

        #[command(flatten)]
        passphrase: PassphraseArgs,

        /// Check that the document parses
        #[arg(long)]
        check_format: bool,

        /// Check every encrypted field's armor and header
        #[arg(long)]
        check_armor: bool,

        /// Run every check, including decryption
        #[arg(long)]
        check_all: bool,
    },

    /// Set a value and re-encrypt the file
    Set {
        /// Configuration file
        file: PathBuf,

        /// Field path, e.g. database.private_password or servers[0].host
        path: String,

        /// New value
        value: String,

        /// Parse VALUE as JSON instead of taking it as a string
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        identities: IdentityArgs,

        #[command(flatten)]
        recipients: RecipientArgs,

        #[command(flatten)]
        passphrase: PassphraseArgs,

        /// Rewrite the file instead of printing to stdout
        #[arg(long)]
        in_place: bool,
    },
}

impl Cli {
    pub fn execute(&self) -> Result<()> {
        let ctx = self.context()?;

        match &self.command {
            Commands::Read {
                file,
                identities,
                passphrase,
                output,
                raw,
                path,
                private_only,
                public_only,
            } => commands::read::execute(
                &ctx,
                file,
                identities,
                passphrase,
                *output,
                *raw,
                path.as_deref(),
                *private_only,
                *public_only,
            ),
            Commands::Encrypt {
                file,
                recipients,
                passphrase,
                output,
                force,
                prefix,
                pattern,
                strict,
                dry_run,
                stats,
            } => commands::encrypt::execute(
                &ctx,
                file,
                recipients,
                passphrase,
                output.as_deref(),
                *force,
                prefix.as_deref(),
                pattern.as_deref(),
                *strict,
                *dry_run,
                *stats,
            ),
            Commands::Inspect {
                file,
                fields,
                recipients,
                stats,
                json,
            } => commands::inspect::execute(file, *fields, *recipients, *stats, *json),
            Commands::Verify {
                file,
                identities,
                passphrase,
                check_format,
                check_armor,
                check_all,
            } => commands::verify::execute(
                &ctx,
                file,
                identities,
                passphrase,
                *check_format,
                *check_armor,
                *check_all,
            ),
            Commands::Set {
                file,
                path,
                value,
                json,
                identities,
                recipients,
                passphrase,
                in_place,
            } => commands::set::execute(
                &ctx,
                file,
                path,
                value,
                *json,
                identities,
                recipients,
                passphrase,
                *in_place,
            ),
        }
    }

    /// Resolve settings from the config file and environment, then start logging.
    fn context(&self) -> Result<Context> {
        let config = match &self.config {
            Some(path) => Config::load(path),
            None => Config::load_default(),
        }
        .context("Failed to load configuration")?
        .with_env()
        .context("Invalid environment configuration")?;

        let mut settings = config.settings()?;
        if self.verbose {
            settings.log.level = settings.log.level.max(LogLevel::Info);
        } else if self.quiet {
            settings.log.level = settings.log.level.min(LogLevel::Error);
        }

        if let Err(e) = veil_core::log::init(&settings.log) {
            eprintln!("Warning: {}", e);
        }
        debug!(config = ?config.file_path(), "Resolved settings");

        Ok(Context {
            settings,
            verbose: self.verbose,
            quiet: self.quiet,
        })
    }
}
