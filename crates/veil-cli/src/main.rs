//! Veil CLI entry point.

use clap::Parser;
use colored::Colorize;

mod cli;
mod commands;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = cli.execute() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
