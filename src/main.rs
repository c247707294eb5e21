// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate(args) => commands::cmd_generate(&args),
        Commands::Show {
            category,
            arch,
            featureset,
            flavour,
            config,
        } => commands::cmd_show(
            &category,
            arch.as_deref(),
            featureset.as_deref(),
            flavour.as_deref(),
            &config.config_dirs,
        ),
        Commands::Tree { config } => commands::cmd_tree(&config.config_dirs),
    }
}
