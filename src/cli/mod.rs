// src/cli/mod.rs
//! CLI definitions for gencontrol
//!
//! This module contains the command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! - `generate` - Write `debian/control`, `debian/rules.gen` and the config dump
//! - `show` - Print the resolved view of one config category
//! - `tree` - Print the architecture / featureset / flavour tree

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gencontrol")]
#[command(author = "Gencontrol Contributors")]
#[command(version)]
#[command(about = "Generate Debian kernel packaging from arch/featureset/flavour configuration", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Configuration directories shared by every command
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Configuration directory; repeat to overlay, the first match wins
    #[arg(short = 'c', long = "config", value_name = "DIR", default_value = "debian/config")]
    pub config_dirs: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Template directory; repeat to overlay, the first match wins
    #[arg(short = 't', long = "templates", value_name = "DIR", default_value = "debian/templates")]
    pub template_dirs: Vec<PathBuf>,

    /// Changelog providing the package version
    #[arg(long, value_name = "FILE", default_value = "debian/changelog")]
    pub changelog: PathBuf,

    /// Use this version instead of reading the changelog
    #[arg(long)]
    pub version: Option<String>,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = "debian")]
    pub output: PathBuf,

    /// Run `kernel-wedge gen-control` in this directory for installer packages
    #[arg(long, value_name = "DIR")]
    pub installer_dir: Option<PathBuf>,

    /// Skip writing the configuration dump
    #[arg(long)]
    pub no_dump: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate control and rules files
    Generate(GenerateArgs),

    /// Show the resolved configuration of a category at one scope
    Show {
        /// Config category, e.g. base, image, description
        category: String,

        #[arg(long)]
        arch: Option<String>,

        #[arg(long)]
        featureset: Option<String>,

        #[arg(long)]
        flavour: Option<String>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Show the axis tree, marking disabled nodes
    Tree {
        #[command(flatten)]
        config: ConfigArgs,
    },
}
