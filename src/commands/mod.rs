// src/commands/mod.rs
//! Command handlers for the gencontrol CLI

mod generate;
mod show;

pub use generate::cmd_generate;
pub use show::{cmd_show, cmd_tree};
