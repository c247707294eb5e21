// src/commands/show.rs

//! Read-only inspection of the configuration tree

use anyhow::{Context, Result};
use gencontrol::config::{AxisPath, ConfigStore};
use std::path::PathBuf;
use tracing::warn;

fn load(dirs: &[PathBuf]) -> Result<ConfigStore> {
    ConfigStore::load(dirs).context("Failed to load configuration")
}

/// Print the resolved view of `category` at the given scope as JSON
pub fn cmd_show(
    category: &str,
    arch: Option<&str>,
    featureset: Option<&str>,
    flavour: Option<&str>,
    dirs: &[PathBuf],
) -> Result<()> {
    let config = load(dirs)?;
    if !config.schema().has_category(category) {
        warn!("Category '{}' is not declared in the schema", category);
    }

    let path = AxisPath::from_parts(arch, featureset, flavour);
    let view = config.merge(category, &path);
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

/// Print the axis tree
pub fn cmd_tree(dirs: &[PathBuf]) -> Result<()> {
    let config = load(dirs)?;
    let marker = |path: &AxisPath| {
        if config.is_enabled(path) {
            ""
        } else {
            " (disabled)"
        }
    };

    for arch in config.arches()? {
        let arch_path = AxisPath::arch(arch.as_str());
        println!("{}{}", arch, marker(&arch_path));
        for featureset in config.featuresets(&arch) {
            let fs_path = arch_path.child(featureset.as_str());
            println!("  {}{}", featureset, marker(&fs_path));
            for flavour in config.flavours(&arch, &featureset) {
                let path = fs_path.child(flavour.as_str());
                println!("    {}{}", flavour, marker(&path));
            }
        }
    }
    Ok(())
}
