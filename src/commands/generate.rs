// src/commands/generate.rs

//! `gencontrol generate`
//!
//! Everything is rendered before the first file is touched, so a failure at
//! any step leaves the output directory as it was.

use crate::cli::GenerateArgs;
use anyhow::{Context, Result};
use gencontrol::config::ConfigStore;
use gencontrol::control::Templates;
use gencontrol::external::{ChangelogReader, DebianChangelog};
use gencontrol::generator::kernel::{self, KernelSettings};
use gencontrol::generator::{Generator, LevelState};
use gencontrol::version::LinuxVersion;
use gencontrol::writer::{render_control, render_dump, render_rules, write_atomic};
use tracing::info;

/// Version from the command line, or from the newest changelog entry
fn resolve_version(args: &GenerateArgs) -> Result<LinuxVersion> {
    let text = match &args.version {
        Some(version) => version.clone(),
        None => {
            let entry = DebianChangelog::new(&args.changelog)
                .latest()
                .with_context(|| format!("Failed to read {}", args.changelog.display()))?;
            info!("Using {} {} from changelog", entry.source, entry.version);
            entry.version
        }
    };
    Ok(LinuxVersion::parse(&text)?)
}

pub fn cmd_generate(args: &GenerateArgs) -> Result<()> {
    let config = ConfigStore::load(&args.config.config_dirs).context("Failed to load configuration")?;
    let templates = Templates::new(&args.template_dirs);
    let version = resolve_version(args)?;

    let hooks = kernel::hooks(KernelSettings {
        version,
        installer_dir: args.installer_dir.clone(),
    });
    let output = Generator::new(&config, &templates, hooks)
        .run(LevelState::default())
        .context("Generation failed")?;

    let control = render_control(&output.packages)?;
    let rules = render_rules(&output.rules);
    let dump = if args.no_dump {
        None
    } else {
        Some(render_dump(&config)?)
    };

    write_atomic(&args.output.join("control"), &control)?;
    write_atomic(&args.output.join("rules.gen"), &rules)?;
    if let Some(dump) = dump {
        write_atomic(&args.output.join("config.defines.dump"), &dump)?;
    }

    println!(
        "Generated {} packages and {} rules in {}",
        output.packages.len(),
        output.rules.len(),
        args.output.display()
    );
    Ok(())
}
