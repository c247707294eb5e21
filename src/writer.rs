// src/writer.rs

//! Serializers for the generated control file, rules fragment and config dump
//!
//! All rendering happens in memory. [`write_atomic`] then replaces each file
//! through a temporary sibling, so readers never observe a partial file.

use crate::config::ConfigStore;
use crate::control::{Package, PackageList};
use crate::error::{Error, Result};
use crate::rules::RuleGraph;
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Render one stanza, validating its identifying field
fn render_stanza(out: &mut String, package: &Package, key: &str, stanza: &str) -> Result<()> {
    if package.text(key).is_none_or(|text| text.trim().is_empty()) {
        return Err(Error::MissingField {
            field: key.to_string(),
            stanza: stanza.to_string(),
        });
    }
    for (field, value) in package.fields() {
        if value.is_empty() {
            continue;
        }
        // Writing to a String cannot fail
        let _ = writeln!(out, "{}: {}", field, value);
    }
    Ok(())
}

/// Render the `debian/control` text: source stanza first, then binaries
pub fn render_control(packages: &PackageList) -> Result<String> {
    let mut stanzas = Vec::new();

    if let Some(source) = packages.source() {
        let mut out = String::new();
        render_stanza(&mut out, source, "Source", "source")?;
        stanzas.push(out);
    }
    for (i, package) in packages.binaries().enumerate() {
        let mut out = String::new();
        let label = package
            .text("Package")
            .map(str::to_string)
            .unwrap_or_else(|| format!("binary #{}", i + 1));
        render_stanza(&mut out, package, "Package", &label)?;
        stanzas.push(out);
    }

    Ok(stanzas.join("\n"))
}

/// Render the rule graph as a make fragment
pub fn render_rules(rules: &RuleGraph) -> String {
    let mut out = String::new();
    for (target, node) in rules.iter() {
        let deps = node.deps.iter().cloned().collect::<Vec<_>>().join(" ");
        let head = match (node.cmds.is_empty(), deps.is_empty()) {
            (false, true) | (true, true) => format!("{}:", target),
            (false, false) => format!("{}: {}", target, deps),
            (true, false) => format!("{}:: {}", target, deps),
        };
        out.push_str(&head);
        out.push('\n');
        for cmd in &node.cmds {
            out.push('\t');
            out.push_str(cmd);
            out.push('\n');
        }
    }
    out
}

/// JSON dump of every store record, for later build steps
pub fn render_dump(config: &ConfigStore) -> Result<String> {
    let mut text = serde_json::to_string_pretty(&config.dump())?;
    text.push('\n');
    Ok(text)
}

/// Replace `path` with `content` via a temporary file in the same directory
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    debug!("Persisting {}", tmp.path().display());
    tmp.persist(path).map_err(|e| e.error)?;

    info!("Wrote {} ({} bytes)", path.display(), content.len());
    Ok(())
}
