// src/external.rs

//! Narrow interfaces to collaborators outside the generator
//!
//! Only the changelog header lines and synchronous subprocess execution are
//! needed; everything else about those tools is opaque.

use crate::error::{Error, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use tracing::debug;

static CHANGELOG_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w[-+0-9a-z.]+) \(([^() \t]+)\)\s+([-+0-9a-zA-Z.]+);").unwrap()
});

/// Header of one changelog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub source: String,
    pub version: String,
    pub distribution: String,
}

/// Source of changelog entries, newest first
pub trait ChangelogReader {
    fn entries(&self) -> Result<Vec<ChangelogEntry>>;

    /// The newest entry
    fn latest(&self) -> Result<ChangelogEntry> {
        self.entries()?
            .into_iter()
            .next()
            .ok_or_else(|| Error::FileUnavailable("changelog entry".to_string()))
    }
}

/// Reader for a `debian/changelog` file
#[derive(Debug, Clone)]
pub struct DebianChangelog {
    path: PathBuf,
}

impl DebianChangelog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse entry headers out of changelog text; other lines are skipped
    pub fn parse(text: &str) -> Vec<ChangelogEntry> {
        text.lines()
            .filter_map(|line| CHANGELOG_HEADER_RE.captures(line))
            .map(|caps| ChangelogEntry {
                source: caps[1].to_string(),
                version: caps[2].to_string(),
                distribution: caps[3].to_string(),
            })
            .collect()
    }
}

impl ChangelogReader for DebianChangelog {
    fn entries(&self) -> Result<Vec<ChangelogEntry>> {
        debug!("Reading changelog {}", self.path.display());
        let text = fs::read_to_string(&self.path)?;
        Ok(Self::parse(&text))
    }
}

/// Run `tool` to completion and return its stdout
///
/// A non-zero exit is [`Error::ToolFailed`]; nothing is retried.
pub fn run_tool(tool: &str, args: &[&str], cwd: Option<&Path>) -> Result<String> {
    debug!("Running {} {}", tool, args.join(" "));

    let mut command = Command::new(tool);
    command.args(args);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    let output = command.output().map_err(|source| Error::ToolSpawn {
        tool: tool.to_string(),
        source,
    })?;

    if !output.status.success() {
        return Err(Error::ToolFailed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
