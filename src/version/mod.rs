// src/version/mod.rs

//! Debian and Linux kernel package versions
//!
//! The generator derives most of its naming variables from the version of the
//! newest changelog entry:
//!
//! - "2:6.12.9-1" → epoch=2, upstream="6.12.9", revision="1"
//! - "6.12.9~rc3-1~exp1" → major="6.12", version="6.12.9", modifier="rc3",
//!   upstream="6.12.9-rc3"

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static DEBIAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\d+):)?(.+?)(?:-([^-]+))?$").unwrap());

static LINUX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((\d+\.\d+)\.\d+)(?:~(.+?))?(?:\.dfsg\.\d+)?-[^-]+$").unwrap()
});

/// A parsed Debian version: `[epoch:]upstream[-revision]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DebianVersion {
    pub complete: String,
    pub epoch: Option<u64>,
    pub upstream: String,
    pub revision: Option<String>,
}

impl DebianVersion {
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidVersion {
            version: s.to_string(),
            reason: reason.to_string(),
        };
        let caps = DEBIAN_RE
            .captures(s)
            .ok_or_else(|| invalid("not a Debian version"))?;

        let epoch = caps
            .get(1)
            .map(|m| m.as_str().parse::<u64>())
            .transpose()
            .map_err(|_| invalid("epoch out of range"))?;

        Ok(Self {
            complete: s.to_string(),
            epoch,
            upstream: caps[2].to_string(),
            revision: caps.get(3).map(|m| m.as_str().to_string()),
        })
    }

    /// The version without its epoch
    pub fn complete_noepoch(&self) -> String {
        match &self.revision {
            Some(revision) => format!("{}-{}", self.upstream, revision),
            None => self.upstream.clone(),
        }
    }
}

impl FromStr for DebianVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DebianVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.complete)
    }
}

/// Version of a Linux kernel source package
///
/// Format: `<major>.<minor>.<patch>[~modifier][.dfsg.N]-<revision>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinuxVersion {
    pub debian: DebianVersion,
    /// "6.12"
    pub major: String,
    /// "6.12.9"
    pub version: String,
    /// "rc3" for release candidates
    pub modifier: Option<String>,
    /// `version`, plus `-modifier` when present
    pub upstream: String,
}

impl LinuxVersion {
    pub fn parse(s: &str) -> Result<Self> {
        let debian = DebianVersion::parse(s)?;
        let caps = LINUX_RE.captures(s).ok_or_else(|| Error::InvalidVersion {
            version: s.to_string(),
            reason: "not a Debian Linux version".to_string(),
        })?;

        let version = caps[1].to_string();
        let modifier = caps.get(3).map(|m| m.as_str().to_string());
        let upstream = match &modifier {
            Some(modifier) => format!("{}-{}", version, modifier),
            None => version.clone(),
        };

        Ok(Self {
            major: caps[2].to_string(),
            version,
            modifier,
            upstream,
            debian,
        })
    }

    /// The full version string as found in the changelog
    pub fn complete(&self) -> &str {
        &self.debian.complete
    }
}

impl FromStr for LinuxVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for LinuxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.complete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debian_version_parse_simple() {
        let v = DebianVersion::parse("1.2.3").unwrap();
        assert_eq!(v.epoch, None);
        assert_eq!(v.upstream, "1.2.3");
        assert_eq!(v.revision, None);
    }

    #[test]
    fn test_debian_version_parse_full() {
        let v = DebianVersion::parse("2:6.12.9-1+deb13u1").unwrap();
        assert_eq!(v.epoch, Some(2));
        assert_eq!(v.upstream, "6.12.9");
        assert_eq!(v.revision.as_deref(), Some("1+deb13u1"));
        assert_eq!(v.complete_noepoch(), "6.12.9-1+deb13u1");
        assert_eq!(v.to_string(), "2:6.12.9-1+deb13u1");
    }

    #[test]
    fn test_debian_version_revision_is_last_dash() {
        let v = DebianVersion::parse("1.0-beta-3").unwrap();
        assert_eq!(v.upstream, "1.0-beta");
        assert_eq!(v.revision.as_deref(), Some("3"));
    }

    #[test]
    fn test_debian_version_rejects_empty() {
        assert!(matches!(
            DebianVersion::parse(""),
            Err(Error::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_linux_version_release() {
        let v = LinuxVersion::parse("6.12.9-1").unwrap();
        assert_eq!(v.major, "6.12");
        assert_eq!(v.version, "6.12.9");
        assert_eq!(v.modifier, None);
        assert_eq!(v.upstream, "6.12.9");
        assert_eq!(v.debian.upstream, "6.12.9");
        assert_eq!(v.complete(), "6.12.9-1");
    }

    #[test]
    fn test_linux_version_modifier_and_dfsg() {
        let v = LinuxVersion::parse("2.6.18~rc4.dfsg.1-1~exp1").unwrap();
        assert_eq!(v.major, "2.6");
        assert_eq!(v.version, "2.6.18");
        assert_eq!(v.modifier.as_deref(), Some("rc4"));
        assert_eq!(v.upstream, "2.6.18-rc4");
        assert_eq!(v.debian.upstream, "2.6.18~rc4.dfsg.1");
    }

    #[test]
    fn test_linux_version_requires_revision() {
        assert!(LinuxVersion::parse("6.12.9").is_err());
        assert!(LinuxVersion::parse("6.12-1").is_err());
    }
}
