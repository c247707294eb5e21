// src/rules/mod.rs

//! Build rule graph and make flags
//!
//! Every axis level contributes nodes to the same graph. A node may be
//! declared many times; declarations merge:
//!
//! ```ignore
//! let mut rules = RuleGraph::new();
//! rules.add("binary-arch", &["binary-arch_amd64"], &[]);
//! rules.add("binary-arch", &["binary-arch_arm64"], &[]);
//! // binary-arch:: binary-arch_amd64 binary-arch_arm64
//! ```

use crate::config::ConfigValue;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Variables passed to `debian/rules.real` on every recipe line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MakeFlags(BTreeMap<String, String>);

impl MakeFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Set from a config value; booleans become `True`/`False`
    pub fn set_value(&mut self, key: impl Into<String>, value: &ConfigValue) {
        let value = match value {
            ConfigValue::Bool(true) => "True".to_string(),
            ConfigValue::Bool(false) => "False".to_string(),
            other => other.to_string(),
        };
        self.set(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MakeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}='{}'", key, value)?;
        }
        Ok(())
    }
}

/// A build target: prerequisites plus recipe lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleNode {
    pub deps: BTreeSet<String>,
    pub cmds: Vec<String>,
}

/// All build targets, keyed and emitted by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleGraph {
    nodes: BTreeMap<String, RuleNode>,
}

impl RuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `target`, merging with earlier declarations
    ///
    /// Prerequisites are unioned and recipe lines appended.
    pub fn add<S: AsRef<str>>(&mut self, target: &str, deps: &[S], cmds: &[String]) {
        let node = self.nodes.entry(target.to_string()).or_default();
        node.deps.extend(deps.iter().map(|d| d.as_ref().to_string()));
        node.cmds.extend(cmds.iter().cloned());
    }

    /// Ensure `target` exists without adding anything to it
    pub fn declare(&mut self, target: &str) {
        self.nodes.entry(target.to_string()).or_default();
    }

    pub fn get(&self, target: &str) -> Option<&RuleNode> {
        self.nodes.get(target)
    }

    pub fn contains(&self, target: &str) -> bool {
        self.nodes.contains_key(target)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in target-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleNode)> {
        self.nodes.iter().map(|(name, node)| (name.as_str(), node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_merges_declarations() {
        let mut graph = RuleGraph::new();
        graph.add("binary-arch", &["binary-arch_arm64"], &[]);
        graph.add("binary-arch", &["binary-arch_amd64", "binary-arch_arm64"], &[]);
        graph.add::<&str>("build_amd64_real", &[], &["make a".to_string()]);
        graph.add::<&str>("build_amd64_real", &[], &["make b".to_string()]);

        let node = graph.get("binary-arch").unwrap();
        assert_eq!(
            node.deps.iter().collect::<Vec<_>>(),
            vec!["binary-arch_amd64", "binary-arch_arm64"]
        );
        assert_eq!(graph.get("build_amd64_real").unwrap().cmds, vec!["make a", "make b"]);
    }

    #[test]
    fn test_iteration_is_sorted() {
        let mut graph = RuleGraph::new();
        graph.declare("setup");
        graph.declare("binary-arch");
        graph.declare("build");
        let names: Vec<&str> = graph.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["binary-arch", "build", "setup"]);
    }

    #[test]
    fn test_makeflags_display_sorted() {
        let mut flags = MakeFlags::new();
        flags.set("VERSION", "6.12");
        flags.set_value("MODULES", &ConfigValue::Bool(true));
        flags.set("ARCH", "amd64");
        assert_eq!(flags.to_string(), "ARCH='amd64' MODULES='True' VERSION='6.12'");
        assert_eq!(MakeFlags::new().to_string(), "");
    }
}
