// src/config/mod.rs

//! Hierarchical configuration: architecture × featureset × flavour
//!
//! Configuration is read from `defines` fragments laid out like the axis tree:
//!
//! ```text
//! debian/config/defines                    global defaults, declares arches
//! debian/config/amd64/defines              per-architecture, declares featuresets
//! debian/config/amd64/none/defines         per-featureset, declares flavours
//! ```
//!
//! Each fragment section lands in the [`ConfigStore`] under a [`ConfigKey`]
//! (category plus [`AxisPath`]). The only read interface used by the generator
//! is [`ConfigStore::merge`], which overlays entries from the least to the most
//! specific axis level.

mod parser;
mod schema;
mod store;

pub use parser::{parse_fragment, Section};
pub use schema::{Schema, SchemaItem};
pub use store::{ConfigStore, StoreRecord, IMPLICIT_FEATURESET};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the fragment file at every axis node
pub const FRAGMENT_NAME: &str = "defines";

/// Category holding axis declarations and core build settings
pub const BASE: &str = "base";

/// Depth of an axis path
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Main,
    Arch,
    Featureset,
    Flavour,
}

/// Position in the configuration axis tree
///
/// Shorter paths are more general scopes. A flavour without a featureset
/// denotes the cross-cutting per-architecture flavour override.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AxisPath {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featureset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavour: Option<String>,
}

impl AxisPath {
    /// The global scope
    pub fn root() -> Self {
        Self::default()
    }

    pub fn arch(arch: impl Into<String>) -> Self {
        Self {
            arch: Some(arch.into()),
            ..Self::default()
        }
    }

    pub fn featureset(arch: impl Into<String>, featureset: impl Into<String>) -> Self {
        Self {
            arch: Some(arch.into()),
            featureset: Some(featureset.into()),
            flavour: None,
        }
    }

    pub fn flavour(
        arch: impl Into<String>,
        featureset: impl Into<String>,
        flavour: impl Into<String>,
    ) -> Self {
        Self {
            arch: Some(arch.into()),
            featureset: Some(featureset.into()),
            flavour: Some(flavour.into()),
        }
    }

    /// Build a path from optional components, as found in section names
    pub fn from_parts(
        arch: Option<&str>,
        featureset: Option<&str>,
        flavour: Option<&str>,
    ) -> Self {
        Self {
            arch: arch.map(str::to_string),
            featureset: featureset.map(str::to_string),
            flavour: flavour.map(str::to_string),
        }
    }

    /// Extend this path by one axis level
    pub fn child(&self, value: impl Into<String>) -> Self {
        let mut child = self.clone();
        match self.level() {
            Level::Main => child.arch = Some(value.into()),
            Level::Arch => child.featureset = Some(value.into()),
            _ => child.flavour = Some(value.into()),
        }
        child
    }

    /// Level of the most specific component present
    pub fn level(&self) -> Level {
        if self.flavour.is_some() {
            Level::Flavour
        } else if self.featureset.is_some() {
            Level::Featureset
        } else if self.arch.is_some() {
            Level::Arch
        } else {
            Level::Main
        }
    }

    /// The enclosing scope, or `None` for the root
    pub fn parent(&self) -> Option<Self> {
        let mut parent = self.clone();
        match self.level() {
            Level::Main => return None,
            Level::Arch => parent.arch = None,
            Level::Featureset => parent.featureset = None,
            Level::Flavour => parent.flavour = None,
        }
        Some(parent)
    }

    /// Present components, most general first
    pub fn components(&self) -> Vec<&str> {
        [&self.arch, &self.featureset, &self.flavour]
            .into_iter()
            .filter_map(|c| c.as_deref())
            .collect()
    }

    /// Rule target name for this scope: `binary-arch`, `binary-arch_amd64`, ...
    pub fn target(&self, base: &str) -> String {
        let mut parts = vec![base];
        parts.extend(self.components());
        parts.join("_")
    }
}

impl fmt::Display for AxisPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [&self.arch, &self.featureset, &self.flavour]
            .map(|c| c.as_deref().unwrap_or("-"));
        match self.level() {
            Level::Main => write!(f, "(global)"),
            _ => write!(f, "{}", parts.join("/")),
        }
    }
}

/// Store key: category plus axis path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigKey {
    pub category: String,
    #[serde(flatten)]
    pub path: AxisPath,
}

impl ConfigKey {
    pub fn new(category: impl Into<String>, path: AxisPath) -> Self {
        Self {
            category: category.into(),
            path,
        }
    }
}

/// A schema-typed configuration value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    String(String),
    List(Vec<String>),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::String(s) => write!(f, "{}", s),
            Self::List(l) => write!(f, "{}", l.join(" ")),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(l: Vec<String>) -> Self {
        Self::List(l)
    }
}

/// Attribute dictionary for one store key, and the shape of a resolved view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entry(BTreeMap<String, ConfigValue>);

impl Entry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ConfigValue::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(ConfigValue::as_bool)
    }

    pub fn get_list(&self, key: &str) -> Option<&[String]> {
        self.get(key).and_then(ConfigValue::as_list)
    }

    /// String value that must be present; `context` names the scope in the error
    pub fn require_str(&self, key: &str, context: &str) -> crate::Result<&str> {
        self.get_str(key)
            .ok_or_else(|| crate::Error::missing_key(key, context))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        self.0.remove(key)
    }

    /// Overlay `other` onto this entry; keys in `other` win
    pub fn update(&mut self, other: &Entry) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<ConfigValue>> FromIterator<(K, V)> for Entry {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
