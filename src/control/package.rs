// src/control/package.rs

//! Package records and the ordered package collection

use super::description::Description;
use crate::error::Result;
use crate::relation::RelationList;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;

/// Fields emitted first, in this order; anything else follows alphabetically
pub const FIELD_ORDER: &[&str] = &[
    "Package",
    "Source",
    "Architecture",
    "Section",
    "Priority",
    "Maintainer",
    "Uploaders",
    "Standards-Version",
    "Build-Depends",
    "Build-Depends-Indep",
    "Provides",
    "Pre-Depends",
    "Depends",
    "Recommends",
    "Suggests",
    "Breaks",
    "Replaces",
    "Conflicts",
    "Description",
];

/// Relation fields extended when a package is re-opened for another architecture
pub const MERGED_FIELDS: &[&str] = &[
    "Depends",
    "Provides",
    "Suggests",
    "Recommends",
    "Conflicts",
    "Breaks",
];

const RELATION_FIELDS: &[&str] = &[
    "Build-Depends",
    "Build-Depends-Indep",
    "Provides",
    "Pre-Depends",
    "Depends",
    "Recommends",
    "Suggests",
    "Breaks",
    "Replaces",
    "Conflicts",
];

/// Typed value of a control field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Arches(Vec<String>),
    Relations(RelationList),
    Description(Description),
}

impl FieldValue {
    /// Parse raw field text according to the field's type
    pub fn parse(field: &str, text: &str) -> Result<Self> {
        Ok(if RELATION_FIELDS.contains(&field) {
            Self::Relations(RelationList::parse(text)?)
        } else if field == "Architecture" {
            Self::Arches(text.split_whitespace().map(str::to_string).collect())
        } else if field == "Description" {
            Self::Description(Description::parse(text))
        } else {
            Self::Text(text.to_string())
        })
    }

    /// Whether the field would render as nothing
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Arches(arches) => arches.is_empty(),
            Self::Relations(list) => list.is_empty(),
            Self::Description(desc) => desc.is_empty(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => {
                // Continuation lines of a multi-line field must stay indented
                let mut lines = text.lines();
                f.write_str(lines.next().unwrap_or_default())?;
                for line in lines {
                    match line.trim() {
                        "" => f.write_str("\n .")?,
                        line => write!(f, "\n {}", line)?,
                    }
                }
                Ok(())
            }
            Self::Arches(arches) => f.write_str(&arches.join(" ")),
            Self::Relations(list) => write!(f, "{}", list),
            Self::Description(desc) => write!(f, "{}", desc),
        }
    }
}

/// One control stanza
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    fields: BTreeMap<String, FieldValue>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field from raw text, parsing typed fields
    pub fn set(&mut self, field: &str, text: &str) -> Result<()> {
        let value = FieldValue::parse(field, text)?;
        self.fields.insert(field.to_string(), value);
        Ok(())
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.fields.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.fields.remove(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(FieldValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Value of the `Package` field
    pub fn name(&self) -> Option<&str> {
        self.text("Package")
    }

    pub fn relations(&self, field: &str) -> Option<&RelationList> {
        match self.fields.get(field) {
            Some(FieldValue::Relations(list)) => Some(list),
            _ => None,
        }
    }

    /// Extend a relation field with `list`, creating it when absent or not relation-typed
    pub fn extend_relations(&mut self, field: &str, list: RelationList) {
        let merged = match self.fields.remove(field) {
            Some(FieldValue::Relations(mut existing)) => {
                existing.extend(list);
                existing
            }
            _ => list,
        };
        self.fields
            .insert(field.to_string(), FieldValue::Relations(merged));
    }

    pub fn architecture(&self) -> &[String] {
        match self.fields.get("Architecture") {
            Some(FieldValue::Arches(arches)) => arches,
            _ => &[],
        }
    }

    /// Add `arch` to the Architecture list unless already present
    pub fn add_arch(&mut self, arch: &str) {
        let slot = self
            .fields
            .entry("Architecture".to_string())
            .or_insert_with(|| FieldValue::Arches(Vec::new()));
        match slot {
            FieldValue::Arches(arches) => {
                if !arches.iter().any(|a| a == arch) {
                    arches.push(arch.to_string());
                }
            }
            other => *other = FieldValue::Arches(vec![arch.to_string()]),
        }
    }

    pub fn description(&self) -> Option<&Description> {
        match self.fields.get("Description") {
            Some(FieldValue::Description(desc)) => Some(desc),
            _ => None,
        }
    }

    pub fn description_mut(&mut self) -> Option<&mut Description> {
        match self.fields.get_mut("Description") {
            Some(FieldValue::Description(desc)) => Some(desc),
            _ => None,
        }
    }

    /// Fields in canonical output order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        let known = FIELD_ORDER
            .iter()
            .filter_map(|name| self.fields.get_key_value(*name));
        let other = self
            .fields
            .iter()
            .filter(|(name, _)| !FIELD_ORDER.contains(&name.as_str()));
        known.chain(other).map(|(name, value)| (name.as_str(), value))
    }
}

/// Key of a binary stanza; unnamed stanzas are kept by position so the writer can reject them
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum BinaryKey {
    Named(String),
    Unnamed(usize),
}

/// Generated stanzas: an optional source stanza, then binaries in first-insertion order
#[derive(Debug, Clone, Default)]
pub struct PackageList {
    source: Option<Package>,
    binaries: IndexMap<BinaryKey, Package>,
}

impl PackageList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_source(&mut self, source: Package) {
        self.source = Some(source);
    }

    pub fn source(&self) -> Option<&Package> {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> Option<&mut Package> {
        self.source.as_mut()
    }

    /// Add a binary package; a package with a known name replaces the old record in place
    pub fn append(&mut self, package: Package) {
        let key = match package.name() {
            Some(name) => BinaryKey::Named(name.to_string()),
            None => BinaryKey::Unnamed(self.binaries.len()),
        };
        self.binaries.insert(key, package);
    }

    pub fn extend(&mut self, packages: impl IntoIterator<Item = Package>) {
        for package in packages {
            self.append(package);
        }
    }

    /// Add a package built for `arch`, re-opening an existing record of the same name
    pub fn merge(&mut self, mut package: Package, arch: &str) {
        let Some(target) = package.name().and_then(|name| self.get_mut(name)) else {
            package.remove("Architecture");
            package.add_arch(arch);
            self.append(package);
            return;
        };

        target.add_arch(arch);
        for field in MERGED_FIELDS {
            if let Some(FieldValue::Relations(list)) = package.remove(field) {
                target.extend_relations(field, list);
            }
        }
    }

    pub fn merge_all(&mut self, packages: impl IntoIterator<Item = Package>, arch: &str) {
        for package in packages {
            self.merge(package, arch);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Package> {
        self.binaries.get(&BinaryKey::Named(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Package> {
        self.binaries.get_mut(&BinaryKey::Named(name.to_string()))
    }

    /// Binary stanzas in output order
    pub fn binaries(&self) -> impl ExactSizeIterator<Item = &Package> {
        self.binaries.values()
    }

    pub fn len(&self) -> usize {
        self.binaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binaries.is_empty()
    }
}
