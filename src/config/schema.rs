// src/config/schema.rs

//! Per-category value schemas
//!
//! Fragment values are raw strings; the schema of the section's category
//! decides whether a key is a boolean, a list or a plain string.

use super::{ConfigValue, Entry, BASE};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use tracing::warn;

/// Type of a schema-declared key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaItem {
    Boolean,
    List,
    String,
}

impl SchemaItem {
    /// Coerce a raw fragment value
    pub fn coerce(&self, raw: &str) -> std::result::Result<ConfigValue, String> {
        match self {
            Self::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(ConfigValue::Bool(true)),
                "false" | "0" => Ok(ConfigValue::Bool(false)),
                _ => Err("expected one of true, false, 1, 0".to_string()),
            },
            Self::List => Ok(ConfigValue::List(
                raw.split(|c: char| c.is_whitespace() || c == ',')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            Self::String => Ok(ConfigValue::String(raw.trim().to_string())),
        }
    }
}

/// Schemas for all known categories
#[derive(Debug, Clone, Default)]
pub struct Schema {
    categories: BTreeMap<String, BTreeMap<String, SchemaItem>>,
}

impl Schema {
    /// Empty schema: every category unknown, every value a string
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema used by the kernel generator
    pub fn builtin() -> Self {
        use SchemaItem::*;

        let mut schema = Self::new();
        schema
            .declare(BASE, "arches", List)
            .declare(BASE, "featuresets", List)
            .declare(BASE, "flavours", List)
            .declare(BASE, "available", Boolean)
            .declare(BASE, "enabled", Boolean)
            .declare(BASE, "modules", Boolean)
            .declare(BASE, "kernel-arch", String)
            .declare(BASE, "compiler", String)
            .declare(BASE, "cflags", String)
            .declare(BASE, "override-host-type", String)
            .declare("image", "configs", List)
            .declare("image", "initramfs", Boolean)
            .declare("image", "initramfs-generators", List)
            .declare("image", "bootloaders", List)
            .declare("image", "type", String)
            .declare("image", "override-localversion", String)
            .declare("image-dbg", "enabled", Boolean)
            .declare("description", "parts", List)
            .declare("description", "hardware", String)
            .declare("description", "hardware-long", String);
        for category in ["relations", "abi", "commands-image-initramfs-generators"] {
            schema.categories.entry(category.to_string()).or_default();
        }
        schema
    }

    /// Declare the type of `category.key`, creating the category if needed
    pub fn declare(&mut self, category: &str, key: &str, item: SchemaItem) -> &mut Self {
        self.categories
            .entry(category.to_string())
            .or_default()
            .insert(key.to_string(), item);
        self
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    /// Resolve the category used to coerce a section's values
    ///
    /// Unknown categories fall back to the base schema when one is declared.
    pub fn category_for<'a>(&self, category: &'a str) -> &'a str {
        if self.has_category(category) || !self.has_category(BASE) {
            category
        } else {
            warn!("Implicit base schema for unknown category '{}'", category);
            BASE
        }
    }

    /// Coerce all raw values of a section into a typed entry
    pub fn coerce_section(&self, category: &str, values: &[(String, String)]) -> Result<Entry> {
        let schema_category = self.category_for(category);
        let items = self.categories.get(schema_category);

        let mut entry = Entry::new();
        for (key, raw) in values {
            let item = items
                .and_then(|items| items.get(key))
                .copied()
                .unwrap_or(SchemaItem::String);
            let value = item.coerce(raw).map_err(|reason| Error::Schema {
                category: category.to_string(),
                key: key.clone(),
                value: raw.clone(),
                reason,
            })?;
            entry.insert(key.clone(), value);
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_boolean_coercion() {
        let item = SchemaItem::Boolean;
        assert_eq!(item.coerce(" True ").unwrap(), ConfigValue::Bool(true));
        assert_eq!(item.coerce("1").unwrap(), ConfigValue::Bool(true));
        assert_eq!(item.coerce("FALSE").unwrap(), ConfigValue::Bool(false));
        assert_eq!(item.coerce("0").unwrap(), ConfigValue::Bool(false));
        assert!(item.coerce("yes").is_err());
    }

    #[test]
    fn test_list_coercion() {
        let item = SchemaItem::List;
        assert_eq!(
            item.coerce("  amd64 i386,\n arm64 ").unwrap(),
            ConfigValue::List(vec!["amd64".into(), "i386".into(), "arm64".into()])
        );
        assert_eq!(item.coerce("   ").unwrap(), ConfigValue::List(vec![]));
    }

    #[test]
    fn test_coerce_section_typed_and_untyped() {
        let schema = Schema::builtin();
        let entry = schema
            .coerce_section(
                "base",
                &raw(&[("arches", "amd64 arm64"), ("modules", "false"), ("abiname", "1")]),
            )
            .unwrap();
        assert_eq!(entry.get_list("arches").unwrap(), ["amd64", "arm64"]);
        assert_eq!(entry.get_bool("modules"), Some(false));
        assert_eq!(entry.get_str("abiname"), Some("1"));
    }

    #[test]
    fn test_coerce_section_failure_is_schema_error() {
        let schema = Schema::builtin();
        let err = schema
            .coerce_section("image", &raw(&[("initramfs", "maybe")]))
            .unwrap_err();
        match err {
            Error::Schema { category, key, value, .. } => {
                assert_eq!(category, "image");
                assert_eq!(key, "initramfs");
                assert_eq!(value, "maybe");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_category_uses_base_schema() {
        let schema = Schema::builtin();
        let entry = schema
            .coerce_section("xen", &raw(&[("flavours", "amd64 i386")]))
            .unwrap();
        assert_eq!(entry.get_list("flavours").unwrap(), ["amd64", "i386"]);
    }

    #[test]
    fn test_known_category_without_keys_keeps_strings() {
        let schema = Schema::builtin();
        let entry = schema
            .coerce_section("relations", &raw(&[("gcc-4.1", "gcc-4.1 (>= 4.1.1)")]))
            .unwrap();
        assert_eq!(entry.get_str("gcc-4.1"), Some("gcc-4.1 (>= 4.1.1)"));
    }
}
