// src/config/store.rs

//! Configuration Store and Resolver
//!
//! The store is built once by walking the fragment tree top-down and is
//! read-only afterwards. [`ConfigStore::merge`] overlays the entries of one
//! category from the global scope down to the requested axis path.

use super::parser::{parse_fragment, Section};
use super::schema::Schema;
use super::{AxisPath, ConfigKey, ConfigValue, Entry, Level, BASE, FRAGMENT_NAME};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Featureset implied by an architecture-level flavour list
pub const IMPLICIT_FEATURESET: &str = "none";

/// One store entry in serialized form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRecord {
    #[serde(flatten)]
    pub key: ConfigKey,
    pub values: Entry,
}

/// Mapping from (category, axis path) to typed attribute dictionaries
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    entries: BTreeMap<ConfigKey, Entry>,
    dirs: Vec<PathBuf>,
    schema: Schema,
}

/// Fragment section already split into category and axis qualifiers
struct TypedSection {
    category: String,
    qualifiers: Vec<String>,
    line: usize,
    entry: Entry,
}

impl ConfigStore {
    /// Empty store with the built-in schema and no config dirs
    pub fn new() -> Self {
        Self {
            schema: Schema::builtin(),
            ..Self::default()
        }
    }

    /// Load the fragment tree from `dirs` using the built-in schema
    pub fn load(dirs: &[PathBuf]) -> Result<Self> {
        Self::load_with_schema(dirs, Schema::builtin())
    }

    pub fn load_with_schema(dirs: &[PathBuf], schema: Schema) -> Result<Self> {
        let mut store = Self {
            entries: BTreeMap::new(),
            dirs: dirs.to_vec(),
            schema,
        };
        store.read_main()?;
        info!(
            "Loaded {} config entries for {} architectures",
            store.entries.len(),
            store.arches()?.len()
        );
        Ok(store)
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// First config dir containing `relative`
    pub fn find_file(&self, relative: impl AsRef<Path>) -> Option<PathBuf> {
        let relative = relative.as_ref();
        self.dirs
            .iter()
            .map(|dir| dir.join(relative))
            .find(|candidate| candidate.is_file())
    }

    /// Exact-key lookup, no overlay
    pub fn get(&self, category: &str, path: &AxisPath) -> Option<&Entry> {
        self.entries.get(&ConfigKey::new(category, path.clone()))
    }

    /// Replace the entry at `(category, path)`
    pub fn insert(&mut self, category: &str, path: AxisPath, entry: Entry) {
        self.entries.insert(ConfigKey::new(category, path), entry);
    }

    /// Overlay `entry` onto the entry at `(category, path)`, creating it if needed
    fn update(&mut self, category: &str, path: AxisPath, entry: &Entry) {
        self.entries
            .entry(ConfigKey::new(category, path))
            .or_default()
            .update(entry);
    }

    fn ensure(&mut self, category: &str, path: AxisPath) {
        self.entries
            .entry(ConfigKey::new(category, path))
            .or_default();
    }

    /// Axis paths overlaid by [`merge`](Self::merge), least specific first
    pub fn overlay_paths(path: &AxisPath) -> Vec<AxisPath> {
        let arch = path.arch.as_deref();
        let featureset = path.featureset.as_deref();
        let flavour = path.flavour.as_deref();

        let mut paths = vec![AxisPath::root()];
        if arch.is_some() {
            paths.push(AxisPath::from_parts(arch, None, None));
            if featureset.is_some() {
                paths.push(AxisPath::from_parts(arch, featureset, None));
            }
            if flavour.is_some() {
                paths.push(AxisPath::from_parts(arch, None, flavour));
                if featureset.is_some() {
                    paths.push(AxisPath::from_parts(arch, featureset, flavour));
                }
            }
        }
        paths
    }

    /// Resolved view of `category` at `path`; more specific levels win
    pub fn merge(&self, category: &str, path: &AxisPath) -> Entry {
        let mut view = Entry::new();
        for overlay in Self::overlay_paths(path) {
            if let Some(entry) = self.get(category, &overlay) {
                view.update(entry);
            }
        }
        view
    }

    /// Concatenation of the list `key` over all overlay levels of `path`
    pub fn merge_list(&self, category: &str, path: &AxisPath, key: &str) -> Vec<String> {
        Self::overlay_paths(path)
            .iter()
            .filter_map(|overlay| self.get(category, overlay))
            .filter_map(|entry| entry.get_list(key))
            .flat_map(|list| list.iter().cloned())
            .collect()
    }

    fn base_list(&self, path: &AxisPath, key: &str) -> Vec<String> {
        self.get(BASE, path)
            .and_then(|entry| entry.get_list(key))
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    /// Declared architectures, in declaration order
    pub fn arches(&self) -> Result<Vec<String>> {
        self.get(BASE, &AxisPath::root())
            .and_then(|entry| entry.get_list("arches"))
            .map(<[String]>::to_vec)
            .ok_or_else(|| Error::MissingAxis("base.arches in the top-level defines".into()))
    }

    /// Declared featuresets of `arch`, in declaration order
    pub fn featuresets(&self, arch: &str) -> Vec<String> {
        self.base_list(&AxisPath::arch(arch), "featuresets")
    }

    /// Declared flavours of `arch`/`featureset`, in declaration order
    pub fn flavours(&self, arch: &str, featureset: &str) -> Vec<String> {
        self.base_list(&AxisPath::featureset(arch, featureset), "flavours")
    }

    /// Whether no level of `path` is switched off by `available` or `enabled`
    ///
    /// Each level is judged on its resolved base view, so a cross-cutting
    /// `[<flavour>_base]` in an arch fragment applies to every featureset.
    pub fn is_enabled(&self, path: &AxisPath) -> bool {
        let mut scope = Some(path.clone());
        while let Some(current) = scope {
            if current.level() == Level::Main {
                break;
            }
            let view = self.merge(BASE, &current);
            let off = |key: &str| view.get_bool(key) == Some(false);
            if off("available") || off("enabled") {
                return false;
            }
            scope = current.parent();
        }
        true
    }

    /// Serializable copy of every entry, in key order
    pub fn dump(&self) -> Vec<StoreRecord> {
        self.entries
            .iter()
            .map(|(key, values)| StoreRecord {
                key: key.clone(),
                values: values.clone(),
            })
            .collect()
    }

    /// Read and coerce one fragment; a missing file yields no sections
    fn read_fragment(&self, relative: &Path) -> Result<Vec<TypedSection>> {
        let Some(path) = self.find_file(relative) else {
            debug!("No fragment {}", relative.display());
            return Ok(Vec::new());
        };
        debug!("Reading fragment {}", path.display());

        let text = fs::read_to_string(&path)?;
        parse_fragment(&text, &path)?
            .into_iter()
            .map(|section| self.type_section(section))
            .collect()
    }

    fn type_section(&self, section: Section) -> Result<TypedSection> {
        let mut qualifiers: Vec<String> = section.name.split('_').map(str::to_string).collect();
        let category = qualifiers.pop().unwrap_or_default();
        let entry = self.schema.coerce_section(&category, &section.values)?;
        Ok(TypedSection {
            category,
            qualifiers,
            line: section.line,
            entry,
        })
    }

    fn too_many_qualifiers(relative: &Path, section: &TypedSection) -> Error {
        Error::FragmentParse {
            path: relative.to_path_buf(),
            line: section.line,
            message: format!(
                "too many axis qualifiers for {} in section {}_{}",
                section.category,
                section.qualifiers.join("_"),
                section.category
            ),
        }
    }

    fn read_main(&mut self) -> Result<()> {
        let relative = PathBuf::from(FRAGMENT_NAME);
        let sections = self.read_fragment(&relative)?;

        let arches = sections
            .iter()
            .find(|s| s.category == BASE && s.qualifiers.is_empty())
            .and_then(|s| s.entry.get_list("arches"))
            .map(<[String]>::to_vec)
            .ok_or_else(|| Error::MissingAxis("base.arches in the top-level defines".into()))?;

        for section in &sections {
            let q: Vec<&str> = section.qualifiers.iter().map(String::as_str).collect();
            let path = match q.as_slice() {
                [] => AxisPath::root(),
                [arch] => {
                    if !arches.iter().any(|a| a == arch) {
                        warn!("Section for undeclared architecture {}", arch);
                    }
                    AxisPath::arch(*arch)
                }
                [arch, featureset] => AxisPath::featureset(*arch, *featureset),
                [arch, featureset, flavour] => AxisPath::flavour(*arch, *featureset, *flavour),
                _ => return Err(Self::too_many_qualifiers(&relative, section)),
            };
            self.update(&section.category, path, &section.entry);
        }

        for arch in &arches {
            let path = AxisPath::arch(arch.as_str());
            self.ensure(BASE, path.clone());
            if self.is_enabled(&path) {
                self.read_arch(arch)?;
            } else {
                info!("Architecture {} is disabled, not reading its fragment", arch);
            }
        }
        Ok(())
    }

    fn read_arch(&mut self, arch: &str) -> Result<()> {
        let relative = Path::new(arch).join(FRAGMENT_NAME);
        let sections = self.read_fragment(&relative)?;

        let base = sections
            .iter()
            .find(|s| s.category == BASE && s.qualifiers.is_empty())
            .map(|s| s.entry.clone())
            .unwrap_or_default();
        let arch_path = AxisPath::arch(arch);
        // Featuresets from the top-level [<arch>_base] come first
        let mut featuresets = self.base_list(&arch_path, "featuresets");
        for featureset in base.get_list("featuresets").unwrap_or_default() {
            if !featuresets.contains(featureset) {
                featuresets.push(featureset.clone());
            }
        }
        let flavours = base.get_list("flavours").map(<[String]>::to_vec);
        if flavours.is_some() && !featuresets.iter().any(|f| f == IMPLICIT_FEATURESET) {
            featuresets.insert(0, IMPLICIT_FEATURESET.to_string());
        }

        for section in &sections {
            let q: Vec<&str> = section.qualifiers.iter().map(String::as_str).collect();
            let path = match q.as_slice() {
                [] => arch_path.clone(),
                [qualifier] if featuresets.iter().any(|f| f == qualifier) => {
                    AxisPath::featureset(arch, *qualifier)
                }
                [flavour] => AxisPath::from_parts(Some(arch), None, Some(*flavour)),
                [featureset, flavour] => AxisPath::flavour(arch, *featureset, *flavour),
                _ => return Err(Self::too_many_qualifiers(&relative, section)),
            };
            self.update(&section.category, path, &section.entry);
        }

        if let Some(flavours) = flavours {
            if let Some(entry) = self.entries.get_mut(&ConfigKey::new(BASE, arch_path.clone())) {
                entry.remove("flavours");
            }
            let mut implicit = Entry::new();
            implicit.insert("flavours", ConfigValue::List(flavours));
            self.update(BASE, AxisPath::featureset(arch, IMPLICIT_FEATURESET), &implicit);
        }

        let mut declared = Entry::new();
        declared.insert("featuresets", ConfigValue::List(featuresets.clone()));
        self.update(BASE, arch_path, &declared);

        for featureset in &featuresets {
            let path = AxisPath::featureset(arch, featureset.as_str());
            self.ensure(BASE, path.clone());
            if self.is_enabled(&path) {
                self.read_featureset(arch, featureset)?;
            } else {
                info!(
                    "Featureset {} on {} is disabled, not reading its fragment",
                    featureset, arch
                );
            }
        }
        Ok(())
    }

    fn read_featureset(&mut self, arch: &str, featureset: &str) -> Result<()> {
        let relative = Path::new(arch).join(featureset).join(FRAGMENT_NAME);
        let sections = self.read_fragment(&relative)?;

        for section in &sections {
            let path = match section.qualifiers.as_slice() {
                [] => AxisPath::featureset(arch, featureset),
                [flavour] => AxisPath::flavour(arch, featureset, flavour.as_str()),
                _ => return Err(Self::too_many_qualifiers(&relative, section)),
            };
            self.update(&section.category, path, &section.entry);
        }

        for flavour in self.flavours(arch, featureset) {
            let path = AxisPath::flavour(arch, featureset, flavour.as_str());
            if self.get(BASE, &path).is_none() {
                debug!("No config entry for flavour {}", path);
                self.ensure(BASE, path);
            }
        }
        Ok(())
    }
}
