// src/control/template.rs

//! Control templates and `@var@` substitution
//!
//! Templates live in `<dir>/<name>.in`. Names starting with `control.` hold
//! RFC822-like package skeletons; anything else is plain text.

use super::package::{FieldValue, Package};
use crate::config::Entry;
use crate::error::{Error, Result};
use regex::{Captures, Regex};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::debug;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@([-_a-z]+)@").unwrap());

/// Template lookup over an ordered list of directories; the first hit wins
#[derive(Debug, Default)]
pub struct Templates {
    dirs: Vec<PathBuf>,
    cache: RefCell<HashMap<String, Option<String>>>,
}

impl Templates {
    pub fn new(dirs: &[PathBuf]) -> Self {
        Self {
            dirs: dirs.to_vec(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Raw template text, `None` when no directory has it
    pub fn get_text_opt(&self, name: &str) -> Result<Option<String>> {
        if let Some(cached) = self.cache.borrow().get(name) {
            return Ok(cached.clone());
        }

        let file = format!("{}.in", name);
        let mut found = None;
        for dir in &self.dirs {
            let path = dir.join(&file);
            if path.is_file() {
                debug!("Using template {}", path.display());
                found = Some(fs::read_to_string(&path)?);
                break;
            }
        }
        self.cache
            .borrow_mut()
            .insert(name.to_string(), found.clone());
        Ok(found)
    }

    pub fn get_text(&self, name: &str) -> Result<String> {
        self.get_text_opt(name)?
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))
    }

    pub fn get_control_opt(&self, name: &str) -> Result<Option<Vec<Package>>> {
        self.get_text_opt(name)?
            .map(|text| read_control(&text, name))
            .transpose()
    }

    /// Package skeletons of a `control.*` template
    pub fn get_control(&self, name: &str) -> Result<Vec<Package>> {
        self.get_control_opt(name)?
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))
    }
}

/// Parse stanzas separated by blank lines; `name` is used in errors
pub fn read_control(text: &str, name: &str) -> Result<Vec<Package>> {
    let error = |message: String| Error::TemplateParse {
        name: name.to_string(),
        message,
    };

    let mut packages = Vec::new();
    let mut package = Package::new();
    let mut field: Option<(String, Vec<String>)> = None;

    let flush = |package: &mut Package, field: &mut Option<(String, Vec<String>)>| -> Result<()> {
        if let Some((key, lines)) = field.take() {
            package.set(&key, &lines.join("\n"))?;
        }
        Ok(())
    };

    for line in text.lines() {
        if line.trim().is_empty() {
            flush(&mut package, &mut field)?;
            if !package.is_empty() {
                packages.push(std::mem::take(&mut package));
            }
            continue;
        }

        if line.starts_with([' ', '\t']) {
            match field.as_mut() {
                Some((_, lines)) => lines.push(line.trim_start().to_string()),
                None => return Err(error("continuation line seen before first field".into())),
            }
            continue;
        }

        flush(&mut package, &mut field)?;
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| error(format!("not a field, not a continuation: {line:?}")))?;
        field = Some((key.trim().to_string(), vec![value.trim_start().to_string()]));
    }

    flush(&mut package, &mut field)?;
    if !package.is_empty() {
        packages.push(package);
    }
    Ok(packages)
}

/// Replace every `@name@` with the value of `name` in `vars`
pub fn substitute(text: &str, vars: &Entry) -> Result<String> {
    let mut missing = None;
    let result = PLACEHOLDER_RE.replace_all(text, |caps: &Captures| match vars.get(&caps[1]) {
        Some(value) => value.to_string(),
        None => {
            missing.get_or_insert_with(|| caps[1].to_string());
            String::new()
        }
    });
    match missing {
        Some(name) => Err(Error::Substitution {
            name,
            text: text.to_string(),
        }),
        None => Ok(result.into_owned()),
    }
}

/// Instantiate a package skeleton with `vars`
///
/// Text fields, relation names and description parts are substituted;
/// `X-` fields are template-only and dropped.
pub fn process_package(template: &Package, vars: &Entry) -> Result<Package> {
    let mut package = Package::new();
    for (field, value) in template.fields() {
        if field.starts_with("X-") {
            continue;
        }
        let value = match value {
            FieldValue::Text(text) => FieldValue::Text(substitute(text, vars)?),
            FieldValue::Arches(arches) => FieldValue::Arches(
                arches
                    .iter()
                    .map(|arch| substitute(arch, vars))
                    .collect::<Result<_>>()?,
            ),
            FieldValue::Relations(list) => {
                let mut list = list.clone();
                for group in list.iter_mut() {
                    for relation in group.iter_mut() {
                        relation.name = substitute(&relation.name, vars)?;
                    }
                }
                FieldValue::Relations(list)
            }
            FieldValue::Description(desc) => {
                FieldValue::Description(desc.try_map(|part| substitute(part, vars))?)
            }
        };
        package.insert(field, value);
    }
    Ok(package)
}

pub fn process_packages(templates: &[Package], vars: &Entry) -> Result<Vec<Package>> {
    templates
        .iter()
        .map(|template| process_package(template, vars))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADERS: &str = "\
Package: linux-headers-@abiname@@localversion@
Architecture: @arch@
Depends: linux-headers-@abiname@-common, ${misc:Depends}
X-Template-Only: yes
Description: Header files for Linux @abiname@@localversion@
 This package provides the architecture-specific kernel header files
 for Linux kernel @abiname@@localversion@.
 .
 Second paragraph.

Package: linux-support
Description: Support files
";

    fn vars() -> Entry {
        [("abiname", "6.12.9-1"), ("localversion", "-amd64"), ("arch", "amd64")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_read_control_stanzas() {
        let packages = read_control(HEADERS, "control.headers").unwrap();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].name(), Some("linux-headers-@abiname@@localversion@"));
        let desc = packages[0].description().unwrap();
        assert_eq!(desc.long.len(), 2);
        assert_eq!(packages[1].name(), Some("linux-support"));
    }

    #[test]
    fn test_read_control_errors() {
        assert!(matches!(
            read_control(" continued\n", "control.x"),
            Err(Error::TemplateParse { .. })
        ));
        assert!(matches!(
            read_control("Package: a\nno colon here\n", "control.x"),
            Err(Error::TemplateParse { .. })
        ));
        assert!(matches!(
            read_control("Depends: bad (relation\n", "control.x"),
            Err(Error::RelationParse(_))
        ));
    }

    #[test]
    fn test_substitute() {
        assert_eq!(substitute("linux-@abiname@@localversion@", &vars()).unwrap(), "linux-6.12.9-1-amd64");
        assert_eq!(substitute("${binary:Version}", &vars()).unwrap(), "${binary:Version}");
        match substitute("x-@nope@", &vars()).unwrap_err() {
            Error::Substitution { name, text } => {
                assert_eq!(name, "nope");
                assert_eq!(text, "x-@nope@");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_process_package() {
        let templates = read_control(HEADERS, "control.headers").unwrap();
        let package = process_package(&templates[0], &vars()).unwrap();
        assert_eq!(package.name(), Some("linux-headers-6.12.9-1-amd64"));
        assert_eq!(package.architecture(), ["amd64"]);
        assert_eq!(
            package.get("Depends").unwrap().to_string(),
            "linux-headers-6.12.9-1-common, ${misc:Depends}"
        );
        assert!(!package.contains("X-Template-Only"));
        assert_eq!(
            package.description().unwrap().synopsis(),
            "Header files for Linux 6.12.9-1-amd64"
        );
    }

    #[test]
    fn test_templates_first_dir_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(second.path().join("control.main.in"), "Package: second\n").unwrap();
        fs::write(second.path().join("text.in"), "hello").unwrap();
        fs::write(first.path().join("control.main.in"), "Package: first\n").unwrap();

        let templates = Templates::new(&[first.path().to_path_buf(), second.path().to_path_buf()]);
        assert_eq!(templates.get_control("control.main").unwrap()[0].name(), Some("first"));
        assert_eq!(templates.get_text("text").unwrap(), "hello");
        assert!(templates.get_control_opt("control.extra").unwrap().is_none());
        assert!(matches!(
            templates.get_control("control.extra"),
            Err(Error::TemplateNotFound(_))
        ));
    }
}
