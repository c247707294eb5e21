// src/generator/kernel.rs

//! Hook set generating the Linux kernel source package
//!
//! Per level:
//!
//! - main: version variables, source stanza, `control.main`, `binary-indep`,
//!   extra and installer packages once every architecture is done
//! - arch: `control.libc-dev` and `control.headers.arch`; the last of these
//!   depends on every flavour's headers package
//! - featureset: `control.headers.featureset`
//! - flavour: image, headers and debug packages plus the kernel config list

use super::{
    link_level_targets, real_target, Context, Hooks, LevelHooks, LevelState, Output, SideChannel,
    DEFAULT_TARGETS,
};
use crate::config::{AxisPath, Entry, BASE, IMPLICIT_FEATURESET};
use crate::control::{
    process_package, process_packages, read_control, Description, FieldValue, Package,
};
use crate::error::{Error, Result};
use crate::external::run_tool;
use crate::relation::{Relation, RelationGroup, RelationList};
use crate::rules::{MakeFlags, RuleGraph};
use crate::version::LinuxVersion;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info};

/// Side-channel key: dependencies of the architecture headers package
const HEADERS_ARCH_DEPENDS: &str = "headers-arch-depends";
/// Side-channel key: name of the architecture headers package
const HEADERS_ARCH_PACKAGE: &str = "headers-arch-package";

/// Relation fields an image may take from the `image` config
const IMAGE_RELATION_FIELDS: &[&str] = &[
    "Depends",
    "Provides",
    "Suggests",
    "Recommends",
    "Conflicts",
    "Breaks",
];

/// `(config key, make flag, optional)`
type FlagMap = [(&'static str, &'static str, bool)];

const ARCH_MAKEFLAGS: &FlagMap = &[("kernel-arch", "KERNEL_ARCH", false)];

const FLAVOUR_MAKEFLAGS_BASE: &FlagMap = &[
    ("compiler", "COMPILER", false),
    ("kernel-arch", "KERNEL_ARCH", false),
    ("cflags", "CFLAGS_KERNEL", true),
    ("override-host-type", "OVERRIDE_HOST_TYPE", true),
];

const FLAVOUR_MAKEFLAGS_IMAGE: &FlagMap = &[("type", "TYPE", false), ("initramfs", "INITRAMFS", true)];

const FLAVOUR_MAKEFLAGS_OTHER: &FlagMap = &[
    ("localversion", "LOCALVERSION", false),
    ("localversion-image", "LOCALVERSION_IMAGE", true),
];

/// Inputs of the kernel generator that do not come from the config tree
#[derive(Debug, Clone)]
pub struct KernelSettings {
    /// Version of the newest changelog entry
    pub version: LinuxVersion,
    /// Directory to run `kernel-wedge gen-control` in, if installer udebs are built
    pub installer_dir: Option<PathBuf>,
}

/// The four kernel hook objects
pub fn hooks(settings: KernelSettings) -> Hooks {
    let settings = Rc::new(settings);
    Hooks {
        main: Box::new(MainHooks {
            settings: settings.clone(),
        }),
        arch: Box::new(ArchHooks { settings }),
        featureset: Box::new(FeaturesetHooks),
        flavour: Box::new(FlavourHooks),
    }
}

/// Copy config values into make flags; a missing non-optional key is fatal
pub fn setup_makeflags(
    names: &FlagMap,
    makeflags: &mut MakeFlags,
    data: &Entry,
    context: &str,
) -> Result<()> {
    for &(src, dst, optional) in names {
        match data.get(src) {
            Some(value) => makeflags.set_value(dst, value),
            None if optional => {}
            None => return Err(Error::missing_key(src, context)),
        }
    }
    Ok(())
}

fn rules_real(action: &str, makeflags: &MakeFlags) -> String {
    format!("$(MAKE) -f debian/rules.real {} {}", action, makeflags)
}

fn var<'a>(state: &'a LevelState, key: &str) -> &'a str {
    state.vars.get_str(key).unwrap_or_default()
}

struct MainHooks {
    settings: Rc<KernelSettings>,
}

impl MainHooks {
    fn abiname(&self, cx: &Context<'_>) -> Result<String> {
        if self.settings.version.modifier.is_some() {
            return Ok(String::new());
        }
        let abi = cx.config.merge("abi", &AxisPath::root());
        Ok(format!("-{}", abi.require_str("abiname", "abi")?))
    }

    fn extra_packages(&self, cx: &Context<'_>, state: &LevelState, out: &mut Output) -> Result<()> {
        let Some(templates) = cx.templates.get_control_opt("control.extra")? else {
            return Ok(());
        };
        out.packages.extend(process_packages(&templates, &state.vars)?);

        let mut per_arch: BTreeMap<&str, Vec<&Package>> = BTreeMap::new();
        for template in &templates {
            for arch in template.architecture() {
                per_arch.entry(arch.as_str()).or_default().push(template);
            }
        }

        for (arch, templates) in per_arch {
            let mut cmds = Vec::new();
            for template in templates {
                let name = process_package(template, &state.vars)?
                    .name()
                    .unwrap_or_default()
                    .to_string();
                let args = if template.contains("X-Version-Overwrite-Epoch") {
                    format!("-v1:{}", self.settings.version.complete())
                } else {
                    String::new()
                };
                cmds.push(format!(
                    "$(MAKE) -f debian/rules.real install-dummy DH_OPTIONS='-p{}' GENCONTROL_ARGS='{}'",
                    name, args
                ));
            }
            let arch_target = AxisPath::arch(arch).target("binary-arch");
            let extra_target = format!("{}_extra", arch_target);
            out.rules.add(&arch_target, &[&extra_target], &[]);
            out.rules.add::<&str>(&extra_target, &[], &cmds);
        }
        Ok(())
    }

    fn installer_packages(&self, state: &LevelState, out: &mut Output) -> Result<()> {
        let Some(dir) = &self.settings.installer_dir else {
            return Ok(());
        };
        let abiname = var(state, "abiname").trim_start_matches('-');
        let control = run_tool("kernel-wedge", &["gen-control", abiname], Some(dir))?;
        let udebs = read_control(&control, "kernel-wedge gen-control")?;
        info!("Adding {} installer packages", udebs.len());
        out.packages.extend(udebs);
        Ok(())
    }
}

impl LevelHooks for MainHooks {
    fn setup(&self, cx: &Context<'_>, _path: &AxisPath, state: &mut LevelState) -> Result<()> {
        let version = &self.settings.version;
        let abiname = self.abiname(cx)?;

        state.vars.insert("upstreamversion", version.upstream.as_str());
        state.vars.insert("version", version.version.as_str());
        state.vars.insert("source_upstream", version.debian.upstream.as_str());
        state.vars.insert("major", version.major.as_str());
        state.vars.insert("abiname", abiname.as_str());

        let flags = &mut state.makeflags;
        flags.set("MAJOR", version.major.as_str());
        flags.set("VERSION", version.version.as_str());
        flags.set("UPSTREAMVERSION", version.upstream.as_str());
        flags.set("ABINAME", abiname);
        flags.set("SOURCEVERSION", version.complete());
        Ok(())
    }

    fn packages(
        &self,
        cx: &Context<'_>,
        _path: &AxisPath,
        state: &mut LevelState,
        out: &mut Output,
        _extra: &mut SideChannel,
    ) -> Result<()> {
        let source = cx.templates.get_control("control.source")?;
        if let Some(first) = source.first() {
            out.packages.set_source(process_package(first, &state.vars)?);
        }
        let main = cx.templates.get_control("control.main")?;
        out.packages.extend(process_packages(&main, &state.vars)?);
        Ok(())
    }

    fn makefile(
        &self,
        _cx: &Context<'_>,
        _path: &AxisPath,
        state: &LevelState,
        rules: &mut RuleGraph,
    ) -> Result<()> {
        rules.declare(".NOTPARALLEL");
        rules.add::<&str>(
            "binary-indep",
            &[],
            &[rules_real("binary-indep", &state.makeflags)],
        );
        Ok(())
    }

    fn finish(
        &self,
        cx: &Context<'_>,
        _path: &AxisPath,
        state: &LevelState,
        out: &mut Output,
        _extra: &mut SideChannel,
    ) -> Result<()> {
        self.extra_packages(cx, state, out)?;
        self.installer_packages(state, out)
    }
}

struct ArchHooks {
    settings: Rc<KernelSettings>,
}

impl LevelHooks for ArchHooks {
    fn setup(&self, cx: &Context<'_>, path: &AxisPath, state: &mut LevelState) -> Result<()> {
        let arch = path.arch.as_deref().unwrap_or_default();
        state.vars.insert("arch", arch);
        state.makeflags.set("ARCH", arch);

        let base = cx.config.merge(BASE, path);
        setup_makeflags(ARCH_MAKEFLAGS, &mut state.makeflags, &base, &format!("base {path}"))?;

        if self.settings.version.modifier.is_none() {
            if let Some(abiname) = cx.config.get("abi", path).and_then(|e| e.get_str("abiname")) {
                let abiname = format!("-{}", abiname);
                state.vars.insert("abiname", abiname.as_str());
                state.makeflags.set("ABINAME", abiname);
            }
        }
        Ok(())
    }

    fn packages(
        &self,
        cx: &Context<'_>,
        path: &AxisPath,
        state: &mut LevelState,
        out: &mut Output,
        extra: &mut SideChannel,
    ) -> Result<()> {
        let arch = path.arch.as_deref().unwrap_or_default();

        let mut packages = Vec::new();
        if let Some(libc_dev) = cx.templates.get_control_opt("control.libc-dev")? {
            packages.extend(process_packages(&libc_dev, &state.vars)?);
        }
        let headers_arch = cx.templates.get_control("control.headers.arch")?;
        packages.extend(process_packages(&headers_arch, &state.vars)?);

        if let Some(name) = packages.last().and_then(Package::name) {
            extra.push(HEADERS_ARCH_PACKAGE, name);
        }
        out.packages.merge_all(packages, arch);
        Ok(())
    }

    fn makefile(
        &self,
        _cx: &Context<'_>,
        path: &AxisPath,
        state: &LevelState,
        rules: &mut RuleGraph,
    ) -> Result<()> {
        link_level_targets(path, DEFAULT_TARGETS, rules);
        let mf = &state.makeflags;
        rules.add::<&str>(&real_target(path, "binary-arch"), &[], &[rules_real("binary-arch-arch", mf)]);
        rules.add::<&str>(&real_target(path, "source"), &[], &[rules_real("source-arch", mf)]);
        Ok(())
    }

    fn finish(
        &self,
        _cx: &Context<'_>,
        path: &AxisPath,
        _state: &LevelState,
        out: &mut Output,
        extra: &mut SideChannel,
    ) -> Result<()> {
        let depends = extra.take(HEADERS_ARCH_DEPENDS);
        let Some(name) = extra.take(HEADERS_ARCH_PACKAGE).into_iter().last() else {
            return Ok(());
        };
        let Some(package) = out.packages.get_mut(&name) else {
            return Ok(());
        };
        debug!("{}: {} flavour headers for {}", path, depends.len(), name);
        for entry in depends {
            package.extend_relations("Depends", RelationList::parse(&entry)?);
        }
        Ok(())
    }
}

struct FeaturesetHooks;

impl LevelHooks for FeaturesetHooks {
    fn setup(&self, _cx: &Context<'_>, path: &AxisPath, state: &mut LevelState) -> Result<()> {
        let featureset = path.featureset.as_deref().unwrap_or_default();
        let localversion = if featureset == IMPLICIT_FEATURESET {
            String::new()
        } else {
            format!("-{}", featureset)
        };

        state.vars.insert("localversion", localversion.as_str());
        state.vars.insert("localversion_headers", localversion.as_str());
        state.makeflags.set("FEATURESET", featureset);
        state.makeflags.set("LOCALVERSION_HEADERS", localversion);
        Ok(())
    }

    fn packages(
        &self,
        cx: &Context<'_>,
        path: &AxisPath,
        state: &mut LevelState,
        out: &mut Output,
        _extra: &mut SideChannel,
    ) -> Result<()> {
        let templates = cx.templates.get_control("control.headers.featureset")?;
        if let Some(template) = templates.first() {
            let package = process_package(template, &state.vars)?;
            out.packages.merge(package, path.arch.as_deref().unwrap_or_default());
        }
        Ok(())
    }

    fn makefile(
        &self,
        _cx: &Context<'_>,
        path: &AxisPath,
        state: &LevelState,
        rules: &mut RuleGraph,
    ) -> Result<()> {
        link_level_targets(path, DEFAULT_TARGETS, rules);
        let mf = &state.makeflags;
        rules.add::<&str>(&real_target(path, "binary-arch"), &[], &[rules_real("binary-arch-featureset", mf)]);
        rules.add::<&str>(&real_target(path, "source"), &[], &[rules_real("source-featureset", mf)]);
        Ok(())
    }
}

struct FlavourHooks;

/// Resolved views a flavour needs
struct FlavourViews {
    base: Entry,
    description: Entry,
    image: Entry,
    image_dbg: Entry,
    relations: Entry,
}

impl FlavourViews {
    fn load(cx: &Context<'_>, path: &AxisPath) -> Self {
        Self {
            base: cx.config.merge(BASE, path),
            description: cx.config.merge("description", path),
            image: cx.config.merge("image", path),
            image_dbg: cx.config.merge("image-dbg", path),
            relations: cx.config.merge("relations", path),
        }
    }
}

impl FlavourHooks {
    /// Alternatives group from symbolic names, plus negated `Breaks` groups
    fn alternatives(
        names: &[String],
        relations: &Entry,
        arch: &str,
        breaks: &mut RelationList,
    ) -> Result<RelationGroup> {
        let mut group = RelationGroup::new();
        for name in names {
            let mut relation = Relation::parse(relations.get_str(name).unwrap_or(name.as_str()))?;
            if relation.operator.is_some() {
                breaks.append(relation.negate().into());
            }
            relation.arches = vec![arch.to_string()];
            group.push(relation);
        }
        Ok(group)
    }

    /// Kernel config fragments for this flavour, most general first
    fn kconfig(cx: &Context<'_>, path: &AxisPath) -> Result<Vec<String>> {
        let arch = path.arch.as_deref().unwrap_or_default();
        let featureset = path.featureset.as_deref().unwrap_or_default();
        let flavour = path.flavour.as_deref().unwrap_or_default();

        let checks: [(String, bool, AxisPath); 6] = [
            ("config".into(), true, AxisPath::root()),
            (format!("{arch}/config"), true, AxisPath::arch(arch)),
            (
                format!("{arch}/config.{flavour}"),
                false,
                AxisPath::from_parts(Some(arch), None, Some(flavour)),
            ),
            (
                format!("featureset-{featureset}/config"),
                false,
                AxisPath::from_parts(None, Some(featureset), None),
            ),
            (format!("{arch}/{featureset}/config"), false, AxisPath::featureset(arch, featureset)),
            (
                format!("{arch}/{featureset}/config.{flavour}"),
                false,
                path.clone(),
            ),
        ];

        let mut files = Vec::new();
        for (default, required, key) in checks {
            let configured = cx
                .config
                .get("image", &key)
                .and_then(|entry| entry.get_list("configs"));
            match configured {
                Some(configs) => {
                    for config in configs {
                        let found = cx
                            .config
                            .find_file(config)
                            .ok_or_else(|| Error::FileUnavailable(config.clone()))?;
                        files.push(found.display().to_string());
                    }
                }
                None => match cx.config.find_file(&default) {
                    Some(found) => files.push(found.display().to_string()),
                    None if required => return Err(Error::FileUnavailable(default)),
                    None => {}
                },
            }
        }
        Ok(files)
    }

    /// Instantiate the image template and fold in the config-derived fields
    fn real_image(
        template: &Package,
        state: &LevelState,
        fields: BTreeMap<&str, RelationList>,
        description: Description,
    ) -> Result<Package> {
        let mut image = process_package(template, &state.vars)?;
        for (field, list) in fields {
            if image.contains(field) || !list.is_empty() {
                image.extend_relations(field, list);
            }
        }
        match image.description_mut() {
            Some(existing) => {
                existing.short.extend(description.short);
                existing.long.extend(description.long);
            }
            None if !description.is_empty() => {
                image.insert("Description", FieldValue::Description(description));
            }
            None => {}
        }
        Ok(image)
    }
}

impl LevelHooks for FlavourHooks {
    fn setup(&self, cx: &Context<'_>, path: &AxisPath, state: &mut LevelState) -> Result<()> {
        let flavour = path.flavour.as_deref().unwrap_or_default();
        let views = FlavourViews::load(cx, path);
        let context = format!("description {path}");

        let localversion = format!("{}-{}", var(state, "localversion"), flavour);
        state.vars.insert("localversion", localversion.as_str());

        let class = views.description.require_str("hardware", &context)?.to_string();
        let longclass = views
            .description
            .get_str("hardware-long")
            .filter(|s| !s.is_empty())
            .unwrap_or(class.as_str())
            .to_string();
        state.vars.insert("class", class);
        state.vars.insert("longclass", longclass);

        let localversion_image = match views.image.get_str("override-localversion") {
            Some(over) => format!("{}-{}", var(state, "localversion_headers"), over),
            None => localversion,
        };
        state.vars.insert("localversion-image", localversion_image);

        state.makeflags.set("FLAVOUR", flavour);
        setup_makeflags(FLAVOUR_MAKEFLAGS_BASE, &mut state.makeflags, &views.base, &format!("base {path}"))?;
        setup_makeflags(FLAVOUR_MAKEFLAGS_IMAGE, &mut state.makeflags, &views.image, &format!("image {path}"))?;
        let vars = state.vars.clone();
        setup_makeflags(FLAVOUR_MAKEFLAGS_OTHER, &mut state.makeflags, &vars, &format!("variables {path}"))?;
        Ok(())
    }

    fn packages(
        &self,
        cx: &Context<'_>,
        path: &AxisPath,
        state: &mut LevelState,
        out: &mut Output,
        extra: &mut SideChannel,
    ) -> Result<()> {
        let arch = path.arch.as_deref().unwrap_or_default();
        let arches = [arch.to_string()];
        let views = FlavourViews::load(cx, path);

        let compiler = views.base.get_str("compiler").unwrap_or("gcc");
        let compiler_text = views
            .relations
            .require_str(compiler, &format!("relations {path}"))?;
        let relations_compiler = RelationList::parse(compiler_text)?;
        if let Some(source) = out.packages.source_mut() {
            source.extend_relations(
                "Build-Depends",
                RelationList::parse_with_arches(compiler_text, &arches)?,
            );
        }

        let mut fields: BTreeMap<&str, RelationList> = BTreeMap::new();
        for &field in IMAGE_RELATION_FIELDS {
            let text = views.image.get_str(&field.to_lowercase()).unwrap_or_default();
            fields.insert(field, RelationList::parse_with_arches(text, &arches)?);
        }
        let mut breaks = RelationList::new();

        if views.image.get_bool("initramfs").unwrap_or(true) {
            let generators = views.image.get_list("initramfs-generators").unwrap_or_default();
            let commands = cx.config.merge("commands-image-initramfs-generators", path);
            let initrd_cmd: Vec<&str> = generators
                .iter()
                .filter_map(|g| commands.get_str(g))
                .collect();
            state.makeflags.set("INITRD_CMD", initrd_cmd.join(" "));

            let group = Self::alternatives(generators, &views.relations, arch, &mut breaks)?;
            if !group.is_empty() {
                fields.entry("Depends").or_default().append(group);
            }
        }

        if let Some(bootloaders) = views.image.get_list("bootloaders").filter(|b| !b.is_empty()) {
            let group = Self::alternatives(bootloaders, &views.relations, arch, &mut breaks)?;
            fields.entry("Suggests").or_default().append(group);
        }
        fields.entry("Breaks").or_default().extend(breaks);

        let mut description = Description::new();
        let mut parts = cx.config.merge_list("description", path, "parts");
        parts.sort();
        parts.dedup();
        for part in parts {
            let long = views
                .description
                .require_str(&format!("part-long-{part}"), &format!("description {path}"))?;
            let short = views.description.get_str(&format!("part-short-{part}"));
            description.append(long);
            description.append_short(short.unwrap_or_default());
        }

        let image_type = views.image.require_str("type", &format!("image {path}"))?;
        let image = cx.templates.get_control(&format!("control.image.type-{image_type}"))?;
        let mut packages = Vec::new();
        if let Some((first, rest)) = image.split_first() {
            packages.push(Self::real_image(first, state, fields, description)?);
            packages.extend(process_packages(rest, &state.vars)?);
        }

        if views.base.get_bool("modules").unwrap_or(true) {
            state.makeflags.set("MODULES", "True");
            let headers = cx.templates.get_control("control.headers")?;
            if let Some(template) = headers.first() {
                let mut package = process_package(template, &state.vars)?;
                package.extend_relations("Depends", relations_compiler);
                if let Some(name) = package.name() {
                    extra.push(HEADERS_ARCH_DEPENDS, format!("{name} (= ${{binary:Version}})"));
                }
                packages.push(package);
            }
        }

        let debug = views.image_dbg.get_bool("enabled").unwrap_or(false);
        if debug {
            state.makeflags.set("DEBUG", "True");
            let dbg = cx.templates.get_control("control.image-dbg")?;
            packages.extend(process_packages(&dbg, &state.vars)?);
        }

        out.packages.merge_all(packages, arch);

        state.makeflags.set("KCONFIG", Self::kconfig(cx, path)?.join(" "));
        if debug {
            state.makeflags.set("KCONFIG_OPTIONS", "-o DEBUG_INFO=y");
        }
        Ok(())
    }

    fn makefile(
        &self,
        _cx: &Context<'_>,
        path: &AxisPath,
        state: &LevelState,
        rules: &mut RuleGraph,
    ) -> Result<()> {
        link_level_targets(path, DEFAULT_TARGETS, rules);
        let mf = &state.makeflags;
        rules.add::<&str>(&real_target(path, "binary-arch"), &[], &[rules_real("binary-arch-flavour", mf)]);
        rules.add::<&str>(&real_target(path, "build"), &[], &[rules_real("build", mf)]);
        rules.add::<&str>(&real_target(path, "setup"), &[], &[rules_real("setup-flavour", mf)]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_makeflags_optional_and_required() {
        let data: Entry = [("compiler", "gcc-14"), ("kernel-arch", "x86")]
            .into_iter()
            .collect();
        let mut flags = MakeFlags::new();
        setup_makeflags(FLAVOUR_MAKEFLAGS_BASE, &mut flags, &data, "base").unwrap();
        assert_eq!(flags.get("COMPILER"), Some("gcc-14"));
        assert_eq!(flags.get("KERNEL_ARCH"), Some("x86"));
        assert!(!flags.contains("CFLAGS_KERNEL"));

        let err = setup_makeflags(FLAVOUR_MAKEFLAGS_IMAGE, &mut flags, &data, "image amd64").unwrap_err();
        assert!(matches!(err, Error::MissingKey { key, .. } if key == "type"));
    }

    #[test]
    fn test_alternatives_negate_constrained_entries() {
        let relations: Entry = [("initramfs-tools", "initramfs-tools (>= 0.120)")]
            .into_iter()
            .collect();
        let names = vec!["initramfs-tools".to_string(), "dracut".to_string()];
        let mut breaks = RelationList::new();
        let group = FlavourHooks::alternatives(&names, &relations, "amd64", &mut breaks).unwrap();
        assert_eq!(
            group.to_string(),
            "initramfs-tools (>= 0.120) [amd64] | dracut [amd64]"
        );
        assert_eq!(breaks.to_string(), "initramfs-tools (<< 0.120)");
    }

    #[test]
    fn test_rules_real_line() {
        let mut flags = MakeFlags::new();
        flags.set("ARCH", "amd64");
        assert_eq!(
            rules_real("source-arch", &flags),
            "$(MAKE) -f debian/rules.real source-arch ARCH='amd64'"
        );
    }
}
