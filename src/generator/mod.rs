// src/generator/mod.rs

//! Traversal engine
//!
//! The generator walks the axis tree `Main → Arch → Featureset → Flavour` in
//! declaration order. At every enabled node it:
//!
//! 1. overlays the resolved `base` view onto the inherited variables,
//! 2. calls the level's [`LevelHooks::setup`],
//! 3. calls [`LevelHooks::packages`],
//! 4. calls [`LevelHooks::makefile`],
//! 5. visits each child with its own copy of the [`LevelState`],
//! 6. calls [`LevelHooks::finish`] once all children are done.
//!
//! Each architecture subtree gets a fresh [`SideChannel`] shared by the
//! architecture and everything below it; the architecture's `finish` hook
//! drains what its flavours pushed.

pub mod kernel;

use crate::config::{AxisPath, ConfigStore, Entry, Level, BASE};
use crate::control::{PackageList, Templates};
use crate::error::Result;
use crate::rules::{MakeFlags, RuleGraph};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Targets linked from every level down to its `_real` leaf
pub const DEFAULT_TARGETS: &[&str] = &["binary-arch", "build", "setup", "source"];

/// Read-only inputs shared by all hooks
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub config: &'a ConfigStore,
    pub templates: &'a Templates,
}

/// Per-node mutable state, copied into every child
#[derive(Debug, Clone, Default)]
pub struct LevelState {
    pub vars: Entry,
    pub makeflags: MakeFlags,
}

/// Values collected below a node for that node's `finish` hook
#[derive(Debug, Default)]
pub struct SideChannel(BTreeMap<String, Vec<String>>);

impl SideChannel {
    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        self.0.entry(key.to_string()).or_default().push(value.into());
    }

    /// Remove and return everything pushed under `key`
    pub fn take(&mut self, key: &str) -> Vec<String> {
        self.0.remove(key).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Accumulated generation result
#[derive(Debug, Default)]
pub struct Output {
    pub packages: PackageList,
    pub rules: RuleGraph,
}

/// Extension points of one axis level
///
/// Every method has a default; implementors override what their level needs.
pub trait LevelHooks {
    /// Derive variables and make flags for this node
    fn setup(&self, _cx: &Context<'_>, _path: &AxisPath, _state: &mut LevelState) -> Result<()> {
        Ok(())
    }

    /// Emit or extend package records
    fn packages(
        &self,
        _cx: &Context<'_>,
        _path: &AxisPath,
        _state: &mut LevelState,
        _out: &mut Output,
        _extra: &mut SideChannel,
    ) -> Result<()> {
        Ok(())
    }

    /// Declare rule graph nodes for this node
    fn makefile(
        &self,
        _cx: &Context<'_>,
        path: &AxisPath,
        _state: &LevelState,
        rules: &mut RuleGraph,
    ) -> Result<()> {
        link_level_targets(path, DEFAULT_TARGETS, rules);
        Ok(())
    }

    /// Post-process after all children were visited
    fn finish(
        &self,
        _cx: &Context<'_>,
        _path: &AxisPath,
        _state: &LevelState,
        _out: &mut Output,
        _extra: &mut SideChannel,
    ) -> Result<()> {
        Ok(())
    }
}

/// Hooks that only link the default targets
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkOnly;

impl LevelHooks for LinkOnly {}

/// One hook object per axis level
pub struct Hooks {
    pub main: Box<dyn LevelHooks>,
    pub arch: Box<dyn LevelHooks>,
    pub featureset: Box<dyn LevelHooks>,
    pub flavour: Box<dyn LevelHooks>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            main: Box::new(LinkOnly),
            arch: Box::new(LinkOnly),
            featureset: Box::new(LinkOnly),
            flavour: Box::new(LinkOnly),
        }
    }
}

impl Hooks {
    fn for_level(&self, level: Level) -> &dyn LevelHooks {
        match level {
            Level::Main => self.main.as_ref(),
            Level::Arch => self.arch.as_ref(),
            Level::Featureset => self.featureset.as_ref(),
            Level::Flavour => self.flavour.as_ref(),
        }
    }
}

/// Link `parent target → this target → this target's _real leaf`
///
/// The global scope has no parent and no leaf, so nothing is declared for it.
pub fn link_level_targets(path: &AxisPath, targets: &[&str], rules: &mut RuleGraph) {
    let Some(parent) = path.parent() else {
        return;
    };
    for target in targets {
        let this = path.target(target);
        let real = real_target(path, target);
        rules.add(&parent.target(target), &[&this], &[]);
        rules.add(&this, &[&real], &[]);
        rules.declare(&real);
    }
}

/// Name of the recipe-carrying leaf of `target` at `path`
pub fn real_target(path: &AxisPath, target: &str) -> String {
    format!("{}_real", path.target(target))
}

/// The traversal engine
pub struct Generator<'a> {
    cx: Context<'a>,
    hooks: Hooks,
}

impl<'a> Generator<'a> {
    pub fn new(config: &'a ConfigStore, templates: &'a Templates, hooks: Hooks) -> Self {
        Self {
            cx: Context { config, templates },
            hooks,
        }
    }

    /// Walk the whole axis tree starting from `initial` variables
    pub fn run(&self, initial: LevelState) -> Result<Output> {
        let mut out = Output::default();
        let mut extra = SideChannel::default();
        self.visit(&AxisPath::root(), initial, &mut out, &mut extra)?;
        info!(
            "Generated {} binary packages and {} rules",
            out.packages.len(),
            out.rules.len()
        );
        Ok(out)
    }

    fn children(&self, path: &AxisPath) -> Result<Vec<String>> {
        let config = self.cx.config;
        Ok(match (&path.arch, &path.featureset, &path.flavour) {
            (None, _, _) => config.arches()?,
            (Some(arch), None, _) => config.featuresets(arch),
            (Some(arch), Some(featureset), None) => config.flavours(arch, featureset),
            _ => Vec::new(),
        })
    }

    fn visit(
        &self,
        path: &AxisPath,
        mut state: LevelState,
        out: &mut Output,
        extra: &mut SideChannel,
    ) -> Result<()> {
        if !self.cx.config.is_enabled(path) {
            info!("Skipping disabled {}", path);
            return Ok(());
        }
        debug!("Visiting {}", path);

        let level = path.level();
        let hooks = self.hooks.for_level(level);
        state.vars.update(&self.cx.config.merge(BASE, path));

        hooks.setup(&self.cx, path, &mut state)?;
        hooks.packages(&self.cx, path, &mut state, out, extra)?;
        hooks.makefile(&self.cx, path, &state, &mut out.rules)?;

        for child in self.children(path)? {
            let child_path = path.child(child);
            if level == Level::Main {
                let mut arch_extra = SideChannel::default();
                self.visit(&child_path, state.clone(), out, &mut arch_extra)?;
            } else {
                self.visit(&child_path, state.clone(), out, extra)?;
            }
        }

        hooks.finish(&self.cx, path, &state, out, extra)
    }
}
