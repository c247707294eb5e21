// src/lib.rs

//! gencontrol: Debian kernel packaging generator
//!
//! Turns a hierarchical configuration tree (architecture × featureset ×
//! flavour) plus control templates into the `debian/control` file and the
//! `debian/rules.gen` make fragment of a kernel source package.
//!
//! # Architecture
//!
//! - Configuration: fragments are loaded into a [`ConfigStore`] and read
//!   through resolved views that overlay general scopes with specific ones
//! - Relations: dependency expressions with arch restrictions and merging
//! - Generator: a depth-first walk of the axis tree calling per-level hooks
//! - Writer: in-memory rendering, then atomic file replacement

pub mod config;
pub mod control;
mod error;
pub mod external;
pub mod generator;
pub mod relation;
pub mod rules;
pub mod version;
pub mod writer;

pub use config::{AxisPath, ConfigStore, ConfigValue, Entry};
pub use control::{Package, PackageList, Templates};
pub use error::{Error, Result};
pub use generator::{Generator, Hooks, LevelHooks, LevelState, Output};
pub use relation::{Relation, RelationGroup, RelationList};
pub use rules::{MakeFlags, RuleGraph};
pub use version::{DebianVersion, LinuxVersion};
