// src/relation/mod.rs

//! Package relation algebra
//!
//! Debian relation fields are lists (AND) of groups (OR) of single relations:
//!
//! ```text
//! initramfs-tools (>= 0.55) [amd64] | linux-initramfs-tool, kmod
//! ```
//!
//! A [`RelationList`] never holds two groups with the same positional
//! name/version sequence: appending a matching group unions its architecture
//! restrictions into the existing one instead.

use crate::config::Entry;
use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;
use std::sync::LazyLock;

static RELATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)(?: \((<<|<=|=|!=|>=|>>)\s*([^)]+)\))?(?: \[([^\]]+)\])?$").unwrap()
});

/// Version comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `<<`
    Lt,
    /// `<=`
    Le,
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>=`
    Ge,
    /// `>>`
    Gt,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lt => "<<",
            Self::Le => "<=",
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Ge => ">=",
            Self::Gt => ">>",
        }
    }
}

impl Neg for Operator {
    type Output = Operator;

    /// Logical complement
    fn neg(self) -> Operator {
        match self {
            Self::Lt => Self::Ge,
            Self::Le => Self::Gt,
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Ge => Self::Lt,
            Self::Gt => Self::Le,
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "<<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            "=" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            ">=" => Ok(Self::Ge),
            ">>" => Ok(Self::Gt),
            _ => Err(Error::RelationParse(s.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single relation: `name (op version) [arch ...]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    pub name: String,
    pub operator: Option<Operator>,
    pub version: Option<String>,
    /// Architecture restriction, kept in insertion order without duplicates
    pub arches: Vec<String>,
}

impl Relation {
    /// Unconstrained relation on `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operator: None,
            version: None,
            arches: Vec::new(),
        }
    }

    /// Parse a single relation, failing on anything outside the grammar
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let caps = RELATION_RE
            .captures(text)
            .ok_or_else(|| Error::RelationParse(text.to_string()))?;

        let operator = caps
            .get(2)
            .map(|m| m.as_str().parse::<Operator>())
            .transpose()?;
        let version = caps.get(3).map(|m| m.as_str().trim().to_string());
        let arches = caps
            .get(4)
            .map(|m| m.as_str().split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Ok(Self {
            name: caps[1].to_string(),
            operator,
            version,
            arches,
        })
    }

    /// Copy with the complementary operator
    ///
    /// Only meaningful for relations carrying an operator; an unconstrained
    /// relation is returned unchanged.
    pub fn negate(&self) -> Self {
        Self {
            operator: self.operator.map(Neg::neg),
            ..self.clone()
        }
    }

    /// Late-bind a symbolic name through a lookup table
    ///
    /// Applies only to a bare relation (no version, no arches) whose name is a
    /// key of `entry`; the looked-up value replaces this relation.
    pub fn config(&mut self, entry: &Entry) -> Result<()> {
        if self.version.is_some() || !self.arches.is_empty() {
            return Ok(());
        }
        if let Some(value) = entry.get_str(&self.name) {
            *self = Self::parse(value)?;
        }
        Ok(())
    }

    /// Identity used for group merging
    fn same_target(&self, other: &Relation) -> bool {
        self.name == other.name && self.version == other.version
    }

    /// Union `other`'s arches into a relation that already has a restriction
    fn union_arches(&mut self, other: &Relation) {
        if self.arches.is_empty() {
            return;
        }
        for arch in &other.arches {
            if !self.arches.contains(arch) {
                self.arches.push(arch.clone());
            }
        }
    }
}

impl FromStr for Relation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let (Some(op), Some(version)) = (&self.operator, &self.version) {
            write!(f, " ({} {})", op, version)?;
        }
        if !self.arches.is_empty() {
            write!(f, " [{}]", self.arches.join(" "))?;
        }
        Ok(())
    }
}

/// Alternatives: any one relation satisfies the group
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RelationGroup(Vec<Relation>);

impl RelationGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `a | b (>= 1) | c`
    pub fn parse(text: &str) -> Result<Self> {
        text.split('|')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(Relation::parse)
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn push(&mut self, relation: Relation) {
        self.0.push(relation);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relation> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Relation> {
        self.0.iter_mut()
    }

    /// Restrict every alternative to exactly `arches`
    pub fn set_arches(&mut self, arches: &[String]) {
        for relation in &mut self.0 {
            relation.arches = arches.to_vec();
        }
    }

    pub fn config(&mut self, entry: &Entry) -> Result<()> {
        self.0.iter_mut().try_for_each(|relation| relation.config(entry))
    }

    /// Same length and the same name/version at every position
    pub fn matches(&self, other: &RelationGroup) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(&other.0).all(|(a, b)| a.same_target(b))
    }

    fn union_arches(&mut self, other: &RelationGroup) {
        for (mine, theirs) in self.0.iter_mut().zip(&other.0) {
            mine.union_arches(theirs);
        }
    }
}

impl From<Relation> for RelationGroup {
    fn from(relation: Relation) -> Self {
        Self(vec![relation])
    }
}

impl FromIterator<Relation> for RelationGroup {
    fn from_iter<I: IntoIterator<Item = Relation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for RelationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, relation) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", relation)?;
        }
        Ok(())
    }
}

/// Conjunction of relation groups, as found in a `Depends` field
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RelationList(Vec<RelationGroup>);

impl RelationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma separated list of groups; empty items are skipped
    pub fn parse(text: &str) -> Result<Self> {
        let mut list = Self::new();
        for item in text.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            list.append(RelationGroup::parse(item)?);
        }
        Ok(list)
    }

    /// Parse and restrict every alternative to `arches`
    pub fn parse_with_arches(text: &str, arches: &[String]) -> Result<Self> {
        let mut list = Self::parse(text)?;
        list.set_arches(arches);
        Ok(list)
    }

    /// Add a group, merging it into an existing matching group
    pub fn append(&mut self, group: RelationGroup) {
        if group.is_empty() {
            return;
        }
        match self.0.iter_mut().find(|existing| existing.matches(&group)) {
            Some(existing) => existing.union_arches(&group),
            None => self.0.push(group),
        }
    }

    /// Append every group of `other` in order
    pub fn extend(&mut self, other: impl IntoIterator<Item = RelationGroup>) {
        for group in other {
            self.append(group);
        }
    }

    pub fn set_arches(&mut self, arches: &[String]) {
        for group in &mut self.0 {
            group.set_arches(arches);
        }
    }

    pub fn config(&mut self, entry: &Entry) -> Result<()> {
        self.0.iter_mut().try_for_each(|group| group.config(entry))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationGroup> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RelationGroup> {
        self.0.iter_mut()
    }
}

impl IntoIterator for RelationList {
    type Item = RelationGroup;
    type IntoIter = std::vec::IntoIter<RelationGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<RelationGroup> for RelationList {
    fn from_iter<I: IntoIterator<Item = RelationGroup>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl FromStr for RelationList {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RelationList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", group)?;
        }
        Ok(())
    }
}
