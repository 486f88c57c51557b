// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Per-version tables.
//!
//! The base tables hold what every supported version shares. Each version then
//! contributes an overlay of edits, applied in ascending version order up to and
//! including the target, so 3.8 sees base, then the 3.7 edits, then its own.

pub(crate) mod base;
mod overlay;
mod v37;
mod v38;

pub use overlay::{merge, Edit, Overlay};

use crate::{
    error::{DecompileError, DecompileResult},
    grammar::{Grammar, RuleId},
    reducecheck::{ReduceCheck, ReduceChecks},
    symbol::Symbol,
    templates::{Template, Templates},
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

pub const SUPPORTED: [Version; 2] = [Version::new(3, 7), Version::new(3, 8)];

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| format!("expected MAJOR.MINOR, got `{}`", s))?;
        let parse = |part: &str| {
            part.parse::<u8>()
                .map_err(|err| format!("bad version component `{}`: {}", part, err))
        };
        Ok(Version::new(parse(major)?, parse(minor)?))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?.parse().map_err(de::Error::custom)
    }
}

/// The edits one version makes to the tables of the versions before it.
#[derive(Clone, Debug, Default)]
pub struct VersionOverlay {
    pub grammar: Overlay<RuleId, ()>,
    pub templates: Overlay<Symbol, Template>,
    pub checks: Overlay<RuleId, ReduceCheck>,
}

impl VersionOverlay {
    pub fn then(self, next: Self) -> Self {
        Self {
            grammar: self.grammar.then(next.grammar),
            templates: self.templates.then(next.templates),
            checks: self.checks.then(next.checks),
        }
    }
}

/// Everything the decompiler needs for one target version.
#[derive(Clone, Debug)]
pub struct VersionTables {
    pub version: Version,
    pub grammar: Grammar,
    pub templates: Templates,
    pub checks: ReduceChecks,
}

impl VersionTables {
    pub fn for_version(version: Version) -> DecompileResult<Self> {
        if !SUPPORTED.contains(&version) {
            return Err(DecompileError::UnsupportedVersion(version));
        }
        let overlays: [(Version, fn() -> DecompileResult<VersionOverlay>); 2] =
            [(Version::new(3, 7), v37::overlay), (Version::new(3, 8), v38::overlay)];
        let mut combined = VersionOverlay::default();
        for (introduced, overlay) in overlays {
            if introduced <= version {
                combined = combined.then(overlay()?);
            }
        }

        let grammar = base::grammar()?.merge(&combined.grammar);
        let templates = base::templates().with_edits(&combined.templates);
        let checks = base::checks(&grammar).with_edits(&combined.checks);
        templates.validate()?;
        Ok(Self {
            version,
            grammar,
            templates,
            checks,
        })
    }

    /// Start symbol for a code object of the given kind.
    pub fn start_symbol(&self, kind: CodeKind) -> Symbol {
        match kind {
            CodeKind::Module | CodeKind::Function => Symbol::new("stmts"),
            CodeKind::ListComp => Symbol::new("listcomp_code"),
        }
    }
}

/// What a code object compiles: decides the start symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodeKind {
    Module,
    Function,
    ListComp,
}

impl CodeKind {
    pub fn of(name: &str) -> Self {
        match name {
            "<module>" => CodeKind::Module,
            "<listcomp>" => CodeKind::ListComp,
            _ => CodeKind::Function,
        }
    }
}

/// All spellings of `rule` in which any subset of its nullable right-hand-side
/// symbols derived nothing.
pub fn empty_forms(rule: &RuleId, nullable: &[&str]) -> Vec<RuleId> {
    let positions: Vec<usize> = rule
        .rhs
        .iter()
        .enumerate()
        .filter(|(_, sym)| sym.is_any(nullable))
        .map(|(i, _)| i)
        .collect();
    (0..1usize << positions.len())
        .map(|mask| {
            let mut empty = vec![false; rule.rhs.len()];
            for (bit, &position) in positions.iter().enumerate() {
                empty[position] = mask & (1 << bit) != 0;
            }
            rule.mark_empty(&empty)
        })
        .collect()
}

/// Pairs every rule whose left-hand side `table` names with that check, once for
/// each empty-child spelling of the rule.
fn registrations<'a>(
    rules: impl IntoIterator<Item = &'a RuleId> + 'a,
    table: &'a [(&'a str, ReduceCheck)],
) -> impl Iterator<Item = (RuleId, ReduceCheck)> + 'a {
    rules
        .into_iter()
        .filter_map(move |rule| {
            table
                .iter()
                .find(|(lhs, _)| rule.lhs == *lhs)
                .map(|(_, check)| (rule, *check))
        })
        .flat_map(|(rule, check)| empty_forms(rule, &base::NULLABLE).into_iter().map(move |form| (form, check)))
}
