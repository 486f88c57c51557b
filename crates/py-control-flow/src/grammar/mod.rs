// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Grammar rule tables.

mod customize;
mod rule;

pub use customize::customize;
pub use rule::{parse_rules, RuleId};

use crate::{
    error::DecompileResult,
    symbol::Symbol,
    versions::{Edit, Overlay},
};
use log::debug;
use std::{collections::BTreeSet, fmt};

/// An immutable rule table. Tables are combined by producing new tables, never by
/// mutating a shared one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grammar {
    rules: BTreeSet<RuleId>,
    /// Left-recursive list symbols whose reductions are flattened into one node.
    collect: BTreeSet<Symbol>,
}

impl Grammar {
    pub fn new(rules: impl IntoIterator<Item = RuleId>, collect: &[&str]) -> Self {
        Self {
            rules: rules.into_iter().collect(),
            collect: collect.iter().map(|s| Symbol::new(s)).collect(),
        }
    }

    pub fn from_text(text: &str, collect: &[&str]) -> DecompileResult<Self> {
        Ok(Self::new(parse_rules(text)?, collect))
    }

    pub fn rules(&self) -> impl Iterator<Item = &RuleId> {
        self.rules.iter()
    }

    pub fn contains(&self, rule: &RuleId) -> bool {
        self.rules.contains(rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_collect(&self, symbol: Symbol) -> bool {
        self.collect.contains(&symbol)
    }

    /// Symbols that appear on some left-hand side.
    pub fn nonterminals(&self) -> BTreeSet<Symbol> {
        self.rules.iter().map(|rule| rule.lhs).collect()
    }

    /// A new table with the overlay's edits applied.
    pub fn merge(&self, overlay: &Overlay<RuleId, ()>) -> Self {
        let mut rules = self.rules.clone();
        for (rule, edit) in overlay.edits() {
            match edit {
                Edit::Set(()) => {
                    rules.insert(rule.clone());
                }
                Edit::Remove => {
                    if !rules.remove(rule) {
                        debug!("grammar overlay removes absent rule `{}`", rule);
                    }
                }
            }
        }
        Self {
            rules,
            collect: self.collect.clone(),
        }
    }

    /// A new table with extra rules added.
    pub fn extend(&self, extra: impl IntoIterator<Item = RuleId>) -> Self {
        let mut rules = self.rules.clone();
        rules.extend(extra);
        Self {
            rules,
            collect: self.collect.clone(),
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}
