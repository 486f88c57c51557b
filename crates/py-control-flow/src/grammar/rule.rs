// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use crate::{
    error::{DecompileError, DecompileResult},
    symbol::Symbol,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A grammar rule identity: left-hand side plus the ordered right-hand side.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId {
    pub lhs: Symbol,
    pub rhs: Vec<Symbol>,
}

impl RuleId {
    pub fn new(lhs: &str, rhs: &[&str]) -> Self {
        Self {
            lhs: Symbol::new(lhs),
            rhs: rhs.iter().map(|s| Symbol::new(s)).collect(),
        }
    }

    /// Parses `lhs ::= a b c`. An empty right-hand side is allowed.
    pub fn parse(text: &str) -> DecompileResult<Self> {
        let (lhs, rhs) = text
            .split_once("::=")
            .ok_or_else(|| DecompileError::MalformedRule(text.trim().to_string()))?;
        let lhs = lhs.trim();
        if lhs.is_empty() || lhs.contains(char::is_whitespace) {
            return Err(DecompileError::MalformedRule(text.trim().to_string()));
        }
        Ok(Self {
            lhs: Symbol::new(lhs),
            rhs: rhs.split_whitespace().map(Symbol::new).collect(),
        })
    }

    /// The identity of one particular reduction: right-hand-side symbols that
    /// derived nothing are spelled in their empty form.
    pub fn mark_empty(&self, empty: &[bool]) -> Self {
        Self {
            lhs: self.lhs,
            rhs: self
                .rhs
                .iter()
                .zip(empty.iter().chain(std::iter::repeat(&false)))
                .map(|(sym, empty)| if *empty { sym.empty_form() } else { *sym })
                .collect(),
        }
    }

    pub fn is_left_recursive(&self) -> bool {
        self.rhs.len() > 1 && self.rhs[0] == self.lhs
    }
}

/// Parses one rule per line. `#` starts a comment; blank lines are skipped.
pub fn parse_rules(text: &str) -> DecompileResult<Vec<RuleId>> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(RuleId::parse)
        .collect()
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ::=", self.lhs)?;
        for sym in &self.rhs {
            write!(f, " {}", sym)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rule_text() {
        let rule = RuleId::parse("ifelsestmtc ::= testexpr c_stmts_opt jb_cfs else_suitec").unwrap();
        assert_eq!(rule, RuleId::new("ifelsestmtc", &["testexpr", "c_stmts_opt", "jb_cfs", "else_suitec"]));
        insta::assert_snapshot!(rule.to_string(), @"ifelsestmtc ::= testexpr c_stmts_opt jb_cfs else_suitec");
    }

    #[test]
    fn parse_empty_rhs_and_comments() {
        let rules = parse_rules(
            "
            # trailing come-froms
            _come_froms ::=
            _come_froms ::= _come_froms COME_FROM  # left recursive
            ",
        )
        .unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules[0].rhs.is_empty());
        assert!(rules[1].is_left_recursive());
    }

    #[test]
    fn malformed_rules_are_errors() {
        assert!(matches!(RuleId::parse("stmts stmt"), Err(DecompileError::MalformedRule(_))));
        assert!(matches!(RuleId::parse("a b ::= c"), Err(DecompileError::MalformedRule(_))));
    }

    #[test]
    fn empty_children_change_the_identity() {
        let rule = RuleId::new("ifelsestmt", &["testexpr", "stmts_opt", "jump_forward_else", "else_suite", "_come_froms"]);
        let marked = rule.mark_empty(&[false, false, false, false, true]);
        assert_eq!(marked.to_string(), "ifelsestmt ::= testexpr stmts_opt jump_forward_else else_suite \\e__come_froms");
        assert_ne!(marked, rule);
    }
}
