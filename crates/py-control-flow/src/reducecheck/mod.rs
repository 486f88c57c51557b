// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Reduction checks: semantic predicates that accept or reject a candidate
//! reduction proposed by the reducer.
//!
//! A check is a pure function of the reduction: the rule identity, the inclusive
//! token span `[first, last]`, the candidate subtree and the whole token stream.
//! Checks are written as a sequence of guard clauses; the first guard that objects
//! returns a [`Reject`] naming the reason.

pub mod blocks;
pub mod boolop;
pub mod comprehension;
pub mod ifelse;
pub mod ifstmt;
pub mod loops;

use crate::{
    grammar::RuleId,
    token::Token,
    tree::{Element, Node},
    versions::{merge, Overlay},
};
use log::debug;
use std::{collections::BTreeMap, fmt};
use thiserror::Error;

/// A candidate reduction handed to a check.
#[derive(Clone, Copy, Debug)]
pub struct Reduction<'a> {
    pub rule: &'a RuleId,
    pub tree: &'a Node,
    pub tokens: &'a [Token],
    pub first: usize,
    pub last: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Reject {
    #[error("followed by a loop-exit come-from")]
    FollowedByLoopExit,
    #[error("rule is not a registered variant of this family")]
    UnregisteredVariant,
    #[error("trailing come-from originates at {origin}, before the construct starts at {start}")]
    ComeFromBeforeStart { origin: u32, start: u32 },
    #[error("then-branch exit originates at {origin}, before the construct starts at {start}")]
    ThenExitBeforeStart { origin: u32, start: u32 },
    #[error("loop else jump from {origin} lands past the then-branch start {then_start}")]
    LoopElseMisplaced { origin: u32, then_start: u32 },
    #[error("closing forward jump targets {target}, construct ends at {end}")]
    EndJumpMismatch { target: u32, end: u32 },
    #[error("conditional jump goes straight to the end at {target}")]
    JumpToEnd { target: u32 },
    #[error("else jump targets {target}, before the end at {end}")]
    ElseJumpBeforeEnd { target: u32, end: u32 },
    #[error("landing come-from at {landing} differs from the jump target {target}")]
    LandingMismatch { landing: u32, target: u32 },
    #[error("jump target {target} precedes the construct start {start}")]
    JumpBeforeStart { target: u32, start: u32 },
    #[error("jump target {target} lies past the end at {end}")]
    JumpPastEnd { target: u32, end: u32 },
    #[error("no come-from originates at the jump at {jump}")]
    MissingJumpOrigin { jump: u32 },
    #[error("jump target {target} lands inside the body")]
    JumpIntoBody { target: u32 },
    #[error("jump to {target} goes backwards outside a loop")]
    UnexpectedBackwardJump { target: u32 },
    #[error("jump to {target} does not go back to the loop")]
    ExpectedBackwardJump { target: u32 },
    #[error("body is an if statement on the same jump target {target}; this is a chained condition")]
    ChainedCondition { target: u32 },
    #[error("then-branch returns and code follows at {next}; this is an if/else")]
    ReturnBeforeElse { next: u32 },
    #[error("not followed by a back edge to {target}")]
    NoBackEdge { target: u32 },
    #[error("short-circuit jump to {target} does not match the operand layout")]
    BoolOpTarget { target: u32 },
    #[error("back edge goes to {target}, expected {expected}")]
    BackEdge { target: u32, expected: u32 },
    #[error("loop exit at {target} does not lie past the back edge at {back_edge}")]
    LoopExitInside { target: u32, back_edge: u32 },
    #[error("block setup targets {setup}, handler is at {handler}")]
    HandlerMismatch { setup: u32, handler: u32 },
    #[error("comprehension filter jumps forward to {target}, past {start}")]
    FilterJump { target: u32, start: u32 },
    #[error("unexpected tree shape: {0}")]
    UnexpectedShape(&'static str),
}

pub type CheckResult = Result<(), Reject>;

pub type CheckFn = fn(&Reduction<'_>) -> CheckResult;

/// A named check function.
#[derive(Clone, Copy)]
pub struct ReduceCheck {
    pub name: &'static str,
    run: CheckFn,
}

impl ReduceCheck {
    pub const fn new(name: &'static str, run: CheckFn) -> Self {
        Self { name, run }
    }

    pub fn run(&self, reduction: &Reduction<'_>) -> CheckResult {
        (self.run)(reduction)
    }
}

impl PartialEq for ReduceCheck {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ReduceCheck {}

impl fmt::Debug for ReduceCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReduceCheck({})", self.name)
    }
}

/// Immutable map from rule identity to check. Identities without an entry accept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReduceChecks {
    checks: BTreeMap<RuleId, ReduceCheck>,
}

#[derive(Default)]
pub struct ReduceChecksBuilder {
    checks: BTreeMap<RuleId, ReduceCheck>,
}

impl ReduceChecksBuilder {
    pub fn register(mut self, rule: RuleId, check: ReduceCheck) -> Self {
        self.checks.insert(rule, check);
        self
    }

    pub fn register_all<'a>(self, rules: impl IntoIterator<Item = &'a RuleId>, check: ReduceCheck) -> Self {
        rules
            .into_iter()
            .fold(self, |builder, rule| builder.register(rule.clone(), check))
    }

    pub fn build(self) -> ReduceChecks {
        ReduceChecks { checks: self.checks }
    }
}

impl ReduceChecks {
    pub fn builder() -> ReduceChecksBuilder {
        ReduceChecksBuilder::default()
    }

    pub fn get(&self, rule: &RuleId) -> Option<&ReduceCheck> {
        self.checks.get(rule)
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RuleId, &ReduceCheck)> {
        self.checks.iter()
    }

    pub fn check(&self, reduction: &Reduction<'_>) -> CheckResult {
        match self.checks.get(reduction.rule) {
            Some(check) => check.run(reduction).map_err(|reject| {
                debug!(
                    "{} rejects `{}` over [{}, {}]: {}",
                    check.name, reduction.rule, reduction.first, reduction.last, reject
                );
                reject
            }),
            None => Ok(()),
        }
    }

    /// A new registry with the overlay's edits applied.
    pub fn with_edits(&self, overlay: &Overlay<RuleId, ReduceCheck>) -> Self {
        Self {
            checks: merge(&self.checks, overlay),
        }
    }
}

impl<'a> Reduction<'a> {
    pub fn child(&self, index: usize) -> Result<&'a Element, Reject> {
        self.tree.child(index).ok_or(Reject::UnexpectedShape("missing child"))
    }

    pub fn token(&self, index: usize) -> Option<&'a Token> {
        self.tokens.get(index)
    }

    pub fn first_offset(&self) -> Result<u32, Reject> {
        self.token(self.first)
            .map(|token| token.offset.value(false))
            .ok_or(Reject::UnexpectedShape("span starts past the token stream"))
    }

    /// `last`, clamped to the final token.
    pub fn last_index(&self) -> usize {
        self.last.min(self.tokens.len().saturating_sub(1))
    }

    pub fn last_offset(&self) -> Result<u32, Reject> {
        self.token(self.last_index())
            .map(|token| token.offset.value(false))
            .ok_or(Reject::UnexpectedShape("empty token stream"))
    }

    pub fn next_token(&self) -> Option<&'a Token> {
        self.token(self.last + 1)
    }
}

/// The originating offset of a come-from marker.
pub(crate) fn origin(token: &Token) -> Result<u32, Reject> {
    token.target().ok_or(Reject::UnexpectedShape("come-from without an origin"))
}

/// The jump target of a jump instruction.
pub(crate) fn jump_target(token: &Token) -> Result<u32, Reject> {
    token.target().ok_or(Reject::UnexpectedShape("jump without a target"))
}

/// The element's last come-from marker: the element itself when it is a marker,
/// otherwise the last child of a come-from collection.
pub(crate) fn last_come_from(element: &Element) -> Option<&Token> {
    match element {
        Element::Token(token) if token.is_come_from() => Some(token),
        Element::Token(_) => None,
        Element::Node(node) => node.children.last().and_then(Element::as_token).filter(|t| t.is_come_from()),
    }
}

/// Originating offsets of every come-from marker directly inside `element`.
pub(crate) fn come_from_origins(element: &Element) -> Vec<u32> {
    match element {
        Element::Token(token) if token.is_come_from() => token.target().into_iter().collect(),
        Element::Token(_) => vec![],
        Element::Node(node) => node
            .children
            .iter()
            .filter_map(Element::as_token)
            .filter(|t| t.is_come_from())
            .filter_map(Token::target)
            .collect(),
    }
}

/// The first token of `element` as an offset, if it spans any token.
pub(crate) fn start_offset(element: &Element) -> Option<u32> {
    element.first_token().map(|token| token.offset.value(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{node, tok};

    fn always_reject(_: &Reduction<'_>) -> CheckResult {
        Err(Reject::UnexpectedShape("test"))
    }

    const REJECT_ALL: ReduceCheck = ReduceCheck::new("reject_all", always_reject);

    #[test]
    fn unregistered_identities_accept() {
        let a = RuleId::new("and", &["expr", "POP_JUMP_IF_FALSE", "expr"]);
        let b = RuleId::new("or", &["expr", "POP_JUMP_IF_TRUE", "expr"]);
        let checks = ReduceChecks::builder().register(a.clone(), REJECT_ALL).build();

        let tokens = vec![tok("LOAD_NAME", "0", None)];
        let tree = node("and", vec![]);
        let mut reduction = Reduction {
            rule: &a,
            tree: &tree,
            tokens: &tokens,
            first: 0,
            last: 0,
        };
        assert!(checks.check(&reduction).is_err());
        reduction.rule = &b;
        assert!(checks.check(&reduction).is_ok());
    }

    #[test]
    fn one_check_serves_many_identities_and_edits_are_pure() {
        let rules = [RuleId::new("a", &["x"]), RuleId::new("b", &["y"])];
        let checks = ReduceChecks::builder().register_all(&rules, REJECT_ALL).build();
        assert_eq!(checks.len(), 2);

        let edited = checks.with_edits(&Overlay::default().remove(rules[0].clone()));
        assert_eq!(edited.len(), 1);
        assert_eq!(checks.len(), 2);
        assert_eq!(edited.get(&rules[1]), Some(&REJECT_ALL));
    }
}
