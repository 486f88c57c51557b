// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Loops: the back edge must return to the loop head and the loop exit must lie
//! past the back edge.

use super::{blocks::setup_matches_handler, jump_target, start_offset, CheckResult, ReduceCheck, Reduction, Reject};
use crate::{
    token::Token,
    tree::{Element, Node},
};

pub const FOR_CHECK: ReduceCheck = ReduceCheck::new("for", for_loop);
pub const WHILE_CHECK: ReduceCheck = ReduceCheck::new("while", while_loop);
pub const WHILE_TRUE_CHECK: ReduceCheck = ReduceCheck::new("while_true", while_true);

fn token_child<'a>(node: &'a Node, kind: &'static str) -> Result<&'a Token, Reject> {
    node.children
        .iter()
        .filter_map(Element::as_token)
        .find(|token| token.is(kind))
        .ok_or(Reject::UnexpectedShape("loop without its head instruction"))
}

/// The loop's back edge: the last `JUMP_BACK` among the children, looking one
/// level into `for_block`.
fn back_edge(node: &Node) -> Result<&Token, Reject> {
    node.children
        .iter()
        .rev()
        .find_map(|child| match child {
            Element::Token(token) if token.is("JUMP_BACK") => Some(token),
            Element::Node(block) if block.is("for_block") => block.last_token().filter(|t| t.is("JUMP_BACK")),
            _ => None,
        })
        .ok_or(Reject::UnexpectedShape("loop without a back edge"))
}

fn back_edge_returns_to(back: &Token, head: u32) -> CheckResult {
    let target = jump_target(back)?;
    if target != head {
        return Err(Reject::BackEdge { target, expected: head });
    }
    Ok(())
}

fn exits_past(exit: &Token, back: &Token) -> CheckResult {
    let target = jump_target(exit)?;
    let back_edge = back.offset.value(false);
    if target <= back_edge {
        return Err(Reject::LoopExitInside { target, back_edge });
    }
    Ok(())
}

/// `for38`, `for` and `forelsestmt`.
pub fn for_loop(r: &Reduction<'_>) -> CheckResult {
    let for_iter = token_child(r.tree, "FOR_ITER")?;
    let back = back_edge(r.tree)?;
    back_edge_returns_to(back, for_iter.offset.value(false))?;
    exits_past(for_iter, back)?;
    setup_matches_handler(r)
}

/// `whilestmt38` and `whilestmt`.
pub fn while_loop(r: &Reduction<'_>) -> CheckResult {
    let test_index = usize::from(r.tree.child(0).map_or(false, |c| c.is("SETUP_LOOP")));
    let test = r.child(test_index)?;
    let head = start_offset(test).ok_or(Reject::UnexpectedShape("empty loop test"))?;
    let back = back_edge(r.tree)?;
    back_edge_returns_to(back, head)?;
    if let Some(exit) = super::ifstmt::test_jump(test) {
        exits_past(exit, back)?;
    }
    setup_matches_handler(r)
}

/// `whileTruestmt38`: an unconditional loop, the back edge returns to the body start.
pub fn while_true(r: &Reduction<'_>) -> CheckResult {
    let back = back_edge(r.tree)?;
    back_edge_returns_to(back, r.first_offset()?)
}
