// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Block statements opened by a `SETUP_*` instruction: try/finally, try/except,
//! with and async with. The setup instruction's target is the handler, which the
//! scanner marks with the matching `COME_FROM_*` pseudo instruction.

use super::{jump_target, start_offset, CheckResult, ReduceCheck, Reduction, Reject};
use crate::tree::Element;

pub const BLOCK_CHECK: ReduceCheck = ReduceCheck::new("setup_block", setup_block);
pub const TRY_EXCEPT_CHECK: ReduceCheck = ReduceCheck::new("try_except", try_except);
pub const EXCEPT_CLAUSE_CHECK: ReduceCheck = ReduceCheck::new("except_clause", except_clause);

/// Compares the first `SETUP_*` child with the first `COME_FROM_*` child. Nodes
/// without a setup instruction pass.
pub fn setup_matches_handler(r: &Reduction<'_>) -> CheckResult {
    let tokens = || r.tree.children.iter().filter_map(Element::as_token);
    let Some(setup) = tokens().find(|token| token.kind.starts_with("SETUP_")) else {
        return Ok(());
    };
    let handler = tokens()
        .find(|token| token.kind.starts_with("COME_FROM_"))
        .ok_or(Reject::UnexpectedShape("block without a handler marker"))?;
    let setup = jump_target(setup)?;
    let handler = handler.offset.value(false);
    if setup != handler {
        return Err(Reject::HandlerMismatch { setup, handler });
    }
    Ok(())
}

pub fn setup_block(r: &Reduction<'_>) -> CheckResult {
    setup_matches_handler(r)
}

/// The protected body's exit jump must land on the come-froms that close the
/// statement.
pub fn try_except(r: &Reduction<'_>) -> CheckResult {
    setup_matches_handler(r)?;
    let exit = r
        .child(3)?
        .as_token()
        .filter(|token| token.is("JUMP_FORWARD"))
        .ok_or(Reject::UnexpectedShape("try body without an exit jump"))?;
    let target = jump_target(exit)?;
    let landing = r
        .tree
        .children
        .last()
        .and_then(start_offset)
        .ok_or(Reject::UnexpectedShape("try without closing come-froms"))?;
    if target != landing {
        return Err(Reject::LandingMismatch { landing, target });
    }
    Ok(())
}

/// A typed handler's match test jumps to the next handler, right after this one.
pub fn except_clause(r: &Reduction<'_>) -> CheckResult {
    let test = r
        .child(0)?
        .last_child()
        .and_then(Element::as_token)
        .filter(|token| token.is_conditional_jump())
        .ok_or(Reject::UnexpectedShape("exception match without a jump"))?;
    let target = jump_target(test)?;
    let landing = r
        .tree
        .children
        .last()
        .and_then(start_offset)
        .ok_or(Reject::UnexpectedShape("handler without come-froms"))?;
    if target != landing {
        return Err(Reject::LandingMismatch { landing, target });
    }
    Ok(())
}
