// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Short-circuit `and` / `or`.
//!
//! The first operand's jump has to land where short-circuit code puts it:
//! - where the following conditional jump goes (a chained condition);
//! - on the instruction right after that conditional jump (`or` feeding a
//!   false-test);
//! - right after the second operand (the value form).

use super::{jump_target, CheckResult, ReduceCheck, Reduction, Reject};
use crate::tree::Element;

pub const BOOLOP_CHECK: ReduceCheck = ReduceCheck::new("and_or", and_or);

pub fn and_or(r: &Reduction<'_>) -> CheckResult {
    let jump = r
        .child(1)?
        .as_token()
        .ok_or(Reject::UnexpectedShape("operator is not a jump"))?;
    let target = jump_target(jump)?;
    let Some(next) = r.next_token() else {
        return Err(Reject::BoolOpTarget { target });
    };

    if next.is_conditional_jump() && next.target() == Some(target) {
        return Ok(());
    }
    if next.is_conditional_jump()
        && r.token(r.last + 2).map(|after| after.offset.value(false)) == Some(target)
    {
        return Ok(());
    }
    if next.offset.value(false) == target || lands_on_own_come_from(r, target) {
        return Ok(());
    }
    Err(Reject::BoolOpTarget { target })
}

/// Value forms may absorb the come-from the jump lands on.
fn lands_on_own_come_from(r: &Reduction<'_>, target: u32) -> bool {
    r.tree
        .children
        .last()
        .and_then(Element::last_token)
        .map_or(false, |token| token.is_come_from() && token.offset.value(false) == target)
}
