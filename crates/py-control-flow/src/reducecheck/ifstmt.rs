// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! `if` without `else`.
//!
//! `ifstmt` is the plain form: the test jumps forward past the body and the
//! trailing come-froms mark where it lands. `ifstmtl` sits in a loop body: the test
//! jumps back to the loop head and the body is followed by the back edge.
//!
//! A body that returns never falls through, so the code after it is only reached
//! through the test's jump. Unless that code is the implicit `return None`, it
//! reads as the else-branch of an if/else.

use super::{come_from_origins, jump_target, start_offset, CheckResult, ReduceCheck, Reduction, Reject};
use crate::{token::Token, tree::Element};

pub const IFSTMT_CHECK: ReduceCheck = ReduceCheck::new("ifstmt", ifstmt);
pub const IFSTMTL_CHECK: ReduceCheck = ReduceCheck::new("ifstmtl", ifstmtl);

/// The conditional jump of a `testtrue`/`testfalse` test, if the test has that form.
pub(crate) fn test_jump<'a>(testexpr: &'a Element) -> Option<&'a Token> {
    let condition = testexpr.child(0)?;
    if !condition.is_any(&["testtrue", "testfalse"]) {
        return None;
    }
    condition.child(1)?.as_token().filter(|token| token.is_conditional_jump())
}

/// The only statement of a body, looking through list and optional wrappers.
fn sole_statement(body: &Element) -> Option<&Element> {
    let mut element = body;
    loop {
        if !element.is_any(&["stmts_opt", "c_stmts_opt", "stmts", "c_stmts", "stmt", "c_stmt"]) {
            return Some(element);
        }
        if element.len() != 1 {
            return None;
        }
        element = element.child(0)?;
    }
}

pub fn ifstmt(r: &Reduction<'_>) -> CheckResult {
    let Some(jump) = test_jump(r.child(0)?) else {
        return Ok(());
    };
    let target = jump_target(jump)?;
    let first_offset = r.first_offset()?;
    if target <= first_offset {
        return Err(Reject::UnexpectedBackwardJump { target });
    }

    let jump_offset = jump.offset.value(false);
    let come_froms = r.child(2)?;
    if !come_from_origins(come_froms).contains(&jump_offset) {
        return Err(Reject::MissingJumpOrigin { jump: jump_offset });
    }
    if let Some(landing) = start_offset(come_froms) {
        if target < landing {
            return Err(Reject::JumpIntoBody { target });
        }
    }

    let body = r.child(1)?;
    if let Some(inner) = sole_statement(body).filter(|inner| inner.is("ifstmt")) {
        if inner.child(0).and_then(test_jump).and_then(Token::target) == Some(target) {
            return Err(Reject::ChainedCondition { target });
        }
    }
    returning_body_has_no_else(r, body)
}

fn returning_body_has_no_else(r: &Reduction<'_>, body: &Element) -> CheckResult {
    if !body.last_token().map_or(false, |token| token.is("RETURN_VALUE")) {
        return Ok(());
    }
    let mut rest = r
        .tokens
        .get(r.last + 1..)
        .unwrap_or_default()
        .iter()
        .filter(|token| !token.is_come_from());
    let Some(next) = rest.clone().next() else {
        return Ok(());
    };
    match (rest.next(), rest.next(), rest.next()) {
        (Some(load), Some(ret), None)
            if load.is("LOAD_CONST") && load.text() == Some("None") && ret.is("RETURN_VALUE") =>
        {
            Ok(())
        }
        _ => Err(Reject::ReturnBeforeElse {
            next: next.offset.value(false),
        }),
    }
}

pub fn ifstmtl(r: &Reduction<'_>) -> CheckResult {
    let Some(jump) = test_jump(r.child(0)?) else {
        return Ok(());
    };
    let target = jump_target(jump)?;
    if target > r.first_offset()? {
        return Err(Reject::ExpectedBackwardJump { target });
    }
    match r.next_token() {
        Some(next) if next.is("JUMP_BACK") && next.target() == Some(target) => Ok(()),
        _ => Err(Reject::NoBackEdge { target }),
    }
}
