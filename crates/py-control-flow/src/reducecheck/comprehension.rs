// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use super::{jump_target, CheckResult, ReduceCheck, Reduction, Reject};

pub const LIST_IF_CHECK: ReduceCheck = ReduceCheck::new("list_if", list_if);

/// `list_if` / `list_if_not`: a comprehension filter that fails goes back to the
/// iterator for the next element, never forward.
pub fn list_if(r: &Reduction<'_>) -> CheckResult {
    let jump = r
        .child(1)?
        .as_token()
        .filter(|token| token.is_conditional_jump())
        .ok_or(Reject::UnexpectedShape("filter without a conditional jump"))?;
    let target = jump_target(jump)?;
    let start = r.first_offset()?;
    if target > start {
        return Err(Reject::FilterJump { target, start });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grammar::RuleId,
        testing::{n, node, t, tok},
    };

    #[test]
    fn filter_jumps_back_to_the_iterator() {
        let tokens = vec![tok("LOAD_FAST", "8", None), tok("POP_JUMP_IF_FALSE", "10", Some(4))];
        let rule = RuleId::new("list_if", &["expr", "POP_JUMP_IF_FALSE", "comp_iter"]);
        let filter = |target: i64| {
            node(
                "list_if",
                vec![n("expr", vec![t("LOAD_FAST", "8", None)]), t("POP_JUMP_IF_FALSE", "10", Some(target)), n("comp_iter", vec![])],
            )
        };
        let check = |tree: &crate::tree::Node| {
            list_if(&Reduction {
                rule: &rule,
                tree,
                tokens: &tokens,
                first: 0,
                last: 1,
            })
        };
        assert_eq!(check(&filter(4)), Ok(()));
        assert_eq!(check(&filter(20)), Err(Reject::FilterJump { target: 20, start: 8 }));
    }
}
