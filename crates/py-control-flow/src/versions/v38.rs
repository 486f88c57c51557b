// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! 3.8: `SETUP_LOOP` is gone, so loops are recognized by their back edge alone;
//! `finally` blocks are entered through `BEGIN_FINALLY`. Adds `async with` and
//! assignment expressions.

use super::{registrations, v37, Overlay, VersionOverlay};
use crate::{
    error::DecompileResult,
    grammar::{parse_rules, RuleId},
    reducecheck::{
        blocks::BLOCK_CHECK,
        loops::{FOR_CHECK, WHILE_CHECK, WHILE_TRUE_CHECK},
        ReduceCheck,
    },
    symbol::Symbol,
    templates::Template,
};

const RULES: &str = r"
stmt ::= for38
stmt ::= whilestmt38
stmt ::= whileTruestmt38
stmt ::= async_with_stmt
for38 ::= expr GET_ITER FOR_ITER store for_block
for_block ::= c_stmts_opt JUMP_BACK
whilestmt38 ::= testexpr c_stmts_opt JUMP_BACK come_froms
whileTruestmt38 ::= c_stmts JUMP_BACK

tryfinallystmt ::= SETUP_FINALLY suite_stmts_opt POP_BLOCK BEGIN_FINALLY COME_FROM_FINALLY suite_stmts_opt END_FINALLY
withstmt ::= expr SETUP_WITH POP_TOP suite_stmts_opt POP_BLOCK BEGIN_FINALLY COME_FROM_WITH WITH_CLEANUP_START WITH_CLEANUP_FINISH END_FINALLY
withasstmt ::= expr SETUP_WITH store suite_stmts_opt POP_BLOCK BEGIN_FINALLY COME_FROM_WITH WITH_CLEANUP_START WITH_CLEANUP_FINISH END_FINALLY
async_with_stmt ::= expr BEFORE_ASYNC_WITH GET_AWAITABLE LOAD_CONST YIELD_FROM SETUP_ASYNC_WITH POP_TOP suite_stmts_opt POP_BLOCK BEGIN_FINALLY COME_FROM_ASYNC_WITH WITH_CLEANUP_START GET_AWAITABLE LOAD_CONST YIELD_FROM WITH_CLEANUP_FINISH END_FINALLY

expr ::= namedexpr
namedexpr ::= expr DUP_TOP store
";

const CHECKS: [(&str, ReduceCheck); 4] = [
    ("for38", FOR_CHECK),
    ("whilestmt38", WHILE_CHECK),
    ("whileTruestmt38", WHILE_TRUE_CHECK),
    ("async_with_stmt", BLOCK_CHECK),
];

pub fn overlay() -> DecompileResult<VersionOverlay> {
    let old_loops = parse_rules(v37::LOOP_RULES)?;
    let old_blocks = parse_rules(v37::BLOCK_RULES)?;
    let rules = parse_rules(RULES)?;

    let stale_checks: Vec<RuleId> = registrations(&old_loops, &v37::LOOP_CHECKS)
        .map(|(form, _)| form)
        .collect();
    let grammar = Overlay::default()
        .remove_all(old_loops.into_iter().chain(old_blocks))
        .set_all(rules.iter().cloned().map(|rule| (rule, ())));

    let templates = Overlay::default()
        .remove_all(v37::LOOP_TEMPLATES.iter().map(|kind| Symbol::new(kind)))
        .set(
            Symbol::new("for38"),
            Template::new("%|for %c in %c:\n%+%c%-").child(3).child(0).child(4),
        )
        .set(Symbol::new("whilestmt38"), Template::new("%|while %c:\n%+%c%-").child(0).child(1))
        .set(Symbol::new("whileTruestmt38"), Template::new("%|while True:\n%+%c%-").child(0))
        .set(Symbol::new("async_with_stmt"), Template::new("%|async with %c:\n%+%c%-").child(0).child(7))
        .set(Symbol::new("namedexpr"), Template::new("(%c := %c)").child(2).child(0));

    Ok(VersionOverlay {
        grammar,
        templates,
        checks: Overlay::default()
            .remove_all(stale_checks)
            .set_all(registrations(&rules, &CHECKS).collect::<Vec<_>>()),
    })
}
