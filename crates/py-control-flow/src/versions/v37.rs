// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! 3.7: loops are wrapped in `SETUP_LOOP` / `POP_BLOCK`, and `finally` blocks are
//! entered through a pushed `None`.

use super::{registrations, Overlay, VersionOverlay};
use crate::{
    error::DecompileResult,
    grammar::parse_rules,
    reducecheck::{
        loops::{FOR_CHECK, WHILE_CHECK},
        ReduceCheck,
    },
    symbol::Symbol,
    templates::Template,
};

pub(super) const LOOP_RULES: &str = r"
stmt ::= for
stmt ::= forelsestmt
stmt ::= whilestmt
for ::= SETUP_LOOP expr GET_ITER FOR_ITER store for_block POP_BLOCK COME_FROM_LOOP
forelsestmt ::= SETUP_LOOP expr GET_ITER FOR_ITER store for_block POP_BLOCK else_suite COME_FROM_LOOP
for_block ::= c_stmts_opt JUMP_BACK
whilestmt ::= SETUP_LOOP testexpr c_stmts_opt JUMP_BACK come_froms POP_BLOCK COME_FROM_LOOP
";

pub(super) const BLOCK_RULES: &str = r"
tryfinallystmt ::= SETUP_FINALLY suite_stmts_opt POP_BLOCK LOAD_CONST COME_FROM_FINALLY suite_stmts_opt END_FINALLY
withstmt ::= expr SETUP_WITH POP_TOP suite_stmts_opt POP_BLOCK LOAD_CONST COME_FROM_WITH WITH_CLEANUP_START WITH_CLEANUP_FINISH END_FINALLY
withasstmt ::= expr SETUP_WITH store suite_stmts_opt POP_BLOCK LOAD_CONST COME_FROM_WITH WITH_CLEANUP_START WITH_CLEANUP_FINISH END_FINALLY
";

/// Loop rules and the check guarding each, in every empty-child spelling.
pub(super) const LOOP_CHECKS: [(&str, ReduceCheck); 3] =
    [("for", FOR_CHECK), ("forelsestmt", FOR_CHECK), ("whilestmt", WHILE_CHECK)];

pub(super) const LOOP_TEMPLATES: [&str; 3] = ["for", "forelsestmt", "whilestmt"];

pub fn overlay() -> DecompileResult<VersionOverlay> {
    let loops = parse_rules(LOOP_RULES)?;
    let checks: Vec<_> = registrations(&loops, &LOOP_CHECKS).collect();

    let rules = loops.iter().cloned().chain(parse_rules(BLOCK_RULES)?);
    Ok(VersionOverlay {
        grammar: Overlay::default().set_all(rules.map(|rule| (rule, ()))),
        templates: Overlay::default()
            .set(
                Symbol::new("for"),
                Template::new("%|for %c in %c:\n%+%c%-").child(4).child(1).child(5),
            )
            .set(
                Symbol::new("forelsestmt"),
                Template::new("%|for %c in %c:\n%+%c%-%|else:\n%+%c%-")
                    .child(4)
                    .child(1)
                    .child(5)
                    .child(7),
            )
            .set(Symbol::new("whilestmt"), Template::new("%|while %c:\n%+%c%-").child(1).child(2)),
        checks: Overlay::default().set_all(checks),
    })
}
