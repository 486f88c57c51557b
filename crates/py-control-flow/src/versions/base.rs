// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Tables shared by every supported version.

use super::registrations;
use crate::{
    error::DecompileResult,
    grammar::Grammar,
    reducecheck::{
        blocks::{BLOCK_CHECK, EXCEPT_CLAUSE_CHECK, TRY_EXCEPT_CHECK},
        boolop::BOOLOP_CHECK,
        comprehension::LIST_IF_CHECK,
        ifelse::{IFELSE_CHECK, IFELSE_RULES},
        ifstmt::{IFSTMTL_CHECK, IFSTMT_CHECK},
        loops::FOR_CHECK,
        ReduceCheck, ReduceChecks,
    },
    symbol::Symbol,
    templates::{Template, Templates},
};

/// Symbols that may derive nothing.
pub const NULLABLE: [&str; 5] = ["stmts_opt", "c_stmts_opt", "suite_stmts_opt", "_come_froms", "opt_come_from_except"];

/// Left-recursive lists reduced into one flat node.
pub const COLLECT: [&str; 5] = ["stmts", "c_stmts", "come_froms", "_come_froms", "except_stmts"];

const GRAMMAR: &str = r"
# statement lists
stmts ::= stmt
stmts ::= stmts stmt
stmts_opt ::= stmts
stmts_opt ::=
suite_stmts_opt ::= stmts
suite_stmts_opt ::=
c_stmts ::= c_stmt
c_stmts ::= c_stmts c_stmt
c_stmts_opt ::= c_stmts
c_stmts_opt ::=
c_stmt ::= stmt
c_stmt ::= ifelsestmtc
c_stmt ::= ifstmtl
returns ::= return
returns ::= stmts return

stmt ::= expr_stmt
stmt ::= assign
stmt ::= return
stmt ::= ifstmt
stmt ::= ifelsestmt
stmt ::= function_def
stmt ::= tryfinallystmt
stmt ::= try_except
stmt ::= withstmt
stmt ::= withasstmt

expr_stmt ::= expr POP_TOP
assign ::= expr store
store ::= STORE_NAME
store ::= STORE_FAST
store ::= STORE_GLOBAL
store ::= store_attr
store_attr ::= expr STORE_ATTR
return ::= expr RETURN_VALUE
function_def ::= mkfunc store
mkfunc ::= LOAD_CODE LOAD_STR MAKE_FUNCTION_0

# expressions
expr ::= LOAD_NAME
expr ::= LOAD_FAST
expr ::= LOAD_GLOBAL
expr ::= LOAD_CONST
expr ::= LOAD_STR
expr ::= attribute
expr ::= call
expr ::= call_method
expr ::= compare
expr ::= bin_op
expr ::= and
expr ::= or
expr ::= list_comp
expr ::= build_list
expr ::= build_tuple
attribute ::= expr LOAD_ATTR
compare ::= expr expr COMPARE_OP
bin_op ::= expr expr binary_operator
binary_operator ::= BINARY_ADD
binary_operator ::= BINARY_SUBTRACT
binary_operator ::= BINARY_MULTIPLY
binary_operator ::= BINARY_TRUE_DIVIDE
and ::= expr JUMP_IF_FALSE_OR_POP expr come_froms
and ::= expr POP_JUMP_IF_FALSE expr
or ::= expr JUMP_IF_TRUE_OR_POP expr come_froms
or ::= expr POP_JUMP_IF_TRUE expr

# tests
testexpr ::= testfalse
testexpr ::= testtrue
testfalse ::= expr POP_JUMP_IF_FALSE
testfalse ::= expr POP_JUMP_IF_FALSE come_froms
testtrue ::= expr POP_JUMP_IF_TRUE

# if without else
ifstmt ::= testexpr stmts_opt come_froms
ifstmtl ::= testexpr c_stmts_opt

# if / else
ifelsestmt ::= testexpr stmts_opt jump_forward_else else_suite _come_froms
ifelsestmt ::= testexpr stmts_opt jf_cfs else_suite opt_come_from_except
ifelsestmt ::= testexpr returns come_froms else_suite _come_froms
ifelsestmtc ::= testexpr c_stmts_opt jb_cf else_suitec
ifelsestmtc ::= testexpr c_stmts_opt jb_cfs else_suitec
ifelsestmtc ::= testexpr c_stmts_opt jump_forward_else else_suitec opt_come_from_except
jump_forward_else ::= JUMP_FORWARD come_froms
jf_cfs ::= JUMP_FORWARD come_froms
jb_cf ::= JUMP_BACK COME_FROM
jb_cfs ::= JUMP_BACK come_froms
else_suite ::= stmts
else_suitec ::= c_stmts
come_froms ::= COME_FROM
come_froms ::= come_froms COME_FROM
_come_froms ::=
_come_froms ::= _come_froms COME_FROM
opt_come_from_except ::= COME_FROM_EXCEPT_CLAUSE
opt_come_from_except ::=

# try / except
try_except ::= SETUP_FINALLY suite_stmts_opt POP_BLOCK JUMP_FORWARD COME_FROM_FINALLY except_stmts END_FINALLY come_froms
except_stmts ::= except_stmt
except_stmts ::= except_stmts except_stmt
except_stmt ::= except_typed
except_stmt ::= except_bare
except_typed ::= except_cond POP_TOP POP_TOP POP_TOP except_suite come_froms
except_cond ::= DUP_TOP expr COMPARE_OP POP_JUMP_IF_FALSE
except_bare ::= POP_TOP POP_TOP POP_TOP except_suite
except_suite ::= stmts_opt POP_EXCEPT JUMP_FORWARD

# comprehensions
list_comp ::= LOAD_LISTCOMP LOAD_STR MAKE_FUNCTION_0 expr GET_ITER CALL_FUNCTION_1
listcomp_code ::= BUILD_LIST_0 LOAD_FAST FOR_ITER store comp_iter JUMP_BACK RETURN_VALUE
comp_iter ::= comp_body
comp_iter ::= list_if
comp_iter ::= list_if_not
comp_body ::= expr LIST_APPEND
list_if ::= expr POP_JUMP_IF_FALSE comp_iter
list_if_not ::= expr POP_JUMP_IF_TRUE comp_iter
";

pub fn grammar() -> DecompileResult<Grammar> {
    Grammar::from_text(GRAMMAR, &COLLECT)
}

/// Checks keyed by left-hand side: every rule of the grammar with that left-hand
/// side is registered, in each of its empty-child spellings. The if/else check
/// is registered on its own variant list instead.
const CHECKS_BY_LHS: [(&str, ReduceCheck); 12] = [
    ("ifstmt", IFSTMT_CHECK),
    ("ifstmtl", IFSTMTL_CHECK),
    ("and", BOOLOP_CHECK),
    ("or", BOOLOP_CHECK),
    ("tryfinallystmt", BLOCK_CHECK),
    ("withstmt", BLOCK_CHECK),
    ("withasstmt", BLOCK_CHECK),
    ("try_except", TRY_EXCEPT_CHECK),
    ("except_typed", EXCEPT_CLAUSE_CHECK),
    ("list_if", LIST_IF_CHECK),
    ("list_if_not", LIST_IF_CHECK),
    ("listcomp_code", FOR_CHECK),
];

pub fn checks(grammar: &Grammar) -> ReduceChecks {
    registrations(grammar.rules(), &CHECKS_BY_LHS)
        .fold(
            ReduceChecks::builder().register_all(IFELSE_RULES.iter(), IFELSE_CHECK),
            |builder, (form, check)| builder.register(form, check),
        )
        .build()
}

pub fn templates() -> Templates {
    let suite = "%|if %c:\n%+%c%-%|else:\n%+%c%-";
    Templates::new(
        [
            ("expr_stmt", Template::new("%|%c\n").child(0)),
            ("assign", Template::new("%|%c = %c\n").child(1).child(0)),
            ("return", Template::new("%|return %c\n").child(0)),
            ("store_attr", Template::new("%c.%c").child(0).child(1)),
            ("attribute", Template::new("%c.%c").child(0).child(1)),
            ("call", Template::new("%c(%C)").child(0).range(1, -1, ", ")),
            ("call_method", Template::new("%c.%c(%C)").child(0).child(1).range(2, -1, ", ")),
            ("build_list", Template::new("[%C]").range(0, -1, ", ")),
            ("build_tuple", Template::new("(%C)").range(0, -1, ", ")),
            ("compare", Template::new("%c %c %c").child(0).child(2).child(1)),
            ("bin_op", Template::new("%c %c %c").child(0).child(2).child(1)),
            ("and", Template::new("%c and %c").child(0).child(2)),
            ("or", Template::new("%c or %c").child(0).child(2)),
            ("testtrue", Template::new("not %c").child(0)),
            ("ifstmt", Template::new("%|if %c:\n%+%c%-").child(0).child(1)),
            ("ifstmtl", Template::new("%|if %c:\n%+%c%-").child(0).child(1)),
            ("ifelsestmt", Template::new(suite).child(0).child(1).child(3)),
            ("ifelsestmtc", Template::new(suite).child(0).child(1).child(3)),
            ("tryfinallystmt", Template::new("%|try:\n%+%c%-%|finally:\n%+%c%-").child(1).child(5)),
            ("try_except", Template::new("%|try:\n%+%c%-%c").child(1).child(5)),
            ("except_typed", Template::new("%|except %c:\n%+%c%-").child(0).child(4)),
            ("except_cond", Template::new("%c").child(1)),
            ("except_bare", Template::new("%|except:\n%+%c%-").child(3)),
            ("withstmt", Template::new("%|with %c:\n%+%c%-").child(0).child(3)),
            ("withasstmt", Template::new("%|with %c as %c:\n%+%c%-").child(0).child(2).child(3)),
        ]
        .into_iter()
        .map(|(kind, template)| (Symbol::new(kind), template)),
    )
}
