// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use super::{Grammar, RuleId};
use crate::{symbol::Symbol, token::Token};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static VARIADIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(CALL_FUNCTION|CALL_METHOD|BUILD_LIST|BUILD_TUPLE)_(\d+)$").unwrap());

/// Returns a private copy of `grammar` extended with the rules for every
/// variable-arity opcode in `tokens`.
pub fn customize(grammar: &Grammar, tokens: &[Token]) -> Grammar {
    let kinds: BTreeSet<Symbol> = tokens.iter().map(|token| token.kind).collect();
    let extra: Vec<RuleId> = kinds.into_iter().filter_map(arity_rule).collect();
    if !extra.is_empty() {
        debug!("customized grammar with {} arity rules", extra.len());
    }
    grammar.extend(extra)
}

fn arity_rule(kind: Symbol) -> Option<RuleId> {
    let captures = VARIADIC.captures(kind.as_str())?;
    let count: usize = captures[2].parse().ok()?;
    let args = std::iter::repeat("expr").take(count);
    let rhs: Vec<&str> = match &captures[1] {
        "CALL_FUNCTION" => std::iter::once("expr").chain(args).chain([kind.as_str()]).collect(),
        "CALL_METHOD" => ["expr", "LOAD_METHOD"].into_iter().chain(args).chain([kind.as_str()]).collect(),
        "BUILD_LIST" | "BUILD_TUPLE" => args.chain([kind.as_str()]).collect(),
        _ => return None,
    };
    let lhs = match &captures[1] {
        "CALL_FUNCTION" => "call",
        "CALL_METHOD" => "call_method",
        "BUILD_LIST" => "build_list",
        _ => "build_tuple",
    };
    Some(RuleId::new(lhs, &rhs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Offset;

    #[test]
    fn arity_rules_follow_the_token_stream() {
        let base = Grammar::from_text("expr ::= call", &[]).unwrap();
        let tokens = vec![
            Token::new("CALL_FUNCTION_2", Offset::At(6)),
            Token::new("CALL_METHOD_0", Offset::At(8)),
            Token::new("BUILD_LIST_0", Offset::At(10)),
            Token::new("POP_TOP", Offset::At(12)),
        ];
        let grammar = customize(&base, &tokens);

        assert!(grammar.contains(&RuleId::new("call", &["expr", "expr", "expr", "CALL_FUNCTION_2"])));
        assert!(grammar.contains(&RuleId::new("call_method", &["expr", "LOAD_METHOD", "CALL_METHOD_0"])));
        assert!(grammar.contains(&RuleId::new("build_list", &["BUILD_LIST_0"])));
        assert_eq!(grammar.len(), 4);
        assert_eq!(base.len(), 1);
    }
}
