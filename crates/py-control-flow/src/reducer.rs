// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Bottom-up chart reducer.
//!
//! Cells are keyed by symbol and half-open token range. Ranges are filled in
//! order of increasing length; within one range the nonterminals are revisited
//! until none gains a cell, which settles unit chains such as
//! `stmts ::= stmt` and `stmt ::= ifstmt`.
//!
//! A cell holds the first derivation the check registry accepts:
//!
//! - rules of one left-hand side are tried longest right-hand side first, so
//!   `stmts ::= stmts stmt` wins over `stmts ::= stmt`;
//! - for each rule, child boundaries are tried left to right, shortest first.
//!
//! Rejected candidates are simply not recorded, so an ambiguous token range
//! ends up holding whichever reading the checks allow. Committed nodes are
//! shared with the candidates built over them rather than copied.

use crate::{
    grammar::{Grammar, RuleId},
    reducecheck::{ReduceChecks, Reduction},
    symbol::Symbol,
    token::Token,
    tree::{Element, Node, Span},
};
use log::trace;
use std::{
    cmp::Reverse,
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

/// Rule tables indexed for reduction.
#[derive(Debug)]
pub struct CompiledGrammar<'g> {
    grammar: &'g Grammar,
    by_lhs: BTreeMap<Symbol, Vec<RuleId>>,
    nullable: BTreeSet<Symbol>,
    min_len: HashMap<Symbol, usize>,
}

impl<'g> CompiledGrammar<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        let mut by_lhs: BTreeMap<Symbol, Vec<RuleId>> = BTreeMap::new();
        for rule in grammar.rules() {
            by_lhs.entry(rule.lhs).or_default().push(rule.clone());
        }
        for rules in by_lhs.values_mut() {
            rules.sort_by(|a, b| (Reverse(a.rhs.len()), a).cmp(&(Reverse(b.rhs.len()), b)));
        }

        let mut nullable = BTreeSet::new();
        loop {
            let found: Vec<Symbol> = grammar
                .rules()
                .filter(|rule| !nullable.contains(&rule.lhs))
                .filter(|rule| rule.rhs.iter().all(|sym| nullable.contains(sym)))
                .map(|rule| rule.lhs)
                .collect();
            if found.is_empty() {
                break;
            }
            nullable.extend(found);
        }

        let mut min_len: HashMap<Symbol, usize> = by_lhs.keys().map(|lhs| (*lhs, usize::MAX)).collect();
        loop {
            let mut changed = false;
            for rule in grammar.rules() {
                let len = rule
                    .rhs
                    .iter()
                    .map(|sym| min_len.get(sym).copied().unwrap_or(1))
                    .fold(0usize, usize::saturating_add);
                let entry = min_len.entry(rule.lhs).or_insert(usize::MAX);
                if len < *entry {
                    *entry = len;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        Self {
            grammar,
            by_lhs,
            nullable,
            min_len,
        }
    }

    pub fn is_nonterminal(&self, symbol: Symbol) -> bool {
        self.by_lhs.contains_key(&symbol)
    }

    pub fn is_nullable(&self, symbol: Symbol) -> bool {
        self.nullable.contains(&symbol)
    }

    pub fn nullable(&self) -> &BTreeSet<Symbol> {
        &self.nullable
    }

    /// Fewest tokens `symbol` can cover; one for terminals.
    pub fn min_len(&self, symbol: Symbol) -> usize {
        self.min_len.get(&symbol).copied().unwrap_or(1)
    }

    fn empty_node(symbol: Symbol) -> Node {
        Node {
            kind: symbol,
            children: vec![],
            span: None,
            rule: Some(RuleId {
                lhs: symbol,
                rhs: vec![],
            }),
        }
    }
}

/// Nonterminal cells over half-open token ranges.
#[derive(Debug, Default)]
pub struct Chart {
    cells: HashMap<(Symbol, usize, usize), Arc<Node>>,
    len: usize,
}

impl Chart {
    /// The committed node for `symbol` over the inclusive span `[first, last]`.
    pub fn get(&self, symbol: &str, first: usize, last: usize) -> Option<&Node> {
        self.cells.get(&(Symbol::new(symbol), first, last + 1)).map(Arc::as_ref)
    }

    /// The node covering the whole token stream.
    pub fn tree(&self, start: Symbol) -> Option<&Node> {
        self.cells.get(&(start, 0, self.len)).map(Arc::as_ref)
    }

    pub fn into_tree(mut self, start: Symbol) -> Option<Node> {
        let root = self.cells.remove(&(start, 0, self.len))?;
        drop(self);
        Some(Arc::try_unwrap(root).unwrap_or_else(|shared| Node::clone(&shared)))
    }

    /// End of the longest prefix `start` derives.
    pub fn furthest(&self, start: Symbol) -> usize {
        self.cells
            .keys()
            .filter(|(symbol, first, _)| *symbol == start && *first == 0)
            .map(|(_, _, end)| *end)
            .max()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

pub struct Reducer<'a> {
    grammar: &'a CompiledGrammar<'a>,
    checks: &'a ReduceChecks,
    tokens: &'a [Token],
}

impl<'a> Reducer<'a> {
    pub fn new(grammar: &'a CompiledGrammar<'a>, checks: &'a ReduceChecks, tokens: &'a [Token]) -> Self {
        Self {
            grammar,
            checks,
            tokens,
        }
    }

    pub fn run(&self) -> Chart {
        let n = self.tokens.len();
        let mut chart = Chart {
            cells: HashMap::new(),
            len: n,
        };
        for len in 1..=n {
            for start in 0..=n - len {
                let end = start + len;
                loop {
                    let mut grew = false;
                    for (lhs, rules) in &self.grammar.by_lhs {
                        if self.grammar.min_len(*lhs) > len || chart.cells.contains_key(&(*lhs, start, end)) {
                            continue;
                        }
                        if let Some(node) = rules.iter().find_map(|rule| self.reduce(&chart, rule, start, end)) {
                            trace!("{} over [{}, {}]", lhs, start, end - 1);
                            chart.cells.insert((*lhs, start, end), Arc::new(node));
                            grew = true;
                        }
                    }
                    if !grew {
                        break;
                    }
                }
            }
        }
        chart
    }

    fn derives(&self, chart: &Chart, symbol: Symbol, start: usize, end: usize) -> bool {
        if start == end {
            self.grammar.is_nullable(symbol)
        } else if self.grammar.is_nonterminal(symbol) {
            chart.cells.contains_key(&(symbol, start, end))
        } else {
            end == start + 1 && self.tokens[start].kind == symbol
        }
    }

    fn element(&self, chart: &Chart, symbol: Symbol, start: usize, end: usize) -> Option<Element> {
        if start == end {
            Some(CompiledGrammar::empty_node(symbol).into())
        } else if self.grammar.is_nonterminal(symbol) {
            chart.cells.get(&(symbol, start, end)).cloned().map(Element::Node)
        } else {
            self.tokens.get(start).cloned().map(Element::Token)
        }
    }

    /// The first accepted derivation of `rule` over `[start, end)`.
    fn reduce(&self, chart: &Chart, rule: &RuleId, start: usize, end: usize) -> Option<Node> {
        let mut accepted = None;
        let mut accept = |bounds: &[(usize, usize)]| match self.candidate(chart, rule, bounds, start, end) {
            Some(node) => {
                accepted = Some(node);
                true
            }
            None => false,
        };
        self.splits(chart, &rule.rhs, start, end, &mut vec![], &mut accept);
        accepted
    }

    fn splits(
        &self,
        chart: &Chart,
        rhs: &[Symbol],
        start: usize,
        end: usize,
        bounds: &mut Vec<(usize, usize)>,
        accept: &mut dyn FnMut(&[(usize, usize)]) -> bool,
    ) -> bool {
        let Some((&symbol, rest)) = rhs.split_first() else {
            return start == end && accept(bounds);
        };
        let rest_min = rest
            .iter()
            .map(|sym| self.grammar.min_len(*sym))
            .fold(0usize, usize::saturating_add);
        let Some(last_mid) = end.checked_sub(rest_min) else {
            return false;
        };
        let first_mid = start.saturating_add(self.grammar.min_len(symbol));
        for mid in first_mid..=last_mid {
            if !self.derives(chart, symbol, start, mid) {
                continue;
            }
            bounds.push((start, mid));
            let done = self.splits(chart, rest, mid, end, bounds, accept);
            bounds.pop();
            if done {
                return true;
            }
        }
        false
    }

    fn candidate(&self, chart: &Chart, rule: &RuleId, bounds: &[(usize, usize)], start: usize, end: usize) -> Option<Node> {
        let mut children = Vec::with_capacity(bounds.len());
        for (&(a, b), &symbol) in bounds.iter().zip(&rule.rhs) {
            children.push(self.element(chart, symbol, a, b)?);
        }
        if self.grammar.grammar.is_collect(rule.lhs) && rule.is_left_recursive() {
            if let Some(Element::Node(list)) = children.first() {
                if list.kind == rule.lhs {
                    let list = list.children.clone();
                    children.splice(0..1, list);
                }
            }
        }

        let empty: Vec<bool> = bounds.iter().map(|(a, b)| a == b).collect();
        let identity = rule.mark_empty(&empty);
        let node = Node {
            kind: rule.lhs,
            children,
            span: Some(Span {
                first: start,
                last: end - 1,
            }),
            rule: Some(identity),
        };
        let reduction = Reduction {
            rule: node.rule.as_ref()?,
            tree: &node,
            tokens: self.tokens,
            first: start,
            last: end - 1,
        };
        self.checks.check(&reduction).ok()?;
        Some(node)
    }
}
