// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Parse tree built by the reducer.
//!
//! Subtrees are shared: a chart cell and every larger node built over it point
//! at the same `Node`.

use crate::{grammar::RuleId, symbol::Symbol, token::Token};
use std::{fmt, sync::Arc};

/// Inclusive token span `[first, last]` covered by a committed node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub first: usize,
    pub last: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Element {
    Token(Token),
    Node(Arc<Node>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub kind: Symbol,
    pub children: Vec<Element>,
    /// `None` for a nullable symbol that derived nothing.
    pub span: Option<Span>,
    /// The rule identity this node was committed under.
    pub rule: Option<RuleId>,
}

impl Element {
    pub fn kind(&self) -> Symbol {
        match self {
            Element::Token(token) => token.kind,
            Element::Node(node) => node.kind,
        }
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind() == kind
    }

    pub fn is_any(&self, kinds: &[&str]) -> bool {
        self.kind().is_any(kinds)
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Element::Token(token) => Some(token),
            Element::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Element::Node(node) => Some(node.as_ref()),
            Element::Token(_) => None,
        }
    }

    /// The element itself if it is a token, otherwise its leftmost token.
    pub fn first_token(&self) -> Option<&Token> {
        match self {
            Element::Token(token) => Some(token),
            Element::Node(node) => node.first_token(),
        }
    }

    /// The element itself if it is a token, otherwise its rightmost token.
    pub fn last_token(&self) -> Option<&Token> {
        match self {
            Element::Token(token) => Some(token),
            Element::Node(node) => node.last_token(),
        }
    }

    /// Child count; zero for tokens.
    pub fn len(&self) -> usize {
        self.as_node().map_or(0, Node::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn child(&self, index: usize) -> Option<&Element> {
        self.as_node().and_then(|node| node.child(index))
    }

    pub fn last_child(&self) -> Option<&Element> {
        self.as_node().and_then(|node| node.children.last())
    }
}

impl Node {
    pub fn new(kind: Symbol, children: Vec<Element>) -> Self {
        Self {
            kind,
            children,
            span: None,
            rule: None,
        }
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn is_any(&self, kinds: &[&str]) -> bool {
        self.kind.is_any(kinds)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, index: usize) -> Option<&Element> {
        self.children.get(index)
    }

    /// `nth_back(0)` is the last child.
    pub fn nth_back(&self, index: usize) -> Option<&Element> {
        self.children.iter().rev().nth(index)
    }

    pub fn first_token(&self) -> Option<&Token> {
        self.children.iter().find_map(Element::first_token)
    }

    pub fn last_token(&self) -> Option<&Token> {
        self.children.iter().rev().find_map(Element::last_token)
    }

    /// Preorder walk over committed nodes.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            if let Element::Node(node) = child {
                node.walk(visit);
            }
        }
    }

    fn dump(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "    ".repeat(depth);
        write!(f, "{}{}", indent, self.kind)?;
        if self.is_empty() && self.span.is_none() {
            write!(f, " (empty)")?;
        }
        writeln!(f)?;
        for (i, child) in self.children.iter().enumerate() {
            match child {
                Element::Node(node) => node.dump(f, depth + 1)?,
                Element::Token(token) => {
                    writeln!(f, "{}    {}. {}", indent, i, token.to_string().trim_end())?
                }
            }
        }
        Ok(())
    }
}

impl From<Token> for Element {
    fn from(token: Token) -> Self {
        Element::Token(token)
    }
}

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        Element::Node(Arc::new(node))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f, 0)
    }
}
