// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Builders for hand-written tokens and trees in unit tests.

use crate::{
    symbol::Symbol,
    token::{Attr, Token},
    tree::{Element, Node},
};

/// A token at `offset` (listing notation: `8`, `8_0`, `6:8`) with an optional
/// integer attribute.
pub fn tok(kind: &str, offset: &str, attr: Option<i64>) -> Token {
    let mut token = Token::new(kind, offset.parse().unwrap());
    if let Some(value) = attr {
        token.attr = Some(Attr::Int(value));
        token.pattr = Some(value.to_string());
    }
    token
}

pub fn t(kind: &str, offset: &str, attr: Option<i64>) -> Element {
    Element::Token(tok(kind, offset, attr))
}

pub fn node(kind: &str, children: Vec<Element>) -> Node {
    Node::new(Symbol::new(kind), children)
}

pub fn n(kind: &str, children: Vec<Element>) -> Element {
    node(kind, children).into()
}
