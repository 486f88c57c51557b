// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Instruction tokens and their byte offsets.

use crate::symbol::Symbol;
use itertools::Itertools;
use std::{cmp::Ordering, fmt, str::FromStr};

/// Opcodes whose argument is an element count. The scanner folds the count into the
/// kind (`CALL_FUNCTION_2`) so the grammar can be customized per arity.
const VARIADIC_OPS: &[&str] = &[
    "BUILD_LIST",
    "BUILD_MAP",
    "BUILD_SET",
    "BUILD_TUPLE",
    "CALL_FUNCTION",
    "CALL_FUNCTION_KW",
    "CALL_METHOD",
    "MAKE_FUNCTION",
    "RAISE_VARARGS",
    "UNPACK_SEQUENCE",
];

/// The byte offset of a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Offset {
    /// A real instruction.
    At(u32),
    /// An instruction preceded by an extended-argument prefix: `(prefix, instruction)`.
    Extended(u32, u32),
    /// The `n`th pseudo instruction inserted in front of the instruction at this offset.
    Pseudo(u32, u16),
}

impl Offset {
    /// The canonical integer offset. Coalesced positions resolve to the earliest
    /// member unless `prefer_last` is set.
    pub fn value(self, prefer_last: bool) -> u32 {
        match self {
            Offset::At(at) => at,
            Offset::Extended(prefix, at) => {
                if prefer_last {
                    at
                } else {
                    prefix
                }
            }
            Offset::Pseudo(at, _) => at,
        }
    }

    pub fn earliest(self) -> u32 {
        self.value(false)
    }

    pub fn latest(self) -> u32 {
        self.value(true)
    }

    fn sort_key(self) -> (u32, u8, u16) {
        match self {
            Offset::Pseudo(at, n) => (at, 0, n),
            Offset::At(at) => (at, 1, 0),
            Offset::Extended(prefix, _) => (prefix, 1, 0),
        }
    }
}

impl PartialOrd for Offset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Offset {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::At(at) => write!(f, "{}", at),
            Offset::Extended(prefix, at) => write!(f, "{}:{}", prefix, at),
            Offset::Pseudo(at, n) => write!(f, "{}_{}", at, n),
        }
    }
}

impl FromStr for Offset {
    type Err = String;

    /// `a:b` is an instruction at `b` behind an extended-argument prefix at `a`;
    /// `a_n` is the `n`th pseudo instruction at `a`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| part.parse::<u32>().map_err(|_| format!("bad offset `{}`", s));
        if let Some((prefix, at)) = s.split_once(':') {
            let (prefix, at) = (parse(prefix)?, parse(at)?);
            if at <= prefix {
                return Err(format!("extended offset `{}` does not follow its prefix", s));
            }
            return Ok(Offset::Extended(prefix, at));
        }
        match s.split_once('_') {
            None => Ok(Offset::At(parse(s)?)),
            Some((at, n)) => {
                let n = n.parse::<u16>().map_err(|_| format!("bad offset `{}`", s))?;
                Ok(Offset::Pseudo(parse(at)?, n))
            }
        }
    }
}

/// A token attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Attr {
    /// Jump targets, come-from origins, counts and indices.
    Int(i64),
    /// A symbolic operand (names, constant reprs).
    Name(String),
    /// A reference to a nested code object.
    Code(u32),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: Symbol,
    pub attr: Option<Attr>,
    pub pattr: Option<String>,
    pub offset: Offset,
}

impl Token {
    pub fn new(kind: &str, offset: Offset) -> Self {
        Self {
            kind: Symbol::new(kind),
            attr: None,
            pattr: None,
            offset,
        }
    }

    pub fn with_int(mut self, value: i64) -> Self {
        self.attr = Some(Attr::Int(value));
        self
    }

    pub fn with_pattr(mut self, pattr: &str) -> Self {
        self.pattr = Some(pattr.to_string());
        self
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn is_any(&self, kinds: &[&str]) -> bool {
        self.kind.is_any(kinds)
    }

    pub fn int_attr(&self) -> Option<i64> {
        match self.attr {
            Some(Attr::Int(value)) => Some(value),
            _ => None,
        }
    }

    /// The attribute read as a byte offset: the destination of a jump, or the origin
    /// of a come-from marker.
    pub fn target(&self) -> Option<u32> {
        self.int_attr().and_then(|value| u32::try_from(value).ok())
    }

    pub fn code_ref(&self) -> Option<u32> {
        match self.attr {
            Some(Attr::Code(id)) => Some(id),
            _ => None,
        }
    }

    pub fn is_come_from(&self) -> bool {
        self.kind.starts_with("COME_FROM")
    }

    pub fn is_conditional_jump(&self) -> bool {
        self.kind.starts_with("POP_JUMP_IF_") || self.kind.starts_with("JUMP_IF_")
    }

    /// Source text carried by the token, if any.
    pub fn text(&self) -> Option<&str> {
        self.pattr.as_deref()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8} {:<24}", self.offset.to_string(), self.kind.as_str())?;
        match (&self.attr, &self.pattr) {
            (Some(Attr::Int(value)), _) => write!(f, " {}", value)?,
            (Some(Attr::Code(id)), _) => write!(f, " @{}", id)?,
            (_, Some(pattr)) => write!(f, " {}", pattr)?,
            _ => {}
        }
        Ok(())
    }
}

/// Rewrites a raw instruction stream into the token stream the grammar expects.
///
/// - variable-arity opcodes carry their count in the kind (`BUILD_LIST_2`);
/// - `JUMP_ABSOLUTE` to an earlier offset becomes `JUMP_BACK`;
/// - code constants become `LOAD_LISTCOMP` or `LOAD_CODE`, string constants `LOAD_STR`;
/// - come-from runs are ordered so the lowest origin is last.
pub fn normalize(tokens: Vec<Token>, code_name: impl Fn(u32) -> Option<String>) -> Vec<Token> {
    let mut tokens: Vec<Token> = tokens
        .into_iter()
        .map(|mut token| {
            let kind = token.kind.as_str().to_string();
            if VARIADIC_OPS.contains(&kind.as_str()) {
                if let Some(count) = token.int_attr() {
                    token.kind = Symbol::new(&format!("{}_{}", kind, count));
                }
            } else if kind == "JUMP_ABSOLUTE" {
                if token.target().map_or(false, |target| target <= token.offset.earliest()) {
                    token.kind = Symbol::new("JUMP_BACK");
                }
            } else if kind == "LOAD_CONST" {
                match &token.attr {
                    Some(Attr::Code(id)) => {
                        let renamed = match code_name(*id).as_deref() {
                            Some("<listcomp>") => "LOAD_LISTCOMP",
                            _ => "LOAD_CODE",
                        };
                        token.kind = Symbol::new(renamed);
                    }
                    Some(Attr::Name(text)) if is_string_literal(text) => {
                        token.kind = Symbol::new("LOAD_STR");
                    }
                    _ => {}
                }
            }
            token
        })
        .collect();
    order_come_froms(&mut tokens);
    tokens
}

fn is_string_literal(text: &str) -> bool {
    text.len() >= 2
        && ((text.starts_with('\'') && text.ends_with('\''))
            || (text.starts_with('"') && text.ends_with('"')))
}

/// Orders every run of come-from markers sitting at one offset by originating offset,
/// highest first, and renumbers their pseudo offsets to match.
pub fn order_come_froms(tokens: &mut [Token]) {
    let mut start = 0;
    while start < tokens.len() {
        let mut end = start;
        while end < tokens.len()
            && tokens[end].is_come_from()
            && tokens[end].offset.earliest() == tokens[start].offset.earliest()
        {
            end += 1;
        }
        if end == start {
            start += 1;
            continue;
        }
        let run = &mut tokens[start..end];
        run.sort_by(|a, b| b.target().cmp(&a.target()));
        for (n, token) in run.iter_mut().enumerate() {
            if let Offset::Pseudo(at, _) = token.offset {
                token.offset = Offset::Pseudo(at, n as u16);
            }
        }
        start = end;
    }
}

/// Whether a come-from collection satisfies the ordering invariant: origins never
/// increase along the sequence, so the last element is the lowest.
pub fn come_froms_ordered<'a>(markers: impl IntoIterator<Item = &'a Token>) -> bool {
    markers
        .into_iter()
        .filter_map(Token::target)
        .tuple_windows()
        .all(|(a, b)| a >= b)
}
