// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Code objects and the textual disassembly listing they are read from.
//!
//! ```text
//! # comment
//! version 3.8
//! code @0 <module>
//!      0 LOAD_CONST   @1
//!      2 LOAD_CONST   'f'
//!      4 MAKE_FUNCTION 0
//!      6 STORE_NAME   f
//! code @1 f args=x
//!      0 LOAD_FAST    x
//!      2 RETURN_VALUE
//! ```
//!
//! Operands are integers (jump targets, counts, come-from origins), `@n` code
//! references, or free text. Come-from markers appear as ordinary instructions at
//! pseudo offsets such as `10_0`. A `#` outside quotes that begins a word starts
//! a comment.

use crate::{
    error::{DecompileError, DecompileResult},
    token::{normalize, Attr, Offset, Token},
    versions::{CodeKind, Version},
};
use std::{collections::BTreeMap, fmt};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeObject {
    pub id: u32,
    pub name: String,
    pub args: Vec<String>,
    pub tokens: Vec<Token>,
}

impl CodeObject {
    pub fn kind(&self) -> CodeKind {
        CodeKind::of(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    pub version: Version,
    pub codes: BTreeMap<u32, CodeObject>,
}

impl Program {
    /// The entry code object: the lowest id.
    pub fn entry(&self) -> Option<&CodeObject> {
        self.codes.values().next()
    }

    pub fn code(&self, id: u32) -> DecompileResult<&CodeObject> {
        self.codes.get(&id).ok_or(DecompileError::UnknownCode(id))
    }

    /// Reads a listing and normalizes every code object's token stream.
    pub fn parse(text: &str) -> DecompileResult<Self> {
        let mut version = None;
        let mut codes: BTreeMap<u32, CodeObject> = BTreeMap::new();
        let mut current: Option<u32> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let error = |message: String| DecompileError::Listing { line, message };
            let content = strip_comment(raw).trim();
            if content.is_empty() {
                continue;
            }

            let mut words = content.split_whitespace();
            match words.next() {
                Some("version") => {
                    let text = words.next().ok_or_else(|| error("missing version".to_string()))?;
                    version = Some(text.parse::<Version>().map_err(error)?);
                }
                Some("code") => {
                    let id = words
                        .next()
                        .and_then(|word| word.strip_prefix('@'))
                        .and_then(|id| id.parse::<u32>().ok())
                        .ok_or_else(|| error("expected `code @<id> <name>`".to_string()))?;
                    let name = words.next().ok_or_else(|| error("code object without a name".to_string()))?;
                    let args = match words.next() {
                        Some(word) => word
                            .strip_prefix("args=")
                            .ok_or_else(|| error(format!("unexpected `{}`", word)))?
                            .split(',')
                            .filter(|arg| !arg.is_empty())
                            .map(str::to_string)
                            .collect(),
                        None => vec![],
                    };
                    if codes.contains_key(&id) {
                        return Err(error(format!("duplicate code object @{}", id)));
                    }
                    codes.insert(
                        id,
                        CodeObject {
                            id,
                            name: name.to_string(),
                            args,
                            tokens: vec![],
                        },
                    );
                    current = Some(id);
                }
                Some(at) => {
                    let code = current
                        .and_then(|id| codes.get_mut(&id))
                        .ok_or_else(|| error("instruction outside a code object".to_string()))?;
                    let offset: Offset = at.parse().map_err(error)?;
                    let rest = content[at.len()..].trim_start();
                    let (opname, operand) = match rest.split_once(char::is_whitespace) {
                        Some((opname, operand)) => (opname, operand.trim()),
                        None => (rest, ""),
                    };
                    if opname.is_empty() {
                        return Err(error("missing opname".to_string()));
                    }
                    code.tokens.push(instruction(opname, offset, operand));
                }
                None => {}
            }
        }

        let version = version.ok_or(DecompileError::Listing {
            line: 0,
            message: "missing `version` header".to_string(),
        })?;
        let names: BTreeMap<u32, String> = codes.iter().map(|(id, code)| (*id, code.name.clone())).collect();
        for code in codes.values_mut() {
            let raw = std::mem::take(&mut code.tokens);
            code.tokens = normalize(raw, |id| names.get(&id).cloned());
        }
        Ok(Program { version, codes })
    }
}

/// The line up to its comment, if it has one.
fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    let mut escaped = false;
    let mut previous = ' ';
    for (index, c) in line.char_indices() {
        match quote {
            Some(open) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == open {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '#' if previous.is_whitespace() => return &line[..index],
                _ => {}
            },
        }
        previous = c;
    }
    line
}

fn instruction(opname: &str, offset: Offset, operand: &str) -> Token {
    let mut token = Token::new(opname, offset);
    if operand.is_empty() {
        return token;
    }
    token.attr = Some(match operand.strip_prefix('@').and_then(|id| id.parse::<u32>().ok()) {
        Some(id) => Attr::Code(id),
        None => match operand.parse::<i64>() {
            Ok(value) => Attr::Int(value),
            Err(_) => Attr::Name(operand.to_string()),
        },
    });
    token.pattr = Some(operand.to_string());
    token
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "version {}", self.version)?;
        for code in self.codes.values() {
            write!(f, "code @{} {}", code.id, code.name)?;
            if !code.args.is_empty() {
                write!(f, " args={}", code.args.join(","))?;
            }
            writeln!(f)?;
            for token in &code.tokens {
                writeln!(f, "{}", token.to_string().trim_end())?;
            }
        }
        Ok(())
    }
}
