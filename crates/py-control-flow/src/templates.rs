// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Rendering templates, keyed by node kind.
//!
//! A format string is plain text with directives:
//!
//! - `%c` renders the child named by the next [`TemplateArg::Child`];
//! - `%C` renders the children of the next [`TemplateArg::Range`], joined by its separator;
//! - `%|` writes the current indentation;
//! - `%+` / `%-` raise and lower the indentation level;
//! - `%%` is a literal percent sign.
//!
//! Child indices may be negative, counting from the end.

use crate::{
    error::{DecompileError, DecompileResult},
    symbol::Symbol,
    versions::{merge, Overlay},
};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateArg {
    Child(isize),
    Range { start: isize, stop: isize, sep: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    pub format: String,
    pub args: Vec<TemplateArg>,
}

/// One lexical piece of a format string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Piece<'a> {
    Text(&'a str),
    Child,
    Range,
    Indent,
    Push,
    Pop,
}

impl Template {
    pub fn new(format: &str) -> Self {
        Self {
            format: format.to_string(),
            args: vec![],
        }
    }

    pub fn child(mut self, index: isize) -> Self {
        self.args.push(TemplateArg::Child(index));
        self
    }

    pub fn range(mut self, start: isize, stop: isize, sep: &str) -> Self {
        self.args.push(TemplateArg::Range {
            start,
            stop,
            sep: sep.to_string(),
        });
        self
    }

    pub fn pieces(&self) -> Result<Vec<Piece<'_>>, String> {
        let mut pieces = vec![];
        let mut rest = self.format.as_str();
        while let Some(at) = rest.find('%') {
            if at > 0 {
                pieces.push(Piece::Text(&rest[..at]));
            }
            let piece = match rest[at + 1..].chars().next() {
                Some('c') => Piece::Child,
                Some('C') => Piece::Range,
                Some('|') => Piece::Indent,
                Some('+') => Piece::Push,
                Some('-') => Piece::Pop,
                Some('%') => Piece::Text("%"),
                Some(other) => return Err(format!("unknown directive `%{}`", other)),
                None => return Err("dangling `%`".to_string()),
            };
            pieces.push(piece);
            rest = &rest[at + 2..];
        }
        if !rest.is_empty() {
            pieces.push(Piece::Text(rest));
        }
        Ok(pieces)
    }

    /// Directives and arguments must pair up one to one.
    pub fn validate(&self, kind: Symbol) -> DecompileResult<()> {
        let error = |message: String| DecompileError::Template {
            kind: kind.to_string(),
            message,
        };
        let mut args = self.args.iter();
        for piece in self.pieces().map_err(error)? {
            if !matches!(piece, Piece::Child | Piece::Range) {
                continue;
            }
            match (piece, args.next()) {
                (Piece::Child, Some(TemplateArg::Child(_))) | (Piece::Range, Some(TemplateArg::Range { .. })) => {}
                (_, Some(arg)) => return Err(error(format!("directive {:?} paired with {:?}", piece, arg))),
                (_, None) => return Err(error("too few arguments".to_string())),
            }
        }
        if args.next().is_some() {
            return Err(error("too many arguments".to_string()));
        }
        Ok(())
    }
}

/// Resolves a possibly negative index against `len`.
pub fn resolve_index(index: isize, len: usize) -> Option<usize> {
    if index >= 0 {
        let index = index as usize;
        (index < len).then_some(index)
    } else {
        len.checked_sub(index.unsigned_abs())
    }
}

/// Resolves a `[start, stop)` range; a negative `stop` counts from the end.
pub fn resolve_range(start: isize, stop: isize, len: usize) -> std::ops::Range<usize> {
    let clamp = |index: isize| {
        if index >= 0 {
            (index as usize).min(len)
        } else {
            len.saturating_sub(index.unsigned_abs())
        }
    };
    let (start, stop) = (clamp(start), clamp(stop));
    start..stop.max(start)
}

/// An immutable kind-to-template table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Templates {
    table: BTreeMap<Symbol, Template>,
}

impl Templates {
    pub fn new(entries: impl IntoIterator<Item = (Symbol, Template)>) -> Self {
        Self {
            table: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, kind: Symbol) -> Option<&Template> {
        self.table.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Template)> {
        self.table.iter()
    }

    pub fn with_edits(&self, overlay: &Overlay<Symbol, Template>) -> Self {
        Self {
            table: merge(&self.table, overlay),
        }
    }

    pub fn validate(&self) -> DecompileResult<()> {
        self.table
            .iter()
            .try_for_each(|(kind, template)| template.validate(*kind))
    }
}
