// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use crate::versions::Version;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecompileError {
    #[error("no parse for code object `{code}`: stopped at token {index} ({token})")]
    NoParse {
        code: String,
        index: usize,
        token: String,
    },

    #[error("unsupported target version {0}")]
    UnsupportedVersion(Version),

    #[error("malformed grammar rule `{0}`")]
    MalformedRule(String),

    #[error("listing line {line}: {message}")]
    Listing { line: usize, message: String },

    #[error("code object @{0} is not in the program")]
    UnknownCode(u32),

    #[error("template for `{kind}`: {message}")]
    Template { kind: String, message: String },
}

pub type DecompileResult<T> = Result<T, DecompileError>;
