// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Control-flow reconstruction for a stack-VM bytecode decompiler.
//!
//! A grammar over instruction tokens is ambiguous: the same token sequence can
//! be an `if`/`else`, a short-circuit expression or part of a loop. The reducer
//! proposes every reduction the grammar allows and a registry of reduction
//! checks, keyed by rule identity, accepts or rejects each one by looking at
//! where the jumps land.

pub mod code;
pub mod decompile;
pub mod error;
pub mod grammar;
pub mod reducecheck;
pub mod reducer;
pub mod render;
pub mod symbol;
pub mod templates;
pub mod token;
pub mod tree;
pub mod versions;

#[cfg(test)]
mod testing;

pub use code::{CodeObject, Program};
pub use decompile::{decompile_listing, Decompiled, Decompiler, VerifyFailure};
pub use error::{DecompileError, DecompileResult};
pub use versions::{Version, VersionTables, SUPPORTED};
