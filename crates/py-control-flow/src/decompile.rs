// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Listing in, source out.

use crate::{
    code::{CodeObject, Program},
    error::{DecompileError, DecompileResult},
    grammar::{customize, RuleId},
    reducecheck::{Reduction, Reject},
    reducer::{Chart, CompiledGrammar, Reducer},
    render::Renderer,
    tree::Node,
    versions::VersionTables,
};
use log::{debug, warn};
use std::{collections::BTreeMap, fmt};

/// A committed node that its registered check rejects when re-run on the final tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyFailure {
    pub code: u32,
    pub rule: RuleId,
    pub first: usize,
    pub last: usize,
    pub reject: Reject,
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "code @{}: `{}` over [{}, {}]: {}",
            self.code, self.rule, self.first, self.last, self.reject
        )
    }
}

/// Trees for every code object of a program plus the rendered source.
#[derive(Clone, Debug)]
pub struct Decompiled {
    pub trees: BTreeMap<u32, Node>,
    pub source: String,
}

pub struct Decompiler<'t> {
    tables: &'t VersionTables,
}

impl<'t> Decompiler<'t> {
    pub fn new(tables: &'t VersionTables) -> Self {
        Self { tables }
    }

    /// Fills the chart for one code object, with the grammar customized to the
    /// arities its tokens use.
    pub fn chart(&self, code: &CodeObject) -> Chart {
        let grammar = customize(&self.tables.grammar, &code.tokens);
        let compiled = CompiledGrammar::new(&grammar);
        Reducer::new(&compiled, &self.tables.checks, &code.tokens).run()
    }

    pub fn parse_code(&self, code: &CodeObject) -> DecompileResult<Node> {
        let start = self.tables.start_symbol(code.kind());
        let chart = self.chart(code);
        let furthest = chart.furthest(start);
        chart.into_tree(start).ok_or_else(|| {
            debug!("{}: `{}` derives tokens [0, {})", code.name, start, furthest);
            DecompileError::NoParse {
                code: code.name.clone(),
                index: furthest,
                token: code
                    .tokens
                    .get(furthest)
                    .map(|token| token.to_string().trim().to_string())
                    .unwrap_or_else(|| "end of stream".to_string()),
            }
        })
    }

    pub fn decompile(&self, program: &Program) -> DecompileResult<Decompiled> {
        if program.version != self.tables.version {
            warn!(
                "listing targets {}, decompiling with {} tables",
                program.version, self.tables.version
            );
        }
        let trees = program
            .codes
            .values()
            .map(|code| Ok((code.id, self.parse_code(code)?)))
            .collect::<DecompileResult<BTreeMap<_, _>>>()?;
        let source = Renderer::new(program, &trees, &self.tables.templates).render()?;
        Ok(Decompiled { trees, source })
    }

    /// Re-runs every registered check over the committed trees.
    pub fn verify(&self, program: &Program, trees: &BTreeMap<u32, Node>) -> Vec<VerifyFailure> {
        let mut failures = vec![];
        for (id, tree) in trees {
            let Some(code) = program.codes.get(id) else {
                continue;
            };
            tree.walk(&mut |node| {
                let (Some(rule), Some(span)) = (&node.rule, node.span) else {
                    return;
                };
                let reduction = Reduction {
                    rule,
                    tree: node,
                    tokens: &code.tokens,
                    first: span.first,
                    last: span.last,
                };
                if let Err(reject) = self.tables.checks.check(&reduction) {
                    failures.push(VerifyFailure {
                        code: *id,
                        rule: rule.clone(),
                        first: span.first,
                        last: span.last,
                        reject,
                    });
                }
            });
        }
        failures
    }
}

/// Decompiles listing text against the tables of its declared version.
pub fn decompile_listing(text: &str) -> DecompileResult<(Program, Decompiled)> {
    let program = Program::parse(text)?;
    let tables = VersionTables::for_version(program.version)?;
    let decompiled = Decompiler::new(&tables).decompile(&program)?;
    Ok((program, decompiled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{symbol::Symbol, tree::Element, versions::Version};

    /// def f(x):
    ///     if x:
    ///         return 3
    ///     else:
    ///         return 1
    const RETURNS: &str = "
        version 3.8
        code @0 f args=x
             0 LOAD_FAST         x
             2 POP_JUMP_IF_FALSE 8
             4 LOAD_CONST        3
             6 RETURN_VALUE
           8_0 COME_FROM         2
             8 LOAD_CONST        1
            10 RETURN_VALUE
    ";

    #[test]
    fn returning_branches_reduce_as_if_else_not_as_a_short_circuit() {
        let program = Program::parse(RETURNS).unwrap();
        let tables = VersionTables::for_version(Version::new(3, 8)).unwrap();
        let decompiler = Decompiler::new(&tables);
        let chart = decompiler.chart(program.code(0).unwrap());

        let ifelse = chart.get("ifelsestmt", 0, 6).unwrap();
        assert_eq!(
            ifelse.rule.as_ref().unwrap().to_string(),
            "ifelsestmt ::= testexpr returns come_froms else_suite \\e__come_froms"
        );
        assert!(chart.get("and", 0, 2).is_none());
        assert!(chart.get("ifstmt", 0, 4).is_none());

        let tree = chart.tree(Symbol::new("stmts")).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.child(0).and_then(|stmt| stmt.child(0)).unwrap().is("ifelsestmt"));

        let decompiled = decompiler.decompile(&program).unwrap();
        assert_eq!(decompiled.source, "if x:\n    return 3\nelse:\n    return 1\n");
    }

    /// The test jumps to the last token of an if/else-shaped run: every piece of
    /// the if/else is in the chart, but the whole is not.
    const JUMP_TO_END: &str = "
        version 3.8
        code @0 <module>
             0 LOAD_NAME         a
             2 POP_JUMP_IF_FALSE 14
             4 LOAD_NAME         b
             6 POP_TOP
             8 JUMP_FORWARD      10
          10_0 COME_FROM         8
            10 LOAD_NAME         c
            12 POP_TOP
          14_0 COME_FROM         2
            14 LOAD_CONST        None
            16 RETURN_VALUE
    ";

    #[test]
    fn test_jumping_to_the_end_is_not_an_if_else() {
        let program = Program::parse(JUMP_TO_END).unwrap();
        let tables = VersionTables::for_version(program.version).unwrap();
        let code = program.code(0).unwrap();
        let chart = Decompiler::new(&tables).chart(code);

        let part = |symbol: &str, first: usize, last: usize| -> Element {
            chart
                .get(symbol, first, last)
                .cloned()
                .unwrap_or_else(|| panic!("no {} over [{}, {}]", symbol, first, last))
                .into()
        };
        let candidate = Node {
            kind: Symbol::new("ifelsestmt"),
            children: vec![
                part("testexpr", 0, 1),
                part("stmts_opt", 2, 3),
                part("jump_forward_else", 4, 5),
                part("else_suite", 6, 7),
                part("_come_froms", 8, 8),
            ],
            span: None,
            rule: None,
        };
        let rule = RuleId::new(
            "ifelsestmt",
            &["testexpr", "stmts_opt", "jump_forward_else", "else_suite", "_come_froms"],
        );
        let reduction = Reduction {
            rule: &rule,
            tree: &candidate,
            tokens: &code.tokens,
            first: 0,
            last: 8,
        };
        assert_eq!(tables.checks.check(&reduction), Err(Reject::JumpToEnd { target: 14 }));
        assert!(chart.get("ifelsestmt", 0, 8).is_none());
        assert!(chart.get("ifelsestmt", 0, 7).is_none());
    }

    #[test]
    fn unparseable_code_reports_the_furthest_token() {
        let program = Program::parse(
            "
            version 3.8
            code @0 <module>
                 0 LOAD_NAME x
                 2 POP_TOP
                 4 LOAD_NAME y
            ",
        )
        .unwrap();
        let tables = VersionTables::for_version(program.version).unwrap();
        let err = Decompiler::new(&tables).decompile(&program).unwrap_err();
        assert!(matches!(err, DecompileError::NoParse { index: 2, .. }), "{}", err);
    }

    #[test]
    fn committed_trees_pass_verification() {
        let (program, decompiled) = decompile_listing(RETURNS).unwrap();
        let tables = VersionTables::for_version(program.version).unwrap();
        assert_eq!(Decompiler::new(&tables).verify(&program, &decompiled.trees), vec![]);
    }
}
