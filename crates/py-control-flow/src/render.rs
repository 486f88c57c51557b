// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Source rendering from committed parse trees.

use crate::{
    code::Program,
    error::{DecompileError, DecompileResult},
    templates::{resolve_index, resolve_range, Piece, Template, TemplateArg, Templates},
    token::Token,
    tree::{Element, Node},
    versions::CodeKind,
};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};

const INDENT: &str = "    ";

static OPERATORS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("BINARY_ADD", "+"),
        ("BINARY_SUBTRACT", "-"),
        ("BINARY_MULTIPLY", "*"),
        ("BINARY_TRUE_DIVIDE", "/"),
    ])
});

/// Body lists that render `pass` when they derived nothing.
const BODIES: [&str; 3] = ["stmts_opt", "c_stmts_opt", "suite_stmts_opt"];

/// The source text a token contributes on its own.
fn token_text(token: &Token) -> &str {
    if let Some(operator) = OPERATORS.get(token.kind.as_str()) {
        return operator;
    }
    let valued = token.kind.starts_with("LOAD_") || token.kind.starts_with("STORE_") || token.is("COMPARE_OP");
    match token.text() {
        Some(text) if valued => text,
        _ => "",
    }
}

fn is_return_none(element: &Element) -> bool {
    let mut element = element;
    while element.is_any(&["stmt", "c_stmt"]) && element.len() == 1 {
        match element.child(0) {
            Some(inner) => element = inner,
            None => return false,
        }
    }
    element.is("return")
        && element
            .child(0)
            .and_then(Element::first_token)
            .map_or(false, |token| token.is("LOAD_CONST") && token.text() == Some("None"))
        && element.child(0).map_or(false, |expr| expr.len() == 1)
}

pub struct Renderer<'a> {
    program: &'a Program,
    trees: &'a BTreeMap<u32, Node>,
    templates: &'a Templates,
}

impl<'a> Renderer<'a> {
    pub fn new(program: &'a Program, trees: &'a BTreeMap<u32, Node>, templates: &'a Templates) -> Self {
        Self {
            program,
            trees,
            templates,
        }
    }

    /// Renders the entry code object; nested functions and comprehensions are
    /// rendered where they are created.
    pub fn render(&self) -> DecompileResult<String> {
        let mut out = String::new();
        if let Some(entry) = self.program.entry() {
            self.code_body(entry.id, 0, &mut out)?;
        }
        Ok(out)
    }

    fn tree(&self, id: u32) -> DecompileResult<&'a Node> {
        self.trees.get(&id).ok_or(DecompileError::UnknownCode(id))
    }

    /// A module or function body: the implicit trailing `return None` is dropped.
    fn code_body(&self, id: u32, indent: usize, out: &mut String) -> DecompileResult<()> {
        let code = self.program.code(id)?;
        let tree = self.tree(id)?;
        let mut statements: Vec<&Element> = tree.children.iter().collect();
        if statements.last().map_or(false, |last| is_return_none(last)) {
            statements.pop();
        }
        let before = out.len();
        let mut level = indent;
        for statement in statements {
            self.element(statement, &mut level, out)?;
        }
        if out.len() == before && code.kind() == CodeKind::Function {
            out.push_str(&INDENT.repeat(indent));
            out.push_str("pass\n");
        }
        Ok(())
    }

    fn element(&self, element: &Element, indent: &mut usize, out: &mut String) -> DecompileResult<()> {
        match element {
            Element::Token(token) => {
                out.push_str(token_text(token));
                Ok(())
            }
            Element::Node(node) => self.node(node, indent, out),
        }
    }

    fn node(&self, node: &Node, indent: &mut usize, out: &mut String) -> DecompileResult<()> {
        if node.is_empty() && node.is_any(&BODIES) {
            out.push_str(&INDENT.repeat(*indent));
            out.push_str("pass\n");
            return Ok(());
        }
        if node.is("function_def") {
            return self.function_def(node, *indent, out);
        }
        if node.is("list_comp") {
            return self.list_comp(node, out);
        }
        match self.templates.get(node.kind) {
            Some(template) => self.template(node, template, indent, out),
            None => node
                .children
                .iter()
                .try_for_each(|child| self.element(child, indent, out)),
        }
    }

    fn template(&self, node: &Node, template: &Template, indent: &mut usize, out: &mut String) -> DecompileResult<()> {
        let error = |message: String| DecompileError::Template {
            kind: node.kind.to_string(),
            message,
        };
        let mut args = template.args.iter();
        for piece in template.pieces().map_err(error)? {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Indent => out.push_str(&INDENT.repeat(*indent)),
                Piece::Push => *indent += 1,
                Piece::Pop => *indent = indent.saturating_sub(1),
                Piece::Child => {
                    let Some(TemplateArg::Child(index)) = args.next() else {
                        return Err(error("`%c` without a child argument".to_string()));
                    };
                    let child = resolve_index(*index, node.len())
                        .and_then(|index| node.child(index))
                        .ok_or_else(|| error(format!("no child {} among {}", index, node.len())))?;
                    self.element(child, indent, out)?;
                }
                Piece::Range => {
                    let Some(TemplateArg::Range { start, stop, sep }) = args.next() else {
                        return Err(error("`%C` without a range argument".to_string()));
                    };
                    for (n, child) in node.children[resolve_range(*start, *stop, node.len())].iter().enumerate() {
                        if n > 0 {
                            out.push_str(sep);
                        }
                        self.element(child, indent, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn inline(&self, element: &Element) -> DecompileResult<String> {
        let mut out = String::new();
        self.element(element, &mut 0, &mut out)?;
        Ok(out)
    }

    /// `function_def ::= mkfunc store`, with the function's own tree as the body.
    fn function_def(&self, node: &Node, indent: usize, out: &mut String) -> DecompileResult<()> {
        let shape = || DecompileError::Template {
            kind: node.kind.to_string(),
            message: "expected `mkfunc store`".to_string(),
        };
        let id = node
            .child(0)
            .and_then(Element::first_token)
            .and_then(Token::code_ref)
            .ok_or_else(shape)?;
        let name = self.inline(node.child(1).ok_or_else(shape)?)?;
        let code = self.program.code(id)?;
        out.push_str(&format!("{}def {}({}):\n", INDENT.repeat(indent), name, code.args.join(", ")));
        self.code_body(id, indent + 1, out)
    }

    /// A list comprehension: the element, target and filters come from the
    /// comprehension's own code object, the iterable from the call site.
    fn list_comp(&self, node: &Node, out: &mut String) -> DecompileResult<()> {
        let shape = |message: &str| DecompileError::Template {
            kind: node.kind.to_string(),
            message: message.to_string(),
        };
        let id = node
            .child(0)
            .and_then(Element::as_token)
            .and_then(Token::code_ref)
            .ok_or_else(|| shape("comprehension without a code reference"))?;
        let iterable = self.inline(node.child(3).ok_or_else(|| shape("missing iterable"))?)?;
        let body = self.tree(id)?;
        let target = self.inline(body.child(3).ok_or_else(|| shape("missing loop target"))?)?;

        let mut filters = String::new();
        let mut iter = body.child(4).ok_or_else(|| shape("missing comprehension body"))?;
        loop {
            if iter.is("comp_iter") {
                iter = iter.child(0).ok_or_else(|| shape("empty comp_iter"))?;
                continue;
            }
            let condition = iter.child(0).ok_or_else(|| shape("missing operand"))?;
            match iter.kind().as_str() {
                "list_if" => filters.push_str(&format!(" if {}", self.inline(condition)?)),
                "list_if_not" => filters.push_str(&format!(" if not {}", self.inline(condition)?)),
                "comp_body" => {
                    let element = self.inline(condition)?;
                    out.push_str(&format!("[{} for {} in {}{}]", element, target, iterable, filters));
                    return Ok(());
                }
                other => return Err(shape(&format!("unexpected `{}` in comprehension", other))),
            }
            iter = iter.child(2).ok_or_else(|| shape("filter without a body"))?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{n, t, tok};

    #[test]
    fn token_text_covers_values_and_operators() {
        assert_eq!(token_text(&tok("BINARY_ADD", "6", None)), "+");
        assert_eq!(token_text(&tok("LOAD_NAME", "0", None).with_pattr("x")), "x");
        assert_eq!(token_text(&tok("COMPARE_OP", "4", None).with_pattr("<")), "<");
        assert_eq!(token_text(&tok("POP_JUMP_IF_FALSE", "2", Some(8))), "");
        assert_eq!(token_text(&tok("CALL_FUNCTION_1", "8", Some(1))), "");
    }

    #[test]
    fn only_a_bare_none_return_is_implicit() {
        let none = n(
            "stmt",
            vec![n(
                "return",
                vec![
                    n("expr", vec![Element::Token(tok("LOAD_CONST", "8", None).with_pattr("None"))]),
                    t("RETURN_VALUE", "10", None),
                ],
            )],
        );
        let value = n(
            "stmt",
            vec![n(
                "return",
                vec![
                    n("expr", vec![Element::Token(tok("LOAD_NAME", "8", None).with_pattr("y"))]),
                    t("RETURN_VALUE", "10", None),
                ],
            )],
        );
        assert!(is_return_none(&none));
        assert!(!is_return_none(&value));
    }
}
