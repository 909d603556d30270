//! AST for the source language
//!
//! ASDL:
//!   node = Number(token)
//!        | Identifier(token)
//!        | StringLiteral(token)
//!        | BinOp(node left, token op, node right)
//!        | Condition(node left, token cmp, node right)
//!        | If(node condition, node then_body, node? else_body)
//!        | While(node condition, node body)
//!        | Print(print_kind kind, node? expr, string literal)
//!        | Assign(token identifier, node expr)
//!        | Decl(token decl_type, token* identifiers, node? init)
//!        | Seq(node? left, node? right)
//!   print_kind = Int | Str
//!
//! Children are reference-counted so a node may be shared between
//! parents; consumers walk the tree by reference and never mutate it.

use crate::lexer::Token;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

#[derive(Debug, PartialEq)]
pub(crate) enum AstNode {
    Number(Token),
    Identifier(Token),
    StringLiteral(Token),
    BinOp {
        left: Rc<AstNode>,
        op: Token,
        right: Rc<AstNode>,
    },
    Condition {
        left: Rc<AstNode>,
        cmp: Token,
        right: Rc<AstNode>,
    },
    If {
        condition: Rc<AstNode>,
        then_body: Rc<AstNode>,
        else_body: Option<Rc<AstNode>>,
    },
    While {
        condition: Rc<AstNode>,
        body: Rc<AstNode>,
    },
    /// `Str` prints carry either a literal (and no expression) or an
    /// expression naming a string variable (and an empty literal).
    Print {
        kind: PrintKind,
        expr: Option<Rc<AstNode>>,
        literal: String,
    },
    Assign {
        identifier: Token,
        expr: Rc<AstNode>,
    },
    Decl {
        decl_type: Token,
        identifiers: Vec<Token>,
        init: Option<Rc<AstNode>>,
    },
    /// A statement sequence, encoded as a right-nested tree.
    Seq {
        left: Option<Rc<AstNode>>,
        right: Option<Rc<AstNode>>,
    },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum PrintKind {
    Int,
    Str,
}

impl Display for PrintKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PrintKind::Int => write!(f, "int"),
            PrintKind::Str => write!(f, "string"),
        }
    }
}

/// Render the tree in the same box-drawing form the driver prints.
pub(crate) fn format_tree(root: &AstNode) -> String {
    let mut out = String::new();
    write_node(root, "", true, &mut out);
    out
}

fn write_node(node: &AstNode, prefix: &str, is_last: bool, out: &mut String) {
    out.push_str(prefix);
    out.push_str(if is_last { "└── " } else { "├── " });
    out.push_str(&label(node));
    out.push('\n');

    let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
    let children = children(node);
    for (i, child) in children.iter().enumerate() {
        write_node(child, &child_prefix, i + 1 == children.len(), out);
    }
}

fn label(node: &AstNode) -> String {
    match node {
        AstNode::Number(tok) => format!("Number: {}", tok.value),
        AstNode::Identifier(tok) => format!("Identifier: {}", tok.value),
        AstNode::StringLiteral(tok) => format!("StringLiteral: \"{}\"", tok.value),
        AstNode::BinOp { op, .. } => format!("BinOp ({})", op.value),
        AstNode::Condition { cmp, .. } => format!("Condition ({})", cmp.value),
        AstNode::If { .. } => "If".to_string(),
        AstNode::While { .. } => "While".to_string(),
        AstNode::Print { kind, .. } => format!("Print({kind})"),
        AstNode::Assign { .. } => "Assignment".to_string(),
        AstNode::Decl { decl_type, .. } => format!("Declaration ({})", decl_type.value),
        AstNode::Seq { .. } => "Seq".to_string(),
    }
}

fn children(node: &AstNode) -> Vec<&AstNode> {
    match node {
        AstNode::Number(_) | AstNode::Identifier(_) | AstNode::StringLiteral(_) => vec![],
        AstNode::BinOp { left, right, .. } | AstNode::Condition { left, right, .. } => {
            vec![&**left, &**right]
        }
        AstNode::If {
            condition,
            then_body,
            else_body,
        } => {
            let mut out = vec![&**condition, &**then_body];
            if let Some(else_body) = else_body {
                out.push(&**else_body);
            }
            out
        }
        AstNode::While { condition, body } => vec![&**condition, &**body],
        AstNode::Print { expr, .. } => expr.iter().map(|e| &**e).collect(),
        AstNode::Assign { expr, .. } => vec![&**expr],
        AstNode::Decl { init, .. } => init.iter().map(|e| &**e).collect(),
        AstNode::Seq { left, right } => left.iter().chain(right.iter()).map(|n| &**n).collect(),
    }
}
