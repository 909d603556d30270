//! Intermediate representation
//!
//! ASDL:
//!   instruction = Assignment(string var, string left, string op, string right)
//!               | Jump(string target)
//!               | Label(string name)
//!               | Compare(string left, string op, string right, string target)
//!               | Print(print_kind kind, string value)
//!   print_kind = Int | Str
//!
//! Operands stay strings end to end: a decimal literal, a temporary
//! `T<n>`, a string-constant symbol `S<n>`, or a user identifier. `op`
//! is empty in the copy form of `Assignment`; mapping operators to
//! machine instructions is the backend's job.

use crate::ast::{AstNode, PrintKind};
use crate::id_gen::IdGenerator;
use crate::lexer::{Token, TokenKind};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, PartialEq, Error)]
#[error("{message}")]
pub struct IrError {
    pub message: String,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum VarType {
    Int,
    Str,
}

impl Display for VarType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VarType::Int => write!(f, "int"),
            VarType::Str => write!(f, "string"),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub(crate) enum Instruction {
    /// `var ← left` when `op` is empty, else `var ← left op right`.
    Assignment {
        var: String,
        left: String,
        op: String,
        right: String,
    },
    Jump {
        target: String,
    },
    Label {
        name: String,
    },
    /// `if left op right then goto target`; falling through is the
    /// false branch.
    Compare {
        left: String,
        op: String,
        right: String,
        target: String,
    },
    Print {
        kind: PrintKind,
        value: String,
    },
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::Assignment {
                var,
                left,
                op,
                right,
            } => {
                if op.is_empty() {
                    write!(f, "{var} = {left}")
                } else {
                    write!(f, "{var} = {left} {op} {right}")
                }
            }
            Instruction::Jump { target } => write!(f, "jump {target}"),
            Instruction::Label { name } => write!(f, "{name}:"),
            Instruction::Compare {
                left,
                op,
                right,
                target,
            } => write!(f, "if {left} {op} {right} goto {target}"),
            Instruction::Print { kind, value } => write!(f, "print({kind}, {value})"),
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct GeneratedIr {
    pub(crate) code: Vec<Instruction>,
    /// Every user variable and every temporary, with its declared type.
    pub(crate) identifiers: HashMap<String, VarType>,
    /// String-constant symbol → literal bytes (no quotes).
    pub(crate) constants: HashMap<String, String>,
}

impl GeneratedIr {
    /// One instruction per line, in the driver's `--dump-ir` format.
    pub(crate) fn listing(&self) -> String {
        let mut out = String::new();
        for instruction in &self.code {
            out.push_str(&instruction.to_string());
            out.push('\n');
        }
        out
    }
}

pub(crate) fn emit_program(root: &AstNode) -> Result<GeneratedIr, IrError> {
    let mut ir_gen = IrGenerator::new();
    ir_gen.emit_statement(root)?;
    Ok(GeneratedIr {
        code: ir_gen.code,
        identifiers: ir_gen.identifiers,
        constants: ir_gen.constants,
    })
}

struct IrGenerator {
    code: Vec<Instruction>,
    identifiers: HashMap<String, VarType>,
    constants: HashMap<String, String>,
    temps: IdGenerator,
    labels: IdGenerator,
    strings: IdGenerator,
}

impl IrGenerator {
    fn new() -> Self {
        IrGenerator {
            code: vec![],
            identifiers: HashMap::new(),
            constants: HashMap::new(),
            temps: IdGenerator::new(),
            labels: IdGenerator::new(),
            strings: IdGenerator::new(),
        }
    }

    fn next_temp(&mut self) -> String {
        format!("T{}", self.temps.next())
    }

    fn next_label(&mut self) -> String {
        format!("L{}", self.labels.next())
    }

    fn next_string_sym(&mut self) -> String {
        format!("S{}", self.strings.next())
    }

    fn emit_statement(&mut self, node: &AstNode) -> Result<(), IrError> {
        match node {
            AstNode::Seq { left, right } => {
                if let Some(left) = left {
                    self.emit_statement(left)?;
                }
                if let Some(right) = right {
                    self.emit_statement(right)?;
                }
                Ok(())
            }
            AstNode::Decl {
                decl_type,
                identifiers,
                init,
            } => self.emit_declaration(decl_type, identifiers, init.as_deref()),
            AstNode::Assign { identifier, expr } => {
                self.emit_assignment(identifier, expr);
                Ok(())
            }
            AstNode::Print {
                kind,
                expr,
                literal,
            } => {
                self.emit_print(*kind, expr.as_deref(), literal);
                Ok(())
            }
            AstNode::If {
                condition,
                then_body,
                else_body,
            } => self.emit_if(condition, then_body, else_body.as_deref()),
            AstNode::While { condition, body } => self.emit_while(condition, body),
            // Expression nodes are no-ops in statement position.
            AstNode::Number(_)
            | AstNode::Identifier(_)
            | AstNode::StringLiteral(_)
            | AstNode::BinOp { .. }
            | AstNode::Condition { .. } => Ok(()),
        }
    }

    /// Returns the symbol naming where the expression's value lives: the
    /// literal itself, a variable name, a fresh temporary, or a fresh
    /// string-constant symbol.
    fn emit_expression(&mut self, node: &AstNode) -> String {
        match node {
            AstNode::Identifier(tok) | AstNode::Number(tok) => tok.value.clone(),
            AstNode::StringLiteral(tok) => {
                let sym = self.next_string_sym();
                self.constants.insert(sym.clone(), tok.value.clone());
                sym
            }
            AstNode::BinOp { left, op, right } => {
                let left = self.emit_expression(left);
                let right = self.emit_expression(right);

                let temp = self.next_temp();
                self.identifiers.insert(temp.clone(), VarType::Int);
                self.code.push(Instruction::Assignment {
                    var: temp.clone(),
                    left,
                    op: op.value.clone(),
                    right,
                });
                temp
            }
            // A statement node in expression position names nothing.
            _ => String::new(),
        }
    }

    fn emit_declaration(
        &mut self,
        decl_type: &Token,
        identifiers: &[Token],
        init: Option<&AstNode>,
    ) -> Result<(), IrError> {
        let var_type = if decl_type.kind == TokenKind::Int {
            VarType::Int
        } else {
            VarType::Str
        };
        for identifier in identifiers {
            self.identifiers.insert(identifier.value.clone(), var_type);
        }

        if let Some(init) = init {
            if identifiers.len() != 1 {
                return Err(IrError {
                    message: "Init only allowed for single variable declaration".to_string(),
                });
            }
            let right = self.emit_expression(init);
            self.code.push(Instruction::Assignment {
                var: identifiers[0].value.clone(),
                left: right,
                op: String::new(),
                right: String::new(),
            });
        }
        Ok(())
    }

    fn emit_assignment(&mut self, identifier: &Token, expr: &AstNode) {
        // A target that was never declared is registered as a string.
        self.identifiers
            .entry(identifier.value.clone())
            .or_insert(VarType::Str);

        let right = self.emit_expression(expr);
        self.code.push(Instruction::Assignment {
            var: identifier.value.clone(),
            left: right,
            op: String::new(),
            right: String::new(),
        });
    }

    fn emit_print(&mut self, kind: PrintKind, expr: Option<&AstNode>, literal: &str) {
        if kind == PrintKind::Str && !literal.is_empty() {
            let sym = self.next_string_sym();
            self.constants.insert(sym.clone(), literal.to_string());
            self.code.push(Instruction::Print {
                kind: PrintKind::Str,
                value: sym,
            });
            return;
        }

        let value = match expr {
            Some(expr) => self.emit_expression(expr),
            None => String::new(),
        };
        self.code.push(Instruction::Print { kind, value });
    }

    /// Lowers a comparison and returns its true-branch label; the false
    /// branch is the fallthrough.
    fn emit_condition(&mut self, node: &AstNode) -> Result<String, IrError> {
        let AstNode::Condition { left, cmp, right } = node else {
            return Err(IrError {
                message: "expected a comparison in condition position".to_string(),
            });
        };

        let left = self.emit_expression(left);
        let right = self.emit_expression(right);

        let true_label = self.next_label();
        self.code.push(Instruction::Compare {
            left,
            op: cmp.value.clone(),
            right,
            target: true_label.clone(),
        });
        Ok(true_label)
    }

    fn emit_if(
        &mut self,
        condition: &AstNode,
        then_body: &AstNode,
        else_body: Option<&AstNode>,
    ) -> Result<(), IrError> {
        let then_label = self.emit_condition(condition)?;
        let else_label = self.next_label();
        let end_label = self.next_label();

        // condition false falls through to the else branch
        self.code.push(Instruction::Jump {
            target: else_label.clone(),
        });

        self.code.push(Instruction::Label { name: then_label });
        self.emit_statement(then_body)?;
        self.code.push(Instruction::Jump {
            target: end_label.clone(),
        });

        self.code.push(Instruction::Label { name: else_label });
        if let Some(else_body) = else_body {
            self.emit_statement(else_body)?;
        }

        self.code.push(Instruction::Label { name: end_label });
        Ok(())
    }

    fn emit_while(&mut self, condition: &AstNode, body: &AstNode) -> Result<(), IrError> {
        let start_label = self.next_label();
        // Reserved for the body; the body instead lands on the
        // condition's true label, so this one is never emitted.
        let _body_label = self.next_label();

        self.code.push(Instruction::Label {
            name: start_label.clone(),
        });

        let true_label = self.emit_condition(condition)?;
        let end_label = self.next_label();

        // condition false leaves the loop
        self.code.push(Instruction::Jump {
            target: end_label.clone(),
        });

        self.code.push(Instruction::Label { name: true_label });
        self.emit_statement(body)?;
        self.code.push(Instruction::Jump {
            target: start_label,
        });

        self.code.push(Instruction::Label { name: end_label });
        Ok(())
    }
}
