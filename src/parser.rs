//! Parser for the source language.
//!
//! Consumes the lexer's token stream and produces the AST. Statement
//! sequences fold into right-nested `Seq` nodes with a `Seq` at the
//! root, which is the shape the IR generator walks.

use crate::ast::{AstNode, PrintKind};
use crate::lexer::{Token, TokenKind};
use std::rc::Rc;
use thiserror::Error;
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated, terminated};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::stream::TokenSlice;
use winnow::token::{any, one_of};

#[derive(Debug, PartialEq, Error)]
#[error("{message}")]
pub struct ParserError {
    pub message: String,
}

impl ParserError {
    // Avoiding `From` so winnow types don't become part of our public API
    fn from_parse(
        error: winnow::error::ParseError<Tokens<'_>, winnow::error::ContextError>,
        tokens: &[Token],
    ) -> Self {
        let context = error.inner().context();
        let expected = context
            .filter_map(|c| match c {
                StrContext::Expected(e) => Some(e.to_string()),
                _ => None,
            })
            .collect::<Vec<_>>();

        let expected = expected.first().cloned().unwrap_or("statement".to_string());

        let message = match tokens.get(error.offset()) {
            Some(found) => format!(
                "Expected {expected}, found `{}` at line {}",
                found.value, found.line
            ),
            None => format!("Expected {expected}, found end of input"),
        };

        ParserError { message }
    }
}

type Tokens<'i> = TokenSlice<'i, Token>;

pub(crate) fn parse(input: &[Token]) -> Result<Rc<AstNode>, ParserError> {
    let tokens = Tokens::new(input);
    program
        .parse(tokens)
        .map_err(|e| ParserError::from_parse(e, input))
}

fn program(i: &mut Tokens<'_>) -> winnow::Result<Rc<AstNode>> {
    repeat(0.., statement).map(fold_seq).parse_next(i)
}

/// Right-nest a statement list into the `Seq` tree form.
fn fold_seq(statements: Vec<Rc<AstNode>>) -> Rc<AstNode> {
    let mut seq = None;
    for statement in statements.into_iter().rev() {
        seq = Some(Rc::new(AstNode::Seq {
            left: Some(statement),
            right: seq,
        }));
    }
    seq.unwrap_or_else(|| {
        Rc::new(AstNode::Seq {
            left: None,
            right: None,
        })
    })
}

fn statement(i: &mut Tokens<'_>) -> winnow::Result<Rc<AstNode>> {
    alt((
        declaration,
        if_statement,
        while_statement,
        print_statement,
        assignment,
    ))
    .parse_next(i)
}

fn declaration(i: &mut Tokens<'_>) -> winnow::Result<Rc<AstNode>> {
    let decl_type = one_of(|t: &Token| matches!(t.kind, TokenKind::Int | TokenKind::StringKw))
        .parse_next(i)?
        .clone();
    let identifiers: Vec<Token> = separated(1.., identifier, tok(TokenKind::Comma))
        .context(StrContext::Label("declaration"))
        .context(StrContext::Expected(StrContextValue::Description(
            "identifier",
        )))
        .parse_next(i)?;
    let init = opt(preceded(tok(TokenKind::Assign), expression)).parse_next(i)?;
    semicolon(i)?;
    Ok(Rc::new(AstNode::Decl {
        decl_type,
        identifiers,
        init,
    }))
}

fn assignment(i: &mut Tokens<'_>) -> winnow::Result<Rc<AstNode>> {
    let identifier = identifier.parse_next(i)?;
    tok(TokenKind::Assign)
        .context(StrContext::Label("assignment"))
        .context(StrContext::Expected(StrContextValue::StringLiteral("=")))
        .parse_next(i)?;
    let expr = expression.parse_next(i)?;
    semicolon(i)?;
    Ok(Rc::new(AstNode::Assign { identifier, expr }))
}

fn print_statement(i: &mut Tokens<'_>) -> winnow::Result<Rc<AstNode>> {
    let keyword = one_of(|t: &Token| matches!(t.kind, TokenKind::Print | TokenKind::Prints))
        .parse_next(i)?
        .kind;
    tok(TokenKind::OpenParen)
        .context(StrContext::Label("print"))
        .context(StrContext::Expected(StrContextValue::StringLiteral("(")))
        .parse_next(i)?;

    // A bare string literal prints as a string regardless of the keyword;
    // an expression prints as whatever the keyword asks for.
    let node = alt((
        terminated(
            string_lit,
            (tok(TokenKind::CloseParen), tok(TokenKind::Semicolon)),
        )
        .map(|t| AstNode::Print {
            kind: PrintKind::Str,
            expr: None,
            literal: t.value,
        }),
        terminated(
            expression,
            (tok(TokenKind::CloseParen), tok(TokenKind::Semicolon)),
        )
        .map(move |expr| AstNode::Print {
            kind: if keyword == TokenKind::Prints {
                PrintKind::Str
            } else {
                PrintKind::Int
            },
            expr: Some(expr),
            literal: String::new(),
        }),
    ))
    .context(StrContext::Label("print"))
    .context(StrContext::Expected(StrContextValue::Description(
        "printable value",
    )))
    .parse_next(i)?;

    Ok(Rc::new(node))
}

fn if_statement(i: &mut Tokens<'_>) -> winnow::Result<Rc<AstNode>> {
    tok(TokenKind::If).parse_next(i)?;
    let condition = delimited(
        open_paren,
        condition,
        tok(TokenKind::CloseParen)
            .context(StrContext::Label("if"))
            .context(StrContext::Expected(StrContextValue::StringLiteral(")"))),
    )
    .parse_next(i)?;
    let then_body = block.parse_next(i)?;
    let else_body = opt(preceded(tok(TokenKind::Else), block)).parse_next(i)?;
    Ok(Rc::new(AstNode::If {
        condition,
        then_body,
        else_body,
    }))
}

fn while_statement(i: &mut Tokens<'_>) -> winnow::Result<Rc<AstNode>> {
    tok(TokenKind::While).parse_next(i)?;
    let condition = delimited(
        open_paren,
        condition,
        tok(TokenKind::CloseParen)
            .context(StrContext::Label("while"))
            .context(StrContext::Expected(StrContextValue::StringLiteral(")"))),
    )
    .parse_next(i)?;
    let body = block.parse_next(i)?;
    Ok(Rc::new(AstNode::While { condition, body }))
}

fn condition(i: &mut Tokens<'_>) -> winnow::Result<Rc<AstNode>> {
    let left = expression.parse_next(i)?;
    let cmp = any
        .verify_map(|t: &Token| (t.kind == TokenKind::Comparison).then(|| t.clone()))
        .context(StrContext::Label("condition"))
        .context(StrContext::Expected(StrContextValue::Description(
            "comparison operator",
        )))
        .parse_next(i)?;
    let right = expression.parse_next(i)?;
    Ok(Rc::new(AstNode::Condition { left, cmp, right }))
}

fn block(i: &mut Tokens<'_>) -> winnow::Result<Rc<AstNode>> {
    delimited(
        tok(TokenKind::OpenBrace)
            .context(StrContext::Label("block"))
            .context(StrContext::Expected(StrContextValue::StringLiteral("{"))),
        repeat(0.., statement).map(fold_seq),
        tok(TokenKind::CloseBrace)
            .context(StrContext::Label("block"))
            .context(StrContext::Expected(StrContextValue::StringLiteral("}"))),
    )
    .parse_next(i)
}

fn expression(i: &mut Tokens<'_>) -> winnow::Result<Rc<AstNode>> {
    let init = term.parse_next(i)?;
    repeat(0.., (arith_op(&["+", "-"]), term))
        .fold(
            move || Rc::clone(&init),
            |left, (op, right)| Rc::new(AstNode::BinOp { left, op, right }),
        )
        .parse_next(i)
}

fn term(i: &mut Tokens<'_>) -> winnow::Result<Rc<AstNode>> {
    let init = factor.parse_next(i)?;
    repeat(0.., (arith_op(&["*", "/"]), factor))
        .fold(
            move || Rc::clone(&init),
            |left, (op, right)| Rc::new(AstNode::BinOp { left, op, right }),
        )
        .parse_next(i)
}

fn factor(i: &mut Tokens<'_>) -> winnow::Result<Rc<AstNode>> {
    alt((
        number.map(|t| Rc::new(AstNode::Number(t))),
        negative_number,
        identifier.map(|t| Rc::new(AstNode::Identifier(t))),
        string_lit.map(|t| Rc::new(AstNode::StringLiteral(t))),
        delimited(open_paren, expression, tok(TokenKind::CloseParen)),
    ))
    .context(StrContext::Label("factor"))
    .context(StrContext::Expected(StrContextValue::Description(
        "expression",
    )))
    .parse_next(i)
}

/// Unary minus folds into the number token itself.
fn negative_number(i: &mut Tokens<'_>) -> winnow::Result<Rc<AstNode>> {
    let minus = arith_op(&["-"]).parse_next(i)?;
    let number = number.parse_next(i)?;
    Ok(Rc::new(AstNode::Number(Token::new(
        TokenKind::Number,
        format!("-{}", number.value),
        minus.line,
    ))))
}

fn tok<'i>(
    kind: TokenKind,
) -> impl Parser<Tokens<'i>, &'i Token, winnow::error::ContextError> {
    one_of(move |t: &Token| t.kind == kind)
}

fn arith_op<'i>(
    ops: &'static [&'static str],
) -> impl Parser<Tokens<'i>, Token, winnow::error::ContextError> {
    any.verify_map(move |t: &Token| {
        (t.kind == TokenKind::Arith && ops.contains(&t.value.as_str())).then(|| t.clone())
    })
}

fn identifier(i: &mut Tokens<'_>) -> winnow::Result<Token> {
    any.verify_map(|t: &Token| (t.kind == TokenKind::Identifier).then(|| t.clone()))
        .parse_next(i)
}

fn number(i: &mut Tokens<'_>) -> winnow::Result<Token> {
    any.verify_map(|t: &Token| (t.kind == TokenKind::Number).then(|| t.clone()))
        .parse_next(i)
}

fn string_lit(i: &mut Tokens<'_>) -> winnow::Result<Token> {
    any.verify_map(|t: &Token| (t.kind == TokenKind::StringLit).then(|| t.clone()))
        .parse_next(i)
}

fn open_paren(i: &mut Tokens<'_>) -> winnow::Result<()> {
    tok(TokenKind::OpenParen)
        .void()
        .context(StrContext::Expected(StrContextValue::StringLiteral("(")))
        .parse_next(i)
}

fn semicolon(i: &mut Tokens<'_>) -> winnow::Result<()> {
    tok(TokenKind::Semicolon)
        .void()
        .context(StrContext::Expected(StrContextValue::StringLiteral(";")))
        .parse_next(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::format_tree;
    use crate::lexer::lex;
    use pretty_assertions::assert_eq;

    fn parse_source(input: &str) -> Result<Rc<AstNode>, ParserError> {
        let tokens = lex(input).expect("lexing should succeed");
        parse(&tokens)
    }

    #[test]
    fn test_parse_declaration_with_init() {
        let ast = parse_source("int x = 2 + 3;").unwrap();
        assert_eq!(
            *ast,
            AstNode::Seq {
                left: Some(Rc::new(AstNode::Decl {
                    decl_type: Token::new(TokenKind::Int, "int", 1),
                    identifiers: vec![Token::new(TokenKind::Identifier, "x", 1)],
                    init: Some(Rc::new(AstNode::BinOp {
                        left: Rc::new(AstNode::Number(Token::new(TokenKind::Number, "2", 1))),
                        op: Token::new(TokenKind::Arith, "+", 1),
                        right: Rc::new(AstNode::Number(Token::new(TokenKind::Number, "3", 1))),
                    })),
                })),
                right: None,
            }
        );
    }

    #[test]
    fn test_parse_multi_declaration() {
        let ast = parse_source("int a, b, c;").unwrap();
        assert_eq!(
            *ast,
            AstNode::Seq {
                left: Some(Rc::new(AstNode::Decl {
                    decl_type: Token::new(TokenKind::Int, "int", 1),
                    identifiers: vec![
                        Token::new(TokenKind::Identifier, "a", 1),
                        Token::new(TokenKind::Identifier, "b", 1),
                        Token::new(TokenKind::Identifier, "c", 1),
                    ],
                    init: None,
                })),
                right: None,
            }
        );
    }

    #[test]
    fn test_parse_precedence() {
        let ast = parse_source("x = 1 + 2 * 3;").unwrap();
        assert_eq!(
            format_tree(&ast),
            "\
└── Seq
    └── Assignment
        └── BinOp (+)
            ├── Number: 1
            └── BinOp (*)
                ├── Number: 2
                └── Number: 3
"
        );
    }

    #[test]
    fn test_parse_left_associativity() {
        let ast = parse_source("x = 10 - 4 - 3;").unwrap();
        assert_eq!(
            format_tree(&ast),
            "\
└── Seq
    └── Assignment
        └── BinOp (-)
            ├── BinOp (-)
            │   ├── Number: 10
            │   └── Number: 4
            └── Number: 3
"
        );
    }

    #[test]
    fn test_parse_if_else() {
        let ast = parse_source("if (a == 1) { print(a); } else { print(0); }").unwrap();
        assert_eq!(
            format_tree(&ast),
            "\
└── Seq
    └── If
        ├── Condition (==)
        │   ├── Identifier: a
        │   └── Number: 1
        ├── Seq
        │   └── Print(int)
        │       └── Identifier: a
        └── Seq
            └── Print(int)
                └── Number: 0
"
        );
    }

    #[test]
    fn test_parse_while() {
        let ast = parse_source("while (i < 10) { i = i + 1; }").unwrap();
        assert_eq!(
            format_tree(&ast),
            "\
└── Seq
    └── While
        ├── Condition (<)
        │   ├── Identifier: i
        │   └── Number: 10
        └── Seq
            └── Assignment
                └── BinOp (+)
                    ├── Identifier: i
                    └── Number: 1
"
        );
    }

    #[test]
    fn test_parse_print_literal_is_a_string_print() {
        let ast = parse_source(r#"print("hello");"#).unwrap();
        assert_eq!(
            *ast,
            AstNode::Seq {
                left: Some(Rc::new(AstNode::Print {
                    kind: PrintKind::Str,
                    expr: None,
                    literal: "hello".to_string(),
                })),
                right: None,
            }
        );
    }

    #[test]
    fn test_parse_prints_variable() {
        let ast = parse_source("prints(message);").unwrap();
        assert_eq!(
            *ast,
            AstNode::Seq {
                left: Some(Rc::new(AstNode::Print {
                    kind: PrintKind::Str,
                    expr: Some(Rc::new(AstNode::Identifier(Token::new(
                        TokenKind::Identifier,
                        "message",
                        1
                    )))),
                    literal: String::new(),
                })),
                right: None,
            }
        );
    }

    #[test]
    fn test_parse_negative_number() {
        let ast = parse_source("int x = -5;").unwrap();
        assert_eq!(
            *ast,
            AstNode::Seq {
                left: Some(Rc::new(AstNode::Decl {
                    decl_type: Token::new(TokenKind::Int, "int", 1),
                    identifiers: vec![Token::new(TokenKind::Identifier, "x", 1)],
                    init: Some(Rc::new(AstNode::Number(Token::new(
                        TokenKind::Number,
                        "-5",
                        1
                    )))),
                })),
                right: None,
            }
        );
    }

    #[test]
    fn test_parse_statement_sequence_is_right_nested() {
        let ast = parse_source("int a;\nint b;\nint c;").unwrap();
        assert_eq!(
            format_tree(&ast),
            "\
└── Seq
    ├── Declaration (int)
    └── Seq
        ├── Declaration (int)
        └── Seq
            └── Declaration (int)
"
        );
    }

    #[test]
    fn test_parse_empty_input() {
        let ast = parse_source("").unwrap();
        assert_eq!(
            *ast,
            AstNode::Seq {
                left: None,
                right: None,
            }
        );
    }

    #[test]
    fn test_parse_error_missing_semicolon() {
        // The statement never completes, so nothing is consumed and the
        // error points at the start of the offending statement.
        let err = parse_source("int x = 1").unwrap_err();
        assert!(
            err.message.contains("line 1"),
            "unexpected message: {}",
            err.message
        );
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = parse_source("int x;\nx = ;\n").unwrap_err();
        assert!(
            err.message.contains("line 2"),
            "unexpected message: {}",
            err.message
        );
    }

    #[test]
    fn test_parse_error_condition_without_comparison() {
        assert!(parse_source("if (a) { print(a); }").is_err());
    }
}
