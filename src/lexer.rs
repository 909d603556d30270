//! Lexer for the source language.
//!
//! Produces a flat token stream; every token carries its kind, the exact
//! source text it covers, and the 1-based line it starts on.

use line_numbers::LinePositions;
use std::ops::Range;
use thiserror::Error;
use winnow::ascii::{digit1, multispace1};
use winnow::combinator::{alt, delimited, not, repeat, terminated};
use winnow::prelude::*;
use winnow::stream::AsChar;
use winnow::token::{one_of, take_till, take_while};
use winnow::LocatingSlice;

#[derive(Debug, PartialEq, Error)]
#[error("Lexer error: {message}")]
pub struct LexerError {
    message: String,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum TokenKind {
    If,
    Else,
    While,
    Int,
    StringKw,
    Print,
    Prints,
    Assign,     // =
    Comparison, // == != < <= > >=
    Arith,      // + - * /
    OpenParen,  // (
    CloseParen, // )
    OpenBrace,  // {
    CloseBrace, // }
    Semicolon,  // ;
    Comma,      // ,
    Identifier,
    Number,
    StringLit,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) value: String,
    pub(crate) line: usize,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, value: impl Into<String>, line: usize) -> Self {
        Token {
            kind,
            value: value.into(),
            line,
        }
    }
}

pub(crate) fn lex(input: &str) -> Result<Vec<Token>, LexerError> {
    let line_positions = LinePositions::from(input);
    let raw = tokens
        .parse(LocatingInput::new(input))
        .map_err(|e| LexerError {
            message: e.to_string(),
        })?;

    Ok(raw
        .into_iter()
        .map(|(kind, value, span)| {
            let line = line_positions.from_offset(span.start);
            Token {
                kind,
                value,
                line: line.0 as usize + 1,
            }
        })
        .collect())
}

type LocatingInput<'a> = LocatingSlice<&'a str>;

type RawToken = (TokenKind, String, Range<usize>);

fn tokens(input: &mut LocatingInput<'_>) -> winnow::Result<Vec<RawToken>> {
    let tokens = repeat(0.., token).parse_next(input);
    trivia.parse_next(input)?;
    tokens
}

fn token(input: &mut LocatingInput<'_>) -> winnow::Result<RawToken> {
    trivia.parse_next(input)?;
    alt((string_literal, word, number, operator, punctuation))
        .with_span()
        .map(|((kind, value), span)| (kind, value, span))
        .parse_next(input)
}

/// Whitespace and `//` line comments.
fn trivia(input: &mut LocatingInput<'_>) -> winnow::Result<()> {
    repeat(0.., alt((multispace1.void(), line_comment))).parse_next(input)
}

fn line_comment(input: &mut LocatingInput<'_>) -> winnow::Result<()> {
    ("//", take_till(0.., '\n')).void().parse_next(input)
}

fn word(input: &mut LocatingInput<'_>) -> winnow::Result<(TokenKind, String)> {
    let text = (
        take_while(1, |c: char| c.is_alpha() || c == '_'),
        take_while(0.., |c: char| c.is_alphanum() || c == '_'),
    )
        .take()
        .parse_next(input)?;

    let kind = match text {
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "int" => TokenKind::Int,
        "string" => TokenKind::StringKw,
        "print" => TokenKind::Print,
        "prints" => TokenKind::Prints,
        _ => TokenKind::Identifier,
    };
    Ok((kind, text.to_string()))
}

fn number(input: &mut LocatingInput<'_>) -> winnow::Result<(TokenKind, String)> {
    // Look ahead: the next character must not be a word character.
    terminated(
        digit1,
        not(one_of(|c: char| c.is_alphanum() || c == '_')), // \b
    )
    .map(|digits: &str| (TokenKind::Number, digits.to_string()))
    .parse_next(input)
}

/// A quoted literal; the value excludes the quotes. No escape sequences.
fn string_literal(input: &mut LocatingInput<'_>) -> winnow::Result<(TokenKind, String)> {
    delimited('"', take_till(0.., ['"', '\n']), '"')
        .map(|text: &str| (TokenKind::StringLit, text.to_string()))
        .parse_next(input)
}

fn operator(input: &mut LocatingInput<'_>) -> winnow::Result<(TokenKind, String)> {
    // longer operators first
    alt(("==", "!=", "<=", ">=", "<", ">", "=", "+", "-", "*", "/"))
        .map(|op: &str| {
            let kind = match op {
                "==" | "!=" | "<=" | ">=" | "<" | ">" => TokenKind::Comparison,
                "=" => TokenKind::Assign,
                _ => TokenKind::Arith,
            };
            (kind, op.to_string())
        })
        .parse_next(input)
}

fn punctuation(input: &mut LocatingInput<'_>) -> winnow::Result<(TokenKind, String)> {
    one_of(['(', ')', '{', '}', ';', ','])
        .map(|c: char| {
            let kind = match c {
                '(' => TokenKind::OpenParen,
                ')' => TokenKind::CloseParen,
                '{' => TokenKind::OpenBrace,
                '}' => TokenKind::CloseBrace,
                ';' => TokenKind::Semicolon,
                _ => TokenKind::Comma,
            };
            (kind, c.to_string())
        })
        .parse_next(input)
}
