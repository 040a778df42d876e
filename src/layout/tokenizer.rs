//! logos-based tokenizer for the layout constraint language.
//!
//! Token priority in logos is determined by:
//! 1. Longest match wins (e.g. `id:header` as LayoutId beats `id` as Ident)
//! 2. For equal length matches, earlier-defined variants win
//!
//! Our ordering ensures:
//! - `==` matches [`Token::EqualEqual`], not two `Assign`s
//! - `:lt` matches [`Token::RelationKeyword`], not `Colon` + `Ident`
//! - `id:header` matches [`Token::LayoutId`], not `Ident` + `RelationKeyword`

use logos::Logos;

use crate::layout::model::LayoutError;

/// Constraint-language token produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\n\r\f]+")]
pub enum Token {
    // ── Compound tokens (longer matches, defined first) ──────────────

    /// `==`
    #[token("==")]
    EqualEqual,

    /// `<=`
    #[token("<=")]
    LessEqual,

    /// `>=`
    #[token(">=")]
    GreaterEqual,

    /// Layout id reference: `id:header`.
    #[regex(r"id:[a-zA-Z_][a-zA-Z0-9_]*")]
    LayoutId,

    /// Colon-prefixed relation keyword: `:eq`, `:lt`, `:gte`, ...
    #[regex(r":[a-zA-Z]+")]
    RelationKeyword,

    /// Number: integer or float, possibly negative.
    #[regex(r"-?[0-9]+(\.[0-9]+)?")]
    Number,

    /// Identifier: `super`, field names, anchors, modifiers, priorities.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    // ── Single-character punctuation ─────────────────────────────────

    /// `=` (field capture)
    #[token("=")]
    Assign,

    /// `.`
    #[token(".")]
    Dot,

    /// `@`
    #[token("@")]
    At,

    /// `(`
    #[token("(")]
    ParenOpen,

    /// `)`
    #[token(")")]
    ParenClose,

    /// `:`
    #[token(":")]
    Colon,

    /// `,`
    #[token(",")]
    Comma,

    /// `;`
    #[token(";")]
    Semicolon,
}

/// A token with its source text and byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub text: String,
    pub offset: usize,
}

/// Tokenize a constraint attribute value.
///
/// Unlike the permissive CSS lexers, any character the lexer cannot match is
/// an error: a typo in a layout attribute must not silently change the layout.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, LayoutError> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        let text = input[span.clone()].to_string();
        match result {
            Ok(token) => tokens.push(Spanned {
                token,
                text,
                offset: span.start,
            }),
            Err(()) => {
                return Err(LayoutError::UnexpectedCharacter {
                    fragment: text,
                    position: span.start,
                });
            }
        }
    }
    Ok(tokens)
}
