//! Placeholder lexer.
//!
//! The compiler does not interpret expressions; it only needs to find the
//! placeholders in them. The lexer therefore splits an expression into runs
//! of literal text and the two placeholder kinds, and concatenating the
//! tokens reproduces the input exactly. Operators and keywords stay inside
//! literals and reach the storage engine untouched.
//!
//! Lexing still rejects text no storage expression can contain: characters
//! outside the expression alphabet, a marker with no name after it, and
//! unbalanced parentheses or brackets.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use super::{NAME_MARKER, VALUE_MARKER};

/// Lexing failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct SyntaxError {
    /// Byte offset of the problem.
    pub offset: usize,
    /// What is wrong.
    pub message: String,
}

/// One lexed piece of an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// Text passed through unchanged.
    Literal(String),
    /// Attribute-name placeholder, marker included (`#name`).
    NamePlaceholder(String),
    /// Value placeholder, marker included (`:value`).
    ValuePlaceholder(String),
}

impl Token {
    /// The token's source text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) | Self::NamePlaceholder(s) | Self::ValuePlaceholder(s) => s,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expression split into tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedExpression {
    text: String,
    tokens: Vec<Token>,
}

impl ParsedExpression {
    /// Lex an expression. Blank text yields an empty token sequence.
    ///
    /// # Errors
    ///
    /// Returns a `SyntaxError` for characters outside the expression
    /// alphabet, a marker without a name, or unbalanced brackets.
    pub fn parse(text: &str) -> Result<Self, SyntaxError> {
        let tokens = if text.trim().is_empty() {
            Vec::new()
        } else {
            Lexer::new(text).tokenize()?
        };
        Ok(Self {
            text: text.to_owned(),
            tokens,
        })
    }

    /// The original text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The tokens in source order.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// `true` when the expression means "no expression".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The text to send to the engine, or `None` for a blank expression.
    #[must_use]
    pub fn to_request_text(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.text.clone())
    }

    /// Distinct name placeholders, in first-occurrence order.
    #[must_use]
    pub fn name_placeholders(&self) -> Vec<&str> {
        self.distinct(|t| matches!(t, Token::NamePlaceholder(_)))
    }

    /// Distinct value placeholders, in first-occurrence order.
    #[must_use]
    pub fn value_placeholders(&self) -> Vec<&str> {
        self.distinct(|t| matches!(t, Token::ValuePlaceholder(_)))
    }

    fn distinct(&self, keep: impl Fn(&Token) -> bool) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for token in self.tokens.iter().filter(|t| keep(t)) {
            if !out.contains(&token.as_str()) {
                out.push(token.as_str());
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    tokens: Vec<Token>,
    literal: String,
    parens: Vec<(char, usize)>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            tokens: Vec::new(),
            literal: String::new(),
            parens: Vec::new(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        while let Some((offset, ch)) = self.chars.next() {
            match ch {
                NAME_MARKER | VALUE_MARKER => self.read_placeholder(offset, ch)?,
                '(' | '[' => {
                    self.parens.push((ch, offset));
                    self.literal.push(ch);
                }
                ')' | ']' => {
                    let open = if ch == ')' { '(' } else { '[' };
                    match self.parens.pop() {
                        Some((c, _)) if c == open => self.literal.push(ch),
                        _ => {
                            return Err(SyntaxError {
                                offset,
                                message: format!("unmatched '{ch}'"),
                            });
                        }
                    }
                }
                c if is_literal_char(c) => self.literal.push(c),
                c => {
                    return Err(SyntaxError {
                        offset,
                        message: format!("unexpected character '{c}'"),
                    });
                }
            }
        }

        if let Some((ch, offset)) = self.parens.pop() {
            return Err(SyntaxError {
                offset,
                message: format!("unclosed '{ch}'"),
            });
        }
        self.flush_literal();
        Ok(self.tokens)
    }

    fn read_placeholder(&mut self, offset: usize, marker: char) -> Result<(), SyntaxError> {
        let mut name = String::from(marker);
        while let Some(&(_, c)) = self.chars.peek() {
            if !is_ident_continue(c) {
                break;
            }
            name.push(c);
            self.chars.next();
        }
        if name.len() == marker.len_utf8() {
            return Err(SyntaxError {
                offset,
                message: format!("expected placeholder name after '{marker}'"),
            });
        }
        self.flush_literal();
        self.tokens.push(if marker == NAME_MARKER {
            Token::NamePlaceholder(name)
        } else {
            Token::ValuePlaceholder(name)
        });
        Ok(())
    }

    fn flush_literal(&mut self) {
        if !self.literal.is_empty() {
            self.tokens
                .push(Token::Literal(std::mem::take(&mut self.literal)));
        }
    }
}

/// Returns `true` if `c` can continue an identifier.
pub(crate) fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_literal_char(c: char) -> bool {
    is_ident_continue(c)
        || c.is_ascii_whitespace()
        || matches!(c, '=' | '<' | '>' | ',' | '.' | '+' | '-')
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn lit(s: &str) -> Token {
        Token::Literal(s.to_owned())
    }

    #[test]
    fn test_should_split_placeholders_from_literals() {
        let expr = ParsedExpression::parse("Author = :author AND #t = :title").unwrap();
        assert_eq!(
            expr.tokens(),
            &[
                lit("Author = "),
                Token::ValuePlaceholder(":author".to_owned()),
                lit(" AND "),
                Token::NamePlaceholder("#t".to_owned()),
                lit(" = "),
                Token::ValuePlaceholder(":title".to_owned()),
            ]
        );
    }

    #[test]
    fn test_should_treat_blank_expression_as_empty() {
        let expr = ParsedExpression::parse("   ").unwrap();
        assert!(expr.is_empty());
        assert_eq!(expr.to_request_text(), None);
        assert!(ParsedExpression::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_should_deduplicate_repeated_placeholders() {
        let expr = ParsedExpression::parse(":v > #a OR (:v < #b AND #a <> :w)").unwrap();
        assert_eq!(expr.value_placeholders(), vec![":v", ":w"]);
        assert_eq!(expr.name_placeholders(), vec!["#a", "#b"]);
    }

    #[test]
    fn test_should_pass_functions_and_paths_through() {
        let text = "attribute_not_exists(Id) AND begins_with(#t, :p) AND tags[0].name = :n";
        let expr = ParsedExpression::parse(text).unwrap();
        let rebuilt: String = expr.tokens().iter().map(Token::as_str).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_should_reject_marker_without_name() {
        let err = ParsedExpression::parse("Id = :").unwrap_err();
        assert_eq!(err.offset, 5);
        assert!(ParsedExpression::parse("# = :v").is_err());
    }

    #[test]
    fn test_should_reject_unbalanced_parentheses() {
        assert!(ParsedExpression::parse("(a = :a").is_err());
        assert!(ParsedExpression::parse("a = :a)").is_err());
        assert!(ParsedExpression::parse("(a[0) = :a]").is_err());
    }

    #[test]
    fn test_should_reject_quoted_literals() {
        let err = ParsedExpression::parse("Author = 'X'").unwrap_err();
        assert!(err.message.contains('\''));
    }

    fn expression_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                "[A-Za-z_][A-Za-z0-9_]{0,6}",
                "[#:][a-z][a-z0-9_]{0,4}",
                Just(" = ".to_owned()),
                Just(" AND ".to_owned()),
                Just(" <> ".to_owned()),
            ],
            0..12,
        )
        .prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn test_should_parse_identically_twice(text in expression_strategy()) {
            let first = ParsedExpression::parse(&text);
            let second = ParsedExpression::parse(&text);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn test_should_reproduce_input_from_tokens(text in expression_strategy()) {
            if let Ok(expr) = ParsedExpression::parse(&text) {
                let rebuilt: String = expr.tokens().iter().map(Token::as_str).collect();
                if !expr.is_empty() {
                    prop_assert_eq!(rebuilt, text);
                }
            }
        }

        #[test]
        fn test_should_list_each_placeholder_once(text in expression_strategy()) {
            if let Ok(expr) = ParsedExpression::parse(&text) {
                let values = expr.value_placeholders();
                let mut unique = values.clone();
                unique.sort_unstable();
                unique.dedup();
                prop_assert_eq!(values.len(), unique.len());
            }
        }
    }
}
