//! Lexer and recursive-descent parser.
//!
//! Keywords and function names match case-insensitively. Precedence, from
//! loosest to tightest: `OR`, `AND`, `NOT`, then comparisons, `BETWEEN`,
//! `IN` and function calls.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use super::ExpressionError;
use super::ast::{
    AttributePath, CompareOp, Expr, FunctionName, Operand, PathElement, PathValue, SetAction,
    SetValue, UpdateExpr,
};

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    NamePlaceholder(String),
    ValuePlaceholder(String),
    Index(usize),
    Compare(CompareOp),
    Plus,
    Minus,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    And,
    Or,
    Not,
    Between,
    In,
    Set,
    Remove,
    Add,
    Delete,
    Function(FunctionName),
    Size,
    IfNotExists,
    ListAppend,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(s) => write!(f, "identifier '{s}'"),
            Self::NamePlaceholder(s) | Self::ValuePlaceholder(s) => f.write_str(s),
            Self::Index(n) => write!(f, "{n}"),
            Self::Compare(op) => write!(f, "'{op}'"),
            Self::Plus => f.write_str("'+'"),
            Self::Minus => f.write_str("'-'"),
            Self::Dot => f.write_str("'.'"),
            Self::Comma => f.write_str("','"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::LBracket => f.write_str("'['"),
            Self::RBracket => f.write_str("']'"),
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
            Self::Not => f.write_str("NOT"),
            Self::Between => f.write_str("BETWEEN"),
            Self::In => f.write_str("IN"),
            Self::Set => f.write_str("SET"),
            Self::Remove => f.write_str("REMOVE"),
            Self::Add => f.write_str("ADD"),
            Self::Delete => f.write_str("DELETE"),
            Self::Function(name) => write!(f, "{name}"),
            Self::Size => f.write_str("size"),
            Self::IfNotExists => f.write_str("if_not_exists"),
            Self::ListAppend => f.write_str("list_append"),
            Self::Eof => f.write_str("end of expression"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, ExpressionError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn bump(&mut self, token: Token) -> Token {
        self.chars.next();
        token
    }

    fn next_token(&mut self) -> Result<Token, ExpressionError> {
        while self.chars.peek().is_some_and(char::is_ascii_whitespace) {
            self.chars.next();
        }
        let Some(&ch) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        Ok(match ch {
            '#' | ':' => {
                self.chars.next();
                let ident = self.ident();
                if ident.is_empty() {
                    return Err(ExpressionError::UnexpectedToken {
                        expected: format!("placeholder name after '{ch}'"),
                        found: "nothing".to_owned(),
                    });
                }
                let text = format!("{ch}{ident}");
                if ch == '#' {
                    Token::NamePlaceholder(text)
                } else {
                    Token::ValuePlaceholder(text)
                }
            }
            '=' => self.bump(Token::Compare(CompareOp::Eq)),
            '<' => {
                self.chars.next();
                match self.chars.peek() {
                    Some('=') => self.bump(Token::Compare(CompareOp::Le)),
                    Some('>') => self.bump(Token::Compare(CompareOp::Ne)),
                    _ => Token::Compare(CompareOp::Lt),
                }
            }
            '>' => {
                self.chars.next();
                match self.chars.peek() {
                    Some('=') => self.bump(Token::Compare(CompareOp::Ge)),
                    _ => Token::Compare(CompareOp::Gt),
                }
            }
            '+' => self.bump(Token::Plus),
            '-' => self.bump(Token::Minus),
            '.' => self.bump(Token::Dot),
            ',' => self.bump(Token::Comma),
            '(' => self.bump(Token::LParen),
            ')' => self.bump(Token::RParen),
            '[' => self.bump(Token::LBracket),
            ']' => self.bump(Token::RBracket),
            c if c.is_ascii_digit() => {
                let digits = self.ident();
                let index = digits.parse().map_err(|_| ExpressionError::InvalidOperand {
                    operation: "list index".to_owned(),
                    message: format!("'{digits}' is not a valid index"),
                })?;
                Token::Index(index)
            }
            c if c.is_ascii_alphabetic() || c == '_' => keyword(self.ident()),
            other => {
                return Err(ExpressionError::UnexpectedToken {
                    expected: "a token".to_owned(),
                    found: format!("'{other}'"),
                });
            }
        })
    }

    fn ident(&mut self) -> String {
        let mut s = String::new();
        while let Some(&c) = self.chars.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            s.push(c);
            self.chars.next();
        }
        s
    }
}

fn keyword(ident: String) -> Token {
    match ident.to_ascii_lowercase().as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "between" => Token::Between,
        "in" => Token::In,
        "set" => Token::Set,
        "remove" => Token::Remove,
        "add" => Token::Add,
        "delete" => Token::Delete,
        "attribute_exists" => Token::Function(FunctionName::AttributeExists),
        "attribute_not_exists" => Token::Function(FunctionName::AttributeNotExists),
        "attribute_type" => Token::Function(FunctionName::AttributeType),
        "begins_with" => Token::Function(FunctionName::BeginsWith),
        "contains" => Token::Function(FunctionName::Contains),
        "size" => Token::Size,
        "if_not_exists" => Token::IfNotExists,
        "list_append" => Token::ListAppend,
        _ => Token::Identifier(ident),
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self, ExpressionError> {
        Ok(Self {
            tokens: Lexer::new(input).tokenize()?,
            pos: 0,
        })
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), ExpressionError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn unexpected(&self, expected: &str) -> ExpressionError {
        match self.peek() {
            Token::Eof => ExpressionError::UnexpectedEof,
            found => ExpressionError::UnexpectedToken {
                expected: expected.to_owned(),
                found: found.to_string(),
            },
        }
    }

    fn finish(&self) -> Result<(), ExpressionError> {
        match self.peek() {
            Token::Eof => Ok(()),
            found => Err(ExpressionError::UnexpectedToken {
                expected: "end of expression".to_owned(),
                found: found.to_string(),
            }),
        }
    }

    /// Parses `item (, item)*`.
    fn list<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<T, ExpressionError>,
    ) -> Result<Vec<T>, ExpressionError> {
        let mut items = vec![item(self)?];
        while self.eat(&Token::Comma) {
            items.push(item(self)?);
        }
        Ok(items)
    }
}

// -- Conditions --

impl Parser {
    fn or_expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.and_expr()?;
        while self.eat(&Token::Or) {
            left = Expr::Or(Box::new(left), Box::new(self.and_expr()?));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.not_expr()?;
        while self.eat(&Token::And) {
            left = Expr::And(Box::new(left), Box::new(self.not_expr()?));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.not_expr()?)));
        }
        self.primary_expr()
    }

    fn primary_expr(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat(&Token::LParen) {
            let inner = self.or_expr()?;
            self.expect(&Token::RParen)?;
            return Ok(inner);
        }
        if let Token::Function(name) = *self.peek() {
            self.advance();
            self.expect(&Token::LParen)?;
            let args = self.list(Self::operand)?;
            self.expect(&Token::RParen)?;
            if args.len() != name.arity() {
                return Err(ExpressionError::InvalidOperand {
                    operation: name.to_string(),
                    message: format!("expected {} arguments, got {}", name.arity(), args.len()),
                });
            }
            return Ok(Expr::Function { name, args });
        }

        let value = self.operand()?;
        match self.advance() {
            Token::Compare(op) => Ok(Expr::Compare {
                left: value,
                op,
                right: self.operand()?,
            }),
            Token::Between => {
                let low = self.operand()?;
                self.expect(&Token::And)?;
                let high = self.operand()?;
                Ok(Expr::Between { value, low, high })
            }
            Token::In => {
                self.expect(&Token::LParen)?;
                let list = self.list(Self::operand)?;
                self.expect(&Token::RParen)?;
                Ok(Expr::In { value, list })
            }
            _ => {
                self.pos -= 1;
                Err(self.unexpected("comparator, BETWEEN or IN"))
            }
        }
    }

    fn operand(&mut self) -> Result<Operand, ExpressionError> {
        match self.peek().clone() {
            Token::ValuePlaceholder(name) => {
                self.advance();
                Ok(Operand::Value(name))
            }
            Token::Size => {
                self.advance();
                self.expect(&Token::LParen)?;
                let path = self.path()?;
                self.expect(&Token::RParen)?;
                Ok(Operand::Size(path))
            }
            _ => self.path().map(Operand::Path),
        }
    }

    fn path(&mut self) -> Result<AttributePath, ExpressionError> {
        let mut elements = vec![self.path_name()?];
        loop {
            if self.eat(&Token::Dot) {
                elements.push(self.path_name()?);
            } else if self.eat(&Token::LBracket) {
                let Token::Index(index) = self.advance() else {
                    self.pos -= 1;
                    return Err(self.unexpected("list index"));
                };
                self.expect(&Token::RBracket)?;
                elements.push(PathElement::Index(index));
            } else {
                return Ok(AttributePath { elements });
            }
        }
    }

    fn path_name(&mut self) -> Result<PathElement, ExpressionError> {
        match self.advance() {
            Token::Identifier(name) | Token::NamePlaceholder(name) => {
                Ok(PathElement::Attribute(name))
            }
            _ => {
                self.pos -= 1;
                Err(self.unexpected("attribute name or #name"))
            }
        }
    }
}

// -- Updates --

impl Parser {
    fn update_expr(&mut self) -> Result<UpdateExpr, ExpressionError> {
        let mut update = UpdateExpr::default();
        loop {
            match self.advance() {
                Token::Set => update.set.extend(self.list(Self::set_action)?),
                Token::Remove => update.remove.extend(self.list(Self::path)?),
                Token::Add => update.add.extend(self.list(Self::path_value)?),
                Token::Delete => update.delete.extend(self.list(Self::path_value)?),
                Token::Eof if !update.is_empty() => return Ok(update),
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected("SET, REMOVE, ADD or DELETE"));
                }
            }
        }
    }

    fn set_action(&mut self) -> Result<SetAction, ExpressionError> {
        let path = self.path()?;
        self.expect(&Token::Compare(CompareOp::Eq))?;
        Ok(SetAction {
            path,
            value: self.set_value()?,
        })
    }

    fn set_value(&mut self) -> Result<SetValue, ExpressionError> {
        if self.eat(&Token::IfNotExists) {
            self.expect(&Token::LParen)?;
            let path = self.path()?;
            self.expect(&Token::Comma)?;
            let default = self.operand()?;
            self.expect(&Token::RParen)?;
            return Ok(SetValue::IfNotExists(path, default));
        }
        if self.eat(&Token::ListAppend) {
            self.expect(&Token::LParen)?;
            let first = self.operand()?;
            self.expect(&Token::Comma)?;
            let second = self.operand()?;
            self.expect(&Token::RParen)?;
            return Ok(SetValue::ListAppend(first, second));
        }

        let first = self.operand()?;
        if self.eat(&Token::Plus) {
            Ok(SetValue::Plus(first, self.operand()?))
        } else if self.eat(&Token::Minus) {
            Ok(SetValue::Minus(first, self.operand()?))
        } else {
            Ok(SetValue::Operand(first))
        }
    }

    fn path_value(&mut self) -> Result<PathValue, ExpressionError> {
        let path = self.path()?;
        Ok(PathValue {
            path,
            value: self.operand()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parses a condition, filter or key-condition expression.
///
/// # Errors
///
/// Returns `ExpressionError` if the text is not a valid condition.
pub fn parse_condition(input: &str) -> Result<Expr, ExpressionError> {
    let mut parser = Parser::new(input)?;
    let expr = parser.or_expr()?;
    parser.finish()?;
    Ok(expr)
}

/// Parses an update expression.
///
/// # Errors
///
/// Returns `ExpressionError` if the text is not a valid update or has no
/// actions.
pub fn parse_update(input: &str) -> Result<UpdateExpr, ExpressionError> {
    Parser::new(input)?.update_expr()
}

/// Parses a projection expression: comma-separated document paths.
///
/// # Errors
///
/// Returns `ExpressionError` if the text is not a list of paths.
pub fn parse_projection(input: &str) -> Result<Vec<AttributePath>, ExpressionError> {
    let mut parser = Parser::new(input)?;
    let paths = parser.list(Parser::path)?;
    parser.finish()?;
    Ok(paths)
}
