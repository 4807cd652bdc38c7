//! Expressions as the memory engine understands them.
//!
//! The compiler only lexes expressions to find their placeholders; the
//! engine is where operators get their meaning. Condition, filter and
//! key-condition expressions share one grammar. Update and projection
//! expressions have their own entry points.

pub mod ast;
pub mod eval;
pub mod parser;

pub use ast::{AttributePath, CompareOp, Expr, Operand, PathElement, UpdateExpr};
pub use eval::EvalContext;
pub use parser::{parse_condition, parse_projection, parse_update};

/// Errors produced while parsing or evaluating an expression.
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    /// The parser met a token it cannot use here.
    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        /// What the grammar allows at this point.
        expected: String,
        /// What the input holds.
        found: String,
    },
    /// The expression ended early.
    #[error("Unexpected end of expression")]
    UnexpectedEof,
    /// A `#name` placeholder has no entry in the attribute-name map.
    #[error("An expression attribute name used in the document path is not defined; attribute name: {name}")]
    UnresolvedName {
        /// The placeholder, marker included.
        name: String,
    },
    /// A `:value` placeholder has no entry in the attribute-value map.
    #[error("An expression attribute value used in expression is not defined; attribute value: {name}")]
    UnresolvedValue {
        /// The placeholder, marker included.
        name: String,
    },
    /// An operand does not fit the operator or function applied to it.
    #[error("Invalid operand for {operation}: {message}")]
    InvalidOperand {
        /// The operator or function.
        operation: String,
        /// What is wrong with the operand.
        message: String,
    },
    /// Operand types do not match.
    #[error("Type mismatch: {message}")]
    TypeMismatch {
        /// What did not match.
        message: String,
    },
}
