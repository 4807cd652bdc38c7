//! Expression handling: placeholder lexing, attribute-slot construction and
//! primary-key construction.

pub mod attributes;
pub mod key;
pub mod lexer;

pub use attributes::{ExpressionAttributes, ExpressionAttributesFactory};
pub use key::KeyAttributeConstructor;
pub use lexer::{ParsedExpression, SyntaxError, Token};

/// Marker of an attribute-name placeholder (`#name`).
pub const NAME_MARKER: char = '#';

/// Marker of a value placeholder (`:value`).
pub const VALUE_MARKER: char = ':';

/// Returns `true` if `name` is a well-formed placeholder: a marker followed by
/// one or more identifier characters.
#[must_use]
pub fn is_placeholder_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(NAME_MARKER | VALUE_MARKER))
        && !chars.as_str().is_empty()
        && chars.all(lexer::is_ident_continue)
}

/// Strips the marker from a placeholder.
#[must_use]
pub fn strip_marker(placeholder: &str) -> &str {
    placeholder
        .strip_prefix(NAME_MARKER)
        .or_else(|| placeholder.strip_prefix(VALUE_MARKER))
        .unwrap_or(placeholder)
}
