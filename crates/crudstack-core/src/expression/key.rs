//! Primary-key construction.
//!
//! A key expression is a conjunction of `attribute = :placeholder` clauses
//! that together name every key attribute of the table exactly once:
//!
//! ```text
//! Author = :author AND Id = :id
//! #pk = :pk AND #sk = :sk
//! ```
//!
//! The clause structure is checked at registration. At call time each bound
//! value is encoded and type-checked against the table's key schema, and an
//! absent value is an incomplete key.

use std::collections::HashMap;

use crudstack_model::types::ScalarAttributeType;
use crudstack_model::{Item, KeyAttribute, TableSchema};

use crate::argument::Arguments;
use crate::codec::AttributeCodec;
use crate::descriptor::ParamType;
use crate::error::{BindError, CompileError, CrudError};
use crate::expression::attributes::fixed_name;
use crate::expression::{ParsedExpression, Token};
use crate::signature::Signature;

#[derive(Debug, Clone)]
struct KeyBinding {
    attribute: KeyAttribute,
    placeholder: String,
}

/// Builds the primary-key item of Get, Update and Delete requests.
#[derive(Debug, Clone)]
pub struct KeyAttributeConstructor {
    bindings: Vec<KeyBinding>,
}

/// Lexical unit of a key expression.
#[derive(Debug, Clone, PartialEq)]
enum Part {
    Word(String),
    Eq,
    Name(String),
    Value(String),
}

impl KeyAttributeConstructor {
    /// Parses and validates a key expression against the table's key schema.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::MalformedExpression` if the expression is not a
    /// conjunction of equality clauses, `CompileError::UndeclaredPlaceholder`
    /// for an undeclared value placeholder, and
    /// `CompileError::InvalidDescriptor` if the clauses do not name each key
    /// attribute exactly once.
    pub fn new(
        signature: &Signature,
        schema: &TableSchema,
        attribute_names: &HashMap<String, String>,
        expression: &ParsedExpression,
    ) -> Result<Self, CompileError> {
        let operation = signature.name();
        let malformed = |message: &str| CompileError::MalformedExpression {
            operation: operation.to_owned(),
            expression: expression.text().to_owned(),
            message: message.to_owned(),
        };
        let invalid = |message: String| CompileError::InvalidDescriptor {
            operation: operation.to_owned(),
            message,
        };

        let parts = split_parts(expression).ok_or_else(|| {
            malformed("key expressions may only contain attribute names, '=', placeholders and AND")
        })?;

        let mut bindings: Vec<KeyBinding> = Vec::new();
        let mut iter = parts.into_iter();
        loop {
            let attribute = match iter.next() {
                Some(Part::Word(word)) => word,
                Some(Part::Name(placeholder)) => {
                    fixed_name(signature, attribute_names, &placeholder).ok_or_else(|| {
                        invalid(format!(
                            "key expression cannot use name parameter {placeholder}"
                        ))
                    })?
                }
                _ => return Err(malformed("expected a key attribute name")),
            };
            if iter.next() != Some(Part::Eq) {
                return Err(malformed("expected '=' after key attribute name"));
            }
            let Some(Part::Value(placeholder)) = iter.next() else {
                return Err(malformed("expected a value placeholder after '='"));
            };
            if !signature.declares(&placeholder) {
                return Err(CompileError::UndeclaredPlaceholder {
                    operation: operation.to_owned(),
                    placeholder,
                    expression: expression.text().to_owned(),
                });
            }

            let Some(key_attribute) = schema.key_attribute(&attribute) else {
                return Err(invalid(format!(
                    "'{attribute}' is not a key attribute of table {}",
                    schema.table_name
                )));
            };
            if bindings.iter().any(|b| b.attribute.name == attribute) {
                return Err(invalid(format!(
                    "key attribute '{attribute}' bound more than once"
                )));
            }
            bindings.push(KeyBinding {
                attribute: key_attribute.clone(),
                placeholder,
            });

            match iter.next() {
                None => break,
                Some(Part::Word(w)) if w.eq_ignore_ascii_case("AND") => {}
                Some(_) => return Err(malformed("expected AND between key clauses")),
            }
        }

        for (attr, _) in schema.key_attributes() {
            if !bindings.iter().any(|b| b.attribute.name == attr.name) {
                return Err(invalid(format!(
                    "key expression does not bind key attribute '{}' of table {}",
                    attr.name, schema.table_name
                )));
            }
        }

        Ok(Self { bindings })
    }

    /// Value placeholders of the key, in clause order.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        self.bindings.iter().map(|b| b.placeholder.as_str()).collect()
    }

    /// Builds the key item from one call's arguments.
    ///
    /// # Errors
    ///
    /// Returns `BindError::IncompleteKey` if a key attribute's value is
    /// absent and `BindError::ArgumentType` if it does not match the key
    /// attribute's scalar type.
    pub fn create(&self, args: &Arguments<'_>, codec: &dyn AttributeCodec) -> Result<Item, CrudError> {
        let mut key = Item::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let encoded = match args.get(&binding.placeholder) {
                Some(arg) => arg.encode(codec)?,
                None => None,
            };
            let Some(value) = encoded else {
                return Err(BindError::IncompleteKey {
                    operation: args.operation().to_owned(),
                    attribute: binding.attribute.name.clone(),
                }
                .into());
            };
            if value.scalar_type() != Some(binding.attribute.attr_type) {
                return Err(BindError::ArgumentType {
                    operation: args.operation().to_owned(),
                    parameter: binding.placeholder.clone(),
                    expected: param_type_of(binding.attribute.attr_type),
                    actual: format!("attribute {}", value.type_descriptor()),
                }
                .into());
            }
            key.insert(binding.attribute.name.clone(), value);
        }
        Ok(key)
    }
}

fn param_type_of(scalar: ScalarAttributeType) -> ParamType {
    match scalar {
        ScalarAttributeType::S => ParamType::String,
        ScalarAttributeType::N => ParamType::Number,
        ScalarAttributeType::B => ParamType::Binary,
    }
}

/// Re-lexes literal runs into words and `=`; `None` on anything else.
fn split_parts(expression: &ParsedExpression) -> Option<Vec<Part>> {
    let mut parts = Vec::new();
    for token in expression.tokens() {
        match token {
            Token::NamePlaceholder(p) => parts.push(Part::Name(p.clone())),
            Token::ValuePlaceholder(p) => parts.push(Part::Value(p.clone())),
            Token::Literal(text) => {
                let mut word = String::new();
                for c in text.chars() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        word.push(c);
                        continue;
                    }
                    if !word.is_empty() {
                        parts.push(Part::Word(std::mem::take(&mut word)));
                    }
                    match c {
                        '=' => parts.push(Part::Eq),
                        c if c.is_ascii_whitespace() => {}
                        _ => return None,
                    }
                }
                if !word.is_empty() {
                    parts.push(Part::Word(word));
                }
            }
        }
    }
    Some(parts)
}

#[cfg(test)]
mod tests {
    use crudstack_model::{AttributeValue, OperationKind};
    use serde_json::json;

    use super::*;
    use crate::argument::{ArgValue, bind};
    use crate::codec::JsonAttributeCodec;
    use crate::descriptor::{OperationDescriptor, ParameterDescriptor};

    fn book_schema() -> TableSchema {
        TableSchema::composite(
            "Book",
            KeyAttribute::new("Author", ScalarAttributeType::S),
            KeyAttribute::new("Id", ScalarAttributeType::S),
        )
    }

    fn delete_book() -> Signature {
        Signature::new(
            OperationDescriptor::new("deleteBook", OperationKind::Delete, "Book")
                .param(ParameterDescriptor::value(":author", ParamType::String))
                .param(ParameterDescriptor::value(":id", ParamType::String)),
        )
        .unwrap()
    }

    fn constructor(text: &str) -> Result<KeyAttributeConstructor, CompileError> {
        KeyAttributeConstructor::new(
            &delete_book(),
            &book_schema(),
            &HashMap::from([("#pk".to_owned(), "Author".to_owned())]),
            &ParsedExpression::parse(text).unwrap(),
        )
    }

    #[test]
    fn test_should_build_book_key() {
        let sig = delete_book();
        let key_ctor = constructor("Author = :author AND Id = :id").unwrap();
        let args = bind(&sig, vec!["X".into(), "42".into()]).unwrap();
        let key = key_ctor.create(&args, &JsonAttributeCodec).unwrap();
        assert_eq!(
            key,
            Item::from([
                ("Author".to_owned(), AttributeValue::from("X")),
                ("Id".to_owned(), AttributeValue::from("42")),
            ])
        );
    }

    #[test]
    fn test_should_resolve_name_placeholder_in_key() {
        let key_ctor = constructor("#pk = :author and Id = :id").unwrap();
        assert_eq!(key_ctor.placeholders(), vec![":author", ":id"]);
    }

    #[test]
    fn test_should_fail_with_incomplete_key_when_range_value_absent() {
        let sig = delete_book();
        let key_ctor = constructor("Author = :author AND Id = :id").unwrap();
        let args = bind(&sig, vec!["X".into(), ArgValue::Absent]).unwrap();
        let err = key_ctor.create(&args, &JsonAttributeCodec).unwrap_err();
        assert!(matches!(
            err.bind(),
            Some(BindError::IncompleteKey { attribute, .. }) if attribute == "Id"
        ));
    }

    #[test]
    fn test_should_reject_key_expression_missing_range_key() {
        let err = constructor("Author = :author").unwrap_err();
        assert!(matches!(err, CompileError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_should_reject_non_key_attribute() {
        let err = constructor("Author = :author AND Title = :id").unwrap_err();
        assert!(matches!(err, CompileError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_should_reject_non_equality_clause() {
        let err = constructor("Author = :author AND Id > :id").unwrap_err();
        assert!(matches!(err, CompileError::MalformedExpression { .. }));
        let err = constructor("Author = :author OR Id = :id").unwrap_err();
        assert!(matches!(err, CompileError::MalformedExpression { .. }));
    }

    #[test]
    fn test_should_reject_undeclared_key_placeholder() {
        let err = constructor("Author = :author AND Id = :isbn").unwrap_err();
        assert!(matches!(err, CompileError::UndeclaredPlaceholder { placeholder, .. } if placeholder == ":isbn"));
    }

    #[test]
    fn test_should_reject_key_value_of_wrong_scalar_type() {
        let sig = Signature::new(
            OperationDescriptor::new("deleteBook", OperationKind::Delete, "Book")
                .param(ParameterDescriptor::value(":author", ParamType::Any))
                .param(ParameterDescriptor::value(":id", ParamType::Any)),
        )
        .unwrap();
        let key_ctor = KeyAttributeConstructor::new(
            &sig,
            &book_schema(),
            &HashMap::new(),
            &ParsedExpression::parse("Author = :author AND Id = :id").unwrap(),
        )
        .unwrap();
        let args = bind(&sig, vec!["X".into(), json!(42).into()]).unwrap();
        let err = key_ctor.create(&args, &JsonAttributeCodec).unwrap_err();
        assert!(matches!(err.bind(), Some(BindError::ArgumentType { .. })));
    }
}
