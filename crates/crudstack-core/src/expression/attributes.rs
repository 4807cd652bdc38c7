//! Expression attribute slots.
//!
//! The factory is built once per operation from every expression the
//! operation sends (condition, filter, key condition, update, projection).
//! Value placeholders must be declared parameters; this is checked here, at
//! registration. Name placeholders resolve in this order:
//!
//! 1. a declared `#name` parameter, whose string value is the attribute name
//!    chosen by the caller on each call;
//! 2. an explicit mapping in the descriptor's `attributeNames`;
//! 3. the placeholder with its marker stripped (`#Author` -> `Author`).

use std::collections::HashMap;

use tracing::trace;

use crudstack_model::AttributeValue;

use crate::argument::{ArgValue, Arguments};
use crate::codec::AttributeCodec;
use crate::error::{BindError, CompileError, CrudError};
use crate::expression::{ParsedExpression, strip_marker};
use crate::signature::Signature;

/// Resolved placeholder slots of one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionAttributes {
    /// Name placeholder -> physical attribute name.
    pub names: HashMap<String, String>,
    /// Value placeholder -> encoded attribute value.
    pub values: HashMap<String, AttributeValue>,
}

#[derive(Debug, Clone)]
enum NameSource {
    Fixed(String),
    Parameter,
}

/// Builds [`ExpressionAttributes`] for one operation.
#[derive(Debug, Clone)]
pub struct ExpressionAttributesFactory {
    names: Vec<(String, NameSource)>,
    values: Vec<String>,
}

impl ExpressionAttributesFactory {
    /// Collects and validates the placeholders of `expressions`.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::UndeclaredPlaceholder` for a value placeholder
    /// that is not a declared parameter.
    pub fn new<'e>(
        signature: &Signature,
        attribute_names: &HashMap<String, String>,
        expressions: impl IntoIterator<Item = &'e ParsedExpression>,
    ) -> Result<Self, CompileError> {
        let mut names: Vec<(String, NameSource)> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        for expr in expressions {
            for placeholder in expr.value_placeholders() {
                if !signature.declares(placeholder) {
                    return Err(CompileError::UndeclaredPlaceholder {
                        operation: signature.name().to_owned(),
                        placeholder: placeholder.to_owned(),
                        expression: expr.text().to_owned(),
                    });
                }
                if !values.iter().any(|v| v == placeholder) {
                    values.push(placeholder.to_owned());
                }
            }
            for placeholder in expr.name_placeholders() {
                if names.iter().any(|(n, _)| n == placeholder) {
                    continue;
                }
                let source = resolve_name(signature, attribute_names, placeholder);
                names.push((placeholder.to_owned(), source));
            }
        }

        Ok(Self { names, values })
    }

    /// Whether no expression of the operation uses a placeholder.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.values.is_empty()
    }

    /// Value placeholders, in first-occurrence order.
    #[must_use]
    pub fn value_placeholders(&self) -> Vec<&str> {
        self.values.iter().map(String::as_str).collect()
    }

    /// Resolves every placeholder against one call's arguments.
    ///
    /// # Errors
    ///
    /// Returns `BindError::NullValuePlaceholder` if a placeholder is bound to
    /// an absent value and its parameter is not nullable, or a `CodecError`
    /// if a value cannot be encoded.
    pub fn create(
        &self,
        args: &Arguments<'_>,
        codec: &dyn AttributeCodec,
    ) -> Result<ExpressionAttributes, CrudError> {
        let null_placeholder = |placeholder: &str| BindError::NullValuePlaceholder {
            operation: args.operation().to_owned(),
            placeholder: placeholder.to_owned(),
        };

        let mut attrs = ExpressionAttributes::default();

        for (placeholder, source) in &self.names {
            let name = match source {
                NameSource::Fixed(name) => name.clone(),
                NameSource::Parameter => match args.get(placeholder).map(|a| a.value()) {
                    Some(ArgValue::Json(serde_json::Value::String(s))) => s.clone(),
                    Some(ArgValue::Attribute(AttributeValue::S(s))) => s.clone(),
                    _ => return Err(null_placeholder(placeholder).into()),
                },
            };
            attrs.names.insert(placeholder.clone(), name);
        }

        for placeholder in &self.values {
            let Some(arg) = args.get(placeholder) else {
                return Err(null_placeholder(placeholder).into());
            };
            let value = match arg.encode(codec)? {
                Some(value) => value,
                None if arg.nullable() => AttributeValue::null(),
                None => return Err(null_placeholder(placeholder).into()),
            };
            attrs.values.insert(placeholder.clone(), value);
        }

        trace!(
            operation = args.operation(),
            names = ?attrs.names,
            values = attrs.values.len(),
            "resolved expression attributes"
        );
        Ok(attrs)
    }
}

fn resolve_name(
    signature: &Signature,
    attribute_names: &HashMap<String, String>,
    placeholder: &str,
) -> NameSource {
    if signature.declares(placeholder) {
        NameSource::Parameter
    } else if let Some(name) = attribute_names.get(placeholder) {
        NameSource::Fixed(name.clone())
    } else {
        NameSource::Fixed(strip_marker(placeholder).to_owned())
    }
}

/// Resolves a name placeholder that must be fixed at registration.
pub(crate) fn fixed_name(
    signature: &Signature,
    attribute_names: &HashMap<String, String>,
    placeholder: &str,
) -> Option<String> {
    match resolve_name(signature, attribute_names, placeholder) {
        NameSource::Fixed(name) => Some(name),
        NameSource::Parameter => None,
    }
}

#[cfg(test)]
mod tests {
    use crudstack_model::OperationKind;
    use serde_json::json;

    use super::*;
    use crate::argument::bind;
    use crate::codec::JsonAttributeCodec;
    use crate::descriptor::{OperationDescriptor, ParamType, ParameterDescriptor};

    fn signature(params: Vec<ParameterDescriptor>) -> Signature {
        let mut desc = OperationDescriptor::new("op", OperationKind::Scan, "Book");
        desc.parameters = params;
        Signature::new(desc).unwrap()
    }

    fn parse(text: &str) -> ParsedExpression {
        ParsedExpression::parse(text).unwrap()
    }

    #[test]
    fn test_should_emit_one_entry_per_distinct_placeholder() {
        let sig = signature(vec![
            ParameterDescriptor::value(":min", ParamType::Number),
            ParameterDescriptor::value(":max", ParamType::Number),
        ]);
        let filter = parse("#Pages >= :min AND #Pages <= :max AND #Pages <> :min");
        let factory = ExpressionAttributesFactory::new(&sig, &HashMap::new(), [&filter]).unwrap();
        let args = bind(&sig, vec![json!(100).into(), json!(500).into()]).unwrap();
        let attrs = factory.create(&args, &JsonAttributeCodec).unwrap();

        assert_eq!(attrs.names, HashMap::from([("#Pages".to_owned(), "Pages".to_owned())]));
        assert_eq!(attrs.values.len(), 2);
        assert_eq!(attrs.values[":min"], AttributeValue::N("100".to_owned()));
    }

    #[test]
    fn test_should_fail_registration_on_undeclared_value_placeholder() {
        let sig = signature(vec![ParameterDescriptor::value(":min", ParamType::Number)]);
        let filter = parse("Pages BETWEEN :min AND :max");
        let err = ExpressionAttributesFactory::new(&sig, &HashMap::new(), [&filter]).unwrap_err();
        assert_eq!(
            err,
            CompileError::UndeclaredPlaceholder {
                operation: "op".to_owned(),
                placeholder: ":max".to_owned(),
                expression: "Pages BETWEEN :min AND :max".to_owned(),
            }
        );
    }

    #[test]
    fn test_should_prefer_override_over_stripped_name() {
        let sig = signature(vec![]);
        let projection = parse("#n, #Title");
        let overrides = HashMap::from([("#n".to_owned(), "Name".to_owned())]);
        let factory = ExpressionAttributesFactory::new(&sig, &overrides, [&projection]).unwrap();
        let attrs = factory.create(&bind(&sig, vec![]).unwrap(), &JsonAttributeCodec).unwrap();
        assert_eq!(attrs.names["#n"], "Name");
        assert_eq!(attrs.names["#Title"], "Title");
    }

    #[test]
    fn test_should_take_name_from_name_parameter() {
        let sig = signature(vec![
            ParameterDescriptor::value("#field", ParamType::String),
            ParameterDescriptor::value(":v", ParamType::Any),
        ]);
        let filter = parse("#field = :v");
        let factory = ExpressionAttributesFactory::new(&sig, &HashMap::new(), [&filter]).unwrap();
        let args = bind(&sig, vec!["Genre".into(), "poetry".into()]).unwrap();
        let attrs = factory.create(&args, &JsonAttributeCodec).unwrap();
        assert_eq!(attrs.names["#field"], "Genre");
    }

    #[test]
    fn test_should_fail_on_null_value_placeholder() {
        let sig = signature(vec![ParameterDescriptor::value(":genre", ParamType::String)]);
        let filter = parse("Genre = :genre");
        let factory = ExpressionAttributesFactory::new(&sig, &HashMap::new(), [&filter]).unwrap();
        let args = bind(&sig, vec![ArgValue::Absent]).unwrap();
        let err = factory.create(&args, &JsonAttributeCodec).unwrap_err();
        assert!(matches!(
            err.bind(),
            Some(BindError::NullValuePlaceholder { placeholder, .. }) if placeholder == ":genre"
        ));
    }

    #[test]
    fn test_should_encode_null_for_nullable_parameter() {
        let sig = signature(vec![
            ParameterDescriptor::value(":genre", ParamType::String).nullable(),
        ]);
        let filter = parse("Genre = :genre");
        let factory = ExpressionAttributesFactory::new(&sig, &HashMap::new(), [&filter]).unwrap();
        let args = bind(&sig, vec![ArgValue::Absent]).unwrap();
        let attrs = factory.create(&args, &JsonAttributeCodec).unwrap();
        assert_eq!(attrs.values[":genre"], AttributeValue::null());
    }

    #[test]
    fn test_should_merge_placeholders_across_expressions() {
        let sig = signature(vec![ParameterDescriptor::value(":a", ParamType::String)]);
        let cond = parse("#x = :a");
        let filter = parse("#x <> :a");
        let factory =
            ExpressionAttributesFactory::new(&sig, &HashMap::new(), [&cond, &filter]).unwrap();
        assert_eq!(factory.value_placeholders(), vec![":a"]);
    }
}
