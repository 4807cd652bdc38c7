//! Argument binding.
//!
//! Binding is positional-to-named through the signature's declared order and
//! produces call-scoped [`Arguments`] that borrow the signature. Nothing here
//! outlives the call.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crudstack_model::{AttributeValue, Item};

use crate::codec::{AttributeCodec, decode_base64, encode_item, json_type_name};
use crate::descriptor::{ParamRole, ParamType, ParameterDescriptor};
use crate::error::{BindError, CodecError};
use crate::signature::Signature;

// ---------------------------------------------------------------------------
// ArgValue
// ---------------------------------------------------------------------------

/// A runtime value supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ArgValue {
    /// No value.
    #[default]
    Absent,
    /// A caller value, encoded through the attribute codec.
    Json(Value),
    /// An already-encoded attribute value, passed through as-is.
    Attribute(AttributeValue),
    /// An already-encoded record.
    Item(Item),
}

impl ArgValue {
    /// Serialize any record or value into an argument.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` if serialization fails.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, CodecError> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// A pagination cursor: the previous page's last evaluated key, or
    /// `None` to start from the beginning.
    #[must_use]
    pub fn cursor(key: Option<Item>) -> Self {
        key.map_or(Self::Absent, Self::Item)
    }

    /// Whether this represents an absent value.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        match self {
            Self::Absent | Self::Json(Value::Null) => true,
            Self::Attribute(av) => av.is_null(),
            Self::Json(_) | Self::Item(_) => false,
        }
    }

    fn as_limit(&self) -> Option<u32> {
        match self {
            Self::Json(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Self::Attribute(AttributeValue::N(n)) => n.parse().ok(),
            _ => None,
        }
    }

    fn type_name(&self) -> String {
        match self {
            Self::Absent => "absent".to_owned(),
            Self::Json(v) => json_type_name(v).to_owned(),
            Self::Attribute(av) => format!("attribute {}", av.type_descriptor()),
            Self::Item(_) => "item".to_owned(),
        }
    }

    fn conforms_to(&self, expected: ParamType) -> bool {
        if self.is_absent() || expected == ParamType::Any {
            return true;
        }
        match self {
            Self::Json(v) => match expected {
                ParamType::String | ParamType::Binary => v.is_string(),
                ParamType::Number => v.is_number(),
                ParamType::Boolean => v.is_boolean(),
                ParamType::Item | ParamType::Map => v.is_object(),
                ParamType::List => v.is_array(),
                ParamType::Any => true,
            },
            Self::Attribute(av) => match expected {
                ParamType::String => matches!(av, AttributeValue::S(_)),
                ParamType::Number => matches!(av, AttributeValue::N(_)),
                ParamType::Boolean => matches!(av, AttributeValue::Bool(_)),
                ParamType::Binary => matches!(av, AttributeValue::B(_)),
                ParamType::Item | ParamType::Map => matches!(av, AttributeValue::M(_)),
                ParamType::List => matches!(
                    av,
                    AttributeValue::L(_)
                        | AttributeValue::Ss(_)
                        | AttributeValue::Ns(_)
                        | AttributeValue::Bs(_)
                ),
                ParamType::Any => true,
            },
            Self::Item(_) => matches!(expected, ParamType::Item | ParamType::Map),
            Self::Absent => true,
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Json(Value::String(value.to_owned()))
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Json(Value::String(value))
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Json(value.into())
    }
}

impl From<u32> for ArgValue {
    fn from(value: u32) -> Self {
        Self::Json(value.into())
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Json(Value::Bool(value))
    }
}

impl From<Value> for ArgValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<AttributeValue> for ArgValue {
    fn from(value: AttributeValue) -> Self {
        Self::Attribute(value)
    }
}

impl From<Item> for ArgValue {
    fn from(value: Item) -> Self {
        Self::Item(value)
    }
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

// ---------------------------------------------------------------------------
// Argument
// ---------------------------------------------------------------------------

/// A bound runtime value together with its declared parameter.
#[derive(Debug, Clone)]
pub struct Argument<'s> {
    parameter: &'s ParameterDescriptor,
    value: ArgValue,
}

impl Argument<'_> {
    /// Declared parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.parameter.name
    }

    /// Declared semantic type.
    #[must_use]
    pub fn param_type(&self) -> ParamType {
        self.parameter.param_type
    }

    /// Whether the parameter accepts absent values.
    #[must_use]
    pub fn nullable(&self) -> bool {
        self.parameter.nullable
    }

    /// The raw bound value.
    #[must_use]
    pub fn value(&self) -> &ArgValue {
        &self.value
    }

    /// Encodes the value, or returns `None` if it is absent.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` if the codec rejects the value.
    pub fn encode(&self, codec: &dyn AttributeCodec) -> Result<Option<AttributeValue>, CodecError> {
        if self.value.is_absent() {
            return Ok(None);
        }
        let encoded = match &self.value {
            ArgValue::Attribute(av) => av.clone(),
            ArgValue::Item(item) => AttributeValue::M(item.clone()),
            ArgValue::Json(Value::String(text)) if self.param_type() == ParamType::Binary => {
                AttributeValue::B(decode_base64(text)?)
            }
            ArgValue::Json(v) => codec.encode(v)?,
            ArgValue::Absent => return Ok(None),
        };
        Ok(Some(encoded))
    }

    /// Encodes the value as a whole record, or returns `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` if the value is not a record.
    pub fn encode_item(&self, codec: &dyn AttributeCodec) -> Result<Option<Item>, CodecError> {
        if self.value.is_absent() {
            return Ok(None);
        }
        match &self.value {
            ArgValue::Item(item) => Ok(Some(item.clone())),
            ArgValue::Attribute(AttributeValue::M(m)) => Ok(Some(m.clone())),
            ArgValue::Json(v) => encode_item(codec, v).map(Some),
            other => Err(CodecError::new(format!(
                "parameter {} expects a record, got {}",
                self.name(),
                other.type_name()
            ))),
        }
    }

    /// The value as a page-size limit, or `None` if absent.
    #[must_use]
    pub fn as_limit(&self) -> Option<u32> {
        self.value.as_limit()
    }
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// All arguments of one call, keyed by declared parameter name.
#[derive(Debug, Clone)]
pub struct Arguments<'s> {
    operation: &'s str,
    by_name: HashMap<&'s str, Argument<'s>>,
}

impl<'s> Arguments<'s> {
    /// Operation these arguments were bound for.
    #[must_use]
    pub fn operation(&self) -> &str {
        self.operation
    }

    /// Looks up an argument by parameter name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Argument<'s>> {
        self.by_name.get(name)
    }

    /// Number of bound arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether no arguments are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// The argument bound to the cursor parameter, if any.
    #[must_use]
    pub fn cursor(&self) -> Option<&Argument<'s>> {
        self.by_name
            .values()
            .find(|a| a.parameter.role == ParamRole::Cursor)
    }

    /// The argument bound to the limit parameter, if any.
    #[must_use]
    pub fn limit(&self) -> Option<&Argument<'s>> {
        self.by_name
            .values()
            .find(|a| a.parameter.role == ParamRole::Limit)
    }
}

/// Binds positional values to the signature's declared parameters.
///
/// # Errors
///
/// Returns `BindError::ArityMismatch` if the number of values differs from
/// the number of declared parameters, and `BindError::ArgumentType` if a
/// value does not fit its parameter's type or role.
pub fn bind(signature: &Signature, values: Vec<ArgValue>) -> Result<Arguments<'_>, BindError> {
    let parameters = signature.parameters();
    if values.len() != parameters.len() {
        return Err(BindError::ArityMismatch {
            operation: signature.name().to_owned(),
            expected: parameters.len(),
            actual: values.len(),
        });
    }

    let by_name = parameters
        .iter()
        .zip(values)
        .map(|(parameter, value)| {
            check(signature.name(), parameter, &value)?;
            Ok((parameter.name.as_str(), Argument { parameter, value }))
        })
        .collect::<Result<_, BindError>>()?;

    Ok(Arguments {
        operation: signature.name(),
        by_name,
    })
}

/// Binds values by parameter name. Parameters without a value are bound to
/// [`ArgValue::Absent`].
///
/// # Errors
///
/// Returns `BindError::UnknownArgument` for a name no parameter declares and
/// `BindError::ArgumentType` for a value that does not fit its parameter.
pub fn bind_named(
    signature: &Signature,
    mut values: HashMap<String, ArgValue>,
) -> Result<Arguments<'_>, BindError> {
    if let Some(unknown) = values.keys().find(|k| signature.parameter(k).is_none()) {
        return Err(BindError::UnknownArgument {
            operation: signature.name().to_owned(),
            name: unknown.clone(),
        });
    }
    let positional = signature
        .parameters()
        .iter()
        .map(|p| values.remove(&p.name).unwrap_or_default())
        .collect();
    bind(signature, positional)
}

fn check(operation: &str, parameter: &ParameterDescriptor, value: &ArgValue) -> Result<(), BindError> {
    let ok = match parameter.role {
        ParamRole::Value => value.conforms_to(parameter.param_type),
        ParamRole::Cursor => value.is_absent() || value.conforms_to(ParamType::Item),
        ParamRole::Limit => value.is_absent() || value.as_limit().is_some_and(|n| n > 0),
    };
    if ok {
        return Ok(());
    }
    let expected = match parameter.role {
        ParamRole::Value => parameter.param_type,
        ParamRole::Cursor => ParamType::Item,
        ParamRole::Limit => ParamType::Number,
    };
    Err(BindError::ArgumentType {
        operation: operation.to_owned(),
        parameter: parameter.name.clone(),
        expected,
        actual: value.type_name(),
    })
}

#[cfg(test)]
mod tests {
    use crudstack_model::OperationKind;
    use serde_json::json;

    use super::*;
    use crate::codec::JsonAttributeCodec;
    use crate::descriptor::OperationDescriptor;

    fn delete_book() -> Signature {
        Signature::new(
            OperationDescriptor::new("deleteBook", OperationKind::Delete, "Book")
                .param(ParameterDescriptor::value(":author", ParamType::String))
                .param(ParameterDescriptor::value(":id", ParamType::String))
                .key("Author = :author AND Id = :id"),
        )
        .unwrap()
    }

    #[test]
    fn test_should_bind_positionally_by_declared_order() {
        let sig = delete_book();
        let args = bind(&sig, vec!["X".into(), "42".into()]).unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args.get(":id").unwrap().value(), &ArgValue::from("42"));
        assert_eq!(args.operation(), "deleteBook");
    }

    #[test]
    fn test_should_fail_on_arity_mismatch() {
        let sig = delete_book();
        let err = bind(&sig, vec!["X".into()]).unwrap_err();
        assert_eq!(
            err,
            BindError::ArityMismatch {
                operation: "deleteBook".to_owned(),
                expected: 2,
                actual: 1,
            }
        );
        assert!(bind(&sig, vec!["X".into(), "1".into(), "2".into()]).is_err());
    }

    #[test]
    fn test_should_fail_on_argument_type() {
        let sig = delete_book();
        let err = bind(&sig, vec!["X".into(), 42_i64.into()]).unwrap_err();
        assert!(matches!(
            err,
            BindError::ArgumentType { parameter, expected: ParamType::String, .. } if parameter == ":id"
        ));
    }

    #[test]
    fn test_should_accept_absent_values_at_bind_time() {
        let sig = delete_book();
        let args = bind(&sig, vec!["X".into(), ArgValue::Absent]).unwrap();
        assert!(args.get(":id").unwrap().value().is_absent());
    }

    #[test]
    fn test_should_bind_named_and_fill_missing_with_absent() {
        let sig = delete_book();
        let values = HashMap::from([(":author".to_owned(), ArgValue::from("X"))]);
        let args = bind_named(&sig, values).unwrap();
        assert!(args.get(":id").unwrap().value().is_absent());

        let unknown = HashMap::from([(":isbn".to_owned(), ArgValue::from("1"))]);
        assert!(matches!(
            bind_named(&sig, unknown),
            Err(BindError::UnknownArgument { .. })
        ));
    }

    #[test]
    fn test_should_reject_non_positive_limit() {
        let sig = Signature::new(
            OperationDescriptor::new("page", OperationKind::PagedScan, "Book")
                .param(ParameterDescriptor::limit("limit"))
                .param(ParameterDescriptor::cursor("cursor")),
        )
        .unwrap();
        assert!(bind(&sig, vec![0_u32.into(), ArgValue::Absent]).is_err());
        let args = bind(&sig, vec![10_u32.into(), ArgValue::cursor(None)]).unwrap();
        assert_eq!(args.limit().and_then(Argument::as_limit), Some(10));
        assert!(args.cursor().unwrap().value().is_absent());
    }

    #[test]
    fn test_should_decode_binary_parameter_from_base64() {
        let sig = Signature::new(
            OperationDescriptor::new("byDigest", OperationKind::Get, "Blob")
                .param(ParameterDescriptor::value(":digest", ParamType::Binary))
                .key("Digest = :digest"),
        )
        .unwrap();
        let args = bind(&sig, vec![json!("dGVzdA==").into()]).unwrap();
        let encoded = args.get(":digest").unwrap().encode(&JsonAttributeCodec).unwrap();
        assert_eq!(
            encoded,
            Some(AttributeValue::B(bytes::Bytes::from_static(b"test")))
        );
    }
}
