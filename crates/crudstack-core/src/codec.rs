//! Attribute encoding.
//!
//! Caller values reach the compiler as `serde_json::Value`s (directly, or via
//! any `Serialize` record). An [`AttributeCodec`] turns them into storage
//! [`AttributeValue`]s and back. The default [`JsonAttributeCodec`] maps the
//! JSON data model one-to-one; an application with its own record mapping can
//! supply a different codec to the dispatcher.

use std::fmt;

use base64::Engine;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crudstack_model::{AttributeValue, Item};

use crate::error::CodecError;

/// Converts between caller values and storage attribute values.
pub trait AttributeCodec: Send + Sync + fmt::Debug {
    /// Encode one caller value.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` if the value has no attribute representation.
    fn encode(&self, value: &Value) -> Result<AttributeValue, CodecError>;

    /// Decode one attribute value.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` if the attribute has no caller representation.
    fn decode(&self, value: &AttributeValue) -> Result<Value, CodecError>;
}

/// Encode a JSON object into an item.
///
/// # Errors
///
/// Returns a `CodecError` if `value` is not an object or a member fails to
/// encode.
pub fn encode_item(codec: &dyn AttributeCodec, value: &Value) -> Result<Item, CodecError> {
    let Value::Object(fields) = value else {
        return Err(CodecError::new(format!(
            "expected an object, got {}",
            json_type_name(value)
        )));
    };
    fields
        .iter()
        .map(|(k, v)| Ok((k.clone(), codec.encode(v)?)))
        .collect()
}

/// Decode an item into a JSON object.
///
/// # Errors
///
/// Returns a `CodecError` if an attribute fails to decode.
pub fn decode_item(codec: &dyn AttributeCodec, item: &Item) -> Result<Value, CodecError> {
    let fields = item
        .iter()
        .map(|(k, v)| Ok((k.clone(), codec.decode(v)?)))
        .collect::<Result<Map<_, _>, CodecError>>()?;
    Ok(Value::Object(fields))
}

/// Serialize a record into an item.
///
/// # Errors
///
/// Returns a `CodecError` if the record does not serialize to an object.
pub fn to_item<T: Serialize>(codec: &dyn AttributeCodec, record: &T) -> Result<Item, CodecError> {
    encode_item(codec, &serde_json::to_value(record)?)
}

/// Deserialize a record from an item.
///
/// # Errors
///
/// Returns a `CodecError` if the item does not match the record's shape.
pub fn from_item<T: DeserializeOwned>(
    codec: &dyn AttributeCodec,
    item: &Item,
) -> Result<T, CodecError> {
    Ok(serde_json::from_value(decode_item(codec, item)?)?)
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn decode_base64(text: &str) -> Result<bytes::Bytes, CodecError> {
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .map(bytes::Bytes::from)
        .map_err(|e| CodecError::new(format!("invalid base64: {e}")))
}

fn encode_base64(b: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(b)
}

fn parse_number(text: &str) -> Result<Number, CodecError> {
    if let Ok(n) = text.parse::<i64>() {
        return Ok(n.into());
    }
    if let Ok(n) = text.parse::<u64>() {
        return Ok(n.into());
    }
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::new(format!(
            "'{text}' is outside the 64-bit integer range"
        )));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| CodecError::new(format!("'{text}' is not a number")))
}

// ---------------------------------------------------------------------------
// JsonAttributeCodec
// ---------------------------------------------------------------------------

/// Maps the JSON data model onto attribute values.
///
/// | JSON    | attribute |
/// |---------|-----------|
/// | string  | `S`       |
/// | number  | `N`       |
/// | boolean | `BOOL`    |
/// | null    | `NULL`    |
/// | array   | `L`       |
/// | object  | `M`       |
///
/// Decoding additionally accepts sets (as arrays) and binary (as base64).
/// Integers must fit `i64` or `u64`; larger ones are rejected rather than
/// rounded through `f64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAttributeCodec;

impl AttributeCodec for JsonAttributeCodec {
    fn encode(&self, value: &Value) -> Result<AttributeValue, CodecError> {
        Ok(match value {
            Value::Null => AttributeValue::null(),
            Value::Bool(b) => AttributeValue::Bool(*b),
            Value::Number(n) => AttributeValue::N(n.to_string()),
            Value::String(s) => AttributeValue::S(s.clone()),
            Value::Array(items) => AttributeValue::L(
                items
                    .iter()
                    .map(|v| self.encode(v))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(_) => AttributeValue::M(encode_item(self, value)?),
        })
    }

    fn decode(&self, value: &AttributeValue) -> Result<Value, CodecError> {
        Ok(match value {
            AttributeValue::S(s) => Value::String(s.clone()),
            AttributeValue::N(n) => Value::Number(parse_number(n)?),
            AttributeValue::B(b) => Value::String(encode_base64(b)),
            AttributeValue::Ss(v) => Value::Array(v.iter().cloned().map(Value::String).collect()),
            AttributeValue::Ns(v) => Value::Array(
                v.iter()
                    .map(|n| parse_number(n).map(Value::Number))
                    .collect::<Result<_, _>>()?,
            ),
            AttributeValue::Bs(v) => {
                Value::Array(v.iter().map(|b| Value::String(encode_base64(b))).collect())
            }
            AttributeValue::Bool(b) => Value::Bool(*b),
            AttributeValue::Null(_) => Value::Null,
            AttributeValue::L(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.decode(v))
                    .collect::<Result<_, _>>()?,
            ),
            AttributeValue::M(m) => decode_item(self, m)?,
        })
    }
}
