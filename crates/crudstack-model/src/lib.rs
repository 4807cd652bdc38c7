//! Wire model for CrudStack.
//!
//! This crate holds the shapes that cross the boundary between the request
//! compiler and the key/attribute storage engine: attribute values, request
//! and response objects, the storage error taxonomy, and the
//! [`StorageEngine`] trait every engine implements. Field naming follows the
//! storage engine's `PascalCase` JSON protocol so compiled requests can be
//! serialized as-is.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod engine;
pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod schema;
pub mod types;

use std::collections::HashMap;

pub use attribute_value::AttributeValue;
pub use engine::StorageEngine;
pub use error::{StorageError, StorageErrorCode};
pub use operations::OperationKind;
pub use schema::{KeyAttribute, TableSchema};

/// A stored record: physical attribute name to attribute value.
pub type Item = HashMap<String, AttributeValue>;
