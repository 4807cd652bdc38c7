//! Table key schemas.
//!
//! Both sides of the storage boundary need to know which attributes form a
//! table's primary key: the compiler to build complete key selectors and to
//! decode pagination cursors, the engine to index items.

use serde::{Deserialize, Serialize};

use crate::Item;
use crate::types::{KeyType, ScalarAttributeType};

/// A single key attribute: its physical name and scalar type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyAttribute {
    /// Physical attribute name.
    pub name: String,
    /// Scalar type of the attribute.
    #[serde(default, rename = "type")]
    pub attr_type: ScalarAttributeType,
}

impl KeyAttribute {
    /// Creates a key attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, attr_type: ScalarAttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
        }
    }
}

/// Primary-key layout of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    /// Logical table name, before any configured prefix.
    pub table_name: String,
    /// Partition (HASH) key.
    pub partition_key: KeyAttribute,
    /// Optional sort (RANGE) key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<KeyAttribute>,
}

impl TableSchema {
    /// A table keyed by partition key only.
    #[must_use]
    pub fn simple(table_name: impl Into<String>, partition_key: KeyAttribute) -> Self {
        Self {
            table_name: table_name.into(),
            partition_key,
            sort_key: None,
        }
    }

    /// A table with a composite partition + sort key.
    #[must_use]
    pub fn composite(
        table_name: impl Into<String>,
        partition_key: KeyAttribute,
        sort_key: KeyAttribute,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            partition_key,
            sort_key: Some(sort_key),
        }
    }

    /// Key attributes in schema order (partition first).
    pub fn key_attributes(&self) -> impl Iterator<Item = (&KeyAttribute, KeyType)> {
        std::iter::once((&self.partition_key, KeyType::Hash))
            .chain(self.sort_key.iter().map(|k| (k, KeyType::Range)))
    }

    /// Looks up a key attribute by physical name.
    #[must_use]
    pub fn key_attribute(&self, name: &str) -> Option<&KeyAttribute> {
        self.key_attributes()
            .map(|(attr, _)| attr)
            .find(|attr| attr.name == name)
    }

    /// Projects the primary key out of a full item.
    ///
    /// Returns `None` if any key attribute is missing.
    #[must_use]
    pub fn key_of(&self, item: &Item) -> Option<Item> {
        self.key_attributes()
            .map(|(attr, _)| {
                item.get(&attr.name)
                    .map(|value| (attr.name.clone(), value.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttributeValue;

    fn book_schema() -> TableSchema {
        TableSchema::composite(
            "Book",
            KeyAttribute::new("Author", ScalarAttributeType::S),
            KeyAttribute::new("Id", ScalarAttributeType::S),
        )
    }

    #[test]
    fn test_should_list_key_attributes_partition_first() {
        let schema = book_schema();
        let names: Vec<_> = schema
            .key_attributes()
            .map(|(a, t)| (a.name.as_str(), t))
            .collect();
        assert_eq!(names, vec![("Author", KeyType::Hash), ("Id", KeyType::Range)]);
    }

    #[test]
    fn test_should_project_key_from_item() {
        let schema = book_schema();
        let item: Item = [
            ("Author".to_owned(), AttributeValue::from("X")),
            ("Id".to_owned(), AttributeValue::from("42")),
            ("Title".to_owned(), AttributeValue::from("T")),
        ]
        .into_iter()
        .collect();
        let key = schema.key_of(&item).unwrap();
        assert_eq!(key.len(), 2);
        assert!(!key.contains_key("Title"));
    }

    #[test]
    fn test_should_return_none_when_key_attribute_missing() {
        let schema = book_schema();
        let item: Item = [("Author".to_owned(), AttributeValue::from("X"))]
            .into_iter()
            .collect();
        assert!(schema.key_of(&item).is_none());
    }

    #[test]
    fn test_should_deserialize_schema_from_json() {
        let schema: TableSchema = serde_json::from_str(
            r#"{"tableName":"Book","partitionKey":{"name":"Author"},"sortKey":{"name":"Id","type":"S"}}"#,
        )
        .unwrap();
        assert_eq!(schema, book_schema());
    }
}
