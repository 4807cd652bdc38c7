//! Partitioned, sort-key-ordered item storage for one table.
//!
//! ```text
//! DashMap<PartitionKey, BTreeMap<SortableAttributeValue, Item>>
//! ```
//!
//! Each partition keeps its items ordered by sort key. Tables without a sort
//! key store their single item per partition under
//! [`SortableAttributeValue::Sentinel`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use dashmap::DashMap;
use thiserror::Error;
use tracing::trace;

use crudstack_model::types::ScalarAttributeType;
use crudstack_model::{AttributeValue, Item, KeyAttribute, StorageError, TableSchema};

/// Problems with the key attributes of an item or key.
#[derive(Debug, Error)]
pub enum KeyError {
    /// A key attribute is absent.
    #[error("One of the required keys was not given a value: {attr}")]
    MissingKeyAttribute {
        /// The absent attribute.
        attr: String,
    },
    /// A key attribute has the wrong type.
    #[error("Type mismatch for key {attr}: expected {expected}, got {actual}")]
    InvalidKeyType {
        /// The attribute.
        attr: String,
        /// Declared type.
        expected: String,
        /// Supplied type.
        actual: String,
    },
    /// A key holds attributes beyond the table's key schema.
    #[error("The provided key element does not match the schema")]
    NotAKey,
}

impl From<KeyError> for StorageError {
    fn from(err: KeyError) -> Self {
        Self::validation(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// SortableAttributeValue
// ---------------------------------------------------------------------------

/// A key-eligible value with a total order.
///
/// Strings order by UTF-8 bytes, numbers numerically and binaries by
/// unsigned bytes.
#[derive(Debug, Clone)]
pub enum SortableAttributeValue {
    /// String key.
    S(String),
    /// Number key, kept in its original text.
    N(String),
    /// Binary key.
    B(bytes::Bytes),
    /// Stand-in sort key for tables without one.
    Sentinel,
}

impl SortableAttributeValue {
    fn from_key(attr: &KeyAttribute, value: &AttributeValue) -> Result<Self, KeyError> {
        match (attr.attr_type, value) {
            (ScalarAttributeType::S, AttributeValue::S(s)) => Ok(Self::S(s.clone())),
            (ScalarAttributeType::N, AttributeValue::N(n)) => Ok(Self::N(n.clone())),
            (ScalarAttributeType::B, AttributeValue::B(b)) => Ok(Self::B(b.clone())),
            _ => Err(KeyError::InvalidKeyType {
                attr: attr.name.clone(),
                expected: attr.attr_type.as_str().to_owned(),
                actual: value.type_descriptor().to_owned(),
            }),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::S(_) => 0,
            Self::N(_) => 1,
            Self::B(_) => 2,
            Self::Sentinel => 3,
        }
    }
}

impl PartialEq for SortableAttributeValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortableAttributeValue {}

impl PartialOrd for SortableAttributeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortableAttributeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::S(a), Self::S(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Self::N(a), Self::N(b)) => {
                let fa = a.parse::<f64>().unwrap_or(f64::NAN);
                let fb = b.parse::<f64>().unwrap_or(f64::NAN);
                fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
            }
            (Self::B(a), Self::B(b)) => a.as_ref().cmp(b.as_ref()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Scan order: partition key, then sort key.
type ScanPosition = (SortableAttributeValue, SortableAttributeValue);

// ---------------------------------------------------------------------------
// PrimaryKey
// ---------------------------------------------------------------------------

/// A validated primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    /// Partition key value.
    pub partition: AttributeValue,
    /// Sort key, or the sentinel.
    pub sort: SortableAttributeValue,
}

impl PrimaryKey {
    fn position(&self, schema: &TableSchema) -> Result<ScanPosition, KeyError> {
        Ok((
            SortableAttributeValue::from_key(&schema.partition_key, &self.partition)?,
            self.sort.clone(),
        ))
    }
}

// ---------------------------------------------------------------------------
// TableStorage
// ---------------------------------------------------------------------------

/// Items of one table.
#[derive(Debug)]
pub struct TableStorage {
    schema: TableSchema,
    data: DashMap<AttributeValue, BTreeMap<SortableAttributeValue, Item>>,
    item_count: AtomicU64,
}

impl TableStorage {
    /// Creates an empty table.
    #[must_use]
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            data: DashMap::new(),
            item_count: AtomicU64::new(0),
        }
    }

    /// The table's key schema.
    #[must_use]
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Number of stored items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.item_count.load(AtomicOrdering::Relaxed)
    }

    /// Extracts and validates the primary key of a full item.
    ///
    /// # Errors
    ///
    /// Returns `KeyError` if a key attribute is missing or mistyped.
    pub fn primary_key(&self, item: &Item) -> Result<PrimaryKey, KeyError> {
        let value_of = |attr: &KeyAttribute| {
            item.get(&attr.name)
                .ok_or_else(|| KeyError::MissingKeyAttribute {
                    attr: attr.name.clone(),
                })
        };

        let partition = value_of(&self.schema.partition_key)?;
        SortableAttributeValue::from_key(&self.schema.partition_key, partition)?;
        let sort = match &self.schema.sort_key {
            Some(attr) => SortableAttributeValue::from_key(attr, value_of(attr)?)?,
            None => SortableAttributeValue::Sentinel,
        };
        Ok(PrimaryKey {
            partition: partition.clone(),
            sort,
        })
    }

    /// Validates a key selector: exactly the key attributes, correctly typed.
    ///
    /// # Errors
    ///
    /// Returns `KeyError` if the selector is not a complete key.
    pub fn key(&self, key: &Item) -> Result<PrimaryKey, KeyError> {
        let expected = 1 + usize::from(self.schema.sort_key.is_some());
        if key.len() != expected {
            return Err(KeyError::NotAKey);
        }
        self.primary_key(key)
    }

    /// Inserts or replaces an item, returning the replaced one.
    ///
    /// # Errors
    ///
    /// Returns `KeyError` if the item lacks a valid primary key.
    pub fn put(&self, item: Item) -> Result<Option<Item>, KeyError> {
        let key = self.primary_key(&item)?;
        let old = self.data.entry(key.partition).or_default().insert(key.sort, item);
        if old.is_none() {
            self.item_count.fetch_add(1, AtomicOrdering::Relaxed);
        }
        trace!(table = %self.schema.table_name, replaced = old.is_some(), "stored item");
        Ok(old)
    }

    /// Reads one item.
    #[must_use]
    pub fn get(&self, key: &PrimaryKey) -> Option<Item> {
        self.data
            .get(&key.partition)
            .and_then(|partition| partition.get(&key.sort).cloned())
    }

    /// Removes one item, returning it if it existed.
    pub fn delete(&self, key: &PrimaryKey) -> Option<Item> {
        let removed = {
            let mut partition = self.data.get_mut(&key.partition)?;
            partition.remove(&key.sort)?
        };
        self.data.remove_if(&key.partition, |_, items| items.is_empty());
        self.item_count.fetch_sub(1, AtomicOrdering::Relaxed);
        Some(removed)
    }

    /// Items of one partition in sort-key order, starting after `after`.
    #[must_use]
    pub fn partition(
        &self,
        partition: &AttributeValue,
        forward: bool,
        after: Option<&SortableAttributeValue>,
    ) -> Vec<Item> {
        let Some(items) = self.data.get(partition) else {
            return Vec::new();
        };
        let owned = |(_, item): (_, &Item)| item.clone();
        match (forward, after) {
            (true, Some(start)) => items
                .range((Bound::Excluded(start), Bound::Unbounded))
                .map(owned)
                .collect(),
            (true, None) => items.iter().map(owned).collect(),
            (false, Some(start)) => items
                .range((Bound::Unbounded, Bound::Excluded(start)))
                .rev()
                .map(owned)
                .collect(),
            (false, None) => items.iter().rev().map(owned).collect(),
        }
    }

    /// Every item ordered by partition key then sort key, starting after
    /// `after`.
    ///
    /// # Errors
    ///
    /// Returns `KeyError` if `after` does not fit the key schema.
    pub fn scan(&self, after: Option<&PrimaryKey>) -> Result<Vec<Item>, KeyError> {
        let after = after.map(|key| key.position(&self.schema)).transpose()?;

        let mut rows: Vec<(ScanPosition, Item)> = Vec::new();
        for entry in &self.data {
            let partition_key = &self.schema.partition_key;
            let Ok(partition) = SortableAttributeValue::from_key(partition_key, entry.key()) else {
                continue;
            };
            for (sort, item) in entry.value() {
                rows.push(((partition.clone(), sort.clone()), item.clone()));
            }
        }
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(rows
            .into_iter()
            .filter(|(position, _)| after.as_ref().is_none_or(|start| position > start))
            .map(|(_, item)| item)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Item size
// ---------------------------------------------------------------------------

/// Size of an item in bytes: for each attribute, its name length plus its
/// value size.
#[must_use]
pub fn item_size(item: &Item) -> u64 {
    item.iter()
        .map(|(name, value)| name.len() as u64 + value_size(value))
        .sum()
}

fn number_size(n: &str) -> u64 {
    (n.len().div_ceil(2) + 1) as u64
}

fn value_size(value: &AttributeValue) -> u64 {
    match value {
        AttributeValue::S(s) => s.len() as u64,
        AttributeValue::N(n) => number_size(n),
        AttributeValue::B(b) => b.len() as u64,
        AttributeValue::Bool(_) | AttributeValue::Null(_) => 1,
        AttributeValue::Ss(v) => v.iter().map(|s| s.len() as u64).sum(),
        AttributeValue::Ns(v) => v.iter().map(|n| number_size(n)).sum(),
        AttributeValue::Bs(v) => v.iter().map(|b| b.len() as u64).sum(),
        AttributeValue::L(list) => 3 + list.iter().map(|v| 1 + value_size(v)).sum::<u64>(),
        AttributeValue::M(map) => {
            3 + map
                .iter()
                .map(|(k, v)| k.len() as u64 + 1 + value_size(v))
                .sum::<u64>()
        }
    }
}
