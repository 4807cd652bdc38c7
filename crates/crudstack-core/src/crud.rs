//! Built-in CRUD operations.
//!
//! Registering a table with [`CompilerBuilder::crud`](crate::CompilerBuilder::crud)
//! declares six operations named `{table}.{method}`. [`Crud`] wraps them in
//! a typed interface over a record type.

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crudstack_model::types::ScalarAttributeType;
use crudstack_model::{Item, OperationKind, TableSchema};

use crate::argument::ArgValue;
use crate::codec::to_item;
use crate::descriptor::{DEFAULT_ITEM_PLACEHOLDER, OperationDescriptor, ParamType, ParameterDescriptor};
use crate::dispatcher::Dispatcher;
use crate::error::{CrudError, CrudResult};
use crate::page::PageResult;

/// One built-in CRUD operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrudMethod {
    /// Write a full record.
    Save,
    /// Read one record by primary key.
    Load,
    /// Delete one record by primary key.
    Delete,
    /// Every record sharing a partition key.
    GroupBy,
    /// One page of [`CrudMethod::GroupBy`].
    GroupByPage,
    /// Every record of the table.
    ScanAll,
}

impl CrudMethod {
    /// All methods, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Save,
        Self::Load,
        Self::Delete,
        Self::GroupBy,
        Self::GroupByPage,
        Self::ScanAll,
    ];

    /// Method suffix of the operation name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Load => "load",
            Self::Delete => "delete",
            Self::GroupBy => "group_by",
            Self::GroupByPage => "group_by_page",
            Self::ScanAll => "scan_all",
        }
    }

    /// Registered name of this method for a table.
    #[must_use]
    pub fn operation_name(&self, table: &str) -> String {
        format!("{table}.{}", self.as_str())
    }

    /// The method's descriptor for a table.
    #[must_use]
    pub fn descriptor(&self, schema: &TableSchema) -> OperationDescriptor {
        let table = schema.table_name.as_str();
        let name = self.operation_name(table);
        let pk = &schema.partition_key;
        let pk_param = ParameterDescriptor::value(":pk", param_type(pk.attr_type));

        match self {
            Self::Save => OperationDescriptor::new(name, OperationKind::Put, table)
                .param(ParameterDescriptor::value(DEFAULT_ITEM_PLACEHOLDER, ParamType::Item)),
            Self::Load | Self::Delete => {
                let kind = if *self == Self::Load {
                    OperationKind::Get
                } else {
                    OperationKind::Delete
                };
                let desc = OperationDescriptor::new(name, kind, table)
                    .param(pk_param)
                    .attribute_name("#pk", pk.name.clone());
                match &schema.sort_key {
                    Some(sk) => desc
                        .param(ParameterDescriptor::value(":sk", param_type(sk.attr_type)))
                        .attribute_name("#sk", sk.name.clone())
                        .key("#pk = :pk AND #sk = :sk"),
                    None => desc.key("#pk = :pk"),
                }
            }
            Self::GroupBy => OperationDescriptor::new(name, OperationKind::Query, table)
                .param(pk_param)
                .attribute_name("#pk", pk.name.clone())
                .key_condition("#pk = :pk"),
            Self::GroupByPage => OperationDescriptor::new(name, OperationKind::PagedQuery, table)
                .param(pk_param)
                .param(ParameterDescriptor::cursor("cursor"))
                .param(ParameterDescriptor::limit("limit"))
                .attribute_name("#pk", pk.name.clone())
                .key_condition("#pk = :pk"),
            Self::ScanAll => OperationDescriptor::new(name, OperationKind::Scan, table),
        }
    }
}

impl fmt::Display for CrudMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptors of every built-in method for a table.
#[must_use]
pub fn crud_descriptors(schema: &TableSchema) -> Vec<OperationDescriptor> {
    CrudMethod::ALL
        .iter()
        .map(|method| method.descriptor(schema))
        .collect()
}

fn param_type(scalar: ScalarAttributeType) -> ParamType {
    match scalar {
        ScalarAttributeType::S => ParamType::String,
        ScalarAttributeType::N => ParamType::Number,
        ScalarAttributeType::B => ParamType::Binary,
    }
}

// ---------------------------------------------------------------------------
// Typed interface
// ---------------------------------------------------------------------------

/// Typed access to a table's built-in CRUD operations.
///
/// The table must have been registered with `CompilerBuilder::crud`.
pub struct Crud<T> {
    dispatcher: Dispatcher,
    table: String,
    composite: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Crud<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crud")
            .field("table", &self.table)
            .field("composite", &self.composite)
            .finish_non_exhaustive()
    }
}

impl<T> Crud<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Binds the CRUD operations of `table`.
    ///
    /// # Errors
    ///
    /// Returns `CrudError::UnknownOperation` if the table's CRUD set is not
    /// registered.
    pub fn new(dispatcher: Dispatcher, table: &str) -> CrudResult<Self> {
        let compiler = dispatcher.compiler();
        let missing = CrudMethod::ALL
            .iter()
            .map(|m| m.operation_name(table))
            .find(|name| compiler.operation(name).is_none());
        if let Some(name) = missing {
            return Err(CrudError::UnknownOperation(name));
        }
        let composite = compiler
            .table(table)
            .is_some_and(|schema| schema.sort_key.is_some());
        Ok(Self {
            dispatcher,
            table: table.to_owned(),
            composite,
            _record: PhantomData,
        })
    }

    fn name(&self, method: CrudMethod) -> String {
        method.operation_name(&self.table)
    }

    fn key_args(&self, partition: ArgValue, sort: Option<ArgValue>) -> Vec<ArgValue> {
        let mut args = vec![partition];
        if self.composite {
            args.push(sort.unwrap_or_default());
        }
        args
    }

    /// Writes a record, replacing any existing one with the same key.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the record does not serialize to an item,
    /// `BindError::IncompleteKey` if it lacks a key attribute, and storage
    /// errors unchanged.
    pub fn save(&self, record: &T) -> CrudResult<()> {
        let item: Item = to_item(self.dispatcher.codec(), record)?;
        self.dispatcher
            .invoke(&self.name(CrudMethod::Save), vec![item.into()])?;
        Ok(())
    }

    /// Reads one record. `sort` is ignored for tables without a sort key.
    ///
    /// # Errors
    ///
    /// Returns `BindError::IncompleteKey` if a key value is missing and
    /// storage errors unchanged.
    pub fn load(&self, partition: impl Into<ArgValue>, sort: Option<ArgValue>) -> CrudResult<Option<T>> {
        let args = self.key_args(partition.into(), sort);
        let outcome = self.dispatcher.invoke(&self.name(CrudMethod::Load), args)?;
        Ok(outcome.into_record(self.dispatcher.codec())?)
    }

    /// Deletes one record. Deleting an absent record succeeds.
    ///
    /// # Errors
    ///
    /// Returns `BindError::IncompleteKey` if a key value is missing and
    /// storage errors unchanged.
    pub fn delete(&self, partition: impl Into<ArgValue>, sort: Option<ArgValue>) -> CrudResult<()> {
        let args = self.key_args(partition.into(), sort);
        self.dispatcher
            .invoke(&self.name(CrudMethod::Delete), args)?;
        Ok(())
    }

    /// Every record under one partition key, in sort-key order.
    ///
    /// # Errors
    ///
    /// Returns storage errors unchanged.
    pub fn group_by(&self, partition: impl Into<ArgValue>) -> CrudResult<Vec<T>> {
        let outcome = self
            .dispatcher
            .invoke(&self.name(CrudMethod::GroupBy), vec![partition.into()])?;
        Ok(outcome.into_records(self.dispatcher.codec())?)
    }

    /// One page of records under a partition key. Pass the previous page's
    /// cursor to continue; `None` starts from the beginning.
    ///
    /// # Errors
    ///
    /// Returns storage errors unchanged, and
    /// `CrudError::UnexpectedOutcome` if the operation yields no page.
    pub fn group_by_page(
        &self,
        partition: impl Into<ArgValue>,
        cursor: Option<Item>,
        limit: Option<u32>,
    ) -> CrudResult<PageResult<T>> {
        let outcome = self.dispatcher.invoke(
            &self.name(CrudMethod::GroupByPage),
            vec![partition.into(), ArgValue::cursor(cursor), limit.into()],
        )?;
        outcome
            .into_record_page(self.dispatcher.codec())?
            .ok_or_else(|| CrudError::UnexpectedOutcome {
                operation: self.name(CrudMethod::GroupByPage),
                expected: "page",
            })
    }

    /// Every record of the table.
    ///
    /// # Errors
    ///
    /// Returns storage errors unchanged.
    pub fn scan_all(&self) -> CrudResult<Vec<T>> {
        let outcome = self
            .dispatcher
            .invoke(&self.name(CrudMethod::ScanAll), Vec::new())?;
        Ok(outcome.into_records(self.dispatcher.codec())?)
    }
}

#[cfg(test)]
mod tests {
    use crudstack_model::KeyAttribute;

    use super::*;
    use crate::signature::Signature;

    fn book_schema() -> TableSchema {
        TableSchema::composite(
            "Book",
            KeyAttribute::new("Author", ScalarAttributeType::S),
            KeyAttribute::new("Id", ScalarAttributeType::N),
        )
    }

    #[test]
    fn test_should_name_operations_after_table() {
        let names: Vec<String> = crud_descriptors(&book_schema())
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            [
                "Book.save",
                "Book.load",
                "Book.delete",
                "Book.group_by",
                "Book.group_by_page",
                "Book.scan_all",
            ]
        );
    }

    #[test]
    fn test_should_type_key_parameters_from_schema() {
        let load = CrudMethod::Load.descriptor(&book_schema());
        assert_eq!(load.key_expression.as_deref(), Some("#pk = :pk AND #sk = :sk"));
        assert_eq!(load.parameters[1].param_type, ParamType::Number);
        assert_eq!(load.attribute_names["#sk"], "Id");
    }

    #[test]
    fn test_should_bind_partition_only_for_simple_tables() {
        let schema = TableSchema::simple("User", KeyAttribute::new("UserId", ScalarAttributeType::S));
        let delete = CrudMethod::Delete.descriptor(&schema);
        assert_eq!(delete.key_expression.as_deref(), Some("#pk = :pk"));
        assert_eq!(delete.parameters.len(), 1);
    }

    #[test]
    fn test_should_produce_valid_signatures() {
        for desc in crud_descriptors(&book_schema()) {
            assert!(Signature::new(desc).is_ok());
        }
    }
}
