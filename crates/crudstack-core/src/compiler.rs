//! Operation registry.
//!
//! Every declared operation is compiled exactly once, when the [`Compiler`]
//! is built: its signature is validated, its expressions are parsed and
//! checked against the declared parameters, and the factory for its kind is
//! constructed. Registration is all-or-nothing. The first error aborts the
//! build and no partially usable compiler is returned.
//!
//! At call time an invocation binds its arguments and calls straight into
//! the prepared factory.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tracing::debug;

use crudstack_model::{Item, OperationKind, TableSchema};

use crate::argument::{ArgValue, Arguments, bind, bind_named};
use crate::codec::{AttributeCodec, JsonAttributeCodec};
use crate::config::CrudConfig;
use crate::crud::crud_descriptors;
use crate::descriptor::{DescriptorSet, OperationDescriptor};
use crate::error::{BindError, CompileError, CrudError};
use crate::factory::{
    DeleteFactory, GetFactory, PagingDecorator, PutFactory, QueryFactory, RangeFactory, Request,
    ScanFactory, TransactWriteFactory, UpdateFactory,
};
use crate::page::PageResult;
use crate::signature::Signature;

// ---------------------------------------------------------------------------
// Compiled operations
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Handler {
    Get(GetFactory),
    Put(PutFactory),
    Delete(DeleteFactory),
    Update(UpdateFactory),
    Query(QueryFactory),
    Scan(ScanFactory),
    PagedQuery(PagingDecorator<QueryFactory>),
    PagedScan(PagingDecorator<ScanFactory>),
    TransactWrite(TransactWriteFactory),
}

/// A registered operation: its signature and the factory bound to it.
#[derive(Debug)]
pub struct CompiledOperation {
    signature: Signature,
    handler: Handler,
}

impl CompiledOperation {
    fn compile(
        signature: Signature,
        tables: &HashMap<String, TableSchema>,
        config: &CrudConfig,
    ) -> Result<Self, CompileError> {
        let table = &signature.descriptor().table;
        let schema = || {
            tables.get(table).ok_or_else(|| CompileError::UnknownTable {
                operation: signature.name().to_owned(),
                table: table.clone(),
            })
        };

        let handler = match signature.kind() {
            OperationKind::Get => Handler::Get(GetFactory::new(&signature, schema()?, config)?),
            OperationKind::Put => Handler::Put(PutFactory::new(&signature, schema()?, config)?),
            OperationKind::Delete => {
                Handler::Delete(DeleteFactory::new(&signature, schema()?, config)?)
            }
            OperationKind::Update => {
                Handler::Update(UpdateFactory::new(&signature, schema()?, config)?)
            }
            OperationKind::Query => {
                Handler::Query(QueryFactory::new(&signature, schema()?, config)?)
            }
            OperationKind::Scan => Handler::Scan(ScanFactory::new(&signature, schema()?, config)?),
            OperationKind::PagedQuery => Handler::PagedQuery(PagingDecorator::new(
                QueryFactory::new(&signature, schema()?, config)?,
            )),
            OperationKind::PagedScan => Handler::PagedScan(PagingDecorator::new(
                ScanFactory::new(&signature, schema()?, config)?,
            )),
            // Members name their own tables.
            OperationKind::TransactWrite => {
                Handler::TransactWrite(TransactWriteFactory::new(&signature, tables, config)?)
            }
        };
        Ok(Self { signature, handler })
    }

    /// The operation's signature.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The operation's kind.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.signature.kind()
    }

    /// Builds the request for one call.
    ///
    /// # Errors
    ///
    /// Returns any binding or codec error raised by the factory.
    pub fn create(
        &self,
        args: &Arguments<'_>,
        codec: &dyn AttributeCodec,
    ) -> Result<Request, CrudError> {
        Ok(match &self.handler {
            Handler::Get(f) => Request::Get(f.create(args, codec)?),
            Handler::Put(f) => Request::Put(f.create(args, codec)?),
            Handler::Delete(f) => Request::Delete(f.create(args, codec)?),
            Handler::Update(f) => Request::Update(f.create(args, codec)?),
            Handler::Query(f) => f.create(args, codec)?,
            Handler::Scan(f) => f.create(args, codec)?,
            Handler::PagedQuery(f) => f.create(args, codec)?,
            Handler::PagedScan(f) => f.create(args, codec)?,
            Handler::TransactWrite(f) => Request::TransactWrite(f.create(args, codec)?),
        })
    }

    /// Assembles one page for a paging operation; `None` for every other
    /// kind.
    pub(crate) fn assemble_page(
        &self,
        items: Vec<Item>,
        last_evaluated_key: Option<Item>,
    ) -> Option<PageResult<Item>> {
        match &self.handler {
            Handler::PagedQuery(f) => Some(f.assemble(items, last_evaluated_key)),
            Handler::PagedScan(f) => Some(f.assemble(items, last_evaluated_key)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

/// The set of registered operations, ready to compile calls.
///
/// Immutable after [`CompilerBuilder::build`]; share it behind an `Arc`.
#[derive(Debug)]
pub struct Compiler {
    config: CrudConfig,
    tables: HashMap<String, TableSchema>,
    operations: HashMap<String, CompiledOperation>,
    codec: Arc<dyn AttributeCodec>,
}

impl Compiler {
    /// Starts an empty registration.
    #[must_use]
    pub fn builder() -> CompilerBuilder {
        CompilerBuilder::default()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &CrudConfig {
        &self.config
    }

    /// Codec used for arguments and results.
    #[must_use]
    pub fn codec(&self) -> &dyn AttributeCodec {
        self.codec.as_ref()
    }

    /// A registered operation.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&CompiledOperation> {
        self.operations.get(name)
    }

    /// A registered table schema, by logical name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    /// Names of all registered operations, sorted.
    #[must_use]
    pub fn operation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Compiles a call with positional arguments.
    ///
    /// # Errors
    ///
    /// Returns `CrudError::UnknownOperation` for an unregistered name and any
    /// binding or codec error for the arguments.
    pub fn compile(&self, name: &str, values: Vec<ArgValue>) -> Result<Request, CrudError> {
        self.prepare(name, |sig| bind(sig, values)).map(|(_, request)| request)
    }

    /// Compiles a call with arguments keyed by parameter name.
    ///
    /// # Errors
    ///
    /// Returns `CrudError::UnknownOperation` for an unregistered name and any
    /// binding or codec error for the arguments.
    pub fn compile_named(
        &self,
        name: &str,
        values: HashMap<String, ArgValue>,
    ) -> Result<Request, CrudError> {
        self.prepare(name, |sig| bind_named(sig, values))
            .map(|(_, request)| request)
    }

    pub(crate) fn prepare<'a, B>(
        &'a self,
        name: &str,
        binder: B,
    ) -> Result<(&'a CompiledOperation, Request), CrudError>
    where
        B: FnOnce(&'a Signature) -> Result<Arguments<'a>, BindError>,
    {
        let op = self
            .operations
            .get(name)
            .ok_or_else(|| CrudError::UnknownOperation(name.to_owned()))?;
        let args = binder(&op.signature)?;
        let request = op.create(&args, self.codec.as_ref())?;
        debug!(
            operation = name,
            kind = %op.kind(),
            table = request.table_name().unwrap_or("<transaction>"),
            "compiled request"
        );
        Ok((op, request))
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects tables and operation descriptors, then compiles them together.
#[derive(Debug, Default)]
pub struct CompilerBuilder {
    config: CrudConfig,
    codec: Option<Arc<dyn AttributeCodec>>,
    tables: Vec<TableSchema>,
    operations: Vec<OperationDescriptor>,
}

impl CompilerBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: CrudConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default JSON codec.
    #[must_use]
    pub fn codec(mut self, codec: Arc<dyn AttributeCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Registers a table schema.
    #[must_use]
    pub fn table(mut self, schema: TableSchema) -> Self {
        self.tables.push(schema);
        self
    }

    /// Declares one operation.
    #[must_use]
    pub fn operation(mut self, descriptor: OperationDescriptor) -> Self {
        self.operations.push(descriptor);
        self
    }

    /// Declares several operations.
    #[must_use]
    pub fn operations(mut self, descriptors: impl IntoIterator<Item = OperationDescriptor>) -> Self {
        self.operations.extend(descriptors);
        self
    }

    /// Adds every table and operation of a loaded set.
    #[must_use]
    pub fn descriptor_set(mut self, set: DescriptorSet) -> Self {
        self.tables.extend(set.tables);
        self.operations.extend(set.operations);
        self
    }

    /// Registers a table together with its built-in CRUD operations.
    #[must_use]
    pub fn crud(mut self, schema: TableSchema) -> Self {
        self.operations.extend(crud_descriptors(&schema));
        self.tables.push(schema);
        self
    }

    /// Compiles every declared operation.
    ///
    /// # Errors
    ///
    /// Returns the first registration error. No operation is usable unless
    /// all of them compile.
    pub fn build(self) -> Result<Compiler, CompileError> {
        let mut tables = HashMap::with_capacity(self.tables.len());
        for schema in self.tables {
            match tables.entry(schema.table_name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(schema);
                }
                Entry::Occupied(existing) if *existing.get() != schema => {
                    return Err(CompileError::InvalidDescriptor {
                        operation: "<descriptor set>".to_owned(),
                        message: format!(
                            "table {} is registered twice with different key schemas",
                            schema.table_name
                        ),
                    });
                }
                Entry::Occupied(_) => {}
            }
        }

        let mut operations = HashMap::with_capacity(self.operations.len());
        for descriptor in self.operations {
            if operations.contains_key(&descriptor.name) {
                return Err(CompileError::DuplicateOperation {
                    operation: descriptor.name,
                });
            }
            let signature = Signature::new(descriptor)?;
            let compiled = CompiledOperation::compile(signature, &tables, &self.config)?;
            debug!(
                operation = compiled.signature.name(),
                kind = %compiled.kind(),
                table = %compiled.signature.descriptor().table,
                parameters = compiled.signature.parameters().len(),
                "registered operation"
            );
            operations.insert(compiled.signature.name().to_owned(), compiled);
        }

        Ok(Compiler {
            config: self.config,
            tables,
            operations,
            codec: self
                .codec
                .unwrap_or_else(|| Arc::new(JsonAttributeCodec)),
        })
    }
}

#[cfg(test)]
mod tests {
    use crudstack_model::types::ScalarAttributeType;
    use crudstack_model::{AttributeValue, KeyAttribute};

    use super::*;
    use crate::descriptor::{ParamType, ParameterDescriptor};

    fn book_schema() -> TableSchema {
        TableSchema::composite(
            "Book",
            KeyAttribute::new("Author", ScalarAttributeType::S),
            KeyAttribute::new("Id", ScalarAttributeType::S),
        )
    }

    fn delete_book() -> OperationDescriptor {
        OperationDescriptor::new("deleteBook", OperationKind::Delete, "Book")
            .param(ParameterDescriptor::value(":author", ParamType::String))
            .param(ParameterDescriptor::value(":id", ParamType::String))
            .key("Author = :author AND Id = :id")
    }

    #[test]
    fn test_should_compile_registered_operation() {
        let compiler = Compiler::builder()
            .table(book_schema())
            .operation(delete_book())
            .build()
            .unwrap();
        let Request::Delete(input) = compiler
            .compile("deleteBook", vec!["X".into(), "42".into()])
            .unwrap()
        else {
            panic!("expected a delete request");
        };
        assert_eq!(input.key["Author"], AttributeValue::from("X"));
        assert_eq!(input.key["Id"], AttributeValue::from("42"));
    }

    #[test]
    fn test_should_compile_named_arguments() {
        let compiler = Compiler::builder()
            .table(book_schema())
            .operation(delete_book())
            .build()
            .unwrap();
        let request = compiler
            .compile_named(
                "deleteBook",
                HashMap::from([
                    (":id".to_owned(), ArgValue::from("42")),
                    (":author".to_owned(), ArgValue::from("X")),
                ]),
            )
            .unwrap();
        assert_eq!(request.table_name(), Some("Book"));
    }

    #[test]
    fn test_should_fail_whole_registration_on_one_bad_operation() {
        let bad = OperationDescriptor::new("badDelete", OperationKind::Delete, "Book")
            .param(ParameterDescriptor::value(":author", ParamType::String))
            .param(ParameterDescriptor::value(":id", ParamType::String))
            .key("Author = :author AND Id = :id")
            .condition("Title = :title");
        let err = Compiler::builder()
            .table(book_schema())
            .operation(delete_book())
            .operation(bad)
            .build()
            .unwrap_err();
        assert!(matches!(err, CompileError::UndeclaredPlaceholder { placeholder, .. } if placeholder == ":title"));
    }

    #[test]
    fn test_should_reject_duplicate_operation_names() {
        let err = Compiler::builder()
            .table(book_schema())
            .operation(delete_book())
            .operation(delete_book())
            .build()
            .unwrap_err();
        assert!(matches!(err, CompileError::DuplicateOperation { .. }));
    }

    #[test]
    fn test_should_reject_unknown_table() {
        let err = Compiler::builder()
            .operation(delete_book())
            .build()
            .unwrap_err();
        assert!(matches!(err, CompileError::UnknownTable { table, .. } if table == "Book"));
    }

    #[test]
    fn test_should_reject_conflicting_table_schemas() {
        let err = Compiler::builder()
            .table(book_schema())
            .table(TableSchema::simple(
                "Book",
                KeyAttribute::new("Id", ScalarAttributeType::S),
            ))
            .build()
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_should_report_unknown_operation_at_call_time() {
        let compiler = Compiler::builder().build().unwrap();
        let err = compiler.compile("nothing", vec![]).unwrap_err();
        assert!(matches!(err, CrudError::UnknownOperation(name) if name == "nothing"));
    }

    #[test]
    fn test_should_register_crud_set() {
        let compiler = Compiler::builder().crud(book_schema()).build().unwrap();
        assert_eq!(
            compiler.operation_names(),
            [
                "Book.delete",
                "Book.group_by",
                "Book.group_by_page",
                "Book.load",
                "Book.save",
                "Book.scan_all",
            ]
        );
        assert!(compiler.table("Book").is_some());
    }
}
