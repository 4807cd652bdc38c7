//! Dispatcher: compile a call, execute it, shape the result.
//!
//! Routing is fixed at registration by the operation's kind. A call builds
//! its request through the [`Compiler`] and hands it to the
//! [`StorageEngine`]. Storage errors are returned unchanged and never
//! retried.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crudstack_model::{Item, StorageEngine, StorageError, storage_error};

use crate::argument::{ArgValue, bind, bind_named};
use crate::codec::{AttributeCodec, from_item};
use crate::compiler::{CompiledOperation, Compiler};
use crate::error::{CodecError, CrudResult};
use crate::factory::Request;
use crate::page::PageResult;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The shaped result of one call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A write that reports nothing.
    Done,
    /// An optional single record: a point read, or the old/new item a write
    /// was asked to return.
    Item(Option<Item>),
    /// Every item of a non-paging range read.
    Items(Vec<Item>),
    /// One page of a paging range read.
    Page(PageResult<Item>),
}

impl Outcome {
    /// The single item, if this outcome carries one.
    #[must_use]
    pub fn into_item(self) -> Option<Item> {
        match self {
            Self::Item(item) => item,
            _ => None,
        }
    }

    /// All carried items.
    #[must_use]
    pub fn into_items(self) -> Vec<Item> {
        match self {
            Self::Done => Vec::new(),
            Self::Item(item) => item.into_iter().collect(),
            Self::Items(items) => items,
            Self::Page(page) => page.items,
        }
    }

    /// The raw page of a paging read.
    #[must_use]
    pub fn into_raw_page(self) -> Option<PageResult<Item>> {
        match self {
            Self::Page(page) => Some(page),
            _ => None,
        }
    }

    /// Decodes the single item into a record.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` if the item does not fit `T`.
    pub fn into_record<T: DeserializeOwned>(
        self,
        codec: &dyn AttributeCodec,
    ) -> Result<Option<T>, CodecError> {
        self.into_item()
            .map(|item| from_item(codec, &item))
            .transpose()
    }

    /// Decodes all carried items into records.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` if any item does not fit `T`.
    pub fn into_records<T: DeserializeOwned>(
        self,
        codec: &dyn AttributeCodec,
    ) -> Result<Vec<T>, CodecError> {
        self.into_items()
            .iter()
            .map(|item| from_item(codec, item))
            .collect()
    }

    /// Decodes a page into records and a typed cursor.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` if an item or the cursor does not fit its
    /// target type.
    pub fn into_page<T, K>(
        self,
        codec: &dyn AttributeCodec,
    ) -> Result<Option<PageResult<T, K>>, CodecError>
    where
        T: DeserializeOwned,
        K: DeserializeOwned,
    {
        self.into_raw_page().map(|page| page.decode(codec)).transpose()
    }

    /// Decodes a page into records and keeps the raw cursor.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` if an item does not fit `T`.
    pub fn into_record_page<T>(
        self,
        codec: &dyn AttributeCodec,
    ) -> Result<Option<PageResult<T>>, CodecError>
    where
        T: DeserializeOwned,
    {
        self.into_raw_page()
            .map(|page| page.decode_items(codec))
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Executes registered operations against a storage engine.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    compiler: Arc<Compiler>,
    engine: Arc<dyn StorageEngine>,
}

impl Dispatcher {
    /// Pairs a compiler with the engine that executes its requests.
    #[must_use]
    pub fn new(compiler: Arc<Compiler>, engine: Arc<dyn StorageEngine>) -> Self {
        Self { compiler, engine }
    }

    /// The compiler.
    #[must_use]
    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// The codec used for arguments and results.
    #[must_use]
    pub fn codec(&self) -> &dyn AttributeCodec {
        self.compiler.codec()
    }

    /// Invokes an operation with positional arguments.
    ///
    /// # Errors
    ///
    /// Returns binding errors before anything reaches storage, and storage
    /// errors unchanged.
    pub fn invoke(&self, name: &str, values: Vec<ArgValue>) -> CrudResult<Outcome> {
        let (op, request) = self.compiler.prepare(name, |sig| bind(sig, values))?;
        self.execute(op, request)
    }

    /// Invokes an operation with arguments keyed by parameter name.
    ///
    /// # Errors
    ///
    /// Returns binding errors before anything reaches storage, and storage
    /// errors unchanged.
    pub fn invoke_named(
        &self,
        name: &str,
        values: HashMap<String, ArgValue>,
    ) -> CrudResult<Outcome> {
        let (op, request) = self.compiler.prepare(name, |sig| bind_named(sig, values))?;
        self.execute(op, request)
    }

    fn execute(&self, op: &CompiledOperation, request: Request) -> CrudResult<Outcome> {
        let engine = self.engine.as_ref();
        Ok(match request {
            Request::Get(input) => Outcome::Item(engine.get_item(input)?.item),
            Request::Put(input) => Outcome::Item(engine.put_item(input)?.attributes),
            Request::Delete(input) => Outcome::Item(engine.delete_item(input)?.attributes),
            Request::Update(input) => Outcome::Item(engine.update_item(input)?.attributes),
            Request::TransactWrite(input) => {
                engine.transact_write_items(input)?;
                Outcome::Done
            }
            range @ (Request::Query(_) | Request::Scan(_)) => {
                if op.kind().is_paging() {
                    let (items, last_evaluated_key) = self.fetch(range)?;
                    match op.assemble_page(items, last_evaluated_key) {
                        Some(page) => Outcome::Page(page),
                        None => Outcome::Done,
                    }
                } else {
                    Outcome::Items(self.drain(op, range)?)
                }
            }
        })
    }

    fn fetch(&self, request: Request) -> Result<(Vec<Item>, Option<Item>), StorageError> {
        match request {
            Request::Query(input) => self
                .engine
                .query(input)
                .map(|out| (out.items, out.last_evaluated_key)),
            Request::Scan(input) => self
                .engine
                .scan(input)
                .map(|out| (out.items, out.last_evaluated_key)),
            _ => Err(storage_error!(Validation, "request is not a range read")),
        }
    }

    /// Follows the cursor until the range is exhausted or the request's limit
    /// is reached. Exceeding `max_pages` is an error, not a truncation.
    fn drain(&self, op: &CompiledOperation, mut request: Request) -> CrudResult<Vec<Item>> {
        let cap = request.limit().and_then(|n| usize::try_from(n).ok());
        let max_pages = self.compiler.config().max_pages;
        let mut items = Vec::new();
        let mut pages = 0_usize;

        loop {
            let (page, last_evaluated_key) = self.fetch(request.clone())?;
            pages += 1;
            items.extend(page);

            if let Some(cap) = cap {
                if items.len() >= cap {
                    items.truncate(cap);
                    break;
                }
            }
            let Some(next) = last_evaluated_key.filter(|key| !key.is_empty()) else {
                break;
            };
            if let Some(max) = max_pages {
                if pages >= max {
                    return Err(storage_error!(
                        Validation,
                        format!(
                            "{} needs more than {max} pages; use a paging operation instead",
                            op.signature().name()
                        )
                    )
                    .into());
                }
            }
            request.set_exclusive_start_key(Some(next));
        }

        debug!(
            operation = op.signature().name(),
            pages,
            items = items.len(),
            "drained range read"
        );
        Ok(items)
    }
}
