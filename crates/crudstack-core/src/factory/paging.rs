//! Paging decorator.
//!
//! Wraps a query or scan factory. Request construction is delegated
//! unchanged; the decorator's own job is turning one storage page into a
//! [`PageResult`] whose cursor is absent exactly when the sequence ends.
//! The caller holds the pagination state and feeds the cursor back in as an
//! argument.

use crudstack_model::Item;

use crate::argument::Arguments;
use crate::codec::AttributeCodec;
use crate::error::CrudError;
use crate::factory::{RangeFactory, Request};
use crate::page::PageResult;

/// A range factory whose results are returned one page at a time.
#[derive(Debug, Clone)]
pub struct PagingDecorator<F> {
    inner: F,
}

impl<F: RangeFactory> PagingDecorator<F> {
    /// Wraps an already-built factory.
    #[must_use]
    pub fn new(inner: F) -> Self {
        Self { inner }
    }

    /// The wrapped factory.
    #[must_use]
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// Assembles one page from the store's raw response.
    #[must_use]
    pub fn assemble(&self, items: Vec<Item>, last_evaluated_key: Option<Item>) -> PageResult<Item> {
        PageResult::from_raw(items, last_evaluated_key)
    }
}

impl<F: RangeFactory> RangeFactory for PagingDecorator<F> {
    fn create(&self, args: &Arguments<'_>, codec: &dyn AttributeCodec) -> Result<Request, CrudError> {
        self.inner.create(args, codec)
    }
}
