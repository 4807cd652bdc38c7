//! The storage engine boundary.
//!
//! Compiled requests are handed to an implementation of [`StorageEngine`].
//! The trait is deliberately one method per request type so an engine can be
//! a thin adapter over a remote client or an in-process store.

use std::fmt;

use crate::error::StorageError;
use crate::input::{
    DeleteItemInput, GetItemInput, PutItemInput, QueryInput, ScanInput, TransactWriteItemsInput,
    UpdateItemInput,
};
use crate::output::{
    DeleteItemOutput, GetItemOutput, PutItemOutput, QueryOutput, ScanOutput,
    TransactWriteItemsOutput, UpdateItemOutput,
};

/// A key/attribute store that executes compiled requests.
pub trait StorageEngine: Send + Sync + fmt::Debug {
    /// Write a full item.
    ///
    /// # Errors
    ///
    /// Returns the engine's error unchanged, including a conditional failure
    /// carrying the old item when the request's failure policy asks for it.
    fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, StorageError>;

    /// Read one item by primary key.
    ///
    /// # Errors
    ///
    /// Returns the engine's error unchanged.
    fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, StorageError>;

    /// Delete one item by primary key.
    ///
    /// # Errors
    ///
    /// Returns the engine's error unchanged.
    fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, StorageError>;

    /// Update one item in place.
    ///
    /// # Errors
    ///
    /// Returns the engine's error unchanged.
    fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, StorageError>;

    /// Read one page of a key-condition query.
    ///
    /// # Errors
    ///
    /// Returns the engine's error unchanged.
    fn query(&self, input: QueryInput) -> Result<QueryOutput, StorageError>;

    /// Read one page of a full-table scan.
    ///
    /// # Errors
    ///
    /// Returns the engine's error unchanged.
    fn scan(&self, input: ScanInput) -> Result<ScanOutput, StorageError>;

    /// Apply a group of writes atomically.
    ///
    /// # Errors
    ///
    /// Returns a `TransactionCanceled` error with one reason per member when
    /// any member's condition fails; nothing is written in that case.
    fn transact_write_items(
        &self,
        input: TransactWriteItemsInput,
    ) -> Result<TransactWriteItemsOutput, StorageError>;
}
