//! Shared fixtures: a `Book` table, an in-memory engine holding it, and a
//! dispatcher wired to both.
#![allow(dead_code)]

use std::sync::{Arc, Once};

use crudstack_core::{Compiler, CompilerBuilder, Dispatcher};
use crudstack_memory::MemoryEngine;
use crudstack_model::types::ScalarAttributeType;
use crudstack_model::{AttributeValue, Item, KeyAttribute, StorageEngine, TableSchema};

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// `Book` keyed by `Author` (partition) and `Id` (sort), both strings.
#[must_use]
pub fn book_schema() -> TableSchema {
    TableSchema::composite(
        "Book",
        KeyAttribute::new("Author", ScalarAttributeType::S),
        KeyAttribute::new("Id", ScalarAttributeType::S),
    )
}

/// An engine holding an empty `Book` table.
#[must_use]
pub fn engine() -> Arc<MemoryEngine> {
    let engine = MemoryEngine::default();
    engine
        .create_table(book_schema())
        .unwrap_or_else(|e| panic!("failed to create Book: {e}"));
    Arc::new(engine)
}

/// Builds the compiler and pairs it with `engine`.
#[must_use]
pub fn dispatcher(builder: CompilerBuilder, engine: &Arc<MemoryEngine>) -> Dispatcher {
    init_tracing();
    let compiler = builder
        .table(book_schema())
        .build()
        .unwrap_or_else(|e| panic!("registration failed: {e}"));
    Dispatcher::new(Arc::new(compiler), engine.clone())
}

/// A builder with no operations yet.
#[must_use]
pub fn builder() -> CompilerBuilder {
    Compiler::builder()
}

#[must_use]
pub fn key(author: &str, id: &str) -> Item {
    Item::from([
        ("Author".to_owned(), AttributeValue::from(author)),
        ("Id".to_owned(), AttributeValue::from(id)),
    ])
}

#[must_use]
pub fn book(author: &str, id: &str, title: &str) -> Item {
    let mut item = key(author, id);
    item.insert("Title".to_owned(), AttributeValue::from(title));
    item
}

/// Writes items straight through the engine, bypassing the compiler.
pub fn seed(engine: &MemoryEngine, items: impl IntoIterator<Item = Item>) {
    for item in items {
        engine
            .put_item(crudstack_model::input::PutItemInput {
                table_name: "Book".to_owned(),
                item,
                ..Default::default()
            })
            .unwrap_or_else(|e| panic!("seed failed: {e}"));
    }
}

/// Reads one book straight through the engine.
#[must_use]
pub fn stored(engine: &MemoryEngine, author: &str, id: &str) -> Option<Item> {
    engine
        .get_item(crudstack_model::input::GetItemInput {
            table_name: "Book".to_owned(),
            key: key(author, id),
            ..Default::default()
        })
        .unwrap_or_else(|e| panic!("get failed: {e}"))
        .item
}
