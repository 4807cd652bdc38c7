//! In-memory storage engine for CrudStack.
//!
//! [`MemoryEngine`] implements [`StorageEngine`](crudstack_model::StorageEngine)
//! over partitioned, sort-key-ordered tables held in process memory. It
//! evaluates condition, filter and key-condition expressions, applies update
//! expressions, pages query and scan results by limit and exclusive start
//! key, and commits transactional writes all-or-nothing. It backs the
//! compiler's tests and works as a local stand-in for a real store.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod expression;
pub mod storage;

pub use config::MemoryConfig;
pub use engine::MemoryEngine;
pub use expression::ExpressionError;
pub use storage::{KeyError, TableStorage};
