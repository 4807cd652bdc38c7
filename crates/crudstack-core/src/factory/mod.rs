//! Operation factories.
//!
//! One factory per operation kind. Each is built once at registration, where
//! it parses and validates its expressions, and then turns a call's bound
//! [`Arguments`] into a fully populated request object. Factories are pure:
//! they hold no per-call state and never talk to storage.

pub mod delete;
pub mod get;
pub mod paging;
pub mod put;
pub mod query;
pub mod transact;
pub mod update;

use std::fmt;

use serde::Serialize;

use crudstack_model::Item;
use crudstack_model::input::{
    DeleteItemInput, GetItemInput, PutItemInput, QueryInput, ScanInput, TransactWriteItemsInput,
    UpdateItemInput,
};

use crate::argument::Arguments;
use crate::codec::AttributeCodec;
use crate::error::{CompileError, CrudError};
use crate::expression::ParsedExpression;
use crate::signature::Signature;

pub use delete::DeleteFactory;
pub use get::GetFactory;
pub use paging::PagingDecorator;
pub use put::PutFactory;
pub use query::{QueryFactory, ScanFactory};
pub use transact::TransactWriteFactory;
pub use update::UpdateFactory;

/// A compiled request, ready for the storage engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Request {
    /// Point read.
    Get(GetItemInput),
    /// Full-item write.
    Put(PutItemInput),
    /// Delete by key.
    Delete(DeleteItemInput),
    /// In-place update.
    Update(UpdateItemInput),
    /// One page of a query.
    Query(QueryInput),
    /// One page of a scan.
    Scan(ScanInput),
    /// All-or-nothing writes.
    TransactWrite(TransactWriteItemsInput),
}

impl Request {
    /// Physical target table, or `None` for a transaction spanning tables.
    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        match self {
            Self::Get(r) => Some(&r.table_name),
            Self::Put(r) => Some(&r.table_name),
            Self::Delete(r) => Some(&r.table_name),
            Self::Update(r) => Some(&r.table_name),
            Self::Query(r) => Some(&r.table_name),
            Self::Scan(r) => Some(&r.table_name),
            Self::TransactWrite(_) => None,
        }
    }

    /// Page-size limit of a query or scan.
    #[must_use]
    pub fn limit(&self) -> Option<u32> {
        match self {
            Self::Query(r) => r.limit,
            Self::Scan(r) => r.limit,
            _ => None,
        }
    }

    /// Continues a query or scan after `key`. No effect on other requests.
    pub fn set_exclusive_start_key(&mut self, key: Option<Item>) {
        match self {
            Self::Query(r) => r.exclusive_start_key = key,
            Self::Scan(r) => r.exclusive_start_key = key,
            _ => {}
        }
    }
}

/// A factory whose requests read a range of items.
pub trait RangeFactory: fmt::Debug + Send + Sync {
    /// Builds one page's request.
    ///
    /// # Errors
    ///
    /// Returns a binding or codec error if the arguments cannot satisfy the
    /// operation's expressions.
    fn create(&self, args: &Arguments<'_>, codec: &dyn AttributeCodec) -> Result<Request, CrudError>;
}

// ---------------------------------------------------------------------------
// Registration helpers
// ---------------------------------------------------------------------------

/// Parses an optional expression; absent or blank text means none.
pub(crate) fn parse_optional(
    signature: &Signature,
    text: Option<&str>,
) -> Result<Option<ParsedExpression>, CompileError> {
    let Some(text) = text else {
        return Ok(None);
    };
    let parsed = ParsedExpression::parse(text).map_err(|e| CompileError::MalformedExpression {
        operation: signature.name().to_owned(),
        expression: text.to_owned(),
        message: e.to_string(),
    })?;
    Ok((!parsed.is_empty()).then_some(parsed))
}

/// Parses an expression the operation kind cannot do without.
pub(crate) fn parse_required(
    signature: &Signature,
    field: &'static str,
    text: Option<&str>,
) -> Result<ParsedExpression, CompileError> {
    parse_optional(signature, text)?.ok_or_else(|| CompileError::MissingField {
        operation: signature.name().to_owned(),
        kind: signature.kind().to_string(),
        field,
    })
}

/// Rejects value placeholders in a projection.
pub(crate) fn check_projection(
    signature: &Signature,
    projection: Option<&ParsedExpression>,
) -> Result<(), CompileError> {
    match projection {
        Some(p) if !p.value_placeholders().is_empty() => Err(CompileError::MalformedExpression {
            operation: signature.name().to_owned(),
            expression: p.text().to_owned(),
            message: "projection expressions cannot contain value placeholders".to_owned(),
        }),
        _ => Ok(()),
    }
}

/// Request text of an optional expression.
pub(crate) fn request_text(expr: Option<&ParsedExpression>) -> Option<String> {
    expr.and_then(ParsedExpression::to_request_text)
}
