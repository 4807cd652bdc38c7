//! Operation kinds a descriptor can declare.

use std::fmt;

use serde::{Deserialize, Serialize};

/// All supported operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    // Item CRUD
    /// Point read by primary key.
    Get,
    /// Full-item write.
    Put,
    /// Delete by primary key.
    Delete,
    /// In-place update by primary key.
    Update,

    // Query & Scan
    /// Key-condition query, all pages.
    Query,
    /// Full-table scan, all pages.
    Scan,
    /// Key-condition query, one page per call.
    PagedQuery,
    /// Full-table scan, one page per call.
    PagedScan,

    // Transactions
    /// All-or-nothing group of writes.
    TransactWrite,
}

impl OperationKind {
    /// Returns the operation kind name string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "Get",
            Self::Put => "Put",
            Self::Delete => "Delete",
            Self::Update => "Update",
            Self::Query => "Query",
            Self::Scan => "Scan",
            Self::PagedQuery => "PagedQuery",
            Self::PagedScan => "PagedScan",
            Self::TransactWrite => "TransactWrite",
        }
    }

    /// Parse a name string into an `OperationKind`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Get" => Some(Self::Get),
            "Put" => Some(Self::Put),
            "Delete" => Some(Self::Delete),
            "Update" => Some(Self::Update),
            "Query" => Some(Self::Query),
            "Scan" => Some(Self::Scan),
            "PagedQuery" => Some(Self::PagedQuery),
            "PagedScan" => Some(Self::PagedScan),
            "TransactWrite" => Some(Self::TransactWrite),
            _ => None,
        }
    }

    /// `true` for kinds that return one page plus a continuation cursor.
    #[must_use]
    pub fn is_paging(&self) -> bool {
        matches!(self, Self::PagedQuery | Self::PagedScan)
    }

    /// `true` for kinds that read a range of items.
    #[must_use]
    pub fn is_range_read(&self) -> bool {
        matches!(
            self,
            Self::Query | Self::Scan | Self::PagedQuery | Self::PagedScan
        )
    }

    /// `true` for kinds that address exactly one item by primary key.
    #[must_use]
    pub fn is_keyed(&self) -> bool {
        matches!(self, Self::Get | Self::Delete | Self::Update)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
