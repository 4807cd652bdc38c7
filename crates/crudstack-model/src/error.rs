//! Storage engine error types.
//!
//! Every engine reports failures through [`StorageError`]. The compiler never
//! rewrites these: a rejected condition, a missing table or a throttled call
//! reaches the caller with the code, message and attached item the engine
//! produced.

use std::fmt;

use crate::Item;
use crate::types::CancellationReason;

/// Well-known storage error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum StorageErrorCode {
    /// A condition expression evaluated to false.
    ConditionalCheckFailed,
    /// The table does not exist.
    ResourceNotFound,
    /// The engine throttled the request.
    ProvisionedThroughputExceeded,
    /// The request was malformed or violated a limit.
    #[default]
    Validation,
    /// A transactional write was cancelled.
    TransactionCanceled,
    /// The engine could not be reached.
    Transport,
    /// Unexpected engine failure.
    Internal,
}

impl StorageErrorCode {
    /// Returns the short error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConditionalCheckFailed => "ConditionalCheckFailedException",
            Self::ResourceNotFound => "ResourceNotFoundException",
            Self::ProvisionedThroughputExceeded => "ProvisionedThroughputExceededException",
            Self::Validation => "ValidationException",
            Self::TransactionCanceled => "TransactionCanceledException",
            Self::Transport => "TransportError",
            Self::Internal => "InternalServerError",
        }
    }

    /// Whether a caller may reasonably retry the same request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProvisionedThroughputExceeded | Self::Transport | Self::Internal
        )
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error reported by a storage engine.
#[derive(Debug)]
pub struct StorageError {
    /// The error code.
    pub code: StorageErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The item as it existed when a condition failed, if the operation's
    /// failure policy asked for it.
    pub item: Option<Item>,
    /// Per-member reasons of a cancelled transaction, in request order.
    pub cancellation_reasons: Vec<CancellationReason>,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl StorageError {
    /// Create a new `StorageError` from an error code.
    #[must_use]
    pub fn new(code: StorageErrorCode) -> Self {
        Self::with_message(code, code.as_str())
    }

    /// Create a new `StorageError` with a custom message.
    #[must_use]
    pub fn with_message(code: StorageErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            item: None,
            cancellation_reasons: Vec::new(),
            source: None,
        }
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach the item observed when a condition failed.
    #[must_use]
    pub fn with_item(mut self, item: Option<Item>) -> Self {
        self.item = item;
        self
    }

    // -- Convenience constructors --

    /// Condition expression evaluated to false.
    #[must_use]
    pub fn conditional_check_failed(item: Option<Item>) -> Self {
        Self::with_message(
            StorageErrorCode::ConditionalCheckFailed,
            "The conditional request failed",
        )
        .with_item(item)
    }

    /// Table not found.
    #[must_use]
    pub fn resource_not_found(table: &str) -> Self {
        Self::with_message(
            StorageErrorCode::ResourceNotFound,
            format!("Requested resource not found: Table: {table} not found"),
        )
    }

    /// Validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(StorageErrorCode::Validation, message)
    }

    /// Transaction cancelled, with one reason per member.
    #[must_use]
    pub fn transaction_canceled(reasons: Vec<CancellationReason>) -> Self {
        let codes: Vec<&str> = reasons.iter().map(|r| r.code.as_str()).collect();
        let mut err = Self::with_message(
            StorageErrorCode::TransactionCanceled,
            format!(
                "Transaction cancelled, please refer cancellation reasons for specific reasons [{}]",
                codes.join(", ")
            ),
        );
        err.cancellation_reasons = reasons;
        err
    }

    /// Internal engine error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(StorageErrorCode::Internal, message)
    }
}

/// Create a `StorageError` from an error code.
///
/// # Examples
///
/// ```
/// use crudstack_model::storage_error;
/// use crudstack_model::error::StorageErrorCode;
///
/// let err = storage_error!(Validation);
/// assert_eq!(err.code, StorageErrorCode::Validation);
///
/// let err = storage_error!(ResourceNotFound, "Table not found");
/// assert_eq!(err.message, "Table not found");
/// ```
#[macro_export]
macro_rules! storage_error {
    ($code:ident) => {
        $crate::error::StorageError::new($crate::error::StorageErrorCode::$code)
    };
    ($code:ident, $msg:expr) => {
        $crate::error::StorageError::with_message($crate::error::StorageErrorCode::$code, $msg)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttributeValue;

    #[test]
    fn test_should_carry_old_item_on_conditional_failure() {
        let old: Item = [("Author".to_owned(), AttributeValue::from("X"))]
            .into_iter()
            .collect();
        let err = StorageError::conditional_check_failed(Some(old.clone()));
        assert_eq!(err.code, StorageErrorCode::ConditionalCheckFailed);
        assert_eq!(err.item, Some(old));
    }

    #[test]
    fn test_should_list_reason_codes_in_cancellation_message() {
        let err = StorageError::transaction_canceled(vec![
            CancellationReason::none(),
            CancellationReason::conditional_check_failed(None),
        ]);
        assert_eq!(err.cancellation_reasons.len(), 2);
        assert!(err.message.contains("[None, ConditionalCheckFailed]"));
    }

    #[test]
    fn test_should_mark_throttling_retryable() {
        assert!(StorageErrorCode::ProvisionedThroughputExceeded.is_retryable());
        assert!(!StorageErrorCode::ConditionalCheckFailed.is_retryable());
    }
}
