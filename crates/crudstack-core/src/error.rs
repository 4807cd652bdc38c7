//! Error types for the compiler.
//!
//! Failures fall into three layers. [`CompileError`] is raised while
//! registering operations and aborts the whole registration. [`BindError`]
//! and [`CodecError`] abort a single call before anything reaches storage.
//! [`StorageError`] comes from the engine and is passed through untouched.

use crudstack_model::StorageError;

use crate::descriptor::ParamType;

/// Registration-time failure. Fatal; never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// An expression references a value placeholder no parameter declares.
    #[error("operation '{operation}': undeclared placeholder {placeholder} in expression \"{expression}\"")]
    UndeclaredPlaceholder {
        /// Operation being registered.
        operation: String,
        /// The offending token, marker included.
        placeholder: String,
        /// The full expression text.
        expression: String,
    },

    /// An expression could not be tokenized.
    #[error("operation '{operation}': malformed expression \"{expression}\": {message}")]
    MalformedExpression {
        /// Operation being registered.
        operation: String,
        /// The full expression text.
        expression: String,
        /// What is wrong with it.
        message: String,
    },

    /// Two parameters share a name.
    #[error("operation '{operation}': parameter {parameter} declared more than once")]
    DuplicateParameter {
        /// Operation being registered.
        operation: String,
        /// The repeated parameter name.
        parameter: String,
    },

    /// Two operations share a name.
    #[error("operation '{operation}' registered more than once")]
    DuplicateOperation {
        /// The repeated operation name.
        operation: String,
    },

    /// An operation targets a table that was never registered.
    #[error("operation '{operation}': unknown table '{table}'")]
    UnknownTable {
        /// Operation being registered.
        operation: String,
        /// The unknown table name.
        table: String,
    },

    /// A field the operation kind requires is missing.
    #[error("operation '{operation}': {kind} requires {field}")]
    MissingField {
        /// Operation being registered.
        operation: String,
        /// Operation kind name.
        kind: String,
        /// The missing field.
        field: &'static str,
    },

    /// Any other structural problem with a descriptor.
    #[error("operation '{operation}': {message}")]
    InvalidDescriptor {
        /// Operation being registered.
        operation: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Call-time failure while binding arguments. Aborts only the current call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    /// The caller supplied a different number of values than declared.
    #[error("operation '{operation}': expected {expected} arguments, got {actual}")]
    ArityMismatch {
        /// Operation being invoked.
        operation: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied value count.
        actual: usize,
    },

    /// A value does not match its parameter's declared type.
    #[error("operation '{operation}': parameter {parameter} expects {expected}, got {actual}")]
    ArgumentType {
        /// Operation being invoked.
        operation: String,
        /// Parameter name.
        parameter: String,
        /// Declared type.
        expected: ParamType,
        /// Description of the supplied value's type.
        actual: String,
    },

    /// A primary-key attribute has no bound value.
    #[error("operation '{operation}': key attribute '{attribute}' has no value")]
    IncompleteKey {
        /// Operation being invoked.
        operation: String,
        /// Physical key attribute name.
        attribute: String,
    },

    /// A value placeholder is bound to an absent value.
    #[error("operation '{operation}': placeholder {placeholder} is bound to null")]
    NullValuePlaceholder {
        /// Operation being invoked.
        operation: String,
        /// The placeholder, marker included.
        placeholder: String,
    },

    /// A named argument matches no declared parameter.
    #[error("operation '{operation}': no parameter named {name}")]
    UnknownArgument {
        /// Operation being invoked.
        operation: String,
        /// The unmatched name.
        name: String,
    },
}

/// Failure converting between caller values and storage attribute values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("attribute codec error: {message}")]
pub struct CodecError {
    /// What went wrong.
    pub message: String,
}

impl CodecError {
    /// Creates a codec error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Top-level error of the compiler and dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum CrudError {
    /// Registration failed.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Binding failed.
    #[error(transparent)]
    Bind(#[from] BindError),

    /// Encoding or decoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The storage engine rejected the request.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No operation with this name is registered.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// The operation produced a different outcome than its caller reads.
    #[error("operation '{operation}' did not produce a {expected}")]
    UnexpectedOutcome {
        operation: String,
        expected: &'static str,
    },
}

impl CrudError {
    /// The storage engine's error, if this is one.
    #[must_use]
    pub fn storage(&self) -> Option<&StorageError> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }

    /// The binding error, if this is one.
    #[must_use]
    pub fn bind(&self) -> Option<&BindError> {
        match self {
            Self::Bind(err) => Some(err),
            _ => None,
        }
    }
}

/// Convenience result type for compiler operations.
pub type CrudResult<T> = Result<T, CrudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_name_placeholder_and_expression_in_message() {
        let err = CompileError::UndeclaredPlaceholder {
            operation: "deleteBook".to_owned(),
            placeholder: ":isbn".to_owned(),
            expression: "Isbn = :isbn".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains(":isbn"));
        assert!(msg.contains("Isbn = :isbn"));
    }

    #[test]
    fn test_should_pass_storage_error_through_unchanged() {
        let err: CrudError = StorageError::resource_not_found("Book").into();
        let storage = err.storage().unwrap();
        assert_eq!(storage.code, crudstack_model::StorageErrorCode::ResourceNotFound);
        assert_eq!(err.to_string(), storage.to_string());
    }

    #[test]
    fn test_should_name_operation_in_unexpected_outcome() {
        let err = CrudError::UnexpectedOutcome {
            operation: "Book.group_by_page".to_owned(),
            expected: "page",
        };
        assert_eq!(
            err.to_string(),
            "operation 'Book.group_by_page' did not produce a page"
        );
    }
}
