//! Validated operation signatures.
//!
//! A [`Signature`] is built once per declared operation and shared read-only
//! across every invocation. It fixes the positional order of parameters so
//! binding never needs to look at argument names at call time.

use std::collections::HashSet;

use crudstack_model::OperationKind;

use crate::descriptor::{OperationDescriptor, ParamRole, ParamType, ParameterDescriptor};
use crate::error::CompileError;
use crate::expression::{NAME_MARKER, VALUE_MARKER, is_placeholder_name};

/// Immutable descriptor of one declared operation.
#[derive(Debug, Clone)]
pub struct Signature {
    descriptor: OperationDescriptor,
}

impl Signature {
    /// Validates a descriptor's parameter list and wraps it.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::DuplicateParameter` for repeated names and
    /// `CompileError::InvalidDescriptor` for parameters whose name, type or
    /// role does not fit the operation kind.
    pub fn new(descriptor: OperationDescriptor) -> Result<Self, CompileError> {
        let operation = descriptor.name.as_str();
        let invalid = |message: String| CompileError::InvalidDescriptor {
            operation: operation.to_owned(),
            message,
        };

        if operation.is_empty() {
            return Err(invalid("operation name must not be empty".to_owned()));
        }

        let mut seen = HashSet::new();
        let mut cursors = 0;
        let mut limits = 0;

        for param in &descriptor.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(CompileError::DuplicateParameter {
                    operation: operation.to_owned(),
                    parameter: param.name.clone(),
                });
            }

            match param.role {
                ParamRole::Value => {
                    if !is_placeholder_name(&param.name) {
                        return Err(invalid(format!(
                            "value parameter '{}' must be a placeholder starting with '{VALUE_MARKER}' or '{NAME_MARKER}'",
                            param.name
                        )));
                    }
                    if param.name.starts_with(NAME_MARKER) && param.param_type != ParamType::String {
                        return Err(invalid(format!(
                            "name parameter {} must have type string",
                            param.name
                        )));
                    }
                }
                ParamRole::Cursor => {
                    cursors += 1;
                    if !descriptor.kind.is_paging() {
                        return Err(invalid(format!(
                            "cursor parameter '{}' is only allowed on paging operations",
                            param.name
                        )));
                    }
                }
                ParamRole::Limit => {
                    limits += 1;
                    if !descriptor.kind.is_range_read() {
                        return Err(invalid(format!(
                            "limit parameter '{}' is only allowed on queries and scans",
                            param.name
                        )));
                    }
                }
            }

            if param.role != ParamRole::Value
                && (param.name.starts_with(VALUE_MARKER) || param.name.starts_with(NAME_MARKER))
            {
                return Err(invalid(format!(
                    "{:?} parameter '{}' must not use a placeholder marker",
                    param.role, param.name
                )));
            }
        }

        if cursors > 1 || limits > 1 {
            return Err(invalid(
                "at most one cursor and one limit parameter may be declared".to_owned(),
            ));
        }

        Ok(Self { descriptor })
    }

    /// Operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Operation kind.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.descriptor.kind
    }

    /// Declared parameters in call order.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.descriptor.parameters
    }

    /// Looks up a declared parameter by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.descriptor.parameters.iter().find(|p| p.name == name)
    }

    /// Whether a placeholder is declared as a value parameter.
    #[must_use]
    pub fn declares(&self, placeholder: &str) -> bool {
        self.parameter(placeholder)
            .is_some_and(|p| p.role == ParamRole::Value)
    }

    /// The cursor parameter, if declared.
    #[must_use]
    pub fn cursor_parameter(&self) -> Option<&ParameterDescriptor> {
        self.descriptor
            .parameters
            .iter()
            .find(|p| p.role == ParamRole::Cursor)
    }

    /// The limit parameter, if declared.
    #[must_use]
    pub fn limit_parameter(&self) -> Option<&ParameterDescriptor> {
        self.descriptor
            .parameters
            .iter()
            .find(|p| p.role == ParamRole::Limit)
    }

    /// The static configuration this signature was built from.
    #[must_use]
    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }
}
