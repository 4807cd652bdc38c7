//! Get factory.

use crudstack_model::TableSchema;
use crudstack_model::input::GetItemInput;

use crate::argument::Arguments;
use crate::codec::AttributeCodec;
use crate::config::CrudConfig;
use crate::error::{CompileError, CrudError};
use crate::expression::{ExpressionAttributesFactory, KeyAttributeConstructor, ParsedExpression};
use crate::factory::{check_projection, parse_optional, parse_required, request_text};
use crate::signature::Signature;

/// Builds [`GetItemInput`]s.
#[derive(Debug, Clone)]
pub struct GetFactory {
    table_name: String,
    key: KeyAttributeConstructor,
    projection: Option<ParsedExpression>,
    attributes: ExpressionAttributesFactory,
    consistent_read: bool,
}

impl GetFactory {
    /// Validates the descriptor and prepares the factory.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::MissingField` without a key expression and any
    /// error from validating the key or projection.
    pub fn new(
        signature: &Signature,
        schema: &TableSchema,
        config: &CrudConfig,
    ) -> Result<Self, CompileError> {
        let desc = signature.descriptor();
        let key_expr = parse_required(signature, "keyExpression", desc.key_expression.as_deref())?;
        let key = KeyAttributeConstructor::new(signature, schema, &desc.attribute_names, &key_expr)?;
        let projection = parse_optional(signature, desc.projection_expression.as_deref())?;
        check_projection(signature, projection.as_ref())?;
        let attributes =
            ExpressionAttributesFactory::new(signature, &desc.attribute_names, projection.iter())?;

        Ok(Self {
            table_name: config.physical_table_name(&schema.table_name),
            key,
            projection,
            attributes,
            consistent_read: config.consistent_read,
        })
    }

    /// Builds the request for one call.
    ///
    /// # Errors
    ///
    /// Returns `BindError::IncompleteKey` if a key value is absent.
    pub fn create(
        &self,
        args: &Arguments<'_>,
        codec: &dyn AttributeCodec,
    ) -> Result<GetItemInput, CrudError> {
        let key = self.key.create(args, codec)?;
        let attrs = self.attributes.create(args, codec)?;
        Ok(GetItemInput {
            table_name: self.table_name.clone(),
            key,
            consistent_read: self.consistent_read.then_some(true),
            projection_expression: request_text(self.projection.as_ref()),
            expression_attribute_names: attrs.names,
        })
    }
}
