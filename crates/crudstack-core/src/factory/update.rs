//! Update factory.

use crudstack_model::TableSchema;
use crudstack_model::input::UpdateItemInput;
use crudstack_model::types::{ReturnValue, ReturnValuesOnConditionCheckFailure};

use crate::argument::Arguments;
use crate::codec::AttributeCodec;
use crate::config::CrudConfig;
use crate::error::{CompileError, CrudError};
use crate::expression::{ExpressionAttributesFactory, KeyAttributeConstructor, ParsedExpression};
use crate::factory::{parse_optional, parse_required, request_text};
use crate::signature::Signature;

/// Builds [`UpdateItemInput`]s.
#[derive(Debug, Clone)]
pub struct UpdateFactory {
    table_name: String,
    key: KeyAttributeConstructor,
    update: ParsedExpression,
    condition: Option<ParsedExpression>,
    attributes: ExpressionAttributesFactory,
    return_values: Option<ReturnValue>,
    on_condition_failure: ReturnValuesOnConditionCheckFailure,
}

impl UpdateFactory {
    /// Validates the descriptor and prepares the factory.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::MissingField` without a key or update
    /// expression and any error from validating the expressions.
    pub fn new(
        signature: &Signature,
        schema: &TableSchema,
        config: &CrudConfig,
    ) -> Result<Self, CompileError> {
        let desc = signature.descriptor();
        let key_expr = parse_required(signature, "keyExpression", desc.key_expression.as_deref())?;
        let key = KeyAttributeConstructor::new(signature, schema, &desc.attribute_names, &key_expr)?;
        let update =
            parse_required(signature, "updateExpression", desc.update_expression.as_deref())?;
        let condition = parse_optional(signature, desc.condition_expression.as_deref())?;
        let attributes = ExpressionAttributesFactory::new(
            signature,
            &desc.attribute_names,
            std::iter::once(&update).chain(condition.iter()),
        )?;

        Ok(Self {
            table_name: config.physical_table_name(&schema.table_name),
            key,
            update,
            condition,
            attributes,
            return_values: desc.return_values,
            on_condition_failure: desc.return_values_on_condition_check_failure,
        })
    }

    /// Builds the request for one call.
    ///
    /// # Errors
    ///
    /// Returns `BindError::IncompleteKey` if a key value is absent and any
    /// error from resolving the expressions' placeholders.
    pub fn create(
        &self,
        args: &Arguments<'_>,
        codec: &dyn AttributeCodec,
    ) -> Result<UpdateItemInput, CrudError> {
        let key = self.key.create(args, codec)?;
        let attrs = self.attributes.create(args, codec)?;
        Ok(UpdateItemInput {
            table_name: self.table_name.clone(),
            key,
            update_expression: self.update.to_request_text(),
            condition_expression: request_text(self.condition.as_ref()),
            expression_attribute_names: attrs.names,
            expression_attribute_values: attrs.values,
            return_values: self.return_values,
            return_values_on_condition_check_failure: Some(self.on_condition_failure),
        })
    }
}
