//! Put factory.

use crudstack_model::TableSchema;
use crudstack_model::input::PutItemInput;
use crudstack_model::types::{ReturnValue, ReturnValuesOnConditionCheckFailure};

use crate::argument::Arguments;
use crate::codec::AttributeCodec;
use crate::config::CrudConfig;
use crate::descriptor::{DEFAULT_ITEM_PLACEHOLDER, ParamType};
use crate::error::{BindError, CompileError, CrudError};
use crate::expression::{ExpressionAttributesFactory, ParsedExpression};
use crate::factory::{parse_optional, request_text};
use crate::signature::Signature;

/// Builds [`PutItemInput`]s.
#[derive(Debug, Clone)]
pub struct PutFactory {
    table_name: String,
    key_names: Vec<String>,
    item_placeholder: String,
    condition: Option<ParsedExpression>,
    attributes: ExpressionAttributesFactory,
    return_values: Option<ReturnValue>,
    on_condition_failure: ReturnValuesOnConditionCheckFailure,
}

impl PutFactory {
    /// Validates the descriptor and prepares the factory.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::UndeclaredPlaceholder` if the item or a
    /// condition placeholder is not declared, and
    /// `CompileError::InvalidDescriptor` if the item parameter is not a
    /// record.
    pub fn new(
        signature: &Signature,
        schema: &TableSchema,
        config: &CrudConfig,
    ) -> Result<Self, CompileError> {
        let desc = signature.descriptor();
        let item_placeholder = desc
            .item
            .clone()
            .unwrap_or_else(|| DEFAULT_ITEM_PLACEHOLDER.to_owned());

        let Some(item_param) = signature
            .parameter(&item_placeholder)
            .filter(|_| signature.declares(&item_placeholder))
        else {
            return Err(CompileError::UndeclaredPlaceholder {
                operation: signature.name().to_owned(),
                placeholder: item_placeholder,
                expression: "item".to_owned(),
            });
        };
        if !matches!(
            item_param.param_type,
            ParamType::Item | ParamType::Map | ParamType::Any
        ) {
            return Err(CompileError::InvalidDescriptor {
                operation: signature.name().to_owned(),
                message: format!(
                    "item parameter {item_placeholder} must have type item, got {}",
                    item_param.param_type
                ),
            });
        }

        let condition = parse_optional(signature, desc.condition_expression.as_deref())?;
        let attributes =
            ExpressionAttributesFactory::new(signature, &desc.attribute_names, condition.iter())?;

        Ok(Self {
            table_name: config.physical_table_name(&schema.table_name),
            key_names: schema
                .key_attributes()
                .map(|(attr, _)| attr.name.clone())
                .collect(),
            item_placeholder,
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
    /// Returns `BindError::NullValuePlaceholder` if the item is absent,
    /// `BindError::IncompleteKey` if the item lacks a key attribute, and any
    /// error from resolving the condition's placeholders.
    pub fn create(
        &self,
        args: &Arguments<'_>,
        codec: &dyn AttributeCodec,
    ) -> Result<PutItemInput, CrudError> {
        let item = args
            .get(&self.item_placeholder)
            .map(|arg| arg.encode_item(codec))
            .transpose()?
            .flatten()
            .ok_or_else(|| BindError::NullValuePlaceholder {
                operation: args.operation().to_owned(),
                placeholder: self.item_placeholder.clone(),
            })?;

        if let Some(missing) = self
            .key_names
            .iter()
            .find(|name| item.get(*name).is_none_or(|v| v.is_null()))
        {
            return Err(BindError::IncompleteKey {
                operation: args.operation().to_owned(),
                attribute: missing.clone(),
            }
            .into());
        }

        let attrs = self.attributes.create(args, codec)?;
        Ok(PutItemInput {
            table_name: self.table_name.clone(),
            item,
            condition_expression: request_text(self.condition.as_ref()),
            expression_attribute_names: attrs.names,
            expression_attribute_values: attrs.values,
            return_values: self.return_values,
            return_values_on_condition_check_failure: Some(self.on_condition_failure),
        })
    }
}

#[cfg(test)]
mod tests {
    use crudstack_model::types::ScalarAttributeType;
    use crudstack_model::{AttributeValue, KeyAttribute, OperationKind};
    use serde_json::json;

    use super::*;
    use crate::argument::{ArgValue, bind};
    use crate::codec::JsonAttributeCodec;
    use crate::descriptor::{OperationDescriptor, ParameterDescriptor};

    fn book_schema() -> TableSchema {
        TableSchema::composite(
            "Book",
            KeyAttribute::new("Author", ScalarAttributeType::S),
            KeyAttribute::new("Id", ScalarAttributeType::S),
        )
    }

    fn put_new_book() -> Signature {
        Signature::new(
            OperationDescriptor::new("putNewBook", OperationKind::Put, "Book")
                .param(ParameterDescriptor::value(":an_item", ParamType::Item))
                .condition("attribute_not_exists(Id)")
                .on_condition_failure(ReturnValuesOnConditionCheckFailure::AllOld),
        )
        .unwrap()
    }

    #[test]
    fn test_should_build_conditional_put() {
        let sig = put_new_book();
        let factory = PutFactory::new(&sig, &book_schema(), &CrudConfig::default()).unwrap();
        let args = bind(
            &sig,
            vec![json!({"Author": "X", "Id": "42", "Title": "T"}).into()],
        )
        .unwrap();
        let input = factory.create(&args, &JsonAttributeCodec).unwrap();

        assert_eq!(input.table_name, "Book");
        assert_eq!(input.item["Title"], AttributeValue::from("T"));
        assert_eq!(
            input.condition_expression.as_deref(),
            Some("attribute_not_exists(Id)")
        );
        assert!(input.expression_attribute_values.is_empty());
        assert_eq!(
            input.return_values_on_condition_check_failure,
            Some(ReturnValuesOnConditionCheckFailure::AllOld)
        );
    }

    #[test]
    fn test_should_require_declared_item_parameter() {
        let sig = Signature::new(
            OperationDescriptor::new("put", OperationKind::Put, "Book")
                .param(ParameterDescriptor::value(":book", ParamType::Item)),
        )
        .unwrap();
        let err = PutFactory::new(&sig, &book_schema(), &CrudConfig::default()).unwrap_err();
        assert!(matches!(err, CompileError::UndeclaredPlaceholder { placeholder, .. } if placeholder == ":an_item"));
    }

    #[test]
    fn test_should_reject_absent_item() {
        let sig = put_new_book();
        let factory = PutFactory::new(&sig, &book_schema(), &CrudConfig::default()).unwrap();
        let args = bind(&sig, vec![ArgValue::Absent]).unwrap();
        let err = factory.create(&args, &JsonAttributeCodec).unwrap_err();
        assert!(matches!(err.bind(), Some(BindError::NullValuePlaceholder { .. })));
    }

    #[test]
    fn test_should_reject_item_without_range_key() {
        let sig = put_new_book();
        let factory = PutFactory::new(&sig, &book_schema(), &CrudConfig::default()).unwrap();
        let args = bind(&sig, vec![json!({"Author": "X"}).into()]).unwrap();
        let err = factory.create(&args, &JsonAttributeCodec).unwrap_err();
        assert!(matches!(
            err.bind(),
            Some(BindError::IncompleteKey { attribute, .. }) if attribute == "Id"
        ));
    }

    #[test]
    fn test_should_apply_table_prefix() {
        let sig = put_new_book();
        let config = CrudConfig {
            table_prefix: "dev-".to_owned(),
            ..CrudConfig::default()
        };
        let factory = PutFactory::new(&sig, &book_schema(), &config).unwrap();
        let args = bind(&sig, vec![json!({"Author": "X", "Id": "1"}).into()]).unwrap();
        assert_eq!(
            factory.create(&args, &JsonAttributeCodec).unwrap().table_name,
            "dev-Book"
        );
    }
}
