//! Transactional write factory.
//!
//! Every member is compiled with the single-item factory of its kind against
//! a view of the owning operation's signature, so a member's placeholders
//! bind from the same argument list as its siblings.

use std::collections::HashMap;

use crudstack_model::TableSchema;
use crudstack_model::input::{
    ConditionCheck, DeleteItemInput, PutItemInput, TransactDelete, TransactPut, TransactUpdate,
    TransactWriteItem, TransactWriteItemsInput, UpdateItemInput,
};

use crate::argument::Arguments;
use crate::codec::AttributeCodec;
use crate::config::CrudConfig;
use crate::descriptor::TransactItemKind;
use crate::error::{CompileError, CrudError};
use crate::factory::{DeleteFactory, PutFactory, UpdateFactory};
use crate::signature::Signature;

#[derive(Debug, Clone)]
enum Member {
    ConditionCheck(DeleteFactory),
    Put(PutFactory),
    Delete(DeleteFactory),
    Update(UpdateFactory),
}

/// Builds [`TransactWriteItemsInput`]s.
#[derive(Debug, Clone)]
pub struct TransactWriteFactory {
    members: Vec<Member>,
}

impl TransactWriteFactory {
    /// Compiles every member. `tables` resolves each member's logical table.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::MissingField` for an empty member list or a
    /// condition check without a condition, `CompileError::UnknownTable`
    /// for a member naming an unregistered table, and any error from the
    /// member's own factory.
    pub fn new(
        signature: &Signature,
        tables: &HashMap<String, TableSchema>,
        config: &CrudConfig,
    ) -> Result<Self, CompileError> {
        let owner = signature.descriptor();
        if owner.transact_items.is_empty() {
            return Err(CompileError::MissingField {
                operation: signature.name().to_owned(),
                kind: signature.kind().to_string(),
                field: "transactItems",
            });
        }

        let members = owner
            .transact_items
            .iter()
            .map(|member| {
                let schema =
                    tables
                        .get(&member.table)
                        .ok_or_else(|| CompileError::UnknownTable {
                            operation: signature.name().to_owned(),
                            table: member.table.clone(),
                        })?;
                let view = Signature::new(member.as_operation(owner))?;
                Ok(match member.kind {
                    TransactItemKind::ConditionCheck => {
                        let factory = DeleteFactory::new(&view, schema, config)?;
                        if !factory.has_condition() {
                            return Err(CompileError::MissingField {
                                operation: signature.name().to_owned(),
                                kind: "ConditionCheck".to_owned(),
                                field: "conditionExpression",
                            });
                        }
                        Member::ConditionCheck(factory)
                    }
                    TransactItemKind::Put => Member::Put(PutFactory::new(&view, schema, config)?),
                    TransactItemKind::Delete => {
                        Member::Delete(DeleteFactory::new(&view, schema, config)?)
                    }
                    TransactItemKind::Update => {
                        Member::Update(UpdateFactory::new(&view, schema, config)?)
                    }
                })
            })
            .collect::<Result<_, CompileError>>()?;

        Ok(Self { members })
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false once built; an empty member list is rejected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Builds the request for one call.
    ///
    /// # Errors
    ///
    /// Returns the first binding or codec error of any member.
    pub fn create(
        &self,
        args: &Arguments<'_>,
        codec: &dyn AttributeCodec,
    ) -> Result<TransactWriteItemsInput, CrudError> {
        let transact_items = self
            .members
            .iter()
            .map(|member| {
                Ok(match member {
                    Member::ConditionCheck(f) => condition_check(f.create(args, codec)?),
                    Member::Put(f) => TransactWriteItem::Put(put(f.create(args, codec)?)),
                    Member::Delete(f) => TransactWriteItem::Delete(delete(f.create(args, codec)?)),
                    Member::Update(f) => TransactWriteItem::Update(update(f.create(args, codec)?)),
                })
            })
            .collect::<Result<_, CrudError>>()?;
        Ok(TransactWriteItemsInput { transact_items })
    }
}

fn condition_check(input: DeleteItemInput) -> TransactWriteItem {
    TransactWriteItem::ConditionCheck(ConditionCheck {
        table_name: input.table_name,
        key: input.key,
        condition_expression: input.condition_expression.unwrap_or_default(),
        expression_attribute_names: input.expression_attribute_names,
        expression_attribute_values: input.expression_attribute_values,
        return_values_on_condition_check_failure: input.return_values_on_condition_check_failure,
    })
}

fn put(input: PutItemInput) -> TransactPut {
    TransactPut {
        table_name: input.table_name,
        item: input.item,
        condition_expression: input.condition_expression,
        expression_attribute_names: input.expression_attribute_names,
        expression_attribute_values: input.expression_attribute_values,
        return_values_on_condition_check_failure: input.return_values_on_condition_check_failure,
    }
}

fn delete(input: DeleteItemInput) -> TransactDelete {
    TransactDelete {
        table_name: input.table_name,
        key: input.key,
        condition_expression: input.condition_expression,
        expression_attribute_names: input.expression_attribute_names,
        expression_attribute_values: input.expression_attribute_values,
        return_values_on_condition_check_failure: input.return_values_on_condition_check_failure,
    }
}

fn update(input: UpdateItemInput) -> TransactUpdate {
    TransactUpdate {
        table_name: input.table_name,
        key: input.key,
        update_expression: input.update_expression.unwrap_or_default(),
        condition_expression: input.condition_expression,
        expression_attribute_names: input.expression_attribute_names,
        expression_attribute_values: input.expression_attribute_values,
        return_values_on_condition_check_failure: input.return_values_on_condition_check_failure,
    }
}

#[cfg(test)]
mod tests {
    use crudstack_model::types::{ReturnValuesOnConditionCheckFailure, ScalarAttributeType};
    use crudstack_model::{AttributeValue, KeyAttribute, OperationKind};
    use serde_json::json;

    use super::*;
    use crate::argument::bind;
    use crate::codec::JsonAttributeCodec;
    use crate::descriptor::{
        OperationDescriptor, ParamType, ParameterDescriptor, TransactItemDescriptor,
    };

    fn tables() -> HashMap<String, TableSchema> {
        HashMap::from([
            (
                "Book".to_owned(),
                TableSchema::composite(
                    "Book",
                    KeyAttribute::new("Author", ScalarAttributeType::S),
                    KeyAttribute::new("Id", ScalarAttributeType::S),
                ),
            ),
            (
                "Author".to_owned(),
                TableSchema::simple("Author", KeyAttribute::new("Name", ScalarAttributeType::S)),
            ),
        ])
    }

    fn publish() -> OperationDescriptor {
        OperationDescriptor::new("publish", OperationKind::TransactWrite, "")
            .param(ParameterDescriptor::value(":author", ParamType::String))
            .param(ParameterDescriptor::value(":an_item", ParamType::Item))
            .param(ParameterDescriptor::value(":one", ParamType::Number))
            .transact(
                TransactItemDescriptor::new(TransactItemKind::ConditionCheck, "Author")
                    .key("Name = :author")
                    .condition("attribute_exists(Name)"),
            )
            .transact(
                TransactItemDescriptor::new(TransactItemKind::Put, "Book")
                    .condition("attribute_not_exists(Id)")
                    .on_condition_failure(ReturnValuesOnConditionCheckFailure::AllOld),
            )
            .transact(
                TransactItemDescriptor::new(TransactItemKind::Update, "Author")
                    .key("Name = :author")
                    .update("ADD Books :one"),
            )
    }

    #[test]
    fn test_should_compile_members_in_order() {
        let sig = Signature::new(publish()).unwrap();
        let factory = TransactWriteFactory::new(&sig, &tables(), &CrudConfig::default()).unwrap();
        assert_eq!(factory.len(), 3);

        let args = bind(
            &sig,
            vec![
                "X".into(),
                json!({"Author": "X", "Id": "1"}).into(),
                json!(1).into(),
            ],
        )
        .unwrap();
        let input = factory.create(&args, &JsonAttributeCodec).unwrap();
        let tables: Vec<_> = input
            .transact_items
            .iter()
            .map(TransactWriteItem::table_name)
            .collect();
        assert_eq!(tables, ["Author", "Book", "Author"]);

        let TransactWriteItem::ConditionCheck(check) = &input.transact_items[0] else {
            panic!("expected a condition check");
        };
        assert_eq!(check.key["Name"], AttributeValue::from("X"));
        assert_eq!(check.condition_expression, "attribute_exists(Name)");

        let TransactWriteItem::Put(put) = &input.transact_items[1] else {
            panic!("expected a put");
        };
        assert_eq!(
            put.return_values_on_condition_check_failure,
            Some(ReturnValuesOnConditionCheckFailure::AllOld)
        );

        let TransactWriteItem::Update(update) = &input.transact_items[2] else {
            panic!("expected an update");
        };
        assert_eq!(update.update_expression, "ADD Books :one");
        assert_eq!(update.expression_attribute_values[":one"], AttributeValue::N("1".to_owned()));
    }

    #[test]
    fn test_should_reject_unknown_member_table() {
        let desc = publish().transact(
            TransactItemDescriptor::new(TransactItemKind::Delete, "Shelf").key("Id = :author"),
        );
        let sig = Signature::new(desc).unwrap();
        let err = TransactWriteFactory::new(&sig, &tables(), &CrudConfig::default()).unwrap_err();
        assert!(matches!(err, CompileError::UnknownTable { table, .. } if table == "Shelf"));
    }

    #[test]
    fn test_should_require_condition_on_condition_check() {
        let desc = OperationDescriptor::new("check", OperationKind::TransactWrite, "")
            .param(ParameterDescriptor::value(":author", ParamType::String))
            .transact(
                TransactItemDescriptor::new(TransactItemKind::ConditionCheck, "Author")
                    .key("Name = :author"),
            );
        let sig = Signature::new(desc).unwrap();
        let err = TransactWriteFactory::new(&sig, &tables(), &CrudConfig::default()).unwrap_err();
        assert!(matches!(err, CompileError::MissingField { field: "conditionExpression", .. }));
    }

    #[test]
    fn test_should_reject_empty_transaction() {
        let sig = Signature::new(OperationDescriptor::new(
            "nothing",
            OperationKind::TransactWrite,
            "",
        ))
        .unwrap();
        let err = TransactWriteFactory::new(&sig, &tables(), &CrudConfig::default()).unwrap_err();
        assert!(matches!(err, CompileError::MissingField { field: "transactItems", .. }));
    }
}
