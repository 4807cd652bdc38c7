//! The in-memory [`StorageEngine`].
//!
//! Tables live in a [`DashMap`] keyed by name. Reads go straight to the
//! table storage. Every write, transactional or not, holds one engine-wide
//! write lock from condition check to mutation, so a condition is always
//! evaluated against the item the write replaces.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tracing::debug;

use crudstack_model::input::{
    DeleteItemInput, GetItemInput, PutItemInput, QueryInput, ScanInput, TransactWriteItem,
    TransactWriteItemsInput, UpdateItemInput,
};
use crudstack_model::output::{
    DeleteItemOutput, GetItemOutput, PutItemOutput, QueryOutput, ScanOutput,
    TransactWriteItemsOutput, UpdateItemOutput,
};
use crudstack_model::types::{CancellationReason, ReturnValue, ReturnValuesOnConditionCheckFailure};
use crudstack_model::{
    AttributeValue, Item, StorageEngine, StorageError, TableSchema, storage_error,
};

use crate::config::MemoryConfig;
use crate::expression::{
    CompareOp, EvalContext, Expr, ExpressionError, Operand, UpdateExpr, parse_condition,
    parse_projection, parse_update,
};
use crate::storage::{PrimaryKey, TableStorage, item_size};

/// Most members a transaction may hold.
pub const MAX_TRANSACT_ITEMS: usize = 100;

impl From<ExpressionError> for StorageError {
    fn from(err: ExpressionError) -> Self {
        Self::validation(err.to_string())
    }
}

/// Placeholder maps of one request.
#[derive(Debug, Clone, Copy)]
struct Placeholders<'a> {
    names: &'a HashMap<String, String>,
    values: &'a HashMap<String, AttributeValue>,
}

impl<'a> Placeholders<'a> {
    fn new(
        names: &'a HashMap<String, String>,
        values: &'a HashMap<String, AttributeValue>,
    ) -> Self {
        Self { names, values }
    }

    fn on(self, item: &'a Item) -> EvalContext<'a> {
        EvalContext {
            item,
            names: self.names,
            values: self.values,
        }
    }
}

/// In-process storage engine.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    config: MemoryConfig,
    tables: DashMap<String, Arc<TableStorage>>,
    write_lock: Mutex<()>,
}

impl MemoryEngine {
    /// Creates an engine with no tables.
    #[must_use]
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            tables: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Creates a table.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error if a table with the same name exists.
    pub fn create_table(&self, schema: TableSchema) -> Result<(), StorageError> {
        let name = schema.table_name.clone();
        match self.tables.entry(name.clone()) {
            Entry::Occupied(_) => Err(StorageError::validation(format!(
                "Table already exists: {name}"
            ))),
            Entry::Vacant(slot) => {
                debug!(table = %name, "created table");
                slot.insert(Arc::new(TableStorage::new(schema)));
                Ok(())
            }
        }
    }

    /// Drops a table and its items.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if the table does not exist.
    pub fn delete_table(&self, name: &str) -> Result<(), StorageError> {
        if self.tables.remove(name).is_none() {
            return Err(StorageError::resource_not_found(name));
        }
        debug!(table = %name, "deleted table");
        Ok(())
    }

    /// Number of items in a table.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if the table does not exist.
    pub fn item_count(&self, name: &str) -> Result<u64, StorageError> {
        Ok(self.table(name)?.item_count())
    }

    fn table(&self, name: &str) -> Result<Arc<TableStorage>, StorageError> {
        self.tables
            .get(name)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| StorageError::resource_not_found(name))
    }

    fn check_size(&self, item: &Item) -> Result<(), StorageError> {
        let size = item_size(item);
        if size > self.config.max_item_size_bytes {
            return Err(storage_error!(
                Validation,
                format!(
                    "Item size has exceeded the maximum allowed size of {} bytes",
                    self.config.max_item_size_bytes
                )
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Evaluates an optional condition against the current item, or an empty
/// item when none exists.
fn condition_holds(
    condition: Option<&str>,
    existing: Option<&Item>,
    placeholders: Placeholders<'_>,
) -> Result<bool, StorageError> {
    let Some(condition) = condition else {
        return Ok(true);
    };
    let expr = parse_condition(condition)?;
    let empty = Item::new();
    Ok(placeholders.on(existing.unwrap_or(&empty)).evaluate(&expr)?)
}

fn condition_failed(
    existing: Option<Item>,
    policy: Option<ReturnValuesOnConditionCheckFailure>,
) -> StorageError {
    let wants_old = policy.unwrap_or_default().wants_old_item();
    StorageError::conditional_check_failed(existing.filter(|_| wants_old))
}

fn project(
    item: Item,
    projection: Option<&str>,
    names: &HashMap<String, String>,
) -> Result<Item, StorageError> {
    let Some(projection) = projection else {
        return Ok(item);
    };
    let paths = parse_projection(projection)?;
    let values = HashMap::new();
    Ok(Placeholders::new(names, &values).on(&item).project(&paths)?)
}

/// Cuts `items` at `limit`. The last kept item's key continues the read
/// only when items were cut.
fn paginate(
    schema: &TableSchema,
    mut items: Vec<Item>,
    limit: Option<u32>,
) -> (Vec<Item>, Option<Item>) {
    let Some(limit) = limit.and_then(|n| usize::try_from(n).ok()) else {
        return (items, None);
    };
    if items.len() <= limit {
        return (items, None);
    }
    items.truncate(limit);
    let last_evaluated_key = items.last().and_then(|item| schema.key_of(item));
    (items, last_evaluated_key)
}

fn returns_nothing_or_old(return_values: Option<ReturnValue>) -> bool {
    matches!(
        return_values,
        None | Some(ReturnValue::None | ReturnValue::AllOld)
    )
}

fn check_limit(limit: Option<u32>) -> Result<(), StorageError> {
    if limit == Some(0) {
        return Err(StorageError::validation("Limit must be greater than 0"));
    }
    Ok(())
}

fn reject_index(index_name: Option<&str>) -> Result<(), StorageError> {
    match index_name {
        Some(index) => Err(StorageError::validation(format!(
            "The table does not have the specified index: {index}"
        ))),
        None => Ok(()),
    }
}

/// The value the key condition requires of the partition key.
fn partition_value(
    expr: &Expr,
    partition_key: &str,
    ctx: &EvalContext<'_>,
) -> Result<Option<AttributeValue>, StorageError> {
    match expr {
        Expr::And(left, right) => Ok(match partition_value(left, partition_key, ctx)? {
            Some(value) => Some(value),
            None => partition_value(right, partition_key, ctx)?,
        }),
        Expr::Compare {
            left,
            op: CompareOp::Eq,
            right,
        } => {
            let (path, value) = match (left, right) {
                (Operand::Path(path), value @ Operand::Value(_))
                | (value @ Operand::Value(_), Operand::Path(path)) => (path, value),
                _ => return Ok(None),
            };
            match path.head() {
                Some(head) if path.is_top_level() && ctx.name(head)? == partition_key => {
                    Ok(ctx.operand(value)?)
                }
                _ => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

/// Names of the top-level attributes an update writes.
fn updated_names(
    update: &UpdateExpr,
    ctx: &EvalContext<'_>,
) -> Result<HashSet<String>, StorageError> {
    let mut names = HashSet::new();
    for path in update.targets() {
        if let Some(head) = path.head() {
            names.insert(ctx.name(head)?.to_owned());
        }
    }
    Ok(names)
}

fn only(item: Option<Item>, names: &HashSet<String>) -> Option<Item> {
    item.map(|item| {
        item.into_iter()
            .filter(|(name, _)| names.contains(name))
            .collect()
    })
}

/// Computes the item an update produces, refusing writes to key attributes.
fn updated_item(
    schema: &TableSchema,
    key: &Item,
    existing: Option<&Item>,
    update_expression: Option<&str>,
    placeholders: Placeholders<'_>,
) -> Result<(Item, HashSet<String>), StorageError> {
    let base = existing.unwrap_or(key);
    let ctx = placeholders.on(base);
    let Some(text) = update_expression else {
        return Ok((base.clone(), HashSet::new()));
    };
    let update = parse_update(text)?;
    let names = updated_names(&update, &ctx)?;
    if let Some(name) = names.iter().find(|n| schema.key_attribute(n).is_some()) {
        return Err(StorageError::validation(format!(
            "Cannot update attribute {name}. This attribute is part of the key"
        )));
    }
    Ok((ctx.apply_update(&update)?, names))
}

// ---------------------------------------------------------------------------
// StorageEngine
// ---------------------------------------------------------------------------

impl StorageEngine for MemoryEngine {
    fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, StorageError> {
        let table = self.table(&input.table_name)?;
        if !returns_nothing_or_old(input.return_values) {
            return Err(StorageError::validation(
                "Return values set to invalid value for PutItem",
            ));
        }
        self.check_size(&input.item)?;
        let key = table.primary_key(&input.item)?;
        let placeholders = Placeholders::new(
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        );

        let _guard = self.write_lock.lock();
        let existing = table.get(&key);
        let condition = input.condition_expression.as_deref();
        if !condition_holds(condition, existing.as_ref(), placeholders)? {
            return Err(condition_failed(
                existing,
                input.return_values_on_condition_check_failure,
            ));
        }
        let old = table.put(input.item)?;
        Ok(PutItemOutput {
            attributes: old.filter(|_| input.return_values == Some(ReturnValue::AllOld)),
        })
    }

    fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, StorageError> {
        let table = self.table(&input.table_name)?;
        let key = table.key(&input.key)?;
        let item = table
            .get(&key)
            .map(|item| {
                project(
                    item,
                    input.projection_expression.as_deref(),
                    &input.expression_attribute_names,
                )
            })
            .transpose()?;
        Ok(GetItemOutput { item })
    }

    fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, StorageError> {
        let table = self.table(&input.table_name)?;
        if !returns_nothing_or_old(input.return_values) {
            return Err(StorageError::validation(
                "Return values set to invalid value for DeleteItem",
            ));
        }
        let key = table.key(&input.key)?;
        let placeholders = Placeholders::new(
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        );

        let _guard = self.write_lock.lock();
        let existing = table.get(&key);
        let condition = input.condition_expression.as_deref();
        if !condition_holds(condition, existing.as_ref(), placeholders)? {
            return Err(condition_failed(
                existing,
                input.return_values_on_condition_check_failure,
            ));
        }
        let old = table.delete(&key);
        Ok(DeleteItemOutput {
            attributes: old.filter(|_| input.return_values == Some(ReturnValue::AllOld)),
        })
    }

    fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, StorageError> {
        let table = self.table(&input.table_name)?;
        let key = table.key(&input.key)?;
        let placeholders = Placeholders::new(
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        );

        let _guard = self.write_lock.lock();
        let existing = table.get(&key);
        let condition = input.condition_expression.as_deref();
        if !condition_holds(condition, existing.as_ref(), placeholders)? {
            return Err(condition_failed(
                existing,
                input.return_values_on_condition_check_failure,
            ));
        }
        let (new_item, changed) = updated_item(
            table.schema(),
            &input.key,
            existing.as_ref(),
            input.update_expression.as_deref(),
            placeholders,
        )?;
        self.check_size(&new_item)?;
        table.put(new_item.clone())?;

        let attributes = match input.return_values.unwrap_or_default() {
            ReturnValue::None => None,
            ReturnValue::AllOld => existing,
            ReturnValue::AllNew => Some(new_item),
            ReturnValue::UpdatedOld => only(existing, &changed),
            ReturnValue::UpdatedNew => only(Some(new_item), &changed),
        };
        Ok(UpdateItemOutput { attributes })
    }

    fn query(&self, input: QueryInput) -> Result<QueryOutput, StorageError> {
        let table = self.table(&input.table_name)?;
        reject_index(input.index_name.as_deref())?;
        check_limit(input.limit)?;
        let schema = table.schema();
        let placeholders = Placeholders::new(
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        );

        let Some(key_condition) = input.key_condition_expression.as_deref() else {
            return Err(StorageError::validation(
                "Either the KeyConditions or KeyConditionExpression parameter must be specified",
            ));
        };
        let key_condition = parse_condition(key_condition)?;
        let filter = input
            .filter_expression
            .as_deref()
            .map(parse_condition)
            .transpose()?;
        let empty = Item::new();
        let partition_key = &schema.partition_key.name;
        let partition = partition_value(&key_condition, partition_key, &placeholders.on(&empty))?
            .ok_or_else(|| {
                StorageError::validation(
                    "Query condition missed key schema element: partition key equality",
                )
            })?;
        let start = input
            .exclusive_start_key
            .as_ref()
            .map(|key| table.primary_key(key))
            .transpose()?;

        let forward = input.scan_index_forward.unwrap_or(true);
        let mut candidates = Vec::new();
        for item in table.partition(&partition, forward, start.as_ref().map(|k| &k.sort)) {
            if placeholders.on(&item).evaluate(&key_condition)? {
                candidates.push(item);
            }
        }

        let (evaluated, last_evaluated_key) = paginate(schema, candidates, input.limit);
        let scanned_count = evaluated.len();
        let items = filter_and_project(
            evaluated,
            filter.as_ref(),
            input.projection_expression.as_deref(),
            placeholders,
        )?;
        Ok(QueryOutput {
            count: count(items.len()),
            scanned_count: count(scanned_count),
            items,
            last_evaluated_key,
        })
    }

    fn scan(&self, input: ScanInput) -> Result<ScanOutput, StorageError> {
        let table = self.table(&input.table_name)?;
        reject_index(input.index_name.as_deref())?;
        check_limit(input.limit)?;
        let placeholders = Placeholders::new(
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        );
        let filter = input
            .filter_expression
            .as_deref()
            .map(parse_condition)
            .transpose()?;
        let start: Option<PrimaryKey> = input
            .exclusive_start_key
            .as_ref()
            .map(|key| table.primary_key(key))
            .transpose()?;

        let all = table.scan(start.as_ref())?;
        let (evaluated, last_evaluated_key) = paginate(table.schema(), all, input.limit);
        let scanned_count = evaluated.len();
        let items = filter_and_project(
            evaluated,
            filter.as_ref(),
            input.projection_expression.as_deref(),
            placeholders,
        )?;
        Ok(ScanOutput {
            count: count(items.len()),
            scanned_count: count(scanned_count),
            items,
            last_evaluated_key,
        })
    }

    fn transact_write_items(
        &self,
        input: TransactWriteItemsInput,
    ) -> Result<TransactWriteItemsOutput, StorageError> {
        let members = input.transact_items;
        if members.is_empty() || members.len() > MAX_TRANSACT_ITEMS {
            return Err(StorageError::validation(format!(
                "TransactItems must have between 1 and {MAX_TRANSACT_ITEMS} members"
            )));
        }

        let _guard = self.write_lock.lock();
        let mut writes = Vec::with_capacity(members.len());
        let mut reasons = Vec::with_capacity(members.len());
        let mut seen: Vec<(&str, PrimaryKey)> = Vec::with_capacity(members.len());
        let mut cancelled = false;

        for member in &members {
            let table = self.table(member.table_name())?;
            let plan = plan_member(&table, member)?;
            let target = (member.table_name(), plan.key.clone());
            if seen.contains(&target) {
                return Err(StorageError::validation(
                    "Transaction request cannot include multiple operations on one item",
                ));
            }
            seen.push(target);
            if plan.holds {
                reasons.push(CancellationReason::none());
            } else {
                cancelled = true;
                let wants_old = plan.policy.unwrap_or_default().wants_old_item();
                reasons.push(CancellationReason::conditional_check_failed(
                    plan.existing.filter(|_| wants_old),
                ));
            }
            if let Some(Write::Put(item)) = &plan.write {
                self.check_size(item)?;
            }
            writes.push((table, plan.key, plan.write));
        }

        if cancelled {
            debug!(members = members.len(), "cancelled transaction");
            return Err(StorageError::transaction_canceled(reasons));
        }
        for (table, key, write) in writes {
            match write {
                Some(Write::Put(item)) => {
                    table.put(item)?;
                }
                Some(Write::Delete) => {
                    table.delete(&key);
                }
                None => {}
            }
        }
        debug!(members = members.len(), "committed transaction");
        Ok(TransactWriteItemsOutput {})
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn filter_and_project(
    items: Vec<Item>,
    filter: Option<&Expr>,
    projection: Option<&str>,
    placeholders: Placeholders<'_>,
) -> Result<Vec<Item>, StorageError> {
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        if let Some(filter) = filter {
            if !placeholders.on(&item).evaluate(filter)? {
                continue;
            }
        }
        kept.push(project(item, projection, placeholders.names)?);
    }
    Ok(kept)
}

// ---------------------------------------------------------------------------
// Transaction planning
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Write {
    Put(Item),
    Delete,
}

#[derive(Debug)]
struct MemberPlan {
    key: PrimaryKey,
    existing: Option<Item>,
    holds: bool,
    policy: Option<ReturnValuesOnConditionCheckFailure>,
    write: Option<Write>,
}

/// Checks one member's condition and computes its write without applying it.
fn plan_member(
    table: &TableStorage,
    member: &TransactWriteItem,
) -> Result<MemberPlan, StorageError> {
    let (key, condition, placeholders, policy) = match member {
        TransactWriteItem::ConditionCheck(c) => (
            table.key(&c.key)?,
            Some(c.condition_expression.as_str()),
            Placeholders::new(&c.expression_attribute_names, &c.expression_attribute_values),
            c.return_values_on_condition_check_failure,
        ),
        TransactWriteItem::Put(p) => (
            table.primary_key(&p.item)?,
            p.condition_expression.as_deref(),
            Placeholders::new(&p.expression_attribute_names, &p.expression_attribute_values),
            p.return_values_on_condition_check_failure,
        ),
        TransactWriteItem::Delete(d) => (
            table.key(&d.key)?,
            d.condition_expression.as_deref(),
            Placeholders::new(&d.expression_attribute_names, &d.expression_attribute_values),
            d.return_values_on_condition_check_failure,
        ),
        TransactWriteItem::Update(u) => (
            table.key(&u.key)?,
            u.condition_expression.as_deref(),
            Placeholders::new(&u.expression_attribute_names, &u.expression_attribute_values),
            u.return_values_on_condition_check_failure,
        ),
    };

    let existing = table.get(&key);
    let holds = condition_holds(condition, existing.as_ref(), placeholders)?;
    let write = match member {
        TransactWriteItem::ConditionCheck(_) => None,
        TransactWriteItem::Put(p) => Some(Write::Put(p.item.clone())),
        TransactWriteItem::Delete(_) => Some(Write::Delete),
        TransactWriteItem::Update(u) => {
            let (item, _) = updated_item(
                table.schema(),
                &u.key,
                existing.as_ref(),
                Some(u.update_expression.as_str()),
                placeholders,
            )?;
            Some(Write::Put(item))
        }
    };

    Ok(MemberPlan {
        key,
        existing,
        holds,
        policy,
        write,
    })
}

#[cfg(test)]
mod tests {
    use crudstack_model::input::{ConditionCheck, TransactDelete, TransactPut};
    use crudstack_model::types::ScalarAttributeType;
    use crudstack_model::{KeyAttribute, StorageErrorCode};

    use super::*;

    fn engine() -> MemoryEngine {
        let engine = MemoryEngine::default();
        engine
            .create_table(TableSchema::composite(
                "Book",
                KeyAttribute::new("Author", ScalarAttributeType::S),
                KeyAttribute::new("Id", ScalarAttributeType::N),
            ))
            .unwrap();
        engine
    }

    fn key(author: &str, id: i64) -> Item {
        Item::from([
            ("Author".to_owned(), AttributeValue::from(author)),
            ("Id".to_owned(), AttributeValue::number(id)),
        ])
    }

    fn book(author: &str, id: i64, title: &str) -> Item {
        let mut item = key(author, id);
        item.insert("Title".to_owned(), AttributeValue::from(title));
        item
    }

    fn put(engine: &MemoryEngine, item: Item) {
        engine
            .put_item(PutItemInput {
                table_name: "Book".to_owned(),
                item,
                ..Default::default()
            })
            .unwrap();
    }

    fn author_query(limit: Option<u32>, start: Option<Item>) -> QueryInput {
        QueryInput {
            table_name: "Book".to_owned(),
            key_condition_expression: Some("#pk = :pk".to_owned()),
            expression_attribute_names: HashMap::from([("#pk".to_owned(), "Author".to_owned())]),
            expression_attribute_values: HashMap::from([(
                ":pk".to_owned(),
                AttributeValue::from("X"),
            )]),
            limit,
            exclusive_start_key: start,
            ..Default::default()
        }
    }

    #[test]
    fn test_should_report_unknown_table() {
        let err = MemoryEngine::default()
            .get_item(GetItemInput {
                table_name: "Nope".to_owned(),
                key: key("X", 1),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.code, StorageErrorCode::ResourceNotFound);
    }

    #[test]
    fn test_should_attach_old_item_only_when_asked() {
        let engine = engine();
        put(&engine, book("X", 1, "Old"));
        let delete = |policy| DeleteItemInput {
            table_name: "Book".to_owned(),
            key: key("X", 1),
            condition_expression: Some("Title = :t".to_owned()),
            expression_attribute_values: HashMap::from([(
                ":t".to_owned(),
                AttributeValue::from("New"),
            )]),
            return_values_on_condition_check_failure: Some(policy),
            ..Default::default()
        };

        let err = engine
            .delete_item(delete(ReturnValuesOnConditionCheckFailure::AllOld))
            .unwrap_err();
        assert_eq!(err.code, StorageErrorCode::ConditionalCheckFailed);
        assert_eq!(err.item, Some(book("X", 1, "Old")));

        let err = engine
            .delete_item(delete(ReturnValuesOnConditionCheckFailure::None))
            .unwrap_err();
        assert_eq!(err.code, StorageErrorCode::ConditionalCheckFailed);
        assert!(err.item.is_none());
        assert_eq!(engine.item_count("Book").unwrap(), 1);
    }

    #[test]
    fn test_should_page_query_with_last_evaluated_key() {
        let engine = engine();
        for id in 1..=5 {
            put(&engine, book("X", id, "T"));
        }
        put(&engine, book("Y", 1, "T"));

        let first = engine.query(author_query(Some(2), None)).unwrap();
        assert_eq!(first.count, 2);
        assert_eq!(first.last_evaluated_key, Some(key("X", 2)));

        let last = engine
            .query(author_query(Some(3), first.last_evaluated_key))
            .unwrap();
        assert_eq!(last.count, 3);
        assert!(last.last_evaluated_key.is_none());
    }

    #[test]
    fn test_should_omit_last_key_when_limit_matches_remaining() {
        let engine = engine();
        for id in 1..=2 {
            put(&engine, book("X", id, "T"));
        }
        let page = engine.query(author_query(Some(2), None)).unwrap();
        assert_eq!(page.count, 2);
        assert!(page.last_evaluated_key.is_none());
    }

    #[test]
    fn test_should_filter_after_limit() {
        let engine = engine();
        put(&engine, book("X", 1, "A"));
        put(&engine, book("X", 2, "B"));
        put(&engine, book("X", 3, "A"));
        let mut input = author_query(Some(2), None);
        input.filter_expression = Some("Title = :title".to_owned());
        input
            .expression_attribute_values
            .insert(":title".to_owned(), AttributeValue::from("A"));
        let out = engine.query(input).unwrap();
        assert_eq!(out.count, 1);
        assert_eq!(out.scanned_count, 2);
        assert!(out.last_evaluated_key.is_some());
    }

    #[test]
    fn test_should_query_sort_key_range_backwards() {
        let engine = engine();
        for id in 1..=5 {
            put(&engine, book("X", id, "T"));
        }
        let mut input = author_query(None, None);
        input.key_condition_expression = Some("#pk = :pk AND Id BETWEEN :lo AND :hi".to_owned());
        input
            .expression_attribute_values
            .insert(":lo".to_owned(), AttributeValue::number(2));
        input
            .expression_attribute_values
            .insert(":hi".to_owned(), AttributeValue::number(4));
        input.scan_index_forward = Some(false);
        let ids: Vec<_> = engine
            .query(input)
            .unwrap()
            .items
            .iter()
            .map(|i| i["Id"].clone())
            .collect();
        assert_eq!(
            ids,
            [4, 3, 2].map(AttributeValue::number).to_vec()
        );
    }

    #[test]
    fn test_should_apply_update_and_return_new_values() {
        let engine = engine();
        put(&engine, book("X", 1, "T"));
        let out = engine
            .update_item(UpdateItemInput {
                table_name: "Book".to_owned(),
                key: key("X", 1),
                update_expression: Some("SET Title = :t ADD Reads :one".to_owned()),
                expression_attribute_values: HashMap::from([
                    (":t".to_owned(), AttributeValue::from("U")),
                    (":one".to_owned(), AttributeValue::number(1)),
                ]),
                return_values: Some(ReturnValue::UpdatedNew),
                ..Default::default()
            })
            .unwrap();
        let attributes = out.attributes.unwrap();
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes["Title"], AttributeValue::from("U"));
    }

    #[test]
    fn test_should_refuse_to_update_key_attributes() {
        let engine = engine();
        let err = engine
            .update_item(UpdateItemInput {
                table_name: "Book".to_owned(),
                key: key("X", 1),
                update_expression: Some("SET Id = :id".to_owned()),
                expression_attribute_values: HashMap::from([(
                    ":id".to_owned(),
                    AttributeValue::number(2),
                )]),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.code, StorageErrorCode::Validation);
    }

    #[test]
    fn test_should_reject_oversized_items() {
        let engine = MemoryEngine::new(MemoryConfig {
            max_item_size_bytes: 16,
        });
        engine
            .create_table(TableSchema::simple(
                "T",
                KeyAttribute::new("K", ScalarAttributeType::S),
            ))
            .unwrap();
        let err = engine
            .put_item(PutItemInput {
                table_name: "T".to_owned(),
                item: Item::from([("K".to_owned(), AttributeValue::from("x".repeat(32)))]),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.code, StorageErrorCode::Validation);
    }

    #[test]
    fn test_should_cancel_whole_transaction_on_failed_member() {
        let engine = engine();
        put(&engine, book("X", 1, "T"));
        let err = engine
            .transact_write_items(TransactWriteItemsInput {
                transact_items: vec![
                    TransactWriteItem::Put(TransactPut {
                        table_name: "Book".to_owned(),
                        item: book("X", 2, "N"),
                        ..Default::default()
                    }),
                    TransactWriteItem::ConditionCheck(ConditionCheck {
                        table_name: "Book".to_owned(),
                        key: key("X", 1),
                        condition_expression: "attribute_not_exists(Author)".to_owned(),
                        return_values_on_condition_check_failure: Some(
                            ReturnValuesOnConditionCheckFailure::AllOld,
                        ),
                        ..Default::default()
                    }),
                ],
            })
            .unwrap_err();
        assert_eq!(err.code, StorageErrorCode::TransactionCanceled);
        assert_eq!(err.cancellation_reasons[0].code, "None");
        assert_eq!(err.cancellation_reasons[1].item, Some(book("X", 1, "T")));
        assert_eq!(engine.item_count("Book").unwrap(), 1);
    }

    #[test]
    fn test_should_commit_all_members() {
        let engine = engine();
        put(&engine, book("X", 1, "T"));
        engine
            .transact_write_items(TransactWriteItemsInput {
                transact_items: vec![
                    TransactWriteItem::Put(TransactPut {
                        table_name: "Book".to_owned(),
                        item: book("X", 2, "N"),
                        ..Default::default()
                    }),
                    TransactWriteItem::Delete(TransactDelete {
                        table_name: "Book".to_owned(),
                        key: key("X", 1),
                        condition_expression: Some("attribute_exists(Author)".to_owned()),
                        ..Default::default()
                    }),
                ],
            })
            .unwrap();
        let all = engine
            .scan(ScanInput {
                table_name: "Book".to_owned(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(all.items, vec![book("X", 2, "N")]);
    }

    #[test]
    fn test_should_reject_two_members_on_one_item() {
        let engine = engine();
        let delete = || {
            TransactWriteItem::Delete(TransactDelete {
                table_name: "Book".to_owned(),
                key: key("X", 1),
                ..Default::default()
            })
        };
        let err = engine
            .transact_write_items(TransactWriteItemsInput {
                transact_items: vec![delete(), delete()],
            })
            .unwrap_err();
        assert_eq!(err.code, StorageErrorCode::Validation);
    }
}
