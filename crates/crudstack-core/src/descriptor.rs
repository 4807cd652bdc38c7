//! Declarative operation descriptors.
//!
//! A descriptor is the typed configuration an external loader hands to the
//! compiler: operation kind, target table, declared parameters and the
//! expression strings referencing them. Descriptors are plain `serde` data,
//! so a whole set can be read from JSON.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crudstack_model::types::{ReturnValue, ReturnValuesOnConditionCheckFailure};
use crudstack_model::{OperationKind, TableSchema};

use crate::error::CompileError;

/// Placeholder of the item parameter when a put descriptor names none.
pub const DEFAULT_ITEM_PLACEHOLDER: &str = ":an_item";

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Semantic type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Text.
    String,
    /// Integer or decimal number.
    Number,
    /// `true` / `false`.
    Boolean,
    /// Raw bytes (base64 text when supplied as JSON).
    Binary,
    /// A whole record.
    Item,
    /// An ordered list.
    List,
    /// A nested document.
    Map,
    /// Anything the attribute codec accepts.
    #[default]
    Any,
}

impl ParamType {
    /// Returns the lowercase type name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Binary => "binary",
            Self::Item => "item",
            Self::List => "list",
            Self::Map => "map",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a parameter participates in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamRole {
    /// Bound to a placeholder of the same name.
    #[default]
    Value,
    /// Pagination cursor: the previous page's last evaluated key.
    Cursor,
    /// Page-size limit.
    Limit,
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    /// Parameter name. Value parameters carry their placeholder marker
    /// (`:author`, `#field`).
    pub name: String,
    /// Semantic type.
    #[serde(default, rename = "type")]
    pub param_type: ParamType,
    /// Role within the request.
    #[serde(default)]
    pub role: ParamRole,
    /// Whether the value may be absent.
    #[serde(default)]
    pub nullable: bool,
}

impl ParameterDescriptor {
    /// A non-nullable value parameter.
    #[must_use]
    pub fn value(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            role: ParamRole::Value,
            nullable: false,
        }
    }

    /// A cursor parameter.
    #[must_use]
    pub fn cursor(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: ParamType::Item,
            role: ParamRole::Cursor,
            nullable: true,
        }
    }

    /// A page-size limit parameter.
    #[must_use]
    pub fn limit(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: ParamType::Number,
            role: ParamRole::Limit,
            nullable: true,
        }
    }

    /// Marks the parameter as accepting absent values.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// One declared operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    /// Unique operation name, used to invoke it.
    pub name: String,
    /// Operation kind.
    pub kind: OperationKind,
    /// Logical table name. Unused by `TransactWrite`, whose members name
    /// their own tables.
    #[serde(default)]
    pub table: String,
    /// Declared parameters, in call order.
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
    /// Primary-key expression (`Author = :author AND Id = :id`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_expression: Option<String>,
    /// Condition for writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// Key condition for queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_condition_expression: Option<String>,
    /// Post-read filter for queries and scans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    /// SET / REMOVE / ADD / DELETE clauses for updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_expression: Option<String>,
    /// Attributes to retrieve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    /// Placeholder of the item parameter for puts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    /// Secondary index for queries and scans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// Sort-key traversal direction for queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,
    /// Explicit physical names for name placeholders (`#n` -> `Name`).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attribute_names: HashMap<String, String>,
    /// What a successful write reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,
    /// What a write rejected by its condition reports.
    #[serde(default)]
    pub return_values_on_condition_check_failure: ReturnValuesOnConditionCheckFailure,
    /// Members of a transactional write.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transact_items: Vec<TransactItemDescriptor>,
}

impl OperationDescriptor {
    /// An empty descriptor of the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: OperationKind, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            table: table.into(),
            parameters: Vec::new(),
            key_expression: None,
            condition_expression: None,
            key_condition_expression: None,
            filter_expression: None,
            update_expression: None,
            projection_expression: None,
            item: None,
            index_name: None,
            scan_index_forward: None,
            attribute_names: HashMap::new(),
            return_values: None,
            return_values_on_condition_check_failure:
                ReturnValuesOnConditionCheckFailure::default(),
            transact_items: Vec::new(),
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Sets the key expression.
    #[must_use]
    pub fn key(mut self, expression: impl Into<String>) -> Self {
        self.key_expression = Some(expression.into());
        self
    }

    /// Sets the condition expression.
    #[must_use]
    pub fn condition(mut self, expression: impl Into<String>) -> Self {
        self.condition_expression = Some(expression.into());
        self
    }

    /// Sets the key condition expression.
    #[must_use]
    pub fn key_condition(mut self, expression: impl Into<String>) -> Self {
        self.key_condition_expression = Some(expression.into());
        self
    }

    /// Sets the filter expression.
    #[must_use]
    pub fn filter(mut self, expression: impl Into<String>) -> Self {
        self.filter_expression = Some(expression.into());
        self
    }

    /// Sets the update expression.
    #[must_use]
    pub fn update(mut self, expression: impl Into<String>) -> Self {
        self.update_expression = Some(expression.into());
        self
    }

    /// Sets the projection expression.
    #[must_use]
    pub fn projection(mut self, expression: impl Into<String>) -> Self {
        self.projection_expression = Some(expression.into());
        self
    }

    /// Sets the item placeholder.
    #[must_use]
    pub fn item(mut self, placeholder: impl Into<String>) -> Self {
        self.item = Some(placeholder.into());
        self
    }

    /// Maps a name placeholder to a physical attribute name.
    #[must_use]
    pub fn attribute_name(mut self, placeholder: impl Into<String>, name: impl Into<String>) -> Self {
        self.attribute_names.insert(placeholder.into(), name.into());
        self
    }

    /// Sets the return-on-condition-failure policy.
    #[must_use]
    pub fn on_condition_failure(mut self, policy: ReturnValuesOnConditionCheckFailure) -> Self {
        self.return_values_on_condition_check_failure = policy;
        self
    }

    /// Appends a transactional member.
    #[must_use]
    pub fn transact(mut self, item: TransactItemDescriptor) -> Self {
        self.transact_items.push(item);
        self
    }
}

/// Kind of a transactional member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactItemKind {
    /// Condition on an item that is not written.
    ConditionCheck,
    /// Full-item write.
    Put,
    /// Delete by key.
    Delete,
    /// In-place update by key.
    Update,
}

impl TransactItemKind {
    /// The single-item operation kind whose compilation rules apply.
    #[must_use]
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Self::ConditionCheck | Self::Delete => OperationKind::Delete,
            Self::Put => OperationKind::Put,
            Self::Update => OperationKind::Update,
        }
    }
}

/// One member of a transactional write. Members share the operation's
/// parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactItemDescriptor {
    /// Member kind.
    pub kind: TransactItemKind,
    /// Logical table name.
    pub table: String,
    /// Primary-key expression (all kinds but `Put`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_expression: Option<String>,
    /// Item placeholder (`Put`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    /// Condition; required for `ConditionCheck`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// Update clauses (`Update`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_expression: Option<String>,
    /// Explicit physical names for name placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attribute_names: HashMap<String, String>,
    /// What this member reports if its condition fails.
    #[serde(default)]
    pub return_values_on_condition_check_failure: ReturnValuesOnConditionCheckFailure,
}

impl TransactItemDescriptor {
    /// An empty member of the given kind.
    #[must_use]
    pub fn new(kind: TransactItemKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            key_expression: None,
            item: None,
            condition_expression: None,
            update_expression: None,
            attribute_names: HashMap::new(),
            return_values_on_condition_check_failure:
                ReturnValuesOnConditionCheckFailure::default(),
        }
    }

    /// Sets the key expression.
    #[must_use]
    pub fn key(mut self, expression: impl Into<String>) -> Self {
        self.key_expression = Some(expression.into());
        self
    }

    /// Sets the item placeholder.
    #[must_use]
    pub fn item(mut self, placeholder: impl Into<String>) -> Self {
        self.item = Some(placeholder.into());
        self
    }

    /// Sets the condition expression.
    #[must_use]
    pub fn condition(mut self, expression: impl Into<String>) -> Self {
        self.condition_expression = Some(expression.into());
        self
    }

    /// Sets the update expression.
    #[must_use]
    pub fn update(mut self, expression: impl Into<String>) -> Self {
        self.update_expression = Some(expression.into());
        self
    }

    /// Sets the return-on-condition-failure policy.
    #[must_use]
    pub fn on_condition_failure(mut self, policy: ReturnValuesOnConditionCheckFailure) -> Self {
        self.return_values_on_condition_check_failure = policy;
        self
    }

    /// Views this member as a single-item descriptor sharing the owner's
    /// parameters, so the single-item factories can compile it.
    #[must_use]
    pub fn as_operation(&self, owner: &OperationDescriptor) -> OperationDescriptor {
        let mut op = OperationDescriptor::new(
            owner.name.clone(),
            self.kind.operation_kind(),
            self.table.clone(),
        );
        op.parameters.clone_from(&owner.parameters);
        op.key_expression.clone_from(&self.key_expression);
        op.item.clone_from(&self.item);
        op.condition_expression.clone_from(&self.condition_expression);
        op.update_expression.clone_from(&self.update_expression);
        op.attribute_names.clone_from(&self.attribute_names);
        op.return_values_on_condition_check_failure = self.return_values_on_condition_check_failure;
        op
    }
}

// ---------------------------------------------------------------------------
// Descriptor sets
// ---------------------------------------------------------------------------

/// Tables and operations loaded together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorSet {
    /// Table key schemas.
    #[serde(default)]
    pub tables: Vec<TableSchema>,
    /// Declared operations.
    #[serde(default)]
    pub operations: Vec<OperationDescriptor>,
}

impl DescriptorSet {
    /// Parse a descriptor set from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::InvalidDescriptor` if the text is not a valid
    /// descriptor set.
    pub fn from_json(json: &str) -> Result<Self, CompileError> {
        serde_json::from_str(json).map_err(|e| CompileError::InvalidDescriptor {
            operation: "<descriptor set>".to_owned(),
            message: e.to_string(),
        })
    }

    /// Read and parse a descriptor set from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::InvalidDescriptor` if the file cannot be read
    /// or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CompileError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CompileError::InvalidDescriptor {
            operation: "<descriptor set>".to_owned(),
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const BOOK_SET: &str = r#"{
        "tables": [
            {"tableName": "Book", "partitionKey": {"name": "Author"}, "sortKey": {"name": "Id"}}
        ],
        "operations": [
            {
                "name": "deleteBook",
                "kind": "Delete",
                "table": "Book",
                "parameters": [
                    {"name": ":author", "type": "string"},
                    {"name": ":id", "type": "string"}
                ],
                "keyExpression": "Author = :author AND Id = :id",
                "returnValuesOnConditionCheckFailure": "ALL_OLD"
            }
        ]
    }"#;

    #[test]
    fn test_should_parse_descriptor_set_from_json() {
        let set = DescriptorSet::from_json(BOOK_SET).unwrap();
        assert_eq!(set.tables.len(), 1);
        let op = &set.operations[0];
        assert_eq!(op.kind, OperationKind::Delete);
        assert_eq!(op.parameters[1].param_type, ParamType::String);
        assert_eq!(op.parameters[1].role, ParamRole::Value);
        assert!(op.return_values_on_condition_check_failure.wants_old_item());
        assert!(op.condition_expression.is_none());
    }

    #[test]
    fn test_should_load_descriptor_set_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BOOK_SET.as_bytes()).unwrap();
        let set = DescriptorSet::from_path(file.path()).unwrap();
        assert_eq!(set.operations[0].name, "deleteBook");
    }

    #[test]
    fn test_should_reject_unreadable_descriptor_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DescriptorSet::from_path(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, CompileError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_should_share_owner_parameters_with_transact_member() {
        let owner = OperationDescriptor::new("transfer", OperationKind::TransactWrite, "")
            .param(ParameterDescriptor::value(":author", ParamType::String));
        let member = TransactItemDescriptor::new(TransactItemKind::ConditionCheck, "Book")
            .key("Author = :author")
            .condition("attribute_exists(Author)");
        let op = member.as_operation(&owner);
        assert_eq!(op.kind, OperationKind::Delete);
        assert_eq!(op.parameters, owner.parameters);
        assert_eq!(op.table, "Book");
    }
}
