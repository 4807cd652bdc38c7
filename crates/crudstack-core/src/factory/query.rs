//! Query and scan factories.
//!
//! Both produce a single page's request. The page size comes from the
//! operation's limit parameter and the starting point from its cursor
//! parameter; either may be absent, in which case the store decides.

use crudstack_model::input::{QueryInput, ScanInput};
use crudstack_model::{Item, TableSchema};

use crate::argument::{Argument, Arguments};
use crate::codec::AttributeCodec;
use crate::config::CrudConfig;
use crate::error::{CompileError, CrudError};
use crate::expression::{ExpressionAttributesFactory, ParsedExpression};
use crate::factory::{
    RangeFactory, Request, check_projection, parse_optional, parse_required, request_text,
};
use crate::signature::Signature;

/// Page-control arguments of one call.
fn page_controls(
    args: &Arguments<'_>,
    codec: &dyn AttributeCodec,
) -> Result<(Option<u32>, Option<Item>), CrudError> {
    let limit = args.limit().and_then(Argument::as_limit);
    let start = args
        .cursor()
        .map(|arg| arg.encode_item(codec))
        .transpose()?
        .flatten()
        .filter(|key| !key.is_empty());
    Ok((limit, start))
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Builds [`QueryInput`]s.
#[derive(Debug, Clone)]
pub struct QueryFactory {
    table_name: String,
    index_name: Option<String>,
    key_condition: ParsedExpression,
    filter: Option<ParsedExpression>,
    projection: Option<ParsedExpression>,
    attributes: ExpressionAttributesFactory,
    scan_index_forward: Option<bool>,
    consistent_read: bool,
}

impl QueryFactory {
    /// Validates the descriptor and prepares the factory.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::MissingField` without a key condition and any
    /// error from validating the expressions.
    pub fn new(
        signature: &Signature,
        schema: &TableSchema,
        config: &CrudConfig,
    ) -> Result<Self, CompileError> {
        let desc = signature.descriptor();
        let key_condition = parse_required(
            signature,
            "keyConditionExpression",
            desc.key_condition_expression.as_deref(),
        )?;
        let filter = parse_optional(signature, desc.filter_expression.as_deref())?;
        let projection = parse_optional(signature, desc.projection_expression.as_deref())?;
        check_projection(signature, projection.as_ref())?;
        let attributes = ExpressionAttributesFactory::new(
            signature,
            &desc.attribute_names,
            std::iter::once(&key_condition)
                .chain(filter.iter())
                .chain(projection.iter()),
        )?;

        Ok(Self {
            table_name: config.physical_table_name(&schema.table_name),
            index_name: desc.index_name.clone(),
            key_condition,
            filter,
            projection,
            attributes,
            scan_index_forward: desc.scan_index_forward,
            // Secondary indexes do not support consistent reads.
            consistent_read: config.consistent_read && desc.index_name.is_none(),
        })
    }

    /// Builds the request for one page.
    ///
    /// # Errors
    ///
    /// Returns any error from resolving the expressions' placeholders or
    /// encoding the cursor.
    pub fn build(
        &self,
        args: &Arguments<'_>,
        codec: &dyn AttributeCodec,
    ) -> Result<QueryInput, CrudError> {
        let attrs = self.attributes.create(args, codec)?;
        let (limit, exclusive_start_key) = page_controls(args, codec)?;
        Ok(QueryInput {
            table_name: self.table_name.clone(),
            index_name: self.index_name.clone(),
            key_condition_expression: self.key_condition.to_request_text(),
            filter_expression: request_text(self.filter.as_ref()),
            projection_expression: request_text(self.projection.as_ref()),
            expression_attribute_names: attrs.names,
            expression_attribute_values: attrs.values,
            scan_index_forward: self.scan_index_forward,
            limit,
            exclusive_start_key,
            consistent_read: self.consistent_read.then_some(true),
        })
    }
}

impl RangeFactory for QueryFactory {
    fn create(&self, args: &Arguments<'_>, codec: &dyn AttributeCodec) -> Result<Request, CrudError> {
        self.build(args, codec).map(Request::Query)
    }
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// Builds [`ScanInput`]s.
#[derive(Debug, Clone)]
pub struct ScanFactory {
    table_name: String,
    index_name: Option<String>,
    filter: Option<ParsedExpression>,
    projection: Option<ParsedExpression>,
    attributes: ExpressionAttributesFactory,
    consistent_read: bool,
}

impl ScanFactory {
    /// Validates the descriptor and prepares the factory.
    ///
    /// # Errors
    ///
    /// Returns any error from validating the filter or projection.
    pub fn new(
        signature: &Signature,
        schema: &TableSchema,
        config: &CrudConfig,
    ) -> Result<Self, CompileError> {
        let desc = signature.descriptor();
        let filter = parse_optional(signature, desc.filter_expression.as_deref())?;
        let projection = parse_optional(signature, desc.projection_expression.as_deref())?;
        check_projection(signature, projection.as_ref())?;
        let attributes = ExpressionAttributesFactory::new(
            signature,
            &desc.attribute_names,
            filter.iter().chain(projection.iter()),
        )?;

        Ok(Self {
            table_name: config.physical_table_name(&schema.table_name),
            index_name: desc.index_name.clone(),
            filter,
            projection,
            attributes,
            consistent_read: config.consistent_read && desc.index_name.is_none(),
        })
    }

    /// Builds the request for one page.
    ///
    /// # Errors
    ///
    /// Returns any error from resolving the filter's placeholders or
    /// encoding the cursor.
    pub fn build(
        &self,
        args: &Arguments<'_>,
        codec: &dyn AttributeCodec,
    ) -> Result<ScanInput, CrudError> {
        let attrs = self.attributes.create(args, codec)?;
        let (limit, exclusive_start_key) = page_controls(args, codec)?;
        Ok(ScanInput {
            table_name: self.table_name.clone(),
            index_name: self.index_name.clone(),
            filter_expression: request_text(self.filter.as_ref()),
            projection_expression: request_text(self.projection.as_ref()),
            expression_attribute_names: attrs.names,
            expression_attribute_values: attrs.values,
            limit,
            exclusive_start_key,
            consistent_read: self.consistent_read.then_some(true),
        })
    }
}

impl RangeFactory for ScanFactory {
    fn create(&self, args: &Arguments<'_>, codec: &dyn AttributeCodec) -> Result<Request, CrudError> {
        self.build(args, codec).map(Request::Scan)
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
    use crate::descriptor::{OperationDescriptor, ParamType, ParameterDescriptor};

    fn book_schema() -> TableSchema {
        TableSchema::composite(
            "Book",
            KeyAttribute::new("Author", ScalarAttributeType::S),
            KeyAttribute::new("Id", ScalarAttributeType::S),
        )
    }

    fn books_by_author() -> Signature {
        Signature::new(
            OperationDescriptor::new("booksByAuthor", OperationKind::PagedQuery, "Book")
                .param(ParameterDescriptor::value(":author", ParamType::String))
                .param(ParameterDescriptor::value(":year", ParamType::Number))
                .param(ParameterDescriptor::cursor("cursor"))
                .param(ParameterDescriptor::limit("limit"))
                .key_condition("Author = :author")
                .filter("#Year > :year"),
        )
        .unwrap()
    }

    #[test]
    fn test_should_build_first_query_page() {
        let sig = books_by_author();
        let factory = QueryFactory::new(&sig, &book_schema(), &CrudConfig::default()).unwrap();
        let args = bind(
            &sig,
            vec!["X".into(), json!(1990).into(), ArgValue::Absent, 10_u32.into()],
        )
        .unwrap();
        let input = factory.build(&args, &JsonAttributeCodec).unwrap();

        assert_eq!(input.key_condition_expression.as_deref(), Some("Author = :author"));
        assert_eq!(input.filter_expression.as_deref(), Some("#Year > :year"));
        assert_eq!(input.expression_attribute_names["#Year"], "Year");
        assert_eq!(input.expression_attribute_values[":year"], AttributeValue::N("1990".to_owned()));
        assert_eq!(input.limit, Some(10));
        assert_eq!(input.exclusive_start_key, None);
    }

    #[test]
    fn test_should_continue_from_cursor() {
        let sig = books_by_author();
        let factory = QueryFactory::new(&sig, &book_schema(), &CrudConfig::default()).unwrap();
        let cursor = Item::from([
            ("Author".to_owned(), AttributeValue::from("X")),
            ("Id".to_owned(), AttributeValue::from("7")),
        ]);
        let args = bind(
            &sig,
            vec![
                "X".into(),
                json!(1990).into(),
                ArgValue::cursor(Some(cursor.clone())),
                ArgValue::Absent,
            ],
        )
        .unwrap();
        let input = factory.build(&args, &JsonAttributeCodec).unwrap();
        assert_eq!(input.exclusive_start_key, Some(cursor));
        assert_eq!(input.limit, None);
    }

    #[test]
    fn test_should_require_key_condition() {
        let sig = Signature::new(OperationDescriptor::new(
            "all",
            OperationKind::Query,
            "Book",
        ))
        .unwrap();
        let err = QueryFactory::new(&sig, &book_schema(), &CrudConfig::default()).unwrap_err();
        assert!(matches!(err, CompileError::MissingField { field: "keyConditionExpression", .. }));
    }

    #[test]
    fn test_should_skip_consistent_read_on_index() {
        let mut desc = OperationDescriptor::new("byTitle", OperationKind::Query, "Book")
            .param(ParameterDescriptor::value(":t", ParamType::String))
            .key_condition("Title = :t");
        desc.index_name = Some("TitleIndex".to_owned());
        let sig = Signature::new(desc).unwrap();
        let config = CrudConfig {
            consistent_read: true,
            ..CrudConfig::default()
        };
        let factory = QueryFactory::new(&sig, &book_schema(), &config).unwrap();
        let args = bind(&sig, vec!["T".into()]).unwrap();
        let input = factory.build(&args, &JsonAttributeCodec).unwrap();
        assert_eq!(input.index_name.as_deref(), Some("TitleIndex"));
        assert_eq!(input.consistent_read, None);
    }

    #[test]
    fn test_should_build_unfiltered_scan() {
        let sig = Signature::new(OperationDescriptor::new("everything", OperationKind::Scan, "Book"))
            .unwrap();
        let factory = ScanFactory::new(&sig, &book_schema(), &CrudConfig::default()).unwrap();
        let args = bind(&sig, vec![]).unwrap();
        let Request::Scan(input) = factory.create(&args, &JsonAttributeCodec).unwrap() else {
            panic!("expected a scan request");
        };
        assert_eq!(input.table_name, "Book");
        assert_eq!(input.filter_expression, None);
        assert!(input.expression_attribute_values.is_empty());
    }
}
