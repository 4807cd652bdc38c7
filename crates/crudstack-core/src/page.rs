//! Page results.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crudstack_model::Item;
use crudstack_model::output::{QueryOutput, ScanOutput};

use crate::codec::{AttributeCodec, from_item};
use crate::error::CodecError;

/// One bounded slice of a range read plus the cursor to continue from.
///
/// `last_evaluated_key` is `None` exactly when the sequence is exhausted.
/// A page may be empty and still carry a cursor when the store stopped on
/// its evaluation limit before finding a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T, K = Item> {
    /// Items of this page, in storage order.
    pub items: Vec<T>,
    /// Cursor for the next call, absent at the end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<K>,
}

impl<T, K> PageResult<T, K> {
    /// Whether another page may follow.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.last_evaluated_key.is_some()
    }

    /// Number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this page carries no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl PageResult<Item> {
    /// A raw page. An empty key is normalized to `None`.
    #[must_use]
    pub fn from_raw(items: Vec<Item>, last_evaluated_key: Option<Item>) -> Self {
        Self {
            items,
            last_evaluated_key: last_evaluated_key.filter(|key| !key.is_empty()),
        }
    }

    /// Decodes items into records and keeps the cursor as the raw key, ready
    /// to be passed back as the next call's cursor argument.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` if an item does not fit `T`.
    pub fn decode_items<T>(
        self,
        codec: &dyn AttributeCodec,
    ) -> Result<PageResult<T>, CodecError>
    where
        T: DeserializeOwned,
    {
        let items = self
            .items
            .iter()
            .map(|item| from_item(codec, item))
            .collect::<Result<Vec<T>, _>>()?;
        Ok(PageResult {
            items,
            last_evaluated_key: self.last_evaluated_key,
        })
    }

    /// Decodes items into records and the cursor into a caller-defined key
    /// type such as a struct of the key attributes. Use
    /// [`decode_items`](Self::decode_items) to keep the raw key instead.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` if an item or the cursor does not fit its
    /// target type.
    pub fn decode<T, K>(self, codec: &dyn AttributeCodec) -> Result<PageResult<T, K>, CodecError>
    where
        T: DeserializeOwned,
        K: DeserializeOwned,
    {
        let items = self
            .items
            .iter()
            .map(|item| from_item(codec, item))
            .collect::<Result<Vec<T>, _>>()?;
        let last_evaluated_key = self
            .last_evaluated_key
            .map(|key| from_item(codec, &key))
            .transpose()?;
        Ok(PageResult {
            items,
            last_evaluated_key,
        })
    }
}

impl From<QueryOutput> for PageResult<Item> {
    fn from(output: QueryOutput) -> Self {
        Self::from_raw(output.items, output.last_evaluated_key)
    }
}

impl From<ScanOutput> for PageResult<Item> {
    fn from(output: ScanOutput) -> Self {
        Self::from_raw(output.items, output.last_evaluated_key)
    }
}

#[cfg(test)]
mod tests {
    use crudstack_model::AttributeValue;
    use serde::Deserialize;

    use super::*;
    use crate::codec::JsonAttributeCodec;

    #[derive(Debug, PartialEq, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct BookKey {
        author: String,
        id: String,
    }

    fn key(author: &str, id: &str) -> Item {
        Item::from([
            ("Author".to_owned(), AttributeValue::from(author)),
            ("Id".to_owned(), AttributeValue::from(id)),
        ])
    }

    #[test]
    fn test_should_treat_empty_key_as_end() {
        let page = PageResult::from_raw(vec![], Some(Item::new()));
        assert!(!page.has_more());
        assert!(page.is_empty());
    }

    #[test]
    fn test_should_decode_cursor_into_key_type() {
        let page = PageResult::from_raw(vec![key("X", "1")], Some(key("X", "1")));
        let typed: PageResult<BookKey, BookKey> = page.decode(&JsonAttributeCodec).unwrap();
        assert_eq!(typed.len(), 1);
        assert_eq!(
            typed.last_evaluated_key,
            Some(BookKey {
                author: "X".to_owned(),
                id: "1".to_owned()
            })
        );
    }

    #[test]
    fn test_should_keep_raw_cursor_when_decoding_items() {
        let page = PageResult::from_raw(vec![key("X", "1")], Some(key("X", "1")));
        let typed: PageResult<BookKey> = page.decode_items(&JsonAttributeCodec).unwrap();
        assert_eq!(typed.items[0].author, "X");
        assert_eq!(typed.last_evaluated_key, Some(key("X", "1")));
    }

    #[test]
    fn test_should_convert_query_output() {
        let output = QueryOutput {
            items: vec![key("X", "1"), key("X", "2")],
            count: 2,
            scanned_count: 2,
            last_evaluated_key: None,
        };
        let page = PageResult::from(output);
        assert_eq!(page.len(), 2);
        assert!(!page.has_more());
    }
}
