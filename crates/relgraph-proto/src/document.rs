//! Parsed query documents.
//!
//! The transport layer hands the core a [`QueryDocument`]: a tree of field
//! selections with JSON arguments. Documents are plain serde types, so a
//! transport that speaks JSON can decode them directly with
//! [`QueryDocument::from_json`].

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The root operation of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// One-shot query answered with a single response.
    #[default]
    Query,
    /// Streaming query answered with one response per root row.
    Subscription,
}

/// A parsed query document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDocument {
    /// Root operation.
    #[serde(default)]
    pub operation: OperationKind,
    /// Root field selections.
    pub selection: Vec<Selection>,
}

impl QueryDocument {
    /// Create a query document.
    pub fn query(selection: Vec<Selection>) -> Self {
        Self {
            operation: OperationKind::Query,
            selection,
        }
    }

    /// Create a subscription document.
    pub fn subscription(selection: Vec<Selection>) -> Self {
        Self {
            operation: OperationKind::Subscription,
            selection,
        }
    }

    /// Decode a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let document: QueryDocument = serde_json::from_str(text)?;
        if document.selection.is_empty() {
            return Err(Error::InvalidDocument(
                "document selects no root fields".to_string(),
            ));
        }
        Ok(document)
    }

    /// Encode the document as JSON text.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One selected field, possibly with arguments and a nested selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Field name on the enclosing type.
    pub name: String,
    /// Response key override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Arguments in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Argument>,
    /// Nested selection; empty for leaf fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selection: Vec<Selection>,
}

impl Selection {
    /// Create a selection of a field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            arguments: vec![],
            selection: vec![],
        }
    }

    /// Create leaf selections for a list of field names.
    pub fn leaves(names: &[&str]) -> Vec<Selection> {
        names.iter().map(|name| Selection::new(*name)).collect()
    }

    /// Set the response key.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Add an argument.
    pub fn with_arg(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.arguments.push(Argument {
            name: name.into(),
            value,
        });
        self
    }

    /// Append nested selections.
    pub fn with_selection(mut self, selection: Vec<Selection>) -> Self {
        self.selection.extend(selection);
        self
    }

    /// Append one nested selection.
    pub fn select(mut self, child: Selection) -> Self {
        self.selection.push(child);
        self
    }

    /// The key this field is answered under.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Look up an argument by name.
    pub fn argument(&self, name: &str) -> Option<&serde_json::Value> {
        self.arguments
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }

    /// Whether this is a leaf selection.
    pub fn is_leaf(&self) -> bool {
        self.selection.is_empty()
    }
}

/// A named argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Argument name.
    pub name: String,
    /// Argument value as JSON.
    pub value: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_builder_shape() {
        let doc = QueryDocument::query(vec![Selection::new("Books")
            .with_arg("where", json!({"title": {"EQ": "Dune"}}))
            .select(Selection::new("select").with_selection(Selection::leaves(&["id", "title"])))
            .select(Selection::new("total"))]);

        let books = &doc.selection[0];
        assert_eq!(books.response_key(), "Books");
        assert_eq!(
            books.argument("where"),
            Some(&json!({"title": {"EQ": "Dune"}}))
        );
        assert!(books.argument("page").is_none());
        assert_eq!(books.selection[0].selection.len(), 2);
        assert!(books.selection[1].is_leaf());
    }

    #[test]
    fn test_decode_from_json() {
        let doc = QueryDocument::from_json(
            r#"{
                "selection": [{
                    "name": "Book",
                    "alias": "dune",
                    "arguments": [{"name": "id", "value": 1}],
                    "selection": [{"name": "title"}]
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(doc.operation, OperationKind::Query);
        assert_eq!(doc.selection[0].response_key(), "dune");
        assert_eq!(doc.selection[0].argument("id"), Some(&json!(1)));
    }

    #[test]
    fn test_decode_subscription() {
        let doc =
            QueryDocument::from_json(r#"{"operation": "subscription", "selection": [{"name": "Books"}]}"#)
                .unwrap();
        assert_eq!(doc.operation, OperationKind::Subscription);
    }

    #[test]
    fn test_decode_rejects_empty_document() {
        let err = QueryDocument::from_json(r#"{"selection": []}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument(_)));

        let err = QueryDocument::from_json("not json").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_encode_skips_empty_parts() {
        let doc = QueryDocument::query(vec![Selection::new("Books")]);
        let text = doc.to_json().unwrap();
        assert_eq!(text, r#"{"operation":"query","selection":[{"name":"Books"}]}"#);
    }
}
