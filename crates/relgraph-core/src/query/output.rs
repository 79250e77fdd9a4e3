//! Row arena and response materialization.
//!
//! Each association field at each level of a root becomes one arena node
//! holding the rows of every parent, concatenated. A link maps each parent
//! row to its slice of the child node, or to the error that replaced it.

use std::collections::HashMap;
use std::ops::Range;

use relgraph_proto::{GraphError, PathSegment, Value};
use serde_json::{Map, Value as Json};

use crate::error::QueryError;
use crate::relational::Row;

use super::bound::{BoundField, EntitySelection, FieldKind};

/// Rows of one selection level.
pub(crate) struct Node<'b> {
    pub selection: &'b EntitySelection,
    pub rows: Vec<Row>,
    /// Association links by field index.
    pub links: HashMap<usize, Link>,
}

impl<'b> Node<'b> {
    pub fn new(selection: &'b EntitySelection, rows: Vec<Row>) -> Self {
        Self {
            selection,
            rows,
            links: HashMap::new(),
        }
    }
}

/// Per-parent slices of a child node.
pub(crate) struct Link {
    pub node: usize,
    pub slices: Vec<Result<Range<usize>, QueryError>>,
}

#[derive(Default)]
pub(crate) struct Arena<'b> {
    pub nodes: Vec<Node<'b>>,
}

impl<'b> Arena<'b> {
    pub fn push(&mut self, node: Node<'b>) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Render one row of a node. Resolution errors are collected at the
    /// concrete path of the field that lost its rows.
    pub fn render_row(
        &self,
        node: usize,
        row: usize,
        path: &[PathSegment],
        errors: &mut Vec<GraphError>,
    ) -> Json {
        let current = &self.nodes[node];
        let data = &current.rows[row];
        let mut out = Map::new();

        for (index, field) in current.selection.fields.iter().enumerate() {
            let value = match &field.kind {
                FieldKind::Typename(name) => Json::String(name.clone()),
                FieldKind::Column(column) => data.get(column).map_or(Json::Null, Value::to_json),
                FieldKind::Embedded { column, fields } => render_embedded(data.get(column), fields),
                FieldKind::Association(assoc) => match current.links.get(&index) {
                    None => Json::Null,
                    Some(link) => {
                        let field_path = child(path, &field.key);
                        match &link.slices[row] {
                            Err(err) => {
                                errors.push(err.at(field_path));
                                Json::Null
                            }
                            Ok(range) if assoc.to_many => Json::Array(
                                range
                                    .clone()
                                    .enumerate()
                                    .map(|(i, child_row)| {
                                        let mut item_path = field_path.clone();
                                        item_path.push(PathSegment::Index(i));
                                        self.render_row(link.node, child_row, &item_path, errors)
                                    })
                                    .collect(),
                            ),
                            Ok(range) => match range.clone().next() {
                                Some(child_row) => {
                                    self.render_row(link.node, child_row, &field_path, errors)
                                }
                                None => Json::Null,
                            },
                        }
                    }
                },
                FieldKind::Rows(_) | FieldKind::Meta(_) | FieldKind::Group { .. } | FieldKind::Failed => {
                    Json::Null
                }
            };
            out.insert(field.key.clone(), value);
        }
        Json::Object(out)
    }

    /// Render every row of a node as a list under `path`.
    pub fn render_rows(&self, node: usize, path: &[PathSegment], errors: &mut Vec<GraphError>) -> Json {
        Json::Array(
            (0..self.nodes[node].rows.len())
                .map(|i| {
                    let mut row_path = path.to_vec();
                    row_path.push(PathSegment::Index(i));
                    self.render_row(node, i, &row_path, errors)
                })
                .collect(),
        )
    }
}

/// Render an embedded value (or a list of them) read from a row.
fn render_embedded(value: Option<&Value>, fields: &[BoundField]) -> Json {
    match value {
        Some(Value::List(items)) => Json::Array(
            items
                .iter()
                .map(|item| render_embedded(Some(item), fields))
                .collect(),
        ),
        Some(object @ Value::Object(_)) => {
            let mut out = Map::new();
            for field in fields {
                let value = match &field.kind {
                    FieldKind::Typename(name) => Json::String(name.clone()),
                    FieldKind::Column(member) => object.member(member).map_or(Json::Null, Value::to_json),
                    FieldKind::Embedded { column, fields } => render_embedded(object.member(column), fields),
                    _ => Json::Null,
                };
                out.insert(field.key.clone(), value);
            }
            Json::Object(out)
        }
        _ => Json::Null,
    }
}

pub(crate) fn child(path: &[PathSegment], key: &str) -> Vec<PathSegment> {
    let mut path = path.to_vec();
    path.push(PathSegment::from(key));
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::query::bound::AssociationField;
    use serde_json::json;

    fn selection(entity: &str, fields: Vec<BoundField>) -> EntitySelection {
        EntitySelection {
            entity: entity.into(),
            fields,
            order: vec![],
            requirements: vec![],
        }
    }

    #[test]
    fn test_renders_embedded_and_lists() {
        let address = vec![BoundField::new("city", FieldKind::Column("city".into()))];
        let author = selection(
            "Author",
            vec![
                BoundField::new("name", FieldKind::Column("name".into())),
                BoundField::new(
                    "address",
                    FieldKind::Embedded {
                        column: "address".into(),
                        fields: address,
                    },
                ),
                BoundField::new("__typename", FieldKind::Typename("Author".into())),
            ],
        );
        let row = Row::new().with("name", "Le Guin").with(
            "address",
            Value::Object(vec![("city".into(), Value::from("Portland"))]),
        );

        let mut arena = Arena::default();
        let node = arena.push(Node::new(&author, vec![row]));
        let mut errors = vec![];
        let rendered = arena.render_rows(node, &[PathSegment::from("Authors")], &mut errors);
        assert_eq!(
            rendered,
            json!([{"name": "Le Guin", "address": {"city": "Portland"}, "__typename": "Author"}])
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_failed_link_reports_concrete_path() {
        let books = selection("Book", vec![BoundField::new("title", FieldKind::Column("title".into()))]);
        let author = selection(
            "Author",
            vec![BoundField::new(
                "books",
                FieldKind::Association(Box::new(AssociationField {
                    attribute: "books".into(),
                    owner: "Author".into(),
                    target: "Book".into(),
                    to_many: true,
                    local_key: "id".into(),
                    remote_key: "author_id".into(),
                    criteria: None,
                    optional: true,
                    selection: books.clone(),
                })),
            )],
        );

        let mut arena = Arena::default();
        let parent = arena.push(Node::new(&author, vec![Row::new(), Row::new()]));
        let child_node = arena.push(Node::new(&books, vec![Row::new().with("title", "Dune")]));
        let err: QueryError = StoreError::Unavailable("disk".into()).into();
        arena.nodes[parent].links.insert(
            0,
            Link {
                node: child_node,
                slices: vec![Ok(0..1), Err(err)],
            },
        );

        let mut errors = vec![];
        let rendered = arena.render_rows(
            parent,
            &[PathSegment::from("Authors"), PathSegment::from("select")],
            &mut errors,
        );
        assert_eq!(rendered, json!([{"books": [{"title": "Dune"}]}, {"books": null}]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path_string(), "Authors.select.1.books");
    }
}
