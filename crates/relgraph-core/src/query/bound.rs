//! Validated selection trees produced by the binder.

use relgraph_proto::{CriteriaNode, Value};

use crate::relational::{Column, Direction, Window};
use crate::surface::MetaField;

/// An ordering directive taken from a leaf's `orderBy` argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderRequest {
    /// To-one associations walked from the ordered entity.
    pub associations: Vec<String>,
    /// Column (or embedded member) ordered on.
    pub column: Column,
    /// Direction.
    pub direction: Direction,
}

impl OrderRequest {
    /// Canonical text, e.g. `author.name DESC`.
    pub fn canonical(&self) -> String {
        let mut path: Vec<&str> = self.associations.iter().map(String::as_str).collect();
        path.extend(self.column.0.iter().map(String::as_str));
        let dir = match self.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        format!("{} {dir}", path.join("."))
    }
}

/// What the fields of one entity level select.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySelection {
    /// Entity the rows belong to.
    pub entity: String,
    /// Selected fields in document order.
    pub fields: Vec<BoundField>,
    /// Ordering requested by this level's leaves and its to-one sub-selections.
    pub order: Vec<OrderRequest>,
    /// Existence requirements from associations selected with `optional: false`.
    pub requirements: Vec<CriteriaNode>,
}

impl EntitySelection {
    /// Associations selected at this level, with their field index.
    pub fn associations(&self) -> impl Iterator<Item = (usize, &AssociationField)> {
        self.fields
            .iter()
            .enumerate()
            .filter_map(|(i, f)| match &f.kind {
                FieldKind::Association(assoc) => Some((i, assoc.as_ref())),
                _ => None,
            })
    }

    /// Whether any association is selected at this level.
    pub fn has_associations(&self) -> bool {
        self.associations().next().is_some()
    }
}

/// A selected field under its response key.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundField {
    pub key: String,
    pub kind: FieldKind,
}

impl BoundField {
    pub fn new(key: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            kind,
        }
    }
}

/// Meaning of a selected field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// `__typename`.
    Typename(String),
    /// A scalar or enum column, an embedded member, or a scalar element collection.
    Column(String),
    /// An embedded object (or a list of them) read from a column.
    Embedded { column: String, fields: Vec<BoundField> },
    /// An association resolved by the resolver.
    Association(Box<AssociationField>),
    /// Rows of the enclosing collection or edge.
    Rows(EntitySelection),
    /// A scalar meta field of a wrapper type.
    Meta(MetaField),
    /// A meta field with its own sub-selection (`aggregate`, `edges`, `pageInfo`).
    Group { meta: MetaField, fields: Vec<BoundField> },
    /// A field that failed to bind; answered as null.
    Failed,
}

/// A selected association with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationField {
    /// Association attribute on the parent entity.
    pub attribute: String,
    /// Parent entity.
    pub owner: String,
    /// Target entity.
    pub target: String,
    /// To-many (list) or to-one (object).
    pub to_many: bool,
    /// Parent column.
    pub local_key: String,
    /// Target column.
    pub remote_key: String,
    /// Explicit `where` argument.
    pub criteria: Option<CriteriaNode>,
    /// Effective `optional` argument.
    pub optional: bool,
    /// Target selection.
    pub selection: EntitySelection,
}

impl AssociationField {
    /// Criteria applied to the target fetch: the `where` argument plus the
    /// target selection's own requirements.
    pub fn fetch_criteria(&self) -> Option<CriteriaNode> {
        let mut nodes: Vec<CriteriaNode> = self.criteria.iter().cloned().collect();
        nodes.extend(self.selection.requirements.iter().cloned());
        (!nodes.is_empty()).then(|| CriteriaNode::all_of(nodes))
    }
}

/// Paging of a collection field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    /// Rows fetched.
    pub window: Window,
    /// Page size used for `pages`; `None` when the collection is unbounded.
    pub page_size: Option<usize>,
}

/// A bound root field.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundRoot {
    pub key: String,
    pub kind: RootKind,
}

/// Meaning of a root field.
#[derive(Debug, Clone, PartialEq)]
pub enum RootKind {
    /// `__typename` of the root type.
    Typename(String),
    /// Lookup by identity.
    ById {
        entity: String,
        identity: Value,
        selection: EntitySelection,
    },
    /// Paged collection.
    Collection {
        entity: String,
        criteria: Option<CriteriaNode>,
        paging: Paging,
        distinct: bool,
        fields: Vec<BoundField>,
    },
    /// Relay connection.
    Connection {
        entity: String,
        criteria: Option<CriteriaNode>,
        window: Window,
        fields: Vec<BoundField>,
    },
    /// Subscription stream.
    Stream {
        entity: String,
        criteria: Option<CriteriaNode>,
        selection: EntitySelection,
    },
    /// Failed to bind; answered as null.
    Failed,
}

/// Entity selections under a wrapper's fields (`select`, `edges.node`).
pub fn row_selections(fields: &[BoundField]) -> Vec<&EntitySelection> {
    let mut out = Vec::new();
    for field in fields {
        match &field.kind {
            FieldKind::Rows(selection) => out.push(selection),
            FieldKind::Group { fields, .. } => out.extend(row_selections(fields)),
            _ => {}
        }
    }
    out
}

/// Ordering of a root collection: the order of every row selection under
/// `fields`, in declaration order, without repeats.
pub fn row_order(fields: &[BoundField]) -> Vec<OrderRequest> {
    let mut order: Vec<OrderRequest> = Vec::new();
    for selection in row_selections(fields) {
        for request in &selection.order {
            if !order.contains(request) {
                order.push(request.clone());
            }
        }
    }
    order
}

/// Existence requirements of every row selection under `fields`.
pub fn row_requirements(fields: &[BoundField]) -> Vec<CriteriaNode> {
    let mut requirements: Vec<CriteriaNode> = Vec::new();
    for selection in row_selections(fields) {
        for node in &selection.requirements {
            if !requirements.contains(node) {
                requirements.push(node.clone());
            }
        }
    }
    requirements
}

/// Opaque cursor of a row offset.
pub fn encode_cursor(offset: usize) -> String {
    hex::encode((offset as u64).to_be_bytes())
}

/// Row offset of a cursor produced by [`encode_cursor`].
pub fn decode_cursor(cursor: &str) -> Option<usize> {
    let bytes: [u8; 8] = hex::decode(cursor).ok()?.try_into().ok()?;
    usize::try_from(u64::from_be_bytes(bytes)).ok()
}

/// Whether a meta field is selected anywhere under `fields`.
pub fn selects_meta(fields: &[BoundField], meta: MetaField) -> bool {
    fields.iter().any(|field| match &field.kind {
        FieldKind::Meta(m) => *m == meta,
        FieldKind::Group { meta: m, fields } => *m == meta || selects_meta(fields, meta),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relgraph_proto::Operator;

    fn selection(fields: Vec<BoundField>) -> EntitySelection {
        EntitySelection {
            entity: "Book".into(),
            fields,
            order: vec![],
            requirements: vec![],
        }
    }

    #[test]
    fn test_order_canonical() {
        let order = OrderRequest {
            associations: vec!["author".into()],
            column: Column::new("address").member("city"),
            direction: Direction::Desc,
        };
        assert_eq!(order.canonical(), "author.address.city DESC");
    }

    #[test]
    fn test_fetch_criteria_merges_requirements() {
        let mut target = selection(vec![]);
        target
            .requirements
            .push(CriteriaNode::association("publisher", CriteriaNode::and(vec![])));
        let field = AssociationField {
            attribute: "books".into(),
            owner: "Author".into(),
            target: "Book".into(),
            to_many: true,
            local_key: "id".into(),
            remote_key: "author_id".into(),
            criteria: Some(CriteriaNode::field("title", Operator::EQ, "Dune")),
            optional: true,
            selection: target,
        };
        match field.fetch_criteria() {
            Some(CriteriaNode::Logical { children, .. }) => assert_eq!(children.len(), 2),
            other => panic!("unexpected criteria {other:?}"),
        }
    }

    #[test]
    fn test_meta_lookup_descends_groups() {
        let fields = vec![
            BoundField::new("select", FieldKind::Rows(selection(vec![]))),
            BoundField::new(
                "aggregate",
                FieldKind::Group {
                    meta: MetaField::Aggregate,
                    fields: vec![BoundField::new("count", FieldKind::Meta(MetaField::Count))],
                },
            ),
        ];
        assert!(selects_meta(&fields, MetaField::Count));
        assert!(!selects_meta(&fields, MetaField::Total));
        assert_eq!(row_selections(&fields).len(), 1);
    }

    #[test]
    fn test_row_order_dedups_across_selections() {
        let by_title = OrderRequest {
            associations: vec![],
            column: Column::new("title"),
            direction: Direction::Asc,
        };
        let mut first = selection(vec![]);
        first.order.push(by_title.clone());
        let mut second = selection(vec![]);
        second.order.push(by_title.clone());
        let fields = vec![
            BoundField::new("a", FieldKind::Rows(first)),
            BoundField::new("b", FieldKind::Rows(second)),
        ];
        assert_eq!(row_order(&fields), vec![by_title]);
    }

    #[test]
    fn test_cursor_roundtrip() {
        assert_eq!(encode_cursor(3), "0000000000000003");
        assert_eq!(decode_cursor(&encode_cursor(41)), Some(41));
        assert_eq!(decode_cursor("zz"), None);
        assert_eq!(decode_cursor("0001"), None);
    }
}
