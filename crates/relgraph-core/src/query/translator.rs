//! Lowering of criteria trees into relational predicates.

use relgraph_proto::{CriteriaNode, LogicalOp, Operator, Value};

use crate::error::QueryError;
use crate::metamodel::{AttributeDescriptor, AttributeKind, AttributeType, EntityDescriptor};
use crate::relational::{
    escape_like, Column, Comparison, Fold, Join, OrderTerm, Predicate, RelationalQuery, Subquery,
    ValuePath, Window,
};
use crate::surface::QuerySurface;

use super::bound::OrderRequest;

/// The entity level a criteria node is evaluated at.
#[derive(Clone, Copy)]
struct Scope<'s> {
    entity: &'s EntityDescriptor,
    /// Attributes in scope: the entity's or an embeddable's.
    attributes: &'s [AttributeDescriptor],
    /// Owner name used in error messages.
    owner: &'s str,
}

/// Translates criteria, ordering and paging into a [`RelationalQuery`].
pub struct PredicateTranslator<'s> {
    surface: &'s QuerySurface,
}

impl<'s> PredicateTranslator<'s> {
    /// Create a translator for a compiled surface.
    pub fn new(surface: &'s QuerySurface) -> Self {
        Self { surface }
    }

    /// Build the statement for `entity` with optional criteria, ordering and
    /// a window. `distinct` keeps one row per identity.
    pub fn translate(
        &self,
        entity: &str,
        criteria: Option<&CriteriaNode>,
        order: &[OrderRequest],
        window: Window,
        distinct: bool,
    ) -> Result<RelationalQuery, QueryError> {
        let descriptor = self.entity(entity)?;
        let predicate = match criteria {
            Some(node) => self.predicate(entity, node)?,
            None => Predicate::True,
        };
        let order_by = order
            .iter()
            .map(|request| self.order_term(descriptor, request))
            .collect::<Result<Vec<_>, _>>()?;
        let distinct_on = distinct.then(|| Column::new(&descriptor.identity));

        Ok(RelationalQuery::new(entity)
            .with_predicate(predicate)
            .with_order(order_by)
            .with_window(window)
            .with_distinct_on(distinct_on))
    }

    /// Lower a criteria tree evaluated at `entity`.
    pub fn predicate(&self, entity: &str, node: &CriteriaNode) -> Result<Predicate, QueryError> {
        let descriptor = self.entity(entity)?;
        let scope = Scope {
            entity: descriptor,
            attributes: &descriptor.attributes,
            owner: &descriptor.name,
        };
        self.lower(scope, &Column(vec![]), node)
    }

    fn entity(&self, name: &str) -> Result<&'s EntityDescriptor, QueryError> {
        self.surface
            .entity(name)
            .ok_or_else(|| QueryError::validation(format!("unknown entity `{name}`")))
    }

    fn attribute<'a>(scope: &Scope<'a>, name: &str) -> Result<&'a AttributeDescriptor, QueryError> {
        scope
            .attributes
            .iter()
            .find(|a| a.name == name && !a.ignored)
            .ok_or_else(|| {
                QueryError::validation(format!("unknown attribute `{name}` on {}", scope.owner))
            })
    }

    fn lower(&self, scope: Scope<'s>, prefix: &Column, node: &CriteriaNode) -> Result<Predicate, QueryError> {
        match node {
            CriteriaNode::Logical { op, children } => {
                let mut lowered = Vec::with_capacity(children.len());
                for child in children {
                    lowered.push(self.lower(scope, prefix, child)?);
                }
                Ok(match op {
                    LogicalOp::And => Predicate::all(lowered),
                    LogicalOp::Or if lowered.is_empty() => Predicate::False,
                    LogicalOp::Or => Predicate::Or(lowered),
                    LogicalOp::Not => Predicate::all(lowered).negate(),
                    LogicalOp::Exists | LogicalOp::NotExists => {
                        let identity = Column::new(&scope.entity.identity);
                        let exists = Predicate::Exists(Box::new(Subquery {
                            entity: scope.entity.name.clone(),
                            outer: identity.clone(),
                            inner: identity,
                            predicate: Predicate::all(self.lower_fresh(scope.entity, children)?),
                        }));
                        if *op == LogicalOp::NotExists {
                            exists.negate()
                        } else {
                            exists
                        }
                    }
                })
            }
            CriteriaNode::Field {
                attribute,
                operator,
                operand,
            } => {
                let attr = Self::attribute(&scope, attribute)?;
                if !matches!(attr.kind, AttributeKind::Basic) {
                    return Err(QueryError::validation(format!(
                        "attribute `{attribute}` on {} cannot be filtered with {operator}",
                        scope.owner
                    )));
                }
                let column = Column::new(attribute).under(prefix);
                Self::lower_operator(column, *operator, operand)
            }
            CriteriaNode::Embedded { attribute, criteria } => {
                let attr = Self::attribute(&scope, attribute)?;
                let embeddable = match &attr.attribute_type {
                    AttributeType::Embedded(name) if attr.kind == AttributeKind::Embedded => self
                        .surface
                        .embeddable(name)
                        .ok_or_else(|| QueryError::validation(format!("unknown embeddable `{name}`")))?,
                    _ => {
                        return Err(QueryError::validation(format!(
                            "attribute `{attribute}` on {} is not embedded",
                            scope.owner
                        )))
                    }
                };
                let inner = Scope {
                    entity: scope.entity,
                    attributes: &embeddable.attributes,
                    owner: &embeddable.name,
                };
                self.lower(inner, &Column::new(attribute).under(prefix), criteria)
            }
            CriteriaNode::Association { attribute, criteria } => {
                if !prefix.0.is_empty() {
                    return Err(QueryError::validation(format!(
                        "association `{attribute}` cannot be reached from embeddable {}",
                        scope.owner
                    )));
                }
                let attr = Self::attribute(&scope, attribute)?;
                let association = attr.association.as_ref().ok_or_else(|| {
                    QueryError::validation(format!(
                        "attribute `{attribute}` on {} is not an association",
                        scope.owner
                    ))
                })?;
                let target = self.entity(&association.target)?;
                let inner = Scope {
                    entity: target,
                    attributes: &target.attributes,
                    owner: &target.name,
                };
                Ok(Predicate::Exists(Box::new(Subquery {
                    entity: target.name.clone(),
                    outer: Column::new(&association.local_key),
                    inner: Column::new(&association.remote_key),
                    predicate: self.lower(inner, &Column(vec![]), criteria)?,
                })))
            }
        }
    }

    /// Lower children in a new scope of `entity`, as the body of a subquery.
    fn lower_fresh(
        &self,
        entity: &'s EntityDescriptor,
        children: &[CriteriaNode],
    ) -> Result<Vec<Predicate>, QueryError> {
        let scope = Scope {
            entity,
            attributes: &entity.attributes,
            owner: &entity.name,
        };
        children
            .iter()
            .map(|child| self.lower(scope, &Column(vec![]), child))
            .collect()
    }

    fn lower_operator(column: Column, op: Operator, operand: &Value) -> Result<Predicate, QueryError> {
        let compare = |cmp: Comparison, fold: Fold| Predicate::Compare {
            column: column.clone(),
            op: cmp,
            value: operand.clone(),
            fold,
        };
        let like = |pattern: String, fold: bool| Predicate::Like {
            column: column.clone(),
            pattern,
            fold,
        };

        Ok(match op {
            Operator::EQ | Operator::EQ_ if operand.is_null() => Predicate::IsNull(column),
            Operator::NE | Operator::NE_ if operand.is_null() => {
                Predicate::IsNull(column).negate()
            }
            Operator::EQ => compare(Comparison::Eq, Fold::None),
            Operator::EQ_ => compare(Comparison::Eq, Fold::Both),
            Operator::NE => compare(Comparison::Ne, Fold::None),
            Operator::NE_ => compare(Comparison::Ne, Fold::Both),
            Operator::LT => compare(Comparison::Lt, Fold::None),
            Operator::LE => compare(Comparison::Le, Fold::None),
            Operator::GT => compare(Comparison::Gt, Fold::None),
            Operator::GE => compare(Comparison::Ge, Fold::None),
            Operator::LOWER => compare(Comparison::Eq, Fold::Column),
            Operator::LIKE | Operator::LIKE_ => {
                let text = Self::text_operand(op, operand)?;
                like(format!("%{text}%"), op == Operator::LIKE_)
            }
            Operator::CASE => like(Self::text_operand(op, operand)?.to_string(), false),
            Operator::STARTS | Operator::STARTS_ => {
                let text = escape_like(Self::text_operand(op, operand)?);
                like(format!("{text}%"), op == Operator::STARTS_)
            }
            Operator::ENDS | Operator::ENDS_ => {
                let text = escape_like(Self::text_operand(op, operand)?);
                like(format!("%{text}"), op == Operator::ENDS_)
            }
            Operator::LOCATE => {
                let text = escape_like(Self::text_operand(op, operand)?);
                like(format!("%{text}%"), false)
            }
            Operator::IS_NULL | Operator::NOT_NULL => {
                let wanted = operand.as_bool().ok_or_else(|| {
                    QueryError::validation(format!("{op} takes a boolean operand"))
                })?;
                if wanted == (op == Operator::IS_NULL) {
                    Predicate::IsNull(column)
                } else {
                    Predicate::IsNull(column).negate()
                }
            }
            Operator::IN | Operator::NIN => {
                let negated = op == Operator::NIN;
                match operand {
                    Value::Null if negated => Predicate::IsNull(column).negate(),
                    Value::Null => Predicate::IsNull(column),
                    Value::List(items) => Predicate::InList {
                        column,
                        values: items.clone(),
                        negated,
                    },
                    scalar => Predicate::InList {
                        column,
                        values: vec![scalar.clone()],
                        negated,
                    },
                }
            }
            Operator::BETWEEN | Operator::NOT_BETWEEN => match operand {
                Value::List(bounds) if bounds.len() == 2 && bounds.iter().all(|b| !b.is_null()) => {
                    Predicate::Between {
                        column,
                        low: bounds[0].clone(),
                        high: bounds[1].clone(),
                        negated: op == Operator::NOT_BETWEEN,
                    }
                }
                _ => {
                    return Err(QueryError::validation(format!(
                        "{op} requires exactly two non-null bounds"
                    )))
                }
            },
        })
    }

    fn text_operand(op: Operator, operand: &Value) -> Result<&str, QueryError> {
        operand
            .as_str()
            .ok_or_else(|| QueryError::validation(format!("{op} takes a string operand")))
    }

    fn order_term(&self, root: &'s EntityDescriptor, request: &OrderRequest) -> Result<OrderTerm, QueryError> {
        let mut entity = root;
        let mut joins = Vec::with_capacity(request.associations.len());
        for name in &request.associations {
            let attr = entity
                .attribute(name)
                .filter(|a| a.kind == AttributeKind::ToOne)
                .ok_or_else(|| {
                    QueryError::validation(format!(
                        "cannot order {} through `{name}`: not a to-one association",
                        entity.name
                    ))
                })?;
            let association = attr.association.as_ref().ok_or_else(|| {
                QueryError::validation(format!("`{name}` on {} has no join keys", entity.name))
            })?;
            entity = self.entity(&association.target)?;
            joins.push(Join {
                entity: entity.name.clone(),
                local_key: association.local_key.clone(),
                remote_key: association.remote_key.clone(),
            });
        }
        Ok(OrderTerm {
            path: ValuePath {
                joins,
                column: request.column.clone(),
            },
            direction: request.direction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SurfaceConfig;
    use crate::metamodel::{
        AttributeDescriptor, EmbeddableDescriptor, EntityDescriptor, ScalarType, StaticMetamodel,
    };
    use crate::relational::{Direction, MemoryStore, RelationalStore, Row};
    use crate::surface::compile;

    fn surface() -> QuerySurface {
        let view = StaticMetamodel::new()
            .with_embeddable(
                EmbeddableDescriptor::new("Address")
                    .with_attribute(AttributeDescriptor::basic("city", ScalarType::String)),
            )
            .with_entity(
                EntityDescriptor::new("Author", "id")
                    .with_attribute(AttributeDescriptor::basic("id", ScalarType::Int64))
                    .with_attribute(AttributeDescriptor::basic("name", ScalarType::String))
                    .with_attribute(AttributeDescriptor::embedded("address", "Address"))
                    .with_attribute(AttributeDescriptor::to_many("books", "Book", "author_id")),
            )
            .with_entity(
                EntityDescriptor::new("Book", "id")
                    .with_attribute(AttributeDescriptor::basic("id", ScalarType::Int64))
                    .with_attribute(AttributeDescriptor::basic("title", ScalarType::String))
                    .with_attribute(AttributeDescriptor::optional("year", ScalarType::Int32))
                    .with_attribute(AttributeDescriptor::to_one("author", "Author")),
            );
        compile(&view, SurfaceConfig::default()).unwrap()
    }

    fn lower(node: CriteriaNode) -> Result<Predicate, QueryError> {
        let surface = surface();
        PredicateTranslator::new(&surface).predicate("Book", &node)
    }

    #[test]
    fn test_null_equality_becomes_is_null() {
        assert_eq!(
            lower(CriteriaNode::field("year", Operator::EQ, Value::Null)).unwrap(),
            Predicate::IsNull(Column::new("year"))
        );
        assert_eq!(
            lower(CriteriaNode::field("year", Operator::NE, Value::Null)).unwrap(),
            Predicate::IsNull(Column::new("year")).negate()
        );
        assert_eq!(
            lower(CriteriaNode::field("year", Operator::NIN, Value::Null)).unwrap(),
            Predicate::IsNull(Column::new("year")).negate()
        );
    }

    #[test]
    fn test_scalar_in_is_singleton() {
        assert_eq!(
            lower(CriteriaNode::field("year", Operator::IN, 1999i32)).unwrap(),
            Predicate::InList {
                column: Column::new("year"),
                values: vec![Value::Int32(1999)],
                negated: false,
            }
        );
    }

    #[test]
    fn test_string_patterns() {
        let starts = lower(CriteriaNode::field("title", Operator::STARTS_, "50%")).unwrap();
        assert_eq!(
            starts,
            Predicate::Like {
                column: Column::new("title"),
                pattern: "50\\%%".into(),
                fold: true,
            }
        );
        let like = lower(CriteriaNode::field("title", Operator::LIKE, "D_ne")).unwrap();
        assert_eq!(
            like,
            Predicate::Like {
                column: Column::new("title"),
                pattern: "%D_ne%".into(),
                fold: false,
            }
        );
    }

    #[test]
    fn test_between_arity() {
        let err = lower(CriteriaNode::field(
            "year",
            Operator::BETWEEN,
            Value::List(vec![Value::Int32(1)]),
        ))
        .unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));

        let err = lower(CriteriaNode::field(
            "year",
            Operator::BETWEEN,
            Value::List(vec![Value::Int32(1), Value::Null]),
        ))
        .unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));
    }

    #[test]
    fn test_empty_logical_nodes() {
        assert_eq!(lower(CriteriaNode::and(vec![])).unwrap(), Predicate::True);
        assert_eq!(lower(CriteriaNode::or(vec![])).unwrap(), Predicate::False);
        assert_eq!(
            lower(CriteriaNode::not(vec![])).unwrap(),
            Predicate::True.negate()
        );
    }

    #[test]
    fn test_association_becomes_correlated_exists() {
        let node = CriteriaNode::association(
            "author",
            CriteriaNode::embedded("address", CriteriaNode::field("city", Operator::EQ, "Oslo")),
        );
        let expected = Predicate::Exists(Box::new(Subquery {
            entity: "Author".into(),
            outer: Column::new("author_id"),
            inner: Column::new("id"),
            predicate: Predicate::Compare {
                column: Column::new("address").member("city"),
                op: Comparison::Eq,
                value: Value::from("Oslo"),
                fold: Fold::None,
            },
        }));
        assert_eq!(lower(node).unwrap(), expected);
    }

    #[test]
    fn test_exists_correlates_on_enclosing_level() {
        let surface = surface();
        let node = CriteriaNode::association(
            "books",
            CriteriaNode::exists(vec![CriteriaNode::field("title", Operator::EQ, "Dune")]),
        );
        let predicate = PredicateTranslator::new(&surface)
            .predicate("Author", &node)
            .unwrap();

        let Predicate::Exists(outer) = predicate else {
            panic!("expected an association subquery");
        };
        let Predicate::Exists(inner) = &outer.predicate else {
            panic!("expected a nested EXISTS");
        };
        assert_eq!(inner.entity, "Book");
        assert_eq!(inner.outer, Column::new("id"));
        assert_eq!(inner.inner, Column::new("id"));
    }

    #[test]
    fn test_unknown_attribute() {
        let err = lower(CriteriaNode::field("isbn", Operator::EQ, "x")).unwrap_err();
        assert_eq!(err.to_string(), "unknown attribute `isbn` on Book");
    }

    #[test]
    fn test_translate_orders_through_to_one() {
        let surface = surface();
        let query = PredicateTranslator::new(&surface)
            .translate(
                "Book",
                None,
                &[OrderRequest {
                    associations: vec!["author".into()],
                    column: Column::new("name"),
                    direction: Direction::Asc,
                }],
                Window::default(),
                true,
            )
            .unwrap();
        assert_eq!(query.order_by[0].path.joins.len(), 1);
        assert_eq!(query.order_by[0].path.joins[0].entity, "Author");
        assert_eq!(query.distinct_on, Some(Column::new("id")));
    }

    fn shelf() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, title, year) in [
            (1i64, "Dune", Some(1965i32)),
            (2, "Children of Dune", Some(1976)),
            (3, "DUNE MESSIAH", Some(1969)),
            (4, "100% Dune_", None),
        ] {
            store.insert(
                "Book",
                Row::new().with("id", id).with("title", title).with("year", year),
            );
        }
        store
    }

    async fn matching(store: &MemoryStore, node: CriteriaNode) -> Vec<i64> {
        let surface = surface();
        let query = PredicateTranslator::new(&surface)
            .translate("Book", Some(&node), &[], Window::default(), false)
            .unwrap();
        store
            .fetch(&query)
            .await
            .unwrap()
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_i64))
            .collect()
    }

    fn like(pattern: &str, fold: bool) -> Predicate {
        Predicate::Like {
            column: Column::new("title"),
            pattern: pattern.into(),
            fold,
        }
    }

    #[tokio::test]
    async fn test_case_keeps_caller_wildcards() {
        let node = CriteriaNode::field("title", Operator::CASE, "D%e");
        assert_eq!(lower(node.clone()).unwrap(), like("D%e", false));

        let store = shelf();
        assert_eq!(matching(&store, node).await, vec![1]);
        assert_eq!(
            matching(&store, CriteriaNode::field("title", Operator::CASE, "%Dune%")).await,
            vec![1, 2, 4]
        );
    }

    #[tokio::test]
    async fn test_ends_escapes_operand() {
        let store = shelf();

        let node = CriteriaNode::field("title", Operator::ENDS, "Dune");
        assert_eq!(lower(node.clone()).unwrap(), like("%Dune", false));
        assert_eq!(matching(&store, node).await, vec![1, 2]);

        let node = CriteriaNode::field("title", Operator::ENDS, "Dune_");
        assert_eq!(lower(node.clone()).unwrap(), like("%Dune\\_", false));
        assert_eq!(matching(&store, node).await, vec![4]);
    }

    #[tokio::test]
    async fn test_ends_folded() {
        let node = CriteriaNode::field("title", Operator::ENDS_, "dune");
        assert_eq!(lower(node.clone()).unwrap(), like("%dune", true));
        assert_eq!(matching(&shelf(), node).await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_locate_is_literal_and_case_sensitive() {
        let store = shelf();

        let node = CriteriaNode::field("title", Operator::LOCATE, "% Dune");
        assert_eq!(lower(node.clone()).unwrap(), like("%\\% Dune%", false));
        assert_eq!(matching(&store, node).await, vec![4]);

        let node = CriteriaNode::field("title", Operator::LOCATE, "une");
        assert_eq!(matching(&store, node).await, vec![1, 2, 4]);
    }

    #[tokio::test]
    async fn test_not_between_skips_null_columns() {
        let bounds = Value::List(vec![Value::Int32(1966), Value::Int32(1975)]);
        let node = CriteriaNode::field("year", Operator::NOT_BETWEEN, bounds);
        assert_eq!(
            lower(node.clone()).unwrap(),
            Predicate::Between {
                column: Column::new("year"),
                low: Value::Int32(1966),
                high: Value::Int32(1975),
                negated: true,
            }
        );
        assert_eq!(matching(&shelf(), node).await, vec![1, 2]);
    }

    #[test]
    fn test_between_rejects_null_bound() {
        let bounds = Value::List(vec![Value::Int32(1966), Value::Null]);
        assert!(lower(CriteriaNode::field("year", Operator::NOT_BETWEEN, bounds)).is_err());
    }
}
