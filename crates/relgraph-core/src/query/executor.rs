//! Query executor.
//!
//! A document is bound, then every root field runs concurrently against one
//! [`BatchCoordinator`]. Each root resolves its selection tree in waves: all
//! association fields at one depth are resolved together, so a query costs
//! one statement per association field per level, not one per parent row.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future::{join_all, BoxFuture};
use futures::stream::{self, BoxStream, StreamExt};
use relgraph_proto::{
    CriteriaNode, GraphError, OperationKind, Operator, PathSegment, QueryDocument, Response, Value,
};
use serde_json::{Map, Value as Json};
use tracing::{debug, instrument, warn};

use crate::error::QueryError;
use crate::relational::{RelationalQuery, RelationalStore, Row, Window};
use crate::security::{AccessPolicy, AllowAll};
use crate::surface::{MetaField, QuerySurface};

use super::batch::{BatchCoordinator, Deferred};
use super::binder::Binder;
use super::bound::{
    encode_cursor, row_order, row_requirements, row_selections, selects_meta, BoundField,
    BoundRoot, EntitySelection, FieldKind, Paging, RootKind,
};
use super::output::{child, Arena, Link, Node};
use super::resolver::{AssociationResolver, Resolution};
use super::translator::PredicateTranslator;

/// Cooperative cancellation, checked before each wave.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every execution holding a clone of this handle.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Work done by one execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Statements sent to the store, counts included.
    pub statements: usize,
    /// Association batches flushed.
    pub batches: usize,
    /// Per-parent association fetches.
    pub direct_fetches: usize,
    /// Association waves run.
    pub waves: usize,
}

/// Executes documents against a compiled surface and a store.
#[derive(Clone)]
pub struct QueryExecutor {
    surface: Arc<QuerySurface>,
    store: Arc<dyn RelationalStore>,
    policy: Arc<dyn AccessPolicy>,
}

impl QueryExecutor {
    /// Create an executor that allows every read.
    pub fn new(surface: Arc<QuerySurface>, store: Arc<dyn RelationalStore>) -> Self {
        Self {
            surface,
            store,
            policy: Arc::new(AllowAll),
        }
    }

    /// Use an access policy.
    pub fn with_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn surface(&self) -> &QuerySurface {
        &self.surface
    }

    /// Execute a query document.
    pub async fn execute(&self, doc: &QueryDocument) -> Response {
        self.execute_with_stats(doc, &Cancellation::new()).await.0
    }

    /// Execute a query document, honoring `cancel`, and report the work done.
    #[instrument(skip_all, fields(roots = doc.selection.len()))]
    pub async fn execute_with_stats(
        &self,
        doc: &QueryDocument,
        cancel: &Cancellation,
    ) -> (Response, ExecutionStats) {
        if doc.operation == OperationKind::Subscription {
            let errors = doc
                .selection
                .iter()
                .map(|s| {
                    QueryError::validation("subscription documents must be run with subscribe")
                        .at(vec![PathSegment::from(s.response_key())])
                })
                .collect();
            return (Response::failed(errors), ExecutionStats::default());
        }

        let (roots, mut errors) = Binder::new(&self.surface, self.policy.as_ref()).bind(doc);
        let coordinator = BatchCoordinator::new(&self.surface, self.store.as_ref());
        let execution = Execution::new(&self.surface, self.store.as_ref(), &coordinator, cancel);

        let outputs = join_all(roots.iter().map(|root| execution.run_root(root))).await;
        let mut data = Map::new();
        for (root, (value, root_errors)) in roots.iter().zip(outputs) {
            data.insert(root.key.clone(), value);
            errors.extend(root_errors);
        }

        let stats = execution.stats();
        debug!(
            statements = stats.statements,
            batches = stats.batches,
            waves = stats.waves,
            errors = errors.len(),
            "executed document"
        );
        (Response::new(Json::Object(data), errors), stats)
    }

    /// Run a subscription document. Root rows are resolved in chunks of
    /// `stream_chunk_size` and each row is emitted as its own response.
    /// Dropping the stream stops the work.
    pub fn subscribe(&self, doc: &QueryDocument) -> BoxStream<'static, Response> {
        if doc.operation != OperationKind::Subscription {
            let error = QueryError::validation("subscribe expects a subscription document").at(vec![]);
            return stream::once(async move { Response::failed(vec![error]) }).boxed();
        }

        let (mut roots, mut errors) = Binder::new(&self.surface, self.policy.as_ref()).bind(doc);
        if roots.len() != 1 {
            errors.push(
                QueryError::validation("a subscription selects exactly one root field").at(vec![]),
            );
            return stream::once(async move { Response::failed(errors) }).boxed();
        }
        let root = roots.remove(0);
        let RootKind::Stream {
            entity,
            criteria,
            selection,
        } = root.kind
        else {
            if errors.is_empty() {
                errors.push(
                    QueryError::validation("a subscription selects a stream field")
                        .at(vec![PathSegment::from(root.key.as_str())]),
                );
            }
            return stream::once(async move { Response::failed(errors) }).boxed();
        };

        let state = StreamState {
            surface: Arc::clone(&self.surface),
            store: Arc::clone(&self.store),
            key: root.key,
            entity,
            criteria,
            selection,
            rows: None,
            pending_errors: errors,
        };
        stream::unfold(state, |mut state| async move {
            let responses = state.next_chunk().await?;
            Some((responses, state))
        })
        .flat_map(stream::iter)
        .boxed()
    }
}

/// One execution: shared coordinator, counters and deadline.
struct Execution<'a> {
    surface: &'a QuerySurface,
    store: &'a dyn RelationalStore,
    coordinator: &'a BatchCoordinator<'a>,
    resolver: AssociationResolver<'a>,
    cancel: &'a Cancellation,
    deadline: Option<Instant>,
    root_statements: AtomicUsize,
    waves: AtomicUsize,
}

/// One association field of one frontier node, waiting for its rows.
struct PendingField<'b> {
    parent: usize,
    field: usize,
    selection: &'b EntitySelection,
    slots: Vec<Slot>,
}

enum Slot {
    Ready(Result<Vec<Row>, QueryError>),
    Deferred(Deferred),
    Direct(usize),
}

/// Figures the meta fields of a wrapper render from.
#[derive(Debug, Clone, Copy, Default)]
struct PageFacts {
    total: Option<u64>,
    pages: Option<u64>,
    offset: usize,
    rows: usize,
    has_next: bool,
}

/// Rows of a wrapper, one arena node per row selection.
struct Frame<'r, 'b> {
    arena: &'r Arena<'b>,
    nodes: &'r [(&'b EntitySelection, usize)],
    facts: PageFacts,
}

impl Frame<'_, '_> {
    fn node_of(&self, selection: &EntitySelection) -> Option<usize> {
        self.nodes
            .iter()
            .find(|(s, _)| std::ptr::eq(*s, selection))
            .map(|(_, node)| *node)
    }

    fn render(&self, fields: &[BoundField], path: &[PathSegment], errors: &mut Vec<GraphError>) -> Json {
        let mut out = Map::new();
        for field in fields {
            let field_path = child(path, &field.key);
            let value = match &field.kind {
                FieldKind::Typename(name) => Json::String(name.clone()),
                FieldKind::Rows(selection) => match self.node_of(selection) {
                    Some(node) => self.arena.render_rows(node, &field_path, errors),
                    None => Json::Array(vec![]),
                },
                FieldKind::Meta(meta) => self.meta(*meta, None),
                FieldKind::Group {
                    meta: MetaField::Edges,
                    fields,
                } => Json::Array(
                    (0..self.facts.rows)
                        .map(|i| {
                            let mut edge_path = field_path.clone();
                            edge_path.push(PathSegment::Index(i));
                            self.render_edge(fields, i, &edge_path, errors)
                        })
                        .collect(),
                ),
                FieldKind::Group { fields, .. } => self.render(fields, &field_path, errors),
                _ => Json::Null,
            };
            out.insert(field.key.clone(), value);
        }
        Json::Object(out)
    }

    fn render_edge(
        &self,
        fields: &[BoundField],
        row: usize,
        path: &[PathSegment],
        errors: &mut Vec<GraphError>,
    ) -> Json {
        let mut out = Map::new();
        for field in fields {
            let value = match &field.kind {
                FieldKind::Typename(name) => Json::String(name.clone()),
                FieldKind::Rows(selection) => match self.node_of(selection) {
                    Some(node) => self
                        .arena
                        .render_row(node, row, &child(path, &field.key), errors),
                    None => Json::Null,
                },
                FieldKind::Meta(meta) => self.meta(*meta, Some(row)),
                _ => Json::Null,
            };
            out.insert(field.key.clone(), value);
        }
        Json::Object(out)
    }

    fn meta(&self, meta: MetaField, row: Option<usize>) -> Json {
        let facts = &self.facts;
        let count = |n: Option<u64>| n.map_or(Json::Null, Json::from);
        match meta {
            MetaField::Total | MetaField::Count => count(facts.total),
            MetaField::Pages => count(facts.pages),
            MetaField::HasNextPage => Json::Bool(facts.has_next),
            MetaField::HasPreviousPage => Json::Bool(facts.offset > 0),
            MetaField::Cursor => row.map_or(Json::Null, |i| Json::String(encode_cursor(facts.offset + i))),
            MetaField::StartCursor if facts.rows > 0 => Json::String(encode_cursor(facts.offset)),
            MetaField::EndCursor if facts.rows > 0 => {
                Json::String(encode_cursor(facts.offset + facts.rows - 1))
            }
            _ => Json::Null,
        }
    }
}

impl<'a> Execution<'a> {
    fn new(
        surface: &'a QuerySurface,
        store: &'a dyn RelationalStore,
        coordinator: &'a BatchCoordinator<'a>,
        cancel: &'a Cancellation,
    ) -> Self {
        Self {
            surface,
            store,
            coordinator,
            resolver: AssociationResolver::new(surface, store, coordinator),
            cancel,
            deadline: surface.config().query_timeout.map(|t| Instant::now() + t),
            root_statements: AtomicUsize::new(0),
            waves: AtomicUsize::new(0),
        }
    }

    fn stats(&self) -> ExecutionStats {
        let batches = self.coordinator.flushed();
        let direct_fetches = self.resolver.direct_fetches();
        ExecutionStats {
            statements: self.root_statements.load(Ordering::Relaxed) + batches + direct_fetches,
            batches,
            direct_fetches,
            waves: self.waves.load(Ordering::Relaxed),
        }
    }

    fn checkpoint(&self) -> Result<(), QueryError> {
        if self.cancel.is_cancelled() {
            return Err(QueryError::Cancelled("execution was cancelled".into()));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(QueryError::Cancelled("query timeout exceeded".into()));
            }
        }
        Ok(())
    }

    fn translator(&self) -> PredicateTranslator<'a> {
        PredicateTranslator::new(self.surface)
    }

    async fn fetch(&self, query: &RelationalQuery) -> Result<Vec<Row>, QueryError> {
        self.root_statements.fetch_add(1, Ordering::Relaxed);
        Ok(self.store.fetch(query).await?)
    }

    async fn count(&self, query: &RelationalQuery) -> Result<u64, QueryError> {
        self.root_statements.fetch_add(1, Ordering::Relaxed);
        Ok(self.store.count(query).await?)
    }

    async fn run_root(&self, root: &BoundRoot) -> (Json, Vec<GraphError>) {
        let path = vec![PathSegment::from(root.key.as_str())];
        let mut errors = Vec::new();
        let result = match &root.kind {
            RootKind::Typename(name) => Ok(Json::String(name.clone())),
            RootKind::Failed => Ok(Json::Null),
            RootKind::ById {
                entity,
                identity,
                selection,
            } => self.by_id(entity, identity, selection, &path, &mut errors).await,
            RootKind::Collection {
                entity,
                criteria,
                paging,
                distinct,
                fields,
            } => {
                self.collection(entity, criteria.as_ref(), *paging, *distinct, fields, &path, &mut errors)
                    .await
            }
            RootKind::Connection {
                entity,
                criteria,
                window,
                fields,
            } => {
                self.connection(entity, criteria.as_ref(), *window, fields, &path, &mut errors)
                    .await
            }
            RootKind::Stream { .. } => Err(QueryError::validation(
                "stream fields are only served to subscriptions",
            )),
        };

        match result {
            Ok(value) => (value, errors),
            Err(err) => {
                if matches!(err, QueryError::Cancelled(_)) {
                    warn!(root = %root.key, reason = %err, "root field cancelled");
                }
                errors.push(err.at(path));
                (Json::Null, errors)
            }
        }
    }

    async fn by_id(
        &self,
        entity: &str,
        identity: &Value,
        selection: &EntitySelection,
        path: &[PathSegment],
        errors: &mut Vec<GraphError>,
    ) -> Result<Json, QueryError> {
        self.checkpoint()?;
        let descriptor = self
            .surface
            .entity(entity)
            .ok_or_else(|| QueryError::validation(format!("unknown entity `{entity}`")))?;
        let criteria = merge_criteria(
            Some(&identity_criteria(&descriptor.identity, identity)),
            selection.requirements.clone(),
        );
        let query = self.translator().translate(
            entity,
            criteria.as_ref(),
            &[],
            Window {
                offset: 0,
                limit: Some(1),
            },
            false,
        )?;
        let rows = self.fetch(&query).await?;
        if rows.is_empty() {
            return Ok(Json::Null);
        }

        let mut arena = Arena::default();
        let node = arena.push(Node::new(selection, rows));
        self.run_waves(&mut arena, vec![node]).await?;
        Ok(arena.render_row(node, 0, path, errors))
    }

    #[allow(clippy::too_many_arguments)]
    async fn collection(
        &self,
        entity: &str,
        criteria: Option<&CriteriaNode>,
        paging: Paging,
        distinct: bool,
        fields: &[BoundField],
        path: &[PathSegment],
        errors: &mut Vec<GraphError>,
    ) -> Result<Json, QueryError> {
        self.checkpoint()?;
        let criteria = merge_criteria(criteria, row_requirements(fields));
        let selections = row_selections(fields);
        let translator = self.translator();
        let query = translator.translate(
            entity,
            criteria.as_ref(),
            &row_order(fields),
            paging.window,
            distinct,
        )?;
        let counter = translator.translate(entity, criteria.as_ref(), &[], Window::default(), distinct)?;

        let needs_rows = !selections.is_empty();
        let needs_count = [MetaField::Total, MetaField::Pages, MetaField::Aggregate]
            .into_iter()
            .any(|meta| selects_meta(fields, meta));
        let (rows, total) = futures::join!(
            async {
                if needs_rows {
                    self.fetch(&query).await
                } else {
                    Ok(Vec::new())
                }
            },
            async {
                if needs_count {
                    self.count(&counter).await.map(Some)
                } else {
                    Ok(None)
                }
            }
        );
        let (rows, total) = (rows?, total?);

        let facts = PageFacts {
            total,
            pages: total.map(|total| page_count(total, paging.page_size)),
            offset: paging.window.offset,
            rows: rows.len(),
            has_next: false,
        };
        self.render_wrapper(selections, rows, facts, fields, path, errors).await
    }

    async fn connection(
        &self,
        entity: &str,
        criteria: Option<&CriteriaNode>,
        window: Window,
        fields: &[BoundField],
        path: &[PathSegment],
        errors: &mut Vec<GraphError>,
    ) -> Result<Json, QueryError> {
        self.checkpoint()?;
        let criteria = merge_criteria(criteria, row_requirements(fields));
        let translator = self.translator();
        let probe = Window {
            offset: window.offset,
            limit: window.limit.map(|limit| limit + 1),
        };
        let query = translator.translate(entity, criteria.as_ref(), &row_order(fields), probe, false)?;
        let counter = translator.translate(entity, criteria.as_ref(), &[], Window::default(), false)?;

        let needs_count = selects_meta(fields, MetaField::Total);
        let (rows, total) = futures::join!(self.fetch(&query), async {
            if needs_count {
                self.count(&counter).await.map(Some)
            } else {
                Ok(None)
            }
        });
        let (mut rows, total) = (rows?, total?);

        let has_next = window.limit.is_some_and(|limit| rows.len() > limit);
        if let Some(limit) = window.limit {
            rows.truncate(limit);
        }
        let facts = PageFacts {
            total,
            pages: None,
            offset: window.offset,
            rows: rows.len(),
            has_next,
        };
        self.render_wrapper(row_selections(fields), rows, facts, fields, path, errors)
            .await
    }

    /// Resolve every row selection of a wrapper over the same root rows and
    /// render the wrapper fields.
    async fn render_wrapper<'b>(
        &self,
        selections: Vec<&'b EntitySelection>,
        rows: Vec<Row>,
        facts: PageFacts,
        fields: &[BoundField],
        path: &[PathSegment],
        errors: &mut Vec<GraphError>,
    ) -> Result<Json, QueryError> {
        let mut arena = Arena::default();
        let mut nodes = Vec::with_capacity(selections.len());
        for selection in selections {
            let node = arena.push(Node::new(selection, rows.clone()));
            nodes.push((selection, node));
        }
        let frontier = nodes.iter().map(|(_, node)| *node).collect();
        self.run_waves(&mut arena, frontier).await?;

        let frame = Frame {
            arena: &arena,
            nodes: &nodes,
            facts,
        };
        Ok(frame.render(fields, path, errors))
    }

    /// Resolve associations level by level until no node has any left.
    async fn run_waves<'b>(&self, arena: &mut Arena<'b>, frontier: Vec<usize>) -> Result<(), QueryError> {
        let expandable = |arena: &Arena<'b>, node: usize| {
            let node = &arena.nodes[node];
            !node.rows.is_empty() && node.selection.has_associations()
        };
        let mut frontier: Vec<usize> = frontier
            .into_iter()
            .filter(|n| expandable(&*arena, *n))
            .collect();

        while !frontier.is_empty() {
            self.checkpoint()?;
            let wave = self.waves.fetch_add(1, Ordering::Relaxed) + 1;

            let mut pending: Vec<PendingField<'b>> = Vec::new();
            let mut directs: Vec<BoxFuture<'a, Result<Vec<Row>, QueryError>>> = Vec::new();
            for &index in &frontier {
                let node = &arena.nodes[index];
                let selection: &'b EntitySelection = node.selection;
                for (field, assoc) in selection.associations() {
                    let mut slots = Vec::with_capacity(node.rows.len());
                    match self.resolver.plan(assoc) {
                        Err(err) => slots.extend(node.rows.iter().map(|_| Slot::Ready(Err(err.clone())))),
                        Ok(plan) => {
                            for row in &node.rows {
                                slots.push(match self.resolver.resolve(&plan, &assoc.local_key, row) {
                                    Resolution::Ready(rows) => Slot::Ready(rows),
                                    Resolution::Deferred(deferred) => Slot::Deferred(deferred),
                                    Resolution::Direct(fetch) => {
                                        directs.push(fetch);
                                        Slot::Direct(directs.len() - 1)
                                    }
                                });
                            }
                        }
                    }
                    pending.push(PendingField {
                        parent: index,
                        field,
                        selection: &assoc.selection,
                        slots,
                    });
                }
            }

            debug!(
                wave,
                nodes = frontier.len(),
                fields = pending.len(),
                batches = self.coordinator.pending(),
                direct = directs.len(),
                "running association wave"
            );
            let ((), direct) = futures::join!(self.coordinator.dispatch(), join_all(directs));
            let mut direct: Vec<Option<Result<Vec<Row>, QueryError>>> = direct.into_iter().map(Some).collect();

            let mut next = Vec::new();
            for field in pending {
                let mut rows = Vec::new();
                let mut slices = Vec::with_capacity(field.slots.len());
                for slot in field.slots {
                    let reply = match slot {
                        Slot::Ready(reply) => reply,
                        Slot::Deferred(deferred) => deferred.wait().await,
                        Slot::Direct(i) => direct[i]
                            .take()
                            .unwrap_or_else(|| Err(QueryError::validation("direct fetch consumed twice"))),
                    };
                    slices.push(reply.map(|mut batch| {
                        let start = rows.len();
                        rows.append(&mut batch);
                        start..rows.len()
                    }));
                }
                let node = arena.push(Node::new(field.selection, rows));
                arena.nodes[field.parent].links.insert(
                    field.field,
                    Link {
                        node,
                        slices,
                    },
                );
                if expandable(&*arena, node) {
                    next.push(node);
                }
            }
            frontier = next;
        }
        Ok(())
    }
}

/// Pages of `page_size` rows needed for `total` rows. An unbounded
/// collection is one page when it has rows.
fn page_count(total: u64, page_size: Option<usize>) -> u64 {
    match page_size {
        None => u64::from(total > 0),
        Some(0) => 0,
        Some(size) => total.div_ceil(size as u64),
    }
}

/// Equality on an identity attribute; composite identities compare member
/// by member.
fn identity_criteria(attribute: &str, identity: &Value) -> CriteriaNode {
    match identity {
        Value::Object(members) => CriteriaNode::embedded(
            attribute,
            CriteriaNode::all_of(
                members
                    .iter()
                    .map(|(member, value)| identity_criteria(member, value))
                    .collect(),
            ),
        ),
        scalar => CriteriaNode::field(attribute, Operator::EQ, scalar.clone()),
    }
}

fn merge_criteria(criteria: Option<&CriteriaNode>, requirements: Vec<CriteriaNode>) -> Option<CriteriaNode> {
    let mut nodes: Vec<CriteriaNode> = criteria.cloned().into_iter().collect();
    nodes.extend(requirements);
    (!nodes.is_empty()).then(|| CriteriaNode::all_of(nodes))
}

/// Lazily resolved subscription rows.
struct StreamState {
    surface: Arc<QuerySurface>,
    store: Arc<dyn RelationalStore>,
    key: String,
    entity: String,
    criteria: Option<CriteriaNode>,
    selection: EntitySelection,
    /// Root rows not yet emitted; `None` until fetched.
    rows: Option<VecDeque<Row>>,
    /// Binding errors, attached to the first response.
    pending_errors: Vec<GraphError>,
}

impl StreamState {
    /// Responses for the next chunk of rows, or `None` when the stream ends.
    async fn next_chunk(&mut self) -> Option<Vec<Response>> {
        let path = vec![PathSegment::from(self.key.as_str())];

        if self.rows.is_none() {
            match self.fetch_roots().await {
                Ok(rows) => {
                    if rows.is_empty() && !self.pending_errors.is_empty() {
                        self.rows = Some(VecDeque::new());
                        return Some(vec![Response::failed(std::mem::take(&mut self.pending_errors))]);
                    }
                    self.rows = Some(rows.into());
                }
                Err(err) => {
                    warn!(root = %self.key, error = %err, "subscription root fetch failed");
                    self.rows = Some(VecDeque::new());
                    let mut errors = std::mem::take(&mut self.pending_errors);
                    errors.push(err.at(path));
                    return Some(vec![Response::failed(errors)]);
                }
            }
        }

        let remaining = self.rows.as_mut()?;
        if remaining.is_empty() {
            return None;
        }
        let size = self.surface.config().stream_chunk_size.max(1);
        let take = size.min(remaining.len());
        let chunk: Vec<Row> = remaining.drain(..take).collect();

        let cancel = Cancellation::new();
        let coordinator = BatchCoordinator::new(&self.surface, self.store.as_ref());
        let execution = Execution::new(&self.surface, self.store.as_ref(), &coordinator, &cancel);
        let mut arena = Arena::default();
        let node = arena.push(Node::new(&self.selection, chunk));
        if let Err(err) = execution.run_waves(&mut arena, vec![node]).await {
            let mut errors = std::mem::take(&mut self.pending_errors);
            errors.push(err.at(path));
            return Some(vec![Response::failed(errors)]);
        }

        let mut responses = Vec::with_capacity(arena.nodes[node].rows.len());
        for row in 0..arena.nodes[node].rows.len() {
            let mut errors = std::mem::take(&mut self.pending_errors);
            let value = arena.render_row(node, row, &path, &mut errors);
            let mut data = Map::new();
            data.insert(self.key.clone(), value);
            responses.push(Response::new(Json::Object(data), errors));
        }
        debug!(root = %self.key, rows = responses.len(), "emitted subscription chunk");
        Some(responses)
    }

    async fn fetch_roots(&self) -> Result<Vec<Row>, QueryError> {
        let criteria = merge_criteria(self.criteria.as_ref(), self.selection.requirements.clone());
        let query = PredicateTranslator::new(&self.surface).translate(
            &self.entity,
            criteria.as_ref(),
            &self.selection.order,
            Window::default(),
            false,
        )?;
        Ok(self.store.fetch(&query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(5, Some(2)), 3);
        assert_eq!(page_count(4, Some(2)), 2);
        assert_eq!(page_count(0, Some(2)), 0);
        assert_eq!(page_count(7, Some(0)), 0);
        assert_eq!(page_count(7, None), 1);
        assert_eq!(page_count(0, None), 0);
    }

    #[test]
    fn test_composite_identity_criteria() {
        let identity = Value::Object(vec![
            ("isbn".into(), Value::from("978-0441013593")),
            ("edition".into(), Value::Int32(2)),
        ]);
        assert_eq!(
            identity_criteria("key", &identity),
            CriteriaNode::embedded(
                "key",
                CriteriaNode::and(vec![
                    CriteriaNode::field("isbn", Operator::EQ, "978-0441013593"),
                    CriteriaNode::field("edition", Operator::EQ, Value::Int32(2)),
                ])
            )
        );
        assert_eq!(
            identity_criteria("id", &Value::Int64(4)),
            CriteriaNode::field("id", Operator::EQ, Value::Int64(4))
        );
    }

    #[test]
    fn test_cancellation_is_shared() {
        let cancel = Cancellation::new();
        let clone = cancel.clone();
        assert!(!clone.is_cancelled());
        cancel.cancel();
        assert!(clone.is_cancelled());
    }
}
