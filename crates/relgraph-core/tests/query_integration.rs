//! Integration tests for the query engine.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use pretty_assertions::assert_eq;
use relgraph_core::metamodel::{
    AttributeDescriptor, EmbeddableDescriptor, EntityDescriptor, ScalarType, StaticMetamodel,
};
use relgraph_core::query::{Cancellation, QueryExecutor};
use relgraph_core::relational::{MemoryStore, Row};
use relgraph_core::security::DenyList;
use relgraph_core::surface::{compile, QuerySurface};
use relgraph_core::SurfaceConfig;
use relgraph_proto::{ErrorKind, QueryDocument, Response, Selection, Value};
use serde_json::{json, Value as Json};

struct TestContext {
    store: Arc<MemoryStore>,
    surface: Arc<QuerySurface>,
}

impl TestContext {
    fn new() -> Self {
        Self::with_config(SurfaceConfig::default())
    }

    fn with_config(config: SurfaceConfig) -> Self {
        let surface = compile(&library_schema(), config).unwrap();
        let ctx = Self {
            store: Arc::new(MemoryStore::new()),
            surface: Arc::new(surface),
        };
        ctx.seed();
        ctx
    }

    fn executor(&self) -> QueryExecutor {
        QueryExecutor::new(Arc::clone(&self.surface), self.store.clone())
    }

    fn insert(&self, entity: &str, row: Row) {
        self.store.insert(entity, row);
    }

    fn seed(&self) {
        for (id, name) in [(1i64, "Ace"), (2, "Penguin")] {
            self.insert("Publisher", Row::new().with("id", id).with("name", name));
        }

        let address = |city: &str, country: &str| {
            Value::Object(vec![
                ("city".into(), Value::from(city)),
                ("country".into(), Value::from(country)),
            ])
        };
        self.insert(
            "Author",
            Row::new()
                .with("id", 1i64)
                .with("name", "Frank Herbert")
                .with("address", address("Tacoma", "US")),
        );
        self.insert(
            "Author",
            Row::new()
                .with("id", 2i64)
                .with("name", "Ursula K. Le Guin")
                .with("address", address("Portland", "US")),
        );
        self.insert(
            "Author",
            Row::new()
                .with("id", 3i64)
                .with("name", "Jane Austen")
                .with("address", address("Steventon", "UK")),
        );
        self.insert("Author", Row::new().with("id", 4i64).with("name", "Nobody Yet"));

        let books: [(i64, &str, Option<i32>, &str, i64, Option<i64>); 5] = [
            (1, "Dune", Some(1965), "NOVEL", 1, Some(1)),
            (2, "Children of Dune", Some(1976), "NOVEL", 1, Some(1)),
            (3, "The Left Hand of Darkness", Some(1969), "NOVEL", 2, Some(1)),
            (4, "Wild Angels", Some(1975), "POETRY", 2, None),
            (5, "Emma", None, "NOVEL", 3, Some(2)),
        ];
        for (id, title, year, genre, author, publisher) in books {
            self.insert(
                "Book",
                Row::new()
                    .with("id", id)
                    .with("title", title)
                    .with("year", year.map_or(Value::Null, Value::Int32))
                    .with("genre", Value::Enum(genre.into()))
                    .with("author_id", author)
                    .with("publisher_id", publisher.map_or(Value::Null, Value::Int64)),
            );
        }
    }
}

fn library_schema() -> StaticMetamodel {
    StaticMetamodel::new()
        .with_embeddable(
            EmbeddableDescriptor::new("Address")
                .with_attribute(AttributeDescriptor::basic("city", ScalarType::String))
                .with_attribute(AttributeDescriptor::basic("country", ScalarType::String)),
        )
        .with_entity(
            EntityDescriptor::new("Publisher", "id")
                .with_attribute(AttributeDescriptor::basic("id", ScalarType::Int64))
                .with_attribute(AttributeDescriptor::basic("name", ScalarType::String)),
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
                .with_attribute(AttributeDescriptor::enumeration(
                    "genre",
                    "Genre",
                    &["NOVEL", "POETRY"],
                ))
                .with_attribute(AttributeDescriptor::to_one("author", "Author"))
                .with_attribute(AttributeDescriptor::to_one("publisher", "Publisher")),
        )
}

fn names(response: &Response, list: &str) -> Vec<String> {
    response
        .pointer(list)
        .and_then(Json::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row.get("name").or_else(|| row.get("title")))
                .filter_map(Json::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn authors_where(criteria: Json) -> QueryDocument {
    QueryDocument::query(vec![Selection::new("Authors")
        .with_arg("where", criteria)
        .select(Selection::new("select").select(Selection::new("name")))])
}

#[tokio::test]
async fn test_nested_query_runs_one_statement_per_level() {
    let ctx = TestContext::new();
    let doc = QueryDocument::query(vec![Selection::new("Authors").select(
        Selection::new("select").select(Selection::new("name")).select(
            Selection::new("books")
                .select(Selection::new("title"))
                .select(Selection::new("publisher").select(Selection::new("name"))),
        ),
    )]);

    let (response, stats) = ctx
        .executor()
        .execute_with_stats(&doc, &Cancellation::new())
        .await;

    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(ctx.store.statement_count(), 3);
    assert_eq!(ctx.store.statements_against("Book"), 1);
    assert_eq!(ctx.store.statements_against("Publisher"), 1);
    assert_eq!(stats.statements, 3);
    assert_eq!(stats.batches, 2);
    assert_eq!(stats.waves, 2);

    assert_eq!(
        names(&response, "Authors.select"),
        vec!["Frank Herbert", "Ursula K. Le Guin", "Jane Austen", "Nobody Yet"]
    );
    assert_eq!(
        response.pointer("Authors.select.0.books"),
        Some(&json!([
            {"title": "Dune", "publisher": {"name": "Ace"}},
            {"title": "Children of Dune", "publisher": {"name": "Ace"}},
        ]))
    );
    assert_eq!(
        response.pointer("Authors.select.1.books.1"),
        Some(&json!({"title": "Wild Angels", "publisher": null}))
    );
    assert_eq!(response.pointer("Authors.select.3.books"), Some(&json!([])));
}

#[tokio::test]
async fn test_cyclic_associations_resolve() {
    let ctx = TestContext::new();
    assert!(ctx.surface.type_named("Author").is_some());
    assert!(ctx.surface.type_named("Book").is_some());

    let doc = QueryDocument::query(vec![Selection::new("Book")
        .with_arg("id", json!(1))
        .select(Selection::new("title"))
        .select(
            Selection::new("author")
                .select(Selection::new("name"))
                .select(Selection::new("books").select(Selection::new("title"))),
        )]);
    let response = ctx.executor().execute(&doc).await;

    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        json!({"Book": {
            "title": "Dune",
            "author": {
                "name": "Frank Herbert",
                "books": [{"title": "Dune"}, {"title": "Children of Dune"}],
            },
        }})
    );
    assert_eq!(ctx.store.statements_against("Book"), 2);
    assert_eq!(ctx.store.statements_against("Author"), 1);
}

#[tokio::test]
async fn test_by_id_lookup() {
    let ctx = TestContext::new();
    let doc = QueryDocument::query(vec![
        Selection::new("Author")
            .with_arg("id", json!(2))
            .select(Selection::new("name"))
            .select(Selection::new("address").select(Selection::new("city"))),
        Selection::new("Author")
            .with_alias("missing")
            .with_arg("id", json!(99))
            .select(Selection::new("name")),
    ]);
    let response = ctx.executor().execute(&doc).await;

    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        json!({
            "Author": {"name": "Ursula K. Le Guin", "address": {"city": "Portland"}},
            "missing": null,
        })
    );
}

#[tokio::test]
async fn test_nin_excludes_nulls() {
    let ctx = TestContext::new();
    let doc = QueryDocument::query(vec![Selection::new("Books")
        .with_arg("where", json!({"year": {"NIN": [1965]}}))
        .select(Selection::new("select").select(Selection::new("title")))]);
    let response = ctx.executor().execute(&doc).await;

    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        names(&response, "Books.select"),
        vec!["Children of Dune", "The Left Hand of Darkness", "Wild Angels"]
    );

    let doc = QueryDocument::query(vec![Selection::new("Books")
        .with_arg("where", json!({"year": {"EQ": null}}))
        .select(Selection::new("select").select(Selection::new("title")))]);
    let response = ctx.executor().execute(&doc).await;
    assert_eq!(names(&response, "Books.select"), vec!["Emma"]);

    let books_where = |criteria: Json| {
        QueryDocument::query(vec![Selection::new("Books")
            .with_arg("where", criteria)
            .select(Selection::new("total"))])
    };
    let executor = ctx.executor();
    let response = executor
        .execute(&books_where(json!({"year": {"NIN": [1965, null]}})))
        .await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(response.pointer("Books.total"), Some(&json!(0)));

    let response = executor.execute(&books_where(json!({"year": {"NIN": null}}))).await;
    assert_eq!(response.pointer("Books.total"), Some(&json!(4)));
}

#[tokio::test]
async fn test_by_id_round_trip() {
    let ctx = TestContext::new();
    let executor = ctx.executor();
    let leaves = || {
        vec![
            Selection::new("id"),
            Selection::new("name"),
            Selection::new("address")
                .select(Selection::new("city"))
                .select(Selection::new("country")),
        ]
    };
    let listed = executor
        .execute(&QueryDocument::query(vec![Selection::new("Authors")
            .select(Selection::new("select").with_selection(leaves()))]))
        .await;
    let rows = listed.pointer("Authors.select").and_then(Json::as_array).unwrap();
    assert_eq!(rows.len(), 4);

    for row in rows {
        let found = executor
            .execute(&QueryDocument::query(vec![Selection::new("Author")
                .with_arg("id", row["id"].clone())
                .with_selection(leaves())]))
            .await;
        assert!(found.is_ok(), "{:?}", found.errors);
        assert_eq!(found.pointer("Author"), Some(row));
    }
}

#[tokio::test]
async fn test_exists_at_two_levels() {
    let ctx = TestContext::new();
    let executor = ctx.executor();

    let response = executor
        .execute(&authors_where(json!({"EXISTS": [{"books": {"genre": {"EQ": "POETRY"}}}]})))
        .await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(names(&response, "Authors.select"), vec!["Ursula K. Le Guin"]);

    let response = executor
        .execute(&authors_where(json!({
            "books": {"EXISTS": [{"publisher": {"name": {"EQ": "Penguin"}}}]}
        })))
        .await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(names(&response, "Authors.select"), vec!["Jane Austen"]);

    let response = executor
        .execute(&authors_where(json!({"NOT_EXISTS": [{"books": {"year": {"GT": 1900}}}]})))
        .await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(names(&response, "Authors.select"), vec!["Jane Austen", "Nobody Yet"]);
}

#[tokio::test]
async fn test_embedded_criteria() {
    let ctx = TestContext::new();
    let response = ctx
        .executor()
        .execute(&authors_where(json!({"address": {"country": {"EQ": "US"}}})))
        .await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        names(&response, "Authors.select"),
        vec!["Frank Herbert", "Ursula K. Le Guin"]
    );
}

#[tokio::test]
async fn test_pagination_totals() {
    let ctx = TestContext::new();
    let doc = QueryDocument::query(vec![Selection::new("Books")
        .with_arg("page", json!({"start": 2, "limit": 2}))
        .select(
            Selection::new("select")
                .select(Selection::new("id").with_arg("orderBy", json!("ASC")))
                .select(Selection::new("title")),
        )
        .select(Selection::new("total"))
        .select(Selection::new("pages"))]);
    let response = ctx.executor().execute(&doc).await;

    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        json!({"Books": {
            "select": [
                {"id": 3, "title": "The Left Hand of Darkness"},
                {"id": 4, "title": "Wild Angels"},
            ],
            "total": 5,
            "pages": 3,
        }})
    );
}

#[tokio::test]
async fn test_first_page_of_five_rows() {
    let ctx = TestContext::new();
    let doc = QueryDocument::query(vec![Selection::new("Books")
        .with_arg("page", json!({"start": 1, "limit": 2}))
        .select(
            Selection::new("select")
                .select(Selection::new("id").with_arg("orderBy", json!("ASC")))
                .select(Selection::new("title")),
        )
        .select(Selection::new("total"))
        .select(Selection::new("pages"))]);
    let response = ctx.executor().execute(&doc).await;

    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        json!({"Books": {
            "select": [
                {"id": 1, "title": "Dune"},
                {"id": 2, "title": "Children of Dune"},
            ],
            "total": 5,
            "pages": 3,
        }})
    );
}

#[tokio::test]
async fn test_page_start_zero_is_rejected() {
    let ctx = TestContext::new();
    let doc = QueryDocument::query(vec![Selection::new("Books")
        .with_arg("page", json!({"start": 0, "limit": 2}))
        .select(Selection::new("select").select(Selection::new("title")))
        .select(Selection::new("total"))]);
    let response = ctx.executor().execute(&doc).await;

    assert_eq!(response.errors.len(), 1);
    let error = response.error_at("Books").unwrap();
    assert_eq!(error.kind, ErrorKind::Validation);
    assert!(error.message.contains("page.start"));
    assert_eq!(response.pointer("Books"), Some(&Json::Null));
    assert_eq!(ctx.store.statement_count(), 0);
}

#[tokio::test]
async fn test_descending_order_is_stable() {
    let ctx = TestContext::new();
    let doc = QueryDocument::query(vec![Selection::new("Books").select(
        Selection::new("select")
            .select(Selection::new("title"))
            .select(Selection::new("year").with_arg("orderBy", json!("DESC"))),
    )]);
    let executor = ctx.executor();
    let first = executor.execute(&doc).await;
    let second = executor.execute(&doc).await;

    assert!(first.is_ok(), "{:?}", first.errors);
    assert_eq!(
        names(&first, "Books.select"),
        vec![
            "Children of Dune",
            "Wild Angels",
            "The Left Hand of Darkness",
            "Dune",
            "Emma"
        ]
    );
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_failed_batch_is_localized_per_row() {
    let ctx = TestContext::new();
    ctx.store.fail_entity("Book");
    let doc = QueryDocument::query(vec![Selection::new("Authors")
        .with_arg("page", json!({"start": 1, "limit": 2}))
        .select(
            Selection::new("select")
                .select(Selection::new("name"))
                .select(Selection::new("books").select(Selection::new("title"))),
        )]);
    let response = ctx.executor().execute(&doc).await;

    assert_eq!(
        response.pointer("Authors.select"),
        Some(&json!([
            {"name": "Frank Herbert", "books": null},
            {"name": "Ursula K. Le Guin", "books": null},
        ]))
    );
    assert_eq!(response.errors_of(ErrorKind::Resolution).count(), 2);
    assert!(response.error_at("Authors.select.0.books").is_some());
    assert!(response.error_at("Authors.select.1.books").is_some());
    assert_eq!(ctx.store.statements_against("Book"), 1);
}

#[tokio::test]
async fn test_denied_field_is_nulled() {
    let ctx = TestContext::new();
    let executor = ctx
        .executor()
        .with_policy(Arc::new(DenyList::new().deny_field("Author", "name")));
    let doc = QueryDocument::query(vec![Selection::new("Author")
        .with_arg("id", json!(1))
        .select(Selection::new("id"))
        .select(Selection::new("name"))]);
    let response = executor.execute(&doc).await;

    assert_eq!(response.data, json!({"Author": {"id": 1, "name": null}}));
    assert_eq!(response.errors_of(ErrorKind::Authorization).count(), 1);
    assert!(response.error_at("Author.name").is_some());
}

#[tokio::test]
async fn test_validation_errors_keep_siblings() {
    let ctx = TestContext::new();
    let doc = QueryDocument::query(vec![
        Selection::new("Authors").select(
            Selection::new("select")
                .select(Selection::new("name"))
                .select(Selection::new("isbn")),
        ),
        Selection::new("Books")
            .with_arg("page", json!({"start": 0, "limit": 2}))
            .select(Selection::new("total")),
    ]);
    let response = ctx.executor().execute(&doc).await;

    assert_eq!(response.errors_of(ErrorKind::Validation).count(), 2);
    assert!(response.error_at("Authors.select.isbn").is_some());
    assert!(response.error_at("Books").is_some());
    assert_eq!(response.pointer("Books"), Some(&Json::Null));
    assert_eq!(
        response.pointer("Authors.select.0"),
        Some(&json!({"name": "Frank Herbert", "isbn": null}))
    );
}

#[tokio::test]
async fn test_cancelled_execution_issues_no_statements() {
    let ctx = TestContext::new();
    let cancel = Cancellation::new();
    cancel.cancel();
    let doc = authors_where(json!({"name": {"EQ": "Jane Austen"}}));
    let (response, stats) = ctx.executor().execute_with_stats(&doc, &cancel).await;

    assert_eq!(response.data, json!({"Authors": null}));
    assert_eq!(response.errors_of(ErrorKind::Cancelled).count(), 1);
    assert_eq!(stats.statements, 0);
    assert_eq!(ctx.store.statement_count(), 0);
}

#[tokio::test]
async fn test_query_timeout() {
    let ctx = TestContext::with_config(SurfaceConfig::default().with_query_timeout(Duration::ZERO));
    let response = ctx.executor().execute(&authors_where(json!({}))).await;

    let error = response.error_at("Authors").unwrap();
    assert_eq!(error.kind, ErrorKind::Cancelled);
    assert!(error.message.contains("timeout"));
}

#[tokio::test]
async fn test_required_association_filters_parents() {
    let ctx = TestContext::new();
    let executor = ctx.executor();

    let doc = QueryDocument::query(vec![Selection::new("Authors").select(
        Selection::new("select").select(Selection::new("name")).select(
            Selection::new("books")
                .with_arg("optional", json!(false))
                .select(Selection::new("title")),
        ),
    )]);
    let response = executor.execute(&doc).await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        names(&response, "Authors.select"),
        vec!["Frank Herbert", "Ursula K. Le Guin", "Jane Austen"]
    );

    let doc = QueryDocument::query(vec![Selection::new("Authors").select(
        Selection::new("select").select(Selection::new("name")).select(
            Selection::new("books")
                .with_arg("optional", json!(false))
                .with_arg("where", json!({"genre": {"EQ": "POETRY"}}))
                .select(Selection::new("title")),
        ),
    )]);
    let response = executor.execute(&doc).await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.pointer("Authors.select"),
        Some(&json!([{"name": "Ursula K. Le Guin", "books": [{"title": "Wild Angels"}]}]))
    );
}

#[tokio::test]
async fn test_filtered_optional_association_fetches_per_parent() {
    let ctx = TestContext::new();
    let doc = QueryDocument::query(vec![Selection::new("Authors").select(
        Selection::new("select").select(Selection::new("name")).select(
            Selection::new("books")
                .with_arg("where", json!({"genre": {"EQ": "POETRY"}}))
                .select(Selection::new("title")),
        ),
    )]);
    let (response, stats) = ctx
        .executor()
        .execute_with_stats(&doc, &Cancellation::new())
        .await;

    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(stats.direct_fetches, 4);
    assert_eq!(stats.batches, 0);
    assert_eq!(ctx.store.statements_against("Book"), 4);
    assert_eq!(response.pointer("Authors.select.0.books"), Some(&json!([])));
    assert_eq!(
        response.pointer("Authors.select.1.books"),
        Some(&json!([{"title": "Wild Angels"}]))
    );
}

#[tokio::test]
async fn test_null_switches_take_declared_defaults() {
    let ctx = TestContext::new();
    let doc = QueryDocument::query(vec![Selection::new("Authors")
        .with_arg("distinct", Json::Null)
        .select(
            Selection::new("select").select(Selection::new("name")).select(
                Selection::new("books")
                    .with_arg("optional", Json::Null)
                    .with_arg("where", json!({"genre": {"EQ": "POETRY"}}))
                    .select(Selection::new("title")),
            ),
        )]);
    let response = ctx.executor().execute(&doc).await;

    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        names(&response, "Authors.select"),
        vec!["Frank Herbert", "Ursula K. Le Guin", "Jane Austen", "Nobody Yet"]
    );
    assert_eq!(response.pointer("Authors.select.0.books"), Some(&json!([])));
}

#[tokio::test]
async fn test_relay_connection() {
    let ctx = TestContext::with_config(SurfaceConfig::default().with_relay());
    let executor = ctx.executor();
    let page = |after: Option<&str>| {
        let mut field = Selection::new("AuthorsConnection").with_arg("first", json!(2));
        if let Some(cursor) = after {
            field = field.with_arg("after", json!(cursor));
        }
        QueryDocument::query(vec![field
            .select(
                Selection::new("edges")
                    .select(Selection::new("cursor"))
                    .select(Selection::new("node").select(Selection::new("name"))),
            )
            .select(
                Selection::new("pageInfo")
                    .select(Selection::new("hasNextPage"))
                    .select(Selection::new("hasPreviousPage"))
                    .select(Selection::new("endCursor")),
            )
            .select(Selection::new("totalCount"))])
    };

    let first = executor.execute(&page(None)).await;
    assert!(first.is_ok(), "{:?}", first.errors);
    assert_eq!(
        first.data,
        json!({"AuthorsConnection": {
            "edges": [
                {"cursor": "0000000000000000", "node": {"name": "Frank Herbert"}},
                {"cursor": "0000000000000001", "node": {"name": "Ursula K. Le Guin"}},
            ],
            "pageInfo": {
                "hasNextPage": true,
                "hasPreviousPage": false,
                "endCursor": "0000000000000001",
            },
            "totalCount": 4,
        }})
    );

    let second = executor.execute(&page(Some("0000000000000001"))).await;
    assert!(second.is_ok(), "{:?}", second.errors);
    assert_eq!(
        second.pointer("AuthorsConnection.edges.0.node.name"),
        Some(&json!("Jane Austen"))
    );
    assert_eq!(
        second.pointer("AuthorsConnection.pageInfo"),
        Some(&json!({
            "hasNextPage": false,
            "hasPreviousPage": true,
            "endCursor": "0000000000000003",
        }))
    );
}

#[tokio::test]
async fn test_relay_cursor_at_offset_limit_is_rejected() {
    let ctx = TestContext::with_config(SurfaceConfig::default().with_relay());
    let doc = QueryDocument::query(vec![Selection::new("AuthorsConnection")
        .with_arg("first", json!(2))
        .with_arg("after", json!("ffffffffffffffff"))
        .select(Selection::new("totalCount"))]);
    let response = ctx.executor().execute(&doc).await;

    let error = response.error_at("AuthorsConnection").unwrap();
    assert_eq!(error.kind, ErrorKind::Validation);
    assert!(error.message.contains("invalid cursor"));
    assert_eq!(response.pointer("AuthorsConnection"), Some(&Json::Null));
    assert_eq!(ctx.store.statement_count(), 0);
}

#[tokio::test]
async fn test_aggregate_count() {
    let ctx = TestContext::with_config(SurfaceConfig::default().with_aggregate());
    let doc = QueryDocument::query(vec![Selection::new("Books")
        .with_arg("where", json!({"genre": {"EQ": "NOVEL"}}))
        .select(Selection::new("aggregate").select(Selection::new("count")))]);
    let response = ctx.executor().execute(&doc).await;

    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(response.data, json!({"Books": {"aggregate": {"count": 4}}}));
    assert_eq!(ctx.store.statement_count(), 1);
}

#[tokio::test]
async fn test_subscription_streams_rows_in_chunks() {
    let config = SurfaceConfig {
        stream_chunk_size: 2,
        ..SurfaceConfig::default().with_subscription()
    };
    let ctx = TestContext::with_config(config);
    let doc = QueryDocument::subscription(vec![Selection::new("Authors")
        .select(Selection::new("name"))
        .select(Selection::new("books").select(Selection::new("title")))]);

    let responses: Vec<Response> = ctx.executor().subscribe(&doc).collect().await;

    assert_eq!(responses.len(), 4);
    assert!(responses.iter().all(Response::is_ok));
    assert_eq!(
        responses[0].data,
        json!({"Authors": {
            "name": "Frank Herbert",
            "books": [{"title": "Dune"}, {"title": "Children of Dune"}],
        }})
    );
    assert_eq!(
        responses[2].data,
        json!({"Authors": {"name": "Jane Austen", "books": [{"title": "Emma"}]}})
    );
    assert_eq!(ctx.store.statements_against("Author"), 1);
    assert_eq!(ctx.store.statements_against("Book"), 2);
}

#[tokio::test]
async fn test_subscription_rejected_when_disabled() {
    let ctx = TestContext::new();
    let doc = QueryDocument::subscription(vec![Selection::new("Authors").select(Selection::new("name"))]);
    let responses: Vec<Response> = ctx.executor().subscribe(&doc).collect().await;

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].errors[0].message, "subscriptions are not enabled");

    // Subscription documents are not executed as queries.
    let response = ctx.executor().execute(&doc).await;
    assert_eq!(response.errors_of(ErrorKind::Validation).count(), 1);
}
