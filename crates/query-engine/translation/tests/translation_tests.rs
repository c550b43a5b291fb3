//! Translation tests: resource query layers in, rendered SQL text and
//! parameter maps out.

mod common;

use common::{blog_graph, equals, equals_at, include, render, render_for, select_fields};
use query_engine_request::request;
use query_engine_sql::sql::dialect::Dialect;
use query_engine_translation::translation::error::{Error, ErrorKind};
use query_engine_translation::translation::mutation;
use query_engine_translation::translation::query::translate;

#[test]
fn it_translates_a_simple_filtered_select() -> anyhow::Result<()> {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    layer.filter = Some(equals("title", serde_json::json!("Foo")));

    let select = translate(&graph, &layer)?;
    let (sql, params) = render(&select);

    assert_eq!(
        sql,
        "SELECT t1.\"Id\", t1.\"Title\" FROM \"Articles\" AS t1 WHERE t1.\"Title\" = p0"
    );
    assert_eq!(params, vec![("p0".to_string(), serde_json::json!("Foo"))]);
    Ok(())
}

#[test]
fn it_renders_the_same_statement_identically_twice() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    layer.filter = Some(equals("title", serde_json::json!("Foo")));

    let select = translate(&graph, &layer).unwrap();
    assert_eq!(render(&select), render(&select));
}

#[test]
fn it_translates_deterministically_for_every_dialect() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    layer.filter = Some(equals("title", serde_json::json!("Foo")));

    let select = translate(&graph, &layer).unwrap();
    for dialect in enum_iterator::all::<Dialect>() {
        let (first, first_params) = render_for(&select, dialect);
        let (second, second_params) = render_for(&select, dialect);
        assert_eq!(first, second);
        assert_eq!(first_params, second_params);
    }
}

#[test]
fn it_inner_joins_a_non_nullable_to_one_relationship() {
    let graph = blog_graph();
    let mut layer = select_fields("comments", &["text"]);
    include(&mut layer, "article", select_fields("articles", &["title"]));

    let select = translate(&graph, &layer).unwrap();
    let (sql, _) = render(&select);

    assert_eq!(
        sql,
        "SELECT t1.\"Id\", t1.\"Text\", t2.\"Id\", t2.\"Title\" \
         FROM \"Comments\" AS t1 \
         INNER JOIN \"Articles\" AS t2 ON t1.\"ArticleId\" = t2.\"Id\""
    );
}

#[test]
fn it_left_joins_nullable_and_to_many_relationships() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    include(&mut layer, "author", select_fields("people", &["name"]));
    include(&mut layer, "comments", select_fields("comments", &["text"]));

    let select = translate(&graph, &layer).unwrap();
    let (sql, _) = render(&select);

    assert_eq!(
        sql,
        "SELECT t1.\"Id\", t1.\"Title\", t2.\"Id\", t2.\"Name\", t3.\"Id\", t3.\"Text\" \
         FROM \"Articles\" AS t1 \
         LEFT JOIN \"People\" AS t2 ON t1.\"AuthorId\" = t2.\"Id\" \
         LEFT JOIN \"Comments\" AS t3 ON t3.\"ArticleId\" = t1.\"Id\""
    );
}

#[test]
fn it_reuses_a_join_referenced_by_both_filter_and_sort() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    layer.filter = Some(equals_at(&["author"], "name", serde_json::json!("Ann")));
    layer.sort = Some(vec![request::SortElement {
        target: request::SortTarget::Attribute {
            path: vec!["author".to_string()],
            field: "name".to_string(),
        },
        ascending: true,
    }]);

    let select = translate(&graph, &layer).unwrap();
    let (sql, _) = render(&select);

    assert_eq!(
        sql,
        "SELECT t1.\"Id\", t1.\"Title\" \
         FROM \"Articles\" AS t1 \
         LEFT JOIN \"People\" AS t2 ON t1.\"AuthorId\" = t2.\"Id\" \
         WHERE t2.\"Name\" = p0 \
         ORDER BY t2.\"Name\""
    );
}

#[test]
fn it_turns_a_filtered_include_into_a_derived_table() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    let mut nested = select_fields("comments", &["text"]);
    nested.filter = Some(equals("text", serde_json::json!("Nice")));
    include(&mut layer, "comments", nested);

    let select = translate(&graph, &layer).unwrap();
    let (sql, params) = render(&select);

    assert_eq!(
        sql,
        "SELECT t1.\"Id\", t1.\"Title\", t3.\"Id\", t3.\"Text\" \
         FROM \"Articles\" AS t1 \
         LEFT JOIN (SELECT t2.\"Id\", t2.\"ArticleId\", t2.\"Text\" \
         FROM \"Comments\" AS t2 \
         WHERE t2.\"Text\" = p0) AS t3 ON t3.\"ArticleId\" = t1.\"Id\""
    );
    assert_eq!(params, vec![("p0".to_string(), serde_json::json!("Nice"))]);
}

#[test]
fn it_joins_a_second_level_include_through_its_parent() {
    let graph = blog_graph();
    let mut layer = select_fields("comments", &["text"]);
    let mut article = select_fields("articles", &["title"]);
    include(&mut article, "author", select_fields("people", &["name"]));
    include(&mut layer, "article", article);

    let select = translate(&graph, &layer).unwrap();
    let (sql, _) = render(&select);

    assert_eq!(
        sql,
        "SELECT t1.\"Id\", t1.\"Text\", t2.\"Id\", t2.\"Title\", t3.\"Id\", t3.\"Name\" \
         FROM \"Comments\" AS t1 \
         INNER JOIN \"Articles\" AS t2 ON t1.\"ArticleId\" = t2.\"Id\" \
         LEFT JOIN \"People\" AS t3 ON t2.\"AuthorId\" = t3.\"Id\""
    );
}

// A filtered include keeps only its own scope inside the derived table;
// includes below it join the derived table at the top level, exactly once.
#[test]
fn it_joins_includes_below_a_filtered_include_outside_the_derived_table() {
    let graph = blog_graph();
    let mut layer = select_fields("comments", &["text"]);
    let mut article = select_fields("articles", &["title"]);
    article.filter = Some(equals("title", serde_json::json!("Foo")));
    include(&mut article, "comments", select_fields("comments", &["text"]));
    include(&mut layer, "article", article);

    let select = translate(&graph, &layer).unwrap();
    let (sql, params) = render(&select);

    assert_eq!(
        sql,
        "SELECT t1.\"Id\", t1.\"Text\", t3.\"Id\", t3.\"Title\", t4.\"Id\", t4.\"Text\" \
         FROM \"Comments\" AS t1 \
         LEFT JOIN (SELECT t2.\"Id\", t2.\"Title\" FROM \"Articles\" AS t2 \
         WHERE t2.\"Title\" = p0) AS t3 ON t1.\"ArticleId\" = t3.\"Id\" \
         LEFT JOIN \"Comments\" AS t4 ON t4.\"ArticleId\" = t3.\"Id\""
    );
    assert_eq!(params, vec![("p0".to_string(), serde_json::json!("Foo"))]);
}

#[test]
fn it_selects_the_whole_row_for_an_empty_selection() {
    let graph = blog_graph();
    let layer = request::QueryLayer::for_resource("articles");

    let select = translate(&graph, &layer).unwrap();
    let (sql, _) = render(&select);

    assert_eq!(
        sql,
        "SELECT t1.\"Id\", t1.\"AuthorId\", t1.\"Title\" FROM \"Articles\" AS t1"
    );
}

#[test]
fn it_keeps_sparse_selection_when_writable_attributes_are_selected() {
    let graph = blog_graph();
    let layer = select_fields("tags", &["name"]);

    let select = translate(&graph, &layer).unwrap();
    let (sql, _) = render(&select);

    assert_eq!(sql, "SELECT t1.\"Id\", t1.\"Name\" FROM \"Tags\" AS t1");
}

#[test]
fn it_selects_the_whole_row_when_a_computed_attribute_is_selected() {
    let graph = blog_graph();
    let layer = select_fields("tags", &["slug"]);

    let select = translate(&graph, &layer).unwrap();
    let (sql, _) = render(&select);

    assert_eq!(
        sql,
        "SELECT t1.\"Id\", t1.\"Name\", t1.\"Slug\" FROM \"Tags\" AS t1"
    );
}

// A top-level filter combined with a to-many include folds the primary
// scope into a derived table. The author's id collides with the article's
// inside it, gets the synthetic `Id0` name, and the top level re-aliases it
// back to `Id`.
#[test]
fn it_folds_the_filtered_primary_scope_and_realiases_deduped_selectors() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    layer.filter = Some(equals("title", serde_json::json!("Foo")));
    include(&mut layer, "author", select_fields("people", &["name"]));
    include(&mut layer, "comments", select_fields("comments", &["text"]));

    let select = translate(&graph, &layer).unwrap();
    let (sql, params) = render(&select);

    assert_eq!(
        sql,
        "SELECT t4.\"Id\", t4.\"Title\", t4.\"Id0\" AS \"Id\", t4.\"Name\", t3.\"Id\", t3.\"Text\" \
         FROM (SELECT t1.\"Id\", t1.\"Title\", t2.\"Id\" AS \"Id0\", t2.\"Name\" \
         FROM \"Articles\" AS t1 \
         LEFT JOIN \"People\" AS t2 ON t1.\"AuthorId\" = t2.\"Id\" \
         WHERE t1.\"Title\" = p0) AS t4 \
         LEFT JOIN \"Comments\" AS t3 ON t3.\"ArticleId\" = t4.\"Id\""
    );
    assert_eq!(params, vec![("p0".to_string(), serde_json::json!("Foo"))]);
}

// The order-by-count sub-select is built before the fold exists, so its
// correlation still points at the folded alias and must be repaired to go
// through the derived table.
#[test]
fn it_repairs_the_order_by_count_correlation_after_the_fold() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    layer.filter = Some(equals("title", serde_json::json!("Foo")));
    layer.sort = Some(vec![request::SortElement {
        target: request::SortTarget::Count {
            path: vec!["comments".to_string()],
        },
        ascending: false,
    }]);
    include(&mut layer, "comments", select_fields("comments", &["text"]));

    let select = translate(&graph, &layer).unwrap();
    let (sql, params) = render(&select);

    assert_eq!(
        sql,
        "SELECT t4.\"Id\", t4.\"Title\", t3.\"Id\", t3.\"Text\" \
         FROM (SELECT t1.\"Id\", t1.\"Title\" FROM \"Articles\" AS t1 \
         WHERE t1.\"Title\" = p0) AS t4 \
         LEFT JOIN \"Comments\" AS t3 ON t3.\"ArticleId\" = t4.\"Id\" \
         ORDER BY (SELECT COUNT(*) FROM \"Comments\" AS t2 \
         WHERE t2.\"ArticleId\" = t4.\"Id\") DESC"
    );
    assert_eq!(params, vec![("p0".to_string(), serde_json::json!("Foo"))]);
}

#[test]
fn it_translates_has_into_an_exists_sub_select() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    layer.filter = Some(request::Filter::Has {
        path: vec!["comments".to_string()],
        filter: None,
    });

    let select = translate(&graph, &layer).unwrap();
    let (sql, params) = render(&select);

    assert_eq!(
        sql,
        "SELECT t1.\"Id\", t1.\"Title\" FROM \"Articles\" AS t1 \
         WHERE EXISTS (SELECT 1 FROM \"Comments\" AS t2 WHERE t2.\"ArticleId\" = t1.\"Id\")"
    );
    assert_eq!(params, vec![]);
}

#[test]
fn it_translates_a_count_comparison_into_a_scalar_sub_select() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    layer.filter = Some(request::Filter::Comparison {
        target: request::ComparisonTarget::Count {
            path: vec!["comments".to_string()],
        },
        operator: request::ComparisonOperator::GreaterThan,
        value: request::ComparisonValue::Literal {
            value: serde_json::json!(3),
        },
    });

    let select = translate(&graph, &layer).unwrap();
    let (sql, params) = render(&select);

    assert_eq!(
        sql,
        "SELECT t1.\"Id\", t1.\"Title\" FROM \"Articles\" AS t1 \
         WHERE (SELECT COUNT(*) FROM \"Comments\" AS t2 \
         WHERE t2.\"ArticleId\" = t1.\"Id\") > p0"
    );
    assert_eq!(params, vec![("p0".to_string(), serde_json::json!(3))]);
}

// Negating a predicate over an optional author must also match articles
// with no author at all, and ones whose author has no name.
#[test]
fn it_guards_negations_against_nullable_links_and_attributes() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    layer.filter = Some(request::Filter::Not {
        term: Box::new(equals_at(&["author"], "name", serde_json::json!("Ann"))),
    });

    let select = translate(&graph, &layer).unwrap();
    let (sql, params) = render(&select);

    assert_eq!(
        sql,
        "SELECT t1.\"Id\", t1.\"Title\" \
         FROM \"Articles\" AS t1 \
         LEFT JOIN \"People\" AS t2 ON t1.\"AuthorId\" = t2.\"Id\" \
         WHERE (NOT (t2.\"Name\" = p0) OR t2.\"Id\" IS NULL OR t2.\"Name\" IS NULL)"
    );
    assert_eq!(params, vec![("p0".to_string(), serde_json::json!("Ann"))]);
}

#[test]
fn it_flattens_nested_same_operator_logical_chains() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    layer.filter = Some(request::Filter::Logical {
        operator: request::LogicalOperator::And,
        terms: vec![
            equals("title", serde_json::json!("A")),
            request::Filter::Logical {
                operator: request::LogicalOperator::And,
                terms: vec![
                    equals("title", serde_json::json!("B")),
                    equals("title", serde_json::json!("C")),
                ],
            },
        ],
    });

    let select = translate(&graph, &layer).unwrap();
    let (sql, params) = render(&select);

    assert_eq!(
        sql,
        "SELECT t1.\"Id\", t1.\"Title\" FROM \"Articles\" AS t1 \
         WHERE (t1.\"Title\" = p0 AND t1.\"Title\" = p1 AND t1.\"Title\" = p2)"
    );
    assert_eq!(params.len(), 3);
}

#[test]
fn it_emits_one_parameter_per_distinct_literal() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    layer.filter = Some(request::Filter::Logical {
        operator: request::LogicalOperator::And,
        terms: vec![
            equals("title", serde_json::json!("A")),
            request::Filter::In {
                target: request::ComparisonTarget::Attribute {
                    path: vec![],
                    field: "title".to_string(),
                },
                values: vec![serde_json::json!("B"), serde_json::json!("C")],
            },
            request::Filter::MatchText {
                target: request::ComparisonTarget::Attribute {
                    path: vec![],
                    field: "title".to_string(),
                },
                pattern: "D".to_string(),
                kind: request::TextMatchKind::StartsWith,
            },
        ],
    });

    let select = translate(&graph, &layer).unwrap();
    let (_, params) = render(&select);

    assert_eq!(
        params,
        vec![
            ("p0".to_string(), serde_json::json!("A")),
            ("p1".to_string(), serde_json::json!("B")),
            ("p2".to_string(), serde_json::json!("C")),
            ("p3".to_string(), serde_json::json!("D%")),
        ]
    );
}

#[test]
fn it_rejects_pagination_as_unsupported() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    layer.pagination = Some(request::Pagination { number: 1, size: 10 });

    let error = translate(&graph, &layer).unwrap_err();
    assert_eq!(error, Error::PaginationNotSupported);
    assert_eq!(error.kind(), ErrorKind::UnsupportedFeature);
}

#[test]
fn it_rejects_pagination_on_a_nested_layer() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    let mut nested = select_fields("comments", &["text"]);
    nested.pagination = Some(request::Pagination { number: 1, size: 10 });
    include(&mut layer, "comments", nested);

    let error = translate(&graph, &layer).unwrap_err();
    assert_eq!(error, Error::PaginationNotSupported);
}

#[test]
fn it_rejects_type_narrowing_filters() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    layer.filter = Some(request::Filter::IsType {
        derived_type: "featured-articles".to_string(),
    });

    let error = translate(&graph, &layer).unwrap_err();
    assert_eq!(error, Error::TypeNarrowingNotSupported);
    assert_eq!(error.kind(), ErrorKind::UnsupportedFeature);
}

#[test]
fn it_reports_unmapped_fields_as_client_errors() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    layer.filter = Some(equals("caption", serde_json::json!("Foo")));

    let error = translate(&graph, &layer).unwrap_err();
    assert_eq!(
        error,
        Error::FieldUnavailable {
            resource_type: "articles".to_string(),
            field: "caption".to_string(),
        }
    );
    assert_eq!(error.kind(), ErrorKind::ClientInput);
}

#[test]
fn it_reports_to_many_traversal_in_an_attribute_path() {
    let graph = blog_graph();
    let mut layer = select_fields("articles", &["title"]);
    layer.filter = Some(equals_at(&["comments"], "text", serde_json::json!("x")));

    let error = translate(&graph, &layer).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ClientInput);
}

// -- mutations --

fn render_statement(
    statement: &query_engine_sql::sql::ast::Statement,
    dialect: Dialect,
) -> (String, Vec<(String, serde_json::Value)>) {
    let sql = query_engine_sql::sql::convert::statement_to_sql(statement, dialect);
    let params = sql
        .params
        .iter()
        .map(|(name, value)| (name.0.clone(), value.clone()))
        .collect();
    (sql.sql, params)
}

#[test]
fn it_omits_a_default_id_on_insert_and_returns_the_generated_one() -> anyhow::Result<()> {
    let graph = blog_graph();
    let values = indexmap::IndexMap::from([
        ("id".to_string(), serde_json::json!(0)),
        ("name".to_string(), serde_json::json!("X")),
    ]);
    let insert = mutation::translate_insert(&graph, "tags", &values)?;

    let statement = query_engine_sql::sql::ast::Statement::Insert(insert);
    let (postgres, params) = render_statement(&statement, Dialect::PostgreSql);
    assert_eq!(
        postgres,
        "INSERT INTO \"Tags\" (\"Name\") VALUES (p0) RETURNING \"Id\""
    );
    assert_eq!(params, vec![("p0".to_string(), serde_json::json!("X"))]);

    let (sqlserver, _) = render_statement(&statement, Dialect::SqlServer);
    assert_eq!(
        sqlserver,
        "INSERT INTO [Tags] ([Name]) VALUES (p0); SELECT SCOPE_IDENTITY();"
    );
    Ok(())
}

#[test]
fn it_writes_a_client_generated_id_like_any_other_column() {
    let graph = blog_graph();
    let values = indexmap::IndexMap::from([
        ("id".to_string(), serde_json::json!(7)),
        ("name".to_string(), serde_json::json!("X")),
    ]);
    let insert = mutation::translate_insert(&graph, "tags", &values).unwrap();

    let statement = query_engine_sql::sql::ast::Statement::Insert(insert);
    let (sql, params) = render_statement(&statement, Dialect::PostgreSql);
    assert_eq!(sql, "INSERT INTO \"Tags\" (\"Id\", \"Name\") VALUES (p0, p1)");
    assert_eq!(
        params,
        vec![
            ("p0".to_string(), serde_json::json!(7)),
            ("p1".to_string(), serde_json::json!("X")),
        ]
    );
}

#[test]
fn it_numbers_update_assignments_before_the_key() -> anyhow::Result<()> {
    let graph = blog_graph();
    let values = indexmap::IndexMap::from([("name".to_string(), serde_json::json!("Y"))]);
    let update = mutation::translate_update(&graph, "tags", &serde_json::json!(1), &values)?;

    let statement = query_engine_sql::sql::ast::Statement::Update(update);
    let (sql, params) = render_statement(&statement, Dialect::PostgreSql);
    assert_eq!(sql, "UPDATE \"Tags\" SET \"Name\" = p0 WHERE \"Id\" = p1");
    assert_eq!(
        params,
        vec![
            ("p0".to_string(), serde_json::json!("Y")),
            ("p1".to_string(), serde_json::json!(1)),
        ]
    );
    Ok(())
}

#[test]
fn it_deletes_with_equals_for_one_id_and_in_for_several() {
    let graph = blog_graph();

    let single = mutation::translate_delete(&graph, "tags", &[serde_json::json!(7)]).unwrap();
    let statement = query_engine_sql::sql::ast::Statement::Delete(single);
    let (sql, _) = render_statement(&statement, Dialect::PostgreSql);
    assert_eq!(sql, "DELETE FROM \"Tags\" WHERE \"Id\" = p0");

    let several = mutation::translate_delete(
        &graph,
        "tags",
        &[serde_json::json!(1), serde_json::json!(2), serde_json::json!(3)],
    )
    .unwrap();
    let statement = query_engine_sql::sql::ast::Statement::Delete(several);
    let (sql, params) = render_statement(&statement, Dialect::PostgreSql);
    assert_eq!(sql, "DELETE FROM \"Tags\" WHERE \"Id\" IN (p0, p1, p2)");
    assert_eq!(params.len(), 3);
}

#[test]
fn it_deletes_by_an_arbitrary_mapped_column() {
    let graph = blog_graph();
    let delete =
        mutation::translate_delete_by_column(&graph, "articles", "authorId", &[serde_json::json!(5)])
            .unwrap();

    let statement = query_engine_sql::sql::ast::Statement::Delete(delete);
    let (sql, params) = render_statement(&statement, Dialect::PostgreSql);
    assert_eq!(sql, "DELETE FROM \"Articles\" WHERE \"AuthorId\" = p0");
    assert_eq!(params, vec![("p0".to_string(), serde_json::json!(5))]);
}
