//! Shared fixtures for translation tests: a small blog-shaped resource
//! graph and request construction helpers.

use std::collections::BTreeMap;

use query_engine_metadata::metadata::{
    ColumnInfo, ColumnKind, ForeignKey, ForeignKeySide, Nullable, RelationshipInfo,
    RelationshipKind, ResourceGraph, ResourceInfo,
};
use query_engine_request::request;
use query_engine_sql::sql;

fn column(name: &str, kind: ColumnKind, nullable: Nullable) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        kind,
        nullable,
        readonly: false,
    }
}

/// Articles with an optional author (to-one, nullable key on the article)
/// and comments (to-many, key on the comment, non-nullable); plus tags,
/// unrelated to anything and carrying a computed slug, for the mutation
/// and readonly tests.
pub fn blog_graph() -> ResourceGraph {
    let articles = ResourceInfo {
        schema_name: None,
        table_name: "Articles".to_string(),
        id_column: "id".to_string(),
        columns: BTreeMap::from([
            ("id".to_string(), column("Id", ColumnKind::Id, Nullable::NonNullable)),
            (
                "title".to_string(),
                column("Title", ColumnKind::Attribute, Nullable::NonNullable),
            ),
            (
                "authorId".to_string(),
                column("AuthorId", ColumnKind::ForeignKey, Nullable::Nullable),
            ),
        ]),
        relationships: BTreeMap::from([
            (
                "author".to_string(),
                RelationshipInfo {
                    target: "people".to_string(),
                    kind: RelationshipKind::ToOne,
                    foreign_key: ForeignKey {
                        column: "AuthorId".to_string(),
                        on: ForeignKeySide::Referencing,
                        nullable: Nullable::Nullable,
                    },
                },
            ),
            (
                "comments".to_string(),
                RelationshipInfo {
                    target: "comments".to_string(),
                    kind: RelationshipKind::ToMany,
                    foreign_key: ForeignKey {
                        column: "ArticleId".to_string(),
                        on: ForeignKeySide::Target,
                        nullable: Nullable::NonNullable,
                    },
                },
            ),
        ]),
    };

    let people = ResourceInfo {
        schema_name: None,
        table_name: "People".to_string(),
        id_column: "id".to_string(),
        columns: BTreeMap::from([
            ("id".to_string(), column("Id", ColumnKind::Id, Nullable::NonNullable)),
            (
                "name".to_string(),
                column("Name", ColumnKind::Attribute, Nullable::Nullable),
            ),
        ]),
        relationships: BTreeMap::new(),
    };

    let comments = ResourceInfo {
        schema_name: None,
        table_name: "Comments".to_string(),
        id_column: "id".to_string(),
        columns: BTreeMap::from([
            ("id".to_string(), column("Id", ColumnKind::Id, Nullable::NonNullable)),
            (
                "text".to_string(),
                column("Text", ColumnKind::Attribute, Nullable::NonNullable),
            ),
            (
                "articleId".to_string(),
                column("ArticleId", ColumnKind::ForeignKey, Nullable::NonNullable),
            ),
        ]),
        relationships: BTreeMap::from([(
            "article".to_string(),
            RelationshipInfo {
                target: "articles".to_string(),
                kind: RelationshipKind::ToOne,
                foreign_key: ForeignKey {
                    column: "ArticleId".to_string(),
                    on: ForeignKeySide::Referencing,
                    nullable: Nullable::NonNullable,
                },
            },
        )]),
    };

    let tags = ResourceInfo {
        schema_name: None,
        table_name: "Tags".to_string(),
        id_column: "id".to_string(),
        columns: BTreeMap::from([
            ("id".to_string(), column("Id", ColumnKind::Id, Nullable::NonNullable)),
            (
                "name".to_string(),
                column("Name", ColumnKind::Attribute, Nullable::NonNullable),
            ),
            (
                "slug".to_string(),
                ColumnInfo {
                    name: "Slug".to_string(),
                    kind: ColumnKind::Attribute,
                    nullable: Nullable::NonNullable,
                    readonly: true,
                },
            ),
        ]),
        relationships: BTreeMap::new(),
    };

    let graph = ResourceGraph(BTreeMap::from([
        ("articles".to_string(), articles),
        ("people".to_string(), people),
        ("comments".to_string(), comments),
        ("tags".to_string(), tags),
    ]));
    graph.validate().unwrap();
    graph
}

pub fn equals(field: &str, value: serde_json::Value) -> request::Filter {
    equals_at(&[], field, value)
}

pub fn equals_at(path: &[&str], field: &str, value: serde_json::Value) -> request::Filter {
    request::Filter::Comparison {
        target: request::ComparisonTarget::Attribute {
            path: path.iter().map(ToString::to_string).collect(),
            field: field.to_string(),
        },
        operator: request::ComparisonOperator::Equals,
        value: request::ComparisonValue::Literal { value },
    }
}

pub fn select_fields(resource_type: &str, attributes: &[&str]) -> request::QueryLayer {
    request::QueryLayer {
        selection: Some(request::FieldSelection {
            attributes: attributes.iter().map(ToString::to_string).collect(),
            relationships: indexmap::IndexMap::new(),
        }),
        ..request::QueryLayer::for_resource(resource_type)
    }
}

pub fn include(layer: &mut request::QueryLayer, name: &str, nested: request::QueryLayer) {
    layer
        .selection
        .get_or_insert_with(request::FieldSelection::default)
        .relationships
        .insert(name.to_string(), nested);
}

/// Render for Postgres and return the text plus parameters in order.
pub fn render(select: &sql::ast::Select) -> (String, Vec<(String, serde_json::Value)>) {
    render_for(select, sql::dialect::Dialect::PostgreSql)
}

pub fn render_for(
    select: &sql::ast::Select,
    dialect: sql::dialect::Dialect,
) -> (String, Vec<(String, serde_json::Value)>) {
    let sql = sql::convert::select_to_sql(select, dialect);
    let params = sql
        .params
        .iter()
        .map(|(name, value)| (name.0.clone(), value.clone()))
        .collect();
    (sql.sql, params)
}
