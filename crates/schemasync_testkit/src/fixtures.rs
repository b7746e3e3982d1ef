//! Schema, record and dump-directory fixtures.

use schemasync_protocol::BranchRef;
use schemasync_schema::{serialize_schema, Column, ColumnType, Schema, SchemaFormat, Table};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;

/// Database used by the fixtures.
pub const FIXTURE_DATABASE: &str = "blog";

/// A branch of the fixture database.
pub fn branch(name: &str) -> BranchRef {
    BranchRef::new(FIXTURE_DATABASE, name).expect("fixture branch names are valid")
}

/// The `users` table: no links.
pub fn users_table() -> Table {
    Table::new(
        "users",
        vec![
            Column::new("name", ColumnType::String),
            Column::new("email", ColumnType::Email),
            Column::object(
                "address",
                vec![
                    Column::new("city", ColumnType::String),
                    Column::new("zip", ColumnType::String),
                ],
            ),
        ],
    )
}

/// The `posts` table: links to `users`, directly and inside an object.
pub fn posts_table() -> Table {
    Table::new(
        "posts",
        vec![
            Column::new("title", ColumnType::String),
            Column::link("author", "users"),
            Column::new("body", ColumnType::Text),
            Column::new("tags", ColumnType::Multiple),
            Column::new("published", ColumnType::Bool),
            Column::new("views", ColumnType::Int),
            Column::new("rating", ColumnType::Float),
            Column::object("review", vec![Column::link("reviewer", "users")]),
        ],
    )
}

/// `users` then `posts`.
pub fn blog_schema() -> Schema {
    Schema::new(vec![users_table(), posts_table()])
}

/// Fields of the `i`th fixture user.
pub fn user_fields(i: usize) -> Map<String, Value> {
    json!({
        "name": format!("user {}", i),
        "email": format!("user{}@example.com", i),
        "address": {"city": "Berlin", "zip": format!("{:05}", 10000 + i)}
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

/// Fields of a post by `author`, reviewed by `reviewer`.
pub fn post_fields(title: &str, author: &str, reviewer: &str) -> Map<String, Value> {
    json!({
        "title": title,
        "author": author,
        "body": "Lorem ipsum.",
        "tags": ["rust"],
        "published": true,
        "views": 3,
        "rating": 4.5,
        "review": {"reviewer": reviewer}
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

/// Writes `schema.json` into a dump directory.
pub fn write_dump_schema(dir: &Path, schema: &Schema) {
    let bytes = serialize_schema(schema, SchemaFormat::Json).expect("fixture schema serializes");
    fs::write(dir.join("schema.json"), bytes).expect("write dump schema");
}

/// Writes `<table>.ndjson` with the given raw lines.
pub fn write_table_lines(dir: &Path, table: &str, lines: &[&str]) {
    let mut body = lines.join("\n");
    body.push('\n');
    fs::write(dir.join(format!("{}.ndjson", table)), body).expect("write table file");
}
