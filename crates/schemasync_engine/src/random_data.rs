//! Random records for seeding development branches.

use crate::cancel::CancelToken;
use crate::error::SyncResult;
use crate::transport::RemoteService;
use rand::seq::SliceRandom;
use rand::Rng;
use schemasync_protocol::{BulkInsertRequest, BranchRef};
use schemasync_schema::{Column, ColumnType, Schema};
use serde_json::{Map, Value};
use std::io::Write;
use tracing::info;

const ADJECTIVES: &[&str] = &[
    "brave", "calm", "eager", "fancy", "gentle", "happy", "jolly", "kind", "lively", "nice",
    "proud", "quick", "silly", "witty", "zesty",
];

const NOUNS: &[&str] = &[
    "badger", "camel", "dingo", "falcon", "gecko", "heron", "ibis", "jaguar", "koala", "lemur",
    "marmot", "otter", "panda", "quail", "walrus",
];

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua",
];

fn pick<R: Rng + ?Sized>(words: &[&'static str], rng: &mut R) -> &'static str {
    words.choose(rng).copied().unwrap_or_default()
}

fn pet_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(ADJECTIVES, rng), pick(NOUNS, rng))
}

fn paragraph<R: Rng + ?Sized>(rng: &mut R) -> String {
    let sentences = rng.gen_range(2..=4);
    let mut out = Vec::with_capacity(sentences);
    for _ in 0..sentences {
        let len = rng.gen_range(4..=10);
        let words: Vec<&str> = (0..len).map(|_| pick(WORDS, rng)).collect();
        let mut sentence = words.join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence.push('.');
        out.push(sentence);
    }
    out.join(" ")
}

/// Generates one record matching `columns`.
///
/// Link columns are left out: there is nothing to point them at.
pub fn generate_record<R: Rng + ?Sized>(columns: &[Column], rng: &mut R) -> Map<String, Value> {
    let mut record = Map::new();
    for column in columns {
        let value = match column.column_type {
            ColumnType::String => Value::from(pet_name(rng)),
            ColumnType::Bool => Value::from(rng.gen_bool(0.5)),
            ColumnType::Int => Value::from(rng.gen_range(0..100i64)),
            ColumnType::Float => Value::from((rng.gen::<f64>() * 100.0).floor() / 100.0),
            ColumnType::Object => Value::Object(generate_record(&column.columns, rng)),
            ColumnType::Email => Value::from(format!(
                "{}@{}.pets",
                pick(ADJECTIVES, rng),
                pick(NOUNS, rng)
            )),
            ColumnType::Text => Value::from(paragraph(rng)),
            ColumnType::Multiple => {
                let count = rng.gen_range(1..=3);
                Value::from((0..count).map(|_| pet_name(rng)).collect::<Vec<_>>())
            }
            ColumnType::Link => continue,
        };
        record.insert(column.name.clone(), value);
    }
    record
}

/// Inserts `count` random records into each selected table of `schema`.
///
/// An empty `tables` selects every table. Returns the tables seeded.
#[allow(clippy::too_many_arguments)]
pub fn seed_tables<S, R, W>(
    remote: &S,
    branch: &BranchRef,
    schema: &Schema,
    tables: &[String],
    count: usize,
    rng: &mut R,
    cancel: &CancelToken,
    out: &mut W,
) -> SyncResult<Vec<String>>
where
    S: RemoteService + ?Sized,
    R: Rng + ?Sized,
    W: Write + ?Sized,
{
    let mut seeded = Vec::new();
    for table in &schema.tables {
        if !tables.is_empty() && !tables.iter().any(|t| *t == table.name) {
            continue;
        }
        cancel.check()?;
        let records = (0..count)
            .map(|_| generate_record(&table.columns, rng))
            .collect();
        remote.bulk_insert(branch, &table.name, &BulkInsertRequest { records })?;
        info!(branch = %branch, table = %table.name, count, "random records inserted");
        writeln!(out, "Inserted {} random records in table {}", count, table.name)?;
        seeded.push(table.name.clone());
    }
    Ok(seeded)
}
