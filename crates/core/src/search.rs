//! Keyword search across file columns, the serialized inferred metadata and
//! the tag relation.
//!
//! Keywords are OR-ed: a file is returned when at least one keyword matches
//! at least one field. The owner filter, when given, is AND-ed on top.
//! Matching is a substring test after Unicode lowercasing of both the
//! keyword and the field, so it runs in Rust over the candidate rows rather
//! than through SQLite `lower()`, which folds ASCII only.

use crate::error::Result;
use crate::models::File;
use crate::store::{self, FileRow, FILE_COLUMNS};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashSet;
use tracing::debug;

/// Empty keywords are ignored; surrounding whitespace is part of the
/// keyword. With no usable keyword and no owner the result is empty rather
/// than "everything"; callers are expected to reject that request up front.
pub async fn search(
    pool: &SqlitePool,
    keywords: &[String],
    owner: Option<&str>,
) -> Result<Vec<File>> {
    let needles: Vec<String> = keywords
        .iter()
        .filter(|k| !k.is_empty())
        .map(|k| fold(k))
        .collect();
    if needles.is_empty() && owner.is_none() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {FILE_COLUMNS} FROM files f"));
    if let Some(o) = owner {
        qb.push(" WHERE f.owner = ");
        qb.push_bind(o.to_string());
    }
    qb.push(" ORDER BY f.id");

    let mut tx = pool.begin().await?;
    let rows: Vec<FileRow> = qb.build_query_as().fetch_all(&mut *tx).await?;
    let candidates = rows.len();
    let field_hits: HashSet<i64> = rows
        .iter()
        .filter(|row| row.searchable_text().iter().any(|f| matches_any(f, &needles)))
        .map(FileRow::id)
        .collect();
    let files = store::attach_tags(&mut tx, rows).await?;
    tx.commit().await?;

    let files: Vec<File> = if needles.is_empty() {
        files
    } else {
        files
            .into_iter()
            .filter(|file| {
                field_hits.contains(&file.id)
                    || file
                        .tags
                        .iter()
                        .any(|t| matches_any(&t.key, &needles) || matches_any(&t.value, &needles))
            })
            .collect()
    };
    debug!(
        keywords = needles.len(),
        owner = owner.unwrap_or(""),
        candidates,
        hits = files.len(),
        "search finished"
    );
    Ok(files)
}

fn fold(text: &str) -> String {
    text.to_lowercase()
}

fn matches_any(field: &str, needles: &[String]) -> bool {
    if needles.is_empty() {
        return false;
    }
    let folded = fold(field);
    needles.iter().any(|n| folded.contains(n.as_str()))
}
