//! File/Tag persistence.
//!
//! Every public operation runs inside a single transaction. A transaction
//! that is dropped without `commit` rolls back, so early returns through `?`
//! leave storage untouched.

use crate::codec::{self, TypeTag};
use crate::error::{Error, Result};
use crate::inference::{FsInferrer, FsProbe, MetadataInferrer, PathProbe};
use crate::models::{filename_of, File, FileUpdate, NewFile, Tag};
use crate::{merger, search};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub(crate) const FILE_COLUMNS: &str =
    "f.id, f.filename, f.filepath, f.owner, f.created_by, f.created_at, f.updated_at, f.inferred_tags";

// SQLite caps bound parameters per statement.
const ID_CHUNK: usize = 500;

pub const DEFAULT_CREATED_BY: &str = "system";

#[derive(Debug, FromRow)]
pub(crate) struct FileRow {
    id: i64,
    filename: String,
    filepath: String,
    owner: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    inferred_tags: String,
}

#[derive(Debug, FromRow)]
struct TagRow {
    file_id: i64,
    key: String,
    value: String,
    value_type: String,
}

impl FileRow {
    pub(crate) fn id(&self) -> i64 {
        self.id
    }

    /// File-level text a keyword can match: name, path, owner, creator and
    /// the serialized inferred metadata.
    pub(crate) fn searchable_text(&self) -> [&str; 5] {
        [
            self.filename.as_str(),
            self.filepath.as_str(),
            self.owner.as_deref().unwrap_or(""),
            self.created_by.as_str(),
            self.inferred_tags.as_str(),
        ]
    }

    fn into_file(self, tags: Vec<Tag>) -> File {
        let inferred_tags = parse_inferred(self.id, &self.inferred_tags);
        File {
            id: self.id,
            filename: self.filename,
            filepath: self.filepath,
            owner: self.owner,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
            inferred_tags,
            tags,
        }
    }
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            file_id: row.file_id,
            key: row.key,
            value: row.value,
            value_type: TypeTag::from(row.value_type.as_str()),
        }
    }
}

fn parse_inferred(id: i64, raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Map<String, Value>>(raw) {
        Ok(map) => map,
        Err(e) => {
            warn!(file_id = id, error = %e, "malformed inferred_tags; using empty map");
            Map::new()
        }
    }
}

pub struct MetadataStore {
    pool: SqlitePool,
    probe: Arc<dyn PathProbe>,
    inferrer: Arc<dyn MetadataInferrer>,
    default_created_by: String,
}

impl MetadataStore {
    /// Store backed by the local filesystem collaborators.
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_collaborators(pool, Arc::new(FsProbe), Arc::new(FsInferrer))
    }

    pub fn with_collaborators(
        pool: SqlitePool,
        probe: Arc<dyn PathProbe>,
        inferrer: Arc<dyn MetadataInferrer>,
    ) -> Self {
        Self {
            pool,
            probe,
            inferrer,
            default_created_by: DEFAULT_CREATED_BY.to_string(),
        }
    }

    pub fn with_default_created_by(mut self, who: impl Into<String>) -> Self {
        self.default_created_by = who.into();
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) async fn path_exists(&self, path: &str) -> bool {
        self.probe.exists(Path::new(path)).await
    }

    pub async fn add(&self, new: NewFile) -> Result<File> {
        validate_keys(new.tags.keys())?;
        if !self.path_exists(&new.filepath).await {
            return Err(Error::NotFound(format!(
                "file not found at: {}",
                new.filepath
            )));
        }

        let inferred = self.inferrer.infer(Path::new(&new.filepath)).await;
        let owner = new.owner.or_else(|| {
            inferred
                .get("os_owner")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        });
        let created_by = new
            .created_by
            .unwrap_or_else(|| self.default_created_by.clone());
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        if let Some(existing) = find_id_by_path(&mut tx, &new.filepath).await? {
            return Err(Error::Conflict(format!(
                "metadata for '{}' already exists (ID: {})",
                new.filepath, existing
            )));
        }

        let res = sqlx::query(
            r#"
            INSERT INTO files (filename, filepath, owner, created_by, created_at, updated_at, inferred_tags)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6)
            "#,
        )
        .bind(filename_of(&new.filepath))
        .bind(&new.filepath)
        .bind(&owner)
        .bind(&created_by)
        .bind(now)
        .bind(Value::Object(inferred).to_string())
        .execute(&mut *tx)
        .await?;
        let id = res.last_insert_rowid();

        for (key, raw) in &new.tags {
            let (value, value_type) = codec::encode(raw);
            sqlx::query("INSERT INTO tags (file_id, key, value, value_type) VALUES (?1, ?2, ?3, ?4)")
                .bind(id)
                .bind(key)
                .bind(value)
                .bind(value_type.as_str())
                .execute(&mut *tx)
                .await?;
        }

        let file = load_file(&mut tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no metadata found for file ID: {id}")))?;
        tx.commit().await?;
        info!(id, filepath = %file.filepath, tags = file.tags.len(), "file metadata added");
        Ok(file)
    }

    pub async fn get(&self, id: i64) -> Result<File> {
        let mut tx = self.pool.begin().await?;
        let file = load_file(&mut tx, id).await?;
        tx.commit().await?;
        file.ok_or_else(|| Error::NotFound(format!("no metadata found for file ID: {id}")))
    }

    /// All files in insertion order.
    pub async fn list(&self) -> Result<Vec<File>> {
        self.list_owned(None).await
    }

    pub async fn list_owned(&self, owner: Option<&str>) -> Result<Vec<File>> {
        let mut tx = self.pool.begin().await?;
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {FILE_COLUMNS} FROM files f"));
        if let Some(o) = owner {
            qb.push(" WHERE f.owner = ");
            qb.push_bind(o);
        }
        qb.push(" ORDER BY f.id");
        let rows: Vec<FileRow> = qb.build_query_as().fetch_all(&mut *tx).await?;
        let files = attach_tags(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(files)
    }

    /// Removes the file record and all of its tags. A second delete of the
    /// same id reports `NotFound`.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM files WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(Error::NotFound(format!(
                "no metadata found for file ID: {id}"
            )));
        }
        let tags = sqlx::query("DELETE FROM tags WHERE file_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM files WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!(id, tags = tags.rows_affected(), "file metadata deleted");
        Ok(())
    }

    pub async fn update(&self, id: i64, update: FileUpdate) -> Result<File> {
        merger::apply(self, id, update).await
    }

    pub async fn search(&self, keywords: &[String], owner: Option<&str>) -> Result<Vec<File>> {
        search::search(&self.pool, keywords, owner).await
    }
}

pub(crate) fn validate_keys<'a>(keys: impl IntoIterator<Item = &'a String>) -> Result<()> {
    for key in keys {
        if key.trim().is_empty() {
            return Err(Error::InvalidInput("tag key must not be empty".into()));
        }
    }
    Ok(())
}

pub(crate) async fn find_id_by_path(
    conn: &mut SqliteConnection,
    filepath: &str,
) -> Result<Option<i64>> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM files WHERE filepath = ?1")
        .bind(filepath)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(id)
}

pub(crate) async fn load_file(conn: &mut SqliteConnection, id: i64) -> Result<Option<File>> {
    let row: Option<FileRow> =
        sqlx::query_as(&format!("SELECT {FILE_COLUMNS} FROM files f WHERE f.id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    match row {
        Some(row) => Ok(attach_tags(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

/// Loads the tags for `rows` and assembles files, preserving row order.
pub(crate) async fn attach_tags(
    conn: &mut SqliteConnection,
    rows: Vec<FileRow>,
) -> Result<Vec<File>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut by_file: HashMap<i64, Vec<Tag>> = HashMap::new();
    for chunk in ids.chunks(ID_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT file_id, key, value, value_type FROM tags WHERE file_id IN (",
        );
        let mut separated = qb.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id");
        let tag_rows: Vec<TagRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
        for row in tag_rows {
            by_file.entry(row.file_id).or_default().push(Tag::from(row));
        }
    }
    debug!(files = rows.len(), "tags attached");
    Ok(rows
        .into_iter()
        .map(|row| {
            let tags = by_file.remove(&row.id).unwrap_or_default();
            row.into_file(tags)
        })
        .collect())
}
