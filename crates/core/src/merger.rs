//! Tag-set update for a single file: rename, overwrite or selective removal,
//! then add/modify, all in one transaction.

use crate::codec;
use crate::error::{Error, Result};
use crate::models::{filename_of, File, FileUpdate};
use crate::store::{self, MetadataStore};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};

/// Validation happens before the first write; a rejected request leaves the
/// file exactly as it was.
pub(crate) async fn apply(store: &MetadataStore, id: i64, update: FileUpdate) -> Result<File> {
    if update.overwrite_existing && !update.tags_to_remove.is_empty() {
        return Err(Error::InvalidInput(
            "overwrite already clears every tag; a remove list cannot be combined with it".into(),
        ));
    }
    if update.is_empty() {
        return Err(Error::InvalidInput("nothing to update".into()));
    }
    store::validate_keys(update.tags_to_add_modify.keys())?;

    let mut tx = store.pool().begin().await?;
    let current = store::load_file(&mut tx, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no metadata found for file ID: {id}")))?;

    if let Some(new_path) = &update.new_filepath {
        if !store.path_exists(new_path).await {
            return Err(Error::NotFound(format!(
                "new file path '{new_path}' does not exist on the filesystem"
            )));
        }
        if let Some(other) = store::find_id_by_path(&mut tx, new_path).await? {
            if other != id {
                return Err(Error::Conflict(format!(
                    "file metadata for '{new_path}' already exists (ID: {other})"
                )));
            }
        }
    }

    if let Some(new_path) = &update.new_filepath {
        sqlx::query("UPDATE files SET filepath = ?1, filename = ?2 WHERE id = ?3")
            .bind(new_path)
            .bind(filename_of(new_path))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        debug!(id, from = %current.filepath, to = %new_path, "filepath renamed");
    }

    if update.overwrite_existing {
        let res = sqlx::query("DELETE FROM tags WHERE file_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        debug!(id, removed = res.rows_affected(), "tags cleared for overwrite");
    } else if !update.tags_to_remove.is_empty() {
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM tags WHERE file_id = ");
        qb.push_bind(id);
        qb.push(" AND key IN (");
        let mut separated = qb.separated(", ");
        for key in &update.tags_to_remove {
            separated.push_bind(key);
        }
        separated.push_unseparated(")");
        let res = qb.build().execute(&mut *tx).await?;
        debug!(id, removed = res.rows_affected(), "tags removed");
    }

    for (key, raw) in &update.tags_to_add_modify {
        let (value, value_type) = codec::encode(raw);
        sqlx::query(
            r#"
            INSERT INTO tags (file_id, key, value, value_type)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(file_id, key) DO UPDATE SET value = excluded.value, value_type = excluded.value_type
            "#,
        )
        .bind(id)
        .bind(key)
        .bind(value)
        .bind(value_type.as_str())
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE files SET updated_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let file = store::load_file(&mut tx, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no metadata found for file ID: {id}")))?;
    tx.commit().await?;
    info!(
        id,
        overwrite = update.overwrite_existing,
        tags = file.tags.len(),
        "file metadata updated"
    );
    Ok(file)
}
