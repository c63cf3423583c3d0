#![allow(dead_code)]

use filemeta_core::inference::{FsProbe, MetadataInferrer};
use filemeta_core::MetadataStore;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Inferrer returning the same blob for every path.
pub struct FixedInferrer(pub Map<String, Value>);

#[async_trait::async_trait]
impl MetadataInferrer for FixedInferrer {
    async fn infer(&self, _path: &Path) -> Map<String, Value> {
        self.0.clone()
    }
}

pub struct Fixture {
    pub temp: TempDir,
    pub store: MetadataStore,
}

impl Fixture {
    /// Store with real filesystem probing and inference.
    pub async fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let pool = connect(&temp).await;
        Self {
            temp,
            store: MetadataStore::new(pool),
        }
    }

    /// Store with a fixed inferred-metadata blob, for predictable search hits.
    pub async fn with_fixed_inference() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let pool = connect(&temp).await;
        let blob = json!({
            "file_size": 11,
            "mime_type": "text/plain",
            "os_owner": "deploy"
        })
        .as_object()
        .cloned()
        .unwrap();
        let store =
            MetadataStore::with_collaborators(pool, Arc::new(FsProbe), Arc::new(FixedInferrer(blob)));
        Self { temp, store }
    }

    /// Creates a real file under the temp dir and returns its path as text.
    pub fn touch(&self, name: &str) -> String {
        let path: PathBuf = self.temp.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, "hello world").unwrap();
        path.to_string_lossy().into_owned()
    }

    pub fn missing(&self, name: &str) -> String {
        self.temp.path().join(name).to_string_lossy().into_owned()
    }

    pub async fn tag_rows_for(&self, file_id: i64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE file_id = ?1")
            .bind(file_id)
            .fetch_one(self.store.pool())
            .await
            .unwrap()
    }
}

async fn connect(temp: &TempDir) -> sqlx::SqlitePool {
    let db_path = temp.path().join("meta.db");
    let pool = storage::connect(&db_path.to_string_lossy()).await.unwrap();
    storage::migrate(&pool).await.unwrap();
    pool
}
