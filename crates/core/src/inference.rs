//! Filesystem collaborators: the existence probe used before adding or
//! renaming, and the inspector that fills `inferred_tags`.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::SystemTime;
use tokio::io::AsyncReadExt;
use tracing::warn;

const SNIFF_BYTES: usize = 8 * 1024;
const DEFAULT_MIME: &str = "application/octet-stream";

#[async_trait::async_trait]
pub trait PathProbe: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;
}

#[async_trait::async_trait]
pub trait MetadataInferrer: Send + Sync {
    /// Never fails; problems are reported through an `error` entry.
    async fn infer(&self, path: &Path) -> Map<String, Value>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

#[async_trait::async_trait]
impl PathProbe for FsProbe {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}

/// Reads size, timestamps, owner uid and MIME type from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsInferrer;

#[async_trait::async_trait]
impl MetadataInferrer for FsInferrer {
    async fn infer(&self, path: &Path) -> Map<String, Value> {
        let mut out = Map::new();
        match tokio::fs::metadata(path).await {
            Ok(meta) => {
                out.insert("file_size".into(), Value::from(meta.len()));
                out.insert("last_accessed_at".into(), timestamp(meta.accessed()));
                out.insert("last_modified_at".into(), timestamp(meta.modified()));
                out.insert(
                    "created_at_fs".into(),
                    timestamp(meta.created().or_else(|_| meta.modified())),
                );
                out.insert("os_owner".into(), os_owner(&meta));
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "metadata inference degraded");
                out.insert(
                    "error".into(),
                    Value::String(format!("error inferring metadata: {e}")),
                );
            }
        }
        let mime = sniff_mime(path)
            .await
            .or_else(|| guess_mime(path))
            .unwrap_or_else(|| DEFAULT_MIME.to_string());
        out.insert("mime_type".into(), Value::String(mime));
        out
    }
}

fn timestamp(t: std::io::Result<SystemTime>) -> Value {
    t.ok()
        .map(|t| Value::String(DateTime::<Utc>::from(t).to_rfc3339()))
        .unwrap_or(Value::Null)
}

/// Account name of the file's owner; `null` when the uid has no entry in
/// the user database.
#[cfg(unix)]
fn os_owner(meta: &std::fs::Metadata) -> Value {
    use std::os::unix::fs::MetadataExt;
    uzers::get_user_by_uid(meta.uid())
        .map(|user| Value::String(user.name().to_string_lossy().into_owned()))
        .unwrap_or(Value::Null)
}

#[cfg(not(unix))]
fn os_owner(_meta: &std::fs::Metadata) -> Value {
    Value::Null
}

async fn sniff_mime(path: &Path) -> Option<String> {
    let mut file = tokio::fs::File::open(path).await.ok()?;
    let mut buf = vec![0u8; SNIFF_BYTES];
    let n = file.read(&mut buf).await.ok()?;
    infer::get(&buf[..n]).map(|kind| kind.mime_type().to_string())
}

fn guess_mime(path: &Path) -> Option<String> {
    mime_guess::from_path(path).first().map(|m| m.to_string())
}
