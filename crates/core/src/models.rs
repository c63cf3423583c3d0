use crate::codec::{self, TagValue, TypeTag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub file_id: i64,
    pub key: String,
    pub value: String,
    pub value_type: TypeTag,
}

impl Tag {
    pub fn typed_value(&self) -> TagValue {
        codec::decode(&self.value, self.value_type)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct File {
    pub id: i64,
    pub filename: String,
    pub filepath: String,
    pub owner: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub inferred_tags: Map<String, Value>,
    pub tags: Vec<Tag>,
}

impl File {
    pub fn tag(&self, key: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.key == key)
    }

    /// Tag keys mapped to their decoded values.
    pub fn tag_values(&self) -> BTreeMap<String, TagValue> {
        self.tags
            .iter()
            .map(|t| (t.key.clone(), t.typed_value()))
            .collect()
    }
}

/// Input for creating a file record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewFile {
    pub filepath: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl NewFile {
    pub fn new(filepath: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            ..Default::default()
        }
    }

    pub fn tag(mut self, key: impl Into<String>, raw: impl Into<String>) -> Self {
        self.tags.insert(key.into(), raw.into());
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn created_by(mut self, who: impl Into<String>) -> Self {
        self.created_by = Some(who.into());
        self
    }
}

/// A tag-set update for one file. Raw values go through the codec.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileUpdate {
    #[serde(default)]
    pub overwrite_existing: bool,
    #[serde(default)]
    pub tags_to_remove: BTreeSet<String>,
    #[serde(default)]
    pub tags_to_add_modify: BTreeMap<String, String>,
    #[serde(default)]
    pub new_filepath: Option<String>,
}

impl FileUpdate {
    pub fn is_empty(&self) -> bool {
        !self.overwrite_existing
            && self.tags_to_remove.is_empty()
            && self.tags_to_add_modify.is_empty()
            && self.new_filepath.is_none()
    }
}

/// Basename of a stored filepath; the whole path if it has none.
pub fn filename_of(filepath: &str) -> String {
    Path::new(filepath)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| filepath.to_string())
}
