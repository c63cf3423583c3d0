use filemeta_core::File;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Write;

/// Display form of a file record: decoded tag values keyed by tag key.
#[derive(Debug, Serialize)]
pub struct FileView {
    pub id: i64,
    pub filename: String,
    pub filepath: String,
    pub owner: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
    pub inferred_tags: Map<String, Value>,
    pub custom_tags: Map<String, Value>,
}

impl From<&File> for FileView {
    fn from(file: &File) -> Self {
        let custom_tags = file
            .tag_values()
            .into_iter()
            .map(|(k, v)| (k, v.to_json()))
            .collect();
        FileView {
            id: file.id,
            filename: file.filename.clone(),
            filepath: file.filepath.clone(),
            owner: file.owner.clone(),
            created_by: file.created_by.clone(),
            created_at: file.created_at.to_rfc3339(),
            updated_at: file.updated_at.to_rfc3339(),
            inferred_tags: file.inferred_tags.clone(),
            custom_tags,
        }
    }
}

pub fn to_json(files: &[File]) -> anyhow::Result<String> {
    let views: Vec<FileView> = files.iter().map(FileView::from).collect();
    Ok(serde_json::to_string_pretty(&views)?)
}

pub fn render_summary(file: &File) -> String {
    format!(
        "   ID: {}\n   Filename: {}\n   Filepath: {}\n",
        file.id, file.filename, file.filepath
    )
}

pub fn render_full(file: &File) -> anyhow::Result<String> {
    let view = FileView::from(file);
    let mut out = render_summary(file);
    writeln!(out, "   Owner: {}", view.owner.as_deref().unwrap_or("(none)"))?;
    writeln!(out, "   Created By: {}", view.created_by)?;
    writeln!(out, "   Created At: {}", view.created_at)?;
    writeln!(out, "   Updated At: {}", view.updated_at)?;
    writeln!(out, "   Inferred Tags:")?;
    writeln!(out, "{}", serde_json::to_string_pretty(&view.inferred_tags)?)?;
    writeln!(out, "   Custom Tags:")?;
    if view.custom_tags.is_empty() {
        writeln!(out, "     (None)")?;
    } else {
        writeln!(out, "{}", serde_json::to_string_pretty(&view.custom_tags)?)?;
    }
    Ok(out)
}
