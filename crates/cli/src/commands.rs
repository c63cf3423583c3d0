//! Command bodies behind the `filemeta` subcommands. Each returns the text
//! to print so the binary stays a thin dispatcher.

use crate::output;
use crate::tags::parse_tag_pairs;
use anyhow::{bail, Context, Result};
use filemeta_core::{FileUpdate, MetadataStore, NewFile};
use std::path::Path;

/// Absolute, symlink-resolved form of an existing path; anything else is
/// passed through so the store can report it missing.
pub fn normalize_path(path: &str) -> String {
    std::fs::canonicalize(Path::new(path))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| path.to_string())
}

pub async fn add(
    store: &MetadataStore,
    filepath: &str,
    tag_args: &[String],
    owner: Option<String>,
    created_by: Option<String>,
) -> Result<String> {
    let new = NewFile {
        filepath: normalize_path(filepath),
        tags: parse_tag_pairs(tag_args)?,
        owner,
        created_by,
    };
    let file = store.add(new).await?;
    Ok(format!(
        "Metadata added for file '{}' (ID: {})",
        file.filename, file.id
    ))
}

pub async fn get(store: &MetadataStore, id: i64, json: bool) -> Result<String> {
    let file = store.get(id).await?;
    if json {
        return output::to_json(std::slice::from_ref(&file));
    }
    Ok(format!(
        "--- Metadata for File ID: {} ---\n{}{}",
        file.id,
        output::render_full(&file)?,
        "-".repeat(40)
    ))
}

pub async fn list(store: &MetadataStore, owner: Option<&str>, json: bool) -> Result<String> {
    let files = store.list_owned(owner).await?;
    if json {
        return output::to_json(&files);
    }
    if files.is_empty() {
        return Ok("No file metadata records found.".to_string());
    }
    let mut out = String::new();
    for file in &files {
        out.push_str(&"-".repeat(40));
        out.push('\n');
        out.push_str(&output::render_summary(file));
    }
    out.push_str(&"-".repeat(40));
    Ok(out)
}

pub async fn search(
    store: &MetadataStore,
    keywords: &[String],
    owner: Option<&str>,
    full: bool,
    json: bool,
) -> Result<String> {
    if keywords.iter().all(|k| k.is_empty()) && owner.is_none() {
        bail!("provide at least one keyword (--keyword) or an owner (--owner) to search for");
    }
    let files = store.search(keywords, owner).await?;
    if json {
        return output::to_json(&files);
    }
    let joined = keywords.join(", ");
    if files.is_empty() {
        return Ok(format!("No files found matching keywords: {}", joined));
    }
    let mut out = format!("Found files matching keywords: {}\n", joined);
    for file in &files {
        out.push_str(&"-".repeat(40));
        out.push('\n');
        if full {
            out.push_str(&output::render_full(file)?);
        } else {
            out.push_str(&output::render_summary(file));
        }
    }
    out.push_str(&"-".repeat(40));
    Ok(out)
}

#[derive(Debug, Default, Clone)]
pub struct UpdateArgs {
    pub tags: Vec<String>,
    pub remove: Vec<String>,
    pub path: Option<String>,
    pub overwrite: bool,
}

pub async fn update(store: &MetadataStore, id: i64, args: UpdateArgs) -> Result<String> {
    if args.tags.is_empty() && args.remove.is_empty() && args.path.is_none() && !args.overwrite {
        bail!("provide at least one option to update (--tag, --remove-tag, --path or --overwrite)");
    }
    if args.overwrite && !args.remove.is_empty() {
        bail!("--overwrite clears all tags before applying new ones; it cannot be combined with --remove-tag");
    }
    let update = FileUpdate {
        overwrite_existing: args.overwrite,
        tags_to_remove: args.remove.into_iter().collect(),
        tags_to_add_modify: parse_tag_pairs(&args.tags)?,
        new_filepath: args.path.as_deref().map(normalize_path),
    };
    let file = store.update(id, update).await?;
    Ok(format!(
        "Metadata for file ID {} updated successfully.\n{}",
        file.id,
        output::render_full(&file)?
    ))
}

pub async fn delete(store: &MetadataStore, id: i64) -> Result<String> {
    store.delete(id).await?;
    Ok(format!(
        "Metadata for file ID {} and all associated tags deleted successfully.",
        id
    ))
}

/// Writes every record to `out` as a JSON array of file views.
pub async fn export(store: &MetadataStore, out: &str) -> Result<String> {
    let files = store.list().await?;
    if files.is_empty() {
        return Ok("No file metadata records found to export.".to_string());
    }
    let body = output::to_json(&files)?;
    tokio::fs::write(out, body)
        .await
        .with_context(|| format!("writing export to '{}'", out))?;
    Ok(format!(
        "Successfully exported {} file metadata records to '{}'.",
        files.len(),
        out
    ))
}
