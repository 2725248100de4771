//! Builds `data/gallery.json` from the folders below `images/`.
//!
//! Every folder holding images becomes a category; nested folders become
//! subcategories with `parent::child` ids. Images are listed newest first.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::models::{Category, ImageEntry, Manifest, CATEGORY_SEPARATOR, IMAGES_DIR, MANIFEST_PATH};

/// Extensions picked up by the generator, lower case.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Outcome of a generator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateSummary {
    pub output: PathBuf,
    pub categories: usize,
    pub images: usize,
}

/// Scans `<root>/images` and writes the manifest to `output`, or to
/// `<root>/data/gallery.json` when no output is given.
pub fn generate(root: &Path, output: Option<&Path>) -> Result<GenerateSummary> {
    let images_dir = root.join(IMAGES_DIR);
    let manifest = build_manifest(&images_dir)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.join(MANIFEST_PATH));
    write_manifest(&manifest, &output)?;

    let summary = GenerateSummary {
        output,
        categories: manifest.categories.len(),
        images: manifest.total_images(),
    };
    info!(
        output = ?summary.output,
        categories = summary.categories,
        images = summary.images,
        "Generated manifest"
    );
    Ok(summary)
}

/// Builds a manifest from an `images/` directory.
pub fn build_manifest(images_dir: &Path) -> Result<Manifest> {
    if !images_dir.is_dir() {
        anyhow::bail!("{} is not a directory", images_dir.display());
    }
    let categories = child_dirs(images_dir)?
        .into_iter()
        .filter_map(|dir| build_category(&dir, None).transpose())
        .collect::<Result<Vec<_>>>()?;
    Ok(Manifest { categories })
}

pub fn write_manifest(manifest: &Manifest, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(manifest).context("Failed to serialize manifest")?;
    fs::write(output, json).with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(())
}

/// A category for `dir`, or `None` when neither it nor any descendant holds images.
fn build_category(dir: &Path, parent_id: Option<&str>) -> Result<Option<Category>> {
    let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
        warn!(?dir, "Skipping folder with a non UTF-8 name");
        return Ok(None);
    };
    let id = match parent_id {
        Some(parent) => format!("{parent}{CATEGORY_SEPARATOR}{name}"),
        None => name.to_string(),
    };

    let subcategories = child_dirs(dir)?
        .into_iter()
        .filter_map(|child| build_category(&child, Some(&id)).transpose())
        .collect::<Result<Vec<_>>>()?;

    let images = list_images(dir)?
        .into_iter()
        .map(|file| ImageEntry {
            title: Some(title_from_filename(&file)),
            file,
        })
        .collect::<Vec<_>>();

    if images.is_empty() && subcategories.is_empty() {
        debug!(?dir, "Skipping folder without images");
        return Ok(None);
    }

    Ok(Some(Category {
        title: title_from_folder(name),
        id,
        images,
        subcategories,
    }))
}

/// Visible subdirectories, sorted by name.
fn child_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        if entry.file_type().is_dir() && !is_hidden(entry.file_name().to_str()) {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

/// Image file names in `dir`, newest first. Equal timestamps fall back to name order.
fn list_images(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            warn!(path = ?entry.path(), "Skipping file with a non UTF-8 name");
            continue;
        };
        if is_hidden(Some(name)) || !is_image_name(name) {
            continue;
        }
        let created = match entry.metadata() {
            Ok(meta) => created_secs(meta.created().or_else(|_| meta.modified()).ok()),
            Err(err) => {
                warn!(path = ?entry.path(), %err, "Failed to read metadata");
                0
            }
        };
        files.push((created, name.to_string()));
    }
    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    Ok(files.into_iter().map(|(_, name)| name).collect())
}

fn created_secs(time: Option<SystemTime>) -> i64 {
    time.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn is_hidden(name: Option<&str>) -> bool {
    name.map_or(true, |n| n.starts_with('.'))
}

fn is_image_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// `my_cat.final.png` becomes `My Cat.Final`.
pub fn title_from_filename(filename: &str) -> String {
    let stem = filename.rsplit_once('.').map_or(filename, |(stem, _)| stem);
    title_case(stem.replace('_', " ").trim())
}

/// `fan_art` becomes `Fan Art`.
pub fn title_from_folder(folder: &str) -> String {
    title_case(&folder.replace('_', " "))
}

/// Upper-cases the first letter of every run of letters and lower-cases the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}
