use tracing::info;

use crate::error::GalleryError;
use crate::models::Manifest;
use crate::source::GallerySource;

/// Reads and parses the manifest. One attempt, no retry.
pub async fn load_manifest(
    source: &GallerySource,
    manifest_path: &str,
) -> Result<Manifest, GalleryError> {
    let json = source.fetch_text(manifest_path).await?;
    let manifest = Manifest::from_json(&json)?;
    info!(
        manifest_path,
        categories = manifest.categories.len(),
        images = manifest.total_images(),
        "Loaded manifest"
    );
    Ok(manifest)
}
