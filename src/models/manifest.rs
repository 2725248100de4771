use serde::{Deserialize, Serialize};

use crate::error::GalleryError;

/// Separator between the segments of a nested category id (`sketches::ink`).
pub const CATEGORY_SEPARATOR: &str = "::";

/// Directory below the gallery root that holds the category folders.
pub const IMAGES_DIR: &str = "images";

/// Default location of the manifest below the gallery root.
pub const MANIFEST_PATH: &str = "data/gallery.json";

/// Extension used for story text files.
pub const STORY_EXTENSION: &str = "txt";

/// Root of `data/gallery.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Self, GalleryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Number of images over the whole category tree.
    pub fn total_images(&self) -> usize {
        self.categories.iter().map(Category::total_images).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub images: Vec<ImageEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<Category>,
}

impl Category {
    pub fn resolved_path(&self) -> String {
        resolve_category_path(&self.id)
    }

    pub fn total_images(&self) -> usize {
        self.images.len()
            + self
                .subcategories
                .iter()
                .map(Category::total_images)
                .sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Maps a hierarchical category id onto its folder below `images/`.
pub fn resolve_category_path(category_id: &str) -> String {
    category_id.replace(CATEGORY_SEPARATOR, "/")
}

/// Path of an image relative to the gallery root.
pub fn image_path(category_path: &str, file: &str) -> String {
    format!("{IMAGES_DIR}/{category_path}/{file}")
}

/// Path of the story text that accompanies an image.
///
/// The last extension of `file` is replaced by `.txt`; a name without an
/// extension gets `.txt` appended.
pub fn story_path(category_path: &str, file: &str) -> String {
    let base = match file.rfind('.') {
        Some(pos) if pos + 1 < file.len() && !file[pos + 1..].contains('/') => &file[..pos],
        _ => file,
    };
    format!("{IMAGES_DIR}/{category_path}/{base}.{STORY_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest_with_optional_fields() {
        let manifest = Manifest::from_json(
            r#"{
                "categories": [
                    {
                        "id": "fanart",
                        "title": "Fan Art",
                        "images": [{"file": "a.png", "title": "A"}, {"file": "b.png"}],
                        "subcategories": [
                            {"id": "fanart::ink", "title": "Ink", "images": [{"file": "c.jpg"}]}
                        ]
                    },
                    {"id": "empty", "title": "Empty"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.categories.len(), 2);
        assert_eq!(manifest.categories[0].images[1].title, None);
        assert_eq!(manifest.categories[0].subcategories[0].id, "fanart::ink");
        assert!(manifest.categories[1].images.is_empty());
        assert_eq!(manifest.total_images(), 3);
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(matches!(
            Manifest::from_json("{\"categories\": ["),
            Err(GalleryError::Parse(_))
        ));
    }

    #[test]
    fn test_resolved_paths() {
        assert_eq!(resolve_category_path("sketches::ink::2024"), "sketches/ink/2024");
        assert_eq!(image_path("fanart", "b.png"), "images/fanart/b.png");
    }

    #[test]
    fn test_story_path_replaces_last_extension() {
        assert_eq!(story_path("fanart", "b.png"), "images/fanart/b.txt");
        assert_eq!(story_path("fanart", "scan.v2.jpeg"), "images/fanart/scan.v2.txt");
        assert_eq!(story_path("fanart", "noext"), "images/fanart/noext.txt");
        assert_eq!(story_path("a/b", "trailing."), "images/a/b/trailing..txt");
    }
}
