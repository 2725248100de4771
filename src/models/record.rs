use super::manifest::{image_path, story_path};

/// One displayed image, in the order images appear on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImageRecord {
    /// Position among all rendered images.
    pub global_index: usize,
    pub category_id: String,
    pub file: String,
    /// Display title, empty when the manifest has none.
    pub title: String,
    /// Position among the category's own images after sorting.
    pub index_in_category: usize,
    /// Category id with separators mapped to `/`.
    pub category_path: String,
}

impl RenderedImageRecord {
    pub fn image_path(&self) -> String {
        image_path(&self.category_path, &self.file)
    }

    pub fn story_path(&self) -> String {
        story_path(&self.category_path, &self.file)
    }
}
