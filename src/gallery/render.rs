//! Turns a manifest into the section tree the view displays.
//!
//! The walk is depth-first: a category's subcategories are rendered before its
//! own images, and own images are sorted by filename, newest-looking names
//! first. Every image gets its global index as a side effect of the walk.

use tracing::{debug, warn};

use super::filter::{FilterEntry, FilterKey};
use super::index::ImageIndex;
use crate::models::{Category, ImageEntry, Manifest};

/// One category section, mirroring the manifest tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSection {
    pub id: String,
    /// Heading text, upper-cased.
    pub heading: String,
    /// Nesting depth, 0 for top-level categories.
    pub depth: usize,
    pub children: Vec<RenderedSection>,
    /// Global indices of the category's own images in display order.
    pub images: Vec<usize>,
}

impl RenderedSection {
    pub fn is_subcategory(&self) -> bool {
        self.depth > 0
    }

    fn find(&self, id: &str) -> Option<&RenderedSection> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Output of the render pipeline.
#[derive(Debug, Clone, Default)]
pub struct RenderedGallery {
    pub sections: Vec<RenderedSection>,
    pub filters: Vec<FilterEntry>,
    pub index: ImageIndex,
}

impl RenderedGallery {
    /// First section with the given id, in document order.
    pub fn section(&self, id: &str) -> Option<&RenderedSection> {
        self.sections.iter().find_map(|section| section.find(id))
    }

    pub fn artwork_count_label(&self) -> String {
        format!("({} artworks shown here)/(I have lost count)", self.index.count())
    }
}

/// Renders the whole manifest. Image lists are sorted in place.
pub fn render_gallery(manifest: &mut Manifest) -> RenderedGallery {
    let mut index = ImageIndex::new();

    let mut filters = Vec::with_capacity(manifest.categories.len() + 1);
    filters.push(FilterEntry::new(FilterKey::All));
    filters.extend(
        manifest
            .categories
            .iter()
            .map(|category| FilterEntry::new(FilterKey::Category(category.id.clone()))),
    );

    let sections = manifest
        .categories
        .iter_mut()
        .map(|category| render_category(category, 0, &mut index))
        .collect();

    debug!(
        images = index.count(),
        categories = manifest.categories.len(),
        "Rendered gallery"
    );

    RenderedGallery {
        sections,
        filters,
        index,
    }
}

fn render_category(category: &mut Category, depth: usize, index: &mut ImageIndex) -> RenderedSection {
    if category.id.is_empty() {
        warn!(title = %category.title, "Category without id; deep links cannot reach it");
    }

    // A parent owns its id over nested duplicates, as in section lookup.
    let owns_id = index.claim_category(&category.id);

    let children = category
        .subcategories
        .iter_mut()
        .map(|child| render_category(child, depth + 1, index))
        .collect();

    sort_images_descending(&mut category.images);

    let category_path = category.resolved_path();
    let start = index.count();
    let images = category
        .images
        .iter()
        .enumerate()
        .map(|(local, entry)| index.push(&category.id, &category_path, entry, local))
        .collect::<Vec<_>>();
    if owns_id {
        index.set_category_span(&category.id, start, images.len());
    }

    RenderedSection {
        id: category.id.clone(),
        heading: category.title.to_uppercase(),
        depth,
        children,
        images,
    }
}

/// Descending byte-wise order by filename; equal names keep manifest order.
pub fn sort_images_descending(images: &mut [ImageEntry]) {
    images.sort_by(|a, b| b.file.cmp(&a.file));
}
