//! Flat registry of rendered images.
//!
//! Records are appended exactly once while the gallery renders and never move
//! afterwards, so a global index stays valid for the lifetime of the page.

use std::collections::HashMap;

use crate::models::{ImageEntry, RenderedImageRecord};

/// Where a category's own images sit in the global order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CategorySpan {
    start: usize,
    len: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ImageIndex {
    records: Vec<RenderedImageRecord>,
    spans: HashMap<String, CategorySpan>,
}

impl ImageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and returns its global index.
    pub(crate) fn push(
        &mut self,
        category_id: &str,
        category_path: &str,
        entry: &ImageEntry,
        index_in_category: usize,
    ) -> usize {
        let global_index = self.records.len();
        self.records.push(RenderedImageRecord {
            global_index,
            category_id: category_id.to_string(),
            file: entry.file.clone(),
            title: entry.title.clone().unwrap_or_default(),
            index_in_category,
            category_path: category_path.to_string(),
        });
        global_index
    }

    /// Reserves an id for the first category that carries it, in document
    /// order. Returns false when an earlier category already owns the id.
    pub(crate) fn claim_category(&mut self, category_id: &str) -> bool {
        if self.spans.contains_key(category_id) {
            return false;
        }
        self.spans
            .insert(category_id.to_string(), CategorySpan { start: 0, len: 0 });
        true
    }

    /// Records the span of a category's own images once they are pushed.
    /// Only the owner of a claimed id may call this.
    pub(crate) fn set_category_span(&mut self, category_id: &str, start: usize, len: usize) {
        if let Some(span) = self.spans.get_mut(category_id) {
            *span = CategorySpan { start, len };
        }
    }

    pub fn record_at(&self, global_index: usize) -> Option<&RenderedImageRecord> {
        self.records.get(global_index)
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RenderedImageRecord] {
        &self.records
    }

    /// Number of images the category itself holds (subcategories excluded).
    pub fn category_len(&self, category_id: &str) -> Option<usize> {
        self.spans.get(category_id).map(|span| span.len)
    }

    /// Maps `(category, index within category)` to a global index.
    ///
    /// An out-of-range local index lands on the category's first image.
    /// Unknown categories and categories without own images yield `None`.
    pub fn global_index_of(&self, category_id: &str, index_in_category: usize) -> Option<usize> {
        let span = self.spans.get(category_id)?;
        if span.len == 0 {
            return None;
        }
        if index_in_category < span.len {
            Some(span.start + index_in_category)
        } else {
            Some(span.start)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(file: &str) -> ImageEntry {
        ImageEntry {
            file: file.to_string(),
            title: None,
        }
    }

    fn sample_index() -> ImageIndex {
        let mut index = ImageIndex::new();
        assert!(index.claim_category("sketches"));
        assert!(index.claim_category("sketches::ink"));
        for (i, file) in ["c.png", "b.png"].iter().enumerate() {
            index.push("sketches::ink", "sketches/ink", &entry(file), i);
        }
        index.set_category_span("sketches::ink", 0, 2);
        index.set_category_span("sketches", 2, 0);
        assert!(index.claim_category("fanart"));
        for (i, file) in ["z.png", "y.png", "x.png"].iter().enumerate() {
            index.push("fanart", "fanart", &entry(file), i);
        }
        index.set_category_span("fanart", 2, 3);
        index
    }

    #[test]
    fn test_push_assigns_positions() {
        let index = sample_index();
        assert_eq!(index.count(), 5);
        for (position, record) in index.records().iter().enumerate() {
            assert_eq!(record.global_index, position);
        }
        assert_eq!(index.record_at(3).unwrap().file, "y.png");
        assert!(index.record_at(5).is_none());
    }

    #[test]
    fn test_global_index_round_trip() {
        let index = sample_index();
        for id in ["sketches::ink", "fanart"] {
            let len = index.category_len(id).unwrap();
            for local in 0..len {
                let global = index.global_index_of(id, local).unwrap();
                let record = index.record_at(global).unwrap();
                assert_eq!(record.category_id, id);
                assert_eq!(record.index_in_category, local);
            }
        }
    }

    #[test]
    fn test_out_of_range_falls_back_to_first_image() {
        let index = sample_index();
        assert_eq!(index.global_index_of("fanart", 5), Some(2));
        assert_eq!(index.global_index_of("fanart", usize::MAX), Some(2));
    }

    #[test]
    fn test_unknown_or_imageless_category() {
        let index = sample_index();
        assert_eq!(index.global_index_of("missing", 0), None);
        assert_eq!(index.global_index_of("sketches", 0), None);
    }

    #[test]
    fn test_duplicate_category_first_claim_wins() {
        let mut index = sample_index();
        assert!(!index.claim_category("fanart"));
        assert!(!index.claim_category("sketches"));
        assert_eq!(index.global_index_of("fanart", 1), Some(3));
    }

    #[test]
    fn test_claimed_category_unresolved_until_span_set() {
        let mut index = ImageIndex::new();
        assert!(index.claim_category("pending"));
        assert_eq!(index.global_index_of("pending", 0), None);
        index.push("pending", "pending", &entry("a.png"), 0);
        index.set_category_span("pending", 0, 1);
        assert_eq!(index.global_index_of("pending", 0), Some(0));
    }
}
