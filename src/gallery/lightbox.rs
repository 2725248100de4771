//! Full-window single image viewer.
//!
//! The controller owns the navigation state and drives a [`LightboxSurface`].
//! Each open bumps a generation counter; asynchronous story results carry the
//! generation they were requested for and are dropped once it is stale.

use tracing::{debug, warn};

use super::deep_link::{share_url, DeepLink};
use super::index::ImageIndex;
use super::story::{StoryContent, StoryPanel, StoryToggle};
use crate::models::RenderedImageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightboxState {
    Closed,
    Open(usize),
}

/// The widgets (or test double) the lightbox renders into.
pub trait LightboxSurface {
    /// Shows the record's image and title.
    fn show_image(&self, record: &RenderedImageRecord);
    fn set_visible(&self, visible: bool);
    /// Replaces the page fragment in place; `None` returns to the bare page.
    fn replace_location_hash(&self, hash: Option<&str>);
    /// Removes any story toggle and panel from the caption.
    fn remove_story(&self);
    /// Adds a fresh story toggle and hidden panel to the caption.
    fn install_story(&self, panel: &StoryPanel);
    fn update_story(&self, panel: &StoryPanel);
}

/// Request to check whether the open image has a story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryProbe {
    pub generation: u64,
    pub story_path: String,
}

/// Request to read the open image's story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryFetch {
    pub generation: u64,
    pub story_path: String,
}

#[derive(Debug)]
pub struct LightboxController {
    state: LightboxState,
    current: usize,
    generation: u64,
    story: Option<StoryPanel>,
}

impl LightboxController {
    pub fn new() -> Self {
        Self {
            state: LightboxState::Closed,
            current: 0,
            generation: 0,
            story: None,
        }
    }

    pub fn state(&self) -> LightboxState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, LightboxState::Open(_))
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn story(&self) -> Option<&StoryPanel> {
        self.story.as_ref()
    }

    /// Opens the image at `global_index`.
    ///
    /// Returns the story probe to run, or `None` when the index is out of range.
    pub fn open(
        &mut self,
        global_index: usize,
        index: &ImageIndex,
        surface: &impl LightboxSurface,
    ) -> Option<StoryProbe> {
        let Some(record) = index.record_at(global_index) else {
            warn!(global_index, count = index.count(), "Lightbox index out of range");
            return None;
        };

        self.current = global_index;
        self.generation = self.generation.wrapping_add(1);
        self.state = LightboxState::Open(global_index);

        surface.show_image(record);
        surface.replace_location_hash(Some(&DeepLink::for_record(record).to_hash()));
        self.story = None;
        surface.remove_story();
        surface.set_visible(true);

        debug!(
            global_index,
            category = %record.category_id,
            generation = self.generation,
            "Opened lightbox"
        );

        Some(StoryProbe {
            generation: self.generation,
            story_path: record.story_path(),
        })
    }

    pub fn close(&mut self, surface: &impl LightboxSurface) {
        self.state = LightboxState::Closed;
        surface.replace_location_hash(None);
        surface.set_visible(false);
        debug!(index = self.current, "Closed lightbox");
    }

    pub fn next(&mut self, index: &ImageIndex, surface: &impl LightboxSurface) -> Option<StoryProbe> {
        let count = index.count();
        if count == 0 {
            return None;
        }
        self.open((self.current + 1) % count, index, surface)
    }

    pub fn prev(&mut self, index: &ImageIndex, surface: &impl LightboxSurface) -> Option<StoryProbe> {
        let count = index.count();
        if count == 0 {
            return None;
        }
        self.open((self.current % count + count - 1) % count, index, surface)
    }

    /// Applies a probe result. Returns `true` when a toggle was installed.
    pub fn story_probe_finished(
        &mut self,
        generation: u64,
        story_path: &str,
        exists: bool,
        surface: &impl LightboxSurface,
    ) -> bool {
        if generation != self.generation || !self.is_open() {
            debug!(generation, current = self.generation, "Dropping stale story probe");
            return false;
        }
        if !exists {
            return false;
        }
        let panel = StoryPanel::new(story_path);
        surface.install_story(&panel);
        self.story = Some(panel);
        true
    }

    /// Flips the story panel; returns a read request on first show.
    pub fn toggle_story(&mut self, surface: &impl LightboxSurface) -> Option<StoryFetch> {
        let panel = self.story.as_mut()?;
        let toggle = panel.toggle();
        surface.update_story(panel);
        (toggle == StoryToggle::FetchNeeded).then(|| StoryFetch {
            generation: self.generation,
            story_path: panel.story_path().to_string(),
        })
    }

    /// Applies a story read. Returns `false` when the result is stale.
    pub fn story_loaded(
        &mut self,
        generation: u64,
        content: StoryContent,
        surface: &impl LightboxSurface,
    ) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Dropping stale story text");
            return false;
        }
        let Some(panel) = self.story.as_mut() else {
            return false;
        };
        panel.finish_loading(content);
        surface.update_story(panel);
        true
    }

    /// Hides the story panel after a click inside it.
    pub fn dismiss_story(&mut self, surface: &impl LightboxSurface) {
        if let Some(panel) = self.story.as_mut() {
            if panel.is_visible() {
                panel.dismiss();
                surface.update_story(panel);
            }
        }
    }

    /// Link to the open image, `None` while closed.
    pub fn current_link(&self, index: &ImageIndex) -> Option<DeepLink> {
        if !self.is_open() {
            return None;
        }
        index.record_at(self.current).map(DeepLink::for_record)
    }

    /// Shareable URL of the open image; the bare page URL while closed.
    pub fn share_url(&self, index: &ImageIndex, page_url: &str) -> String {
        match self.current_link(index) {
            Some(link) => share_url(page_url, &link),
            None => page_url.to_string(),
        }
    }
}

impl Default for LightboxController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::deep_link::PageLocation;
    use crate::gallery::render::render_gallery;
    use crate::gallery::story::{HIDE_STORY_LABEL, NO_STORY_MESSAGE, SHOW_STORY_LABEL};
    use crate::models::{Category, ImageEntry, Manifest};
    use std::cell::{Cell, RefCell};

    struct FakeSurface {
        location: RefCell<PageLocation>,
        visible: Cell<bool>,
        title: RefCell<String>,
        story_label: RefCell<Option<String>>,
        story_text: RefCell<Option<String>>,
        installs: Cell<usize>,
    }

    impl FakeSurface {
        fn new() -> Self {
            Self {
                location: RefCell::new(PageLocation::new("file:///gallery/index.html")),
                visible: Cell::new(false),
                title: RefCell::new(String::new()),
                story_label: RefCell::new(None),
                story_text: RefCell::new(None),
                installs: Cell::new(0),
            }
        }

        fn hash(&self) -> Option<String> {
            self.location.borrow().hash().map(str::to_string)
        }
    }

    impl LightboxSurface for FakeSurface {
        fn show_image(&self, record: &RenderedImageRecord) {
            *self.title.borrow_mut() = record.title.clone();
        }

        fn set_visible(&self, visible: bool) {
            self.visible.set(visible);
        }

        fn replace_location_hash(&self, hash: Option<&str>) {
            let mut location = self.location.borrow_mut();
            match hash {
                Some(hash) => location.replace_hash(hash),
                None => location.clear_hash(),
            }
        }

        fn remove_story(&self) {
            *self.story_label.borrow_mut() = None;
            *self.story_text.borrow_mut() = None;
        }

        fn install_story(&self, panel: &StoryPanel) {
            self.installs.set(self.installs.get() + 1);
            self.update_story(panel);
        }

        fn update_story(&self, panel: &StoryPanel) {
            *self.story_label.borrow_mut() = Some(panel.button_label().to_string());
            *self.story_text.borrow_mut() = panel
                .is_visible()
                .then(|| panel.content().map(|c| c.message().to_string()))
                .flatten();
        }
    }

    fn image(file: &str) -> ImageEntry {
        ImageEntry {
            file: file.to_string(),
            title: Some(file.to_uppercase()),
        }
    }

    fn gallery() -> ImageIndex {
        let mut manifest = Manifest {
            categories: vec![
                Category {
                    id: "sketches".into(),
                    title: "Sketches".into(),
                    images: vec![image("s1.png")],
                    subcategories: vec![Category {
                        id: "sketches::ink".into(),
                        title: "Ink".into(),
                        images: vec![image("i1.png"), image("i2.png")],
                        subcategories: vec![],
                    }],
                },
                Category {
                    id: "fanart".into(),
                    title: "Fan Art".into(),
                    images: vec![image("a.png"), image("b.png")],
                    subcategories: vec![],
                },
            ],
        };
        render_gallery(&mut manifest).index
    }

    #[test]
    fn test_open_sets_hash_and_visibility() {
        let index = gallery();
        let surface = FakeSurface::new();
        let mut lightbox = LightboxController::new();

        let probe = lightbox.open(3, &index, &surface).unwrap();
        assert_eq!(lightbox.state(), LightboxState::Open(3));
        assert!(surface.visible.get());
        assert_eq!(*surface.title.borrow(), "B.PNG");
        assert_eq!(surface.hash().as_deref(), Some("#category=fanart&index=0"));
        assert_eq!(probe.story_path, "images/fanart/b.txt");

        lightbox.close(&surface);
        assert_eq!(lightbox.state(), LightboxState::Closed);
        assert!(!surface.visible.get());
        assert_eq!(surface.hash(), None);
    }

    #[test]
    fn test_open_out_of_range_is_ignored() {
        let index = gallery();
        let surface = FakeSurface::new();
        let mut lightbox = LightboxController::new();
        assert!(lightbox.open(99, &index, &surface).is_none());
        assert_eq!(lightbox.state(), LightboxState::Closed);
        assert!(!surface.visible.get());
    }

    #[test]
    fn test_next_wraps_to_start() {
        let mut manifest = Manifest {
            categories: vec![Category {
                id: "fanart".into(),
                title: "Fan Art".into(),
                images: vec![image("b.png"), image("a.png")],
                subcategories: vec![],
            }],
        };
        let index = render_gallery(&mut manifest).index;
        let surface = FakeSurface::new();
        let mut lightbox = LightboxController::new();

        lightbox.open(1, &index, &surface);
        lightbox.next(&index, &surface);
        assert_eq!(lightbox.current_index(), 0);
        lightbox.prev(&index, &surface);
        assert_eq!(lightbox.current_index(), 1);
    }

    #[test]
    fn test_next_then_prev_is_identity() {
        let index = gallery();
        let surface = FakeSurface::new();
        let mut lightbox = LightboxController::new();
        for start in 0..index.count() {
            lightbox.open(start, &index, &surface);
            lightbox.next(&index, &surface);
            lightbox.prev(&index, &surface);
            assert_eq!(lightbox.current_index(), start);
        }
    }

    #[test]
    fn test_navigation_on_empty_gallery_is_noop() {
        let index = ImageIndex::new();
        let surface = FakeSurface::new();
        let mut lightbox = LightboxController::new();
        assert!(lightbox.next(&index, &surface).is_none());
        assert!(lightbox.prev(&index, &surface).is_none());
        assert_eq!(lightbox.state(), LightboxState::Closed);
    }

    #[test]
    fn test_share_round_trip() {
        let index = gallery();
        let surface = FakeSurface::new();
        let mut lightbox = LightboxController::new();

        for global in 0..index.count() {
            lightbox.open(global, &index, &surface);
            let hash = surface.hash().unwrap();

            let mut reopened = LightboxController::new();
            let resolved = DeepLink::parse(&hash).unwrap().resolve(&index).unwrap();
            reopened.open(resolved, &index, &surface);
            assert_eq!(reopened.current_index(), global);

            let url = lightbox.share_url(&index, "file:///gallery/index.html");
            let from_url = DeepLink::parse(&url).unwrap().resolve(&index);
            assert_eq!(from_url, Some(global));
        }
    }

    #[test]
    fn test_share_url_while_closed_is_page_url() {
        let index = gallery();
        let lightbox = LightboxController::new();
        assert_eq!(
            lightbox.share_url(&index, "file:///gallery/index.html"),
            "file:///gallery/index.html"
        );
    }

    #[test]
    fn test_story_flow_in_lightbox() {
        let index = gallery();
        let surface = FakeSurface::new();
        let mut lightbox = LightboxController::new();

        let probe = lightbox.open(0, &index, &surface).unwrap();
        assert!(lightbox.toggle_story(&surface).is_none());
        assert!(lightbox.story_probe_finished(probe.generation, &probe.story_path, true, &surface));
        assert_eq!(surface.story_label.borrow().as_deref(), Some(SHOW_STORY_LABEL));

        let fetch = lightbox.toggle_story(&surface).unwrap();
        assert_eq!(fetch.story_path, probe.story_path);
        assert!(lightbox.story_loaded(fetch.generation, StoryContent::Unavailable, &surface));
        assert_eq!(surface.story_label.borrow().as_deref(), Some(HIDE_STORY_LABEL));
        assert_eq!(surface.story_text.borrow().as_deref(), Some(NO_STORY_MESSAGE));

        lightbox.dismiss_story(&surface);
        assert_eq!(surface.story_label.borrow().as_deref(), Some(SHOW_STORY_LABEL));
        assert!(surface.story_text.borrow().is_none());
    }

    #[test]
    fn test_reopen_discards_story_pair() {
        let index = gallery();
        let surface = FakeSurface::new();
        let mut lightbox = LightboxController::new();

        let probe = lightbox.open(0, &index, &surface).unwrap();
        lightbox.story_probe_finished(probe.generation, &probe.story_path, true, &surface);
        assert!(lightbox.story().is_some());

        lightbox.next(&index, &surface);
        assert!(lightbox.story().is_none());
        assert!(surface.story_label.borrow().is_none());
    }

    #[test]
    fn test_late_story_results_for_previous_image_are_dropped() {
        let index = gallery();
        let surface = FakeSurface::new();
        let mut lightbox = LightboxController::new();

        let first = lightbox.open(0, &index, &surface).unwrap();
        lightbox.story_probe_finished(first.generation, &first.story_path, true, &surface);
        let fetch = lightbox.toggle_story(&surface).unwrap();

        // Navigate before either async result arrives.
        let second = lightbox.next(&index, &surface).unwrap();
        assert!(!lightbox.story_loaded(
            fetch.generation,
            StoryContent::Text("stale".into()),
            &surface
        ));
        assert!(!lightbox.story_probe_finished(first.generation, &first.story_path, true, &surface));
        assert!(surface.story_text.borrow().is_none());
        assert_eq!(surface.installs.get(), 1);

        assert!(lightbox.story_probe_finished(second.generation, &second.story_path, true, &surface));
        assert_eq!(surface.installs.get(), 2);
    }

    #[test]
    fn test_probe_after_close_is_dropped() {
        let index = gallery();
        let surface = FakeSurface::new();
        let mut lightbox = LightboxController::new();

        let probe = lightbox.open(2, &index, &surface).unwrap();
        lightbox.close(&surface);
        assert!(!lightbox.story_probe_finished(probe.generation, &probe.story_path, true, &surface));
        assert_eq!(surface.installs.get(), 0);
    }
}
