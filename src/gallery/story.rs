//! Optional story text shown under an image.
//!
//! A story lives next to its image as `<base name>.txt`. It is read the first
//! time the reader asks for it; afterwards the toggle only flips visibility.

use tracing::{debug, warn};

use crate::source::GallerySource;

pub const SHOW_STORY_LABEL: &str = "Show Story";
pub const HIDE_STORY_LABEL: &str = "Hide Story";
pub const LOADING_STORY_LABEL: &str = "Loading...";
pub const NO_STORY_MESSAGE: &str = "No Story available";
pub const STORY_ERROR_MESSAGE: &str = "Error loading Story";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryContent {
    /// Trimmed story text.
    Text(String),
    /// The story file does not exist.
    Unavailable,
    /// The story file exists but could not be read.
    Failed,
}

impl StoryContent {
    /// What the panel displays.
    pub fn message(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Unavailable => NO_STORY_MESSAGE,
            Self::Failed => STORY_ERROR_MESSAGE,
        }
    }
}

/// What the caller must do after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryToggle {
    Hidden,
    Shown,
    /// The story has to be read; call [`StoryPanel::finish_loading`] with it.
    FetchNeeded,
    /// A read is already in flight.
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryPanel {
    story_path: String,
    visible: bool,
    loading: bool,
    content: Option<StoryContent>,
}

impl StoryPanel {
    pub fn new(story_path: impl Into<String>) -> Self {
        Self {
            story_path: story_path.into(),
            visible: false,
            loading: false,
            content: None,
        }
    }

    pub fn story_path(&self) -> &str {
        &self.story_path
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn content(&self) -> Option<&StoryContent> {
        self.content.as_ref()
    }

    pub fn button_label(&self) -> &'static str {
        if self.loading {
            LOADING_STORY_LABEL
        } else if self.visible {
            HIDE_STORY_LABEL
        } else {
            SHOW_STORY_LABEL
        }
    }

    pub fn toggle(&mut self) -> StoryToggle {
        if self.loading {
            return StoryToggle::Pending;
        }
        if self.visible {
            self.visible = false;
            return StoryToggle::Hidden;
        }
        if self.content.is_some() {
            self.visible = true;
            return StoryToggle::Shown;
        }
        self.loading = true;
        StoryToggle::FetchNeeded
    }

    pub fn finish_loading(&mut self, content: StoryContent) {
        self.loading = false;
        self.content = Some(content);
        self.visible = true;
    }

    /// Hides the panel, e.g. after a click inside it.
    pub fn dismiss(&mut self) {
        self.visible = false;
    }
}

/// Reads a story. Never fails: absence and read errors become panel messages.
pub async fn load_story(source: &GallerySource, story_path: &str) -> StoryContent {
    match source.fetch_text(story_path).await {
        Ok(text) => StoryContent::Text(text.trim().to_string()),
        Err(err) if err.is_not_found() => {
            debug!(story_path, "No story for image");
            StoryContent::Unavailable
        }
        Err(err) => {
            warn!(story_path, error = %err, "Failed to load story");
            StoryContent::Failed
        }
    }
}

/// Checks whether an image has a story without reading it.
pub async fn probe_story(source: &GallerySource, story_path: &str) -> bool {
    source.probe(story_path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_first_toggle_needs_fetch_then_only_flips() {
        let mut panel = StoryPanel::new("images/fanart/b.txt");
        assert_eq!(panel.button_label(), SHOW_STORY_LABEL);

        assert_eq!(panel.toggle(), StoryToggle::FetchNeeded);
        assert_eq!(panel.button_label(), LOADING_STORY_LABEL);
        assert_eq!(panel.toggle(), StoryToggle::Pending);

        panel.finish_loading(StoryContent::Text("Once upon a time".into()));
        assert!(panel.is_visible());
        assert_eq!(panel.button_label(), HIDE_STORY_LABEL);

        assert_eq!(panel.toggle(), StoryToggle::Hidden);
        assert_eq!(panel.button_label(), SHOW_STORY_LABEL);
        assert_eq!(panel.toggle(), StoryToggle::Shown);
        assert_eq!(panel.content().unwrap().message(), "Once upon a time");
    }

    #[test]
    fn test_dismiss_hides_without_dropping_content() {
        let mut panel = StoryPanel::new("images/fanart/b.txt");
        panel.toggle();
        panel.finish_loading(StoryContent::Unavailable);
        panel.dismiss();
        assert!(!panel.is_visible());
        assert_eq!(panel.toggle(), StoryToggle::Shown);
    }

    #[tokio::test]
    async fn test_missing_story_reports_unavailable() {
        let dir = tempdir().unwrap();
        let source = GallerySource::new(dir.path());
        let mut panel = StoryPanel::new("images/fanart/b.txt");

        assert_eq!(panel.toggle(), StoryToggle::FetchNeeded);
        let content = load_story(&source, panel.story_path()).await;
        assert_eq!(content, StoryContent::Unavailable);
        panel.finish_loading(content);

        assert!(panel.is_visible());
        assert_eq!(panel.content().unwrap().message(), NO_STORY_MESSAGE);
        assert_eq!(panel.button_label(), HIDE_STORY_LABEL);
    }

    #[tokio::test]
    async fn test_story_text_is_trimmed() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("images/fanart")).unwrap();
        fs::write(dir.path().join("images/fanart/b.txt"), "\n  A quiet harbour.  \n").unwrap();

        let source = GallerySource::new(dir.path());
        assert!(probe_story(&source, "images/fanart/b.txt").await);
        assert_eq!(
            load_story(&source, "images/fanart/b.txt").await,
            StoryContent::Text("A quiet harbour.".into())
        );
    }

    #[tokio::test]
    async fn test_unreadable_story_reports_error() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("images/fanart")).unwrap();
        fs::write(dir.path().join("images/fanart/b.txt"), [0xff, 0xfe, 0x00]).unwrap();

        let source = GallerySource::new(dir.path());
        let content = load_story(&source, "images/fanart/b.txt").await;
        assert_eq!(content, StoryContent::Failed);
        assert_eq!(content.message(), STORY_ERROR_MESSAGE);
    }
}
