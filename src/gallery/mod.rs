//! Gallery core: everything that does not touch a widget.

pub mod deep_link;
pub mod filter;
pub mod index;
pub mod lightbox;
pub mod loader;
pub mod ready;
pub mod render;
pub mod story;

pub use deep_link::{share_url, DeepLink, LinkTarget, PageLocation, SettlePolicy};
pub use filter::{FilterController, FilterEntry, FilterKey, FilterOutcome, SectionNavigator};
pub use index::ImageIndex;
pub use lightbox::{LightboxController, LightboxState, LightboxSurface, StoryFetch, StoryProbe};
pub use loader::load_manifest;
pub use ready::{render_signal, ReadySignal, RenderNotifier, RenderState};
pub use render::{render_gallery, RenderedGallery, RenderedSection};
pub use story::{load_story, probe_story, StoryContent, StoryPanel, StoryToggle};
