//! Texture pipeline for the gallery.
//!
//! - `TextureCache` - LRU cache of decoded textures bounded by bytes
//! - `ThumbnailLoader` - worker pool that decodes and uploads textures

pub mod cache;
pub mod loader;

pub use cache::{DecodeKey, TextureCache};
pub use loader::ThumbnailLoader;
