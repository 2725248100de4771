//! In-memory texture cache bounded by an estimated byte budget.
//!
//! Entries are evicted least recently used first until the new entry fits.

use std::path::PathBuf;

use gdk4::Texture;
use lru::LruCache;
use tracing::{debug, trace};

/// Bytes per pixel of the RGBA textures the decoder produces.
pub const BYTES_PER_PIXEL: usize = 4;

/// A decoded image at a given size bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecodeKey {
    pub path: PathBuf,
    /// Longest edge the image was scaled down to.
    pub max_edge: u32,
}

impl DecodeKey {
    pub fn new(path: impl Into<PathBuf>, max_edge: u32) -> Self {
        Self {
            path: path.into(),
            max_edge,
        }
    }
}

pub fn texture_bytes(width: u32, height: u32) -> usize {
    (width as usize) * (height as usize) * BYTES_PER_PIXEL
}

struct CachedEntry<T> {
    value: T,
    memory_bytes: usize,
}

pub struct TextureCache<T = Texture> {
    entries: LruCache<DecodeKey, CachedEntry<T>>,
    max_memory_bytes: usize,
    current_memory_bytes: usize,
}

impl<T: Clone> TextureCache<T> {
    pub fn new(max_memory_bytes: usize) -> Self {
        debug!(max_memory_bytes, "Initialized texture cache");
        Self {
            entries: LruCache::unbounded(),
            max_memory_bytes,
            current_memory_bytes: 0,
        }
    }

    /// Looks up an entry and marks it most recently used.
    pub fn get(&mut self, key: &DecodeKey) -> Option<T> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn contains(&self, key: &DecodeKey) -> bool {
        self.entries.contains(key)
    }

    /// Inserts an entry. Entries larger than the whole budget are not cached.
    pub fn put(&mut self, key: DecodeKey, value: T, memory_bytes: usize) {
        if memory_bytes > self.max_memory_bytes {
            trace!(path = ?key.path, memory_bytes, "Texture exceeds cache budget");
            return;
        }
        if let Some(old) = self.entries.pop(&key) {
            self.current_memory_bytes = self.current_memory_bytes.saturating_sub(old.memory_bytes);
        }
        self.evict_if_needed(memory_bytes);
        self.entries.put(
            key,
            CachedEntry {
                value,
                memory_bytes,
            },
        );
        self.current_memory_bytes += memory_bytes;
    }

    fn evict_if_needed(&mut self, needed_bytes: usize) {
        while self.current_memory_bytes + needed_bytes > self.max_memory_bytes {
            let Some((key, evicted)) = self.entries.pop_lru() else {
                break;
            };
            self.current_memory_bytes = self
                .current_memory_bytes
                .saturating_sub(evicted.memory_bytes);
            trace!(
                path = ?key.path,
                evicted_bytes = evicted.memory_bytes,
                current_bytes = self.current_memory_bytes,
                "Evicted texture from cache"
            );
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_memory_bytes = 0;
    }

    pub fn memory_usage(&self) -> usize {
        self.current_memory_bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
