//! Background image decoding for the grid and the lightbox.
//!
//! Requests go to a bounded pool of worker threads over a `flume` queue.
//! Decoded pixels come back over an `async_channel` drained on the GTK main
//! loop, where they are uploaded as textures and handed to every waiter.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use gdk4::{MemoryFormat, MemoryTexture, Texture};
use gtk4::glib;
use gtk4::prelude::*;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::cache::{texture_bytes, DecodeKey, TextureCache};
use crate::image_loader::{decode_rgba, DecodedImage};

/// Maximum number of queued decode requests.
const MAX_QUEUE_SIZE: usize = 512;

type Waiter = Box<dyn FnOnce(Option<&Texture>)>;

#[derive(Debug)]
struct DecodeResult {
    key: DecodeKey,
    image: Option<DecodedImage>,
}

pub struct ThumbnailLoader {
    request_tx: flume::Sender<DecodeKey>,
    /// Keys queued or being decoded. Workers drop a key once its result is sent.
    pending: Arc<Mutex<HashSet<DecodeKey>>>,
    waiters: RefCell<HashMap<DecodeKey, Vec<Waiter>>>,
    cache: RefCell<TextureCache>,
}

impl ThumbnailLoader {
    pub fn new(workers: usize, cache_bytes: usize) -> Rc<Self> {
        let (request_tx, request_rx) = flume::bounded::<DecodeKey>(MAX_QUEUE_SIZE);
        let (result_tx, result_rx) = async_channel::unbounded::<DecodeResult>();
        let pending = Arc::new(Mutex::new(HashSet::new()));

        for worker_id in 0..workers.max(1) {
            let rx = request_rx.clone();
            let tx = result_tx.clone();
            let pending = Arc::clone(&pending);
            let spawned = std::thread::Builder::new()
                .name(format!("folio-decode-{worker_id}"))
                .spawn(move || {
                    while let Ok(key) = rx.recv() {
                        let result = decode_job(key);
                        pending.lock().remove(&result.key);
                        if tx.send_blocking(result).is_err() {
                            break;
                        }
                    }
                    trace!(worker_id, "Decode worker exiting");
                });
            if let Err(err) = spawned {
                warn!(worker_id, %err, "Failed to spawn decode worker");
            }
        }

        let loader = Rc::new(Self {
            request_tx,
            pending,
            waiters: RefCell::new(HashMap::new()),
            cache: RefCell::new(TextureCache::new(cache_bytes)),
        });

        let loader_weak = Rc::downgrade(&loader);
        glib::spawn_future_local(async move {
            while let Ok(result) = result_rx.recv().await {
                let Some(loader) = loader_weak.upgrade() else {
                    break;
                };
                loader.finish(result);
            }
        });

        debug!(workers, cache_bytes, "Started thumbnail loader");
        loader
    }

    /// Requests a texture. `on_ready` runs on the main loop with the texture,
    /// or with `None` if the image could not be decoded.
    pub fn request(&self, key: DecodeKey, on_ready: impl FnOnce(Option<&Texture>) + 'static) {
        let cached = self.cache.borrow_mut().get(&key);
        if let Some(texture) = cached {
            trace!(path = ?key.path, "Texture cache hit");
            on_ready(Some(&texture));
            return;
        }

        self.waiters
            .borrow_mut()
            .entry(key.clone())
            .or_default()
            .push(Box::new(on_ready));

        if !self.pending.lock().insert(key.clone()) {
            return;
        }
        if let Err(err) = self.request_tx.try_send(key) {
            let key = err.into_inner();
            warn!(path = ?key.path, "Decode queue full; dropping request");
            self.pending.lock().remove(&key);
            let waiters = self.waiters.borrow_mut().remove(&key).unwrap_or_default();
            for waiter in waiters {
                waiter(None);
            }
        }
    }

    fn finish(&self, result: DecodeResult) {
        let texture = result.image.map(|image| {
            let bytes = texture_bytes(image.width, image.height);
            let texture = texture_from_decoded(image);
            self.cache
                .borrow_mut()
                .put(result.key.clone(), texture.clone(), bytes);
            texture
        });

        let waiters = self
            .waiters
            .borrow_mut()
            .remove(&result.key)
            .unwrap_or_default();
        for waiter in waiters {
            waiter(texture.as_ref());
        }
    }
}

fn decode_job(key: DecodeKey) -> DecodeResult {
    let image = match decode_rgba(&key.path, key.max_edge) {
        Ok(image) => Some(image),
        Err(err) => {
            warn!(path = ?key.path, error = %err, "Failed to decode image");
            None
        }
    };
    DecodeResult { key, image }
}

pub fn texture_from_decoded(image: DecodedImage) -> Texture {
    let stride = image.stride();
    let bytes = glib::Bytes::from_owned(image.rgba);
    MemoryTexture::new(
        image.width as i32,
        image.height as i32,
        MemoryFormat::R8g8b8a8,
        &bytes,
        stride,
    )
    .upcast()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use tempfile::tempdir;

    #[test]
    fn test_decode_job_bounds_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tall.png");
        RgbaImage::new(50, 500).save(&path).unwrap();

        let result = decode_job(DecodeKey::new(&path, 100));
        let image = result.image.unwrap();
        assert_eq!((image.width, image.height), (10, 100));
        assert_eq!(result.key.max_edge, 100);
    }

    #[test]
    fn test_decode_job_reports_failure() {
        let dir = tempdir().unwrap();
        let result = decode_job(DecodeKey::new(dir.path().join("missing.png"), 100));
        assert!(result.image.is_none());
    }
}
