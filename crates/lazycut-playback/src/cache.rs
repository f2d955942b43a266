//! Rendered-frame cache with temporal quantization.
//!
//! Positions are snapped down to the start of their frame before keying, so
//! requests that differ only by sub-frame jitter share one entry.

use lazycut_core::{FrameRate, QualityPreset, RationalTime, TextFrame};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use tracing::debug;

/// Capacity used when zero is requested.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Exact-match key after quantization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub position: RationalTime,
    pub width: u32,
    pub height: u32,
    pub quality: QualityPreset,
}

struct CacheInner {
    frames: LruCache<CacheKey, TextFrame>,
    fps: FrameRate,
}

/// Thread-safe LRU frame cache. One lock covers lookups, promotions and
/// inserts.
pub struct FrameCache {
    inner: Mutex<CacheInner>,
}

impl FrameCache {
    /// Create a cache holding at most `capacity` frames, quantizing at `fps`.
    pub fn new(capacity: usize, fps: FrameRate) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        debug!(capacity, %fps, "FrameCache created");
        Self {
            inner: Mutex::new(CacheInner {
                frames: LruCache::new(capacity),
                fps,
            }),
        }
    }

    fn key(fps: FrameRate, position: RationalTime, width: u32, height: u32, quality: QualityPreset) -> CacheKey {
        CacheKey {
            position: position.quantize(fps),
            width,
            height,
            quality,
        }
    }

    /// Look up a frame, promoting it to most recently used on hit.
    pub fn get(
        &self,
        position: RationalTime,
        width: u32,
        height: u32,
        quality: QualityPreset,
    ) -> Option<TextFrame> {
        let mut inner = self.inner.lock();
        let key = Self::key(inner.fps, position, width, height, quality);
        inner.frames.get(&key).cloned()
    }

    /// Insert or overwrite a frame. A new key evicts the least recently used
    /// entry when full; an existing key is promoted in place.
    pub fn put(
        &self,
        position: RationalTime,
        width: u32,
        height: u32,
        quality: QualityPreset,
        frame: TextFrame,
    ) {
        let mut inner = self.inner.lock();
        let key = Self::key(inner.fps, position, width, height, quality);
        if let Some((evicted, _)) = inner.frames.push(key, frame) {
            if evicted != key {
                debug!(position = %evicted.position, "LRU evicted frame");
            }
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.inner.lock().frames.clear();
    }

    /// Change quantization for subsequent operations. Existing entries keep
    /// the keys they were stored under.
    pub fn set_frame_rate(&self, fps: FrameRate) {
        self.inner.lock().fps = fps;
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.inner.lock().fps
    }

    pub fn len(&self) -> usize {
        self.inner.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().frames.cap().get()
    }

    /// True if a frame is cached for the key, without touching recency.
    pub fn contains(
        &self,
        position: RationalTime,
        width: u32,
        height: u32,
        quality: QualityPreset,
    ) -> bool {
        let inner = self.inner.lock();
        let key = Self::key(inner.fps, position, width, height, quality);
        inner.frames.contains(&key)
    }
}
