//! Scaled and tinted overlay bitmaps.
//!
//! Rendering an annotation needs its image at the annotation's current
//! viewport size, optionally recolored. Both steps are comparatively slow, so
//! results are memoized by `(content hash, width, height, tint)`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::color::{TintColor, apply_tint, effective_tint};
use crate::constants::DEFAULT_CACHE_CAPACITY;
use crate::error::CacheError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    content: [u8; 32],
    width: u32,
    height: u32,
    tint: Option<TintColor>,
}

/// Bounded memo of scaled (and tinted) images.
///
/// When full, the oldest insertion is evicted; lookups do not refresh age.
#[derive(Debug)]
pub struct ImageCache {
    capacity: usize,
    entries: HashMap<CacheKey, Arc<RgbaImage>>,
    /// Keys in insertion order, oldest first
    order: VecDeque<CacheKey>,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ImageCache {
    /// Create a cache holding at most `capacity` images (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached image.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("🧹 Image cache cleared ({} entries)", self.entries.len());
        }
        self.entries.clear();
        self.order.clear();
    }

    /// Get `bytes` decoded, resized to `width`×`height` and tinted.
    ///
    /// `None` and the default tint both mean "resize only".
    pub fn get(
        &mut self,
        bytes: &[u8],
        width: u32,
        height: u32,
        tint: Option<TintColor>,
    ) -> Result<Arc<RgbaImage>, CacheError> {
        if width == 0 || height == 0 {
            return Err(CacheError::InvalidSize { width, height });
        }

        let tint = effective_tint(tint);
        let key = CacheKey {
            content: *blake3::hash(bytes).as_bytes(),
            width,
            height,
            tint,
        };

        if let Some(image) = self.entries.get(&key) {
            return Ok(Arc::clone(image));
        }

        let image = Arc::new(scale_image(bytes, width, height, tint).inspect_err(|e| {
            log::warn!("⚠️ Could not prepare overlay image: {}", e);
        })?);
        self.insert(key, Arc::clone(&image));
        Ok(image)
    }

    fn insert(&mut self, key: CacheKey, image: Arc<RgbaImage>) {
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        self.entries.insert(key, image);
        self.order.push_back(key);
    }
}

/// Decode, resize with Lanczos3, then tint. Uncached.
pub fn scale_image(
    bytes: &[u8],
    width: u32,
    height: u32,
    tint: Option<TintColor>,
) -> Result<RgbaImage, CacheError> {
    let decoded = image::load_from_memory(bytes)?.to_rgba8();
    let mut scaled = if decoded.dimensions() == (width, height) {
        decoded
    } else {
        imageops::resize(&decoded, width, height, FilterType::Lanczos3)
    };
    if let Some(tint) = effective_tint(tint) {
        apply_tint(&mut scaled, tint);
    }
    Ok(scaled)
}
