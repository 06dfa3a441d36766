//! Annotation types: placed stamps and signatures.

use serde::{Deserialize, Serialize};

use super::geometry::{Point, Rect};
use crate::color::TintColor;

/// Stable handle to an annotation in the store arena.
///
/// Handles are never reused, so a stale handle simply fails to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnnotationId(pub u64);

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an overlay represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    #[default]
    Stamp,
    Signature,
}

impl AnnotationKind {
    /// Get the display name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationKind::Stamp => "Stamp",
            AnnotationKind::Signature => "Signature",
        }
    }
}

/// Bitmap payload of an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationContent {
    /// Encoded image (PNG/JPEG) as dropped or loaded from the library.
    #[serde(skip)]
    pub image_bytes: Vec<u8>,
    /// Name shown in hover tooltips.
    pub display_name: String,
    /// `original_width / original_height`, fixed at creation.
    pub aspect_ratio: f32,
    /// Optional recolor applied when rendering and flattening.
    #[serde(default)]
    pub tint: Option<TintColor>,
}

impl AnnotationContent {
    pub fn new(image_bytes: Vec<u8>, display_name: impl Into<String>, aspect_ratio: f32) -> Self {
        Self {
            image_bytes,
            display_name: display_name.into(),
            aspect_ratio,
            tint: None,
        }
    }

    pub fn with_tint(mut self, tint: Option<TintColor>) -> Self {
        self.tint = tint;
        self
    }
}

/// A stamp or signature placed on a page.
///
/// `rect` is in document space: the page's native units, independent of zoom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub rect: Rect,
    pub page: usize,
    pub content: AnnotationContent,
}

impl Annotation {
    /// Create a new annotation.
    pub fn new(kind: AnnotationKind, rect: Rect, page: usize, content: AnnotationContent) -> Self {
        Self {
            kind,
            rect,
            page,
            content,
        }
    }

    /// Create an annotation whose height follows from `width` and the aspect ratio.
    pub fn sized_from_width(
        kind: AnnotationKind,
        top_left: Point,
        width: f32,
        page: usize,
        content: AnnotationContent,
    ) -> Self {
        let height = width / content.aspect_ratio;
        let rect = Rect::from_xywh(top_left.x, top_left.y, width, height);
        Self::new(kind, rect, page, content)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.content.aspect_ratio
    }

    pub fn display_name(&self) -> &str {
        &self.content.display_name
    }

    /// Check if a document-space point lies on this annotation.
    pub fn contains(&self, point: Point) -> bool {
        self.rect.contains(point)
    }
}
