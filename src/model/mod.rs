//! Data models for stamps, signatures and their geometry.

mod annotation;
mod geometry;

pub use annotation::{Annotation, AnnotationContent, AnnotationId, AnnotationKind};
pub use geometry::{Handle, Point, Rect};
