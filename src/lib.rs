//! Stampdesk - PDF stamp and signature placement
//!
//! An engine for placing image stamps and signatures on PDF pages: an
//! annotation store with undo, zoom-aware move/resize interaction, frame
//! composition for a host UI, drag-and-drop ingestion, a persistent asset
//! library, and flattening the result into a new PDF.
//!
//! The host owns the window and event loop. It feeds pointer input into a
//! [`DocumentSession`], blits the [`Frame`]s it gets back, and subscribes to
//! [`SessionEvent`]s for status updates.

pub mod color;
pub mod config;
pub mod constants;
pub mod drop;
pub mod error;
pub mod image_cache;
pub mod interaction;
pub mod library;
pub mod model;
pub mod pdf;
pub mod render;
pub mod session;
pub mod signature_pad;
pub mod state;
pub mod store;
pub mod transform;
pub mod undo;

#[cfg(test)]
mod test_image;

pub use color::TintColor;
pub use config::AppConfig;
pub use drop::{DragPayload, DropMetadata, DropOutcome, Dropped};
pub use library::{Library, LibraryItem};
pub use model::{Annotation, AnnotationContent, AnnotationId, AnnotationKind, Handle, Point, Rect};
pub use pdf::{LopdfBackend, PdfBackend};
pub use render::{Frame, Label, Renderer};
pub use session::{DocumentSession, SessionEvent, SessionOptions};
pub use signature_pad::SignaturePad;
