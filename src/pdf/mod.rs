//! PDF backend abstraction.
//!
//! The session never touches a PDF library directly. It goes through
//! [`PdfBackend`], addressing open documents by [`DocumentHandle`]. The bundled
//! [`LopdfBackend`] handles structure and image compositing; it does not
//! rasterize page content and renders pages as blank canvases of the right
//! size. Building with the `pdfium` feature adds `PdfiumBackend`, which draws
//! real page content through a PDFium library found at runtime.

mod lopdf_backend;
#[cfg(feature = "pdfium")]
mod pdfium_backend;

use std::path::Path;

use image::RgbaImage;

pub use crate::error::PdfError;
use crate::model::Rect;
pub use lopdf_backend::LopdfBackend;
#[cfg(feature = "pdfium")]
pub use pdfium_backend::PdfiumBackend;

/// Opaque handle to a document open in a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(pub u64);

impl std::fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Page dimensions in PDF points (document units).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Pixel size of the page rendered at `zoom` (at least 1×1).
    pub fn pixels_at(&self, zoom: f32) -> (u32, u32) {
        let w = (self.width * zoom).round().max(1.0) as u32;
        let h = (self.height * zoom).round().max(1.0) as u32;
        (w, h)
    }
}

/// Operations the session needs from a PDF library.
///
/// Page indices are 0-based. Document space is the page as displayed: PDF
/// points with a top-left origin, after any `/Rotate` on the page (or
/// inherited from the page tree) has been applied. [`PdfBackend::page_size`]
/// reports displayed dimensions, and rects passed to
/// [`PdfBackend::composite_image`] are in document space; implementations
/// convert to the library's own coordinate system.
pub trait PdfBackend {
    /// Open a document from disk.
    fn open(&mut self, path: &Path) -> Result<DocumentHandle, PdfError>;

    /// Open a document from an in-memory buffer.
    fn open_bytes(&mut self, bytes: &[u8]) -> Result<DocumentHandle, PdfError>;

    fn page_count(&self, doc: DocumentHandle) -> Result<usize, PdfError>;

    fn page_size(&self, doc: DocumentHandle, page: usize) -> Result<PageSize, PdfError>;

    /// Rasterize a page at `zoom`.
    fn render_page(
        &self,
        doc: DocumentHandle,
        page: usize,
        zoom: f32,
    ) -> Result<RgbaImage, PdfError>;

    /// Open an independent copy of a document.
    ///
    /// Changes to the copy never affect the original.
    fn duplicate(&mut self, doc: DocumentHandle) -> Result<DocumentHandle, PdfError>;

    /// Draw `image` onto `page`, stretched to `rect`.
    fn composite_image(
        &mut self,
        doc: DocumentHandle,
        page: usize,
        rect: Rect,
        image: &RgbaImage,
    ) -> Result<(), PdfError>;

    /// Write a document to `path`.
    fn save(&mut self, doc: DocumentHandle, path: &Path) -> Result<(), PdfError>;

    /// Release a document. Unknown handles are ignored.
    fn close(&mut self, doc: DocumentHandle);
}
