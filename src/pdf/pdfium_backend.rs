//! [`PdfBackend`] that rasterizes pages with PDFium.
//!
//! Document structure, compositing and saving stay with [`LopdfBackend`].
//! PDFium only draws pixels, from a serialized snapshot of each document that
//! is refreshed whenever an image is composited.

use std::collections::HashMap;
use std::path::Path;

use image::RgbaImage;
use image::imageops::{self, FilterType};
use pdfium_render::prelude::*;

use super::{DocumentHandle, LopdfBackend, PageSize, PdfBackend};
use crate::error::PdfError;
use crate::model::Rect;

/// PDFium rasterizer over an [`LopdfBackend`] document store.
pub struct PdfiumBackend {
    pdfium: Pdfium,
    structure: LopdfBackend,
    snapshots: HashMap<DocumentHandle, Vec<u8>>,
}

impl PdfiumBackend {
    /// Bind to a PDFium library next to the executable, in the working
    /// directory, or on the system library path, in that order.
    pub fn bind() -> Result<Self, PdfError> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|path| path.parent().map(Path::to_path_buf));
        let bindings = exe_dir
            .ok_or(())
            .and_then(|dir| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
                    .map_err(|_| ())
            })
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            })
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| PdfError::render(format!("could not load PDFium: {e}")))?;
        log::info!("🖨️ PDFium bound for page rendering");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            structure: LopdfBackend::new(),
            snapshots: HashMap::new(),
        })
    }

    fn snapshot(&self, doc: DocumentHandle) -> Result<&[u8], PdfError> {
        self.snapshots
            .get(&doc)
            .map(Vec::as_slice)
            .ok_or(PdfError::InvalidHandle(doc.0))
    }
}

impl std::fmt::Debug for PdfiumBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumBackend")
            .field("structure", &self.structure)
            .field("snapshots", &self.snapshots.len())
            .finish_non_exhaustive()
    }
}

impl PdfBackend for PdfiumBackend {
    fn open(&mut self, path: &Path) -> Result<DocumentHandle, PdfError> {
        let bytes = std::fs::read(path)?;
        let handle = self.structure.open_bytes(&bytes)?;
        self.snapshots.insert(handle, bytes);
        log::info!("📄 Opened {} as {}", path.display(), handle);
        Ok(handle)
    }

    fn open_bytes(&mut self, bytes: &[u8]) -> Result<DocumentHandle, PdfError> {
        let handle = self.structure.open_bytes(bytes)?;
        self.snapshots.insert(handle, bytes.to_vec());
        Ok(handle)
    }

    fn page_count(&self, doc: DocumentHandle) -> Result<usize, PdfError> {
        self.structure.page_count(doc)
    }

    fn page_size(&self, doc: DocumentHandle, page: usize) -> Result<PageSize, PdfError> {
        self.structure.page_size(doc, page)
    }

    fn render_page(
        &self,
        doc: DocumentHandle,
        page: usize,
        zoom: f32,
    ) -> Result<RgbaImage, PdfError> {
        let (width, height) = self.structure.page_size(doc, page)?.pixels_at(zoom);
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(self.snapshot(doc)?, None)
            .map_err(|e| PdfError::render(e.to_string()))?;
        let index = u16::try_from(page)
            .map_err(|_| PdfError::render(format!("page index {page} too large")))?;
        let pdf_page = document
            .pages()
            .get(index)
            .map_err(|e| PdfError::render(e.to_string()))?;

        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_target_height(height as i32);
        let bitmap = pdf_page
            .render_with_config(&config)
            .map_err(|e| PdfError::render(e.to_string()))?;

        let (bitmap_width, bitmap_height) = (bitmap.width() as u32, bitmap.height() as u32);
        let image = RgbaImage::from_raw(bitmap_width, bitmap_height, bitmap.as_rgba_bytes())
            .ok_or_else(|| PdfError::render("bitmap size does not match its pixel data"))?;
        if image.dimensions() == (width, height) {
            Ok(image)
        } else {
            // PDFium keeps the page aspect ratio; stretch to the exact canvas
            Ok(imageops::resize(&image, width, height, FilterType::Triangle))
        }
    }

    fn duplicate(&mut self, doc: DocumentHandle) -> Result<DocumentHandle, PdfError> {
        let snapshot = self.snapshot(doc)?.to_vec();
        let copy = self.structure.duplicate(doc)?;
        self.snapshots.insert(copy, snapshot);
        Ok(copy)
    }

    fn composite_image(
        &mut self,
        doc: DocumentHandle,
        page: usize,
        rect: Rect,
        image: &RgbaImage,
    ) -> Result<(), PdfError> {
        self.structure.composite_image(doc, page, rect, image)?;
        let snapshot = self.structure.to_bytes(doc)?;
        self.snapshots.insert(doc, snapshot);
        Ok(())
    }

    fn save(&mut self, doc: DocumentHandle, path: &Path) -> Result<(), PdfError> {
        self.structure.save(doc, path)
    }

    fn close(&mut self, doc: DocumentHandle) {
        self.structure.close(doc);
        self.snapshots.remove(&doc);
    }
}
