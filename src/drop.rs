//! Drag-and-drop ingestion.
//!
//! Two kinds of drops reach the page view: PDF documents (files or raw PDF
//! data) which replace the open document, and stamp/signature payloads
//! dragged from the library, which become new annotations at the drop point.

use std::path::{Path, PathBuf};

use image::GenericImageView;
use serde::{Deserialize, Serialize};

use crate::color::TintColor;
use crate::error::DropError;
use crate::model::{Annotation, AnnotationContent, AnnotationId, AnnotationKind, Point};
use crate::pdf::PdfBackend;
use crate::session::DocumentSession;
use crate::transform::{min_document_size, to_document};

/// MIME type carrying [`DropMetadata`] JSON alongside a dragged image.
pub const STAMP_METADATA_MIME: &str = "application/x-stamp-metadata";

/// MIME types under which applications hand over raw PDF data.
pub const PDF_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/x-pdf",
    "application/acrobat",
    "application/vnd.pdf",
    "text/pdf",
    "text/x-pdf",
    "application/x-acrobat",
    "application/vnd.adobe.pdf",
    "application/vnd.adobe.acrobat",
    "application/force-download",
];

/// Metadata attached to a dragged stamp or signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropMetadata {
    pub aspect_ratio: f32,
    pub original_width: u32,
    pub original_height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tint_color: Option<TintColor>,
}

impl DropMetadata {
    /// Parse and validate metadata JSON.
    pub fn parse(json: &str) -> Result<Self, DropError> {
        let metadata: Self =
            serde_json::from_str(json).map_err(|e| DropError::invalid_metadata(e.to_string()))?;
        if !(metadata.aspect_ratio.is_finite() && metadata.aspect_ratio > 0.0) {
            return Err(DropError::invalid_metadata(format!(
                "aspect_ratio must be positive, got {}",
                metadata.aspect_ratio
            )));
        }
        Ok(metadata)
    }

    pub fn to_json(&self) -> String {
        // Plain data with string keys; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A stamp or signature being dragged onto the page.
#[derive(Debug, Clone, PartialEq)]
pub struct DragPayload {
    pub kind: AnnotationKind,
    /// Encoded image (PNG/JPEG)
    pub image_bytes: Vec<u8>,
    pub display_name: String,
    /// [`DropMetadata`] as JSON, if the source provided it
    pub metadata: Option<String>,
}

impl DragPayload {
    pub fn new(kind: AnnotationKind, image_bytes: Vec<u8>, display_name: impl Into<String>) -> Self {
        Self {
            kind,
            image_bytes,
            display_name: display_name.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: &DropMetadata) -> Self {
        self.metadata = Some(metadata.to_json());
        self
    }
}

/// Something released over the page view.
#[derive(Debug, Clone, Copy)]
pub enum Dropped<'a> {
    /// Local files (e.g. from a file manager)
    Files(&'a [PathBuf]),
    /// Raw data under a MIME type
    Data { mime_type: &'a str, bytes: &'a [u8] },
    /// A library item
    Payload(&'a DragPayload),
}

/// What a drop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    DocumentOpened { page_count: usize },
    AnnotationPlaced(AnnotationId),
    Ignored,
}

/// Whether a dropped file should be opened as a document.
pub fn accepts_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Whether raw data under `mime_type` is a PDF.
pub fn is_pdf_mime(mime_type: &str) -> bool {
    PDF_MIME_TYPES
        .iter()
        .any(|m| m.eq_ignore_ascii_case(mime_type.trim()))
}

/// Whether the view should accept a drag hovering with this content.
pub fn accepts(dropped: Dropped<'_>) -> bool {
    match dropped {
        Dropped::Files(paths) => paths.iter().any(|p| accepts_file(p)),
        Dropped::Data { mime_type, .. } => is_pdf_mime(mime_type),
        Dropped::Payload(_) => true,
    }
}

/// Turn a payload into an annotation at viewport position `pos`.
///
/// The annotation's top-left corner lands at the drop point. Its width is the
/// configured stamp width in viewport pixels, its height follows from the
/// aspect ratio: from metadata when present, otherwise from the image's
/// pixel dimensions. Very wide or tall images are enlarged until both sides
/// reach the minimum annotation size.
pub fn ingest<B: PdfBackend>(
    payload: &DragPayload,
    pos: Point,
    session: &mut DocumentSession<B>,
) -> Result<AnnotationId, DropError> {
    if !session.is_open() {
        return Err(DropError::NoDocument);
    }

    let image = image::load_from_memory(&payload.image_bytes)?;
    let metadata = payload
        .metadata
        .as_deref()
        .map(DropMetadata::parse)
        .transpose()?;

    let (aspect_ratio, tint) = match metadata {
        Some(m) => (m.aspect_ratio, m.tint_color),
        None => {
            let (w, h) = image.dimensions();
            if w == 0 || h == 0 {
                return Err(DropError::invalid_metadata("image has no pixels"));
            }
            (w as f32 / h as f32, None)
        }
    };

    // Grow past the minimum size on whichever side would fall below it
    let zoom = session.zoom();
    let min_size = min_document_size(zoom);
    let width = (session.options().default_stamp_width / zoom)
        .max(min_size)
        .max(min_size * aspect_ratio);
    let content = AnnotationContent::new(
        payload.image_bytes.clone(),
        payload.display_name.clone(),
        aspect_ratio,
    )
    .with_tint(tint);
    let annotation = Annotation::sized_from_width(
        payload.kind,
        to_document(pos, zoom),
        width,
        session.current_page(),
        content,
    );

    let id = session
        .add_annotation(annotation)
        .ok_or(DropError::NoDocument)?;
    log::info!(
        "🎯 Dropped {} '{}' as {}",
        payload.kind.name(),
        payload.display_name,
        id
    );
    Ok(id)
}

/// Handle any drop. Failures are logged and reported as [`DropOutcome::Ignored`].
pub fn handle_drop<B: PdfBackend>(
    session: &mut DocumentSession<B>,
    dropped: Dropped<'_>,
    pos: Point,
) -> DropOutcome {
    match dropped {
        Dropped::Files(paths) => {
            for path in paths.iter().filter(|p| accepts_file(p)) {
                match session.open(path) {
                    Ok(page_count) => return DropOutcome::DocumentOpened { page_count },
                    Err(e) => log::warn!("⚠️ Could not open dropped {}: {}", path.display(), e),
                }
            }
            DropOutcome::Ignored
        }
        Dropped::Data { mime_type, bytes } if is_pdf_mime(mime_type) => {
            match session.open_bytes(bytes) {
                Ok(page_count) => DropOutcome::DocumentOpened { page_count },
                Err(e) => {
                    log::warn!("⚠️ Could not open dropped PDF data: {}", e);
                    DropOutcome::Ignored
                }
            }
        }
        Dropped::Data { mime_type, .. } => {
            log::debug!("Ignoring drop of {}", mime_type);
            DropOutcome::Ignored
        }
        Dropped::Payload(payload) => match ingest(payload, pos, session) {
            Ok(id) => DropOutcome::AnnotationPlaced(id),
            Err(e) => {
                log::warn!("⚠️ Drop ignored: {}", e);
                DropOutcome::Ignored
            }
        },
    }
}
