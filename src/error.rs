//! Error types for the stamping engine.
//!
//! Each boundary has its own enum. Geometry violations are not errors: the
//! interaction layer simply rejects the offending frame.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the PDF backend.
#[derive(Error, Debug)]
pub enum PdfError {
    /// I/O error while reading or writing a document
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document could not be parsed or written
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Page index outside `[0, page_count)`
    #[error("Page {index} out of range (document has {count} pages)")]
    PageOutOfRange {
        /// Requested 0-based page index
        index: usize,
        /// Number of pages in the document
        count: usize,
    },

    /// Handle does not refer to an open document
    #[error("Invalid document handle: {0}")]
    InvalidHandle(u64),

    /// Overlay image could not be decoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Document structure is missing something required
    #[error("Malformed document: {message}")]
    Malformed {
        /// What is wrong
        message: String,
    },

    /// The page rasterizer failed
    #[error("Render error: {message}")]
    Render {
        /// Rasterizer message
        message: String,
    },
}

impl PdfError {
    /// Create a malformed-document error with a message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Create a rasterizer error with a message.
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }
}

/// Errors from document session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Operation requires an open document
    #[error("No document is open")]
    NoDocument,

    /// Backend failure
    #[error(transparent)]
    Pdf(#[from] PdfError),
}

/// Errors from the scaled-image cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Source bytes are not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Requested target size has a zero dimension
    #[error("Invalid target size {width}x{height}")]
    InvalidSize {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },
}

/// Reasons a drop is ignored.
#[derive(Error, Debug)]
pub enum DropError {
    /// Payload bytes are not a decodable image
    #[error("Dropped data is not a valid image: {0}")]
    InvalidImage(#[from] image::ImageError),

    /// Metadata JSON could not be parsed or is inconsistent
    #[error("Invalid drop metadata: {message}")]
    InvalidMetadata {
        /// Description of the problem
        message: String,
    },

    /// No document is open to drop onto
    #[error("No document is open")]
    NoDocument,
}

impl DropError {
    /// Create an invalid metadata error with a message.
    pub fn invalid_metadata(message: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            message: message.into(),
        }
    }
}

/// Errors from the stamp/signature library.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// I/O error on the library directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata file could not be read or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image could not be decoded or encoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// No item with this id
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Item image missing on disk
    #[error("Image file missing: {path:?}")]
    MissingFile {
        /// Expected location
        path: PathBuf,
    },

    /// Category operation not permitted
    #[error("Invalid category: {message}")]
    InvalidCategory {
        /// Description of the problem
        message: String,
    },
}

impl LibraryError {
    /// Create an invalid category error with a message.
    pub fn invalid_category(message: impl Into<String>) -> Self {
        Self::InvalidCategory {
            message: message.into(),
        }
    }
}

/// Errors from rasterizing a signature.
#[derive(Error, Debug)]
pub enum SignatureError {
    /// Nothing has been drawn
    #[error("Signature pad is empty")]
    Empty,

    /// PNG encoding failed
    #[error("Failed to encode signature: {0}")]
    Encode(#[from] image::ImageError),
}
