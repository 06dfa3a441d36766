//! Global constants for the stamping engine.

/// Edge length of a resize handle square, in viewport pixels.
///
/// Handles keep this size on screen regardless of zoom.
pub const HANDLE_SIZE: f32 = 8.0;

/// Minimum annotation width/height, in viewport pixels.
///
/// Converted to document units by dividing by the current zoom.
pub const MIN_SIZE: f32 = 20.0;

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f32 = 0.1;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f32 = 5.0;

/// Zoom factor of a freshly opened document.
pub const DEFAULT_ZOOM: f32 = 1.0;

/// Multiplicative step used by zoom in/out.
pub const ZOOM_STEP: f32 = 1.2;

/// Width of a dropped stamp, in viewport pixels.
pub const DEFAULT_STAMP_WIDTH: f32 = 100.0;

/// Number of scaled bitmaps kept by the image cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Number of add/remove actions kept in undo history.
pub const DEFAULT_UNDO_HISTORY: usize = 100;

/// Channel value above which a pixel counts as near-white and is never tinted.
pub const NEAR_WHITE_THRESHOLD: u8 = 240;

/// Default signature pad canvas size (width, height) in pixels.
pub const SIGNATURE_PAD_SIZE: (u32, u32) = (400, 200);

/// Name of the category that always exists in an asset library.
pub const GENERAL_CATEGORY: &str = "General";

/// Categories created alongside a fresh stamp library.
pub const DEFAULT_STAMP_CATEGORIES: &[&str] = &["General", "Signatures", "Custom"];
