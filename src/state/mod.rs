//! Transient application state.

mod viewport;

pub use viewport::ViewportState;
