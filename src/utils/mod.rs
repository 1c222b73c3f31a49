//! Utility modules shared across the pipeline
//!
//! - Normalization: species label → species key
//! - Text wrap: ecology descriptions for hover display

pub mod normalization;
pub mod text_wrap;

// Re-export commonly used types
pub use normalization::{normalize_species_name, SpeciesKey};
pub use text_wrap::{format_ecology_for_hover, wrap_text, ECOLOGY_UNAVAILABLE, HOVER_LINE_WIDTH};
