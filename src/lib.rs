//! Relevé Analyzer
//!
//! Botanical survey analysis: surveyed species lists are matched against a
//! trait reference, analysed (standardization, Ward clustering, PCA,
//! communalities) and scored against reference plant communities (syntaxons).
//!
//! Module layout:
//! - `utils/`: species name normalization and text formatting
//! - `data`: reference table loading (Polars)
//! - `matcher`: survey → matched occurrences
//! - `analysis/`: multivariate analysis
//! - `syntaxon`: community overlap ranking
//! - `pipeline`: end-to-end request processing
//! - `encoder`: JSON output boundary
//! - `api_server` / `reference_store`: HTTP surface (feature `api`)

pub mod utils;
pub mod error;
pub mod data;
pub mod matcher;
pub mod analysis;
pub mod syntaxon;
pub mod pipeline;
pub mod encoder;

#[cfg(feature = "api")]
pub mod reference_store;
#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use utils::{normalize_species_name, SpeciesKey};
pub use error::AnalysisError;
pub use data::{ReferenceIndex, ReferencePaths};
pub use pipeline::{run_analysis, AnalysisOutcome, AnalysisRequest, AnalysisResponse};
pub use encoder::{JsonEncoder, ResponseEncoder};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
