//! Relevé Analysis Pipeline
//!
//! Coordinates one analysis request end to end:
//! survey table → matching → (multivariate analysis ∥ syntaxon scoring) → response.
//!
//! The two analysis branches are pure functions over the same immutable
//! matched rows and run side by side with `rayon::join`.

use crate::analysis::{analyze, Communality, Projection, TraitMatrix, DEFAULT_CLUSTERS};
use crate::data::ReferenceIndex;
use crate::error::AnalysisError;
use crate::matcher::{match_survey, MatchedOccurrence, SurveyTable};
use crate::syntaxon::{score_syntaxons, SyntaxonMatch};
use crate::utils::SpeciesKey;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde_json::Value;

/// Informational message when no surveyed species is in the reference
pub const NO_MATCH_MESSAGE: &str = "Aucune espèce correspondante trouvée dans les relevés sélectionnés.";

/// Analysis request as posted by the relevé editor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisRequest {
    /// Row 0: plot names; later rows: species labels per plot column
    #[serde(default)]
    pub releves_data: Vec<Vec<Value>>,
    /// Zero-based plot columns to analyze
    #[serde(default)]
    pub selected_indices: Vec<usize>,
}

/// Complete analysis of the selected plots
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResponse {
    /// Name of the reference species column ("Espece")
    pub species_column: String,
    /// All reference trait columns, in reference order
    pub trait_names: Vec<String>,
    pub species_data: Vec<MatchedOccurrence>,
    /// Same row order as `species_data`
    pub pca: Option<Projection>,
    /// Same row order as `species_data`, empty when not clustered
    pub cluster_labels: Vec<u32>,
    pub communalities: Vec<Communality>,
    pub top_syntaxons: Vec<SyntaxonMatch>,
}

/// Result of a request that passed input validation
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Completed(AnalysisResponse),
    /// Nothing matched: informational, not an error
    NoMatch { message: String },
}

/// Run the whole pipeline for one request
pub fn run_analysis(request: &AnalysisRequest, refs: &ReferenceIndex) -> Result<AnalysisOutcome, AnalysisError> {
    let table = SurveyTable::from_json_rows(&request.releves_data);
    let species_data = match_survey(&table, &request.selected_indices, refs)?;

    if species_data.is_empty() {
        tracing::info!("No surveyed species matched the reference");
        return Ok(AnalysisOutcome::NoMatch {
            message: NO_MATCH_MESSAGE.to_string(),
        });
    }

    let (multivariate, top_syntaxons) = rayon::join(
        || {
            let matrix = TraitMatrix::from_occurrences(&species_data, refs.traits.trait_names());
            analyze(&matrix, DEFAULT_CLUSTERS)
        },
        || score_syntaxons(&surveyed_species(&species_data), &refs.syntaxons),
    );

    tracing::info!(
        "Analysis complete: {} occurrences, {} communalities, {} syntaxon matches",
        species_data.len(),
        multivariate.communalities.len(),
        top_syntaxons.len()
    );

    Ok(AnalysisOutcome::Completed(AnalysisResponse {
        species_column: refs.traits.species_column().to_string(),
        trait_names: refs.traits.trait_names().to_vec(),
        species_data,
        pca: multivariate.projection,
        cluster_labels: multivariate.cluster_labels,
        communalities: multivariate.communalities,
        top_syntaxons,
    }))
}

/// Distinct species keys among the matched rows
pub fn surveyed_species(occurrences: &[MatchedOccurrence]) -> FxHashSet<SpeciesKey> {
    occurrences.iter().map(|occ| occ.key.clone()).collect()
}
