//! Survey Matching
//!
//! Maps the user's per-plot species lists onto trait reference records.
//! One `MatchedOccurrence` is produced per (plot, label) pair whose species
//! key exists in the reference; everything else is dropped silently.

use crate::data::ReferenceIndex;
use crate::error::AnalysisError;
use crate::utils::{format_ecology_for_hover, normalize_species_name, SpeciesKey};
use serde_json::Value;

/// User-submitted relevé table
///
/// Row 0 holds plot names, later rows hold species labels. Ragged rows are
/// treated as padded with empty cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyTable {
    rows: Vec<Vec<Option<String>>>,
}

impl SurveyTable {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Build from JSON cells: strings, numbers and booleans become text, `null` is empty
    pub fn from_json_rows(rows: &[Vec<Value>]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Value::Null => None,
                        Value::String(s) => Some(s.clone()),
                        other => Some(other.to_string()),
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of plot columns (widest row)
    pub fn width(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// Display name of a plot column, falling back to "Relevé N" (1-based)
    pub fn plot_name(&self, col: usize) -> String {
        match self.cell(0, col).map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Relevé {}", col + 1),
        }
    }

    /// Non-blank, trimmed species labels of one plot column
    pub fn species_labels(&self, col: usize) -> impl Iterator<Item = &str> + '_ {
        (1..self.rows.len())
            .filter_map(move |row| self.cell(row, col))
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }
}

/// One surveyed species resolved to a trait reference record
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedOccurrence {
    /// Row of the trait reference this occurrence resolved to
    pub record_index: usize,
    pub key: SpeciesKey,
    /// Reference species label ("Espece")
    pub reference_label: String,
    pub trait_values: Vec<Option<f64>>,
    /// Plot the label came from
    pub source_habitat: String,
    /// Label as typed by the user (trimmed)
    pub raw_input: String,
    /// Hover-formatted ecology description
    pub ecology: String,
}

/// Resolve the selected plot columns against the reference
///
/// Plots are processed in selection order, labels in row order. Unmatched
/// labels are dropped; an empty result is not an error.
pub fn match_survey(
    table: &SurveyTable,
    selected_indices: &[usize],
    refs: &ReferenceIndex,
) -> Result<Vec<MatchedOccurrence>, AnalysisError> {
    if table.is_empty() || selected_indices.is_empty() {
        return Err(AnalysisError::missing_input());
    }

    let width = table.width();
    if let Some(&bad) = selected_indices.iter().find(|&&idx| idx >= width) {
        return Err(AnalysisError::Input(format!(
            "Indice de relevé {} hors limites ({} colonnes)",
            bad, width
        )));
    }

    let mut matched = Vec::new();
    let mut unmatched = 0usize;

    for &col in selected_indices {
        let habitat = table.plot_name(col);

        for raw in table.species_labels(col) {
            let Some(key) = normalize_species_name(raw) else {
                continue;
            };
            let Some(record_index) = refs.traits.lookup(&key) else {
                unmatched += 1;
                continue;
            };

            let record = refs.traits.record(record_index);
            let ecology = format_ecology_for_hover(refs.ecology.description(&key));

            matched.push(MatchedOccurrence {
                record_index,
                reference_label: record.label.clone(),
                trait_values: record.values.clone(),
                key,
                source_habitat: habitat.clone(),
                raw_input: raw.to_string(),
                ecology,
            });
        }
    }

    tracing::debug!(
        "Matched {} occurrences across {} plots ({} labels not in reference)",
        matched.len(),
        selected_indices.len(),
        unmatched
    );

    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{EcologyIndex, TraitRecord, TraitTable};
    use crate::utils::ECOLOGY_UNAVAILABLE;
    use serde_json::json;

    fn record(label: &str, values: &[f64]) -> TraitRecord {
        TraitRecord {
            label: label.to_string(),
            key: normalize_species_name(label),
            values: values.iter().map(|v| Some(*v)).collect(),
        }
    }

    fn refs() -> ReferenceIndex {
        let traits = TraitTable::new(
            "Espece",
            vec!["L".to_string(), "U".to_string()],
            vec![
                record("Quercus robur", &[6.0, 5.0]),
                record("Fagus sylvatica", &[3.0, 5.0]),
                record("Quercus robur L.", &[1.0, 1.0]),
            ],
        );
        let ecology = EcologyIndex::from_rows([("Quercus robur", Some("Chênaies"))]);
        ReferenceIndex::new(traits, ecology, Vec::new())
    }

    fn table() -> SurveyTable {
        SurveyTable::from_json_rows(&[
            vec![json!("Prairie"), json!(""), json!(null)],
            vec![json!(" Quercus  robur L. "), json!("Quercus robur"), json!("Fagus sylvatica")],
            vec![json!("Fagus sylvatica"), json!(null), json!("Unknown species")],
            vec![json!("  "), json!("Bellis perennis")],
        ])
    }

    #[test]
    fn test_match_survey_resolves_labels() {
        let refs = refs();
        let matched = match_survey(&table(), &[0, 1], &refs).unwrap();

        assert_eq!(matched.len(), 3);
        assert_eq!(matched[0].source_habitat, "Prairie");
        assert_eq!(matched[0].raw_input, "Quercus  robur L.");
        assert_eq!(matched[0].reference_label, "Quercus robur");
        assert_eq!(matched[0].record_index, 0);
        assert_eq!(matched[0].ecology, "Chênaies");

        assert_eq!(matched[1].reference_label, "Fagus sylvatica");
        assert_eq!(matched[1].ecology, ECOLOGY_UNAVAILABLE);

        // Blank header falls back to 1-based position
        assert_eq!(matched[2].source_habitat, "Relevé 2");
    }

    #[test]
    fn test_match_survey_follows_selection_order() {
        let refs = refs();
        let matched = match_survey(&table(), &[2, 0], &refs).unwrap();
        let plots: Vec<&str> = matched.iter().map(|m| m.source_habitat.as_str()).collect();
        assert_eq!(plots, vec!["Relevé 3", "Prairie", "Prairie"]);
    }

    #[test]
    fn test_match_survey_is_idempotent() {
        let refs = refs();
        let first = match_survey(&table(), &[0, 1, 2], &refs).unwrap();
        let second = match_survey(&table(), &[0, 1, 2], &refs).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_input_is_error() {
        let refs = refs();
        assert!(match_survey(&table(), &[], &refs).unwrap_err().is_input());
        assert!(match_survey(&SurveyTable::default(), &[0], &refs).unwrap_err().is_input());
        assert!(match_survey(&table(), &[7], &refs).unwrap_err().is_input());
    }

    #[test]
    fn test_only_unmatched_species_yields_empty() {
        let refs = refs();
        let survey = SurveyTable::from_json_rows(&[
            vec![json!("Friche")],
            vec![json!("Bellis perennis")],
            vec![json!("Taraxacum officinale")],
        ]);
        assert!(match_survey(&survey, &[0], &refs).unwrap().is_empty());
    }

    #[test]
    fn test_numeric_cells_become_text() {
        let survey = SurveyTable::from_json_rows(&[vec![json!(12), json!(true)]]);
        assert_eq!(survey.plot_name(0), "12");
        assert_eq!(survey.cell(0, 1), Some("true"));
        assert_eq!(survey.width(), 2);
    }
}
