//! Response Encoding
//!
//! Output boundary turning typed analysis results into plain JSON: floats
//! become JSON numbers (non-finite values become `null`), matrices become
//! arrays of records. Swappable through [`ResponseEncoder`].

use crate::pipeline::{AnalysisOutcome, AnalysisResponse};
use anyhow::{Context, Result};
use serde_json::{json, Map, Number, Value};

pub const SOURCE_HABITAT_FIELD: &str = "Source_Habitat";
pub const RAW_INPUT_FIELD: &str = "Espece_User_Input_Raw";
pub const ECOLOGY_FIELD: &str = "Ecologie";

/// Converts analysis results into a JSON payload
pub trait ResponseEncoder: Send + Sync {
    fn encode(&self, response: &AnalysisResponse) -> Result<Value>;

    /// Encode any successful outcome (completed analysis or no-match message)
    fn encode_outcome(&self, outcome: &AnalysisOutcome) -> Result<Value> {
        match outcome {
            AnalysisOutcome::Completed(response) => self.encode(response),
            AnalysisOutcome::NoMatch { message } => Ok(json!({ "message": message })),
        }
    }
}

/// Default encoder producing the record-oriented layout used by the plotting front end
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl ResponseEncoder for JsonEncoder {
    fn encode(&self, response: &AnalysisResponse) -> Result<Value> {
        let species_data: Vec<Value> = response
            .species_data
            .iter()
            .map(|occ| {
                let mut row = Map::new();
                row.insert(response.species_column.clone(), Value::from(occ.reference_label.as_str()));
                for (name, value) in response.trait_names.iter().zip(&occ.trait_values) {
                    row.insert(name.clone(), value.map_or(Value::Null, number));
                }
                row.insert(SOURCE_HABITAT_FIELD.to_string(), Value::from(occ.source_habitat.as_str()));
                row.insert(RAW_INPUT_FIELD.to_string(), Value::from(occ.raw_input.as_str()));
                row.insert(ECOLOGY_FIELD.to_string(), Value::from(occ.ecology.as_str()));
                Value::Object(row)
            })
            .collect();

        let pca_coords: Vec<Value> = match &response.pca {
            Some(projection) => projection
                .coords
                .iter()
                .map(|coords| {
                    let record: Map<String, Value> = projection
                        .component_names
                        .iter()
                        .zip(coords)
                        .map(|(name, v)| (name.clone(), number(*v)))
                        .collect();
                    Value::Object(record)
                })
                .collect(),
            None => Vec::new(),
        };

        Ok(json!({
            "species_data": species_data,
            "pca_coords": pca_coords,
            "cluster_labels": response.cluster_labels,
            "communalities": serde_json::to_value(&response.communalities)
                .context("Failed to encode communalities")?,
            "top_syntaxons": serde_json::to_value(&response.top_syntaxons)
                .context("Failed to encode syntaxon matches")?,
        }))
    }
}

fn number(v: f64) -> Value {
    Number::from_f64(v).map_or(Value::Null, Value::Number)
}
