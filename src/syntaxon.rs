//! Syntaxon Scoring
//!
//! Ranks reference plant communities by how many of their characteristic
//! species were found in the survey.

use crate::data::Syntaxon;
use crate::utils::SpeciesKey;
use rustc_hash::FxHashSet;
use serde::Serialize;

/// Number of best-matching syntaxons returned
pub const TOP_SYNTAXONS: usize = 5;

/// One syntaxon with at least one species in common with the survey
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxonMatch {
    pub id: String,
    pub name_latin: String,
    /// Size of the intersection
    pub score: usize,
    /// Syntaxon species found in the survey (sorted)
    pub common_species: Vec<SpeciesKey>,
    /// Syntaxon species missing from the survey (sorted)
    pub absent_species: Vec<SpeciesKey>,
}

/// Score every syntaxon against the surveyed species set
///
/// Syntaxons without overlap are excluded. Ties keep the reference order.
pub fn score_syntaxons(species: &FxHashSet<SpeciesKey>, syntaxons: &[Syntaxon]) -> Vec<SyntaxonMatch> {
    let mut matches: Vec<SyntaxonMatch> = syntaxons
        .iter()
        .filter_map(|syntaxon| {
            let (common_species, absent_species): (Vec<SpeciesKey>, Vec<SpeciesKey>) = syntaxon
                .species
                .iter()
                .cloned()
                .partition(|key| species.contains(key));

            if common_species.is_empty() {
                return None;
            }

            Some(SyntaxonMatch {
                id: syntaxon.id.clone(),
                name_latin: syntaxon.name_latin.clone(),
                score: common_species.len(),
                common_species,
                absent_species,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches.truncate(TOP_SYNTAXONS);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::normalize_species_name;
    use std::collections::BTreeSet;

    fn key(label: &str) -> SpeciesKey {
        normalize_species_name(label).unwrap()
    }

    fn syntaxon(id: &str, species: &[&str]) -> Syntaxon {
        Syntaxon {
            id: id.to_string(),
            name_latin: format!("{} name", id),
            species: species.iter().map(|s| key(s)).collect(),
        }
    }

    fn survey(species: &[&str]) -> FxHashSet<SpeciesKey> {
        species.iter().map(|s| key(s)).collect()
    }

    #[test]
    fn test_ranking_by_overlap_with_stable_ties() {
        let syntaxons = vec![
            syntaxon("A", &["Quercus robur", "Carpinus betulus"]),
            syntaxon("B", &["Quercus robur", "Fagus sylvatica", "Ilex aquifolium"]),
            syntaxon("C", &["Bellis perennis"]),
            syntaxon("D", &["Fagus sylvatica"]),
        ];
        let found = survey(&["Quercus robur", "Fagus sylvatica"]);
        let ranked = score_syntaxons(&found, &syntaxons);

        let ids: Vec<&str> = ranked.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "D"]);
        assert_eq!(ranked[0].score, 2);
        assert_eq!(ranked[0].common_species, vec![key("fagus sylvatica"), key("quercus robur")]);
        assert_eq!(ranked[0].absent_species, vec![key("ilex aquifolium")]);
    }

    #[test]
    fn test_no_zero_overlap_and_partition_is_complete() {
        let syntaxons: Vec<Syntaxon> = (0..8)
            .map(|i| {
                if i % 2 == 0 {
                    syntaxon(&format!("S{}", i), &["Quercus robur", "Hedera helix", "Rubus fruticosus"])
                } else {
                    syntaxon(&format!("S{}", i), &["Bellis perennis"])
                }
            })
            .collect();
        let found = survey(&["Quercus robur", "Hedera helix"]);
        let ranked = score_syntaxons(&found, &syntaxons);

        assert_eq!(ranked.len(), 4);
        for m in &ranked {
            assert!(m.score > 0);
            let source = syntaxons.iter().find(|s| s.id == m.id).unwrap();
            let union: BTreeSet<SpeciesKey> = m
                .common_species
                .iter()
                .chain(&m.absent_species)
                .cloned()
                .collect();
            assert_eq!(union, source.species);
        }
    }

    #[test]
    fn test_top_five_only() {
        let syntaxons: Vec<Syntaxon> = (0..9)
            .map(|i| syntaxon(&format!("S{}", i), &["Quercus robur"]))
            .collect();
        let ranked = score_syntaxons(&survey(&["Quercus robur"]), &syntaxons);
        let ids: Vec<&str> = ranked.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["S0", "S1", "S2", "S3", "S4"]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(score_syntaxons(&FxHashSet::default(), &[syntaxon("A", &["Quercus robur"])]).is_empty());
        assert!(score_syntaxons(&survey(&["Quercus robur"]), &[]).is_empty());
    }
}
