//! Species Name Normalization
//!
//! Reduces free-text species labels to a comparable key: genus + epithet,
//! lowercase, single-space joined. Authorities, subspecies and varieties are
//! discarded, so "Quercus  robur L." and "quercus robur" share one key.
//!
//! Used by every dataset join (trait reference, ecology, syntaxons, survey).

use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;

/// Normalized genus + epithet identity used for all species joins
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SpeciesKey(String);

impl SpeciesKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeciesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SpeciesKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Normalize a species label to its key
///
/// Algorithm:
/// 1. Trim and split on any run of whitespace
/// 2. Keep the first two tokens (a single token is kept alone)
/// 3. Lowercase and join with one space
///
/// Returns `None` for empty or all-whitespace input.
pub fn normalize_species_name(label: &str) -> Option<SpeciesKey> {
    let tokens: Vec<&str> = label.split_whitespace().take(2).collect();
    if tokens.is_empty() {
        return None;
    }

    Some(SpeciesKey(tokens.join(" ").to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(label: &str) -> Option<String> {
        normalize_species_name(label).map(|k| k.to_string())
    }

    #[test]
    fn test_authority_and_spacing_collapse() {
        assert_eq!(key("Quercus  robur L."), Some("quercus robur".to_string()));
        assert_eq!(key("quercus robur"), Some("quercus robur".to_string()));
        assert_eq!(key("  QUERCUS\trobur  "), Some("quercus robur".to_string()));
        assert_eq!(
            key("Festuca rubra subsp. commutata Gaudin"),
            Some("festuca rubra".to_string())
        );
    }

    #[test]
    fn test_single_token_kept_alone() {
        assert_eq!(key("Carex"), Some("carex".to_string()));
    }

    #[test]
    fn test_blank_is_absent() {
        assert_eq!(key(""), None);
        assert_eq!(key("   \t\n"), None);
    }

    #[test]
    fn test_accented_labels_lowercase() {
        assert_eq!(key("Érable Champêtre"), Some("érable champêtre".to_string()));
    }
}
