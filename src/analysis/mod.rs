//! Multivariate analysis of the matched trait matrix
//!
//! Steps, in order:
//! 1. `standardize`: z-scores per trait column
//! 2. `clustering`: Ward hierarchical clustering cut to k groups
//! 3. `pca`: projection onto the first two principal components
//! 4. communalities of every retained trait
//!
//! Degenerate inputs (no rows, no usable columns, fewer rows than clusters)
//! yield partial results, never errors.

pub mod clustering;
pub mod pca;
pub mod standardize;

pub use clustering::{cut_tree, ward_clusters, ward_linkage, Merge};
pub use pca::{fit_pca, rank_communalities, Communality, PcaModel};
pub use standardize::standardize;

use crate::matcher::MatchedOccurrence;
use nalgebra::DMatrix;

/// Number of flat clusters cut from the dendrogram
pub const DEFAULT_CLUSTERS: usize = 3;

/// Maximum number of principal components kept
pub const MAX_COMPONENTS: usize = 2;

/// Occurrences × numeric traits
#[derive(Debug, Clone, PartialEq)]
pub struct TraitMatrix {
    /// Retained trait names, in reference column order
    pub columns: Vec<String>,
    pub data: DMatrix<f64>,
}

impl TraitMatrix {
    /// Build the numeric matrix for the matched rows
    ///
    /// Traits missing for every matched row are dropped; remaining missing
    /// cells are filled with 0.
    pub fn from_occurrences(occurrences: &[MatchedOccurrence], trait_names: &[String]) -> Self {
        let retained: Vec<usize> = (0..trait_names.len())
            .filter(|&j| {
                occurrences
                    .iter()
                    .any(|occ| occ.trait_values.get(j).copied().flatten().is_some())
            })
            .collect();

        let data = DMatrix::from_fn(occurrences.len(), retained.len(), |i, c| {
            occurrences[i].trait_values.get(retained[c]).copied().flatten().unwrap_or(0.0)
        });

        Self {
            columns: retained.iter().map(|&j| trait_names[j].clone()).collect(),
            data,
        }
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }
}

/// Principal component coordinates for each matched row
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// PC1, PC2, ...
    pub component_names: Vec<String>,
    /// One coordinate vector per row, same order as the matched rows
    pub coords: Vec<Vec<f64>>,
}

/// Output of [`analyze`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultivariateResult {
    /// One label (≥ 1) per row, or empty when rows < clusters
    pub cluster_labels: Vec<u32>,
    pub projection: Option<Projection>,
    /// Highest communality first
    pub communalities: Vec<Communality>,
}

/// Standardize, cluster, project and compute communalities
pub fn analyze(matrix: &TraitMatrix, n_clusters: usize) -> MultivariateResult {
    if matrix.nrows() == 0 || matrix.ncols() == 0 {
        tracing::debug!(
            "Skipping multivariate analysis ({} rows × {} usable traits)",
            matrix.nrows(),
            matrix.ncols()
        );
        return MultivariateResult::default();
    }

    let z = standardize(&matrix.data);
    let cluster_labels = ward_clusters(&z, n_clusters);

    let Some(pca) = fit_pca(&z, MAX_COMPONENTS.min(matrix.ncols())) else {
        return MultivariateResult {
            cluster_labels,
            ..Default::default()
        };
    };

    let coords = pca
        .scores
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect();
    let communalities = rank_communalities(&matrix.columns, &pca.communality_percents());

    tracing::debug!(
        "Multivariate analysis: {} rows, {} traits, {} components, {} clusters",
        matrix.nrows(),
        matrix.ncols(),
        pca.n_components(),
        cluster_labels.iter().max().copied().unwrap_or(0)
    );

    MultivariateResult {
        cluster_labels,
        projection: Some(Projection {
            component_names: pca.component_names(),
            coords,
        }),
        communalities,
    }
}
