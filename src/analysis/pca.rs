//! Principal component projection and variable communalities
//!
//! Components are the eigenvectors of the sample covariance matrix
//! (denominator n − 1) sorted by decreasing eigenvalue. Each component's sign
//! is fixed so its largest-magnitude loading is positive, which keeps
//! coordinates stable across runs.

use nalgebra::{DMatrix, SymmetricEigen};
use serde::Serialize;

/// Fitted PCA model with the projected rows
#[derive(Debug, Clone)]
pub struct PcaModel {
    /// Unit eigenvectors, one column per component (variables × components)
    pub components: DMatrix<f64>,
    /// Variance explained by each component
    pub explained_variance: Vec<f64>,
    /// Row coordinates (rows × components)
    pub scores: DMatrix<f64>,
}

impl PcaModel {
    pub fn n_components(&self) -> usize {
        self.explained_variance.len()
    }

    /// Component names: PC1, PC2, ...
    pub fn component_names(&self) -> Vec<String> {
        (1..=self.n_components()).map(|i| format!("PC{}", i)).collect()
    }

    /// Share of each variable's variance captured by the kept components
    ///
    /// communality_j = Σ_c (v_jc · √λ_c)², as a rounded percentage clamped to [0, 100].
    pub fn communality_percents(&self) -> Vec<i64> {
        self.components
            .row_iter()
            .map(|loadings| {
                let communality: f64 = loadings
                    .iter()
                    .zip(&self.explained_variance)
                    .map(|(v, lambda)| (v * lambda.sqrt()).powi(2))
                    .sum();
                ((communality * 100.0).round_ties_even() as i64).clamp(0, 100)
            })
            .collect()
    }
}

/// Fit `n_components` principal components
///
/// Returns `None` when there are no columns or no components requested.
pub fn fit_pca(data: &DMatrix<f64>, n_components: usize) -> Option<PcaModel> {
    let (n, p) = data.shape();
    let n_components = n_components.min(p);
    if n_components == 0 {
        return None;
    }

    let mut centered = data.clone();
    if n > 0 {
        for mut column in centered.column_iter_mut() {
            let mean = column.sum() / n as f64;
            column.add_scalar_mut(-mean);
        }
    }

    let covariance = (centered.transpose() * &centered) / (n.max(2) - 1) as f64;
    let eigen = SymmetricEigen::new(covariance);

    let mut order: Vec<usize> = (0..p).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let mut components = DMatrix::zeros(p, n_components);
    let mut explained_variance = Vec::with_capacity(n_components);
    for (c, &idx) in order.iter().take(n_components).enumerate() {
        let mut vector = eigen.eigenvectors.column(idx).clone_owned();
        let pivot = vector.iamax();
        if vector[pivot] < 0.0 {
            vector.neg_mut();
        }
        components.set_column(c, &vector);
        explained_variance.push(eigen.eigenvalues[idx].max(0.0));
    }

    let scores = &centered * &components;

    Some(PcaModel {
        components,
        explained_variance,
        scores,
    })
}

/// Communality of one trait variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Communality {
    #[serde(rename = "Variable")]
    pub variable: String,
    #[serde(rename = "Communalité (%)")]
    pub percent: i64,
}

/// Pair percentages with their variable names, highest first (stable on ties)
pub fn rank_communalities(variables: &[String], percents: &[i64]) -> Vec<Communality> {
    let mut ranked: Vec<Communality> = variables
        .iter()
        .zip(percents)
        .map(|(variable, &percent)| Communality {
            variable: variable.clone(),
            percent,
        })
        .collect();
    ranked.sort_by(|a, b| b.percent.cmp(&a.percent));
    ranked
}
