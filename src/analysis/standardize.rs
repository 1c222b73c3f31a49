//! Column standardization (z-scores with population variance)

use nalgebra::DMatrix;

/// Scales below this are treated as zero variance
const ZERO_SCALE: f64 = 10.0 * f64::EPSILON;

/// Rescale every column to zero mean and unit population variance
///
/// Zero-variance columns become all zeros instead of dividing by zero.
pub fn standardize(data: &DMatrix<f64>) -> DMatrix<f64> {
    let n = data.nrows();
    let mut out = data.clone();
    if n == 0 {
        return out;
    }

    for mut column in out.column_iter_mut() {
        let mean = column.sum() / n as f64;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let scale = variance.sqrt();

        if scale < ZERO_SCALE {
            column.fill(0.0);
        } else {
            column.apply(|v| *v = (*v - mean) / scale);
        }
    }

    out
}
