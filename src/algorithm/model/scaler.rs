//! Feature standardization

use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Per-column mean and standard deviation fitted on the training rows
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl StandardScaler {
    /// Fit on a training matrix; constant columns get a unit scale
    #[must_use]
    pub fn fit(x: &Array2<f64>) -> Self {
        let columns = x.ncols();
        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(columns));
        let std = x.std_axis(Axis(0), 0.0).mapv(|s| {
            if s.is_finite() && s > f64::EPSILON { s } else { 1.0 }
        });
        Self { mean, std }
    }

    /// Standardize every row
    #[must_use]
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.std
    }

    /// Standardize one row
    #[must_use]
    pub fn transform_row(&self, row: ArrayView1<'_, f64>) -> Array1<f64> {
        (&row - &self.mean) / &self.std
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }
}
