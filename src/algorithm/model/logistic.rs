//! Class-weighted logistic regression trained by gradient descent

use ndarray::{Array1, Array2, ArrayView1};

use crate::config::LogisticParams;

/// Numerically stable logistic function
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let exp_z = z.exp();
        exp_z / (1.0 + exp_z)
    }
}

/// Fitted binary logistic model over standardized features
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticRegression {
    coefficients: Array1<f64>,
    intercept: f64,
    iterations: usize,
}

impl LogisticRegression {
    /// Fit with full-batch gradient descent and an L2 penalty
    ///
    /// # Arguments
    /// * `x` - Standardized training rows
    /// * `y` - Binary targets
    /// * `sample_weights` - Per-row weights, typically class-balanced
    /// * `params` - Learning rate, iteration cap, penalty and tolerance
    #[must_use]
    pub fn fit(x: &Array2<f64>, y: &[bool], sample_weights: &[f64], params: &LogisticParams) -> Self {
        let n_features = x.ncols();
        let targets = Array1::from_iter(y.iter().map(|&l| f64::from(u8::from(l))));
        let weights = Array1::from_vec(sample_weights.to_vec());
        let weight_sum = weights.sum();

        let mut coefficients = Array1::<f64>::zeros(n_features);
        let mut intercept = 0.0;
        let mut iterations = 0;

        if weight_sum <= 0.0 || x.nrows() == 0 {
            return Self {
                coefficients,
                intercept,
                iterations,
            };
        }

        for _ in 0..params.max_iter {
            iterations += 1;
            let predictions = (x.dot(&coefficients) + intercept).mapv(sigmoid);
            let residuals = (predictions - &targets) * &weights;

            let gradient = x.t().dot(&residuals) / weight_sum + &coefficients * params.l2;
            let intercept_gradient = residuals.sum() / weight_sum;

            coefficients.scaled_add(-params.learning_rate, &gradient);
            intercept -= params.learning_rate * intercept_gradient;

            let step = gradient
                .iter()
                .fold(intercept_gradient.abs(), |acc, g| acc.max(g.abs()))
                * params.learning_rate;
            if step < params.tolerance {
                break;
            }
        }

        log::debug!("Logistic regression converged after {iterations} iterations");
        Self {
            coefficients,
            intercept,
            iterations,
        }
    }

    /// Probability of the positive class for one standardized row
    #[must_use]
    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> f64 {
        sigmoid(row.dot(&self.coefficients) + self.intercept)
    }

    /// Absolute coefficients, normalized to sum to 1
    #[must_use]
    pub fn importances(&self) -> Vec<f64> {
        let magnitudes: Vec<f64> = self.coefficients.iter().map(|c| c.abs()).collect();
        let total: f64 = magnitudes.iter().sum();
        if total > 0.0 {
            magnitudes.iter().map(|m| m / total).collect()
        } else {
            magnitudes
        }
    }

    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separable_data() {
        let x = array![[-2.0, 0.1], [-1.5, -0.2], [-1.0, 0.0], [1.0, 0.1], [1.5, -0.1], [2.0, 0.2]];
        let y = [false, false, false, true, true, true];
        let model = LogisticRegression::fit(&x, &y, &[1.0; 6], &LogisticParams::default());

        assert!(model.predict_proba(array![2.0, 0.0].view()) > 0.8);
        assert!(model.predict_proba(array![-2.0, 0.0].view()) < 0.2);

        let importances = model.importances();
        assert!(importances[0] > importances[1]);
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input_is_neutral() {
        let x = Array2::<f64>::zeros((0, 3));
        let model = LogisticRegression::fit(&x, &[], &[], &LogisticParams::default());
        assert_eq!(model.predict_proba(array![1.0, 2.0, 3.0].view()), 0.5);
        assert_eq!(model.iterations(), 0);
    }
}
