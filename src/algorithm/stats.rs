//! Numeric helpers shared by the benchmark builder, detectors and features
//!
//! Every function here is total: empty inputs and zero denominators return 0
//! rather than NaN, so callers never have to special-case them.

/// `numerator / denominator`, or 0 when the result would not be finite
#[must_use]
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    finite_or_zero(numerator / denominator)
}

/// Replace NaN and infinities with 0
#[must_use]
pub const fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Continuous percentile of an ascending slice
///
/// Linear interpolation between the order statistics around `q * (n - 1)`,
/// the same definition as SQL `PERCENTILE_CONT`.
///
/// # Arguments
/// * `sorted` - Values in ascending order
/// * `q` - Fraction in `[0, 1]`
#[must_use]
pub fn percentile_cont(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let position = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            let fraction = position - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}

/// Sort a copy of `values` and take several continuous percentiles at once
#[must_use]
pub fn percentiles_of<const N: usize>(values: &[f64], qs: [f64; N]) -> [f64; N] {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    qs.map(|q| percentile_cont(&sorted, q))
}

#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    safe_div(values.iter().sum(), values.len() as f64)
}

/// Population standard deviation (divides by n)
#[must_use]
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Sample standard deviation (divides by n - 1); 0 for fewer than two values
#[must_use]
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Population standard deviation over mean
#[must_use]
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    safe_div(population_std(values), mean(values))
}
