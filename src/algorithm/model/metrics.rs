//! Ranking metrics and cross-validation splits

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Area under the ROC curve
///
/// Computed as the Mann-Whitney statistic with tie-averaged ranks, so equal
/// scores count as half a correct ordering.
///
/// # Returns
/// `None` when either class is absent
#[must_use]
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> Option<f64> {
    debug_assert_eq!(scores.len(), labels.len());
    let positives = labels.iter().filter(|&&l| l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_unstable_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based; the tie group shares the mean of start+1..=end
        let rank = (start + end + 1) as f64 / 2.0;
        let tied_positives = order[start..end].iter().filter(|&&i| labels[i]).count();
        positive_rank_sum += rank * tied_positives as f64;
        start = end;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Fold assignment preserving the class ratio in every fold
///
/// Each class is shuffled with a seeded generator and dealt round-robin.
///
/// # Returns
/// Fold index in `0..folds` for every row
#[must_use]
pub fn stratified_folds(labels: &[bool], folds: usize, seed: u64) -> Vec<usize> {
    let folds = folds.max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut assignment = vec![0; labels.len()];

    for class in [true, false] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == class)
            .map(|(i, _)| i)
            .collect();
        members.shuffle(&mut rng);
        for (position, row) in members.into_iter().enumerate() {
            assignment[row] = position % folds;
        }
    }
    assignment
}

/// Sample weights that give both classes the same total weight
#[must_use]
pub fn balanced_weights(labels: &[bool]) -> Vec<f64> {
    let total = labels.len() as f64;
    let positives = labels.iter().filter(|&&l| l).count() as f64;
    let negatives = total - positives;
    let positive_weight = if positives > 0.0 { total / (2.0 * positives) } else { 0.0 };
    let negative_weight = if negatives > 0.0 { total / (2.0 * negatives) } else { 0.0 };
    labels
        .iter()
        .map(|&l| if l { positive_weight } else { negative_weight })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auc_perfect_and_inverted() {
        let labels = [false, false, true, true];
        assert_eq!(roc_auc(&[0.1, 0.2, 0.8, 0.9], &labels), Some(1.0));
        assert_eq!(roc_auc(&[0.9, 0.8, 0.2, 0.1], &labels), Some(0.0));
    }

    #[test]
    fn test_auc_ties_count_half() {
        let labels = [false, true];
        assert_eq!(roc_auc(&[0.5, 0.5], &labels), Some(0.5));

        let labels = [false, false, true];
        // positive ties one negative and beats the other
        let auc = roc_auc(&[0.2, 0.7, 0.7], &labels).unwrap();
        assert!((auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_auc_single_class() {
        assert_eq!(roc_auc(&[0.1, 0.2], &[true, true]), None);
        assert_eq!(roc_auc(&[], &[]), None);
    }

    #[test]
    fn test_stratified_folds_balance_classes() {
        let labels: Vec<bool> = (0..100).map(|i| i % 10 == 0).collect();
        let folds = stratified_folds(&labels, 5, 42);
        for fold in 0..5 {
            let positives = (0..100).filter(|&i| folds[i] == fold && labels[i]).count();
            let rows = folds.iter().filter(|&&f| f == fold).count();
            assert_eq!(positives, 2);
            assert_eq!(rows, 20);
        }
        assert_eq!(folds, stratified_folds(&labels, 5, 42));
    }

    #[test]
    fn test_balanced_weights() {
        let weights = balanced_weights(&[true, false, false, false]);
        assert!((weights[0] - 2.0).abs() < 1e-12);
        assert!((weights[1] - 4.0 / 6.0).abs() < 1e-12);
        let total_pos: f64 = weights[..1].iter().sum();
        let total_neg: f64 = weights[1..].iter().sum();
        assert!((total_pos - total_neg).abs() < 1e-12);
    }
}
