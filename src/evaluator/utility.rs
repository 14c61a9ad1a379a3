//! Utility scoring and the logit choice model.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::tariff::Tariff;

/// Utilities beyond this magnitude are compressed.
pub const MAX_LINEAR_UTILITY: f64 = 7.0;

/// A scored alternative.
///
/// Ordered best first: by descending utility, then by descending tariff id
/// so that the newer of two equally good tariffs comes first.
#[derive(Debug, Clone)]
pub struct TariffUtility {
    pub tariff: Rc<Tariff>,
    pub utility: f64,
    pub probability: f64,
}

impl TariffUtility {
    pub fn new(tariff: Rc<Tariff>, utility: f64) -> Self {
        Self {
            tariff,
            utility,
            probability: 0.0,
        }
    }
}

impl Ord for TariffUtility {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .utility
            .total_cmp(&self.utility)
            .then_with(|| other.tariff.id().cmp(&self.tariff.id()))
    }
}

impl PartialOrd for TariffUtility {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TariffUtility {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TariffUtility {}

/// Cost relative to the default tariff's, scaled by the default's magnitude.
///
/// A zero default cost gives no basis for comparison and yields 0.
pub fn normalized_difference(cost: f64, default_cost: f64) -> f64 {
    if default_cost == 0.0 {
        tracing::warn!("default cost is zero");
        return 0.0;
    }
    (cost - default_cost) / default_cost.abs()
}

/// Compresses extreme utilities: logarithmically above the linear range,
/// capped at twice its bound; clamped below it.
pub fn constrain_utility(utility: f64) -> f64 {
    if utility > MAX_LINEAR_UTILITY {
        let compressed = (utility - MAX_LINEAR_UTILITY).log10();
        (MAX_LINEAR_UTILITY + compressed).min(MAX_LINEAR_UTILITY * 2.0)
    } else if utility < -MAX_LINEAR_UTILITY {
        -MAX_LINEAR_UTILITY
    } else {
        utility
    }
}

/// Logit sharpness for a rationality in `[0, 1]`, given the sharpness of a
/// perfectly rational customer.
pub fn logit_lambda(lambda_max: f64, rationality: f64) -> f64 {
    lambda_max.powf(rationality) - 1.0
}

/// Fills in `exp(λu) / Σ exp(λu)` for every alternative.
///
/// NaN probabilities are logged and replaced by 0.
pub fn assign_probabilities(utilities: &mut [TariffUtility], lambda: f64) {
    let denominator: f64 = utilities.iter().map(|u| (lambda * u.utility).exp()).sum();
    for u in utilities.iter_mut() {
        u.probability = (lambda * u.utility).exp() / denominator;
        if u.probability.is_nan() {
            tracing::error!(
                tariff = %u.tariff.id(),
                utility = u.utility,
                denominator,
                "probability is NaN"
            );
            u.probability = 0.0;
        }
        tracing::debug!(tariff = %u.tariff.id(), probability = u.probability, "choice probability");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tariff::{PowerType, Rate, TariffId};

    fn tariff(id: u64) -> Rc<Tariff> {
        Rc::new(
            Tariff::builder(TariffId(id), "b", PowerType::Consumption)
                .rate(Rate::fixed(-0.1))
                .build(),
        )
    }

    #[test]
    fn ordering_is_best_first_with_newer_ties_first() {
        let mut list = vec![
            TariffUtility::new(tariff(1), 0.1),
            TariffUtility::new(tariff(2), 0.5),
            TariffUtility::new(tariff(3), 0.1),
        ];
        list.sort();
        let ids: Vec<u64> = list.iter().map(|u| u.tariff.id().0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn compression() {
        assert_eq!(constrain_utility(3.0), 3.0);
        assert_eq!(constrain_utility(-20.0), -MAX_LINEAR_UTILITY);
        assert!((constrain_utility(17.0) - 8.0).abs() < 1e-12);
        assert_eq!(constrain_utility(1e20), 14.0);
    }

    #[test]
    fn normalized_difference_against_default() {
        assert!((normalized_difference(-28.8, -43.2) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(normalized_difference(-5.0, 0.0), 0.0);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let mut list = vec![
            TariffUtility::new(tariff(1), 0.3),
            TariffUtility::new(tariff(2), -0.2),
            TariffUtility::new(tariff(3), 0.0),
        ];
        assign_probabilities(&mut list, logit_lambda(50.0, 0.8));
        let sum: f64 = list.iter().map(|u| u.probability).sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(list.iter().all(|u| u.probability >= 0.0));
        assert!(list[0].probability > list[2].probability);
    }

    #[test]
    fn zero_rationality_is_uniform() {
        let mut list = vec![
            TariffUtility::new(tariff(1), 3.0),
            TariffUtility::new(tariff(2), -3.0),
        ];
        assign_probabilities(&mut list, logit_lambda(50.0, 0.0));
        assert!((list[0].probability - 0.5).abs() < 1e-12);
    }

    #[test]
    fn lambda_for_rationality() {
        assert!((logit_lambda(50.0, 0.8) - 21.8653).abs() < 1e-3);
    }
}
