//! Cost estimation of a usage profile under a tariff.

use crate::customer::CapacityProfile;
use crate::sim::clock::{HOUR, SimTime};
use crate::tariff::Tariff;

const DEFAULT_WT_EXPECTED: f64 = 0.6;
const DEFAULT_WT_MAX: f64 = 0.4;

/// Prices a usage profile, valuing variable rates by a weighted blend of
/// their expected and maximum prices and allowing for expected regulation.
#[derive(Debug, Clone, PartialEq)]
pub struct TariffEvaluationHelper {
    wt_expected: f64,
    wt_max: f64,
    norm_wt_expected: f64,
    norm_wt_max: f64,
    exp_curtail: f64,
    exp_discharge: f64,
    exp_down: f64,
}

impl Default for TariffEvaluationHelper {
    fn default() -> Self {
        let mut helper = Self {
            wt_expected: DEFAULT_WT_EXPECTED,
            wt_max: DEFAULT_WT_MAX,
            norm_wt_expected: 0.0,
            norm_wt_max: 0.0,
            exp_curtail: 0.0,
            exp_discharge: 0.0,
            exp_down: 0.0,
        };
        helper.normalize_weights();
        helper
    }
}

impl TariffEvaluationHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the weights of the expected and maximum price of variable
    /// rates. They are normalized to sum to one; a non-positive sum is
    /// rejected.
    pub fn initialize_cost_factors(&mut self, wt_expected: f64, wt_max: f64) {
        if !(wt_expected + wt_max > 0.0) || wt_expected < 0.0 || wt_max < 0.0 {
            tracing::error!(wt_expected, wt_max, "cost weights must be non-negative with a positive sum");
            return;
        }
        self.wt_expected = wt_expected;
        self.wt_max = wt_max;
        self.normalize_weights();
    }

    /// Sets the per-hour regulation the customer expects to supply.
    ///
    /// Callers are responsible for the signs: curtailment and discharge are
    /// non-positive, down-regulation is non-negative.
    pub fn initialize_regulation_factors(&mut self, curtailment: f64, discharge: f64, down: f64) {
        self.exp_curtail = curtailment;
        self.exp_discharge = discharge;
        self.exp_down = down;
    }

    pub fn norm_wt_expected(&self) -> f64 {
        self.norm_wt_expected
    }

    pub fn norm_wt_max(&self) -> f64 {
        self.norm_wt_max
    }

    /// Net regulation expected per hour.
    pub fn expected_regulation(&self) -> f64 {
        self.exp_curtail + self.exp_discharge + self.exp_down
    }

    fn normalize_weights(&mut self) {
        let sum = self.wt_expected + self.wt_max;
        self.norm_wt_expected = self.wt_expected / sum;
        self.norm_wt_max = self.wt_max / sum;
    }

    /// Consumption left after expected regulation; production is unchanged.
    fn regulated_kwh(&self, kwh: f64) -> f64 {
        if kwh > 0.0 {
            (kwh + self.expected_regulation()).max(0.0)
        } else {
            kwh
        }
    }

    /// Estimated cost of a profile, including periodic payments.
    pub fn estimate_cost(&self, tariff: &Tariff, profile: &CapacityProfile) -> f64 {
        self.estimate_cost_from(tariff, &profile.usage, profile.start, true)
    }

    /// Estimated cost of `usage`, whose first hour starts one hour after
    /// `start`.
    ///
    /// Each hour is charged at the rate in effect then, with variable rates
    /// at their weighted price. Tariffs with a regulation rate are credited
    /// with the expected regulation for every hour.
    ///
    /// # Returns
    ///
    /// Cost in the customer's sign convention: negative means the customer
    /// pays.
    pub fn estimate_cost_from(
        &self,
        tariff: &Tariff,
        usage: &[f64],
        start: SimTime,
        include_periodic: bool,
    ) -> f64 {
        let (wt_e, wt_m) = (self.norm_wt_expected, self.norm_wt_max);
        let mut time = start;
        let mut result = 0.0;
        for &kwh in usage {
            time = time.plus(HOUR);
            result += tariff.usage_charge_with(time, self.regulated_kwh(kwh), |r| r.weighted_price(wt_e, wt_m));
            if include_periodic {
                result += tariff.periodic_payment() / 24.0;
            }
        }
        if tariff.has_regulation_rate() {
            let adj = tariff.regulation_charge(time, self.exp_curtail + self.exp_discharge)
                + tariff.regulation_charge(time, self.exp_down);
            tracing::debug!(tariff = %tariff.id(), adj, "regulation adjustment");
            result += adj * usage.len() as f64;
        }
        result
    }
}
