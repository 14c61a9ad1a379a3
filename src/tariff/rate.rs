//! Per-kWh rates and regulation payments.

/// Hour-of-day window in which a rate applies.
///
/// `begin` is inclusive and `end` exclusive. A window with `begin > end`
/// wraps past midnight; `begin == end` covers the whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyWindow {
    pub begin: u32,
    pub end: u32,
}

impl DailyWindow {
    pub fn contains(&self, hour: u32) -> bool {
        if self.begin == self.end {
            true
        } else if self.begin < self.end {
            hour >= self.begin && hour < self.end
        } else {
            hour >= self.begin || hour < self.end
        }
    }
}

/// Price range of a variable rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariablePricing {
    /// Price the broker expects to charge on average.
    pub expected_mean: f64,
    /// Worst-case price.
    pub max_value: f64,
}

/// A single per-kWh price component of a tariff.
///
/// Prices follow the customer's point of view: negative values are paid by
/// a consuming customer, positive values are paid to a producing one.
#[derive(Debug, Clone, PartialEq)]
pub struct Rate {
    /// Fixed price, or the minimum price of a variable rate.
    pub value: f64,
    /// Hours during which the rate applies; `None` means all day.
    pub window: Option<DailyWindow>,
    /// Minimum kWh before this rate takes over from lower tiers.
    pub tier_threshold: f64,
    /// Set for variable-rate pricing.
    pub variable: Option<VariablePricing>,
    /// Fraction of usage the broker may curtail (0..=1).
    pub max_curtailment: f64,
}

impl Rate {
    /// An all-day, untiered, fixed-price rate.
    pub fn fixed(value: f64) -> Self {
        Self {
            value,
            window: None,
            tier_threshold: 0.0,
            variable: None,
            max_curtailment: 0.0,
        }
    }

    /// A variable rate with the given minimum, expected and maximum price.
    pub fn variable(min_value: f64, expected_mean: f64, max_value: f64) -> Self {
        Self {
            variable: Some(VariablePricing {
                expected_mean,
                max_value,
            }),
            ..Self::fixed(min_value)
        }
    }

    /// Restricts the rate to an hour-of-day window.
    pub fn with_window(mut self, begin: u32, end: u32) -> Self {
        self.window = Some(DailyWindow { begin, end });
        self
    }

    pub fn with_tier_threshold(mut self, threshold: f64) -> Self {
        self.tier_threshold = threshold;
        self
    }

    pub fn with_max_curtailment(mut self, ratio: f64) -> Self {
        self.max_curtailment = ratio;
        self
    }

    pub fn is_fixed(&self) -> bool {
        self.variable.is_none()
    }

    pub fn is_time_of_use(&self) -> bool {
        self.window.is_some()
    }

    /// Returns true if the rate applies during the given hour of day.
    pub fn applies_at(&self, hour: u32) -> bool {
        self.window.is_none_or(|w| w.contains(hour))
    }

    /// Price charged at settlement: the fixed value or the expected mean.
    pub fn price(&self) -> f64 {
        match self.variable {
            None => self.value,
            Some(v) => v.expected_mean,
        }
    }

    /// Risk-weighted price used when forecasting cost.
    ///
    /// Fixed rates return their value; variable rates blend the expected
    /// mean and the maximum with the given (normalized) weights.
    pub fn weighted_price(&self, wt_expected: f64, wt_max: f64) -> f64 {
        match self.variable {
            None => self.value,
            Some(v) => wt_expected * v.expected_mean + wt_max * v.max_value,
        }
    }
}

/// Payments for balancing energy on a tariff that supports regulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegulationRate {
    /// Paid to the customer per kWh of up-regulation (curtailment).
    pub up_payment: f64,
    /// Paid by the customer per kWh of down-regulation (extra consumption).
    pub down_payment: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping_window() {
        let w = DailyWindow { begin: 22, end: 6 };
        assert!(w.contains(23));
        assert!(w.contains(0));
        assert!(!w.contains(6));
        assert!(!w.contains(12));
    }

    #[test]
    fn degenerate_window_covers_the_day() {
        let w = DailyWindow { begin: 5, end: 5 };
        assert!((0..24).all(|h| w.contains(h)));
    }

    #[test]
    fn variable_rate_prices() {
        let r = Rate::variable(-0.05, -0.1, -0.2);
        assert!(!r.is_fixed());
        assert!((r.price() + 0.1).abs() < 1e-9);
        assert!((r.weighted_price(0.6, 0.4) + 0.14).abs() < 1e-9);
    }

    #[test]
    fn fixed_rate_ignores_weights() {
        let r = Rate::fixed(-0.12).with_window(8, 18);
        assert!(r.is_time_of_use());
        assert!((r.weighted_price(0.6, 0.4) + 0.12).abs() < 1e-9);
        assert!(r.applies_at(9));
        assert!(!r.applies_at(19));
    }
}
