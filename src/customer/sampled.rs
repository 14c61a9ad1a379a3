use std::rc::Rc;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::sim::clock::{HOUR, SimTime};
use crate::tariff::Tariff;

use super::{CapacityProfile, CustomerInfo, CustomerModelAccessor, Transfer};

/// Parameters of the daily usage curve of one member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageShape {
    /// Mean hourly usage magnitude (kWh).
    pub base_kwh: f64,
    /// Amplitude of the daily sinusoid (kWh).
    pub amplitude_kwh: f64,
    /// Standard deviation of the hourly Gaussian noise (kWh).
    pub noise_std: f64,
}

/// A seeded customer model with a sinusoidal daily usage curve.
///
/// The usage curve is drawn once at construction, so its profiles are
/// prototypical. Production customers report negative usage.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use tariff_sim::customer::{CustomerId, CustomerInfo, CustomerModelAccessor, SampledCustomerModel};
/// use tariff_sim::customer::sampled::UsageShape;
/// use tariff_sim::tariff::PowerType;
///
/// let info = Rc::new(CustomerInfo::new(CustomerId(1), "village", 100, PowerType::Consumption));
/// let shape = UsageShape { base_kwh: 1.0, amplitude_kwh: 0.5, noise_std: 0.0 };
/// let mut model = SampledCustomerModel::new(info, shape, 24, 0.05, 42);
///
/// let s = model.tariff_choice_sample();
/// assert!((0.0..1.0).contains(&s));
/// ```
#[derive(Debug, Clone)]
pub struct SampledCustomerModel {
    info: Rc<CustomerInfo>,
    /// Per-member usage for each hour of the horizon, wrapping
    curve: Vec<f64>,
    broker_switch_factor: f64,
    rng: StdRng,
    transfers: Vec<Transfer>,
}

impl SampledCustomerModel {
    /// Creates a model and draws its usage curve.
    ///
    /// # Arguments
    ///
    /// * `info` - The population this model speaks for
    /// * `shape` - Daily usage curve parameters
    /// * `horizon_hours` - Length of the usage curve and of every profile
    /// * `broker_switch_factor` - Inconvenience of changing broker
    /// * `seed` - Random seed for the curve noise and all samples
    pub fn new(
        info: Rc<CustomerInfo>,
        shape: UsageShape,
        horizon_hours: usize,
        broker_switch_factor: f64,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let sign = if info.power_type.is_production() { -1.0 } else { 1.0 };
        let curve = (0..horizon_hours.max(1))
            .map(|h| {
                let day_pos = (h % 24) as f64 / 24.0;
                let sinus = (2.0 * std::f64::consts::PI * day_pos).sin();
                let kwh = shape.base_kwh + shape.amplitude_kwh * sinus
                    + gaussian_noise(&mut rng, shape.noise_std);
                sign * kwh.max(0.0)
            })
            .collect();
        Self {
            info,
            curve,
            broker_switch_factor,
            rng,
            transfers: Vec::new(),
        }
    }

    /// Per-member usage during the hour starting at `at`.
    pub fn usage_at(&self, at: SimTime) -> f64 {
        let idx = (at.millis() / HOUR).rem_euclid(self.curve.len() as i64) as usize;
        self.curve[idx]
    }

    /// Transfers reported by the evaluator so far.
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }
}

impl CustomerModelAccessor for SampledCustomerModel {
    fn customer_info(&self) -> &Rc<CustomerInfo> {
        &self.info
    }

    fn capacity_profile(&mut self, _tariff: &Tariff, now: SimTime) -> CapacityProfile {
        let usage = (0..self.curve.len())
            .map(|i| self.usage_at(now.plus((i as i64 + 1) * HOUR)))
            .collect();
        CapacityProfile::new(usage, now)
    }

    fn broker_switch_factor(&self, is_superseding: bool) -> f64 {
        if is_superseding {
            0.0
        } else {
            self.broker_switch_factor
        }
    }

    fn tariff_choice_sample(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn inertia_sample(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn shifting_inconvenience_factor(&self, _tariff: &Tariff) -> f64 {
        0.0
    }

    fn notify_customer(&mut self, transfer: &Transfer) {
        self.transfers.push(*transfer);
    }
}

/// Gaussian noise via the Box-Muller transform.
fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    let u1: f64 = rng.random::<f64>().clamp(1e-9, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::CustomerId;
    use crate::tariff::{PowerType, Rate, TariffId};

    fn model(pt: PowerType, seed: u64) -> SampledCustomerModel {
        let info = Rc::new(CustomerInfo::new(CustomerId(1), "test", 10, pt));
        let shape = UsageShape {
            base_kwh: 2.0,
            amplitude_kwh: 1.0,
            noise_std: 0.1,
        };
        SampledCustomerModel::new(info, shape, 48, 0.05, seed)
    }

    #[test]
    fn same_seed_same_curve() {
        let a = model(PowerType::Consumption, 7);
        let b = model(PowerType::Consumption, 7);
        assert_eq!(a.curve, b.curve);
    }

    #[test]
    fn production_curve_is_negative() {
        let m = model(PowerType::SolarProduction, 3);
        assert!(m.curve.iter().all(|&v| v <= 0.0));
    }

    #[test]
    fn profile_spans_horizon_after_now() {
        let mut m = model(PowerType::Consumption, 5);
        let tariff = Tariff::builder(TariffId(1), "b", PowerType::Consumption)
            .rate(Rate::fixed(-0.1))
            .build();
        let now = SimTime::from_hours(5);
        let profile = m.capacity_profile(&tariff, now);
        assert_eq!(profile.len(), 48);
        assert!(!profile.state_dependent);
        assert_eq!(profile.usage[0], m.usage_at(SimTime::from_hours(6)));
    }

    #[test]
    fn superseding_move_has_no_broker_penalty() {
        let m = model(PowerType::Consumption, 1);
        assert_eq!(m.broker_switch_factor(true), 0.0);
        assert!((m.broker_switch_factor(false) - 0.05).abs() < 1e-9);
    }
}
