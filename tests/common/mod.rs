//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::rc::Rc;

use tariff_sim::customer::{
    CapacityProfile, CustomerId, CustomerInfo, CustomerModelAccessor, Transfer,
};
use tariff_sim::market::{MarketGateway, TransactionLog};
use tariff_sim::sim::clock::{HOUR, SimTime};
use tariff_sim::subscription::{SubscriptionRepo, SubscriptionSource};
use tariff_sim::tariff::{PowerType, Rate, Tariff, TariffId, TariffRepo};

/// Start of the scenario used across evaluator tests.
pub const BASE: SimTime = SimTime::from_millis(0);

/// Evaluation instant: seven hours after the base time.
pub fn now() -> SimTime {
    BASE.plus(7 * HOUR)
}

/// A customer model answering from fixed scripts.
///
/// Sample scripts are replayed cyclically; an empty script yields 0.5.
pub struct ScriptedAccessor {
    pub info: Rc<CustomerInfo>,
    pub profile: Vec<f64>,
    pub state_dependent: bool,
    pub choice_samples: Vec<f64>,
    pub inertia_samples: Vec<f64>,
    pub broker_switch: f64,
    pub transfers: Vec<Transfer>,
    pub profile_requests: usize,
    choice_idx: usize,
    inertia_idx: usize,
}

impl ScriptedAccessor {
    /// A multi-contracting consumer population of 10,000 with a two-hour
    /// profile of 1 and 2 kWh.
    pub fn new() -> Self {
        let info = CustomerInfo::new(CustomerId(1), "town", 10_000, PowerType::Consumption)
            .with_multi_contracting(true);
        Self {
            info: Rc::new(info),
            profile: vec![1.0, 2.0],
            state_dependent: false,
            choice_samples: Vec::new(),
            inertia_samples: Vec::new(),
            broker_switch: 0.05,
            transfers: Vec::new(),
            profile_requests: 0,
            choice_idx: 0,
            inertia_idx: 0,
        }
    }

    pub fn with_choice_samples(mut self, samples: &[f64]) -> Self {
        self.choice_samples = samples.to_vec();
        self
    }

    pub fn with_inertia_samples(mut self, samples: &[f64]) -> Self {
        self.inertia_samples = samples.to_vec();
        self
    }

    pub fn with_info(mut self, info: CustomerInfo) -> Self {
        self.info = Rc::new(info);
        self
    }

    fn next(samples: &[f64], idx: &mut usize) -> f64 {
        if samples.is_empty() {
            return 0.5;
        }
        let value = samples[*idx % samples.len()];
        *idx += 1;
        value
    }
}

impl CustomerModelAccessor for ScriptedAccessor {
    fn customer_info(&self) -> &Rc<CustomerInfo> {
        &self.info
    }

    fn capacity_profile(&mut self, _tariff: &Tariff, now: SimTime) -> CapacityProfile {
        self.profile_requests += 1;
        if self.state_dependent {
            CapacityProfile::state_dependent(self.profile.clone(), now)
        } else {
            CapacityProfile::new(self.profile.clone(), now)
        }
    }

    fn broker_switch_factor(&self, is_superseding: bool) -> f64 {
        if is_superseding { 0.0 } else { self.broker_switch }
    }

    fn tariff_choice_sample(&mut self) -> f64 {
        Self::next(&self.choice_samples, &mut self.choice_idx)
    }

    fn inertia_sample(&mut self) -> f64 {
        Self::next(&self.inertia_samples, &mut self.inertia_idx)
    }

    fn shifting_inconvenience_factor(&self, _tariff: &Tariff) -> f64 {
        0.0
    }

    fn notify_customer(&mut self, transfer: &Transfer) {
        self.transfers.push(*transfer);
    }
}

/// A market gateway that records directives without settling them.
#[derive(Default)]
pub struct RecordingMarket {
    pub defaults: HashMap<PowerType, Rc<Tariff>>,
    pub directives: Vec<(TariffId, i64)>,
}

impl RecordingMarket {
    pub fn with_default(tariff: &Rc<Tariff>) -> Self {
        let mut market = Self::default();
        market.defaults.insert(tariff.power_type(), Rc::clone(tariff));
        market
    }

    /// Net directive count for one tariff.
    pub fn net(&self, tariff: TariffId) -> i64 {
        self.directives
            .iter()
            .filter(|(id, _)| *id == tariff)
            .map(|(_, n)| n)
            .sum()
    }

    pub fn total(&self) -> i64 {
        self.directives.iter().map(|(_, n)| n).sum()
    }
}

impl MarketGateway for RecordingMarket {
    fn default_tariff(&self, power_type: PowerType) -> Option<Rc<Tariff>> {
        self.defaults.get(&power_type).cloned()
    }

    fn subscribe_to_tariff(&mut self, tariff: &Rc<Tariff>, _customer: &Rc<CustomerInfo>, count: i64) {
        self.directives.push((tariff.id(), count));
    }
}

/// Adds a fixed-rate consumption tariff to the repository.
pub fn add_tariff(repo: &mut TariffRepo, broker: &str, rate: f64) -> Rc<Tariff> {
    let id = repo.next_id();
    let tariff = Tariff::builder(id, broker, PowerType::Consumption)
        .rate(Rate::fixed(rate))
        .build();
    repo.add(tariff).unwrap_or_else(|| panic!("tariff {id} should be new"))
}

/// Adds a tariff built by `f` from a consumption builder with the given rate.
pub fn add_tariff_with(
    repo: &mut TariffRepo,
    broker: &str,
    rate: f64,
    f: impl FnOnce(tariff_sim::tariff::TariffBuilder) -> tariff_sim::tariff::TariffBuilder,
) -> Rc<Tariff> {
    let id = repo.next_id();
    let tariff = f(Tariff::builder(id, broker, PowerType::Consumption).rate(Rate::fixed(rate))).build();
    repo.add(tariff).unwrap_or_else(|| panic!("tariff {id} should be new"))
}

/// Subscribes the whole population of `info` to `tariff` at the base time.
pub fn subscribe_all(subs: &mut SubscriptionRepo, info: &Rc<CustomerInfo>, tariff: &Rc<Tariff>) {
    let mut log = TransactionLog::new();
    subs.get_or_create(info, tariff)
        .subscribe(info.population, BASE, &mut log);
}
