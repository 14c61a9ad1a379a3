//! Customer populations and the model interface the tariff evaluator reads.

pub mod sampled;

use std::fmt;
use std::rc::Rc;

use crate::sim::clock::SimTime;
use crate::tariff::{PowerType, Tariff, TariffId};

pub use sampled::SampledCustomerModel;

/// Unique customer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CustomerId(pub u32);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A population of identical customers.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerInfo {
    pub id: CustomerId,
    pub name: String,
    /// Number of individuals the record stands for.
    pub population: u64,
    pub power_type: PowerType,
    /// Whether the population may be split across several tariffs.
    pub multi_contracting: bool,
}

impl CustomerInfo {
    pub fn new(
        id: CustomerId,
        name: impl Into<String>,
        population: u64,
        power_type: PowerType,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            population,
            power_type,
            multi_contracting: false,
        }
    }

    pub fn with_multi_contracting(mut self, multi: bool) -> Self {
        self.multi_contracting = multi;
        self
    }
}

/// Expected hourly usage of one member over an evaluation horizon.
///
/// `usage[i]` covers the hour starting at `start + i` hours. Positive values
/// are consumption and negative values production.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityProfile {
    pub usage: Vec<f64>,
    pub start: SimTime,
    /// Set when the profile depends on the customer's current state and must
    /// not be reused in a later cycle.
    pub state_dependent: bool,
}

impl CapacityProfile {
    /// A prototypical profile that may be cached across cycles.
    pub fn new(usage: Vec<f64>, start: SimTime) -> Self {
        Self {
            usage,
            start,
            state_dependent: false,
        }
    }

    pub fn state_dependent(usage: Vec<f64>, start: SimTime) -> Self {
        Self {
            usage,
            start,
            state_dependent: true,
        }
    }

    pub fn len(&self) -> usize {
        self.usage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usage.is_empty()
    }
}

/// A block of customers moved from one tariff to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub customer: CustomerId,
    pub from: TariffId,
    pub to: TariffId,
    pub count: u64,
}

/// Everything the tariff evaluator needs from a customer model.
///
/// Samples are uniform on `[0, 1)`; a model that returns fixed sequences
/// makes evaluation fully reproducible.
pub trait CustomerModelAccessor {
    fn customer_info(&self) -> &Rc<CustomerInfo>;

    /// Per-member usage forecast under `tariff`, starting at `now`.
    fn capacity_profile(&mut self, tariff: &Tariff, now: SimTime) -> CapacityProfile;

    /// Extra inconvenience for moving to another broker. `is_superseding` is
    /// set when the move follows a revoked tariff to its replacement.
    fn broker_switch_factor(&self, is_superseding: bool) -> f64;

    /// Sample that picks the tariff a chunk moves to.
    fn tariff_choice_sample(&mut self) -> f64;

    /// Sample compared against inertia to decide whether a chunk evaluates.
    fn inertia_sample(&mut self) -> f64;

    /// Cost of shifting usage to fit the tariff, over one profile.
    fn shifting_inconvenience_factor(&self, tariff: &Tariff) -> f64;

    /// Called as soon as a chunk is allocated away from its current tariff.
    fn notify_customer(&mut self, transfer: &Transfer);
}
