//! The published tariff and its charge computations.

use std::cell::Cell;

use crate::sim::clock::{DAY, SimTime};

use super::rate::{Rate, RegulationRate};
use super::types::{PowerType, TariffId, TariffState};

/// A broker's contract offer.
///
/// Everything except the lifecycle state and the supersession link is fixed
/// at publication. Tariffs are shared between the repository, the market and
/// subscriptions as `Rc<Tariff>`, so the two mutable fields use `Cell`.
///
/// Payments follow the customer's point of view: a negative signup payment
/// is a fee the customer pays, a positive one is a bonus.
#[derive(Debug)]
pub struct Tariff {
    id: TariffId,
    broker: String,
    power_type: PowerType,
    state: Cell<TariffState>,
    supersedes: Option<TariffId>,
    superseded_by: Cell<Option<TariffId>>,
    expiration: Option<SimTime>,
    min_duration_ms: i64,
    signup_payment: f64,
    early_withdraw_payment: f64,
    periodic_payment: f64,
    rates: Vec<Rate>,
    regulation_rate: Option<RegulationRate>,
}

/// Incremental constructor for [`Tariff`].
///
/// # Examples
///
/// ```
/// use tariff_sim::tariff::{PowerType, Rate, Tariff, TariffId};
///
/// let tariff = Tariff::builder(TariffId(7), "bob", PowerType::Consumption)
///     .rate(Rate::fixed(-0.11))
///     .signup_payment(5.0)
///     .build();
/// assert!((tariff.signup_payment() - 5.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct TariffBuilder {
    id: TariffId,
    broker: String,
    power_type: PowerType,
    state: TariffState,
    supersedes: Option<TariffId>,
    expiration: Option<SimTime>,
    min_duration_ms: i64,
    signup_payment: f64,
    early_withdraw_payment: f64,
    periodic_payment: f64,
    rates: Vec<Rate>,
    regulation_rate: Option<RegulationRate>,
}

impl TariffBuilder {
    pub fn rate(mut self, rate: Rate) -> Self {
        self.rates.push(rate);
        self
    }

    pub fn regulation_rate(mut self, up_payment: f64, down_payment: f64) -> Self {
        self.regulation_rate = Some(RegulationRate {
            up_payment,
            down_payment,
        });
        self
    }

    pub fn signup_payment(mut self, amount: f64) -> Self {
        self.signup_payment = amount;
        self
    }

    pub fn early_withdraw_payment(mut self, amount: f64) -> Self {
        self.early_withdraw_payment = amount;
        self
    }

    /// Daily payment, charged in 24 equal parts per hourly timeslot.
    pub fn periodic_payment(mut self, amount: f64) -> Self {
        self.periodic_payment = amount;
        self
    }

    pub fn min_duration_ms(mut self, ms: i64) -> Self {
        self.min_duration_ms = ms.max(0);
        self
    }

    pub fn min_duration_days(self, days: f64) -> Self {
        self.min_duration_ms((days * DAY as f64) as i64)
    }

    pub fn expiration(mut self, at: SimTime) -> Self {
        self.expiration = Some(at);
        self
    }

    /// Declares this tariff the replacement for an earlier one.
    pub fn supersedes(mut self, id: TariffId) -> Self {
        self.supersedes = Some(id);
        self
    }

    pub fn state(mut self, state: TariffState) -> Self {
        self.state = state;
        self
    }

    /// Finishes the tariff. A tariff without rates gets a single zero rate.
    pub fn build(mut self) -> Tariff {
        if self.rates.is_empty() {
            tracing::warn!(tariff = %self.id, "tariff built without rates, using a zero rate");
            self.rates.push(Rate::fixed(0.0));
        }
        Tariff {
            id: self.id,
            broker: self.broker,
            power_type: self.power_type,
            state: Cell::new(self.state),
            supersedes: self.supersedes,
            superseded_by: Cell::new(None),
            expiration: self.expiration,
            min_duration_ms: self.min_duration_ms,
            signup_payment: self.signup_payment,
            early_withdraw_payment: self.early_withdraw_payment,
            periodic_payment: self.periodic_payment,
            rates: self.rates,
            regulation_rate: self.regulation_rate,
        }
    }
}

impl Tariff {
    /// Starts building an offered tariff with no payments and no rates.
    pub fn builder(id: TariffId, broker: impl Into<String>, power_type: PowerType) -> TariffBuilder {
        TariffBuilder {
            id,
            broker: broker.into(),
            power_type,
            state: TariffState::Offered,
            supersedes: None,
            expiration: None,
            min_duration_ms: 0,
            signup_payment: 0.0,
            early_withdraw_payment: 0.0,
            periodic_payment: 0.0,
            rates: Vec::new(),
            regulation_rate: None,
        }
    }

    pub fn id(&self) -> TariffId {
        self.id
    }

    pub fn broker(&self) -> &str {
        &self.broker
    }

    pub fn power_type(&self) -> PowerType {
        self.power_type
    }

    pub fn state(&self) -> TariffState {
        self.state.get()
    }

    /// Marks an offered tariff active once it has a subscriber.
    pub fn mark_subscribed(&self) {
        if self.state.get() == TariffState::Offered {
            self.state.set(TariffState::Active);
        }
    }

    /// Kills the tariff. Returns false if it was already killed.
    pub fn revoke(&self) -> bool {
        if self.state.get() == TariffState::Killed {
            return false;
        }
        self.state.set(TariffState::Killed);
        true
    }

    pub fn supersedes(&self) -> Option<TariffId> {
        self.supersedes
    }

    pub fn superseded_by(&self) -> Option<TariffId> {
        self.superseded_by.get()
    }

    pub fn set_superseded_by(&self, id: TariffId) {
        self.superseded_by.set(Some(id));
    }

    pub fn min_duration_ms(&self) -> i64 {
        self.min_duration_ms
    }

    pub fn signup_payment(&self) -> f64 {
        self.signup_payment
    }

    pub fn early_withdraw_payment(&self) -> f64 {
        self.early_withdraw_payment
    }

    pub fn periodic_payment(&self) -> f64 {
        self.periodic_payment
    }

    pub fn rates(&self) -> &[Rate] {
        &self.rates
    }

    pub fn regulation_rate(&self) -> Option<&RegulationRate> {
        self.regulation_rate.as_ref()
    }

    pub fn has_regulation_rate(&self) -> bool {
        self.regulation_rate.is_some()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state(), TariffState::Offered | TariffState::Active)
    }

    pub fn is_revoked(&self) -> bool {
        self.state() == TariffState::Killed
    }

    pub fn is_expired(&self, now: SimTime) -> bool {
        self.expiration.is_some_and(|exp| now >= exp)
    }

    pub fn is_subscribable(&self, now: SimTime) -> bool {
        self.is_active() && !self.is_expired(now) && !self.is_revoked()
    }

    pub fn is_time_of_use(&self) -> bool {
        self.rates.iter().any(Rate::is_time_of_use)
    }

    pub fn is_tiered(&self) -> bool {
        self.rates.iter().any(|r| r.tier_threshold > 0.0)
    }

    pub fn is_variable_rate(&self) -> bool {
        self.rates.iter().any(|r| !r.is_fixed())
    }

    pub fn is_interruptible(&self) -> bool {
        self.power_type.is_interruptible() && self.rates.iter().any(|r| r.max_curtailment != 0.0)
    }

    /// Finds the rate in effect at `at` for a usage of `kwh`.
    ///
    /// Among the rates whose window covers the hour, picks the highest tier
    /// whose threshold does not exceed `|kwh|`.
    pub fn rate_at(&self, at: SimTime, kwh: f64) -> Option<&Rate> {
        let hour = at.hour_of_day();
        let magnitude = kwh.abs();
        self.rates
            .iter()
            .filter(|r| r.applies_at(hour) && r.tier_threshold <= magnitude)
            .max_by(|a, b| a.tier_threshold.total_cmp(&b.tier_threshold))
    }

    /// Charge for `kwh` of usage at `at`, in the customer's sign convention
    /// (negative when the customer pays).
    ///
    /// Consumption is positive kWh against a negative rate and production is
    /// negative kWh against a positive rate, so production results are
    /// sign-flipped to match.
    pub fn usage_charge(&self, at: SimTime, kwh: f64) -> f64 {
        self.usage_charge_with(at, kwh, Rate::price)
    }

    /// Like [`usage_charge`](Self::usage_charge), valuing the selected rate
    /// with `price`.
    pub fn usage_charge_with(&self, at: SimTime, kwh: f64, price: impl Fn(&Rate) -> f64) -> f64 {
        let Some(rate) = self.rate_at(at, kwh) else {
            tracing::warn!(tariff = %self.id, %at, "no rate applies");
            return 0.0;
        };
        let sign = if self.power_type.is_production() { -1.0 } else { 1.0 };
        sign * kwh * price(rate)
    }

    /// Charge for balancing energy.
    ///
    /// Negative kWh is up-regulation and earns the up payment; positive kWh
    /// is down-regulation and costs the down payment. Without a regulation
    /// rate the energy is valued like ordinary usage.
    pub fn regulation_charge(&self, at: SimTime, kwh: f64) -> f64 {
        match self.regulation_rate {
            None => self.usage_charge(at, kwh),
            Some(reg) if kwh < 0.0 => -kwh * reg.up_payment,
            Some(reg) if kwh > 0.0 => kwh * reg.down_payment,
            Some(_) => 0.0,
        }
    }

    /// Largest up-regulation the broker may take from `kwh` of usage.
    pub fn max_up_regulation(&self, at: SimTime, kwh: f64) -> f64 {
        if !self.power_type.is_interruptible() {
            return 0.0;
        }
        self.rate_at(at, kwh).map_or(0.0, |r| kwh * r.max_curtailment)
    }
}
