//! Committed population, contract expirations and regulation bookkeeping for
//! one customer on one tariff.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::customer::CustomerInfo;
use crate::market::accounting::{Accounting, TransactionKind};
use crate::market::{self, MarketGateway};
use crate::sim::clock::SimTime;
use crate::tariff::{Tariff, TariffSource};

use super::regulation::RegulationCapacity;

/// Customers whose minimum contract duration ends at `horizon`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationRecord {
    pub horizon: SimTime,
    pub count: u64,
}

/// Result of [`Subscription::handle_revoked_tariff`].
#[derive(Debug, Clone)]
pub enum RevocationOutcome {
    /// The tariff is still live; nothing was done.
    NotRevoked,
    /// Revoked, but nobody is subscribed.
    Empty,
    /// The population was directed to the given tariff.
    Migrated(Rc<Tariff>),
    /// Revoked, and neither a successor nor a default tariff exists.
    NoReplacement,
}

/// Binding of a customer population to a tariff.
///
/// Usage, regulation and capacity figures are totals for the whole
/// committed population. The committed count changes only through
/// [`subscribe`](Self::subscribe) and
/// [`deferred_unsubscribe`](Self::deferred_unsubscribe); the sum of the
/// expiration records always equals the committed count.
#[derive(Debug, Clone)]
pub struct Subscription {
    customer: Rc<CustomerInfo>,
    tariff: Rc<Tariff>,
    committed: u64,
    expirations: VecDeque<ExpirationRecord>,
    pending_ratio: f64,
    capacity: RegulationCapacity,
    regulation: f64,
    pending_unsubscribe: u64,
    original_kwh: f64,
}

impl Subscription {
    /// Creates an empty subscription.
    pub fn new(customer: Rc<CustomerInfo>, tariff: Rc<Tariff>) -> Self {
        Self {
            customer,
            tariff,
            committed: 0,
            expirations: VecDeque::new(),
            pending_ratio: 0.0,
            capacity: RegulationCapacity::ZERO,
            regulation: 0.0,
            pending_unsubscribe: 0,
            original_kwh: 0.0,
        }
    }

    pub fn customer(&self) -> &Rc<CustomerInfo> {
        &self.customer
    }

    pub fn tariff(&self) -> &Rc<Tariff> {
        &self.tariff
    }

    pub fn customers_committed(&self) -> u64 {
        self.committed
    }

    pub fn is_empty(&self) -> bool {
        self.committed == 0
    }

    pub fn expirations(&self) -> impl Iterator<Item = &ExpirationRecord> {
        self.expirations.iter()
    }

    /// Customers removed by [`unsubscribe`](Self::unsubscribe) but not yet
    /// settled.
    pub fn pending_unsubscribe_count(&self) -> u64 {
        self.pending_unsubscribe
    }

    /// Net usage (after economic control) of the most recent `use_power`.
    pub fn original_kwh(&self) -> f64 {
        self.original_kwh
    }

    /// Adds `count` customers and posts the signup payment.
    ///
    /// Their contracts run until `now + min_duration`; customers with the
    /// same horizon share an expiration record.
    pub fn subscribe(&mut self, count: u64, now: SimTime, accounting: &mut dyn Accounting) {
        self.committed += count;
        let horizon = now.plus(self.tariff.min_duration_ms());
        match self.expirations.back_mut() {
            Some(last) if last.horizon == horizon => last.count += count,
            _ => self.expirations.push_back(ExpirationRecord { horizon, count }),
        }
        if self.tariff.signup_payment() != 0.0 {
            tracing::debug!(
                customer = %self.customer.name,
                tariff = %self.tariff.id(),
                count,
                total = count as f64 * self.tariff.signup_payment(),
                "signup payment"
            );
        }
        accounting.add_tariff_transaction(
            TransactionKind::Signup,
            &self.tariff,
            &self.customer,
            count,
            0.0,
            count as f64 * -self.tariff.signup_payment(),
        );
    }

    /// Asks the market to remove `count` customers at the next settlement.
    ///
    /// Remaining regulation capacity is discounted for the pending
    /// customers until the withdrawal is settled.
    pub fn unsubscribe(&mut self, count: u64, market: &mut dyn MarketGateway) {
        market.subscribe_to_tariff(&self.tariff, &self.customer, -(count as i64));
        self.pending_unsubscribe += count;
    }

    /// Removes customers, charging early-withdrawal penalties for those
    /// still inside their minimum contract duration.
    ///
    /// Contracts are released oldest first. A count larger than the
    /// committed population is clamped and logged. No penalty is charged on
    /// a revoked tariff. A signup fee is refunded to every departing
    /// customer.
    pub fn deferred_unsubscribe(
        &mut self,
        count: u64,
        now: SimTime,
        accounting: &mut dyn Accounting,
    ) {
        self.pending_unsubscribe = 0;
        let mut count = count;
        if count == self.committed {
            self.capacity = RegulationCapacity::ZERO;
            self.regulation = 0.0;
        }
        if count > self.committed {
            tracing::error!(
                tariff = %self.tariff.id(),
                customer = %self.customer.name,
                count,
                committed = self.committed,
                "attempt to unsubscribe more customers than committed"
            );
            count = self.committed;
        }

        let free_agents = self.expired_customer_count(now);
        let penalty_count = count.saturating_sub(free_agents);

        let mut remaining = count;
        while remaining > 0 {
            let Some(front) = self.expirations.front_mut() else {
                break;
            };
            if front.count <= remaining {
                remaining -= front.count;
                self.expirations.pop_front();
            } else {
                front.count -= remaining;
                remaining = 0;
            }
        }

        self.committed -= count;
        if self.committed == 0 {
            self.capacity = RegulationCapacity::ZERO;
        }

        let withdraw_payment = if self.tariff.is_revoked() {
            0.0
        } else {
            -self.tariff.early_withdraw_payment()
        };
        accounting.add_tariff_transaction(
            TransactionKind::Withdraw,
            &self.tariff,
            &self.customer,
            count,
            0.0,
            penalty_count as f64 * withdraw_payment,
        );
        if self.tariff.signup_payment() < 0.0 {
            accounting.add_tariff_transaction(
                TransactionKind::Refund,
                &self.tariff,
                &self.customer,
                count,
                0.0,
                count as f64 * self.tariff.signup_payment(),
            );
        }
    }

    /// Number of committed customers whose minimum duration has run out.
    pub fn expired_customer_count(&self, now: SimTime) -> u64 {
        self.expirations
            .iter()
            .filter(|r| r.horizon <= now)
            .map(|r| r.count)
            .sum()
    }

    /// Moves the population off a revoked tariff.
    ///
    /// The replacement is the superseding tariff if it can still be
    /// subscribed, otherwise the market default for the customer's power
    /// type, otherwise the default for its generic type. Both directives go
    /// through the market and take effect at the next settlement.
    pub fn handle_revoked_tariff(
        &self,
        tariffs: &dyn TariffSource,
        market: &mut dyn MarketGateway,
        now: SimTime,
    ) -> RevocationOutcome {
        if !self.tariff.is_revoked() {
            tracing::warn!(tariff = %self.tariff.id(), "tariff is not revoked");
            return RevocationOutcome::NotRevoked;
        }
        if self.committed == 0 {
            return RevocationOutcome::Empty;
        }
        let Some(successor) =
            market::successor_tariff(&self.tariff, self.customer.power_type, tariffs, &*market, now)
        else {
            tracing::error!(
                tariff = %self.tariff.id(),
                customer = %self.customer.name,
                "no replacement for revoked tariff"
            );
            return RevocationOutcome::NoReplacement;
        };
        let count = self.committed as i64;
        market.subscribe_to_tariff(&self.tariff, &self.customer, -count);
        market.subscribe_to_tariff(&successor, &self.customer, count);
        tracing::info!(
            tariff = %self.tariff.id(),
            successor = %successor.id(),
            customer = %self.customer.name,
            count,
            "revoked tariff superseded"
        );
        RevocationOutcome::Migrated(successor)
    }

    /// Posts the population's usage for the current timeslot.
    ///
    /// Any pending economic control is applied first and reduces the
    /// energy billed. Positive `kwh` is consumption.
    pub fn use_power(&mut self, kwh: f64, now: SimTime, accounting: &mut dyn Accounting) {
        let net = kwh - self.economic_regulation(kwh, now);
        self.original_kwh = net;
        tracing::debug!(customer = %self.customer.name, tariff = %self.tariff.id(), kwh, net, "use power");
        let kind = if net < 0.0 {
            TransactionKind::Produce
        } else {
            TransactionKind::Consume
        };
        let charge = self.tariff.usage_charge(now, net);
        accounting.add_tariff_transaction(kind, &self.tariff, &self.customer, self.committed, -net, -charge);

        let periodic = self.tariff.periodic_payment();
        if periodic != 0.0 {
            accounting.add_tariff_transaction(
                TransactionKind::Periodic,
                &self.tariff,
                &self.customer,
                self.committed,
                0.0,
                self.committed as f64 * -periodic / 24.0,
            );
        }
    }

    /// Computes and applies the regulation requested by the pending ratio.
    ///
    /// Without a regulation rate this is plain curtailment bounded by the
    /// tariff's maximum, and it also refreshes the up-regulation capacity.
    fn economic_regulation(&mut self, proposed: f64, now: SimTime) -> f64 {
        self.regulation = 0.0;
        let ratio = self.pending_ratio;
        let mut result = 0.0;
        if self.tariff.has_regulation_rate() {
            if ratio < 0.0 {
                result = -ratio * self.capacity.down();
                self.capacity.set_down(self.capacity.down() - result);
            } else if ratio > 1.0 {
                let up = self.capacity.up();
                if up > proposed {
                    result = proposed + (ratio - 1.0) * (up - proposed);
                    self.capacity.set_up(up - result);
                }
            } else {
                result = ratio * self.capacity.up();
                self.capacity.set_up(self.capacity.up() - result);
            }
        } else {
            let max_up = self.tariff.max_up_regulation(now, proposed);
            result = (proposed * ratio).min(max_up);
            self.capacity.set_up(max_up - result);
        }
        if result != 0.0 {
            tracing::info!(customer = %self.customer.name, tariff = %self.tariff.id(), result, "economic control");
        }
        self.regulation += result;
        self.pending_ratio = 0.0;
        result
    }

    /// Requests economic control for the next `use_power` call.
    ///
    /// `0..=1` curtails that fraction of the capacity, `-1..0` asks for
    /// down-regulation and `1..=2` asks a storage customer to discharge.
    pub fn post_ratio_control(&mut self, ratio: f64) {
        self.pending_ratio = ratio;
    }

    /// Records balancing energy taken from the population in this timeslot.
    ///
    /// Negative `kwh` is up-regulation. When the regulation moves against
    /// the timeslot's usage, the usage charge for the regulated energy is
    /// credited back before the regulation charge is posted.
    pub fn post_balancing_control(&mut self, kwh: f64, now: SimTime, accounting: &mut dyn Accounting) {
        let mut correction = 0.0;
        if self.tariff.has_regulation_rate() && signum(kwh) != signum(self.original_kwh) {
            correction = -self.tariff.usage_charge(now, kwh);
            tracing::info!(correction, "regulation charge adjustment");
        }
        let reg_charge = -self.tariff.regulation_charge(now, kwh);
        let updated = reg_charge - correction;
        accounting.add_regulation_transaction(&self.tariff, &self.customer, self.committed, -kwh, -updated);
        self.regulation += kwh;
        if kwh <= 0.0 {
            self.capacity.set_up(self.capacity.up() + kwh);
        } else {
            self.capacity.set_down(self.capacity.down() + kwh);
        }
    }

    /// Capacity still available this timeslot, discounted for pending
    /// unsubscribes.
    pub fn remaining_regulation_capacity(&self) -> RegulationCapacity {
        if self.committed == 0 {
            return RegulationCapacity::ZERO;
        }
        if self.pending_unsubscribe == 0 {
            return self.capacity;
        }
        let remaining = self.committed.saturating_sub(self.pending_unsubscribe);
        self.capacity.scaled(remaining as f64 / self.committed as f64)
    }

    /// Sets the capacity from a per-member figure.
    pub fn set_regulation_capacity(&mut self, per_member: RegulationCapacity) {
        self.capacity = per_member.scaled(self.committed as f64);
    }

    /// Returns the regulation exercised since the last usage and resets it.
    pub fn take_regulation(&mut self) -> f64 {
        std::mem::take(&mut self.regulation)
    }

    /// Returns the curtailed part of the exercised regulation and resets it.
    ///
    /// Only regulation in the direction of the customer's usage counts:
    /// positive for consumers, negative for producers.
    pub fn take_curtailment(&mut self) -> f64 {
        let sgn = if self.tariff.power_type().is_production() { -1.0 } else { 1.0 };
        let result = sgn * (sgn * self.regulation).max(0.0);
        self.regulation = 0.0;
        result
    }
}

/// Three-valued sign, with zero distinct from both.
fn signum(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}
