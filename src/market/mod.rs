//! The tariff market: default tariffs, subscription directives and the
//! transaction ledger.

pub mod accounting;
pub mod service;

use std::rc::Rc;

use crate::customer::CustomerInfo;
use crate::sim::clock::SimTime;
use crate::tariff::{PowerType, Tariff, TariffSource};

pub use accounting::{Accounting, Transaction, TransactionKind, TransactionLog};
pub use service::{PendingSubscription, TariffMarket};

/// The market operations customers and subscriptions call into.
pub trait MarketGateway {
    /// The default tariff offered for exactly `power_type`, if any.
    fn default_tariff(&self, power_type: PowerType) -> Option<Rc<Tariff>>;

    /// Queues a subscription change. A negative `count` withdraws customers.
    fn subscribe_to_tariff(&mut self, tariff: &Rc<Tariff>, customer: &Rc<CustomerInfo>, count: i64);
}

/// Default tariff for a power type, falling back to its generic type.
pub fn default_tariff_for(market: &dyn MarketGateway, power_type: PowerType) -> Option<Rc<Tariff>> {
    market
        .default_tariff(power_type)
        .or_else(|| market.default_tariff(power_type.generic_type()))
}

/// Where customers of a revoked tariff should go.
///
/// The superseding tariff wins if it is still subscribable; otherwise the
/// default tariff for the customer's power type.
pub fn successor_tariff(
    revoked: &Tariff,
    power_type: PowerType,
    tariffs: &dyn TariffSource,
    market: &dyn MarketGateway,
    now: SimTime,
) -> Option<Rc<Tariff>> {
    revoked
        .superseded_by()
        .and_then(|id| tariffs.find_tariff(id))
        .filter(|t| t.is_subscribable(now))
        .or_else(|| default_tariff_for(market, power_type))
}
