use std::collections::HashMap;
use std::rc::Rc;

use crate::customer::CustomerInfo;
use crate::sim::clock::SimTime;
use crate::subscription::SubscriptionSource;
use crate::tariff::{PowerType, Tariff, TariffId, TariffRepo};

use super::MarketGateway;
use super::accounting::Accounting;

/// A subscription change waiting for settlement.
#[derive(Debug, Clone)]
pub struct PendingSubscription {
    pub tariff: Rc<Tariff>,
    pub customer: Rc<CustomerInfo>,
    pub count: i64,
}

/// Holds default tariffs and queues subscription directives until the
/// next settlement.
#[derive(Debug, Default)]
pub struct TariffMarket {
    defaults: HashMap<PowerType, Rc<Tariff>>,
    pending: Vec<PendingSubscription>,
}

impl TariffMarket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `tariff` as the default for its power type, replacing any
    /// earlier default.
    pub fn set_default_tariff(&mut self, tariff: Rc<Tariff>) {
        tracing::info!(tariff = %tariff.id(), power_type = %tariff.power_type(), "default tariff");
        self.defaults.insert(tariff.power_type(), tariff);
    }

    pub fn pending(&self) -> &[PendingSubscription] {
        &self.pending
    }

    /// Kills a published tariff. Default tariffs cannot be revoked.
    ///
    /// # Returns
    ///
    /// Whether the tariff was live and is now revoked.
    pub fn revoke_tariff(&mut self, tariffs: &mut TariffRepo, id: TariffId) -> bool {
        if self.defaults.values().any(|t| t.id() == id) {
            tracing::warn!(tariff = %id, "default tariff cannot be revoked");
            return false;
        }
        let revoked = tariffs.revoke(id);
        if revoked {
            tracing::info!(tariff = %id, "tariff revoked");
        }
        revoked
    }

    /// Applies every queued directive to the subscription store.
    ///
    /// Withdrawals are settled before signups, each group in queue order.
    /// A withdrawal from a subscription that does not exist is logged and
    /// dropped.
    ///
    /// # Returns
    ///
    /// The number of directives applied.
    pub fn process_pending_subscriptions(
        &mut self,
        subscriptions: &mut dyn SubscriptionSource,
        now: SimTime,
        accounting: &mut dyn Accounting,
    ) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let mut applied = 0;
        for p in pending.iter().filter(|p| p.count < 0) {
            match subscriptions.find_mut(p.customer.id, p.tariff.id()) {
                Some(sub) => {
                    sub.deferred_unsubscribe(p.count.unsigned_abs(), now, accounting);
                    applied += 1;
                }
                None => tracing::error!(
                    customer = %p.customer.name,
                    tariff = %p.tariff.id(),
                    "withdrawal from unknown subscription"
                ),
            }
        }
        for p in pending.iter().filter(|p| p.count > 0) {
            subscriptions
                .get_or_create(&p.customer, &p.tariff)
                .subscribe(p.count.unsigned_abs(), now, accounting);
            p.tariff.mark_subscribed();
            applied += 1;
        }
        applied
    }
}

impl MarketGateway for TariffMarket {
    fn default_tariff(&self, power_type: PowerType) -> Option<Rc<Tariff>> {
        self.defaults.get(&power_type).cloned()
    }

    fn subscribe_to_tariff(&mut self, tariff: &Rc<Tariff>, customer: &Rc<CustomerInfo>, count: i64) {
        if count == 0 {
            return;
        }
        tracing::debug!(customer = %customer.name, tariff = %tariff.id(), count, "subscription directive");
        self.pending.push(PendingSubscription {
            tariff: Rc::clone(tariff),
            customer: Rc::clone(customer),
            count,
        });
    }
}
