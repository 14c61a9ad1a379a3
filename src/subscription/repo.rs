//! In-memory store of subscriptions, keyed by customer and tariff.

use std::collections::HashMap;
use std::rc::Rc;

use crate::customer::{CustomerId, CustomerInfo};
use crate::tariff::{Tariff, TariffId};

use super::ledger::Subscription;

/// Access to the subscriptions of customer populations.
pub trait SubscriptionSource {
    /// Subscriptions of `customer` with at least one committed member,
    /// including those on revoked tariffs.
    fn active_subscriptions(&self, customer: CustomerId) -> Vec<&Subscription>;

    /// Non-empty subscriptions of `customer` whose tariff has been revoked.
    fn revoked_subscriptions(&self, customer: CustomerId) -> Vec<&Subscription>;

    fn find_mut(&mut self, customer: CustomerId, tariff: TariffId) -> Option<&mut Subscription>;

    /// Returns the subscription for the pair, creating an empty one if needed.
    fn get_or_create(
        &mut self,
        customer: &Rc<CustomerInfo>,
        tariff: &Rc<Tariff>,
    ) -> &mut Subscription;
}

/// Subscriptions in creation order. Empty subscriptions are kept.
#[derive(Debug, Default)]
pub struct SubscriptionRepo {
    subscriptions: Vec<Subscription>,
    index: HashMap<(CustomerId, TariffId), usize>,
}

impl SubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, customer: CustomerId, tariff: TariffId) -> Option<&Subscription> {
        self.index
            .get(&(customer, tariff))
            .map(|&i| &self.subscriptions[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Subscription> {
        self.subscriptions.iter_mut()
    }

    /// Total customers committed to a tariff across all populations.
    pub fn committed_to(&self, tariff: TariffId) -> u64 {
        self.subscriptions
            .iter()
            .filter(|s| s.tariff().id() == tariff)
            .map(Subscription::customers_committed)
            .sum()
    }

    /// Committed customers of one population, summed over its subscriptions.
    pub fn committed_for(&self, customer: CustomerId) -> u64 {
        self.subscriptions
            .iter()
            .filter(|s| s.customer().id == customer)
            .map(Subscription::customers_committed)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl SubscriptionSource for SubscriptionRepo {
    fn active_subscriptions(&self, customer: CustomerId) -> Vec<&Subscription> {
        self.subscriptions
            .iter()
            .filter(|s| s.customer().id == customer && !s.is_empty())
            .collect()
    }

    fn revoked_subscriptions(&self, customer: CustomerId) -> Vec<&Subscription> {
        self.subscriptions
            .iter()
            .filter(|s| s.customer().id == customer && !s.is_empty() && s.tariff().is_revoked())
            .collect()
    }

    fn find_mut(&mut self, customer: CustomerId, tariff: TariffId) -> Option<&mut Subscription> {
        let i = *self.index.get(&(customer, tariff))?;
        self.subscriptions.get_mut(i)
    }

    fn get_or_create(
        &mut self,
        customer: &Rc<CustomerInfo>,
        tariff: &Rc<Tariff>,
    ) -> &mut Subscription {
        let key = (customer.id, tariff.id());
        let i = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                self.subscriptions
                    .push(Subscription::new(Rc::clone(customer), Rc::clone(tariff)));
                let i = self.subscriptions.len() - 1;
                self.index.insert(key, i);
                i
            }
        };
        &mut self.subscriptions[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::accounting::TransactionLog;
    use crate::sim::clock::SimTime;
    use crate::tariff::{PowerType, Rate};

    #[test]
    fn get_or_create_reuses_subscription() {
        let customer = Rc::new(CustomerInfo::new(CustomerId(1), "town", 50, PowerType::Consumption));
        let tariff = Rc::new(
            Tariff::builder(TariffId(1), "bob", PowerType::Consumption)
                .rate(Rate::fixed(-0.1))
                .build(),
        );
        let mut repo = SubscriptionRepo::new();
        let mut log = TransactionLog::new();
        repo.get_or_create(&customer, &tariff)
            .subscribe(20, SimTime::EPOCH, &mut log);
        repo.get_or_create(&customer, &tariff)
            .subscribe(5, SimTime::EPOCH, &mut log);

        assert_eq!(repo.len(), 1);
        assert_eq!(repo.committed_to(TariffId(1)), 25);
        assert_eq!(repo.active_subscriptions(CustomerId(1)).len(), 1);
        assert!(repo.revoked_subscriptions(CustomerId(1)).is_empty());

        tariff.revoke();
        assert_eq!(repo.revoked_subscriptions(CustomerId(1)).len(), 1);
    }

    #[test]
    fn empty_subscriptions_are_not_active() {
        let customer = Rc::new(CustomerInfo::new(CustomerId(2), "farm", 5, PowerType::Consumption));
        let tariff = Rc::new(
            Tariff::builder(TariffId(2), "bob", PowerType::Consumption)
                .rate(Rate::fixed(-0.1))
                .build(),
        );
        let mut repo = SubscriptionRepo::new();
        repo.get_or_create(&customer, &tariff);
        assert!(repo.active_subscriptions(CustomerId(2)).is_empty());
        assert!(repo.find(CustomerId(2), TariffId(2)).is_some());
        assert!(repo.find_mut(CustomerId(2), TariffId(3)).is_none());
    }
}
