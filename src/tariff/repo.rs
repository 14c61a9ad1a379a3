//! In-memory store of published tariffs.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use crate::sim::clock::SimTime;

use super::model::Tariff;
use super::types::{PowerType, TariffId};

/// Read access to published tariffs.
pub trait TariffSource {
    /// Collects, for every broker, up to `depth` of its most recently
    /// published subscribable tariffs of each tariff power type that a
    /// customer of `power_type` can use.
    fn recent_active_tariffs(
        &self,
        depth: usize,
        power_type: PowerType,
        now: SimTime,
    ) -> Vec<Rc<Tariff>>;

    /// Looks up a tariff by id, whatever its state.
    fn find_tariff(&self, id: TariffId) -> Option<Rc<Tariff>>;
}

/// Tariffs indexed by id and by broker, newest first.
#[derive(Debug, Default)]
pub struct TariffRepo {
    tariffs: HashMap<TariffId, Rc<Tariff>>,
    by_broker: BTreeMap<String, VecDeque<TariffId>>,
    next_id: u64,
}

impl TariffRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out an id larger than every id seen so far.
    pub fn next_id(&mut self) -> TariffId {
        self.next_id += 1;
        TariffId(self.next_id)
    }

    /// Stores a newly published tariff.
    ///
    /// If the tariff supersedes an existing one, the old tariff is linked to
    /// it.
    ///
    /// # Returns
    ///
    /// The shared handle, or `None` if the id is already taken.
    pub fn add(&mut self, tariff: Tariff) -> Option<Rc<Tariff>> {
        let id = tariff.id();
        if self.tariffs.contains_key(&id) {
            tracing::warn!(tariff = %id, "duplicate tariff id rejected");
            return None;
        }
        self.next_id = self.next_id.max(id.0);
        if let Some(old_id) = tariff.supersedes() {
            match self.tariffs.get(&old_id) {
                Some(old) => old.set_superseded_by(id),
                None => tracing::warn!(tariff = %id, superseded = %old_id, "superseded tariff not found"),
            }
        }
        let tariff = Rc::new(tariff);
        self.by_broker
            .entry(tariff.broker().to_string())
            .or_default()
            .push_front(id);
        self.tariffs.insert(id, Rc::clone(&tariff));
        Some(tariff)
    }

    /// Kills a tariff. Returns false if it is unknown or already killed.
    pub fn revoke(&mut self, id: TariffId) -> bool {
        self.tariffs.get(&id).is_some_and(|t| t.revoke())
    }

    pub fn len(&self) -> usize {
        self.tariffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tariffs.is_empty()
    }
}

impl TariffSource for TariffRepo {
    fn recent_active_tariffs(
        &self,
        depth: usize,
        power_type: PowerType,
        now: SimTime,
    ) -> Vec<Rc<Tariff>> {
        let mut result = Vec::new();
        for ids in self.by_broker.values() {
            let mut taken: HashMap<PowerType, usize> = HashMap::new();
            for id in ids {
                let Some(tariff) = self.tariffs.get(id) else {
                    continue;
                };
                if !tariff.is_subscribable(now) || !power_type.can_use(tariff.power_type()) {
                    continue;
                }
                let count = taken.entry(tariff.power_type()).or_insert(0);
                if *count < depth {
                    *count += 1;
                    result.push(Rc::clone(tariff));
                }
            }
        }
        result
    }

    fn find_tariff(&self, id: TariffId) -> Option<Rc<Tariff>> {
        self.tariffs.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tariff::Rate;

    fn offer(repo: &mut TariffRepo, broker: &str, pt: PowerType) -> TariffId {
        let id = repo.next_id();
        repo.add(Tariff::builder(id, broker, pt).rate(Rate::fixed(-0.1)).build());
        id
    }

    #[test]
    fn depth_limits_per_broker_and_type() {
        let mut repo = TariffRepo::new();
        let a1 = offer(&mut repo, "alice", PowerType::Consumption);
        let a2 = offer(&mut repo, "alice", PowerType::Consumption);
        let a3 = offer(&mut repo, "alice", PowerType::Consumption);
        let b1 = offer(&mut repo, "bob", PowerType::Consumption);

        let found: Vec<TariffId> = repo
            .recent_active_tariffs(2, PowerType::Consumption, SimTime::EPOCH)
            .iter()
            .map(|t| t.id())
            .collect();
        assert_eq!(found, vec![a3, a2, b1]);
        assert!(!found.contains(&a1));
    }

    #[test]
    fn excludes_killed_and_unusable() {
        let mut repo = TariffRepo::new();
        let c = offer(&mut repo, "alice", PowerType::Consumption);
        let p = offer(&mut repo, "alice", PowerType::Production);
        let i = offer(&mut repo, "alice", PowerType::InterruptibleConsumption);
        assert!(repo.revoke(c));

        let found: Vec<TariffId> = repo
            .recent_active_tariffs(5, PowerType::InterruptibleConsumption, SimTime::EPOCH)
            .iter()
            .map(|t| t.id())
            .collect();
        assert_eq!(found, vec![i]);
        assert!(!found.contains(&p));
    }

    #[test]
    fn superseding_links_old_tariff() {
        let mut repo = TariffRepo::new();
        let old = offer(&mut repo, "alice", PowerType::Consumption);
        let new_id = repo.next_id();
        repo.add(
            Tariff::builder(new_id, "alice", PowerType::Consumption)
                .rate(Rate::fixed(-0.1))
                .supersedes(old)
                .build(),
        );
        let old_tariff = repo.find_tariff(old);
        assert_eq!(old_tariff.and_then(|t| t.superseded_by()), Some(new_id));
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut repo = TariffRepo::new();
        let id = offer(&mut repo, "alice", PowerType::Consumption);
        let again = repo.add(
            Tariff::builder(id, "bob", PowerType::Consumption)
                .rate(Rate::fixed(-0.2))
                .build(),
        );
        assert!(again.is_none());
        assert_eq!(repo.len(), 1);
    }
}
