use std::collections::HashMap;

use crate::tariff::TariffId;

/// Forecast cost and inconvenience of one tariff for one customer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalData {
    pub cost: f64,
    pub inconvenience: f64,
}

/// Per-customer store of tariff evaluations.
///
/// Entries normally live for the whole run. In bypass mode the store is
/// emptied at the start of every cycle, so each cycle re-evaluates every
/// tariff once.
#[derive(Debug, Default, Clone)]
pub struct EvalCache {
    entries: HashMap<TariffId, EvalData>,
    bypass: bool,
}

impl EvalCache {
    pub fn new(bypass: bool) -> Self {
        Self {
            entries: HashMap::new(),
            bypass,
        }
    }

    pub fn set_bypass(&mut self, bypass: bool) {
        self.bypass = bypass;
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    /// Drops stale entries when bypassing.
    pub fn begin_cycle(&mut self) {
        if self.bypass {
            self.entries.clear();
        }
    }

    pub fn get(&self, id: TariffId) -> Option<EvalData> {
        self.entries.get(&id).copied()
    }

    pub fn insert(&mut self, id: TariffId, data: EvalData) {
        self.entries.insert(id, data);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
