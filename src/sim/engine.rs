//! Market engine that runs customers, tariffs and settlement cycle by cycle.

use std::rc::Rc;

use crate::config::{MarketConfig, TariffConfig};
use crate::customer::sampled::UsageShape;
use crate::customer::{CustomerId, CustomerInfo, CustomerModelAccessor, SampledCustomerModel};
use crate::error::SimError;
use crate::evaluator::TariffEvaluator;
use crate::market::{self, MarketGateway, TariffMarket, TransactionLog};
use crate::subscription::{RegulationCapacity, RevocationOutcome, SubscriptionRepo};
use crate::tariff::{DailyWindow, Rate, Tariff, TariffId, TariffRepo};

use super::clock::{Clock, HOUR, SimTime};
use super::kpi::{CycleSummary, TariffShare};

/// Seed stride between customer models so their samples are uncorrelated.
const CUSTOMER_SEED_STRIDE: u64 = 7919;

/// Simulation engine owning the tariff repository, the market, the
/// subscription ledger and one evaluator per customer population.
///
/// Each cycle publishes and revokes the tariffs scheduled for it, lets every
/// customer evaluate, settles the resulting directives, moves anyone left
/// on a revoked tariff, and then bills usage for every timeslot. Inside the
/// configured control window, populations on curtailable tariffs are
/// curtailed and then drawn on for balancing energy.
pub struct MarketEngine {
    config: MarketConfig,
    clock: Clock,
    tariffs: TariffRepo,
    subscriptions: SubscriptionRepo,
    market: TariffMarket,
    log: TransactionLog,
    customers: Vec<TariffEvaluator<SampledCustomerModel>>,
    /// Published tariffs by configuration key, in publication order
    published: Vec<(String, TariffId)>,
    cycle: usize,
}

impl MarketEngine {
    /// Creates an engine for a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if the configuration is invalid.
    pub fn new(config: MarketConfig) -> Result<Self, SimError> {
        if let Some(err) = config.validate().into_iter().next() {
            return Err(err.into());
        }
        let s = &config.simulation;
        let clock = Clock::new(SimTime::EPOCH, HOUR, s.cycles * s.timeslots_per_cycle);

        let customers = config
            .customers
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let info = CustomerInfo::new(CustomerId(i as u32), &c.name, c.population, c.power_type)
                    .with_multi_contracting(c.multi_contracting);
                let shape = UsageShape {
                    base_kwh: c.base_kwh,
                    amplitude_kwh: c.amplitude_kwh,
                    noise_std: c.noise_std,
                };
                let model = SampledCustomerModel::new(
                    Rc::new(info),
                    shape,
                    s.profile_hours,
                    s.broker_switch_factor,
                    s.seed.wrapping_add(i as u64 * CUSTOMER_SEED_STRIDE),
                );
                TariffEvaluator::from_config(model, &config)
            })
            .collect();

        Ok(Self {
            clock,
            tariffs: TariffRepo::new(),
            subscriptions: SubscriptionRepo::new(),
            market: TariffMarket::new(),
            log: TransactionLog::new(),
            customers,
            published: Vec::new(),
            cycle: 0,
            config,
        })
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn tariffs(&self) -> &TariffRepo {
        &self.tariffs
    }

    pub fn subscriptions(&self) -> &SubscriptionRepo {
        &self.subscriptions
    }

    pub fn transactions(&self) -> &TransactionLog {
        &self.log
    }

    pub fn customers(&self) -> &[TariffEvaluator<SampledCustomerModel>] {
        &self.customers
    }

    /// Id of the tariff published under `key`, if it has been published.
    pub fn tariff_id(&self, key: &str) -> Option<TariffId> {
        self.published.iter().find(|(k, _)| k == key).map(|(_, id)| *id)
    }

    /// Whether every configured cycle has run.
    pub fn is_finished(&self) -> bool {
        self.cycle >= self.config.simulation.cycles
    }

    /// Runs all remaining cycles.
    ///
    /// # Errors
    ///
    /// Returns a `SimError` if a tariff names an unpublished predecessor.
    pub fn run(&mut self) -> Result<Vec<CycleSummary>, SimError> {
        let mut summaries = Vec::with_capacity(self.config.simulation.cycles);
        while !self.is_finished() {
            summaries.push(self.step()?);
        }
        Ok(summaries)
    }

    /// Runs one cycle and returns its summary.
    ///
    /// # Errors
    ///
    /// Returns `SimError::UnknownTariff` if a tariff supersedes one that
    /// has not been published.
    pub fn step(&mut self) -> Result<CycleSummary, SimError> {
        let cycle = self.cycle;
        let slots = self.config.simulation.timeslots_per_cycle;
        let first_slot = cycle * slots;
        let now = self.clock.slot_start(first_slot);
        self.log.set_timeslot(first_slot);

        let published = self.publish_tariffs(cycle)?;
        let revoked = self.revoke_tariffs(cycle);
        let mut settled = 0;
        if cycle == 0 {
            self.subscribe_to_defaults();
            settled += self
                .market
                .process_pending_subscriptions(&mut self.subscriptions, now, &mut self.log);
        }

        let mut allocation_balance = 0;
        for evaluator in &mut self.customers {
            evaluator.evaluate_tariffs(&self.tariffs, &mut self.subscriptions, &mut self.market, now);
            allocation_balance += evaluator.allocation_balance();
        }
        settled += self
            .market
            .process_pending_subscriptions(&mut self.subscriptions, now, &mut self.log);

        let migrations = self.migrate_revoked(now);
        if migrations > 0 {
            settled += self
                .market
                .process_pending_subscriptions(&mut self.subscriptions, now, &mut self.log);
        }

        let control = &self.config.control;
        let window = DailyWindow {
            begin: control.begin,
            end: control.end,
        };
        let mut curtailed_kwh = 0.0;
        let mut balancing_kwh = 0.0;
        for _ in 0..slots {
            let Some((slot, at)) = self.clock.tick() else {
                break;
            };
            self.log.set_timeslot(slot);
            let controlled = control.is_active() && window.contains(at.hour_of_day());
            for sub in self.subscriptions.iter_mut() {
                let committed = sub.customers_committed();
                if committed == 0 {
                    continue;
                }
                let model = self.customers[sub.customer().id.0 as usize].accessor();
                let usage = model.usage_at(at);
                let tariff = Rc::clone(sub.tariff());
                if tariff.is_interruptible() {
                    let up = tariff.max_up_regulation(at, usage).max(0.0);
                    sub.set_regulation_capacity(RegulationCapacity::new(up, 0.0));
                    if controlled {
                        sub.post_ratio_control(control.ratio);
                    }
                }
                sub.use_power(usage * committed as f64, at, &mut self.log);
                curtailed_kwh += sub.take_curtailment();

                if controlled && control.balancing_share > 0.0 && tariff.has_regulation_rate() {
                    let up = sub.remaining_regulation_capacity().up();
                    if up > 0.0 {
                        sub.post_balancing_control(-control.balancing_share * up, at, &mut self.log);
                        balancing_kwh += sub.take_regulation();
                    }
                }
            }
        }

        let summary = CycleSummary {
            cycle,
            start: now,
            published,
            revoked,
            settled,
            migrations,
            allocation_balance,
            population_conserved: self.population_conserved(),
            charges: self.log.charge_between(first_slot, first_slot + slots),
            curtailed_kwh,
            balancing_kwh,
            transactions: self
                .log
                .transactions()
                .iter()
                .filter(|t| t.timeslot >= first_slot && t.timeslot < first_slot + slots)
                .count(),
            shares: self.shares(),
        };
        tracing::info!(
            cycle,
            settled,
            migrations,
            allocation_balance,
            charges = summary.charges,
            curtailed_kwh,
            "cycle complete"
        );
        self.cycle += 1;
        Ok(summary)
    }

    fn publish_tariffs(&mut self, cycle: usize) -> Result<usize, SimError> {
        let mut count = 0;
        for cfg in self.config.tariffs.iter().filter(|t| t.publish_cycle == cycle) {
            let supersedes = match &cfg.supersedes {
                Some(key) => Some(
                    self.published
                        .iter()
                        .find(|(k, _)| k == key)
                        .map(|(_, id)| *id)
                        .ok_or_else(|| SimError::UnknownTariff(key.clone()))?,
                ),
                None => None,
            };
            let id = self.tariffs.next_id();
            let Some(tariff) = self.tariffs.add(build_tariff(cfg, id, supersedes)) else {
                continue;
            };
            tracing::info!(key = %cfg.key, tariff = %id, broker = %cfg.broker, "tariff published");
            if cfg.default {
                self.market.set_default_tariff(tariff);
            }
            self.published.push((cfg.key.clone(), id));
            count += 1;
        }
        Ok(count)
    }

    fn revoke_tariffs(&mut self, cycle: usize) -> usize {
        let mut count = 0;
        for cfg in self.config.tariffs.iter().filter(|t| t.revoke_cycle == Some(cycle)) {
            let Some(id) = self.published.iter().find(|(k, _)| *k == cfg.key).map(|(_, id)| *id)
            else {
                tracing::warn!(key = %cfg.key, "revocation of unpublished tariff");
                continue;
            };
            if self.market.revoke_tariff(&mut self.tariffs, id) {
                tracing::debug!(key = %cfg.key, tariff = %id, "scheduled revocation");
                count += 1;
            }
        }
        count
    }

    /// Places every customer population on its default tariff.
    fn subscribe_to_defaults(&mut self) {
        for evaluator in &self.customers {
            let info = evaluator.accessor().customer_info();
            match market::default_tariff_for(&self.market, info.power_type) {
                Some(default) => {
                    let count = info.population as i64;
                    self.market.subscribe_to_tariff(&default, info, count);
                }
                None => tracing::error!(customer = %info.name, "no default tariff"),
            }
        }
    }

    /// Moves any population still committed to a revoked tariff.
    fn migrate_revoked(&mut self, now: SimTime) -> usize {
        let mut moved = 0;
        for sub in self.subscriptions.iter() {
            if !sub.tariff().is_revoked() || sub.is_empty() {
                continue;
            }
            match sub.handle_revoked_tariff(&self.tariffs, &mut self.market, now) {
                RevocationOutcome::Migrated(_) => moved += 1,
                RevocationOutcome::NoReplacement => tracing::error!(
                    tariff = %sub.tariff().id(),
                    customer = %sub.customer().name,
                    "population stranded on revoked tariff"
                ),
                RevocationOutcome::NotRevoked | RevocationOutcome::Empty => {}
            }
        }
        moved
    }

    fn population_conserved(&self) -> bool {
        self.customers.iter().all(|e| {
            let info = e.accessor().customer_info();
            self.subscriptions.committed_for(info.id) == info.population
        })
    }

    fn shares(&self) -> Vec<TariffShare> {
        self.published
            .iter()
            .map(|(key, id)| TariffShare {
                key: key.clone(),
                tariff: *id,
                committed: self.subscriptions.committed_to(*id),
            })
            .collect()
    }
}

/// Builds the tariff described by `cfg`.
///
/// The base rate applies all day. A peak rate is added after it, so it
/// takes precedence inside its window; a tier rate takes over above its
/// threshold.
pub fn build_tariff(cfg: &TariffConfig, id: TariffId, supersedes: Option<TariffId>) -> Tariff {
    let base = match &cfg.variable {
        Some(v) => Rate::variable(cfg.rate, v.expected_mean, v.max_value),
        None => Rate::fixed(cfg.rate),
    };
    let mut builder = Tariff::builder(id, &cfg.broker, cfg.power_type)
        .rate(base.with_max_curtailment(cfg.max_curtailment))
        .signup_payment(cfg.signup_payment)
        .early_withdraw_payment(cfg.early_withdraw_payment)
        .periodic_payment(cfg.periodic_payment)
        .min_duration_days(cfg.min_duration_days);
    if let Some(peak) = &cfg.peak {
        builder = builder.rate(
            Rate::fixed(peak.rate)
                .with_window(peak.begin, peak.end)
                .with_max_curtailment(cfg.max_curtailment),
        );
    }
    if let Some(tier) = &cfg.tier {
        builder = builder.rate(
            Rate::fixed(tier.rate)
                .with_tier_threshold(tier.threshold)
                .with_max_curtailment(cfg.max_curtailment),
        );
    }
    if let Some(reg) = &cfg.regulation {
        builder = builder.regulation_rate(reg.up, reg.down);
    }
    if let Some(prev) = supersedes {
        builder = builder.supersedes(prev);
    }
    builder.build()
}
