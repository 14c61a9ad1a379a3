//! Tariff choice for one customer population.
//!
//! Once per publication cycle, [`TariffEvaluator::evaluate_tariffs`] scores
//! every tariff the population could move to against the market default,
//! turns the scores into logit choice probabilities, and moves chunks of
//! each subscription's population according to random samples supplied by
//! the customer model. The moves are issued to the market as subscription
//! directives and settled later.

pub mod cache;
pub mod helper;
pub mod utility;

use std::rc::Rc;

use crate::config::MarketConfig;
use crate::customer::{CustomerModelAccessor, Transfer};
use crate::market::{self, MarketGateway};
use crate::sim::clock::{DAY, HOUR, SimTime};
use crate::subscription::SubscriptionSource;
use crate::tariff::{Tariff, TariffSource};

pub use cache::{EvalCache, EvalData};
pub use helper::TariffEvaluationHelper;
pub use utility::TariffUtility;

use utility::{assign_probabilities, constrain_utility, logit_lambda, normalized_difference};

/// Logit sharpness of a perfectly rational customer.
const LAMBDA_MAX: f64 = 50.0;
/// Length, in days, that forecast costs are normalized to.
const STD_DURATION_DAYS: f64 = 2.0;
/// Profile length assumed before any profile has been seen.
const DEFAULT_PROFILE_LENGTH: usize = 168;
/// Period over which a signup fee is felt.
const SIGNUP_FEE_PERIOD: i64 = 6 * HOUR;
/// Contracts at or below this minimum duration carry no withdrawal cost.
const MIN_EXPIRATION_INTERVAL: i64 = DAY;
/// Upper bound on the time-of-use inconvenience weight.
const TOU_FACTOR_CAP: f64 = 0.0;

/// Snapshot of a subscription taken before any directive is issued.
struct SubscriptionView {
    tariff: Rc<Tariff>,
    committed: u64,
    expired: u64,
}

/// Inputs shared by every subscription in one evaluation cycle.
struct CycleContext<'a> {
    candidates: &'a [Rc<Tariff>],
    default: &'a Rc<Tariff>,
    default_eval: EvalData,
    inertia: f64,
    now: SimTime,
}

fn push_unique(list: &mut Vec<Rc<Tariff>>, tariff: &Rc<Tariff>) {
    if !list.iter().any(|t| t.id() == tariff.id()) {
        list.push(Rc::clone(tariff));
    }
}

/// Decides which tariffs a customer population subscribes to.
///
/// Owns the customer model it draws profiles and samples from, plus a
/// cache of per-tariff evaluations that persists across cycles.
#[derive(Debug)]
pub struct TariffEvaluator<A: CustomerModelAccessor> {
    accessor: A,
    helper: TariffEvaluationHelper,
    cache: EvalCache,
    /// Net population change per tariff in the current cycle, in first-touch order
    allocations: Vec<(Rc<Tariff>, i64)>,

    chunk_size: u64,
    max_chunk_count: u64,
    tariff_eval_depth: usize,
    inertia: f64,
    signup_bonus_factor: f64,
    rationality: f64,
    inconvenience_weight: f64,
    tariff_switch_factor: f64,
    preferred_duration_days: f64,
    evaluate_all_tariffs: bool,

    tou_factor: f64,
    tiered_rate_factor: f64,
    variable_pricing_factor: f64,
    interruptibility_factor: f64,

    evaluation_count: u32,
    profile_length: usize,
}

impl<A: CustomerModelAccessor> TariffEvaluator<A> {
    /// Creates an evaluator with default settings.
    pub fn new(accessor: A) -> Self {
        Self {
            accessor,
            helper: TariffEvaluationHelper::new(),
            cache: EvalCache::new(false),
            allocations: Vec::new(),
            chunk_size: 1,
            max_chunk_count: 200,
            tariff_eval_depth: 5,
            inertia: 0.8,
            signup_bonus_factor: 0.1,
            rationality: 0.9,
            inconvenience_weight: 0.2,
            tariff_switch_factor: 0.04,
            preferred_duration_days: 6.0,
            evaluate_all_tariffs: false,
            tou_factor: 0.2_f64.min(TOU_FACTOR_CAP),
            tiered_rate_factor: 0.1,
            variable_pricing_factor: 0.5,
            interruptibility_factor: 0.2,
            evaluation_count: 0,
            profile_length: DEFAULT_PROFILE_LENGTH,
        }
    }

    /// Creates an evaluator configured from every evaluator-related section
    /// of `config`.
    pub fn from_config(accessor: A, config: &MarketConfig) -> Self {
        let e = &config.evaluator;
        let mut evaluator = Self::new(accessor)
            .with_chunk_size(e.chunk_size)
            .with_max_chunk_count(e.max_chunk_count)
            .with_tariff_eval_depth(e.tariff_eval_depth)
            .with_inertia(e.inertia)
            .with_signup_bonus_factor(e.signup_bonus_factor)
            .with_rationality(e.rationality)
            .with_inconvenience_weight(e.inconvenience_weight)
            .with_tariff_switch_factor(e.tariff_switch_factor)
            .with_preferred_contract_duration(e.preferred_contract_duration_days)
            .with_evaluate_all_tariffs(e.evaluate_all_tariffs);
        let i = &config.inconvenience;
        evaluator.initialize_inconvenience_factors(i.tou, i.tiered, i.variable, i.interruptible);
        let r = &config.regulation;
        evaluator.initialize_regulation_factors(
            r.expected_curtailment,
            r.expected_discharge,
            r.expected_down_regulation,
        );
        evaluator.initialize_cost_factors(config.cost.wt_expected, config.cost.wt_max);
        evaluator
    }

    /// Largest number of customers moved as one decision. Zero is rejected.
    pub fn with_chunk_size(mut self, size: u64) -> Self {
        if size > 0 {
            self.chunk_size = size;
        } else {
            tracing::error!(size, "chunk size must be positive");
        }
        self
    }

    /// Target number of chunks for a large population. Zero is rejected.
    pub fn with_max_chunk_count(mut self, count: u64) -> Self {
        if count > 0 {
            self.max_chunk_count = count;
        } else {
            tracing::error!(count, "max chunk count must be positive");
        }
        self
    }

    /// Number of recent tariffs per broker and power type to consider.
    pub fn with_tariff_eval_depth(mut self, depth: usize) -> Self {
        self.tariff_eval_depth = depth;
        self
    }

    pub fn with_inertia(mut self, inertia: f64) -> Self {
        self.inertia = inertia;
        self
    }

    /// Fraction of inertia that still applies when a signup bonus is offered.
    pub fn with_signup_bonus_factor(mut self, factor: f64) -> Self {
        self.signup_bonus_factor = factor;
        self
    }

    /// Rationality in `[0, 1]`; values outside are rejected.
    pub fn with_rationality(mut self, rationality: f64) -> Self {
        if (0.0..=1.0).contains(&rationality) {
            self.rationality = rationality;
        } else {
            tracing::error!(rationality, "rationality must be in [0, 1]");
        }
        self
    }

    pub fn with_inconvenience_weight(mut self, weight: f64) -> Self {
        self.inconvenience_weight = weight;
        self
    }

    pub fn with_tariff_switch_factor(mut self, factor: f64) -> Self {
        self.tariff_switch_factor = factor;
        self
    }

    pub fn with_preferred_contract_duration(mut self, days: f64) -> Self {
        if days > 0.0 {
            self.preferred_duration_days = days;
        } else {
            tracing::error!(days, "preferred contract duration must be positive");
        }
        self
    }

    /// Re-evaluates every tariff each cycle instead of reusing evaluations.
    pub fn with_evaluate_all_tariffs(mut self, value: bool) -> Self {
        self.evaluate_all_tariffs = value;
        self.cache.set_bypass(value);
        self
    }

    /// Sets the inconvenience weights of tariff features.
    ///
    /// The time-of-use weight is capped at zero.
    pub fn initialize_inconvenience_factors(
        &mut self,
        tou: f64,
        tiered: f64,
        variable: f64,
        interruptible: f64,
    ) {
        self.tou_factor = tou.min(TOU_FACTOR_CAP);
        self.tiered_rate_factor = tiered;
        self.variable_pricing_factor = variable;
        self.interruptibility_factor = interruptible;
    }

    /// Sets expected per-hour regulation. Values of the wrong sign are
    /// logged and replaced by 0.
    pub fn initialize_regulation_factors(&mut self, curtailment: f64, discharge: f64, down: f64) {
        let name = &self.accessor.customer_info().name;
        let curtailment = if curtailment > 0.0 {
            tracing::error!(customer = %name, curtailment, "expected curtailment must be non-positive");
            0.0
        } else {
            curtailment
        };
        let discharge = if discharge > 0.0 {
            tracing::error!(customer = %name, discharge, "expected discharge must be non-positive");
            0.0
        } else {
            discharge
        };
        let down = if down < 0.0 {
            tracing::error!(customer = %name, down, "expected down-regulation must be non-negative");
            0.0
        } else {
            down
        };
        self.helper.initialize_regulation_factors(curtailment, discharge, down);
    }

    pub fn initialize_cost_factors(&mut self, wt_expected: f64, wt_max: f64) {
        self.helper.initialize_cost_factors(wt_expected, wt_max);
    }

    pub fn accessor(&self) -> &A {
        &self.accessor
    }

    pub fn accessor_mut(&mut self) -> &mut A {
        &mut self.accessor
    }

    pub fn helper(&self) -> &TariffEvaluationHelper {
        &self.helper
    }

    pub fn cache(&self) -> &EvalCache {
        &self.cache
    }

    /// Completed calls to [`evaluate_tariffs`](Self::evaluate_tariffs).
    pub fn evaluation_count(&self) -> u32 {
        self.evaluation_count
    }

    pub fn tou_factor(&self) -> f64 {
        self.tou_factor
    }

    pub fn rationality(&self) -> f64 {
        self.rationality
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Length of the most recent forecast profile, in hours.
    pub fn profile_length(&self) -> usize {
        self.profile_length
    }

    /// Net changes issued by the last evaluation, per tariff.
    pub fn allocations(&self) -> &[(Rc<Tariff>, i64)] {
        &self.allocations
    }

    /// Sum of the last evaluation's net changes; zero when population is
    /// conserved.
    pub fn allocation_balance(&self) -> i64 {
        self.allocations.iter().map(|(_, n)| n).sum()
    }

    /// Ratio of the profile length to the standard evaluation length.
    pub fn scale_factor(&self) -> f64 {
        self.profile_length as f64 / (STD_DURATION_DAYS * 24.0)
    }

    /// Effective inertia for the next evaluation.
    ///
    /// Grows from zero over the first cycles so that a new population
    /// spreads quickly across the market.
    pub fn effective_inertia(&self) -> f64 {
        let ramp = 1.0 - 2.0_f64.powi(1 - self.evaluation_count as i32);
        (ramp * self.inertia).max(0.0)
    }

    /// Sum of the inconvenience weights of the tariff's features.
    pub fn compute_inconvenience(&self, tariff: &Tariff) -> f64 {
        let mut result = 0.0;
        if tariff.is_time_of_use() {
            result += self.tou_factor;
        }
        if tariff.is_tiered() {
            result += self.tiered_rate_factor;
        }
        if tariff.is_variable_rate() {
            result += self.variable_pricing_factor;
        }
        if tariff.is_interruptible() {
            result += self.interruptibility_factor;
        }
        result
    }

    /// Value of a tariff's signup payment over the evaluation horizon.
    ///
    /// A fee is amplified by how many fee periods fit in the preferred
    /// contract duration; a bonus is scaled to the profile length.
    pub fn signup_cost(&self, tariff: &Tariff) -> f64 {
        let payment = tariff.signup_payment();
        if payment < 0.0 {
            payment * self.preferred_duration_days * DAY as f64 / SIGNUP_FEE_PERIOD as f64
        } else {
            payment * self.scale_factor()
        }
    }

    /// Anticipated cost of later withdrawing from a tariff.
    ///
    /// Zero for contracts of at most a day. A penalty is weighted by how
    /// far the minimum duration exceeds the preferred contract length.
    pub fn withdraw_cost(&self, tariff: &Tariff) -> f64 {
        let payment = tariff.early_withdraw_payment();
        if tariff.min_duration_ms() <= MIN_EXPIRATION_INTERVAL || payment == 0.0 {
            return 0.0;
        }
        let annoyance = if payment < 0.0 {
            tariff.min_duration_ms() as f64 / (self.preferred_duration_days * DAY as f64)
        } else {
            1.0
        };
        payment * annoyance * self.scale_factor()
    }

    /// Population chunk used by a multi-contracting customer.
    pub fn chunk_size_for(&self, population: u64) -> u64 {
        if population <= self.chunk_size {
            population
        } else {
            (population / self.max_chunk_count).max(self.chunk_size)
        }
    }

    /// Runs one evaluation cycle and issues the resulting subscription
    /// directives.
    ///
    /// Withdrawals go through each subscription's `unsubscribe`, signups
    /// straight to the market. Nothing changes until the market settles.
    pub fn evaluate_tariffs(
        &mut self,
        tariffs: &dyn TariffSource,
        subscriptions: &mut dyn SubscriptionSource,
        market: &mut dyn MarketGateway,
        now: SimTime,
    ) {
        self.allocations.clear();
        let customer = Rc::clone(self.accessor.customer_info());

        let Some(default) = market::default_tariff_for(&*market, customer.power_type) else {
            tracing::error!(customer = %customer.name, power_type = %customer.power_type, "no default tariff");
            return;
        };

        let mut candidates =
            tariffs.recent_active_tariffs(self.tariff_eval_depth, customer.power_type, now);
        for sub in subscriptions.revoked_subscriptions(customer.id) {
            let superseding = sub
                .tariff()
                .superseded_by()
                .and_then(|id| tariffs.find_tariff(id))
                .filter(|t| t.is_subscribable(now));
            if let Some(t) = superseding {
                push_unique(&mut candidates, &t);
            }
        }

        let inertia = self.effective_inertia();
        self.evaluation_count += 1;

        self.cache.begin_cycle();
        let default_eval = self.default_evaluation(&default, now);
        tracing::info!(customer = %customer.name, default_cost = default_eval.cost, "default evaluation");
        for tariff in &candidates {
            self.evaluation(tariff, now);
        }

        let views: Vec<SubscriptionView> = subscriptions
            .active_subscriptions(customer.id)
            .into_iter()
            .map(|s| SubscriptionView {
                tariff: Rc::clone(s.tariff()),
                committed: s.customers_committed(),
                expired: s.expired_customer_count(now),
            })
            .collect();

        let ctx = CycleContext {
            candidates: &candidates,
            default: &default,
            default_eval,
            inertia,
            now,
        };
        for view in &views {
            let withdraw = view.tariff.early_withdraw_payment();
            if withdraw == 0.0 || (view.expired > 0 && view.expired == view.committed) {
                self.evaluate_alternatives(&ctx, &view.tariff, 0.0, view.committed, tariffs, &*market);
            } else {
                self.evaluate_alternatives(&ctx, &view.tariff, 0.0, view.expired, tariffs, &*market);
                self.evaluate_alternatives(
                    &ctx,
                    &view.tariff,
                    withdraw,
                    view.committed.saturating_sub(view.expired),
                    tariffs,
                    &*market,
                );
            }
        }

        self.update_subscriptions(subscriptions, market);
    }

    fn default_evaluation(&mut self, default: &Tariff, now: SimTime) -> EvalData {
        if let Some(eval) = self.cache.get(default.id()) {
            return eval;
        }
        let eval = EvalData {
            cost: self.forecast_cost(default, now),
            inconvenience: 0.0,
        };
        self.cache.insert(default.id(), eval);
        eval
    }

    /// Cached evaluation of a tariff, computed on first use.
    fn evaluation(&mut self, tariff: &Tariff, now: SimTime) -> EvalData {
        if let Some(eval) = self.cache.get(tariff.id()) {
            return eval;
        }
        let eval = EvalData {
            cost: self.forecast_cost(tariff, now),
            inconvenience: self.compute_inconvenience(tariff),
        };
        tracing::info!(
            customer = %self.accessor.customer_info().name,
            tariff = %tariff.id(),
            cost = eval.cost,
            inconvenience = eval.inconvenience,
            "evaluated tariff"
        );
        self.cache.insert(tariff.id(), eval);
        eval
    }

    /// Profile cost plus shifting inconvenience, normalized to the standard
    /// evaluation length.
    fn forecast_cost(&mut self, tariff: &Tariff, now: SimTime) -> f64 {
        let profile = self.accessor.capacity_profile(tariff, now);
        if profile.state_dependent && !self.cache.is_bypassed() {
            tracing::info!(
                customer = %self.accessor.customer_info().name,
                "state-dependent profile, evaluations no longer cached"
            );
            self.cache.set_bypass(true);
        }
        if profile.is_empty() {
            tracing::error!(customer = %self.accessor.customer_info().name, "zero-length profile");
            return 0.0;
        }
        self.profile_length = profile.len();
        let inconvenience = self.accessor.shifting_inconvenience_factor(tariff);
        let mut profile_cost = self.helper.estimate_cost(tariff, &profile);
        if profile_cost.is_nan() {
            tracing::error!(
                customer = %self.accessor.customer_info().name,
                tariff = %tariff.id(),
                "profile cost is NaN"
            );
            profile_cost = 0.0;
        }
        let scale = STD_DURATION_DAYS * 24.0 / self.profile_length as f64;
        tracing::debug!(tariff = %tariff.id(), profile_cost, inconvenience, scale, "forecast cost");
        (profile_cost + inconvenience) * scale
    }

    /// Allocates `population` customers of the `current` subscription.
    fn evaluate_alternatives(
        &mut self,
        ctx: &CycleContext<'_>,
        current: &Rc<Tariff>,
        withdraw0: f64,
        population: u64,
        tariffs: &dyn TariffSource,
        market: &dyn MarketGateway,
    ) {
        let customer = Rc::clone(self.accessor.customer_info());
        if population == 0 {
            tracing::debug!(customer = %customer.name, "no population to evaluate");
            return;
        }

        let mut alternatives: Vec<Rc<Tariff>> = Vec::new();
        for t in ctx.candidates {
            push_unique(&mut alternatives, t);
        }
        push_unique(&mut alternatives, ctx.default);

        let revoked = current.is_revoked();
        let mut withdraw0 = withdraw0;
        let mut replacement = None;
        if revoked {
            let successor =
                market::successor_tariff(current, customer.power_type, tariffs, market, ctx.now)
                    .unwrap_or_else(|| Rc::clone(ctx.default));
            tracing::info!(
                customer = %customer.name,
                tariff = %current.id(),
                successor = %successor.id(),
                "tariff revoked"
            );
            push_unique(&mut alternatives, &successor);
            replacement = Some(successor.id());
            withdraw0 = 0.0;
        } else {
            push_unique(&mut alternatives, current);
        }

        let mut signup_bonus = 0.0_f64;
        let mut utilities = Vec::with_capacity(alternatives.len());
        for tariff in &alternatives {
            let eval = self.evaluation(tariff, ctx.now);
            let mut cost = eval.cost;
            let mut inconvenience = eval.inconvenience;
            if tariff.id() != current.id() && Some(tariff.id()) != replacement {
                inconvenience += self.tariff_switch_factor;
                if tariff.broker() != current.broker() {
                    inconvenience += self.accessor.broker_switch_factor(revoked);
                }
                let signup = self.signup_cost(tariff);
                signup_bonus = signup_bonus.max(signup);
                let withdraw = self.withdraw_cost(tariff);
                cost += signup + withdraw0 + withdraw;
                tracing::debug!(
                    current = %current.id(),
                    alternative = %tariff.id(),
                    signup,
                    withdraw0,
                    withdraw,
                    "switching costs"
                );
                if cost.is_nan() {
                    tracing::error!(customer = %customer.name, tariff = %tariff.id(), "cost is NaN");
                    cost = 0.0;
                }
            }
            let mut utility = normalized_difference(cost, ctx.default_eval.cost)
                - self.inconvenience_weight * inconvenience;
            if utility.is_nan() {
                tracing::error!(customer = %customer.name, tariff = %tariff.id(), "utility is NaN");
                utility = 0.0;
            }
            tracing::debug!(tariff = %tariff.id(), cost, default = ctx.default_eval.cost, utility, "utility");
            utilities.push(TariffUtility::new(Rc::clone(tariff), constrain_utility(utility)));
        }
        utilities.sort();
        assign_probabilities(&mut utilities, logit_lambda(LAMBDA_MAX, self.rationality));

        let chunk = if customer.multi_contracting {
            self.chunk_size_for(population)
        } else {
            population
        };
        let mut remaining = population;
        while remaining > 0 {
            let count = remaining.min(chunk);
            remaining -= count;
            let inertia_sample = self.accessor.inertia_sample();
            if !revoked && withdraw0 <= 0.0 && signup_bonus <= 0.0 && inertia_sample < ctx.inertia {
                continue;
            }
            if signup_bonus > 0.0 && inertia_sample < ctx.inertia * self.signup_bonus_factor {
                continue;
            }
            let mut sample = self.accessor.tariff_choice_sample();
            let mut chosen = None;
            for u in &utilities {
                if sample <= u.probability {
                    chosen = Some(Rc::clone(&u.tariff));
                    break;
                }
                sample -= u.probability;
            }
            match chosen {
                Some(tariff) => self.add_allocation(current, &tariff, count),
                None => tracing::error!(customer = %customer.name, residual = sample, "failed to allocate"),
            }
        }
    }

    fn adjust_allocation(&mut self, tariff: &Rc<Tariff>, delta: i64) {
        match self.allocations.iter_mut().find(|(t, _)| t.id() == tariff.id()) {
            Some((_, n)) => *n += delta,
            None => self.allocations.push((Rc::clone(tariff), delta)),
        }
    }

    fn add_allocation(&mut self, current: &Rc<Tariff>, to: &Rc<Tariff>, count: u64) {
        if current.id() == to.id() {
            return;
        }
        self.adjust_allocation(current, -(count as i64));
        self.adjust_allocation(to, count as i64);
        let transfer = Transfer {
            customer: self.accessor.customer_info().id,
            from: current.id(),
            to: to.id(),
            count,
        };
        self.accessor.notify_customer(&transfer);
    }

    fn update_subscriptions(
        &mut self,
        subscriptions: &mut dyn SubscriptionSource,
        market: &mut dyn MarketGateway,
    ) {
        let customer = Rc::clone(self.accessor.customer_info());
        for (tariff, count) in &self.allocations {
            let count = *count;
            if count < 0 {
                match subscriptions.find_mut(customer.id, tariff.id()) {
                    Some(sub) => {
                        sub.unsubscribe(count.unsigned_abs(), market);
                        tracing::info!(customer = %customer.name, tariff = %tariff.id(), count = -count, "unsubscribe");
                    }
                    None => tracing::error!(
                        customer = %customer.name,
                        tariff = %tariff.id(),
                        "no subscription to withdraw from"
                    ),
                }
            } else if count > 0 {
                market.subscribe_to_tariff(tariff, &customer, count);
                tracing::info!(customer = %customer.name, tariff = %tariff.id(), count, "subscribe");
            }
        }
        let balance = self.allocation_balance();
        if balance != 0 {
            tracing::error!(customer = %customer.name, balance, "subscription updates do not add up");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::{CapacityProfile, CustomerId, CustomerInfo};
    use crate::tariff::{PowerType, Rate, TariffId};

    struct Flat {
        info: Rc<CustomerInfo>,
    }

    impl CustomerModelAccessor for Flat {
        fn customer_info(&self) -> &Rc<CustomerInfo> {
            &self.info
        }

        fn capacity_profile(&mut self, _tariff: &Tariff, now: SimTime) -> CapacityProfile {
            CapacityProfile::new(vec![1.0; 24], now)
        }

        fn broker_switch_factor(&self, _is_superseding: bool) -> f64 {
            0.0
        }

        fn tariff_choice_sample(&mut self) -> f64 {
            0.5
        }

        fn inertia_sample(&mut self) -> f64 {
            0.5
        }

        fn shifting_inconvenience_factor(&self, _tariff: &Tariff) -> f64 {
            0.0
        }

        fn notify_customer(&mut self, _transfer: &Transfer) {}
    }

    fn evaluator() -> TariffEvaluator<Flat> {
        let info = CustomerInfo::new(CustomerId(1), "town", 1000, PowerType::Consumption);
        TariffEvaluator::new(Flat { info: Rc::new(info) })
    }

    fn builder(id: u64) -> crate::tariff::TariffBuilder {
        Tariff::builder(TariffId(id), "bob", PowerType::Consumption).rate(Rate::fixed(-0.1))
    }

    #[test]
    fn signup_fee_amplified_bonus_scaled() {
        let e = evaluator().with_preferred_contract_duration(4.0);
        let fee = builder(1).signup_payment(-2.0).build();
        // 4 days of 6-hour periods
        assert!((e.signup_cost(&fee) + 32.0).abs() < 1e-9);
        let bonus = builder(2).signup_payment(2.0).build();
        // default profile of 168 hours against 48
        assert!((e.signup_cost(&bonus) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn withdraw_cost_needs_long_contract() {
        let e = evaluator().with_preferred_contract_duration(4.0);
        let short = builder(1).early_withdraw_payment(-10.0).min_duration_days(1.0).build();
        assert_eq!(e.withdraw_cost(&short), 0.0);
        let long = builder(2).early_withdraw_payment(-10.0).min_duration_days(8.0).build();
        assert!((e.withdraw_cost(&long) + 10.0 * 2.0 * 3.5).abs() < 1e-9);
        let paid = builder(3).early_withdraw_payment(4.0).min_duration_days(8.0).build();
        assert!((e.withdraw_cost(&paid) - 4.0 * 3.5).abs() < 1e-9);
    }

    #[test]
    fn chunking() {
        let e = evaluator().with_chunk_size(25).with_max_chunk_count(200);
        assert_eq!(e.chunk_size_for(10), 10);
        assert_eq!(e.chunk_size_for(1000), 25);
        assert_eq!(e.chunk_size_for(10_000), 50);
    }

    #[test]
    fn invalid_settings_keep_previous_values() {
        let e = evaluator().with_rationality(0.7).with_rationality(1.5).with_chunk_size(0);
        assert_eq!(e.rationality(), 0.7);
        assert_eq!(e.chunk_size(), 1);
    }

    #[test]
    fn inconvenience_sums_feature_weights() {
        let mut e = evaluator();
        e.initialize_inconvenience_factors(0.3, 0.1, 0.5, 0.2);
        assert_eq!(e.tou_factor(), 0.0);
        let t = Tariff::builder(TariffId(1), "bob", PowerType::Consumption)
            .rate(Rate::fixed(-0.1))
            .rate(Rate::variable(-0.05, -0.1, -0.2).with_tier_threshold(50.0))
            .build();
        assert!((e.compute_inconvenience(&t) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn inertia_ramps_up() {
        let mut e = evaluator().with_inertia(0.8);
        assert_eq!(e.effective_inertia(), 0.0);
        e.evaluation_count = 1;
        assert_eq!(e.effective_inertia(), 0.0);
        e.evaluation_count = 2;
        assert!((e.effective_inertia() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn wrong_sign_regulation_expectations_become_zero() {
        let mut e = evaluator();
        e.initialize_regulation_factors(0.5, -0.2, -1.0);
        assert!((e.helper().expected_regulation() + 0.2).abs() < 1e-12);
    }
}
