//! TOML-based market configuration and preset definitions.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

pub use crate::error::ConfigError;
use crate::tariff::PowerType;

/// Top-level market configuration parsed from TOML.
///
/// All fields have defaults matching the baseline market. Load from TOML
/// with [`MarketConfig::from_toml_file`] or use [`MarketConfig::baseline`]
/// for the built-in default. Omitting `[[customers]]` or `[[tariffs]]`
/// keeps the baseline population and tariff schedule.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarketConfig {
    /// Run length and customer-model parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Tariff evaluator tunables.
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    /// Inconvenience weights of tariff features.
    #[serde(default)]
    pub inconvenience: InconvenienceConfig,
    /// Per-hour regulation customers expect to supply.
    #[serde(default)]
    pub regulation: RegulationConfig,
    /// Economic and balancing control applied during billing.
    #[serde(default)]
    pub control: ControlConfig,
    /// Valuation of variable rates.
    #[serde(default)]
    pub cost: CostConfig,
    /// Customer populations.
    #[serde(default = "default_customers")]
    pub customers: Vec<CustomerConfig>,
    /// Tariff publication schedule.
    #[serde(default = "default_tariffs")]
    pub tariffs: Vec<TariffConfig>,
}

/// Run length and customer-model parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Master random seed.
    pub seed: u64,
    /// Number of evaluation cycles to run (must be > 0).
    pub cycles: usize,
    /// Hourly timeslots per cycle (must be > 0).
    pub timeslots_per_cycle: usize,
    /// Length of forecast profiles in hours (must be > 0).
    pub profile_hours: usize,
    /// Extra inconvenience of moving to another broker.
    pub broker_switch_factor: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            cycles: 7,
            timeslots_per_cycle: 24,
            profile_hours: 168,
            broker_switch_factor: 0.02,
        }
    }
}

/// Tariff evaluator tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluatorConfig {
    /// Smallest population chunk moved as one decision (must be > 0).
    pub chunk_size: u64,
    /// Target chunk count for large populations (must be > 0).
    pub max_chunk_count: u64,
    /// Recent tariffs considered per broker and power type.
    pub tariff_eval_depth: usize,
    /// Probability of staying put once fully ramped (0.0–1.0).
    pub inertia: f64,
    /// Fraction of inertia applied when a signup bonus is on offer.
    pub signup_bonus_factor: f64,
    /// Choice rationality (0.0–1.0).
    pub rationality: f64,
    /// Weight of inconvenience against normalized cost.
    pub inconvenience_weight: f64,
    /// Inconvenience of any tariff switch.
    pub tariff_switch_factor: f64,
    /// Contract length customers prefer, in days (must be > 0).
    pub preferred_contract_duration_days: f64,
    /// Re-evaluate every tariff each cycle.
    pub evaluate_all_tariffs: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1,
            max_chunk_count: 200,
            tariff_eval_depth: 5,
            inertia: 0.8,
            signup_bonus_factor: 0.1,
            rationality: 0.9,
            inconvenience_weight: 0.2,
            tariff_switch_factor: 0.04,
            preferred_contract_duration_days: 6.0,
            evaluate_all_tariffs: false,
        }
    }
}

/// Inconvenience weights of tariff features.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InconvenienceConfig {
    /// Time-of-use weight; values above 0 are capped at 0.
    pub tou: f64,
    pub tiered: f64,
    pub variable: f64,
    pub interruptible: f64,
}

impl Default for InconvenienceConfig {
    fn default() -> Self {
        Self {
            tou: 0.2,
            tiered: 0.1,
            variable: 0.5,
            interruptible: 0.2,
        }
    }
}

/// Per-hour regulation customers expect to supply.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegulationConfig {
    /// Expected curtailment (kWh, <= 0).
    pub expected_curtailment: f64,
    /// Expected storage discharge (kWh, <= 0).
    pub expected_discharge: f64,
    /// Expected down-regulation (kWh, >= 0).
    pub expected_down_regulation: f64,
}

/// Control the market exercises over interruptible populations.
///
/// Inside the daily window every subscription to a curtailable tariff is
/// asked to curtail `ratio` of its capacity, and `balancing_share` of what
/// is left is then taken as balancing energy. Both default to zero.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlConfig {
    /// Economic control ratio (-1.0 to 2.0).
    pub ratio: f64,
    /// Fraction of the remaining up-regulation taken for balancing (0.0 to 1.0).
    pub balancing_share: f64,
    /// First hour of the control window (0–23).
    pub begin: u32,
    /// Hour the window ends, exclusive (0–23); equal to `begin` for all day.
    pub end: u32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            ratio: 0.0,
            balancing_share: 0.0,
            begin: 17,
            end: 21,
        }
    }
}

impl ControlConfig {
    /// Whether any control is requested at all.
    pub fn is_active(&self) -> bool {
        self.ratio != 0.0 || self.balancing_share > 0.0
    }
}

/// Weights of the expected and maximum price of variable rates.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostConfig {
    pub wt_expected: f64,
    pub wt_max: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            wt_expected: 0.6,
            wt_max: 0.4,
        }
    }
}

/// One customer population.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CustomerConfig {
    /// Unique display name.
    pub name: String,
    /// Number of identical members.
    pub population: u64,
    pub power_type: PowerType,
    /// Whether the population may split across tariffs.
    pub multi_contracting: bool,
    /// Mean hourly energy per member (kWh).
    pub base_kwh: f64,
    /// Daily sinusoidal amplitude per member (kWh).
    pub amplitude_kwh: f64,
    /// Gaussian noise standard deviation (kWh).
    pub noise_std: f64,
}

impl Default for CustomerConfig {
    fn default() -> Self {
        Self {
            name: "village".to_string(),
            population: 1000,
            power_type: PowerType::Consumption,
            multi_contracting: true,
            base_kwh: 1.0,
            amplitude_kwh: 0.5,
            noise_std: 0.05,
        }
    }
}

/// Price range of a variable base rate.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableRateConfig {
    pub expected_mean: f64,
    pub max_value: f64,
}

/// Extra rate applying during a daily window.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowRateConfig {
    /// First hour of the window (0–23).
    pub begin: u32,
    /// Hour the window ends, exclusive (0–23).
    pub end: u32,
    pub rate: f64,
}

/// Extra rate taking over above a usage threshold.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierRateConfig {
    /// kWh per timeslot at which the tier starts (must be > 0).
    pub threshold: f64,
    pub rate: f64,
}

/// Payments for balancing energy.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegulationPaymentConfig {
    /// Paid to the customer per kWh curtailed.
    pub up: f64,
    /// Paid by the customer per kWh absorbed.
    pub down: f64,
}

/// A tariff and its publication schedule.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// Unique key used by `supersedes` and in reports.
    pub key: String,
    pub broker: String,
    pub power_type: PowerType,
    /// All-day base rate (negative when the customer pays).
    pub rate: f64,
    /// Makes the base rate variable with `rate` as its minimum.
    pub variable: Option<VariableRateConfig>,
    /// Windowed rate taking precedence over the base rate.
    pub peak: Option<WindowRateConfig>,
    pub tier: Option<TierRateConfig>,
    /// Fraction of usage the broker may curtail (0.0–1.0).
    pub max_curtailment: f64,
    pub regulation: Option<RegulationPaymentConfig>,
    pub signup_payment: f64,
    pub early_withdraw_payment: f64,
    pub periodic_payment: f64,
    pub min_duration_days: f64,
    /// Cycle at which the tariff is published.
    pub publish_cycle: usize,
    /// Cycle at which the tariff is revoked, if ever.
    pub revoke_cycle: Option<usize>,
    /// Key of the tariff this one replaces.
    pub supersedes: Option<String>,
    /// Registers the tariff as its power type's default.
    pub default: bool,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            broker: "default".to_string(),
            power_type: PowerType::Consumption,
            rate: -0.15,
            variable: None,
            peak: None,
            tier: None,
            max_curtailment: 0.0,
            regulation: None,
            signup_payment: 0.0,
            early_withdraw_payment: 0.0,
            periodic_payment: 0.0,
            min_duration_days: 0.0,
            publish_cycle: 0,
            revoke_cycle: None,
            supersedes: None,
            default: false,
        }
    }
}

impl TariffConfig {
    fn named(key: &str, broker: &str, power_type: PowerType, rate: f64) -> Self {
        Self {
            key: key.to_string(),
            broker: broker.to_string(),
            power_type,
            rate,
            ..Self::default()
        }
    }
}

fn default_customers() -> Vec<CustomerConfig> {
    vec![
        CustomerConfig::default(),
        CustomerConfig {
            name: "solar-park".to_string(),
            population: 40,
            power_type: PowerType::SolarProduction,
            multi_contracting: false,
            base_kwh: 2.0,
            amplitude_kwh: 2.0,
            noise_std: 0.2,
        },
    ]
}

fn default_tariffs() -> Vec<TariffConfig> {
    vec![
        TariffConfig {
            default: true,
            ..TariffConfig::named("default-consumption", "default", PowerType::Consumption, -0.15)
        },
        TariffConfig {
            default: true,
            ..TariffConfig::named("default-production", "default", PowerType::Production, 0.02)
        },
        TariffConfig {
            peak: Some(WindowRateConfig {
                begin: 17,
                end: 21,
                rate: -0.2,
            }),
            min_duration_days: 3.0,
            early_withdraw_payment: -2.0,
            ..TariffConfig::named("alpha", "alpha", PowerType::Consumption, -0.12)
        },
        TariffConfig {
            publish_cycle: 1,
            ..TariffConfig::named("alpha-solar", "alpha", PowerType::SolarProduction, 0.035)
        },
    ]
}

impl MarketConfig {
    /// Returns the baseline market: a default broker, one competitor and two
    /// customer populations.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            evaluator: EvaluatorConfig::default(),
            inconvenience: InconvenienceConfig::default(),
            regulation: RegulationConfig::default(),
            control: ControlConfig::default(),
            cost: CostConfig::default(),
            customers: default_customers(),
            tariffs: default_tariffs(),
        }
    }

    /// Returns the price-war preset: a second broker undercuts with a signup
    /// bonus, and the first answers with a superseding tariff.
    pub fn price_war() -> Self {
        let mut cfg = Self::baseline();
        cfg.simulation.cycles = 10;
        cfg.evaluator.chunk_size = 5;
        if let Some(alpha) = cfg.tariffs.iter_mut().find(|t| t.key == "alpha") {
            alpha.revoke_cycle = Some(5);
        }
        cfg.tariffs.push(TariffConfig {
            publish_cycle: 2,
            signup_payment: 1.0,
            early_withdraw_payment: -5.0,
            min_duration_days: 7.0,
            ..TariffConfig::named("beta", "beta", PowerType::Consumption, -0.11)
        });
        cfg.tariffs.push(TariffConfig {
            publish_cycle: 5,
            supersedes: Some("alpha".to_string()),
            ..TariffConfig::named("alpha-2", "alpha", PowerType::Consumption, -0.1)
        });
        cfg
    }

    /// Returns the revocation preset: tariffs are withdrawn mid-run, one
    /// with a successor and one without.
    pub fn revocation() -> Self {
        let mut cfg = Self::baseline();
        cfg.simulation.cycles = 8;
        if let Some(alpha) = cfg.tariffs.iter_mut().find(|t| t.key == "alpha") {
            alpha.revoke_cycle = Some(3);
        }
        cfg.tariffs.push(TariffConfig {
            publish_cycle: 3,
            supersedes: Some("alpha".to_string()),
            ..TariffConfig::named("alpha-2", "alpha", PowerType::Consumption, -0.125)
        });
        cfg.tariffs.push(TariffConfig {
            variable: Some(VariableRateConfig {
                expected_mean: -0.12,
                max_value: -0.3,
            }),
            revoke_cycle: Some(5),
            ..TariffConfig::named("gamma", "gamma", PowerType::Consumption, -0.08)
        });
        cfg.customers.push(CustomerConfig {
            name: "factory".to_string(),
            population: 12,
            power_type: PowerType::InterruptibleConsumption,
            multi_contracting: false,
            base_kwh: 40.0,
            amplitude_kwh: 10.0,
            noise_std: 1.0,
        });
        cfg.control = ControlConfig {
            ratio: 0.5,
            balancing_share: 0.2,
            ..ControlConfig::default()
        };
        cfg.tariffs.push(TariffConfig {
            max_curtailment: 0.3,
            regulation: Some(RegulationPaymentConfig { up: 0.05, down: -0.01 }),
            ..TariffConfig::named("gamma-flex", "gamma", PowerType::InterruptibleConsumption, -0.1)
        });
        cfg
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "price_war", "revocation"];

    /// Loads a market from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "price_war" => Ok(Self::price_war()),
            "revocation" => Ok(Self::revocation()),
            _ => Err(ConfigError::new(
                "preset",
                format!("unknown preset \"{name}\", available: {}", Self::PRESETS.join(", ")),
            )),
        }
    }

    /// Parses a market from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a market from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// The default tariff configured for a power type, falling back to its
    /// generic type.
    pub fn default_tariff_for(&self, power_type: PowerType) -> Option<&TariffConfig> {
        let find = |pt: PowerType| self.tariffs.iter().find(|t| t.default && t.power_type == pt);
        find(power_type).or_else(|| find(power_type.generic_type()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let s = &self.simulation;
        if s.cycles == 0 {
            errors.push(ConfigError::new("simulation.cycles", "must be > 0"));
        }
        if s.timeslots_per_cycle == 0 {
            errors.push(ConfigError::new("simulation.timeslots_per_cycle", "must be > 0"));
        }
        if s.profile_hours == 0 {
            errors.push(ConfigError::new("simulation.profile_hours", "must be > 0"));
        }

        let e = &self.evaluator;
        if e.chunk_size == 0 {
            errors.push(ConfigError::new("evaluator.chunk_size", "must be > 0"));
        }
        if e.max_chunk_count == 0 {
            errors.push(ConfigError::new("evaluator.max_chunk_count", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&e.rationality) {
            errors.push(ConfigError::new("evaluator.rationality", "must be in [0.0, 1.0]"));
        }
        if !(0.0..=1.0).contains(&e.inertia) {
            errors.push(ConfigError::new("evaluator.inertia", "must be in [0.0, 1.0]"));
        }
        if e.preferred_contract_duration_days <= 0.0 {
            errors.push(ConfigError::new(
                "evaluator.preferred_contract_duration_days",
                "must be > 0",
            ));
        }

        let r = &self.regulation;
        if r.expected_curtailment > 0.0 {
            errors.push(ConfigError::new("regulation.expected_curtailment", "must be <= 0"));
        }
        if r.expected_discharge > 0.0 {
            errors.push(ConfigError::new("regulation.expected_discharge", "must be <= 0"));
        }
        if r.expected_down_regulation < 0.0 {
            errors.push(ConfigError::new("regulation.expected_down_regulation", "must be >= 0"));
        }

        let ctl = &self.control;
        if !(-1.0..=2.0).contains(&ctl.ratio) {
            errors.push(ConfigError::new("control.ratio", "must be in [-1.0, 2.0]"));
        }
        if !(0.0..=1.0).contains(&ctl.balancing_share) {
            errors.push(ConfigError::new("control.balancing_share", "must be in [0.0, 1.0]"));
        }
        if ctl.begin > 23 || ctl.end > 23 {
            errors.push(ConfigError::new("control", "hours must be in 0..=23"));
        }

        let c = &self.cost;
        if c.wt_expected < 0.0 || c.wt_max < 0.0 || c.wt_expected + c.wt_max <= 0.0 {
            errors.push(ConfigError::new(
                "cost",
                "weights must be non-negative with a positive sum",
            ));
        }

        if self.customers.is_empty() {
            errors.push(ConfigError::new("customers", "at least one customer is required"));
        }
        let mut names = HashSet::new();
        for (i, cust) in self.customers.iter().enumerate() {
            if !names.insert(cust.name.as_str()) {
                errors.push(ConfigError::new(
                    format!("customers[{i}].name"),
                    format!("duplicate name \"{}\"", cust.name),
                ));
            }
            if cust.population == 0 {
                errors.push(ConfigError::new(format!("customers[{i}].population"), "must be > 0"));
            }
            if cust.noise_std < 0.0 {
                errors.push(ConfigError::new(format!("customers[{i}].noise_std"), "must be >= 0"));
            }
            if self.default_tariff_for(cust.power_type).is_none() {
                errors.push(ConfigError::new(
                    format!("customers[{i}].power_type"),
                    format!("no default tariff for {}", cust.power_type),
                ));
            }
        }

        let keys: HashSet<&str> = self.tariffs.iter().map(|t| t.key.as_str()).collect();
        let mut seen = HashSet::new();
        let mut default_types = HashSet::new();
        for (i, t) in self.tariffs.iter().enumerate() {
            let field = |name: &str| format!("tariffs[{i}].{name}");
            if t.key.is_empty() {
                errors.push(ConfigError::new(field("key"), "must not be empty"));
            } else if !seen.insert(t.key.as_str()) {
                errors.push(ConfigError::new(field("key"), format!("duplicate key \"{}\"", t.key)));
            }
            if let Some(peak) = &t.peak {
                if peak.begin > 23 || peak.end > 23 {
                    errors.push(ConfigError::new(field("peak"), "hours must be in 0..=23"));
                }
            }
            if let Some(tier) = &t.tier {
                if tier.threshold <= 0.0 {
                    errors.push(ConfigError::new(field("tier.threshold"), "must be > 0"));
                }
            }
            if !(0.0..=1.0).contains(&t.max_curtailment) {
                errors.push(ConfigError::new(field("max_curtailment"), "must be in [0.0, 1.0]"));
            }
            if t.min_duration_days < 0.0 {
                errors.push(ConfigError::new(field("min_duration_days"), "must be >= 0"));
            }
            if let Some(revoke) = t.revoke_cycle {
                if revoke < t.publish_cycle {
                    errors.push(ConfigError::new(field("revoke_cycle"), "must be >= publish_cycle"));
                }
            }
            if let Some(prev) = &t.supersedes {
                if prev == &t.key || !keys.contains(prev.as_str()) {
                    errors.push(ConfigError::new(
                        field("supersedes"),
                        format!("must name another tariff, got \"{prev}\""),
                    ));
                }
            }
            if t.default {
                if t.publish_cycle != 0 {
                    errors.push(ConfigError::new(field("publish_cycle"), "default tariffs publish at cycle 0"));
                }
                if t.revoke_cycle.is_some() {
                    errors.push(ConfigError::new(field("revoke_cycle"), "default tariffs cannot be revoked"));
                }
                if !default_types.insert(t.power_type) {
                    errors.push(ConfigError::new(
                        field("default"),
                        format!("second default for {}", t.power_type),
                    ));
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = MarketConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn all_presets_are_valid() {
        for name in MarketConfig::PRESETS {
            let cfg = MarketConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset {name} should load");
            let errors = cfg.map(|c| c.validate()).unwrap_or_default();
            assert!(errors.is_empty(), "preset {name} should be valid: {errors:?}");
        }
    }

    #[test]
    fn from_preset_unknown() {
        let err = MarketConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
seed = 7
cycles = 3
timeslots_per_cycle = 12
profile_hours = 48

[evaluator]
chunk_size = 10
rationality = 0.8
preferred_contract_duration_days = 4.0

[inconvenience]
tou = 0.1

[[customers]]
name = "estate"
population = 500
power_type = "CONSUMPTION"
multi_contracting = true
base_kwh = 0.8

[[tariffs]]
key = "std"
broker = "default"
power_type = "CONSUMPTION"
rate = -0.2
default = true

[[tariffs]]
key = "night"
broker = "luna"
power_type = "CONSUMPTION"
rate = -0.18
publish_cycle = 1
peak = { begin = 22, end = 6, rate = -0.08 }
tier = { threshold = 5.0, rate = -0.25 }
"#;
        let cfg = MarketConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.simulation.cycles), Some(3));
        assert_eq!(cfg.as_ref().map(|c| c.evaluator.chunk_size), Some(10));
        assert_eq!(cfg.as_ref().map(|c| c.customers.len()), Some(1));
        assert_eq!(
            cfg.as_ref().and_then(|c| c.tariffs[1].peak.as_ref().map(|p| p.begin)),
            Some(22)
        );
        assert_eq!(cfg.map(|c| c.validate().len()), Some(0));
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[evaluator]
chunk_size = 2
bogus_field = true
"#;
        assert!(MarketConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[simulation]
seed = 99
"#;
        let cfg = MarketConfig::from_toml_str(toml).ok();
        assert_eq!(cfg.as_ref().map(|c| c.simulation.seed), Some(99));
        assert_eq!(cfg.as_ref().map(|c| c.simulation.cycles), Some(7));
        // baseline population and tariffs kept
        assert_eq!(cfg.as_ref().map(|c| c.customers.len()), Some(2));
        assert_eq!(cfg.as_ref().map(|c| c.tariffs.len()), Some(4));
    }

    #[test]
    fn validation_catches_bad_evaluator_settings() {
        let mut cfg = MarketConfig::baseline();
        cfg.evaluator.chunk_size = 0;
        cfg.evaluator.rationality = 1.5;
        let fields: Vec<String> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"evaluator.chunk_size".to_string()));
        assert!(fields.contains(&"evaluator.rationality".to_string()));
    }

    #[test]
    fn validation_catches_wrong_sign_regulation() {
        let mut cfg = MarketConfig::baseline();
        cfg.regulation.expected_curtailment = 0.5;
        cfg.regulation.expected_down_regulation = -0.5;
        assert_eq!(cfg.validate().len(), 2);
    }

    #[test]
    fn validation_catches_bad_control() {
        let mut cfg = MarketConfig::baseline();
        cfg.control.ratio = 2.5;
        cfg.control.balancing_share = -0.1;
        cfg.control.end = 24;
        let fields: Vec<String> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, ["control.ratio", "control.balancing_share", "control"]);
    }

    #[test]
    fn control_section_parses() {
        let toml = r#"
[control]
ratio = 0.4
begin = 6
end = 9
"#;
        let cfg = MarketConfig::from_toml_str(toml).ok();
        let control = cfg.as_ref().map(|c| &c.control);
        assert_eq!(control.map(|c| c.ratio), Some(0.4));
        assert_eq!(control.map(|c| c.balancing_share), Some(0.0));
        assert_eq!(control.map(|c| (c.begin, c.end)), Some((6, 9)));
        assert_eq!(control.map(ControlConfig::is_active), Some(true));
        assert!(!MarketConfig::baseline().control.is_active());
    }

    #[test]
    fn validation_requires_default_for_every_customer() {
        let mut cfg = MarketConfig::baseline();
        cfg.tariffs.retain(|t| t.key != "default-production");
        let errors = cfg.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "customers[1].power_type");
    }

    #[test]
    fn validation_catches_dangling_supersedes() {
        let mut cfg = MarketConfig::baseline();
        cfg.tariffs[2].supersedes = Some("missing".to_string());
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "tariffs[2].supersedes"));
    }

    #[test]
    fn generic_default_covers_specific_types() {
        let cfg = MarketConfig::baseline();
        let found = cfg.default_tariff_for(PowerType::SolarProduction);
        assert_eq!(found.map(|t| t.key.as_str()), Some("default-production"));
    }

    #[test]
    fn price_war_adds_competition() {
        let base = MarketConfig::baseline();
        let war = MarketConfig::price_war();
        assert!(war.tariffs.len() > base.tariffs.len());
        assert!(war.tariffs.iter().any(|t| t.supersedes.as_deref() == Some("alpha")));
    }
}
