//! Tariffs: power types, rates, charge computation and the tariff store.

pub mod model;
pub mod rate;
pub mod repo;
pub mod types;

pub use model::{Tariff, TariffBuilder};
pub use rate::{DailyWindow, Rate, RegulationRate, VariablePricing};
pub use repo::{TariffRepo, TariffSource};
pub use types::{PowerType, TariffId, TariffState};
