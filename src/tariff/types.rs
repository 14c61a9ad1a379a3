//! Identifiers, power types and lifecycle states shared by tariffs and
//! subscriptions.

use std::fmt;

use serde::Deserialize;

/// Unique tariff identifier. Later publications get larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TariffId(pub u64);

impl fmt::Display for TariffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a published tariff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TariffState {
    /// Created but not yet published.
    Pending,
    /// Published and open for subscription.
    Offered,
    /// Published and holding at least one subscription.
    Active,
    /// Revoked by its broker; subscribers must move elsewhere.
    Killed,
}

/// Kind of power a customer consumes or produces, and that a tariff covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerType {
    Consumption,
    Production,
    Storage,
    InterruptibleConsumption,
    ThermalStorageConsumption,
    SolarProduction,
    WindProduction,
    RunOfRiverProduction,
    PumpedStorageProduction,
    ChpProduction,
    FossilProduction,
    BatteryStorage,
    ElectricVehicle,
}

impl PowerType {
    /// Every power type, in declaration order.
    pub const ALL: [PowerType; 13] = [
        PowerType::Consumption,
        PowerType::Production,
        PowerType::Storage,
        PowerType::InterruptibleConsumption,
        PowerType::ThermalStorageConsumption,
        PowerType::SolarProduction,
        PowerType::WindProduction,
        PowerType::RunOfRiverProduction,
        PowerType::PumpedStorageProduction,
        PowerType::ChpProduction,
        PowerType::FossilProduction,
        PowerType::BatteryStorage,
        PowerType::ElectricVehicle,
    ];

    /// Upper-case label used in logs and exports.
    pub fn label(self) -> &'static str {
        match self {
            PowerType::Consumption => "CONSUMPTION",
            PowerType::Production => "PRODUCTION",
            PowerType::Storage => "STORAGE",
            PowerType::InterruptibleConsumption => "INTERRUPTIBLE_CONSUMPTION",
            PowerType::ThermalStorageConsumption => "THERMAL_STORAGE_CONSUMPTION",
            PowerType::SolarProduction => "SOLAR_PRODUCTION",
            PowerType::WindProduction => "WIND_PRODUCTION",
            PowerType::RunOfRiverProduction => "RUN_OF_RIVER_PRODUCTION",
            PowerType::PumpedStorageProduction => "PUMPED_STORAGE_PRODUCTION",
            PowerType::ChpProduction => "CHP_PRODUCTION",
            PowerType::FossilProduction => "FOSSIL_PRODUCTION",
            PowerType::BatteryStorage => "BATTERY_STORAGE",
            PowerType::ElectricVehicle => "ELECTRIC_VEHICLE",
        }
    }

    pub fn is_consumption(self) -> bool {
        matches!(
            self,
            PowerType::Consumption
                | PowerType::ElectricVehicle
                | PowerType::InterruptibleConsumption
                | PowerType::ThermalStorageConsumption
        )
    }

    pub fn is_production(self) -> bool {
        matches!(
            self,
            PowerType::Production
                | PowerType::ChpProduction
                | PowerType::FossilProduction
                | PowerType::RunOfRiverProduction
                | PowerType::SolarProduction
                | PowerType::WindProduction
        )
    }

    /// True for power types whose load can be curtailed on request.
    pub fn is_interruptible(self) -> bool {
        matches!(
            self,
            PowerType::InterruptibleConsumption
                | PowerType::ThermalStorageConsumption
                | PowerType::BatteryStorage
                | PowerType::ElectricVehicle
        )
    }

    pub fn is_storage(self) -> bool {
        matches!(
            self,
            PowerType::Storage
                | PowerType::ThermalStorageConsumption
                | PowerType::BatteryStorage
                | PowerType::ElectricVehicle
                | PowerType::PumpedStorageProduction
        )
    }

    /// Returns true if a customer of this power type may subscribe to a
    /// tariff offered for `tariff_type`.
    ///
    /// A customer can always use a tariff of its own type, and may also use
    /// the generic tariff of any family it belongs to.
    pub fn can_use(self, tariff_type: PowerType) -> bool {
        self == tariff_type
            || (self.is_consumption() && tariff_type == PowerType::Consumption)
            || (self.is_production() && tariff_type == PowerType::Production)
            || (self.is_storage() && tariff_type == PowerType::Storage)
            || (self.is_interruptible() && tariff_type == PowerType::InterruptibleConsumption)
    }

    /// Generic type used to look up a fallback default tariff.
    pub fn generic_type(self) -> PowerType {
        if self.is_storage() {
            PowerType::Storage
        } else if self.is_consumption() {
            PowerType::Consumption
        } else {
            PowerType::Production
        }
    }
}

impl fmt::Display for PowerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interruptible_consumer_can_use_generic_tariffs() {
        let pt = PowerType::InterruptibleConsumption;
        assert!(pt.can_use(PowerType::InterruptibleConsumption));
        assert!(pt.can_use(PowerType::Consumption));
        assert!(!pt.can_use(PowerType::Production));
        assert!(!pt.can_use(PowerType::Storage));
    }

    #[test]
    fn electric_vehicle_belongs_to_three_families() {
        let ev = PowerType::ElectricVehicle;
        assert!(ev.can_use(PowerType::Consumption));
        assert!(ev.can_use(PowerType::Storage));
        assert!(ev.can_use(PowerType::InterruptibleConsumption));
        assert_eq!(ev.generic_type(), PowerType::Storage);
    }

    #[test]
    fn generic_types() {
        assert_eq!(PowerType::SolarProduction.generic_type(), PowerType::Production);
        assert_eq!(
            PowerType::InterruptibleConsumption.generic_type(),
            PowerType::Consumption
        );
        assert_eq!(PowerType::PumpedStorageProduction.generic_type(), PowerType::Storage);
    }

    #[test]
    fn plain_consumer_cannot_use_interruptible_tariff() {
        assert!(!PowerType::Consumption.can_use(PowerType::InterruptibleConsumption));
    }

    #[test]
    fn labels_are_unique() {
        let mut labels: Vec<&str> = PowerType::ALL.iter().map(|p| p.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), PowerType::ALL.len());
    }
}
