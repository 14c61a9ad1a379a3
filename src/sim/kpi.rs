//! Per-cycle summaries and the aggregate market report.

use std::fmt;

use crate::tariff::TariffId;

use super::clock::SimTime;

/// Population committed to one tariff at the end of a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TariffShare {
    pub key: String,
    pub tariff: TariffId,
    pub committed: u64,
}

/// What happened during one evaluation cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
    /// Cycle index, from 0.
    pub cycle: usize,
    /// Start of the cycle's first timeslot.
    pub start: SimTime,
    /// Tariffs published at the start of the cycle.
    pub published: usize,
    /// Tariffs revoked at the start of the cycle.
    pub revoked: usize,
    /// Subscription directives settled by the market.
    pub settled: usize,
    /// Subscriptions moved off revoked tariffs after evaluation.
    pub migrations: usize,
    /// Sum over customers of each evaluation's net allocation; zero when
    /// every evaluation conserved its population.
    pub allocation_balance: i64,
    /// Whether every customer's subscriptions still add up to its population.
    pub population_conserved: bool,
    /// Sum of all charges posted during the cycle; positive when customers
    /// paid brokers.
    pub charges: f64,
    /// Energy curtailed by economic control (kWh, positive for consumers).
    pub curtailed_kwh: f64,
    /// Balancing energy taken from customers (kWh, negative for up-regulation).
    pub balancing_kwh: f64,
    /// Number of transactions posted during the cycle.
    pub transactions: usize,
    /// Committed population per tariff, in publication order.
    pub shares: Vec<TariffShare>,
}

impl CycleSummary {
    /// Committed population on the tariff published under `key`.
    pub fn committed_to(&self, key: &str) -> u64 {
        self.shares
            .iter()
            .find(|s| s.key == key)
            .map_or(0, |s| s.committed)
    }
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycle={:<3} start={} published={} revoked={} settled={} migrated={} \
             balance={} charges={:.2} curtailed={:.2} tx={}",
            self.cycle,
            self.start,
            self.published,
            self.revoked,
            self.settled,
            self.migrations,
            self.allocation_balance,
            self.charges,
            self.curtailed_kwh,
            self.transactions
        )?;
        for s in self.shares.iter().filter(|s| s.committed > 0) {
            write!(f, " {}{}={}", s.key, s.tariff, s.committed)?;
        }
        Ok(())
    }
}

/// Aggregate indicators of a complete run.
///
/// Computed post-hoc from the cycle summaries.
#[derive(Debug, Clone)]
pub struct MarketReport {
    pub cycles: usize,
    /// Total charges over the run; positive when customers paid net.
    pub total_charges: f64,
    pub total_curtailed_kwh: f64,
    pub total_balancing_kwh: f64,
    pub total_transactions: usize,
    pub total_migrations: usize,
    /// Cycles whose evaluations did not conserve population.
    pub unbalanced_cycles: usize,
    /// Whether population was conserved at the end of every cycle.
    pub population_conserved: bool,
    /// Tariff holding the most customers after the last cycle.
    pub leading_tariff: Option<TariffShare>,
}

impl MarketReport {
    /// Computes the report from every cycle summary of a run.
    ///
    /// # Arguments
    ///
    /// * `summaries` - Cycle summaries in run order
    ///
    /// # Returns
    ///
    /// A `MarketReport` with all fields populated.
    pub fn from_summaries(summaries: &[CycleSummary]) -> Self {
        let leading_tariff = summaries.last().and_then(|last| {
            last.shares
                .iter()
                .filter(|s| s.committed > 0)
                .max_by_key(|s| s.committed)
                .cloned()
        });
        Self {
            cycles: summaries.len(),
            total_charges: summaries.iter().map(|s| s.charges).sum(),
            total_curtailed_kwh: summaries.iter().map(|s| s.curtailed_kwh).sum(),
            total_balancing_kwh: summaries.iter().map(|s| s.balancing_kwh).sum(),
            total_transactions: summaries.iter().map(|s| s.transactions).sum(),
            total_migrations: summaries.iter().map(|s| s.migrations).sum(),
            unbalanced_cycles: summaries.iter().filter(|s| s.allocation_balance != 0).count(),
            population_conserved: summaries.iter().all(|s| s.population_conserved),
            leading_tariff,
        }
    }
}

impl fmt::Display for MarketReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Market Report ---")?;
        writeln!(f, "Cycles:                {}", self.cycles)?;
        writeln!(f, "Total charges:         {:.2}", self.total_charges)?;
        writeln!(f, "Curtailed kWh:         {:.2}", self.total_curtailed_kwh)?;
        writeln!(f, "Balancing kWh:         {:.2}", self.total_balancing_kwh)?;
        writeln!(f, "Transactions:          {}", self.total_transactions)?;
        writeln!(f, "Revocation migrations: {}", self.total_migrations)?;
        writeln!(f, "Unbalanced cycles:     {}", self.unbalanced_cycles)?;
        writeln!(f, "Population conserved:  {}", self.population_conserved)?;
        match &self.leading_tariff {
            Some(s) => write!(f, "Leading tariff:        {}{} ({})", s.key, s.tariff, s.committed),
            None => write!(f, "Leading tariff:        none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(cycle: usize, charges: f64, balance: i64, shares: Vec<(&str, u64)>) -> CycleSummary {
        CycleSummary {
            cycle,
            start: SimTime::EPOCH,
            published: 0,
            revoked: 0,
            settled: 0,
            migrations: 1,
            allocation_balance: balance,
            population_conserved: true,
            charges,
            curtailed_kwh: 2.5,
            balancing_kwh: -0.5,
            transactions: 3,
            shares: shares
                .into_iter()
                .enumerate()
                .map(|(i, (key, committed))| TariffShare {
                    key: key.to_string(),
                    tariff: TariffId(i as u64 + 1),
                    committed,
                })
                .collect(),
        }
    }

    #[test]
    fn empty_run() {
        let report = MarketReport::from_summaries(&[]);
        assert_eq!(report.cycles, 0);
        assert_eq!(report.total_charges, 0.0);
        assert!(report.population_conserved);
        assert!(report.leading_tariff.is_none());
    }

    #[test]
    fn aggregates_cycles() {
        let summaries = vec![
            summary(0, -10.0, 0, vec![("std", 100)]),
            summary(1, -12.5, 3, vec![("std", 40), ("alpha", 60)]),
        ];
        let report = MarketReport::from_summaries(&summaries);
        assert_eq!(report.cycles, 2);
        assert!((report.total_charges + 22.5).abs() < 1e-9);
        assert_eq!(report.total_curtailed_kwh, 5.0);
        assert_eq!(report.total_balancing_kwh, -1.0);
        assert_eq!(report.total_transactions, 6);
        assert_eq!(report.total_migrations, 2);
        assert_eq!(report.unbalanced_cycles, 1);
        assert_eq!(report.leading_tariff.map(|s| s.key), Some("alpha".to_string()));
    }

    #[test]
    fn display_lists_nonzero_shares() {
        let s = summary(2, -1.0, 0, vec![("std", 0), ("alpha", 5)]);
        let text = s.to_string();
        assert!(text.contains("alpha#2=5"));
        assert!(text.contains("curtailed=2.50"));
        assert!(!text.contains("std#1"));
        assert_eq!(s.committed_to("alpha"), 5);
        assert_eq!(s.committed_to("missing"), 0);
    }

    #[test]
    fn report_header() {
        let report = MarketReport::from_summaries(&[summary(0, 0.0, 0, vec![])]);
        assert!(report.to_string().starts_with("--- Market Report ---"));
    }
}
