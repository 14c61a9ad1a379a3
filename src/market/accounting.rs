//! Tariff transactions and the ledger that collects them.

use std::fmt;

use crate::customer::{CustomerId, CustomerInfo};
use crate::tariff::{Tariff, TariffId};

/// What a tariff transaction settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Signup,
    Withdraw,
    Refund,
    Periodic,
    Consume,
    Produce,
    /// Balancing energy taken from a subscription.
    Regulation,
}

impl TransactionKind {
    pub fn label(self) -> &'static str {
        match self {
            TransactionKind::Signup => "SIGNUP",
            TransactionKind::Withdraw => "WITHDRAW",
            TransactionKind::Refund => "REFUND",
            TransactionKind::Periodic => "PERIODIC",
            TransactionKind::Consume => "CONSUME",
            TransactionKind::Produce => "PRODUCE",
            TransactionKind::Regulation => "REGULATION",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sink for the transactions a subscription generates.
///
/// Energy is in the broker's sign convention (energy delivered to the
/// customer is negative), and a positive charge is a credit to the broker.
pub trait Accounting {
    fn add_tariff_transaction(
        &mut self,
        kind: TransactionKind,
        tariff: &Tariff,
        customer: &CustomerInfo,
        count: u64,
        kwh: f64,
        charge: f64,
    );

    fn add_regulation_transaction(
        &mut self,
        tariff: &Tariff,
        customer: &CustomerInfo,
        count: u64,
        kwh: f64,
        charge: f64,
    );
}

/// One settled tariff transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub timeslot: usize,
    pub kind: TransactionKind,
    pub tariff: TariffId,
    pub broker: String,
    pub customer: CustomerId,
    pub count: u64,
    pub kwh: f64,
    pub charge: f64,
}

/// In-memory ledger, stamping each transaction with the current timeslot.
#[derive(Debug, Default, Clone)]
pub struct TransactionLog {
    timeslot: usize,
    transactions: Vec<Transaction>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_timeslot(&mut self, timeslot: usize) {
        self.timeslot = timeslot;
    }

    pub fn timeslot(&self) -> usize {
        self.timeslot
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Transactions of one kind, in posting order.
    pub fn of_kind(&self, kind: TransactionKind) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(move |t| t.kind == kind)
    }

    /// Sum of charges posted during timeslots `from..to`.
    pub fn charge_between(&self, from: usize, to: usize) -> f64 {
        self.transactions
            .iter()
            .filter(|t| t.timeslot >= from && t.timeslot < to)
            .map(|t| t.charge)
            .sum()
    }

    fn push(
        &mut self,
        kind: TransactionKind,
        tariff: &Tariff,
        customer: &CustomerInfo,
        count: u64,
        kwh: f64,
        charge: f64,
    ) {
        self.transactions.push(Transaction {
            timeslot: self.timeslot,
            kind,
            tariff: tariff.id(),
            broker: tariff.broker().to_string(),
            customer: customer.id,
            count,
            kwh,
            charge,
        });
    }
}

impl Accounting for TransactionLog {
    fn add_tariff_transaction(
        &mut self,
        kind: TransactionKind,
        tariff: &Tariff,
        customer: &CustomerInfo,
        count: u64,
        kwh: f64,
        charge: f64,
    ) {
        self.push(kind, tariff, customer, count, kwh, charge);
    }

    fn add_regulation_transaction(
        &mut self,
        tariff: &Tariff,
        customer: &CustomerInfo,
        count: u64,
        kwh: f64,
        charge: f64,
    ) {
        self.push(TransactionKind::Regulation, tariff, customer, count, kwh, charge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tariff::{PowerType, Rate};

    #[test]
    fn stamps_current_timeslot() {
        let tariff = Tariff::builder(TariffId(3), "bob", PowerType::Consumption)
            .rate(Rate::fixed(-0.1))
            .build();
        let customer = CustomerInfo::new(CustomerId(1), "town", 10, PowerType::Consumption);
        let mut log = TransactionLog::new();
        log.add_tariff_transaction(TransactionKind::Signup, &tariff, &customer, 10, 0.0, -1.0);
        log.set_timeslot(4);
        log.add_regulation_transaction(&tariff, &customer, 10, 2.0, 0.5);

        assert_eq!(log.len(), 2);
        assert_eq!(log.transactions()[0].timeslot, 0);
        assert_eq!(log.transactions()[1].timeslot, 4);
        assert_eq!(log.transactions()[1].kind, TransactionKind::Regulation);
        assert_eq!(log.transactions()[1].broker, "bob");
        assert!((log.charge_between(0, 5) + 0.5).abs() < 1e-9);
        assert!((log.charge_between(1, 5) - 0.5).abs() < 1e-9);
    }
}
