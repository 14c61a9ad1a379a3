//! CSV export for the transaction log and per-cycle summaries.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::SimError;
use crate::market::Transaction;
use crate::sim::kpi::CycleSummary;

/// Column header for the transaction export.
const TRANSACTION_HEADER: &str = "timeslot,kind,tariff,broker,customer,count,kwh,charge";

/// Column header for the cycle summary export.
const SUMMARY_HEADER: &str = "cycle,start,published,revoked,settled,migrations,\
                              allocation_balance,population_conserved,charges,\
                              curtailed_kwh,balancing_kwh,transactions";

/// Exports the transaction log to a CSV file at the given path.
///
/// # Errors
///
/// Returns a `SimError` if file creation or writing fails.
pub fn export_transactions(transactions: &[Transaction], path: &Path) -> Result<(), SimError> {
    let file = File::create(path)?;
    write_transactions_csv(transactions, io::BufWriter::new(file))
}

/// Writes transactions as CSV to any writer, one row per transaction in
/// posting order.
///
/// # Arguments
///
/// * `transactions` - Settled transactions
/// * `writer` - Destination implementing `Write`
///
/// # Errors
///
/// Returns a `SimError` if writing fails.
pub fn write_transactions_csv(transactions: &[Transaction], writer: impl Write) -> Result<(), SimError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(TRANSACTION_HEADER.split(','))?;
    for t in transactions {
        wtr.write_record(&[
            t.timeslot.to_string(),
            t.kind.label().to_string(),
            t.tariff.0.to_string(),
            t.broker.clone(),
            t.customer.0.to_string(),
            t.count.to_string(),
            format!("{:.4}", t.kwh),
            format!("{:.4}", t.charge),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Exports cycle summaries to a CSV file at the given path.
///
/// # Errors
///
/// Returns a `SimError` if file creation or writing fails.
pub fn export_summaries(summaries: &[CycleSummary], path: &Path) -> Result<(), SimError> {
    let file = File::create(path)?;
    write_summaries_csv(summaries, io::BufWriter::new(file))
}

/// Writes cycle summaries as CSV to any writer.
///
/// Per-tariff shares are not included; they vary in number across cycles.
///
/// # Errors
///
/// Returns a `SimError` if writing fails.
pub fn write_summaries_csv(summaries: &[CycleSummary], writer: impl Write) -> Result<(), SimError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(SUMMARY_HEADER.split(',').map(str::trim))?;
    for s in summaries {
        wtr.write_record(&[
            s.cycle.to_string(),
            s.start.millis().to_string(),
            s.published.to_string(),
            s.revoked.to_string(),
            s.settled.to_string(),
            s.migrations.to_string(),
            s.allocation_balance.to_string(),
            s.population_conserved.to_string(),
            format!("{:.4}", s.charges),
            format!("{:.4}", s.curtailed_kwh),
            format!("{:.4}", s.balancing_kwh),
            s.transactions.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
