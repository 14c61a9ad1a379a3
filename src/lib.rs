//! Tariff evaluation and subscription accounting for simulated retail
//! electricity markets.
//!
//! Customer populations score competing tariffs, split themselves across
//! them by a logit choice model, and are billed per timeslot through
//! subscription ledgers.

pub mod config;
/// Customer populations and customer models.
pub mod customer;
pub mod error;
/// Tariff scoring and population allocation.
pub mod evaluator;
pub mod io;
pub mod market;
/// Simulation clock, engine, and reporting.
pub mod sim;
pub mod subscription;
pub mod tariff;
