/// Simulated time and the timeslot clock.
pub mod clock;
/// Cycle-by-cycle market simulation.
pub mod engine;
pub mod kpi;
