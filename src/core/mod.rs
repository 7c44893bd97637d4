pub mod elements;
pub mod errors;
pub mod event_scheduler;
pub mod netlist;
pub mod signal;
pub mod simulator;
pub mod types;

#[cfg(test)]
mod tests;
