// Reconciliation job and its schedule
pub mod scheduler;
pub mod sweep;

pub use scheduler::Scheduler;
pub use sweep::{ReconciliationJob, SweepReport};
