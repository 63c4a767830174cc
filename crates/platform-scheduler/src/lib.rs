pub mod lease;
pub mod next_run;
pub mod service;
pub mod stats;

pub use lease::{lease_ttl, Lease};
pub use next_run::compute_next_run;
pub use service::{DefaultScheduler, DrainReport, SchedulerService};
pub use stats::{SchedulerState, SchedulerStats};
