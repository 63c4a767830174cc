pub mod probe;
pub mod service;

pub use probe::{probe_for, Probe, ProbeOutcome};
pub use service::{CoreService, DefaultCoreService};
