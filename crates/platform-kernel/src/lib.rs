//! Shared kernel: configuration, error taxonomy, ports (clock, id
//! generator), ambient request context, and the resilience primitives
//! (retry policy, circuit breaker) used by every other platform crate.
//!
//! Nothing in this crate talks to a database, cache, or network socket —
//! those live in `platform-persistence` and `platform-cache` behind the
//! ports declared here.

pub mod circuit;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod ids;
pub mod retry;
pub mod rpc;

pub use circuit::{Admission, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::Config;
pub use context::RequestContext;
pub use error::{AppError, ErrorKind};
pub use identity::Identity;
pub use ids::{IdGenerator, SequentialIdGenerator, UuidGenerator};
pub use retry::RetryPolicy;
pub use rpc::{ForgeService, MetricsService, NotificationService};
