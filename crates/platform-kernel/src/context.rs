//! Ambient request context: a single
//! value carrying trace id, deadline, identity, and a cancellation signal,
//! threaded through every downstream call instead of ad hoc parameters.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::identity::Identity;

#[derive(Clone)]
pub struct RequestContext {
    pub trace_id: Uuid,
    pub deadline: Instant,
    pub identity: Option<Identity>,
    cancellation: CancellationToken,
}

impl RequestContext {
    pub fn new(trace_id: Uuid, timeout: Duration) -> Self {
        Self {
            trace_id,
            deadline: Instant::now() + timeout,
            identity: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Remaining time before the deadline, or `Duration::ZERO` if already past.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Derive a child context for a downstream call, capping its deadline to
    /// at most `max` from now even if the parent's budget is larger. Every
    /// external call is cancellable via a per-request deadline derived from
    /// the incoming deadline, capped to a component maximum.
    pub fn derive_with_cap(&self, max: Duration) -> Self {
        let remaining = self.remaining();
        let capped = remaining.min(max);
        Self {
            trace_id: self.trace_id,
            deadline: Instant::now() + capped,
            identity: self.identity.clone(),
            cancellation: self.cancellation.child_token(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_context_never_exceeds_cap() {
        let ctx = RequestContext::new(Uuid::new_v4(), Duration::from_secs(60));
        let child = ctx.derive_with_cap(Duration::from_secs(5));
        assert!(child.remaining() <= Duration::from_secs(5));
    }

    #[test]
    fn derived_context_respects_smaller_parent_budget() {
        let ctx = RequestContext::new(Uuid::new_v4(), Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(15));
        let child = ctx.derive_with_cap(Duration::from_secs(30));
        assert_eq!(child.remaining(), Duration::ZERO);
    }

    #[test]
    fn cancellation_propagates_to_children() {
        let ctx = RequestContext::new(Uuid::new_v4(), Duration::from_secs(5));
        let child = ctx.derive_with_cap(Duration::from_secs(5));
        ctx.cancel();
        assert!(child.is_canceled());
    }
}
