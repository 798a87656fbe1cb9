//! # Timeout Supervisor
//!
//! Arms a timer per dispatched call. The timer completes the call with a
//! [`ErrorKind::Timeout`](crate::error::ErrorKind::Timeout) error through the call's own
//! [`Responder`], so it competes with the handler under the first-completion-wins rule.
//! Dropping the returned [`TimerGuard`] disarms the timer.
//!
//! ## Deadlines
//!
//! A nested call never outlives its parent: its timeout is capped at the parent's
//! remaining time minus one hop margin. The innermost pending call therefore expires
//! first, and its timeout error has room to travel back up the chain before any
//! ancestor's timer fires.

use crate::call::Responder;
use crate::config::DEFAULT_HOP_MARGIN_MS;
use crate::error::ActError;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct TimeoutSupervisor {
    default_timeout: Duration,
    hop_margin: Duration,
}

impl TimeoutSupervisor {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            default_timeout,
            hop_margin: Duration::from_millis(DEFAULT_HOP_MARGIN_MS),
        }
    }

    pub fn with_hop_margin(mut self, hop_margin: Duration) -> Self {
        self.hop_margin = hop_margin;
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn hop_margin(&self) -> Duration {
        self.hop_margin
    }

    /// Timeout for a call: the requested one, or the default.
    pub fn effective(&self, requested: Option<Duration>) -> Duration {
        requested.unwrap_or(self.default_timeout)
    }

    /// Timeout for a call made while a parent is pending until `deadline`.
    pub fn bounded(&self, requested: Option<Duration>, deadline: Instant) -> Duration {
        self.effective(requested).min(self.budget(deadline))
    }

    /// Time left before `deadline`, less one hop margin. Zero once it has passed.
    pub fn budget(&self, deadline: Instant) -> Duration {
        deadline
            .saturating_duration_since(Instant::now())
            .saturating_sub(self.hop_margin)
    }

    /// Starts the timer for the call behind `responder`.
    pub fn arm(&self, responder: Responder, after: Duration) -> TimerGuard {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let call = responder.call();
            if responder.fail(ActError::timeout(&call.pattern, after)) {
                warn!(call_id = %call.id, pattern = %call.pattern, timeout_ms = millis(after), "Call timed out");
            }
        });
        TimerGuard { handle }
    }
}

/// Instant `timeout` from now; a timeout too large to represent lands about 30 years out.
pub fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(86400 * 365 * 30))
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Disarms the timer when dropped.
#[derive(Debug)]
pub struct TimerGuard {
    handle: JoinHandle<()>,
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::message::{CallId, CallInfo};
    use crate::pattern::Pattern;
    use serde_json::json;

    fn responder() -> (Responder, tokio::sync::oneshot::Receiver<crate::message::Completion>) {
        Responder::channel(CallInfo::new(
            CallId::new(),
            None,
            Pattern::parse("cmd:D").unwrap(),
        ))
    }

    #[tokio::test]
    async fn expiry_fails_the_call() {
        let supervisor = TimeoutSupervisor::new(Duration::from_secs(60));
        let (done, rx) = responder();
        let _guard = supervisor.arm(done.clone(), supervisor.effective(Some(Duration::from_millis(20))));

        let err = rx.await.unwrap().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        // A late handler completion is discarded.
        assert!(!done.ok(json!("late")));
    }

    #[tokio::test]
    async fn completion_before_expiry_wins() {
        let supervisor = TimeoutSupervisor::new(Duration::from_millis(30));
        let (done, rx) = responder();
        let guard = supervisor.arm(done.clone(), supervisor.effective(None));

        assert!(done.ok(json!("fast")));
        drop(guard);
        assert_eq!(rx.await.unwrap().unwrap(), json!("fast"));
    }

    #[test]
    fn nested_timeout_is_capped_by_parent_deadline() {
        let supervisor = TimeoutSupervisor::new(Duration::from_secs(5)).with_hop_margin(Duration::from_millis(20));
        let deadline = Instant::now() + Duration::from_millis(100);

        let child = supervisor.bounded(None, deadline);
        assert!(child <= Duration::from_millis(80));
        assert!(child > Duration::from_millis(40));

        // A shorter request is kept as is.
        assert_eq!(supervisor.bounded(Some(Duration::from_millis(10)), deadline), Duration::from_millis(10));
    }

    #[test]
    fn passed_deadline_leaves_no_budget() {
        let supervisor = TimeoutSupervisor::new(Duration::from_secs(5));
        let deadline = Instant::now();
        assert_eq!(supervisor.budget(deadline), Duration::ZERO);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
