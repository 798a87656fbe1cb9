//! # Calls and Settlement
//!
//! A [`Call`] is one in-flight invocation. Its outcome is decided through a
//! [`Responder`], a cloneable one-shot handle shared by the handler and the timeout
//! supervisor. Whoever completes first wins; every later attempt is ignored and logged.

use crate::error::ActError;
use crate::message::{CallInfo, Completion, Payload};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Lifecycle state of a call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallState {
    Pending,
    Fulfilled(Payload),
    Failed(ActError),
}

impl CallState {
    pub fn is_pending(&self) -> bool {
        matches!(self, CallState::Pending)
    }
}

/// An in-flight call as owned by the dispatcher.
#[derive(Debug)]
pub struct Call {
    pub info: CallInfo,
    state: CallState,
}

impl Call {
    pub fn new(info: CallInfo) -> Self {
        Self {
            info,
            state: CallState::Pending,
        }
    }

    pub fn state(&self) -> &CallState {
        &self.state
    }

    /// Moves the call out of `Pending`. Settling twice keeps the first outcome.
    pub fn settle(&mut self, completion: &Completion) -> bool {
        if !self.state.is_pending() {
            return false;
        }
        self.state = match completion {
            Ok(result) => CallState::Fulfilled(result.clone()),
            Err(err) => CallState::Failed(err.clone()),
        };
        true
    }
}

/// Single-fire completion handle for one call.
///
/// Cloning shares the same slot, so a handler may hand copies to nested callbacks.
/// Only the first `complete` reaches the caller.
#[derive(Clone)]
pub struct Responder {
    call: Arc<CallInfo>,
    slot: Arc<Mutex<Option<oneshot::Sender<Completion>>>>,
}

impl Responder {
    pub(crate) fn channel(call: CallInfo) -> (Self, oneshot::Receiver<Completion>) {
        let (sender, receiver) = oneshot::channel();
        let responder = Self {
            call: Arc::new(call),
            slot: Arc::new(Mutex::new(Some(sender))),
        };
        (responder, receiver)
    }

    pub fn call(&self) -> &CallInfo {
        &self.call
    }

    /// Completes the call. Returns `false` if it was already completed.
    pub fn complete(&self, completion: Completion) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(sender) => {
                if sender.send(completion).is_err() {
                    debug!(call_id = %self.call.id, pattern = %self.call.pattern, "Caller gone before completion");
                }
                true
            }
            None => {
                let error = completion.err().map(|e| e.to_string());
                warn!(
                    call_id = %self.call.id,
                    pattern = %self.call.pattern,
                    error = ?error,
                    "Completion ignored: call already settled"
                );
                false
            }
        }
    }

    pub fn ok(&self, result: Payload) -> bool {
        self.complete(Ok(result))
    }

    pub fn fail(&self, error: ActError) -> bool {
        self.complete(Err(error))
    }

    pub fn is_settled(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("call_id", &self.call.id)
            .field("settled", &self.is_settled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CallId;
    use crate::pattern::Pattern;
    use serde_json::json;

    fn info() -> CallInfo {
        CallInfo::new(CallId::new(), None, Pattern::parse("cmd:A").unwrap())
    }

    #[tokio::test]
    async fn first_completion_wins() {
        let (done, rx) = Responder::channel(info());
        let copy = done.clone();

        assert!(done.ok(json!({"n": 1})));
        assert!(!copy.fail(ActError::handler("late")));
        assert!(!done.ok(json!({"n": 2})));

        assert_eq!(rx.await.unwrap().unwrap(), json!({"n": 1}));
        assert!(copy.is_settled());
    }

    #[test]
    fn call_state_settles_once() {
        let mut call = Call::new(info());
        assert!(call.settle(&Err(ActError::handler("boom"))));
        assert!(!call.settle(&Ok(json!(null))));
        assert!(matches!(call.state(), CallState::Failed(e) if e.message == "boom"));
    }
}
