//! # Call Chain Tracker
//!
//! Records parent/child linkage of in-flight calls and stamps failed completions with
//! the call they passed through.
//!
//! Propagation is opt-in at every hop: the tracker never forwards an error. A handler
//! that receives an error from a child decides whether to forward it, replace it, or
//! extinguish it by completing with a result. The tracker only guarantees that when an
//! error *is* forwarded, its chain names every call it passed through, origin first.

use crate::error::ActError;
use crate::message::{CallId, CallInfo};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::trace;

#[derive(Debug)]
struct CallRecord {
    info: CallInfo,
    children: Vec<CallId>,
}

#[derive(Debug, Default)]
pub struct CallTracker {
    calls: Mutex<HashMap<CallId, CallRecord>>,
}

impl CallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a call that just started and links it under its parent.
    pub fn begin(&self, info: &CallInfo) {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = info.parent.and_then(|p| calls.get_mut(&p)) {
            parent.children.push(info.id);
        }
        calls.insert(
            info.id,
            CallRecord {
                info: info.clone(),
                children: Vec::new(),
            },
        );
        trace!(call_id = %info.id, parent = ?info.parent.map(|p| p.to_string()), "Call tracked");
    }

    /// Forgets a completed call.
    pub fn finish(&self, id: CallId) {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls.remove(&id);
    }

    /// Adds `call` to the error's chain. Repeated stamps by the same call are no-ops.
    pub fn stamp(&self, call: &CallInfo, error: &mut ActError) {
        error.stamp(call.id, &call.pattern);
    }

    /// Ids of in-flight calls started with `parent` as their parent.
    pub fn children(&self, parent: CallId) -> Vec<CallId> {
        let calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls
            .get(&parent)
            .map(|r| r.children.clone())
            .unwrap_or_default()
    }

    /// Path from the root call down to `id`, inclusive. Only in-flight ancestors are
    /// known, so the path stops at the first ancestor that already completed.
    pub fn ancestry(&self, id: CallId) -> Vec<CallId> {
        let calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(record) = calls.get(&current) else {
                break;
            };
            path.push(current);
            cursor = record.info.parent;
        }
        path.reverse();
        path
    }

    pub fn in_flight(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;

    fn info(parent: Option<CallId>, pattern: &str) -> CallInfo {
        CallInfo::new(CallId::new(), parent, Pattern::parse(pattern).unwrap())
    }

    #[test]
    fn tracks_lineage_of_nested_calls() {
        let tracker = CallTracker::new();
        let a = info(None, "cmd:A");
        let b = info(Some(a.id), "cmd:B");
        let c = info(Some(b.id), "cmd:C");
        tracker.begin(&a);
        tracker.begin(&b);
        tracker.begin(&c);

        assert_eq!(tracker.children(a.id), vec![b.id]);
        assert_eq!(tracker.ancestry(c.id), vec![a.id, b.id, c.id]);

        tracker.finish(c.id);
        tracker.finish(b.id);
        tracker.finish(a.id);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn forwarded_error_accumulates_chain_in_order() {
        let tracker = CallTracker::new();
        let a = info(None, "cmd:A");
        let b = info(Some(a.id), "cmd:B");
        let c = info(Some(b.id), "cmd:C");

        let mut err = ActError::handler("test");
        tracker.stamp(&c, &mut err);
        tracker.stamp(&b, &mut err);
        tracker.stamp(&a, &mut err);

        assert_eq!(err.chain_labels(), vec!["C", "B", "A"]);
        assert_eq!(err.origin, Some(c.id));
    }
}
