//! # Messages
//!
//! Value types that flow through dispatch: call identifiers, the message a handler
//! receives, the completion it produces, and the wire envelopes exchanged between a
//! transport client and a listener.

use crate::error::ActError;
use crate::pattern::Pattern;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use uuid::Uuid;

/// Application data carried by a call and by its result.
pub type Payload = serde_json::Value;

/// The single terminal event of a call.
pub type Completion = Result<Payload, ActError>;

/// Unique call identifier. Stable across the wire, so a remote half of a call runs
/// under the same id as its local proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(Uuid);

impl CallId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        let s = self.0.simple().to_string();
        f.write_str(&s[..12])
    }
}

/// Identity and lineage of one in-flight call.
#[derive(Debug, Clone)]
pub struct CallInfo {
    pub id: CallId,
    pub parent: Option<CallId>,
    pub pattern: Pattern,
    pub started_at: Instant,
}

impl CallInfo {
    pub fn new(id: CallId, parent: Option<CallId>, pattern: Pattern) -> Self {
        Self {
            id,
            parent,
            pattern,
            started_at: Instant::now(),
        }
    }
}

/// What a handler receives.
#[derive(Debug, Clone)]
pub struct Message {
    pub call: CallInfo,
    pub payload: Payload,
}

impl Message {
    pub fn pattern(&self) -> &Pattern {
        &self.call.pattern
    }
}

/// Request envelope sent from a transport client to a listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportMessage {
    pub call_id: CallId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<CallId>,
    pub pattern: Pattern,
    #[serde(default)]
    pub payload: Payload,
    /// Time the caller still waits for a reply, less one hop margin. The listener never
    /// runs the call for longer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_ms: Option<u64>,
}

/// Reply envelope sent from a listener back to the client.
///
/// Exactly one of `error` and `result` is set by well-behaved peers; a reply with
/// neither is read as a successful `null` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportReply {
    pub call_id: CallId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ActError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Payload>,
}

impl TransportReply {
    pub fn from_completion(call_id: CallId, completion: Completion) -> Self {
        match completion {
            Ok(result) => Self {
                call_id,
                error: None,
                result: Some(result),
            },
            Err(error) => Self {
                call_id,
                error: Some(error),
                result: None,
            },
        }
    }

    pub fn into_completion(self) -> Completion {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Payload::Null)),
        }
    }
}
