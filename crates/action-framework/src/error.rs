//! # Errors
//!
//! Two families live here:
//!
//! - [`FrameworkError`]: setup-time failures (bad pattern, duplicate registration,
//!   bind errors). Returned through `Result` like any other Rust error.
//! - [`ActError`]: the error side of a call's completion. It is *data*: it travels
//!   through callbacks and across the wire, and every link of a call chain decides for
//!   itself whether to forward it.

use crate::message::{CallId, Payload};
use crate::pattern::Pattern;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors raised while building or running a node.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Invalid pattern: {0:?}")]
    InvalidPattern(String),
    #[error("Pattern already registered: {0}")]
    DuplicatePattern(Pattern),
    #[error("Failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Node closed")]
    NodeClosed,
}

/// Classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Returned by registered handler logic.
    Handler,
    /// Synthesized by the timeout supervisor.
    Timeout,
    /// Serialization or network failure between nodes.
    Transport,
    /// No matching registration locally or on any client route.
    NotFound,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Handler => "handler-error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Transport => "transport-error",
            ErrorKind::NotFound => "not-found",
        };
        f.write_str(s)
    }
}

/// One hop of an error's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    pub call: CallId,
    pub pattern: Pattern,
}

/// The error value carried by a failed completion.
///
/// `chain` is ordered from the call where the error originated to the call where it
/// is currently observed. Each call that completes with this error appends itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ActError {
    pub kind: ErrorKind,
    pub message: String,
    /// The call that first produced the error. `None` until the error is stamped.
    pub origin: Option<CallId>,
    #[serde(default)]
    pub chain: Vec<ChainLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Payload>,
}

impl ActError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            origin: None,
            chain: Vec::new(),
            details: None,
        }
    }

    /// An error raised by handler code, e.g. `done.fail(ActError::handler("test"))`.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Handler, message)
    }

    pub fn timeout(pattern: &Pattern, after: std::time::Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("{pattern} timed out after {}ms", after.as_millis()),
        )
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn not_found(pattern: &Pattern) -> Self {
        Self::new(ErrorKind::NotFound, format!("no action matches {pattern}"))
    }

    pub fn with_details(mut self, details: Payload) -> Self {
        self.details = Some(details);
        self
    }

    /// Appends a chain link unless `call` is already the most recent one.
    ///
    /// The first stamp also fixes `origin`.
    pub fn stamp(&mut self, call: CallId, pattern: &Pattern) {
        if self.origin.is_none() {
            self.origin = Some(call);
        }
        if self.chain.last().map(|l| l.call) == Some(call) {
            return;
        }
        self.chain.push(ChainLink {
            call,
            pattern: pattern.clone(),
        });
    }

    /// Pattern labels along the chain, origin first: `["C", "B", "A"]`.
    pub fn chain_labels(&self) -> Vec<String> {
        self.chain.iter().map(|l| l.pattern.label()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamping_is_idempotent_per_call() {
        let c = CallId::new();
        let b = CallId::new();
        let pattern_c = Pattern::parse("cmd:C").unwrap();
        let pattern_b = Pattern::parse("cmd:B").unwrap();

        let mut err = ActError::handler("test");
        err.stamp(c, &pattern_c);
        err.stamp(c, &pattern_c);
        err.stamp(b, &pattern_b);

        assert_eq!(err.origin, Some(c));
        assert_eq!(err.chain_labels(), vec!["C", "B"]);
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = ActError::handler("test");
        assert_eq!(err.to_string(), "handler-error: test");
    }
}
