//! # Mock Peer & Testing Guide
//!
//! [`MockPeer`] is an in-memory [`Transport`]. Route patterns to it exactly like a real
//! client, queue the replies it should give, and assert afterwards that every queued
//! expectation was consumed. It lets you test a node's handlers against a "remote" side
//! that fails in precise ways (handler errors, transport faults, silence) without
//! opening sockets.
//!
//! ## When to use MockPeer vs a real Listener
//!
//! | | MockPeer | Listener + TcpTransport |
//! |---|---|---|
//! | **Speed** | In-memory | Loopback TCP |
//! | **Determinism** | Scripted replies | Real handlers on the other side |
//! | **Error injection** | `return_err`, `return_fault`, `hang` | Needs a failing handler |
//! | **Use case** | Testing chain logic around a remote hop | End-to-end scenarios |
//!
//! ## Example
//!
//! ```rust
//! use action_framework::mock::MockPeer;
//! use action_framework::{ActError, Config, Dispatcher, ErrorHooks, Pattern};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let peer = MockPeer::new("remote");
//!     peer.expect_act("cmd:C").return_err(ActError::handler("test"));
//!
//!     let dispatcher = Dispatcher::new(&Config::default(), ErrorHooks::default());
//!     dispatcher
//!         .route(&[Pattern::parse("cmd:*").unwrap()], Arc::new(peer.clone()))
//!         .unwrap();
//!
//!     let err = dispatcher.call("cmd:C", json!({})).await.unwrap_err();
//!     assert_eq!(err.message, "test");
//!     peer.verify();
//! }
//! ```

use crate::error::ActError;
use crate::message::{Completion, Payload, TransportMessage, TransportReply};
use crate::pattern::{IntoPattern, Pattern};
use crate::transport::{Transport, TransportFault};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

enum MockResponse {
    Reply(Completion),
    Fault(String),
    Hang,
}

struct Expectation {
    pattern: Pattern,
    response: MockResponse,
}

#[derive(Default)]
struct State {
    expectations: VecDeque<Expectation>,
    received: Vec<TransportMessage>,
    unexpected: Vec<String>,
}

/// Scripted in-memory peer. Clones share the same script.
#[derive(Clone)]
pub struct MockPeer {
    name: String,
    state: Arc<Mutex<State>>,
}

impl MockPeer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Expects the next request to carry `pattern` (exact match).
    ///
    /// # Panics
    /// Panics if `pattern` is not valid pattern text.
    pub fn expect_act(&self, pattern: impl IntoPattern) -> ActExpectationBuilder<'_> {
        let pattern = match pattern.into_pattern() {
            Ok(pattern) => pattern,
            Err(e) => panic!("invalid pattern in expectation: {e}"),
        };
        ActExpectationBuilder {
            peer: self,
            pattern,
        }
    }

    /// Requests seen so far, in arrival order.
    pub fn received(&self) -> Vec<TransportMessage> {
        self.lock().received.clone()
    }

    /// Asserts that every expectation was consumed and no unexpected request arrived.
    pub fn verify(&self) {
        let state = self.lock();
        assert!(
            state.unexpected.is_empty(),
            "{}: unexpected requests: {:?}",
            self.name,
            state.unexpected
        );
        assert!(
            state.expectations.is_empty(),
            "{}: {} expectation(s) not met, next: {}",
            self.name,
            state.expectations.len(),
            state.expectations.front().map(|e| e.pattern.to_string()).unwrap_or_default()
        );
    }

    fn push(&self, pattern: Pattern, response: MockResponse) {
        self.lock().expectations.push_back(Expectation { pattern, response });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct ActExpectationBuilder<'a> {
    peer: &'a MockPeer,
    pattern: Pattern,
}

impl ActExpectationBuilder<'_> {
    pub fn return_ok(self, result: Payload) {
        self.peer.push(self.pattern, MockResponse::Reply(Ok(result)));
    }

    /// Replies with a remote error, as a listener would after a handler failure.
    pub fn return_err(self, error: ActError) {
        self.peer.push(self.pattern, MockResponse::Reply(Err(error)));
    }

    /// Fails the send itself, as a broken connection would.
    pub fn return_fault(self, message: impl Into<String>) {
        self.peer.push(self.pattern, MockResponse::Fault(message.into()));
    }

    /// Never replies.
    pub fn hang(self) {
        self.peer.push(self.pattern, MockResponse::Hang);
    }
}

#[async_trait]
impl Transport for MockPeer {
    async fn send(&self, request: TransportMessage) -> Result<TransportReply, TransportFault> {
        let response = {
            let mut state = self.lock();
            state.received.push(request.clone());
            let matches = state
                .expectations
                .front()
                .is_some_and(|e| e.pattern == request.pattern);
            if matches {
                state.expectations.pop_front().map(|e| e.response)
            } else {
                state.unexpected.push(request.pattern.to_string());
                None
            }
        };

        match response {
            Some(MockResponse::Reply(completion)) => {
                let completion = completion.map_err(|mut err| {
                    // The remote side stamps its own link before replying.
                    err.stamp(request.call_id, &request.pattern);
                    err
                });
                Ok(TransportReply::from_completion(request.call_id, completion))
            }
            Some(MockResponse::Fault(message)) => Err(TransportFault::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                message,
            ))),
            Some(MockResponse::Hang) => std::future::pending().await,
            None => Ok(TransportReply::from_completion(
                request.call_id,
                Err(ActError::not_found(&request.pattern)),
            )),
        }
    }

    fn describe(&self) -> String {
        format!("mock://{}", self.name)
    }
}
