//! # Action Framework
//!
//! A pattern-addressed messaging core. Nodes register handlers against structured
//! patterns (`cmd:A`, `role:math,cmd:sum`), dispatch actions by pattern, and receive
//! exactly one completion per call: `Ok(result)` or `Err(ActError)`. Calls nest, may
//! cross a process boundary over TCP, may time out, and every failing call is visible to
//! process-wide error hooks.
//!
//! ## Architecture Overview
//!
//! The framework separates concerns into four layers:
//!
//! 1. **Addressing** ([`Pattern`], [`Registry`]) - what a call is and who serves it
//! 2. **Dispatch** ([`Dispatcher`], [`Responder`], [`CallTracker`], [`TimeoutSupervisor`]) -
//!    one call's lifecycle from dispatch to its single completion
//! 3. **Transport** ([`Transport`], [`TcpTransport`], [`Listener`]) - the same calls across
//!    processes, with the same error shape
//! 4. **Lifecycle** ([`Node`], [`NodeBuilder`], [`Config`], [`ErrorHooks`]) - wiring and teardown
//!
//! ## Errors are data
//!
//! A failed call completes with an [`ActError`]: a kind (`Handler`, `Timeout`,
//! `Transport`, `NotFound`), a message, the call it originated in, and the chain of calls
//! it has passed through. Each handler decides what to do with a child's error:
//!
//! - **forward** it (`done.complete(child_result)`), extending the chain,
//! - **overwrite** it with its own error, or
//! - **extinguish** it by completing `Ok(..)`; upstream callers never see it.
//!
//! ```rust
//! use action_framework::{ActContext, ActError, Config, Dispatcher, ErrorHooks, Message, Responder};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let d = Dispatcher::new(&Config::default(), ErrorHooks::default());
//!     d.add("cmd:A", |_msg: Message, ctx: ActContext, done: Responder| async move {
//!         done.complete(ctx.call("cmd:B", json!({})).await);
//!     })
//!     .unwrap();
//!     d.add("cmd:B", |_msg: Message, _ctx: ActContext, done: Responder| async move {
//!         done.fail(ActError::handler("test"));
//!     })
//!     .unwrap();
//!
//!     let err = d.call("cmd:A", json!({})).await.unwrap_err();
//!     assert_eq!(err.message, "test");
//!     assert_eq!(err.chain_labels(), vec!["B", "A"]);
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! - Every handler invocation runs on its own Tokio task
//! - Nested dispatch is an `.await`, never a blocked thread
//! - Independent chains interleave freely; within a chain completions bubble innermost first
//! - The only cancellation is timeout expiry
//!
//! ## Testing
//!
//! [`mock::MockPeer`] is an in-memory [`Transport`] with an expectation queue, for testing
//! chain logic around a remote hop without sockets. See the [`mock`] module.

pub mod call;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod message;
pub mod mock;
pub mod node;
pub mod pattern;
pub mod registry;
pub mod timeout;
pub mod tracing;
pub mod tracker;
pub mod transport;

// Re-export core types for convenience
pub use call::{CallState, Responder};
pub use config::{Config, FailurePolicy};
pub use dispatcher::{ActContext, ActOptions, Dispatcher};
pub use error::{ActError, ChainLink, ErrorKind, FrameworkError};
pub use handler::{reply, ActionHandler};
pub use hooks::{ErrorHooks, ErrorHooksBuilder, ErrorObserver};
pub use message::{CallId, CallInfo, Completion, Message, Payload, TransportMessage, TransportReply};
pub use node::{Node, NodeBuilder, PluginScope};
pub use pattern::{IntoPattern, Pattern};
pub use registry::{OverridePolicy, Registry};
pub use timeout::TimeoutSupervisor;
pub use tracker::CallTracker;
pub use transport::{Listener, TcpTransport, Transport, TransportFault};
