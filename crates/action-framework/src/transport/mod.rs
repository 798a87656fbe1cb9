//! # Transport
//!
//! The narrow seam between the dispatcher and a networking layer. A [`Transport`] takes a
//! [`TransportMessage`] and eventually yields the peer's [`TransportReply`]. Anything that
//! goes wrong on the way is a [`TransportFault`], which reaches the caller as an
//! [`ActError`] of kind `Transport`, shaped exactly like a handler error.
//!
//! Bundled implementations:
//! - [`TcpTransport`]: client side over TCP (length-prefixed JSON frames, see [`codec`]).
//! - [`Listener`]: server side, dispatching accepted requests to local handlers.
//! - [`MockPeer`](crate::mock::MockPeer): in-memory peer for tests.

pub mod codec;
pub mod listener;
pub mod tcp;

pub use listener::Listener;
pub use tcp::TcpTransport;

use crate::error::ActError;
use crate::message::{TransportMessage, TransportReply};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum TransportFault {
    #[error("Connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed frame: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("Frame of {size} bytes exceeds limit of {limit}")]
    FrameTooLarge { size: usize, limit: usize },
    #[error("Connection closed before reply")]
    Closed,
}

impl From<TransportFault> for ActError {
    fn from(fault: TransportFault) -> Self {
        ActError::transport(fault.to_string())
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends one request and waits for its reply.
    async fn send(&self, request: TransportMessage) -> Result<TransportReply, TransportFault>;

    /// Peer description for logs.
    fn describe(&self) -> String;
}
