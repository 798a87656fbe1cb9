//! # System Lifecycle
//!
//! Starts and stops the two-node setup every scenario runs on:
//!
//! ```text
//!   client node                         server node (listen 127.0.0.1:0, pin cmd:*)
//! ┌──────────────┐   TCP, cmd:*   ┌────────────────────────────────────────────┐
//! │ call cmd:A ──┼───────────────►│ A ──► B ──► C                              │
//! │ error hook   │◄───────────────┼─ reply (result | error with chain)         │
//! └──────────────┘                │ error hook                                 │
//!                                 └────────────────────────────────────────────┘
//! ```
//!
//! The client has no local actions, so `cmd:A` is routed to the server. On the server,
//! A's call to B and B's call to C resolve locally.
//!
//! ## Graceful Shutdown
//!
//! 1. **Client node** - its transport handles are dropped, ending the connection actor
//! 2. **Server node** - the listener stops accepting and open connections are dropped
//!
//! Set `RUST_LOG=debug` to see every dispatch and completion on both nodes.

pub mod chain_system;

pub use chain_system::*;
