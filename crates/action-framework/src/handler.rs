//! # Action Handlers
//!
//! An [`ActionHandler`] is the logic bound to a pattern. It receives the [`Message`], an
//! [`ActContext`] for nested dispatch, and the call's [`Responder`]. The handler decides
//! when and how the call completes; the dispatcher only guarantees that the first
//! completion is the one delivered.
//!
//! Any `Fn(Message, ActContext, Responder) -> impl Future<Output = ()>` is a handler, so
//! the common case is a closure:
//!
//! ```rust,ignore
//! dispatcher.add("cmd:C", |_msg, _ctx, done: Responder| async move {
//!     done.fail(ActError::handler("test"));
//! })?;
//! ```
//!
//! Handlers that simply produce a value can use [`reply`], which completes with whatever
//! the future returns.

use crate::call::Responder;
use crate::dispatcher::ActContext;
use crate::message::{Completion, Message};
use async_trait::async_trait;
use std::future::Future;

#[async_trait]
pub trait ActionHandler: Send + Sync + 'static {
    async fn handle(&self, msg: Message, ctx: ActContext, done: Responder);
}

#[async_trait]
impl<F, Fut> ActionHandler for F
where
    F: Fn(Message, ActContext, Responder) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, msg: Message, ctx: ActContext, done: Responder) {
        (self)(msg, ctx, done).await
    }
}

/// Handler adapter that completes the call with the future's output.
pub struct Reply<F>(F);

/// Wraps a `Fn(Message, ActContext) -> impl Future<Output = Completion>` as a handler.
pub fn reply<F, Fut>(f: F) -> Reply<F>
where
    F: Fn(Message, ActContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Completion> + Send + 'static,
{
    Reply(f)
}

#[async_trait]
impl<F, Fut> ActionHandler for Reply<F>
where
    F: Fn(Message, ActContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Completion> + Send + 'static,
{
    async fn handle(&self, msg: Message, ctx: ActContext, done: Responder) {
        let completion = (self.0)(msg, ctx).await;
        done.complete(completion);
    }
}
