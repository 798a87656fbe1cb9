use crate::observe::ErrorLog;
use action_framework::{
    ActContext, ActError, ActionHandler, FrameworkError, Message, PluginScope, Responder,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

/// What a link does when its child call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnChildError {
    /// Complete with the child's error.
    Forward,
    /// Complete `Ok`, marking the chain with `error`. Upstream never sees the failure.
    Extinguish,
}

/// How the last link behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    /// `cmd:C` fails with "test".
    Fail,
    /// Only `cmd:D` is registered, so `cmd:C` has no handler.
    Missing,
    /// `cmd:C` never completes.
    Silent,
    /// `cmd:C` succeeds with `{success: false, chain: "error"}`.
    ErrorInResult,
}

/// A handler that calls `next` and prefixes the child's `chain` with its own.
pub struct Link {
    next: &'static str,
    prefix: &'static str,
    on_error: OnChildError,
    log: ErrorLog,
}

#[async_trait]
impl ActionHandler for Link {
    async fn handle(&self, msg: Message, ctx: ActContext, done: Responder) {
        match ctx.call(self.next, json!({})).await {
            Ok(reply) => {
                let tail = reply.get("chain").and_then(Value::as_str).unwrap_or_default();
                done.ok(json!({ "chain": format!("{}{}", self.prefix, tail) }));
            }
            Err(err) => {
                warn!(at = %msg.pattern(), next = self.next, kind = %err.kind, error = %err.message, "Error propagated to caller");
                self.log.record_link(msg.pattern(), &err);
                match self.on_error {
                    OnChildError::Forward => done.fail(err),
                    OnChildError::Extinguish => done.ok(json!({ "chain": format!("{}error", self.prefix) })),
                };
            }
        }
    }
}

type Plugin = Box<dyn FnOnce(&PluginScope<'_>) -> Result<(), FrameworkError> + Send>;

/// `cmd:A` calls `cmd:B`.
pub fn a(on_error: OnChildError, log: ErrorLog) -> Plugin {
    Box::new(move |p: &PluginScope<'_>| {
        p.add(
            "cmd:A",
            Link {
                next: "cmd:B",
                prefix: "A->B->",
                on_error,
                log,
            },
        )
    })
}

/// `cmd:B` calls `cmd:C`.
pub fn b(on_error: OnChildError, log: ErrorLog) -> Plugin {
    Box::new(move |p: &PluginScope<'_>| {
        p.add(
            "cmd:B",
            Link {
                next: "cmd:C",
                prefix: "C->",
                on_error,
                log,
            },
        )
    })
}

pub fn c(tail: Tail) -> Plugin {
    Box::new(move |p: &PluginScope<'_>| match tail {
        Tail::Fail => p.add("cmd:C", |_msg: Message, _ctx: ActContext, done: Responder| async move {
            done.fail(ActError::handler("test"));
        }),
        Tail::Missing => p.add("cmd:D", |_msg: Message, _ctx: ActContext, done: Responder| async move {
            done.fail(ActError::handler("test"));
        }),
        // The responder is dropped unused; the timeout supervisor still holds the call.
        Tail::Silent => p.add("cmd:C", |_msg: Message, _ctx: ActContext, _done: Responder| async move {}),
        Tail::ErrorInResult => p.add("cmd:C", |_msg: Message, _ctx: ActContext, done: Responder| async move {
            done.ok(json!({ "success": false, "chain": "error" }));
        }),
    })
}
