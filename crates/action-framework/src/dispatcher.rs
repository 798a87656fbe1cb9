//! # Dispatcher
//!
//! Resolves an outbound call and drives it to its single completion.
//!
//! ## Resolution order
//!
//! 1. Local handler registry (most specific match wins).
//! 2. Transport routes: the first client whose pin matches, by the same precedence.
//! 3. Otherwise the call fails immediately with `NotFound`; no timeout wait.
//!
//! ## Lifecycle of a call
//!
//! ```text
//! act(pattern) ─► CallTracker::begin ─► resolve ─┬─► local handler task ─┐
//!                                                └─► transport send ─────┤
//!                     TimeoutSupervisor::arm ────────────────────────────┤
//!                                                                        ▼
//!                           first completion wins (Responder) ─► stamp chain on error
//!                           ─► caller callback ─► ErrorHooks (failed calls only)
//! ```
//!
//! A pattern that does not parse still produces one failed completion: it gets a call
//! id, is stamped and reaches the error hooks like any other `NotFound`.
//!
//! ## Deadlines
//!
//! Every call runs against a deadline. A root call uses its requested timeout or the
//! node default. A call made through [`ActContext`] is capped at the parent's remaining
//! time minus the hop margin, and a remote call ships its remaining budget in the
//! request, so the hop that actually hangs is the one that times out and the error
//! reaches the root with the full chain.
//!
//! Handlers run on their own Tokio task, so a handler may `.await` nested calls without
//! blocking anything, and independent chains interleave freely.

use crate::call::{Call, CallState, Responder};
use crate::config::{Config, FailurePolicy};
use crate::error::{ActError, ErrorKind, FrameworkError};
use crate::handler::ActionHandler;
use crate::hooks::ErrorHooks;
use crate::message::{CallId, CallInfo, Completion, Message, Payload, TransportMessage, TransportReply};
use crate::pattern::{IntoPattern, Pattern};
use crate::registry::Registry;
use crate::timeout::{deadline_after, millis, TimeoutSupervisor};
use crate::tracker::CallTracker;
use crate::transport::Transport;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Owner name used for registrations made directly on the dispatcher.
pub const ROOT_OWNER: &str = "root";

/// Per-dispatch overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActOptions {
    pub timeout: Option<Duration>,
}

impl ActOptions {
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reach {
    /// Local handlers, then transport routes.
    Any,
    /// Local handlers only; used when serving a request that arrived over a transport.
    LocalOnly,
}

enum Target {
    Local(Arc<dyn ActionHandler>),
    Remote(Arc<dyn Transport>),
    Missing,
}

struct Inner {
    actions: RwLock<Registry<Arc<dyn ActionHandler>>>,
    routes: RwLock<Registry<Arc<dyn Transport>>>,
    tracker: CallTracker,
    timeouts: TimeoutSupervisor,
    hooks: ErrorHooks,
    failure_policy: FailurePolicy,
    fatal: watch::Sender<Option<ActError>>,
}

/// Cloneable handle to one node's dispatch machinery.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new(config: &Config, hooks: ErrorHooks) -> Self {
        let (fatal, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                actions: RwLock::new(Registry::new(config.override_policy)),
                routes: RwLock::new(Registry::new(config.override_policy)),
                tracker: CallTracker::new(),
                timeouts: TimeoutSupervisor::new(config.default_timeout()).with_hop_margin(config.hop_margin()),
                hooks,
                failure_policy: config.failure_policy,
                fatal,
            }),
        }
    }

    // ---------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------

    /// Registers a local handler.
    pub fn add(&self, pattern: impl IntoPattern, handler: impl ActionHandler) -> Result<(), FrameworkError> {
        self.add_owned(ROOT_OWNER, pattern, Arc::new(handler))
    }

    pub fn add_owned(
        &self,
        owner: &str,
        pattern: impl IntoPattern,
        handler: Arc<dyn ActionHandler>,
    ) -> Result<(), FrameworkError> {
        let pattern = pattern.into_pattern()?;
        debug!(%pattern, owner, "Action added");
        self.inner
            .actions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(pattern, handler, owner)
    }

    /// Routes calls matching any of `pins` to `transport` when no local handler exists.
    pub fn route(&self, pins: &[Pattern], transport: Arc<dyn Transport>) -> Result<(), FrameworkError> {
        let owner = transport.describe();
        let mut routes = self.inner.routes.write().unwrap_or_else(PoisonError::into_inner);
        for pin in pins {
            debug!(pin = %pin, peer = %owner, "Route added");
            routes.register(pin.clone(), transport.clone(), owner.clone())?;
        }
        Ok(())
    }

    /// Removes every local action added by `owner`.
    pub fn remove_owner(&self, owner: &str) -> usize {
        self.inner
            .actions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove_owner(owner)
    }

    /// Drops all actions and routes.
    pub fn clear(&self) {
        self.inner.actions.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.inner.routes.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Registered local patterns, in registration order.
    pub fn patterns(&self) -> Vec<Pattern> {
        self.inner
            .actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .list()
            .map(|r| r.pattern.clone())
            .collect()
    }

    pub fn tracker(&self) -> &CallTracker {
        &self.inner.tracker
    }

    pub fn hooks(&self) -> &ErrorHooks {
        &self.inner.hooks
    }

    /// Resolves with the first unobserved failure under [`FailurePolicy::Shutdown`].
    pub fn fatal(&self) -> watch::Receiver<Option<ActError>> {
        self.inner.fatal.subscribe()
    }

    // ---------------------------------------------------------------------
    // Dispatch
    // ---------------------------------------------------------------------

    /// Dispatches a root call and invokes `callback` exactly once with its completion.
    pub fn act<F>(&self, pattern: impl IntoPattern, payload: Payload, callback: F)
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        self.act_with(pattern, payload, None, ActOptions::default(), callback)
    }

    /// Awaitable form of [`act`](Self::act).
    pub async fn call(&self, pattern: impl IntoPattern, payload: Payload) -> Completion {
        self.call_with(pattern, payload, ActOptions::default()).await
    }

    pub async fn call_with(
        &self,
        pattern: impl IntoPattern,
        payload: Payload,
        options: ActOptions,
    ) -> Completion {
        self.await_call(pattern, payload, None, options).await
    }

    /// Dispatches without a callback. A failure here has no observer, so the node's
    /// [`FailurePolicy`] applies.
    pub fn fire(&self, pattern: impl IntoPattern, payload: Payload) {
        let this = self.clone();
        self.act_with(pattern, payload, None, ActOptions::default(), move |completion| {
            if let Err(err) = completion {
                this.unobserved(err);
            }
        })
    }

    pub(crate) async fn await_call(
        &self,
        pattern: impl IntoPattern,
        payload: Payload,
        parent: Option<CallId>,
        options: ActOptions,
    ) -> Completion {
        let (tx, rx) = oneshot::channel();
        self.act_with(pattern, payload, parent, options, move |completion| {
            let _ = tx.send(completion);
        });
        rx.await
            .unwrap_or_else(|_| Err(ActError::handler("dispatch task ended without completing")))
    }

    pub(crate) fn act_with<F>(
        &self,
        pattern: impl IntoPattern,
        payload: Payload,
        parent: Option<CallId>,
        options: ActOptions,
        callback: F,
    ) where
        F: FnOnce(Completion) + Send + 'static,
    {
        let pattern = match pattern.into_pattern() {
            Ok(pattern) => pattern,
            Err(e) => {
                let info = CallInfo::new(CallId::new(), parent, Pattern::default());
                warn!(call_id = %info.id, error = %e, "Rejected dispatch");
                let mut err = ActError::new(ErrorKind::NotFound, e.to_string());
                self.inner.tracker.stamp(&info, &mut err);
                callback(Err(err.clone()));
                self.inner.hooks.emit(&err, &info);
                return;
            }
        };
        let info = CallInfo::new(CallId::new(), parent, pattern);
        self.spawn_call(info, payload, options, Reach::Any, callback);
    }

    /// Serves a request that arrived over a transport, under the caller's call id.
    /// Only local handlers are considered.
    pub fn serve<F>(&self, request: TransportMessage, reply: F)
    where
        F: FnOnce(TransportReply) + Send + 'static,
    {
        let call_id = request.call_id;
        let options = ActOptions {
            timeout: request
                .budget_ms
                .map(|ms| self.inner.timeouts.effective(None).min(Duration::from_millis(ms))),
        };
        let info = CallInfo::new(call_id, request.parent, request.pattern);
        self.spawn_call(info, request.payload, options, Reach::LocalOnly, move |completion| {
            reply(TransportReply::from_completion(call_id, completion))
        });
    }

    fn spawn_call<F>(&self, info: CallInfo, payload: Payload, options: ActOptions, reach: Reach, callback: F)
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move {
            let completion = this.execute(info.clone(), payload, options, reach).await;
            let failed = completion.as_ref().err().cloned();
            callback(completion);
            if let Some(err) = failed {
                this.inner.hooks.emit(&err, &info);
            }
        });
    }

    async fn execute(&self, info: CallInfo, payload: Payload, options: ActOptions, reach: Reach) -> Completion {
        let mut call = Call::new(info.clone());
        self.inner.tracker.begin(&info);
        debug!(call_id = %info.id, pattern = %info.pattern, parent = ?info.parent.map(|p| p.to_string()), "Dispatch");

        let completion = match self.resolve(&info.pattern, reach) {
            Target::Local(handler) => self.run_local(handler, &info, payload, options).await,
            Target::Remote(transport) => self.run_remote(transport, &info, payload, options).await,
            Target::Missing => Err(ActError::not_found(&info.pattern)),
        };
        let completion = completion.map_err(|mut err| {
            self.inner.tracker.stamp(&info, &mut err);
            err
        });

        call.settle(&completion);
        self.inner.tracker.finish(info.id);

        let elapsed_ms = millis(info.started_at.elapsed());
        match call.state() {
            CallState::Failed(err) => {
                warn!(call_id = %info.id, pattern = %info.pattern, kind = %err.kind, error = %err.message, elapsed_ms, "Call failed")
            }
            _ => debug!(call_id = %info.id, pattern = %info.pattern, elapsed_ms, "Call ok"),
        }
        completion
    }

    fn resolve(&self, pattern: &Pattern, reach: Reach) -> Target {
        let local = self
            .inner
            .actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve(pattern)
            .map(|r| r.value.clone());
        if let Some(handler) = local {
            return Target::Local(handler);
        }
        if reach == Reach::LocalOnly {
            return Target::Missing;
        }
        self.inner
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve(pattern)
            .map(|r| Target::Remote(r.value.clone()))
            .unwrap_or(Target::Missing)
    }

    async fn run_local(
        &self,
        handler: Arc<dyn ActionHandler>,
        info: &CallInfo,
        payload: Payload,
        options: ActOptions,
    ) -> Completion {
        let timeout = self.inner.timeouts.effective(options.timeout);
        let deadline = deadline_after(timeout);
        let (done, settled) = Responder::channel(info.clone());
        let _timer = self.inner.timeouts.arm(done.clone(), timeout);

        let msg = Message {
            call: info.clone(),
            payload,
        };
        let ctx = ActContext {
            dispatcher: self.clone(),
            call: info.id,
            deadline,
        };
        let task = tokio::spawn({
            let done = done.clone();
            async move { handler.handle(msg, ctx, done).await }
        });

        // A panicking handler fails its call instead of leaving it to the timeout.
        let watcher = done;
        tokio::spawn(async move {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!(call_id = %watcher.call().id, pattern = %watcher.call().pattern, "Handler panicked");
                    watcher.fail(ActError::handler("handler panicked"));
                }
            }
        });

        settled
            .await
            .unwrap_or_else(|_| Err(ActError::handler("call dropped without completion")))
    }

    async fn run_remote(
        &self,
        transport: Arc<dyn Transport>,
        info: &CallInfo,
        payload: Payload,
        options: ActOptions,
    ) -> Completion {
        let timeout = self.inner.timeouts.effective(options.timeout);
        let (done, settled) = Responder::channel(info.clone());
        let _timer = self.inner.timeouts.arm(done.clone(), timeout);

        let request = TransportMessage {
            call_id: info.id,
            parent: info.parent,
            pattern: info.pattern.clone(),
            payload,
            budget_ms: Some(millis(timeout.saturating_sub(self.inner.timeouts.hop_margin()))),
        };
        let send = tokio::spawn(async move {
            let completion = match transport.send(request).await {
                Ok(reply) => reply.into_completion(),
                Err(fault) => {
                    warn!(peer = %transport.describe(), error = %fault, "Transport failed");
                    Err(ActError::from(fault))
                }
            };
            done.complete(completion);
        });

        let completion = settled
            .await
            .unwrap_or_else(|_| Err(ActError::transport("call dropped without completion")));
        // After a timeout the send is still parked on the peer; it holds the transport.
        send.abort();
        completion
    }

    fn unobserved(&self, err: ActError) {
        match self.inner.failure_policy {
            FailurePolicy::Undead => {
                warn!(kind = %err.kind, error = %err.message, "Unobserved failure ignored (undead)")
            }
            FailurePolicy::Shutdown => {
                error!(kind = %err.kind, error = %err.message, "Unobserved failure, closing node");
                self.inner.fatal.send_if_modified(|slot| {
                    if slot.is_none() {
                        *slot = Some(err);
                        true
                    } else {
                        false
                    }
                });
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("in_flight", &self.inner.tracker.in_flight())
            .field("hooks", &self.inner.hooks)
            .finish()
    }
}

/// Handed to every handler invocation. Calls made through it are children of the
/// current call and never outlive its deadline.
#[derive(Clone, Debug)]
pub struct ActContext {
    dispatcher: Dispatcher,
    call: CallId,
    deadline: Instant,
}

impl ActContext {
    /// The current call's id.
    pub fn call_id(&self) -> CallId {
        self.call
    }

    /// When the current call times out.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Dispatches a child call and awaits its completion.
    pub async fn call(&self, pattern: impl IntoPattern, payload: Payload) -> Completion {
        self.call_with(pattern, payload, ActOptions::default()).await
    }

    /// Like [`call`](Self::call); a requested timeout is still capped by the deadline.
    pub async fn call_with(&self, pattern: impl IntoPattern, payload: Payload, options: ActOptions) -> Completion {
        self.dispatcher
            .await_call(pattern, payload, Some(self.call), self.bounded(options))
            .await
    }

    /// Dispatches a child call and invokes `callback` with its completion.
    pub fn act<F>(&self, pattern: impl IntoPattern, payload: Payload, callback: F)
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        self.dispatcher
            .act_with(pattern, payload, Some(self.call), self.bounded(ActOptions::default()), callback)
    }

    fn bounded(&self, options: ActOptions) -> ActOptions {
        ActOptions::timeout(self.dispatcher.inner.timeouts.bounded(options.timeout, self.deadline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::reply;
    use crate::hooks::ErrorHooksBuilder;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(&Config::default().with_timeout(Duration::from_millis(200)), ErrorHooks::default())
    }

    /// A → B → C where C fails and A/B forward whatever they receive.
    fn forwarding_chain(d: &Dispatcher) {
        d.add("cmd:A", |_msg: Message, ctx: ActContext, done: Responder| async move {
            done.complete(ctx.call("cmd:B", json!({})).await);
        })
        .unwrap();
        d.add("cmd:B", |_msg: Message, ctx: ActContext, done: Responder| async move {
            done.complete(ctx.call("cmd:C", json!({})).await);
        })
        .unwrap();
        d.add("cmd:C", |_msg: Message, _ctx: ActContext, done: Responder| async move {
            done.fail(ActError::handler("test"));
        })
        .unwrap();
    }

    #[tokio::test]
    async fn forwarded_error_reaches_root_with_full_chain() {
        let d = dispatcher();
        forwarding_chain(&d);

        let err = d.call("cmd:A", json!({})).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Handler);
        assert_eq!(err.message, "test");
        assert_eq!(err.chain_labels(), vec!["C", "B", "A"]);
        assert_eq!(err.origin, Some(err.chain[0].call));
    }

    #[tokio::test]
    async fn ok_completion_extinguishes_child_error() {
        let d = dispatcher();
        d.add("cmd:A", |_msg: Message, ctx: ActContext, done: Responder| async move {
            let _ignored = ctx.call("cmd:B", json!({})).await;
            done.ok(json!({"chain": "A->recovered"}));
        })
        .unwrap();
        d.add("cmd:B", |_msg: Message, _ctx: ActContext, done: Responder| async move {
            done.fail(ActError::handler("test"));
        })
        .unwrap();

        let result = d.call("cmd:A", json!({})).await.unwrap();
        assert_eq!(result, json!({"chain": "A->recovered"}));
    }

    #[tokio::test]
    async fn missing_action_fails_immediately() {
        let d = Dispatcher::new(&Config::default().with_timeout(Duration::from_secs(30)), ErrorHooks::default());
        let started = std::time::Instant::now();

        let err = d.call("cmd:D", json!({})).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn silent_handler_times_out_and_late_completion_is_dropped() {
        let d = dispatcher();
        let (late_tx, late_rx) = oneshot::channel::<bool>();
        let late_tx = std::sync::Mutex::new(Some(late_tx));
        d.add("cmd:slow", move |_msg: Message, _ctx: ActContext, done: Responder| {
            let late_tx = late_tx.lock().unwrap().take();
            async move {
                tokio::time::sleep(Duration::from_millis(150)).await;
                let accepted = done.ok(json!("too late"));
                if let Some(tx) = late_tx {
                    let _ = tx.send(accepted);
                }
            }
        })
        .unwrap();

        let err = d
            .call_with("cmd:slow", json!({}), ActOptions::timeout(Duration::from_millis(30)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert_eq!(err.chain_labels(), vec!["slow"]);
        assert!(!late_rx.await.unwrap());
    }

    #[tokio::test]
    async fn innermost_hanging_call_times_out_first() {
        let d = dispatcher();
        d.add("cmd:A", |_msg: Message, ctx: ActContext, done: Responder| async move {
            done.complete(ctx.call("cmd:B", json!({})).await);
        })
        .unwrap();
        d.add("cmd:B", |_msg: Message, ctx: ActContext, done: Responder| async move {
            // Asks for more time than A has left; the deadline wins.
            done.complete(ctx.call_with("cmd:C", json!({}), ActOptions::timeout(Duration::from_secs(10))).await);
        })
        .unwrap();
        d.add("cmd:C", |_msg: Message, _ctx: ActContext, _done: Responder| async move {})
            .unwrap();

        let started = std::time::Instant::now();
        let err = d.call("cmd:A", json!({})).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(err.message.starts_with("cmd:C"), "{}", err.message);
        assert_eq!(err.chain_labels(), vec!["C", "B", "A"]);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn unparsable_pattern_reaches_callback_and_hooks() {
        let hooked = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = hooked.clone();
        let hooks = ErrorHooksBuilder::new()
            .on_error(move |err: &ActError, call: &CallInfo| {
                seen.lock().unwrap().push((err.kind, call.id));
            })
            .build();
        let d = Dispatcher::new(&Config::default(), hooks);

        let (tx, rx) = oneshot::channel();
        d.act("no-colon-here", json!({}), move |completion| {
            let _ = tx.send(completion);
        });
        let err = rx.await.unwrap().unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.chain.len(), 1);

        let hooked = hooked.lock().unwrap().clone();
        assert_eq!(hooked, vec![(ErrorKind::NotFound, err.chain[0].call)]);
    }

    #[tokio::test]
    async fn repeated_completion_is_ignored() {
        let d = dispatcher();
        d.add("cmd:twice", |_msg: Message, _ctx: ActContext, done: Responder| async move {
            done.fail(ActError::handler("first"));
            done.ok(json!("second"));
        })
        .unwrap();

        let err = d.call("cmd:twice", json!({})).await.unwrap_err();
        assert_eq!(err.message, "first");
    }

    #[tokio::test]
    async fn panicking_handler_fails_its_call() {
        let d = dispatcher();
        d.add("cmd:boom", |_msg: Message, _ctx: ActContext, _done: Responder| async move {
            panic!("handler bug");
        })
        .unwrap();

        let err = d.call("cmd:boom", json!({})).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Handler);
        assert_eq!(err.message, "handler panicked");
    }

    #[tokio::test]
    async fn hooks_fire_once_per_failed_call_after_callback() {
        let failures = Arc::new(AtomicUsize::new(0));
        let seen = failures.clone();
        let hooks = ErrorHooksBuilder::new()
            .on_error(move |_: &ActError, _: &CallInfo| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .build();
        let d = Dispatcher::new(&Config::default(), hooks);
        forwarding_chain(&d);

        let (tx, rx) = oneshot::channel();
        let counter = failures.clone();
        d.act("cmd:A", json!({}), move |completion| {
            // Hooks for A have not run yet when A's own callback runs.
            let _ = tx.send((completion.is_err(), counter.load(Ordering::SeqCst)));
        });
        let (failed, seen_in_callback) = rx.await.unwrap();
        assert!(failed);
        assert_eq!(seen_in_callback, 2, "C and B have completed, A has not been reported");

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(failures.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn reply_adapter_and_specific_match() {
        let d = dispatcher();
        d.add("cmd:*", reply(|_msg: Message, _ctx: ActContext| async move { Ok(json!("wild")) }))
            .unwrap();
        d.add("cmd:A", reply(|msg: Message, _ctx: ActContext| async move { Ok(msg.payload) }))
            .unwrap();

        assert_eq!(d.call("cmd:A", json!({"x": 1})).await.unwrap(), json!({"x": 1}));
        assert_eq!(d.call("cmd:Z", json!({})).await.unwrap(), json!("wild"));
    }

    #[tokio::test]
    async fn unobserved_failure_closes_node_unless_undead() {
        let d = dispatcher();
        let mut fatal = d.fatal();
        d.fire("cmd:nowhere", json!({}));
        fatal.changed().await.unwrap();
        assert_eq!(fatal.borrow().as_ref().unwrap().kind, ErrorKind::NotFound);

        let undead = Dispatcher::new(&Config::default().undead(), ErrorHooks::default());
        let fatal = undead.fatal();
        undead.fire("cmd:nowhere", json!({}));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(fatal.borrow().is_none());
    }
}
