//! # Node Lifecycle
//!
//! A [`Node`] is one process's dispatch machinery plus the network endpoints bound to it.
//! [`NodeBuilder`] collects everything that must be fixed before the node starts:
//!
//! 1. **Config** - timeouts, override policy, failure policy, frame limit
//! 2. **Error hooks** - frozen when the node is built
//! 3. **Plugins** - named groups of actions; the name becomes the registrations' owner
//! 4. **Listeners** - accept remote calls for the listed pins
//! 5. **Clients** - forward calls for the listed pins to a remote listener
//!
//! ```rust,ignore
//! let server = Node::builder()
//!     .plugin("chain", |p| {
//!         p.add("cmd:C", |_msg, _ctx, done: Responder| async move {
//!             done.fail(ActError::handler("test"));
//!         })
//!     })
//!     .listen("127.0.0.1:0", ["cmd:*"])
//!     .build()
//!     .await?;
//!
//! let client = Node::builder()
//!     .client(server.local_addr().unwrap().to_string(), ["cmd:*"])
//!     .build()
//!     .await?;
//!
//! let err = client.call("cmd:C", json!({})).await.unwrap_err();
//! ```
//!
//! An empty pin list on `listen` or `client` covers every pattern.
//!
//! ## Failure policy
//!
//! A failure that nobody observes (see [`Dispatcher::fire`]) is handled per
//! [`FailurePolicy`]. Under `Shutdown` the node closes: listeners stop accepting, every
//! action and route is dropped, and [`Node::closed`] resolves with the error. Under
//! `Undead` the failure is logged and the node keeps running.

use crate::config::{Config, FailurePolicy};
use crate::dispatcher::{ActOptions, Dispatcher};
use crate::error::{ActError, FrameworkError};
use crate::handler::ActionHandler;
use crate::hooks::{ErrorHooksBuilder, ErrorObserver};
use crate::message::{Completion, Payload};
use crate::pattern::{IntoPattern, Pattern};
use crate::transport::{Listener, TcpTransport, Transport};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

type PluginInit = Box<dyn FnOnce(&PluginScope<'_>) -> Result<(), FrameworkError> + Send>;

/// Registration surface handed to a plugin's init closure.
pub struct PluginScope<'a> {
    name: &'a str,
    dispatcher: &'a Dispatcher,
}

impl PluginScope<'_> {
    pub fn name(&self) -> &str {
        self.name
    }

    /// Registers a handler owned by this plugin.
    pub fn add(&self, pattern: impl IntoPattern, handler: impl ActionHandler) -> Result<(), FrameworkError> {
        self.dispatcher.add_owned(self.name, pattern, Arc::new(handler))
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        self.dispatcher
    }
}

enum ClientRoute {
    Tcp { addr: String, pins: Vec<Pattern> },
    Custom { pins: Vec<Pattern>, transport: Arc<dyn Transport> },
}

pub struct NodeBuilder {
    config: Config,
    hooks: ErrorHooksBuilder,
    plugins: Vec<(String, PluginInit)>,
    listens: Vec<(String, Vec<Pattern>)>,
    clients: Vec<ClientRoute>,
    // First setup error; reported by `build`.
    invalid: Option<FrameworkError>,
}

impl Default for NodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            hooks: ErrorHooksBuilder::new(),
            plugins: Vec::new(),
            listens: Vec::new(),
            clients: Vec::new(),
            invalid: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Adds a global error observer.
    pub fn on_error(mut self, observer: impl ErrorObserver) -> Self {
        self.hooks.push(Arc::new(observer));
        self
    }

    /// Adds a named plugin. `init` runs once during [`build`](Self::build).
    pub fn plugin<F>(mut self, name: impl Into<String>, init: F) -> Self
    where
        F: FnOnce(&PluginScope<'_>) -> Result<(), FrameworkError> + Send + 'static,
    {
        self.plugins.push((name.into(), Box::new(init)));
        self
    }

    /// Accepts remote calls matching `pins` on `addr`.
    pub fn listen<P: IntoPattern>(mut self, addr: impl Into<String>, pins: impl IntoIterator<Item = P>) -> Self {
        if let Some(pins) = self.parse_pins(pins) {
            self.listens.push((addr.into(), pins));
        }
        self
    }

    /// Forwards calls matching `pins` to the listener at `addr` when no local action matches.
    pub fn client<P: IntoPattern>(mut self, addr: impl Into<String>, pins: impl IntoIterator<Item = P>) -> Self {
        if let Some(pins) = self.parse_pins(pins) {
            self.clients.push(ClientRoute::Tcp {
                addr: addr.into(),
                pins,
            });
        }
        self
    }

    /// Like [`client`](Self::client) for any [`Transport`] implementation.
    pub fn client_transport<P: IntoPattern>(
        mut self,
        pins: impl IntoIterator<Item = P>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        if let Some(pins) = self.parse_pins(pins) {
            self.clients.push(ClientRoute::Custom { pins, transport });
        }
        self
    }

    fn parse_pins<P: IntoPattern>(&mut self, pins: impl IntoIterator<Item = P>) -> Option<Vec<Pattern>> {
        let parsed: Result<Vec<Pattern>, FrameworkError> = pins.into_iter().map(IntoPattern::into_pattern).collect();
        match parsed {
            Ok(pins) if pins.is_empty() => Some(vec![Pattern::default()]),
            Ok(pins) => Some(pins),
            Err(e) => {
                self.invalid.get_or_insert(e);
                None
            }
        }
    }

    /// Freezes hooks, runs plugins, binds listeners and starts clients.
    pub async fn build(self) -> Result<Node, FrameworkError> {
        if let Some(e) = self.invalid {
            return Err(e);
        }
        let dispatcher = Dispatcher::new(&self.config, self.hooks.build());

        for (name, init) in self.plugins {
            init(&PluginScope {
                name: &name,
                dispatcher: &dispatcher,
            })?;
            info!(plugin = %name, "Plugin loaded");
        }

        let mut tasks = Vec::new();
        for client in self.clients {
            match client {
                ClientRoute::Tcp { addr, pins } => {
                    let (actor, transport) = TcpTransport::new(addr, self.config.max_frame_bytes);
                    tasks.push(tokio::spawn(actor.run()));
                    dispatcher.route(&pins, Arc::new(transport))?;
                }
                ClientRoute::Custom { pins, transport } => dispatcher.route(&pins, transport)?,
            }
        }

        let mut listeners = Vec::with_capacity(self.listens.len());
        for (addr, pins) in self.listens {
            listeners.push(Listener::bind(&addr, pins, dispatcher.clone(), self.config.max_frame_bytes).await?);
        }
        let listeners: Arc<[Listener]> = listeners.into();

        let watcher = (self.config.failure_policy == FailurePolicy::Shutdown)
            .then(|| tokio::spawn(close_on_fatal(dispatcher.clone(), listeners.clone())));

        info!(
            actions = dispatcher.patterns().len(),
            listeners = listeners.len(),
            policy = ?self.config.failure_policy,
            "Node started"
        );
        Ok(Node {
            dispatcher,
            listeners,
            tasks,
            watcher,
        })
    }
}

async fn close_on_fatal(dispatcher: Dispatcher, listeners: Arc<[Listener]>) {
    let mut fatal = dispatcher.fatal();
    if fatal.wait_for(Option::is_some).await.is_err() {
        return;
    }
    error!("Closing node after unobserved failure");
    for listener in listeners.iter() {
        listener.close();
    }
    dispatcher.clear();
}

/// A running node. Cheap accessors delegate to its [`Dispatcher`].
pub struct Node {
    dispatcher: Dispatcher,
    listeners: Arc<[Listener]>,
    tasks: Vec<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl Node {
    pub fn builder() -> NodeBuilder {
        NodeBuilder::new()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Address of the first listener, if any.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listeners.first().map(Listener::local_addr)
    }

    pub fn listen_addrs(&self) -> Vec<SocketAddr> {
        self.listeners.iter().map(Listener::local_addr).collect()
    }

    pub fn act<F>(&self, pattern: impl IntoPattern, payload: Payload, callback: F)
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        self.dispatcher.act(pattern, payload, callback)
    }

    pub async fn call(&self, pattern: impl IntoPattern, payload: Payload) -> Completion {
        self.dispatcher.call(pattern, payload).await
    }

    pub async fn call_with(&self, pattern: impl IntoPattern, payload: Payload, options: ActOptions) -> Completion {
        self.dispatcher.call_with(pattern, payload, options).await
    }

    pub fn fire(&self, pattern: impl IntoPattern, payload: Payload) {
        self.dispatcher.fire(pattern, payload)
    }

    /// The error that closed this node, if it has been closed.
    pub fn close_reason(&self) -> Option<ActError> {
        let fatal = self.dispatcher.fatal();
        let reason = fatal.borrow().clone();
        reason
    }

    /// Resolves once an unobserved failure closes the node. Never resolves under
    /// [`FailurePolicy::Undead`].
    pub async fn closed(&self) -> ActError {
        let mut fatal = self.dispatcher.fatal();
        let reason = match fatal.wait_for(Option::is_some).await {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        match reason {
            Some(err) => err,
            // The sender lives as long as the dispatcher we hold.
            None => std::future::pending().await,
        }
    }

    /// Stops listeners and transport clients. Returns [`FrameworkError::NodeClosed`] if the
    /// node had already closed itself after an unobserved failure.
    pub async fn shutdown(self) -> Result<(), FrameworkError> {
        info!(in_flight = self.dispatcher.tracker().in_flight(), "Shutting down node");
        let already_closed = self.close_reason().is_some();

        if let Some(watcher) = self.watcher {
            watcher.abort();
        }
        for listener in self.listeners.iter() {
            listener.close();
        }
        // Dropping the routes drops the transport handles, which ends their connection actors.
        self.dispatcher.clear();
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Transport client task failed");
            }
        }

        info!("Node stopped");
        if already_closed {
            Err(FrameworkError::NodeClosed)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("dispatcher", &self.dispatcher)
            .field("listen_addrs", &self.listen_addrs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Responder;
    use crate::dispatcher::ActContext;
    use crate::error::ErrorKind;
    use crate::message::Message;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn plugin_registrations_are_owned_by_plugin() {
        let node = Node::builder()
            .plugin("math", |p| {
                p.add("role:math,cmd:sum", |msg: Message, _ctx: ActContext, done: Responder| async move {
                    let a = msg.payload["a"].as_i64().unwrap_or(0);
                    let b = msg.payload["b"].as_i64().unwrap_or(0);
                    done.ok(json!(a + b));
                })
            })
            .build()
            .await
            .unwrap();

        assert_eq!(node.call("role:math,cmd:sum", json!({"a": 2, "b": 3})).await.unwrap(), json!(5));
        assert_eq!(node.dispatcher().remove_owner("math"), 1);
        node.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_pin_fails_build() {
        let result = Node::builder().listen("127.0.0.1:0", ["not a pattern"]).build().await;
        assert!(matches!(result, Err(FrameworkError::InvalidPattern(_))));
    }

    #[tokio::test]
    async fn unobserved_failure_closes_node() {
        let node = Node::builder()
            .config(Config::default().with_timeout(Duration::from_millis(100)))
            .plugin("p", |p| {
                p.add("cmd:ok", |_msg: Message, _ctx: ActContext, done: Responder| async move {
                    done.ok(json!(true));
                })
            })
            .build()
            .await
            .unwrap();

        node.fire("cmd:missing", json!({}));
        let reason = tokio::time::timeout(Duration::from_secs(1), node.closed()).await.unwrap();
        assert_eq!(reason.kind, ErrorKind::NotFound);

        // Actions are dropped once the watcher has run.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(node.call("cmd:ok", json!({})).await.unwrap_err().kind, ErrorKind::NotFound);
        assert!(matches!(node.shutdown().await, Err(FrameworkError::NodeClosed)));
    }
}
