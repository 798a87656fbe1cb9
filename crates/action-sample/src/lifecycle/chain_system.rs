use crate::observe::ErrorLog;
use crate::plugins;
use crate::scenario::Scenario;
use action_framework::{Completion, Config, FrameworkError, Node};
use serde_json::json;
use tracing::info;

/// Address the server node binds. Port 0 picks a free port per system.
pub const LISTEN_ADDR: &str = "127.0.0.1:0";

/// A listening server node hosting the chain plugins and a client node that reaches it
/// over TCP.
///
/// Both nodes share one config. The client's call ships its remaining budget to the
/// server, so a timeout raised inside the server arrives at the client as data before
/// the client's own timer fires.
///
/// # Example
///
/// ```ignore
/// let system = ChainSystem::start(Scenario::ForwardedError, Config::default()).await?;
/// let completion = system.run().await;
/// system.shutdown().await?;
/// ```
pub struct ChainSystem {
    pub scenario: Scenario,
    pub server: Node,
    pub client: Node,
    pub log: ErrorLog,
}

impl ChainSystem {
    pub async fn start(scenario: Scenario, config: Config) -> Result<Self, FrameworkError> {
        let log = ErrorLog::new();
        let (a, b, c) = scenario.wiring();

        let server = Node::builder()
            .config(config.clone())
            .plugin("A", plugins::a(a, log.clone()))
            .plugin("B", plugins::b(b, log.clone()))
            .plugin("C", plugins::c(c))
            .on_error(log.hook("server"))
            .listen(LISTEN_ADDR, ["cmd:*"])
            .build()
            .await?;
        let addr = server.local_addr().ok_or(FrameworkError::NodeClosed)?;

        let client = Node::builder()
            .config(config)
            .on_error(log.hook("client"))
            .client(addr.to_string(), ["cmd:*"])
            .build()
            .await?;

        info!(%scenario, %addr, "Chain system started");
        Ok(Self {
            scenario,
            server,
            client,
            log,
        })
    }

    /// Calls `cmd:A` from the client node.
    pub async fn run(&self) -> Completion {
        self.client.call("cmd:A", json!({})).await
    }

    /// Client first, so no new calls reach the server while it stops.
    pub async fn shutdown(self) -> Result<(), FrameworkError> {
        info!(scenario = %self.scenario, "Shutting down chain system...");
        self.client.shutdown().await?;
        self.server.shutdown().await?;
        info!(scenario = %self.scenario, "Chain system stopped");
        Ok(())
    }
}
