//! # TCP Client Transport
//!
//! Client half of the TCP transport, built the same way as every other actor here: a
//! cheap cloneable handle ([`TcpTransport`]) in front of a task that exclusively owns
//! the state ([`ConnectionActor`]).
//!
//! The actor owns the socket and a map of in-flight requests keyed by call id, so many
//! calls share one connection and replies may arrive in any order. It connects lazily
//! on the first request. When the connection breaks, every in-flight request fails with
//! a [`TransportFault`] and the next request reconnects.

use super::codec::{read_frame, write_frame};
use super::{Transport, TransportFault};
use crate::message::{CallId, TransportMessage, TransportReply};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

type ReplySender = oneshot::Sender<Result<TransportReply, TransportFault>>;

/// Message sent from the handle to the connection actor.
#[derive(Debug)]
pub struct ConnectionRequest {
    request: TransportMessage,
    respond_to: ReplySender,
}

/// Handle used by the dispatcher to reach a remote listener.
#[derive(Clone, Debug)]
pub struct TcpTransport {
    addr: String,
    sender: mpsc::Sender<ConnectionRequest>,
}

impl TcpTransport {
    /// Creates the connection actor and its handle. The actor must be spawned via `run()`.
    pub fn new(addr: impl Into<String>, max_frame_bytes: usize) -> (ConnectionActor, Self) {
        let addr = addr.into();
        let (sender, receiver) = mpsc::channel(64);
        let actor = ConnectionActor {
            addr: addr.clone(),
            receiver,
            pending: HashMap::new(),
            max_frame_bytes,
        };
        (actor, Self { addr, sender })
    }

    /// Creates the actor, spawns it, and returns the handle.
    pub fn spawn(addr: impl Into<String>, max_frame_bytes: usize) -> Self {
        let (actor, handle) = Self::new(addr, max_frame_bytes);
        tokio::spawn(actor.run());
        handle
    }
}

#[async_trait]
impl Transport for TcpTransport {
    #[instrument(skip(self, request), fields(addr = %self.addr, call_id = %request.call_id))]
    async fn send(&self, request: TransportMessage) -> Result<TransportReply, TransportFault> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ConnectionRequest {
                request,
                respond_to,
            })
            .await
            .map_err(|_| TransportFault::Closed)?;
        response.await.map_err(|_| TransportFault::Closed)?
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }
}

/// Owns the socket and the in-flight request table.
pub struct ConnectionActor {
    addr: String,
    receiver: mpsc::Receiver<ConnectionRequest>,
    pending: HashMap<CallId, ReplySender>,
    max_frame_bytes: usize,
}

enum SessionEnd {
    /// Connection lost; wait for the next request and reconnect.
    Disconnected,
    /// Every handle was dropped.
    Shutdown,
}

impl ConnectionActor {
    pub async fn run(mut self) {
        info!(addr = %self.addr, "Transport client started");

        while let Some(first) = self.receiver.recv().await {
            let stream = match TcpStream::connect(&self.addr).await {
                Ok(stream) => stream,
                Err(source) => {
                    warn!(addr = %self.addr, error = %source, "Connect failed");
                    let _ = first.respond_to.send(Err(TransportFault::Connect {
                        addr: self.addr.clone(),
                        source,
                    }));
                    continue;
                }
            };
            debug!(addr = %self.addr, "Connected");
            if let SessionEnd::Shutdown = self.session(stream, first).await {
                break;
            }
        }

        info!(addr = %self.addr, in_flight = self.pending.len(), "Transport client shutdown");
    }

    async fn session(&mut self, stream: TcpStream, first: ConnectionRequest) -> SessionEnd {
        let (mut reader, mut writer) = stream.into_split();
        let limit = self.max_frame_bytes;

        // Reads run on their own task: `read_exact` is not cancel-safe inside `select!`.
        let (reply_tx, mut reply_rx) = mpsc::channel::<Result<TransportReply, TransportFault>>(64);
        let read_task = tokio::spawn(async move {
            loop {
                match read_frame::<_, TransportReply>(&mut reader, limit).await {
                    Ok(Some(reply)) => {
                        if reply_tx.send(Ok(reply)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(fault) => {
                        let _ = reply_tx.send(Err(fault)).await;
                        break;
                    }
                }
            }
        });

        let end = if self.forward(&mut writer, first).await {
            self.pump(&mut writer, &mut reply_rx).await
        } else {
            SessionEnd::Disconnected
        };

        read_task.abort();
        self.fail_pending();
        end
    }

    async fn pump(
        &mut self,
        writer: &mut OwnedWriteHalf,
        replies: &mut mpsc::Receiver<Result<TransportReply, TransportFault>>,
    ) -> SessionEnd {
        loop {
            tokio::select! {
                request = self.receiver.recv() => match request {
                    Some(request) => {
                        if !self.forward(writer, request).await {
                            return SessionEnd::Disconnected;
                        }
                    }
                    None => return SessionEnd::Shutdown,
                },
                reply = replies.recv() => match reply {
                    Some(Ok(reply)) => self.deliver(reply),
                    Some(Err(fault)) => {
                        warn!(addr = %self.addr, error = %fault, "Connection read failed");
                        return SessionEnd::Disconnected;
                    }
                    None => {
                        debug!(addr = %self.addr, "Connection closed by peer");
                        return SessionEnd::Disconnected;
                    }
                },
            }
        }
    }

    /// Writes a request and parks its responder. Returns `false` if the socket broke.
    async fn forward(&mut self, writer: &mut OwnedWriteHalf, request: ConnectionRequest) -> bool {
        let call_id = request.request.call_id;
        match write_frame(writer, &request.request, self.max_frame_bytes).await {
            Ok(()) => {
                self.pending.insert(call_id, request.respond_to);
                true
            }
            Err(TransportFault::FrameTooLarge { size, limit }) => {
                // Only this request is bad; the connection is still usable.
                let _ = request
                    .respond_to
                    .send(Err(TransportFault::FrameTooLarge { size, limit }));
                true
            }
            Err(fault) => {
                warn!(addr = %self.addr, %call_id, error = %fault, "Write failed");
                let _ = request.respond_to.send(Err(fault));
                false
            }
        }
    }

    fn deliver(&mut self, reply: TransportReply) {
        match self.pending.remove(&reply.call_id) {
            Some(respond_to) => {
                let _ = respond_to.send(Ok(reply));
            }
            None => warn!(addr = %self.addr, call_id = %reply.call_id, "Reply for unknown call"),
        }
    }

    fn fail_pending(&mut self) {
        for (_, respond_to) in self.pending.drain() {
            let _ = respond_to.send(Err(TransportFault::Closed));
        }
    }
}
