//! # TCP Listener
//!
//! Server half of the TCP transport. Each accepted connection gets a reader loop and a
//! writer task; requests are served concurrently and replies are written in completion
//! order, matched by call id on the client side.
//!
//! A request whose pattern falls outside the listener's pins is answered with `NotFound`
//! without touching the dispatcher. Accepted requests are dispatched to local handlers
//! only, under the caller's call id, so the chain recorded on this side joins up with
//! the caller's.

use super::codec::{read_frame, write_frame};
use crate::dispatcher::Dispatcher;
use crate::error::{ActError, FrameworkError};
use crate::message::{TransportMessage, TransportReply};
use crate::pattern::Pattern;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Listener {
    local_addr: SocketAddr,
    accept_task: JoinHandle<()>,
}

impl Listener {
    /// Binds `addr` and starts accepting. Use port `0` for an ephemeral port and read it
    /// back with [`local_addr`](Self::local_addr).
    pub async fn bind(
        addr: &str,
        pins: Vec<Pattern>,
        dispatcher: Dispatcher,
        max_frame_bytes: usize,
    ) -> Result<Self, FrameworkError> {
        let socket = TcpListener::bind(addr)
            .await
            .map_err(|source| FrameworkError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = socket.local_addr().map_err(|source| FrameworkError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let pins: Arc<[Pattern]> = pins.into();
        info!(%local_addr, pins = ?pins.iter().map(ToString::to_string).collect::<Vec<_>>(), "Listening");

        let accept_task = tokio::spawn(accept_loop(
            socket,
            pins,
            dispatcher,
            max_frame_bytes,
        ));
        Ok(Self {
            local_addr,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting and drops every open connection.
    pub fn close(&self) {
        self.accept_task.abort();
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn accept_loop(
    socket: TcpListener,
    pins: Arc<[Pattern]>,
    dispatcher: Dispatcher,
    max_frame_bytes: usize,
) {
    // Dropping the set (when this task is aborted) aborts every connection task.
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = socket.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "Connection accepted");
                    connections.spawn(serve_connection(
                        stream,
                        peer,
                        pins.clone(),
                        dispatcher.clone(),
                        max_frame_bytes,
                    ));
                }
                Err(e) => warn!(error = %e, "Accept failed"),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    pins: Arc<[Pattern]>,
    dispatcher: Dispatcher,
    max_frame_bytes: usize,
) {
    let (mut reader, mut writer) = stream.into_split();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<TransportReply>();

    let write_task = tokio::spawn(async move {
        while let Some(reply) = reply_rx.recv().await {
            if let Err(fault) = write_frame(&mut writer, &reply, max_frame_bytes).await {
                warn!(%peer, call_id = %reply.call_id, error = %fault, "Reply write failed");
                if !matches!(fault, super::TransportFault::FrameTooLarge { .. }) {
                    break;
                }
                let fallback = TransportReply::from_completion(reply.call_id, Err(ActError::from(fault)));
                if write_frame(&mut writer, &fallback, max_frame_bytes).await.is_err() {
                    break;
                }
            }
        }
    });

    loop {
        match read_frame::<_, TransportMessage>(&mut reader, max_frame_bytes).await {
            Ok(Some(request)) => {
                let accepted = pins.iter().any(|pin| pin.matches(&request.pattern).is_some());
                if !accepted {
                    debug!(%peer, pattern = %request.pattern, "Request outside pins");
                    let mut err = ActError::not_found(&request.pattern);
                    err.stamp(request.call_id, &request.pattern);
                    let _ = reply_tx.send(TransportReply::from_completion(request.call_id, Err(err)));
                    continue;
                }
                let tx = reply_tx.clone();
                dispatcher.serve(request, move |reply| {
                    let _ = tx.send(reply);
                });
            }
            Ok(None) => {
                debug!(%peer, "Connection closed");
                break;
            }
            Err(fault) => {
                warn!(%peer, error = %fault, "Dropping connection");
                break;
            }
        }
    }

    // Let in-flight calls finish writing their replies.
    drop(reply_tx);
    let _ = write_task.await;
}
