//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! One RPC session over one transport.
//!
//! A connection runs two tasks:
//!
//! - the **reader** decodes inbound frames and hands each message to the
//!   dispatcher (`dispatch.rs`); calls it receives are run on their own tasks;
//! - the **writer** drains an unbounded queue of encoded frames, so any
//!   thread (including `Drop` impls releasing capabilities) can send without
//!   awaiting and writes never interleave.
//!
//! Messages are encoded and checked against `max_frame_size` before they are
//! queued. A call or result that does not fit fails on its own; only a
//! failed write ends the connection.
//!
//! The capability table and question table each sit behind their own
//! `parking_lot` mutex. Neither lock is ever held across an `.await` or while
//! a capability or implementation is being dropped.

use crate::RpcError;
use crate::capability::{CapTable, Capability, Payload, Promise};
use crate::observability::{ConnectionMetrics, log_error};
use crate::rpc::message::Message;
use crate::rpc::questions::QuestionTable;
use crate::rpc::{ConnectionConfig, ConnectionState, ImportId};
use crate::serialization::{Serializer, WireFormat};
use crate::transport::{
    MessageReceiver, MessageSender, Transport, TransportId, TransportMetadata,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub(super) enum Outbound {
    Frame { kind: &'static str, body: Vec<u8> },
    Shutdown,
}

/// Shared state of a connection. Import handles refer to it weakly.
pub(crate) struct ConnectionInner {
    pub(super) label: String,
    pub(super) metadata: TransportMetadata,
    pub(super) outbound: mpsc::UnboundedSender<Outbound>,
    pub(super) caps: Mutex<CapTable>,
    pub(super) questions: QuestionTable,
    pub(super) bootstrap: Mutex<Option<Capability>>,
    pub(super) metrics: ConnectionMetrics,
    format: WireFormat,
    max_frame_size: usize,
    state: watch::Sender<ConnectionState>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

/// Table sizes and state of a connection at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Lifecycle state
    pub state: ConnectionState,
    /// Capabilities the peer holds on us
    pub exports: usize,
    /// Capabilities we hold on the peer
    pub imports: usize,
    /// Calls awaiting a `Return`
    pub questions: usize,
}

/// A bidirectional capability RPC session.
///
/// Either side may call the other: each offers an optional bootstrap
/// capability through [`ConnectionConfig::bootstrap`] and obtains the peer's
/// with [`bootstrap`](Self::bootstrap).
///
/// Dropping the handle does not close the session; it keeps running until
/// [`close`](Self::close) is called, the peer disconnects, or a fatal error
/// occurs.
///
/// # Examples
///
/// ```rust
/// use caprpc::arith::{ArithClient, ArithServer, ArithService};
/// use caprpc::rpc::{Connection, ConnectionConfig};
/// use caprpc::transport::MemoryTransport;
///
/// # async fn example() -> Result<(), caprpc::RpcError> {
/// let (client_side, server_side) = MemoryTransport::pair_default();
/// let _server = Connection::new(
///     server_side,
///     ConnectionConfig::new().with_bootstrap_server(ArithServer::new(ArithService)),
/// )?;
/// let client = Connection::new(client_side, ConnectionConfig::new())?;
///
/// let arith = ArithClient::new(client.bootstrap());
/// assert_eq!(arith.multiply(2, 32).wait().await?.product, 64);
/// client.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Starts a session over `transport`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::InvalidConfiguration`] if `config` does not
    /// validate.
    pub fn new<T>(transport: T, config: ConnectionConfig) -> Result<Self, RpcError>
    where
        T: Transport,
    {
        config.validate()?;

        let metadata = transport.metadata().clone();
        let label = config
            .name
            .clone()
            .unwrap_or_else(|| metadata.id.to_string());
        let (read_half, write_half) = transport.split();
        let sender = MessageSender::new(write_half, config.format.clone(), config.max_frame_size);
        let receiver =
            MessageReceiver::new(read_half, config.format.clone(), config.max_frame_size);

        let (outbound, queue) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let inner = Arc::new(ConnectionInner {
            label,
            metadata,
            outbound,
            caps: Mutex::new(CapTable::new()),
            questions: QuestionTable::new(),
            bootstrap: Mutex::new(config.bootstrap),
            metrics: ConnectionMetrics::new(),
            format: config.format,
            max_frame_size: config.max_frame_size,
            state,
            reader: Mutex::new(None),
        });

        tokio::spawn(run_writer(sender, queue, Arc::downgrade(&inner)));
        let reader = tokio::spawn(run_reader(receiver, Arc::clone(&inner)));
        *inner.reader.lock() = Some(reader);

        tracing::debug!(
            connection = %inner.label,
            transport_id = %inner.metadata.id,
            kind = %inner.metadata.kind,
            peer_addr = ?inner.metadata.peer_addr,
            "Connection started"
        );
        Ok(Self { inner })
    }

    /// Asks the peer for its bootstrap capability.
    ///
    /// Returns immediately with a promise capability: calls made on it are
    /// queued and sent once the peer answers.
    pub fn bootstrap(&self) -> Capability {
        match self.inner.questions.register(true) {
            Ok((question_id, promise)) => {
                self.inner.send(Message::Bootstrap { question_id });
                promise.pipeline(0)
            }
            Err(error) => Capability::Broken(error),
        }
    }

    /// Closes the session and waits until it is fully torn down.
    ///
    /// Outstanding calls resolve with [`RpcError::Disconnected`]. Calling
    /// this more than once is harmless.
    pub async fn close(&self) {
        self.inner.shutdown("connection closed locally", true);
        self.done().await;
    }

    /// Waits until the session reaches [`ConnectionState::Closed`].
    pub async fn done(&self) {
        let mut state = self.inner.state.subscribe();
        let _ = state
            .wait_for(|state| *state == ConnectionState::Closed)
            .await;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Table sizes and state.
    pub fn stats(&self) -> ConnectionStats {
        let (exports, imports) = {
            let caps = self.inner.caps.lock();
            (caps.export_count(), caps.import_count())
        };
        ConnectionStats {
            state: self.inner.state(),
            exports,
            imports,
            questions: self.inner.questions.len(),
        }
    }

    /// Message and byte counters.
    pub fn metrics(&self) -> &ConnectionMetrics {
        &self.inner.metrics
    }

    /// Label used in logs: the configured name or the transport id.
    pub fn name(&self) -> &str {
        &self.inner.label
    }

    /// Id of the underlying transport.
    pub fn id(&self) -> TransportId {
        self.inner.metadata.id
    }

    /// Metadata of the underlying transport.
    pub fn metadata(&self) -> &TransportMetadata {
        &self.inner.metadata
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.inner.label)
            .field("state", &self.inner.state())
            .finish()
    }
}

impl ConnectionInner {
    pub(super) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Queues a message for the writer task.
    ///
    /// A message that cannot be encoded ends the connection. Use
    /// [`try_send`](Self::try_send) where the failure belongs to one call.
    pub(super) fn send(&self, message: Message) {
        if let Err(error) = self.try_send(&message) {
            log_error(&error);
            self.metrics.record_error(&error);
            self.shutdown(&error.to_string(), false);
        }
    }

    /// Encodes `message` and queues it for the writer task.
    ///
    /// The stream is untouched on failure.
    ///
    /// # Errors
    ///
    /// [`RpcError::Serialization`] if the message cannot be encoded, or
    /// [`RpcError::Protocol`] if the encoded frame is over `max_frame_size`.
    pub(super) fn try_send(&self, message: &Message) -> Result<(), RpcError> {
        let kind = message.kind();
        let body = self.format.serialize(message)?;
        if body.len() > self.max_frame_size {
            return Err(RpcError::protocol(format!(
                "{kind} of {} bytes exceeds the {} byte frame limit",
                body.len(),
                self.max_frame_size
            )));
        }
        if self.outbound.send(Outbound::Frame { kind, body }).is_err() {
            tracing::trace!(connection = %self.label, kind, "Writer gone, message dropped");
        }
        Ok(())
    }

    pub(crate) fn send_call(
        &self,
        target: ImportId,
        interface_id: u64,
        method_id: u16,
        params: Payload,
    ) -> Promise {
        let (question_id, promise) = match self.questions.register(false) {
            Ok(question) => question,
            Err(error) => return Promise::from_error(error),
        };

        let call = Message::Call {
            question_id,
            target: target.remote(),
            interface_id,
            method_id,
            params: self.export_payload(&params),
        };
        if let Err(error) = self.try_send(&call) {
            tracing::debug!(
                connection = %self.label,
                question_id = question_id.as_u64(),
                interface_id,
                method_id,
                error = %error,
                "Call rejected before sending"
            );
            self.metrics.record_error(&error);
            if let Message::Call { params: wire, .. } = &call {
                self.unexport_payload(wire);
            }
            if let Some(question) = self.questions.complete(question_id) {
                question.resolver.resolve(Err(error));
            }
            return promise;
        }
        self.metrics.record_call_sent();
        tracing::trace!(
            connection = %self.label,
            question_id = question_id.as_u64(),
            import_id = target.as_u64(),
            interface_id,
            method_id,
            "Call sent"
        );

        // Capabilities handed back to the peer must outlive the queued message.
        drop(params);
        promise
    }

    pub(crate) fn retain_import(&self, id: ImportId) {
        self.caps.lock().retain_import(id);
    }

    pub(crate) fn release_import(&self, id: ImportId) {
        let released = self.caps.lock().release_import(id);
        if let Some(reference_count) = released {
            tracing::trace!(
                connection = %self.label,
                import_id = id.as_u64(),
                reference_count,
                "Import released"
            );
            self.send(Message::Release {
                id: id.remote(),
                reference_count,
            });
            self.metrics.record_release_sent();
        }
    }

    /// Moves `Connecting` to `Active`; a no-op in every other state.
    pub(super) fn activate(&self) {
        let activated = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Active;
                true
            } else {
                false
            }
        });
        if activated {
            tracing::info!(connection = %self.label, "Connection active");
        }
    }

    /// Begins shutdown. Only the first call has any effect.
    ///
    /// Resolves every outstanding question with [`RpcError::Disconnected`],
    /// drops every export and the bootstrap capability, and tells the writer
    /// to shut the transport down, which completes the move to `Closed`.
    pub(super) fn shutdown(&self, reason: &str, notify_peer: bool) {
        let started = self.state.send_if_modified(|state| {
            if state.is_open() {
                *state = ConnectionState::Closing;
                true
            } else {
                false
            }
        });
        if !started {
            return;
        }
        tracing::info!(connection = %self.label, reason, "Connection closing");

        if notify_peer {
            self.send(Message::Abort {
                reason: reason.to_string(),
            });
        }
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }

        let error = RpcError::disconnected(reason);
        let questions = self.questions.drain();
        if !questions.is_empty() {
            tracing::debug!(
                connection = %self.label,
                questions = questions.len(),
                "Failing outstanding questions"
            );
        }
        for question in questions {
            question.resolver.resolve(Err(error.clone()));
        }

        let exports = self.caps.lock().clear();
        let bootstrap = self.bootstrap.lock().take();
        drop(exports);
        drop(bootstrap);

        if self.outbound.send(Outbound::Shutdown).is_err() {
            self.mark_closed();
        }
    }

    fn mark_closed(&self) {
        let closed = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Closing {
                *state = ConnectionState::Closed;
                true
            } else {
                false
            }
        });
        if closed {
            tracing::info!(connection = %self.label, "Connection closed");
        }
    }
}

async fn run_reader(mut receiver: MessageReceiver, inner: Arc<ConnectionInner>) {
    loop {
        match receiver.receive::<Message>().await {
            Ok(Some((message, bytes))) => {
                inner.metrics.record_bytes_received(bytes);
                if let Err(error) = inner.handle_message(message) {
                    log_error(&error);
                    inner.metrics.record_error(&error);
                    inner.shutdown(&error.to_string(), true);
                }
                if inner.state().is_shutting_down() {
                    break;
                }
            }
            Ok(None) => {
                inner.shutdown("peer closed the connection", false);
                break;
            }
            Err(error) => {
                log_error(&error);
                inner.metrics.record_error(&error);
                // A frame that arrived but could not be decoded is the peer's
                // fault; tell it before hanging up.
                inner.shutdown(&error.to_string(), !error.is_transport_error());
                break;
            }
        }
    }
    tracing::debug!(connection = %inner.label, "Reader stopped");
}

async fn run_writer(
    mut sender: MessageSender,
    mut queue: mpsc::UnboundedReceiver<Outbound>,
    inner: Weak<ConnectionInner>,
) {
    while let Some(outbound) = queue.recv().await {
        let (kind, body) = match outbound {
            Outbound::Frame { kind, body } => (kind, body),
            Outbound::Shutdown => break,
        };
        match sender.send_frame(&body).await {
            Ok(bytes) => {
                if let Some(inner) = inner.upgrade() {
                    inner.metrics.record_bytes_sent(bytes);
                }
            }
            Err(error) => {
                log_error(&error);
                if let Some(inner) = inner.upgrade() {
                    tracing::debug!(connection = %inner.label, kind, "Write failed");
                    inner.metrics.record_error(&error);
                    inner.shutdown(&error.to_string(), false);
                }
                break;
            }
        }
    }

    if let Err(error) = sender.close().await {
        tracing::debug!(error = %error, "Transport shutdown failed");
    }
    if let Some(inner) = inner.upgrade() {
        inner.mark_closed();
        tracing::debug!(connection = %inner.label, "Writer stopped");
    }
}
