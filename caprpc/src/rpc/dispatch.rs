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

//! Inbound message handling.
//!
//! Runs on the connection's reader task. Everything here is synchronous:
//! calls are handed to their own tasks and answered from there.

use crate::RpcError;
use crate::capability::{
    CallContext, Capability, ForwardingServer, ImportRef, Payload, Results, Server,
};
use crate::observability::log_error;
use crate::rpc::connection::ConnectionInner;
use crate::rpc::message::{
    CapDescriptor, Exception, ExceptionKind, Message, ReturnResult, WirePayload,
};
use crate::rpc::{ExportId, QuestionId};
use std::sync::Arc;

impl ConnectionInner {
    /// Handles one inbound message.
    ///
    /// An error means the peer broke the protocol in a way that cannot be
    /// pinned on a single call; the caller aborts the connection.
    pub(super) fn handle_message(self: &Arc<Self>, message: Message) -> Result<(), RpcError> {
        tracing::trace!(connection = %self.label, kind = message.kind(), "Message received");
        match message {
            Message::Bootstrap { question_id } => {
                self.handle_bootstrap(question_id);
                Ok(())
            }
            Message::Call {
                question_id,
                target,
                interface_id,
                method_id,
                params,
            } => {
                self.handle_call(question_id, target, interface_id, method_id, params);
                Ok(())
            }
            Message::Return { answer_id, result } => self.handle_return(answer_id, result),
            Message::Release {
                id,
                reference_count,
            } => self.handle_release(id, reference_count),
            Message::Abort { reason } => {
                self.shutdown(&format!("aborted by peer: {reason}"), false);
                Ok(())
            }
        }
    }

    fn handle_bootstrap(&self, question_id: QuestionId) {
        let bootstrap = self.bootstrap.lock().clone();
        match bootstrap {
            Some(capability) => {
                let payload = Payload::new().with_cap(capability);
                let results = self.export_payload(&payload);
                self.send_return(question_id, ReturnResult::Results(results));
                drop(payload);
                self.activate();
            }
            None => {
                tracing::warn!(
                    connection = %self.label,
                    question_id = question_id.as_u64(),
                    "Bootstrap requested but none is offered"
                );
                self.send_return(
                    question_id,
                    ReturnResult::Exception(Exception::new(
                        ExceptionKind::Unimplemented,
                        "no bootstrap capability is offered",
                    )),
                );
            }
        }
    }

    fn handle_call(
        self: &Arc<Self>,
        question_id: QuestionId,
        target: ExportId,
        interface_id: u64,
        method_id: u16,
        params: WirePayload,
    ) {
        self.metrics.record_call_received();
        self.activate();

        // Import first so capabilities the peer sent are counted (and later
        // released) even when the call itself is rejected.
        let params = match self.import_payload(params) {
            Ok(params) => params,
            Err(error) => {
                self.send_exception(question_id, &error);
                return;
            }
        };

        let server = self.caps.lock().get_export(target);
        let Some(server) = server else {
            tracing::warn!(
                connection = %self.label,
                question_id = question_id.as_u64(),
                export_id = target.as_u64(),
                "Call to unknown capability"
            );
            let error = RpcError::protocol(format!("unknown capability {}", target.as_u64()));
            self.send_exception(question_id, &error);
            return;
        };

        let connection = Arc::clone(self);
        tokio::spawn(async move {
            let mut context = CallContext::new(params);
            match server
                .dispatch_call(interface_id, method_id, &mut context)
                .await
            {
                Ok(()) => {
                    let results = context.into_results();
                    let wire = connection.export_payload(&results);
                    connection.send_return(question_id, ReturnResult::Results(wire));
                    drop(results);
                }
                Err(error) => {
                    tracing::debug!(
                        connection = %connection.label,
                        question_id = question_id.as_u64(),
                        interface_id,
                        method_id,
                        error = %error,
                        "Call failed"
                    );
                    connection.send_exception(question_id, &error);
                }
            }
        });
    }

    fn handle_return(
        self: &Arc<Self>,
        answer_id: QuestionId,
        result: ReturnResult,
    ) -> Result<(), RpcError> {
        let Some(question) = self.questions.complete(answer_id) else {
            return Err(RpcError::protocol(format!(
                "return for unknown question {}",
                answer_id.as_u64()
            )));
        };

        let outcome = match result {
            ReturnResult::Results(wire) => {
                self.metrics.record_return_received(false);
                self.import_payload(wire).map(Results::new)
            }
            ReturnResult::Exception(exception) => {
                self.metrics.record_return_received(true);
                Err(exception.into_error())
            }
        };
        if let Err(error) = &outcome {
            if error.is_protocol_error() {
                log_error(error);
            }
        }

        if question.is_bootstrap && outcome.is_ok() {
            self.activate();
        }
        question.resolver.resolve(outcome);
        Ok(())
    }

    fn handle_release(&self, id: ExportId, reference_count: u32) -> Result<(), RpcError> {
        self.metrics.record_release_received();
        let released = self.caps.lock().release_export(id, reference_count)?;
        if let Some(server) = released {
            tracing::debug!(connection = %self.label, export_id = id.as_u64(), "Export freed");
            drop(server);
        }
        Ok(())
    }

    /// Answers a question.
    ///
    /// Results that cannot be sent are replaced by an exception, so the
    /// caller hears about it and the connection carries on.
    pub(super) fn send_return(&self, answer_id: QuestionId, result: ReturnResult) {
        let exception = matches!(result, ReturnResult::Exception(_));
        let message = Message::Return { answer_id, result };
        match self.try_send(&message) {
            Ok(()) => self.metrics.record_return_sent(exception),
            Err(error) => {
                log_error(&error);
                self.metrics.record_error(&error);
                match &message {
                    Message::Return {
                        result: ReturnResult::Results(wire),
                        ..
                    } => {
                        self.unexport_payload(wire);
                        let what = if error.is_protocol_error() {
                            "results exceed frame limit"
                        } else {
                            "results could not be encoded"
                        };
                        let error = RpcError::protocol(format!("{what}: {}", error.reason()));
                        self.send_exception(answer_id, &error);
                    }
                    _ => self.shutdown(&error.to_string(), false),
                }
            }
        }
    }

    fn send_exception(&self, answer_id: QuestionId, error: &RpcError) {
        self.send_return(answer_id, ReturnResult::Exception(Exception::from(error)));
    }

    /// Describes `payload`'s capabilities for the peer, exporting local ones.
    ///
    /// `payload` must be kept alive until the message carrying the result has
    /// been queued: handing back one of the peer's own capabilities only works
    /// while we still hold it.
    pub(super) fn export_payload(&self, payload: &Payload) -> WirePayload {
        let cap_table = payload
            .caps()
            .iter()
            .map(|cap| self.export_cap(cap.as_ref()))
            .collect();
        WirePayload {
            content: payload.content().to_vec(),
            cap_table,
        }
    }

    /// Takes back the references [`export_payload`](Self::export_payload)
    /// added for a message that was never sent.
    pub(super) fn unexport_payload(&self, wire: &WirePayload) {
        let mut freed = Vec::new();
        {
            let mut caps = self.caps.lock();
            for descriptor in &wire.cap_table {
                if let CapDescriptor::SenderHosted(id) = descriptor {
                    if let Ok(Some(server)) = caps.release_export(*id, 1) {
                        freed.push(server);
                    }
                }
            }
        }
        drop(freed);
    }

    fn export_cap(&self, cap: Option<&Capability>) -> CapDescriptor {
        match cap {
            None => CapDescriptor::None,
            Some(Capability::Local(server)) => {
                CapDescriptor::SenderHosted(self.caps.lock().export(Arc::clone(server)))
            }
            Some(Capability::Import(import)) if import.belongs_to(self) => {
                CapDescriptor::ReceiverHosted(import.id().remote())
            }
            Some(Capability::Promise(promise_cap)) => match promise_cap.target() {
                Some(target) => self.export_cap(Some(&target)),
                None => self.export_forwarder(Capability::Promise(Arc::clone(promise_cap))),
            },
            Some(other) => self.export_forwarder(other.clone()),
        }
    }

    /// Exports a local stand-in that relays calls to `target`.
    fn export_forwarder(&self, target: Capability) -> CapDescriptor {
        let forward: Arc<dyn Server> = Arc::new(ForwardingServer::new(target));
        CapDescriptor::SenderHosted(self.caps.lock().export(forward))
    }

    /// Turns received descriptors into capabilities.
    ///
    /// Every descriptor is processed even if one is invalid, so the peer's
    /// reference counts stay balanced; the imported handles are then dropped,
    /// which releases them.
    pub(super) fn import_payload(self: &Arc<Self>, wire: WirePayload) -> Result<Payload, RpcError> {
        let mut caps = Vec::with_capacity(wire.cap_table.len());
        let mut failure = None;

        for descriptor in wire.cap_table {
            let cap = match descriptor {
                CapDescriptor::None => None,
                CapDescriptor::SenderHosted(id) => {
                    let import = self.caps.lock().import(id);
                    Some(Capability::Import(ImportRef::new(import, Arc::downgrade(self))))
                }
                CapDescriptor::ReceiverHosted(id) => {
                    let server = self.caps.lock().get_export(id);
                    match server {
                        Some(server) => Some(Capability::Local(server)),
                        None => {
                            failure.get_or_insert_with(|| {
                                RpcError::protocol(format!("unknown capability {}", id.as_u64()))
                            });
                            None
                        }
                    }
                }
            };
            caps.push(cap);
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(Payload::from_parts(wire.content, caps)),
        }
    }
}
