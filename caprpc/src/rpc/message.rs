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

//! Protocol messages exchanged between two connected peers.
//!
//! Every frame on the transport carries exactly one [`Message`]. Capability
//! ids inside a message are named from the host's point of view; see
//! [`CapDescriptor`] for how a capability travels inside a payload.

use crate::RpcError;
use crate::rpc::id::{ExportId, QuestionId};
use serde::{Deserialize, Serialize};

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Asks the receiver for its bootstrap capability.
    Bootstrap {
        /// Question the `Return` will answer
        question_id: QuestionId,
    },

    /// Invokes a method on a capability hosted by the receiver.
    Call {
        /// Question the `Return` will answer
        question_id: QuestionId,
        /// The receiver's export being called
        target: ExportId,
        /// Interface the method belongs to
        interface_id: u64,
        /// Method ordinal within the interface
        method_id: u16,
        /// Encoded parameters
        params: WirePayload,
    },

    /// Answers a `Call` or `Bootstrap`.
    Return {
        /// The question being answered
        answer_id: QuestionId,
        /// Results or exception
        result: ReturnResult,
    },

    /// Drops references the sender held on one of the receiver's exports.
    Release {
        /// The receiver's export
        id: ExportId,
        /// How many references to drop
        reference_count: u32,
    },

    /// The sender is closing the connection.
    Abort {
        /// Human-readable reason
        reason: String,
    },
}

impl Message {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Bootstrap { .. } => "bootstrap",
            Message::Call { .. } => "call",
            Message::Return { .. } => "return",
            Message::Release { .. } => "release",
            Message::Abort { .. } => "abort",
        }
    }
}

/// Outcome carried by a `Return`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnResult {
    /// The call completed.
    Results(WirePayload),
    /// The call failed.
    Exception(Exception),
}

/// Encoded content plus the capabilities it references.
///
/// `content` is postcard-encoded regardless of the connection's wire format;
/// capabilities referenced by the content are addressed by their index in
/// `cap_table`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePayload {
    /// Encoded parameter or result struct
    pub content: Vec<u8>,
    /// Capabilities carried alongside the content
    pub cap_table: Vec<CapDescriptor>,
}

/// How one capability is carried inside a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapDescriptor {
    /// Empty slot.
    None,
    /// Hosted by the sender of the message; the receiver imports it.
    SenderHosted(ExportId),
    /// Hosted by the receiver of the message; it was previously imported by
    /// the sender and is being handed back.
    ReceiverHosted(ExportId),
}

/// Failure category carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExceptionKind {
    /// The implementation reported a failure.
    Failed,
    /// The caller violated the protocol.
    Protocol,
    /// The target does not implement the method.
    Unimplemented,
    /// The callee lost a connection it needed to answer.
    Disconnected,
}

/// Per-call failure carried by a `Return`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
    /// Failure category
    pub kind: ExceptionKind,
    /// Human-readable description
    pub reason: String,
}

impl Exception {
    /// Creates an exception.
    pub fn new(kind: ExceptionKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    /// Converts the exception into the error the caller observes.
    pub fn into_error(self) -> RpcError {
        match self.kind {
            ExceptionKind::Failed => RpcError::application(self.reason),
            ExceptionKind::Protocol => RpcError::protocol(self.reason),
            ExceptionKind::Unimplemented => RpcError::unimplemented(self.reason),
            ExceptionKind::Disconnected => RpcError::disconnected(self.reason),
        }
    }
}

impl From<&RpcError> for Exception {
    fn from(error: &RpcError) -> Self {
        let kind = match error {
            RpcError::Application { .. }
            | RpcError::Serialization(_)
            | RpcError::Deserialization(_)
            | RpcError::InvalidConfiguration { .. } => ExceptionKind::Failed,
            RpcError::Protocol { .. } => ExceptionKind::Protocol,
            RpcError::Unimplemented { .. } => ExceptionKind::Unimplemented,
            RpcError::Transport(_) | RpcError::Disconnected { .. } => ExceptionKind::Disconnected,
        };
        Exception::new(kind, error.reason())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::{PostcardSerializer, Serializer};

    #[test]
    fn test_application_error_crosses_the_wire() {
        let exception = Exception::from(&RpcError::application("divide by zero"));
        assert_eq!(exception.kind, ExceptionKind::Failed);
        assert_eq!(exception.reason, "divide by zero");

        let error = exception.into_error();
        assert!(error.is_application_error());
        assert_eq!(error.reason(), "divide by zero");
    }

    #[test]
    fn test_unimplemented_keeps_kind() {
        let error = Exception::from(&RpcError::unimplemented("method 9")).into_error();
        assert!(matches!(error, RpcError::Unimplemented { .. }));
    }

    #[test]
    fn test_call_message_encodes() {
        let message = Message::Call {
            question_id: QuestionId::new(1),
            target: ExportId::new(1),
            interface_id: 0x9a5c_1b6e_4d27_f3a1,
            method_id: 0,
            params: WirePayload {
                content: vec![4, 64],
                cap_table: vec![CapDescriptor::None, CapDescriptor::SenderHosted(ExportId::new(2))],
            },
        };
        let serializer = PostcardSerializer::default();
        let bytes = serializer.serialize(&message).unwrap();
        let decoded: Message = serializer.deserialize(&bytes).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoded.kind(), "call");
    }
}
