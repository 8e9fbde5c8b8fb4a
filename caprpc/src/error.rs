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

//! Top-level error type for caprpc.
//!
//! [`RpcError`] is what every promise resolves to on failure and what every
//! fallible public operation returns. It distinguishes three classes, each
//! with its own handling policy:
//!
//! 1. **Connection-fatal** ([`RpcError::Transport`], [`RpcError::Disconnected`]):
//!    the stream is gone; every outstanding promise on the connection resolves
//!    with `Disconnected` and no further calls are possible.
//! 2. **Protocol** ([`RpcError::Protocol`], [`RpcError::Unimplemented`], the
//!    codec variants): reported on the single call they belong to when they can
//!    be attributed to one, otherwise they abort the connection.
//! 3. **Application** ([`RpcError::Application`]): a domain failure raised by a
//!    capability implementation (e.g. division by zero). Carried back in the
//!    `Return` for that call only; the connection is unaffected.
//!
//! The RPC layer never retries; callers decide.
//!
//! ```rust
//! use caprpc::RpcError;
//!
//! let error = RpcError::application("divide by zero");
//! assert!(error.is_application_error());
//! assert!(!error.should_close_connection());
//! assert_eq!(error.to_string(), "application error: divide by zero");
//! ```

use crate::serialization::{DeserializationError, SerializationError};
use crate::transport::TransportError;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by connections, capabilities and promises.
///
/// Cloneable so that one outcome can be observed by several waiters (the
/// caller plus any capabilities pipelined on the same result).
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// The underlying stream failed.
    #[error("transport error: {0}")]
    Transport(#[source] Arc<TransportError>),

    /// The connection was closed or aborted before the call completed.
    #[error("disconnected: {reason}")]
    Disconnected {
        /// Why the connection went away
        reason: String,
    },

    /// The peer violated the protocol (unknown capability, bad release, ...).
    #[error("protocol error: {reason}")]
    Protocol {
        /// Description of the violation
        reason: String,
    },

    /// The target does not implement the requested interface or method.
    #[error("unimplemented: {reason}")]
    Unimplemented {
        /// Which interface/method was missing
        reason: String,
    },

    /// A capability implementation reported a domain failure.
    #[error("application error: {reason}")]
    Application {
        /// Human-readable description from the implementation
        reason: String,
    },

    /// A connection was configured with unusable settings.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Which setting was rejected
        reason: String,
    },

    /// A value could not be encoded.
    #[error("{0}")]
    Serialization(#[source] Arc<SerializationError>),

    /// A value could not be decoded.
    #[error("{0}")]
    Deserialization(#[source] Arc<DeserializationError>),
}

impl RpcError {
    /// Creates an [`RpcError::Application`] error.
    pub fn application(reason: impl Into<String>) -> Self {
        Self::Application {
            reason: reason.into(),
        }
    }

    /// Creates an [`RpcError::Protocol`] error.
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Creates an [`RpcError::Disconnected`] error.
    pub fn disconnected(reason: impl Into<String>) -> Self {
        Self::Disconnected {
            reason: reason.into(),
        }
    }

    /// Creates an [`RpcError::Unimplemented`] error.
    pub fn unimplemented(reason: impl Into<String>) -> Self {
        Self::Unimplemented {
            reason: reason.into(),
        }
    }

    /// Creates an [`RpcError::InvalidConfiguration`] error.
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is a transport error.
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if the connection was lost before the call completed.
    #[must_use]
    pub const fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }

    /// Returns `true` if this is a domain failure raised by an implementation.
    #[must_use]
    pub const fn is_application_error(&self) -> bool {
        matches!(self, Self::Application { .. })
    }

    /// Returns `true` if this is a protocol violation.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Returns `true` if this error means the connection can no longer be used.
    #[must_use]
    pub const fn should_close_connection(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Disconnected { .. })
    }

    /// Returns `true` if issuing the same call again could succeed.
    ///
    /// Only transient transport failures qualify; the caller would need a new
    /// connection for a disconnected one.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_recoverable(),
            Self::Disconnected { .. } => true,
            _ => false,
        }
    }

    /// Returns the human-readable reason without the class prefix.
    pub fn reason(&self) -> String {
        match self {
            Self::Transport(e) => e.to_string(),
            Self::Disconnected { reason }
            | Self::Protocol { reason }
            | Self::Unimplemented { reason }
            | Self::Application { reason }
            | Self::InvalidConfiguration { reason } => reason.clone(),
            Self::Serialization(e) => e.to_string(),
            Self::Deserialization(e) => e.to_string(),
        }
    }
}

impl From<TransportError> for RpcError {
    fn from(error: TransportError) -> Self {
        Self::Transport(Arc::new(error))
    }
}

impl From<SerializationError> for RpcError {
    fn from(error: SerializationError) -> Self {
        Self::Serialization(Arc::new(error))
    }
}

impl From<DeserializationError> for RpcError {
    fn from(error: DeserializationError) -> Self {
        Self::Deserialization(Arc::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn test_transport_error_is_fatal() {
        let error: RpcError = TransportError::Closed.into();
        assert!(error.is_transport_error());
        assert!(error.should_close_connection());
        assert!(!error.is_recoverable());
        assert!(error.source().is_some());
    }

    #[test]
    fn test_transient_transport_error_is_recoverable() {
        let error: RpcError = TransportError::ReadFailed {
            source: io::Error::new(io::ErrorKind::TimedOut, "timed out"),
        }
        .into();
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_application_error_keeps_connection() {
        let error = RpcError::application("divide by zero");
        assert!(error.is_application_error());
        assert!(!error.should_close_connection());
        assert!(!error.is_recoverable());
        assert_eq!(error.reason(), "divide by zero");
    }

    #[test]
    fn test_protocol_error_display() {
        let error = RpcError::protocol("unknown capability 7");
        assert!(error.is_protocol_error());
        assert_eq!(error.to_string(), "protocol error: unknown capability 7");
    }

    #[test]
    fn test_clone_shares_transport_source() {
        let error: RpcError = TransportError::Closed.into();
        let copy = error.clone();
        assert_eq!(error.to_string(), copy.to_string());
    }

    #[test]
    fn test_codec_errors_convert() {
        let error: RpcError = DeserializationError::TooLarge { size: 9, max: 2 }.into();
        assert!(matches!(error, RpcError::Deserialization(_)));
        assert_eq!(error.reason(), "9 byte input exceeds the 2 byte limit");
    }
}
