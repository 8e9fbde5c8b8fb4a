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

//! Errors raised by byte streams and frame codecs.
//!
//! Once a connection is up, any of these ends it: the reader and writer
//! tasks stop and outstanding questions resolve with
//! [`RpcError::Disconnected`](crate::RpcError::Disconnected). Before that,
//! [`ConnectionFailed`](TransportError::ConnectionFailed) and
//! [`BindFailed`](TransportError::BindFailed) report why no stream could be
//! set up.

use std::io;
use thiserror::Error;

/// A failure of the underlying stream.
///
/// ```rust
/// use caprpc::transport::TransportError;
/// use std::io;
///
/// let error = TransportError::ConnectionFailed {
///     address: "./target/example.sock".to_string(),
///     source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
/// };
/// assert!(error.is_recoverable());
/// assert!(error.to_string().starts_with("cannot reach ./target/example.sock"));
/// ```
#[derive(Debug, Error)]
pub enum TransportError {
    /// Dialing the peer failed.
    #[error("cannot reach {address}: {source}")]
    ConnectionFailed {
        /// Socket path or `host:port` that was dialed
        address: String,
        #[source]
        source: io::Error,
    },

    /// The stream ended or broke while a frame was in flight.
    #[error("connection lost: {reason}")]
    ConnectionLost {
        /// What was being read or written
        reason: String,
        #[source]
        source: Option<io::Error>,
    },

    /// Reading a frame failed.
    #[error("read failed: {source}")]
    ReadFailed {
        #[source]
        source: io::Error,
    },

    /// Writing a frame failed.
    #[error("write failed: {source}")]
    WriteFailed {
        #[source]
        source: io::Error,
    },

    /// A frame is over the connection's size limit, on either side.
    #[error("frame of {size} bytes exceeds limit of {max} bytes")]
    FrameTooLarge {
        /// Body length in bytes
        size: usize,
        /// `max_frame_size` of the connection
        max: usize,
    },

    /// The stream was already shut down.
    #[error("transport is closed")]
    Closed,

    /// Listening on an address failed.
    #[error("cannot listen on {address}: {source}")]
    BindFailed {
        /// Socket path or `host:port`
        address: String,
        #[source]
        source: io::Error,
    },

    /// Any other socket error.
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Returns `true` if dialing again, or repeating the read or write, may
    /// work.
    ///
    /// ```rust
    /// use caprpc::transport::TransportError;
    ///
    /// assert!(!TransportError::Closed.is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        match self {
            TransportError::ConnectionFailed { .. } | TransportError::ConnectionLost { .. } => {
                true
            }
            TransportError::FrameTooLarge { .. }
            | TransportError::Closed
            | TransportError::BindFailed { .. } => false,
            _ => self.io_source().is_some_and(is_transient),
        }
    }

    /// The socket error behind a read, write or generic I/O failure.
    pub fn io_source(&self) -> Option<&io::Error> {
        match self {
            TransportError::ReadFailed { source }
            | TransportError::WriteFailed { source }
            | TransportError::Io { source } => Some(source),
            TransportError::ConnectionLost { source, .. } => source.as_ref(),
            _ => None,
        }
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        TransportError::Io { source: error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dial_failure_is_recoverable() {
        let error = TransportError::ConnectionFailed {
            address: "127.0.0.1:1".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(error.is_recoverable());
        assert!(error.io_source().is_none());
    }

    #[test]
    fn test_oversized_frame_message() {
        let error = TransportError::FrameTooLarge {
            size: 1 << 30,
            max: 1 << 24,
        };
        assert!(!error.is_recoverable());
        assert_eq!(
            error.to_string(),
            "frame of 1073741824 bytes exceeds limit of 16777216 bytes"
        );
    }

    #[test]
    fn test_io_kinds() {
        let interrupted = TransportError::ReadFailed {
            source: io::Error::new(io::ErrorKind::Interrupted, "interrupted"),
        };
        assert!(interrupted.is_recoverable());

        let broken = TransportError::WriteFailed {
            source: io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"),
        };
        assert!(!broken.is_recoverable());
        assert_eq!(broken.io_source().map(io::Error::kind), Some(io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn test_lost_keeps_cause() {
        let error = TransportError::ConnectionLost {
            reason: "end of stream inside a frame".to_string(),
            source: Some(io::Error::new(io::ErrorKind::UnexpectedEof, "eof")),
        };
        assert_eq!(
            error.io_source().map(io::Error::kind),
            Some(io::ErrorKind::UnexpectedEof)
        );
        let error: TransportError = io::Error::other("boom").into();
        assert!(matches!(error, TransportError::Io { .. }));
    }
}
