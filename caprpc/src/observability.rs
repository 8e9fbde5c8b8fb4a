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

//! Metrics and structured error logging.
//!
//! Every [`Connection`](crate::rpc::Connection) owns a [`ConnectionMetrics`]
//! updated with relaxed atomics on the hot path; call
//! [`ConnectionMetrics::snapshot`] for a consistent-enough copy.
//!
//! [`log_error`] emits one `tracing` event per error with a level chosen by
//! the error's class:
//!
//! - **ERROR**: transport failures and protocol violations
//! - **WARN**: disconnections and codec failures
//! - **INFO**: application and unimplemented-method errors, which are
//!   ordinary per-call outcomes

use crate::RpcError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one connection.
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    calls_sent: AtomicU64,
    calls_received: AtomicU64,
    returns_sent: AtomicU64,
    returns_received: AtomicU64,
    exceptions_sent: AtomicU64,
    exceptions_received: AtomicU64,
    releases_sent: AtomicU64,
    releases_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`ConnectionMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// `Call` messages written
    pub calls_sent: u64,
    /// `Call` messages read
    pub calls_received: u64,
    /// `Return` messages written (results and exceptions)
    pub returns_sent: u64,
    /// `Return` messages read (results and exceptions)
    pub returns_received: u64,
    /// `Return` messages written carrying an exception
    pub exceptions_sent: u64,
    /// `Return` messages read carrying an exception
    pub exceptions_received: u64,
    /// `Release` messages written
    pub releases_sent: u64,
    /// `Release` messages read
    pub releases_received: u64,
    /// Frame body bytes written
    pub bytes_sent: u64,
    /// Frame body bytes read
    pub bytes_received: u64,
    /// Errors recorded through [`ConnectionMetrics::record_error`]
    pub errors: u64,
}

impl ConnectionMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_call_sent(&self) {
        self.calls_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_call_received(&self) {
        self.calls_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_return_sent(&self, exception: bool) {
        self.returns_sent.fetch_add(1, Ordering::Relaxed);
        if exception {
            self.exceptions_sent.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_return_received(&self, exception: bool) {
        self.returns_received.fetch_add(1, Ordering::Relaxed);
        if exception {
            self.exceptions_received.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_release_sent(&self) {
        self.releases_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_release_received(&self) {
        self.releases_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bytes_sent(&self, bytes: usize) {
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_bytes_received(&self, bytes: usize) {
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Counts an error that ended a call or the connection.
    pub fn record_error(&self, _error: &RpcError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Total `Call` messages written.
    #[must_use]
    pub fn calls_sent(&self) -> u64 {
        self.calls_sent.load(Ordering::Relaxed)
    }

    /// Total `Call` messages read.
    #[must_use]
    pub fn calls_received(&self) -> u64 {
        self.calls_received.load(Ordering::Relaxed)
    }

    /// Copies every counter.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls_sent: self.calls_sent.load(Ordering::Relaxed),
            calls_received: self.calls_received.load(Ordering::Relaxed),
            returns_sent: self.returns_sent.load(Ordering::Relaxed),
            returns_received: self.returns_received.load(Ordering::Relaxed),
            exceptions_sent: self.exceptions_sent.load(Ordering::Relaxed),
            exceptions_received: self.exceptions_received.load(Ordering::Relaxed),
            releases_sent: self.releases_sent.load(Ordering::Relaxed),
            releases_received: self.releases_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Logs an error with structured context.
///
/// ```rust
/// use caprpc::RpcError;
/// use caprpc::observability::log_error;
///
/// log_error(&RpcError::application("divide by zero"));
/// ```
pub fn log_error(error: &RpcError) {
    match error {
        RpcError::Transport(e) => {
            tracing::error!(
                error = %e,
                recoverable = error.is_recoverable(),
                "Transport error occurred"
            );
        }
        RpcError::Protocol { reason } => {
            tracing::error!(reason = %reason, "Protocol violation");
        }
        RpcError::InvalidConfiguration { reason } => {
            tracing::error!(reason = %reason, "Invalid connection configuration");
        }
        RpcError::Disconnected { reason } => {
            tracing::warn!(reason = %reason, "Connection lost");
        }
        RpcError::Serialization(e) => {
            tracing::warn!(error = %e, "Failed to encode value");
        }
        RpcError::Deserialization(e) => {
            tracing::warn!(error = %e, "Failed to decode value");
        }
        RpcError::Unimplemented { reason } => {
            tracing::info!(reason = %reason, "Unimplemented method called");
        }
        RpcError::Application { reason } => {
            tracing::info!(reason = %reason, "Application error occurred");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = ConnectionMetrics::new();
        metrics.record_call_sent();
        metrics.record_call_sent();
        metrics.record_return_received(true);
        metrics.record_return_received(false);
        metrics.record_bytes_sent(10);
        metrics.record_error(&RpcError::application("x"));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.calls_sent, 2);
        assert_eq!(snapshot.returns_received, 2);
        assert_eq!(snapshot.exceptions_received, 1);
        assert_eq!(snapshot.bytes_sent, 10);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(metrics.calls_received(), 0);
    }

    #[test]
    fn test_log_every_error_class() {
        log_error(&TransportError::Closed.into());
        log_error(&RpcError::protocol("unknown capability 3"));
        log_error(&RpcError::disconnected("peer closed"));
        log_error(&RpcError::unimplemented("method 4"));
        log_error(&RpcError::application("divide by zero"));
        log_error(&RpcError::invalid_configuration("max_frame_size"));
    }
}
