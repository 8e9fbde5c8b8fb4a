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

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide identifier of one transport.
///
/// Connections without a configured name log under this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportId(u64);

impl TransportId {
    /// Wraps a raw id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Hands out the next unused id.
    pub fn next() -> Self {
        Self(NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transport({})", self.0)
    }
}

/// Which byte stream a transport wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// In-process pipe
    Memory,
    /// TCP socket
    Tcp,
    /// Unix domain socket
    Unix,
}

impl TransportKind {
    /// Lowercase name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Memory => "memory",
            TransportKind::Tcp => "tcp",
            TransportKind::Unix => "unix",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and endpoints of a transport.
///
/// Endpoints are strings so that socket paths and `ip:port` pairs read the
/// same way in logs.
#[derive(Debug, Clone)]
pub struct TransportMetadata {
    /// Fresh per transport
    pub id: TransportId,
    /// Stream type
    pub kind: TransportKind,
    /// Our end, when the stream has a name for it
    pub local_addr: Option<String>,
    /// The other end, when the stream has a name for it
    pub peer_addr: Option<String>,
}

impl TransportMetadata {
    /// Metadata for a new transport of `kind`, with a fresh id.
    pub fn new(kind: TransportKind) -> Self {
        Self {
            id: TransportId::next(),
            kind,
            local_addr: None,
            peer_addr: None,
        }
    }

    /// Records both endpoints.
    pub fn with_endpoints(mut self, local: impl Into<String>, peer: impl Into<String>) -> Self {
        self.local_addr = Some(local.into());
        self.peer_addr = Some(peer.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase() {
        let first = TransportMetadata::new(TransportKind::Memory);
        let second = TransportMetadata::new(TransportKind::Memory);
        assert!(second.id > first.id);
    }

    #[test]
    fn test_endpoints_and_display() {
        let metadata = TransportMetadata::new(TransportKind::Unix)
            .with_endpoints("./target/example.sock", "unnamed");
        assert_eq!(metadata.kind.to_string(), "unix");
        assert_eq!(metadata.local_addr.as_deref(), Some("./target/example.sock"));
        assert_eq!(metadata.peer_addr.as_deref(), Some("unnamed"));
        assert_eq!(TransportId::new(7).to_string(), "Transport(7)");
    }
}
