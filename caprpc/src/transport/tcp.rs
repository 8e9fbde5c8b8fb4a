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

//! TCP transport.

use crate::transport::traits::stream_transport;
use crate::transport::{TransportError, TransportKind, TransportListener, TransportMetadata};
use std::io;
use tokio::net::{TcpListener, TcpStream};

/// A TCP stream.
///
/// Nagle's algorithm is disabled; frames are small and latency-sensitive.
///
/// ```rust,no_run
/// use caprpc::transport::{TcpTransport, TransportListener};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let listener = TcpTransport::bind("127.0.0.1:0").await?;
/// let client = TcpTransport::connect(listener.local_addr()?).await?;
/// # Ok(())
/// # }
/// ```
pub struct TcpTransport {
    stream: TcpStream,
    metadata: TransportMetadata,
}

impl TcpTransport {
    /// Wraps a connected stream.
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        let metadata = TransportMetadata::new(TransportKind::Tcp).with_endpoints(
            stream.local_addr()?.to_string(),
            stream.peer_addr()?.to_string(),
        );
        tracing::debug!(
            transport_id = %metadata.id,
            local_addr = ?metadata.local_addr,
            peer_addr = ?metadata.peer_addr,
            "TCP transport ready"
        );
        Ok(Self { stream, metadata })
    }

    /// Dials `address` (`host:port`).
    ///
    /// # Errors
    ///
    /// [`TransportError::ConnectionFailed`] if the peer cannot be reached.
    pub async fn connect(address: impl Into<String>) -> Result<Self, TransportError> {
        let address = address.into();
        let stream = match TcpStream::connect(&address).await {
            Ok(stream) => stream,
            Err(source) => {
                tracing::warn!(%address, error = %source, "TCP connect failed");
                return Err(TransportError::ConnectionFailed { address, source });
            }
        };
        tracing::info!(%address, "TCP connected");
        Ok(Self::from_stream(stream)?)
    }

    /// Listens on `address`; port 0 picks a free port.
    ///
    /// # Errors
    ///
    /// [`TransportError::BindFailed`] if the address is unavailable.
    pub async fn bind(address: impl Into<String>) -> Result<TcpTransportListener, TransportError> {
        let address = address.into();
        let listener = match TcpListener::bind(&address).await {
            Ok(listener) => listener,
            Err(source) => {
                tracing::error!(%address, error = %source, "TCP bind failed");
                return Err(TransportError::BindFailed { address, source });
            }
        };
        tracing::info!(%address, "TCP listening");
        Ok(TcpTransportListener { listener })
    }
}

stream_transport!(TcpTransport);

/// Returned by [`TcpTransport::bind`].
pub struct TcpTransportListener {
    listener: TcpListener,
}

#[async_trait::async_trait]
impl TransportListener for TcpTransportListener {
    type Transport = TcpTransport;

    async fn accept(&self) -> Result<TcpTransport, TransportError> {
        let (stream, peer_addr) = self.listener.accept().await?;
        tracing::debug!(%peer_addr, "TCP peer accepted");
        Ok(TcpTransport::from_stream(stream)?)
    }

    fn local_addr(&self) -> Result<String, TransportError> {
        Ok(self.listener.local_addr()?.to_string())
    }
}
