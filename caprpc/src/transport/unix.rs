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

//! Unix domain socket transport.
//!
//! The listening side takes over its path: a socket file left behind by an
//! earlier run is removed before binding.

use crate::transport::traits::stream_transport;
use crate::transport::{TransportError, TransportKind, TransportListener, TransportMetadata};
use std::io;
use std::path::{Path, PathBuf};
use tokio::net::unix::SocketAddr;
use tokio::net::{UnixListener, UnixStream};

/// A Unix domain socket stream.
///
/// ```rust,no_run
/// use caprpc::transport::UnixTransport;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = UnixTransport::connect("./target/example.sock").await?;
/// # Ok(())
/// # }
/// ```
pub struct UnixTransport {
    stream: UnixStream,
    metadata: TransportMetadata,
}

/// Socket name for logs; client ends are usually unnamed.
fn endpoint(addr: io::Result<SocketAddr>) -> String {
    addr.ok()
        .and_then(|addr| addr.as_pathname().map(|path| path.display().to_string()))
        .unwrap_or_else(|| "unnamed".to_string())
}

impl UnixTransport {
    /// Wraps a connected stream.
    pub fn from_stream(stream: UnixStream) -> Self {
        let metadata = TransportMetadata::new(TransportKind::Unix)
            .with_endpoints(endpoint(stream.local_addr()), endpoint(stream.peer_addr()));
        tracing::debug!(
            transport_id = %metadata.id,
            local_addr = ?metadata.local_addr,
            peer_addr = ?metadata.peer_addr,
            "Unix transport ready"
        );
        Self { stream, metadata }
    }

    /// Dials the socket at `path`.
    ///
    /// # Errors
    ///
    /// [`TransportError::ConnectionFailed`] if nothing listens there.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        match UnixStream::connect(path).await {
            Ok(stream) => {
                tracing::info!(path = %path.display(), "Unix socket connected");
                Ok(Self::from_stream(stream))
            }
            Err(source) => {
                tracing::warn!(path = %path.display(), error = %source, "Unix connect failed");
                Err(TransportError::ConnectionFailed {
                    address: path.display().to_string(),
                    source,
                })
            }
        }
    }

    /// Listens at `path`, replacing a stale socket file and creating missing
    /// parent directories.
    ///
    /// # Errors
    ///
    /// [`TransportError::BindFailed`] if the old file cannot be removed or
    /// the socket cannot be bound.
    pub async fn bind(path: impl AsRef<Path>) -> Result<UnixTransportListener, TransportError> {
        let path = path.as_ref().to_path_buf();
        let failed = |source: io::Error| TransportError::BindFailed {
            address: path.display().to_string(),
            source,
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "Stale socket removed"),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => return Err(failed(error)),
        }
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(failed)?;
        }

        let listener = UnixListener::bind(&path).map_err(|error| {
            tracing::error!(path = %path.display(), %error, "Unix bind failed");
            failed(error)
        })?;
        tracing::info!(path = %path.display(), "Unix socket listening");
        Ok(UnixTransportListener { listener, path })
    }
}

stream_transport!(UnixTransport);

/// Returned by [`UnixTransport::bind`].
///
/// The socket file stays on disk after the listener is dropped; the next
/// [`bind`](UnixTransport::bind) replaces it. [`close`](Self::close) removes
/// it.
pub struct UnixTransportListener {
    listener: UnixListener,
    path: PathBuf,
}

impl UnixTransportListener {
    /// The bound socket path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stops listening and removes the socket file.
    ///
    /// # Errors
    ///
    /// [`TransportError::Io`] if the file cannot be removed, for instance
    /// because something else already deleted it.
    pub async fn close(self) -> Result<(), TransportError> {
        drop(self.listener);
        tokio::fs::remove_file(&self.path).await?;
        tracing::debug!(path = %self.path.display(), "Unix socket removed");
        Ok(())
    }
}

#[async_trait::async_trait]
impl TransportListener for UnixTransportListener {
    type Transport = UnixTransport;

    async fn accept(&self) -> Result<UnixTransport, TransportError> {
        let (stream, _) = self.listener.accept().await?;
        tracing::debug!(path = %self.path.display(), "Unix peer accepted");
        Ok(UnixTransport::from_stream(stream))
    }

    fn local_addr(&self) -> Result<String, TransportError> {
        Ok(self.path.display().to_string())
    }
}
