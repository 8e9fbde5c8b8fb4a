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

use crate::transport::{TransportError, TransportMetadata};
use std::future::Future;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncWrite};

/// Read side of a split transport, owned by a connection's reader task.
pub type ReadHalf = Box<dyn AsyncRead + Send + Unpin>;

/// Write side of a split transport, owned by a connection's writer task.
pub type WriteHalf = Box<dyn AsyncWrite + Send + Unpin>;

/// An ordered, reliable, bidirectional byte stream.
///
/// This is all a [`Connection`](crate::rpc::Connection) needs from the
/// network: it splits the stream, frames messages on top, and shuts the
/// write side down when it closes.
///
/// Provided by [`UnixTransport`](crate::transport::UnixTransport),
/// [`TcpTransport`](crate::transport::TcpTransport) and
/// [`MemoryTransport`](crate::transport::MemoryTransport).
///
/// ```rust
/// use caprpc::transport::{MemoryTransport, Transport};
/// use tokio::io::{AsyncReadExt, AsyncWriteExt};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (left, right) = MemoryTransport::pair_default();
/// let (_, mut left_writer) = left.split();
/// let (mut right_reader, _) = right.split();
///
/// left_writer.write_all(b"ping").await?;
/// let mut buffer = [0u8; 4];
/// right_reader.read_exact(&mut buffer).await?;
/// assert_eq!(&buffer, b"ping");
/// # Ok(())
/// # }
/// ```
pub trait Transport: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static {
    /// Identity and endpoints.
    fn metadata(&self) -> &TransportMetadata;

    /// Flushes and closes the write side; the peer then reads end of stream.
    fn shutdown(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>>;

    /// Separates the stream into independently owned halves.
    fn split(self) -> (ReadHalf, WriteHalf)
    where
        Self: Sized,
    {
        let (reader, writer) = tokio::io::split(self);
        (Box::new(reader), Box::new(writer))
    }
}

/// Accepts incoming transports.
///
/// ```rust,no_run
/// use caprpc::transport::{TransportListener, UnixTransport};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let listener = UnixTransport::bind("./target/example.sock").await?;
/// println!("Listening on {}", listener.local_addr()?);
/// let transport = listener.accept().await?;
/// # Ok(())
/// # }
/// ```
#[async_trait::async_trait]
pub trait TransportListener: Send + Sync {
    /// What [`accept`](Self::accept) yields
    type Transport: Transport;

    /// Waits for the next peer.
    async fn accept(&self) -> Result<Self::Transport, TransportError>;

    /// Where peers should dial.
    #[allow(clippy::result_large_err)]
    fn local_addr(&self) -> Result<String, TransportError>;
}

/// Implements [`Transport`] and the tokio I/O traits for a struct with a
/// `stream` field (any tokio stream) and a `metadata` field.
macro_rules! stream_transport {
    ($transport:ty) => {
        impl $crate::transport::Transport for $transport {
            fn metadata(&self) -> &$crate::transport::TransportMetadata {
                &self.metadata
            }

            fn shutdown(
                &mut self,
            ) -> ::std::pin::Pin<
                Box<
                    dyn ::std::future::Future<
                            Output = Result<(), $crate::transport::TransportError>,
                        > + Send
                        + '_,
                >,
            > {
                Box::pin(async move {
                    ::tracing::debug!(
                        transport_id = %self.metadata.id,
                        kind = %self.metadata.kind,
                        "Shutting down transport"
                    );
                    ::tokio::io::AsyncWriteExt::shutdown(&mut self.stream)
                        .await
                        .map_err($crate::transport::TransportError::from)
                })
            }
        }

        impl ::tokio::io::AsyncRead for $transport {
            fn poll_read(
                mut self: ::std::pin::Pin<&mut Self>,
                cx: &mut ::std::task::Context<'_>,
                buf: &mut ::tokio::io::ReadBuf<'_>,
            ) -> ::std::task::Poll<::std::io::Result<()>> {
                ::tokio::io::AsyncRead::poll_read(::std::pin::Pin::new(&mut self.stream), cx, buf)
            }
        }

        impl ::tokio::io::AsyncWrite for $transport {
            fn poll_write(
                mut self: ::std::pin::Pin<&mut Self>,
                cx: &mut ::std::task::Context<'_>,
                buf: &[u8],
            ) -> ::std::task::Poll<::std::io::Result<usize>> {
                ::tokio::io::AsyncWrite::poll_write(::std::pin::Pin::new(&mut self.stream), cx, buf)
            }

            fn poll_flush(
                mut self: ::std::pin::Pin<&mut Self>,
                cx: &mut ::std::task::Context<'_>,
            ) -> ::std::task::Poll<::std::io::Result<()>> {
                ::tokio::io::AsyncWrite::poll_flush(::std::pin::Pin::new(&mut self.stream), cx)
            }

            fn poll_shutdown(
                mut self: ::std::pin::Pin<&mut Self>,
                cx: &mut ::std::task::Context<'_>,
            ) -> ::std::task::Poll<::std::io::Result<()>> {
                ::tokio::io::AsyncWrite::poll_shutdown(::std::pin::Pin::new(&mut self.stream), cx)
            }
        }
    };
}

pub(crate) use stream_transport;
