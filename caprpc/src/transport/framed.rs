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

//! Message framing over a split transport.
//!
//! Each message travels as a length-prefixed frame:
//!
//! ```text
//! +------------------+----------------------+
//! | Length (4 bytes) | Body (N bytes)       |
//! +------------------+----------------------+
//! ```
//!
//! - **Length**: u32, big-endian, body size in bytes
//! - **Body**: the message encoded with the connection's
//!   [`WireFormat`](crate::serialization::WireFormat)
//!
//! [`MessageSender`] and [`MessageReceiver`] own the two halves produced by
//! [`Transport::split`](crate::transport::Transport::split) and expose the
//! `send` / `receive` / `close` contract the connection is built on.

use crate::RpcError;
use crate::serialization::{Serializer, WireFormat};
use crate::transport::{ReadHalf, TransportError, WriteHalf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default maximum frame body size (16 MB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Size of the frame length header in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Writes one length-prefixed frame and flushes the writer.
///
/// # Errors
///
/// Returns [`TransportError::FrameTooLarge`] if `payload` exceeds
/// `max_frame_size`, or [`TransportError::WriteFailed`] on I/O failure.
///
/// ```rust
/// use caprpc::transport::framed::write_frame;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut buffer = Vec::new();
/// write_frame(&mut buffer, b"Hello", 1024).await?;
/// assert_eq!(&buffer[0..4], &5u32.to_be_bytes());
/// assert_eq!(&buffer[4..], b"Hello");
/// # Ok(())
/// # }
/// ```
pub async fn write_frame<W>(
    writer: &mut W,
    payload: &[u8],
    max_frame_size: usize,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > max_frame_size || payload.len() > u32::MAX as usize {
        return Err(TransportError::FrameTooLarge {
            size: payload.len(),
            max: max_frame_size,
        });
    }

    let header = (payload.len() as u32).to_be_bytes();
    let write_failed = |source| TransportError::WriteFailed { source };
    writer.write_all(&header).await.map_err(write_failed)?;
    writer.write_all(payload).await.map_err(write_failed)?;
    writer.flush().await.map_err(write_failed)?;
    Ok(())
}

/// Reads one length-prefixed frame.
///
/// Returns `Ok(None)` when the stream ends cleanly on a frame boundary.
///
/// # Errors
///
/// - [`TransportError::FrameTooLarge`] if the header exceeds `max_frame_size`
/// - [`TransportError::ConnectionLost`] if the stream ends mid-frame
/// - [`TransportError::ReadFailed`] on any other I/O failure
pub async fn read_frame<R>(
    reader: &mut R,
    max_frame_size: usize,
) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_SIZE];
    let mut filled = 0;
    while filled < FRAME_HEADER_SIZE {
        let n = reader
            .read(&mut header[filled..])
            .await
            .map_err(|source| TransportError::ReadFailed { source })?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(TransportError::ConnectionLost {
                reason: "stream ended inside a frame header".to_string(),
                source: None,
            });
        }
        filled += n;
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > max_frame_size {
        return Err(TransportError::FrameTooLarge {
            size: len,
            max: max_frame_size,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::UnexpectedEof {
            TransportError::ConnectionLost {
                reason: "stream ended inside a frame".to_string(),
                source: Some(source),
            }
        } else {
            TransportError::ReadFailed { source }
        }
    })?;

    Ok(Some(payload))
}

/// Write side of a framed transport.
pub struct MessageSender {
    writer: WriteHalf,
    format: WireFormat,
    max_frame_size: usize,
}

impl MessageSender {
    /// Wraps the write half of a transport.
    pub fn new(writer: WriteHalf, format: WireFormat, max_frame_size: usize) -> Self {
        Self {
            writer,
            format,
            max_frame_size,
        }
    }

    /// Encodes and writes one message, returning the number of body bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Serialization`] if the message cannot be encoded
    /// (the stream is untouched), or [`RpcError::Transport`] on write failure.
    pub async fn send<T>(&mut self, message: &T) -> Result<usize, RpcError>
    where
        T: serde::Serialize,
    {
        let body = self.format.serialize(message)?;
        self.send_frame(&body).await
    }

    /// Writes a body that was already encoded with this sender's format.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] if `body` is over the frame limit or
    /// the write fails.
    pub async fn send_frame(&mut self, body: &[u8]) -> Result<usize, RpcError> {
        write_frame(&mut self.writer, body, self.max_frame_size).await?;
        Ok(body.len())
    }

    /// Signals end-of-stream to the peer.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] if the shutdown fails.
    pub async fn close(&mut self) -> Result<(), RpcError> {
        self.writer
            .shutdown()
            .await
            .map_err(|source| TransportError::Io { source })?;
        Ok(())
    }
}

/// Read side of a framed transport.
pub struct MessageReceiver {
    reader: ReadHalf,
    format: WireFormat,
    max_frame_size: usize,
}

impl MessageReceiver {
    /// Wraps the read half of a transport.
    pub fn new(reader: ReadHalf, format: WireFormat, max_frame_size: usize) -> Self {
        Self {
            reader,
            format,
            max_frame_size,
        }
    }

    /// Reads and decodes the next message.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream cleanly.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] on read failure and
    /// [`RpcError::Deserialization`] if the frame body is malformed.
    pub async fn receive<T>(&mut self) -> Result<Option<(T, usize)>, RpcError>
    where
        T: serde::de::DeserializeOwned,
    {
        match read_frame(&mut self.reader, self.max_frame_size).await? {
            Some(body) => Ok(Some((self.format.deserialize(&body)?, body.len()))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, Transport};

    #[tokio::test]
    async fn test_read_frame_clean_eof() {
        let mut reader: &[u8] = &[];
        assert!(read_frame(&mut reader, 1024).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_frame_truncated_header() {
        let mut reader: &[u8] = &[0, 0];
        let error = read_frame(&mut reader, 1024).await.unwrap_err();
        assert!(matches!(error, TransportError::ConnectionLost { .. }));
    }

    #[tokio::test]
    async fn test_read_frame_truncated_body() {
        let mut data = 10u32.to_be_bytes().to_vec();
        data.extend_from_slice(b"short");
        let mut reader = &data[..];
        let error = read_frame(&mut reader, 1024).await.unwrap_err();
        assert!(matches!(error, TransportError::ConnectionLost { .. }));
    }

    #[tokio::test]
    async fn test_read_frame_rejects_oversized_header() {
        let data = 2048u32.to_be_bytes();
        let mut reader = &data[..];
        let error = read_frame(&mut reader, 1024).await.unwrap_err();
        assert!(matches!(
            error,
            TransportError::FrameTooLarge {
                size: 2048,
                max: 1024
            }
        ));
    }

    #[tokio::test]
    async fn test_write_frame_rejects_oversized_payload() {
        let mut buffer = Vec::new();
        let error = write_frame(&mut buffer, &[0u8; 8], 4).await.unwrap_err();
        assert!(matches!(error, TransportError::FrameTooLarge { .. }));
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_message_boundaries_preserved() {
        let (a, b) = MemoryTransport::pair_default();
        let (_, writer) = a.split();
        let (reader, _) = b.split();
        let mut sender = MessageSender::new(writer, WireFormat::default(), 1024);
        let mut receiver = MessageReceiver::new(reader, WireFormat::default(), 1024);

        sender.send(&"first".to_string()).await.unwrap();
        sender.send(&"second".to_string()).await.unwrap();
        sender.close().await.unwrap();

        let (first, _) = receiver.receive::<String>().await.unwrap().unwrap();
        let (second, _) = receiver.receive::<String>().await.unwrap().unwrap();
        assert_eq!(first, "first");
        assert_eq!(second, "second");
        assert!(receiver.receive::<String>().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_prepared_frame() {
        let (a, b) = MemoryTransport::pair_default();
        let (_, writer) = a.split();
        let (reader, _) = b.split();
        let mut sender = MessageSender::new(writer, WireFormat::default(), 16);
        let mut receiver = MessageReceiver::new(reader, WireFormat::default(), 16);

        let body = WireFormat::default().serialize(&7u32).unwrap();
        assert_eq!(sender.send_frame(&body).await.unwrap(), body.len());
        let (value, _) = receiver.receive::<u32>().await.unwrap().unwrap();
        assert_eq!(value, 7);

        let error = sender.send_frame(&[0u8; 17]).await.unwrap_err();
        assert!(error.is_transport_error());
    }
}
