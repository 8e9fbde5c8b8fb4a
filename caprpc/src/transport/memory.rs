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

//! In-process transport pairs.
//!
//! The two ends of a pair behave like a connected socket pair: bytes written
//! on one end are read on the other, shutting down one end's write side
//! delivers end of stream, and dropping an end does the same.

use crate::transport::traits::stream_transport;
use crate::transport::{TransportKind, TransportMetadata};
use tokio::io::DuplexStream;

/// Bytes that may be in flight in each direction before writers wait.
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// One end of an in-memory pipe.
///
/// Tests and benchmarks use pairs of these in place of sockets.
///
/// ```rust
/// use caprpc::transport::MemoryTransport;
/// use tokio::io::{AsyncReadExt, AsyncWriteExt};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (mut left, mut right) = MemoryTransport::pair(1024);
/// left.write_all(b"Hello!").await?;
///
/// let mut buffer = [0u8; 6];
/// right.read_exact(&mut buffer).await?;
/// assert_eq!(&buffer, b"Hello!");
/// # Ok(())
/// # }
/// ```
pub struct MemoryTransport {
    metadata: TransportMetadata,
    stream: DuplexStream,
}

impl MemoryTransport {
    /// Two connected ends, each buffering up to `buffer_size` bytes.
    pub fn pair(buffer_size: usize) -> (Self, Self) {
        let (left, right) = tokio::io::duplex(buffer_size);
        let left = Self::wrap(left);
        let right = Self::wrap(right);
        tracing::debug!(
            left = %left.metadata.id,
            right = %right.metadata.id,
            buffer_size,
            "Memory transport pair created"
        );
        (left, right)
    }

    /// [`pair`](Self::pair) with a 64 KiB buffer.
    pub fn pair_default() -> (Self, Self) {
        Self::pair(DEFAULT_BUFFER_SIZE)
    }

    fn wrap(stream: DuplexStream) -> Self {
        Self {
            metadata: TransportMetadata::new(TransportKind::Memory),
            stream,
        }
    }
}

stream_transport!(MemoryTransport);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_both_directions() {
        let (mut left, mut right) = MemoryTransport::pair_default();
        let mut buffer = [0u8; 5];

        left.write_all(b"Hello").await.unwrap();
        right.read_exact(&mut buffer).await.unwrap();
        assert_eq!(&buffer, b"Hello");

        right.write_all(b"World").await.unwrap();
        left.read_exact(&mut buffer).await.unwrap();
        assert_eq!(&buffer, b"World");
    }

    #[tokio::test]
    async fn test_shutdown_and_drop_end_the_stream() {
        let (mut left, mut right) = MemoryTransport::pair_default();
        let mut buffer = [0u8; 8];

        Transport::shutdown(&mut left).await.unwrap();
        assert_eq!(right.read(&mut buffer).await.unwrap(), 0);

        let (left, mut right) = MemoryTransport::pair_default();
        drop(left);
        assert_eq!(right.read(&mut buffer).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_small_buffer_still_delivers() {
        let (mut left, mut right) = MemoryTransport::pair(1);
        let writer = tokio::spawn(async move {
            left.write_all(b"XYZ").await.unwrap();
            left
        });

        let mut buffer = [0u8; 3];
        right.read_exact(&mut buffer).await.unwrap();
        assert_eq!(&buffer, b"XYZ");
        writer.await.unwrap();
    }

    #[test]
    fn test_ends_have_distinct_ids() {
        let (left, right) = MemoryTransport::pair_default();
        assert_eq!(left.metadata().kind, TransportKind::Memory);
        assert_ne!(left.metadata().id, right.metadata().id);
    }
}
