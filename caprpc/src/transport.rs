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

//! Byte streams and message framing.
//!
//! A [`Transport`] is any ordered, reliable, bidirectional byte stream. A
//! [`Connection`](crate::rpc::Connection) splits one into halves and sends
//! length-prefixed frames over it ([`framed`]).
//!
//! | Transport           | Stream                                 |
//! |---------------------|----------------------------------------|
//! | [`UnixTransport`]   | Unix domain socket, the usual setup    |
//! | [`TcpTransport`]    | TCP                                    |
//! | [`MemoryTransport`] | in-process pipe for tests              |
//!
//! ```rust,no_run
//! use caprpc::transport::{Transport, TransportListener, UnixTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let listener = UnixTransport::bind("./target/example.sock").await?;
//! let server_side = listener.accept().await?;
//! println!("accepted {}", server_side.metadata().id);
//! # Ok(())
//! # }
//! ```

mod error;
pub mod framed;
mod memory;
mod tcp;
mod traits;
mod types;
#[cfg(unix)]
mod unix;

pub use error::TransportError;
pub use framed::{DEFAULT_MAX_FRAME_SIZE, MessageReceiver, MessageSender};
pub use memory::MemoryTransport;
pub use tcp::{TcpTransport, TcpTransportListener};
pub use traits::{ReadHalf, Transport, TransportListener, WriteHalf};
pub use types::{TransportId, TransportKind, TransportMetadata};
#[cfg(unix)]
pub use unix::{UnixTransport, UnixTransportListener};
