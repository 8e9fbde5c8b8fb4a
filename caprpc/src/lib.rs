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

//! # caprpc - Capability-based bidirectional RPC
//!
//! caprpc connects two peers over any ordered, reliable byte stream and lets
//! each call methods on objects the other has chosen to share:
//!
//! - **Capabilities**: references to remote objects are unforgeable handles
//!   that can be passed around in calls and results
//! - **Bootstrap**: each side may offer one capability the peer can ask for
//! - **Promise pipelining**: calls can be made on results that have not
//!   arrived yet; they are queued and replayed once the target is known
//! - **Per-call errors**: a failing call never tears down the connection
//! - **Pluggable transports**: Unix sockets, TCP, and in-memory pairs
//!
//! ## Architecture
//!
//! - **[`transport`]**: byte streams and length-prefixed message framing
//! - **[`serialization`]**: frame body and call content encoding
//! - **[`capability`]**: capability handles, promises, the [`Server`] trait
//!   and the reference-counted capability table
//! - **[`rpc`]**: the connection, its messages and its lifecycle
//! - **[`arith`]**: the `Arith` interface used to exercise the protocol
//! - **[`observability`]**: per-connection metrics and error logging
//!
//! ## Quick Start
//!
//! ```rust
//! use caprpc::arith::{ArithClient, ArithServer, ArithService};
//! use caprpc::rpc::{Connection, ConnectionConfig};
//! use caprpc::transport::MemoryTransport;
//!
//! # async fn example() -> Result<(), caprpc::RpcError> {
//! let (client_side, server_side) = MemoryTransport::pair_default();
//!
//! // The server offers an Arith implementation as its bootstrap capability.
//! let server = Connection::new(
//!     server_side,
//!     ConnectionConfig::new().with_bootstrap(ArithServer::capability(ArithService)),
//! )?;
//! let client = Connection::new(client_side, ConnectionConfig::new())?;
//!
//! // Calls on the bootstrap capability do not wait for it to arrive.
//! let arith = ArithClient::new(client.bootstrap());
//! let product = arith.multiply(2, 32);
//! let quotient = arith.divide(55, 0);
//!
//! assert_eq!(product.wait().await?.product, 64);
//! assert_eq!(quotient.wait().await.unwrap_err().reason(), "divide by zero");
//!
//! client.close().await;
//! server.done().await;
//! # Ok(())
//! # }
//! ```
//!
//! [`Server`]: capability::Server

#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod arith;
pub mod capability;
pub mod error;
pub mod observability;
pub mod rpc;
pub mod serialization;
pub mod transport;

pub use capability::{Capability, Payload, Promise, Server, TypedPromise};
pub use error::RpcError;
pub use observability::{ConnectionMetrics, log_error};
pub use rpc::{Connection, ConnectionConfig, ConnectionState};
pub use transport::{Transport, TransportError};
