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

//! The RPC protocol engine.
//!
//! A [`Connection`] binds a [`Transport`](crate::transport::Transport) to a
//! capability table and a question table, and speaks five messages over it:
//!
//! | Message     | Purpose                                              |
//! |-------------|------------------------------------------------------|
//! | `Bootstrap` | ask the peer for its bootstrap capability            |
//! | `Call`      | invoke a method on one of the peer's capabilities    |
//! | `Return`    | answer a `Bootstrap` or `Call` with results or error |
//! | `Release`   | drop references to one of the peer's capabilities    |
//! | `Abort`     | announce that the connection is going away           |
//!
//! Per-call failures (unknown capability, unimplemented method, application
//! errors) travel back in the `Return` and leave the connection usable. Stream
//! failures and protocol violations that cannot be tied to one call end the
//! connection and fail every outstanding call with
//! [`RpcError::Disconnected`](crate::RpcError::Disconnected).

mod config;
pub(crate) mod connection;
mod dispatch;
mod id;
pub mod message;
mod questions;
mod state;

pub use config::{ConnectionConfig, MAX_FRAME_SIZE_LIMIT};
pub use connection::{Connection, ConnectionStats};
pub use id::{ExportId, IdGenerator, ImportId, QuestionId};
pub use message::Message;
pub use state::ConnectionState;
