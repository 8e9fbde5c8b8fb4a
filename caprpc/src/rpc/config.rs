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

//! Per-connection configuration.

use crate::RpcError;
use crate::capability::{Capability, Server};
use crate::serialization::{Serializer, WireFormat};
use crate::transport::DEFAULT_MAX_FRAME_SIZE;

/// Largest frame limit a connection accepts (1 GB).
pub const MAX_FRAME_SIZE_LIMIT: usize = 1024 * 1024 * 1024;

/// Settings for one [`Connection`](crate::rpc::Connection).
///
/// Both peers must agree on [`format`](Self::format); everything else is
/// local.
///
/// # Examples
///
/// ```rust
/// use caprpc::arith::{ArithServer, ArithService};
/// use caprpc::rpc::ConnectionConfig;
///
/// let config = ConnectionConfig::new()
///     .with_name("arith-server")
///     .with_max_frame_size(64 * 1024)
///     .with_bootstrap_server(ArithServer::new(ArithService));
/// assert!(config.validate().is_ok());
/// assert!(config.bootstrap.is_some());
/// ```
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Encoding of frame bodies.
    ///
    /// Default: postcard
    pub format: WireFormat,

    /// Maximum size of a single frame body in bytes.
    ///
    /// Frames announcing more are rejected and the connection is aborted.
    ///
    /// Default: 16 MB
    pub max_frame_size: usize,

    /// Label used in log output.
    ///
    /// Default: None (the transport id is used)
    pub name: Option<String>,

    /// Capability handed to the peer when it asks for our bootstrap.
    ///
    /// Default: None (bootstrap requests are answered with an error)
    pub bootstrap: Option<Capability>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            format: WireFormat::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            name: None,
            bootstrap: None,
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("format", &self.format.name())
            .field("max_frame_size", &self.max_frame_size)
            .field("name", &self.name)
            .field("bootstrap", &self.bootstrap.is_some())
            .finish()
    }
}

impl ConnectionConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the frame body encoding.
    pub fn with_format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the maximum frame body size.
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Sets the label used in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Offers `capability` to the peer as this side's bootstrap.
    pub fn with_bootstrap(mut self, capability: Capability) -> Self {
        self.bootstrap = Some(capability);
        self
    }

    /// Offers a local implementation as this side's bootstrap.
    pub fn with_bootstrap_server<S>(self, server: S) -> Self
    where
        S: Server,
    {
        self.with_bootstrap(Capability::local(server))
    }

    /// Checks the settings for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::InvalidConfiguration`] if the frame limit is zero
    /// or above [`MAX_FRAME_SIZE_LIMIT`].
    pub fn validate(&self) -> Result<(), RpcError> {
        if self.max_frame_size == 0 {
            return Err(RpcError::invalid_configuration(
                "max_frame_size must be greater than zero",
            ));
        }
        if self.max_frame_size > MAX_FRAME_SIZE_LIMIT {
            return Err(RpcError::invalid_configuration(format!(
                "max_frame_size {} exceeds the limit of {MAX_FRAME_SIZE_LIMIT} bytes",
                self.max_frame_size
            )));
        }
        Ok(())
    }
}
