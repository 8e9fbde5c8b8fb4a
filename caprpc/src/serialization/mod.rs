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

//! Serialization layer for caprpc.
//!
//! Two encodings are in play on every connection:
//!
//! - **Frame bodies**: each protocol [`Message`](crate::rpc::Message) is
//!   encoded with the connection's [`WireFormat`] (postcard by default, JSON
//!   with the `json` feature for debugging).
//! - **Call content**: the parameter and result structs inside a message are
//!   always postcard-encoded, since the method contract between peers is
//!   fixed and must not depend on per-connection settings.
//!
//! # Examples
//!
//! ```rust
//! use caprpc::serialization::{Serializer, WireFormat};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let format = WireFormat::default();
//! assert_eq!(format.name(), "postcard");
//! let bytes = format.serialize(&("multiply", 2i64, 32i64))?;
//! let decoded: (String, i64, i64) = format.deserialize(&bytes)?;
//! assert_eq!(decoded.0, "multiply");
//! # Ok(())
//! # }
//! ```

mod error;
#[cfg(feature = "json")]
mod json;
mod postcard;
mod traits;

pub use self::error::{DeserializationError, SerializationError};
#[cfg(feature = "json")]
pub use self::json::JsonSerializer;
pub use self::postcard::PostcardSerializer;
pub use self::traits::Serializer;

/// Serializer selected for a connection's frame bodies.
///
/// Both peers must be configured with the same format.
#[derive(Clone, Debug)]
pub enum WireFormat {
    /// Compact binary frames.
    Postcard(PostcardSerializer),
    /// Human-readable frames.
    #[cfg(feature = "json")]
    Json(JsonSerializer),
}

impl Default for WireFormat {
    fn default() -> Self {
        WireFormat::Postcard(PostcardSerializer::default())
    }
}

impl Serializer for WireFormat {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        match self {
            WireFormat::Postcard(s) => s.serialize(value),
            #[cfg(feature = "json")]
            WireFormat::Json(s) => s.serialize(value),
        }
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        match self {
            WireFormat::Postcard(s) => s.deserialize(bytes),
            #[cfg(feature = "json")]
            WireFormat::Json(s) => s.deserialize(bytes),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            WireFormat::Postcard(s) => s.name(),
            #[cfg(feature = "json")]
            WireFormat::Json(s) => s.name(),
        }
    }
}

/// Encodes call content (parameters or results) with the fixed content codec.
pub fn encode_content<T>(value: &T) -> Result<Vec<u8>, SerializationError>
where
    T: serde::Serialize + ?Sized,
{
    PostcardSerializer::default().serialize(value)
}

/// Decodes call content produced by [`encode_content`].
pub fn decode_content<T>(bytes: &[u8]) -> Result<T, DeserializationError>
where
    T: serde::de::DeserializeOwned,
{
    PostcardSerializer::default().deserialize(bytes)
}
