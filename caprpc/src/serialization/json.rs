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

//! JSON frame bodies for reading traffic by eye.
//!
//! Only the frame bodies change; call content inside them stays postcard.

use crate::serialization::{DeserializationError, SerializationError, Serializer};

/// Text encoding via `serde_json`.
///
/// ```rust
/// use caprpc::serialization::{JsonSerializer, Serializer};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = JsonSerializer::new().serialize(&[2i64, 32])?;
/// assert_eq!(bytes, b"[2,32]");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer {
    indent: bool,
}

impl JsonSerializer {
    /// Single-line output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indented output.
    pub fn pretty() -> Self {
        Self { indent: true }
    }
}

impl Serializer for JsonSerializer {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        let bytes = if self.indent {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(bytes)
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arith::MultiplyResults;

    #[test]
    fn test_readable_output() {
        let codec = JsonSerializer::new();
        let bytes = codec.serialize(&MultiplyResults { product: 64 }).unwrap();
        assert_eq!(bytes, br#"{"product":64}"#);
        assert_eq!(codec.deserialize::<MultiplyResults>(&bytes).unwrap().product, 64);

        let indented = JsonSerializer::pretty().serialize(&MultiplyResults { product: 1 }).unwrap();
        assert!(indented.contains(&b'\n'));
    }

    #[test]
    fn test_rejects_garbage() {
        let result = JsonSerializer::new().deserialize::<MultiplyResults>(b"{ not json");
        assert!(matches!(result, Err(DeserializationError::Json(_))));
    }
}
