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

//! Postcard encoding: the default frame format and the only content format.

use crate::serialization::{DeserializationError, SerializationError, Serializer};

/// Compact binary encoding via `postcard`.
///
/// ```rust
/// use caprpc::serialization::{PostcardSerializer, Serializer};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = PostcardSerializer::new().with_limit(1024);
/// let bytes = codec.serialize(&(55i64, 5i64))?;
/// assert_eq!(codec.deserialize::<(i64, i64)>(&bytes)?, (55, 5));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct PostcardSerializer {
    limit: Option<usize>,
}

impl PostcardSerializer {
    /// No input size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses to decode inputs longer than `limit` bytes.
    pub fn with_limit(self, limit: usize) -> Self {
        Self { limit: Some(limit) }
    }
}

impl Serializer for PostcardSerializer {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        Ok(postcard::to_allocvec(value)?)
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        match self.limit {
            Some(max) if bytes.len() > max => Err(DeserializationError::TooLarge {
                size: bytes.len(),
                max,
            }),
            _ => Ok(postcard::from_bytes(bytes)?),
        }
    }

    fn name(&self) -> &'static str {
        "postcard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Operands {
        num: i64,
        denom: i64,
    }

    #[test]
    fn test_operands() {
        let codec = PostcardSerializer::new();
        let bytes = codec.serialize(&Operands { num: 55, denom: -5 }).unwrap();
        assert_eq!(
            codec.deserialize::<Operands>(&bytes).unwrap(),
            Operands { num: 55, denom: -5 }
        );
        assert_eq!(codec.name(), "postcard");
    }

    #[test]
    fn test_limit() {
        let bytes = PostcardSerializer::new()
            .serialize(&Operands {
                num: i64::MAX,
                denom: i64::MIN,
            })
            .unwrap();
        let error = PostcardSerializer::new()
            .with_limit(2)
            .deserialize::<Operands>(&bytes)
            .unwrap_err();
        assert!(matches!(error, DeserializationError::TooLarge { max: 2, .. }));
    }

    #[test]
    fn test_truncated() {
        let result = PostcardSerializer::new().deserialize::<Operands>(&[0x01]);
        assert!(matches!(result, Err(DeserializationError::Postcard(_))));
    }
}
