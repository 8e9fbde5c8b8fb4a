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

use crate::serialization::{DeserializationError, SerializationError};

/// An encoding for frame bodies or call content.
///
/// Shared between a connection's reader and writer tasks, hence `Sync`.
///
/// ```rust
/// use caprpc::serialization::{PostcardSerializer, Serializer};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, Debug, PartialEq)]
/// struct Point { x: i64, y: i64 }
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = PostcardSerializer::default();
/// let bytes = codec.serialize(&Point { x: 2, y: 32 })?;
/// assert_eq!(codec.deserialize::<Point>(&bytes)?, Point { x: 2, y: 32 });
/// # Ok(())
/// # }
/// ```
pub trait Serializer: Send + Sync + 'static {
    /// Encodes `value`.
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized;

    /// Decodes a `T` from the whole of `bytes`.
    ///
    /// # Errors
    ///
    /// Truncated, corrupt, or oversized input, or input for another type.
    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned;

    /// Short lowercase name, used in logs.
    fn name(&self) -> &'static str;
}
