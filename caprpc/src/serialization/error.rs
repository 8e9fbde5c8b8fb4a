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

//! Codec failures.

use thiserror::Error;

/// Encoding a value failed.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// Postcard rejected the value.
    #[error("postcard encoding failed: {0}")]
    Postcard(#[from] postcard::Error),

    /// serde_json rejected the value.
    #[cfg(feature = "json")]
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decoding bytes failed.
///
/// ```rust
/// use caprpc::serialization::{DeserializationError, PostcardSerializer, Serializer};
///
/// let result: Result<String, DeserializationError> =
///     PostcardSerializer::default().deserialize(&[0xFF]);
/// assert!(matches!(result, Err(DeserializationError::Postcard(_))));
/// ```
#[derive(Debug, Error)]
pub enum DeserializationError {
    /// The bytes are not valid postcard for the expected type.
    #[error("postcard decoding failed: {0}")]
    Postcard(#[from] postcard::Error),

    /// The bytes are not valid JSON for the expected type.
    #[cfg(feature = "json")]
    #[error("json decoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The input is over the decoder's size limit.
    #[error("{size} byte input exceeds the {max} byte limit")]
    TooLarge {
        /// Input length
        size: usize,
        /// Configured limit
        max: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_codec_cause_is_kept() {
        let cause = postcard::from_bytes::<u64>(&[]).unwrap_err();
        let error = DeserializationError::from(cause);
        assert!(error.to_string().starts_with("postcard decoding failed"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_size_limit_message() {
        let error = DeserializationError::TooLarge { size: 9, max: 2 };
        assert_eq!(error.to_string(), "9 byte input exceeds the 2 byte limit");
        assert!(error.source().is_none());
    }
}
