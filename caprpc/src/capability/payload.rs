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

use crate::RpcError;
use crate::capability::Capability;
use crate::serialization::{decode_content, encode_content};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Parameters or results of one call: encoded content plus the capabilities
/// it references.
///
/// Capabilities are addressed by index. A struct that carries a capability
/// stores the index returned by [`add_cap`](Self::add_cap) in one of its
/// fields; the receiver fetches it with [`cap`](Self::cap).
///
/// ```rust
/// use caprpc::capability::Payload;
///
/// # fn example() -> Result<(), caprpc::RpcError> {
/// let payload = Payload::encode(&(2i64, 32i64))?;
/// let (a, b): (i64, i64) = payload.get()?;
/// assert_eq!(a * b, 64);
/// assert_eq!(payload.cap_count(), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct Payload {
    content: Vec<u8>,
    caps: Vec<Option<Capability>>,
}

impl Payload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a payload holding `value` and no capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Serialization`] if `value` cannot be encoded.
    pub fn encode<T>(value: &T) -> Result<Self, RpcError>
    where
        T: Serialize + ?Sized,
    {
        Ok(Self {
            content: encode_content(value)?,
            caps: Vec::new(),
        })
    }

    pub(crate) fn from_parts(content: Vec<u8>, caps: Vec<Option<Capability>>) -> Self {
        Self { content, caps }
    }

    /// Replaces the content with `value`, keeping the capability table.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Serialization`] if `value` cannot be encoded.
    pub fn set<T>(&mut self, value: &T) -> Result<(), RpcError>
    where
        T: Serialize + ?Sized,
    {
        self.content = encode_content(value)?;
        Ok(())
    }

    /// Decodes the content.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Deserialization`] if the content does not match `T`.
    pub fn get<T>(&self) -> Result<T, RpcError>
    where
        T: DeserializeOwned,
    {
        Ok(decode_content(&self.content)?)
    }

    /// Appends a capability and returns its index.
    pub fn add_cap(&mut self, cap: Capability) -> u32 {
        self.caps.push(Some(cap));
        (self.caps.len() - 1) as u32
    }

    /// Appends a capability, builder style.
    pub fn with_cap(mut self, cap: Capability) -> Self {
        self.add_cap(cap);
        self
    }

    /// Returns a new handle to the capability at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Protocol`] if the slot is out of range or empty.
    pub fn cap(&self, index: u32) -> Result<Capability, RpcError> {
        match self.caps.get(index as usize) {
            Some(Some(cap)) => Ok(cap.clone()),
            Some(None) => Err(RpcError::protocol(format!("capability slot {index} is empty"))),
            None => Err(RpcError::protocol(format!(
                "capability index {index} out of range ({} slots)",
                self.caps.len()
            ))),
        }
    }

    /// Number of capability slots.
    pub fn cap_count(&self) -> usize {
        self.caps.len()
    }

    /// Encoded content bytes.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub(crate) fn caps(&self) -> &[Option<Capability>] {
        &self.caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Holder {
        name: String,
        cap: u32,
    }

    #[test]
    fn test_cap_index_travels_in_content() {
        let mut payload = Payload::new();
        let index = payload.add_cap(Capability::broken(RpcError::application("nope")));
        payload
            .set(&Holder {
                name: "calculator".to_string(),
                cap: index,
            })
            .unwrap();

        let holder: Holder = payload.get().unwrap();
        assert_eq!(holder.cap, 0);
        assert!(payload.cap(holder.cap).unwrap().is_broken());
    }

    #[test]
    fn test_missing_cap_is_protocol_error() {
        let payload = Payload::encode(&1u8).unwrap();
        assert!(payload.cap(0).unwrap_err().is_protocol_error());

        let empty_slot = Payload::from_parts(Vec::new(), vec![None]);
        assert!(empty_slot.cap(0).unwrap_err().is_protocol_error());
    }

    #[test]
    fn test_wrong_type_fails_to_decode() {
        let payload = Payload::encode(&7u8).unwrap();
        let result: Result<Holder, _> = payload.get();
        assert!(matches!(result, Err(RpcError::Deserialization(_))));
    }
}
