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
use crate::capability::{Capability, Payload};
use async_trait::async_trait;

/// A local object that can be called through a [`Capability`].
///
/// The connection dispatches every inbound call on its own task, so several
/// calls may run against the same implementation at once. Implementations
/// that keep mutable state must synchronize it themselves.
///
/// # Example
///
/// ```rust
/// use caprpc::RpcError;
/// use caprpc::capability::{CallContext, Server, unimplemented_method};
///
/// struct Echo;
///
/// #[async_trait::async_trait]
/// impl Server for Echo {
///     async fn dispatch_call(
///         &self,
///         interface_id: u64,
///         method_id: u16,
///         context: &mut CallContext,
///     ) -> Result<(), RpcError> {
///         match (interface_id, method_id) {
///             (1, 0) => {
///                 let text: String = context.get()?;
///                 context.set(&text)
///             }
///             _ => Err(unimplemented_method(interface_id, method_id)),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Server: Send + Sync + 'static {
    /// Handles one call. Results are written into `context`.
    ///
    /// Returning an error sends it back to the caller; the connection is not
    /// affected.
    async fn dispatch_call(
        &self,
        interface_id: u64,
        method_id: u16,
        context: &mut CallContext,
    ) -> Result<(), RpcError>;
}

/// Error for a method a [`Server`] does not implement.
pub fn unimplemented_method(interface_id: u64, method_id: u16) -> RpcError {
    RpcError::unimplemented(format!(
        "method {method_id} of interface {interface_id:#018x} is not implemented"
    ))
}

/// Parameters and results of one in-progress call.
#[derive(Debug)]
pub struct CallContext {
    params: Payload,
    results: Payload,
}

impl CallContext {
    /// Creates a context for `params` with empty results.
    pub fn new(params: Payload) -> Self {
        Self {
            params,
            results: Payload::new(),
        }
    }

    /// The call's parameters.
    pub fn params(&self) -> &Payload {
        &self.params
    }

    /// Decodes the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Deserialization`] if they do not match `T`.
    pub fn get<T>(&self) -> Result<T, RpcError>
    where
        T: serde::de::DeserializeOwned,
    {
        self.params.get()
    }

    /// Takes the parameters out of the context, leaving an empty payload.
    pub fn take_params(&mut self) -> Payload {
        std::mem::take(&mut self.params)
    }

    /// Mutable access to the results, for adding capabilities.
    pub fn results(&mut self) -> &mut Payload {
        &mut self.results
    }

    /// Encodes `value` as the call's result content.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Serialization`] if `value` cannot be encoded.
    pub fn set<T>(&mut self, value: &T) -> Result<(), RpcError>
    where
        T: serde::Serialize + ?Sized,
    {
        self.results.set(value)
    }

    /// Replaces the results wholesale.
    pub fn set_results(&mut self, results: Payload) {
        self.results = results;
    }

    /// Consumes the context, returning the results.
    pub fn into_results(self) -> Payload {
        self.results
    }
}

/// Stands in for a capability that cannot be named directly on a
/// connection: a promise, a broken capability, or an import from another
/// connection. Calls are relayed to the wrapped capability.
pub(crate) struct ForwardingServer {
    target: Capability,
}

impl ForwardingServer {
    pub(crate) fn new(target: Capability) -> Self {
        Self { target }
    }
}

#[async_trait]
impl Server for ForwardingServer {
    async fn dispatch_call(
        &self,
        interface_id: u64,
        method_id: u16,
        context: &mut CallContext,
    ) -> Result<(), RpcError> {
        let promise = self
            .target
            .call(interface_id, method_id, context.take_params());
        let results = promise.wait().await?;
        context.set_results(results.payload().clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    #[async_trait]
    impl Server for Doubler {
        async fn dispatch_call(
            &self,
            interface_id: u64,
            method_id: u16,
            context: &mut CallContext,
        ) -> Result<(), RpcError> {
            match method_id {
                0 => {
                    let value: i64 = context.get()?;
                    context.set(&(value * 2))
                }
                _ => Err(unimplemented_method(interface_id, method_id)),
            }
        }
    }

    #[tokio::test]
    async fn test_forwarding_relays_results() {
        let forward = ForwardingServer::new(Capability::local(Doubler));
        let mut context = CallContext::new(Payload::encode(&21i64).unwrap());
        forward.dispatch_call(1, 0, &mut context).await.unwrap();
        assert_eq!(context.into_results().get::<i64>().unwrap(), 42);
    }

    #[tokio::test]
    async fn test_forwarding_relays_errors() {
        let forward = ForwardingServer::new(Capability::local(Doubler));
        let mut context = CallContext::new(Payload::new());
        let error = forward.dispatch_call(1, 3, &mut context).await.unwrap_err();
        assert!(matches!(error, RpcError::Unimplemented { .. }));
    }

    #[tokio::test]
    async fn test_forwarding_broken_target() {
        let forward =
            ForwardingServer::new(Capability::broken(RpcError::disconnected("gone")));
        let mut context = CallContext::new(Payload::new());
        let error = forward.dispatch_call(1, 0, &mut context).await.unwrap_err();
        assert!(error.is_disconnected());
    }
}
