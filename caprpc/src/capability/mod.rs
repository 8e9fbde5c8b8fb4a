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

//! Capabilities: unforgeable references to callable objects.
//!
//! A [`Capability`] is what a caller holds. Whatever it points to (an object
//! in this process, an object on the other end of a [`Connection`], or the
//! not-yet-known result of an earlier call) the caller interacts with it the
//! same way: [`Capability::call`] returns a [`Promise`] immediately.
//!
//! Every handle is one reference. Cloning retains, dropping releases; when the
//! last handle to an imported capability goes away the connection tells the
//! peer, which frees the object once nothing else refers to it.
//!
//! [`Connection`]: crate::rpc::Connection

mod payload;
mod promise;
mod server;
mod table;

pub use payload::Payload;
pub use promise::{Promise, PromiseCap, Results, TypedPromise};
pub use server::{CallContext, Server, unimplemented_method};
pub use table::CapTable;

pub(crate) use promise::Resolver;
pub(crate) use server::ForwardingServer;

use crate::RpcError;
use crate::rpc::ImportId;
use crate::rpc::connection::ConnectionInner;
use std::fmt;
use std::sync::{Arc, Weak};

/// A reference to a callable object.
#[derive(Clone)]
pub enum Capability {
    /// An object implemented in this process.
    Local(Arc<dyn Server>),
    /// An object hosted by the peer of a connection.
    Import(ImportRef),
    /// The pending result of a call; calls are queued until it resolves.
    Promise(Arc<PromiseCap>),
    /// Every call fails with the stored error.
    Broken(RpcError),
}

impl Capability {
    /// Wraps a local implementation.
    pub fn local<S>(server: S) -> Self
    where
        S: Server,
    {
        Capability::Local(Arc::new(server))
    }

    /// A capability whose calls all fail with `error`.
    pub fn broken(error: RpcError) -> Self {
        Capability::Broken(error)
    }

    /// Invokes a method. Never blocks; the outcome arrives through the
    /// returned promise.
    pub fn call(&self, interface_id: u64, method_id: u16, params: Payload) -> Promise {
        match self {
            Capability::Local(server) => {
                let (resolver, promise) = Promise::channel();
                let server = Arc::clone(server);
                tokio::spawn(async move {
                    let mut context = CallContext::new(params);
                    let outcome = server
                        .dispatch_call(interface_id, method_id, &mut context)
                        .await
                        .map(|()| Results::new(context.into_results()));
                    resolver.resolve(outcome);
                });
                promise
            }
            Capability::Import(import) => match import.connection.upgrade() {
                Some(connection) => connection.send_call(import.id, interface_id, method_id, params),
                None => Promise::from_error(RpcError::disconnected("connection is gone")),
            },
            Capability::Promise(promise_cap) => promise_cap.call(interface_id, method_id, params),
            Capability::Broken(error) => Promise::from_error(error.clone()),
        }
    }

    /// Waits until the capability no longer refers to a pending result.
    ///
    /// # Errors
    ///
    /// Returns the error the capability broke with.
    pub async fn when_resolved(&self) -> Result<(), RpcError> {
        let mut current = self.clone();
        loop {
            let next = match &current {
                Capability::Promise(promise_cap) => promise_cap.resolution().await,
                Capability::Broken(error) => return Err(error.clone()),
                Capability::Local(_) | Capability::Import(_) => return Ok(()),
            };
            current = next;
        }
    }

    /// Returns `true` for an unresolved (or resolved-but-still-wrapped)
    /// pipelined capability.
    pub fn is_promise(&self) -> bool {
        matches!(self, Capability::Promise(_))
    }

    /// Returns `true` if every call fails.
    pub fn is_broken(&self) -> bool {
        matches!(self, Capability::Broken(_))
    }

    /// Drops this handle. Equivalent to letting it go out of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl From<Arc<dyn Server>> for Capability {
    fn from(server: Arc<dyn Server>) -> Self {
        Capability::Local(server)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Local(server) => f
                .debug_tuple("Local")
                .field(&Arc::as_ptr(server).cast::<()>())
                .finish(),
            Capability::Import(import) => f.debug_tuple("Import").field(&import.id).finish(),
            Capability::Promise(promise_cap) => f.debug_tuple("Promise").field(promise_cap).finish(),
            Capability::Broken(error) => f.debug_tuple("Broken").field(error).finish(),
        }
    }
}

/// One handle on a capability imported from a connection's peer.
///
/// Holds the connection weakly; once the connection is gone, calls fail with
/// [`RpcError::Disconnected`].
pub struct ImportRef {
    id: ImportId,
    connection: Weak<ConnectionInner>,
}

impl ImportRef {
    /// Wraps an import whose local reference has already been counted.
    pub(crate) fn new(id: ImportId, connection: Weak<ConnectionInner>) -> Self {
        Self { id, connection }
    }

    /// The import id on the owning connection.
    pub fn id(&self) -> ImportId {
        self.id
    }

    pub(crate) fn belongs_to(&self, connection: &ConnectionInner) -> bool {
        std::ptr::eq(self.connection.as_ptr(), connection)
    }
}

impl Clone for ImportRef {
    fn clone(&self) -> Self {
        if let Some(connection) = self.connection.upgrade() {
            connection.retain_import(self.id);
        }
        Self {
            id: self.id,
            connection: self.connection.clone(),
        }
    }
}

impl Drop for ImportRef {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.upgrade() {
            connection.release_import(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(i64);

    #[async_trait::async_trait]
    impl Server for Constant {
        async fn dispatch_call(
            &self,
            interface_id: u64,
            method_id: u16,
            context: &mut CallContext,
        ) -> Result<(), RpcError> {
            match method_id {
                0 => context.set(&self.0),
                _ => Err(unimplemented_method(interface_id, method_id)),
            }
        }
    }

    #[tokio::test]
    async fn test_local_call() {
        let cap = Capability::local(Constant(7));
        let results = cap.call(1, 0, Payload::new()).wait().await.unwrap();
        assert_eq!(results.get::<i64>().unwrap(), 7);
    }

    #[tokio::test]
    async fn test_local_unknown_method() {
        let cap = Capability::local(Constant(7));
        let error = cap.call(1, 9, Payload::new()).wait().await.unwrap_err();
        assert!(matches!(error, RpcError::Unimplemented { .. }));
        assert!(error.reason().contains("method 9"));
    }

    #[tokio::test]
    async fn test_broken_capability() {
        let cap = Capability::broken(RpcError::disconnected("closed"));
        assert!(cap.is_broken());
        assert!(cap.call(1, 0, Payload::new()).wait().await.unwrap_err().is_disconnected());
        assert!(cap.when_resolved().await.is_err());
    }

    #[tokio::test]
    async fn test_when_resolved_follows_promise() {
        let promise_cap = PromiseCap::new();
        let cap = Capability::Promise(Arc::clone(&promise_cap));
        let waiter = tokio::spawn({
            let cap = cap.clone();
            async move { cap.when_resolved().await }
        });

        promise_cap.resolve(Capability::local(Constant(1)));
        waiter.await.unwrap().unwrap();
        assert!(promise_cap.is_resolved());
    }

    #[test]
    fn test_debug_names_variant() {
        let cap = Capability::broken(RpcError::protocol("x"));
        assert!(format!("{cap:?}").starts_with("Broken"));
    }
}
