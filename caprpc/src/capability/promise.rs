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

//! Resolve-once result slots and pipelined capabilities.
//!
//! A [`Promise`] is handed back by every call immediately. The connection
//! (or, for local calls, the dispatching task) writes its outcome exactly once
//! through the paired [`Resolver`]. Any number of tasks may wait on it.
//!
//! [`PromiseCap`] is the capability side of the same idea: a capability whose
//! target is not known yet. Calls made on it are queued and replayed, in
//! order, against the capability it eventually resolves to.

use crate::RpcError;
use crate::capability::{Capability, Payload};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::watch;

pub(crate) type Outcome = Result<Results, RpcError>;

type Slot = watch::Receiver<Option<Outcome>>;

/// Results of a completed call.
///
/// Cheap to clone; all clones share one payload. Capabilities inside are
/// released when the last clone (and the promise it came from) is dropped.
#[derive(Clone, Debug)]
pub struct Results {
    payload: Arc<Payload>,
}

impl Results {
    pub(crate) fn new(payload: Payload) -> Self {
        Self {
            payload: Arc::new(payload),
        }
    }

    /// Decodes the result content.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Deserialization`] if the content does not match `T`.
    pub fn get<T>(&self) -> Result<T, RpcError>
    where
        T: DeserializeOwned,
    {
        self.payload.get()
    }

    /// Returns a new handle to the capability at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Protocol`] if the slot is out of range or empty.
    pub fn cap(&self, index: u32) -> Result<Capability, RpcError> {
        self.payload.cap(index)
    }

    /// Number of capability slots in the results.
    pub fn cap_count(&self) -> usize {
        self.payload.cap_count()
    }

    /// The underlying payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

/// Write side of a [`Promise`].
///
/// Dropping a resolver without resolving it makes waiters fail with
/// [`RpcError::Disconnected`].
pub(crate) struct Resolver {
    slot: watch::Sender<Option<Outcome>>,
}

impl Resolver {
    pub(crate) fn resolve(self, outcome: Outcome) {
        // No receivers left: the outcome is dropped here, which releases any
        // capabilities it carried.
        let _ = self.slot.send(Some(outcome));
    }
}

fn released() -> RpcError {
    RpcError::protocol("promise was already released")
}

fn abandoned() -> RpcError {
    RpcError::disconnected("call was abandoned before it returned")
}

/// Caller-side handle for the outcome of one call.
///
/// Waiting is cancel-safe: dropping a pending [`wait`](Self::wait) future has
/// no effect on the call or the connection. Dropping the promise itself (or
/// calling [`release`](Self::release)) gives up the caller's hold on the
/// results.
///
/// ```rust
/// use caprpc::capability::{Capability, Payload};
/// use caprpc::arith::{ArithService, ARITH_INTERFACE_ID, MultiplyParams, MultiplyResults};
///
/// # async fn example() -> Result<(), caprpc::RpcError> {
/// let arith = Capability::local(caprpc::arith::ArithServer::new(ArithService));
/// let params = Payload::encode(&MultiplyParams { a: 2, b: 32 })?;
/// let mut promise = arith.call(ARITH_INTERFACE_ID, 0, params);
/// let results: MultiplyResults = promise.wait().await?.get()?;
/// assert_eq!(results.product, 64);
/// promise.release();
/// promise.release();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Promise {
    slot: Option<Slot>,
}

impl Promise {
    pub(crate) fn channel() -> (Resolver, Promise) {
        let (sender, receiver) = watch::channel(None);
        (Resolver { slot: sender }, Promise { slot: Some(receiver) })
    }

    pub(crate) fn resolved(outcome: Outcome) -> Self {
        let (resolver, promise) = Self::channel();
        resolver.resolve(outcome);
        promise
    }

    /// A promise that has already failed with `error`.
    pub fn from_error(error: RpcError) -> Self {
        Self::resolved(Err(error))
    }

    /// Waits for the outcome.
    ///
    /// # Errors
    ///
    /// Returns the error the call failed with, [`RpcError::Disconnected`] if
    /// the connection went away first, or [`RpcError::Protocol`] if the promise
    /// was released.
    pub async fn wait(&self) -> Result<Results, RpcError> {
        let Some(slot) = &self.slot else {
            return Err(released());
        };
        let mut slot = slot.clone();
        match slot.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone().unwrap_or_else(|| Err(abandoned())),
            Err(_) => Err(abandoned()),
        }
    }

    /// Returns the outcome if it is already known.
    pub fn try_get(&self) -> Option<Result<Results, RpcError>> {
        match &self.slot {
            Some(slot) => (*slot.borrow()).clone(),
            None => Some(Err(released())),
        }
    }

    /// Returns `true` once an outcome is available.
    pub fn is_resolved(&self) -> bool {
        self.slot
            .as_ref()
            .is_some_and(|slot| slot.borrow().is_some())
    }

    /// Returns a capability for slot `index` of the eventual results.
    ///
    /// Calls on it are queued until the results arrive and then replayed
    /// against the real capability. If the call fails, so do they.
    pub fn pipeline(&self, index: u32) -> Capability {
        let Some(slot) = self.slot.clone() else {
            return Capability::Broken(released());
        };

        if let Some(outcome) = self.try_get() {
            return match outcome {
                Ok(results) => results.cap(index).unwrap_or_else(Capability::Broken),
                Err(error) => Capability::Broken(error),
            };
        }

        let promise_cap = PromiseCap::new();
        let target = Arc::clone(&promise_cap);
        tokio::spawn(async move {
            let pending = Promise { slot: Some(slot) };
            let resolution = match pending.wait().await {
                Ok(results) => results.cap(index).unwrap_or_else(Capability::Broken),
                Err(error) => Capability::Broken(error),
            };
            drop(pending);
            target.resolve(resolution);
        });
        Capability::Promise(promise_cap)
    }

    /// Drops the caller's hold on the outcome. Safe to call repeatedly.
    pub fn release(&mut self) {
        self.slot.take();
    }

    /// Returns `true` after [`release`](Self::release).
    pub fn is_released(&self) -> bool {
        self.slot.is_none()
    }
}

/// A [`Promise`] whose results decode to `T`.
#[derive(Debug)]
pub struct TypedPromise<T> {
    promise: Promise,
    _results: PhantomData<fn() -> T>,
}

impl<T> TypedPromise<T>
where
    T: DeserializeOwned,
{
    /// Wraps an untyped promise.
    pub fn new(promise: Promise) -> Self {
        Self {
            promise,
            _results: PhantomData,
        }
    }

    /// Waits for and decodes the results.
    ///
    /// # Errors
    ///
    /// See [`Promise::wait`]; additionally fails with
    /// [`RpcError::Deserialization`] if the results do not decode as `T`.
    pub async fn wait(&self) -> Result<T, RpcError> {
        self.promise.wait().await?.get()
    }

    /// Returns the decoded results if they are already known.
    pub fn try_get(&self) -> Option<Result<T, RpcError>> {
        self.promise
            .try_get()
            .map(|outcome| outcome.and_then(|results| results.get()))
    }

    /// See [`Promise::pipeline`].
    pub fn pipeline(&self, index: u32) -> Capability {
        self.promise.pipeline(index)
    }

    /// See [`Promise::release`].
    pub fn release(&mut self) {
        self.promise.release();
    }

    /// Returns the untyped promise.
    pub fn into_inner(self) -> Promise {
        self.promise
    }
}

struct QueuedCall {
    interface_id: u64,
    method_id: u16,
    params: Payload,
    resolver: Resolver,
}

enum PromiseState {
    Pending(Vec<QueuedCall>),
    Resolved(Capability),
}

/// A capability whose target is not known yet.
pub struct PromiseCap {
    state: Mutex<PromiseState>,
    resolved: watch::Sender<bool>,
}

impl PromiseCap {
    pub(crate) fn new() -> Arc<Self> {
        let (resolved, _) = watch::channel(false);
        Arc::new(Self {
            state: Mutex::new(PromiseState::Pending(Vec::new())),
            resolved,
        })
    }

    /// Returns `true` once the target is known.
    pub fn is_resolved(&self) -> bool {
        *self.resolved.borrow()
    }

    /// Number of calls waiting for resolution.
    pub fn queued_calls(&self) -> usize {
        match &*self.state.lock() {
            PromiseState::Pending(queue) => queue.len(),
            PromiseState::Resolved(_) => 0,
        }
    }

    pub(crate) fn call(&self, interface_id: u64, method_id: u16, params: Payload) -> Promise {
        let mut state = self.state.lock();
        match &mut *state {
            PromiseState::Pending(queue) => {
                let (resolver, promise) = Promise::channel();
                queue.push(QueuedCall {
                    interface_id,
                    method_id,
                    params,
                    resolver,
                });
                promise
            }
            PromiseState::Resolved(target) => {
                let target = target.clone();
                drop(state);
                target.call(interface_id, method_id, params)
            }
        }
    }

    /// Settles the target and replays queued calls against it in the order
    /// they were made. Only the first resolution counts.
    pub(crate) fn resolve(&self, target: Capability) {
        let mut state = self.state.lock();
        let queued = match &mut *state {
            PromiseState::Pending(queue) => std::mem::take(queue),
            PromiseState::Resolved(_) => return,
        };

        tracing::trace!(queued = queued.len(), "Promise capability resolved");
        for call in queued {
            let promise = target.call(call.interface_id, call.method_id, call.params);
            forward(promise, call.resolver);
        }
        *state = PromiseState::Resolved(target);
        drop(state);
        self.resolved.send_replace(true);
    }

    /// The target, once known.
    pub(crate) fn target(&self) -> Option<Capability> {
        match &*self.state.lock() {
            PromiseState::Resolved(target) => Some(target.clone()),
            PromiseState::Pending(_) => None,
        }
    }

    /// Waits for the target and returns a handle to it.
    pub(crate) async fn resolution(&self) -> Capability {
        let mut resolved = self.resolved.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = resolved.wait_for(|done| *done).await;
        match &*self.state.lock() {
            PromiseState::Resolved(target) => target.clone(),
            PromiseState::Pending(_) => Capability::Broken(abandoned()),
        }
    }
}

impl std::fmt::Debug for PromiseCap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromiseCap")
            .field("resolved", &self.is_resolved())
            .field("queued_calls", &self.queued_calls())
            .finish()
    }
}

fn forward(promise: Promise, resolver: Resolver) {
    if let Some(outcome) = promise.try_get() {
        resolver.resolve(outcome);
        return;
    }
    tokio::spawn(async move {
        let outcome = promise.wait().await;
        resolver.resolve(outcome);
    });
}
