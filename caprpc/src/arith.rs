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

//! The `Arith` interface: integer multiply and divide.
//!
//! The reference payload used to exercise the protocol end to end. The
//! method contract is fixed:
//!
//! | Method | Id | Params            | Results                 |
//! |--------|----|-------------------|-------------------------|
//! | multiply | 0 | `a: i64, b: i64` | `product: i64`          |
//! | divide   | 1 | `num, denom: i64`| `quotient, remainder`   |
//!
//! Server side, implement [`Arith`] and wrap it in an [`ArithServer`]; client
//! side, wrap any capability in an [`ArithClient`].

use crate::RpcError;
use crate::capability::{
    CallContext, Capability, Payload, Server, TypedPromise, unimplemented_method,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Interface id of `Arith`.
pub const ARITH_INTERFACE_ID: u64 = 0x9a5c_1b6e_4d27_f3a1;

/// Method id of `multiply`.
pub const MULTIPLY_METHOD_ID: u16 = 0;

/// Method id of `divide`.
pub const DIVIDE_METHOD_ID: u16 = 1;

/// Parameters of `multiply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplyParams {
    /// Left operand
    pub a: i64,
    /// Right operand
    pub b: i64,
}

/// Results of `multiply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplyResults {
    /// `a * b`, wrapping on overflow
    pub product: i64,
}

/// Parameters of `divide`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivideParams {
    /// Dividend
    pub num: i64,
    /// Divisor
    pub denom: i64,
}

/// Results of `divide`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivideResults {
    /// Quotient, truncated toward zero
    pub quotient: i64,
    /// `num - quotient * denom`
    pub remainder: i64,
}

/// Server side of the `Arith` interface.
#[async_trait]
pub trait Arith: Send + Sync + 'static {
    /// Multiplies two integers.
    async fn multiply(&self, params: MultiplyParams) -> Result<MultiplyResults, RpcError>;

    /// Divides two integers.
    async fn divide(&self, params: DivideParams) -> Result<DivideResults, RpcError>;
}

/// Adapts an [`Arith`] implementation to the generic [`Server`] dispatch.
pub struct ArithServer<T> {
    inner: T,
}

impl<T> ArithServer<T>
where
    T: Arith,
{
    /// Wraps `inner`.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Wraps `inner` and returns a capability for it.
    pub fn capability(inner: T) -> Capability {
        Capability::local(Self::new(inner))
    }
}

#[async_trait]
impl<T> Server for ArithServer<T>
where
    T: Arith,
{
    async fn dispatch_call(
        &self,
        interface_id: u64,
        method_id: u16,
        context: &mut CallContext,
    ) -> Result<(), RpcError> {
        if interface_id != ARITH_INTERFACE_ID {
            return Err(unimplemented_method(interface_id, method_id));
        }
        match method_id {
            MULTIPLY_METHOD_ID => {
                let results = self.inner.multiply(context.get()?).await?;
                context.set(&results)
            }
            DIVIDE_METHOD_ID => {
                let results = self.inner.divide(context.get()?).await?;
                context.set(&results)
            }
            _ => Err(unimplemented_method(interface_id, method_id)),
        }
    }
}

/// The reference implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArithService;

#[async_trait]
impl Arith for ArithService {
    async fn multiply(&self, params: MultiplyParams) -> Result<MultiplyResults, RpcError> {
        Ok(MultiplyResults {
            product: params.a.wrapping_mul(params.b),
        })
    }

    async fn divide(&self, params: DivideParams) -> Result<DivideResults, RpcError> {
        if params.denom == 0 {
            return Err(RpcError::application("divide by zero"));
        }
        // Rust's `/` truncates toward zero; wrapping covers i64::MIN / -1.
        Ok(DivideResults {
            quotient: params.num.wrapping_div(params.denom),
            remainder: params.num.wrapping_rem(params.denom),
        })
    }
}

/// Typed client for an `Arith` capability.
///
/// ```rust
/// use caprpc::arith::{ArithClient, ArithServer, ArithService};
///
/// # async fn example() -> Result<(), caprpc::RpcError> {
/// let arith = ArithClient::new(ArithServer::capability(ArithService));
/// let divided = arith.divide(55, 5).wait().await?;
/// assert_eq!((divided.quotient, divided.remainder), (11, 0));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ArithClient {
    cap: Capability,
}

impl ArithClient {
    /// Wraps a capability expected to implement `Arith`.
    pub fn new(cap: Capability) -> Self {
        Self { cap }
    }

    /// The wrapped capability.
    pub fn capability(&self) -> &Capability {
        &self.cap
    }

    /// Calls `multiply`.
    pub fn multiply(&self, a: i64, b: i64) -> TypedPromise<MultiplyResults> {
        self.call(MULTIPLY_METHOD_ID, &MultiplyParams { a, b })
    }

    /// Calls `divide`.
    pub fn divide(&self, num: i64, denom: i64) -> TypedPromise<DivideResults> {
        self.call(DIVIDE_METHOD_ID, &DivideParams { num, denom })
    }

    fn call<P, R>(&self, method_id: u16, params: &P) -> TypedPromise<R>
    where
        P: Serialize,
        R: serde::de::DeserializeOwned,
    {
        let promise = match Payload::encode(params) {
            Ok(params) => self.cap.call(ARITH_INTERFACE_ID, method_id, params),
            Err(error) => crate::capability::Promise::from_error(error),
        };
        TypedPromise::new(promise)
    }
}
