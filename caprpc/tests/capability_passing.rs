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

//! Integration tests for passing capabilities between peers.
//!
//! Capabilities travel in call params and results. These tests check that
//! both sides agree on reference counts, that a capability sent back to its
//! host arrives as the original object, and that calls are relayed through a
//! third party.

use caprpc::arith::{ArithClient, ArithServer, ArithService};
use caprpc::capability::{CallContext, Capability, Payload, Server, unimplemented_method};
use caprpc::rpc::{Connection, ConnectionConfig};
use caprpc::RpcError;
use caprpc::transport::MemoryTransport;
use std::sync::Arc;
use std::time::Duration;

const FACTORY_INTERFACE_ID: u64 = 0x2f0e_77c4_91aa_3b05;
const NEW_ARITH: u16 = 0;
const CALL_BACK: u16 = 1;
const IS_LOCAL: u16 = 2;
const ECHO: u16 = 3;

/// Hands out a shared `Arith` capability and exercises capabilities it is
/// given.
struct Factory {
    arith: Capability,
}

#[async_trait::async_trait]
impl Server for Factory {
    async fn dispatch_call(
        &self,
        interface_id: u64,
        method_id: u16,
        context: &mut CallContext,
    ) -> Result<(), RpcError> {
        if interface_id != FACTORY_INTERFACE_ID {
            return Err(unimplemented_method(interface_id, method_id));
        }
        match method_id {
            NEW_ARITH => {
                context.results().add_cap(self.arith.clone());
                Ok(())
            }
            CALL_BACK => {
                let arith = ArithClient::new(context.params().cap(0)?);
                let product = arith.multiply(6, 7).wait().await?.product;
                context.set(&product)
            }
            IS_LOCAL => {
                let cap = context.params().cap(0)?;
                context.set(&matches!(cap, Capability::Local(_)))
            }
            ECHO => {
                let params = context.take_params();
                context.set_results(params);
                Ok(())
            }
            _ => Err(unimplemented_method(interface_id, method_id)),
        }
    }
}

fn factory() -> Capability {
    Capability::local(Factory {
        arith: ArithServer::capability(ArithService),
    })
}

fn connect(bootstrap: Capability) -> (Connection, Connection) {
    let (client_side, server_side) = MemoryTransport::pair_default();
    let server = Connection::new(
        server_side,
        ConnectionConfig::new().with_name("server").with_bootstrap(bootstrap),
    )
    .unwrap();
    let client = Connection::new(client_side, ConnectionConfig::new().with_name("client")).unwrap();
    (client, server)
}

/// Polls `check` until it holds; releases travel asynchronously.
async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never became true");
}

fn same_server(a: &Capability, b: &Capability) -> bool {
    match (a, b) {
        (Capability::Local(a), Capability::Local(b)) => {
            Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
        }
        _ => false,
    }
}

#[tokio::test]
async fn test_bootstrap_reference_counts() {
    let (client, server) = connect(factory());

    let first = client.bootstrap();
    first.when_resolved().await.unwrap();
    assert_eq!(client.stats().imports, 1);
    assert_eq!(server.stats().exports, 1);

    // A second bootstrap refers to the same export.
    let second = client.bootstrap();
    second.when_resolved().await.unwrap();
    assert_eq!(client.stats().imports, 1);
    assert_eq!(server.stats().exports, 1);

    drop(first);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(server.stats().exports, 1);

    drop(second);
    eventually(|| client.stats().imports == 0).await;
    eventually(|| server.stats().exports == 0).await;
    assert!(client.metrics().snapshot().releases_sent >= 1);
}

#[tokio::test]
async fn test_returned_capability_is_released() {
    let (client, server) = connect(factory());
    let factory = client.bootstrap();

    let mut promise = factory.call(FACTORY_INTERFACE_ID, NEW_ARITH, Payload::new());
    let results = promise.wait().await.unwrap();
    let arith = ArithClient::new(results.cap(0).unwrap());
    assert_eq!(arith.multiply(3, 4).wait().await.unwrap().product, 12);
    assert_eq!(server.stats().exports, 2);
    assert_eq!(client.stats().imports, 2);

    drop(results);
    promise.release();
    promise.release();
    assert!(promise.is_released());
    assert!(promise.wait().await.is_err());
    drop(arith);

    eventually(|| server.stats().exports == 1).await;
    eventually(|| client.stats().imports == 1).await;

    // The connection and the factory stay usable.
    let promise = factory.call(FACTORY_INTERFACE_ID, NEW_ARITH, Payload::new());
    let arith = ArithClient::new(promise.pipeline(0));
    assert_eq!(arith.multiply(5, 5).wait().await.unwrap().product, 25);
}

#[tokio::test]
async fn test_pipelined_call_on_returned_capability() {
    let (client, _server) = connect(factory());
    let factory = client.bootstrap();

    // Nothing is awaited before the second call is made.
    let promise = factory.call(FACTORY_INTERFACE_ID, NEW_ARITH, Payload::new());
    let arith = ArithClient::new(promise.pipeline(0));
    let divided = arith.divide(55, 5);
    let by_zero = arith.divide(1, 0);

    let divided = divided.wait().await.unwrap();
    assert_eq!((divided.quotient, divided.remainder), (11, 0));
    assert_eq!(by_zero.wait().await.unwrap_err().reason(), "divide by zero");
}

#[tokio::test]
async fn test_pipelining_on_a_failed_call() {
    let (client, _server) = connect(factory());
    let factory = client.bootstrap();

    let promise = factory.call(FACTORY_INTERFACE_ID, 99, Payload::new());
    let arith = ArithClient::new(promise.pipeline(0));
    let error = arith.multiply(1, 2).wait().await.unwrap_err();
    assert!(matches!(error, RpcError::Unimplemented { .. }));
}

#[tokio::test]
async fn test_server_calls_back_into_client() {
    let (client, server) = connect(factory());
    let factory = client.bootstrap();

    let local = ArithServer::capability(ArithService);
    let params = Payload::new().with_cap(local.clone());
    let results = factory
        .call(FACTORY_INTERFACE_ID, CALL_BACK, params)
        .wait()
        .await
        .unwrap();
    assert_eq!(results.get::<i64>().unwrap(), 42);

    assert_eq!(server.metrics().calls_sent(), 1);
    assert_eq!(client.metrics().calls_received(), 1);
    eventually(|| client.stats().exports == 0).await;
    eventually(|| server.stats().imports == 0).await;
    assert_eq!(client.stats().imports, 1);
}

#[tokio::test]
async fn test_capability_returns_home_as_the_original() {
    let (client, _server) = connect(factory());
    let factory = client.bootstrap();

    let local = ArithServer::capability(ArithService);
    let params = Payload::new().with_cap(local.clone());
    let results = factory
        .call(FACTORY_INTERFACE_ID, ECHO, params)
        .wait()
        .await
        .unwrap();

    let echoed = results.cap(0).unwrap();
    assert!(same_server(&echoed, &local));
    drop(results);
    drop(echoed);
    eventually(|| client.stats().exports == 0).await;
}

#[tokio::test]
async fn test_host_sees_its_own_capability_as_local() {
    let (client, _server) = connect(factory());
    let factory = client.bootstrap();
    factory.when_resolved().await.unwrap();

    let is_local = |cap: Capability| {
        let promise = factory.call(FACTORY_INTERFACE_ID, IS_LOCAL, Payload::new().with_cap(cap));
        async move { promise.wait().await.unwrap().get::<bool>().unwrap() }
    };

    let arith = factory
        .call(FACTORY_INTERFACE_ID, NEW_ARITH, Payload::new())
        .wait()
        .await
        .unwrap()
        .cap(0)
        .unwrap();
    assert!(matches!(arith, Capability::Import(_)));
    assert!(is_local(arith).await);

    // A resolved promise capability is sent as its target.
    assert!(is_local(factory.clone()).await);

    // A capability hosted here is not local to the server.
    assert!(!is_local(ArithServer::capability(ArithService)).await);
}

#[tokio::test]
async fn test_broken_and_missing_capabilities() {
    let (client, _server) = connect(factory());
    let factory = client.bootstrap();

    let mut params = Payload::new();
    params.add_cap(Capability::broken(RpcError::application("unused")));
    let results = factory
        .call(FACTORY_INTERFACE_ID, ECHO, params)
        .wait()
        .await
        .unwrap();
    // The broken capability was forwarded and comes back as a working handle
    // whose calls fail with the original error.
    let echoed = results.cap(0).unwrap();
    let error = echoed.call(1, 0, Payload::new()).wait().await.unwrap_err();
    assert_eq!(error.reason(), "unused");

    let error = factory
        .call(FACTORY_INTERFACE_ID, IS_LOCAL, Payload::new())
        .wait()
        .await
        .unwrap_err();
    assert!(error.is_protocol_error());
}

#[tokio::test]
async fn test_three_party_relay() {
    // backend <-> middle
    let (middle_side, backend_side) = MemoryTransport::pair_default();
    let backend = Connection::new(
        backend_side,
        ConnectionConfig::new()
            .with_name("backend")
            .with_bootstrap(ArithServer::capability(ArithService)),
    )
    .unwrap();
    let middle_to_backend =
        Connection::new(middle_side, ConnectionConfig::new().with_name("middle")).unwrap();

    // middle <-> client; middle offers the backend's capability as its own.
    let (client, middle_to_client) = connect(middle_to_backend.bootstrap());

    let arith = ArithClient::new(client.bootstrap());
    assert_eq!(arith.multiply(2, 32).wait().await.unwrap().product, 64);
    let error = arith.divide(55, 0).wait().await.unwrap_err();
    assert!(error.is_application_error());
    assert_eq!(error.reason(), "divide by zero");

    assert_eq!(middle_to_client.metrics().calls_received(), 2);
    assert_eq!(middle_to_backend.metrics().calls_sent(), 2);
    assert_eq!(backend.metrics().calls_received(), 2);

    // Losing the backend breaks relayed calls but not the client connection.
    backend.close().await;
    middle_to_backend.done().await;
    let error = arith.multiply(1, 1).wait().await.unwrap_err();
    assert!(error.is_disconnected());
    assert!(client.state().is_open());
}
