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

//! Call latency benchmarks for caprpc
//!
//! Measures:
//! - Local dispatch without a connection
//! - Round-trip latency of a single call over an in-memory transport
//! - Throughput of batches of concurrent calls
//! - Frame encoding of a `Call` message

use caprpc::arith::{ArithClient, ArithServer, ArithService, MultiplyParams};
use caprpc::rpc::message::{Message, WirePayload};
use caprpc::rpc::{Connection, ConnectionConfig, ExportId, QuestionId};
use caprpc::serialization::{Serializer, WireFormat, encode_content};
use caprpc::transport::MemoryTransport;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

/// Connects a client to an `Arith` server and resolves the bootstrap.
fn connect(rt: &tokio::runtime::Runtime) -> (Connection, Connection, ArithClient) {
    rt.block_on(async {
        let (client_side, server_side) = MemoryTransport::pair_default();
        let server = Connection::new(
            server_side,
            ConnectionConfig::new().with_bootstrap(ArithServer::capability(ArithService)),
        )
        .unwrap();
        let client = Connection::new(client_side, ConnectionConfig::new()).unwrap();
        let arith = ArithClient::new(client.bootstrap());
        arith.capability().when_resolved().await.unwrap();
        (client, server, arith)
    })
}

/// Benchmark dispatch on a local capability
fn bench_local_call(c: &mut Criterion) {
    let rt = runtime();
    let arith = ArithClient::new(ArithServer::capability(ArithService));

    c.bench_function("call_local", |b| {
        b.to_async(&rt).iter(|| async {
            let results = arith.multiply(black_box(2), black_box(32)).wait().await.unwrap();
            black_box(results.product)
        });
    });
}

/// Benchmark round-trip latency of one remote call
fn bench_roundtrip(c: &mut Criterion) {
    let rt = runtime();
    let (_client, _server, arith) = connect(&rt);

    c.bench_function("call_roundtrip", |b| {
        b.to_async(&rt).iter(|| async {
            let results = arith.divide(black_box(55), black_box(5)).wait().await.unwrap();
            black_box(results.quotient)
        });
    });
}

/// Benchmark batches of concurrent remote calls
fn bench_concurrent_calls(c: &mut Criterion) {
    let rt = runtime();
    let (_client, _server, arith) = connect(&rt);
    let mut group = c.benchmark_group("call_concurrent");

    for batch in [1u64, 16, 128] {
        group.throughput(Throughput::Elements(batch));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            b.to_async(&rt).iter(|| async {
                let promises: Vec<_> = (0..batch as i64).map(|i| arith.multiply(i, 3)).collect();
                for promise in &promises {
                    black_box(promise.wait().await.unwrap());
                }
            });
        });
    }

    group.finish();
}

/// Benchmark encoding a `Call` frame body
fn bench_encode_call(c: &mut Criterion) {
    let format = WireFormat::default();
    let message = Message::Call {
        question_id: QuestionId::new(42),
        target: ExportId::new(1),
        interface_id: caprpc::arith::ARITH_INTERFACE_ID,
        method_id: caprpc::arith::MULTIPLY_METHOD_ID,
        params: WirePayload {
            content: encode_content(&MultiplyParams { a: 2, b: 32 }).unwrap(),
            cap_table: Vec::new(),
        },
    };

    c.bench_function("encode_call", |b| {
        b.iter(|| format.serialize(black_box(&message)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_local_call,
    bench_roundtrip,
    bench_concurrent_calls,
    bench_encode_call
);
criterion_main!(benches);
