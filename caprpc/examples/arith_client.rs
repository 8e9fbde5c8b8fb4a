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

//! # Arith Client Example
//!
//! Connects to `arith_server`, obtains its bootstrap capability and issues
//! three concurrent calls:
//!
//! - `multiply(2, 32)`, which yields 64
//! - `divide(55, 0)`, which fails with "divide by zero"
//! - `divide(55, 5)`, which yields quotient 11, remainder 0
//!
//! The calls are made on the bootstrap capability before it has arrived;
//! they are pipelined behind the bootstrap request. The failed division does
//! not affect the other two.
//!
//! ## Running This Example
//!
//! ```bash
//! cargo run --example arith_client -- ./target/example.sock
//! ```

use caprpc::arith::ArithClient;
use caprpc::rpc::{Connection, ConnectionConfig};
use caprpc::transport::UnixTransport;
use std::error::Error;

const DEFAULT_SOCKET: &str = "./target/example.sock";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caprpc=info,arith_client=info".into()),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SOCKET.to_string());
    let transport = UnixTransport::connect(&path).await?;
    let connection = Connection::new(transport, ConnectionConfig::new().with_name("arith-client"))?;

    let arith = ArithClient::new(connection.bootstrap());
    let product = arith.multiply(2, 32);
    let by_zero = arith.divide(55, 0);
    let divided = arith.divide(55, 5);

    let (product, by_zero, divided) =
        tokio::join!(product.wait(), by_zero.wait(), divided.wait());

    match product {
        Ok(results) => tracing::info!(product = results.product, "multiply(2, 32)"),
        Err(error) => tracing::error!(error = %error, "multiply(2, 32) failed"),
    }
    match by_zero {
        Ok(results) => tracing::info!(
            quotient = results.quotient,
            remainder = results.remainder,
            "divide(55, 0)"
        ),
        Err(error) => tracing::info!(error = %error, "divide(55, 0) failed"),
    }
    match divided {
        Ok(results) => tracing::info!(
            quotient = results.quotient,
            remainder = results.remainder,
            "divide(55, 5)"
        ),
        Err(error) => tracing::error!(error = %error, "divide(55, 5) failed"),
    }

    connection.close().await;
    Ok(())
}
