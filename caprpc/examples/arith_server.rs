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

//! # Arith Server Example
//!
//! Serves the `Arith` interface as the bootstrap capability on a Unix domain
//! socket. Every accepted client gets its own connection; the same
//! implementation is shared between them.
//!
//! ## Running This Example
//!
//! ```bash
//! cargo run --example arith_server -- ./target/example.sock
//! ```
//!
//! Then, in another terminal:
//!
//! ```bash
//! cargo run --example arith_client -- ./target/example.sock
//! ```

use caprpc::arith::{ArithServer, ArithService};
use caprpc::rpc::{Connection, ConnectionConfig};
use caprpc::transport::{TransportListener, UnixTransport};
use std::error::Error;

const DEFAULT_SOCKET: &str = "./target/example.sock";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caprpc=info,arith_server=info".into()),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SOCKET.to_string());
    let listener = UnixTransport::bind(&path).await?;
    tracing::info!(path = %path, "Listening");

    let arith = ArithServer::capability(ArithService);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let transport = match accepted {
                    Ok(transport) => transport,
                    Err(error) => {
                        tracing::warn!(error = %error, "Accept failed");
                        continue;
                    }
                };
                let config = ConnectionConfig::new().with_bootstrap(arith.clone());
                let connection = Connection::new(transport, config)?;
                tracing::info!(connection = %connection.name(), "Client connected");
                tokio::spawn(async move {
                    connection.done().await;
                    let metrics = connection.metrics().snapshot();
                    tracing::info!(
                        connection = %connection.name(),
                        calls = metrics.calls_received,
                        exceptions = metrics.exceptions_sent,
                        "Client disconnected"
                    );
                });
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    if let Err(error) = listener.close().await {
        tracing::warn!(path = %path, error = %error, "Socket cleanup failed");
    }
    Ok(())
}
