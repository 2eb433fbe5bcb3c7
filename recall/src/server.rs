//! Line-oriented TCP delivery of chart data.
//!
//! Each request is one line (`charts` or `events`) and gets one line of JSON
//! back. Failures are answered with `{"error": ...}` and the connection stays
//! open for the next request, except after a line longer than
//! [`MAX_REQUEST_LEN`], which is refused and closes the connection.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use vcs_activity_common::StoreError;

use crate::query_engine::QueryEngine;

/// Longest accepted request line, newline excluded.
pub const MAX_REQUEST_LEN: usize = 1024;

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Source of incoming connections.
#[async_trait]
pub trait Acceptor: Send + Sync {
    async fn accept(&self) -> std::io::Result<(TcpStream, SocketAddr)>;
}

#[async_trait]
impl Acceptor for TcpListener {
    async fn accept(&self) -> std::io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

/// Serves connections until the task is dropped. Only a listener without a
/// local address makes it return.
pub async fn serve(listener: TcpListener, engine: QueryEngine) -> std::io::Result<()> {
    info!("Recall listening on {}", listener.local_addr()?);
    accept_loop(&listener, engine).await
}

async fn accept_loop<A: Acceptor>(acceptor: &A, engine: QueryEngine) -> std::io::Result<()> {
    loop {
        let (socket, peer) = match acceptor.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                // EMFILE, ECONNABORTED and the like are retried, never fatal.
                error!("Failed to accept connection: {}", e);
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };
        debug!("Connection from {}", peer);

        let engine = engine.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, &engine).await {
                warn!("Connection from {} ended with error: {}", peer, e);
            }
        });
    }
}

async fn handle_client(socket: TcpStream, engine: &QueryEngine) -> std::io::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let read = (&mut reader)
            .take(MAX_REQUEST_LEN as u64 + 1)
            .read_line(&mut line)
            .await?;
        if read == 0 {
            break;
        }

        let request = line.trim_end_matches(['\r', '\n']);
        if request.len() > MAX_REQUEST_LEN {
            warn!("Closing connection after a request longer than {} bytes", MAX_REQUEST_LEN);
            let body = json!({ "error": format!("request longer than {MAX_REQUEST_LEN} bytes") });
            writer.write_all(format!("{body}\n").as_bytes()).await?;
            break;
        }

        let request = request.trim();
        if request.is_empty() {
            continue;
        }

        let mut response = handle_request(engine, request).await.to_string();
        response.push('\n');
        writer.write_all(response.as_bytes()).await?;
    }

    Ok(())
}

/// Answers one request line.
pub async fn handle_request(engine: &QueryEngine, request: &str) -> Value {
    let result = match request.to_ascii_lowercase().as_str() {
        "charts" => engine.chart_data().await.map(|chart| json!(chart)),
        "events" => engine.get_events().await.map(|events| json!(events)),
        _ => {
            return json!({ "error": format!("unknown request '{request}'; expected 'charts' or 'events'") })
        }
    };

    match result {
        Ok(body) => body,
        Err(e) => error_body(&e),
    }
}

fn error_body(e: &StoreError) -> Value {
    match e {
        StoreError::ContainerNotFound(_) => {
            warn!("{}", e);
            json!({ "error": e.to_string(), "kind": "container_not_found" })
        }
        _ => {
            error!("Query failed: {}", e);
            json!({ "error": e.to_string() })
        }
    }
}
