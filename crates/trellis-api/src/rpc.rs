//! Client for the graph RPC subsystem's echo endpoint.
//!
//! The wire format is one JSON object per line over a plain TCP connection:
//! a request names a method and its params, the response carries the result.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct RpcEchoClient {
    address: String,
}

#[derive(Debug, Deserialize)]
struct EchoResponse {
    text: String,
}

impl RpcEchoClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            address: format!("{host}:{port}"),
        }
    }

    /// Sends the text to the RPC subsystem and returns what it echoes back.
    /// A fresh connection per call; the subsystem treats connections as
    /// request-scoped.
    pub async fn echo(&self, text: &str) -> Result<String, ApiError> {
        let stream = TcpStream::connect(&self.address).await.map_err(|err| {
            ApiError::Upstream(format!("rpc connection to {} failed: {err}", self.address))
        })?;
        let mut stream = BufReader::new(stream);

        let request = json!({ "method": "echo", "params": { "text": text } });
        let mut line = serde_json::to_string(&request)
            .map_err(|err| ApiError::Upstream(format!("failed to encode rpc request: {err}")))?;
        line.push('\n');
        stream
            .get_mut()
            .write_all(line.as_bytes())
            .await
            .map_err(|err| ApiError::Upstream(format!("rpc write failed: {err}")))?;

        let mut response = String::new();
        stream
            .read_line(&mut response)
            .await
            .map_err(|err| ApiError::Upstream(format!("rpc read failed: {err}")))?;

        let echoed: EchoResponse = serde_json::from_str(response.trim_end())
            .map_err(|err| ApiError::Upstream(format!("malformed rpc response: {err}")))?;
        Ok(echoed.text)
    }
}

#[derive(Debug, Deserialize)]
pub struct EchoQuery {
    pub text: Option<String>,
}

/// `GET /rpc/echo?text=…`, registered only when the RPC subsystem is
/// enabled.
pub async fn echo(
    State(state): State<AppState>,
    Query(query): Query<EchoQuery>,
) -> Result<Json<Value>, ApiError> {
    let rpc = state
        .rpc
        .as_ref()
        .ok_or_else(|| ApiError::Upstream("rpc subsystem is not configured".to_string()))?;
    let text = query
        .text
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Query parameter \"text\" is required".to_string()))?;

    let echoed = rpc.echo(&text).await?;
    Ok(Json(json!({ "text": echoed })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn echo_round_trips_over_a_line_delimited_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut stream = BufReader::new(stream);
            let mut line = String::new();
            stream.read_line(&mut line).await.unwrap();

            let request: Value = serde_json::from_str(line.trim_end()).unwrap();
            assert_eq!(request["method"], "echo");

            let reply = json!({ "text": request["params"]["text"] });
            let mut reply = serde_json::to_string(&reply).unwrap();
            reply.push('\n');
            stream.get_mut().write_all(reply.as_bytes()).await.unwrap();
        });

        let client = RpcEchoClient::new("127.0.0.1", port);
        let echoed = client.echo("hello").await.unwrap();
        assert_eq!(echoed, "hello");
    }

    #[tokio::test]
    async fn unreachable_rpc_subsystem_is_an_upstream_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let client = RpcEchoClient::new("127.0.0.1", port);
        let err = client.echo("hello").await.unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
    }
}
