// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC client for native balance queries.
//!
//! Issues a single `eth_getBalance` call per request and classifies every
//! failure. The client never touches metrics; the poller decides what to
//! count.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default per-request timeout.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: (&'a str, &'static str),
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Errors returned by a single balance query.
#[derive(Debug, thiserror::Error)]
pub enum RpcClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Network(String),

    #[error("endpoint returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("invalid JSON-RPC response body: {0}")]
    JsonDecode(String),

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("response has no result")]
    MissingResult,

    #[error("result is not a hex string: {0}")]
    InvalidResult(String),
}

/// `eth_getBalance` client shared by every poll target.
///
/// Cheap to clone: the HTTP connection pool and request id counter are shared.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: Client,
    timeout: Duration,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    /// Create a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, RpcClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RpcClientError::Build(e.to_string()))?;

        Ok(Self {
            http,
            timeout,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Query the latest native balance of `address` at `rpc_url`.
    ///
    /// Returns the raw `0x`-prefixed hex quantity from the `result` field.
    pub async fn fetch_balance(
        &self,
        rpc_url: &str,
        address: &str,
    ) -> Result<String, RpcClientError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: "eth_getBalance",
            params: (address, "latest"),
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = self
            .http
            .post(rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RpcClientError::HttpStatus {
                status: status.as_u16(),
                body: truncate(&body, 256),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        parse_balance_response(&body)
    }

    fn classify_transport_error(&self, error: reqwest::Error) -> RpcClientError {
        if error.is_timeout() {
            RpcClientError::Timeout(self.timeout)
        } else {
            RpcClientError::Network(error.to_string())
        }
    }
}

/// Extract the balance quantity from a JSON-RPC response body.
fn parse_balance_response(body: &[u8]) -> Result<String, RpcClientError> {
    let response: JsonRpcResponse =
        serde_json::from_slice(body).map_err(|e| RpcClientError::JsonDecode(e.to_string()))?;

    // Providers disagree on the error shape; any non-null `error` counts.
    if let Some(error) = response.error.filter(|e| !e.is_null()) {
        return Err(rpc_error(&error));
    }

    match response.result {
        None | Some(Value::Null) => Err(RpcClientError::MissingResult),
        Some(Value::String(hex)) => Ok(hex),
        Some(other) => Err(RpcClientError::InvalidResult(truncate(&other.to_string(), 64))),
    }
}

/// Build an [`RpcClientError::Rpc`] from a loosely shaped error member.
fn rpc_error(error: &Value) -> RpcClientError {
    let code = match error.get("code") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    let message = match error {
        Value::String(s) => s.clone(),
        Value::Object(fields) => match fields.get("message") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => truncate(&other.to_string(), 256),
            None => truncate(&error.to_string(), 256),
        },
        other => truncate(&other.to_string(), 256),
    };

    RpcClientError::Rpc {
        code,
        message: if message.is_empty() {
            "Unknown RPC error".to_string()
        } else {
            message
        },
    }
}

fn truncate(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &value[..idx]),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    const ADDRESS: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

    /// Serve `router` on an ephemeral local port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client() -> RpcClient {
        RpcClient::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn returns_result_and_sends_standard_request() {
        let url = serve(Router::new().route(
            "/",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["jsonrpc"], "2.0");
                assert_eq!(body["method"], "eth_getBalance");
                assert_eq!(body["params"], json!([ADDRESS, "latest"]));
                Json(json!({"jsonrpc": "2.0", "id": body["id"], "result": "0xde0b6b3a7640000"}))
            }),
        ))
        .await;

        let hex = client().fetch_balance(&url, ADDRESS).await.unwrap();
        assert_eq!(hex, "0xde0b6b3a7640000");
    }

    #[tokio::test]
    async fn request_ids_increase() {
        let url = serve(Router::new().route(
            "/",
            post(|Json(body): Json<Value>| async move {
                let id = body["id"].as_u64().unwrap();
                Json(json!({"jsonrpc": "2.0", "id": id, "result": format!("{id:#x}")}))
            }),
        ))
        .await;

        let client = client();
        let first = client.fetch_balance(&url, ADDRESS).await.unwrap();
        let second = client.fetch_balance(&url, ADDRESS).await.unwrap();
        assert_eq!(first, "0x1");
        assert_eq!(second, "0x2");
    }

    #[tokio::test]
    async fn rpc_error_object_is_classified() {
        let url = serve(Router::new().route(
            "/",
            post(|| async {
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": {"code": -32602, "message": "invalid argument 0"}
                }))
            }),
        ))
        .await;

        let err = client().fetch_balance(&url, ADDRESS).await.unwrap_err();
        match err {
            RpcClientError::Rpc { code, message } => {
                assert_eq!(code, -32602);
                assert_eq!(message, "invalid argument 0");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_success_status_is_classified() {
        let url = serve(Router::new().route(
            "/",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        ))
        .await;

        let err = client().fetch_balance(&url, ADDRESS).await.unwrap_err();
        match err {
            RpcClientError::HttpStatus { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_classified() {
        let url = serve(Router::new().route("/", post(|| async { "<html>bad gateway</html>" }))).await;

        let err = client().fetch_balance(&url, ADDRESS).await.unwrap_err();
        assert!(matches!(err, RpcClientError::JsonDecode(_)), "{err:?}");
    }

    #[tokio::test]
    async fn timeout_is_classified() {
        let url = serve(Router::new().route(
            "/",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({"jsonrpc": "2.0", "id": 1, "result": "0x0"}))
            }),
        ))
        .await;

        let client = RpcClient::new(Duration::from_millis(100)).unwrap();
        let err = client.fetch_balance(&url, ADDRESS).await.unwrap_err();
        assert!(matches!(err, RpcClientError::Timeout(_)), "{err:?}");
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client()
            .fetch_balance(&format!("http://{addr}"), ADDRESS)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcClientError::Network(_)), "{err:?}");
    }

    #[test]
    fn missing_and_null_results() {
        assert!(matches!(
            parse_balance_response(br#"{"jsonrpc":"2.0","id":1}"#),
            Err(RpcClientError::MissingResult)
        ));
        assert!(matches!(
            parse_balance_response(br#"{"jsonrpc":"2.0","id":1,"result":null}"#),
            Err(RpcClientError::MissingResult)
        ));
    }

    #[test]
    fn non_string_result_is_invalid() {
        assert!(matches!(
            parse_balance_response(br#"{"jsonrpc":"2.0","id":1,"result":12}"#),
            Err(RpcClientError::InvalidResult(_))
        ));
    }

    #[test]
    fn error_wins_over_result() {
        let err = parse_balance_response(
            br#"{"jsonrpc":"2.0","id":1,"result":"0x1","error":{"code":-32000,"message":"header not found"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RpcClientError::Rpc { code: -32000, .. }));
    }

    #[test]
    fn loosely_shaped_errors_are_rpc_errors() {
        match parse_balance_response(br#"{"jsonrpc":"2.0","id":1,"error":{"message":"rate limited"}}"#) {
            Err(RpcClientError::Rpc { code, message }) => {
                assert_eq!(code, 0);
                assert_eq!(message, "rate limited");
            }
            other => panic!("unexpected: {other:?}"),
        }

        match parse_balance_response(br#"{"jsonrpc":"2.0","id":1,"error":"rate limited"}"#) {
            Err(RpcClientError::Rpc { code, message }) => {
                assert_eq!(code, 0);
                assert_eq!(message, "rate limited");
            }
            other => panic!("unexpected: {other:?}"),
        }

        match parse_balance_response(
            br#"{"jsonrpc":"2.0","id":1,"error":{"code":"-32005","message":"limit exceeded"}}"#,
        ) {
            Err(RpcClientError::Rpc { code, message }) => {
                assert_eq!(code, -32005);
                assert_eq!(message, "limit exceeded");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn error_without_message_falls_back() {
        match parse_balance_response(br#"{"jsonrpc":"2.0","id":1,"error":""}"#) {
            Err(RpcClientError::Rpc { message, .. }) => assert_eq!(message, "Unknown RPC error"),
            other => panic!("unexpected: {other:?}"),
        }
        match parse_balance_response(br#"{"jsonrpc":"2.0","id":1,"error":{"code":-1}}"#) {
            Err(RpcClientError::Rpc { code, message }) => {
                assert_eq!(code, -1);
                assert_eq!(message, r#"{"code":-1}"#);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn null_error_is_ignored() {
        assert_eq!(
            parse_balance_response(br#"{"jsonrpc":"2.0","id":1,"error":null,"result":"0x1"}"#).unwrap(),
            "0x1"
        );
    }

    #[test]
    fn truncate_long_bodies() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
