//! Mock JSON-RPC endpoint for integration testing
//!
//! Provides a wiremock-based server that answers the handful of `eth_*`
//! methods the service uses, echoing the request id back.

use std::time::Duration;

use alloy::primitives::{Address, B256};
use serde_json::{json, Value};
use wiremock::{
    matchers::{body_partial_json, method},
    Mock, MockServer, Request, Respond, ResponseTemplate,
};

/// Responds with a fixed JSON-RPC result or error
struct RpcResponder {
    payload: Value,
    delay: Option<Duration>,
}

impl Respond for RpcResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let mut response = json!({ "jsonrpc": "2.0", "id": body["id"].clone() });
        if let (Some(target), Some(source)) = (response.as_object_mut(), self.payload.as_object()) {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        }

        let template = ResponseTemplate::new(200).set_body_json(response);
        match self.delay {
            Some(delay) => template.set_delay(delay),
            None => template,
        }
    }
}

/// Log object as returned by `eth_getLogs`
pub fn rpc_log(contract: Address, topics: &[B256], data: &[u8], block: u64, index: u64) -> Value {
    json!({
        "address": contract,
        "topics": topics,
        "data": format!("0x{}", hex::encode(data)),
        "blockNumber": format!("0x{block:x}"),
        "blockHash": B256::repeat_byte(0x01),
        "transactionHash": B256::repeat_byte(0x02),
        "transactionIndex": "0x0",
        "logIndex": format!("0x{index:x}"),
        "removed": false
    })
}

/// Mock JSON-RPC server
pub struct MockRpc {
    server: MockServer,
}

impl MockRpc {
    /// Start a new mock endpoint
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Endpoint URL
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Answer `rpc_method` with `result`
    pub async fn mock_result(&self, rpc_method: &str, result: Value) {
        self.mount(rpc_method, json!({ "result": result }), None).await;
    }

    /// Answer `rpc_method` with `result` after `delay`
    pub async fn mock_slow_result(&self, rpc_method: &str, result: Value, delay: Duration) {
        self.mount(rpc_method, json!({ "result": result }), Some(delay)).await;
    }

    /// Answer `rpc_method` with a JSON-RPC error
    pub async fn mock_error(&self, rpc_method: &str, code: i64, message: &str) {
        self.mount(
            rpc_method,
            json!({ "error": { "code": code, "message": message } }),
            None,
        )
        .await;
    }

    /// Chain head
    pub async fn mock_block_number(&self, block: u64) {
        self.mock_result("eth_blockNumber", json!(format!("0x{block:x}"))).await;
    }

    /// Requests received for `rpc_method`
    pub async fn requests_for(&self, rpc_method: &str) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|request| serde_json::from_slice::<Value>(&request.body).ok())
            .filter(|body| body["method"] == rpc_method)
            .collect()
    }

    async fn mount(&self, rpc_method: &str, payload: Value, delay: Option<Duration>) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": rpc_method })))
            .respond_with(RpcResponder { payload, delay })
            .mount(&self.server)
            .await;
    }
}
