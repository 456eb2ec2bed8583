//! JSON-RPC 2.0 bridge to the voting contract gateway.
//!
//! Submissions return a transaction hash immediately; confirmation is awaited
//! by polling `voting_getTransactionReceipt` until the transaction is
//! confirmed or rejected. Callers bound the overall wait (the coordinator
//! wraps every call in a timeout); dropping the future stops polling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tally_types::{EventCode, TxHash};

use crate::{ChainBridge, ChainError, ScoreSheet, TxReceipt};

pub const METHOD_CREATE_EVENT: &str = "voting_createEvent";
pub const METHOD_VOTE: &str = "voting_vote";
pub const METHOD_RECEIPT: &str = "voting_getTransactionReceipt";
pub const METHOD_SCORES: &str = "voting_getEventScores";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct RpcResponse<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum WireStatus {
    Pending,
    Confirmed,
    Rejected,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReceipt {
    status: WireStatus,
    #[serde(default)]
    block_number: Option<u64>,
    #[serde(default)]
    reason: Option<String>,
}

/// Contract integers arrive either as JSON numbers or as decimal / `0x` hex strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireScore {
    Number(u64),
    Text(String),
}

impl WireScore {
    fn into_u64(self) -> Result<u64, ChainError> {
        match self {
            WireScore::Number(n) => Ok(n),
            WireScore::Text(s) => {
                let parsed = match s.strip_prefix("0x") {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => s.parse(),
                };
                parsed.map_err(|e| ChainError::Decode(format!("score {s:?}: {e}")))
            }
        }
    }
}

fn decode_scores(
    (names, scores, images): (Vec<String>, Vec<WireScore>, Vec<String>),
) -> Result<ScoreSheet, ChainError> {
    if names.len() != scores.len() || names.len() != images.len() {
        return Err(ChainError::Decode(format!(
            "score sheet columns differ in length: {} names, {} scores, {} images",
            names.len(),
            scores.len(),
            images.len()
        )));
    }
    let scores = scores
        .into_iter()
        .map(WireScore::into_u64)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ScoreSheet {
        names,
        scores,
        images,
    })
}

/// HTTP JSON-RPC client for the contract gateway.
pub struct JsonRpcBridge {
    url: String,
    client: reqwest::Client,
    poll_interval: Duration,
    request_timeout: Duration,
    next_id: AtomicU64,
}

impl JsonRpcBridge {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            next_id: AtomicU64::new(1),
        }
    }

    /// How long to wait between receipt polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Timeout for each individual HTTP request.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, ChainError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let resp = self
            .client
            .post(&self.url)
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChainError::Submission(format!("{method}: {e}")))?;

        if !resp.status().is_success() {
            return Err(ChainError::Submission(format!(
                "{method}: HTTP {} from {}",
                resp.status(),
                self.url
            )));
        }

        let body: RpcResponse<T> = resp
            .json()
            .await
            .map_err(|e| ChainError::Decode(format!("{method}: {e}")))?;

        if let Some(err) = body.error {
            return Err(ChainError::Rejected(format!(
                "{method}: {} (code {})",
                err.message, err.code
            )));
        }
        Ok(body.result)
    }

    async fn submit(&self, method: &str, params: Value) -> Result<TxReceipt, ChainError> {
        let tx_hash: TxHash = self
            .call(method, params)
            .await?
            .ok_or_else(|| ChainError::Decode(format!("{method} returned no transaction hash")))?;
        tracing::debug!(%tx_hash, method, "transaction submitted, awaiting confirmation");
        self.await_confirmation(tx_hash).await
    }

    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<TxReceipt, ChainError> {
        loop {
            let receipt: Option<WireReceipt> = self.call(METHOD_RECEIPT, json!([tx_hash])).await?;
            match receipt {
                None => {}
                Some(WireReceipt {
                    status: WireStatus::Pending,
                    ..
                }) => {}
                Some(WireReceipt {
                    status: WireStatus::Confirmed,
                    block_number,
                    ..
                }) => {
                    tracing::debug!(%tx_hash, ?block_number, "transaction confirmed");
                    return Ok(TxReceipt {
                        tx_hash,
                        block_number,
                    });
                }
                Some(WireReceipt {
                    status: WireStatus::Rejected,
                    reason,
                    ..
                }) => {
                    return Err(ChainError::Rejected(
                        reason.unwrap_or_else(|| format!("transaction {tx_hash} reverted")),
                    ));
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl ChainBridge for JsonRpcBridge {
    async fn submit_create_event(
        &self,
        code: &EventCode,
        option_names: &[String],
        option_images: &[String],
    ) -> Result<TxReceipt, ChainError> {
        self.submit(
            METHOD_CREATE_EVENT,
            json!([code.as_str(), option_names, option_images]),
        )
        .await
    }

    async fn submit_vote(
        &self,
        code: &EventCode,
        option_index: usize,
    ) -> Result<TxReceipt, ChainError> {
        self.submit(METHOD_VOTE, json!([code.as_str(), option_index]))
            .await
    }

    async fn fetch_scores(&self, code: &EventCode) -> Result<ScoreSheet, ChainError> {
        let raw: (Vec<String>, Vec<WireScore>, Vec<String>) = self
            .call(METHOD_SCORES, json!([code.as_str()]))
            .await?
            .ok_or_else(|| ChainError::Decode(format!("no scores for event {code}")))?;
        decode_scores(raw)
    }

    fn name(&self) -> &str {
        "json-rpc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    const TX: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

    type Reply = dyn Fn(&str, usize) -> Value + Send + Sync;

    #[derive(Clone)]
    struct Gateway {
        reply: Arc<Reply>,
        receipt_polls: Arc<AtomicUsize>,
    }

    async fn rpc(State(gateway): State<Gateway>, Json(request): Json<Value>) -> Json<Value> {
        let method = request["method"].as_str().unwrap_or_default();
        let n = if method == METHOD_RECEIPT {
            gateway.receipt_polls.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            0
        };
        Json((gateway.reply)(method, n))
    }

    /// Serve `reply(method, receipt_polls)` for every JSON-RPC call.
    async fn spawn_gateway<F>(reply: F) -> (String, Arc<AtomicUsize>)
    where
        F: Fn(&str, usize) -> Value + Send + Sync + 'static,
    {
        let gateway = Gateway {
            reply: Arc::new(reply),
            receipt_polls: Arc::new(AtomicUsize::new(0)),
        };
        let polls = Arc::clone(&gateway.receipt_polls);
        let app = Router::new().route("/", post(rpc)).with_state(gateway);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), polls)
    }

    fn ok(result: Value) -> Value {
        json!({"jsonrpc": "2.0", "id": 1, "result": result})
    }

    fn bridge(url: &str) -> JsonRpcBridge {
        JsonRpcBridge::new(url)
            .with_poll_interval(Duration::from_millis(5))
            .with_request_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn vote_polls_until_confirmed() {
        let (url, polls) = spawn_gateway(|method, n| match method {
            METHOD_VOTE => ok(json!(TX)),
            METHOD_RECEIPT if n < 3 => ok(Value::Null),
            METHOD_RECEIPT => ok(json!({"status": "confirmed", "blockNumber": 77})),
            _ => ok(Value::Null),
        })
        .await;

        let code = EventCode::new("evt").unwrap();
        let receipt = bridge(&url).submit_vote(&code, 1).await.unwrap();
        assert_eq!(receipt.tx_hash.to_string(), TX);
        assert_eq!(receipt.block_number, Some(77));
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rejected_receipt_maps_to_rejected() {
        let (url, _) = spawn_gateway(|method, _| match method {
            METHOD_CREATE_EVENT => ok(json!(TX)),
            _ => ok(json!({"status": "rejected", "reason": "event exists"})),
        })
        .await;

        let code = EventCode::new("evt").unwrap();
        let err = bridge(&url)
            .submit_create_event(&code, &["a".into()], &["a.png".into()])
            .await
            .unwrap_err();
        assert_eq!(err, ChainError::Rejected("event exists".into()));
    }

    #[tokio::test]
    async fn rpc_error_object_maps_to_rejected() {
        let (url, _) = spawn_gateway(|_, _| {
            json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "execution reverted"}})
        })
        .await;

        let code = EventCode::new("evt").unwrap();
        let err = bridge(&url).submit_vote(&code, 0).await.unwrap_err();
        assert_eq!(err.kind(), "chain_rejected");
    }

    #[tokio::test]
    async fn fetch_scores_accepts_numeric_and_hex_scores() {
        let (url, _) = spawn_gateway(|_, _| ok(json!([["a", "b"], [3, "0x0a"], ["a.png", "b.png"]]))).await;

        let code = EventCode::new("evt").unwrap();
        let sheet = bridge(&url).fetch_scores(&code).await.unwrap();
        assert_eq!(sheet.scores, vec![3, 10]);
        assert_eq!(sheet.score_of("b"), Some(10));
        assert_eq!(sheet.total(), 13);
    }

    #[tokio::test]
    async fn unreachable_gateway_is_a_submission_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let code = EventCode::new("evt").unwrap();
        let err = bridge(&format!("http://{addr}"))
            .submit_vote(&code, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Submission(_)), "got {err:?}");
    }

    #[test]
    fn ragged_score_sheet_is_rejected() {
        let raw = (
            vec!["a".to_string(), "b".to_string()],
            vec![WireScore::Number(1)],
            vec!["a.png".to_string(), "b.png".to_string()],
        );
        assert!(matches!(decode_scores(raw), Err(ChainError::Decode(_))));
    }

    #[test]
    fn bad_score_strings_are_decode_errors() {
        assert!(WireScore::Text("12".into()).into_u64().is_ok());
        assert!(WireScore::Text("twelve".into()).into_u64().is_err());
    }
}
